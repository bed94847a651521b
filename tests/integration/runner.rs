//! Runner preset and projection integration tests.

use crate::common::{Scratch, leaf, touch};
use pipework::{
    CheckPolicy, Command, Environment, ExecError, ProcessOptions, Runner, Tree, lines, pipe,
};
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_checked_failure_reports_actual_and_expected() {
    let tree = leaf("false").with_check(CheckPolicy::ExpectZero);

    let err = Runner::run().submit(&tree).await.unwrap_err();
    match &err {
        ExecError::CommandFailed {
            command,
            code,
            expected,
        } => {
            assert_eq!(command, "false");
            assert_eq!(*code, 1);
            assert_eq!(*expected, CheckPolicy::ExpectZero);
        }
        other => panic!("expected command failure, got {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "command `false` exited with code 1, expected exit code 0"
    );
}

#[tokio::test]
async fn test_unchecked_failure_is_not_an_error() {
    let handle = leaf("false").run().await.unwrap();
    assert_eq!(handle.exit_code(), Some(1));
}

#[tokio::test]
async fn test_expected_nonzero_code() {
    let tree = leaf("sh -c 'exit 2'").with_check(2);
    assert!(tree.run().await.is_ok());

    let err = leaf("true").with_check(2).run().await.unwrap_err();
    assert_eq!(err.exit_code(), Some(0));
}

#[tokio::test]
async fn test_capture_shortcut() {
    let output = pipe("echo shortcut", "cat").unwrap().capture().await.unwrap();
    assert_eq!(output, "shortcut\n");
}

#[tokio::test]
async fn test_background_returns_before_completion() {
    let tree = leaf("sleep 5");

    let started = Instant::now();
    let mut handle = tree.background().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(handle.id().is_some());
    assert_eq!(handle.exit_code(), None);

    handle.kill().await.unwrap();
    assert!(handle.exit_code().is_some());
}

#[tokio::test]
async fn test_background_then_wait() {
    let scratch = Scratch::new();
    let tree = leaf("sleep 0.1").and_then(touch(scratch.path("done"))).unwrap();

    let mut handle = Runner::background().submit(&tree).await.unwrap();
    assert_eq!(handle.wait().await.unwrap(), 0);
    assert!(scratch.exists("done"));
}

#[tokio::test]
async fn test_wait_timeout_passes_through() {
    let mut handle = leaf("sleep 5").background().await.unwrap();

    let err = handle
        .wait_timeout(Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::Timeout(_)));

    handle.kill().await.unwrap();
}

#[tokio::test]
async fn test_configuration_error_spawns_nothing() {
    let scratch = Scratch::new();
    let tree = touch(scratch.path("marker"));

    let err = Runner::capture()
        .with_wait(false)
        .submit(&tree)
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::Config(_)));
    assert!(!scratch.exists("marker"));
}

#[tokio::test]
async fn test_text_projection() {
    let tree = pipe("printf 'a b\\nc d e\\n'", "wc -w").unwrap();

    let words: usize = Runner::capture()
        .from_str(|text| text.trim().parse().unwrap_or(0))
        .submit(&tree)
        .await
        .unwrap();
    assert_eq!(words, 5);
}

#[tokio::test]
async fn test_process_projection() {
    let code = Runner::run()
        .from_process(|handle| handle.exit_code())
        .submit(&leaf("sh -c 'exit 4'"))
        .await
        .unwrap();
    assert_eq!(code, Some(4));
}

#[tokio::test]
async fn test_process_projection_with_capture() {
    let runner = Runner::run()
        .with_capture(true)
        .from_process(|handle| handle.into_output());

    let bytes = runner.submit(&leaf("echo raw")).await.unwrap();
    assert_eq!(bytes, b"raw\n");
}

#[tokio::test]
async fn test_same_runner_different_trees() {
    let runner = Runner::capture().with_check(true);

    assert_eq!(runner.submit(&leaf("echo one")).await.unwrap(), "one\n");
    assert_eq!(runner.submit(&leaf("echo two")).await.unwrap(), "two\n");
    assert!(runner.submit(&leaf("false")).await.is_err());
}

#[tokio::test]
async fn test_options_apply_to_every_stage() {
    let scratch = Scratch::new();
    scratch.write("local.txt", "from working dir\n");
    let env: Environment = [("SUFFIX", "!")].into_iter().collect();
    let options = ProcessOptions::new()
        .environment(env)
        .working_dir(scratch.path(""));

    let tree = pipe("cat local.txt", "sh -c 'read line; echo \"$line$SUFFIX\"'").unwrap();
    let output = Runner::capture()
        .with_options(options)
        .submit(&tree)
        .await
        .unwrap();
    assert_eq!(output, "from working dir!\n");
}

#[tokio::test]
async fn test_streaming_lines() {
    let tree = pipe("printf 'one\\ntwo\\nthree\\n'", "cat").unwrap();

    let mut stream = lines(&tree).await.unwrap();
    let mut seen = Vec::new();
    while let Some(line) = stream.next_line().await.unwrap() {
        seen.push(line);
    }

    assert_eq!(seen, vec!["one", "two", "three"]);
    assert_eq!(stream.exit_code(), Some(0));
}

#[tokio::test]
async fn test_lines_can_stop_early() {
    let tree = Tree::from(Command::new("yes").with_arg("again"));

    let mut stream = lines(&tree).await.unwrap();
    assert_eq!(stream.next_line().await.unwrap().as_deref(), Some("again"));
    assert_eq!(stream.next_line().await.unwrap().as_deref(), Some("again"));

    let mut handle = stream.into_handle();
    handle.kill().await.unwrap();
}
