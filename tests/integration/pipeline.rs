//! Pipe chain integration tests.
//!
//! Stages run concurrently, wired by OS pipes, and only the last stage's
//! exit code gates the result.

use crate::common::{Scratch, leaf};
use pipework::{CheckPolicy, Command, ExecError, Redirect, Runner, pipe};
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn test_pipe_capture_returns_final_stage_output() {
    let tree = pipe("echo foo", "cat").unwrap();

    let output = Runner::capture().submit(&tree).await.unwrap();
    assert_eq!(output, "foo\n");
}

#[tokio::test]
async fn test_pipe_equals_sequential_composition() {
    let scratch = Scratch::new();
    let producer = leaf("printf 'pear\\napple\\nfig\\n'");
    let filter = leaf("sort");

    // Feed the producer's captured output to the filter by hand.
    let produced = Runner::capture().submit(&producer).await.unwrap();
    let input = scratch.write("produced.txt", &produced);
    let by_hand = Runner::capture()
        .with_stdin(input)
        .submit(&filter)
        .await
        .unwrap();

    let piped = Runner::capture()
        .submit(&pipe(&producer, &filter).unwrap())
        .await
        .unwrap();

    assert_eq!(piped, by_hand);
    assert_eq!(piped, "apple\nfig\npear\n");
}

#[tokio::test]
async fn test_output_larger_than_pipe_buffer_does_not_deadlock() {
    // Several megabytes through two inter-stage pipes.
    let tree = pipe("head -c 4000000 /dev/zero", "cat")
        .unwrap()
        .pipe("wc -c")
        .unwrap();

    let output = Runner::capture().submit(&tree).await.unwrap();
    assert_eq!(output.trim(), "4000000");
}

#[tokio::test]
async fn test_large_final_stage_output_is_fully_captured() {
    let tree = pipe("head -c 3000000 /dev/zero", "cat").unwrap();

    let bytes = Runner::capture()
        .from_bytes(|bytes| bytes.len())
        .submit(&tree)
        .await
        .unwrap();
    assert_eq!(bytes, 3_000_000);
}

#[tokio::test]
async fn test_early_exit_of_last_stage_ends_infinite_producer() {
    // `yes` never stops on its own; `head` closing the pipe must end it.
    let tree = pipe("yes", "head -n 3").unwrap();

    let output = Runner::capture().submit(&tree).await.unwrap();
    assert_eq!(output, "y\ny\ny\n");
}

#[tokio::test]
async fn test_only_last_stage_is_checked() {
    let scratch = Scratch::new();
    let missing = scratch.arg("missing.txt");

    let tree = pipe(pipe(format!("cat {missing}"), "sort").unwrap(), "wc -l")
        .unwrap()
        .with_check(CheckPolicy::ExpectZero);

    let handle = Runner::run().submit(&tree).await.unwrap();
    assert_eq!(handle.exit_code(), Some(0));
    assert_eq!(handle.command().program(), "wc");
}

#[tokio::test]
async fn test_failing_first_stage_with_checked_last_stage_succeeds() {
    let tree = pipe("false", Command::new("true").checked()).unwrap();

    // The coerced `false` borrowed the check, but it is not the last stage.
    assert_eq!(tree.first_leaf().check_policy(), CheckPolicy::ExpectZero);
    let handle = Runner::run().submit(&tree).await.unwrap();
    assert_eq!(handle.exit_code(), Some(0));
}

#[tokio::test]
async fn test_failing_last_stage_is_reported() {
    let tree = pipe("echo data", Command::new("false").checked()).unwrap();

    let err = Runner::run().submit(&tree).await.unwrap_err();
    match err {
        ExecError::CommandFailed {
            command,
            code,
            expected,
        } => {
            assert_eq!(command, "false");
            assert_eq!(code, 1);
            assert_eq!(expected, CheckPolicy::ExpectZero);
        }
        other => panic!("expected command failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_resubmission_is_independent() {
    let tree = pipe("echo once", "tr a-z A-Z").unwrap();
    let runner = Runner::capture();

    let first = runner.submit(&tree).await.unwrap();
    let second = runner.submit(&tree).await.unwrap();
    assert_eq!(first, "ONCE\n");
    assert_eq!(second, "ONCE\n");

    let (a, b) = tokio::join!(runner.submit(&tree), runner.submit(&tree));
    assert_eq!(a.unwrap(), "ONCE\n");
    assert_eq!(b.unwrap(), "ONCE\n");
}

#[tokio::test]
async fn test_missing_program_in_pipe_is_spawn_error() {
    let tree = pipe("echo hello", "no-such-program-pipework-test").unwrap();

    let err = Runner::run().submit(&tree).await.unwrap_err();
    assert!(matches!(
        err,
        ExecError::Spawn { ref program, .. } if program == "no-such-program-pipework-test"
    ));
}

#[tokio::test]
async fn test_connected_stdin_reaches_first_stage() {
    let tree = pipe("cat", "tr a-z A-Z").unwrap();

    let mut handle = Runner::background()
        .with_stdin(Redirect::Pipe)
        .with_stdout(Redirect::Pipe, false)
        .submit(&tree)
        .await
        .unwrap();

    let mut stdin = handle.take_stdin().unwrap();
    stdin.write_all(b"written by the caller\n").await.unwrap();
    drop(stdin);

    assert_eq!(handle.wait().await.unwrap(), 0);
    assert_eq!(handle.output(), b"WRITTEN BY THE CALLER\n");
}

#[tokio::test]
async fn test_argv_operands_keep_arguments_intact() {
    let tree = pipe(["printf", "%s\\n", "two words"], "cat").unwrap();

    let output = Runner::capture().submit(&tree).await.unwrap();
    assert_eq!(output, "two words\n");
}
