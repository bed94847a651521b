//! And/or chain integration tests.

use crate::common::{Scratch, leaf, touch};
use pipework::{BuildError, CheckPolicy, Command, ExecError, Runner, and_then, or_else, pipe};

#[tokio::test]
async fn test_and_short_circuit_never_spawns_right() {
    let scratch = Scratch::new();
    let tree = and_then("false", touch(scratch.path("marker"))).unwrap();

    let handle = Runner::run().submit(&tree).await.unwrap();

    assert!(!scratch.exists("marker"));
    assert_eq!(handle.exit_code(), Some(1));
    assert_eq!(handle.command().program(), "false");
}

#[tokio::test]
async fn test_and_short_circuit_produces_no_output() {
    let tree = and_then("false", "echo yes").unwrap();

    let output = Runner::capture().submit(&tree).await.unwrap();
    assert_eq!(output, "");
}

#[tokio::test]
async fn test_and_runs_right_after_success() {
    let scratch = Scratch::new();
    let tree = and_then("true", touch(scratch.path("marker"))).unwrap();

    Runner::run().submit(&tree).await.unwrap();
    assert!(scratch.exists("marker"));
}

#[tokio::test]
async fn test_or_skips_right_after_success() {
    let scratch = Scratch::new();
    let tree = or_else("true", touch(scratch.path("marker"))).unwrap();

    let handle = Runner::run().submit(&tree).await.unwrap();
    assert!(!scratch.exists("marker"));
    assert_eq!(handle.exit_code(), Some(0));
}

#[tokio::test]
async fn test_or_runs_right_after_failure() {
    let tree = or_else("false", "echo fallback").unwrap();

    let output = Runner::capture().submit(&tree).await.unwrap();
    assert_eq!(output, "fallback\n");
}

#[tokio::test]
async fn test_short_circuit_with_absent_file() {
    let scratch = Scratch::new();
    let guard = format!("test -f {}", scratch.arg("absent.txt"));
    let tree = and_then(guard, format!("cat {}", scratch.arg("absent.txt")))
        .unwrap()
        .or_else("echo no data")
        .unwrap();

    let output = Runner::capture().submit(&tree).await.unwrap();
    assert_eq!(output, "no data\n");
}

#[tokio::test]
async fn test_chains_are_left_associative() {
    // (false && echo a) || echo b
    let tree = and_then("false", "echo a").unwrap().or_else("echo b").unwrap();
    assert_eq!(Runner::capture().submit(&tree).await.unwrap(), "b\n");

    // (true || echo a) && echo b
    let tree = or_else("true", "echo a").unwrap().and_then("echo b").unwrap();
    assert_eq!(Runner::capture().submit(&tree).await.unwrap(), "b\n");
}

#[tokio::test]
async fn test_decision_uses_raw_exit_code() {
    // The checked left branch fails, but or-else recovers without raising.
    let tree = or_else(Command::new("false").checked(), "true").unwrap();

    let handle = Runner::run().submit(&tree).await.unwrap();
    assert_eq!(handle.exit_code(), Some(0));
}

#[tokio::test]
async fn test_short_circuited_left_is_checked_as_last_stage() {
    let tree = and_then(Command::new("false").checked(), "echo never").unwrap();

    let err = Runner::run().submit(&tree).await.unwrap_err();
    assert!(err.is_command_failure());
    assert_eq!(err.exit_code(), Some(1));
}

#[tokio::test]
async fn test_check_override_applies_to_branch_that_ran() {
    let tree = or_else("false", "sh -c 'exit 3'").unwrap();

    let handle = Runner::run()
        .with_check(CheckPolicy::ExpectCode(3))
        .submit(&tree)
        .await
        .unwrap();
    assert_eq!(handle.exit_code(), Some(3));

    let err = Runner::run()
        .with_check(CheckPolicy::ExpectZero)
        .submit(&tree)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::CommandFailed { code: 3, .. }));
}

#[tokio::test]
async fn test_stdin_feeds_left_and_stdout_comes_from_right() {
    let scratch = Scratch::new();
    let input = scratch.write("haystack.txt", "hay\nneedle\nhay\n");
    let tree = and_then("grep -q needle", "echo found").unwrap();

    let output = Runner::capture()
        .with_stdin(input)
        .submit(&tree)
        .await
        .unwrap();
    assert_eq!(output, "found\n");
}

#[tokio::test]
async fn test_chain_as_pipe_stage() {
    let tree = pipe(or_else("false", "echo recovered").unwrap(), "tr a-z A-Z").unwrap();
    assert_eq!(tree.to_string(), "(false || echo recovered) | tr a-z A-Z");

    let output = Runner::capture().submit(&tree).await.unwrap();
    assert_eq!(output, "RECOVERED\n");
}

#[tokio::test]
async fn test_pipe_as_chain_branch() {
    let tree = and_then("true", pipe("echo a b c", "wc -w").unwrap()).unwrap();

    let output = Runner::capture().submit(&tree).await.unwrap();
    assert_eq!(output.trim(), "3");
}

#[test]
fn test_redirecting_a_chain_is_rejected() {
    let tree = and_then(leaf("true"), leaf("echo hi")).unwrap();

    let err = tree.redirect_output("out.txt", false).unwrap_err();
    assert!(matches!(err, BuildError::AmbiguousRedirect { .. }));

    let err = or_else("false", "true")
        .unwrap()
        .redirect_input("in.txt")
        .unwrap_err();
    assert!(matches!(err, BuildError::AmbiguousRedirect { .. }));
}
