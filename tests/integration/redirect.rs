//! Redirect target integration tests.

use crate::common::{Scratch, leaf};
use pipework::{Command, ExecError, Redirect, Runner, pipe};
use std::io::{Read, Seek, SeekFrom, Write};

#[tokio::test]
async fn test_append_accumulates_across_submissions() {
    let scratch = Scratch::new();
    let out = scratch.path("out.txt");

    let foo = leaf("echo foo").redirect_output(&out, true).unwrap();
    let bar = leaf("echo bar").redirect_output(&out, true).unwrap();
    Runner::run().submit(&foo).await.unwrap();
    Runner::run().submit(&bar).await.unwrap();

    assert_eq!(scratch.read("out.txt"), "foo\nbar\n");
}

#[tokio::test]
async fn test_output_truncates_by_default() {
    let scratch = Scratch::new();
    let out = scratch.write("out.txt", "stale contents that are long\n");

    let tree = leaf("echo fresh").redirect_output(&out, false).unwrap();
    Runner::run().submit(&tree).await.unwrap();

    assert_eq!(scratch.read("out.txt"), "fresh\n");
}

#[tokio::test]
async fn test_redirect_output_of_pipe_targets_last_stage() {
    let scratch = Scratch::new();
    let out = scratch.path("sorted.txt");

    let tree = pipe("printf 'b\\na\\n'", "sort")
        .unwrap()
        .redirect_output(&out, false)
        .unwrap();
    assert_eq!(tree.last_leaf().output(), Some(&Redirect::path(&out)));

    Runner::run().submit(&tree).await.unwrap();
    assert_eq!(scratch.read("sorted.txt"), "a\nb\n");
}

#[tokio::test]
async fn test_input_redirect_from_path() {
    let scratch = Scratch::new();
    let input = scratch.write("words.txt", "cherry\napple\nbanana\n");

    let tree = pipe("sort", "head -n 1")
        .unwrap()
        .redirect_input(&input)
        .unwrap();

    let output = Runner::capture().submit(&tree).await.unwrap();
    assert_eq!(output, "apple\n");
}

#[tokio::test]
async fn test_discard_input_reads_nothing() {
    let tree = leaf("wc -c").redirect_input(Redirect::Discard).unwrap();

    let output = Runner::capture().submit(&tree).await.unwrap();
    assert_eq!(output.trim(), "0");
}

#[tokio::test]
async fn test_open_handle_stays_owned_by_caller() {
    let mut file = tempfile::tempfile().unwrap();
    let tree = leaf("echo via-handle")
        .redirect_output(file.try_clone().unwrap(), false)
        .unwrap();

    Runner::run().submit(&tree).await.unwrap();

    // The engine closed only its duplicate; the caller can keep writing.
    file.write_all(b"after\n").unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    let mut contents = String::new();
    file.read_to_string(&mut contents).unwrap();
    assert_eq!(contents, "via-handle\nafter\n");
}

#[tokio::test]
async fn test_missing_input_path_is_redirect_error() {
    let scratch = Scratch::new();
    let tree = leaf("cat")
        .redirect_input(scratch.path("missing.txt"))
        .unwrap();

    let err = Runner::run().submit(&tree).await.unwrap_err();
    assert!(matches!(err, ExecError::Redirect { .. }));
}

#[tokio::test]
async fn test_runner_stdout_overrides_stored_redirect() {
    let scratch = Scratch::new();
    let stored = scratch.path("stored.txt");
    let chosen = scratch.path("chosen.txt");

    let tree = leaf("echo routed").redirect_output(&stored, false).unwrap();
    Runner::run()
        .with_stdout(&chosen, false)
        .submit(&tree)
        .await
        .unwrap();

    assert!(!scratch.exists("stored.txt"));
    assert_eq!(scratch.read("chosen.txt"), "routed\n");
}

#[tokio::test]
async fn test_capture_overrides_stored_redirect() {
    let scratch = Scratch::new();
    let stored = scratch.path("stored.txt");

    let tree = leaf("echo captured").redirect_output(&stored, false).unwrap();
    let output = Runner::capture().submit(&tree).await.unwrap();

    assert_eq!(output, "captured\n");
    assert!(!scratch.exists("stored.txt"));
}

#[tokio::test]
async fn test_descriptor_redirect_is_reused_per_submission() {
    let scratch = Scratch::new();
    let command = Command::new("echo")
        .with_arg("line")
        .with_output(scratch.path("log.txt"), true);
    let tree = pipework::Tree::from(&command);

    for _ in 0..3 {
        Runner::run().submit(&tree).await.unwrap();
    }
    assert_eq!(scratch.read("log.txt"), "line\nline\nline\n");
    // Deriving never touched the original descriptor.
    assert_eq!(command.args(), ["line"]);
}
