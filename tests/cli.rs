//! Exit-code and stderr contract of the `paper2md` binary.
//!
//! Every run starts from an empty environment in a fresh working directory,
//! so neither the shell nor a stray `.env` file can supply credentials.
//!
//! Run with:
//!   cargo test --test cli

#![cfg(feature = "cli")]

use std::path::Path;
use std::process::{Command, Output};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_paper2md"))
        .args(args)
        .env_clear()
        .current_dir(dir)
        .output()
        .expect("failed to launch paper2md")
}

fn stderr_lines(out: &Output) -> Vec<String> {
    String::from_utf8_lossy(&out.stderr)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}

// ── Argument errors ──────────────────────────────────────────────────────────

#[test]
fn missing_out_dir_exits_one_with_a_single_line() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_in(dir.path(), &["-i", "paper.pdf"]);

    assert_eq!(out.status.code(), Some(1));
    let lines = stderr_lines(&out);
    assert_eq!(lines.len(), 1, "stderr: {lines:?}");
    assert!(lines[0].contains("error"), "stderr: {lines:?}");
}

#[test]
fn no_arguments_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_in(dir.path(), &[]);

    assert_eq!(out.status.code(), Some(1));
    assert_eq!(stderr_lines(&out).len(), 1);
}

#[test]
fn positional_argument_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_in(dir.path(), &["-i", "paper.pdf", "-o", "out", "extra"]);

    assert_eq!(out.status.code(), Some(1));
    let lines = stderr_lines(&out);
    assert_eq!(lines.len(), 1, "stderr: {lines:?}");
    assert!(lines[0].contains("extra"), "stderr: {lines:?}");
}

// ── Configuration errors ─────────────────────────────────────────────────────

#[test]
fn unset_api_key_exits_one_before_writing_anything() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("paper.pdf");
    std::fs::write(&pdf, b"%PDF-1.4\n").unwrap();
    let out_dir = dir.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();

    let out = run_in(
        dir.path(),
        &["--quiet", "-i", "paper.pdf", "--outDir", "out"],
    );

    assert_eq!(out.status.code(), Some(1));
    let lines = stderr_lines(&out);
    assert_eq!(lines.len(), 1, "stderr: {lines:?}");
    assert!(lines[0].contains("MISTRAL_OCR_API_KEY"), "stderr: {lines:?}");
    assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 0);
}

#[test]
fn missing_input_file_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("out")).unwrap();

    let out = run_in(dir.path(), &["-q", "-i", "nope.pdf", "-o", "out"]);

    assert_eq!(out.status.code(), Some(1));
    assert_eq!(stderr_lines(&out).len(), 1);
}

// ── Help and version ─────────────────────────────────────────────────────────

#[test]
fn help_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_in(dir.path(), &["--help"]);

    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("--outDir"), "stdout: {stdout}");
    assert!(stdout.contains("MISTRAL_OCR_API_KEY"), "stdout: {stdout}");
}

#[test]
fn version_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_in(dir.path(), &["--version"]);

    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains(env!("CARGO_PKG_VERSION")));
}
