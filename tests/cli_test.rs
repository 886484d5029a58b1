//! CLI integration tests
//!
//! These tests run the binary end-to-end.

#![cfg(feature = "cli")]

mod common;

use common::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn cli_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_nested_unzip"))
}

fn create_bundle(dir: &std::path::Path) -> std::path::PathBuf {
    let inner = tar_bytes(&[("inner.txt", b"Nested content")]);
    write_zip(
        &dir.join("bundle.zip"),
        &[("hello.txt", b"Hello, World!"), ("inner.tar", &inner)],
    )
}

#[test]
fn test_cli_help() {
    let output = cli_binary().arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Recursive archive extraction"));
    assert!(stdout.contains("--list"));
    assert!(stdout.contains("--keep-archives"));
    assert!(stdout.contains("--name-encoding"));
}

#[test]
fn test_cli_version() {
    let output = cli_binary().arg("--version").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("nested_unzip"));
}

#[test]
fn test_cli_list() {
    let temp = tempdir().unwrap();
    let archive = create_bundle(temp.path());
    let unused_dest = temp.path().join("out");

    let output = cli_binary()
        .arg(&archive)
        .arg("--list")
        .arg("-d")
        .arg(&unused_dest)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hello.txt"));
    assert!(stdout.contains("inner.tar"));
    assert!(stdout.contains("2 entries"));
    // Listing never extracts or deletes.
    assert!(archive.exists());
    assert!(!temp.path().join("bundle").exists());
    assert!(!unused_dest.exists(), "listing must not create the destination");
}

#[test]
fn test_cli_extract_nested() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let archive = create_bundle(src.path());

    let output = cli_binary()
        .arg(&archive)
        .arg("-d")
        .arg(dest.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Extracting bundle.zip"));
    assert!(stdout.contains("Extracting nested archive inner.tar"));
    assert!(stdout.contains("Extracted 2 archives"));
    assert!(stdout.contains("Output:"));

    let root = dest.path().join("bundle");
    assert_eq!(read(root.join("hello.txt")), "Hello, World!");
    assert_eq!(read(root.join("inner").join("inner.txt")), "Nested content");
    assert!(!archive.exists());
}

#[test]
fn test_cli_keep_archives_and_quiet() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let archive = create_bundle(src.path());

    let output = cli_binary()
        .arg(&archive)
        .arg("-d")
        .arg(dest.path())
        .arg("--keep-archives")
        .arg("-q")
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(archive.exists());
    assert!(dest.path().join("bundle").join("inner.tar").exists());
}

#[test]
fn test_cli_folder() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    write_zip(&src.path().join("a.zip"), &[("a.txt", b"a")]);
    write_tar_gz(&src.path().join("b.tgz"), &[("b.txt", b"b")]);

    let output = cli_binary()
        .arg("--folder")
        .arg(src.path())
        .arg("-d")
        .arg(dest.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(read(dest.path().join("a").join("a.txt")), "a");
    assert_eq!(read(dest.path().join("b").join("b.txt")), "b");
}

#[test]
fn test_cli_creates_destination() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let archive = create_bundle(src.path());
    let nested_dest = dest.path().join("new").join("dir");

    let output = cli_binary()
        .arg(&archive)
        .arg("-d")
        .arg(&nested_dest)
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(nested_dest.join("bundle").join("hello.txt").exists());
}

#[test]
fn test_cli_corrupt_archive_fails() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let archive = src.path().join("broken.zip");
    fs::write(&archive, b"not a zip at all").unwrap();

    let output = cli_binary()
        .arg(&archive)
        .arg("-d")
        .arg(dest.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error"));
    assert!(archive.exists());
    assert!(fs::read_dir(dest.path()).unwrap().next().is_none());
}

#[test]
fn test_cli_bad_encoding_label() {
    let src = tempdir().unwrap();
    let archive = create_bundle(src.path());

    let output = cli_binary()
        .arg(&archive)
        .arg("-d")
        .arg(src.path())
        .arg("--name-encoding")
        .arg("klingon")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(archive.exists());
}

#[test]
fn test_cli_completions() {
    let output = cli_binary()
        .arg("--completions")
        .arg("bash")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("nested_unzip"));
}

#[test]
fn test_cli_missing_file() {
    let dest = tempdir().unwrap();
    let output = cli_binary()
        .arg("/nonexistent/file.zip")
        .arg("-d")
        .arg(dest.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
}
