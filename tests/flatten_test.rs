//! Redundant wrapper folders are collapsed, others are left alone.

mod common;

use common::*;
use nested_unzip::{CancellationToken, Input, NoProgress, ProgressEvent, Session};
use tempfile::tempdir;

#[test]
fn test_single_similar_folder_is_flattened() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let archive = write_zip(
        &src.path().join("Photos.zip"),
        &[("photos_files/a.jpg", b"a"), ("photos_files/sub/b.jpg", b"b")],
    );
    let recorder = Recorder::default();

    let mut session = Session::new(dest.path()).unwrap();
    let report = session.run(
        &Input::Files(vec![archive]),
        &CancellationToken::new(),
        &recorder.sink(),
    );

    assert!(report.is_completed(), "{:?}", report.outcome);
    let target = dest.path().join("Photos");
    assert_eq!(read(target.join("a.jpg")), "a");
    assert_eq!(read(target.join("sub").join("b.jpg")), "b");
    assert!(!target.join("photos_files").exists());
    assert!(recorder
        .events()
        .iter()
        .any(|e| matches!(e, ProgressEvent::Flattened { inner, .. } if inner == "photos_files")));

    println!("✅ wrapper folder flattened");
}

#[test]
fn test_dissimilar_folder_kept() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let archive = write_zip(&src.path().join("report.zip"), &[("misc/x.txt", b"x")]);

    nested_unzip::extract_file(dest.path(), &archive).unwrap();

    assert_eq!(read(dest.path().join("report").join("misc").join("x.txt")), "x");
}

#[test]
fn test_flatten_can_be_disabled() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let archive = write_zip(&src.path().join("data.zip"), &[("data/x.txt", b"x")]);

    let mut session = Session::new(dest.path())
        .unwrap()
        .flatten_single_folder(false);
    let report = session.run(
        &Input::Files(vec![archive]),
        &CancellationToken::new(),
        &NoProgress,
    );

    assert!(report.is_completed());
    assert_eq!(read(dest.path().join("data").join("data").join("x.txt")), "x");
}

#[test]
fn test_flatten_compares_with_target_dir_name() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    std::fs::create_dir(dest.path().join("data")).unwrap();
    let archive = write_zip(&src.path().join("data.zip"), &[("data/x.txt", b"x")]);

    let report = nested_unzip::extract_file(dest.path(), &archive).unwrap();

    // "data" is not similar to the collision-suffixed "data_1".
    assert_eq!(report.target_dirs, vec![dest.path().join("data_1")]);
    assert_eq!(read(dest.path().join("data_1").join("data").join("x.txt")), "x");
}

#[test]
fn test_stacked_wrapper_suffixes_are_similar() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let archive = write_zip(
        &src.path().join("backup.zip"),
        &[("Backup_contents_files/notes.txt", b"n")],
    );

    nested_unzip::extract_file(dest.path(), &archive).unwrap();

    assert_eq!(read(dest.path().join("backup").join("notes.txt")), "n");
}

#[test]
fn test_single_file_not_flattened() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let archive = write_zip(&src.path().join("note.zip"), &[("note", b"n")]);

    nested_unzip::extract_file(dest.path(), &archive).unwrap();

    assert_eq!(read(dest.path().join("note").join("note")), "n");
}
