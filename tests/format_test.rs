//! Every supported format extracts the same tree.

mod common;

use common::*;
use nested_unzip::{adapter, extract_file, is_supported_archive, ArchiveFormat, Outcome};
use std::path::Path;
use tempfile::tempdir;

const FILES: &[(&str, &[u8])] = &[("a.txt", b"alpha"), ("b/c.txt", b"charlie")];

fn assert_tree(dir: &Path) {
    assert_eq!(read(dir.join("a.txt")), "alpha");
    assert_eq!(read(dir.join("b").join("c.txt")), "charlie");
}

#[test]
fn test_zip_extracts_into_named_dir() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let archive = write_zip(&src.path().join("sample.zip"), FILES);

    let report = extract_file(dest.path(), &archive).unwrap();

    assert_eq!(report.outcome, Outcome::Completed);
    assert_eq!(report.target_dirs, vec![dest.path().join("sample")]);
    assert_eq!(report.archives_extracted, 1);
    assert_eq!(report.files_extracted, 2);
    assert_eq!(report.bytes_written, 12);
    assert_tree(&dest.path().join("sample"));
    assert!(!archive.exists(), "consumed archive should be deleted");

    println!("✅ ZIP extraction works");
}

#[test]
fn test_tar_variants() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();

    let archives = [
        write_tar(&src.path().join("plain.tar"), FILES),
        write_tar_gz(&src.path().join("gz.tar.gz"), FILES),
        write_tar_gz(&src.path().join("short.tgz"), FILES),
        write_tar_bz2(&src.path().join("bz.tar.bz2"), FILES),
    ];

    for archive in &archives {
        let report = extract_file(dest.path(), archive).unwrap();
        assert!(report.is_completed(), "{}: {:?}", archive.display(), report.outcome);
    }

    for name in ["plain", "gz", "short", "bz"] {
        assert_tree(&dest.path().join(name));
    }

    println!("✅ TAR, TAR.GZ, TGZ and TAR.BZ2 extraction works");
}

#[test]
fn test_sevenz_extraction() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let archive = write_7z(&src.path().join("seven.7z"), FILES);

    let report = extract_file(dest.path(), &archive).unwrap();

    assert!(report.is_completed(), "{:?}", report.outcome);
    assert_tree(&dest.path().join("seven"));

    println!("✅ 7z extraction works");
}

#[test]
fn test_format_detection() {
    assert_eq!(
        ArchiveFormat::from_path(Path::new("x.TAR.GZ")),
        Some(ArchiveFormat::TarGz)
    );
    assert_eq!(
        ArchiveFormat::from_path(Path::new("x.tbz2")),
        Some(ArchiveFormat::TarBz2)
    );
    assert_eq!(
        ArchiveFormat::from_path(Path::new("x.rar")),
        Some(ArchiveFormat::Rar)
    );
    assert_eq!(ArchiveFormat::from_path(Path::new("x.txt")), None);
    assert_eq!(ArchiveFormat::from_path(Path::new(".zip")), None);
    assert!(is_supported_archive(Path::new("bundle.7z")));
    assert!(!is_supported_archive(Path::new("bundle.gz")));
}

#[test]
fn test_open_lists_without_extracting() {
    let src = tempdir().unwrap();
    let archive = write_tar_gz(&src.path().join("listing.tgz"), FILES);

    let mut reader = adapter::open(&archive).unwrap();
    assert_eq!(reader.format(), ArchiveFormat::TarGz);
    assert!(!reader.is_encrypted().unwrap());

    let entries = reader.list_entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.is_file()));
    assert_eq!(entries[0].size, 5);

    assert!(matches!(
        adapter::open(Path::new("notes.txt")),
        Err(nested_unzip::Error::UnsupportedFormat { .. })
    ));
}

#[test]
fn test_garbage_single_archive_fails_and_rolls_back() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let archive = src.path().join("broken.zip");
    std::fs::write(&archive, b"this is not a zip file").unwrap();

    let report = extract_file(dest.path(), &archive).unwrap();

    assert!(matches!(report.outcome, Outcome::Failed(_)));
    assert!(report.target_dirs.is_empty());
    assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
    assert!(archive.exists(), "failed input must not be deleted");

    println!("✅ corrupt single archive fails cleanly");
}
