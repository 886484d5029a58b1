//! Fixture builders shared by the integration tests.
#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use nested_unzip::ProgressEvent;
use std::sync::{Arc, Mutex};

/// Build a zip in memory. Names ending in `/` become directories.
pub fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let options: zip::write::FileOptions<()> = zip::write::FileOptions::default();
        for (name, content) in files {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content).unwrap();
            }
        }
        zip.finish().unwrap();
    }
    buffer.into_inner()
}

/// Zip whose flagged entries are ZipCrypto-encrypted.
pub fn write_zip_encrypted(path: &Path, files: &[(&str, &[u8], bool)]) -> PathBuf {
    use zip::unstable::write::FileOptionsExt;

    let mut zip = zip::ZipWriter::new(fs::File::create(path).unwrap());
    for (name, content, encrypted) in files {
        let options: zip::write::FileOptions<()> = zip::write::FileOptions::default();
        let options = if *encrypted {
            options.with_deprecated_encryption(b"hunter2")
        } else {
            options
        };
        zip.start_file(*name, options).unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap();
    path.to_path_buf()
}

pub fn write_zip(path: &Path, files: &[(&str, &[u8])]) -> PathBuf {
    fs::write(path, zip_bytes(files)).unwrap();
    path.to_path_buf()
}

/// Build a tar in memory with raw (possibly non-UTF-8) names.
pub fn tar_bytes_raw(files: &[(&[u8], &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());

    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.as_mut_bytes()[..name.len()].copy_from_slice(name);
        header.as_mut_bytes()[name.len()] = 0;
        if name.ends_with(b"/") {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_size(0);
            header.set_mode(0o755);
        } else {
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
        }
        header.set_cksum();
        builder.append(&header, *content).unwrap();
    }

    builder.into_inner().unwrap()
}

pub fn tar_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let raw: Vec<(&[u8], &[u8])> = files.iter().map(|(n, c)| (n.as_bytes(), *c)).collect();
    tar_bytes_raw(&raw)
}

pub fn write_tar(path: &Path, files: &[(&str, &[u8])]) -> PathBuf {
    fs::write(path, tar_bytes(files)).unwrap();
    path.to_path_buf()
}

pub fn write_tar_gz(path: &Path, files: &[(&str, &[u8])]) -> PathBuf {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_bytes(files)).unwrap();
    fs::write(path, encoder.finish().unwrap()).unwrap();
    path.to_path_buf()
}

pub fn write_tar_bz2(path: &Path, files: &[(&str, &[u8])]) -> PathBuf {
    use bzip2::write::BzEncoder;
    use bzip2::Compression;

    let mut encoder = BzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_bytes(files)).unwrap();
    fs::write(path, encoder.finish().unwrap()).unwrap();
    path.to_path_buf()
}

/// Build a 7z by staging the files on disk first.
pub fn write_7z(path: &Path, files: &[(&str, &[u8])]) -> PathBuf {
    let staging = tempfile::tempdir().unwrap();
    for (name, content) in files {
        let file = staging.path().join(name);
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(file, content).unwrap();
    }
    sevenz_rust::compress_to_path(staging.path(), path).unwrap();
    path.to_path_buf()
}

/// Read a file to a string, for short assertions.
pub fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path).unwrap()
}

/// Collecting progress sink.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<ProgressEvent>>>);

impl Recorder {
    pub fn push(&self, event: &ProgressEvent) {
        self.0.lock().unwrap().push(event.clone());
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn sink(&self) -> impl Fn(&ProgressEvent) + Send + Sync + 'static {
        let recorder = self.clone();
        move |event: &ProgressEvent| recorder.push(event)
    }
}
