//! Target directory resolution.
//!
//! Every archive gets a directory of its own, named after the archive and
//! created fresh: an existing directory is never reused.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::adapter::ArchiveReader;
use crate::decode::FilenameDecoder;
use crate::error::Error;
use crate::format::ArchiveFormat;

/// Characters Windows rejects in file names.
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Upper bound on `_N` suffixes tried before giving up.
const MAX_COLLISION_SUFFIX: u32 = 10_000;

/// Top-level shape of an archive, from its metadata listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// No entries at all.
    Empty,
    /// Everything lives under one top-level directory with this name.
    SingleRoot(String),
    /// This many distinct top-level items.
    Loose(usize),
}

/// Directory name for an archive's contents.
///
/// Strips the format suffix and characters that are illegal in file names,
/// then trailing dots and spaces. Never empty.
pub fn base_name(archive: &Path) -> String {
    let file_name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let cleaned: String = ArchiveFormat::strip_suffix(&file_name)
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c) && !c.is_control())
        .collect();
    let trimmed = cleaned.trim_end_matches(['.', ' ']);

    if trimmed.is_empty() {
        "archive".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Inspect an archive's top level without extracting it.
///
/// An encrypted archive is rejected here, before any directory exists.
pub fn probe(reader: &mut dyn ArchiveReader, decoder: &FilenameDecoder) -> Result<Layout, Error> {
    if reader.is_encrypted()? {
        return Err(Error::Encrypted {
            archive: reader.path().to_path_buf(),
            entry: None,
        });
    }

    let mut roots: Vec<String> = Vec::new();
    let mut nested_under_root = true;

    for info in reader.list_entries()? {
        let name = decoder.decode(&info.name).replace('\\', "/");
        let mut parts = name.split('/').filter(|p| !p.is_empty() && *p != ".");
        let Some(first) = parts.next() else {
            continue;
        };
        if parts.next().is_none() && !info.is_dir() {
            nested_under_root = false;
        }
        if !roots.iter().any(|r| r == first) {
            roots.push(first.to_string());
        }
    }

    Ok(match roots.len() {
        0 => Layout::Empty,
        1 if nested_under_root => Layout::SingleRoot(roots.remove(0)),
        n => Layout::Loose(n),
    })
}

/// Create a new directory `<parent>/<name>`, or `<name>_1`, `<name>_2`, ...
/// when the name is taken.
///
/// Creation is atomic: a concurrent creator can never hand out the same
/// directory twice.
pub fn create_unique_dir(parent: &Path, name: &str) -> Result<PathBuf, Error> {
    for n in 0..=MAX_COLLISION_SUFFIX {
        let candidate = if n == 0 {
            parent.join(name)
        } else {
            parent.join(format!("{name}_{n}"))
        };
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(Error::Io(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!(
            "no free directory name for '{}' in '{}'",
            name,
            parent.display()
        ),
    )))
}
