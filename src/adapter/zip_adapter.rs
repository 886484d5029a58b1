//! ZIP archive adapter.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use zip::result::ZipError;
use zip::ZipArchive;

use super::{ArchiveReader, EntryVisitor};
use crate::decode::Codepage;
use crate::entry::{EntryInfo, EntryKind, RawName};
use crate::error::Error;
use crate::format::ArchiveFormat;

/// Adapter for ZIP archives.
///
/// ZIP has a central directory, so listing is cheap and entries can be
/// opened by index in any order.
pub struct ZipAdapter<R: Read + Seek> {
    archive: ZipArchive<R>,
    path: PathBuf,
}

impl ZipAdapter<BufReader<File>> {
    /// Open a ZIP file from a path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::new(BufReader::new(file), path)
    }
}

impl<R: Read + Seek> ZipAdapter<R> {
    /// Create an adapter from any seekable reader. `path` is used for
    /// messages only.
    pub fn new(reader: R, path: &Path) -> Result<Self, Error> {
        let archive = ZipArchive::new(reader).map_err(|e| map_zip_error(path, None, e))?;
        Ok(Self {
            archive,
            path: path.to_path_buf(),
        })
    }

    /// Metadata for entry `index`, read without decompressing.
    fn entry_info(&mut self, index: usize) -> Result<EntryInfo, Error> {
        let entry = self
            .archive
            .by_index_raw(index)
            .map_err(|e| map_zip_error(&self.path, None, e))?;

        let kind = if entry.is_dir() {
            EntryKind::Directory
        } else if entry.is_symlink() {
            // ZIP symlink targets require reading content
            EntryKind::Symlink {
                target: String::new(),
            }
        } else {
            EntryKind::File
        };

        Ok(EntryInfo {
            name: raw_name(entry.name_raw(), entry.name()),
            size: entry.size(),
            kind,
            mode: entry.unix_mode(),
            encrypted: entry.encrypted(),
        })
    }
}

impl<R: Read + Seek> ArchiveReader for ZipAdapter<R> {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Zip
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn is_encrypted(&mut self) -> Result<bool, Error> {
        let mut files = 0usize;
        let mut encrypted = 0usize;
        for info in self.list_entries()? {
            if info.is_file() {
                files += 1;
                if info.encrypted {
                    encrypted += 1;
                }
            }
        }
        Ok(files > 0 && files == encrypted)
    }

    fn list_entries(&mut self) -> Result<Vec<EntryInfo>, Error> {
        (0..self.archive.len()).map(|i| self.entry_info(i)).collect()
    }

    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> Result<(), Error> {
        for index in 0..self.archive.len() {
            let info = self.entry_info(index)?;

            if !info.is_file() || info.encrypted {
                visit(&info, Ok(&mut io::empty()))?;
                continue;
            }

            match self.archive.by_index(index) {
                Ok(mut entry) => visit(&info, Ok(&mut entry))?,
                Err(e) => {
                    let entry = info.name.lossy();
                    visit(&info, Err(map_zip_error(&self.path, Some(entry), e)))?
                }
            }
        }
        Ok(())
    }
}

/// Pick the most faithful form of a ZIP entry name.
///
/// The `zip` crate decodes names as UTF-8 when the entry says so and as
/// CP437 otherwise, and prefers the Info-ZIP Unicode path field when one is
/// present. Only the CP437 fallback is unreliable, so in that case the raw
/// bytes go to the filename decoder instead.
fn raw_name(raw: &[u8], decoded: &str) -> RawName {
    if decoded.as_bytes() == raw || Codepage::Cp437.decode(raw) == decoded {
        RawName::Bytes(raw.to_vec())
    } else {
        RawName::Text(decoded.to_string())
    }
}

fn map_zip_error(archive: &Path, entry: Option<String>, e: ZipError) -> Error {
    match e {
        ZipError::UnsupportedArchive(msg) if msg == ZipError::PASSWORD_REQUIRED => {
            Error::Encrypted {
                archive: archive.to_path_buf(),
                entry,
            }
        }
        ZipError::Io(e) if entry.is_none() => Error::from_archive_io(archive, e),
        ZipError::UnsupportedArchive(msg) if entry.is_none() => Error::UnsupportedFormat {
            path: archive.to_path_buf(),
            detail: msg.to_string(),
        },
        other => Error::Corrupt {
            archive: archive.to_path_buf(),
            entry,
            detail: other.to_string(),
        },
    }
}
