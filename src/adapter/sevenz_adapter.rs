//! 7z archive adapter.
//!
//! Provides read-only extraction of 7z archives with the same guarantees
//! as ZIP and TAR.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use sevenz_rust::{Password, SevenZReader};

use super::{ArchiveReader, EntryVisitor};
use crate::entry::{EntryInfo, EntryKind, RawName};
use crate::error::Error;
use crate::format::ArchiveFormat;

/// Adapter for 7z archives.
///
/// Uses the `sevenz-rust` crate for decompression. Entry names in 7z are
/// stored as UTF-16, so they reach the filename decoder as trusted text.
/// Archives with encrypted headers cannot even be listed without a password;
/// they open successfully but report [`ArchiveReader::is_encrypted`].
pub struct SevenZAdapter {
    path: PathBuf,
    encrypted: bool,
}

impl SevenZAdapter {
    /// Open a 7z file from a path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        // Surface permission problems as I/O errors rather than corruption.
        File::open(path.as_ref())?;

        let mut adapter = Self {
            path: path.as_ref().to_path_buf(),
            encrypted: false,
        };
        match adapter.reader() {
            Ok(_) => {}
            Err(Error::Encrypted { .. }) => adapter.encrypted = true,
            Err(e) => return Err(e),
        }
        Ok(adapter)
    }

    fn reader(&self) -> Result<SevenZReader<File>, Error> {
        SevenZReader::open(&self.path, Password::empty()).map_err(|e| map_7z_error(&self.path, e))
    }

    fn ensure_readable(&self) -> Result<(), Error> {
        if self.encrypted {
            return Err(Error::Encrypted {
                archive: self.path.clone(),
                entry: None,
            });
        }
        Ok(())
    }
}

impl ArchiveReader for SevenZAdapter {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::SevenZ
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn is_encrypted(&mut self) -> Result<bool, Error> {
        Ok(self.encrypted)
    }

    fn list_entries(&mut self) -> Result<Vec<EntryInfo>, Error> {
        self.ensure_readable()?;
        let reader = self.reader()?;
        Ok(reader.archive().files.iter().map(entry_info).collect())
    }

    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> Result<(), Error> {
        self.ensure_readable()?;
        let mut reader = self.reader()?;

        // Visitor errors cannot travel through sevenz-rust's error type, so
        // park them here and stop the walk.
        let mut failure: Option<Error> = None;
        let result = reader.for_each_entries(|entry, data| {
            let info = entry_info(entry);
            let outcome = if info.is_file() {
                visit(&info, Ok(&mut *data))
            } else {
                visit(&info, Ok(&mut io::empty()))
            };

            match outcome {
                Ok(()) => {
                    // Keep the solid stream aligned even if the visitor skipped the data.
                    io::copy(data, &mut io::sink())?;
                    Ok(true)
                }
                Err(e) => {
                    failure = Some(e);
                    Ok(false)
                }
            }
        });

        if let Some(e) = failure {
            return Err(e);
        }
        result.map_err(|e| map_7z_error(&self.path, e))
    }
}

fn entry_info(entry: &sevenz_rust::SevenZArchiveEntry) -> EntryInfo {
    EntryInfo {
        name: RawName::Text(entry.name().to_string()),
        size: entry.size(),
        kind: if entry.is_directory() {
            EntryKind::Directory
        } else {
            EntryKind::File
        },
        mode: None, // 7z doesn't preserve Unix permissions
        encrypted: false,
    }
}

fn map_7z_error(archive: &Path, e: sevenz_rust::Error) -> Error {
    match e {
        sevenz_rust::Error::PasswordRequired | sevenz_rust::Error::MaybeBadPassword(_) => {
            Error::Encrypted {
                archive: archive.to_path_buf(),
                entry: None,
            }
        }
        other => Error::corrupt(archive, other),
    }
}
