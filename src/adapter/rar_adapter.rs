//! RAR archive adapter (requires the `rar` feature).

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use unrar::error::{Code, UnrarError};
use unrar::{Archive, FileHeader};

use super::{ArchiveReader, EntryVisitor};
use crate::entry::{EntryInfo, EntryKind, RawName};
use crate::error::Error;
use crate::format::ArchiveFormat;

/// Adapter for RAR archives, backed by the bundled unrar library.
///
/// unrar only hands out whole entries, so each file is buffered in memory
/// before it reaches the engine.
pub struct RarAdapter {
    path: PathBuf,
    encrypted: bool,
}

impl RarAdapter {
    /// Open a RAR file from a path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        File::open(path)?;

        let encrypted = match Archive::new(path).open_for_listing() {
            Ok(_) => false,
            Err(e) => match map_rar_error(path, None, e) {
                Error::Encrypted { .. } => true,
                other => return Err(other),
            },
        };
        Ok(Self {
            path: path.to_path_buf(),
            encrypted,
        })
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

impl ArchiveReader for RarAdapter {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Rar
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn is_encrypted(&mut self) -> Result<bool, Error> {
        Ok(self.encrypted)
    }

    fn list_entries(&mut self) -> Result<Vec<EntryInfo>, Error> {
        self.ensure_readable()?;
        let archive = Archive::new(&self.path)
            .open_for_listing()
            .map_err(|e| map_rar_error(&self.path, None, e))?;

        let mut entries = Vec::new();
        for header in archive {
            let header = header.map_err(|e| map_rar_error(&self.path, None, e))?;
            entries.push(entry_info(&header));
        }
        Ok(entries)
    }

    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> Result<(), Error> {
        self.ensure_readable()?;
        let mut archive = Archive::new(&self.path)
            .open_for_processing()
            .map_err(|e| map_rar_error(&self.path, None, e))?;

        loop {
            let Some(header) = archive
                .read_header()
                .map_err(|e| map_rar_error(&self.path, None, e))?
            else {
                break;
            };
            let info = entry_info(header.entry());

            archive = if info.is_file() && !info.encrypted {
                let (data, rest) = header.read().map_err(|e| {
                    map_rar_error(&self.path, Some(info.name.lossy()), e)
                })?;
                visit(&info, Ok(&mut data.as_slice()))?;
                rest
            } else {
                visit(&info, Ok(&mut io::empty()))?;
                header
                    .skip()
                    .map_err(|e| map_rar_error(&self.path, None, e))?
            };
        }
        Ok(())
    }
}

fn entry_info(header: &FileHeader) -> EntryInfo {
    EntryInfo {
        name: RawName::Text(header.filename.to_string_lossy().into_owned()),
        size: header.unpacked_size,
        kind: if header.is_directory() {
            EntryKind::Directory
        } else {
            EntryKind::File
        },
        mode: None,
        encrypted: header.is_encrypted(),
    }
}

fn map_rar_error(archive: &Path, entry: Option<String>, e: UnrarError) -> Error {
    match e.code {
        Code::MissingPassword | Code::BadPassword => Error::Encrypted {
            archive: archive.to_path_buf(),
            entry: None,
        },
        Code::UnknownFormat => Error::UnsupportedFormat {
            path: archive.to_path_buf(),
            detail: e.to_string(),
        },
        _ => Error::Corrupt {
            archive: archive.to_path_buf(),
            entry,
            detail: e.to_string(),
        },
    }
}
