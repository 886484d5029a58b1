//! TAR archive adapter.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;

use super::{ArchiveReader, EntryVisitor};
use crate::entry::{EntryInfo, EntryKind, RawName};
use crate::error::Error;
use crate::format::ArchiveFormat;

/// Adapter for TAR archives.
///
/// Supports plain `.tar`, gzip-compressed `.tar.gz` / `.tgz` and
/// bzip2-compressed `.tar.bz2` / `.tbz2` files.
///
/// Unlike ZIP, TAR is a sequential format without a central directory.
/// This means:
/// - Entries must be read in order
/// - Listing reads (and decompresses) the whole stream
/// - Every pass reopens the file from the start
pub struct TarAdapter {
    path: PathBuf,
    format: ArchiveFormat,
}

impl TarAdapter {
    /// Open a TAR file. `format` selects the compression layer.
    pub fn open<P: AsRef<Path>>(path: P, format: ArchiveFormat) -> Result<Self, Error> {
        let path = path.as_ref();
        if !matches!(
            format,
            ArchiveFormat::Tar | ArchiveFormat::TarGz | ArchiveFormat::TarBz2
        ) {
            return Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
                detail: format!("{} is not a tar format", format),
            });
        }

        let adapter = Self {
            path: path.to_path_buf(),
            format,
        };
        // Fail early on unreadable files and broken compression headers.
        let mut archive = adapter.stream()?;
        archive
            .entries()
            .map_err(|e| Error::from_archive_io(&adapter.path, e))?
            .next()
            .transpose()
            .map_err(|e| Error::from_archive_io(&adapter.path, e))?;
        Ok(adapter)
    }

    /// A fresh tar stream positioned at the first entry.
    fn stream(&self) -> Result<tar::Archive<Box<dyn Read>>, Error> {
        let file = BufReader::new(File::open(&self.path)?);
        let reader: Box<dyn Read> = match self.format {
            ArchiveFormat::TarGz => Box::new(GzDecoder::new(file)),
            ArchiveFormat::TarBz2 => Box::new(BzDecoder::new(file)),
            _ => Box::new(file),
        };
        Ok(tar::Archive::new(reader))
    }

    /// Walk entries, handing each one with its live data stream to `f`.
    fn walk<F>(&self, mut f: F) -> Result<(), Error>
    where
        F: FnMut(EntryInfo, &mut dyn Read) -> Result<(), Error>,
    {
        let mut archive = self.stream()?;
        let entries = archive
            .entries()
            .map_err(|e| Error::from_archive_io(&self.path, e))?;

        for entry_result in entries {
            let mut entry = entry_result.map_err(|e| Error::from_archive_io(&self.path, e))?;
            let header = entry.header();
            let entry_type = header.entry_type();

            // Extension headers carry metadata for other entries.
            if matches!(
                entry_type,
                tar::EntryType::XGlobalHeader | tar::EntryType::XHeader
            ) {
                continue;
            }

            let kind = match entry_type {
                tar::EntryType::Regular | tar::EntryType::Continuous => EntryKind::File,
                tar::EntryType::Directory => EntryKind::Directory,
                tar::EntryType::Symlink | tar::EntryType::Link => {
                    let target = entry
                        .link_name_bytes()
                        .map(|b| String::from_utf8_lossy(&b).into_owned())
                        .unwrap_or_default();
                    EntryKind::Symlink { target }
                }
                other => EntryKind::Other {
                    kind: entry_type_name(other),
                },
            };

            let info = EntryInfo {
                name: RawName::Bytes(entry.path_bytes().into_owned()),
                size: header
                    .size()
                    .map_err(|e| Error::from_archive_io(&self.path, e))?,
                mode: header.mode().ok(),
                kind,
                encrypted: false,
            };

            f(info, &mut entry)?;
        }

        Ok(())
    }
}

impl ArchiveReader for TarAdapter {
    fn format(&self) -> ArchiveFormat {
        self.format
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn is_encrypted(&mut self) -> Result<bool, Error> {
        Ok(false)
    }

    fn list_entries(&mut self) -> Result<Vec<EntryInfo>, Error> {
        let mut entries = Vec::new();
        self.walk(|info, _| {
            entries.push(info);
            Ok(())
        })?;
        Ok(entries)
    }

    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> Result<(), Error> {
        self.walk(|info, data| {
            if info.is_file() {
                visit(&info, Ok(data))
            } else {
                visit(&info, Ok(&mut io::empty()))
            }
        })
    }
}

/// Convert TAR entry type to a human-readable name.
fn entry_type_name(entry_type: tar::EntryType) -> String {
    match entry_type {
        tar::EntryType::Char => "character device".into(),
        tar::EntryType::Block => "block device".into(),
        tar::EntryType::Fifo => "fifo (named pipe)".into(),
        tar::EntryType::GNUSparse => "GNU sparse file".into(),
        _ => format!("unknown (0x{:02x})", entry_type.as_byte()),
    }
}
