//! Per-entry extraction pipeline.
//!
//! Each entry goes through: cancellation checkpoint, name decoding, path
//! guard, then the write. Failures that only concern one entry are reported
//! and skipped; everything else stops the archive.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::adapter::ArchiveReader;
use crate::cancel::CancellationToken;
use crate::decode::FilenameDecoder;
use crate::entry::{EntryInfo, EntryKind};
use crate::error::{Error, ErrorScope};
use crate::guard::PathGuard;
use crate::progress::{ProgressEvent, ProgressSink};

/// Statistics for one unpacked archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpackReport {
    /// Number of files successfully extracted.
    pub files_extracted: usize,
    /// Number of directory entries created.
    pub dirs_created: usize,
    /// Total bytes written.
    pub bytes_written: u64,
    /// Number of entries skipped (traversal, encrypted, links, bad data).
    pub entries_skipped: usize,
}

/// Shared collaborators for unpacking archives.
pub struct Unpacker<'a> {
    pub decoder: &'a FilenameDecoder,
    pub token: &'a CancellationToken,
    pub sink: &'a dyn ProgressSink,
}

impl Unpacker<'_> {
    /// Extract every entry of `reader` into `target`, which must exist.
    pub fn unpack(
        &self,
        reader: &mut dyn ArchiveReader,
        target: &Path,
    ) -> Result<UnpackReport, Error> {
        let guard = PathGuard::new(target)?;
        let archive = reader.path().to_path_buf();
        let mut report = UnpackReport::default();

        reader.for_each_entry(&mut |info, data| {
            self.token.checkpoint()?;

            match self.unpack_entry(&guard, &archive, info, data, &mut report) {
                Ok(()) => Ok(()),
                Err(e) if e.scope() == ErrorScope::Entry => {
                    let entry = self.decoder.decode(&info.name);
                    warn!(archive = %archive.display(), %entry, error = %e, "skipping entry");
                    report.entries_skipped += 1;
                    self.sink.emit(ProgressEvent::EntrySkipped {
                        archive: archive.clone(),
                        entry,
                        reason: e.to_string(),
                    });
                    Ok(())
                }
                Err(e) => Err(e),
            }
        })?;

        Ok(report)
    }

    fn unpack_entry(
        &self,
        guard: &PathGuard,
        archive: &Path,
        info: &EntryInfo,
        data: Result<&mut dyn Read, Error>,
        report: &mut UnpackReport,
    ) -> Result<(), Error> {
        let data = data?;
        let name = self.decoder.decode(&info.name);
        let safe_path = guard.resolve(&name)?;

        if info.encrypted {
            return Err(Error::Encrypted {
                archive: archive.to_path_buf(),
                entry: Some(name),
            });
        }

        if let Some(path) = find_conflict(guard.root(), &safe_path, info.is_dir()) {
            return Err(Error::EntryConflict { entry: name, path });
        }

        match &info.kind {
            EntryKind::Directory => {
                fs::create_dir_all(&safe_path)?;
                report.dirs_created += 1;
            }
            EntryKind::File => {
                if let Some(parent) = safe_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                // Never write through a link left by an earlier entry.
                if let Ok(m) = fs::symlink_metadata(&safe_path) {
                    if m.file_type().is_symlink() {
                        fs::remove_file(&safe_path)?;
                    }
                }

                let mut outfile = File::create(&safe_path)?;
                let written = match copy_entry(data, &mut outfile) {
                    Ok(n) => n,
                    Err(CopyError::Read(e)) => {
                        drop(outfile);
                        let _ = fs::remove_file(&safe_path);
                        return Err(Error::Corrupt {
                            archive: archive.to_path_buf(),
                            entry: Some(name),
                            detail: e.to_string(),
                        });
                    }
                    Err(CopyError::Write(e)) => return Err(e.into()),
                };

                #[cfg(unix)]
                if let Some(mode) = info.mode {
                    use std::os::unix::fs::PermissionsExt;
                    let safe_mode = mode & 0o0777;
                    fs::set_permissions(&safe_path, fs::Permissions::from_mode(safe_mode))?;
                }

                debug!(entry = %name, bytes = written, "extracted");
                report.bytes_written += written;
                report.files_extracted += 1;
            }
            EntryKind::Symlink { .. } => {
                return Err(Error::UnsupportedEntry {
                    entry: name,
                    kind: "link".to_string(),
                });
            }
            EntryKind::Other { kind } => {
                return Err(Error::UnsupportedEntry {
                    entry: name,
                    kind: kind.clone(),
                });
            }
        }

        Ok(())
    }
}

/// First path that an entry of the given type cannot be created through:
/// a non-directory among the ancestors below `root`, or `path` itself
/// existing with the other type.
fn find_conflict(root: &Path, path: &Path, is_dir: bool) -> Option<PathBuf> {
    let ancestors = path
        .ancestors()
        .skip(1)
        .take_while(|a| a.starts_with(root) && *a != root);
    for ancestor in ancestors {
        if let Ok(m) = fs::symlink_metadata(ancestor) {
            if !m.is_dir() {
                return Some(ancestor.to_path_buf());
            }
        }
    }

    match fs::symlink_metadata(path) {
        Ok(m) if m.is_dir() != is_dir && !m.file_type().is_symlink() => Some(path.to_path_buf()),
        _ => None,
    }
}

enum CopyError {
    Read(io::Error),
    Write(io::Error),
}

/// Copy entry data, keeping read failures (bad archive data) apart from
/// write failures (full disk, permissions).
fn copy_entry<R: Read + ?Sized, W: Write>(reader: &mut R, writer: &mut W) -> Result<u64, CopyError> {
    let mut total = 0u64;
    let mut buf = [0u8; 8192];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyError::Read(e)),
        };
        writer.write_all(&buf[..n]).map_err(CopyError::Write)?;
        total += n as u64;
    }

    writer.flush().map_err(CopyError::Write)?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::InvalidData, "bad crc"))
        }
    }

    #[test]
    fn conflicts_with_earlier_entries() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("a"), b"file").unwrap();
        fs::create_dir(root.path().join("d")).unwrap();

        let nested = root.path().join("a").join("b.txt");
        assert_eq!(
            find_conflict(root.path(), &nested, false),
            Some(root.path().join("a"))
        );
        assert_eq!(
            find_conflict(root.path(), &root.path().join("d"), false),
            Some(root.path().join("d"))
        );
        assert_eq!(
            find_conflict(root.path(), &root.path().join("a"), true),
            Some(root.path().join("a"))
        );
        assert_eq!(find_conflict(root.path(), &root.path().join("d").join("x"), false), None);
        assert_eq!(find_conflict(root.path(), &root.path().join("a"), false), None);
    }

    #[test]
    fn copy_separates_read_errors() {
        let mut out = Vec::new();
        assert!(matches!(
            copy_entry(&mut Failing, &mut out),
            Err(CopyError::Read(_))
        ));
        assert_eq!(copy_entry(&mut &b"hello"[..], &mut out).ok(), Some(5));
        assert_eq!(out, b"hello");
    }
}
