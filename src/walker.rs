//! Nested archive discovery.
//!
//! After an archive is extracted, its output may contain further archives.
//! The walker keeps an explicit stack of directories to examine and descends
//! until no unvisited archive remains anywhere below the starting point.

use std::collections::{HashSet, VecDeque};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::adapter::ArchiveOpener;
use crate::error::{Error, ErrorScope};
use crate::flatten;
use crate::ledger::RollbackLedger;
use crate::progress::ProgressEvent;
use crate::resolve;
use crate::session::Options;
use crate::unpack::Unpacker;

/// Running totals for one session.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Tally {
    pub archives_extracted: usize,
    pub archives_skipped: usize,
    pub files_extracted: usize,
    pub entries_skipped: usize,
    pub bytes_written: u64,
}

/// One directory whose archives still need handling.
struct Frame {
    dir: PathBuf,
    /// Nesting level of the archive that produced `dir` (0 = top level).
    depth: usize,
    /// Archives that produced `dir`, outermost first.
    lineage: Vec<PathBuf>,
    pending: VecDeque<PathBuf>,
    /// Nested archive extracted into `dir`; deleted once `dir` is done.
    consumed: Option<PathBuf>,
}

pub(crate) struct Walker<'a> {
    opener: &'a dyn ArchiveOpener,
    unpacker: Unpacker<'a>,
    options: &'a Options,
    visited: HashSet<PathBuf>,
    pub tally: Tally,
}

impl<'a> Walker<'a> {
    pub fn new(opener: &'a dyn ArchiveOpener, unpacker: Unpacker<'a>, options: &'a Options) -> Self {
        Self {
            opener,
            unpacker,
            options,
            visited: HashSet::new(),
            tally: Tally::default(),
        }
    }

    pub fn opener(&self) -> &'a dyn ArchiveOpener {
        self.opener
    }

    /// Record `archive` as handled. Returns `false` if it already was.
    pub fn mark_visited(&mut self, archive: &Path) -> bool {
        self.visited.insert(archive.to_path_buf())
    }

    /// Extract one archive into a fresh directory under `parent`.
    ///
    /// On an archive-level failure the partially filled directory is removed
    /// again before the error is returned.
    pub fn extract(
        &mut self,
        archive: &Path,
        parent: &Path,
        nested: bool,
        ledger: &mut RollbackLedger,
    ) -> Result<PathBuf, Error> {
        let format = self
            .opener
            .detect(archive)
            .ok_or_else(|| Error::UnsupportedFormat {
                path: archive.to_path_buf(),
                detail: "unrecognized file extension".to_string(),
            })?;
        let mut reader = self.opener.open(archive, format)?;
        let layout = resolve::probe(reader.as_mut(), self.unpacker.decoder)?;

        let base = resolve::base_name(archive);
        let target = resolve::create_unique_dir(parent, &base)?;
        ledger.record_dir(&target);
        info!(archive = %archive.display(), target = %target.display(), %format, ?layout, "extracting");

        let archive_buf = archive.to_path_buf();
        self.unpacker.sink.emit(if nested {
            ProgressEvent::ExtractingNested {
                archive: archive_buf,
            }
        } else {
            ProgressEvent::Extracting {
                archive: archive_buf,
            }
        });

        let report = match self.unpacker.unpack(reader.as_mut(), &target) {
            Ok(report) => report,
            Err(e) => {
                if e.scope() != ErrorScope::Batch {
                    if let Err(cleanup) = fs::remove_dir_all(&target) {
                        warn!(dir = %target.display(), error = %cleanup, "could not remove partial output");
                    }
                }
                return Err(e);
            }
        };
        drop(reader);

        self.tally.archives_extracted += 1;
        self.tally.files_extracted += report.files_extracted;
        self.tally.entries_skipped += report.entries_skipped;
        self.tally.bytes_written += report.bytes_written;
        ledger.record_consumed(archive);

        if self.options.flatten_single_folder {
            match flatten::flatten_single_folder(&target) {
                Ok(Some(inner)) => self.unpacker.sink.emit(ProgressEvent::Flattened {
                    dir: target.clone(),
                    inner,
                }),
                Ok(None) => {}
                // Unmoved children stay under the restored wrapper folder.
                Err(e) => warn!(dir = %target.display(), error = %e, "could not flatten"),
            }
        }

        Ok(target)
    }

    /// Extract every archive found below `root`, at any depth.
    ///
    /// `lineage` lists the archives that produced `root`. Archive-level
    /// failures are reported and skipped; batch-level errors propagate.
    pub fn walk(
        &mut self,
        root: &Path,
        lineage: Vec<PathBuf>,
        ledger: &mut RollbackLedger,
    ) -> Result<(), Error> {
        let mut stack = vec![Frame {
            dir: root.to_path_buf(),
            depth: 0,
            lineage,
            pending: VecDeque::new(),
            consumed: None,
        }];

        while let Some(frame) = stack.last_mut() {
            if frame.pending.is_empty() {
                let found = self.scan(&frame.dir)?;
                if found.is_empty() {
                    if let Some(done) = stack.pop() {
                        self.finish(done);
                    }
                    continue;
                }
                frame.pending = found.into();
            }

            let Some(archive) = frame.pending.pop_front() else {
                continue;
            };
            if !self.mark_visited(&archive) {
                continue;
            }

            let depth = frame.depth + 1;
            let mut lineage = frame.lineage.clone();

            self.unpacker.token.checkpoint()?;
            match self.descend(&archive, depth, &lineage, ledger) {
                Ok(target) => {
                    lineage.push(archive.clone());
                    stack.push(Frame {
                        dir: target,
                        depth,
                        lineage,
                        pending: VecDeque::new(),
                        consumed: Some(archive),
                    });
                }
                Err(e) if e.scope() == ErrorScope::Batch => return Err(e),
                Err(e) => self.skip(&archive, &e),
            }
        }

        Ok(())
    }

    /// Report an archive that could not be extracted.
    pub fn skip(&mut self, archive: &Path, error: &Error) {
        warn!(archive = %archive.display(), %error, "skipping archive");
        self.tally.archives_skipped += 1;
        self.unpacker.sink.emit(ProgressEvent::ArchiveSkipped {
            archive: archive.to_path_buf(),
            reason: error.to_string(),
        });
    }

    fn descend(
        &mut self,
        archive: &Path,
        depth: usize,
        lineage: &[PathBuf],
        ledger: &mut RollbackLedger,
    ) -> Result<PathBuf, Error> {
        let limit = self.options.max_nesting_depth;
        if depth > limit {
            return Err(Error::NestingTooDeep {
                archive: archive.to_path_buf(),
                depth,
                limit,
            });
        }

        for ancestor in lineage {
            if same_contents(ancestor, archive)? {
                return Err(Error::Cyclic {
                    archive: archive.to_path_buf(),
                });
            }
        }

        let parent = archive.parent().unwrap_or_else(|| Path::new("."));
        self.extract(archive, parent, true, ledger)
    }

    /// Unvisited archives below `dir`, shallowest first, then by path.
    fn scan(&self, dir: &Path) -> Result<Vec<PathBuf>, Error> {
        let mut found: Vec<(usize, PathBuf)> = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if self.visited.contains(path) || self.opener.detect(path).is_none() {
                continue;
            }
            found.push((entry.depth(), entry.into_path()));
        }

        found.sort();
        Ok(found.into_iter().map(|(_, path)| path).collect())
    }

    fn finish(&self, frame: Frame) {
        let Some(consumed) = frame.consumed else {
            return;
        };
        if self.options.keep_original_archives {
            return;
        }
        match fs::remove_file(&consumed) {
            Ok(()) => debug!(archive = %consumed.display(), "removed nested archive"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(archive = %consumed.display(), error = %e, "could not remove nested archive"),
        }
    }
}

/// Byte-for-byte comparison. A missing file equals nothing.
fn same_contents(a: &Path, b: &Path) -> io::Result<bool> {
    let len = |p: &Path| match fs::metadata(p) {
        Ok(m) => Ok(Some(m.len())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    };
    match (len(a)?, len(b)?) {
        (Some(x), Some(y)) if x == y => {}
        _ => return Ok(false),
    }

    let mut ra = BufReader::new(File::open(a)?);
    let mut rb = BufReader::new(File::open(b)?);
    let mut ba = [0u8; 8192];
    let mut bb = [0u8; 8192];
    loop {
        let n = read_full(&mut ra, &mut ba)?;
        let m = read_full(&mut rb, &mut bb)?;
        if ba[..n] != bb[..m] {
            return Ok(false);
        }
        if n == 0 {
            return Ok(true);
        }
    }
}

fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn compares_contents_not_names() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.zip");
        let b = dir.path().join("b.zip");
        let c = dir.path().join("c.zip");
        fs::write(&a, b"same bytes").unwrap();
        fs::write(&b, b"same bytes").unwrap();
        fs::write(&c, b"other byte").unwrap();

        assert!(same_contents(&a, &b).unwrap());
        assert!(!same_contents(&a, &c).unwrap());
        assert!(!same_contents(&a, &dir.path().join("missing.zip")).unwrap());
    }
}
