//! Undo log for one extraction session.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// One step that rollback may need to undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerRecord {
    /// A target directory this session created.
    CreatedDir(PathBuf),
    /// An archive whose contents were extracted. Deleted on success unless
    /// the originals are kept; never restored by rollback.
    ConsumedArchive(PathBuf),
}

/// What a rollback managed to undo.
#[derive(Debug, Default)]
pub struct RollbackReport {
    /// Directories removed, in removal order.
    pub removed: Vec<PathBuf>,
    /// Directories that could not be removed.
    pub failures: Vec<(PathBuf, io::Error)>,
}

impl RollbackReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Append-only record of everything a session produced.
#[derive(Debug, Default)]
pub struct RollbackLedger {
    records: Vec<LedgerRecord>,
}

impl RollbackLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dir(&mut self, dir: impl Into<PathBuf>) {
        self.records.push(LedgerRecord::CreatedDir(dir.into()));
    }

    pub fn record_consumed(&mut self, archive: impl Into<PathBuf>) {
        self.records.push(LedgerRecord::ConsumedArchive(archive.into()));
    }

    pub fn records(&self) -> &[LedgerRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Created directories, oldest first.
    pub fn created_dirs(&self) -> impl Iterator<Item = &Path> {
        self.records.iter().filter_map(|r| match r {
            LedgerRecord::CreatedDir(p) => Some(p.as_path()),
            LedgerRecord::ConsumedArchive(_) => None,
        })
    }

    /// Consumed archives, oldest first.
    pub fn consumed_archives(&self) -> impl Iterator<Item = &Path> {
        self.records.iter().filter_map(|r| match r {
            LedgerRecord::ConsumedArchive(p) => Some(p.as_path()),
            LedgerRecord::CreatedDir(_) => None,
        })
    }

    /// Remove every created directory, newest first.
    ///
    /// Best effort: a failure is collected and the remaining records are
    /// still processed. A directory already gone (e.g. removed together with
    /// its parent) counts as removed.
    pub fn rollback(&mut self) -> RollbackReport {
        let mut report = RollbackReport::default();

        while let Some(record) = self.records.pop() {
            let LedgerRecord::CreatedDir(dir) = record else {
                continue;
            };
            match fs::remove_dir_all(&dir) {
                Ok(()) => {
                    debug!(dir = %dir.display(), "rolled back");
                    report.removed.push(dir);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => report.removed.push(dir),
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "rollback failed");
                    report.failures.push((dir, e));
                }
            }
        }

        report
    }

    /// Forget everything; the session succeeded.
    pub fn discard(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn rollback_removes_in_reverse_order() {
        let root = tempdir().unwrap();
        let outer = root.path().join("outer");
        let inner = outer.join("inner");
        fs::create_dir(&outer).unwrap();
        fs::create_dir(&inner).unwrap();
        fs::write(inner.join("f.txt"), b"x").unwrap();

        let mut ledger = RollbackLedger::new();
        ledger.record_dir(&outer);
        ledger.record_consumed(root.path().join("a.zip"));
        ledger.record_dir(&inner);

        let report = ledger.rollback();
        assert!(report.is_clean());
        assert_eq!(report.removed, vec![inner, outer.clone()]);
        assert!(!outer.exists());
        assert!(ledger.is_empty());
    }

    #[test]
    fn discard_keeps_files() {
        let root = tempdir().unwrap();
        let dir = root.path().join("keep");
        fs::create_dir(&dir).unwrap();

        let mut ledger = RollbackLedger::new();
        ledger.record_dir(&dir);
        assert_eq!(ledger.created_dirs().count(), 1);
        ledger.discard();

        assert!(ledger.rollback().removed.is_empty());
        assert!(dir.exists());
    }
}
