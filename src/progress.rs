//! Progress reporting.
//!
//! A session reports what it is doing through a [`ProgressSink`]. Sinks are
//! fire-and-forget: a disconnected receiver never fails the job.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::Sender;

/// One user-facing progress message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Started extracting a top-level archive.
    Extracting { archive: PathBuf },
    /// Started extracting an archive found inside a previous extraction.
    ExtractingNested { archive: PathBuf },
    /// A redundant wrapper directory was collapsed.
    Flattened { dir: PathBuf, inner: String },
    /// One entry was not written.
    EntrySkipped {
        archive: PathBuf,
        entry: String,
        reason: String,
    },
    /// One archive was not extracted; the batch goes on.
    ArchiveSkipped { archive: PathBuf, reason: String },
    /// The job was stopped; rollback follows.
    Cancelled,
    /// The job failed; rollback follows.
    Failed { reason: String },
    /// Rollback removed a directory.
    RolledBack { path: PathBuf },
    /// Rollback could not remove a directory.
    RollbackFailed { path: PathBuf, error: String },
    /// The job is over.
    Idle,
}

impl ProgressEvent {
    /// Human-readable text. Empty for [`ProgressEvent::Idle`].
    pub fn message(&self) -> String {
        self.to_string()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extracting { archive } => write!(f, "Extracting {}", file_name(archive)),
            Self::ExtractingNested { archive } => {
                write!(f, "Extracting nested archive {}", file_name(archive))
            }
            Self::Flattened { dir, inner } => {
                write!(f, "Flattened {} into {}", inner, file_name(dir))
            }
            Self::EntrySkipped {
                archive,
                entry,
                reason,
            } => write!(
                f,
                "Skipped entry {} in {}: {}",
                entry,
                file_name(archive),
                reason
            ),
            Self::ArchiveSkipped { archive, reason } => {
                write!(f, "Skipped {}: {}", file_name(archive), reason)
            }
            Self::Cancelled => write!(f, "Cancelled, rolling back"),
            Self::Failed { reason } => write!(f, "Failed: {}", reason),
            Self::RolledBack { path } => write!(f, "Removed {}", path.display()),
            Self::RollbackFailed { path, error } => {
                write!(f, "Could not remove {}: {}", path.display(), error)
            }
            Self::Idle => Ok(()),
        }
    }
}

/// Receiver of progress events.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

impl ProgressSink for Sender<ProgressEvent> {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.send(event);
    }
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(&event)
    }
}

/// Point-in-time view of a running job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Latest progress message.
    pub current: String,
    pub archives_extracted: usize,
    pub dirs_created: usize,
}

/// Sink that keeps a [`Snapshot`] up to date and forwards to another sink.
pub struct SnapshotSink<S> {
    inner: S,
    state: Arc<Mutex<Snapshot>>,
}

impl<S: ProgressSink> SnapshotSink<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            state: Arc::default(),
        }
    }

    /// Shared handle to the snapshot, readable from any thread.
    pub fn handle(&self) -> SnapshotHandle {
        SnapshotHandle(Arc::clone(&self.state))
    }
}

impl<S: ProgressSink> ProgressSink for SnapshotSink<S> {
    fn emit(&self, event: ProgressEvent) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match &event {
                ProgressEvent::Extracting { .. } | ProgressEvent::ExtractingNested { .. } => {
                    state.archives_extracted += 1;
                    state.dirs_created += 1;
                }
                ProgressEvent::RolledBack { .. } => {
                    state.dirs_created = state.dirs_created.saturating_sub(1);
                }
                _ => {}
            }
            state.current = event.message();
        }
        self.inner.emit(event);
    }
}

/// Cloneable read access to a [`SnapshotSink`]'s state.
#[derive(Debug, Clone)]
pub struct SnapshotHandle(Arc<Mutex<Snapshot>>);

impl SnapshotHandle {
    pub fn get(&self) -> Snapshot {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
