use std::path::PathBuf;

/// How far an error propagates through a batch.
///
/// Entry-level errors skip one entry, archive-level errors skip one archive
/// (or fail the batch when there is only one top-level archive), batch-level
/// errors abort the whole run and trigger rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    Entry,
    Archive,
    Batch,
}

/// Errors that can occur during nested extraction.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in minor versions without breaking existing code. Always include a
/// catch-all `_ =>` arm when matching.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// File is not a container this build can read.
    #[error("unsupported archive format '{}': {detail}", .path.display())]
    UnsupportedFormat { path: PathBuf, detail: String },

    /// Archive (or one of its entries) could not be read.
    #[error("archive '{}' is corrupt{}: {detail}", .archive.display(), entry_suffix(.entry))]
    Corrupt {
        archive: PathBuf,
        entry: Option<String>,
        detail: String,
    },

    /// Archive or entry requires a password.
    #[error(
        "archive '{}'{} is encrypted (encrypted archives not supported)",
        .archive.display(),
        entry_suffix(.entry)
    )]
    Encrypted {
        archive: PathBuf,
        entry: Option<String>,
    },

    /// Entry name escapes the target directory (Zip Slip).
    #[error("path '{entry}' escapes destination: {detail}")]
    PathTraversal { entry: String, detail: String },

    /// Entry name is unusable as a path.
    #[error("invalid filename '{entry}': {reason}")]
    InvalidName { entry: String, reason: String },

    /// Entry type that is never written (device files, fifos, links).
    #[error("entry '{entry}' has unsupported type '{kind}'")]
    UnsupportedEntry { entry: String, kind: String },

    /// Entry clashes with a path an earlier entry created with another type
    /// (e.g. a file `a` followed by `a/b.txt`).
    #[error("entry '{entry}' conflicts with existing '{}'", .path.display())]
    EntryConflict { entry: String, path: PathBuf },

    /// Nested archive is a byte-identical copy of one of its ancestors.
    #[error("skipped cyclic archive '{}'", .archive.display())]
    Cyclic { archive: PathBuf },

    /// Nested archive sits deeper than the configured nesting bound.
    #[error("archive '{}' is nested {depth} levels deep (limit: {limit})", .archive.display())]
    NestingTooDeep {
        archive: PathBuf,
        depth: usize,
        limit: usize,
    },

    /// The user asked the job to stop.
    #[error("extraction cancelled")]
    Cancelled,

    /// Destination directory does not exist.
    #[error("destination directory '{}' does not exist", .path.display())]
    DestinationNotFound { path: PathBuf },

    /// Folder input contains no supported archive.
    #[error("no supported archives found in '{}'", .folder.display())]
    NoArchivesFound { folder: PathBuf },

    /// Unknown codepage label for entry names.
    #[error("unknown name encoding '{label}'")]
    InvalidEncoding { label: String },

    /// IO error while writing output (disk full, permission denied, ...).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn entry_suffix(entry: &Option<String>) -> String {
    match entry {
        Some(name) => format!(" (entry '{}')", name),
        None => String::new(),
    }
}

impl Error {
    /// Classify how far this error propagates.
    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::Corrupt { entry: Some(_), .. }
            | Self::Encrypted { entry: Some(_), .. }
            | Self::PathTraversal { .. }
            | Self::InvalidName { .. }
            | Self::UnsupportedEntry { .. }
            | Self::EntryConflict { .. } => ErrorScope::Entry,
            Self::UnsupportedFormat { .. }
            | Self::Corrupt { entry: None, .. }
            | Self::Encrypted { entry: None, .. }
            | Self::Cyclic { .. }
            | Self::NestingTooDeep { .. } => ErrorScope::Archive,
            Self::Cancelled
            | Self::DestinationNotFound { .. }
            | Self::NoArchivesFound { .. }
            | Self::InvalidEncoding { .. }
            | Self::Io(_) => ErrorScope::Batch,
        }
    }

    /// Shorthand for an archive-level corruption error.
    pub(crate) fn corrupt(archive: impl Into<PathBuf>, detail: impl ToString) -> Self {
        Self::Corrupt {
            archive: archive.into(),
            entry: None,
            detail: detail.to_string(),
        }
    }

    /// Map an error raised while reading an archive stream.
    ///
    /// Permission problems stay fatal; anything else means the container
    /// itself is unreadable.
    pub(crate) fn from_archive_io(archive: impl Into<PathBuf>, e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => Self::Io(e),
            _ => Self::corrupt(archive, e),
        }
    }
}
