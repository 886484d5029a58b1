//! Batch orchestration.
//!
//! A [`Session`] extracts a batch of top-level archives into one destination,
//! descends into every archive they contain, and either finalizes the result
//! or rolls everything back.

use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use tracing::{info, warn};

use crate::adapter::{ArchiveOpener, BuiltinOpener};
use crate::cancel::CancellationToken;
use crate::decode::FilenameDecoder;
use crate::error::{Error, ErrorScope};
use crate::ledger::RollbackLedger;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::unpack::Unpacker;
use crate::walker::Walker;

/// Default bound on archive-in-archive nesting.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 32;

/// Session settings.
#[derive(Debug, Clone)]
pub struct Options {
    /// Keep every consumed archive instead of deleting it on success.
    pub keep_original_archives: bool,
    /// Collapse a single redundant wrapper folder after each extraction.
    pub flatten_single_folder: bool,
    /// Codepage tried for entry names that are not UTF-8.
    pub name_encoding: &'static Encoding,
    /// Deepest nesting level that is still extracted.
    pub max_nesting_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            keep_original_archives: false,
            flatten_single_folder: true,
            name_encoding: encoding_rs::GBK,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

/// What to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Explicit archive files.
    Files(Vec<PathBuf>),
    /// Every supported archive directly inside a folder (not recursive).
    Folder(PathBuf),
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// Stopped by the user; output was rolled back.
    Cancelled,
    /// Aborted by an error; output was rolled back.
    Failed(String),
}

/// Result of [`Session::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub outcome: Outcome,
    /// Target directories of the top-level archives. Empty after rollback.
    pub target_dirs: Vec<PathBuf>,
    /// Archives extracted, nested ones included.
    pub archives_extracted: usize,
    pub archives_skipped: usize,
    pub files_extracted: usize,
    pub entries_skipped: usize,
    pub bytes_written: u64,
    /// Directories rollback could not remove.
    pub rollback_failures: usize,
}

impl SessionReport {
    fn new() -> Self {
        Self {
            outcome: Outcome::Completed,
            target_dirs: Vec::new(),
            archives_extracted: 0,
            archives_skipped: 0,
            files_extracted: 0,
            entries_skipped: 0,
            bytes_written: 0,
            rollback_failures: 0,
        }
    }

    pub(crate) fn failed(reason: impl Into<String>) -> Self {
        let mut report = Self::new();
        report.outcome = Outcome::Failed(reason.into());
        report
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == Outcome::Completed
    }
}

/// Shows a finished extraction to the user (e.g. opens a file browser).
pub trait RevealPath: Send + Sync {
    fn reveal(&self, path: &Path);
}

impl<F> RevealPath for F
where
    F: Fn(&Path) + Send + Sync,
{
    fn reveal(&self, path: &Path) {
        self(path)
    }
}

/// Nested extraction into one destination directory.
///
/// # Example
///
/// ```no_run
/// use nested_unzip::{CancellationToken, Input, NoProgress, Session};
///
/// let mut session = Session::new("/tmp/out")?
///     .keep_original_archives(true)
///     .max_nesting_depth(8);
/// let report = session.run(
///     &Input::Files(vec!["bundle.zip".into()]),
///     &CancellationToken::new(),
///     &NoProgress,
/// );
/// println!("{:?}", report.outcome);
/// # Ok::<(), nested_unzip::Error>(())
/// ```
pub struct Session {
    destination: PathBuf,
    options: Options,
    opener: Box<dyn ArchiveOpener>,
    reveal: Option<Box<dyn RevealPath>>,
    ledger: RollbackLedger,
    target_dirs: Vec<PathBuf>,
}

impl Session {
    /// Create a session for the given destination.
    ///
    /// Returns an error if the destination doesn't exist.
    pub fn new<P: AsRef<Path>>(destination: P) -> Result<Self, Error> {
        Self::new_impl(destination.as_ref(), false)
    }

    /// Create a session, creating the destination if it doesn't exist.
    pub fn new_or_create<P: AsRef<Path>>(destination: P) -> Result<Self, Error> {
        Self::new_impl(destination.as_ref(), true)
    }

    fn new_impl(destination: &Path, create: bool) -> Result<Self, Error> {
        if !destination.is_dir() {
            if create {
                fs::create_dir_all(destination)?;
            } else {
                return Err(Error::DestinationNotFound {
                    path: destination.to_path_buf(),
                });
            }
        }

        Ok(Self {
            destination: destination.to_path_buf(),
            options: Options::default(),
            opener: Box::new(BuiltinOpener),
            reveal: None,
            ledger: RollbackLedger::new(),
            target_dirs: Vec::new(),
        })
    }

    /// Replace all options at once.
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn keep_original_archives(mut self, keep: bool) -> Self {
        self.options.keep_original_archives = keep;
        self
    }

    pub fn flatten_single_folder(mut self, flatten: bool) -> Self {
        self.options.flatten_single_folder = flatten;
        self
    }

    /// Set the fallback codepage by WHATWG label (`gbk`, `shift_jis`, ...).
    pub fn name_encoding(mut self, label: &str) -> Result<Self, Error> {
        self.options.name_encoding =
            Encoding::for_label(label.as_bytes()).ok_or_else(|| Error::InvalidEncoding {
                label: label.to_string(),
            })?;
        Ok(self)
    }

    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.options.max_nesting_depth = depth;
        self
    }

    /// Called with the first target directory after a successful run.
    pub fn with_reveal<R: RevealPath + 'static>(mut self, reveal: R) -> Self {
        self.reveal = Some(Box::new(reveal));
        self
    }

    /// Use custom archive readers.
    pub fn with_opener<O: ArchiveOpener + 'static>(mut self, opener: O) -> Self {
        self.opener = Box::new(opener);
        self
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn settings(&self) -> &Options {
        &self.options
    }

    /// Decoded entry names of one archive, without extracting anything.
    pub fn list(&self, archive: &Path) -> Result<Vec<String>, Error> {
        let format = self
            .opener
            .detect(archive)
            .ok_or_else(|| Error::UnsupportedFormat {
                path: archive.to_path_buf(),
                detail: "unrecognized file extension".to_string(),
            })?;
        let decoder = FilenameDecoder::new(self.options.name_encoding);
        let mut reader = self.opener.open(archive, format)?;
        Ok(reader
            .list_entries()?
            .iter()
            .map(|info| decoder.decode(&info.name))
            .collect())
    }

    /// Extract `input`, then finalize or roll back.
    ///
    /// Never returns an error: failures end up in [`SessionReport::outcome`]
    /// and the progress stream.
    pub fn run(
        &mut self,
        input: &Input,
        token: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> SessionReport {
        self.ledger = RollbackLedger::new();
        self.target_dirs.clear();

        let decoder = FilenameDecoder::new(self.options.name_encoding);
        let unpacker = Unpacker {
            decoder: &decoder,
            token,
            sink,
        };
        let mut walker = Walker::new(self.opener.as_ref(), unpacker, &self.options);

        let result = execute(
            &mut walker,
            &self.destination,
            input,
            token,
            &mut self.ledger,
            &mut self.target_dirs,
        );

        let mut report = SessionReport::new();
        report.archives_extracted = walker.tally.archives_extracted;
        report.archives_skipped = walker.tally.archives_skipped;
        report.files_extracted = walker.tally.files_extracted;
        report.entries_skipped = walker.tally.entries_skipped;
        report.bytes_written = walker.tally.bytes_written;

        match result {
            Ok(()) => {
                self.finalize(sink);
                report.target_dirs = std::mem::take(&mut self.target_dirs);
            }
            Err(e) => {
                report.outcome = match e {
                    Error::Cancelled => {
                        info!("extraction cancelled, rolling back");
                        sink.emit(ProgressEvent::Cancelled);
                        Outcome::Cancelled
                    }
                    e => {
                        warn!(error = %e, "extraction failed, rolling back");
                        let reason = e.to_string();
                        sink.emit(ProgressEvent::Failed {
                            reason: reason.clone(),
                        });
                        Outcome::Failed(reason)
                    }
                };
                report.rollback_failures = self.rollback(sink);
            }
        }

        sink.emit(ProgressEvent::Idle);
        report
    }

    fn finalize(&mut self, sink: &dyn ProgressSink) {
        if !self.options.keep_original_archives {
            for archive in self.ledger.consumed_archives() {
                if !archive.exists() {
                    continue;
                }
                if let Err(e) = fs::remove_file(archive) {
                    warn!(archive = %archive.display(), error = %e, "could not remove archive");
                    sink.emit(ProgressEvent::ArchiveSkipped {
                        archive: archive.to_path_buf(),
                        reason: format!("could not remove original: {e}"),
                    });
                }
            }
        }
        self.ledger.discard();

        if let (Some(reveal), Some(first)) = (&self.reveal, self.target_dirs.first()) {
            reveal.reveal(first);
        }
    }

    fn rollback(&mut self, sink: &dyn ProgressSink) -> usize {
        let report = self.ledger.rollback();
        for path in report.removed {
            sink.emit(ProgressEvent::RolledBack { path });
        }
        let failures = report.failures.len();
        for (path, e) in report.failures {
            sink.emit(ProgressEvent::RollbackFailed {
                path,
                error: e.to_string(),
            });
        }
        self.target_dirs.clear();
        failures
    }
}

/// Top-level archives named by `input`.
fn collect_inputs(input: &Input, opener: &dyn ArchiveOpener) -> Result<Vec<PathBuf>, Error> {
    match input {
        Input::Files(files) => Ok(files.clone()),
        Input::Folder(folder) => {
            let mut archives = Vec::new();
            for entry in fs::read_dir(folder)? {
                let entry = entry?;
                let path = entry.path();
                if entry.file_type()?.is_file() && opener.detect(&path).is_some() {
                    archives.push(path);
                }
            }
            if archives.is_empty() {
                return Err(Error::NoArchivesFound {
                    folder: folder.clone(),
                });
            }
            archives.sort();
            Ok(archives)
        }
    }
}

fn execute(
    walker: &mut Walker<'_>,
    destination: &Path,
    input: &Input,
    token: &CancellationToken,
    ledger: &mut RollbackLedger,
    target_dirs: &mut Vec<PathBuf>,
) -> Result<(), Error> {
    let archives = collect_inputs(input, walker.opener())?;
    // With a single archive there is nothing else to salvage.
    let single = archives.len() == 1;

    for archive in &archives {
        token.checkpoint()?;
        if !walker.mark_visited(archive) {
            continue;
        }

        match walker.extract(archive, destination, false, ledger) {
            Ok(target) => {
                target_dirs.push(target.clone());
                walker.walk(&target, vec![archive.clone()], ledger)?;
            }
            Err(e) if single || e.scope() == ErrorScope::Batch => return Err(e),
            Err(e) => walker.skip(archive, &e),
        }
    }

    Ok(())
}
