//! # nested_unzip
//!
//! Recursive archive extraction. Archives found inside extracted output are
//! unpacked too, at any depth, into one clean directory tree.
//!
//! - Entry names stored in legacy codepages (GBK, CP437) are recovered
//! - Redundant wrapper folders (`photos/photos/`) are collapsed
//! - Jobs can be paused, resumed or stopped; a stopped or failed job removes
//!   everything it created
//! - Path traversal (Zip Slip) is blocked at every nesting level
//!
//! ## Quick Start
//!
//! ```no_run
//! use nested_unzip::{CancellationToken, Input, NoProgress, Session};
//!
//! let mut session = Session::new("/tmp/out")?;
//! let report = session.run(
//!     &Input::Folder("/tmp/downloads".into()),
//!     &CancellationToken::new(),
//!     &NoProgress,
//! );
//! println!("{} archives, {} files", report.archives_extracted, report.files_extracted);
//! # Ok::<(), nested_unzip::Error>(())
//! ```
//!
//! ## Background jobs
//!
//! ```no_run
//! use nested_unzip::{worker, Input, Session};
//!
//! let job = worker::spawn(Session::new("/tmp/out")?, Input::Files(vec!["a.zip".into()]))?;
//! for event in job.events().iter() {
//!     println!("{}", event);
//! }
//! let report = job.join();
//! # Ok::<(), nested_unzip::Error>(())
//! ```
//!
//! ## Formats
//!
//! ZIP is always available. TAR (plain, gzip, bzip2) and 7z are on by
//! default; RAR needs the `rar` feature.

pub mod adapter;
pub mod cancel;
pub mod decode;
pub mod entry;
mod error;
pub mod flatten;
pub mod format;
pub mod guard;
pub mod ledger;
pub mod progress;
pub mod resolve;
pub mod session;
pub mod unpack;
mod walker;
pub mod worker;

#[cfg(feature = "async")]
#[path = "async_session.rs"]
pub mod r#async;

pub use adapter::{ArchiveOpener, ArchiveReader, BuiltinOpener};
pub use cancel::CancellationToken;
pub use decode::{Codepage, FilenameDecoder};
pub use entry::{EntryInfo, EntryKind, RawName};
pub use error::{Error, ErrorScope};
pub use format::{is_supported_archive, ArchiveFormat};
pub use guard::PathGuard;
pub use ledger::{LedgerRecord, RollbackLedger, RollbackReport};
pub use progress::{NoProgress, ProgressEvent, ProgressSink, Snapshot};
pub use session::{Input, Options, Outcome, RevealPath, Session, SessionReport};

/// Extract `archive` and everything nested in it into `destination` with
/// default settings.
pub fn extract_file<P: AsRef<std::path::Path>, F: AsRef<std::path::Path>>(
    destination: P,
    archive: F,
) -> Result<SessionReport, Error> {
    let mut session = Session::new(destination)?;
    Ok(session.run(
        &Input::Files(vec![archive.as_ref().to_path_buf()]),
        &CancellationToken::new(),
        &NoProgress,
    ))
}
