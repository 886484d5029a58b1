//! Async API (requires the `async` feature).
//!
//! Extraction is blocking file I/O, so the session runs on tokio's blocking
//! thread pool via [`tokio::task::spawn_blocking`]. Progress arrives on an
//! unbounded tokio channel.
//!
//! # Example
//!
//! ```no_run
//! use nested_unzip::r#async::run;
//! use nested_unzip::{CancellationToken, Input, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), nested_unzip::Error> {
//!     let session = Session::new("/var/uploads")?;
//!     let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//!     let token = CancellationToken::new();
//!
//!     let job = tokio::spawn(run(
//!         session,
//!         Input::Files(vec!["bundle.zip".into()]),
//!         token.clone(),
//!         tx,
//!     ));
//!     while let Some(event) = rx.recv().await {
//!         println!("{}", event);
//!     }
//!     let report = job.await.map_err(|e| nested_unzip::Error::Io(std::io::Error::other(e)))??;
//!     println!("{:?}", report.outcome);
//!     Ok(())
//! }
//! ```

use std::path::Path;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::spawn_blocking;

use crate::{CancellationToken, Error, Input, NoProgress, ProgressEvent, ProgressSink, Session, SessionReport};

impl ProgressSink for UnboundedSender<ProgressEvent> {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.send(event);
    }
}

/// Run `session` on the blocking pool, forwarding progress to `events`.
///
/// The channel closes when the session ends. Only a panicked worker is
/// reported as an error; extraction failures end up in the report.
pub async fn run(
    mut session: Session,
    input: Input,
    token: CancellationToken,
    events: UnboundedSender<ProgressEvent>,
) -> Result<SessionReport, Error> {
    spawn_blocking(move || session.run(&input, &token, &events))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))
}

/// Extract `input` into `destination` with default options.
pub async fn extract<P: AsRef<Path>>(destination: P, input: Input) -> Result<SessionReport, Error> {
    let mut session = Session::new(destination)?;
    spawn_blocking(move || session.run(&input, &CancellationToken::new(), &NoProgress))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))
}
