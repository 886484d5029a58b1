//! Background execution.
//!
//! [`spawn`] runs a [`Session`] on a dedicated thread so the caller never
//! blocks. The returned [`Job`] carries the progress stream, the
//! cancellation token and a live [`Snapshot`].

use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver};
use tracing::info;

use crate::cancel::CancellationToken;
use crate::error::Error;
use crate::progress::{ProgressEvent, Snapshot, SnapshotHandle, SnapshotSink};
use crate::session::{Input, Session, SessionReport};

/// Handle to a session running in the background.
pub struct Job {
    token: CancellationToken,
    events: Receiver<ProgressEvent>,
    snapshot: SnapshotHandle,
    handle: JoinHandle<SessionReport>,
}

/// Start `session` on its own thread.
pub fn spawn(mut session: Session, input: Input) -> Result<Job, Error> {
    let token = CancellationToken::new();
    let (tx, events) = unbounded();
    let sink = SnapshotSink::new(tx);
    let snapshot = sink.handle();

    let worker_token = token.clone();
    let handle = thread::Builder::new()
        .name("nested-unzip".to_string())
        .spawn(move || {
            info!(destination = %session.destination().display(), "worker started");
            session.run(&input, &worker_token, &sink)
        })?;

    Ok(Job {
        token,
        events,
        snapshot,
        handle,
    })
}

impl Job {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Progress events, ending with [`ProgressEvent::Idle`].
    pub fn events(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.get()
    }

    pub fn pause(&self) {
        self.token.pause();
    }

    pub fn resume(&self) {
        self.token.resume();
    }

    pub fn stop(&self) {
        self.token.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the session to end.
    pub fn join(self) -> SessionReport {
        self.handle
            .join()
            .unwrap_or_else(|_| SessionReport::failed("worker thread panicked"))
    }
}
