//! Cooperative pause / resume / stop.
//!
//! A [`CancellationToken`] is shared between the thread running a session
//! and whoever controls it. The session consults it at every archive and
//! entry boundary through [`CancellationToken::checkpoint`], so a file is
//! never left half-written by a pause.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use crate::error::Error;

#[derive(Debug, Default)]
struct Inner {
    stopped: AtomicBool,
    paused: AtomicBool,
    // Only used to park a paused worker.
    lock: Mutex<()>,
    cvar: Condvar,
}

/// Handle to the stop / pause flags of one job.
///
/// Cloning is cheap and every clone controls the same job.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. One-way; also wakes a paused worker.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.notify();
    }

    pub fn pause(&self) {
        self.inner.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.inner.paused.store(false, Ordering::SeqCst);
        self.notify();
    }

    /// Flip the paused flag. Returns `true` if the job is now paused.
    pub fn toggle_pause(&self) -> bool {
        let was_paused = self.inner.paused.fetch_xor(true, Ordering::SeqCst);
        if was_paused {
            self.notify();
        }
        !was_paused
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    /// Block the calling thread while paused and not stopped.
    pub fn wait_if_paused(&self) {
        let mut guard = self
            .inner
            .lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while self.is_paused() && !self.is_stopped() {
            guard = self
                .inner
                .cvar
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Wait out a pause, then fail with [`Error::Cancelled`] if a stop was
    /// requested.
    pub fn checkpoint(&self) -> Result<(), Error> {
        self.wait_if_paused();
        if self.is_stopped() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    fn notify(&self) {
        // Taking the lock orders the flag change before a waiter re-checks it.
        let _guard = self
            .inner
            .lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.inner.cvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn checkpoint_passes_until_stopped() {
        let token = CancellationToken::new();
        assert!(token.checkpoint().is_ok());
        token.stop();
        assert!(matches!(token.checkpoint(), Err(Error::Cancelled)));
        assert!(token.is_stopped());
    }

    #[test]
    fn toggle_reports_new_state() {
        let token = CancellationToken::new();
        assert!(token.toggle_pause());
        assert!(token.is_paused());
        assert!(!token.toggle_pause());
        assert!(!token.is_paused());
    }

    #[test]
    fn stop_wakes_paused_waiter() {
        let token = CancellationToken::new();
        token.pause();

        let worker = {
            let token = token.clone();
            thread::spawn(move || token.checkpoint())
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!worker.is_finished());
        token.stop();
        assert!(matches!(worker.join().unwrap(), Err(Error::Cancelled)));
    }

    #[test]
    fn resume_releases_waiter() {
        let token = CancellationToken::new();
        token.pause();

        let worker = {
            let token = token.clone();
            thread::spawn(move || token.checkpoint())
        };

        thread::sleep(Duration::from_millis(50));
        token.resume();
        assert!(worker.join().unwrap().is_ok());
    }
}
