//! Bridges a [`CancellationToken`] into the workers' `select!` loop.
//!
//! Workers block in `crossbeam_channel::select!`, which cannot wait on a
//! future. A single watcher thread waits on the token instead and, once it
//! fires, drops the only sender of a zero-capacity channel. Every worker holds
//! a receiver of that channel and wakes up on the disconnect.

use crossbeam_channel::Receiver;
use std::{
    io,
    thread::{self, JoinHandle},
};
use tokio_util::sync::CancellationToken;

pub struct CancelWatcher {
    // Child of the caller's token: fires with it, and can be fired alone to
    // retire the watcher without cancelling the caller.
    release: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl CancelWatcher {
    /// Spawns the watcher thread and returns it with the receiver workers
    /// select on.
    pub fn spawn(cancel: &CancellationToken, name: String) -> io::Result<(Self, Receiver<()>)> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let release = cancel.child_token();
        let waiter = release.clone();

        let handle = thread::Builder::new().name(name).spawn(move || {
            futures::executor::block_on(waiter.cancelled());
            drop(stop_tx);
        })?;

        Ok((
            Self {
                release,
                handle: Some(handle),
            },
            stop_rx,
        ))
    }

    /// Stops the watcher and waits for its thread to exit.
    ///
    /// Does not cancel the caller's token.
    pub fn release(mut self) {
        self.release.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(_e) = handle.join() {
                #[cfg(feature = "tracing")]
                tracing::error!("Cancellation watcher thread panicked: {_e:?}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::RecvTimeoutError;
    use core::time::Duration;

    #[test]
    fn parent_cancel_disconnects_stop_channel() {
        let cancel = CancellationToken::new();
        let (watcher, stop) = CancelWatcher::spawn(&cancel, "watcher".into()).unwrap();

        assert_eq!(
            stop.recv_timeout(Duration::from_millis(20)),
            Err(RecvTimeoutError::Timeout)
        );

        cancel.cancel();
        assert_eq!(
            stop.recv_timeout(Duration::from_secs(5)),
            Err(RecvTimeoutError::Disconnected)
        );
        watcher.release();
    }

    #[test]
    fn release_leaves_caller_token_alone() {
        let cancel = CancellationToken::new();
        let (watcher, _stop) = CancelWatcher::spawn(&cancel, "watcher".into()).unwrap();

        watcher.release();
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn release_survives_a_panicked_watcher() {
        let watcher = CancelWatcher {
            release: CancellationToken::new(),
            handle: Some(thread::spawn(|| panic!("watcher failed"))),
        };

        watcher.release();
    }
}
