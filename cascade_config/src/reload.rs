//! Background thread that ticks a reload callback on a fixed interval.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::{ConfigError, ConfigResult};

const THREAD_NAME: &str = "cascade-config-reload";

/// Phase of a reload loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ReloadState {
    /// Waiting for the next tick, or no loop was started.
    Idle,
    /// Checking file modification times.
    Ticking,
    /// Re-resolving registered keys after a change.
    Resolving,
    /// The loop has ended.
    Stopped,
}

impl ReloadState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Ticking,
            2 => Self::Resolving,
            3 => Self::Stopped,
            _ => Self::Idle,
        }
    }
}

/// Shared view of the current [`ReloadState`].
#[derive(Debug, Default)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn set(&self, state: ReloadState) {
        self.0.store(state as u8, Ordering::Release);
    }

    pub(crate) fn get(&self) -> ReloadState {
        ReloadState::from_u8(self.0.load(Ordering::Acquire))
    }
}

#[derive(Debug, Default)]
struct Shared {
    stopped: Mutex<bool>,
    wake: Condvar,
    state: StateCell,
}

/// Owns a running reload thread. Dropping the handle stops the loop.
#[derive(Debug)]
pub(crate) struct ReloadHandle {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl ReloadHandle {
    /// Start a loop calling `tick` every `interval` until stopped or until
    /// `tick` returns `false`.
    pub(crate) fn spawn<F>(interval: Duration, mut tick: F) -> ConfigResult<Self>
    where
        F: FnMut(&StateCell) -> bool + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let worker = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || {
                debug!(?interval, "reload loop started");
                loop {
                    {
                        let mut stopped = worker.stopped.lock();
                        if !*stopped {
                            let _timeout = worker.wake.wait_for(&mut stopped, interval);
                        }
                        if *stopped {
                            break;
                        }
                    }
                    trace!("reload tick");
                    worker.state.set(ReloadState::Ticking);
                    let keep_going = tick(&worker.state);
                    worker.state.set(ReloadState::Idle);
                    if !keep_going {
                        break;
                    }
                }
                worker.state.set(ReloadState::Stopped);
                debug!("reload loop stopped");
            })
            .map_err(|source| Arc::new(ConfigError::ReloadSpawn { source }))?;
        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    pub(crate) fn state(&self) -> ReloadState {
        self.shared.state.get()
    }

    /// Signal the loop to end and wait for it, unless called from the loop
    /// itself.
    pub(crate) fn stop(&mut self) {
        *self.shared.stopped.lock() = true;
        self.shared.wake.notify_all();
        let Some(thread) = self.thread.take() else {
            return;
        };
        if thread.thread().id() == thread::current().id() {
            return;
        }
        if thread.join().is_err() {
            debug!("reload thread panicked");
        }
        self.shared.state.set(ReloadState::Stopped);
    }
}

impl Drop for ReloadHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "clippy::expect_used is denied globally; tests may not hit those branches"
)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
            mpsc,
        },
        time::Duration,
    };

    use rstest::rstest;

    use super::{ReloadHandle, ReloadState};

    #[rstest]
    fn ticks_until_stopped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();
        let counter = Arc::clone(&ticks);
        let mut handle = ReloadHandle::spawn(Duration::from_millis(5), move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 2 {
                let _sent = tx.send(());
            }
            true
        })
        .expect("thread spawns");
        rx.recv_timeout(Duration::from_secs(5)).expect("three ticks run");
        handle.stop();
        assert_eq!(handle.state(), ReloadState::Stopped);
        let after = ticks.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(ticks.load(Ordering::SeqCst), after, "no ticks after stop");
    }

    #[rstest]
    fn stop_interrupts_a_long_wait() {
        let mut handle = ReloadHandle::spawn(Duration::from_secs(3600), |_| true).expect("thread spawns");
        assert_eq!(handle.state(), ReloadState::Idle);
        handle.stop();
        assert_eq!(handle.state(), ReloadState::Stopped);
    }

    #[rstest]
    fn returning_false_ends_the_loop() {
        let (tx, rx) = mpsc::channel();
        let handle = ReloadHandle::spawn(Duration::from_millis(1), move |state| {
            let _sent = tx.send(state.get());
            false
        })
        .expect("thread spawns");
        let seen = rx.recv_timeout(Duration::from_secs(5)).expect("one tick runs");
        assert_eq!(seen, ReloadState::Ticking);
        for _ in 0..500 {
            if handle.state() == ReloadState::Stopped {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("loop did not stop");
    }
}
