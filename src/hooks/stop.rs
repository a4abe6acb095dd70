//! The stop hook: a cooperative halt flag.

use super::{Hook, HookAction, HookError, HookEvent};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Halts a walk at its next check-point once [`stop`](StopHook::stop) is called.
///
/// Two groups of operations share one flag:
///
/// - `stop` and `stopped` are atomic and safe from any thread, any number of
///   times; hand out a [`Stopper`] for these
/// - `reset` is owner-only: it is **not** synchronized against concurrent
///   `stop` or hook dispatch, so call it only while no walk is running (for
///   example between runs, while holding the state lock)
///
/// The hook never cancels anything itself; it only answers `Halt`.
#[derive(Debug, Default)]
pub struct StopHook {
    stop: Arc<AtomicBool>,
}

impl StopHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a halt. Idempotent.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Return to the running state.
    ///
    /// Owner-only; see the type docs.
    pub fn reset(&self) {
        self.stop.store(false, Ordering::SeqCst);
    }

    /// A handle that can request a halt from elsewhere (a signal handler,
    /// another worker) but cannot reset.
    pub fn stopper(&self) -> Stopper {
        Stopper {
            stop: self.stop.clone(),
        }
    }

    fn check(&self) -> HookAction {
        if self.stopped() {
            HookAction::Halt
        } else {
            HookAction::Continue
        }
    }
}

impl Hook for StopHook {
    fn on_event(&self, event: HookEvent, addr: Option<&str>) -> Result<HookAction, HookError> {
        let action = self.check();
        if action == HookAction::Halt {
            debug!(%event, addr = addr.unwrap_or_default(), "stop requested, halting");
        }
        Ok(action)
    }
}

/// The concurrent-safe half of a [`StopHook`].
#[derive(Debug, Clone)]
pub struct Stopper {
    stop: Arc<AtomicBool>,
}

impl Stopper {
    /// Request a halt. Idempotent.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}
