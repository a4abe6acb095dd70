//! Bounded, cancellable lock acquisition.
//!
//! A backend's `lock` either succeeds or fails once. [`LockCoordinator`] turns
//! that into a polling loop: attributable conflicts are retried behind an
//! exponential backoff until the caller's cancellation token fires; anything
//! else ends the loop on the spot.

use crate::state::{Locker, StateError};
use std::fmt;
use std::ops::Deref;
use std::time::Duration;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::error::LockError;
use super::info::LockInfo;

/// Exponential backoff between lock attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// First wait.
    pub initial: Duration,
    /// Upper bound for every wait.
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(16),
        }
    }
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    /// The endless sequence of waits: `initial`, doubling, clamped to `max`.
    pub fn delays(&self) -> Delays {
        Delays {
            next: self.initial.min(self.max),
            max: self.max,
        }
    }
}

/// Iterator over backoff waits. Never ends.
#[derive(Debug, Clone)]
pub struct Delays {
    next: Duration,
    max: Duration,
}

impl Iterator for Delays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let delay = self.next;
        self.next = delay.checked_mul(2).unwrap_or(self.max).min(self.max);
        Some(delay)
    }
}

type ConflictHook = Box<dyn Fn(&LockError) + Send + Sync>;

/// Drives a [`Locker`] until it yields a token or the attempt is over.
#[derive(Default)]
pub struct LockCoordinator {
    backoff: Backoff,
    on_conflict: Option<ConflictHook>,
}

impl fmt::Debug for LockCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockCoordinator")
            .field("backoff", &self.backoff)
            .field("on_conflict", &self.on_conflict.is_some())
            .finish()
    }
}

impl LockCoordinator {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            backoff,
            on_conflict: None,
        }
    }

    /// Observe each conflict before the coordinator waits on it.
    pub fn on_conflict(mut self, hook: impl Fn(&LockError) + Send + Sync + 'static) -> Self {
        self.on_conflict = Some(Box::new(hook));
        self
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Acquire the lock, retrying conflicts until `cancel` fires.
    ///
    /// Returns the lock token on success. A failure that is not a lock error,
    /// or a lock error without a complete holder, is returned immediately.
    /// When `cancel` fires during a wait, the conflict from the most recent
    /// attempt is returned, so the caller still learns who holds the lock.
    pub async fn acquire<L>(
        &self,
        cancel: &CancellationToken,
        locker: &L,
        info: &LockInfo,
    ) -> Result<String, StateError>
    where
        L: Locker + ?Sized,
    {
        let mut delays = self.backoff.delays();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let err = match locker.lock(info) {
                Ok(id) => return Ok(id),
                Err(err) => err,
            };

            let Some(conflict) = err.lock_conflict() else {
                debug!(attempt, error = %err, "lock attempt failed, not retrying");
                return Err(err);
            };

            if let Some(hook) = &self.on_conflict {
                hook(conflict);
            }

            let delay = delays.next().unwrap_or(self.backoff.max);
            info!(
                attempt,
                holder = conflict.info().map(LockInfo::who).unwrap_or_default(),
                retry_in_ms = delay.as_millis() as u64,
                "state is locked, waiting to retry"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(attempt, "lock wait cancelled, returning last conflict");
                    return Err(err);
                }
                _ = time::sleep(delay) => {}
            }
        }
    }
}

/// Acquire `locker` with the default backoff. See [`LockCoordinator::acquire`].
pub async fn lock_with_context<L>(
    cancel: &CancellationToken,
    locker: &L,
    info: &LockInfo,
) -> Result<String, StateError>
where
    L: Locker + ?Sized,
{
    LockCoordinator::default().acquire(cancel, locker, info).await
}

/// A cancellation token bounded by a timeout.
///
/// Derefs to the underlying token. Dropping the deadline cancels it, which
/// also ends its timer task, so an early return never leaves a sleeper behind.
#[derive(Debug)]
pub struct Deadline {
    token: CancellationToken,
}

impl Deadline {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Deref for Deadline {
    type Target = CancellationToken;

    fn deref(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// A child of `parent` that is also cancelled once `timeout` elapses.
///
/// A zero timeout yields an already-cancelled token: the caller gets exactly
/// one attempt. Must be called inside a tokio runtime.
pub fn cancel_after(parent: &CancellationToken, timeout: Duration) -> Deadline {
    let child = parent.child_token();
    if timeout.is_zero() {
        child.cancel();
        return Deadline { token: child };
    }

    let token = child.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = time::sleep(timeout) => token.cancel(),
        }
    });
    Deadline { token: child }
}
