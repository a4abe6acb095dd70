//! RAII guard for an acquired state lock.

use crate::state::{Locker, Result};
use tracing::warn;

/// Holds a lock token and releases it when dropped.
///
/// Prefer [`StateLockGuard::release`] so the unlock error can be handled; a
/// failed release on drop is only logged. Unlock is attempted exactly once
/// either way.
pub struct StateLockGuard<'a, L: Locker + ?Sized> {
    locker: &'a L,
    id: String,
    released: bool,
}

impl<'a, L: Locker + ?Sized> StateLockGuard<'a, L> {
    /// Take ownership of `id`, a token previously returned by `locker.lock`.
    pub fn new(locker: &'a L, id: String) -> Self {
        Self {
            locker,
            id,
            released: false,
        }
    }

    /// The lock token.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Release the lock now.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.locker.unlock(&self.id)
    }

    /// Give up ownership without unlocking, returning the token.
    pub fn keep(mut self) -> String {
        self.released = true;
        std::mem::take(&mut self.id)
    }
}

impl<L: Locker + ?Sized> Drop for StateLockGuard<'_, L> {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.locker.unlock(&self.id)
        {
            warn!(id = %self.id, error = %e, "failed to release state lock");
        }
    }
}
