//! A state handle that lives entirely in memory.

use super::{
    Locker, Result, StateError, StatePersister, StateReader, StateRefresher, StateSnapshot,
    StateWriter,
};
use crate::locks::{LockError, LockInfo};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    state: Option<StateSnapshot>,
    holder: Option<LockInfo>,
}

/// In-memory state with an in-process lock.
///
/// Refresh and persist have nothing to talk to and always succeed.
#[derive(Debug, Default)]
pub struct InmemState {
    inner: Mutex<Inner>,
}

impl InmemState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot.
    pub fn with_state(state: StateSnapshot) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: Some(state),
                holder: None,
            }),
        }
    }

    /// The current holder, if locked.
    pub fn holder(&self) -> Option<LockInfo> {
        self.inner().holder.clone()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

impl StateReader for InmemState {
    fn state(&self) -> Option<StateSnapshot> {
        self.inner().state.clone()
    }
}

impl StateWriter for InmemState {
    fn write_state(&self, state: &StateSnapshot) -> Result<()> {
        self.inner().state = Some(state.clone());
        Ok(())
    }
}

impl StateRefresher for InmemState {
    fn refresh_state(&self) -> Result<()> {
        Ok(())
    }
}

impl StatePersister for InmemState {
    fn persist_state(&self) -> Result<()> {
        Ok(())
    }
}

impl Locker for InmemState {
    fn lock(&self, info: &LockInfo) -> Result<String> {
        let mut inner = self.inner();
        if let Some(holder) = &inner.holder {
            return Err(LockError::held_by("state locked", holder.clone()).into());
        }

        inner.holder = Some(info.clone());
        Ok(info.id().to_string())
    }

    fn unlock(&self, id: &str) -> Result<()> {
        let mut inner = self.inner();
        let Some(holder) = &inner.holder else {
            return Err(StateError::NotLocked);
        };

        if holder.id() != id {
            return Err(LockError::held_by(
                format!("lock ID {:?} does not match existing lock", id),
                holder.clone(),
            )
            .into());
        }

        inner.holder = None;
        Ok(())
    }
}
