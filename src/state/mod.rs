//! State handles.
//!
//! A state handle abstracts over where a [`StateSnapshot`] lives and how it is
//! locked. The contract is split into facets so a backend can be reasoned
//! about one concern at a time:
//!
//! - [`StateReader`]: the most recently known snapshot, never failing
//! - [`StateWriter`]: replace the snapshot, possibly only in memory
//! - [`StateRefresher`]: reload from the authoritative source
//! - [`StatePersister`]: durably store the most recent write
//! - [`Locker`]: exclusive lock recording a [`LockInfo`] as the holder
//!
//! # Copy semantics
//!
//! Snapshots are owned values. Every read hands out a fresh clone and every
//! write clones its input, so no two callers (and no cached copy inside a
//! handle) ever share a mutable snapshot.
//!
//! # Lock failures
//!
//! When a lock or unlock fails because someone else holds the lock, the
//! backend must return [`StateError::Lock`] carrying that holder's complete
//! `LockInfo`. Every other failure (I/O, permissions, corruption) must be a
//! different variant so it is never mistaken for a retryable conflict.

mod file;
mod inmem;
mod snapshot;


pub use file::FileState;
pub use inmem::InmemState;
pub use snapshot::StateSnapshot;

use crate::locks::{LockError, LockInfo};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by state handles.
#[derive(Error, Debug)]
pub enum StateError {
    /// The lock is held by someone else, or the holder could not be determined.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// A filesystem operation failed.
    #[error("failed to {action} '{}': {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A stored state or lock file could not be parsed.
    #[error("failed to parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The state could not be serialized.
    #[error("failed to serialize state: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Unlock was called while no lock is held.
    #[error("state is not locked")]
    NotLocked,
}

impl StateError {
    /// The lock error, if this failure is an attributable lock conflict.
    pub fn lock_conflict(&self) -> Option<&LockError> {
        match self {
            StateError::Lock(err) if err.is_conflict() => Some(err),
            _ => None,
        }
    }

    /// True for any lock error, attributable or not.
    pub fn is_lock_error(&self) -> bool {
        matches!(self, StateError::Lock(_))
    }
}

/// Result type alias for state handle operations.
pub type Result<T> = std::result::Result<T, StateError>;

/// Returns the most recently known snapshot.
///
/// Reading must not fail; loading fresh belongs in [`StateRefresher`]. `None`
/// means nothing has been loaded or written yet. Each call returns a copy
/// distinct from every other caller's and from anything cached inside.
pub trait StateReader {
    fn state(&self) -> Option<StateSnapshot>;
}

/// Stores a new snapshot, possibly only in memory.
///
/// The input is copied before returning. When combined with a reader, a
/// subsequent read must return the most recent write even before it is
/// persisted; when combined with a persister, the next persist must store it.
pub trait StateWriter {
    fn write_state(&self, state: &StateSnapshot) -> Result<()>;
}

/// Reloads the snapshot from its authoritative source.
pub trait StateRefresher {
    fn refresh_state(&self) -> Result<()>;
}

/// Durably stores the most recent write.
///
/// After success, reads return exactly what was persisted.
pub trait StatePersister {
    fn persist_state(&self) -> Result<()>;
}

/// Exclusive locking of a state.
///
/// `info` is recorded as the advertised holder; implementations must not
/// depend on its contents. The returned string is the token that `unlock`
/// requires; a mismatched token fails without side effects.
pub trait Locker {
    fn lock(&self, info: &LockInfo) -> Result<String>;
    fn unlock(&self, id: &str) -> Result<()>;
}

/// A complete state handle.
pub trait State: StateReader + StateWriter + StateRefresher + StatePersister + Locker {}

impl<T> State for T where T: StateReader + StateWriter + StateRefresher + StatePersister + Locker {}
