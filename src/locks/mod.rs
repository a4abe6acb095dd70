//! State locking protocol.
//!
//! This module defines how a caller obtains exclusive use of a state:
//! - [`LockInfoFactory`] mints a unique, attributable [`LockInfo`] per attempt
//! - a backend's [`Locker`](crate::state::Locker) either grants the lock or
//!   fails, reporting the current holder in a [`LockError`]
//! - [`lock_with_context`] retries attributable conflicts behind an
//!   exponential backoff (1s doubling to 16s by default) until the caller's
//!   cancellation token fires
//! - [`StateLockGuard`] releases the token when dropped
//!
//! # Failure classes
//!
//! - a `LockError` with a complete holder is a conflict and is retried
//! - a `LockError` without one cannot be attributed and is returned at once
//! - any other error is an infrastructure failure and is returned at once
//!
//! Cancellation during a wait returns the last conflict, not a distinct
//! cancellation error, so the caller can tell the user who holds the lock.

mod coordinator;
mod error;
mod guard;
mod info;


pub use coordinator::{Backoff, Deadline, LockCoordinator, cancel_after, lock_with_context};
pub use error::LockError;
pub use guard::StateLockGuard;
pub use info::{CLIENT_VERSION, Identity, LockInfo, LockInfoFactory};
