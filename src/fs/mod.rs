//! Filesystem utilities for statelock.

pub mod atomic;

pub use atomic::atomic_write;
