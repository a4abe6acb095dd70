//! The error a backend returns when a lock is held by someone else.

use super::info::LockInfo;
use std::error::Error;
use std::fmt;

type BoxError = Box<dyn Error + Send + Sync>;

/// A failed lock or unlock attempt.
///
/// `info` describes the current holder. Only an error whose holder carries
/// an ID counts as a conflict worth waiting on; without one the failure
/// cannot be attributed and callers must treat it as fatal.
#[derive(Debug, Default)]
pub struct LockError {
    err: Option<BoxError>,
    info: Option<LockInfo>,
}

impl LockError {
    /// A lock error with an underlying cause and no holder.
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self {
            err: Some(err.into()),
            info: None,
        }
    }

    /// A lock error naming the current holder.
    pub fn held_by(err: impl Into<BoxError>, info: LockInfo) -> Self {
        Self {
            err: Some(err.into()),
            info: Some(info),
        }
    }

    /// Attach (or replace) the holder.
    pub fn with_info(mut self, info: LockInfo) -> Self {
        self.info = Some(info);
        self
    }

    /// The current holder, if the backend could tell.
    pub fn info(&self) -> Option<&LockInfo> {
        self.info.as_ref()
    }

    /// True when the holder is fully attributed.
    pub fn is_conflict(&self) -> bool {
        self.info.as_ref().is_some_and(LockInfo::is_complete)
    }
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(2);
        if let Some(err) = &self.err {
            parts.push(err.to_string());
        }
        if let Some(info) = &self.info {
            parts.push(info.to_string());
        }
        f.write_str(&parts.join("\n"))
    }
}

impl Error for LockError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.err.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}
