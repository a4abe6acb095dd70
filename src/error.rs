//! Error types for the statelock CLI.
//!
//! Domain errors live next to the code that raises them (`StateError`,
//! `LockError`, `HookError`); this module folds them into the one error the
//! binary reports, and maps each to an exit code.

use crate::exit_codes;
use crate::hooks::HookError;
use crate::state::StateError;
use thiserror::Error;

/// Main error type for statelock commands.
#[derive(Error, Debug)]
pub enum StatelockError {
    /// User provided invalid arguments or the workspace is in an invalid state.
    #[error("{0}")]
    UserError(String),

    /// Reading, writing, or locking the state failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// A lifecycle hook reported a failure.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// The run was halted by a stop request after `applied` of `total` changes.
    #[error("interrupted: applied {applied} of {total} change(s) before stopping")]
    Interrupted { applied: usize, total: usize },
}

impl StatelockError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            StatelockError::UserError(_) => exit_codes::USER_ERROR,
            StatelockError::State(err) if err.is_lock_error() => exit_codes::LOCK_FAILURE,
            StatelockError::State(_) => exit_codes::STATE_FAILURE,
            StatelockError::Hook(_) => exit_codes::STATE_FAILURE,
            StatelockError::Interrupted { .. } => exit_codes::INTERRUPTED,
        }
    }
}

/// Result type alias for statelock commands.
pub type Result<T> = std::result::Result<T, StatelockError>;
