//! Exit code constants for the statelock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, uninitialized workspace, bad config)
//! - 2: State failure (read/parse/persist of the state file)
//! - 3: Interrupted (stop requested before all changes were applied)
//! - 4: Lock failure (state is locked by someone else, or the lock is unreadable)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration, or missing workspace.
pub const USER_ERROR: i32 = 1;

/// State failure: the state file could not be read, parsed, or persisted.
pub const STATE_FAILURE: i32 = 2;

/// Interrupted: the run was halted cooperatively before finishing.
pub const INTERRUPTED: i32 = 3;

/// Lock failure: the state lock could not be acquired or released.
pub const LOCK_FAILURE: i32 = 4;
