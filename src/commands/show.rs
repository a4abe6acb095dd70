//! Implementation of the `statelock show` command.

use crate::context::require_initialized_workspace;
use crate::error::{Result, StatelockError};
use crate::state::{FileState, StateReader, StateRefresher, StateSnapshot};
use std::path::Path;

/// Execute the `statelock show` command.
///
/// Reads without locking: the output may be stale by the time it is printed.
pub fn cmd_show(dir: Option<&Path>) -> Result<()> {
    let ctx = require_initialized_workspace(dir)?;
    let config = ctx.load_config()?;
    let state = FileState::new(ctx.state_path(&config));

    match load_snapshot(&state)? {
        Some(snapshot) => println!("{}", render(&snapshot)?),
        None => println!("No state."),
    }
    Ok(())
}

fn load_snapshot(state: &FileState) -> Result<Option<StateSnapshot>> {
    state.refresh_state()?;
    Ok(state.state())
}

fn render(snapshot: &StateSnapshot) -> Result<String> {
    serde_json::to_string_pretty(snapshot).map_err(|e| {
        StatelockError::UserError(format!("failed to serialize state to JSON: {}", e))
    })
}
