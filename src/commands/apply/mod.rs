//! Implementation of the `statelock set` and `statelock unset` commands.
//!
//! Both commands run the same walk: lock, refresh, then apply each change as
//! one discrete step bracketed by `PreApply`/`PostApply` hook dispatch. Once a
//! hook answers `Halt` no further change starts; whatever was applied is
//! written, announced with `PostStateUpdate`, and persisted before unlocking.

use super::{acquire_lock, spawn_interrupt_handler};
use crate::cli::{LockArgs, SetArgs, UnsetArgs};
use crate::context::require_initialized_workspace;
use crate::error::{Result, StatelockError};
use crate::events::{Event, EventAction, record};
use crate::hooks::{Hook, HookAction, HookEvent, StopHook, dispatch};
use crate::locks::StateLockGuard;
use crate::state::{FileState, State, StateRefresher, StateSnapshot};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A single mutation of the state.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Set { key: String, value: Value },
    Unset { key: String },
}

impl Change {
    pub fn key(&self) -> &str {
        match self {
            Change::Set { key, .. } | Change::Unset { key } => key,
        }
    }

    fn apply_to(&self, snapshot: &mut StateSnapshot) {
        match self {
            Change::Set { key, value } => {
                snapshot.set(key.clone(), value.clone());
            }
            Change::Unset { key } => {
                snapshot.remove(key);
            }
        }
    }
}

/// Parse a `KEY=VALUE` assignment.
///
/// The value is stored as JSON when it parses as JSON (`3`, `true`,
/// `["a"]`), and as a plain string otherwise.
pub fn parse_assignment(raw: &str) -> Result<Change> {
    let (key, value) = raw.split_once('=').ok_or_else(|| {
        StatelockError::UserError(format!(
            "invalid assignment '{}': expected KEY=VALUE",
            raw
        ))
    })?;

    let key = validate_key(key)?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok(Change::Set { key, value })
}

fn validate_key(key: &str) -> Result<String> {
    let key = key.trim();
    if key.is_empty() {
        return Err(StatelockError::UserError(
            "state keys must not be empty".to_string(),
        ));
    }
    Ok(key.to_string())
}

/// The result of walking a list of changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// How many changes were applied (and persisted).
    pub applied: usize,
    /// True if a hook asked the walk to stop.
    pub halted: bool,
    /// The state's serial after persisting.
    pub serial: Option<u64>,
}

/// Apply `changes` to the current snapshot of `state`, one at a time.
///
/// Hooks are consulted before and after each change. A `Halt` stops the walk
/// before the next change starts; the change in progress is never abandoned
/// halfway. If anything was applied, the result is written and persisted.
/// `PostStateUpdate` is announced between the two; a `Halt` answer there has
/// nothing left to stop and does not prevent persisting.
pub fn apply_changes<S: State + ?Sized>(
    state: &S,
    hooks: &[Arc<dyn Hook>],
    changes: &[Change],
) -> Result<ApplyOutcome> {
    let mut snapshot = state.state().unwrap_or_default();
    let mut applied = 0;
    let mut halted = false;

    for change in changes {
        if dispatch(hooks, HookEvent::PreApply, Some(change.key()))? == HookAction::Halt {
            halted = true;
            break;
        }

        change.apply_to(&mut snapshot);
        applied += 1;
        debug!(key = change.key(), "applied change");

        if dispatch(hooks, HookEvent::PostApply, Some(change.key()))? == HookAction::Halt {
            halted = true;
            break;
        }
    }

    if applied > 0 {
        state.write_state(&snapshot)?;
        dispatch(hooks, HookEvent::PostStateUpdate, None)?;
        state.persist_state()?;
    }

    Ok(ApplyOutcome {
        applied,
        halted,
        serial: state.state().map(|s| s.serial),
    })
}

/// Execute the `statelock set` command.
pub async fn cmd_set(dir: Option<&Path>, args: SetArgs) -> Result<()> {
    let changes = args
        .assignments
        .iter()
        .map(|raw| parse_assignment(raw))
        .collect::<Result<Vec<_>>>()?;

    run_changes(dir, &changes, args.no_lock, &args.lock, "set").await
}

/// Execute the `statelock unset` command.
pub async fn cmd_unset(dir: Option<&Path>, args: UnsetArgs) -> Result<()> {
    let changes = args
        .keys
        .iter()
        .map(|key| validate_key(key).map(|key| Change::Unset { key }))
        .collect::<Result<Vec<_>>>()?;

    run_changes(dir, &changes, args.no_lock, &args.lock, "unset").await
}

async fn run_changes(
    dir: Option<&Path>,
    changes: &[Change],
    no_lock: bool,
    lock_args: &LockArgs,
    operation: &str,
) -> Result<()> {
    let ctx = require_initialized_workspace(dir)?;
    let config = ctx.load_config()?;
    let state = FileState::new(ctx.state_path(&config));

    let stop = StopHook::new();
    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone(), Some(stop.stopper()));
    let hooks: Vec<Arc<dyn Hook>> = vec![Arc::new(stop)];

    // Dropping the guard on an early return releases the lock.
    let guard = if config.lock && !no_lock {
        let id = acquire_lock(&state, &config, lock_args, operation, &cancel).await?;
        Some(StateLockGuard::new(&state, id))
    } else {
        None
    };
    let lock_id = guard.as_ref().map(|g| g.id().to_string());

    state.refresh_state()?;
    let outcome = apply_changes(&state, &hooks, changes)?;

    if let Some(guard) = guard {
        let id = guard.id().to_string();
        if let Err(e) = guard.release() {
            eprintln!("Failed to release the state lock: {}", e);
            eprintln!("Release it manually with: statelock lock release {}", id);
            return Err(e.into());
        }
    }

    let total = changes.len();
    let interrupted = outcome.halted && outcome.applied < total;
    let action = if interrupted {
        EventAction::Interrupted
    } else {
        EventAction::Apply
    };
    let mut event = Event::new(action).with_details(json!({
        "operation": operation,
        "applied": outcome.applied,
        "total": total,
        "serial": outcome.serial,
    }));
    if let Some(id) = lock_id {
        event = event.with_lock_id(id);
    }
    record(&ctx, event);

    info!(
        operation,
        applied = outcome.applied,
        total,
        serial = ?outcome.serial,
        "finished applying changes"
    );

    if interrupted {
        return Err(StatelockError::Interrupted {
            applied: outcome.applied,
            total,
        });
    }

    match outcome.serial {
        Some(serial) => println!("Applied {} change(s); state serial is now {}.", total, serial),
        None => println!("Applied {} change(s).", total),
    }
    Ok(())
}

#[cfg(test)]
mod tests;
