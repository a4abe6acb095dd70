//! Implementation of the `statelock lock` subcommands.
//!
//! `lock acquire` takes the state lock and deliberately keeps it after the
//! process exits, so a person can hold off automation during maintenance.
//! `lock release` hands it back by ID; there is no way to release a lock
//! without knowing its ID.

use super::{acquire_lock, spawn_interrupt_handler};
use crate::cli::{LockArgs, LockReleaseArgs};
use crate::context::require_initialized_workspace;
use crate::error::{Result, StatelockError};
use crate::events::{Event, EventAction, record};
use crate::locks::StateLockGuard;
use crate::state::{FileState, Locker};
use serde_json::json;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Execute the `statelock lock acquire` command.
pub async fn cmd_lock_acquire(dir: Option<&Path>, args: LockArgs) -> Result<()> {
    let ctx = require_initialized_workspace(dir)?;
    let config = ctx.load_config()?;
    let state = FileState::new(ctx.state_path(&config));

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone(), None);

    let id = acquire_lock(&state, &config, &args, "lock", &cancel).await?;
    let id = StateLockGuard::new(&state, id).keep();

    record(
        &ctx,
        Event::new(EventAction::Lock)
            .with_lock_id(id.as_str())
            .with_details(json!({ "reason": args.reason })),
    );

    println!("Acquired state lock.");
    println!();
    println!("Lock ID: {}", id);
    println!();
    println!("Release it with: statelock lock release {}", id);
    Ok(())
}

/// Execute the `statelock lock release` command.
pub fn cmd_lock_release(dir: Option<&Path>, args: LockReleaseArgs) -> Result<()> {
    let ctx = require_initialized_workspace(dir)?;
    let config = ctx.load_config()?;
    let state = FileState::new(ctx.state_path(&config));

    if args.lock_id.trim().is_empty() {
        return Err(StatelockError::UserError(
            "lock ID must not be empty".to_string(),
        ));
    }

    state.unlock(&args.lock_id)?;
    record(
        &ctx,
        Event::new(EventAction::Unlock).with_lock_id(args.lock_id.as_str()),
    );

    println!("Released state lock {}.", args.lock_id);
    Ok(())
}

/// Execute the `statelock lock info` command.
pub fn cmd_lock_info(dir: Option<&Path>) -> Result<()> {
    let ctx = require_initialized_workspace(dir)?;
    let config = ctx.load_config()?;
    let state = FileState::new(ctx.state_path(&config));

    match state.lock_info()? {
        Some(holder) => println!("{}", holder),
        None => println!("No active lock."),
    }
    Ok(())
}
