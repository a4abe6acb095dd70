//! Implementation of the `statelock init` command.
//!
//! # What `statelock init` does
//!
//! 1. Creates the `.statelock/` data directory
//! 2. Writes a default `config.yaml` (if missing)
//! 3. Creates an empty state file at the configured path (if missing)
//! 4. Appends an `init` event to the audit log

use crate::config::Config;
use crate::context::WorkspaceContext;
use crate::error::{Result, StatelockError};
use crate::events::{Event, EventAction, record};
use crate::fs::atomic_write;
use crate::state::{FileState, StatePersister, StateSnapshot, StateWriter};
use serde_json::json;
use std::fs;
use std::path::Path;
use tracing::info;

/// Execute the `statelock init` command.
///
/// This command is **idempotent**: an existing config or state file is left
/// untouched.
pub fn cmd_init(dir: Option<&Path>) -> Result<()> {
    let ctx = WorkspaceContext::resolve(dir)?;

    fs::create_dir_all(&ctx.data_dir).map_err(|e| {
        StatelockError::UserError(format!(
            "failed to create data directory '{}': {}",
            ctx.data_dir.display(),
            e
        ))
    })?;

    let config_created = ensure_config(&ctx)?;
    let config = ctx.load_config()?;
    let state_path = ctx.state_path(&config);
    let state_created = ensure_state(&state_path)?;

    info!(root = %ctx.root.display(), config_created, state_created, "initialized workspace");
    record(
        &ctx,
        Event::new(EventAction::Init).with_details(json!({
            "state_file": config.state_file,
            "config_created": config_created,
            "state_created": state_created,
        })),
    );

    println!("Initialized statelock workspace.");
    println!();
    println!("Config: {}", ctx.config_path().display());
    println!("State:  {}", state_path.display());
    if !config_created && !state_created {
        println!();
        println!("(already initialized; nothing was changed)");
    }

    Ok(())
}

/// Write the default config unless one exists. Returns true if written.
fn ensure_config(ctx: &WorkspaceContext) -> Result<bool> {
    let path = ctx.config_path();
    if path.exists() {
        return Ok(false);
    }

    let yaml = Config::default().to_yaml()?;
    atomic_write(&path, yaml.as_bytes()).map_err(|e| {
        StatelockError::UserError(format!(
            "failed to write config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    Ok(true)
}

/// Create an empty state file unless one exists. Returns true if created.
fn ensure_state(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    let state = FileState::new(path);
    state.write_state(&StateSnapshot::new())?;
    state.persist_state()?;
    Ok(true)
}
