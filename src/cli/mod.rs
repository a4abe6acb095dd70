//! CLI argument parsing for statelock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Statelock: cooperative locking and safe mutation of a shared state file.
///
/// Every mutating command locks the state first. When someone else holds
/// the lock, statelock retries with backoff for up to `--lock-timeout`
/// seconds and then reports who holds it. Ctrl-C stops a run between
/// changes; finished changes are kept.
#[derive(Parser, Debug)]
#[command(name = "statelock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Workspace directory (default: current directory).
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for statelock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a workspace in the current directory.
    ///
    /// Creates `.statelock/`, a default `config.yaml`, and an empty state file.
    Init,

    /// Print the current state as JSON.
    Show,

    /// Set one or more keys in the state.
    ///
    /// Values that parse as JSON are stored as JSON; anything else is stored
    /// as a string.
    Set(SetArgs),

    /// Remove one or more keys from the state.
    Unset(UnsetArgs),

    /// Lock management commands.
    Lock(LockCommand),
}

/// Options shared by commands that take the state lock.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct LockArgs {
    /// Seconds to keep retrying a held lock (default: from config).
    #[arg(long, value_name = "SECS")]
    pub lock_timeout: Option<u64>,

    /// Free-text reason recorded with the lock.
    #[arg(long)]
    pub reason: Option<String>,
}

/// Arguments for the `set` command.
#[derive(Parser, Debug)]
pub struct SetArgs {
    /// Assignments in KEY=VALUE form.
    #[arg(required = true, value_name = "KEY=VALUE")]
    pub assignments: Vec<String>,

    /// Do not lock the state.
    #[arg(long)]
    pub no_lock: bool,

    #[command(flatten)]
    pub lock: LockArgs,
}

/// Arguments for the `unset` command.
#[derive(Parser, Debug)]
pub struct UnsetArgs {
    /// Keys to remove.
    #[arg(required = true, value_name = "KEY")]
    pub keys: Vec<String>,

    /// Do not lock the state.
    #[arg(long)]
    pub no_lock: bool,

    #[command(flatten)]
    pub lock: LockArgs,
}

/// Lock subcommand wrapper.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// Acquire the state lock and keep it after exiting.
    ///
    /// Prints the lock ID, which `lock release` needs.
    Acquire(LockArgs),

    /// Release a lock previously acquired with `lock acquire`.
    Release(LockReleaseArgs),

    /// Show who holds the state lock.
    Info,
}

/// Arguments for the `lock release` command.
#[derive(Parser, Debug)]
pub struct LockReleaseArgs {
    /// The lock ID printed by `lock acquire`.
    pub lock_id: String,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
