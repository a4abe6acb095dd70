//! Workspace context resolution for statelock.
//!
//! A workspace is a directory containing `.statelock/`. All commands locate
//! config, state, and the audit log through this module so paths are
//! resolved the same way everywhere.

use crate::config::Config;
use crate::error::{Result, StatelockError};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the workspace data directory.
pub const DATA_DIR: &str = ".statelock";

/// Resolved paths for a statelock workspace. All paths are absolute.
#[derive(Debug, Clone)]
pub struct WorkspaceContext {
    /// The workspace root.
    pub root: PathBuf,

    /// `{root}/.statelock/`.
    pub data_dir: PathBuf,
}

impl WorkspaceContext {
    /// Resolve the workspace rooted at `dir`, or at the current directory.
    pub fn resolve(dir: Option<&Path>) -> Result<Self> {
        let root = match dir {
            Some(dir) => dir.to_path_buf(),
            None => env::current_dir().map_err(|e| {
                StatelockError::UserError(format!(
                    "failed to get current working directory: {}",
                    e
                ))
            })?,
        };

        let root = if root.is_absolute() {
            root
        } else {
            env::current_dir()
                .map(|cwd| cwd.join(&root))
                .unwrap_or(root)
        };

        Ok(Self {
            data_dir: root.join(DATA_DIR),
            root,
        })
    }

    /// Check if the workspace has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.data_dir.is_dir()
    }

    /// Ensure the workspace is initialized, returning an error if not.
    pub fn ensure_initialized(&self) -> Result<()> {
        if !self.is_initialized() {
            return Err(StatelockError::UserError(format!(
                "statelock workspace not initialized.\n\
                 Expected data directory at: {}\n\n\
                 Run `statelock init` to initialize this directory.",
                self.data_dir.display()
            )));
        }
        Ok(())
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.yaml")
    }

    /// Get the path to the audit log.
    pub fn events_file(&self) -> PathBuf {
        self.data_dir.join("events.ndjson")
    }

    /// Get the path to the state file named by `config`.
    pub fn state_path(&self, config: &Config) -> PathBuf {
        self.root.join(&config.state_file)
    }

    /// Load this workspace's config, using defaults if none is written yet.
    pub fn load_config(&self) -> Result<Config> {
        Config::load_or_default(self.config_path())
    }
}

/// Resolve the workspace and ensure it is initialized.
///
/// Use this in every command except `init`.
pub fn require_initialized_workspace(dir: Option<&Path>) -> Result<WorkspaceContext> {
    let ctx = WorkspaceContext::resolve(dir)?;
    ctx.ensure_initialized()?;
    Ok(ctx)
}
