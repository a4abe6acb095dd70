//! Config struct definition and default implementation.

use serde::{Deserialize, Serialize};

/// Configuration for a statelock workspace.
///
/// This struct represents the contents of `.statelock/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // State settings
    // =========================================================================
    /// Path of the state file, relative to the workspace root.
    #[serde(default = "default_state_file")]
    pub state_file: String,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Whether mutating commands lock the state.
    #[serde(default = "default_true")]
    pub lock: bool,

    /// How long to keep retrying a held lock, in seconds (0 = one attempt).
    #[serde(default)]
    pub lock_timeout_secs: u64,

    /// First wait between lock attempts, in milliseconds.
    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    /// Longest wait between lock attempts, in milliseconds.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

fn default_state_file() -> String {
    "state.json".to_string()
}

fn default_true() -> bool {
    true
}

fn default_backoff_initial_ms() -> u64 {
    1_000
}

fn default_backoff_max_ms() -> u64 {
    16_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            lock: true,
            lock_timeout_secs: 0,
            backoff_initial_ms: default_backoff_initial_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}
