//! Audit log for statelock.
//!
//! Every lock, unlock, and apply is appended to `.statelock/events.ndjson`,
//! one JSON object per line:
//! - `ts`: RFC3339 timestamp
//! - `action`: what happened (init, lock, unlock, apply, interrupted)
//! - `actor`: `user@host` of whoever ran the command
//! - `lock_id`: the lock the action ran under, if any
//! - `details`: freeform object with action-specific details
//!
//! The log is best-effort context for humans resolving lock conflicts; it is
//! never read back by statelock itself.

use crate::context::WorkspaceContext;
use crate::error::{Result, StatelockError};
use crate::locks::Identity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Workspace initialized
    Init,
    /// State lock acquired and kept
    Lock,
    /// State lock released by ID
    Unlock,
    /// Changes applied and persisted
    Apply,
    /// Apply halted by a stop request
    Interrupted,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::Init => write!(f, "init"),
            EventAction::Lock => write!(f, "lock"),
            EventAction::Unlock => write!(f, "unlock"),
            EventAction::Apply => write!(f, "apply"),
            EventAction::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub ts: DateTime<Utc>,
    pub action: EventAction,
    pub actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_id: Option<String>,
    pub details: Value,
}

impl Event {
    /// Create a new event stamped with the current time and local identity.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: Identity::current().who(),
            lock_id: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_lock_id(mut self, lock_id: impl Into<String>) -> Self {
        self.lock_id = Some(lock_id.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            StatelockError::UserError(format!("failed to serialize event to JSON: {}", e))
        })
    }
}

/// Append an event to the workspace's audit log, creating it if needed.
pub fn append_event(ctx: &WorkspaceContext, event: &Event) -> Result<()> {
    let events_file = ctx.events_file();
    let json_line = event.to_ndjson_line()?;

    if !ctx.data_dir.exists() {
        fs::create_dir_all(&ctx.data_dir).map_err(|e| {
            StatelockError::UserError(format!(
                "failed to create data directory '{}': {}",
                ctx.data_dir.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&events_file)
        .map_err(|e| {
            StatelockError::UserError(format!(
                "failed to open events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

    writeln!(file, "{}", json_line).map_err(|e| {
        StatelockError::UserError(format!(
            "failed to write event to '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    Ok(())
}

/// Append an event, logging instead of failing.
///
/// Used after the state has already changed, when refusing to report
/// success would be worse than a gap in the log.
pub fn record(ctx: &WorkspaceContext, event: Event) {
    if let Err(e) = append_event(ctx, &event) {
        tracing::warn!(action = %event.action, error = %e, "failed to append audit event");
    }
}
