//! Lifecycle hooks.
//!
//! A graph walker calls [`Hook::on_event`] immediately before and after every
//! resource operation. Each call answers with a [`HookAction`]; once any hook
//! answers `Halt`, the walker must stop scheduling new operations. Operations
//! already in flight are allowed to finish.
//!
//! Streamed provisioner output goes through [`Hook::provision_output`], which
//! has no answer and therefore cannot halt anything.

mod stop;

#[cfg(test)]
mod tests;

pub use stop::{StopHook, Stopper};

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// What the walker should do after a check-point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    /// Carry on with the next operation.
    Continue,
    /// Do not start any further operations.
    Halt,
}

/// The gated lifecycle points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    PreApply,
    PostApply,
    PreDiff,
    PostDiff,
    PreProvisionInstance,
    PostProvisionInstance,
    PreProvisionInstanceStep,
    PostProvisionInstanceStep,
    PreRefresh,
    PostRefresh,
    PreImportState,
    PostImportState,
    PostStateUpdate,
}

impl HookEvent {
    /// Every gated lifecycle point.
    pub const ALL: [HookEvent; 13] = [
        HookEvent::PreApply,
        HookEvent::PostApply,
        HookEvent::PreDiff,
        HookEvent::PostDiff,
        HookEvent::PreProvisionInstance,
        HookEvent::PostProvisionInstance,
        HookEvent::PreProvisionInstanceStep,
        HookEvent::PostProvisionInstanceStep,
        HookEvent::PreRefresh,
        HookEvent::PostRefresh,
        HookEvent::PreImportState,
        HookEvent::PostImportState,
        HookEvent::PostStateUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::PreApply => "pre_apply",
            HookEvent::PostApply => "post_apply",
            HookEvent::PreDiff => "pre_diff",
            HookEvent::PostDiff => "post_diff",
            HookEvent::PreProvisionInstance => "pre_provision_instance",
            HookEvent::PostProvisionInstance => "post_provision_instance",
            HookEvent::PreProvisionInstanceStep => "pre_provision_instance_step",
            HookEvent::PostProvisionInstanceStep => "post_provision_instance_step",
            HookEvent::PreRefresh => "pre_refresh",
            HookEvent::PostRefresh => "post_refresh",
            HookEvent::PreImportState => "pre_import_state",
            HookEvent::PostImportState => "post_import_state",
            HookEvent::PostStateUpdate => "post_state_update",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hook failed while handling a lifecycle event.
#[derive(Error, Debug)]
#[error("{event} hook failed: {message}")]
pub struct HookError {
    pub event: HookEvent,
    pub message: String,
}

/// Receives lifecycle events from a graph walk.
pub trait Hook: Send + Sync {
    /// Called before and after each operation. `addr` names the resource,
    /// when the event concerns one.
    fn on_event(&self, event: HookEvent, addr: Option<&str>) -> Result<HookAction, HookError>;

    /// Called for each line of provisioner output. Never gated.
    fn provision_output(&self, _addr: &str, _provisioner: &str, _line: &str) {}
}

/// Deliver `event` to every hook in order.
///
/// All hooks see the event; the result is `Halt` if any of them asked for it.
/// The first error stops delivery and is returned.
pub fn dispatch(
    hooks: &[Arc<dyn Hook>],
    event: HookEvent,
    addr: Option<&str>,
) -> Result<HookAction, HookError> {
    let mut action = HookAction::Continue;
    for hook in hooks {
        if hook.on_event(event, addr)? == HookAction::Halt {
            action = HookAction::Halt;
        }
    }
    Ok(action)
}
