//! Command implementations for statelock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the lock and interrupt plumbing they share.

pub mod apply;
pub mod init;
pub mod lock;
pub mod show;

use crate::cli::{Cli, Command, LockAction, LockArgs};
use crate::config::Config;
use crate::error::Result;
use crate::hooks::Stopper;
use crate::locks::{LockCoordinator, LockError, LockInfoFactory, cancel_after};
use crate::state::FileState;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Dispatch a command to its implementation.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let dir = cli.dir.as_deref();
    match cli.command {
        Command::Init => init::cmd_init(dir),
        Command::Show => show::cmd_show(dir),
        Command::Set(args) => apply::cmd_set(dir, args).await,
        Command::Unset(args) => apply::cmd_unset(dir, args).await,
        Command::Lock(lock_cmd) => match lock_cmd.action {
            LockAction::Acquire(args) => lock::cmd_lock_acquire(dir, args).await,
            LockAction::Release(args) => lock::cmd_lock_release(dir, args),
            LockAction::Info => lock::cmd_lock_info(dir),
        },
    }
}

/// Acquire the lock on `state` for `operation`.
///
/// Retries a held lock for `--lock-timeout` seconds (or the configured
/// default), and gives up early if `cancel` fires. On failure the error names
/// the current holder.
pub(crate) async fn acquire_lock(
    state: &FileState,
    config: &Config,
    args: &LockArgs,
    operation: &str,
    cancel: &CancellationToken,
) -> Result<String> {
    let mut info = LockInfoFactory::from_entropy()
        .new_lock_info()
        .with_operation(operation);
    if let Some(reason) = &args.reason {
        info = info.with_reason(reason.as_str());
    }

    let timeout = args
        .lock_timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.lock_timeout());
    let deadline = cancel_after(cancel, timeout);

    let deadline_view = deadline.token().clone();
    let coordinator = LockCoordinator::new(config.backoff()).on_conflict(move |err| {
        if let Some(notice) = wait_notice(err, &deadline_view) {
            eprintln!("{}", notice);
        }
    });

    debug!(id = info.id(), operation, ?timeout, "acquiring state lock");
    let id = coordinator.acquire(&deadline, state, &info).await?;
    Ok(id)
}

/// The message shown while waiting on a held lock, if a wait will happen.
///
/// Once the deadline has passed the conflict becomes the command's error and
/// there is no wait to announce.
fn wait_notice(err: &LockError, deadline: &CancellationToken) -> Option<String> {
    if deadline.is_cancelled() {
        return None;
    }
    err.info().map(|holder| {
        format!(
            "State is locked by {} (lock ID {}), waiting...",
            holder.who(),
            holder.id()
        )
    })
}

/// On Ctrl-C, cancel `cancel` and ask the walk behind `stopper` to halt.
///
/// The handler only sets flags: in-flight work finishes, and nothing new
/// starts once the walk observes the stop.
pub(crate) fn spawn_interrupt_handler(cancel: CancellationToken, stopper: Option<Stopper>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupt received. Finishing the current step, then stopping...");
            if let Some(stopper) = stopper {
                stopper.stop();
            }
            cancel.cancel();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::LockInfo;
    use chrono::Utc;

    fn held() -> LockError {
        LockError::held_by(
            "state file is locked",
            LockInfo::new("abc-123", "alice@host1", "0.1.0", Utc::now()),
        )
    }

    #[test]
    fn test_wait_notice_names_holder_while_waiting() {
        let deadline = CancellationToken::new();

        let notice = wait_notice(&held(), &deadline).unwrap();

        assert!(notice.contains("alice@host1"));
        assert!(notice.contains("abc-123"));
        assert!(notice.contains("waiting"));
    }

    #[test]
    fn test_wait_notice_silent_when_deadline_passed() {
        let deadline = CancellationToken::new();
        deadline.cancel();

        assert!(wait_notice(&held(), &deadline).is_none());
    }

    #[tokio::test]
    async fn test_zero_timeout_deadline_suppresses_notice() {
        let deadline = cancel_after(&CancellationToken::new(), Duration::ZERO);

        assert!(wait_notice(&held(), &deadline).is_none());
    }
}
