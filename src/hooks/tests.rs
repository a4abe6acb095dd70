//! Tests for lifecycle hooks.

use super::*;
use std::sync::Mutex;
use std::thread;

fn actions(hook: &StopHook) -> Vec<HookAction> {
    HookEvent::ALL
        .iter()
        .map(|event| hook.on_event(*event, Some("aws_instance.web")).unwrap())
        .collect()
}

#[test]
fn test_stop_hook_starts_running() {
    let hook = StopHook::new();

    assert!(!hook.stopped());
    assert!(actions(&hook).iter().all(|a| *a == HookAction::Continue));
}

#[test]
fn test_every_check_point_halts_after_stop() {
    let hook = StopHook::new();
    hook.stop();

    assert!(hook.stopped());
    assert!(actions(&hook).iter().all(|a| *a == HookAction::Halt));
    assert_eq!(
        hook.on_event(HookEvent::PostStateUpdate, None).unwrap(),
        HookAction::Halt
    );
}

#[test]
fn test_reset_resumes_every_check_point() {
    let hook = StopHook::new();
    hook.stop();
    hook.stop();

    hook.reset();

    assert!(!hook.stopped());
    assert!(actions(&hook).iter().all(|a| *a == HookAction::Continue));
}

#[test]
fn test_provision_output_is_never_gated() {
    let hook = StopHook::new();
    hook.stop();

    hook.provision_output("null_resource.x", "local-exec", "still streaming");

    assert!(hook.stopped());
}

#[test]
fn test_provision_steps_are_the_check_points_not_the_output() {
    let hook = StopHook::new();
    let stopper = hook.stopper();
    let addr = Some("null_resource.x");

    assert_eq!(
        hook.on_event(HookEvent::PreProvisionInstanceStep, addr).unwrap(),
        HookAction::Continue
    );
    hook.provision_output("null_resource.x", "local-exec", "line 1");
    stopper.stop();
    hook.provision_output("null_resource.x", "local-exec", "line 2");

    assert_eq!(
        hook.on_event(HookEvent::PostProvisionInstanceStep, addr).unwrap(),
        HookAction::Halt
    );
    assert_eq!(
        hook.on_event(HookEvent::PreProvisionInstanceStep, addr).unwrap(),
        HookAction::Halt
    );
}

#[test]
fn test_stopper_halts_owner() {
    let hook = StopHook::new();
    let stopper = hook.stopper();

    stopper.stop();

    assert!(stopper.stopped());
    assert_eq!(
        hook.on_event(HookEvent::PreApply, None).unwrap(),
        HookAction::Halt
    );
}

#[test]
fn test_concurrent_stop_is_safe() {
    let hook = StopHook::new();

    thread::scope(|scope| {
        for _ in 0..8 {
            let stopper = hook.stopper();
            scope.spawn(move || {
                for _ in 0..100 {
                    stopper.stop();
                    assert!(stopper.stopped());
                }
            });
        }
    });

    assert!(hook.stopped());
}

#[test]
fn test_event_names_are_unique() {
    let mut names: Vec<&str> = HookEvent::ALL.iter().map(HookEvent::as_str).collect();
    names.sort_unstable();
    names.dedup();

    assert_eq!(names.len(), HookEvent::ALL.len());
}

/// Records events and answers with a fixed action.
struct Recorder {
    action: HookAction,
    seen: Mutex<Vec<HookEvent>>,
}

impl Recorder {
    fn new(action: HookAction) -> Arc<Self> {
        Arc::new(Self {
            action,
            seen: Mutex::new(Vec::new()),
        })
    }
}

impl Hook for Recorder {
    fn on_event(&self, event: HookEvent, _addr: Option<&str>) -> Result<HookAction, HookError> {
        self.seen.lock().unwrap().push(event);
        Ok(self.action)
    }
}

struct Failing;

impl Hook for Failing {
    fn on_event(&self, event: HookEvent, _addr: Option<&str>) -> Result<HookAction, HookError> {
        Err(HookError {
            event,
            message: "boom".to_string(),
        })
    }
}

#[test]
fn test_dispatch_halts_if_any_hook_halts() {
    let first = Recorder::new(HookAction::Halt);
    let second = Recorder::new(HookAction::Continue);
    let hooks: Vec<Arc<dyn Hook>> = vec![first.clone(), second.clone()];

    let action = dispatch(&hooks, HookEvent::PreApply, Some("a")).unwrap();

    assert_eq!(action, HookAction::Halt);
    assert_eq!(*second.seen.lock().unwrap(), vec![HookEvent::PreApply]);
}

#[test]
fn test_dispatch_continues_when_all_continue() {
    let stop = Arc::new(StopHook::new());
    let hooks: Vec<Arc<dyn Hook>> = vec![stop.clone(), Recorder::new(HookAction::Continue)];

    assert_eq!(
        dispatch(&hooks, HookEvent::PostApply, None).unwrap(),
        HookAction::Continue
    );

    stop.stop();
    assert_eq!(
        dispatch(&hooks, HookEvent::PostApply, None).unwrap(),
        HookAction::Halt
    );
}

#[test]
fn test_dispatch_returns_first_error() {
    let after = Recorder::new(HookAction::Continue);
    let hooks: Vec<Arc<dyn Hook>> = vec![Arc::new(Failing), after.clone()];

    let err = dispatch(&hooks, HookEvent::PreDiff, None).unwrap_err();

    assert_eq!(err.to_string(), "pre_diff hook failed: boom");
    assert!(after.seen.lock().unwrap().is_empty());
}
