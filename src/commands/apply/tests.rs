//! Tests for the set/unset walk.

use super::*;
use crate::events::Event;
use crate::exit_codes;
use crate::hooks::{HookError, Stopper};
use crate::locks::LockInfoFactory;
use crate::state::{InmemState, Locker, StateReader, StateRefresher};
use crate::test_support::create_test_workspace;
use std::fs;
use std::sync::Mutex;

fn set(key: &str, value: Value) -> Change {
    Change::Set {
        key: key.to_string(),
        value,
    }
}

fn stop_hooks() -> (Stopper, Vec<Arc<dyn Hook>>) {
    let stop = StopHook::new();
    let stopper = stop.stopper();
    (stopper, vec![Arc::new(stop) as Arc<dyn Hook>])
}

/// Records every event it sees and calls `stop` after the Nth `PostApply`.
struct StopAfter {
    after: usize,
    stopper: Stopper,
    seen: Mutex<Vec<(HookEvent, Option<String>)>>,
}

impl StopAfter {
    fn new(after: usize, stopper: Stopper) -> Self {
        Self {
            after,
            stopper,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<(HookEvent, Option<String>)> {
        self.seen.lock().unwrap().clone()
    }
}

impl Hook for StopAfter {
    fn on_event(&self, event: HookEvent, addr: Option<&str>) -> std::result::Result<HookAction, HookError> {
        let mut seen = self.seen.lock().unwrap();
        seen.push((event, addr.map(str::to_string)));
        let post_applies = seen
            .iter()
            .filter(|(e, _)| *e == HookEvent::PostApply)
            .count();
        if post_applies == self.after {
            self.stopper.stop();
        }
        Ok(HookAction::Continue)
    }
}

struct FailOn(HookEvent);

impl Hook for FailOn {
    fn on_event(&self, event: HookEvent, _addr: Option<&str>) -> std::result::Result<HookAction, HookError> {
        if event == self.0 {
            return Err(HookError {
                event,
                message: "refused".to_string(),
            });
        }
        Ok(HookAction::Continue)
    }
}

fn read_events(ctx: &crate::context::WorkspaceContext) -> Vec<Event> {
    fs::read_to_string(ctx.events_file())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn reread(path: &Path) -> StateSnapshot {
    let state = FileState::new(path);
    state.refresh_state().unwrap();
    state.state().unwrap()
}

// ============================================================================
// Assignment parsing
// ============================================================================

#[test]
fn test_parse_assignment_json_values() {
    assert_eq!(parse_assignment("count=3").unwrap(), set("count", json!(3)));
    assert_eq!(parse_assignment("on=true").unwrap(), set("on", json!(true)));
    assert_eq!(
        parse_assignment("zones=[\"a\",\"b\"]").unwrap(),
        set("zones", json!(["a", "b"]))
    );
}

#[test]
fn test_parse_assignment_falls_back_to_string() {
    assert_eq!(
        parse_assignment("region=eu-west-1").unwrap(),
        set("region", json!("eu-west-1"))
    );
    assert_eq!(parse_assignment("empty=").unwrap(), set("empty", json!("")));
}

#[test]
fn test_parse_assignment_splits_on_first_equals() {
    assert_eq!(
        parse_assignment("query=a=b").unwrap(),
        set("query", json!("a=b"))
    );
}

#[test]
fn test_parse_assignment_rejects_bad_input() {
    let err = parse_assignment("no-equals").unwrap_err();
    assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    assert!(err.to_string().contains("KEY=VALUE"));

    let err = parse_assignment(" =value").unwrap_err();
    assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
}

// ============================================================================
// The walk
// ============================================================================

#[test]
fn test_apply_all_changes() {
    let state = InmemState::new();
    let (_stopper, hooks) = stop_hooks();
    let changes = vec![
        set("region", json!("eu-west-1")),
        set("count", json!(3)),
        Change::Unset {
            key: "region".to_string(),
        },
    ];

    let outcome = apply_changes(&state, &hooks, &changes).unwrap();

    assert_eq!(outcome.applied, 3);
    assert!(!outcome.halted);
    let snapshot = state.state().unwrap();
    assert_eq!(snapshot.get("count"), Some(&json!(3)));
    assert!(snapshot.get("region").is_none());
}

#[test]
fn test_stopped_before_start_applies_nothing() {
    let state = InmemState::new();
    let (stopper, hooks) = stop_hooks();
    stopper.stop();

    let outcome = apply_changes(&state, &hooks, &[set("a", json!(1))]).unwrap();

    assert_eq!(outcome.applied, 0);
    assert!(outcome.halted);
    assert!(state.state().is_none());
}

#[test]
fn test_stop_mid_walk_keeps_completed_changes() {
    let state = InmemState::new();
    let stop = StopHook::new();
    let trigger = Arc::new(StopAfter::new(2, stop.stopper()));
    let hooks: Vec<Arc<dyn Hook>> = vec![trigger.clone(), Arc::new(stop)];
    let changes = vec![
        set("a", json!(1)),
        set("b", json!(2)),
        set("c", json!(3)),
        set("d", json!(4)),
    ];

    let outcome = apply_changes(&state, &hooks, &changes).unwrap();

    assert_eq!(outcome.applied, 2);
    assert!(outcome.halted);
    let snapshot = state.state().unwrap();
    assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec!["a", "b"]);

    // Halting at b's PostApply means c never got a PreApply.
    let seen = trigger.seen();
    assert!(!seen.iter().any(|(_, addr)| addr.as_deref() == Some("c")));
    assert_eq!(seen.last().unwrap().0, HookEvent::PostStateUpdate);
}

#[test]
fn test_events_bracket_each_change() {
    let state = InmemState::new();
    let stop = StopHook::new();
    let recorder = Arc::new(StopAfter::new(usize::MAX, stop.stopper()));
    let hooks: Vec<Arc<dyn Hook>> = vec![recorder.clone()];

    apply_changes(&state, &hooks, &[set("a", json!(1)), set("b", json!(2))]).unwrap();

    assert_eq!(
        recorder.seen(),
        vec![
            (HookEvent::PreApply, Some("a".to_string())),
            (HookEvent::PostApply, Some("a".to_string())),
            (HookEvent::PreApply, Some("b".to_string())),
            (HookEvent::PostApply, Some("b".to_string())),
            (HookEvent::PostStateUpdate, None),
        ]
    );
}

#[test]
fn test_hook_error_aborts_walk() {
    let state = InmemState::new();
    let hooks: Vec<Arc<dyn Hook>> = vec![Arc::new(FailOn(HookEvent::PreApply))];

    let err = apply_changes(&state, &hooks, &[set("a", json!(1))]).unwrap_err();

    assert!(matches!(err, StatelockError::Hook(_)));
    assert!(state.state().is_none());
}

#[test]
fn test_halted_walk_persists_to_file() {
    let (temp_dir, _ctx) = create_test_workspace();
    let path = temp_dir.path().join("state.json");
    let state = FileState::new(&path);
    state.refresh_state().unwrap();

    let stop = StopHook::new();
    let hooks: Vec<Arc<dyn Hook>> = vec![
        Arc::new(StopAfter::new(1, stop.stopper())),
        Arc::new(stop),
    ];

    let outcome =
        apply_changes(&state, &hooks, &[set("a", json!(1)), set("b", json!(2))]).unwrap();

    assert_eq!(outcome.applied, 1);
    assert_eq!(outcome.serial, Some(1));
    let snapshot = reread(&path);
    assert_eq!(snapshot.get("a"), Some(&json!(1)));
    assert!(snapshot.get("b").is_none());
    assert_eq!(snapshot.serial, 1);
}

// ============================================================================
// Commands
// ============================================================================

fn set_args(assignments: &[&str]) -> SetArgs {
    SetArgs {
        assignments: assignments.iter().map(|s| s.to_string()).collect(),
        no_lock: false,
        lock: LockArgs::default(),
    }
}

#[tokio::test]
async fn test_cmd_set_persists_and_unlocks() {
    let (temp_dir, ctx) = create_test_workspace();
    let path = temp_dir.path().join("state.json");

    cmd_set(Some(temp_dir.path()), set_args(&["region=eu-west-1", "count=3"]))
        .await
        .unwrap();

    let snapshot = reread(&path);
    assert_eq!(snapshot.get("region"), Some(&json!("eu-west-1")));
    assert_eq!(snapshot.get("count"), Some(&json!(3)));
    assert_eq!(snapshot.serial, 1);

    let state = FileState::new(&path);
    assert!(state.lock_info().unwrap().is_none());

    let events = read_events(&ctx);
    let last = events.last().unwrap();
    assert_eq!(last.action, EventAction::Apply);
    assert!(last.lock_id.is_some());
    assert_eq!(last.details["applied"], json!(2));
}

#[tokio::test]
async fn test_cmd_unset_removes_keys() {
    let (temp_dir, _ctx) = create_test_workspace();
    let path = temp_dir.path().join("state.json");
    cmd_set(Some(temp_dir.path()), set_args(&["a=1", "b=2"]))
        .await
        .unwrap();

    let args = UnsetArgs {
        keys: vec!["a".to_string()],
        no_lock: false,
        lock: LockArgs::default(),
    };
    cmd_unset(Some(temp_dir.path()), args).await.unwrap();

    let snapshot = reread(&path);
    assert!(snapshot.get("a").is_none());
    assert_eq!(snapshot.get("b"), Some(&json!(2)));
    assert_eq!(snapshot.serial, 2);
}

#[tokio::test]
async fn test_cmd_set_fails_fast_on_held_lock() {
    let (temp_dir, _ctx) = create_test_workspace();
    let path = temp_dir.path().join("state.json");
    let holder = FileState::new(&path);
    let id = holder
        .lock(&LockInfoFactory::seeded(7).new_lock_info())
        .unwrap();

    let mut args = set_args(&["a=1"]);
    args.lock.lock_timeout = Some(0);
    let err = cmd_set(Some(temp_dir.path()), args).await.unwrap_err();

    assert_eq!(err.exit_code(), exit_codes::LOCK_FAILURE);
    assert!(err.to_string().contains(&id));
    assert!(reread(&path).is_empty());
    assert_eq!(holder.lock_info().unwrap().unwrap().id(), id);
}

#[tokio::test]
async fn test_cmd_set_no_lock_ignores_held_lock() {
    let (temp_dir, _ctx) = create_test_workspace();
    let path = temp_dir.path().join("state.json");
    let holder = FileState::new(&path);
    holder
        .lock(&LockInfoFactory::seeded(7).new_lock_info())
        .unwrap();

    let mut args = set_args(&["a=1"]);
    args.no_lock = true;
    cmd_set(Some(temp_dir.path()), args).await.unwrap();

    assert_eq!(reread(&path).get("a"), Some(&json!(1)));
}

#[tokio::test]
async fn test_cmd_set_requires_workspace() {
    let temp_dir = tempfile::TempDir::new().unwrap();

    let err = cmd_set(Some(temp_dir.path()), set_args(&["a=1"]))
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
}
