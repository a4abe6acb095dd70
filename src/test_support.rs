use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};
use tempfile::TempDir;

use crate::commands::init::cmd_init;
use crate::context::WorkspaceContext;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// A scratch directory with `statelock init` already run in it.
pub(crate) fn create_test_workspace() -> (TempDir, WorkspaceContext) {
    let temp_dir = TempDir::new().unwrap();
    cmd_init(Some(temp_dir.path())).unwrap();
    let ctx = WorkspaceContext::resolve(Some(temp_dir.path())).unwrap();
    (temp_dir, ctx)
}
