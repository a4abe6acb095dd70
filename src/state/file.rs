//! File-backed state handle.
//!
//! The snapshot is a JSON document; the lock is a sibling file
//! `.{name}.lock.info` holding the holder's `LockInfo` as JSON, which is what
//! conflicting callers get shown.
//!
//! The lock file is written and fsynced under a private temp name first, then
//! published with a hard link. Linking fails if the target exists, so only one
//! process can hold the lock, and the file is never visible half-written.

use super::{
    Locker, Result, StateError, StatePersister, StateReader, StateRefresher, StateSnapshot,
    StateWriter,
};
use crate::fs::atomic_write;
use crate::locks::{LockError, LockInfo};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// How often to read a lock file whose holder is not readable yet.
const HOLDER_SETTLE_READS: u32 = 20;
const HOLDER_SETTLE_INTERVAL: Duration = Duration::from_millis(25);

/// How many times to retry a lock that disappears while its holder is read.
const PUBLISH_ATTEMPTS: u32 = 5;

#[derive(Debug, Default)]
struct Inner {
    /// What reads return: the last write, refresh, or persist.
    current: Option<StateSnapshot>,
    /// What is known to be on disk.
    persisted: Option<StateSnapshot>,
}

/// State stored in a local JSON file.
#[derive(Debug)]
pub struct FileState {
    path: PathBuf,
    lock_path: PathBuf,
    inner: Mutex<Inner>,
}

impl FileState {
    /// A handle for the state file at `path`. Nothing is read until
    /// [`StateRefresher::refresh_state`] is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = lock_path_for(&path);
        Self {
            path,
            lock_path,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// The recorded holder of the lock, if the state is locked.
    pub fn lock_info(&self) -> Result<Option<LockInfo>> {
        let content = match fs::read_to_string(&self.lock_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StateError::Io {
                    action: "read lock file",
                    path: self.lock_path.clone(),
                    source,
                });
            }
        };

        LockInfo::from_json(&content)
            .map(Some)
            .map_err(|source| StateError::Parse {
                path: self.lock_path.clone(),
                source,
            })
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Read the holder of a lock file that was just found to exist.
    ///
    /// A holder that is still writing (or a file left by a non-atomic writer)
    /// is re-read for a short while before giving up on attributing it.
    fn settled_holder(&self) -> Holder {
        let mut reads = 0;
        loop {
            match self.lock_info() {
                Ok(Some(holder)) => return Holder::Held(holder),
                Ok(None) => return Holder::Released,
                Err(e) => {
                    reads += 1;
                    if reads >= HOLDER_SETTLE_READS {
                        return Holder::Unreadable(e);
                    }
                    thread::sleep(HOLDER_SETTLE_INTERVAL);
                }
            }
        }
    }

    /// Write `json` to a private sibling of the lock file and fsync it.
    fn write_lock_temp(&self, id: &str, json: &str) -> Result<PathBuf> {
        let name = self
            .lock_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let temp = self.lock_path.with_file_name(format!("{}.{}.tmp", name, id));

        let written = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp)
            .and_then(|mut file| {
                file.write_all(json.as_bytes())?;
                file.sync_all()
            });
        if let Err(source) = written {
            let _ = fs::remove_file(&temp);
            return Err(StateError::Io {
                action: "write lock file",
                path: temp,
                source,
            });
        }
        Ok(temp)
    }

    /// Link `temp` into place as the lock file.
    fn publish_lock(&self, temp: &Path) -> Result<()> {
        for _ in 0..PUBLISH_ATTEMPTS {
            match fs::hard_link(temp, &self.lock_path) {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(source) => {
                    return Err(StateError::Io {
                        action: "create lock file",
                        path: self.lock_path.clone(),
                        source,
                    });
                }
            }

            match self.settled_holder() {
                Holder::Held(holder) => {
                    return Err(LockError::held_by("state file is locked", holder).into());
                }
                Holder::Released => {
                    debug!(path = %self.lock_path.display(), "lock released while reading holder, retrying");
                }
                Holder::Unreadable(e) => {
                    return Err(LockError::new(format!("state file is locked; {}", e)).into());
                }
            }
        }

        Err(LockError::new(format!(
            "state file lock changed hands {} times while acquiring; giving up",
            PUBLISH_ATTEMPTS
        ))
        .into())
    }
}

/// What an existing lock file turned out to contain.
enum Holder {
    Held(LockInfo),
    Released,
    Unreadable(StateError),
}

fn lock_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.lock.info", name))
}

impl StateReader for FileState {
    fn state(&self) -> Option<StateSnapshot> {
        self.inner().current.clone()
    }
}

impl StateWriter for FileState {
    fn write_state(&self, state: &StateSnapshot) -> Result<()> {
        self.inner().current = Some(state.clone());
        Ok(())
    }
}

impl StateRefresher for FileState {
    fn refresh_state(&self) -> Result<()> {
        let loaded = match fs::read_to_string(&self.path) {
            Ok(content) => Some(serde_json::from_str::<StateSnapshot>(&content).map_err(
                |source| StateError::Parse {
                    path: self.path.clone(),
                    source,
                },
            )?),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(source) => {
                return Err(StateError::Io {
                    action: "read state file",
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let mut inner = self.inner();
        inner.current = loaded.clone();
        inner.persisted = loaded;
        Ok(())
    }
}

impl StatePersister for FileState {
    fn persist_state(&self) -> Result<()> {
        let mut guard = self.inner();
        let Inner { current, persisted } = &mut *guard;
        let Some(current) = current.as_mut() else {
            return Ok(());
        };

        if let Some(previous) = persisted.as_ref()
            && !previous.same_content(current)
        {
            current.serial = current.serial.max(previous.serial) + 1;
        }

        let json = serde_json::to_string_pretty(current).map_err(StateError::Serialize)?;
        atomic_write(&self.path, json.as_bytes()).map_err(|source| StateError::Io {
            action: "write state file",
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), serial = current.serial, "persisted state");
        *persisted = Some(current.clone());
        Ok(())
    }
}

impl Locker for FileState {
    fn lock(&self, info: &LockInfo) -> Result<String> {
        let recorded = info.clone().with_path(self.path.display().to_string());
        let json = recorded.to_json().map_err(StateError::Serialize)?;

        if let Some(parent) = self.lock_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|source| StateError::Io {
                action: "create state directory",
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let temp = self.write_lock_temp(recorded.id(), &json)?;
        let published = self.publish_lock(&temp);
        let _ = fs::remove_file(&temp);
        published?;

        debug!(id = recorded.id(), path = %self.lock_path.display(), "acquired state lock");
        Ok(recorded.id().to_string())
    }

    fn unlock(&self, id: &str) -> Result<()> {
        let Some(holder) = self.lock_info()? else {
            return Err(StateError::NotLocked);
        };

        if holder.id() != id {
            return Err(LockError::held_by(
                format!("lock ID {:?} does not match existing lock", id),
                holder,
            )
            .into());
        }

        fs::remove_file(&self.lock_path).map_err(|source| StateError::Io {
            action: "remove lock file",
            path: self.lock_path.clone(),
            source,
        })?;

        debug!(id, path = %self.lock_path.display(), "released state lock");
        Ok(())
    }
}
