//! Lock metadata and the factory that mints it.
//!
//! A `LockInfo` describes one lock attempt: who asked, from which client
//! version, when, and an ID that is unique per attempt. Backends record it as
//! the advertised holder and hand it back inside a `LockError` when someone
//! else's lock is in the way.

use chrono::{DateTime, Utc};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use uuid::Uuid;

/// Version string stamped into every lock this client creates.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Metadata describing a lock request and, once recorded, its holder.
///
/// Fields are private so a value cannot change after it is built; the
/// `with_*` methods consume `self` and are meant for the moment of
/// construction only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Unique ID of this lock.
    #[serde(rename = "ID", default)]
    id: String,

    /// The operation that requested the lock (e.g. `set`, `lock acquire`).
    #[serde(rename = "Operation", default)]
    operation: String,

    /// Free-text reason supplied by the requester.
    #[serde(rename = "Info", default)]
    reason: String,

    /// `user@host` of the requester.
    #[serde(rename = "Who", default)]
    who: String,

    /// Client version of the requester.
    #[serde(rename = "Version", default)]
    version: String,

    /// When the lock was requested (UTC).
    #[serde(rename = "Created")]
    created: DateTime<Utc>,

    /// Path of the locked state, filled in by backends that have one.
    #[serde(rename = "Path", default)]
    path: String,
}

impl LockInfo {
    /// Build lock metadata from already-known parts.
    ///
    /// Backends use this when decoding a holder they did not mint; new lock
    /// attempts should come from [`LockInfoFactory`].
    pub fn new(
        id: impl Into<String>,
        who: impl Into<String>,
        version: impl Into<String>,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            operation: String::new(),
            reason: String::new(),
            who: who.into(),
            version: version.into(),
            created,
            path: String::new(),
        }
    }

    /// Set the requesting operation.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = operation.into();
        self
    }

    /// Set the free-text reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Set the locked path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn who(&self) -> &str {
        &self.who
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// A holder can only be attributed when it carries an ID.
    pub fn is_complete(&self) -> bool {
        !self.id.is_empty()
    }

    /// Serialize to the JSON document backends store.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a stored JSON document.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl fmt::Display for LockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lock Info:")?;
        writeln!(f, "  ID:        {}", self.id)?;
        writeln!(f, "  Path:      {}", self.path)?;
        writeln!(f, "  Operation: {}", self.operation)?;
        writeln!(f, "  Who:       {}", self.who)?;
        writeln!(f, "  Version:   {}", self.version)?;
        writeln!(f, "  Created:   {}", self.created)?;
        write!(f, "  Info:      {}", self.reason)
    }
}

/// Best-effort identity of the local user.
///
/// Either half may be unknown; `who()` then leaves that side of the `@` empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub user: Option<String>,
    pub host: Option<String>,
}

impl Identity {
    /// Resolve the current user and host from the environment.
    pub fn current() -> Self {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .ok()
            .filter(|u| !u.is_empty());

        let host = hostname::get()
            .ok()
            .map(|h| h.to_string_lossy().to_string());

        Self { user, host }
    }

    /// Format as `user@host`.
    pub fn who(&self) -> String {
        format!(
            "{}@{}",
            self.user.as_deref().unwrap_or(""),
            self.host.as_deref().unwrap_or("")
        )
    }
}

/// Mints a fresh, attributable `LockInfo` for every lock attempt.
///
/// IDs come from a locally seeded generator: they only need to be unique, not
/// unpredictable. The generator is owned by the factory, so tests can seed
/// their own and run in parallel.
#[derive(Debug)]
pub struct LockInfoFactory {
    rng: Mutex<ChaCha8Rng>,
    identity: Identity,
    version: String,
}

impl LockInfoFactory {
    /// Create a factory around an explicit generator, resolving the local identity.
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self {
            rng: Mutex::new(rng),
            identity: Identity::current(),
            version: CLIENT_VERSION.to_string(),
        }
    }

    /// Create a factory whose generator is seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(ChaCha8Rng::from_entropy())
    }

    /// Create a factory with a deterministic seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Override the identity stamped into `Who`.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// Override the client version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Produce lock metadata for a new attempt.
    pub fn new_lock_info(&self) -> LockInfo {
        LockInfo::new(
            self.next_id(),
            self.identity.who(),
            self.version.clone(),
            Utc::now(),
        )
    }

    /// 128 random bits in canonical UUID form.
    ///
    /// The input is a fixed `[u8; 16]`, so formatting has no failure path.
    fn next_id(&self) -> String {
        let mut buf = [0u8; 16];
        self.rng
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .fill_bytes(&mut buf);
        Uuid::from_bytes(buf).hyphenated().to_string()
    }
}
