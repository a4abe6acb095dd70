//! The in-memory state snapshot.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Infrastructure state at a point in time.
///
/// `lineage` identifies a state across its whole history and never changes
/// once assigned; `serial` is bumped by backends each time changed content
/// is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub version: u32,
    pub serial: u64,
    pub lineage: String,
    #[serde(default)]
    pub values: Map<String, Value>,
}

impl StateSnapshot {
    /// An empty snapshot with a fresh lineage.
    pub fn new() -> Self {
        Self {
            version: FORMAT_VERSION,
            serial: 0,
            lineage: Uuid::new_v4().to_string(),
            values: Map::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Set `key`, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    /// Remove `key`, returning the previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Same lineage and values, ignoring `serial`.
    pub fn same_content(&self, other: &StateSnapshot) -> bool {
        self.lineage == other.lineage && self.values == other.values
    }
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self::new()
    }
}
