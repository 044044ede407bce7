use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Secondary records of one source, keyed by the owning primary id.
#[derive(Clone, Debug, Default)]
pub struct MergeTable {
    entries: HashMap<String, Value>,
}

impl MergeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert; a second write for the same id replaces the first.
    pub fn merge_into(&mut self, id: &str, record: Value) {
        self.entries.insert(id.to_string(), record);
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Value> {
        self.entries.remove(id)
    }

    /// Drops entries whose id is no longer listed.
    pub fn retain_ids(&mut self, live: &HashSet<String>) {
        self.entries.retain(|id, _| live.contains(id));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
