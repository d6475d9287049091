//! src/mirror/mod.rs
//!
//! The per-panel optimistic copy of a remote subtree.
//!
//! Local edits land here synchronously, before the store acknowledges them,
//! and are tracked as unsynced until the write resolves. A remote snapshot
//! replaces the whole mirror when it arrives: what the store says wins over
//! any edit still in flight. Edits go out as field-level updates, so two
//! sessions changing different fields of one entity both survive; two
//! sessions changing the same field end with whichever write reached the
//! store last. There is no conflict detection.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::{Map, Value};
use tracing::trace;

use ottonrent_common::Error;
use ottonrent_common::models::StorePath;
use ottonrent_common::traits::Entity;

use crate::store::tree;

#[derive(Debug, Clone)]
pub struct OptimisticMirror<V> {
    entries: BTreeMap<String, V>,
    /// key -> value before the first unconfirmed local change (`None` if the
    /// key did not exist).
    pending: HashMap<String, Option<V>>,
    /// Keys the store holds a value for that did not decode.
    unreadable: BTreeSet<String>,
    loaded: bool,
}

impl<V> Default for OptimisticMirror<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            pending: HashMap::new(),
            unreadable: BTreeSet::new(),
            loaded: false,
        }
    }
}

impl<V: Entity> OptimisticMirror<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the first snapshot arrived.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entries(&self) -> &BTreeMap<String, V> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_unsynced(&self, key: &str) -> bool {
        self.pending.contains_key(key)
    }

    pub fn unsynced_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.pending.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Replaces everything with what the store pushed. Unsynced marks are
    /// dropped: the snapshot either already reflects the local write or
    /// carries a newer one from another session.
    pub fn apply_remote_snapshot(&mut self, tree: BTreeMap<String, V>) {
        if !self.pending.is_empty() {
            trace!("snapshot supersedes {} unsynced entries", self.pending.len());
        }
        self.entries = tree;
        self.pending.clear();
        self.unreadable.clear();
        self.loaded = true;
    }

    /// Records keys that exist remotely but could not be decoded. Lasts until
    /// the next snapshot.
    pub fn mark_unreadable<I: IntoIterator<Item = String>>(&mut self, keys: I) {
        self.unreadable.extend(keys);
    }

    /// True when the store has a value under `key` that this mirror could not
    /// read. Writing a fresh value there would overwrite data nobody has seen.
    pub fn is_unreadable(&self, key: &str) -> bool {
        self.unreadable.contains(key)
    }

    /// Merges `patch` into the entry at `key` immediately. Members set to
    /// `null` are removed.
    pub fn apply_local_edit(&mut self, key: &str, patch: &Map<String, Value>) -> Result<(), Error> {
        let current = self
            .entries
            .get(key)
            .ok_or_else(|| Error::NotFound(format!("no entry '{key}' to edit")))?;
        let mut rendered = serde_json::to_value(current)?;
        tree::update_at(&mut rendered, &StorePath::root(), Value::Object(patch.clone()));
        let next: V = serde_json::from_value(rendered).map_err(|e| Error::decode(key, e))?;
        self.apply_local_value(key, next);
        Ok(())
    }

    /// Inserts or replaces the entry at `key` immediately.
    pub fn apply_local_value(&mut self, key: &str, value: V) {
        self.remember(key);
        self.entries.insert(key.to_string(), value);
    }

    pub fn apply_local_removal(&mut self, key: &str) -> Option<V> {
        self.remember(key);
        self.entries.remove(key)
    }

    fn remember(&mut self, key: &str) {
        if !self.pending.contains_key(key) {
            let previous = self.entries.get(key).cloned();
            self.pending.insert(key.to_string(), previous);
        }
    }

    /// The store acknowledged the write for `key`.
    pub fn confirm(&mut self, key: &str) {
        self.pending.remove(key);
    }

    /// The store rejected the write for `key`: restore what was there
    /// before. Returns false when a snapshot already reconciled the key.
    pub fn rollback(&mut self, key: &str) -> bool {
        match self.pending.remove(key) {
            Some(Some(previous)) => {
                self.entries.insert(key.to_string(), previous);
                true
            }
            Some(None) => {
                self.entries.remove(key);
                true
            }
            None => false,
        }
    }
}
