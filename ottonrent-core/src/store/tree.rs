//! Path operations over a JSON document tree.
//!
//! The tree follows realtime-database rules: there are no empty objects and
//! no stored nulls. Writing `null` deletes, and deleting the last child of an
//! object deletes the object too.

use serde_json::{Map, Value};

use ottonrent_common::models::StorePath;

pub fn get_at<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    let mut node = root;
    for seg in path.segments() {
        node = node.as_object()?.get(seg)?;
    }
    if node.is_null() { None } else { Some(node) }
}

/// Overwrites the subtree at `path`, creating intermediate objects.
pub fn set_at(root: &mut Value, path: &StorePath, value: Value) {
    let value = normalize(value);
    if value.is_null() {
        remove_at(root, path);
        return;
    }
    let mut node = root;
    for seg in path.segments() {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Some(obj) = node.as_object_mut() else { return };
        node = obj.entry(seg.clone()).or_insert(Value::Null);
    }
    *node = value;
}

/// Object patches merge member by member; anything else replaces the leaf.
pub fn update_at(root: &mut Value, path: &StorePath, patch: Value) {
    match patch {
        Value::Object(members) => {
            for (key, value) in members {
                set_at(root, &path.child(&key), value);
            }
        }
        other => set_at(root, path, other),
    }
}

pub fn remove_at(root: &mut Value, path: &StorePath) {
    if path.is_root() {
        *root = Value::Null;
        return;
    }
    remove_rec(root, path.segments());
}

/// Returns true when `node` became empty and should be pruned by its parent.
fn remove_rec(node: &mut Value, segments: &[String]) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        return true;
    };
    let Some(obj) = node.as_object_mut() else {
        return false;
    };
    let prune_child = match obj.get_mut(head) {
        Some(child) => rest.is_empty() || remove_rec(child, rest),
        None => false,
    };
    if prune_child {
        obj.remove(head);
    }
    if obj.is_empty() {
        *node = Value::Null;
        return true;
    }
    false
}

/// Drops nulls and empty objects recursively.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Object(obj) => {
            let cleaned: Map<String, Value> = obj
                .into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if cleaned.is_empty() {
                Value::Null
            } else {
                Value::Object(cleaned)
            }
        }
        other => other,
    }
}
