//! Field-level diffs between two JSON renderings of an entity.

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    Unchanged,
    /// Changed members of an object. Removed members map to `null`.
    Fields(Map<String, Value>),
    /// Not an object on both sides; the value is written whole.
    Replace(Value),
}

impl Patch {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Patch::Unchanged)
    }

    /// The value an `update` call should carry.
    pub fn into_update(self) -> Option<Value> {
        match self {
            Patch::Unchanged => None,
            Patch::Fields(fields) => Some(Value::Object(fields)),
            Patch::Replace(value) => Some(value),
        }
    }
}

pub fn diff(before: &Value, after: &Value) -> Patch {
    if before == after {
        return Patch::Unchanged;
    }
    match (before, after) {
        (Value::Object(old), Value::Object(new)) => {
            let mut fields = Map::new();
            for (key, value) in new {
                if old.get(key) != Some(value) {
                    fields.insert(key.clone(), value.clone());
                }
            }
            for key in old.keys() {
                if !new.contains_key(key) {
                    fields.insert(key.clone(), Value::Null);
                }
            }
            Patch::Fields(fields)
        }
        _ => Patch::Replace(after.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_changed_fields_are_sent() {
        let before = json!({"email": "a", "locked": 0, "max_usage": 4});
        let after = json!({"email": "b", "locked": 0, "max_usage": 4});
        let mut expected = Map::new();
        expected.insert("email".into(), json!("b"));
        assert_eq!(diff(&before, &after), Patch::Fields(expected));
    }

    #[test]
    fn removed_fields_become_null() {
        let patch = diff(&json!({"a": 1, "b": 2}), &json!({"a": 1})).into_update();
        assert_eq!(patch, Some(json!({"b": null})));
    }

    #[test]
    fn scalars_are_replaced_whole() {
        assert_eq!(diff(&json!(true), &json!(false)), Patch::Replace(json!(false)));
        assert!(diff(&json!([1, 2]), &json!([1, 2])).is_unchanged());
    }
}
