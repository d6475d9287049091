// File: ottonrent-common/src/models/transaction.rs

use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::traits::Validate;

pub const FREE_TRIAL_BUCKET: &str = "FTRIAL-ID";
pub const REFERRAL_BUCKET: &str = "REF-ID";

/// Suffix of the placeholder key each special bucket keeps for itself.
pub const SENTINEL_SUFFIX: &str = "-OTTONRENT";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransactionKind {
    Regular,
    FreeTrial,
    Referral,
}

impl TransactionKind {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Regular => "Regular",
            TransactionKind::FreeTrial => "Free Trial",
            TransactionKind::Referral => "Referral",
        }
    }

    /// Name of the special bucket, `None` for regular transactions.
    pub fn bucket(&self) -> Option<&'static str> {
        match self {
            TransactionKind::Regular => None,
            TransactionKind::FreeTrial => Some(FREE_TRIAL_BUCKET),
            TransactionKind::Referral => Some(REFERRAL_BUCKET),
        }
    }

    pub fn from_bucket(key: &str) -> Option<Self> {
        match key {
            FREE_TRIAL_BUCKET => Some(TransactionKind::FreeTrial),
            REFERRAL_BUCKET => Some(TransactionKind::Referral),
            _ => None,
        }
    }

    /// Location of transaction `id` relative to the transactions root.
    pub fn relative_path(&self, id: &str) -> Vec<String> {
        match self.bucket() {
            Some(bucket) => vec![bucket.to_string(), id.to_string()],
            None => vec![id.to_string()],
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn is_sentinel_key(bucket: &str, key: &str) -> bool {
    key.strip_prefix(bucket) == Some(SENTINEL_SUFFIX)
}

/// Accepts strings, numbers and null; everything ends up as text.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(D::Error::custom(format!("expected a scalar, got {other}"))),
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct TransactionRecord {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub slot_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

/// The whole transactions document: regular records at the top level plus
/// the two special buckets. Sentinel keys and anything that is not a record
/// are kept verbatim in `passthrough` so the tree re-serializes unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionTree {
    pub regular: BTreeMap<String, TransactionRecord>,
    pub free_trial: BTreeMap<String, TransactionRecord>,
    pub referral: BTreeMap<String, TransactionRecord>,
    /// Keyed by slash-joined relative path, e.g. `FTRIAL-ID/FTRIAL-ID-OTTONRENT`.
    pub passthrough: BTreeMap<String, Value>,
}

impl TransactionTree {
    pub fn bucket(&self, kind: TransactionKind) -> &BTreeMap<String, TransactionRecord> {
        match kind {
            TransactionKind::Regular => &self.regular,
            TransactionKind::FreeTrial => &self.free_trial,
            TransactionKind::Referral => &self.referral,
        }
    }

    pub fn bucket_mut(&mut self, kind: TransactionKind) -> &mut BTreeMap<String, TransactionRecord> {
        match kind {
            TransactionKind::Regular => &mut self.regular,
            TransactionKind::FreeTrial => &mut self.free_trial,
            TransactionKind::Referral => &mut self.referral,
        }
    }

    pub fn get(&self, kind: TransactionKind, id: &str) -> Option<&TransactionRecord> {
        self.bucket(kind).get(id)
    }

    pub fn len(&self) -> usize {
        self.regular.len() + self.free_trial.len() + self.referral.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn from_value(value: &Value) -> Self {
        let mut tree = TransactionTree::default();
        let Some(obj) = value.as_object() else {
            return tree;
        };
        for (key, entry) in obj {
            match TransactionKind::from_bucket(key) {
                Some(kind) => {
                    let Some(bucket) = entry.as_object() else {
                        tree.passthrough.insert(key.clone(), entry.clone());
                        continue;
                    };
                    for (id, raw) in bucket {
                        let record = if is_sentinel_key(key, id) {
                            None
                        } else {
                            TransactionRecord::deserialize(raw).ok()
                        };
                        match record {
                            Some(r) => {
                                tree.bucket_mut(kind).insert(id.clone(), r);
                            }
                            None => {
                                tree.passthrough.insert(format!("{key}/{id}"), raw.clone());
                            }
                        }
                    }
                }
                None => match TransactionRecord::deserialize(entry) {
                    Ok(r) if entry.is_object() => {
                        tree.regular.insert(key.clone(), r);
                    }
                    _ => {
                        tree.passthrough.insert(key.clone(), entry.clone());
                    }
                },
            }
        }
        tree
    }

    pub fn to_value(&self) -> Value {
        let mut root = Map::new();
        for (id, record) in &self.regular {
            root.insert(id.clone(), serde_json::to_value(record).unwrap_or(Value::Null));
        }
        for kind in [TransactionKind::FreeTrial, TransactionKind::Referral] {
            let Some(bucket) = kind.bucket() else { continue };
            let records = self.bucket(kind);
            if records.is_empty() {
                continue;
            }
            let mut inner = Map::new();
            for (id, record) in records {
                inner.insert(id.clone(), serde_json::to_value(record).unwrap_or(Value::Null));
            }
            root.insert(bucket.to_string(), Value::Object(inner));
        }
        for (path, raw) in &self.passthrough {
            match path.split_once('/') {
                Some((bucket, id)) => {
                    let slot = root
                        .entry(bucket.to_string())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(inner) = slot {
                        inner.insert(id.to_string(), raw.clone());
                    }
                }
                None => {
                    root.insert(path.clone(), raw.clone());
                }
            }
        }
        Value::Object(root)
    }
}

impl Serialize for TransactionTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TransactionTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(TransactionTree::from_value(&value))
    }
}

impl Validate for TransactionTree {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splits_buckets_and_keeps_sentinels_aside() {
        let raw = json!({
            "A": {"approved_at": "2024-05-01T10:00:00Z", "slot_id": "s1"},
            "FTRIAL-ID": {"FTRIAL-ID-OTTONRENT": "placeholder", "u1": {"approved_at": 1714557600000_i64}},
            "REF-ID": {"u2": {"slot_id": "s2"}}
        });
        let tree = TransactionTree::from_value(&raw);
        assert_eq!(tree.len(), 3);
        assert!(tree.regular.contains_key("A"));
        assert_eq!(
            tree.get(TransactionKind::FreeTrial, "u1").and_then(|r| r.approved_at.clone()),
            Some("1714557600000".to_string())
        );
        assert!(tree.get(TransactionKind::FreeTrial, "FTRIAL-ID-OTTONRENT").is_none());
        assert!(tree.passthrough.contains_key("FTRIAL-ID/FTRIAL-ID-OTTONRENT"));
    }

    #[test]
    fn re_serializes_passthrough_entries() {
        let raw = json!({
            "FTRIAL-ID": {"FTRIAL-ID-OTTONRENT": "placeholder", "u1": {"slot_id": "s"}}
        });
        let tree = TransactionTree::from_value(&raw);
        assert_eq!(tree.to_value(), raw);
    }

    #[test]
    fn sentinel_detection_is_bucket_specific() {
        assert!(is_sentinel_key("REF-ID", "REF-ID-OTTONRENT"));
        assert!(!is_sentinel_key("REF-ID", "FTRIAL-ID-OTTONRENT"));
        assert_eq!(TransactionKind::Referral.relative_path("u2"), vec!["REF-ID", "u2"]);
    }
}
