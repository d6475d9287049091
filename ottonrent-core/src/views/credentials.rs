// File: ottonrent-core/src/views/credentials.rs

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use ottonrent_common::models::Credential;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredentialRow {
    pub key: String,
    pub credential: Credential,
    pub remaining: u32,
    pub issuable: bool,
}

/// Splits `cred12` into `("cred", Some(12))` so `cred2` sorts before `cred10`.
fn natural_parts(key: &str) -> (&str, Option<u64>) {
    let digits_at = key
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i);
    match digits_at {
        Some(i) => (&key[..i], key[i..].parse().ok()),
        None => (key, None),
    }
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (pa, na) = natural_parts(a);
    let (pb, nb) = natural_parts(b);
    pa.cmp(pb).then(na.cmp(&nb)).then_with(|| a.cmp(b))
}

/// Case-insensitive search over key, email and slot reference.
pub fn build_credential_view(credentials: &BTreeMap<String, Credential>, search: &str) -> Vec<CredentialRow> {
    let needle = search.trim().to_lowercase();
    let mut rows: Vec<CredentialRow> = credentials
        .iter()
        .filter(|(key, c)| {
            needle.is_empty()
                || key.to_lowercase().contains(&needle)
                || c.email.to_lowercase().contains(&needle)
                || c.slot_ref.to_lowercase().contains(&needle)
        })
        .map(|(key, c)| CredentialRow {
            key: key.clone(),
            remaining: c.remaining_uses(),
            issuable: c.can_issue(),
            credential: c.clone(),
        })
        .collect();
    rows.sort_by(|a, b| natural_cmp(&a.key, &b.key));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred(email: &str) -> Credential {
        Credential {
            slot_ref: "slot1".into(),
            email: email.into(),
            secret: "pw".into(),
            max_usage: 3,
            usage_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn keys_sort_naturally() {
        let map = BTreeMap::from([
            ("cred10".to_string(), cred("a@x.io")),
            ("cred2".to_string(), cred("b@x.io")),
            ("cred1".to_string(), cred("c@x.io")),
            ("backup".to_string(), cred("d@x.io")),
        ]);
        let keys: Vec<String> = build_credential_view(&map, "").into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["backup", "cred1", "cred2", "cred10"]);
    }

    #[test]
    fn search_hits_email() {
        let map = BTreeMap::from([
            ("cred1".to_string(), cred("Family@Stream.io")),
            ("cred2".to_string(), cred("solo@stream.io")),
        ]);
        let rows = build_credential_view(&map, "family");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].remaining, 2);
        assert!(rows[0].issuable);
    }
}
