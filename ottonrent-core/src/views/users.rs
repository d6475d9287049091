// File: ottonrent-core/src/views/users.rs

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRow {
    pub user_id: String,
    pub active: bool,
}

/// Substring match on the user id, ascending by id.
pub fn build_user_view(users: &BTreeMap<String, bool>, search: &str) -> Vec<UserRow> {
    let needle = search.trim();
    let mut rows: Vec<UserRow> = users
        .iter()
        .filter(|(user_id, _)| user_id.contains(needle))
        .map(|(user_id, active)| UserRow {
            user_id: user_id.clone(),
            active: *active,
        })
        .collect();
    rows.sort_by(|a, b| a.user_id.cmp(&b.user_id));
    rows
}
