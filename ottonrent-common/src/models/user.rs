// File: ottonrent-common/src/models/user.rs

use std::collections::BTreeMap;

/// user id -> active
pub type UserFlags = BTreeMap<String, bool>;

pub fn active_count(users: &UserFlags) -> usize {
    users.values().filter(|active| **active).count()
}
