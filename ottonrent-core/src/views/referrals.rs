// File: ottonrent-core/src/views/referrals.rs

use std::collections::BTreeMap;

use serde::Serialize;

use ottonrent_common::models::Referral;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferralRow {
    pub user_id: String,
    pub referral: Referral,
}

/// Case-insensitive match on user id or referral code, highest points first.
pub fn build_referral_view(referrals: &BTreeMap<String, Referral>, search: &str) -> Vec<ReferralRow> {
    let needle = search.trim().to_lowercase();
    let mut rows: Vec<ReferralRow> = referrals
        .iter()
        .filter(|(user_id, r)| {
            needle.is_empty()
                || user_id.to_lowercase().contains(&needle)
                || r.referral_code.to_lowercase().contains(&needle)
        })
        .map(|(user_id, r)| ReferralRow {
            user_id: user_id.clone(),
            referral: r.clone(),
        })
        .collect();
    rows.sort_by(|a, b| b.referral.referral_points.cmp(&a.referral.referral_points));
    rows
}
