// File: ottonrent-core/src/views/transactions.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

use ottonrent_common::models::{TransactionKind, TransactionRecord, TransactionTree};
pub use ottonrent_common::models::parse_timestamp;

pub const UNKNOWN_TIME: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRow {
    pub id: String,
    pub kind: TransactionKind,
    pub label: &'static str,
    pub record: TransactionRecord,
    /// Parsed `approved_at`; `None` when absent or unreadable.
    pub approved_at: Option<DateTime<Utc>>,
}

impl TransactionRow {
    pub fn approved_display(&self) -> String {
        match self.approved_at {
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => UNKNOWN_TIME.to_string(),
        }
    }
}

/// Regular and special transactions in one list, newest approval first.
/// Rows without a readable approval time sort last, as if approved at the
/// earliest possible moment. Sentinel keys never show up: the tree keeps
/// them out of the buckets.
pub fn build_transaction_view(tree: &TransactionTree) -> Vec<TransactionRow> {
    let mut rows: Vec<TransactionRow> = [
        TransactionKind::Regular,
        TransactionKind::FreeTrial,
        TransactionKind::Referral,
    ]
    .into_iter()
    .flat_map(|kind| {
        tree.bucket(kind).iter().map(move |(id, record)| TransactionRow {
            id: id.clone(),
            kind,
            label: kind.label(),
            record: record.clone(),
            approved_at: record.approved_at.as_deref().and_then(parse_timestamp),
        })
    })
    .collect();

    rows.sort_by(|a, b| {
        b.approved_at
            .cmp(&a.approved_at)
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a.id.cmp(&b.id))
    });
    rows
}
