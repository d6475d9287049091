// File: ottonrent-core/src/views/slots.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use ottonrent_common::models::Slot;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotRow {
    pub key: String,
    pub kind: &'static str,
    pub headline: String,
    pub detail: String,
    /// Open for booking right now, or in stock.
    pub available: bool,
}

fn summarize(key: &str, slot: &Slot, now: DateTime<Utc>) -> SlotRow {
    match slot {
        Slot::Booking(b) => SlotRow {
            key: key.to_string(),
            kind: slot.kind(),
            headline: format!("{} slot, {:.2} required", b.frequency, b.required_amount),
            detail: format!(
                "{} to {}",
                b.slot_start.format("%Y-%m-%d %H:%M"),
                b.slot_end.format("%Y-%m-%d %H:%M")
            ),
            available: b.is_open_at(now),
        },
        Slot::Catalog(c) => SlotRow {
            key: key.to_string(),
            kind: slot.kind(),
            headline: format!("{} at {:.2}/month", c.title, c.monthly_price),
            detail: format!("{} devices, {} in stock", c.num_devices, c.stock),
            available: c.stock > 0,
        },
    }
}

pub fn build_slot_view(slots: &BTreeMap<String, Slot>, now: DateTime<Utc>) -> Vec<SlotRow> {
    slots.iter().map(|(key, slot)| summarize(key, slot, now)).collect()
}
