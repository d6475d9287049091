// File: ottonrent-common/src/models/slot.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::lenient;
use crate::error::ValidationError;
use crate::traits::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "3day")]
    ThreeDay,
    #[serde(rename = "weekly")]
    Weekly,
    #[serde(rename = "monthly")]
    Monthly,
}

impl Frequency {
    pub fn period(&self) -> Duration {
        match self {
            Frequency::Daily => Duration::days(1),
            Frequency::ThreeDay => Duration::days(3),
            Frequency::Weekly => Duration::days(7),
            Frequency::Monthly => Duration::days(30),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::ThreeDay => write!(f, "3day"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for Frequency {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "3day" | "3-day" => Ok(Frequency::ThreeDay),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

/// A bookable, time-windowed slot.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BookingSlot {
    pub enabled: bool,
    pub frequency: Frequency,
    #[serde(deserialize_with = "lenient::amount")]
    pub required_amount: f64,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub slot_start: DateTime<Utc>,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub slot_end: DateTime<Utc>,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub last_update: DateTime<Utc>,
}

impl BookingSlot {
    /// A window of one `frequency` period starting at `start`.
    pub fn starting_at(frequency: Frequency, required_amount: f64, start: DateTime<Utc>) -> Self {
        Self {
            enabled: true,
            frequency,
            required_amount,
            slot_start: start,
            slot_end: start + frequency.period(),
            last_update: start,
        }
    }

    pub fn is_open_at(&self, at: DateTime<Utc>) -> bool {
        self.enabled && self.slot_start <= at && at < self.slot_end
    }
}

/// A subscription offering in the catalog.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CatalogSlot {
    pub title: String,
    #[serde(deserialize_with = "lenient::amount")]
    pub monthly_price: f64,
    pub num_devices: u32,
    pub stock: i64,
}

impl CatalogSlot {
    /// Moves stock by `delta`, never below zero.
    pub fn adjust_stock(&mut self, delta: i64) -> Result<(), ValidationError> {
        let next = self.stock.saturating_add(delta);
        if next < 0 {
            return Err(ValidationError::Negative { field: "stock" });
        }
        self.stock = next;
        Ok(())
    }
}

/// The two slot shapes found in the store. Which one a document is gets
/// decided by the fields it carries.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Slot {
    Booking(BookingSlot),
    Catalog(CatalogSlot),
}

const BOOKING_MARKERS: [&str; 4] = ["frequency", "slot_start", "slot_end", "required_amount"];
const CATALOG_MARKERS: [&str; 3] = ["title", "monthly_price", "num_devices"];

impl Slot {
    pub fn kind(&self) -> &'static str {
        match self {
            Slot::Booking(_) => "booking",
            Slot::Catalog(_) => "catalog",
        }
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let Some(obj) = value.as_object() else {
            return Err(D::Error::custom("slot must be an object"));
        };
        let has_any = |markers: &[&str]| markers.iter().any(|m| obj.contains_key(*m));

        if has_any(&BOOKING_MARKERS) {
            BookingSlot::deserialize(value)
                .map(Slot::Booking)
                .map_err(|e| D::Error::custom(format!("booking slot: {e}")))
        } else if has_any(&CATALOG_MARKERS) {
            CatalogSlot::deserialize(value)
                .map(Slot::Catalog)
                .map_err(|e| D::Error::custom(format!("catalog slot: {e}")))
        } else {
            Err(D::Error::custom("object matches neither the booking nor the catalog slot shape"))
        }
    }
}

impl Validate for Slot {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Slot::Booking(b) => {
                if b.slot_end <= b.slot_start {
                    return Err(ValidationError::EmptySlotWindow);
                }
                if b.required_amount < 0.0 {
                    return Err(ValidationError::Negative { field: "required_amount" });
                }
                Ok(())
            }
            Slot::Catalog(c) => {
                if c.title.trim().is_empty() {
                    return Err(ValidationError::MissingField("title"));
                }
                if c.monthly_price < 0.0 {
                    return Err(ValidationError::Negative { field: "monthly_price" });
                }
                if c.stock < 0 {
                    return Err(ValidationError::Negative { field: "stock" });
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_by_present_fields() {
        let booking = Slot::from_value(json!({
            "enabled": true,
            "frequency": "3day",
            "required_amount": 49.0,
            "slot_start": "2025-01-01T00:00:00Z",
            "slot_end": "2025-01-04T00:00:00Z",
            "last_update": "2025-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(booking.kind(), "booking");

        let catalog = Slot::from_value(json!({
            "title": "Premium",
            "monthly_price": 199,
            "num_devices": 4,
            "stock": 10
        }))
        .unwrap();
        assert_eq!(catalog.kind(), "catalog");
    }

    #[test]
    fn booking_accepts_plain_datetimes_and_string_amounts() {
        let slot = Slot::from_value(json!({
            "enabled": true,
            "frequency": "daily",
            "required_amount": "25.50",
            "slot_start": "2025-01-01 00:00:00",
            "slot_end": "2025-01-02",
            "last_update": 1735689600000u64
        }))
        .unwrap();
        let Slot::Booking(b) = slot else {
            panic!("expected a booking slot");
        };
        assert_eq!(b.required_amount, 25.5);
        assert_eq!(b.slot_start.to_rfc3339(), "2025-01-01T00:00:00+00:00");
        assert_eq!(b.slot_end - b.slot_start, Duration::days(1));
        assert_eq!(b.last_update, b.slot_start);
    }

    #[test]
    fn rejects_unknown_shape() {
        assert!(Slot::from_value(json!({"foo": 1})).is_err());
        assert!(Slot::from_value(json!("slot")).is_err());
    }

    #[test]
    fn serializes_without_a_tag() {
        let slot = Slot::Catalog(CatalogSlot {
            title: "Basic".into(),
            monthly_price: 99.0,
            num_devices: 1,
            stock: 3,
        });
        let value = serde_json::to_value(&slot).unwrap();
        assert_eq!(value["title"], "Basic");
        assert!(value.get("Catalog").is_none());
    }

    #[test]
    fn stock_never_goes_negative() {
        let mut c = CatalogSlot { title: "t".into(), monthly_price: 1.0, num_devices: 1, stock: 1 };
        c.adjust_stock(-1).unwrap();
        assert_eq!(c.adjust_stock(-1), Err(ValidationError::Negative { field: "stock" }));
        assert_eq!(c.stock, 0);
    }

    #[test]
    fn booking_window_must_be_non_empty() {
        let start = Utc::now();
        let mut slot = BookingSlot::starting_at(Frequency::Weekly, 10.0, start);
        assert!(Slot::Booking(slot.clone()).validate().is_ok());
        slot.slot_end = start;
        assert_eq!(Slot::Booking(slot).validate(), Err(ValidationError::EmptySlotWindow));
    }
}
