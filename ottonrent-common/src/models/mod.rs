// File: ottonrent-common/src/models/mod.rs
pub mod admin;
pub mod credential;
pub mod order;
pub mod path;
pub mod referral;
pub mod slot;
pub mod tenant;
pub mod transaction;
pub mod ui_config;
pub mod user;

mod flag;
mod lenient;

pub use admin::{AdminConfig, AdminTier};
pub use credential::Credential;
pub use lenient::parse_timestamp;
pub use path::StorePath;
pub use referral::{Referral, ReferralSettings};
pub use slot::{BookingSlot, CatalogSlot, Frequency, Slot};
pub use tenant::Tenant;
pub use transaction::{TransactionKind, TransactionRecord, TransactionTree};
pub use ui_config::{Media, UiConfig, UiPayload};
