//! Pure transforms from mirrored data to render-ready rows. Nothing here
//! has side effects, so callers recompute on every render.

pub mod credentials;
pub mod referrals;
pub mod slots;
pub mod transactions;
pub mod users;

pub use credentials::{CredentialRow, build_credential_view};
pub use referrals::{ReferralRow, build_referral_view};
pub use slots::{SlotRow, build_slot_view};
pub use transactions::{TransactionRow, build_transaction_view, parse_timestamp};
pub use users::{UserRow, build_user_view};
