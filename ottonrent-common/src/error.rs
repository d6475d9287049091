// ================================================================
// File: ottonrent-common/src/error.rs
// ================================================================

use thiserror::Error;

/// Local, synchronous validation failures. These never reach a store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Required field '{0}' is empty")]
    MissingField(&'static str),

    #[error("Field '{field}' expects a number, got '{value}'")]
    NotNumeric { field: &'static str, value: String },

    #[error("Usage count {usage_count} exceeds max usage {max_usage}")]
    UsageExceeded { usage_count: u32, max_usage: u32 },

    #[error("Credential '{0}' is locked")]
    CredentialLocked(String),

    #[error("Admin id {id} already belongs to the {tier} tier")]
    AdminTierConflict { id: i64, tier: String },

    #[error("Admin id {id} is already in the {tier} tier")]
    AdminAlreadyPresent { id: i64, tier: String },

    #[error("Slot window is empty: end must come after start")]
    EmptySlotWindow,

    #[error("Field '{field}' must not be negative")]
    Negative { field: &'static str },

    #[error("Order id '{0}' was already redeemed")]
    OrderAlreadyUsed(String),

    #[error("Not enough referral points: have {have}, need {need}")]
    InsufficientPoints { have: i64, need: i64 },

    #[error("Buying with points is disabled")]
    PointsPurchaseDisabled,

    #[error("User '{0}' was already referred")]
    AlreadyReferred(String),

    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Changing '{0}' needs confirmation")]
    ConfirmationRequired(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found error: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The store rejected a set/update/remove, or the network failed.
    #[error("Write to '{path}' failed: {reason}")]
    Write { path: String, reason: String },

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Decode error at '{path}': {reason}")]
    Decode { path: String, reason: String },

    #[error("Invalid transition: cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: &'static str },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn write(path: impl ToString, reason: impl ToString) -> Self {
        Error::Write {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(path: impl ToString, reason: impl ToString) -> Self {
        Error::Decode {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}
