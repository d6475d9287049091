// File: ottonrent-common/src/models/credential.rs

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::traits::Validate;

/// Login material handed out to subscribers of one slot.
///
/// Keyed in the store by an opaque id such as `cred1`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Credential {
    pub slot_ref: String,
    pub email: String,
    pub secret: String,
    #[serde(default)]
    pub expiry_date: String,

    /// A locked credential may not be issued to anyone.
    #[serde(with = "super::flag", default)]
    pub locked: bool,

    #[serde(default)]
    pub max_usage: u32,
    #[serde(default)]
    pub usage_count: u32,
}

impl Credential {
    pub fn remaining_uses(&self) -> u32 {
        self.max_usage.saturating_sub(self.usage_count)
    }

    /// Whether one more user may receive this credential.
    pub fn can_issue(&self) -> bool {
        !self.locked && self.usage_count < self.max_usage
    }

    /// Counts one issuance. Refuses locked or exhausted credentials.
    pub fn record_usage(&mut self, key: &str) -> Result<(), ValidationError> {
        if self.locked {
            return Err(ValidationError::CredentialLocked(key.to_string()));
        }
        if self.usage_count >= self.max_usage {
            return Err(ValidationError::UsageExceeded {
                usage_count: self.usage_count.saturating_add(1),
                max_usage: self.max_usage,
            });
        }
        self.usage_count += 1;
        Ok(())
    }
}

impl Validate for Credential {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.slot_ref.trim().is_empty() {
            return Err(ValidationError::MissingField("slot_ref"));
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::MissingField("email"));
        }
        if self.secret.trim().is_empty() {
            return Err(ValidationError::MissingField("secret"));
        }
        if self.usage_count > self.max_usage {
            return Err(ValidationError::UsageExceeded {
                usage_count: self.usage_count,
                max_usage: self.max_usage,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Credential {
        Credential {
            slot_ref: "slotA".into(),
            email: "a@x.com".into(),
            secret: "p".into(),
            expiry_date: "2025-01-01".into(),
            locked: false,
            max_usage: 4,
            usage_count: 0,
        }
    }

    #[test]
    fn locked_serializes_as_integer() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            json!({
                "slot_ref": "slotA",
                "email": "a@x.com",
                "secret": "p",
                "expiry_date": "2025-01-01",
                "locked": 0,
                "max_usage": 4,
                "usage_count": 0
            })
        );
    }

    #[test]
    fn locked_accepts_bool_and_int() {
        let a: Credential = serde_json::from_value(json!({
            "slot_ref": "s", "email": "e", "secret": "p", "locked": true
        }))
        .unwrap();
        let b: Credential = serde_json::from_value(json!({
            "slot_ref": "s", "email": "e", "secret": "p", "locked": 1
        }))
        .unwrap();
        assert!(a.locked && b.locked);
    }

    #[test]
    fn validation_requires_core_fields() {
        let mut c = sample();
        c.email = "  ".into();
        assert_eq!(c.validate(), Err(ValidationError::MissingField("email")));

        let mut c = sample();
        c.usage_count = 5;
        assert!(matches!(c.validate(), Err(ValidationError::UsageExceeded { .. })));
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn record_usage_respects_lock_and_limit() {
        let mut c = sample();
        c.max_usage = 1;
        c.record_usage("cred1").unwrap();
        assert_eq!(c.usage_count, 1);
        assert!(c.record_usage("cred1").is_err());

        let mut locked = sample();
        locked.locked = true;
        assert_eq!(
            locked.record_usage("cred2"),
            Err(ValidationError::CredentialLocked("cred2".into()))
        );
    }
}
