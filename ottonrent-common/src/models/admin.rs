// File: ottonrent-common/src/models/admin.rs

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::lenient;
use crate::error::ValidationError;
use crate::traits::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AdminTier {
    Superior,
    Inferior,
}

impl AdminTier {
    /// Name of the list field that holds this tier in the document.
    pub fn field(&self) -> &'static str {
        match self {
            AdminTier::Superior => "superior_admins",
            AdminTier::Inferior => "inferior_admins",
        }
    }

    pub fn other(&self) -> AdminTier {
        match self {
            AdminTier::Superior => AdminTier::Inferior,
            AdminTier::Inferior => AdminTier::Superior,
        }
    }
}

impl fmt::Display for AdminTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminTier::Superior => write!(f, "superior"),
            AdminTier::Inferior => write!(f, "inferior"),
        }
    }
}

impl FromStr for AdminTier {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "superior" | "superior_admins" => Ok(AdminTier::Superior),
            "inferior" | "inferior_admins" => Ok(AdminTier::Inferior),
            _ => Err(format!("Unknown admin tier: {}", s)),
        }
    }
}

/// The two privilege tiers. An id lives in at most one of them; granting an
/// id that already sits in the other tier is rejected rather than moved.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct AdminConfig {
    #[serde(default, deserialize_with = "lenient::id_set")]
    pub superior_admins: BTreeSet<i64>,
    #[serde(default, deserialize_with = "lenient::id_set")]
    pub inferior_admins: BTreeSet<i64>,
}

/// Admin ids are typed in by hand, so they arrive as text.
pub fn parse_admin_id(raw: &str) -> Result<i64, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField("admin_id"));
    }
    trimmed.parse::<i64>().map_err(|_| ValidationError::NotNumeric {
        field: "admin_id",
        value: trimmed.to_string(),
    })
}

impl AdminConfig {
    pub fn tier(&self, tier: AdminTier) -> &BTreeSet<i64> {
        match tier {
            AdminTier::Superior => &self.superior_admins,
            AdminTier::Inferior => &self.inferior_admins,
        }
    }

    fn tier_mut(&mut self, tier: AdminTier) -> &mut BTreeSet<i64> {
        match tier {
            AdminTier::Superior => &mut self.superior_admins,
            AdminTier::Inferior => &mut self.inferior_admins,
        }
    }

    pub fn tier_of(&self, id: i64) -> Option<AdminTier> {
        if self.superior_admins.contains(&id) {
            Some(AdminTier::Superior)
        } else if self.inferior_admins.contains(&id) {
            Some(AdminTier::Inferior)
        } else {
            None
        }
    }

    pub fn grant(&mut self, id: i64, tier: AdminTier) -> Result<(), ValidationError> {
        if self.tier(tier.other()).contains(&id) {
            return Err(ValidationError::AdminTierConflict {
                id,
                tier: tier.other().to_string(),
            });
        }
        if !self.tier_mut(tier).insert(id) {
            return Err(ValidationError::AdminAlreadyPresent {
                id,
                tier: tier.to_string(),
            });
        }
        Ok(())
    }

    /// Returns whether the id was present.
    pub fn revoke(&mut self, id: i64, tier: AdminTier) -> bool {
        self.tier_mut(tier).remove(&id)
    }
}

impl Validate for AdminConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(id) = self.superior_admins.intersection(&self.inferior_admins).next() {
            return Err(ValidationError::AdminTierConflict {
                id: *id,
                tier: AdminTier::Superior.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_rejects_id_from_other_tier() {
        let mut cfg = AdminConfig::default();
        cfg.grant(42, AdminTier::Superior).unwrap();
        let err = cfg.grant(42, AdminTier::Inferior).unwrap_err();
        assert!(matches!(err, ValidationError::AdminTierConflict { id: 42, .. }));
        assert!(cfg.superior_admins.contains(&42));
        assert!(!cfg.inferior_admins.contains(&42));
    }

    #[test]
    fn validate_flags_overlap() {
        let mut cfg = AdminConfig::default();
        cfg.superior_admins.insert(7);
        cfg.inferior_admins.insert(7);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parse_admin_id_requires_digits() {
        assert_eq!(parse_admin_id(" 123 "), Ok(123));
        assert_eq!(parse_admin_id(""), Err(ValidationError::MissingField("admin_id")));
        assert!(matches!(parse_admin_id("12a"), Err(ValidationError::NotNumeric { .. })));
    }

    #[test]
    fn reads_missing_tiers_as_empty() {
        let cfg: AdminConfig = serde_json::from_str(r#"{"superior_admins":[1,2]}"#).unwrap();
        assert_eq!(cfg.tier_of(2), Some(AdminTier::Superior));
        assert!(cfg.inferior_admins.is_empty());
    }

    #[test]
    fn reads_ids_stored_as_text() {
        let cfg: AdminConfig =
            serde_json::from_str(r#"{"superior_admins":["111", 222],"inferior_admins":[" 333 ", null]}"#).unwrap();
        assert_eq!(cfg.tier_of(111), Some(AdminTier::Superior));
        assert_eq!(cfg.tier_of(222), Some(AdminTier::Superior));
        assert_eq!(cfg.tier_of(333), Some(AdminTier::Inferior));
        assert!(serde_json::from_str::<AdminConfig>(r#"{"superior_admins":"all"}"#).is_err());
        assert!(serde_json::from_str::<AdminConfig>(r#"{"superior_admins":["abc"]}"#).is_err());
    }
}
