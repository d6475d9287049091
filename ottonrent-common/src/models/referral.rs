// File: ottonrent-common/src/models/referral.rs

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::traits::Validate;

/// Referral standing of one user, keyed by that user's id.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Referral {
    pub referral_code: String,
    #[serde(default)]
    pub referral_points: i64,
    #[serde(default)]
    pub referred_users: Vec<String>,
}

/// Global referral program switches.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct ReferralSettings {
    #[serde(default)]
    pub free_trial_enabled: bool,
    #[serde(default)]
    pub buy_with_points_enabled: bool,
    #[serde(default)]
    pub points_per_referral: i64,
    #[serde(default)]
    pub required_point: i64,
}

impl Referral {
    /// Credits one newly referred user.
    pub fn record_referral(
        &mut self,
        referred_user: &str,
        settings: &ReferralSettings,
    ) -> Result<(), ValidationError> {
        if referred_user.trim().is_empty() {
            return Err(ValidationError::MissingField("referred_user"));
        }
        if self.referred_users.iter().any(|u| u == referred_user) {
            return Err(ValidationError::AlreadyReferred(referred_user.to_string()));
        }
        self.referred_users.push(referred_user.to_string());
        self.referral_points += settings.points_per_referral;
        Ok(())
    }

    /// Spends `required_point` points on a purchase.
    pub fn redeem_points(&mut self, settings: &ReferralSettings) -> Result<(), ValidationError> {
        if !settings.buy_with_points_enabled {
            return Err(ValidationError::PointsPurchaseDisabled);
        }
        if self.referral_points < settings.required_point {
            return Err(ValidationError::InsufficientPoints {
                have: self.referral_points,
                need: settings.required_point,
            });
        }
        self.referral_points -= settings.required_point;
        Ok(())
    }
}

impl Validate for Referral {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.referral_code.trim().is_empty() {
            return Err(ValidationError::MissingField("referral_code"));
        }
        if self.referral_points < 0 {
            return Err(ValidationError::Negative { field: "referral_points" });
        }
        Ok(())
    }
}

impl Validate for ReferralSettings {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.points_per_referral < 0 {
            return Err(ValidationError::Negative { field: "points_per_referral" });
        }
        if self.required_point < 0 {
            return Err(ValidationError::Negative { field: "required_point" });
        }
        Ok(())
    }
}
