// File: ottonrent-core/src/panels/referrals.rs

use std::sync::Arc;

use ottonrent_common::Error;
use ottonrent_common::models::{Referral, ReferralSettings, StorePath};
use ottonrent_common::traits::RemoteStore;

use super::{Panel, PanelOptions};
use crate::notify::Notifier;
use crate::session::DestructiveAction;
use crate::views::{ReferralRow, build_referral_view};

/// Per-user referral records plus the settings document that prices them.
pub struct ReferralsPanel {
    referrals: Panel<Referral>,
    settings: Panel<ReferralSettings>,
}

impl ReferralsPanel {
    pub const NAME: &'static str = "referrals";
    pub const SETTINGS_NAME: &'static str = "referral_settings";

    pub fn options(referrals_root: StorePath, settings_root: StorePath) -> (PanelOptions, PanelOptions) {
        (
            PanelOptions::collection(Self::NAME, referrals_root),
            PanelOptions::singleton(Self::SETTINGS_NAME, settings_root),
        )
    }

    pub fn mount(
        store: Arc<dyn RemoteStore>,
        notifier: Arc<dyn Notifier>,
        (referrals, settings): (PanelOptions, PanelOptions),
    ) -> Self {
        Self {
            referrals: Panel::mount(store.clone(), notifier.clone(), referrals),
            settings: Panel::mount(store, notifier, settings),
        }
    }

    pub async fn wait_until_loaded(&self) -> Result<(), Error> {
        self.referrals.wait_until_loaded().await?;
        self.settings.wait_until_loaded().await
    }

    pub fn referrals(&self) -> &Panel<Referral> {
        &self.referrals
    }

    pub fn referrals_mut(&mut self) -> &mut Panel<Referral> {
        &mut self.referrals
    }

    pub fn settings(&self) -> ReferralSettings {
        self.settings.value().unwrap_or_default()
    }

    pub fn settings_panel_mut(&mut self) -> &mut Panel<ReferralSettings> {
        &mut self.settings
    }

    pub fn rows(&self, search: &str) -> Vec<ReferralRow> {
        build_referral_view(&self.referrals.entries(), search)
    }

    pub async fn update_settings<F>(&mut self, change: F) -> Result<(), Error>
    where
        F: FnOnce(&mut ReferralSettings),
    {
        self.settings
            .modify_or(Self::SETTINGS_NAME, ReferralSettings::default(), |s| {
                change(s);
                Ok(())
            })
            .await
    }

    /// Credits `owner` for bringing in `referred_user`.
    pub async fn record_referral(&mut self, owner: &str, referred_user: &str) -> Result<(), Error> {
        let settings = self.settings();
        self.referrals
            .modify(owner, |r| r.record_referral(referred_user, &settings))
            .await
    }

    /// Spends the configured number of points from `owner`'s balance.
    pub async fn redeem_points(&mut self, owner: &str) -> Result<(), Error> {
        let settings = self.settings();
        self.referrals.modify(owner, |r| r.redeem_points(&settings)).await
    }

    pub fn request_delete(&mut self, owner: &str) -> Result<(), Error> {
        self.referrals.request_destroy(owner, DestructiveAction::Remove)
    }

    pub fn teardown(&self) {
        self.referrals.teardown();
        self.settings.teardown();
    }
}
