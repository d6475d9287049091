// File: ottonrent-core/src/panels/admins.rs

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde_json::json;

use ottonrent_common::Error;
use ottonrent_common::models::admin::parse_admin_id;
use ottonrent_common::models::{AdminConfig, AdminTier, StorePath};
use ottonrent_common::traits::RemoteStore;

use super::{Panel, PanelOptions};
use crate::notify::Notifier;
use crate::session::DestructiveAction;

/// The two admin lists, kept disjoint.
pub struct AdminsPanel {
    panel: Panel<AdminConfig>,
}

impl AdminsPanel {
    pub const NAME: &'static str = "admin_config";

    pub fn options(root: StorePath) -> PanelOptions {
        PanelOptions::singleton(Self::NAME, root)
    }

    pub fn mount(store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>, options: PanelOptions) -> Self {
        Self {
            panel: Panel::mount(store, notifier, options),
        }
    }

    pub fn config(&self) -> AdminConfig {
        self.panel.value().unwrap_or_default()
    }

    /// Parses `raw_id` and grants it `tier`. Ids that are not numeric, or
    /// already hold the other tier, are refused without contacting the store.
    pub async fn add_admin(&mut self, raw_id: &str, tier: AdminTier) -> Result<(), Error> {
        let id = parse_admin_id(raw_id)?;
        self.panel
            .modify_or(Self::NAME, AdminConfig::default(), |config| config.grant(id, tier))
            .await
    }

    pub fn request_revoke(&mut self, id: i64, tier: AdminTier) -> Result<(), Error> {
        if !self.config().tier(tier).contains(&id) {
            return Err(Error::NotFound(format!("{id} is not a {tier} admin")));
        }
        self.panel.request_destroy(
            Self::NAME,
            DestructiveAction::RemoveItem {
                field: vec![tier.field().to_string()],
                item: json!(id),
            },
        )
    }
}

impl Deref for AdminsPanel {
    type Target = Panel<AdminConfig>;

    fn deref(&self) -> &Self::Target {
        &self.panel
    }
}

impl DerefMut for AdminsPanel {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.panel
    }
}
