// File: ottonrent-core/src/panels/orders.rs

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use ottonrent_common::Error;
use ottonrent_common::models::StorePath;
use ottonrent_common::models::order::{ensure_unused, normalize_order_id};
use ottonrent_common::traits::RemoteStore;

use super::{Panel, PanelOptions};
use crate::notify::Notifier;
use crate::session::DestructiveAction;

/// Order ids that were already turned into a subscription.
pub struct OrdersPanel {
    panel: Panel<bool>,
}

impl OrdersPanel {
    pub const NAME: &'static str = "used_order_ids";

    pub fn options(root: StorePath) -> PanelOptions {
        PanelOptions::collection(Self::NAME, root)
    }

    pub fn mount(store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>, options: PanelOptions) -> Self {
        Self {
            panel: Panel::mount(store, notifier, options),
        }
    }

    pub fn is_used(&self, raw_id: &str) -> bool {
        normalize_order_id(raw_id)
            .map(|id| self.panel.get(&id).unwrap_or(false))
            .unwrap_or(false)
    }

    /// Marks an order as redeemed. An order that is already marked is refused.
    pub async fn redeem(&mut self, raw_id: &str) -> Result<(), Error> {
        let id = normalize_order_id(raw_id)?;
        ensure_unused(&self.panel.entries(), &id)?;
        match self.panel.get(&id) {
            Some(_) => {
                self.panel
                    .modify(&id, |used| {
                        *used = true;
                        Ok(())
                    })
                    .await
            }
            None => self.panel.create(&id, true).await,
        }
    }

    /// Records an order id by hand with an explicit flag.
    pub async fn add(&mut self, raw_id: &str, used: bool) -> Result<(), Error> {
        let id = normalize_order_id(raw_id)?;
        self.panel.create(&id, used).await
    }

    pub fn request_delete(&mut self, raw_id: &str) -> Result<(), Error> {
        let id = normalize_order_id(raw_id)?;
        self.panel.request_destroy(&id, DestructiveAction::Remove)
    }
}

impl Deref for OrdersPanel {
    type Target = Panel<bool>;

    fn deref(&self) -> &Self::Target {
        &self.panel
    }
}

impl DerefMut for OrdersPanel {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.panel
    }
}
