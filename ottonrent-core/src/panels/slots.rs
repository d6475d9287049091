// File: ottonrent-core/src/panels/slots.rs

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use chrono::Utc;

use ottonrent_common::models::{Slot, StorePath};
use ottonrent_common::traits::RemoteStore;
use ottonrent_common::{Error, ValidationError};

use super::{Panel, PanelOptions};
use crate::notify::Notifier;
use crate::session::DestructiveAction;
use crate::views::{SlotRow, build_slot_view};

pub struct SlotsPanel {
    panel: Panel<Slot>,
}

impl SlotsPanel {
    pub const NAME: &'static str = "slots";

    pub fn options(root: StorePath) -> PanelOptions {
        PanelOptions::collection(Self::NAME, root)
    }

    pub fn mount(store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>, options: PanelOptions) -> Self {
        Self {
            panel: Panel::mount(store, notifier, options),
        }
    }

    pub fn rows(&self) -> Vec<SlotRow> {
        build_slot_view(&self.panel.entries(), Utc::now())
    }

    pub async fn add(&mut self, key: &str, slot: Slot) -> Result<(), Error> {
        self.panel.create(key, slot).await
    }

    /// Opens or closes a booking slot. Catalog slots have no such switch.
    pub async fn set_enabled(&mut self, key: &str, enabled: bool) -> Result<(), Error> {
        self.panel
            .modify(key, |slot| match slot {
                Slot::Booking(b) => {
                    b.enabled = enabled;
                    b.last_update = Utc::now();
                    Ok(())
                }
                Slot::Catalog(_) => Err(ValidationError::Invalid {
                    field: "enabled",
                    reason: "catalog slots cannot be enabled or disabled".to_string(),
                }),
            })
            .await
    }

    pub async fn adjust_stock(&mut self, key: &str, delta: i64) -> Result<(), Error> {
        self.panel
            .modify(key, |slot| match slot {
                Slot::Catalog(c) => c.adjust_stock(delta),
                Slot::Booking(_) => Err(ValidationError::Invalid {
                    field: "stock",
                    reason: "booking slots carry no stock".to_string(),
                }),
            })
            .await
    }

    pub fn request_delete(&mut self, key: &str) -> Result<(), Error> {
        self.panel.request_destroy(key, DestructiveAction::Remove)
    }
}

impl Deref for SlotsPanel {
    type Target = Panel<Slot>;

    fn deref(&self) -> &Self::Target {
        &self.panel
    }
}

impl DerefMut for SlotsPanel {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.panel
    }
}
