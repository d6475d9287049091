// File: ottonrent-core/src/panels/ui_config.rs

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use ottonrent_common::Error;
use ottonrent_common::models::{StorePath, UiConfig, UiPayload};
use ottonrent_common::traits::RemoteStore;

use super::{Panel, PanelOptions};
use crate::notify::Notifier;
use crate::session::DestructiveAction;

pub struct UiConfigPanel {
    panel: Panel<UiConfig>,
}

impl UiConfigPanel {
    pub const NAME: &'static str = "ui_config";

    pub fn options(root: StorePath) -> PanelOptions {
        PanelOptions::singleton(Self::NAME, root)
    }

    pub fn mount(store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>, options: PanelOptions) -> Self {
        Self {
            panel: Panel::mount(store, notifier, options),
        }
    }

    pub fn config(&self) -> UiConfig {
        self.panel.value().unwrap_or_default()
    }

    pub async fn set_screen(&mut self, screen: &str, payload: UiPayload) -> Result<(), Error> {
        self.panel
            .modify_or(Self::NAME, UiConfig::default(), |config| {
                config.screens.insert(screen.to_string(), payload);
                Ok(())
            })
            .await
    }

    pub fn request_remove_screen(&mut self, screen: &str) -> Result<(), Error> {
        if self.config().get(screen).is_none() {
            return Err(Error::NotFound(format!("no ui screen '{screen}'")));
        }
        self.panel
            .request_destroy(Self::NAME, DestructiveAction::RemoveAt(vec![screen.to_string()]))
    }
}

impl Deref for UiConfigPanel {
    type Target = Panel<UiConfig>;

    fn deref(&self) -> &Self::Target {
        &self.panel
    }
}

impl DerefMut for UiConfigPanel {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.panel
    }
}
