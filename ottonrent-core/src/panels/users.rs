// File: ottonrent-core/src/panels/users.rs

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde_json::Value;

use ottonrent_common::Error;
use ottonrent_common::models::StorePath;
use ottonrent_common::models::user::active_count;
use ottonrent_common::traits::RemoteStore;

use super::{Panel, PanelOptions};
use crate::notify::Notifier;
use crate::session::DestructiveAction;
use crate::views::{UserRow, build_user_view};

pub struct UsersPanel {
    panel: Panel<bool>,
}

impl UsersPanel {
    pub const NAME: &'static str = "users";

    pub fn options(root: StorePath) -> PanelOptions {
        PanelOptions::collection(Self::NAME, root)
    }

    /// Deactivation only happens through [`UsersPanel::request_deactivate`].
    pub fn mount(store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>, options: PanelOptions) -> Self {
        Self {
            panel: Panel::mount(store, notifier, options.with_guard(&[], Some(Value::Bool(false)))),
        }
    }

    pub fn rows(&self, search: &str) -> Vec<UserRow> {
        build_user_view(&self.panel.entries(), search)
    }

    pub fn active_count(&self) -> usize {
        active_count(&self.panel.entries())
    }

    pub async fn activate(&mut self, user_id: &str) -> Result<(), Error> {
        match self.panel.get(user_id) {
            Some(true) => Ok(()),
            Some(false) => {
                self.panel
                    .modify(user_id, |active| {
                        *active = true;
                        Ok(())
                    })
                    .await
            }
            None => self.panel.create(user_id, true).await,
        }
    }

    /// Deactivation cuts a paying user off, so it waits for confirmation.
    pub fn request_deactivate(&mut self, user_id: &str) -> Result<(), Error> {
        self.panel.request_destroy(
            user_id,
            DestructiveAction::SetAt {
                field: vec![],
                value: Value::Bool(false),
            },
        )
    }

    pub fn request_delete(&mut self, user_id: &str) -> Result<(), Error> {
        self.panel.request_destroy(user_id, DestructiveAction::Remove)
    }
}

impl Deref for UsersPanel {
    type Target = Panel<bool>;

    fn deref(&self) -> &Self::Target {
        &self.panel
    }
}

impl DerefMut for UsersPanel {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.panel
    }
}
