// File: ottonrent-core/src/panels/credentials.rs

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde_json::json;

use ottonrent_common::Error;
use ottonrent_common::models::{Credential, StorePath};
use ottonrent_common::traits::RemoteStore;

use super::{Panel, PanelOptions};
use crate::notify::Notifier;
use crate::session::DestructiveAction;
use crate::views::{CredentialRow, build_credential_view};

pub struct CredentialsPanel {
    panel: Panel<Credential>,
}

impl CredentialsPanel {
    pub const NAME: &'static str = "credentials";

    /// Credentials may share their parent with other documents, so only
    /// `cred*` children count.
    pub const KEY_PREFIX: &'static str = "cred";

    pub fn options(root: StorePath) -> PanelOptions {
        PanelOptions::collection(Self::NAME, root).with_key_prefix(Self::KEY_PREFIX)
    }

    /// Lock state only changes through [`CredentialsPanel::request_lock_toggle`].
    pub fn mount(store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>, options: PanelOptions) -> Self {
        Self {
            panel: Panel::mount(store, notifier, options.with_guard(&["locked"], None)),
        }
    }

    pub fn rows(&self, search: &str) -> Vec<CredentialRow> {
        build_credential_view(&self.panel.entries(), search)
    }

    /// First free `credN` key after the highest one in use.
    pub fn next_key(&self) -> String {
        let highest = self
            .panel
            .entries()
            .keys()
            .filter_map(|k| k.strip_prefix(Self::KEY_PREFIX)?.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        format!("{}{}", Self::KEY_PREFIX, highest + 1)
    }

    pub async fn add(&mut self, key: &str, credential: Credential) -> Result<(), Error> {
        self.panel.create(key, credential).await
    }

    /// Arms a flip of the `locked` flag. Confirming sends a single write to
    /// `<key>/locked`.
    pub fn request_lock_toggle(&mut self, key: &str) -> Result<(), Error> {
        let locked = self
            .panel
            .get(key)
            .map(|c| c.locked)
            .ok_or_else(|| Error::NotFound(format!("no credential '{key}'")))?;
        let value = if locked { json!(0) } else { json!(1) };
        self.panel.request_destroy(
            key,
            DestructiveAction::SetAt {
                field: vec!["locked".to_string()],
                value,
            },
        )
    }

    pub fn request_delete(&mut self, key: &str) -> Result<(), Error> {
        self.panel.request_destroy(key, DestructiveAction::Remove)
    }

    /// Counts one more issuance of `key`.
    pub async fn record_usage(&mut self, key: &str) -> Result<(), Error> {
        self.panel.modify(key, |c| c.record_usage(key)).await
    }
}

impl Deref for CredentialsPanel {
    type Target = Panel<Credential>;

    fn deref(&self) -> &Self::Target {
        &self.panel
    }
}

impl DerefMut for CredentialsPanel {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.panel
    }
}
