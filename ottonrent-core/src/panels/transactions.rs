// File: ottonrent-core/src/panels/transactions.rs

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use ottonrent_common::Error;
use ottonrent_common::models::{StorePath, TransactionKind, TransactionTree};
use ottonrent_common::traits::RemoteStore;

use super::{Panel, PanelOptions};
use crate::notify::Notifier;
use crate::session::DestructiveAction;
use crate::views::{TransactionRow, build_transaction_view};

/// The whole transactions document, regular and special buckets alike.
pub struct TransactionsPanel {
    panel: Panel<TransactionTree>,
}

impl TransactionsPanel {
    pub const NAME: &'static str = "transactions";

    pub fn options(root: StorePath) -> PanelOptions {
        PanelOptions::singleton(Self::NAME, root)
    }

    pub fn mount(store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>, options: PanelOptions) -> Self {
        Self {
            panel: Panel::mount(store, notifier, options),
        }
    }

    pub fn tree(&self) -> TransactionTree {
        self.panel.value().unwrap_or_default()
    }

    pub fn rows(&self) -> Vec<TransactionRow> {
        build_transaction_view(&self.tree())
    }

    /// Arms deletion of one record, wherever its bucket lives.
    pub fn request_delete(&mut self, kind: TransactionKind, id: &str) -> Result<(), Error> {
        if self.tree().get(kind, id).is_none() {
            return Err(Error::NotFound(format!("no {} transaction '{id}'", kind.label())));
        }
        self.panel
            .request_destroy(Self::NAME, DestructiveAction::RemoveAt(kind.relative_path(id)))
    }
}

impl Deref for TransactionsPanel {
    type Target = Panel<TransactionTree>;

    fn deref(&self) -> &Self::Target {
        &self.panel
    }
}

impl DerefMut for TransactionsPanel {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.panel
    }
}
