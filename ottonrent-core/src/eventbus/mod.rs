//! src/eventbus/mod.rs
//!
//! In-process event bus with guaranteed delivery to every subscriber through
//! bounded MPSC queues. Dashboard front ends subscribe here to render
//! notifications and react to session and panel changes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc, watch};

use ottonrent_common::models::Tenant;

use crate::notify::Notice;
use crate::panels::PanelStatus;

#[derive(Debug, Clone)]
pub enum DashboardEvent {
    /// A user-facing notice produced by a panel operation.
    Notification {
        notice: Notice,
        timestamp: DateTime<Utc>,
    },

    /// Signed in (`Some`) or signed out (`None`).
    SessionChanged { tenant: Option<Tenant> },

    PanelStatusChanged {
        panel: &'static str,
        status: PanelStatus,
    },
}

impl DashboardEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DashboardEvent::Notification { .. } => "notification",
            DashboardEvent::SessionChanged { .. } => "session_changed",
            DashboardEvent::PanelStatusChanged { .. } => "panel_status_changed",
        }
    }
}

/// Each subscriber gets its own `mpsc::Sender<DashboardEvent>`.
///
/// - If a subscriber's buffer fills, `publish` waits for space (backpressure).
/// - Subscribers whose `Receiver` was dropped are pruned on the next publish.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<DashboardEvent>>>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Default size for each subscriber's buffer.
const DEFAULT_BUFFER_SIZE: usize = 1024;

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            shutdown_tx: Arc::new(tx),
            shutdown_rx: rx,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    pub async fn subscribe(&self, buffer_size: Option<usize>) -> mpsc::Receiver<DashboardEvent> {
        let size = buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE);
        let (tx, rx) = mpsc::channel(size);
        self.subscribers.lock().await.push(tx);
        rx
    }

    pub async fn publish(&self, event: DashboardEvent) {
        if self.is_shutdown() {
            return;
        }
        let senders = {
            let subs = self.subscribers.lock().await;
            subs.clone()
        };
        let mut closed = false;
        for s in senders {
            if s.send(event.clone()).await.is_err() {
                closed = true;
            }
        }
        if closed {
            self.subscribers.lock().await.retain(|s| !s.is_closed());
        }
    }

    pub async fn publish_notice(&self, notice: Notice) {
        self.publish(DashboardEvent::Notification {
            notice,
            timestamp: Utc::now(),
        })
        .await;
    }
}
