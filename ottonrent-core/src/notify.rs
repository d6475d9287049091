//! ottonrent-core/src/notify.rs
//!
//! The notification surface. Panels report each write outcome through a
//! [`Notifier`]; how it is shown is up to the front end.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info};

use crate::eventbus::EventBus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Failure, message: message.into() }
    }

    pub fn is_failure(&self) -> bool {
        self.level == NoticeLevel::Failure
    }
}

/// Fire-and-forget sink for user-visible notices.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: Notice);
}

/// Writes notices to the log. The default when no front end is attached.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => info!("{}", notice.message),
            NoticeLevel::Failure => error!("{}", notice.message),
        }
    }
}

/// Forwards notices onto the [`EventBus`].
#[derive(Clone)]
pub struct BusNotifier {
    bus: EventBus,
}

impl BusNotifier {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl Notifier for BusNotifier {
    async fn notify(&self, notice: Notice) {
        self.bus.publish_notice(notice).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventbus::DashboardEvent;

    #[tokio::test]
    async fn bus_notifier_publishes_notifications() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe(Some(4)).await;
        let notifier = BusNotifier::new(bus.clone());

        notifier.notify(Notice::failure("write failed")).await;

        match rx.recv().await {
            Some(DashboardEvent::Notification { notice, .. }) => {
                assert!(notice.is_failure());
                assert_eq!(notice.message, "write failed");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
