//! Notifications emitted after each successful user operation.
//!
//! Delivery is fire-and-forget: a sink failure is logged and never fails the
//! request that produced the event.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::models::UserResponse;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum UserEvent {
    /// A listing was served; carries the number of records returned
    Collected { count: usize },
    Fetched(UserResponse),
    Created(UserResponse),
    Updated(UserResponse),
    Deleted(UserResponse),
    Restored(UserResponse),
}

impl UserEvent {
    /// Subject name, e.g. `user.created`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Collected { .. } => "user.collected",
            Self::Fetched(_) => "user.fetched",
            Self::Created(_) => "user.created",
            Self::Updated(_) => "user.updated",
            Self::Deleted(_) => "user.deleted",
            Self::Restored(_) => "user.restored",
        }
    }

    fn username(&self) -> Option<&str> {
        match self {
            Self::Collected { .. } => None,
            Self::Fetched(u)
            | Self::Created(u)
            | Self::Updated(u)
            | Self::Deleted(u)
            | Self::Restored(u) => Some(&u.username),
        }
    }
}

/// Receives user events
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: UserEvent);
}

/// Writes each event to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, event: UserEvent) {
        info!(event = event.kind(), username = event.username(), "User event");
    }
}

/// Fans events out to in-process subscribers
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<UserEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UserEvent> {
        self.sender.subscribe()
    }
}

impl NotificationSink for BroadcastNotifier {
    fn notify(&self, event: UserEvent) {
        let kind = event.kind();
        if self.sender.send(event).is_err() {
            debug!(event = kind, "No subscribers for user event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn test_kind_names() {
        assert_eq!(UserEvent::Collected { count: 0 }.kind(), "user.collected");
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(UserEvent::Collected { count: 3 }).unwrap();
        assert_eq!(json["event"], "collected");
        assert_eq!(json["payload"]["count"], 3);
    }

    #[tokio::test]
    async fn test_broadcast_delivers_to_subscribers() {
        let notifier = BroadcastNotifier::new(8);
        let mut rx = notifier.subscribe();

        notifier.notify(UserEvent::Collected { count: 2 });

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, UserEvent::Collected { count: 2 }));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn notify_without_subscribers(level: tracing::Level) -> String {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(logs.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            BroadcastNotifier::new(1).notify(UserEvent::Collected { count: 0 });
        });
        logs.contents()
    }

    #[test]
    fn test_missing_subscribers_only_logged_at_debug() {
        assert!(notify_without_subscribers(tracing::Level::INFO).is_empty());
        assert!(
            notify_without_subscribers(tracing::Level::DEBUG).contains("No subscribers for user event")
        );
    }
}
