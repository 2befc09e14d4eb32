//! Notifications emitted after email events are recorded.
//!
//! The ingestion pipeline only appends to the event log. Anything that
//! reacts to a recorded event, such as the email log status sync, subscribes
//! through [`EventHandler`] instead of being called by the handlers directly.
//!
//! ```text
//! ┌─────────────────┐   EmailEventRecorded   ┌────────────────────┐
//! │ EventProcessor  │ ─────────────────────▶ │ MulticastHandler   │
//! │ (Producer)      │                        │ (Event Dispatcher) │
//! └─────────────────┘                        └────────────────────┘
//!                                                      │
//!                                                      ▼
//!                                            ┌────────────────────┐
//!                                            │ StatusSync         │
//!                                            │ (Event Subscriber) │
//!                                            └────────────────────┘
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::EmailEvent;

/// Notification that an email event was appended to the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailEventRecorded {
    /// The stored record, including its database identifier.
    pub event: EmailEvent,
}

/// Trait for reacting to recorded email events.
///
/// Handlers must not fail the ingestion that produced the notification. If
/// handling fails, log the error and return.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync + std::fmt::Debug {
    /// Handles a recorded event.
    async fn handle_event(&self, event: EmailEventRecorded);
}

/// No-op event handler that discards all events.
#[derive(Debug, Default)]
pub struct NoOpEventHandler;

impl NoOpEventHandler {
    /// Creates a new no-op event handler.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl EventHandler for NoOpEventHandler {
    async fn handle_event(&self, _event: EmailEventRecorded) {}
}

/// Forwards each notification to every registered subscriber concurrently.
#[derive(Debug, Clone)]
pub struct MulticastEventHandler {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl MulticastEventHandler {
    /// Creates a new multicast handler with no subscribers.
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// Adds a subscriber.
    pub fn add_subscriber(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Returns the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for MulticastEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EventHandler for MulticastEventHandler {
    async fn handle_event(&self, event: EmailEventRecorded) {
        let futures = self.handlers.iter().map(|handler| {
            let event = event.clone();
            async move {
                handler.handle_event(event).await;
            }
        });

        futures::future::join_all(futures).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;

    use super::*;
    use crate::models::{ContactId, EmailEventId, EmailEventType, EmailLogId};

    #[derive(Debug)]
    struct CountingHandler {
        event_count: Arc<AtomicUsize>,
    }

    impl CountingHandler {
        fn new() -> (Self, Arc<AtomicUsize>) {
            let counter = Arc::new(AtomicUsize::new(0));
            (Self { event_count: counter.clone() }, counter)
        }
    }

    #[async_trait::async_trait]
    impl EventHandler for CountingHandler {
        async fn handle_event(&self, _event: EmailEventRecorded) {
            self.event_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn recorded() -> EmailEventRecorded {
        EmailEventRecorded {
            event: EmailEvent {
                id: EmailEventId(1),
                email_log_id: EmailLogId(42),
                contact_id: ContactId(7),
                track_id: "t9".to_string(),
                event_type: EmailEventType::Opened,
                event_data: sqlx::types::Json(serde_json::json!({})),
                resend_email_id: "re_1".to_string(),
                created_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn no_op_handler_discards_events() {
        NoOpEventHandler::new().handle_event(recorded()).await;
    }

    #[tokio::test]
    async fn multicast_handler_forwards_to_all_subscribers() {
        let mut multicast = MulticastEventHandler::new();
        let (first, first_count) = CountingHandler::new();
        let (second, second_count) = CountingHandler::new();
        multicast.add_subscriber(Arc::new(first));
        multicast.add_subscriber(Arc::new(second));

        assert_eq!(multicast.subscriber_count(), 2);

        multicast.handle_event(recorded()).await;

        assert_eq!(first_count.load(Ordering::SeqCst), 1);
        assert_eq!(second_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn multicast_handler_handles_empty_subscribers() {
        MulticastEventHandler::new().handle_event(recorded()).await;
    }
}
