//! Event handler variants.
//!
//! `EventProcessor::process` is the handler for every [`EmailEventType`]:
//! the variant selects the extraction, the rest of the record is built the
//! same way for all of them. Each call performs exactly one insert.

use std::sync::Arc;

use encore_core::{
    error::Result,
    events::{EmailEventRecorded, EventHandler, NoOpEventHandler},
    models::{EmailEvent, EmailEventType, NewEmailEvent, WebhookEventData},
    time::{Clock, RealClock},
};
use tracing::{debug, instrument};

use crate::{extract::EventData, storage::EmailEventStorage};

/// Turns normalized webhook data into event log records.
#[derive(Clone)]
pub struct EventProcessor {
    storage: Arc<dyn EmailEventStorage>,
    clock: Arc<dyn Clock>,
    subscriber: Arc<dyn EventHandler>,
}

impl EventProcessor {
    /// Creates a processor with a real clock and no subscribers.
    pub fn new(storage: Arc<dyn EmailEventStorage>) -> Self {
        Self { storage, clock: Arc::new(RealClock::new()), subscriber: Arc::new(NoOpEventHandler) }
    }

    /// Replaces the clock used for `created_at`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the subscriber notified after each insert.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn EventHandler>) -> Self {
        self.subscriber = subscriber;
        self
    }

    /// Storage the processor writes to.
    pub fn storage(&self) -> &Arc<dyn EmailEventStorage> {
        &self.storage
    }

    /// Builds the record `event_type` produces for `data`.
    pub fn build_record(&self, event_type: EmailEventType, data: WebhookEventData) -> NewEmailEvent {
        let event_data = EventData::extract(event_type, &data.data).to_json();

        NewEmailEvent {
            email_log_id: data.email_log_id,
            contact_id: data.contact_id,
            track_id: data.track_id,
            event_type,
            event_data,
            resend_email_id: data.email_id,
            created_at: self.clock.now_utc(),
        }
    }

    /// Records one event and notifies the subscriber.
    ///
    /// Identical input processed twice produces two records.
    ///
    /// # Errors
    ///
    /// Storage errors propagate unchanged; nothing is retried and the
    /// subscriber is not notified.
    #[instrument(
        name = "process_email_event",
        skip(self, data),
        fields(
            event_type = %event_type,
            resend_email_id = %data.email_id,
            email_log_id = %data.email_log_id,
        )
    )]
    pub async fn process(
        &self,
        event_type: EmailEventType,
        data: WebhookEventData,
    ) -> Result<EmailEvent> {
        let record = self.build_record(event_type, data);
        let event = self.storage.create_event(record).await?;

        debug!(event_id = %event.id, "Email event recorded");

        self.subscriber.handle_event(EmailEventRecorded { event: event.clone() }).await;

        Ok(event)
    }
}

impl std::fmt::Debug for EventProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventProcessor")
            .field("clock", &self.clock)
            .field("subscriber", &self.subscriber)
            .finish_non_exhaustive()
    }
}
