//! Routes provider webhooks to the matching event handler.
//!
//! Unknown event types and emails with no email log are acknowledged and
//! ignored: the provider redelivers anything that is not answered with a
//! 2xx, and neither case would succeed on a retry.

use encore_core::{
    error::Result,
    models::{EmailEvent, EmailEventType, WebhookEventData},
};
use tracing::{info, instrument, warn};

use crate::{payload::ResendWebhook, processor::EventProcessor};

/// Why a webhook was acknowledged without recording anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// `type` is outside the handled event set.
    UnknownEventType(String),
    /// No email log carries this provider email id.
    UnknownEmail(String),
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownEventType(event_type) => write!(f, "unhandled event type {event_type}"),
            Self::UnknownEmail(email_id) => write!(f, "no email log for {email_id}"),
        }
    }
}

/// Result of dispatching one webhook.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The handler recorded this event.
    Processed(EmailEvent),
    /// Nothing was recorded.
    Ignored(IgnoreReason),
}

impl DispatchOutcome {
    /// Whether an event was recorded.
    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed(_))
    }
}

/// Selects the handler for a webhook `type` and invokes it.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    processor: EventProcessor,
}

impl Dispatcher {
    /// Creates a dispatcher over the given processor.
    pub fn new(processor: EventProcessor) -> Self {
        Self { processor }
    }

    /// Dispatches already-correlated webhook data by provider type string.
    ///
    /// # Errors
    ///
    /// Returns storage errors from the handler. Unknown types are never
    /// errors.
    pub async fn dispatch(&self, event_type: &str, data: WebhookEventData) -> Result<DispatchOutcome> {
        let Some(parsed) = EmailEventType::from_provider_type(event_type) else {
            info!(event_type, "Ignoring unhandled webhook event type");
            return Ok(DispatchOutcome::Ignored(IgnoreReason::UnknownEventType(
                event_type.to_string(),
            )));
        };

        let event = self.processor.process(parsed, data).await?;
        Ok(DispatchOutcome::Processed(event))
    }

    /// Resolves the email log for a parsed webhook and dispatches it.
    ///
    /// The event type is checked before the lookup so unhandled types cost
    /// no database round trip.
    ///
    /// # Errors
    ///
    /// Returns storage errors from the lookup or the handler.
    #[instrument(
        name = "dispatch_webhook",
        skip(self, webhook),
        fields(event_type = %webhook.event_type, resend_email_id = webhook.email_id().unwrap_or(""))
    )]
    pub async fn ingest(&self, webhook: ResendWebhook) -> Result<DispatchOutcome> {
        if EmailEventType::from_provider_type(&webhook.event_type).is_none() {
            info!("Ignoring unhandled webhook event type");
            return Ok(DispatchOutcome::Ignored(IgnoreReason::UnknownEventType(webhook.event_type)));
        }

        let email_id = webhook.email_id().unwrap_or_default().to_string();
        let Some(email_log) =
            self.processor.storage().find_email_log_by_resend_id(email_id.clone()).await?
        else {
            warn!("No email log for provider email id, acknowledging without recording");
            return Ok(DispatchOutcome::Ignored(IgnoreReason::UnknownEmail(email_id)));
        };

        let data = WebhookEventData {
            email_id,
            email_log_id: email_log.id,
            contact_id: email_log.contact_id,
            track_id: email_log.track_id,
            data: webhook.data,
        };

        self.dispatch(&webhook.event_type, data).await
    }
}
