//! Provider webhook envelope.
//!
//! Resend posts `{type, created_at, data}` where `data` varies by event
//! type. Only `type` and `data.email_id` are required for routing; the rest
//! of `data` is kept opaque for per-type extraction.

use encore_core::EncoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parsed provider webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResendWebhook {
    /// Provider event type, e.g. `email.delivered`.
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the provider generated the event.
    #[serde(default)]
    pub created_at: Option<String>,

    /// Event-specific payload.
    pub data: Value,
}

impl ResendWebhook {
    /// Parses and validates a raw request body.
    ///
    /// # Errors
    ///
    /// Returns `EncoreError::MalformedPayload` if the body is not a JSON
    /// envelope or `data.email_id` is missing or empty.
    pub fn from_slice(body: &[u8]) -> Result<Self, EncoreError> {
        let webhook: Self = serde_json::from_slice(body)
            .map_err(|e| EncoreError::MalformedPayload(format!("invalid webhook JSON: {e}")))?;

        if webhook.email_id().is_none() {
            return Err(EncoreError::MalformedPayload(
                "data.email_id must be a non-empty string".to_string(),
            ));
        }

        Ok(webhook)
    }

    /// Provider email id (`data.email_id`), when present and non-empty.
    pub fn email_id(&self) -> Option<&str> {
        self.data.get("email_id").and_then(Value::as_str).filter(|id| !id.is_empty())
    }
}
