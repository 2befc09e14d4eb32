//! Per-event-type extraction of provider payload fields.
//!
//! Each [`EmailEventType`] variant keeps only the fields relevant to it.
//! Extraction reads the opaque provider `data` object the way optional
//! chaining would: a missing or mistyped parent yields `null`, never an
//! error. Values are copied as-is without type validation.

use encore_core::models::EmailEventType;
use serde::Serialize;
use serde_json::Value;

/// Message envelope fields kept for `sent` and `delivered` events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageDetails {
    /// Sender address.
    pub from: Value,
    /// Recipient addresses.
    pub to: Value,
    /// Subject line.
    pub subject: Value,
}

/// Fields kept for `delayed` events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayDetails {
    /// Provider explanation for the delay.
    pub reason: Value,
}

/// Fields kept for `bounced` events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BounceDetails {
    /// Top-level reason, when the provider sends one.
    pub reason: Value,
    /// `bounce.type`, e.g. `Permanent`.
    pub bounce_type: Value,
    /// `bounce.message` from the recipient server.
    pub message: Value,
}

/// Fields kept for `opened` events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenDetails {
    /// Recipient addresses.
    pub to: Value,
    /// Subject line.
    pub subject: Value,
}

/// Fields kept for `clicked` events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClickDetails {
    /// `click.link`, the URL that was followed.
    pub link: Value,
    /// `click.timestamp`, when the click happened.
    pub timestamp: Value,
}

/// Structured extract stored as `event_data`, one variant per event type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventData {
    /// Extract of an `email.sent` payload.
    Sent(MessageDetails),
    /// Extract of an `email.delivered` payload.
    Delivered(MessageDetails),
    /// Extract of an `email.delivery_delayed` payload.
    Delayed(DelayDetails),
    /// Extract of an `email.bounced` payload.
    Bounced(BounceDetails),
    /// Extract of an `email.opened` payload.
    Opened(OpenDetails),
    /// Extract of an `email.clicked` payload.
    Clicked(ClickDetails),
}

impl EventData {
    /// Extracts the fields `event_type` keeps from a provider `data` object.
    pub fn extract(event_type: EmailEventType, data: &Value) -> Self {
        match event_type {
            EmailEventType::Sent => Self::Sent(message_details(data)),
            EmailEventType::Delivered => Self::Delivered(message_details(data)),
            EmailEventType::Delayed => Self::Delayed(DelayDetails { reason: field(data, "/reason") }),
            EmailEventType::Bounced => Self::Bounced(BounceDetails {
                reason: field(data, "/reason"),
                bounce_type: field(data, "/bounce/type"),
                message: field(data, "/bounce/message"),
            }),
            EmailEventType::Opened => Self::Opened(OpenDetails {
                to: field(data, "/to"),
                subject: field(data, "/subject"),
            }),
            EmailEventType::Clicked => Self::Clicked(ClickDetails {
                link: field(data, "/click/link"),
                timestamp: field(data, "/click/timestamp"),
            }),
        }
    }

    /// Event type this extract belongs to.
    pub const fn event_type(&self) -> EmailEventType {
        match self {
            Self::Sent(_) => EmailEventType::Sent,
            Self::Delivered(_) => EmailEventType::Delivered,
            Self::Delayed(_) => EmailEventType::Delayed,
            Self::Bounced(_) => EmailEventType::Bounced,
            Self::Opened(_) => EmailEventType::Opened,
            Self::Clicked(_) => EmailEventType::Clicked,
        }
    }

    /// JSON object persisted as the record's `event_data`.
    pub fn to_json(&self) -> Value {
        // Every variant is a struct of `Value` fields, which always serializes.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn message_details(data: &Value) -> MessageDetails {
    MessageDetails {
        from: field(data, "/from"),
        to: field(data, "/to"),
        subject: field(data, "/subject"),
    }
}

fn field(data: &Value, pointer: &str) -> Value {
    data.pointer(pointer).cloned().unwrap_or(Value::Null)
}
