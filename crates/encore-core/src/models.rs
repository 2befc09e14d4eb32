//! Core domain models and strongly-typed identifiers.
//!
//! Defines email event records, the email log they correlate to, the closed
//! set of provider event types, and newtype ID wrappers for compile-time
//! type safety. Includes database serialization traits for each of them.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

type PgDb = sqlx::Postgres;
type PgValueRef<'r> = sqlx::postgres::PgValueRef<'r>;
type PgTypeInfo = sqlx::postgres::PgTypeInfo;
type PgArgumentBuffer = sqlx::postgres::PgArgumentBuffer;
type EncodeResult =
    Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync + 'static>>;
type BoxDynError = sqlx::error::BoxDynError;

macro_rules! bigint_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl sqlx::Type<PgDb> for $name {
            fn type_info() -> PgTypeInfo {
                <i64 as sqlx::Type<PgDb>>::type_info()
            }
        }

        impl<'r> sqlx::Decode<'r, PgDb> for $name {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                let id = <i64 as sqlx::Decode<PgDb>>::decode(value)?;
                Ok(Self(id))
            }
        }

        impl sqlx::Encode<'_, PgDb> for $name {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
                <i64 as sqlx::Encode<PgDb>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

bigint_id!(
    /// Identifier of a persisted email event record.
    ///
    /// Assigned by the database on insert.
    EmailEventId
);

bigint_id!(
    /// Identifier of an email log, one row per email sent to a contact.
    EmailLogId
);

bigint_id!(
    /// Identifier of an audience contact.
    ContactId
);

/// Closed set of email lifecycle events reported by the provider.
///
/// Each variant is a handler in its own right: the extraction it performs
/// on the provider payload is selected by exhaustive match, so adding a
/// variant fails to compile until every match site handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailEventType {
    /// Provider accepted the email for sending.
    Sent,
    /// Recipient mail server accepted the email.
    Delivered,
    /// Delivery is temporarily delayed and will be retried by the provider.
    Delayed,
    /// Recipient mail server permanently rejected the email.
    Bounced,
    /// Recipient opened the email.
    Opened,
    /// Recipient clicked a tracked link.
    Clicked,
}

impl EmailEventType {
    /// Every event type, in lifecycle order.
    pub const ALL: [Self; 6] =
        [Self::Sent, Self::Delivered, Self::Delayed, Self::Bounced, Self::Opened, Self::Clicked];

    /// Stored tag for this event type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Delayed => "delayed",
            Self::Bounced => "bounced",
            Self::Opened => "opened",
            Self::Clicked => "clicked",
        }
    }

    /// Webhook `type` string the provider uses for this event.
    pub const fn provider_type(self) -> &'static str {
        match self {
            Self::Sent => "email.sent",
            Self::Delivered => "email.delivered",
            Self::Delayed => "email.delivery_delayed",
            Self::Bounced => "email.bounced",
            Self::Opened => "email.opened",
            Self::Clicked => "email.clicked",
        }
    }

    /// Resolves a provider webhook `type` string.
    ///
    /// Returns `None` for event types outside the closed set, such as
    /// `email.complained`.
    pub fn from_provider_type(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event_type| event_type.provider_type() == value)
    }
}

impl fmt::Display for EmailEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmailEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event_type| event_type.as_str() == s)
            .ok_or_else(|| format!("invalid email event type: {s}"))
    }
}

impl sqlx::Type<PgDb> for EmailEventType {
    fn type_info() -> PgTypeInfo {
        <&str as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for EmailEventType {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as sqlx::Decode<PgDb>>::decode(value)?;
        Ok(s.parse()?)
    }
}

/// Delivery status of an email log.
///
/// Statuses are ranked so that a status sync only ever moves forward:
///
/// ```text
/// Sent / Failed -> Delivered -> Opened -> Clicked
///              \-> Bounced (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailLogStatus {
    /// Handed to the provider.
    Sent,
    /// The provider refused the send request.
    Failed,
    /// Accepted by the recipient server.
    Delivered,
    /// Permanently rejected by the recipient server.
    Bounced,
    /// Opened by the recipient.
    Opened,
    /// A link was clicked by the recipient.
    Clicked,
}

impl EmailLogStatus {
    /// Position of this status in the delivery lifecycle.
    ///
    /// `Bounced` outranks everything because no later engagement is
    /// possible once the recipient server rejected the message.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Sent | Self::Failed => 0,
            Self::Delivered => 1,
            Self::Opened => 2,
            Self::Clicked => 3,
            Self::Bounced => 4,
        }
    }

    /// Status an email log reaches when the given event is observed.
    ///
    /// `Delayed` carries no status change, and `Sent` is where every email
    /// log already starts.
    pub const fn from_event(event_type: EmailEventType) -> Option<Self> {
        match event_type {
            EmailEventType::Sent => None,
            EmailEventType::Delivered => Some(Self::Delivered),
            EmailEventType::Delayed => None,
            EmailEventType::Bounced => Some(Self::Bounced),
            EmailEventType::Opened => Some(Self::Opened),
            EmailEventType::Clicked => Some(Self::Clicked),
        }
    }

    /// Whether moving from `self` to `next` advances the lifecycle.
    pub const fn can_advance_to(self, next: Self) -> bool {
        next.rank() > self.rank()
    }
}

impl fmt::Display for EmailLogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent => write!(f, "sent"),
            Self::Failed => write!(f, "failed"),
            Self::Delivered => write!(f, "delivered"),
            Self::Bounced => write!(f, "bounced"),
            Self::Opened => write!(f, "opened"),
            Self::Clicked => write!(f, "clicked"),
        }
    }
}

impl sqlx::Type<PgDb> for EmailLogStatus {
    fn type_info() -> PgTypeInfo {
        <&str as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for EmailLogStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as sqlx::Decode<PgDb>>::decode(value)?;
        match s {
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            "delivered" => Ok(Self::Delivered),
            "bounced" => Ok(Self::Bounced),
            "opened" => Ok(Self::Opened),
            "clicked" => Ok(Self::Clicked),
            _ => Err(format!("invalid email log status: {s}").into()),
        }
    }
}

/// Normalized webhook input handed to an event handler.
///
/// Built per inbound request once the email log has been resolved from the
/// provider email id. Never persisted itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEventData {
    /// Provider email id (`data.email_id`).
    pub email_id: String,

    /// Email log the provider email id resolved to.
    pub email_log_id: EmailLogId,

    /// Contact the email was sent to.
    pub contact_id: ContactId,

    /// Track the campaign email promoted.
    pub track_id: String,

    /// Provider `data` object, kept opaque until extraction.
    pub data: serde_json::Value,
}

/// Persisted email event record.
///
/// Append-only: created once per processed webhook and never updated or
/// deleted by the ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmailEvent {
    /// Database-assigned identifier.
    pub id: EmailEventId,

    /// Email log this event belongs to.
    pub email_log_id: EmailLogId,

    /// Contact the email was sent to.
    pub contact_id: ContactId,

    /// Track the email promoted.
    pub track_id: String,

    /// Which lifecycle event this is.
    pub event_type: EmailEventType,

    /// Fields extracted from the provider payload for this event type.
    pub event_data: sqlx::types::Json<serde_json::Value>,

    /// Provider email id, shared by every event of one email.
    pub resend_email_id: String,

    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}

/// Email event record prior to insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEmailEvent {
    /// Email log this event belongs to.
    pub email_log_id: EmailLogId,

    /// Contact the email was sent to.
    pub contact_id: ContactId,

    /// Track the email promoted.
    pub track_id: String,

    /// Which lifecycle event this is.
    pub event_type: EmailEventType,

    /// Fields extracted from the provider payload.
    pub event_data: serde_json::Value,

    /// Provider email id.
    pub resend_email_id: String,

    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}

impl NewEmailEvent {
    /// Attaches a storage identifier, producing the persisted form.
    pub fn into_event(self, id: EmailEventId) -> EmailEvent {
        EmailEvent {
            id,
            email_log_id: self.email_log_id,
            contact_id: self.contact_id,
            track_id: self.track_id,
            event_type: self.event_type,
            event_data: sqlx::types::Json(self.event_data),
            resend_email_id: self.resend_email_id,
            created_at: self.created_at,
        }
    }
}

/// One email sent to one contact.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmailLog {
    /// Unique identifier.
    pub id: EmailLogId,

    /// Recipient contact.
    pub contact_id: ContactId,

    /// Track the email promoted.
    pub track_id: String,

    /// Provider email id, absent when the send request failed.
    pub resend_email_id: Option<String>,

    /// Latest known delivery status.
    pub status: EmailLogStatus,

    /// Provider error for failed sends.
    pub error: Option<String>,

    /// When the email was sent.
    pub created_at: DateTime<Utc>,
}

/// Email log prior to insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEmailLog {
    /// Recipient contact.
    pub contact_id: ContactId,

    /// Track the email promoted.
    pub track_id: String,

    /// Provider email id.
    pub resend_email_id: Option<String>,

    /// Initial status.
    pub status: EmailLogStatus,

    /// Provider error for failed sends.
    pub error: Option<String>,
}
