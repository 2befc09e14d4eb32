//! Core domain models and event types.
//!
//! Provides strongly-typed identifiers, the email event and email log
//! models, error handling, and PostgreSQL repositories shared by the
//! webhook pipeline and the HTTP API.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod models;
pub mod storage;
pub mod time;

pub use error::{CoreError, EncoreError, Result};
pub use events::{EmailEventRecorded, EventHandler, MulticastEventHandler, NoOpEventHandler};
pub use models::{
    ContactId, EmailEvent, EmailEventId, EmailEventType, EmailLog, EmailLogId, EmailLogStatus,
    NewEmailEvent, NewEmailLog, WebhookEventData,
};
pub use time::{Clock, RealClock, TestClock};
