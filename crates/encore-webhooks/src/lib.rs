//! Email provider webhook processing.
//!
//! Classifies provider webhooks by event type, extracts the fields each
//! type keeps, and appends one record per webhook to the email event log.
//!
//! # Architecture
//!
//! 1. **Parse** - [`ResendWebhook::from_slice`] validates the envelope
//! 2. **Correlate** - [`Dispatcher::ingest`] resolves the email log for
//!    `data.email_id`
//! 3. **Dispatch** - the `type` string selects an [`EmailEventType`];
//!    unknown types are acknowledged and ignored
//! 4. **Record** - [`EventProcessor::process`] extracts and inserts exactly
//!    one record, then notifies subscribers such as [`StatusSync`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use encore_webhooks::{
//!     storage::mock::MockEmailEventStorage, Dispatcher, EventProcessor, ResendWebhook,
//! };
//!
//! # async fn example(body: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let storage = Arc::new(MockEmailEventStorage::new());
//! let dispatcher = Dispatcher::new(EventProcessor::new(storage));
//!
//! let outcome = dispatcher.ingest(ResendWebhook::from_slice(body)?).await?;
//! println!("recorded: {}", outcome.is_processed());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dispatcher;
pub mod extract;
pub mod payload;
pub mod processor;
pub mod status_sync;
pub mod storage;

pub use dispatcher::{DispatchOutcome, Dispatcher, IgnoreReason};
pub use encore_core::models::EmailEventType;
pub use extract::EventData;
pub use payload::ResendWebhook;
pub use processor::EventProcessor;
pub use status_sync::StatusSync;
pub use storage::{EmailEventStorage, PostgresEmailEventStorage};
