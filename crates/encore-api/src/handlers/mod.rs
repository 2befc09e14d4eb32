//! HTTP request handlers for the Encore API.
//!
//! - `webhooks` - provider webhook ingestion
//! - `health` - health, readiness and liveness probes
//!
//! Errors are answered as `{"error":{"code","message"}}` with a status
//! chosen from the error kind. Codes come from `EncoreError::code`.

pub mod health;
pub mod webhooks;

pub use health::{health_check, liveness_check, readiness_check};
pub use webhooks::ingest_resend_webhook;
