//! Email log status sync.
//!
//! Subscribes to recorded events and advances the owning email log's
//! status. The event log itself stays append-only; this is the only writer
//! of `email_logs.status` in the pipeline.

use std::sync::Arc;

use encore_core::{
    events::{EmailEventRecorded, EventHandler},
    models::EmailLogStatus,
};
use tracing::{debug, error, info};

use crate::storage::EmailEventStorage;

/// Advances email log status from recorded events, never backwards.
///
/// An event that arrives after a later-stage one (a `delivered` after an
/// `opened`, say) is still recorded by the processor but leaves the status
/// untouched, and the anomaly is logged.
pub struct StatusSync {
    storage: Arc<dyn EmailEventStorage>,
}

impl StatusSync {
    /// Creates a status sync writing through `storage`.
    pub fn new(storage: Arc<dyn EmailEventStorage>) -> Self {
        Self { storage }
    }
}

impl std::fmt::Debug for StatusSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusSync").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl EventHandler for StatusSync {
    async fn handle_event(&self, recorded: EmailEventRecorded) {
        let event = recorded.event;
        let Some(status) = EmailLogStatus::from_event(event.event_type) else {
            debug!(event_type = %event.event_type, "Event carries no status change");
            return;
        };

        match self.storage.advance_email_log_status(event.email_log_id, status).await {
            Ok(true) => {
                debug!(email_log_id = %event.email_log_id, status = %status, "Email log status advanced");
            },
            Ok(false) => {
                info!(
                    email_log_id = %event.email_log_id,
                    event_type = %event.event_type,
                    resend_email_id = %event.resend_email_id,
                    "Email log already at or past this stage, status unchanged"
                );
            },
            Err(e) => {
                error!(
                    error = %e,
                    email_log_id = %event.email_log_id,
                    "Failed to advance email log status"
                );
            },
        }
    }
}
