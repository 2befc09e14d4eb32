//! Repository for the append-only email event log.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::Result,
    models::{EmailEvent, EmailEventId, EmailEventType, EmailLogId, NewEmailEvent},
};

/// Repository for email event database operations.
///
/// Exposes inserts and reads only. Event rows are never updated or deleted.
pub struct Repository {
    pool: Arc<PgPool>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Returns a reference to the database pool.
    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    /// Appends an event to the log.
    ///
    /// # Errors
    ///
    /// Returns error if insert fails or constraints are violated.
    pub async fn create(&self, event: &NewEmailEvent) -> Result<EmailEvent> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO email_events (
                email_log_id, contact_id, track_id, event_type,
                event_data, resend_email_id, created_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7
            )
            RETURNING id
            "#,
        )
        .bind(event.email_log_id)
        .bind(event.contact_id)
        .bind(&event.track_id)
        .bind(event.event_type.as_str())
        .bind(sqlx::types::Json(&event.event_data))
        .bind(&event.resend_email_id)
        .bind(event.created_at)
        .fetch_one(&*self.pool)
        .await?;

        Ok(event.clone().into_event(EmailEventId(id)))
    }

    /// Finds every event recorded for one provider email, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_resend_email_id(&self, resend_email_id: &str) -> Result<Vec<EmailEvent>> {
        let events = sqlx::query_as::<_, EmailEvent>(
            r#"
            SELECT id, email_log_id, contact_id, track_id, event_type,
                   event_data, resend_email_id, created_at
            FROM email_events
            WHERE resend_email_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(resend_email_id)
        .fetch_all(&*self.pool)
        .await?;

        Ok(events)
    }

    /// Finds events for an email log, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_email_log(
        &self,
        email_log_id: EmailLogId,
        limit: Option<i64>,
    ) -> Result<Vec<EmailEvent>> {
        let events = sqlx::query_as::<_, EmailEvent>(
            r#"
            SELECT id, email_log_id, contact_id, track_id, event_type,
                   event_data, resend_email_id, created_at
            FROM email_events
            WHERE email_log_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(email_log_id)
        .bind(limit.unwrap_or(100))
        .fetch_all(&*self.pool)
        .await?;

        Ok(events)
    }

    /// Counts events of one type across all emails.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn count_by_type(&self, event_type: EmailEventType) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM email_events
            WHERE event_type = $1
            "#,
        )
        .bind(event_type.as_str())
        .fetch_one(&*self.pool)
        .await?;

        Ok(count.0)
    }
}
