//! Repository for email logs.
//!
//! Email logs are written by the campaign sender. The webhook pipeline
//! reads them to correlate provider events and advances their status
//! through the status sync.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::Result,
    models::{EmailLog, EmailLogId, EmailLogStatus, NewEmailLog},
};

/// Repository for email log database operations.
pub struct Repository {
    pool: Arc<PgPool>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Inserts an email log.
    ///
    /// # Errors
    ///
    /// Returns error if insert fails.
    pub async fn create(&self, log: &NewEmailLog) -> Result<EmailLog> {
        let row = sqlx::query_as::<_, EmailLog>(
            r#"
            INSERT INTO email_logs (contact_id, track_id, resend_email_id, status, error)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, contact_id, track_id, resend_email_id, status, error, created_at
            "#,
        )
        .bind(log.contact_id)
        .bind(&log.track_id)
        .bind(&log.resend_email_id)
        .bind(log.status.to_string())
        .bind(&log.error)
        .fetch_one(&*self.pool)
        .await?;

        Ok(row)
    }

    /// Finds an email log by ID.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_id(&self, id: EmailLogId) -> Result<Option<EmailLog>> {
        let row = sqlx::query_as::<_, EmailLog>(
            r#"
            SELECT id, contact_id, track_id, resend_email_id, status, error, created_at
            FROM email_logs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row)
    }

    /// Finds the email log a provider email id belongs to.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_resend_email_id(&self, resend_email_id: &str) -> Result<Option<EmailLog>> {
        let row = sqlx::query_as::<_, EmailLog>(
            r#"
            SELECT id, contact_id, track_id, resend_email_id, status, error, created_at
            FROM email_logs
            WHERE resend_email_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(resend_email_id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row)
    }

    /// Moves an email log to `status` if that advances its lifecycle.
    ///
    /// The rank comparison happens inside the `UPDATE`, so concurrent
    /// webhooks for the same email cannot move the status backwards.
    /// Returns whether a row was updated.
    ///
    /// # Errors
    ///
    /// Returns error if update fails.
    pub async fn advance_status(&self, id: EmailLogId, status: EmailLogStatus) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE email_logs
            SET status = $1
            WHERE id = $2
              AND (CASE status
                     WHEN 'delivered' THEN 1
                     WHEN 'opened' THEN 2
                     WHEN 'clicked' THEN 3
                     WHEN 'bounced' THEN 4
                     ELSE 0
                   END) < $3
            "#,
        )
        .bind(status.to_string())
        .bind(id)
        .bind(i16::from(status.rank()))
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
