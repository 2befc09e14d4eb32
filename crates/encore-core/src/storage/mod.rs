//! Database access layer implementing the repository pattern for email
//! tracking.
//!
//! Repositories translate between domain models and table rows. All SQL
//! touching `email_events` and `email_logs` lives in this module.

use std::sync::Arc;

use sqlx::PgPool;

pub mod email_events;
pub mod email_logs;

use crate::error::Result;

/// Container for all repository instances sharing one connection pool.
#[derive(Clone)]
pub struct Storage {
    /// Repository for the append-only email event log.
    pub email_events: Arc<email_events::Repository>,

    /// Repository for email logs.
    pub email_logs: Arc<email_logs::Repository>,
}

impl Storage {
    /// Creates a new storage instance with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        let pool = Arc::new(pool);

        Self {
            email_events: Arc::new(email_events::Repository::new(pool.clone())),
            email_logs: Arc::new(email_logs::Repository::new(pool)),
        }
    }

    /// Performs a health check on the database connection.
    ///
    /// Used by the `/ready` endpoint.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Database` if the connection is unhealthy.
    pub async fn health_check(&self) -> Result<()> {
        let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&*self.email_events.pool()).await?;

        Ok(())
    }
}

const SCHEMA: [&str; 5] = [
    r#"
    CREATE TABLE IF NOT EXISTS email_logs (
        id BIGSERIAL PRIMARY KEY,
        contact_id BIGINT NOT NULL,
        track_id TEXT NOT NULL,
        resend_email_id TEXT,
        status TEXT NOT NULL DEFAULT 'sent',
        error TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS email_events (
        id BIGSERIAL PRIMARY KEY,
        email_log_id BIGINT NOT NULL REFERENCES email_logs(id),
        contact_id BIGINT NOT NULL,
        track_id TEXT NOT NULL,
        event_type TEXT NOT NULL,
        event_data JSONB NOT NULL,
        resend_email_id TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_email_logs_resend_email_id
    ON email_logs(resend_email_id)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_email_events_resend_email_id
    ON email_events(resend_email_id, created_at)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_email_events_email_log
    ON email_events(email_log_id, created_at DESC)
    "#,
];

/// Creates the email tracking tables and indexes if they do not exist.
///
/// # Errors
///
/// Returns `CoreError::Database` if any statement fails.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn storage_can_be_created() {
        let pool = sqlx::PgPool::connect_lazy("postgresql://test").unwrap();
        let _storage = Storage::new(pool);
    }
}
