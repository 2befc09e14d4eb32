//! Storage abstraction layer for webhook processing.
//!
//! Provides a trait over the storage operations the pipeline needs so that
//! dispatch, extraction and status sync can be tested without a database.
//! Production uses `encore_core::storage::Storage`; tests use
//! [`mock::MockEmailEventStorage`].

use std::{future::Future, pin::Pin, sync::Arc};

use encore_core::{
    error::Result,
    models::{EmailEvent, EmailLog, EmailLogId, EmailLogStatus, NewEmailEvent},
};

/// Storage operations required by the webhook pipeline.
pub trait EmailEventStorage: Send + Sync + 'static {
    /// Appends an event record to the log.
    ///
    /// Exactly one insert per call. No deduplication happens here.
    fn create_event(
        &self,
        event: NewEmailEvent,
    ) -> Pin<Box<dyn Future<Output = Result<EmailEvent>> + Send + '_>>;

    /// Finds the email log a provider email id belongs to.
    fn find_email_log_by_resend_id(
        &self,
        resend_email_id: String,
    ) -> Pin<Box<dyn Future<Output = Result<Option<EmailLog>>> + Send + '_>>;

    /// Moves an email log to `status` if that advances its lifecycle.
    ///
    /// Returns `false` when the log is missing or already at or past
    /// `status`.
    fn advance_email_log_status(
        &self,
        email_log_id: EmailLogId,
        status: EmailLogStatus,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>>;

    /// Finds every event recorded for a provider email, oldest first.
    fn find_events_by_resend_id(
        &self,
        resend_email_id: String,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<EmailEvent>>> + Send + '_>>;

    /// Verifies the backing store is reachable.
    fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production storage implementation using PostgreSQL.
pub struct PostgresEmailEventStorage {
    storage: Arc<encore_core::storage::Storage>,
}

impl PostgresEmailEventStorage {
    /// Creates a new PostgreSQL storage adapter.
    pub fn new(storage: Arc<encore_core::storage::Storage>) -> Self {
        Self { storage }
    }
}

impl EmailEventStorage for PostgresEmailEventStorage {
    fn create_event(
        &self,
        event: NewEmailEvent,
    ) -> Pin<Box<dyn Future<Output = Result<EmailEvent>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.email_events.create(&event).await })
    }

    fn find_email_log_by_resend_id(
        &self,
        resend_email_id: String,
    ) -> Pin<Box<dyn Future<Output = Result<Option<EmailLog>>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.email_logs.find_by_resend_email_id(&resend_email_id).await })
    }

    fn advance_email_log_status(
        &self,
        email_log_id: EmailLogId,
        status: EmailLogStatus,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.email_logs.advance_status(email_log_id, status).await })
    }

    fn find_events_by_resend_id(
        &self,
        resend_email_id: String,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<EmailEvent>>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(
            async move { storage.email_events.find_by_resend_email_id(&resend_email_id).await },
        )
    }

    fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.health_check().await })
    }
}

pub mod mock {
    //! In-memory storage for testing the pipeline without a database.
    //!
    //! Records every insert in call order and supports injecting a failure
    //! into the next insert.

    use std::{
        collections::HashMap,
        future::Future,
        pin::Pin,
        sync::{
            atomic::{AtomicI64, AtomicUsize, Ordering},
            Arc,
        },
    };

    use chrono::Utc;
    use encore_core::{
        error::{CoreError, Result},
        models::{ContactId, EmailEventId, NewEmailLog},
    };
    use tokio::sync::RwLock;

    use super::{EmailEvent, EmailEventStorage, EmailLog, EmailLogId, EmailLogStatus, NewEmailEvent};

    /// Mock storage backed by in-memory collections.
    pub struct MockEmailEventStorage {
        events: Arc<RwLock<Vec<EmailEvent>>>,
        email_logs: Arc<RwLock<HashMap<EmailLogId, EmailLog>>>,
        next_event_id: AtomicI64,
        next_log_id: AtomicI64,
        advance_calls: AtomicUsize,
        create_error: Arc<RwLock<Option<String>>>,
        healthy: Arc<RwLock<bool>>,
    }

    impl MockEmailEventStorage {
        /// Creates a new mock storage with empty state.
        pub fn new() -> Self {
            Self {
                events: Arc::new(RwLock::new(Vec::new())),
                email_logs: Arc::new(RwLock::new(HashMap::new())),
                next_event_id: AtomicI64::new(1),
                next_log_id: AtomicI64::new(1),
                advance_calls: AtomicUsize::new(0),
                create_error: Arc::new(RwLock::new(None)),
                healthy: Arc::new(RwLock::new(true)),
            }
        }

        /// Stores an email log with an assigned ID and returns it.
        pub async fn add_email_log(&self, log: NewEmailLog) -> EmailLog {
            let id = EmailLogId(self.next_log_id.fetch_add(1, Ordering::SeqCst));
            self.insert_email_log(id, log).await
        }

        /// Stores an email log under a caller-chosen ID.
        pub async fn insert_email_log(&self, id: EmailLogId, log: NewEmailLog) -> EmailLog {
            let stored = EmailLog {
                id,
                contact_id: log.contact_id,
                track_id: log.track_id,
                resend_email_id: log.resend_email_id,
                status: log.status,
                error: log.error,
                created_at: Utc::now(),
            };
            self.email_logs.write().await.insert(id, stored.clone());
            stored
        }

        /// Convenience for a freshly sent email log.
        pub async fn add_sent_email(
            &self,
            id: EmailLogId,
            contact_id: ContactId,
            track_id: &str,
            resend_email_id: &str,
        ) -> EmailLog {
            self.insert_email_log(id, NewEmailLog {
                contact_id,
                track_id: track_id.to_string(),
                resend_email_id: Some(resend_email_id.to_string()),
                status: EmailLogStatus::Sent,
                error: None,
            })
            .await
        }

        /// Makes the next `create_event` call fail with a database error.
        pub async fn inject_create_error(&self, error: impl Into<String>) {
            *self.create_error.write().await = Some(error.into());
        }

        /// Makes `health_check` report the given state.
        pub async fn set_healthy(&self, healthy: bool) {
            *self.healthy.write().await = healthy;
        }

        /// Returns every created event in insertion order.
        pub async fn created_events(&self) -> Vec<EmailEvent> {
            self.events.read().await.clone()
        }

        /// Returns the number of `create_event` calls that succeeded.
        pub async fn create_count(&self) -> usize {
            self.events.read().await.len()
        }

        /// Returns how many status advances were attempted.
        pub fn advance_count(&self) -> usize {
            self.advance_calls.load(Ordering::SeqCst)
        }

        /// Returns the current status of an email log.
        pub async fn email_log_status(&self, id: EmailLogId) -> Option<EmailLogStatus> {
            self.email_logs.read().await.get(&id).map(|log| log.status)
        }
    }

    impl Default for MockEmailEventStorage {
        fn default() -> Self {
            Self::new()
        }
    }

    impl EmailEventStorage for MockEmailEventStorage {
        fn create_event(
            &self,
            event: NewEmailEvent,
        ) -> Pin<Box<dyn Future<Output = Result<EmailEvent>> + Send + '_>> {
            Box::pin(async move {
                if let Some(error) = self.create_error.write().await.take() {
                    return Err(CoreError::Database(error));
                }

                let id = EmailEventId(self.next_event_id.fetch_add(1, Ordering::SeqCst));
                let stored = event.into_event(id);
                self.events.write().await.push(stored.clone());
                Ok(stored)
            })
        }

        fn find_email_log_by_resend_id(
            &self,
            resend_email_id: String,
        ) -> Pin<Box<dyn Future<Output = Result<Option<EmailLog>>> + Send + '_>> {
            let email_logs = self.email_logs.clone();
            Box::pin(async move {
                Ok(email_logs
                    .read()
                    .await
                    .values()
                    .filter(|log| log.resend_email_id.as_deref() == Some(resend_email_id.as_str()))
                    .max_by_key(|log| (log.created_at, log.id))
                    .cloned())
            })
        }

        fn advance_email_log_status(
            &self,
            email_log_id: EmailLogId,
            status: EmailLogStatus,
        ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
            self.advance_calls.fetch_add(1, Ordering::SeqCst);
            let email_logs = self.email_logs.clone();
            Box::pin(async move {
                let mut logs = email_logs.write().await;
                match logs.get_mut(&email_log_id) {
                    Some(log) if log.status.can_advance_to(status) => {
                        log.status = status;
                        Ok(true)
                    },
                    _ => Ok(false),
                }
            })
        }

        fn find_events_by_resend_id(
            &self,
            resend_email_id: String,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<EmailEvent>>> + Send + '_>> {
            let events = self.events.clone();
            Box::pin(async move {
                Ok(events
                    .read()
                    .await
                    .iter()
                    .filter(|event| event.resend_email_id == resend_email_id)
                    .cloned()
                    .collect())
            })
        }

        fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            let healthy = self.healthy.clone();
            Box::pin(async move {
                if *healthy.read().await {
                    Ok(())
                } else {
                    Err(CoreError::Database("mock storage marked unhealthy".to_string()))
                }
            })
        }
    }
}
