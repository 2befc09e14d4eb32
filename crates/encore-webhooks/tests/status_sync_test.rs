//! Tests for the email log status sync subscriber.

use std::sync::Arc;

use encore_core::models::{ContactId, EmailLogId, EmailLogStatus};
use encore_webhooks::{
    storage::mock::MockEmailEventStorage, Dispatcher, EventProcessor, ResendWebhook, StatusSync,
};
use serde_json::json;

fn dispatcher_with_sync(storage: &Arc<MockEmailEventStorage>) -> Dispatcher {
    let processor = EventProcessor::new(storage.clone())
        .with_subscriber(Arc::new(StatusSync::new(storage.clone())));
    Dispatcher::new(processor)
}

async fn deliver(dispatcher: &Dispatcher, event_type: &str) {
    let body = json!({"type": event_type, "data": {"email_id": "re_1"}});
    let webhook = ResendWebhook::from_slice(body.to_string().as_bytes()).unwrap();
    dispatcher.ingest(webhook).await.unwrap();
}

#[tokio::test]
async fn status_follows_lifecycle() {
    let storage = Arc::new(MockEmailEventStorage::new());
    storage.add_sent_email(EmailLogId(42), ContactId(7), "t9", "re_1").await;
    let dispatcher = dispatcher_with_sync(&storage);

    deliver(&dispatcher, "email.delivered").await;
    assert_eq!(storage.email_log_status(EmailLogId(42)).await, Some(EmailLogStatus::Delivered));

    deliver(&dispatcher, "email.opened").await;
    assert_eq!(storage.email_log_status(EmailLogId(42)).await, Some(EmailLogStatus::Opened));

    deliver(&dispatcher, "email.clicked").await;
    assert_eq!(storage.email_log_status(EmailLogId(42)).await, Some(EmailLogStatus::Clicked));
}

#[tokio::test]
async fn late_event_is_recorded_but_does_not_regress_status() {
    let storage = Arc::new(MockEmailEventStorage::new());
    storage.add_sent_email(EmailLogId(42), ContactId(7), "t9", "re_1").await;
    let dispatcher = dispatcher_with_sync(&storage);

    deliver(&dispatcher, "email.clicked").await;
    deliver(&dispatcher, "email.delivered").await;

    assert_eq!(storage.email_log_status(EmailLogId(42)).await, Some(EmailLogStatus::Clicked));
    assert_eq!(storage.create_count().await, 2);
}

#[tokio::test]
async fn delayed_leaves_status_untouched() {
    let storage = Arc::new(MockEmailEventStorage::new());
    storage.add_sent_email(EmailLogId(42), ContactId(7), "t9", "re_1").await;
    let dispatcher = dispatcher_with_sync(&storage);

    deliver(&dispatcher, "email.delivery_delayed").await;

    assert_eq!(storage.email_log_status(EmailLogId(42)).await, Some(EmailLogStatus::Sent));
    assert_eq!(storage.create_count().await, 1);
}

#[tokio::test]
async fn bounce_is_terminal() {
    let storage = Arc::new(MockEmailEventStorage::new());
    storage.add_sent_email(EmailLogId(42), ContactId(7), "t9", "re_1").await;
    let dispatcher = dispatcher_with_sync(&storage);

    deliver(&dispatcher, "email.bounced").await;
    deliver(&dispatcher, "email.opened").await;

    assert_eq!(storage.email_log_status(EmailLogId(42)).await, Some(EmailLogStatus::Bounced));
}

#[tokio::test]
async fn sent_on_fresh_log_does_not_attempt_a_status_change() {
    let storage = Arc::new(MockEmailEventStorage::new());
    storage.add_sent_email(EmailLogId(42), ContactId(7), "t9", "re_1").await;
    let dispatcher = dispatcher_with_sync(&storage);

    deliver(&dispatcher, "email.sent").await;

    assert_eq!(storage.create_count().await, 1);
    assert_eq!(storage.advance_count(), 0);
    assert_eq!(storage.email_log_status(EmailLogId(42)).await, Some(EmailLogStatus::Sent));

    deliver(&dispatcher, "email.delivered").await;
    assert_eq!(storage.advance_count(), 1);
    assert_eq!(storage.email_log_status(EmailLogId(42)).await, Some(EmailLogStatus::Delivered));
}
