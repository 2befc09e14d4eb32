//! Property-based tests for extraction and dispatch invariants.
//!
//! Uses deterministic, in-memory testing without external dependencies.

use std::sync::Arc;

use encore_core::models::{ContactId, EmailEventType, EmailLogId, WebhookEventData};
use encore_webhooks::{
    storage::mock::MockEmailEventStorage, DispatchOutcome, Dispatcher, EventData, EventProcessor,
};
use proptest::{prelude::*, test_runner::Config as ProptestConfig};
use serde_json::{json, Value};

fn proptest_config() -> ProptestConfig {
    ProptestConfig { cases: 64, failure_persistence: None, ..ProptestConfig::default() }
}

fn event_type_strategy() -> impl Strategy<Value = EmailEventType> {
    prop::sample::select(EmailEventType::ALL.to_vec())
}

/// Arbitrary JSON up to a small depth, including the keys extraction reads.
fn json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 @.:/_-]{0,24}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(
                prop::sample::select(vec![
                    "email_id", "reason", "click", "link", "timestamp", "bounce", "type",
                    "message", "from", "to", "subject", "other",
                ])
                .prop_map(str::to_string),
                inner,
                0..6,
            )
            .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().build().expect("runtime")
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn extraction_never_fails_and_is_an_object(event_type in event_type_strategy(), data in json_strategy()) {
        let extract = EventData::extract(event_type, &data);

        prop_assert_eq!(extract.event_type(), event_type);
        prop_assert!(extract.to_json().is_object());
    }

    #[test]
    fn every_dispatch_inserts_once_with_matching_tag(
        event_type in event_type_strategy(),
        data in json_strategy(),
        email_id in "re_[a-z0-9]{1,12}",
        log_id in 1i64..1_000_000,
    ) {
        let storage = Arc::new(MockEmailEventStorage::new());
        let dispatcher = Dispatcher::new(EventProcessor::new(storage.clone()));
        let input = WebhookEventData {
            email_id: email_id.clone(),
            email_log_id: EmailLogId(log_id),
            contact_id: ContactId(log_id + 1),
            track_id: "track".to_string(),
            data,
        };

        let (outcome, created) = runtime().block_on(async {
            let outcome = dispatcher.dispatch(event_type.provider_type(), input).await;
            (outcome, storage.created_events().await)
        });

        prop_assert!(matches!(outcome, Ok(DispatchOutcome::Processed(_))));
        prop_assert_eq!(created.len(), 1);
        prop_assert_eq!(created[0].event_type, event_type);
        prop_assert_eq!(&created[0].resend_email_id, &email_id);
        prop_assert_eq!(created[0].email_log_id, EmailLogId(log_id));
    }

    #[test]
    fn unknown_types_never_insert(suffix in "[a-z_]{1,16}") {
        let event_type = format!("x.{suffix}");
        let storage = Arc::new(MockEmailEventStorage::new());
        let dispatcher = Dispatcher::new(EventProcessor::new(storage.clone()));
        let input = WebhookEventData {
            email_id: "re_1".to_string(),
            email_log_id: EmailLogId(1),
            contact_id: ContactId(1),
            track_id: "track".to_string(),
            data: Value::Null,
        };

        let (outcome, count) = runtime().block_on(async {
            let outcome = dispatcher.dispatch(&event_type, input).await;
            (outcome, storage.create_count().await)
        });

        prop_assert!(matches!(outcome, Ok(DispatchOutcome::Ignored(_))));
        prop_assert_eq!(count, 0);
    }
}
