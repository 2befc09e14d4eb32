//! Provider webhook ingestion.
//!
//! Checks size and signature, parses the envelope and hands it to the
//! dispatcher. Anything the provider should not redeliver is answered with
//! a 2xx; persistence failures get a 5xx so the provider retries.

use axum::{
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use encore_core::{error::EncoreError, models::EmailEventId};
use encore_webhooks::{DispatchOutcome, ResendWebhook};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    crypto::{validate_signature, SignedHeaders},
    server::AppState,
};

/// Successful webhook acknowledgement.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WebhookResponse {
    /// One event record was created.
    Processed {
        /// Id of the new record
        event_id: EmailEventId,
        /// Stored event tag
        event_type: String,
    },
    /// Nothing was recorded; the provider must not retry.
    Ignored {
        /// Human-readable cause
        reason: String,
    },
}

/// Error response with code and message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details including code and message
    pub error: ErrorDetail,
}

/// Detailed error information.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code (E1001-E1003, E9999)
    pub code: String,
    /// Human-readable error description
    pub message: String,
}

/// Ingests one provider webhook.
///
/// # Errors
///
/// Answers with:
/// - 400: invalid signature or malformed payload
/// - 413: body larger than `max_payload_bytes`
/// - 500: storage failure (the provider redelivers)
#[instrument(
    name = "ingest_resend_webhook",
    skip(state, headers, body),
    fields(
        svix_id = headers.get("svix-id").and_then(|v| v.to_str().ok()).unwrap_or("none"),
    )
)]
pub async fn ingest_resend_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            let limit_bytes = state.settings.max_payload_bytes;
            let size_bytes = declared_length(&headers).unwrap_or(limit_bytes.saturating_add(1));
            warn!(payload_size = size_bytes, limit = limit_bytes, "Payload exceeds size limit");
            return error_response(&EncoreError::PayloadTooLarge { size_bytes, limit_bytes });
        },
        Err(rejection) => {
            warn!(error = %rejection, "Failed to read webhook body");
            return error_response(&EncoreError::MalformedPayload(rejection.body_text()));
        },
    };

    if let Some(secret) = state.settings.signing_secret.as_deref() {
        if let Err(e) = check_signature(&state, &headers, &body, secret) {
            warn!(error = %e, "Webhook signature validation failed");
            return error_response(&e);
        }
        debug!("Webhook signature verified");
    }

    let webhook = match ResendWebhook::from_slice(&body) {
        Ok(webhook) => webhook,
        Err(e) => {
            warn!(error = %e, "Rejecting malformed webhook payload");
            return error_response(&e);
        },
    };

    match state.dispatcher.ingest(webhook).await {
        Ok(DispatchOutcome::Processed(event)) => {
            info!(event_id = %event.id, event_type = %event.event_type, "Webhook processed");
            (
                StatusCode::OK,
                Json(WebhookResponse::Processed {
                    event_id: event.id,
                    event_type: event.event_type.to_string(),
                }),
            )
                .into_response()
        },
        Ok(DispatchOutcome::Ignored(reason)) => {
            debug!(%reason, "Webhook acknowledged without recording");
            (StatusCode::OK, Json(WebhookResponse::Ignored { reason: reason.to_string() }))
                .into_response()
        },
        Err(e) => {
            error!(error = %e, "Failed to record email event");
            error_response(&EncoreError::from(e))
        },
    }
}

fn check_signature(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
    secret: &str,
) -> Result<(), EncoreError> {
    let signed = SignedHeaders::from_headers(headers)
        .map_err(|e| EncoreError::InvalidSignature { reason: e.to_string() })?;

    let result = validate_signature(
        body,
        &signed,
        secret,
        state.clock.now_utc().timestamp(),
        state.settings.signature_tolerance.as_secs(),
    );

    if result.is_valid {
        Ok(())
    } else {
        Err(EncoreError::InvalidSignature {
            reason: result.error_message.unwrap_or_else(|| "signature mismatch".to_string()),
        })
    }
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers.get("content-length").and_then(|v| v.to_str().ok()).and_then(|v| v.parse().ok())
}

/// HTTP status for an error kind.
fn status_for(error: &EncoreError) -> StatusCode {
    match error {
        EncoreError::InvalidSignature { .. } | EncoreError::MalformedPayload(_) => {
            StatusCode::BAD_REQUEST
        },
        EncoreError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        EncoreError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Creates a standardized error response.
fn error_response(error: &EncoreError) -> Response {
    let error_response = ErrorResponse {
        error: ErrorDetail { code: error.code().to_string(), message: error.to_string() },
    };

    (status_for(error), Json(error_response)).into_response()
}

#[cfg(test)]
mod tests {
    use encore_core::error::CoreError;

    use super::*;

    #[test]
    fn error_response_includes_code() {
        let error = EncoreError::PayloadTooLarge { size_bytes: 2048, limit_bytes: 1024 };
        let response = error_response(&error);

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn client_errors_map_to_400() {
        assert_eq!(
            status_for(&EncoreError::InvalidSignature { reason: "x".into() }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&EncoreError::MalformedPayload("x".into())), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_errors_map_to_500() {
        let error = EncoreError::from(CoreError::Database("connection reset".into()));

        assert_eq!(status_for(&error), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.code(), "E9999");
    }

    #[test]
    fn declared_length_reads_content_length() {
        let mut headers = HeaderMap::new();
        assert_eq!(declared_length(&headers), None);

        headers.insert("content-length", "4096".parse().unwrap());
        assert_eq!(declared_length(&headers), Some(4096));
    }

    #[test]
    fn responses_serialize_with_status_tag() {
        let processed = WebhookResponse::Processed {
            event_id: EmailEventId(5),
            event_type: "delayed".to_string(),
        };
        let ignored = WebhookResponse::Ignored { reason: "unhandled event type x".to_string() };

        assert_eq!(
            serde_json::to_value(&processed).unwrap(),
            serde_json::json!({"status": "processed", "event_id": 5, "event_type": "delayed"})
        );
        assert_eq!(
            serde_json::to_value(&ignored).unwrap(),
            serde_json::json!({"status": "ignored", "reason": "unhandled event type x"})
        );
    }
}
