//! Form completion endpoint.
//!
//! The form backend posts here after a user submitted the form. The raw body
//! is signed with the shared secret and the signature travels in the
//! `X-Signature-256` header. Only a verified completion marks the user as
//! converted.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

use super::AppState;
use crate::signing::{SignatureHeaderError, parse_signature_header};
use crate::types::UserId;

/// Header carrying `sha256=<hex>` of the raw body.
pub const HEADER_SIGNATURE: &str = "x-signature-256";

/// Errors that can occur when processing a completion.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("missing signature header")]
    MissingSignature,

    #[error("bad signature header: {0}")]
    BadSignatureHeader(#[from] SignatureHeaderError),

    #[error("bad signature")]
    SignatureMismatch,

    #[error("bad json: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("missing or invalid user id")]
    MissingUserId,

    /// Only one of `ts`/`sig` present, or `ts` not a number.
    #[error("malformed tracking token")]
    MalformedToken,

    #[error("tracking token rejected")]
    TokenRejected,
}

impl CompletionError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::SignatureMismatch | Self::TokenRejected => StatusCode::FORBIDDEN,
            Self::MissingSignature
            | Self::BadSignatureHeader(_)
            | Self::InvalidJson(_)
            | Self::MissingUserId
            | Self::MalformedToken => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for CompletionError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "ok": false, "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

/// Completion handler.
///
/// Checks run in order, and any failure leaves all state untouched:
///
/// 1. `X-Signature-256` parses as `sha256=<hex>` (400 otherwise)
/// 2. the digest matches the raw body (403 otherwise)
/// 3. the body is JSON with a user id in `chat_id` or `c` (400 otherwise)
/// 4. if `ts`/`sig` are present, they form a valid tracking token for that
///    user (403 otherwise, 400 if malformed)
///
/// On success the user is marked as converted, their reminders are cancelled
/// and the confirmation is sent. Delivery problems do not change the response.
///
/// ```ignore
/// POST /submitted HTTP/1.1
/// X-Signature-256: sha256=...
/// Content-Type: application/json
///
/// {"chat_id": 42}
///
/// HTTP/1.1 200 OK
/// {"ok":true}
/// ```
pub async fn completion_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, CompletionError> {
    let header = headers
        .get(HEADER_SIGNATURE)
        .and_then(|v| v.to_str().ok())
        .ok_or(CompletionError::MissingSignature)?;
    let digest = parse_signature_header(header)?;

    let funnel = app_state.funnel();
    if !funnel.signer().verify_body(&body, &digest) {
        warn!(bytes = body.len(), "Completion with invalid body signature");
        return Err(CompletionError::SignatureMismatch);
    }

    let payload: Value = serde_json::from_slice(&body)?;
    let user_id = extract_user_id(&payload).ok_or(CompletionError::MissingUserId)?;

    if let Some((issued_at, signature)) = extract_token(&payload)? {
        if !funnel.signer().verify(user_id, issued_at, &signature) {
            warn!(user_id = %user_id, issued_at, "Completion with rejected tracking token");
            return Err(CompletionError::TokenRejected);
        }
    }

    let outcome = funnel.complete(user_id).await;
    info!(
        user_id = %user_id,
        newly_submitted = outcome.newly_submitted,
        confirmed = outcome.confirmation.is_delivered(),
        "Completion accepted"
    );

    Ok(Json(json!({ "ok": true })))
}

/// Reads the user id from `chat_id`, or from `c` when `chat_id` is absent.
///
/// Accepts a JSON integer or a string holding one. A `chat_id` that is present
/// but not numeric is an error, not a reason to look at `c`.
fn extract_user_id(payload: &Value) -> Option<UserId> {
    let field = payload
        .get("chat_id")
        .filter(|v| !v.is_null())
        .or_else(|| payload.get("c"))?;
    as_i64(field).map(UserId)
}

/// Reads the optional `ts`/`sig` pair.
fn extract_token(payload: &Value) -> Result<Option<(i64, String)>, CompletionError> {
    let ts = payload.get("ts").filter(|v| !v.is_null());
    let sig = payload.get("sig").filter(|v| !v.is_null());

    match (ts, sig) {
        (None, None) => Ok(None),
        (Some(ts), Some(Value::String(sig))) => {
            let issued_at = as_i64(ts).ok_or(CompletionError::MalformedToken)?;
            Ok(Some((issued_at, sig.clone())))
        }
        _ => Err(CompletionError::MalformedToken),
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_user_id() {
        assert_eq!(extract_user_id(&json!({"chat_id": 42})), Some(UserId(42)));
        assert_eq!(extract_user_id(&json!({"c": "42"})), Some(UserId(42)));
        assert_eq!(extract_user_id(&json!({"chat_id": 1, "c": 2})), Some(UserId(1)));
        assert_eq!(extract_user_id(&json!({"chat_id": "abc"})), None);
        assert_eq!(extract_user_id(&json!({"chat_id": "abc", "c": 5})), None);
        assert_eq!(extract_user_id(&json!({"chat_id": null, "c": 5})), Some(UserId(5)));
        assert_eq!(extract_user_id(&json!({"chat_id": 4.5})), None);
        assert_eq!(extract_user_id(&json!({})), None);
        assert_eq!(extract_user_id(&json!([42])), None);
    }

    #[test]
    fn test_extract_token() {
        assert!(matches!(extract_token(&json!({"c": 1})), Ok(None)));
        assert!(matches!(
            extract_token(&json!({"ts": "100", "sig": "abc"})),
            Ok(Some((100, ref sig))) if sig == "abc"
        ));
        assert!(matches!(
            extract_token(&json!({"ts": 100})),
            Err(CompletionError::MalformedToken)
        ));
        assert!(matches!(
            extract_token(&json!({"ts": "soon", "sig": "abc"})),
            Err(CompletionError::MalformedToken)
        ));
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(CompletionError::MissingSignature.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            CompletionError::BadSignatureHeader(SignatureHeaderError::InvalidHex).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(CompletionError::SignatureMismatch.status(), StatusCode::FORBIDDEN);
        assert_eq!(CompletionError::MissingUserId.status(), StatusCode::BAD_REQUEST);
        assert_eq!(CompletionError::TokenRejected.status(), StatusCode::FORBIDDEN);
    }
}
