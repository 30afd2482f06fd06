//! HTTP gateway between the form site and the bot.
//!
//! # Endpoints
//!
//! - `GET /go` - redirects a tracking link click to the form (302 Found)
//! - `POST /submitted` - verified form completion from the form backend
//! - `POST /mark-submitted` - same as `/submitted`
//! - `GET /health` - returns 200 if the server is running

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

mod completion;
mod health;
mod redirect;

pub use completion::{CompletionError, HEADER_SIGNATURE, completion_handler};
pub use health::health_handler;
pub use redirect::{TrackingParams, redirect_handler};

use crate::funnel::Funnel;

/// Shared application state, passed to handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    funnel: Arc<Funnel>,
}

impl AppState {
    #[must_use]
    pub fn new(funnel: Arc<Funnel>) -> Self {
        Self { funnel }
    }

    #[must_use]
    pub fn funnel(&self) -> &Funnel {
        &self.funnel
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/go", get(redirect_handler))
        .route("/submitted", post(completion_handler))
        .route("/mark-submitted", post(completion_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::funnel::tests::{SECRET, funnel_with};
    use crate::scheduler::{JobState, ReminderSlot};
    use crate::signing::{LinkSigner, format_signature_header};
    use crate::test_utils::RecordingGateway;
    use crate::types::UserId;

    struct Harness {
        funnel: Arc<Funnel>,
        gateway: Arc<RecordingGateway>,
        router: Router,
    }

    fn harness() -> Harness {
        let gateway = Arc::new(RecordingGateway::new());
        let funnel = Arc::new(funnel_with(gateway.clone()));
        let router = build_router(AppState::new(funnel.clone()));
        Harness {
            funnel,
            gateway,
            router,
        }
    }

    fn sign(body: &[u8]) -> String {
        let signer = LinkSigner::new(secrecy::SecretString::from(SECRET.to_owned()));
        format_signature_header(&signer.sign_body(body))
    }

    fn completion(path: &str, body: &str, signature: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header(HEADER_SIGNATURE, signature);
        }
        builder.body(Body::from(body.to_owned())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn redirect_forwards_params_unchanged() {
        let h = harness();
        let request = Request::get("/go?c=42&ts=1000&sig=ab-_cd").body(Body::empty()).unwrap();

        let response = h.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://form.example.com/?c=42&ts=1000&sig=ab-_cd"
        );
        assert!(h.gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn redirect_forwards_missing_params_as_empty() {
        let h = harness();
        let request = Request::get("/go?c=7").body(Body::empty()).unwrap();

        let response = h.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://form.example.com/?c=7&ts=&sig="
        );
    }

    #[tokio::test]
    async fn redirect_takes_first_of_repeated_params() {
        let h = harness();
        let request = Request::get("/go?c=1&c=2&ts=5&sig=x").body(Body::empty()).unwrap();

        let response = h.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://form.example.com/?c=1&ts=5&sig=x"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn redirect_does_not_cancel_reminders() {
        let h = harness();
        h.funnel.start(UserId(42)).await;

        let request = Request::get("/go?c=42&ts=1&sig=x").body(Body::empty()).unwrap();
        h.router.oneshot(request).await.unwrap();

        assert_eq!(h.funnel.scheduler().pending_count(), 2);
        assert!(!h.funnel.tracker().is_submitted(UserId(42)));
    }

    #[tokio::test(start_paused = true)]
    async fn valid_completion_converts_user() {
        let h = harness();
        h.funnel.start(UserId(42)).await;
        let body = r#"{"chat_id":42}"#;

        let response = h
            .router
            .oneshot(completion("/submitted", body, Some(&sign(body.as_bytes()))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"ok": true}));
        assert!(h.funnel.tracker().is_submitted(UserId(42)));
        assert_eq!(
            h.funnel.scheduler().state(UserId(42), ReminderSlot::LongDelay),
            JobState::Cancelled
        );

        let sent = h.gateway.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[2].text, h.funnel.script().confirmation);
    }

    #[tokio::test]
    async fn alias_path_is_accepted() {
        let h = harness();
        let body = r#"{"c":"5"}"#;

        let response = h
            .router
            .oneshot(completion("/mark-submitted", body, Some(&sign(body.as_bytes()))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(h.funnel.tracker().is_submitted(UserId(5)));
    }

    #[tokio::test]
    async fn wrong_signature_is_forbidden() {
        let h = harness();
        let body = r#"{"chat_id":42}"#;
        let forged = sign(br#"{"chat_id":43}"#);

        let response = h
            .router
            .oneshot(completion("/submitted", body, Some(&forged)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["ok"], json!(false));
        assert!(!h.funnel.tracker().is_submitted(UserId(42)));
        assert_eq!(h.gateway.attempts(), 0);
    }

    #[tokio::test]
    async fn missing_or_garbled_header_is_bad_request() {
        for signature in [None, Some("nonsense"), Some("sha1=abcd"), Some("sha256=zz")] {
            let h = harness();
            let response = h
                .router
                .oneshot(completion("/submitted", r#"{"chat_id":1}"#, signature))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{signature:?}");
            assert!(h.funnel.tracker().is_empty());
        }
    }

    #[tokio::test]
    async fn signed_but_unusable_body_is_bad_request() {
        for body in [
            "not json",
            r#"{"chat_id":"abc"}"#,
            r#"{"chat_id":"abc","c":5}"#,
            r#"{"name":"x"}"#,
        ] {
            let h = harness();
            let response = h
                .router
                .oneshot(completion("/submitted", body, Some(&sign(body.as_bytes()))))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
            assert!(h.funnel.tracker().is_empty());
        }
    }

    #[tokio::test]
    async fn embedded_token_is_verified() {
        let h = harness();
        let token = h.funnel.signer().issue(UserId(42));

        let good = json!({"c": "42", "ts": token.issued_at.to_string(), "sig": token.signature.clone()})
            .to_string();
        let response = h
            .router
            .clone()
            .oneshot(completion("/submitted", &good, Some(&sign(good.as_bytes()))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let stolen = json!({"c": "43", "ts": token.issued_at, "sig": token.signature}).to_string();
        let response = h
            .router
            .oneshot(completion("/submitted", &stolen, Some(&sign(stolen.as_bytes()))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!h.funnel.tracker().is_submitted(UserId(43)));
    }

    #[tokio::test]
    async fn health_is_ok() {
        let h = harness();
        let response = h
            .router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
