//! Tracking link redirect.

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use tracing::debug;

use super::AppState;
use crate::signing::append_query;

/// Query of a tracking link. Missing fields are forwarded as empty strings.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TrackingParams {
    pub c: String,
    pub ts: String,
    pub sig: String,
}

impl TrackingParams {
    /// Picks `c`, `ts` and `sig` out of decoded query pairs.
    ///
    /// A repeated key keeps its first value. Unknown keys are ignored.
    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let first = |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
                .unwrap_or_default()
        };

        Self {
            c: first("c"),
            ts: first("ts"),
            sig: first("sig"),
        }
    }
}

/// Redirects a tracking link click to the destination site.
///
/// The `c`, `ts` and `sig` parameters are passed through untouched. Nothing is
/// verified and no state changes; only a completion stops the reminders.
///
/// ```ignore
/// GET /go?c=42&ts=1700000000&sig=abc HTTP/1.1
///
/// HTTP/1.1 302 Found
/// Location: https://form.example.com/?c=42&ts=1700000000&sig=abc
/// ```
pub async fn redirect_handler(
    State(app_state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    let params = TrackingParams::from_pairs(&pairs);
    let destination = append_query(
        app_state.funnel().links().site_url(),
        &[
            ("c", params.c.as_str()),
            ("ts", params.ts.as_str()),
            ("sig", params.sig.as_str()),
        ],
    );

    debug!(c = %params.c, "Tracking link clicked");

    (StatusCode::FOUND, [(header::LOCATION, destination.to_string())])
}
