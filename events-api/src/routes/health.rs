//! Health check endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde_json::json;
use shared::http::json_response;
use tracing::error;

use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

/// Run `SELECT 1` against the database.
async fn healthz(State(state): State<AppState>) -> Response {
    match state.store.ping().await {
        Ok(()) => json_response(StatusCode::OK, &json!({ "ok": true })),
        Err(e) => {
            error!(error = %e, "Health check database error");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "ok": false, "error": e.to_string() }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{get, state, MockStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_healthy() {
        let store = Arc::new(MockStore::default());
        let (status, body) = get(state(store.clone()), "/healthz").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
        assert_eq!(store.calls().ping, 1);
    }

    #[tokio::test]
    async fn test_unreachable_database() {
        let store = Arc::new(MockStore {
            fail_db: true,
            ..MockStore::default()
        });
        let (status, body) = get(state(store), "/healthz").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["ok"], json!(false));
        assert_eq!(body["error"], json!("Failed to connect to db01:1433"));
    }
}
