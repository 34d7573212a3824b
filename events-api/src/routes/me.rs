//! Per-user endpoints.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use shared::http::{error_response, json_response};
use shared::validators::parse_uuid;
use shared::{Error, Result};

use crate::AppState;

#[derive(Debug, Deserialize)]
struct NextEventParams {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/next-event", get(next_event))
}

/// GET /me/next-event?userId=
///
/// Responds with the next row of `app.fn_next_event`, or `null`.
async fn next_event(
    State(state): State<AppState>,
    params: std::result::Result<Query<NextEventParams>, QueryRejection>,
) -> Result<Response> {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return Ok(error_response(StatusCode::BAD_REQUEST, rejection.body_text())),
    };
    let user_id = params
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::BadRequest("userId is required".to_string()))?;
    let user_id = parse_uuid(&user_id)
        .ok_or_else(|| Error::BadRequest("userId must be a UUID".to_string()))?;

    let event = state.store.next_event(user_id).await?;
    Ok(json_response(StatusCode::OK, &event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{get, state, MockStore};
    use serde_json::json;
    use std::sync::Arc;
    use uuid::Uuid;

    const USER: &str = "0b6d8a52-5a0e-4a53-8f0e-3f4b7d2e9c01";

    #[tokio::test]
    async fn test_missing_user_id() {
        for uri in ["/me/next-event", "/me/next-event?userId="] {
            let store = Arc::new(MockStore::default());
            let (status, body) = get(state(store.clone()), uri).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({ "error": "userId is required" }));
            assert_eq!(store.calls().queries(), 0);
        }
    }

    #[tokio::test]
    async fn test_malformed_user_id() {
        let store = Arc::new(MockStore::default());
        let (status, _) = get(state(store.clone()), "/me/next-event?userId=alice").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(store.calls().queries(), 0);
    }

    #[tokio::test]
    async fn test_repeated_user_id_is_json_error() {
        let store = Arc::new(MockStore::default());
        let uri = format!("/me/next-event?userId={}&userId={}", USER, USER);
        let (status, body) = get(state(store.clone()), &uri).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert_eq!(store.calls().queries(), 0);
    }

    #[tokio::test]
    async fn test_no_upcoming_event_is_null() {
        let store = Arc::new(MockStore::default());
        let uri = format!("/me/next-event?userId={}", USER);
        let (status, body) = get(state(store.clone()), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::Value::Null);
        assert_eq!(store.last_user(), Some(Uuid::parse_str(USER).unwrap()));
    }

    #[tokio::test]
    async fn test_next_event_row() {
        let row = json!({ "event_id": Uuid::nil().to_string(), "title": "1:1" });
        let store = Arc::new(MockStore {
            next: row.as_object().cloned(),
            ..MockStore::default()
        });
        let uri = format!("/me/next-event?userId={}", USER);
        let (status, body) = get(state(store), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, row);
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (status, body) = get(state(Arc::new(MockStore::default())), "/calendars").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Not found" }));
    }
}
