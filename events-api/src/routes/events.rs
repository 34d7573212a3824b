//! Event listing and creation.

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use shared::http::{error_response, json_response, parse_json_body, validation_response};
use shared::{CreateEventRequest, CreatedEvent, RangeQuery, Result};
use tracing::info;

use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_events).post(create_event))
}

/// GET /events?from=&to=&userId=
async fn list_events(
    State(state): State<AppState>,
    params: std::result::Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Response> {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return Ok(error_response(StatusCode::BAD_REQUEST, rejection.body_text())),
    };

    let query = match params.into_agenda_query() {
        Ok(query) => query,
        Err(errors) => return Ok(validation_response(&errors)),
    };

    let rows = state.store.list_agenda(&query).await?;
    Ok(json_response(StatusCode::OK, &rows))
}

/// POST /events
async fn create_event(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let request: CreateEventRequest = match parse_json_body(&body) {
        Ok(request) => request,
        Err(response) => return Ok(response),
    };

    let event = match request.into_new_event() {
        Ok(event) => event,
        Err(errors) => return Ok(validation_response(&errors)),
    };

    let event_id = state.store.create_event(&event).await?;
    info!(?event_id, calendar_id = %event.calendar_id, "Event created");

    Ok(json_response(StatusCode::CREATED, &CreatedEvent { event_id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{get, post_json, state, MockStore};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use shared::models::{EventStatus, EventVisibility};
    use shared::Record;
    use std::sync::Arc;
    use uuid::Uuid;

    const CALENDAR: &str = "7f1c1b9e-2a45-4f4b-9d59-2a1c7c3e0f11";
    const USER: &str = "0b6d8a52-5a0e-4a53-8f0e-3f4b7d2e9c01";

    fn agenda_row(title: &str, start: &str) -> Record {
        let value = json!({ "user_id": USER, "title": title, "start_utc": start });
        value.as_object().cloned().unwrap()
    }

    fn event_body() -> serde_json::Value {
        json!({
            "calendar_id": CALENDAR,
            "title": "Planning",
            "start_utc": "2024-03-01T09:00:00Z",
            "end_utc": "2024-03-01T10:00:00Z",
            "created_by": USER,
        })
    }

    #[tokio::test]
    async fn test_list_without_filters_returns_rows_in_store_order() {
        let store = Arc::new(MockStore {
            agenda: vec![
                agenda_row("Standup", "2024-03-01T09:00:00.000Z"),
                agenda_row("Retro", "2024-03-01T15:00:00.000Z"),
            ],
            ..MockStore::default()
        });
        let (status, body) = get(state(store.clone()), "/events").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["title"], json!("Standup"));
        assert_eq!(body[1]["title"], json!("Retro"));
        assert_eq!(store.last_query(), Some(shared::AgendaQuery::default()));
    }

    #[tokio::test]
    async fn test_from_only_leaves_upper_bound_open() {
        let store = Arc::new(MockStore::default());
        let (status, _) = get(state(store.clone()), "/events?from=2024-01-01T00:00:00Z").await;

        assert_eq!(status, StatusCode::OK);
        let query = store.last_query().unwrap();
        assert_eq!(query.from, Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(query.to, None);
        assert_eq!(query.user_id, None);
    }

    #[tokio::test]
    async fn test_user_filter_is_parsed() {
        let store = Arc::new(MockStore::default());
        let uri = format!("/events?userId={}", USER);
        let (status, body) = get(state(store.clone()), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
        assert_eq!(store.last_query().unwrap().user_id, Some(Uuid::parse_str(USER).unwrap()));
    }

    #[tokio::test]
    async fn test_malformed_query_is_rejected_without_database_access() {
        for uri in [
            "/events?from=tomorrow",
            "/events?to=2024-01-01",
            "/events?userId=alice",
            "/events?from=2024-01-01T00:00:00%2B01:00",
        ] {
            let store = Arc::new(MockStore::default());
            let (status, body) = get(state(store.clone()), uri).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["error"], json!("Validation failed"));
            assert_eq!(store.calls().queries(), 0, "{}", uri);
            assert_eq!(store.calls().tenant, 0, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_list_database_error() {
        let store = Arc::new(MockStore {
            fail_db: true,
            ..MockStore::default()
        });
        let (status, body) = get(state(store), "/events").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to connect to db01:1433" }));
    }

    #[tokio::test]
    async fn test_create_applies_defaults_before_database_call() {
        let event_id = Uuid::new_v4();
        let store = Arc::new(MockStore {
            created_id: Some(event_id),
            ..MockStore::default()
        });
        let (status, body) = post_json(state(store.clone()), "/events", &event_body().to_string()).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({ "event_id": event_id.to_string() }));

        let event = store.last_event().unwrap();
        assert_eq!(event.status, EventStatus::Confirmed);
        assert_eq!(event.visibility, EventVisibility::Private);
        assert!(!event.all_day);
        assert!(event.participants.is_empty());
        assert!(event.reminders.is_empty());
    }

    #[tokio::test]
    async fn test_create_passes_participants_and_reminders() {
        let store = Arc::new(MockStore::default());
        let mut body = event_body();
        body["participants"] = json!([USER]);
        body["reminders"] = json!([{ "minutes_before": 30, "channel": "sms" }]);
        body["status"] = json!("tentative");

        let (status, response) = post_json(state(store.clone()), "/events", &body.to_string()).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response, json!({ "event_id": null }));

        let event = store.last_event().unwrap();
        assert_eq!(event.status, EventStatus::Tentative);
        assert_eq!(event.participants.len(), 1);
        assert_eq!(event.reminders[0].minutes_before, 30);
    }

    #[tokio::test]
    async fn test_invalid_body_is_rejected_without_database_access() {
        let mut bad_status = event_body();
        bad_status["visibility"] = json!("secret");

        for body in [
            String::new(),
            "{".to_string(),
            json!({ "title": "No calendar" }).to_string(),
            bad_status.to_string(),
        ] {
            let store = Arc::new(MockStore::default());
            let (status, response) = post_json(state(store.clone()), "/events", &body).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
            assert!(response["error"].is_string());
            assert_eq!(store.calls().queries(), 0, "{}", body);
        }
    }

    #[tokio::test]
    async fn test_wrong_field_types_are_listed_with_other_violations() {
        let store = Arc::new(MockStore::default());
        let body = json!({ "title": 5, "start_utc": "x" }).to_string();
        let (status, response) = post_json(state(store.clone()), "/events", &body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], json!("Validation failed"));
        for field in ["title", "start_utc", "calendar_id", "end_utc", "created_by"] {
            assert!(response["fields"].get(field).is_some(), "missing {}", field);
        }
        assert_eq!(store.calls().queries(), 0);
    }

    #[tokio::test]
    async fn test_create_database_error() {
        let store = Arc::new(MockStore {
            fail_db: true,
            ..MockStore::default()
        });
        let (status, body) = post_json(state(store), "/events", &event_body().to_string()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
    }
}
