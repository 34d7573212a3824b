//! Calendar events HTTP API.
//!
//! Endpoints:
//! - GET /healthz - Database connectivity probe
//! - GET /events - List agenda entries, optionally filtered by user and time range
//! - POST /events - Create an event through `app.sp_create_event`
//! - GET /me/next-event - Next upcoming event for a user

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use axum::Router;
use shared::http::error_response;
use shared::{CalendarStore, Config, TenantPolicy};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod middleware;
pub mod routes;
pub mod shutdown;

#[cfg(test)]
mod testing;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CalendarStore>,
    pub tenant_id: Option<String>,
    pub tenant_policy: TenantPolicy,
}

impl AppState {
    pub fn new(store: Arc<dyn CalendarStore>, config: &Config) -> Self {
        Self {
            store,
            tenant_id: config.tenant_id.clone(),
            tenant_policy: config.tenant_policy,
        }
    }
}

/// Build the API router with CORS, request tracing and tenant context.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .nest("/events", routes::events::routes())
        .nest("/me", routes::me::routes())
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::tenant_context,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}
