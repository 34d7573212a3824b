//! Request middleware.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use shared::http::error_response;
use shared::{apply_tenant_context, TenantContext, TenantPolicy};
use tracing::warn;

use crate::AppState;

/// Propagate the configured tenant id into the database session before the
/// request is handled.
///
/// A failure only stops the request under [`TenantPolicy::Required`].
pub async fn tenant_context(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let outcome = apply_tenant_context(state.store.as_ref(), state.tenant_id.as_deref()).await;

    match (outcome, state.tenant_policy) {
        (TenantContext::Failed(message), TenantPolicy::Required) => {
            warn!(error = %message, "Rejecting request without tenant context");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
        _ => next.run(req).await,
    }
}
