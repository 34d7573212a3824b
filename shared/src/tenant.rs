//! Tenant context propagation for row-level security.

use tracing::debug;

use crate::store::CalendarStore;

/// Outcome of propagating the tenant id into the database session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantContext {
    /// No tenant id configured; nothing was sent.
    Skipped,
    /// The session context was set.
    Applied,
    /// The call failed, typically because RLS is not set up on the server.
    Failed(String),
}

impl TenantContext {
    pub fn is_failed(&self) -> bool {
        matches!(self, TenantContext::Failed(_))
    }
}

/// Set the tenant id on the database session.
///
/// Never returns an error: failures are reported as
/// [`TenantContext::Failed`] and the caller decides whether to proceed.
pub async fn apply_tenant_context(
    store: &dyn CalendarStore,
    tenant_id: Option<&str>,
) -> TenantContext {
    let Some(tenant_id) = tenant_id.filter(|id| !id.is_empty()) else {
        return TenantContext::Skipped;
    };

    match store.set_tenant_context(tenant_id).await {
        Ok(()) => TenantContext::Applied,
        Err(e) => {
            debug!(tenant_id, error = %e, "Tenant context not applied");
            TenantContext::Failed(e.to_string())
        }
    }
}
