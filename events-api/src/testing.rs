//! In-memory store and request helpers for handler tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use shared::{AgendaQuery, CalendarStore, Error, NewEvent, Record, Result, TenantPolicy};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{router, AppState};

#[derive(Debug, Default, Clone, Copy)]
pub struct Calls {
    pub ping: usize,
    pub tenant: usize,
    pub list: usize,
    pub create: usize,
    pub next: usize,
}

impl Calls {
    /// Calls made by route handlers, excluding tenant context.
    pub fn queries(&self) -> usize {
        self.ping + self.list + self.create + self.next
    }
}

#[derive(Default)]
pub struct MockStore {
    pub fail_tenant: bool,
    pub fail_db: bool,
    pub agenda: Vec<Record>,
    pub next: Option<Record>,
    pub created_id: Option<Uuid>,
    pub calls: Mutex<Calls>,
    pub last_tenant: Mutex<Option<String>>,
    pub last_query: Mutex<Option<AgendaQuery>>,
    pub last_event: Mutex<Option<NewEvent>>,
    pub last_user: Mutex<Option<Uuid>>,
}

impl MockStore {
    pub fn calls(&self) -> Calls {
        *self.calls.lock().unwrap()
    }

    pub fn last_tenant(&self) -> Option<String> {
        self.last_tenant.lock().unwrap().clone()
    }

    pub fn last_query(&self) -> Option<AgendaQuery> {
        self.last_query.lock().unwrap().clone()
    }

    pub fn last_event(&self) -> Option<NewEvent> {
        self.last_event.lock().unwrap().clone()
    }

    pub fn last_user(&self) -> Option<Uuid> {
        *self.last_user.lock().unwrap()
    }

    fn record(&self, f: impl FnOnce(&mut Calls)) -> Result<()> {
        f(&mut self.calls.lock().unwrap());
        if self.fail_db {
            Err(Error::Connection("Failed to connect to db01:1433".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CalendarStore for MockStore {
    async fn ping(&self) -> Result<()> {
        self.record(|c| c.ping += 1)
    }

    async fn set_tenant_context(&self, tenant_id: &str) -> Result<()> {
        self.calls.lock().unwrap().tenant += 1;
        *self.last_tenant.lock().unwrap() = Some(tenant_id.to_string());
        if self.fail_tenant {
            Err(Error::Connection(
                "Could not find stored procedure 'sp_set_session_context'.".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    async fn list_agenda(&self, query: &AgendaQuery) -> Result<Vec<Record>> {
        self.record(|c| c.list += 1)?;
        *self.last_query.lock().unwrap() = Some(query.clone());
        Ok(self.agenda.clone())
    }

    async fn create_event(&self, event: &NewEvent) -> Result<Option<Uuid>> {
        self.record(|c| c.create += 1)?;
        *self.last_event.lock().unwrap() = Some(event.clone());
        Ok(self.created_id)
    }

    async fn next_event(&self, user_id: Uuid) -> Result<Option<Record>> {
        self.record(|c| c.next += 1)?;
        *self.last_user.lock().unwrap() = Some(user_id);
        Ok(self.next.clone())
    }
}

pub fn state_with(store: Arc<MockStore>, tenant_id: Option<&str>, policy: TenantPolicy) -> AppState {
    AppState {
        store,
        tenant_id: tenant_id.map(str::to_string),
        tenant_policy: policy,
    }
}

pub fn state(store: Arc<MockStore>) -> AppState {
    state_with(store, None, TenantPolicy::BestEffort)
}

pub async fn get(state: AppState, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(state, request).await
}

pub async fn post_json(state: AppState, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(state, request).await
}

async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
