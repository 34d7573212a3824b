//! Calendar persistence.
//!
//! [`CalendarStore`] is the seam between the HTTP handlers and the database.
//! All scheduling logic lives in database objects; this layer only binds
//! typed parameters and maps result rows.

use std::sync::Arc;

use async_trait::async_trait;
use tiberius::Query;
use tracing::debug;
use uuid::Uuid;

use crate::db::ConnectionManager;
use crate::models::{AgendaQuery, NewEvent, Record};
use crate::rows::row_to_record;
use crate::Result;

const AGENDA_SQL: &str = r#"
SELECT ua.user_id, e.*
FROM app.v_user_agenda ua
JOIN app.events e ON e.event_id = ua.event_id
WHERE (@P1 IS NULL OR ua.user_id = @P1)
  AND (@P2 IS NULL OR e.end_utc >= @P2)
  AND (@P3 IS NULL OR e.start_utc <= @P3)
ORDER BY e.start_utc ASC;
"#;

const CREATE_EVENT_SQL: &str = r#"
EXEC app.sp_create_event
    @calendar_id = @P1,
    @title = @P2,
    @description = @P3,
    @location = @P4,
    @start_utc = @P5,
    @end_utc = @P6,
    @all_day = @P7,
    @status = @P8,
    @visibility = @P9,
    @created_by = @P10,
    @participants_json = @P11,
    @reminders_json = @P12;
"#;

const NEXT_EVENT_SQL: &str = "SELECT * FROM app.fn_next_event(@P1);";

const SET_TENANT_SQL: &str = "EXEC sp_set_session_context @key = N'tenant_id', @value = @P1;";

/// Operations the API performs against the calendar database.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Trivial connectivity probe.
    async fn ping(&self) -> Result<()>;

    /// Store the tenant id in the session context used by row-level security.
    async fn set_tenant_context(&self, tenant_id: &str) -> Result<()>;

    /// Agenda rows matching the filter, earliest start first.
    async fn list_agenda(&self, query: &AgendaQuery) -> Result<Vec<Record>>;

    /// Create an event and return the id generated by the database.
    async fn create_event(&self, event: &NewEvent) -> Result<Option<Uuid>>;

    /// The next upcoming event for a user.
    async fn next_event(&self, user_id: Uuid) -> Result<Option<Record>>;
}

/// [`CalendarStore`] backed by SQL Server.
pub struct MssqlStore {
    connections: Arc<ConnectionManager>,
}

impl MssqlStore {
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }
}

#[async_trait]
impl CalendarStore for MssqlStore {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.connections.get_connection().await?;
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    async fn set_tenant_context(&self, tenant_id: &str) -> Result<()> {
        let mut conn = self.connections.get_connection().await?;

        let mut query = Query::new(SET_TENANT_SQL);
        query.bind(tenant_id.to_string());
        query.execute(&mut *conn).await?;
        Ok(())
    }

    async fn list_agenda(&self, filter: &AgendaQuery) -> Result<Vec<Record>> {
        let mut conn = self.connections.get_connection().await?;

        let mut query = Query::new(AGENDA_SQL);
        query.bind(filter.user_id);
        query.bind(filter.from.map(|dt| dt.naive_utc()));
        query.bind(filter.to.map(|dt| dt.naive_utc()));

        let rows = query.query(&mut *conn).await?.into_first_result().await?;
        debug!(rows = rows.len(), "Agenda query returned");

        rows.into_iter().map(row_to_record).collect()
    }

    async fn create_event(&self, event: &NewEvent) -> Result<Option<Uuid>> {
        let participants_json = serde_json::to_string(&event.participants)?;
        let reminders_json = serde_json::to_string(&event.reminders)?;

        let mut conn = self.connections.get_connection().await?;

        let mut query = Query::new(CREATE_EVENT_SQL);
        query.bind(event.calendar_id);
        query.bind(event.title.clone());
        query.bind(event.description.clone());
        query.bind(event.location.clone());
        query.bind(event.start_utc.naive_utc());
        query.bind(event.end_utc.naive_utc());
        query.bind(event.all_day);
        query.bind(event.status.as_str());
        query.bind(event.visibility.as_str());
        query.bind(event.created_by);
        query.bind(participants_json);
        query.bind(reminders_json);

        let row = query.query(&mut *conn).await?.into_row().await?;

        let event_id = match row {
            Some(row) => row_to_record(row)?
                .get("event_id")
                .and_then(|id| id.as_str())
                .and_then(|id| Uuid::parse_str(id).ok()),
            None => None,
        };
        debug!(?event_id, "Event created");

        Ok(event_id)
    }

    async fn next_event(&self, user_id: Uuid) -> Result<Option<Record>> {
        let mut conn = self.connections.get_connection().await?;

        let mut query = Query::new(NEXT_EVENT_SQL);
        query.bind(user_id);

        let row = query.query(&mut *conn).await?.into_row().await?;
        row.map(row_to_record).transpose()
    }
}
