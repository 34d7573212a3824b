//! Shared library for the calendar events API.
//!
//! This crate provides configuration, database access, validation and HTTP
//! helpers used by the API entry points.

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod rows;
pub mod store;
pub mod tenant;
pub mod validators;

pub use config::{Config, DbAuth, DbConfig, ServerAddress, TenantPolicy};
pub use db::ConnectionManager;
pub use error::{Error, Result};
pub use models::{AgendaQuery, CreatedEvent, NewEvent, Record};
pub use store::{CalendarStore, MssqlStore};
pub use tenant::{apply_tenant_context, TenantContext};
pub use validators::{CreateEventRequest, RangeQuery};
