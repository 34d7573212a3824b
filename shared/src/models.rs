//! Shared data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A result row rendered as a JSON object keyed by column name.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Event lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Tentative,
    #[default]
    Confirmed,
    Cancelled,
}

impl EventStatus {
    pub const ALL: [&'static str; 3] = ["tentative", "confirmed", "cancelled"];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Tentative => "tentative",
            EventStatus::Confirmed => "confirmed",
            EventStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tentative" => Some(EventStatus::Tentative),
            "confirmed" => Some(EventStatus::Confirmed),
            "cancelled" => Some(EventStatus::Cancelled),
            _ => None,
        }
    }
}

/// Who can see an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventVisibility {
    #[default]
    Private,
    Public,
    Busy,
}

impl EventVisibility {
    pub const ALL: [&'static str; 3] = ["private", "public", "busy"];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventVisibility::Private => "private",
            EventVisibility::Public => "public",
            EventVisibility::Busy => "busy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "private" => Some(EventVisibility::Private),
            "public" => Some(EventVisibility::Public),
            "busy" => Some(EventVisibility::Busy),
            _ => None,
        }
    }
}

/// Delivery channel for a reminder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderChannel {
    #[default]
    Push,
    Email,
    Sms,
}

impl ReminderChannel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "push" => Some(ReminderChannel::Push),
            "email" => Some(ReminderChannel::Email),
            "sms" => Some(ReminderChannel::Sms),
            _ => None,
        }
    }
}

/// A reminder attached to a new event, as passed to `app.sp_create_event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    pub minutes_before: u64,
    pub channel: ReminderChannel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub for_user_id: Option<Uuid>,
}

/// A validated event ready to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub calendar_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub all_day: bool,
    pub status: EventStatus,
    pub visibility: EventVisibility,
    pub created_by: Uuid,
    pub participants: Vec<Uuid>,
    pub reminders: Vec<Reminder>,
}

/// Filter for the agenda listing. `None` means no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgendaQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub user_id: Option<Uuid>,
}

/// Response body for a created event.
#[derive(Debug, Serialize)]
pub struct CreatedEvent {
    pub event_id: Option<Uuid>,
}
