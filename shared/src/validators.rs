//! Request validation.
//!
//! Requests are deserialized into loosely typed structs first so that every
//! violated field can be reported in one response, then converted into the
//! typed models once they pass.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::{AgendaQuery, EventStatus, EventVisibility, NewEvent, Reminder, ReminderChannel};

/// Query string accepted by `GET /events`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RangeQuery {
    #[validate(custom(function = "validate_timestamp"))]
    pub from: Option<String>,
    #[validate(custom(function = "validate_timestamp"))]
    pub to: Option<String>,
    #[serde(rename = "userId")]
    #[validate(custom(function = "validate_uuid"))]
    pub user_id: Option<String>,
}

impl RangeQuery {
    /// Validate and convert into an agenda filter.
    ///
    /// `from <= to` is deliberately not checked.
    pub fn into_agenda_query(self) -> Result<AgendaQuery, ValidationErrors> {
        self.validate()?;

        Ok(AgendaQuery {
            from: self
                .from
                .as_deref()
                .map(|s| typed("from", s, parse_timestamp))
                .transpose()?,
            to: self
                .to
                .as_deref()
                .map(|s| typed("to", s, parse_timestamp))
                .transpose()?,
            user_id: self
                .user_id
                .as_deref()
                .map(|s| typed("userId", s, parse_uuid))
                .transpose()?,
        })
    }
}

/// Body accepted by `POST /events`.
///
/// Fields hold raw JSON so that a value of the wrong type, or an explicit
/// `null`, is reported as a field error alongside every other violation.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[serde(default, deserialize_with = "present")]
    #[validate(required, custom(function = "validate_uuid_value"))]
    pub calendar_id: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[validate(required, custom(function = "validate_title"))]
    pub title: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[validate(custom(function = "validate_text"))]
    pub description: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[validate(custom(function = "validate_text"))]
    pub location: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[validate(required, custom(function = "validate_timestamp_value"))]
    pub start_utc: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[validate(required, custom(function = "validate_timestamp_value"))]
    pub end_utc: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[validate(custom(function = "validate_bool"))]
    pub all_day: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[validate(custom(function = "validate_status"))]
    pub status: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[validate(custom(function = "validate_visibility"))]
    pub visibility: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[validate(required, custom(function = "validate_uuid_value"))]
    pub created_by: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[validate(custom(function = "validate_uuid_list"))]
    pub participants: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[validate(custom(function = "validate_reminders"))]
    pub reminders: Option<Value>,
}

impl CreateEventRequest {
    /// Validate and convert into a new event with defaults applied.
    ///
    /// `start_utc <= end_utc` is deliberately not checked.
    pub fn into_new_event(self) -> Result<NewEvent, ValidationErrors> {
        self.validate()?;

        Ok(NewEvent {
            calendar_id: required_field("calendar_id", self.calendar_id, json_uuid)?,
            title: required_field("title", self.title, json_text)?,
            description: optional("description", self.description, json_text)?,
            location: optional("location", self.location, json_text)?,
            start_utc: required_field("start_utc", self.start_utc, json_timestamp)?,
            end_utc: required_field("end_utc", self.end_utc, json_timestamp)?,
            all_day: optional("all_day", self.all_day, Value::as_bool)?.unwrap_or(false),
            status: optional("status", self.status, |v| v.as_str().and_then(EventStatus::parse))?
                .unwrap_or_default(),
            visibility: optional("visibility", self.visibility, |v| {
                v.as_str().and_then(EventVisibility::parse)
            })?
            .unwrap_or_default(),
            created_by: required_field("created_by", self.created_by, json_uuid)?,
            participants: optional("participants", self.participants, |v| {
                v.as_array()?.iter().map(json_uuid).collect::<Option<Vec<_>>>()
            })?
            .unwrap_or_default(),
            reminders: optional("reminders", self.reminders, |v| {
                v.as_array()?
                    .iter()
                    .map(|r| reminder(r).ok())
                    .collect::<Option<Vec<_>>>()
            })?
            .unwrap_or_default(),
        })
    }
}

/// Keeps an explicit `null` distinct from an absent field.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Convert one `reminders` entry, applying the channel default.
fn reminder(entry: &Value) -> Result<Reminder, &'static str> {
    let entry = entry.as_object().ok_or("must be an object")?;

    let minutes_before = entry
        .get("minutes_before")
        .ok_or("minutes_before is required")?;
    let minutes_before =
        whole_minutes(minutes_before).ok_or("minutes_before must be a non-negative integer")?;

    let channel = match entry.get("channel") {
        None => ReminderChannel::default(),
        Some(channel) => channel
            .as_str()
            .and_then(ReminderChannel::parse)
            .ok_or("channel must be one of push, email, sms")?,
    };

    let for_user_id = entry
        .get("for_user_id")
        .map(|id| json_uuid(id).ok_or("for_user_id must be a UUID"))
        .transpose()?;

    Ok(Reminder {
        minutes_before,
        channel,
        for_user_id,
    })
}

/// Non-negative integers, including integral floats such as `5.0`.
fn whole_minutes(value: &Value) -> Option<u64> {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|m| m.fract() == 0.0 && (0.0..=MAX_SAFE_INTEGER).contains(m))
            .map(|m| m as u64)
    })
}

fn json_text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn json_uuid(value: &Value) -> Option<Uuid> {
    value.as_str().and_then(parse_uuid)
}

fn json_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value.as_str().and_then(parse_timestamp)
}

/// Parse an ISO-8601 UTC timestamp of the form `YYYY-MM-DDTHH:MM:SS[.fff]Z`.
///
/// Offsets other than `Z` are rejected.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if s.as_bytes().get(10) != Some(&b'T') || !s.ends_with('Z') {
        return None;
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a hyphenated UUID.
pub fn parse_uuid(s: &str) -> Option<Uuid> {
    if s.len() != 36 {
        return None;
    }
    Uuid::parse_str(s).ok()
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn validate_timestamp(value: &str) -> Result<(), ValidationError> {
    match parse_timestamp(value) {
        Some(_) => Ok(()),
        None => Err(invalid("datetime", "must be an ISO-8601 UTC datetime")),
    }
}

fn validate_uuid(value: &str) -> Result<(), ValidationError> {
    match parse_uuid(value) {
        Some(_) => Ok(()),
        None => Err(invalid("uuid", "must be a UUID")),
    }
}

fn string(value: &Value) -> Result<&str, ValidationError> {
    value
        .as_str()
        .ok_or_else(|| invalid("type", "must be a string"))
}

fn validate_text(value: &Value) -> Result<(), ValidationError> {
    string(value).map(|_| ())
}

fn validate_title(value: &Value) -> Result<(), ValidationError> {
    match string(value)?.chars().count() {
        1..=300 => Ok(()),
        _ => Err(invalid("length", "must be between 1 and 300 characters")),
    }
}

fn validate_uuid_value(value: &Value) -> Result<(), ValidationError> {
    validate_uuid(string(value)?)
}

fn validate_timestamp_value(value: &Value) -> Result<(), ValidationError> {
    validate_timestamp(string(value)?)
}

fn validate_bool(value: &Value) -> Result<(), ValidationError> {
    if value.is_boolean() {
        Ok(())
    } else {
        Err(invalid("type", "must be a boolean"))
    }
}

fn validate_uuid_list(value: &Value) -> Result<(), ValidationError> {
    let ids = value
        .as_array()
        .ok_or_else(|| invalid("type", "must be an array"))?;
    if ids.iter().all(|id| json_uuid(id).is_some()) {
        Ok(())
    } else {
        Err(invalid("uuid", "every participant must be a UUID"))
    }
}

fn validate_reminders(value: &Value) -> Result<(), ValidationError> {
    let entries = value
        .as_array()
        .ok_or_else(|| invalid("type", "must be an array"))?;
    for (index, entry) in entries.iter().enumerate() {
        if let Err(message) = reminder(entry) {
            let mut error = invalid("reminder", message);
            error.add_param(Cow::Borrowed("index"), &index);
            return Err(error);
        }
    }
    Ok(())
}

fn validate_status(value: &Value) -> Result<(), ValidationError> {
    one_of(string(value)?, &EventStatus::ALL, "must be one of tentative, confirmed, cancelled")
}

fn validate_visibility(value: &Value) -> Result<(), ValidationError> {
    one_of(string(value)?, &EventVisibility::ALL, "must be one of private, public, busy")
}

fn one_of(value: &str, allowed: &[&str], message: &'static str) -> Result<(), ValidationError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(invalid("enum", message))
    }
}

fn optional<T>(
    field: &'static str,
    value: Option<Value>,
    parse: impl Fn(&Value) -> Option<T>,
) -> Result<Option<T>, ValidationErrors> {
    value
        .map(|v| parse(&v).ok_or_else(|| single(field, invalid("invalid", "has an invalid value"))))
        .transpose()
}

fn required_field<T>(
    field: &'static str,
    value: Option<Value>,
    parse: impl Fn(&Value) -> Option<T>,
) -> Result<T, ValidationErrors> {
    optional(field, value, parse)?.ok_or_else(|| single(field, invalid("required", "is required")))
}

fn typed<T>(
    field: &'static str,
    value: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ValidationErrors> {
    parse(value).ok_or_else(|| single(field, invalid("invalid", "has an invalid value")))
}

fn single(field: &'static str, error: ValidationError) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    errors
}
