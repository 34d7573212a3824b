//! Mapping of SQL Server result rows into JSON records.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat};
use serde_json::{Number, Value};
use tiberius::xml::XmlData;
use tiberius::{ColumnData, FromSql, Row};

use crate::models::Record;
use crate::Result;

/// Convert a result row into a JSON object keyed by column name.
///
/// When a query projects the same column name twice the later value wins.
pub fn row_to_record(row: Row) -> Result<Record> {
    let names: Vec<String> = row
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();

    let mut record = Record::with_capacity(names.len());
    for (name, data) in names.into_iter().zip(row) {
        record.insert(name, column_to_json(&data)?);
    }
    Ok(record)
}

/// Convert a single column value into JSON.
pub fn column_to_json(data: &ColumnData<'static>) -> Result<Value> {
    let value = match data {
        ColumnData::U8(v) => v.map(Value::from),
        ColumnData::I16(v) => v.map(Value::from),
        ColumnData::I32(v) => v.map(Value::from),
        ColumnData::I64(v) => v.map(Value::from),
        ColumnData::F32(v) => v.and_then(|f| Number::from_f64(f64::from(f))).map(Value::Number),
        ColumnData::F64(v) => v.and_then(Number::from_f64).map(Value::Number),
        ColumnData::Bit(v) => v.map(Value::Bool),
        ColumnData::String(v) => v.as_ref().map(|s| Value::String(s.to_string())),
        ColumnData::Guid(v) => v.map(|g| Value::String(g.to_string())),
        ColumnData::Binary(v) => v.as_ref().map(|b| Value::String(STANDARD.encode(b))),
        ColumnData::Numeric(v) => v
            .and_then(|n| Number::from_f64(f64::from(n)))
            .map(Value::Number),
        ColumnData::Xml(v) => v
            .as_ref()
            .map(|x| Value::String(XmlData::clone(x).into_string())),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)?
                .map(|dt| Value::String(format!("{}Z", dt.format("%Y-%m-%dT%H:%M:%S%.3f"))))
        }
        ColumnData::DateTimeOffset(_) => DateTime::<FixedOffset>::from_sql(data)?
            .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true))),
        ColumnData::Date(_) => {
            NaiveDate::from_sql(data)?.map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
        }
        ColumnData::Time(_) => NaiveTime::from_sql(data)?
            .map(|t| Value::String(t.format("%H:%M:%S%.3f").to_string())),
    };

    Ok(value.unwrap_or(Value::Null))
}
