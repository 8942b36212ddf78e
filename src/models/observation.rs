use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use serde::{Deserialize, Serialize};

/// One temperature reading as published by the source.
///
/// The source substitutes a non-numeric marker (conventionally "M") for
/// readings it never recorded. The marker is preserved verbatim and is only
/// filtered out on aggregation paths; it is never coerced to zero or NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TempValue {
    Degrees(f64),
    Missing(String),
}

impl TempValue {
    /// Interpret a raw table cell. Anything that parses as a number is a
    /// reading in °C; everything else is kept as the source's marker text.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(deg) => TempValue::Degrees(deg),
            Err(_) => TempValue::Missing(trimmed.to_string()),
        }
    }

    pub fn as_degrees(&self) -> Option<f64> {
        match self {
            TempValue::Degrees(deg) => Some(*deg),
            TempValue::Missing(_) => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, TempValue::Missing(_))
    }
}

impl fmt::Display for TempValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TempValue::Degrees(deg) => write!(f, "{}", deg),
            TempValue::Missing(marker) => write!(f, "{}", marker),
        }
    }
}

// Readings land in SQLite as REAL, markers as TEXT, matching the dynamic
// typing the store's aggregate queries rely on.
impl ToSql for TempValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            TempValue::Degrees(deg) => Ok(ToSqlOutput::Owned(Value::Real(*deg))),
            TempValue::Missing(marker) => Ok(ToSqlOutput::Owned(Value::Text(marker.clone()))),
        }
    }
}

impl FromSql for TempValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Real(deg) => Ok(TempValue::Degrees(deg)),
            ValueRef::Integer(deg) => Ok(TempValue::Degrees(deg as f64)),
            ValueRef::Text(marker) => {
                let marker = std::str::from_utf8(marker)
                    .map_err(|e| FromSqlError::Other(Box::new(e)))?;
                Ok(TempValue::Missing(marker.to_string()))
            }
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// The three readings published for one calendar day, in the source table's
/// fixed column order (max, min, mean).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTemps {
    pub max: TempValue,
    pub min: TempValue,
    pub mean: TempValue,
}

impl DailyTemps {
    pub fn new(max: TempValue, min: TempValue, mean: TempValue) -> Self {
        Self { max, min, mean }
    }

    /// Convenience constructor for fully-recorded days.
    pub fn from_degrees(max: f64, min: f64, mean: f64) -> Self {
        Self {
            max: TempValue::Degrees(max),
            min: TempValue::Degrees(min),
            mean: TempValue::Degrees(mean),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.max.is_missing() && !self.min.is_missing() && !self.mean.is_missing()
    }
}

/// Accumulated crawl output: one entry per calendar day, ordered by date.
pub type TempBatch = BTreeMap<NaiveDate, DailyTemps>;

/// A dated temperature observation as persisted in the store.
///
/// `date` is the natural key: the store holds at most one observation per
/// calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub temps: DailyTemps,
    pub location: String,
}

impl Observation {
    pub fn new(date: NaiveDate, temps: DailyTemps, location: impl Into<String>) -> Self {
        Self {
            date,
            temps,
            location: location.into(),
        }
    }
}
