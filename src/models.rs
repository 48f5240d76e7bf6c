use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use reqwest::Url;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use crate::{DataSourceError, Result};

/// Request-scoped template variables, name -> substitution value.
pub type ScopedVars = HashMap<String, String>;

/// One query of a batch as submitted by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    #[serde(rename = "refId")]
    pub ref_id: String,
    pub system_id: String,
    /// Comma-separated stream names, may contain template tokens.
    pub stream: String,
    /// Sample resolution understood by the remote service (`raw`, `minute`, `hour`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl QuerySpec {
    pub fn new(ref_id: impl Into<String>, system_id: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            system_id: system_id.into(),
            stream: stream.into(),
            frequency: None,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        let range = Self { from, to };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if self.from > self.to {
            return Err(DataSourceError::InvalidTimeRange {
                from: self.from.to_rfc3339(),
                to: self.to.to_rfc3339(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub range: TimeRange,
    pub scoped_vars: ScopedVars,
}

/// Inbound batch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub range: TimeRange,
    #[serde(rename = "scopedVars", default)]
    pub scoped_vars: ScopedVars,
    pub targets: Vec<QuerySpec>,
}

impl QueryRequest {
    pub fn context(&self) -> RequestContext {
        RequestContext {
            range: self.range,
            scoped_vars: self.scoped_vars.clone(),
        }
    }
}

/// A query with every template resolved, ready to be fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub ref_id: String,
    pub system_id: String,
    pub streams: Vec<String>,
    /// Resolved stream template, names the value field of the frame.
    pub label: String,
    pub from: String,
    pub to: String,
    pub frequency: Option<String>,
    pub limit: Option<u32>,
    pub url: Url,
}

/// A point as returned by the remote sample endpoint.
///
/// Raw samples carry `value`, aggregated ones (`minute`, `hour`) carry
/// `average`, `min`, `max` and `count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl SamplePoint {
    pub fn raw(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            value: Some(value),
            average: None,
            min: None,
            max: None,
            count: None,
        }
    }

    /// Value plotted for this point: the raw value, else the average.
    pub fn plotted_value(&self) -> Option<f64> {
        self.value.or(self.average)
    }
}

/// Accepts epoch milliseconds (integer or float) or an ISO-8601 string.
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Millis(i64),
        FractionalMillis(f64),
        Text(String),
    }

    let millis = match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Millis(ms) => ms,
        RawTimestamp::FractionalMillis(ms) => ms.trunc() as i64,
        RawTimestamp::Text(text) => {
            return parse_iso_timestamp(&text)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp {:?}", text)));
        }
    };

    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| de::Error::custom(format!("timestamp {} out of range", millis)))
}

/// RFC 3339, ISO-8601 with a basic `+hhmm` offset, or without offset (taken as UTC).
pub fn parse_iso_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(ts.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Time,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
}

/// One `(time, value)` row, serialized as a two element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Row(pub DateTime<Utc>, pub Option<f64>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "refId")]
    pub ref_id: String,
    pub fields: Vec<Field>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseBatch {
    pub data: Vec<Frame>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub message: String,
}
