//! Metric points and their line protocol encoding
//!
//! A `Point` is one timestamped emission of a measurement: a small set of
//! string tags for identity plus the measured fields. Points are validated
//! once at construction and never change afterwards.

use crate::sink::Precision;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// A single field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Boolean(bool),
    String(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

pub type Tags = BTreeMap<String, String>;
pub type Fields = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum PointError {
    EmptyMeasurement,
    NoTags,
    NoFields,
    EmptyTag(String),
    EmptyFieldKey,
    NonFiniteField(String),
    /// Line protocol has no escape for line breaks
    LineBreak(String),
    TimestampOutOfRange(DateTime<Utc>),
}

impl std::fmt::Display for PointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointError::EmptyMeasurement => write!(f, "measurement name is empty"),
            PointError::NoTags => write!(f, "point has no tags"),
            PointError::NoFields => write!(f, "point has no fields"),
            PointError::EmptyTag(key) => write!(f, "tag '{}' has an empty key or value", key),
            PointError::EmptyFieldKey => write!(f, "field key is empty"),
            PointError::NonFiniteField(key) => write!(f, "field '{}' is not a finite number", key),
            PointError::LineBreak(key) => write!(f, "'{}' contains a line break", key),
            PointError::TimestampOutOfRange(ts) => {
                write!(f, "timestamp {} is not representable in nanoseconds", ts)
            }
        }
    }
}

impl std::error::Error for PointError {}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    measurement: String,
    tags: Tags,
    fields: Fields,
    timestamp: DateTime<Utc>,
    timestamp_nanos: i64,
}

impl Point {
    pub fn new(
        measurement: impl Into<String>,
        tags: Tags,
        fields: Fields,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, PointError> {
        let measurement = measurement.into();
        if measurement.is_empty() {
            return Err(PointError::EmptyMeasurement);
        }
        if tags.is_empty() {
            return Err(PointError::NoTags);
        }
        if fields.is_empty() {
            return Err(PointError::NoFields);
        }
        if has_line_break(&measurement) {
            return Err(PointError::LineBreak(measurement));
        }
        for (key, value) in &tags {
            if key.is_empty() || value.is_empty() {
                return Err(PointError::EmptyTag(key.clone()));
            }
            if has_line_break(key) || has_line_break(value) {
                return Err(PointError::LineBreak(key.clone()));
            }
        }
        for (key, value) in &fields {
            if key.is_empty() {
                return Err(PointError::EmptyFieldKey);
            }
            if has_line_break(key) {
                return Err(PointError::LineBreak(key.clone()));
            }
            match value {
                FieldValue::Float(v) if !v.is_finite() => {
                    return Err(PointError::NonFiniteField(key.clone()));
                }
                FieldValue::String(v) if has_line_break(v) => {
                    return Err(PointError::LineBreak(key.clone()));
                }
                _ => {}
            }
        }
        let timestamp_nanos = timestamp
            .timestamp_nanos_opt()
            .ok_or(PointError::TimestampOutOfRange(timestamp))?;

        Ok(Self {
            measurement,
            tags,
            fields,
            timestamp,
            timestamp_nanos,
        })
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Render this point as one line of the InfluxDB line protocol.
    ///
    /// Timestamps are truncated to the requested precision.
    pub fn to_line(&self, precision: Precision) -> String {
        let mut line = String::with_capacity(128);
        escape_into(&mut line, &self.measurement, &[',', ' ']);

        for (key, value) in &self.tags {
            line.push(',');
            escape_into(&mut line, key, &[',', '=', ' ']);
            line.push('=');
            escape_into(&mut line, value, &[',', '=', ' ']);
        }

        line.push(' ');
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            escape_into(&mut line, key, &[',', '=', ' ']);
            line.push('=');
            match value {
                FieldValue::Float(v) => {
                    let _ = write!(line, "{}", v);
                }
                FieldValue::Integer(v) => {
                    let _ = write!(line, "{}i", v);
                }
                FieldValue::Boolean(v) => line.push_str(if *v { "true" } else { "false" }),
                FieldValue::String(v) => {
                    line.push('"');
                    escape_into(&mut line, v, &['"', '\\']);
                    line.push('"');
                }
            }
        }

        let _ = write!(line, " {}", self.timestamp_nanos / precision.nanos_per_unit());
        line
    }
}

fn has_line_break(raw: &str) -> bool {
    raw.contains(['\n', '\r'])
}

fn escape_into(out: &mut String, raw: &str, special: &[char]) {
    for c in raw.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap()
    }

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_rejects_empty_parts() {
        let mut fields = Fields::new();
        fields.insert("v".to_string(), 1.0.into());

        assert_eq!(
            Point::new("", tags(&[("type", "summary")]), fields.clone(), ts()),
            Err(PointError::EmptyMeasurement)
        );
        assert_eq!(
            Point::new("m", Tags::new(), fields.clone(), ts()),
            Err(PointError::NoTags)
        );
        assert_eq!(
            Point::new("m", tags(&[("type", "summary")]), Fields::new(), ts()),
            Err(PointError::NoFields)
        );
        assert_eq!(
            Point::new("m", tags(&[("symbol", "")]), fields, ts()),
            Err(PointError::EmptyTag("symbol".to_string()))
        );
    }

    #[test]
    fn test_rejects_non_finite_float() {
        let mut fields = Fields::new();
        fields.insert("leverage".to_string(), f64::INFINITY.into());

        let err = Point::new("m", tags(&[("type", "summary")]), fields, ts()).unwrap_err();
        assert_eq!(err, PointError::NonFiniteField("leverage".to_string()));
    }

    #[test]
    fn test_rejects_line_breaks() {
        let mut fields = Fields::new();
        fields.insert("orderRejectReason".to_string(), "bad\nqty".into());
        let err = Point::new("m", tags(&[("type", "order")]), fields, ts()).unwrap_err();
        assert_eq!(err, PointError::LineBreak("orderRejectReason".to_string()));

        let mut fields = Fields::new();
        fields.insert("v".to_string(), 1.0.into());
        let err = Point::new("m", tags(&[("symbol", "BTC\r\nUSDT")]), fields, ts()).unwrap_err();
        assert_eq!(err, PointError::LineBreak("symbol".to_string()));
    }

    #[test]
    fn test_line_protocol_encoding() {
        let mut fields = Fields::new();
        fields.insert("size".to_string(), 1.5.into());
        fields.insert("count".to_string(), 3i64.into());
        fields.insert("ok".to_string(), true.into());
        fields.insert("note".to_string(), "say \"hi\"".into());

        let point = Point::new(
            "xy stats",
            tags(&[("xSymbol", "BTC,USDT"), ("type", "symbol")]),
            fields,
            ts(),
        )
        .unwrap();

        assert_eq!(
            point.to_line(Precision::Nanoseconds),
            "xy\\ stats,type=symbol,xSymbol=BTC\\,USDT count=3i,note=\"say \\\"hi\\\"\",ok=true,size=1.5 1700000000123456789"
        );
        assert!(point.to_line(Precision::Seconds).ends_with(" 1700000000"));
    }
}
