//! Record normalization
//!
//! This module wraps decoded tracker messages into a uniform [`Record`]:
//! - Scalar field values with instants recognized from RFC 3339 strings
//! - A closed tagged variant over the known message groups
//! - One group-aware timestamp accessor applied uniformly downstream

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

/// Field mapping of one decoded message.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// One decoded field value.
///
/// The external decoder emits numbers, strings, and absolute instants;
/// instants arrive as RFC 3339 strings and are recognized during
/// deserialization. Timestamp absence is an absent field, never a zero value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Uint(u64),
    Int(i64),
    Float(f64),
    Text(String),
    Instant(DateTime<Utc>),
}

impl FieldValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::Uint(v) => Some(*v),
            FieldValue::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            FieldValue::Uint(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Uint(v) => Some(*v as f64),
            FieldValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Instant(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Uint(v) => write!(f, "{}", v),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Text(v) => write!(f, "{}", v),
            FieldValue::Instant(v) => {
                write!(f, "{}", v.with_timezone(&Local).format("%Y-%m-%dT%H:%M:%S"))
            }
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FieldValueVisitor;

        impl<'de> Visitor<'de> for FieldValueVisitor {
            type Value = FieldValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a number, a string, or an RFC 3339 timestamp")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<FieldValue, E> {
                Ok(FieldValue::Uint(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<FieldValue, E> {
                Ok(FieldValue::Int(v))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<FieldValue, E> {
                Ok(FieldValue::Float(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<FieldValue, E> {
                match DateTime::parse_from_rfc3339(v) {
                    Ok(instant) => Ok(FieldValue::Instant(instant.with_timezone(&Utc))),
                    Err(_) => Ok(FieldValue::Text(v.to_string())),
                }
            }
        }

        deserializer.deserialize_any(FieldValueVisitor)
    }
}

/// Message group a record belongs to.
///
/// The device defines an open set of group names; the ones this crate derives
/// facts from get their own variant, everything else falls back to
/// [`MessageGroup::Unknown`]. Each variant carries its own timestamp-field
/// rule, so adding a group means adding one variant here rather than touching
/// every consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageGroup {
    Monitoring,
    Event,
    SleepLevel,
    SleepAssessment,
    StressLevel,
    Unknown(String),
}

impl MessageGroup {
    /// Parse a decoder-emitted group name.
    ///
    /// The SDK-style `_mesgs` suffix (`monitoring_mesgs`) normalizes to the
    /// same variant as the bare name.
    pub fn from_name(name: &str) -> Self {
        match name.strip_suffix("_mesgs").unwrap_or(name) {
            "monitoring" => MessageGroup::Monitoring,
            "event" => MessageGroup::Event,
            "sleep_level" => MessageGroup::SleepLevel,
            "sleep_assessment" => MessageGroup::SleepAssessment,
            "stress_level" => MessageGroup::StressLevel,
            _ => MessageGroup::Unknown(name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MessageGroup::Monitoring => "monitoring",
            MessageGroup::Event => "event",
            MessageGroup::SleepLevel => "sleep_level",
            MessageGroup::SleepAssessment => "sleep_assessment",
            MessageGroup::StressLevel => "stress_level",
            MessageGroup::Unknown(name) => name,
        }
    }

    /// Name of the field holding this group's timestamp.
    ///
    /// Stress records carry their instant in `stress_level_time`; every other
    /// group uses the plain `timestamp` field.
    pub fn timestamp_field(&self) -> &'static str {
        match self {
            MessageGroup::StressLevel => "stress_level_time",
            _ => "timestamp",
        }
    }
}

impl fmt::Display for MessageGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized decoded message.
#[derive(Debug, Clone)]
pub struct Record {
    source: String,
    group: MessageGroup,
    fields: FieldMap,
}

impl Record {
    pub fn new(source: impl Into<String>, group: MessageGroup, fields: FieldMap) -> Self {
        Self {
            source: source.into(),
            group,
            fields,
        }
    }

    /// Identifier of the originating file.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn group(&self) -> &MessageGroup {
        &self.group
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Whether every named field is present.
    pub fn has_fields(&self, names: &[&str]) -> bool {
        names.iter().all(|name| self.fields.contains_key(*name))
    }

    /// The record's absolute timestamp under its group's resolution rule.
    ///
    /// Returns `None` when the group's timestamp field is absent or holds a
    /// non-instant value.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.instant(self.group.timestamp_field())
    }

    pub fn uint(&self, name: &str) -> Option<u64> {
        self.field(name).and_then(FieldValue::as_u64)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.field(name).and_then(FieldValue::as_i64)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.field(name).and_then(FieldValue::as_f64)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(FieldValue::as_str)
    }

    pub fn instant(&self, name: &str) -> Option<DateTime<Utc>> {
        self.field(name).and_then(FieldValue::as_instant)
    }
}
