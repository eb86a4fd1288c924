//! Decoder boundary
//!
//! Binary container decoding is an external collaborator; this module pins
//! down its interface and ships one concrete implementation that ingests the
//! decoder's serialized export:
//! - [`ContainerDecoder`] - the `decode(path) -> GroupedMessages` contract
//! - [`GroupedMessages`] - group name → ordered message list, order preserved
//! - [`JsonDecoder`] - reads bare or `{messages, errors}` envelope documents

use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::error::DecodeError;
use crate::record::FieldMap;

/// Decoded container content: message-group name → ordered message sequence.
///
/// Group order and the message order within each group mirror the decoder's
/// output; both are load-bearing for the chronological-stream contract.
#[derive(Debug, Clone, Default)]
pub struct GroupedMessages {
    groups: Vec<(String, Vec<FieldMap>)>,
}

impl GroupedMessages {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FieldMap])> {
        self.groups
            .iter()
            .map(|(name, messages)| (name.as_str(), messages.as_slice()))
    }
}

impl IntoIterator for GroupedMessages {
    type Item = (String, Vec<FieldMap>);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

impl<'de> Deserialize<'de> for GroupedMessages {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = GroupedMessages;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of group name to message list")
            }

            fn visit_map<A>(self, mut map: A) -> Result<GroupedMessages, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut groups = Vec::new();
                while let Some((name, messages)) = map.next_entry::<String, Vec<FieldMap>>()? {
                    groups.push((name, messages));
                }
                Ok(GroupedMessages { groups })
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}

/// External decoder contract: one file in, its grouped messages out.
pub trait ContainerDecoder {
    fn decode(&self, path: &Path) -> Result<GroupedMessages, DecodeError>;
}

/// Decoder reading the external decoder's JSON export.
///
/// Accepts either form:
/// - bare: `{ "<group>": [ { field: value, ... }, ... ], ... }`
/// - envelope: `{ "messages": { ... }, "errors": ["...", ...] }`
///
/// A non-empty `errors` array is fatal for the file, matching the upstream
/// decoder's per-message error reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl ContainerDecoder for JsonDecoder {
    fn decode(&self, path: &Path) -> Result<GroupedMessages, DecodeError> {
        let name = path.display().to_string();
        let raw = fs::read_to_string(path).map_err(|source| DecodeError::Io {
            path: name.clone(),
            source,
        })?;
        parse_container(&raw, &name)
    }
}

/// Parse one serialized container document.
pub fn parse_container(raw: &str, path: &str) -> Result<GroupedMessages, DecodeError> {
    let document: ContainerDocument =
        serde_json::from_str(raw).map_err(|source| DecodeError::Malformed {
            path: path.to_string(),
            source,
        })?;

    match document {
        ContainerDocument::Envelope { messages, errors } if errors.is_empty() => Ok(messages),
        ContainerDocument::Envelope { errors, .. } => Err(DecodeError::Reported {
            path: path.to_string(),
            count: errors.len(),
            first: errors.into_iter().next().unwrap_or_default(),
        }),
        ContainerDocument::Bare(messages) => Ok(messages),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContainerDocument {
    Envelope {
        messages: GroupedMessages,
        #[serde(default)]
        errors: Vec<String>,
    },
    Bare(GroupedMessages),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bare_document_preserves_order() {
        let raw = r#"{
            "monitoring_mesgs": [
                {"timestamp": "2024-01-15T08:00:00Z", "steps": 1200},
                {"timestamp_16": 1000, "heart_rate": 62}
            ],
            "event_mesgs": [
                {"timestamp": "2024-01-15T22:10:00Z", "event_type": "start"}
            ],
            "device_info_mesgs": []
        }"#;

        let messages = parse_container(raw, "activity.json").unwrap();
        let names: Vec<&str> = messages.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["monitoring_mesgs", "event_mesgs", "device_info_mesgs"]);

        let (_, monitoring) = messages.iter().next().unwrap();
        assert_eq!(monitoring.len(), 2);
        assert_eq!(monitoring[0].get("steps"), Some(&FieldValue::Uint(1200)));
        assert_eq!(monitoring[1].get("heart_rate"), Some(&FieldValue::Uint(62)));
    }

    #[test]
    fn test_envelope_without_errors() {
        let raw = r#"{
            "messages": {"monitoring": [{"steps": 5}]},
            "errors": []
        }"#;

        let messages = parse_container(raw, "activity.json").unwrap();
        assert!(!messages.is_empty());
    }

    #[test]
    fn test_envelope_with_errors_is_fatal() {
        let raw = r#"{
            "messages": {"monitoring": [{"steps": 5}]},
            "errors": ["crc mismatch at offset 112", "truncated message"]
        }"#;

        let err = parse_container(raw, "activity.json").unwrap_err();
        match err {
            DecodeError::Reported { path, count, first } => {
                assert_eq!(path, "activity.json");
                assert_eq!(count, 2);
                assert_eq!(first, "crc mismatch at offset 112");
            }
            other => panic!("expected Reported, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_document() {
        let err = parse_container("not json", "broken.json").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }
}
