//! Core data models used throughout Solr Harness.
//!
//! These types represent the connection profile, the uploaded file, the
//! locally derived batch summary, and the snapshots reported by the
//! indexing backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Address of a Solr core: host, port, and core name.
///
/// Fields are kept as the operator typed them; validation happens in
/// [`crate::profile::validate`] before any remote call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub host: String,
    pub port: String,
    pub core_name: String,
}

impl ConnectionProfile {
    pub fn new(
        host: impl Into<String>,
        port: impl Into<String>,
        core_name: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
            core_name: core_name.into(),
        }
    }

    /// Short label used in progress and log lines: `core@host:port`.
    pub fn label(&self) -> String {
        format!("{}@{}:{}", self.core_name, self.host, self.port)
    }
}

/// A selected file captured at selection time.
///
/// Immutable once built; a new selection replaces it wholesale.
#[derive(Debug, Clone)]
pub struct RawUpload {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
    pub last_modified: DateTime<Utc>,
}

impl RawUpload {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Read-only summary of a parsed document batch. Never sent anywhere.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchMetadata {
    pub file_name: String,
    pub file_size: u64,
    pub human_size: String,
    pub last_modified: DateTime<Utc>,
    pub content_sha256: String,
    pub document_count: usize,
    /// Keys of the first record, in first-seen order.
    pub fields: Vec<String>,
    /// The first two records of an array, or the object itself.
    pub preview: Value,
}

/// A statistic the backend may report as a number or as `"Unknown"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stat {
    Known(u64),
    #[default]
    Unknown,
}

impl std::fmt::Display for Stat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stat::Known(n) => write!(f, "{}", n),
            Stat::Unknown => f.write_str("Unknown"),
        }
    }
}

impl Serialize for Stat {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Stat::Known(n) => serializer.serialize_u64(*n),
            Stat::Unknown => serializer.serialize_str("Unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for Stat {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Anything that is not a non-negative integer is Unknown.
        let value = Value::deserialize(deserializer)?;
        let known = match &value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        Ok(known.map(Stat::Known).unwrap_or(Stat::Unknown))
    }
}

/// Backend-reported state of a core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    pub core_name: String,
    #[serde(default)]
    pub index_size_bytes: Stat,
    #[serde(default)]
    pub document_count: Stat,
    #[serde(default)]
    pub sample_documents: Vec<Value>,
}

/// Outcome of a confirmed upload. The raw payload is kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResult {
    pub message: Option<String>,
    pub snapshot: Option<MetadataSnapshot>,
    pub indexed_count: Option<u64>,
    pub raw: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_parses_numeric_stats() {
        let snap: MetadataSnapshot = serde_json::from_value(serde_json::json!({
            "core_name": "docs",
            "index_size_bytes": 2048,
            "document_count": 3,
            "sample_documents": [{"id": "1"}]
        }))
        .unwrap();
        assert_eq!(snap.index_size_bytes, Stat::Known(2048));
        assert_eq!(snap.document_count, Stat::Known(3));
        assert_eq!(snap.sample_documents.len(), 1);
    }

    #[test]
    fn snapshot_tolerates_unknown_stats() {
        let snap: MetadataSnapshot = serde_json::from_value(serde_json::json!({
            "core_name": "docs",
            "index_size_bytes": "Unknown",
            "document_count": "Unknown"
        }))
        .unwrap();
        assert_eq!(snap.index_size_bytes, Stat::Unknown);
        assert_eq!(snap.document_count.to_string(), "Unknown");
        assert!(snap.sample_documents.is_empty());
    }

    #[test]
    fn unknown_stat_serializes_as_string() {
        let v = serde_json::to_value(Stat::Unknown).unwrap();
        assert_eq!(v, serde_json::json!("Unknown"));
        let v = serde_json::to_value(Stat::Known(7)).unwrap();
        assert_eq!(v, serde_json::json!(7));
    }

    #[test]
    fn profile_label() {
        let p = ConnectionProfile::new("localhost", "8983", "docs");
        assert_eq!(p.label(), "docs@localhost:8983");
    }
}
