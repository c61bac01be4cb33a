//! Local document batch analysis.
//!
//! Parses an uploaded file as JSON and summarizes its shape without any
//! network access, so the operator can inspect a batch before committing
//! to an upload.
//!
//! # Batch Shape
//!
//! | Parsed value | Records | Fields | Preview |
//! |--------------|---------|--------|---------|
//! | array of N | N | keys of element 0 | first `min(2, N)` elements |
//! | object | 1 | its own keys | the object |
//! | anything else | rejected | | |
//!
//! Key order is first-seen order (`serde_json` is built with
//! `preserve_order`).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;

use crate::config::AnalysisConfig;
use crate::error::ClassifiedError;
use crate::models::{BatchMetadata, RawUpload};
use crate::render::format_bytes;

/// Number of records kept in the preview of an array batch.
pub const PREVIEW_LEN: usize = 2;

/// Why a file could not be analyzed. Every variant is a malformed-json
/// failure and yields no [`BatchMetadata`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Please select a valid JSON file (got media type '{0}')")]
    UnsupportedMediaType(String),
    #[error("Invalid JSON file format: {0}")]
    MalformedJson(String),
}

impl From<ParseError> for ClassifiedError {
    fn from(err: ParseError) -> Self {
        ClassifiedError::local(err.to_string())
    }
}

/// Analyzer configured with the media types it accepts.
#[derive(Debug, Clone)]
pub struct Analyzer {
    allowed_media_types: Vec<String>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl Analyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            allowed_media_types: config
                .allowed_media_types
                .iter()
                .map(|m| m.trim().to_ascii_lowercase())
                .collect(),
        }
    }

    /// True for the configured types and any `+json` structured suffix.
    /// Parameters such as `; charset=utf-8` are ignored.
    pub fn accepts(&self, media_type: &str) -> bool {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        if essence.is_empty() {
            return false;
        }
        essence.ends_with("+json") || self.allowed_media_types.iter().any(|m| *m == essence)
    }

    pub fn analyze(
        &self,
        bytes: &[u8],
        media_type: &str,
        file_name: &str,
        file_size: u64,
        last_modified: DateTime<Utc>,
    ) -> Result<BatchMetadata, ParseError> {
        if !self.accepts(media_type) {
            return Err(ParseError::UnsupportedMediaType(media_type.to_string()));
        }

        let parsed: Value =
            serde_json::from_slice(bytes).map_err(|e| ParseError::MalformedJson(e.to_string()))?;

        let (document_count, fields, preview) = match parsed {
            Value::Array(records) => {
                let fields = records.first().map(object_keys).unwrap_or_default();
                let count = records.len();
                let preview: Vec<Value> = records.into_iter().take(PREVIEW_LEN).collect();
                (count, fields, Value::Array(preview))
            }
            obj @ Value::Object(_) => (1, object_keys(&obj), obj),
            _ => {
                return Err(ParseError::MalformedJson(
                    "expected a JSON object or array of objects".to_string(),
                ))
            }
        };

        Ok(BatchMetadata {
            file_name: file_name.to_string(),
            file_size,
            human_size: format_bytes(file_size),
            last_modified,
            content_sha256: hex_sha256(bytes),
            document_count,
            fields,
            preview,
        })
    }

    pub fn analyze_upload(&self, upload: &RawUpload) -> Result<BatchMetadata, ParseError> {
        self.analyze(
            &upload.bytes,
            &upload.media_type,
            &upload.file_name,
            upload.size(),
            upload.last_modified,
        )
    }
}

/// Analyze with the default media-type policy (`application/json`, `+json`).
pub fn analyze(
    bytes: &[u8],
    media_type: &str,
    file_name: &str,
    file_size: u64,
    last_modified: DateTime<Utc>,
) -> Result<BatchMetadata, ParseError> {
    Analyzer::default().analyze(bytes, media_type, file_name, file_size, last_modified)
}

fn object_keys(value: &Value) -> Vec<String> {
    value
        .as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default()
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Capture a file from disk as a [`RawUpload`].
///
/// The media type comes from the extension unless `media_type` overrides it.
pub fn read_upload(path: &Path, media_type: Option<&str>) -> Result<RawUpload> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read upload file: {}", path.display()))?;
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat upload file: {}", path.display()))?;
    let last_modified: DateTime<Utc> = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| DateTime::<Utc>::UNIX_EPOCH);

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let media_type = media_type
        .map(|m| m.to_string())
        .unwrap_or_else(|| detect_media_type(&file_name));

    Ok(RawUpload {
        file_name,
        media_type,
        bytes,
        last_modified,
    })
}

fn detect_media_type(file_name: &str) -> String {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("json") => "application/json".to_string(),
        Some("ndjson") | Some("jsonl") => "application/x-ndjson".to_string(),
        Some("txt") => "text/plain".to_string(),
        _ => "application/octet-stream".to_string(),
    }
}
