//! Human-readable rendering of batch summaries, snapshots, and errors.
//!
//! Every `render_*` function returns a `String`; [`emit`] and [`emit_error`]
//! pick between that text and the JSON form of the model for `--json`.

use serde::Serialize;
use serde_json::Value;
use std::fmt::Write;

use crate::error::ClassifiedError;
use crate::models::{BatchMetadata, MetadataSnapshot, Stat, UploadResult};

pub fn render_batch(meta: &BatchMetadata) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- File Information ---");
    let _ = writeln!(out, "file_name:      {}", meta.file_name);
    let _ = writeln!(out, "file_size:      {}", meta.human_size);
    let _ = writeln!(
        out,
        "last_modified:  {}",
        meta.last_modified.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "sha256:         {}", meta.content_sha256);
    let _ = writeln!(out, "document_count: {}", meta.document_count);
    let _ = writeln!(out);
    let _ = writeln!(out, "--- Document Structure ---");
    if meta.fields.is_empty() {
        let _ = writeln!(out, "fields:         (none)");
    } else {
        let _ = writeln!(out, "fields:         {}", meta.fields.join(", "));
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "--- Content Preview ---");
    let _ = writeln!(out, "{}", pretty(&meta.preview));
    out
}

pub fn render_snapshot(snap: &MetadataSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- Core Metadata ---");
    let _ = writeln!(out, "core_name:      {}", snap.core_name);
    let size = match snap.index_size_bytes {
        Stat::Known(bytes) => format!("{} ({})", bytes, format_bytes(bytes)),
        Stat::Unknown => Stat::Unknown.to_string(),
    };
    let _ = writeln!(out, "index_size:     {}", size);
    let _ = writeln!(out, "document_count: {}", snap.document_count);
    let _ = writeln!(out);
    let _ = writeln!(out, "--- Sample Documents ({}) ---", snap.sample_documents.len());
    for (i, doc) in snap.sample_documents.iter().enumerate() {
        let _ = writeln!(out, "[sample {}]", i);
        let _ = writeln!(out, "{}", pretty(doc));
    }
    out
}

pub fn render_upload(result: &UploadResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        result
            .message
            .as_deref()
            .unwrap_or("File uploaded and indexed successfully")
    );
    if let Some(n) = result.indexed_count {
        let _ = writeln!(out, "indexed: {} documents", n);
    }
    if let Some(ref snap) = result.snapshot {
        let _ = writeln!(out);
        out.push_str(&render_snapshot(snap));
    }
    out
}

pub fn render_error(err: &ClassifiedError) -> String {
    format!("Error [{}]: {}", err.kind, err.message)
}

/// Print a result to stdout, as JSON or as rendered text.
pub fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce() -> String) {
    if json {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Error: failed to serialize output: {}", e),
        }
    } else {
        print!("{}", human());
    }
}

/// Report a classified error: JSON on stdout, or a single line on stderr.
pub fn emit_error(json: bool, err: &ClassifiedError) {
    if json {
        let body = serde_json::json!({ "error": err });
        println!("{}", body);
    } else {
        eprintln!("{}", render_error(err));
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn snapshot_lists_samples() {
        let snap = MetadataSnapshot {
            core_name: "docs".into(),
            index_size_bytes: Stat::Known(2048),
            document_count: Stat::Unknown,
            sample_documents: vec![json!({"id": "1"}), json!({"id": "2"})],
        };
        let text = render_snapshot(&snap);
        assert!(text.contains("core_name:      docs"));
        assert!(text.contains("2048 (2.00 KB)"));
        assert!(text.contains("document_count: Unknown"));
        assert!(text.contains("Sample Documents (2)"));
        assert!(text.contains("[sample 1]"));
    }

    #[test]
    fn error_line() {
        let err = ClassifiedError::new(ErrorKind::BackendRejected, "core not found");
        assert_eq!(render_error(&err), "Error [backend_rejected]: core not found");
    }
}
