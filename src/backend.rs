//! Clients for the indexing backend.
//!
//! The backend speaks two JSON endpoints:
//!
//! | Method | Path | Body | Success payload |
//! |--------|------|------|-----------------|
//! | `POST` | `/upload` | multipart: `file`, `solr_host`, `solr_port`, `core_name` | `{message, metadata}` or `{message, documentCount}` |
//! | `POST` | `/get_metadata` | JSON: `{host, port, coreName}` | `{core_name, index_size_bytes, document_count, sample_documents}`, optionally wrapped in `{message, metadata}` |
//!
//! Either endpoint may answer with an `error` field, at any status code.
//! That field is authoritative: a 200 carrying `error` is a rejection.
//!
//! # Retry Policy
//!
//! None. Uploads are not idempotent on the backend, so a failed upload is
//! surfaced immediately. Metadata fetches are idempotent and the caller may
//! repeat them freely, but this module still issues exactly one request
//! per call.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;

use crate::config::BackendConfig;
use crate::error::{classify, inspect_response, CallFailure, ClassifiedError, Operation};
use crate::models::{ConnectionProfile, MetadataSnapshot, RawUpload, UploadResult};

/// The two remote operations the session controller drives.
///
/// [`HttpBackend`] is the production implementation; tests substitute
/// their own to observe call counts and ordering.
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Upload a raw file for indexing into the profile's core.
    async fn upload(
        &self,
        profile: &ConnectionProfile,
        upload: &RawUpload,
    ) -> Result<UploadResult, ClassifiedError>;

    /// Fetch the live metadata snapshot of the profile's core.
    async fn fetch_metadata(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<MetadataSnapshot, ClassifiedError>;
}

/// HTTP client for the ingest/metadata service.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    upload_timeout: Duration,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: config.url.trim().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            upload_timeout: Duration::from_secs(config.upload_timeout_secs),
        })
    }

    /// Override both timeouts. Mostly useful for tests.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.upload_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and return the accepted JSON body.
    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        op: Operation,
    ) -> Result<Value, ClassifiedError> {
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                let failure = CallFailure::from_reqwest(&e);
                tracing::warn!(?op, error = %e, "request failed before a response arrived");
                return Err(classify(&failure, op));
            }
        };

        let status = response.status().as_u16();
        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(?op, status, error = %e, "failed to read response body");
                return Err(classify(&CallFailure::from_reqwest(&e), op));
            }
        };
        let body: Option<Value> = serde_json::from_slice(&bytes).ok();

        inspect_response(status, body).map_err(|failure| {
            let err = classify(&failure, op);
            tracing::warn!(?op, status, kind = %err.kind, message = %err.message, "backend call failed");
            err
        })
    }
}

#[async_trait]
impl IndexBackend for HttpBackend {
    async fn upload(
        &self,
        profile: &ConnectionProfile,
        upload: &RawUpload,
    ) -> Result<UploadResult, ClassifiedError> {
        let url = format!("{}/upload", self.base_url);
        tracing::info!(core = %profile.label(), file = %upload.file_name, bytes = upload.size(), "uploading batch");

        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.media_type)
            .map_err(|e| classify(&CallFailure::from_reqwest(&e), Operation::Upload))?;

        let form = Form::new()
            .part("file", part)
            .text("solr_host", profile.host.clone())
            .text("solr_port", profile.port.clone())
            .text("core_name", profile.core_name.clone());

        let request = self
            .client
            .post(&url)
            .timeout(self.upload_timeout)
            .multipart(form);

        let body = self.execute(request, Operation::Upload).await?;
        Ok(parse_upload_result(body))
    }

    async fn fetch_metadata(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<MetadataSnapshot, ClassifiedError> {
        let url = format!("{}/get_metadata", self.base_url);
        tracing::debug!(core = %profile.label(), "fetching core metadata");

        let request = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&serde_json::json!({
                "host": profile.host,
                "port": profile.port,
                "coreName": profile.core_name,
            }));

        let body = self.execute(request, Operation::FetchMetadata).await?;
        parse_snapshot(&body)
            .map_err(|failure| classify(&failure, Operation::FetchMetadata))
    }
}

/// Accept either a bare snapshot or one wrapped in `{"metadata": ...}`.
pub fn parse_snapshot(body: &Value) -> Result<MetadataSnapshot, CallFailure> {
    let inner = match body.get("metadata") {
        Some(m @ Value::Object(_)) => m,
        _ => body,
    };
    serde_json::from_value(inner.clone())
        .map_err(|e| CallFailure::Other(format!("Unexpected metadata payload: {}", e)))
}

/// Interpret a confirmed upload response. The payload is kept opaque; known
/// fields are lifted out when present.
pub fn parse_upload_result(body: Value) -> UploadResult {
    let message = body
        .get("message")
        .and_then(|m| m.as_str())
        .map(|s| s.to_string());
    let snapshot = match body.get("metadata") {
        Some(m @ Value::Object(_)) => serde_json::from_value(m.clone()).ok(),
        _ if body.get("core_name").is_some() => serde_json::from_value(body.clone()).ok(),
        _ => None,
    };
    let indexed_count = body.get("documentCount").and_then(|n| n.as_u64());

    UploadResult {
        message,
        snapshot,
        indexed_count,
        raw: body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::Stat;
    use serde_json::json;

    #[test]
    fn snapshot_bare_and_wrapped() {
        let bare = json!({"core_name": "docs", "index_size_bytes": 10, "document_count": 2, "sample_documents": []});
        let wrapped = json!({"message": "ok", "metadata": bare.clone()});
        assert_eq!(parse_snapshot(&bare).unwrap(), parse_snapshot(&wrapped).unwrap());
        assert_eq!(parse_snapshot(&bare).unwrap().document_count, Stat::Known(2));
    }

    #[test]
    fn snapshot_without_core_name_is_unknown_failure() {
        let failure = parse_snapshot(&json!({"message": "hi"})).unwrap_err();
        assert_eq!(
            classify(&failure, Operation::FetchMetadata).kind,
            ErrorKind::Unknown
        );
    }

    #[test]
    fn upload_result_with_metadata() {
        let result = parse_upload_result(json!({
            "message": "Successfully created core 'docs' and indexed 3 documents",
            "metadata": {"core_name": "docs", "index_size_bytes": 512, "document_count": 3, "sample_documents": [{"a": 1}]}
        }));
        assert!(result.message.unwrap().contains("indexed 3"));
        assert_eq!(result.snapshot.unwrap().document_count, Stat::Known(3));
        assert_eq!(result.indexed_count, None);
    }

    #[test]
    fn upload_result_with_count_only() {
        let result = parse_upload_result(json!({
            "message": "Data indexed successfully but error fetching metadata: boom",
            "documentCount": 3
        }));
        assert!(result.snapshot.is_none());
        assert_eq!(result.indexed_count, Some(3));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let cfg = BackendConfig {
            url: "http://localhost:5002/".into(),
            timeout_secs: 1,
            upload_timeout_secs: 1,
        };
        assert_eq!(HttpBackend::new(&cfg).unwrap().base_url(), "http://localhost:5002");
    }
}
