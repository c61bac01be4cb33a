//! `solrh analyze` and `solrh upload`.
//!
//! Both commands start by capturing the file and analyzing it locally; an
//! upload is only dispatched once that analysis succeeds.

use anyhow::Result;
use std::path::Path;

use crate::analyze::{read_upload, Analyzer};
use crate::config::Config;
use crate::error::ClassifiedError;
use crate::models::ConnectionProfile;
use crate::progress::ProgressMode;
use crate::render::{emit, emit_error, render_batch, render_upload};
use crate::session::{Outcome, SessionController};

/// Analyze a file locally and print its batch summary. No network access.
pub fn run_analyze(
    config: &Config,
    path: &Path,
    media_type: Option<&str>,
    json: bool,
) -> Result<()> {
    let upload = read_upload(path, media_type)?;
    let analyzer = Analyzer::new(&config.analysis);

    match analyzer.analyze_upload(&upload) {
        Ok(meta) => {
            emit(json, &meta, || render_batch(&meta));
            Ok(())
        }
        Err(e) => {
            let err: ClassifiedError = e.into();
            emit_error(json, &err);
            Err(anyhow::Error::new(err))
        }
    }
}

/// Analyze a file, then upload it to the profile's core.
pub async fn run_upload(
    config: &Config,
    profile: ConnectionProfile,
    path: &Path,
    media_type: Option<&str>,
    json: bool,
    progress: ProgressMode,
) -> Result<()> {
    let upload = read_upload(path, media_type)?;
    let session = SessionController::from_config(config, profile, progress.reporter())?;

    let batch = match session.select_file(upload).await.into_result() {
        Ok(Some(meta)) => meta,
        Ok(None) => anyhow::bail!("file selection was superseded"),
        Err(err) => {
            emit_error(json, &err);
            return Err(anyhow::Error::new(err));
        }
    };
    if !json {
        print!("{}", render_batch(&batch));
        println!();
    }

    match session.upload().await {
        Outcome::Done(result) => {
            let body = serde_json::json!({ "batch": batch, "upload": result });
            emit(json, &body, || render_upload(&result));
            Ok(())
        }
        Outcome::Failed(err) => {
            emit_error(json, &err);
            Err(anyhow::Error::new(err))
        }
        Outcome::Busy | Outcome::Stale => {
            anyhow::bail!("upload was not dispatched: another request is in flight")
        }
    }
}
