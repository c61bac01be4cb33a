//! `solrh metadata` and `solrh refresh`.

use anyhow::Result;
use std::time::Duration;

use crate::config::Config;
use crate::models::ConnectionProfile;
use crate::progress::ProgressMode;
use crate::render::{emit, emit_error, render_error, render_snapshot};
use crate::session::{Outcome, SessionController};

/// Fetch the core's metadata once and print it.
pub async fn run_metadata(
    config: &Config,
    profile: ConnectionProfile,
    json: bool,
    progress: ProgressMode,
) -> Result<()> {
    let session = SessionController::from_config(config, profile, progress.reporter())?;

    match session.fetch_metadata().await {
        Outcome::Done(snap) => {
            emit(json, &snap, || render_snapshot(&snap));
            Ok(())
        }
        Outcome::Failed(err) => {
            emit_error(json, &err);
            Err(anyhow::Error::new(err))
        }
        Outcome::Busy | Outcome::Stale => anyhow::bail!("metadata fetch was not dispatched"),
    }
}

/// Fetch repeatedly through one session.
///
/// After each attempt the last-known-good snapshot is printed together with
/// the latest error, if any. Fails if the final attempt failed.
pub async fn run_refresh(
    config: &Config,
    profile: ConnectionProfile,
    times: u32,
    interval: Duration,
    json: bool,
    progress: ProgressMode,
) -> Result<()> {
    if times == 0 {
        anyhow::bail!("--times must be >= 1");
    }
    let session = SessionController::from_config(config, profile, progress.reporter())?;

    for attempt in 1..=times {
        if attempt > 1 {
            tokio::time::sleep(interval).await;
        }
        session.fetch_metadata().await;
        let view = session.snapshot();

        if json {
            let line = serde_json::json!({
                "attempt": attempt,
                "snapshot": view.snapshot,
                "error": view.error,
            });
            println!("{}", line);
        } else {
            println!("=== refresh {}/{} ===", attempt, times);
            match view.snapshot {
                Some(ref snap) => print!("{}", render_snapshot(snap)),
                None => println!("(no snapshot yet)"),
            }
            if let Some(ref err) = view.error {
                println!("{}", render_error(err));
            }
            println!();
        }
    }

    match session.last_error() {
        Some(err) => {
            // Already printed alongside the snapshot above.
            tracing::debug!(kind = %err.kind, "final refresh attempt failed");
            Err(anyhow::Error::new(err))
        }
        None => Ok(()),
    }
}
