//! Session controller: the single owner of all mutable session state.
//!
//! # State Machine
//!
//! ```text
//!            file selected                 analysis resolves
//!   Idle ───────────────────▶ Analyzing ───────────────────▶ Idle
//!     │
//!     ├── upload (file analyzed, profile valid) ──▶ Uploading ──▶ Idle
//!     │
//!     └── fetch (profile valid) ──────────────────▶ Fetching ───▶ Idle
//! ```
//!
//! At most one of `Uploading`/`Fetching` is active. Triggering either while
//! one is active is a no-op ([`Outcome::Busy`]). Local analysis touches no
//! network resource and may run while a request is in flight.
//!
//! Profile validation failures never leave `Idle` and never reach the
//! backend.
//!
//! # Concurrency
//!
//! State sits behind a `std::sync::Mutex` that is only held for the
//! bookkeeping before and after a call, never across an `.await`. The
//! profile and raw upload are cloned at dispatch, so edits made while a
//! request is in flight apply to the next request only.
//!
//! Every dispatch takes a generation number; a result is applied only if
//! the session is still waiting on that generation. Anything else is
//! reported as [`Outcome::Stale`] and discarded.
//!
//! A call whose future is dropped before it resolves (timeout, `select!`,
//! aborted task) releases the in-flight marker on drop, so the session can
//! dispatch again.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::analyze::Analyzer;
use crate::backend::{HttpBackend, IndexBackend};
use crate::config::Config;
use crate::error::{ClassifiedError, ErrorKind};
use crate::models::{BatchMetadata, ConnectionProfile, MetadataSnapshot, RawUpload, UploadResult};
use crate::profile;
use crate::progress::{Action, NoProgress, ProgressEvent, ProgressReporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SessionState {
    Idle,
    Analyzing,
    Uploading,
    Fetching,
}

/// Result of a user-triggered action.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The action resolved successfully and its result was applied.
    Done(T),
    /// The action resolved with a classified error, now the session's error.
    Failed(ClassifiedError),
    /// Another upload or fetch is in flight; nothing happened.
    Busy,
    /// A newer action superseded this one; its result was discarded.
    Stale,
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    /// Collapse into a `Result`, treating `Busy`/`Stale` as `None`.
    pub fn into_result(self) -> Result<Option<T>, ClassifiedError> {
        match self {
            Outcome::Done(v) => Ok(Some(v)),
            Outcome::Failed(e) => Err(e),
            Outcome::Busy | Outcome::Stale => Ok(None),
        }
    }
}

/// Read-only copy of the session for rendering.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionView {
    pub state: SessionState,
    pub profile: ConnectionProfile,
    pub file_name: Option<String>,
    pub batch: Option<BatchMetadata>,
    pub last_upload: Option<Result<UploadResult, ClassifiedError>>,
    pub snapshot: Option<MetadataSnapshot>,
    pub error: Option<ClassifiedError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InFlight {
    None,
    Uploading(u64),
    Fetching(u64),
}

struct Inner {
    profile: ConnectionProfile,
    raw_upload: Option<Arc<RawUpload>>,
    batch: Option<BatchMetadata>,
    last_upload: Option<Result<UploadResult, ClassifiedError>>,
    snapshot: Option<MetadataSnapshot>,
    error: Option<ClassifiedError>,
    in_flight: InFlight,
    /// Selection generation currently being analyzed, if any.
    analyzing: Option<u64>,
    selection_gen: u64,
    request_gen: u64,
}

/// Clears the in-flight marker if its call is dropped before resolving.
///
/// Only resets when the marker still belongs to this dispatch; a resolved
/// call has already cleared it.
struct DispatchGuard<'a> {
    session: &'a SessionController,
    marker: InFlight,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.session.lock();
        if inner.in_flight == self.marker {
            tracing::debug!(marker = ?self.marker, "request abandoned before it resolved");
            inner.in_flight = InFlight::None;
        }
    }
}

/// Handle for an analysis started by [`SessionController::begin_selection`].
#[derive(Debug, Clone)]
struct SelectionTicket {
    generation: u64,
    upload: Arc<RawUpload>,
}

pub struct SessionController {
    inner: Mutex<Inner>,
    backend: Arc<dyn IndexBackend>,
    analyzer: Analyzer,
    progress: Box<dyn ProgressReporter>,
}

impl SessionController {
    pub fn new(backend: Arc<dyn IndexBackend>, profile: ConnectionProfile) -> Self {
        Self {
            inner: Mutex::new(Inner {
                profile,
                raw_upload: None,
                batch: None,
                last_upload: None,
                snapshot: None,
                error: None,
                in_flight: InFlight::None,
                analyzing: None,
                selection_gen: 0,
                request_gen: 0,
            }),
            backend,
            analyzer: Analyzer::default(),
            progress: Box::new(NoProgress),
        }
    }

    /// Build a session against the configured HTTP backend.
    pub fn from_config(
        config: &Config,
        profile: ConnectionProfile,
        progress: Box<dyn ProgressReporter>,
    ) -> anyhow::Result<Self> {
        let backend = HttpBackend::new(&config.backend)?;
        tracing::debug!(backend = %backend.base_url(), core = %profile.label(), "session created");
        Ok(Self::new(Arc::new(backend), profile)
            .with_analyzer(Analyzer::new(&config.analysis))
            .with_progress(progress))
    }

    pub fn with_analyzer(mut self, analyzer: Analyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State is plain data; a panic mid-update cannot leave it unusable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ============ Profile ============

    pub fn profile(&self) -> ConnectionProfile {
        self.lock().profile.clone()
    }

    pub fn set_profile(&self, profile: ConnectionProfile) {
        self.lock().profile = profile;
    }

    pub fn set_host(&self, host: impl Into<String>) {
        self.lock().profile.host = host.into();
    }

    pub fn set_port(&self, port: impl Into<String>) {
        self.lock().profile.port = port.into();
    }

    pub fn set_core_name(&self, core_name: impl Into<String>) {
        self.lock().profile.core_name = core_name.into();
    }

    // ============ Observation ============

    pub fn state(&self) -> SessionState {
        let inner = self.lock();
        state_of(&inner)
    }

    pub fn snapshot(&self) -> SessionView {
        let inner = self.lock();
        SessionView {
            state: state_of(&inner),
            profile: inner.profile.clone(),
            file_name: inner.raw_upload.as_ref().map(|u| u.file_name.clone()),
            batch: inner.batch.clone(),
            last_upload: inner.last_upload.clone(),
            snapshot: inner.snapshot.clone(),
            error: inner.error.clone(),
        }
    }

    pub fn last_error(&self) -> Option<ClassifiedError> {
        self.lock().error.clone()
    }

    pub fn metadata_snapshot(&self) -> Option<MetadataSnapshot> {
        self.lock().snapshot.clone()
    }

    pub fn batch(&self) -> Option<BatchMetadata> {
        self.lock().batch.clone()
    }

    // ============ Analyze ============

    /// Select a file and analyze it locally. Replaces any previous selection.
    pub async fn select_file(&self, upload: RawUpload) -> Outcome<BatchMetadata> {
        let ticket = self.begin_selection(upload);
        self.progress.report(ProgressEvent::Analyzing {
            file: ticket.upload.file_name.clone(),
            bytes: ticket.upload.size(),
        });

        let analyzer = self.analyzer.clone();
        let upload = ticket.upload.clone();
        let result = tokio::task::spawn_blocking(move || analyzer.analyze_upload(&upload))
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Unknown, e.to_string()))
            .and_then(|r| r.map_err(ClassifiedError::from));

        let outcome = self.finish_selection(&ticket, result);
        self.report_finished(Action::Analyze, &outcome);
        outcome
    }

    fn begin_selection(&self, upload: RawUpload) -> SelectionTicket {
        let mut inner = self.lock();
        inner.selection_gen += 1;
        let generation = inner.selection_gen;
        let upload = Arc::new(upload);
        inner.raw_upload = Some(upload.clone());
        inner.batch = None;
        inner.analyzing = Some(generation);
        tracing::debug!(generation, file = %upload.file_name, "file selected");
        SelectionTicket { generation, upload }
    }

    fn finish_selection(
        &self,
        ticket: &SelectionTicket,
        result: Result<BatchMetadata, ClassifiedError>,
    ) -> Outcome<BatchMetadata> {
        let mut inner = self.lock();
        if inner.analyzing != Some(ticket.generation) {
            tracing::debug!(generation = ticket.generation, "discarding stale analysis");
            return Outcome::Stale;
        }
        inner.analyzing = None;

        match result {
            Ok(meta) => {
                inner.batch = Some(meta.clone());
                inner.error = None;
                Outcome::Done(meta)
            }
            Err(err) => {
                // A file that does not parse is not uploadable.
                inner.raw_upload = None;
                inner.batch = None;
                inner.error = Some(err.clone());
                Outcome::Failed(err)
            }
        }
    }

    // ============ Upload ============

    /// Upload the selected file to the profile's core. Never retried.
    pub async fn upload(&self) -> Outcome<UploadResult> {
        let (generation, profile, upload) = {
            let mut inner = self.lock();
            if inner.in_flight != InFlight::None {
                drop(inner);
                self.progress.report(ProgressEvent::Busy {
                    action: Action::Upload,
                });
                return Outcome::Busy;
            }
            if let Err(err) = profile::validate(&inner.profile) {
                return self.reject(Action::Upload, inner, err);
            }
            if inner.analyzing.is_some() {
                let err =
                    ClassifiedError::local("Please wait for the selected file to finish analysis");
                return self.reject(Action::Upload, inner, err);
            }
            let upload = match (inner.raw_upload.clone(), inner.batch.is_some()) {
                (Some(upload), true) => upload,
                _ => {
                    let err = ClassifiedError::local("Please select a file first");
                    return self.reject(Action::Upload, inner, err);
                }
            };
            inner.request_gen += 1;
            let generation = inner.request_gen;
            inner.in_flight = InFlight::Uploading(generation);
            (generation, inner.profile.clone(), upload)
        };

        self.progress.report(ProgressEvent::Uploading {
            target: profile.label(),
            file: upload.file_name.clone(),
            bytes: upload.size(),
        });
        tracing::info!(generation, core = %profile.label(), "upload dispatched");

        let _dispatch = DispatchGuard {
            session: self,
            marker: InFlight::Uploading(generation),
        };
        let result = self.backend.upload(&profile, &upload).await;

        let outcome = {
            let mut inner = self.lock();
            if inner.in_flight != InFlight::Uploading(generation) {
                tracing::debug!(generation, "discarding stale upload result");
                return Outcome::Stale;
            }
            inner.in_flight = InFlight::None;
            inner.last_upload = Some(result.clone());
            match result {
                Ok(res) => {
                    if let Some(ref snap) = res.snapshot {
                        inner.snapshot = Some(snap.clone());
                    }
                    inner.error = None;
                    Outcome::Done(res)
                }
                Err(err) => {
                    inner.error = Some(err.clone());
                    Outcome::Failed(err)
                }
            }
        };
        self.report_finished(Action::Upload, &outcome);
        outcome
    }

    // ============ Fetch ============

    /// Fetch the live metadata snapshot. Safe to repeat.
    ///
    /// On a transport or backend failure the previous snapshot is kept and
    /// the error is recorded next to it.
    pub async fn fetch_metadata(&self) -> Outcome<MetadataSnapshot> {
        let (generation, profile) = {
            let mut inner = self.lock();
            if inner.in_flight != InFlight::None {
                drop(inner);
                self.progress.report(ProgressEvent::Busy {
                    action: Action::Fetch,
                });
                return Outcome::Busy;
            }
            if let Err(err) = profile::validate(&inner.profile) {
                inner.snapshot = None;
                return self.reject(Action::Fetch, inner, err);
            }
            inner.request_gen += 1;
            let generation = inner.request_gen;
            inner.in_flight = InFlight::Fetching(generation);
            (generation, inner.profile.clone())
        };

        self.progress.report(ProgressEvent::Fetching {
            target: profile.label(),
        });
        tracing::debug!(generation, core = %profile.label(), "fetch dispatched");

        let _dispatch = DispatchGuard {
            session: self,
            marker: InFlight::Fetching(generation),
        };
        let result = self.backend.fetch_metadata(&profile).await;

        let outcome = {
            let mut inner = self.lock();
            if inner.in_flight != InFlight::Fetching(generation) {
                tracing::debug!(generation, "discarding stale fetch result");
                return Outcome::Stale;
            }
            inner.in_flight = InFlight::None;
            match result {
                Ok(snap) => {
                    inner.snapshot = Some(snap.clone());
                    inner.error = None;
                    Outcome::Done(snap)
                }
                Err(err) => {
                    inner.error = Some(err.clone());
                    Outcome::Failed(err)
                }
            }
        };
        self.report_finished(Action::Fetch, &outcome);
        outcome
    }

    /// Record a failure detected before dispatch. Nothing is sent.
    fn reject<T>(
        &self,
        action: Action,
        mut inner: MutexGuard<'_, Inner>,
        err: ClassifiedError,
    ) -> Outcome<T> {
        tracing::debug!(?action, message = %err.message, "action rejected before dispatch");
        inner.error = Some(err.clone());
        drop(inner);
        let outcome = Outcome::Failed(err);
        self.report_finished(action, &outcome);
        outcome
    }

    fn report_finished<T>(&self, action: Action, outcome: &Outcome<T>) {
        self.progress.report(ProgressEvent::Finished {
            action,
            ok: outcome.is_done(),
        });
    }
}

fn state_of(inner: &Inner) -> SessionState {
    match inner.in_flight {
        InFlight::Uploading(_) => SessionState::Uploading,
        InFlight::Fetching(_) => SessionState::Fetching,
        InFlight::None if inner.analyzing.is_some() => SessionState::Analyzing,
        InFlight::None => SessionState::Idle,
    }
}
