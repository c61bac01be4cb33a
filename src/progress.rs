//! Action progress reporting.
//!
//! Reports what the session is doing (analyzing a file, uploading, fetching)
//! so the operator sees that a slow backend is still being waited on.
//! Progress is emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A user-triggered action, as named in progress output.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    Analyze,
    Upload,
    Fetch,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Analyze => "analyze",
            Action::Upload => "upload",
            Action::Fetch => "fetch",
        }
    }
}

/// A single progress event.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// Local parse of a selected file has started.
    Analyzing { file: String, bytes: u64 },
    /// A multipart upload has been dispatched.
    Uploading { target: String, file: String, bytes: u64 },
    /// A metadata request has been dispatched.
    Fetching { target: String },
    /// The action was ignored because another request is in flight.
    Busy { action: Action },
    /// The action resolved.
    Finished { action: Action, ok: bool },
}

/// Reports progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the session controller.
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "upload docs@localhost:8983  uploading  1,234 bytes".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Analyzing { file, bytes } => {
                format!("analyze {}  parsing  {} bytes\n", file, format_number(*bytes))
            }
            ProgressEvent::Uploading {
                target,
                file,
                bytes,
            } => format!(
                "upload {}  uploading {}  {} bytes\n",
                target,
                file,
                format_number(*bytes)
            ),
            ProgressEvent::Fetching { target } => format!("fetch {}  requesting...\n", target),
            ProgressEvent::Busy { action } => format!(
                "{}  ignored: another request is still in flight\n",
                action.as_str()
            ),
            ProgressEvent::Finished { action, ok } => format!(
                "{}  {}\n",
                action.as_str(),
                if *ok { "done" } else { "failed" }
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Analyzing { file, bytes } => serde_json::json!({
                "event": "progress",
                "action": "analyze",
                "phase": "analyzing",
                "file": file,
                "bytes": bytes
            }),
            ProgressEvent::Uploading {
                target,
                file,
                bytes,
            } => serde_json::json!({
                "event": "progress",
                "action": "upload",
                "phase": "uploading",
                "target": target,
                "file": file,
                "bytes": bytes
            }),
            ProgressEvent::Fetching { target } => serde_json::json!({
                "event": "progress",
                "action": "fetch",
                "phase": "fetching",
                "target": target
            }),
            ProgressEvent::Busy { action } => serde_json::json!({
                "event": "busy",
                "action": action.as_str()
            }),
            ProgressEvent::Finished { action, ok } => serde_json::json!({
                "event": "finished",
                "action": action.as_str(),
                "ok": ok
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Parse the `--progress` flag value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(Self::default_for_tty()),
            "off" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            _ => None,
        }
    }

    /// Build a reporter for this mode. Caller passes it to the session.
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
