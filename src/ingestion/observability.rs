use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::LabError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (operation failed).
    Error,
    /// Critical error (I/O or transport failures).
    Critical,
}

/// Which producer is loading rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionSource {
    /// A CSV stream; `label` is a file name or other caller-chosen description.
    Csv { label: String },
    /// The remote listing/detail API rooted at `base_url`.
    Remote { base_url: String },
}

impl fmt::Display for IngestionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestionSource::Csv { label } => write!(f, "csv:{label}"),
            IngestionSource::Remote { base_url } => write!(f, "remote:{base_url}"),
        }
    }
}

/// Context about an ingestion attempt.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    pub source: IngestionSource,
}

/// Running row count, with the expected total when the producer knows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionProgress {
    pub rows: usize,
    pub total: Option<usize>,
}

impl fmt::Display for IngestionProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            Some(0) | None => write!(f, "Rows parsed: {}", self.rows),
            Some(total) => write!(f, "Fetched {} / {} Pokémon", self.rows, total),
        }
    }
}

/// Minimal stats reported on successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Number of rows committed to the store.
    pub rows: usize,
}

/// Observer interface for ingestion progress and outcomes.
///
/// Implementors can drive a status display, record metrics, or trigger alerts.
pub trait IngestionObserver: Send + Sync {
    /// Called at the producer's progress cadence.
    fn on_progress(&self, _ctx: &IngestionContext, _progress: IngestionProgress) {}

    /// Called when rows were committed to the store.
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Called when a producer stopped because it was cancelled. Nothing was committed.
    fn on_cancelled(&self, _ctx: &IngestionContext, _progress: IngestionProgress) {}

    /// Called when ingestion fails.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &LabError) {}

    /// Called when an ingestion failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &LabError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_progress(&self, ctx: &IngestionContext, progress: IngestionProgress) {
        for o in &self.observers {
            o.on_progress(ctx, progress);
        }
    }

    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_cancelled(&self, ctx: &IngestionContext, progress: IngestionProgress) {
        for o in &self.observers {
            o.on_cancelled(ctx, progress);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &LabError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &LabError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs ingestion events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl IngestionObserver for StdErrObserver {
    fn on_progress(&self, ctx: &IngestionContext, progress: IngestionProgress) {
        eprintln!("[ingest][progress] source={} {}", ctx.source, progress);
    }

    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        eprintln!("[ingest][ok] source={} rows={}", ctx.source, stats.rows);
    }

    fn on_cancelled(&self, ctx: &IngestionContext, progress: IngestionProgress) {
        eprintln!(
            "[ingest][cancelled] source={} discarded_rows={}",
            ctx.source, progress.rows
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &LabError) {
        eprintln!("[ingest][{:?}] source={} err={}", severity, ctx.source, error);
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &LabError) {
        eprintln!(
            "[ALERT][ingest][{:?}] source={} err={}",
            severity, ctx.source, error
        );
    }
}

/// Appends ingestion events to a local log file.
///
/// Progress events are not written; they are too frequent for an audit log.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.append_line(&format!(
            "{} ok source={} rows={}",
            unix_ts(),
            ctx.source,
            stats.rows
        ));
    }

    fn on_cancelled(&self, ctx: &IngestionContext, progress: IngestionProgress) {
        self.append_line(&format!(
            "{} cancelled source={} discarded_rows={}",
            unix_ts(),
            ctx.source,
            progress.rows
        ));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &LabError) {
        self.append_line(&format!(
            "{} fail severity={:?} source={} err={}",
            unix_ts(),
            severity,
            ctx.source,
            error
        ));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &LabError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} source={} err={}",
            unix_ts(),
            severity,
            ctx.source,
            error
        ));
    }
}

/// Classify an error for observer callbacks.
pub fn severity_for_error(e: &LabError) -> IngestionSeverity {
    match e {
        LabError::Io(_) => IngestionSeverity::Critical,
        LabError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => IngestionSeverity::Critical,
            _ => IngestionSeverity::Error,
        },
        // No status means the request never got a response.
        LabError::Fetch { status: None, .. } => IngestionSeverity::Critical,
        LabError::Fetch { status: Some(s), .. } if *s >= 500 => IngestionSeverity::Critical,
        LabError::Fetch { .. } => IngestionSeverity::Error,
        LabError::Json(_)
        | LabError::SchemaMismatch { .. }
        | LabError::HeaderDetection
        | LabError::CommandParse { .. } => IngestionSeverity::Error,
        LabError::NotFound { .. } | LabError::ImmutableId => IngestionSeverity::Warning,
    }
}

/// Optional observer plus alert threshold, shared by both producers.
#[derive(Clone)]
pub(crate) struct Reporter<'a> {
    pub(crate) observer: Option<&'a Arc<dyn IngestionObserver>>,
    pub(crate) alert_at_or_above: IngestionSeverity,
    pub(crate) ctx: IngestionContext,
}

impl Reporter<'_> {
    pub(crate) fn progress(&self, rows: usize, total: Option<usize>) {
        if let Some(obs) = self.observer {
            obs.on_progress(&self.ctx, IngestionProgress { rows, total });
        }
    }

    pub(crate) fn cancelled(&self, rows: usize, total: Option<usize>) {
        if let Some(obs) = self.observer {
            obs.on_cancelled(&self.ctx, IngestionProgress { rows, total });
        }
    }

    /// Report `on_success`, or `on_failure` and (above threshold) `on_alert`.
    pub(crate) fn outcome<T>(&self, result: &Result<T, LabError>, rows: impl FnOnce(&T) -> usize) {
        let Some(obs) = self.observer else {
            return;
        };
        match result {
            Ok(v) => obs.on_success(&self.ctx, IngestionStats { rows: rows(v) }),
            Err(e) => {
                let sev = severity_for_error(e);
                obs.on_failure(&self.ctx, sev, e);
                if sev >= self.alert_at_or_above {
                    obs.on_alert(&self.ctx, sev, e);
                }
            }
        }
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
