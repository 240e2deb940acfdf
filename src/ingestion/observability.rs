use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{error, info, warn};

use crate::error::IngestionError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (data was kept, possibly reshaped).
    Warning,
    /// Error-level event (part of the data was lost).
    Error,
    /// Critical error (the source could not be fetched or read).
    Critical,
}

/// Context about a discovery run.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// Table being discovered.
    pub table: String,
    /// Source URL (or a label for in-memory sources).
    pub source: String,
}

/// Stats reported when discovery finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Raw bytes read from the source.
    pub bytes: u64,
    /// Number of discovered columns.
    pub columns: usize,
    /// Number of materialized rows.
    pub rows: usize,
    /// Number of diagnostics collected along the way.
    pub diagnostics: usize,
}

/// Observer interface for discovery outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait IngestionObserver: Send + Sync {
    /// Called once when discovery finishes, whatever its diagnostics.
    fn on_discovered(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Called for each diagnostic collected during discovery.
    fn on_diagnostic(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Called when a diagnostic meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_diagnostic`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.on_diagnostic(ctx, severity, error)
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
    fn on_discovered(&self, ctx: &IngestionContext, stats: IngestionStats) {
        for o in &self.observers {
            o.on_discovered(ctx, stats);
        }
    }

    fn on_diagnostic(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_diagnostic(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Emits discovery events as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_discovered(&self, ctx: &IngestionContext, stats: IngestionStats) {
        info!(
            table = %ctx.table,
            source = %ctx.source,
            bytes = stats.bytes,
            columns = stats.columns,
            rows = stats.rows,
            diagnostics = stats.diagnostics,
            "table discovered"
        );
    }

    fn on_diagnostic(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        match severity {
            IngestionSeverity::Info => {
                info!(table = %ctx.table, kind = ?error.kind(), %error, "discovery diagnostic")
            }
            IngestionSeverity::Warning => {
                warn!(table = %ctx.table, kind = ?error.kind(), %error, "discovery diagnostic")
            }
            IngestionSeverity::Error | IngestionSeverity::Critical => {
                error!(table = %ctx.table, kind = ?error.kind(), ?severity, %error, "discovery diagnostic")
            }
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        error!(
            table = %ctx.table,
            source = %ctx.source,
            ?severity,
            %error,
            "ALERT: discovery degraded"
        );
    }
}

/// Appends discovery events to a local log file.
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
    fn on_discovered(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.append_line(&format!(
            "{} ok table={} source={} bytes={} columns={} rows={} diagnostics={}",
            unix_ts(),
            ctx.table,
            ctx.source,
            stats.bytes,
            stats.columns,
            stats.rows,
            stats.diagnostics
        ));
    }

    fn on_diagnostic(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!(
            "{} diag severity={:?} kind={:?} table={} source={} err={}",
            unix_ts(),
            severity,
            error.kind(),
            ctx.table,
            ctx.source,
            error
        ));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} kind={:?} table={} source={} err={}",
            unix_ts(),
            severity,
            error.kind(),
            ctx.table,
            ctx.source,
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
