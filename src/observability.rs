use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ConvertError;
use crate::pipeline::Stage;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (expected failure: bad input, bad query, refused write).
    Error,
    /// Critical error (I/O, configuration, or other infrastructure failures).
    Critical,
}

/// Context about a conversion attempt.
#[derive(Debug, Clone)]
pub struct ConversionContext {
    /// Source location as given.
    pub source: String,
    /// Destination location as given.
    pub destination: String,
    /// Last stage entered; on failure, the stage that failed.
    pub stage: Stage,
}

/// Minimal stats reported on a successful conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionStats {
    /// Rows handed to the destination.
    pub rows: usize,
    /// Columns handed to the destination.
    pub columns: usize,
}

/// Receives the outcome of every conversion run by a [`crate::Converter`].
///
/// Exactly one of `on_success`/`on_failure` fires per conversion; `on_alert` follows
/// `on_failure` when the severity reaches [`crate::pipeline::ConversionOptions::alert_at_or_above`].
pub trait ConversionObserver: Send + Sync {
    /// Called when a conversion succeeds.
    fn on_success(&self, _ctx: &ConversionContext, _stats: ConversionStats) {}

    /// Called when a conversion fails.
    fn on_failure(&self, _ctx: &ConversionContext, _severity: Severity, _error: &ConvertError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &ConversionContext, severity: Severity, error: &ConvertError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Fans every callback out to each wrapped observer, in order.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ConversionObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn ConversionObserver>>) -> Self {
        Self { observers }
    }

    /// Number of wrapped observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns `true` if no observers are wrapped.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl ConversionObserver for CompositeObserver {
    fn on_success(&self, ctx: &ConversionContext, stats: ConversionStats) {
        self.observers.iter().for_each(|o| o.on_success(ctx, stats));
    }

    fn on_failure(&self, ctx: &ConversionContext, severity: Severity, error: &ConvertError) {
        self.observers.iter().for_each(|o| o.on_failure(ctx, severity, error));
    }

    fn on_alert(&self, ctx: &ConversionContext, severity: Severity, error: &ConvertError) {
        self.observers.iter().for_each(|o| o.on_alert(ctx, severity, error));
    }
}

/// One observer callback rendered as a single `key=value` log line.
#[derive(Clone, Copy)]
enum Event<'a> {
    Ok(ConversionStats),
    Fail(Severity, &'a ConvertError),
    Alert(Severity, &'a ConvertError),
}

struct LogLine<'a> {
    ctx: &'a ConversionContext,
    event: Event<'a>,
}

impl fmt::Display for LogLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctx = self.ctx;
        let (tag, severity, error) = match self.event {
            Event::Ok(stats) => {
                return write!(
                    f,
                    "ok source={} destination={} rows={} columns={}",
                    ctx.source, ctx.destination, stats.rows, stats.columns
                );
            }
            Event::Fail(severity, error) => ("fail", severity, error),
            Event::Alert(severity, error) => ("ALERT", severity, error),
        };
        write!(
            f,
            "{tag} severity={severity:?} stage={:?} source={} destination={} err={error}",
            ctx.stage, ctx.source, ctx.destination
        )
    }
}

/// Logs conversion events to stderr, one line each.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl StdErrObserver {
    fn emit(&self, ctx: &ConversionContext, event: Event<'_>) {
        eprintln!("[tabconv] {}", LogLine { ctx, event });
    }
}

impl ConversionObserver for StdErrObserver {
    fn on_success(&self, ctx: &ConversionContext, stats: ConversionStats) {
        self.emit(ctx, Event::Ok(stats));
    }

    fn on_failure(&self, ctx: &ConversionContext, severity: Severity, error: &ConvertError) {
        self.emit(ctx, Event::Fail(severity, error));
    }

    fn on_alert(&self, ctx: &ConversionContext, severity: Severity, error: &ConvertError) {
        self.emit(ctx, Event::Alert(severity, error));
    }
}

/// Appends conversion events to a log file, each line prefixed with a unix timestamp.
///
/// Best-effort: a log file that cannot be opened or written is skipped silently.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn emit(&self, ctx: &ConversionContext, event: Event<'_>) {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{secs} {}", LogLine { ctx, event });
        }
    }
}

impl ConversionObserver for FileObserver {
    fn on_success(&self, ctx: &ConversionContext, stats: ConversionStats) {
        self.emit(ctx, Event::Ok(stats));
    }

    fn on_failure(&self, ctx: &ConversionContext, severity: Severity, error: &ConvertError) {
        self.emit(ctx, Event::Fail(severity, error));
    }

    fn on_alert(&self, ctx: &ConversionContext, severity: Severity, error: &ConvertError) {
        self.emit(ctx, Event::Alert(severity, error));
    }
}
