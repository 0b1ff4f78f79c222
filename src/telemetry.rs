//! Per-operation timing: an `Instant::now()`/`elapsed()` measurement plus a
//! `tracing` log line, collected into a retrievable list rather than only
//! logged.

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;
use url::Url;

/// The kind of operation a [`Measurement`] was taken for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryKind {
    /// Loading a URL's contents.
    Load,
    /// Parsing a document.
    Parse,
    /// Scanning a document.
    Scan,
    /// Scanning a document's dependencies.
    ScanDependencies,
    /// Running a full `analyze` call.
    Analyze,
}

impl TelemetryKind {
    /// A short, stable label, used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Parse => "parse",
            Self::Scan => "scan",
            Self::ScanDependencies => "scan_dependencies",
            Self::Analyze => "analyze",
        }
    }
}

/// One recorded operation timing.
#[derive(Debug, Clone)]
pub struct Measurement {
    /// The kind of operation.
    pub kind: TelemetryKind,
    /// The URL the operation was for.
    pub url: Arc<Url>,
    /// When the operation started.
    pub start: Instant,
    /// How long the operation took.
    pub duration: Duration,
}

/// An in-flight stopwatch, returned by [`Telemetry::start`]; dropping it
/// without calling [`Stopwatch::finish`] discards the measurement (a caller
/// that bails out early via `?` simply loses the timing, which is
/// acceptable since telemetry is ambient, not load-bearing).
#[must_use = "call `.finish()` to record the measurement"]
pub struct Stopwatch<'a> {
    /// The telemetry sink to record into.
    telemetry: &'a Telemetry,
    /// The kind of operation being timed.
    kind: TelemetryKind,
    /// The URL the operation is for.
    url: Arc<Url>,
    /// When the stopwatch was started.
    start: Instant,
}

impl Stopwatch<'_> {
    /// Records the measurement, using the time elapsed since the stopwatch
    /// started.
    pub fn finish(self) {
        if !self.telemetry.enabled {
            return;
        }

        let duration = self.start.elapsed();
        tracing::debug!(
            kind = self.kind.label(),
            url = %self.url,
            ?duration,
            "operation finished"
        );

        self.telemetry.measurements.lock().push(Measurement {
            kind: self.kind,
            url: self.url,
            start: self.start,
            duration,
        });
    }
}

/// A `parking_lot::Mutex`-guarded snapshot list of operation timings.
#[derive(Debug)]
pub struct Telemetry {
    /// Whether timings are recorded at all (ambient configuration).
    enabled: bool,
    /// The recorded measurements so far.
    measurements: Mutex<Vec<Measurement>>,
}

impl Telemetry {
    /// Creates a new telemetry sink.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            measurements: Mutex::new(Vec::new()),
        }
    }

    /// Starts timing an operation. Call [`Stopwatch::finish`] on the result
    /// once the operation completes.
    pub fn start(&self, kind: TelemetryKind, url: Arc<Url>) -> Stopwatch<'_> {
        Stopwatch {
            telemetry: self,
            kind,
            url,
            start: Instant::now(),
        }
    }

    /// Returns a snapshot of every measurement recorded so far.
    pub fn measurements(&self) -> Vec<Measurement> {
        self.measurements.lock().clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn disabled_telemetry_records_nothing() {
        let telemetry = Telemetry::new(false);
        let url = Arc::new(Url::parse("file:///a.html").unwrap());
        telemetry.start(TelemetryKind::Parse, url).finish();
        assert!(telemetry.measurements().is_empty());
    }

    #[test]
    fn enabled_telemetry_records_a_measurement() {
        let telemetry = Telemetry::new(true);
        let url = Arc::new(Url::parse("file:///a.html").unwrap());
        telemetry.start(TelemetryKind::Parse, url.clone()).finish();

        let measurements = telemetry.measurements();
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].url, url);
        assert_eq!(measurements[0].kind, TelemetryKind::Parse);
    }
}
