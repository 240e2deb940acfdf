use std::fs;
use std::sync::{Arc, Mutex};

use url_table::IngestionError;
use url_table::ingestion::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionOptions,
    IngestionSeverity, IngestionStats, discover_from_reader, discover_from_text,
};

#[derive(Default)]
struct RecordingObserver {
    diagnostics: Mutex<Vec<IngestionSeverity>>,
    alerts: Mutex<Vec<IngestionSeverity>>,
    discovered: Mutex<Vec<IngestionStats>>,
}

impl IngestionObserver for RecordingObserver {
    fn on_discovered(&self, _ctx: &IngestionContext, stats: IngestionStats) {
        self.discovered.lock().unwrap().push(stats);
    }

    fn on_diagnostic(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &IngestionError) {
        self.diagnostics.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &IngestionError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

/// A reader that fails on its first call.
struct BrokenReader;

impl std::io::Read for BrokenReader {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::other("connection reset"))
    }
}

#[test]
fn observer_receives_diagnostic_and_alert_on_read_failure() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestionOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: IngestionSeverity::Critical,
        ..Default::default()
    };

    let d = discover_from_reader(BrokenReader, "broken", &opts);
    assert!(d.schema.columns.is_empty());

    assert_eq!(*obs.diagnostics.lock().unwrap(), vec![IngestionSeverity::Critical]);
    assert_eq!(*obs.alerts.lock().unwrap(), vec![IngestionSeverity::Critical]);
    let discovered = obs.discovered.lock().unwrap().clone();
    assert_eq!(discovered.len(), 1);
    assert_eq!(discovered[0].rows, 0);
    assert_eq!(discovered[0].diagnostics, 1);
}

#[test]
fn alerts_respect_threshold() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestionOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: IngestionSeverity::Critical,
        ..Default::default()
    };

    // One short record: a Warning, below the threshold.
    let _ = discover_from_text("a,b\n1,2\n3\n", &opts);

    assert_eq!(*obs.diagnostics.lock().unwrap(), vec![IngestionSeverity::Warning]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn lower_threshold_alerts_on_warnings() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestionOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: IngestionSeverity::Warning,
        ..Default::default()
    };

    let _ = discover_from_text("a,a\n1,2\n", &opts);

    assert_eq!(*obs.alerts.lock().unwrap(), vec![IngestionSeverity::Warning]);
}

#[test]
fn clean_discovery_reports_stats_only() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestionOptions {
        observer: Some(obs.clone()),
        ..Default::default()
    };

    let text = "id,name\n1,Ada\n2,Grace\n";
    let _ = discover_from_text(text, &opts);

    assert!(obs.diagnostics.lock().unwrap().is_empty());
    assert_eq!(
        *obs.discovered.lock().unwrap(),
        vec![IngestionStats {
            bytes: text.len() as u64,
            columns: 2,
            rows: 2,
            diagnostics: 0,
        }]
    );
}

#[test]
fn file_observer_appends_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("discovery.log");
    let opts = IngestionOptions {
        observer: Some(Arc::new(FileObserver::new(&path))),
        alert_at_or_above: IngestionSeverity::Warning,
        ..Default::default()
    };

    let _ = discover_from_text("a,b\n1,2,3\n", &opts);

    let log = fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = log.lines().collect();
    assert_eq!(lines.len(), 3, "{log}");
    assert!(lines[0].contains("diag severity=Warning kind=Shape table=http"));
    assert!(lines[1].contains("ALERT severity=Warning"));
    assert!(lines[2].contains("ok table=http source=<text>"));
    assert!(lines[2].contains("rows=1 diagnostics=1"));
}

#[test]
fn composite_observer_fans_out() {
    let a = Arc::new(RecordingObserver::default());
    let b = Arc::new(RecordingObserver::default());
    let composite = CompositeObserver::new(vec![a.clone(), b.clone()]);
    let opts = IngestionOptions {
        observer: Some(Arc::new(composite)),
        ..Default::default()
    };

    let _ = discover_from_text("x\n\n", &opts);

    for obs in [a, b] {
        assert_eq!(*obs.diagnostics.lock().unwrap(), vec![IngestionSeverity::Info]);
        assert_eq!(obs.discovered.lock().unwrap().len(), 1);
    }
}
