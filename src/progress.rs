//! Exploration progress reporting.
//!
//! Two complementary surfaces:
//!
//! - [`ScanProgress`] is a polling-friendly snapshot kept on the session and
//!   updated incrementally while the explorer runs. Presentation layers read
//!   it without the core depending on any UI.
//! - [`ScanProgressReporter`] receives push events as they happen. The CLI
//!   picks one via [`ProgressMode`]; output goes to **stderr** so stdout
//!   remains parseable for scripts.

use serde::Serialize;
use std::io::Write;

/// Lifecycle of an exploration run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    #[default]
    Idle,
    Exploring,
    Complete,
    Error,
}

/// Snapshot of the current (or last) exploration run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    /// 0–100, share of candidate paths attempted.
    pub progress: u8,
    pub status: ScanStatus,
    /// Directory listings requested, including recursive module listings.
    pub total_attempts: usize,
    /// Paths that yielded at least one processed file or interest directory.
    pub successful_paths: usize,
    pub files_processed: usize,
    pub current_directory: Option<String>,
    /// Wall time of the run in milliseconds.
    pub scan_duration: u64,
    /// Advisory messages for listing failures. Never fatal.
    pub connection_errors: Vec<String>,
}

impl ScanProgress {
    /// Percentage of `done` out of `total`, clamped to 100.
    pub fn percent(done: usize, total: usize) -> u8 {
        if total == 0 {
            return 100;
        }
        ((done * 100) / total).min(100) as u8
    }
}

/// A single progress event emitted by the explorer.
#[derive(Clone, Debug)]
pub enum ScanEvent {
    /// About to list a candidate path.
    Candidate {
        path: String,
        index: usize,
        total: usize,
    },
    /// A file produced entries.
    File { path: String, files_processed: usize },
    /// Run finished.
    Finished {
        files_processed: usize,
        errors: usize,
        duration_ms: u64,
    },
}

/// Receives scan events. Implementations write to stderr (human or JSON).
pub trait ScanProgressReporter: Send + Sync {
    fn report(&self, event: &ScanEvent);
}

/// Human-friendly progress on stderr: `explore src/api  [3/24]`.
pub struct StderrProgress;

impl ScanProgressReporter for StderrProgress {
    fn report(&self, event: &ScanEvent) {
        let line = match event {
            ScanEvent::Candidate { path, index, total } => {
                let shown = if path.is_empty() { "/" } else { path.as_str() };
                format!("explore {}  [{}/{}]\n", shown, index + 1, total)
            }
            ScanEvent::File {
                path,
                files_processed,
            } => format!("  file {}  ({} processed)\n", path, format_number(*files_processed)),
            ScanEvent::Finished {
                files_processed,
                errors,
                duration_ms,
            } => format!(
                "explore done  {} files, {} errors, {} ms\n",
                format_number(*files_processed),
                errors,
                duration_ms
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ScanProgressReporter for JsonProgress {
    fn report(&self, event: &ScanEvent) {
        let obj = match event {
            ScanEvent::Candidate { path, index, total } => serde_json::json!({
                "event": "progress",
                "phase": "candidate",
                "path": path,
                "n": index + 1,
                "total": total
            }),
            ScanEvent::File {
                path,
                files_processed,
            } => serde_json::json!({
                "event": "progress",
                "phase": "file",
                "path": path,
                "files_processed": files_processed
            }),
            ScanEvent::Finished {
                files_processed,
                errors,
                duration_ms,
            } => serde_json::json!({
                "event": "done",
                "files_processed": files_processed,
                "errors": errors,
                "duration_ms": duration_ms
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

impl ScanProgressReporter for NoProgress {
    fn report(&self, _event: &ScanEvent) {}
}

pub(crate) fn format_number(n: usize) -> String {
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
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
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

    pub fn reporter(&self) -> Box<dyn ScanProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(ScanProgress::percent(0, 4), 0);
        assert_eq!(ScanProgress::percent(1, 4), 25);
        assert_eq!(ScanProgress::percent(9, 4), 100);
        assert_eq!(ScanProgress::percent(0, 0), 100);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let snap = ScanProgress {
            status: ScanStatus::Exploring,
            files_processed: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["status"], "exploring");
        assert_eq!(json["filesProcessed"], 3);
        assert!(json["connectionErrors"].as_array().unwrap().is_empty());
    }
}
