//! Session statistics and scan overview.
//!
//! A quick summary of what the session knows: entry counts per type,
//! processed files, learned paths and the last scan's outcome. Used by
//! `lens stats` and `lens explore` to show that exploration actually reached
//! the repository's code.

use std::fmt::Write;

use crate::explorer::ExploreReport;
use crate::progress::{format_number, ScanStatus};
use crate::session::KnowledgeSession;

/// Render the statistics block printed by `lens stats` and `lens explore`.
pub fn render_stats(session: &KnowledgeSession, source: &str, report: Option<&ExploreReport>) -> String {
    let stats = session.stats();
    let progress = session.progress();
    let mut out = String::new();

    let _ = writeln!(out, "Repository Lens: Session Stats");
    let _ = writeln!(out, "==============================");
    let _ = writeln!(out);
    let _ = writeln!(out, "  Source:      {}", source);
    let _ = writeln!(out, "  Status:      {}", status_label(progress.status, session.is_degraded()));
    let _ = writeln!(out, "  Duration:    {}", format_duration_ms(progress.scan_duration));
    let _ = writeln!(out);
    let _ = writeln!(out, "  Entries:     {}", format_number(stats.total_entries));
    let _ = writeln!(out, "  Files:       {}", format_number(stats.processed_files));
    let _ = writeln!(out, "  Listings:    {}", format_number(progress.total_attempts));
    let _ = writeln!(out, "  Paths:       {}", session.patterns().len());

    if !stats.by_type.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  By type:");
        let _ = writeln!(out, "  {:<20} {:>8}", "TYPE", "ENTRIES");
        let _ = writeln!(out, "  {}", "-".repeat(29));
        let mut rows: Vec<_> = stats.by_type.iter().collect();
        rows.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (entry_type, count) in rows {
            let _ = writeln!(out, "  {:<20} {:>8}", entry_type.as_str(), format_number(*count));
        }
    }

    if !session.patterns().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  Learned paths:");
        for p in session.patterns() {
            let _ = writeln!(out, "    {}", if p.is_empty() { "/" } else { p.as_str() });
        }
    }

    if let Some(report) = report {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "  Scan:        {} candidates, {} modules, {} files, {} failed, {} errors",
            report.candidates.len(),
            report.modules.len(),
            report.processed_files(),
            report.failed_files(),
            report.error_count()
        );
    }

    if !progress.connection_errors.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  Unreachable ({}):", progress.connection_errors.len());
        for e in progress.connection_errors.iter().take(10) {
            let _ = writeln!(out, "    {}", e);
        }
        if progress.connection_errors.len() > 10 {
            let _ = writeln!(out, "    ... and {} more", progress.connection_errors.len() - 10);
        }
    }

    out
}

fn status_label(status: ScanStatus, degraded: bool) -> String {
    let base = match status {
        ScanStatus::Idle => "idle",
        ScanStatus::Exploring => "exploring",
        ScanStatus::Complete => "complete",
        ScanStatus::Error => "nothing found",
    };
    if degraded {
        format!("{} (using fallback dataset)", base)
    } else {
        base.to_string()
    }
}

/// Format milliseconds as `850 ms`, `2.4 s` or `1m 05s`.
fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{} ms", ms)
    } else if ms < 60_000 {
        format!("{:.1} s", ms as f64 / 1000.0)
    } else {
        let secs = ms / 1000;
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}
