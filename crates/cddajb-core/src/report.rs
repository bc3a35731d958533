//! Rolling log of rebuild reports.
//!
//! Each rebuild writes a free-text report: when it started, what it was
//! configured with, which files were skipped or failed, totals, and when it
//! finished. Only the most recent [`MAX_REPORTS`] reports are kept. The
//! report of a rebuild in progress is visible as the first entry.

use chrono::Local;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Number of reports retained.
pub const MAX_REPORTS: usize = 3;

/// Bounded ring of rebuild reports, most recent first.
#[derive(Debug, Default)]
pub struct RebuildLog {
    reports: Mutex<VecDeque<String>>,
}

impl RebuildLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new report, dropping the oldest if the ring is full.
    pub fn start(&self) {
        let mut reports = self.reports.lock();
        if reports.len() == MAX_REPORTS {
            reports.pop_back();
        }
        reports.push_front(String::new());
        drop(reports);

        self.line(format!("Parse started at {}", timestamp()));
    }

    /// Close the current report.
    pub fn finish(&self) {
        self.line(format!("Parse finished at {}", timestamp()));
    }

    /// Append a line to the current report.
    pub fn line(&self, msg: impl AsRef<str>) {
        let mut reports = self.reports.lock();
        if reports.is_empty() {
            reports.push_front(String::new());
        }
        if let Some(current) = reports.front_mut() {
            current.push_str(msg.as_ref());
            current.push('\n');
        }
    }

    /// All retained reports, most recent first.
    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S %z").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lines() {
        let log = RebuildLog::new();
        log.start();
        log.line("Update info: v1");
        log.finish();

        let reports = log.reports();
        assert_eq!(reports.len(), 1);
        let lines: Vec<_> = reports[0].lines().collect();
        assert!(lines[0].starts_with("Parse started at "));
        assert_eq!(lines[1], "Update info: v1");
        assert!(lines[2].starts_with("Parse finished at "));
    }

    #[test]
    fn test_keeps_three_most_recent() {
        let log = RebuildLog::new();
        for i in 0..5 {
            log.start();
            log.line(format!("run {i}"));
        }

        let reports = log.reports();
        assert_eq!(reports.len(), MAX_REPORTS);
        assert!(reports[0].contains("run 4"));
        assert!(reports[1].contains("run 3"));
        assert!(reports[2].contains("run 2"));
    }

    #[test]
    fn test_line_without_start_opens_report() {
        let log = RebuildLog::new();
        assert!(log.is_empty());
        log.line("orphan");
        assert_eq!(log.reports(), vec!["orphan\n".to_string()]);
    }
}
