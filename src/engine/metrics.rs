//! Engine run metrics.
//!
//! Simple per-run counters and timing, returned by
//! [`Template::run_with_metrics`](crate::Template::run_with_metrics).
//! The default [`Template::run`](crate::Template::run) path collects the
//! same counters but discards them.
//!
//! Unmatched input lines are expected during normal operation (headers,
//! banners, separators); `skipped_lines` exists so callers can observe how
//! much of the input a template actually consumed without treating skips as
//! errors.

use super::record::Table;
use std::time::Duration;

/// Counters and timing for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunMetrics {
    /// Total elapsed time for the run.
    pub total: Duration,
    /// Input lines seen.
    pub lines: usize,
    /// Lines matched by at least one rule.
    pub matched_lines: usize,
    /// Lines no rule matched (silently discarded).
    pub skipped_lines: usize,
    /// Records appended to the table.
    pub records: usize,
    /// Record attempts dropped by the `Required`/empty-row checks.
    pub records_filtered: usize,
}

/// Run output bundled with its metrics.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub table: Table,
    pub metrics: RunMetrics,
}
