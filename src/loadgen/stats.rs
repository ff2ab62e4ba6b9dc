//! Request statistics and the end-of-run report.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use serde::Serialize;

/// Counters for one task.
#[derive(Debug, Clone, Default)]
pub struct TaskStats {
    pub requests: u64,
    pub failures: u64,
    latencies: Vec<Duration>,
}

impl TaskStats {
    pub fn record(&mut self, latency: Duration, success: bool) {
        self.requests += 1;
        if !success {
            self.failures += 1;
        }
        self.latencies.push(latency);
    }

    pub fn merge(&mut self, other: &TaskStats) {
        self.requests += other.requests;
        self.failures += other.failures;
        self.latencies.extend_from_slice(&other.latencies);
    }

    /// Nearest-rank percentile, `p` in `[0, 1]`.
    pub fn percentile(&self, p: f64) -> Option<Duration> {
        percentile(&self.latencies, p)
    }

    pub fn average(&self) -> Option<Duration> {
        if self.latencies.is_empty() {
            return None;
        }
        let total: Duration = self.latencies.iter().sum();
        Some(total / self.latencies.len() as u32)
    }

    pub fn max(&self) -> Option<Duration> {
        self.latencies.iter().max().copied()
    }
}

fn percentile(latencies: &[Duration], p: f64) -> Option<Duration> {
    if latencies.is_empty() {
        return None;
    }
    let mut sorted = latencies.to_vec();
    sorted.sort_unstable();

    let rank = (p.clamp(0.0, 1.0) * sorted.len() as f64).ceil() as usize;
    Some(sorted[rank.saturating_sub(1).min(sorted.len() - 1)])
}

/// Outcome of a load run.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Stats keyed by task name.
    pub tasks: BTreeMap<String, TaskStats>,
    pub users_spawned: usize,
    pub elapsed: Duration,
}

impl LoadReport {
    pub fn total(&self) -> TaskStats {
        let mut total = TaskStats::default();
        for stats in self.tasks.values() {
            total.merge(stats);
        }
        total
    }

    pub fn requests_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.total().requests as f64 / secs
    }

    pub fn summary(&self) -> ReportSummary {
        let mut rows: Vec<RowSummary> = self
            .tasks
            .iter()
            .map(|(name, stats)| RowSummary::from_stats(name, stats))
            .collect();
        rows.push(RowSummary::from_stats("Aggregated", &self.total()));

        ReportSummary {
            users_spawned: self.users_spawned,
            elapsed_secs: self.elapsed.as_secs_f64(),
            requests_per_sec: self.requests_per_sec(),
            rows,
        }
    }

    /// Plain-text table in the spirit of Locust's summary.
    pub fn render(&self) -> String {
        let summary = self.summary();
        let mut out = String::new();

        let _ = writeln!(
            out,
            "{:<12} {:>8} {:>8} {:>9} {:>9} {:>9} {:>9} {:>9}",
            "Name", "# reqs", "# fails", "Avg(ms)", "Med(ms)", "95%(ms)", "99%(ms)", "Max(ms)"
        );
        let _ = writeln!(out, "{}", "-".repeat(82));
        for row in &summary.rows {
            let _ = writeln!(
                out,
                "{:<12} {:>8} {:>8} {:>9} {:>9} {:>9} {:>9} {:>9}",
                row.name,
                row.requests,
                format!("{}({:.1}%)", row.failures, row.failure_pct()),
                fmt_ms(row.avg_ms),
                fmt_ms(row.median_ms),
                fmt_ms(row.p95_ms),
                fmt_ms(row.p99_ms),
                fmt_ms(row.max_ms),
            );
        }
        let _ = writeln!(out, "{}", "-".repeat(82));
        let _ = writeln!(
            out,
            "Users: {}  Duration: {:.1}s  Requests/sec: {:.2}",
            summary.users_spawned, summary.elapsed_secs, summary.requests_per_sec
        );
        out
    }
}

fn fmt_ms(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |ms| format!("{:.0}", ms))
}

fn as_ms(d: Option<Duration>) -> Option<f64> {
    d.map(|d| d.as_secs_f64() * 1000.0)
}

/// Serializable form of the report (`loadgen --json`).
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub users_spawned: usize,
    pub elapsed_secs: f64,
    pub requests_per_sec: f64,
    pub rows: Vec<RowSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowSummary {
    pub name: String,
    pub requests: u64,
    pub failures: u64,
    pub avg_ms: Option<f64>,
    pub median_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub max_ms: Option<f64>,
}

impl RowSummary {
    fn from_stats(name: &str, stats: &TaskStats) -> Self {
        Self {
            name: name.to_string(),
            requests: stats.requests,
            failures: stats.failures,
            avg_ms: as_ms(stats.average()),
            median_ms: as_ms(stats.percentile(0.50)),
            p95_ms: as_ms(stats.percentile(0.95)),
            p99_ms: as_ms(stats.percentile(0.99)),
            max_ms: as_ms(stats.max()),
        }
    }

    pub fn failure_pct(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.failures as f64 * 100.0 / self.requests as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_nearest_rank_percentiles() {
        let mut stats = TaskStats::default();
        for v in (1..=100).rev() {
            stats.record(ms(v), true);
        }

        assert_eq!(stats.percentile(0.50), Some(ms(50)));
        assert_eq!(stats.percentile(0.95), Some(ms(95)));
        assert_eq!(stats.percentile(0.99), Some(ms(99)));
        assert_eq!(stats.percentile(0.0), Some(ms(1)));
        assert_eq!(stats.percentile(1.0), Some(ms(100)));
        assert_eq!(stats.max(), Some(ms(100)));
    }

    #[test]
    fn test_empty_stats() {
        let stats = TaskStats::default();
        assert_eq!(stats.percentile(0.5), None);
        assert_eq!(stats.average(), None);
    }

    #[test]
    fn test_report_totals_and_render() {
        let mut report = LoadReport {
            users_spawned: 2,
            elapsed: Duration::from_secs(2),
            ..LoadReport::default()
        };
        let fast = report.tasks.entry("fast".into()).or_default();
        fast.record(ms(10), true);
        fast.record(ms(30), true);
        let error = report.tasks.entry("error".into()).or_default();
        error.record(ms(5), false);

        let total = report.total();
        assert_eq!(total.requests, 3);
        assert_eq!(total.failures, 1);
        assert_eq!(report.requests_per_sec(), 1.5);

        let summary = report.summary();
        assert_eq!(summary.rows.last().unwrap().name, "Aggregated");
        assert_eq!(summary.rows[1].avg_ms, Some(20.0));

        let text = report.render();
        assert!(text.contains("Aggregated"));
        assert!(text.contains("1(100.0%)"));
        assert!(text.contains("Requests/sec: 1.50"));
    }
}
