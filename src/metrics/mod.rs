/// Run metrics for the analysis engine
/// Counts rule executions, checker failures and issues, and keeps per-analysis timings
use anyhow::Result;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::qa::{RuleRunReport, Severity};

const MAX_SAMPLES: usize = 1000;

/// Thread-safe metrics collector; share it behind an `Arc`.
pub struct MetricsCollector {
    // Performance metrics
    execution_times: DashMap<String, Vec<Duration>>,

    // Rule engine
    rule_runs: AtomicU64,
    rules_executed: AtomicU64,
    changes_examined: AtomicU64,
    checker_failures: AtomicU64,
    failures_by_rule: DashMap<String, AtomicU64>,

    // Findings
    issues_by_severity: DashMap<Severity, AtomicU64>,
    issues_by_rule: DashMap<String, AtomicU64>,

    // Analyses
    files_analyzed: AtomicU64,
    analyses_failed: AtomicU64,

    started: Instant,
}

/// Point-in-time view for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub rule_runs: u64,
    pub rules_executed: u64,
    pub changes_examined: u64,
    pub checker_failures: u64,
    pub failures_by_rule: BTreeMap<String, u64>,
    pub issues_by_severity: BTreeMap<String, u64>,
    pub top_rules: Vec<RuleFrequency>,
    pub files_analyzed: u64,
    pub analyses_failed: u64,
    pub timings: Vec<OperationTiming>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleFrequency {
    pub rule_id: String,
    pub count: u64,
    pub percentage: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationTiming {
    pub operation: String,
    pub count: u64,
    pub average_ms: f32,
    pub p95_ms: f32,
    pub max_ms: f32,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn bump<K: std::hash::Hash + Eq>(map: &DashMap<K, AtomicU64>, key: K, by: u64) {
    map.entry(key).or_insert_with(|| AtomicU64::new(0)).fetch_add(by, Ordering::Relaxed);
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            execution_times: DashMap::new(),
            rule_runs: AtomicU64::new(0),
            rules_executed: AtomicU64::new(0),
            changes_examined: AtomicU64::new(0),
            checker_failures: AtomicU64::new(0),
            failures_by_rule: DashMap::new(),
            issues_by_severity: DashMap::new(),
            issues_by_rule: DashMap::new(),
            files_analyzed: AtomicU64::new(0),
            analyses_failed: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Record execution time for an operation
    pub fn record_execution_time(&self, operation: &str, duration: Duration) {
        let mut times = self
            .execution_times
            .entry(operation.to_string())
            .or_default();

        // Keep only the most recent samples
        if times.len() >= MAX_SAMPLES {
            times.remove(0);
        }
        times.push(duration);
    }

    /// Fold one rule-engine run into the counters.
    pub fn record_rule_run(&self, report: &RuleRunReport) {
        self.rule_runs.fetch_add(1, Ordering::Relaxed);
        self.rules_executed.fetch_add(report.rules_run as u64, Ordering::Relaxed);
        self.changes_examined.fetch_add(report.changes_examined as u64, Ordering::Relaxed);
        self.checker_failures.fetch_add(report.failures.len() as u64, Ordering::Relaxed);
        for failure in &report.failures {
            bump(&self.failures_by_rule, failure.rule_id.clone(), 1);
        }
        for issue in &report.issues {
            bump(&self.issues_by_severity, issue.severity, 1);
            bump(&self.issues_by_rule, issue.rule_id.clone(), 1);
        }
        let elapsed = u64::try_from(report.elapsed_ms).unwrap_or(u64::MAX);
        self.record_execution_time("rule_engine", Duration::from_millis(elapsed));
    }

    pub fn record_file_analyzed(&self) {
        self.files_analyzed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_analysis_failure(&self) {
        self.analyses_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn issues_with_severity(&self, severity: Severity) -> u64 {
        self.issues_by_severity
            .get(&severity)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn checker_failures(&self) -> u64 {
        self.checker_failures.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let failures_by_rule = self
            .failures_by_rule
            .iter()
            .map(|e| (e.key().clone(), e.value().load(Ordering::Relaxed)))
            .collect();
        let issues_by_severity = self
            .issues_by_severity
            .iter()
            .map(|e| (e.key().to_string(), e.value().load(Ordering::Relaxed)))
            .collect();

        let mut top_rules: Vec<RuleFrequency> = self
            .issues_by_rule
            .iter()
            .map(|e| RuleFrequency { rule_id: e.key().clone(), count: e.value().load(Ordering::Relaxed), percentage: 0.0 })
            .collect();
        let total: u64 = top_rules.iter().map(|r| r.count).sum();
        for rule in &mut top_rules {
            rule.percentage = if total > 0 { rule.count as f32 / total as f32 * 100.0 } else { 0.0 };
        }
        top_rules.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.rule_id.cmp(&b.rule_id)));
        top_rules.truncate(10);

        let mut timings: Vec<OperationTiming> = self
            .execution_times
            .iter()
            .filter(|e| !e.value().is_empty())
            .map(|e| {
                let mut ms: Vec<f32> = e.value().iter().map(|d| d.as_secs_f32() * 1000.0).collect();
                ms.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let p95_idx = ((ms.len() as f32 * 0.95) as usize).min(ms.len() - 1);
                OperationTiming {
                    operation: e.key().clone(),
                    count: ms.len() as u64,
                    average_ms: ms.iter().sum::<f32>() / ms.len() as f32,
                    p95_ms: ms[p95_idx],
                    max_ms: ms[ms.len() - 1],
                }
            })
            .collect();
        // slowest first
        timings.sort_by(|a, b| b.average_ms.partial_cmp(&a.average_ms).unwrap_or(std::cmp::Ordering::Equal));

        MetricsSnapshot {
            timestamp: Utc::now(),
            uptime_seconds: self.started.elapsed().as_secs(),
            rule_runs: self.rule_runs.load(Ordering::Relaxed),
            rules_executed: self.rules_executed.load(Ordering::Relaxed),
            changes_examined: self.changes_examined.load(Ordering::Relaxed),
            checker_failures: self.checker_failures.load(Ordering::Relaxed),
            failures_by_rule,
            issues_by_severity,
            top_rules,
            files_analyzed: self.files_analyzed.load(Ordering::Relaxed),
            analyses_failed: self.analyses_failed.load(Ordering::Relaxed),
            timings,
        }
    }

    /// Export metrics to JSON format
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.snapshot()).map_err(Into::into)
    }

    /// Reset all metrics (useful for testing)
    pub fn reset(&self) {
        self.execution_times.clear();
        self.rule_runs.store(0, Ordering::Relaxed);
        self.rules_executed.store(0, Ordering::Relaxed);
        self.changes_examined.store(0, Ordering::Relaxed);
        self.checker_failures.store(0, Ordering::Relaxed);
        self.failures_by_rule.clear();
        self.issues_by_severity.clear();
        self.issues_by_rule.clear();
        self.files_analyzed.store(0, Ordering::Relaxed);
        self.analyses_failed.store(0, Ordering::Relaxed);
    }
}

/// Time a block and record it under `$operation` on `$collector`.
#[macro_export]
macro_rules! record_execution_time {
    ($collector:expr, $operation:expr, $code:block) => {{
        let start = std::time::Instant::now();
        let result = $code;
        $collector.record_execution_time($operation, start.elapsed());
        result
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qa::{CheckerFailure, ChangeKind, QAIssue};
    use std::sync::Arc;
    use std::thread;

    fn report() -> RuleRunReport {
        RuleRunReport {
            issues: vec![
                QAIssue::new("QA001", Severity::Critical, "Type Safety", "a"),
                QAIssue::new("QA007", Severity::Warning, "Code Quality", "b"),
                QAIssue::new("QA007", Severity::Warning, "Code Quality", "c"),
            ],
            failures: vec![CheckerFailure { rule_id: "QA009".into(), kind: ChangeKind::Logic, message: "boom".into() }],
            rules_run: 21,
            changes_examined: 4,
            elapsed_ms: 3,
            cancelled: false,
        }
    }

    #[test]
    fn test_record_rule_run() {
        let metrics = MetricsCollector::new();
        metrics.record_rule_run(&report());
        let snap = metrics.snapshot();
        assert_eq!(snap.rule_runs, 1);
        assert_eq!(snap.rules_executed, 21);
        assert_eq!(snap.checker_failures, 1);
        assert_eq!(metrics.issues_with_severity(Severity::Warning), 2);
        assert_eq!(snap.top_rules[0].rule_id, "QA007");
        assert_eq!(snap.failures_by_rule.get("QA009"), Some(&1));
    }

    #[test]
    fn test_memory_limits() {
        let metrics = MetricsCollector::new();
        for _ in 0..(MAX_SAMPLES + 50) {
            metrics.record_execution_time("op", Duration::from_millis(1));
        }
        let snap = metrics.snapshot();
        assert_eq!(snap.timings[0].count, MAX_SAMPLES as u64);
    }

    #[test]
    fn test_concurrent_access() {
        let metrics = Arc::new(MetricsCollector::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.record_rule_run(&report());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.snapshot().rule_runs, 800);
        assert_eq!(metrics.checker_failures(), 800);
    }

    #[test]
    fn test_reset_functionality() {
        let metrics = MetricsCollector::new();
        metrics.record_rule_run(&report());
        metrics.record_file_analyzed();
        metrics.reset();
        let snap = metrics.snapshot();
        assert_eq!(snap.rule_runs, 0);
        assert_eq!(snap.files_analyzed, 0);
        assert!(snap.timings.is_empty());
        assert!(metrics.export_json().unwrap().contains("\"rule_runs\": 0"));
    }
}
