//! Rule registry and runner.
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::catalog;
use super::changes::{ChangeKind, ChangeSet, DataTypeChange, LogicChange, VariableChange};
use super::checker::QaRuleChecker;
use super::error::QaError;
use super::issue::QAIssue;
use super::rules;
use crate::analysis::timings;
use crate::config::{Config, RuleThresholds};
use crate::metrics::MetricsCollector;
use crate::orchestrator::CancellationToken;

/// What to do when a checker panics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Drop that checker's contribution for the change, record the failure, keep going.
    #[default]
    SkipAndContinue,
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerFailure {
    pub rule_id: String,
    pub kind: ChangeKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleRunReport {
    pub issues: Vec<QAIssue>,
    pub failures: Vec<CheckerFailure>,
    pub rules_run: usize,
    pub changes_examined: usize,
    pub elapsed_ms: u128,
    /// The run stopped early; `issues` holds what the finished rules found.
    pub cancelled: bool,
}

/// Registry of rule checkers.
pub struct QaRuleEngine {
    rules: Vec<Box<dyn QaRuleChecker>>,
    disabled: HashSet<String>,
    policy: FailurePolicy,
    metrics: Option<std::sync::Arc<MetricsCollector>>,
}

impl Default for QaRuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QaRuleEngine {
    /// Engine with the hand-written rules and the enabled catalogue rules.
    pub fn new() -> Self {
        Self::with_thresholds(&RuleThresholds::default())
    }

    pub fn with_thresholds(thresholds: &RuleThresholds) -> Self {
        let mut engine = Self::empty();
        engine.register_default_rules(thresholds);
        engine
    }

    pub fn from_config(cfg: &Config) -> Self {
        let mut engine = Self::with_thresholds(&cfg.thresholds);
        engine.policy = cfg.failure_policy;
        for id in &cfg.disabled_rules {
            engine.disable_rule(id);
        }
        engine
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new(), disabled: HashSet::new(), policy: FailurePolicy::default(), metrics: None }
    }

    fn register_default_rules(&mut self, thresholds: &RuleThresholds) {
        for rule in rules::default_rules(thresholds) {
            self.register(rule);
        }
        for rule in catalog::default_rules() {
            self.register(rule);
        }
    }

    /// Duplicate ids are accepted; deduplication is a separate step.
    pub fn register(&mut self, rule: Box<dyn QaRuleChecker>) {
        self.rules.push(rule);
    }

    pub fn set_failure_policy(&mut self, policy: FailurePolicy) {
        self.policy = policy;
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn attach_metrics(&mut self, metrics: std::sync::Arc<MetricsCollector>) {
        self.metrics = Some(metrics);
    }

    pub fn disable_rule(&mut self, rule_id: &str) {
        self.disabled.insert(rule_id.to_ascii_uppercase());
    }

    pub fn enable_rule(&mut self, rule_id: &str) {
        self.disabled.remove(&rule_id.to_ascii_uppercase());
    }

    pub fn is_enabled(&self, rule_id: &str) -> bool {
        !self.disabled.contains(&rule_id.to_ascii_uppercase())
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn QaRuleChecker> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    fn enabled_rules(&self) -> Vec<&dyn QaRuleChecker> {
        self.rules
            .iter()
            .map(|r| r.as_ref())
            .filter(|r| self.is_enabled(r.rule_id()))
            .collect()
    }

    pub fn check_variable_changes(&self, changes: &[VariableChange]) -> Result<RuleRunReport, QaError> {
        self.analyze(&ChangeSet { variable_changes: changes.to_vec(), ..Default::default() })
    }

    pub fn check_logic_changes(&self, changes: &[LogicChange]) -> Result<RuleRunReport, QaError> {
        self.analyze(&ChangeSet { logic_changes: changes.to_vec(), ..Default::default() })
    }

    pub fn check_data_type_changes(&self, changes: &[DataTypeChange]) -> Result<RuleRunReport, QaError> {
        self.analyze(&ChangeSet { data_type_changes: changes.to_vec(), ..Default::default() })
    }

    /// Run every enabled rule over every change, sequentially.
    pub fn analyze(&self, changes: &ChangeSet) -> Result<RuleRunReport, QaError> {
        self.analyze_cancellable(changes, &CancellationToken::new())
    }

    /// Like [`analyze`](Self::analyze), checking `token` before each rule.
    /// Rules that finished before cancellation keep their findings.
    pub fn analyze_cancellable(&self, changes: &ChangeSet, token: &CancellationToken) -> Result<RuleRunReport, QaError> {
        let started = Instant::now();
        let rules = self.enabled_rules();
        let mut outcomes = Vec::with_capacity(rules.len());
        let mut cancelled = false;
        for rule in &rules {
            if token.is_cancelled() {
                cancelled = true;
                tracing::info!(completed = outcomes.len(), total = rules.len(), "rule run cancelled");
                break;
            }
            outcomes.push(run_rule(*rule, changes, self.policy)?);
        }
        let rules_run = outcomes.len();
        let mut report = self.finish(outcomes, rules_run, changes, started);
        report.cancelled = cancelled;
        Ok(report)
    }

    /// Same result set as [`analyze`](Self::analyze), rules fanned out on rayon.
    pub fn analyze_parallel(&self, changes: &ChangeSet) -> Result<RuleRunReport, QaError> {
        let started = Instant::now();
        let rules = self.enabled_rules();
        let policy = self.policy;
        let outcomes = rules
            .par_iter()
            .map(|rule| run_rule(*rule, changes, policy))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.finish(outcomes, rules.len(), changes, started))
    }

    fn finish(&self, outcomes: Vec<RuleOutcome>, rules_run: usize, changes: &ChangeSet, started: Instant) -> RuleRunReport {
        let mut report = RuleRunReport { rules_run, changes_examined: changes.len(), ..Default::default() };
        for outcome in outcomes {
            report.issues.extend(outcome.issues);
            report.failures.extend(outcome.failures);
        }
        sort_issues(&mut report.issues);
        report.elapsed_ms = started.elapsed().as_millis();
        timings::record("qa_rules", report.elapsed_ms);

        if let Some(metrics) = &self.metrics {
            metrics.record_rule_run(&report);
        }
        tracing::debug!(
            rules = rules_run,
            changes = report.changes_examined,
            issues = report.issues.len(),
            failures = report.failures.len(),
            elapsed_ms = report.elapsed_ms as u64,
            "rule run finished"
        );
        report
    }
}

/// Critical first, then file, then line.
pub fn sort_issues(issues: &mut [QAIssue]) {
    issues.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.file_path.cmp(&b.file_path))
            .then_with(|| a.line.cmp(&b.line))
            .then_with(|| a.rule_id.cmp(&b.rule_id))
    });
}

/// Drop repeated (file, line, rule id) findings, keeping the first.
pub fn deduplicate(issues: Vec<QAIssue>) -> Vec<QAIssue> {
    let mut seen = HashSet::new();
    issues
        .into_iter()
        .filter(|i| seen.insert((i.file_path.clone(), i.line, i.rule_id.clone())))
        .collect()
}

struct RuleOutcome {
    issues: Vec<QAIssue>,
    failures: Vec<CheckerFailure>,
}

pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "checker panicked".to_string()
    }
}

fn guarded<F>(rule: &dyn QaRuleChecker, kind: ChangeKind, policy: FailurePolicy, out: &mut RuleOutcome, f: F) -> Result<(), QaError>
where
    F: FnOnce() -> Vec<QAIssue>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(issues) => {
            out.issues.extend(issues);
            Ok(())
        }
        Err(payload) => {
            let message = panic_message(payload);
            if policy == FailurePolicy::Abort {
                tracing::error!(rule_id = %rule.rule_id(), ?kind, %message, "rule failed, aborting run");
                return Err(QaError::RunAborted { rule_id: rule.rule_id().to_string(), message });
            }
            tracing::warn!(rule_id = %rule.rule_id(), ?kind, %message, "rule failed, skipping its contribution");
            out.failures.push(CheckerFailure { rule_id: rule.rule_id().to_string(), kind, message });
            Ok(())
        }
    }
}

fn run_rule(rule: &dyn QaRuleChecker, changes: &ChangeSet, policy: FailurePolicy) -> Result<RuleOutcome, QaError> {
    let mut out = RuleOutcome { issues: Vec::new(), failures: Vec::new() };
    for change in &changes.variable_changes {
        guarded(rule, ChangeKind::Variable, policy, &mut out, || rule.check_variable_change(change))?;
    }
    for change in &changes.logic_changes {
        guarded(rule, ChangeKind::Logic, policy, &mut out, || rule.check_logic_change(change))?;
    }
    for change in &changes.data_type_changes {
        guarded(rule, ChangeKind::DataType, policy, &mut out, || rule.check_data_type_change(change))?;
    }
    if !changes.is_empty() {
        guarded(rule, ChangeKind::ChangeSet, policy, &mut out, || rule.check_change_set(changes))?;
    }
    Ok(out)
}

impl From<&CheckerFailure> for QaError {
    fn from(f: &CheckerFailure) -> Self {
        QaError::CheckerFailed { rule_id: f.rule_id.clone(), kind: f.kind, message: f.message.clone() }
    }
}
