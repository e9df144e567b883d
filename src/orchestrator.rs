//! Runs the independent project analyses and joins their results.
//!
//! Variable usage and dependency analysis are built in; compilation and I/O
//! mapping are supplied by the caller through [`ExternalAnalysis`].
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::dataflow::DataFlowOptions;
use crate::analysis::dependencies::{CallDepth, DependencyAnalysis, DependencyAnalyzer};
use crate::analysis::error::AnalysisError;
use crate::analysis::timings;
use crate::analysis::usage::{VariableUsageAnalysis, VariableUsageAnalyzer};
use crate::ast::SyntaxTree;
use crate::config::Config;
use crate::metrics::MetricsCollector;
use crate::qa::engine::panic_message;
use crate::qa::QAIssue;
use crate::session::ValidationSession;

/// Cooperative cancellation flag shared between the caller and running work.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub run_variable_analysis: bool,
    pub run_dependency_analysis: bool,
    pub run_compilation: bool,
    pub run_io_mapping: bool,
    pub parallel: bool,
    pub continue_on_error: bool,
    pub strict_initialization: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            run_variable_analysis: true,
            run_dependency_analysis: true,
            run_compilation: true,
            run_io_mapping: true,
            parallel: true,
            continue_on_error: true,
            strict_initialization: false,
        }
    }
}

impl AnalysisOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            parallel: cfg.parallel,
            continue_on_error: cfg.continue_on_error,
            strict_initialization: cfg.strict_initialization,
            ..Self::default()
        }
    }
}

/// Outcome of an out-of-process collaborator such as the PLC compiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub issues: Vec<QAIssue>,
}

impl ExternalReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

pub trait ExternalAnalysis: Send + Sync {
    fn name(&self) -> &str;
    fn run(&self, project_path: &str, trees: &[SyntaxTree]) -> anyhow::Result<ExternalReport>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    pub analysis: String,
    pub message: String,
}

impl From<AnalysisFailure> for AnalysisError {
    fn from(f: AnalysisFailure) -> Self {
        AnalysisError::SubAnalysisFailed { analysis: f.analysis, message: f.message }
    }
}

#[derive(Debug, Clone)]
pub struct ComprehensiveAnalysisResult {
    pub project_path: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub compilation: Option<ExternalReport>,
    pub variable_usage: Option<VariableUsageAnalysis>,
    pub dependencies: Option<DependencyAnalysis>,
    pub io_mapping: Option<ExternalReport>,
    pub failures: Vec<AnalysisFailure>,
    pub cancelled: bool,
}

impl ComprehensiveAnalysisResult {
    fn new(project_path: &str) -> Self {
        Self {
            project_path: project_path.to_string(),
            started_at: Utc::now(),
            completed_at: None,
            compilation: None,
            variable_usage: None,
            dependencies: None,
            io_mapping: None,
            failures: Vec::new(),
            cancelled: false,
        }
    }

    /// No compile or I/O errors, no uninitialised reads, no cycles and no failed analysis.
    /// Unused variables and dead code are warnings and do not count.
    pub fn is_success(&self) -> bool {
        let compiled = self.compilation.as_ref().map(ExternalReport::is_success).unwrap_or(true);
        let io_valid = self.io_mapping.as_ref().map(ExternalReport::is_success).unwrap_or(true);
        let critical = self.variable_usage.as_ref().map(|v| v.uninitialized.len()).unwrap_or(0)
            + self.dependencies.as_ref().map(|d| d.cycles.len()).unwrap_or(0);
        compiled && io_valid && critical == 0 && self.failures.is_empty() && !self.cancelled
    }

    pub fn total_issues(&self) -> usize {
        let external = |r: &Option<ExternalReport>| r.as_ref().map(|r| r.errors.len() + r.warnings.len()).unwrap_or(0);
        external(&self.compilation)
            + self.variable_usage.as_ref().map(VariableUsageAnalysis::total_issues).unwrap_or(0)
            + self.dependencies.as_ref().map(DependencyAnalysis::total_issues).unwrap_or(0)
            + external(&self.io_mapping)
    }

    fn compilation_score(&self) -> f64 {
        match &self.compilation {
            None => 100.0,
            Some(r) if !r.is_success() => (100.0 - r.errors.len() as f64 * 10.0).max(0.0),
            Some(r) => (100.0 - r.warnings.len() as f64 * 2.0).max(0.0),
        }
    }

    fn variable_score(&self) -> f64 {
        let Some(v) = &self.variable_usage else { return 100.0 };
        let penalty =
            v.unused.len() as f64 * 5.0 + v.uninitialized.len() as f64 * 10.0 + v.dead_code.len() as f64 * 3.0;
        (100.0 - penalty).max(0.0)
    }

    fn dependency_score(&self) -> f64 {
        let Some(d) = &self.dependencies else { return 100.0 };
        if !d.cycles.is_empty() {
            return (100.0 - d.cycles.len() as f64 * 15.0).max(0.0);
        }
        // deep call chains cost 2 points per level beyond 10
        match d.max_call_depth {
            CallDepth::Bounded(depth) => (100.0 - depth.saturating_sub(10) as f64 * 2.0).max(0.0),
            CallDepth::Undefined { .. } => 0.0,
        }
    }

    fn io_score(&self) -> f64 {
        match &self.io_mapping {
            None => 100.0,
            Some(r) => (100.0 - r.errors.len() as f64 * 10.0 - r.warnings.len() as f64 * 3.0).max(0.0),
        }
    }

    /// Weighted 0.30 compile / 0.25 variables / 0.25 dependencies / 0.20 I/O.
    /// An analysis that did not run scores 100.
    pub fn overall_quality_score(&self) -> f64 {
        self.compilation_score() * 0.30
            + self.variable_score() * 0.25
            + self.dependency_score() * 0.25
            + self.io_score() * 0.20
    }

    pub fn summary(&self) -> String {
        if self.is_success() {
            return format!("All analyses passed. Quality score: {:.1}/100", self.overall_quality_score());
        }
        let mut out = format!("{} issue(s) found", self.total_issues());
        if let Some(c) = self.compilation.as_ref().filter(|c| !c.is_success()) {
            out.push_str(&format!(" (compile errors: {})", c.errors.len()));
        }
        if let Some(v) = self.variable_usage.as_ref().filter(|v| v.total_issues() > 0) {
            out.push_str(&format!(" (variable issues: {})", v.total_issues()));
        }
        if let Some(d) = self.dependencies.as_ref().filter(|d| !d.cycles.is_empty()) {
            out.push_str(&format!(" (circular references: {})", d.cycles.len()));
        }
        if !self.failures.is_empty() {
            out.push_str(&format!(" (failed analyses: {})", self.failures.len()));
        }
        if self.cancelled {
            out.push_str(" (cancelled)");
        }
        out
    }

    /// Every finding of the built-in analyses as issues.
    pub fn issues(&self) -> Vec<QAIssue> {
        let mut issues = Vec::new();
        for report in [&self.compilation, &self.io_mapping].into_iter().flatten() {
            issues.extend(report.issues.iter().cloned());
        }
        if let Some(v) = &self.variable_usage {
            issues.extend(v.to_issues());
        }
        if let Some(d) = &self.dependencies {
            issues.extend(d.to_issues());
        }
        issues
    }

    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }
}

/// Per-file results of [`AdvancedAnalyzerOrchestrator::analyze_files`].
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub file_path: String,
    pub variable_usage: VariableUsageAnalysis,
    pub dependencies: DependencyAnalysis,
}

#[derive(Debug, Clone, Default)]
pub struct FileBatch {
    pub results: Vec<FileAnalysis>,
    pub total: usize,
    pub cancelled: bool,
}

impl FileBatch {
    pub fn ensure_complete(&self) -> Result<(), AnalysisError> {
        if self.cancelled {
            return Err(AnalysisError::Cancelled { completed: self.results.len(), total: self.total });
        }
        Ok(())
    }
}

type Outcome<T> = Option<Result<T, AnalysisFailure>>;

pub struct AdvancedAnalyzerOrchestrator {
    options: AnalysisOptions,
    compiler: Option<Box<dyn ExternalAnalysis>>,
    io_mapping: Option<Box<dyn ExternalAnalysis>>,
    metrics: Option<Arc<MetricsCollector>>,
    entry_points: Vec<String>,
}

impl AdvancedAnalyzerOrchestrator {
    pub fn new(options: AnalysisOptions) -> Self {
        Self { options, compiler: None, io_mapping: None, metrics: None, entry_points: Vec::new() }
    }

    pub fn with_compiler(mut self, compiler: Box<dyn ExternalAnalysis>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub fn with_io_mapping(mut self, io: Box<dyn ExternalAnalysis>) -> Self {
        self.io_mapping = Some(io);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// POU names that count as called even without a caller in the project.
    pub fn with_entry_points(mut self, names: Vec<String>) -> Self {
        self.entry_points = names;
        self
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    fn usage_analyzer(&self) -> VariableUsageAnalyzer {
        VariableUsageAnalyzer {
            options: DataFlowOptions { strict_initialization: self.options.strict_initialization },
            parallel: self.options.parallel,
            entry_points: self.entry_points.clone(),
            per_file: false,
        }
    }

    /// Runs one sub-analysis, turning a panic into a recorded failure.
    fn guarded<T>(&self, name: &str, token: &CancellationToken, f: impl FnOnce() -> T) -> Option<Result<T, AnalysisFailure>> {
        if token.is_cancelled() {
            debug!(analysis = name, "skipped after cancellation");
            return None;
        }
        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| timings::timed(name, f)))
            .map_err(|payload| AnalysisFailure { analysis: name.to_string(), message: panic_message(payload) });
        if let Some(metrics) = &self.metrics {
            metrics.record_execution_time(name, start.elapsed());
        }
        Some(outcome)
    }

    fn run_external(
        &self,
        name: &str,
        external: Option<&dyn ExternalAnalysis>,
        project_path: &str,
        trees: &[SyntaxTree],
        token: &CancellationToken,
    ) -> Outcome<ExternalReport> {
        let external = external?;
        let outcome = self.guarded(name, token, || external.run(project_path, trees))?;
        Some(match outcome {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(e)) => Err(AnalysisFailure { analysis: name.to_string(), message: format!("{e:#}") }),
            Err(failure) => Err(failure),
        })
    }

    fn run_variables(&self, project_path: &str, trees: &[SyntaxTree], token: &CancellationToken) -> Outcome<VariableUsageAnalysis> {
        if !self.options.run_variable_analysis {
            return None;
        }
        let analyzer = self.usage_analyzer();
        self.guarded("variable_usage", token, || analyzer.analyze_cancellable(project_path, trees, token))
    }

    fn run_dependencies(&self, trees: &[SyntaxTree], token: &CancellationToken) -> Outcome<DependencyAnalysis> {
        if !self.options.run_dependency_analysis {
            return None;
        }
        let analyzer = DependencyAnalyzer::new(self.options.parallel);
        self.guarded("dependencies", token, || analyzer.analyze_cancellable(trees, token))
    }

    fn run_compilation(&self, project_path: &str, trees: &[SyntaxTree], token: &CancellationToken) -> Outcome<ExternalReport> {
        if !self.options.run_compilation {
            return None;
        }
        self.run_external("compilation", self.compiler.as_deref(), project_path, trees, token)
    }

    fn run_io(&self, project_path: &str, trees: &[SyntaxTree], token: &CancellationToken) -> Outcome<ExternalReport> {
        if !self.options.run_io_mapping {
            return None;
        }
        self.run_external("io_mapping", self.io_mapping.as_deref(), project_path, trees, token)
    }

    fn record_failure(&self, result: &mut ComprehensiveAnalysisResult, failure: AnalysisFailure) {
        warn!(analysis = %failure.analysis, error = %failure.message, "analysis failed");
        if let Some(metrics) = &self.metrics {
            metrics.record_analysis_failure();
        }
        result.failures.push(failure);
    }

    fn store<T>(&self, result: &mut ComprehensiveAnalysisResult, outcome: Outcome<T>, slot: impl FnOnce(&mut ComprehensiveAnalysisResult, T)) {
        match outcome {
            Some(Ok(value)) => slot(result, value),
            Some(Err(failure)) => self.record_failure(result, failure),
            None => {}
        }
    }

    pub fn analyze(&self, project_path: &str, trees: &[SyntaxTree]) -> Result<ComprehensiveAnalysisResult, AnalysisError> {
        self.analyze_cancellable(project_path, trees, &CancellationToken::new())
    }

    /// Failures are collected on the result under continue-on-error; otherwise the
    /// first one is returned as [`AnalysisError::SubAnalysisFailed`].
    pub fn analyze_cancellable(
        &self,
        project_path: &str,
        trees: &[SyntaxTree],
        token: &CancellationToken,
    ) -> Result<ComprehensiveAnalysisResult, AnalysisError> {
        let start = Instant::now();
        info!(project = %project_path, files = trees.len(), parallel = self.options.parallel, "analysis started");
        let mut result = ComprehensiveAnalysisResult::new(project_path);

        if self.options.parallel {
            let ((compile, variables), (deps, io)) = rayon::join(
                || {
                    rayon::join(
                        || self.run_compilation(project_path, trees, token),
                        || self.run_variables(project_path, trees, token),
                    )
                },
                || rayon::join(|| self.run_dependencies(trees, token), || self.run_io(project_path, trees, token)),
            );
            self.store(&mut result, compile, |r, v| r.compilation = Some(v));
            self.store(&mut result, variables, |r, v| r.variable_usage = Some(v));
            self.store(&mut result, deps, |r, v| r.dependencies = Some(v));
            self.store(&mut result, io, |r, v| r.io_mapping = Some(v));
            if !self.options.continue_on_error {
                if let Some(first) = result.failures.first() {
                    return Err(first.clone().into());
                }
            }
        } else {
            let stop = |result: &ComprehensiveAnalysisResult| {
                if self.options.continue_on_error {
                    return None;
                }
                result.failures.first().cloned().map(AnalysisError::from)
            };
            let compile = self.run_compilation(project_path, trees, token);
            self.store(&mut result, compile, |r, v| r.compilation = Some(v));
            if let Some(e) = stop(&result) {
                return Err(e);
            }
            let variables = self.run_variables(project_path, trees, token);
            self.store(&mut result, variables, |r, v| r.variable_usage = Some(v));
            if let Some(e) = stop(&result) {
                return Err(e);
            }
            let deps = self.run_dependencies(trees, token);
            self.store(&mut result, deps, |r, v| r.dependencies = Some(v));
            if let Some(e) = stop(&result) {
                return Err(e);
            }
            let io = self.run_io(project_path, trees, token);
            self.store(&mut result, io, |r, v| r.io_mapping = Some(v));
            if let Some(e) = stop(&result) {
                return Err(e);
            }
        }

        let partial = result.variable_usage.as_ref().is_some_and(|v| v.partial)
            || result.dependencies.as_ref().is_some_and(|d| d.partial);
        result.cancelled = token.is_cancelled() || partial;
        if let Some(metrics) = &self.metrics {
            for _ in trees {
                metrics.record_file_analyzed();
            }
            metrics.record_execution_time("orchestrator", start.elapsed());
        }
        result.complete();
        info!(
            project = %project_path,
            elapsed_ms = start.elapsed().as_millis() as u64,
            issues = result.total_issues(),
            failures = result.failures.len(),
            cancelled = result.cancelled,
            "analysis complete"
        );
        Ok(result)
    }

    /// Runs the analyses over the session's trees and attaches the results to it.
    pub fn analyze_session(&self, session: &mut ValidationSession) -> Result<ComprehensiveAnalysisResult, AnalysisError> {
        let result = self.analyze(&session.project_path, &session.syntax_trees)?;
        session.add_violations(result.issues());
        session.variable_analysis = result.variable_usage.clone();
        session.dependency_analysis = result.dependencies.clone();
        Ok(result)
    }

    /// Analyses each file on its own; cancellation stops before the next file
    /// and keeps the results already produced. Unused globals and uncalled
    /// functions need the whole project and are left to [`Self::analyze`].
    pub fn analyze_files(&self, trees: &[SyntaxTree], token: &CancellationToken) -> FileBatch {
        let usage = VariableUsageAnalyzer { parallel: false, per_file: true, ..self.usage_analyzer() };
        let deps = DependencyAnalyzer::new(false);
        let mut batch = FileBatch { results: Vec::with_capacity(trees.len()), total: trees.len(), cancelled: false };
        for tree in trees {
            if token.is_cancelled() {
                batch.cancelled = true;
                info!(completed = batch.results.len(), total = batch.total, "file analysis cancelled");
                break;
            }
            let single = std::slice::from_ref(tree);
            batch.results.push(FileAnalysis {
                file_path: tree.file_path.clone(),
                variable_usage: usage.analyze(&tree.file_path, single),
                dependencies: deps.analyze(single),
            });
            if let Some(metrics) = &self.metrics {
                metrics.record_file_analyzed();
            }
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn empty_result_scores_full_marks() {
        let result = ComprehensiveAnalysisResult::new("proj");
        assert!(result.is_success());
        assert_eq!(result.total_issues(), 0);
        assert!((result.overall_quality_score() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn failed_compilation_is_weighted() {
        let mut result = ComprehensiveAnalysisResult::new("proj");
        result.compilation = Some(ExternalReport { errors: vec!["E1".into(), "E2".into()], ..Default::default() });
        // 80 * 0.30 + 100 * 0.70
        assert!((result.overall_quality_score() - 94.0).abs() < 1e-9);
        assert!(!result.is_success());
        assert!(result.summary().contains("compile errors: 2"));
    }
}
