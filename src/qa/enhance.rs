//! Turns raw rule output into confidence-scored, suppression-aware issues.
use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::error::QaError;
use super::issue::{AnalysisLevel, EnhancedQAIssue, Feedback, FeedbackAction, QAIssue, Severity};
use super::suppression::SuppressionChecker;
use crate::analysis::confidence::{
    count_similar, rule_kind_for, AstAnalysisSignals, ConfidenceCalculator, ConfidenceLevel, SimilarityKey,
};
use crate::ast::SyntaxTree;
use crate::config::Config;

pub struct QaEnhancer {
    calculator: ConfidenceCalculator,
    similarity: SimilarityKey,
    disabled_rules: Vec<String>,
}

impl Default for QaEnhancer {
    fn default() -> Self {
        Self::new()
    }
}

impl QaEnhancer {
    pub fn new() -> Self {
        Self { calculator: ConfidenceCalculator::new(), similarity: SimilarityKey::default(), disabled_rules: Vec::new() }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self {
            calculator: ConfidenceCalculator::new(),
            similarity: cfg.similarity,
            disabled_rules: cfg.disabled_rules.clone(),
        }
    }

    pub fn with_similarity(mut self, key: SimilarityKey) -> Self {
        self.similarity = key;
        self
    }

    /// Score and suppression-check every issue. `source_by_file` maps file paths to
    /// their text; issues in files without an entry are only config-suppressed.
    pub fn enhance(&self, issues: &[QAIssue], source_by_file: &HashMap<String, String>) -> Vec<EnhancedQAIssue> {
        self.enhance_with_trees(issues, source_by_file, &[])
    }

    /// Like [`enhance`](Self::enhance), and issues in a tree with parse errors get
    /// the ambiguous-context signal.
    pub fn enhance_with_trees(
        &self,
        issues: &[QAIssue],
        source_by_file: &HashMap<String, String>,
        trees: &[SyntaxTree],
    ) -> Vec<EnhancedQAIssue> {
        let similar = count_similar(issues, self.similarity);
        let checkers: HashMap<&str, SuppressionChecker> = source_by_file
            .iter()
            .map(|(path, source)| {
                let checker = SuppressionChecker::new(source).with_disabled_rules(&self.disabled_rules);
                (path.as_str(), checker)
            })
            .collect();
        let fallback = SuppressionChecker::default().with_disabled_rules(&self.disabled_rules);
        let trees: HashMap<&str, &SyntaxTree> = trees.iter().map(|t| (t.file_path.as_str(), t)).collect();

        let enhanced: Vec<EnhancedQAIssue> = issues
            .iter()
            .zip(similar)
            .map(|(issue, similar_count)| {
                let mut signals = self.signals_for(issue).similar(similar_count);
                if let Some(tree) = trees.get(issue.file_path.as_str()) {
                    signals = signals.with_tree(tree);
                }
                let result = self.calculator.calculate(Some(&signals), Some(issue));

                let mut out = EnhancedQAIssue::from_issue(issue.clone());
                out.apply_confidence(&result);
                out.analysis_level = AnalysisLevel::Ast;
                let checker = checkers.get(issue.file_path.as_str()).unwrap_or(&fallback);
                out.suppression = checker.check_issue(issue);
                out
            })
            .collect();

        link_related(enhanced)
    }

    fn signals_for(&self, issue: &QAIssue) -> AstAnalysisSignals {
        let mut signals = self.calculator.default_signals_for(rule_kind_for(&issue.rule_id), issue);
        match issue.rule_id.as_str() {
            "QA013" | "QA021" => signals = signals.global_variable(),
            "QA014" => signals = signals.io_variable(),
            _ => {}
        }
        signals
    }
}

/// Issues sharing a rule id within one file reference each other.
fn link_related(mut issues: Vec<EnhancedQAIssue>) -> Vec<EnhancedQAIssue> {
    let mut groups: HashMap<(String, String), Vec<String>> = HashMap::new();
    for e in &issues {
        groups
            .entry((e.issue.rule_id.clone(), e.issue.file_path.clone()))
            .or_default()
            .push(e.issue_id.clone());
    }
    for e in &mut issues {
        if let Some(ids) = groups.get(&(e.issue.rule_id.clone(), e.issue.file_path.clone())) {
            e.related_issue_ids = ids.iter().filter(|id| **id != e.issue_id).cloned().collect();
        }
    }
    issues
}

pub fn filter_by_confidence(issues: Vec<EnhancedQAIssue>, min: ConfidenceLevel) -> Vec<EnhancedQAIssue> {
    let before = issues.len();
    let kept: Vec<_> = issues.into_iter().filter(|i| i.confidence >= min).collect();
    debug!(min = %min, before, after = kept.len(), "filtered issues by confidence");
    kept
}

pub fn exclude_suppressed(issues: Vec<EnhancedQAIssue>) -> Vec<EnhancedQAIssue> {
    issues.into_iter().filter(|i| !i.is_suppressed()).collect()
}

/// Apply `rule id -> severity` overrides as configuration feedback, leaving the
/// original issue untouched.
pub fn apply_severity_overrides(
    issues: &mut [EnhancedQAIssue],
    overrides: &BTreeMap<String, String>,
) -> Result<usize, QaError> {
    let mut parsed: HashMap<String, Severity> = HashMap::new();
    for (rule_id, value) in overrides {
        let severity = Severity::parse(value).ok_or_else(|| QaError::InvalidSeverityOverride {
            rule_id: rule_id.clone(),
            value: value.clone(),
        })?;
        parsed.insert(rule_id.to_ascii_uppercase(), severity);
    }

    let mut applied = 0;
    for issue in issues.iter_mut() {
        let Some(severity) = parsed.get(&issue.issue.rule_id.to_ascii_uppercase()).copied() else {
            continue;
        };
        if severity == issue.effective_severity() {
            continue;
        }
        let mut feedback = Feedback::new(FeedbackAction::ModifySeverity);
        feedback.modified_severity = Some(severity);
        feedback.by = Some("config".to_string());
        feedback.comment = Some(format!("severity override {} -> {severity}", issue.issue.severity));
        issue.apply_feedback(feedback);
        applied += 1;
    }
    Ok(applied)
}
