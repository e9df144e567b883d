//! Issue records emitted by rule checkers and the confidence-enriched form.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::analysis::confidence::{ConfidenceLevel, ConfidenceResult};
use crate::qa::suppression::{Suppression, SuppressionSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Penalty weight used by session and risk scoring.
    pub fn weight(self) -> u32 {
        match self {
            Severity::Critical => 10,
            Severity::Warning => 5,
            Severity::Info => 2,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "info" => Some(Severity::Info),
            "warning" | "warn" => Some(Severity::Warning),
            "critical" | "error" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Critical => "Critical",
        };
        f.write_str(s)
    }
}

/// A finding produced by one rule checker. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QAIssue {
    pub severity: Severity,
    pub category: String,
    pub title: String,
    pub description: String,
    /// `file:line`
    pub location: String,
    pub file_path: String,
    pub line: usize,
    pub why_dangerous: String,
    pub recommendation: String,
    pub examples: Vec<String>,
    pub rule_id: String,
    pub old_code_snippet: String,
    pub new_code_snippet: String,
}

impl QAIssue {
    pub fn new(rule_id: &str, severity: Severity, category: &str, title: &str) -> Self {
        Self {
            severity,
            category: category.to_string(),
            title: title.to_string(),
            description: String::new(),
            location: String::new(),
            file_path: String::new(),
            line: 0,
            why_dangerous: String::new(),
            recommendation: String::new(),
            examples: Vec::new(),
            rule_id: rule_id.to_string(),
            old_code_snippet: String::new(),
            new_code_snippet: String::new(),
        }
    }

    pub fn at(mut self, file_path: &str, line: usize) -> Self {
        self.file_path = file_path.to_string();
        self.line = line;
        self.location = format!("{file_path}:{line}");
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn why_dangerous(mut self, text: impl Into<String>) -> Self {
        self.why_dangerous = text.into();
        self
    }

    pub fn recommendation(mut self, text: impl Into<String>) -> Self {
        self.recommendation = text.into();
        self
    }

    pub fn examples<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn snippets(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.old_code_snippet = old.into();
        self.new_code_snippet = new.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnalysisLevel {
    Pattern = 1,
    Ast = 2,
    Ai = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackAction {
    Accept,
    Reject,
    Ignore,
    ModifySeverity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub action: FeedbackAction,
    pub comment: Option<String>,
    pub modified_severity: Option<Severity>,
    pub at: DateTime<Utc>,
    pub by: Option<String>,
}

impl Feedback {
    pub fn new(action: FeedbackAction) -> Self {
        Self { action, comment: None, modified_severity: None, at: Utc::now(), by: None }
    }
}

/// Stable 12-hex-char id derived from what makes an issue distinct.
pub fn stable_issue_id(issue: &QAIssue) -> String {
    let mut hasher = Sha256::new();
    hasher.update(issue.rule_id.as_bytes());
    hasher.update(b"|");
    hasher.update(issue.file_path.as_bytes());
    hasher.update(b"|");
    hasher.update(issue.line.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(issue.title.as_bytes());
    let digest = hasher.finalize();
    digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedQAIssue {
    pub issue: QAIssue,
    pub issue_id: String,
    pub confidence: ConfidenceLevel,
    pub confidence_score: u8,
    pub confidence_reasons: Vec<String>,
    pub analysis_level: AnalysisLevel,
    pub ast_context: Option<String>,
    pub ai_context: Option<String>,
    pub suppression: Option<Suppression>,
    pub related_issue_ids: Vec<String>,
    pub feedback: Option<Feedback>,
    pub risk_score: u8,
}

impl EnhancedQAIssue {
    pub fn from_issue(issue: QAIssue) -> Self {
        let issue_id = stable_issue_id(&issue);
        let mut enhanced = Self {
            issue,
            issue_id,
            confidence: ConfidenceLevel::Medium,
            confidence_score: 50,
            confidence_reasons: Vec::new(),
            analysis_level: AnalysisLevel::Pattern,
            ast_context: None,
            ai_context: None,
            suppression: None,
            related_issue_ids: Vec::new(),
            feedback: None,
            risk_score: 0,
        };
        enhanced.risk_score = enhanced.compute_risk_score();
        enhanced
    }

    pub fn apply_confidence(&mut self, result: &ConfidenceResult) {
        self.confidence = result.level;
        self.confidence_score = result.score;
        self.confidence_reasons = result.reasons.clone();
        self.risk_score = self.compute_risk_score();
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppression.is_some()
    }

    pub fn suppress(&mut self, reason: impl Into<String>, source: SuppressionSource) {
        self.suppression = Some(Suppression { reason: reason.into(), source });
    }

    /// Severity after developer feedback.
    pub fn effective_severity(&self) -> Severity {
        self.feedback
            .as_ref()
            .and_then(|f| f.modified_severity)
            .unwrap_or(self.issue.severity)
    }

    pub fn apply_feedback(&mut self, feedback: Feedback) {
        if matches!(feedback.action, FeedbackAction::Reject | FeedbackAction::Ignore) {
            let reason = feedback
                .comment
                .clone()
                .unwrap_or_else(|| format!("{:?} by developer feedback", feedback.action));
            self.suppress(reason, SuppressionSource::Feedback);
        }
        self.feedback = Some(feedback);
        self.risk_score = self.compute_risk_score();
    }

    /// Severity weight scaled by confidence, 0..=100.
    fn compute_risk_score(&self) -> u8 {
        let weight = self.effective_severity().weight();
        let score = weight * u32::from(self.confidence_score) / 10;
        score.min(100) as u8
    }

    pub fn summary(&self) -> String {
        let mut out = format!(
            "[{}] {} {} ({}) confidence {} ({})",
            self.effective_severity(),
            self.issue.rule_id,
            self.issue.title,
            self.issue.location,
            self.confidence,
            self.confidence_score
        );
        if let Some(s) = &self.suppression {
            out.push_str(&format!(" suppressed[{}]: {}", s.source, s.reason));
        }
        out
    }
}
