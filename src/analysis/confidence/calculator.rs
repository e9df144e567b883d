use std::fmt;

use serde::{Deserialize, Serialize};

use super::signals::AstAnalysisSignals;
use crate::qa::{QAIssue, Severity};

pub const BASE_SCORE: i32 = 50;
const SIMILAR_THRESHOLD: u32 = 3;
const CONTEXT_PREVIEW_PAIRS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// High at 90 and above, Medium from 60, Low below.
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => ConfidenceLevel::High,
            60..=89 => ConfidenceLevel::Medium,
            _ => ConfidenceLevel::Low,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(ConfidenceLevel::Low),
            "medium" => Some(ConfidenceLevel::Medium),
            "high" => Some(ConfidenceLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::High => "High",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceResult {
    pub score: u8,
    pub level: ConfidenceLevel,
    pub reasons: Vec<String>,
    /// Applied factors in application order.
    pub breakdown: Vec<(String, i32)>,
}

impl ConfidenceResult {
    fn degenerate(reason: &str) -> Self {
        let score = BASE_SCORE as u8;
        Self { score, level: ConfidenceLevel::Low, reasons: vec![reason.to_string()], breakdown: Vec::new() }
    }

    /// Base score plus every delta, clamped, reproduces `score`.
    pub fn validate_breakdown(&self) -> bool {
        let total = BASE_SCORE + self.breakdown.iter().map(|(_, d)| d).sum::<i32>();
        total.clamp(0, 100) == i32::from(self.score) && ConfidenceLevel::from_score(self.score) == self.level
    }

    pub fn detailed_report(&self) -> String {
        let mut out = format!("Confidence: {} ({}/100)\n", self.level, self.score);
        out.push_str(&format!("  base score: {BASE_SCORE}\n"));
        for (factor, delta) in &self.breakdown {
            out.push_str(&format!("  {factor}: {delta:+}\n"));
        }
        let raw = BASE_SCORE + self.breakdown.iter().map(|(_, d)| d).sum::<i32>();
        if raw != i32::from(self.score) {
            out.push_str(&format!("  clamped from {raw}\n"));
        }
        if !self.reasons.is_empty() {
            out.push_str("Reasons:\n");
            for reason in &self.reasons {
                out.push_str(&format!("  - {reason}\n"));
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceStatistics {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub average_score: u8,
    pub min_score: u8,
    pub max_score: u8,
    pub high_percentage: f64,
    pub medium_or_high_percentage: f64,
}

impl fmt::Display for ConfidenceStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} results: {} high, {} medium, {} low; score avg {} (min {}, max {}); {:.1}% high, {:.1}% medium or better",
            self.total,
            self.high,
            self.medium,
            self.low,
            self.average_score,
            self.min_score,
            self.max_score,
            self.high_percentage,
            self.medium_or_high_percentage
        )
    }
}

/// Turns [`AstAnalysisSignals`] into a score, level and auditable breakdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceCalculator;

struct Tally {
    score: i32,
    reasons: Vec<String>,
    breakdown: Vec<(String, i32)>,
}

impl Tally {
    fn apply(&mut self, applies: bool, factor: String, delta: i32, reason: &str) {
        if !applies {
            return;
        }
        self.score += delta;
        self.reasons.push(format!("{reason} ({delta:+})"));
        self.breakdown.push((factor, delta));
    }
}

impl ConfidenceCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Never fails: a missing signal bag yields a fixed low-confidence result.
    pub fn calculate(&self, signals: Option<&AstAnalysisSignals>, issue: Option<&QAIssue>) -> ConfidenceResult {
        let Some(s) = signals else {
            return ConfidenceResult::degenerate("No AST analysis available; pattern match only");
        };

        let mut t = Tally { score: BASE_SCORE, reasons: Vec::new(), breakdown: Vec::new() };
        t.apply(s.confirmed_by_ast, "AST confirmed".into(), 30, "Confirmed by AST analysis");
        t.apply(s.confirmed_by_dataflow, "Data flow confirmed".into(), 20, "Confirmed by data flow analysis");
        t.apply(
            s.similar_occurrences >= SIMILAR_THRESHOLD,
            format!("Similar occurrences ({})", s.similar_occurrences),
            10,
            &format!("{} similar occurrences found", s.similar_occurrences),
        );
        t.apply(
            issue.is_some_and(|i| i.severity == Severity::Critical),
            "Critical severity".into(),
            5,
            "Critical severity issue",
        );
        t.apply(s.ambiguous_context, "Ambiguous context".into(), -20, "Ambiguous or partially parsed context");
        t.apply(s.possible_external_reference, "Possible external reference".into(), -15, "May be referenced externally");
        t.apply(s.is_io_variable, "I/O variable".into(), -10, "I/O variable, may be driven by hardware");
        t.apply(s.is_global_variable, "Global variable".into(), -5, "Global variable, usage may be outside this scope");

        let score = t.score.clamp(0, 100) as u8;
        let mut reasons = t.reasons;
        reasons.extend(s.notes.iter().map(|n| format!("note: {n}")));
        if !s.context.is_empty() {
            let preview: Vec<String> = s
                .context
                .iter()
                .take(CONTEXT_PREVIEW_PAIRS)
                .map(|(k, v)| format!("{k}={}", crate::truncate_utf8_safe(v, 60)))
                .collect();
            let more = s.context.len().saturating_sub(CONTEXT_PREVIEW_PAIRS);
            let suffix = if more > 0 { format!(" (+{more} more)") } else { String::new() };
            reasons.push(format!("context: {}{suffix}", preview.join(", ")));
        }

        ConfidenceResult { score, level: ConfidenceLevel::from_score(score), reasons, breakdown: t.breakdown }
    }

    pub fn calculate_simple(&self, confirmed_by_ast: bool, confirmed_by_dataflow: bool, similar_occurrences: u32) -> ConfidenceResult {
        let signals = AstAnalysisSignals {
            confirmed_by_ast,
            confirmed_by_dataflow,
            similar_occurrences,
            ..Default::default()
        };
        self.calculate(Some(&signals), None)
    }

    /// Scores each bag independently and keeps the best-scoring result.
    pub fn calculate_aggregate(&self, all: &[AstAnalysisSignals], issue: Option<&QAIssue>) -> ConfidenceResult {
        let best = all
            .iter()
            .map(|s| self.calculate(Some(s), issue))
            .reduce(|best, next| if next.score > best.score { next } else { best });
        match best {
            Some(mut result) => {
                result.reasons.push(format!("{} analyses, best selected", all.len()));
                result
            }
            None => ConfidenceResult::degenerate("No AST analysis available; pattern match only"),
        }
    }

    /// Preset signal bag for a rule family, with the issue identity as context.
    pub fn default_signals_for(&self, rule_kind: &str, issue: &QAIssue) -> AstAnalysisSignals {
        let base = match rule_kind.to_ascii_uppercase().as_str() {
            "UNUSED_VARIABLE" => AstAnalysisSignals::new().ast_confirmed().dataflow_confirmed(),
            "ARRAY_BOUNDS" | "MAGIC_NUMBER" => AstAnalysisSignals::new().ast_confirmed(),
            "DEAD_CODE" => AstAnalysisSignals::new().ast_confirmed().ambiguous(),
            _ => AstAnalysisSignals::new().ambiguous(),
        };
        base.context("RuleId", &issue.rule_id)
            .context("Category", &issue.category)
            .context("Severity", issue.severity)
            .context("Location", &issue.location)
    }

    pub fn statistics(&self, results: &[ConfidenceResult]) -> ConfidenceStatistics {
        if results.is_empty() {
            return ConfidenceStatistics::default();
        }
        let total = results.len();
        let count = |level| results.iter().filter(|r| r.level == level).count();
        let (high, medium, low) = (count(ConfidenceLevel::High), count(ConfidenceLevel::Medium), count(ConfidenceLevel::Low));
        let sum: usize = results.iter().map(|r| usize::from(r.score)).sum();
        ConfidenceStatistics {
            total,
            high,
            medium,
            low,
            average_score: (sum / total) as u8,
            min_score: results.iter().map(|r| r.score).min().unwrap_or(0),
            max_score: results.iter().map(|r| r.score).max().unwrap_or(0),
            high_percentage: high as f64 * 100.0 / total as f64,
            medium_or_high_percentage: (high + medium) as f64 * 100.0 / total as f64,
        }
    }
}

/// Map a rule id to the preset family used by [`ConfidenceCalculator::default_signals_for`].
pub fn rule_kind_for(rule_id: &str) -> &'static str {
    match rule_id {
        "QA006" | "QA021" | "SA0033" | "SA0034" | "SA0035" | "SA0036" | "SA0037" | "VAR001" => "UNUSED_VARIABLE",
        "QA003" | "SA0066" | "SA0132" => "ARRAY_BOUNDS",
        "QA007" => "MAGIC_NUMBER",
        "SA0001" | "SA0097" | "DEAD001" => "DEAD_CODE",
        _ => "DEFAULT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_inclusive() {
        assert_eq!(ConfidenceLevel::from_score(90), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(89), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(60), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(59), ConfidenceLevel::Low);
    }

    #[test]
    fn all_positive_signals_clamp_at_100() {
        let issue = QAIssue::new("QA001", Severity::Critical, "Type Safety", "t");
        let s = AstAnalysisSignals::new().ast_confirmed().dataflow_confirmed().similar(3);
        let r = ConfidenceCalculator.calculate(Some(&s), Some(&issue));
        assert_eq!(r.score, 100);
        assert_eq!(r.level, ConfidenceLevel::High);
        assert_eq!(r.breakdown.len(), 4);
        assert!(r.validate_breakdown());
    }

    #[test]
    fn all_negative_signals_reach_zero() {
        let s = AstAnalysisSignals::new().ambiguous().external_reference().io_variable().global_variable();
        let r = ConfidenceCalculator.calculate(Some(&s), None);
        assert_eq!(r.score, 0);
        assert_eq!(r.level, ConfidenceLevel::Low);
        assert!(r.validate_breakdown());
    }

    #[test]
    fn missing_signals_degrade_to_fixed_low() {
        let r = ConfidenceCalculator.calculate(None, None);
        assert_eq!((r.score, r.level), (50, ConfidenceLevel::Low));
        assert_eq!(r.reasons.len(), 1);
        assert!(r.breakdown.is_empty());
    }

    #[test]
    fn context_preview_is_bounded() {
        let s = AstAnalysisSignals::new().context("a", 1).context("b", 2).context("c", 3).context("d", 4);
        let r = ConfidenceCalculator.calculate(Some(&s), None);
        let ctx = r.reasons.iter().find(|r| r.starts_with("context:")).cloned().unwrap_or_default();
        assert!(ctx.contains("a=1") && ctx.contains("c=3"));
        assert!(!ctx.contains("d=4"));
        assert!(ctx.ends_with("(+1 more)"));
    }
}
