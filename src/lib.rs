//! Static analysis for IEC 61131-3 Structured Text: rule checking over change
//! records, confidence scoring, variable usage, dependency and call graphs.

/// Safely truncate a UTF-8 string to a maximum number of characters
pub fn truncate_utf8_safe(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", truncated)
    }
}

/// Syntax tree model, parent index and visitors
pub mod ast;

/// Rule checkers, issue records, suppression and enrichment
pub mod qa;

/// Confidence, data flow, variable usage and dependency analyses
pub mod analysis;

pub mod config;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod session;

// Re-export commonly used types for convenience
pub use analysis::{
    ConfidenceCalculator, ConfidenceLevel, ConfidenceResult, DependencyAnalysis, DependencyAnalyzer,
    VariableUsageAnalysis, VariableUsageAnalyzer,
};
pub use ast::{AstBuilder, SyntaxTree};
pub use config::{load_config, Config};
pub use orchestrator::{AdvancedAnalyzerOrchestrator, AnalysisOptions, CancellationToken, ComprehensiveAnalysisResult};
pub use qa::{EnhancedQAIssue, QAIssue, QaEnhancer, QaRuleEngine, Severity};
pub use session::{ValidationMode, ValidationSession};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_char_boundaries() {
        assert_eq!(truncate_utf8_safe("abc", 5), "abc");
        assert_eq!(truncate_utf8_safe("привет мир", 4), "при…");
    }
}
