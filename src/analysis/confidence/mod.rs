/// Confidence scoring of findings from AST and data-flow evidence
pub mod calculator;
pub mod signals;
pub mod similarity;

pub use calculator::{
    rule_kind_for, ConfidenceCalculator, ConfidenceLevel, ConfidenceResult, ConfidenceStatistics, BASE_SCORE,
};
pub use signals::AstAnalysisSignals;
pub use similarity::{count_similar, SimilarityKey};
