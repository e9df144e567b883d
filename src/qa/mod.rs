/// Rule checking over change records and enrichment of the resulting issues
pub mod catalog;
pub mod changes;
pub mod checker;
pub mod engine;
pub mod enhance;
pub mod error;
pub mod issue;
pub mod rules;
pub mod suppression;

// Re-export main types for convenience
pub use changes::{
    ChangeKind, ChangeSet, ChangeType, DataTypeChange, EnumValueChange, FieldChange, LogicChange, VariableChange,
};
pub use checker::QaRuleChecker;
pub use engine::{deduplicate, sort_issues, CheckerFailure, FailurePolicy, QaRuleEngine, RuleRunReport};
pub use enhance::QaEnhancer;
pub use error::QaError;
pub use issue::{stable_issue_id, AnalysisLevel, EnhancedQAIssue, Feedback, FeedbackAction, QAIssue, Severity};
pub use suppression::{Suppression, SuppressionChecker, SuppressionSource};
