//! Rule-checker contract.
use super::changes::{ChangeSet, DataTypeChange, LogicChange, VariableChange};
use super::issue::{QAIssue, Severity};

/// A quality rule over change records.
///
/// Implementations hold no mutable state, so the engine may run any number of
/// them concurrently or in any order without changing the union of results.
pub trait QaRuleChecker: Send + Sync {
    fn rule_id(&self) -> &str;
    fn rule_name(&self) -> &str;
    fn description(&self) -> &str;
    fn severity(&self) -> Severity;

    fn check_variable_change(&self, _change: &VariableChange) -> Vec<QAIssue> {
        Vec::new()
    }

    fn check_logic_change(&self, _change: &LogicChange) -> Vec<QAIssue> {
        Vec::new()
    }

    fn check_data_type_change(&self, _change: &DataTypeChange) -> Vec<QAIssue> {
        Vec::new()
    }

    /// Rules that need totals across the whole change-set (e.g. per-file counts)
    /// compute them here from the set itself instead of keeping counters.
    fn check_change_set(&self, _changes: &ChangeSet) -> Vec<QAIssue> {
        Vec::new()
    }
}
