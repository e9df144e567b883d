//! Naming and presentation rules.
use once_cell::sync::Lazy;
use regex::Regex;

use super::category;
use super::{is_match, LazyRegex};
use crate::ast::{DataTypeKind, VarScope};
use crate::qa::changes::{ChangeType, DataTypeChange, LogicChange, VariableChange};
use crate::qa::checker::QaRuleChecker;
use crate::qa::issue::{QAIssue, Severity};

static BOOL_PREFIX_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?i)^(is|has|can|should)"));

const MAX_NAMING_LENGTH: usize = 50;

fn capitalised(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// QA012: scope prefixes, BOOL verb prefixes, data type prefixes.
pub struct NamingConventionRule;

impl NamingConventionRule {
    pub fn violations(name: &str, scope: VarScope, data_type: &str) -> Vec<String> {
        let mut out = Vec::new();
        match scope {
            VarScope::Global if !name.starts_with(['g', 'G']) => {
                out.push("global variables start with 'g'".to_string());
            }
            VarScope::Input if !(name.starts_with('i') || name.starts_with("in")) => {
                out.push("inputs start with 'i' or 'in'".to_string());
            }
            VarScope::Output if !(name.starts_with('o') || name.starts_with("out")) => {
                out.push("outputs start with 'o' or 'out'".to_string());
            }
            _ => {}
        }
        if scope == VarScope::Local && data_type.trim().eq_ignore_ascii_case("BOOL") && !is_match(&BOOL_PREFIX_RE, name) {
            out.push("BOOL locals start with is/has/can/should".to_string());
        }
        if name.chars().count() == 1 && !matches!(name.to_ascii_lowercase().as_str(), "i" | "j" | "k") {
            out.push("single-letter names are reserved for loop counters i, j, k".to_string());
        }
        if name.chars().count() > MAX_NAMING_LENGTH {
            out.push(format!("names are at most {MAX_NAMING_LENGTH} characters"));
        }
        out
    }

    pub fn suggested_name(name: &str, scope: VarScope, data_type: &str) -> String {
        match scope {
            VarScope::Global => format!("g{}", capitalised(name)),
            VarScope::Input => format!("i{}", capitalised(name)),
            VarScope::Output => format!("o{}", capitalised(name)),
            _ if data_type.trim().eq_ignore_ascii_case("BOOL") => format!("is{}", capitalised(name)),
            _ => name.to_string(),
        }
    }

    fn type_violations(name: &str, kind: DataTypeKind) -> Option<&'static str> {
        match kind {
            DataTypeKind::Struct if !(name.starts_with("ST_") || name.starts_with("T_")) => Some("structs start with ST_"),
            DataTypeKind::Enum if !name.starts_with("E_") => Some("enums start with E_"),
            _ => None,
        }
    }
}

impl QaRuleChecker for NamingConventionRule {
    fn rule_id(&self) -> &str {
        "QA012"
    }
    fn rule_name(&self) -> &str {
        "Naming convention"
    }
    fn description(&self) -> &str {
        "Checks scope prefixes and data type prefixes"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_variable_change(&self, change: &VariableChange) -> Vec<QAIssue> {
        if !change.change_type.adds_code() {
            return Vec::new();
        }
        let data_type = change.new_data_type.as_deref().unwrap_or("");
        let violations = Self::violations(&change.variable_name, change.scope, data_type);
        if violations.is_empty() {
            return Vec::new();
        }
        let suggestion = Self::suggested_name(&change.variable_name, change.scope, data_type);
        vec![QAIssue::new(self.rule_id(), self.severity(), category::NAMING, "Naming convention violated")
            .at(&change.file_path, change.line)
            .description(format!("{} ({}): {}", change.variable_name, change.scope, violations.join("; ")))
            .why_dangerous("Without scope prefixes a reader cannot tell shared state from locals at the point of use.")
            .recommendation(format!("Rename to {suggestion}"))]
    }

    fn check_data_type_change(&self, change: &DataTypeChange) -> Vec<QAIssue> {
        if change.change_type != ChangeType::Added {
            return Vec::new();
        }
        let Some(violation) = Self::type_violations(&change.type_name, change.kind) else {
            return Vec::new();
        };
        vec![QAIssue::new(self.rule_id(), self.severity(), category::NAMING, "Data type naming convention violated")
            .at(&change.file_path, change.line)
            .description(format!("{}: {violation}", change.type_name))
            .why_dangerous("Type prefixes make user types recognisable in declarations and online views.")
            .recommendation(match change.kind {
                DataTypeKind::Enum => format!("Rename to E_{}", change.type_name),
                _ => format!("Rename to ST_{}", change.type_name),
            })]
    }
}

/// Number of lines that hold or belong to a comment.
pub(crate) fn count_comment_lines(code: &str) -> usize {
    let mut in_block = false;
    let mut count = 0;
    for line in code.lines() {
        let had_comment = in_block || line.contains("//") || line.contains("(*");
        let mut rest = line;
        loop {
            if in_block {
                match rest.find("*)") {
                    Some(end) => {
                        in_block = false;
                        rest = &rest[end + 2..];
                    }
                    None => break,
                }
            } else {
                match rest.find("(*") {
                    Some(start) => {
                        in_block = true;
                        rest = &rest[start + 2..];
                    }
                    None => break,
                }
            }
        }
        if had_comment {
            count += 1;
        }
    }
    count
}

/// QA016: fewer than one comment per N lines.
pub struct InsufficientCommentsRule {
    lines_per_comment: usize,
}

impl InsufficientCommentsRule {
    pub fn new(lines_per_comment: usize) -> Self {
        Self { lines_per_comment: lines_per_comment.max(1) }
    }
}

impl QaRuleChecker for InsufficientCommentsRule {
    fn rule_id(&self) -> &str {
        "QA016"
    }
    fn rule_name(&self) -> &str {
        "Insufficient comments"
    }
    fn description(&self) -> &str {
        "Detects logic with fewer comments than one per configured number of lines"
    }
    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn check_logic_change(&self, change: &LogicChange) -> Vec<QAIssue> {
        let Some(code) = change.code_to_check() else {
            return Vec::new();
        };
        let total = code.lines().filter(|l| !l.trim().is_empty()).count();
        if total < self.lines_per_comment {
            return Vec::new();
        }
        let expected = total.div_ceil(self.lines_per_comment);
        let comments = count_comment_lines(code);
        if comments >= expected {
            return Vec::new();
        }
        vec![QAIssue::new(self.rule_id(), self.severity(), category::MAINTAINABILITY, "Insufficient comments")
            .at(&change.file_path, change.start_line)
            .description(format!("{}: {comments} comment(s) in {total} lines, expected at least {expected}", change.element_name))
            .why_dangerous("Uncommented control logic is hard to verify against the process description.")
            .recommendation(format!("Explain intent and units at least once every {} lines.", self.lines_per_comment))]
    }
}

/// QA019: variable, type and field names over the length limit.
pub struct ExcessivelyLongNameRule {
    max_length: usize,
}

impl ExcessivelyLongNameRule {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    fn issue(&self, what: &str, name: &str, file: &str, line: usize) -> QAIssue {
        let len = name.chars().count();
        QAIssue::new(self.rule_id(), self.severity(), category::STYLE, &format!("Excessively long {what} name"))
            .at(file, line)
            .description(format!("{name} is {len} characters long (limit {})", self.max_length))
            .why_dangerous("Very long identifiers are truncated in online views and make expressions hard to read.")
            .recommendation("Shorten the name and use common abbreviations.")
    }
}

impl QaRuleChecker for ExcessivelyLongNameRule {
    fn rule_id(&self) -> &str {
        "QA019"
    }
    fn rule_name(&self) -> &str {
        "Excessively long name"
    }
    fn description(&self) -> &str {
        "Detects identifiers at or above the configured length"
    }
    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn check_variable_change(&self, change: &VariableChange) -> Vec<QAIssue> {
        if !change.change_type.adds_code() || change.variable_name.chars().count() < self.max_length {
            return Vec::new();
        }
        vec![self.issue("variable", &change.variable_name, &change.file_path, change.line)]
    }

    fn check_data_type_change(&self, change: &DataTypeChange) -> Vec<QAIssue> {
        if !change.change_type.adds_code() {
            return Vec::new();
        }
        let mut issues = Vec::new();
        if change.type_name.chars().count() >= self.max_length {
            issues.push(self.issue("type", &change.type_name, &change.file_path, change.line));
        }
        for field in change.field_changes.iter().filter(|f| f.change_type.adds_code()) {
            if field.field_name.chars().count() >= self.max_length {
                issues.push(self.issue("field", &field.field_name, &change.file_path, change.line));
            }
        }
        issues
    }
}

/// QA020: tabs and spaces both used for indentation in one block.
pub struct InconsistentStyleRule;

impl QaRuleChecker for InconsistentStyleRule {
    fn rule_id(&self) -> &str {
        "QA020"
    }
    fn rule_name(&self) -> &str {
        "Inconsistent indentation"
    }
    fn description(&self) -> &str {
        "Detects code indented with a mix of tabs and spaces"
    }
    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn check_logic_change(&self, change: &LogicChange) -> Vec<QAIssue> {
        let Some(code) = change.code_to_check() else {
            return Vec::new();
        };
        let tabs = code.lines().filter(|l| l.starts_with('\t')).count();
        let spaces = code.lines().filter(|l| l.starts_with("    ")).count();
        if tabs == 0 || spaces == 0 {
            return Vec::new();
        }
        vec![QAIssue::new(self.rule_id(), self.severity(), category::STYLE, "Mixed tab and space indentation")
            .at(&change.file_path, change.start_line)
            .description(format!("{}: {tabs} tab-indented and {spaces} space-indented lines", change.element_name))
            .why_dangerous("Mixed indentation renders differently between editors and hides the real block structure.")
            .recommendation(if tabs >= spaces { "Indent with tabs only." } else { "Indent with four spaces only." })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_lines_include_block_continuations() {
        let code = "x := 1; // a\n(* start\n still comment\n end *)\ny := 2;";
        assert_eq!(count_comment_lines(code), 4);
    }

    #[test]
    fn loop_counters_may_be_single_letters() {
        assert!(NamingConventionRule::violations("i", VarScope::Local, "INT").is_empty());
        assert_eq!(NamingConventionRule::violations("q", VarScope::Local, "INT").len(), 1);
    }
}
