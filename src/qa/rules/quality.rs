//! Maintainability rules: suspicious names, magic numbers, size and shape of
//! code, duplication, CASE completeness, global variable pressure.
use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::category;
use super::{is_match, snippet, strip_line_comment, LazyRegex};
use crate::ast::VarScope;
use crate::qa::changes::{ChangeSet, ChangeType, LogicChange, VariableChange};
use crate::qa::checker::QaRuleChecker;
use crate::qa::issue::{QAIssue, Severity};

static SUSPICIOUS_NAME_RE: LazyRegex =
    Lazy::new(|| Regex::new(r"(?i)^(temp|tmp|test|dummy)\d*$|^var\d+$|^(x|y|z|foo|bar|baz)$"));

/// QA006: new variables whose names suggest scratch or leftover code.
pub struct UnusedVariableRule;

impl QaRuleChecker for UnusedVariableRule {
    fn rule_id(&self) -> &str {
        "QA006"
    }
    fn rule_name(&self) -> &str {
        "Possibly unused variable"
    }
    fn description(&self) -> &str {
        "Flags newly added variables with placeholder names that are often left unused"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_variable_change(&self, change: &VariableChange) -> Vec<QAIssue> {
        if change.change_type != ChangeType::Added || !is_match(&SUSPICIOUS_NAME_RE, &change.variable_name) {
            return Vec::new();
        }
        vec![QAIssue::new(self.rule_id(), self.severity(), category::CODE_QUALITY, "Variable may be unused")
            .at(&change.file_path, change.line)
            .description(format!("'{}' looks like a temporary or test variable", change.variable_name))
            .why_dangerous("Leftover scratch variables waste memory and hide which values the logic actually depends on.")
            .recommendation("Remove the variable if it is not read, or give it a name that states its purpose.")
            .examples(["// avoid: temp1, dummy, x", "// prefer: calculatedSpeed, retryCounter"])]
    }
}

const ALLOWED_NUMBERS: &[&str] = &["0", "1", "-1", "2", "10", "100", "1000"];
static NUMERIC_LITERAL_RE: LazyRegex = Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$"));
static NUMBER_IN_CODE_RE: LazyRegex = Lazy::new(|| Regex::new(r"\b(\d+\.\d+|\d+)\b"));

fn is_magic_number(value: &str) -> bool {
    let value = value.trim();
    is_match(&NUMERIC_LITERAL_RE, value) && !ALLOWED_NUMBERS.contains(&value)
}

/// QA007: unexplained numeric literals in initial values or logic.
pub struct MagicNumberRule;

impl MagicNumberRule {
    fn numbers_in(code: &str) -> Vec<String> {
        let Ok(re) = NUMBER_IN_CODE_RE.as_ref() else {
            return Vec::new();
        };
        let mut found: Vec<String> = Vec::new();
        for line in code.lines() {
            let line = strip_line_comment(line);
            for m in re.find_iter(&line) {
                // typed literals such as 16#FF or T#5S carry their own meaning
                let prefixed = line[..m.start()].ends_with('#') || line[m.end()..].starts_with('#');
                let text = m.as_str().to_string();
                if !prefixed && is_magic_number(&text) && !found.contains(&text) {
                    found.push(text);
                }
            }
        }
        found
    }
}

impl QaRuleChecker for MagicNumberRule {
    fn rule_id(&self) -> &str {
        "QA007"
    }
    fn rule_name(&self) -> &str {
        "Magic number"
    }
    fn description(&self) -> &str {
        "Detects numeric literals that should be named constants"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_variable_change(&self, change: &VariableChange) -> Vec<QAIssue> {
        if !change.change_type.adds_code() {
            return Vec::new();
        }
        let Some(value) = change.new_initial_value.as_deref() else {
            return Vec::new();
        };
        if !is_magic_number(value) {
            return Vec::new();
        }
        vec![QAIssue::new(self.rule_id(), self.severity(), category::CODE_QUALITY, "Magic number in initial value")
            .at(&change.file_path, change.line)
            .description(format!("{} is initialised with the bare literal {}", change.variable_name, value.trim()))
            .why_dangerous("A bare number hides its unit and intent, and the same value copied elsewhere drifts apart.")
            .recommendation("Move the value into a VAR CONSTANT block with a descriptive name.")
            .examples([
                "VAR CONSTANT".to_string(),
                format!("    MAX_{} : INT := {};", change.variable_name.to_ascii_uppercase(), value.trim()),
                "END_VAR".to_string(),
            ])]
    }

    fn check_logic_change(&self, change: &LogicChange) -> Vec<QAIssue> {
        let Some(code) = change.code_to_check() else {
            return Vec::new();
        };
        let numbers = Self::numbers_in(code);
        if numbers.is_empty() {
            return Vec::new();
        }
        vec![QAIssue::new(self.rule_id(), self.severity(), category::CODE_QUALITY, "Magic number in logic")
            .at(&change.file_path, change.start_line)
            .description(format!("{} uses unnamed literals: {}", change.element_name, numbers.join(", ")))
            .why_dangerous("Unnamed literals make tuning error-prone and obscure the engineering meaning of a value.")
            .recommendation("Replace each literal with a named constant.")
            .snippets("", snippet(code, 200))]
    }
}

/// QA008: logic blocks longer than the configured limit.
pub struct LongFunctionRule {
    max_lines: usize,
    critical_lines: usize,
}

impl LongFunctionRule {
    pub fn new(max_lines: usize, critical_lines: usize) -> Self {
        Self { max_lines, critical_lines }
    }
}

impl Default for LongFunctionRule {
    fn default() -> Self {
        Self::new(50, 100)
    }
}

impl QaRuleChecker for LongFunctionRule {
    fn rule_id(&self) -> &str {
        "QA008"
    }
    fn rule_name(&self) -> &str {
        "Long function"
    }
    fn description(&self) -> &str {
        "Detects POU bodies that exceed the line limit"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_logic_change(&self, change: &LogicChange) -> Vec<QAIssue> {
        if !change.change_type.adds_code() {
            return Vec::new();
        }
        let line_count = change.end_line.saturating_sub(change.start_line) + 1;
        if line_count <= self.max_lines {
            return Vec::new();
        }
        let severity = if line_count > self.critical_lines { Severity::Critical } else { Severity::Warning };
        vec![QAIssue::new(self.rule_id(), severity, category::MAINTAINABILITY, "Function is too long")
            .at(&change.file_path, change.start_line)
            .description(format!("{} spans {line_count} lines (limit {})", change.element_name, self.max_lines))
            .why_dangerous("Long bodies mix responsibilities and are hard to test and review during commissioning.")
            .recommendation("Split the body into smaller actions, methods or function blocks.")
            .snippets("", format!("{line_count} lines total"))]
    }
}

static NEST_OPEN_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?i)^(IF|FOR|WHILE|CASE|REPEAT)\b"));
static NEST_CLOSE_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?i)^(END_IF|END_FOR|END_WHILE|END_CASE|UNTIL)\b"));

/// Deepest control structure nesting and the 0-based line where it is reached.
pub(crate) fn max_nesting(code: &str) -> (usize, usize) {
    let mut depth = 0usize;
    let mut deepest = (0usize, 0usize);
    for (offset, raw) in code.lines().enumerate() {
        let line = strip_line_comment(raw);
        let trimmed = line.trim();
        if is_match(&NEST_CLOSE_RE, trimmed) {
            depth = depth.saturating_sub(1);
        } else if is_match(&NEST_OPEN_RE, trimmed) {
            depth += 1;
            if depth > deepest.0 {
                deepest = (depth, offset);
            }
        }
    }
    deepest
}

/// QA009: control structures nested deeper than the limit.
pub struct DeepNestingRule {
    max_depth: usize,
}

impl DeepNestingRule {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl QaRuleChecker for DeepNestingRule {
    fn rule_id(&self) -> &str {
        "QA009"
    }
    fn rule_name(&self) -> &str {
        "Deep nesting"
    }
    fn description(&self) -> &str {
        "Detects IF/FOR/WHILE/CASE/REPEAT nested beyond the configured depth"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_logic_change(&self, change: &LogicChange) -> Vec<QAIssue> {
        let Some(code) = change.code_to_check() else {
            return Vec::new();
        };
        let (depth, offset) = max_nesting(code);
        if depth <= self.max_depth {
            return Vec::new();
        }
        vec![QAIssue::new(self.rule_id(), self.severity(), category::COMPLEXITY, "Nesting is too deep")
            .at(&change.file_path, change.start_line + offset)
            .description(format!("{} nests control structures {depth} levels deep (limit {})", change.element_name, self.max_depth))
            .why_dangerous("Deeply nested branches are hard to reason about and hide unhandled combinations of conditions.")
            .recommendation("Use early EXIT/RETURN guards, CASE on a state variable, or extract inner blocks.")]
    }
}

static BLOCK_COMMENT_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?s)\(\*.*?\*\)"));
const DUPLICATE_WINDOW: usize = 5;

/// Comment-free, whitespace-collapsed, upper-cased lines; blank lines dropped.
pub(crate) fn normalize_lines(code: &str) -> Vec<String> {
    let without_blocks = match BLOCK_COMMENT_RE.as_ref() {
        Ok(re) => re.replace_all(code, "").into_owned(),
        Err(_) => code.to_string(),
    };
    without_blocks
        .lines()
        .map(|l| strip_line_comment(l).split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_uppercase())
        .filter(|l| !l.is_empty())
        .collect()
}

fn code_hash(lines: &[String]) -> String {
    let mut hasher = Sha256::new();
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().iter().take(8).map(|b| format!("{b:02x}")).collect()
}

/// QA010: the same normalised block of code appearing more than once.
#[derive(Default)]
pub struct DuplicateCodeRule;

impl DuplicateCodeRule {
    fn issue(&self, change: &LogicChange, offset: usize, original: String) -> QAIssue {
        QAIssue::new(self.rule_id(), self.severity(), category::MAINTAINABILITY, "Duplicate code")
            .at(&change.file_path, change.start_line + offset)
            .description(format!("{DUPLICATE_WINDOW}+ lines of {} repeat code at {original}", change.element_name))
            .why_dangerous("A fix applied to one copy is easily missed in the other.")
            .recommendation("Extract the shared lines into a function, method or action.")
    }
}

impl QaRuleChecker for DuplicateCodeRule {
    fn rule_id(&self) -> &str {
        "QA010"
    }
    fn rule_name(&self) -> &str {
        "Duplicate code"
    }
    fn description(&self) -> &str {
        "Detects repeated blocks of five or more normalised lines"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }

    /// Repeated windows inside one added block.
    fn check_logic_change(&self, change: &LogicChange) -> Vec<QAIssue> {
        if change.change_type != ChangeType::Added {
            return Vec::new();
        }
        let Some(code) = change.new_code.as_deref() else {
            return Vec::new();
        };
        let lines = normalize_lines(code);
        if lines.len() < DUPLICATE_WINDOW * 2 {
            return Vec::new();
        }
        let mut first_seen: HashMap<String, usize> = HashMap::new();
        for (i, window) in lines.windows(DUPLICATE_WINDOW).enumerate() {
            let hash = code_hash(window);
            match first_seen.get(&hash) {
                // overlapping windows of a repeated single line are not duplication
                Some(&first) if i >= first + DUPLICATE_WINDOW => {
                    return vec![self.issue(change, i, format!("{}:{}", change.file_path, change.start_line + first))];
                }
                Some(_) => {}
                None => {
                    first_seen.insert(hash, i);
                }
            }
        }
        Vec::new()
    }

    /// Whole added blocks that are identical after normalisation.
    fn check_change_set(&self, changes: &ChangeSet) -> Vec<QAIssue> {
        let mut first_by_hash: HashMap<String, &LogicChange> = HashMap::new();
        let mut issues = Vec::new();
        for change in changes.logic_changes.iter().filter(|c| c.change_type == ChangeType::Added) {
            let Some(code) = change.new_code.as_deref() else {
                continue;
            };
            let lines = normalize_lines(code);
            if lines.len() < DUPLICATE_WINDOW {
                continue;
            }
            let hash = code_hash(&lines);
            match first_by_hash.get(&hash) {
                Some(original) => {
                    issues.push(self.issue(change, 0, format!("{}:{}", original.file_path, original.start_line)));
                }
                None => {
                    first_by_hash.insert(hash, change);
                }
            }
        }
        issues
    }
}

static CASE_HEAD_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?i)^CASE\s+\w+\s+OF"));
static ELSE_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?i)^ELSE\b"));
static END_CASE_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?i)^END_CASE\b"));

/// QA011: CASE statements without an ELSE branch.
pub struct MissingCaseElseRule;

impl QaRuleChecker for MissingCaseElseRule {
    fn rule_id(&self) -> &str {
        "QA011"
    }
    fn rule_name(&self) -> &str {
        "Missing CASE ELSE"
    }
    fn description(&self) -> &str {
        "Detects CASE statements that do not handle unexpected selector values"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_logic_change(&self, change: &LogicChange) -> Vec<QAIssue> {
        let Some(code) = change.code_to_check() else {
            return Vec::new();
        };
        // stack of (line offset, saw ELSE, nested IF depth)
        let mut open: Vec<(usize, bool, usize)> = Vec::new();
        let mut issues = Vec::new();
        for (offset, raw) in code.lines().enumerate() {
            let line = strip_line_comment(raw);
            let trimmed = line.trim();
            let upper = trimmed.to_ascii_uppercase();
            if is_match(&CASE_HEAD_RE, trimmed) {
                open.push((offset, false, 0));
            } else if is_match(&END_CASE_RE, trimmed) {
                if let Some((start, saw_else, _)) = open.pop() {
                    if !saw_else {
                        issues.push(
                            QAIssue::new(self.rule_id(), self.severity(), category::SAFETY, "CASE statement without ELSE")
                                .at(&change.file_path, change.start_line + start)
                                .description(format!("CASE at line {} has no ELSE branch", change.start_line + start))
                                .why_dangerous("An unexpected selector value falls through silently and the state machine stalls.")
                                .recommendation("Add an ELSE branch that logs the value and moves to a safe state.")
                                .examples(["CASE state OF", "    0: ...", "ELSE", "    state := STATE_ERROR;", "END_CASE"]),
                        );
                    }
                }
            } else if let Some(top) = open.last_mut() {
                let opens_if = is_match(&IF_RE, &upper);
                let closes_if = upper.contains("END_IF");
                if opens_if && !closes_if {
                    top.2 += 1;
                } else if closes_if && !opens_if {
                    top.2 = top.2.saturating_sub(1);
                } else if top.2 == 0 && is_match(&ELSE_RE, trimmed) {
                    top.1 = true;
                }
            }
        }
        issues
    }
}

/// QA013: too many globals added to one file within a single change set.
pub struct GlobalVariableOveruseRule {
    warning_count: usize,
    max_count: usize,
}

impl GlobalVariableOveruseRule {
    pub fn new(warning_count: usize, max_count: usize) -> Self {
        Self { warning_count, max_count }
    }
}

impl QaRuleChecker for GlobalVariableOveruseRule {
    fn rule_id(&self) -> &str {
        "QA013"
    }
    fn rule_name(&self) -> &str {
        "Global variable overuse"
    }
    fn description(&self) -> &str {
        "Counts global variables added per file and warns past the threshold"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_change_set(&self, changes: &ChangeSet) -> Vec<QAIssue> {
        let mut per_file: BTreeMap<&str, Vec<&VariableChange>> = BTreeMap::new();
        for change in &changes.variable_changes {
            if change.change_type == ChangeType::Added && change.scope == VarScope::Global {
                per_file.entry(change.file_path.as_str()).or_default().push(change);
            }
        }

        let mut issues = Vec::new();
        for (file, added) in per_file {
            let count = added.len();
            if count < self.warning_count {
                continue;
            }
            let severity = if count >= self.max_count { Severity::Critical } else { Severity::Warning };
            let line = added
                .get(self.warning_count.saturating_sub(1))
                .map(|c| c.line)
                .unwrap_or_default();
            issues.push(
                QAIssue::new(self.rule_id(), severity, category::ARCHITECTURE, "Too many global variables")
                    .at(file, line)
                    .description(format!("{count} global variables added to {file} (warning at {}, limit {})", self.warning_count, self.max_count))
                    .why_dangerous("Globals couple every POU to shared state and make write conflicts between tasks likely.")
                    .recommendation("Group related values in a struct or pass them as function block inputs and outputs."),
            );
        }
        issues
    }
}

static IF_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?i)\bIF\b"));
static ELSIF_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?i)\bELSIF\b"));
static CASE_LABEL_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?m)^\s*\d+\s*:"));
static LOOP_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?i)\b(FOR|WHILE|REPEAT)\b"));
static LOGICAL_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?i)\b(AND|OR)\b"));

fn count(re: &LazyRegex, text: &str) -> usize {
    re.as_ref().map(|r| r.find_iter(text).count()).unwrap_or(0)
}

/// Cyclomatic complexity estimated from keywords in source text.
pub fn text_complexity(code: &str) -> usize {
    let code: String = code.lines().map(strip_line_comment).collect::<Vec<_>>().join("\n");
    1 + count(&IF_RE, &code)
        + count(&ELSIF_RE, &code)
        + count(&CASE_LABEL_RE, &code)
        + count(&LOOP_RE, &code)
        + count(&LOGICAL_RE, &code)
}

/// QA017: cyclomatic complexity at or above the threshold.
pub struct HighComplexityRule {
    threshold: usize,
}

impl HighComplexityRule {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }
}

impl QaRuleChecker for HighComplexityRule {
    fn rule_id(&self) -> &str {
        "QA017"
    }
    fn rule_name(&self) -> &str {
        "High complexity"
    }
    fn description(&self) -> &str {
        "Detects logic whose cyclomatic complexity reaches the threshold"
    }
    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn check_logic_change(&self, change: &LogicChange) -> Vec<QAIssue> {
        let Some(code) = change.code_to_check() else {
            return Vec::new();
        };
        let complexity = text_complexity(code);
        if complexity < self.threshold {
            return Vec::new();
        }
        vec![QAIssue::new(self.rule_id(), self.severity(), category::COMPLEXITY, "High cyclomatic complexity")
            .at(&change.file_path, change.start_line)
            .description(format!("{} has cyclomatic complexity {complexity} (threshold {})", change.element_name, self.threshold))
            .why_dangerous("Every independent path needs a test; high counts leave paths unverified.")
            .recommendation("Split decision logic into smaller units or replace IF chains with a CASE on state.")]
    }
}

static VAR_INPUT_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?i)^VAR_INPUT\b"));
static END_VAR_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?i)^END_VAR\b"));

fn count_input_parameters(code: &str) -> usize {
    let mut in_inputs = false;
    let mut params = 0;
    for raw in code.lines() {
        let line = strip_line_comment(raw);
        let trimmed = line.trim();
        if is_match(&VAR_INPUT_RE, trimmed) {
            in_inputs = true;
        } else if is_match(&END_VAR_RE, trimmed) {
            in_inputs = false;
        } else if in_inputs && trimmed.contains(':') && trimmed.ends_with(';') {
            params += 1;
        }
    }
    params
}

/// QA018: too many VAR_INPUT parameters.
pub struct TooManyParametersRule {
    threshold: usize,
}

impl TooManyParametersRule {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }
}

impl QaRuleChecker for TooManyParametersRule {
    fn rule_id(&self) -> &str {
        "QA018"
    }
    fn rule_name(&self) -> &str {
        "Too many parameters"
    }
    fn description(&self) -> &str {
        "Detects POUs declaring many VAR_INPUT parameters"
    }
    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn check_logic_change(&self, change: &LogicChange) -> Vec<QAIssue> {
        let Some(code) = change.code_to_check() else {
            return Vec::new();
        };
        let params = count_input_parameters(code);
        if params < self.threshold {
            return Vec::new();
        }
        vec![QAIssue::new(self.rule_id(), self.severity(), category::MAINTAINABILITY, "Too many parameters")
            .at(&change.file_path, change.start_line)
            .description(format!("{} declares {params} inputs (threshold {})", change.element_name, self.threshold))
            .why_dangerous("Long parameter lists invite argument mix-ups at call sites.")
            .recommendation("Group related inputs into a struct.")]
    }
}

/// QA021: globals removed from, or added to, a global list without the `g` prefix.
///
/// A removed global may still be referenced elsewhere; an added unprefixed
/// global is hard to tell apart from locals and is easily left unused.
pub struct UnusedGlobalRule;

impl QaRuleChecker for UnusedGlobalRule {
    fn rule_id(&self) -> &str {
        "QA021"
    }
    fn rule_name(&self) -> &str {
        "Unused global variable"
    }
    fn description(&self) -> &str {
        "Flags removed globals that may leave dangling references and unprefixed new globals"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_variable_change(&self, change: &VariableChange) -> Vec<QAIssue> {
        if !matches!(change.scope, VarScope::Global) {
            return Vec::new();
        }
        let name = change.variable_name.as_str();
        match change.change_type {
            ChangeType::Removed => vec![QAIssue::new(self.rule_id(), self.severity(), category::ARCHITECTURE, "Global variable removed")
                .at(&change.file_path, change.line)
                .description(format!("Global '{name}' was removed; remaining references will fail to resolve"))
                .why_dangerous("Other POUs or HMI symbols that still read the global break at build time or, through symbol access, at runtime.")
                .recommendation(format!("Search the project and HMI for '{name}' before removing it."))
                .snippets(name, "")],
            ChangeType::Added if !name.starts_with('g') && !name.starts_with('G') => {
                vec![QAIssue::new(self.rule_id(), self.severity(), category::NAMING, "Global variable without g prefix")
                    .at(&change.file_path, change.line)
                    .description(format!("Global '{name}' does not follow the g-prefix convention"))
                    .why_dangerous("Unprefixed globals are mistaken for locals, which hides shared state and unused declarations.")
                    .recommendation(format!("Rename to g{name} or move it into the POU that uses it."))
                    .snippets("", name)]
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nesting_counts_only_block_openers() {
        let code = "IF a THEN\n  FOR i := 1 TO 3 DO\n    IF b THEN\n      x := 1;\n    END_IF\n  END_FOR\nEND_IF";
        assert_eq!(max_nesting(code), (3, 2));
    }

    #[test]
    fn complexity_counts_keywords_and_labels() {
        let code = "IF a AND b THEN\n x := 1;\nELSIF c THEN\n x := 2;\nEND_IF\nCASE s OF\n 1: y := 1;\n 2: y := 2;\nEND_CASE";
        // 1 + IF + ELSIF + 2 labels + AND (END_IF is a different word)
        assert_eq!(text_complexity(code), 6);
    }

    #[test]
    fn typed_literals_are_not_magic() {
        let found = MagicNumberRule::numbers_in("t(IN := TRUE, PT := T#5S); mask := 16#FF; speed := 42;");
        assert_eq!(found, vec!["42".to_string()]);
    }

    #[test]
    fn input_parameters_are_counted_per_declaration() {
        let code = "VAR_INPUT\n a : INT;\n b : BOOL; // flag\nEND_VAR\nVAR\n c : INT;\nEND_VAR";
        assert_eq!(count_input_parameters(code), 2);
    }
}
