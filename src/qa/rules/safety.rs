//! Safety rules: type narrowing, initialisation, array/pointer access,
//! float equality, hard-wired I/O and unbounded loops.
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::category;
use super::{base_type, is_match, is_pointer_type, is_real_type, snippet, type_bits, LazyRegex};
use crate::qa::changes::{ChangeType, DataTypeChange, LogicChange, VariableChange};
use crate::qa::checker::QaRuleChecker;
use crate::qa::issue::{QAIssue, Severity};

const FLOAT_EPSILON: &str = "1.0E-6";

/// QA001: a modified variable whose new type is narrower than the old one.
pub struct TypeNarrowingRule;

impl QaRuleChecker for TypeNarrowingRule {
    fn rule_id(&self) -> &str {
        "QA001"
    }
    fn rule_name(&self) -> &str {
        "Type narrowing"
    }
    fn description(&self) -> &str {
        "Detects data type changes that shrink the storage width of a variable"
    }
    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn check_variable_change(&self, change: &VariableChange) -> Vec<QAIssue> {
        if change.change_type != ChangeType::Modified {
            return Vec::new();
        }
        let (Some(old), Some(new)) = (change.old_data_type.as_deref(), change.new_data_type.as_deref()) else {
            return Vec::new();
        };
        let (Some(old_bits), Some(new_bits)) = (type_bits(old), type_bits(new)) else {
            return Vec::new();
        };
        if new_bits >= old_bits {
            return Vec::new();
        }

        vec![QAIssue::new(self.rule_id(), self.severity(), category::TYPE_SAFETY, "Type narrowing may lose data")
            .at(&change.file_path, change.line)
            .description(format!(
                "{}: {} ({old_bits} bit) changed to {} ({new_bits} bit)",
                change.variable_name,
                base_type(old),
                base_type(new)
            ))
            .why_dangerous(
                "Values outside the range of the narrower type are truncated or wrap around silently. \
                 Existing assignments from wider expressions keep compiling and corrupt data at runtime.",
            )
            .recommendation(format!(
                "Keep {} or convert explicitly with a range check before assigning to the narrower type.",
                base_type(old)
            ))
            .examples([
                format!("// before: {} : {};", change.variable_name, base_type(old)),
                format!("// after:  {} : {};", change.variable_name, base_type(new)),
                "IF value <= 32767 AND value >= -32768 THEN counter := DINT_TO_INT(value); END_IF".to_string(),
            ])
            .snippets(old, new)]
    }
}

/// QA002: a newly added variable of a type that must be set before use, with no initialiser.
pub struct UninitializedVariableRule;

const CRITICAL_INIT_TYPES: &[&str] = &[
    "BOOL", "INT", "DINT", "LINT", "UINT", "UDINT", "ULINT", "REAL", "LREAL", "BYTE", "WORD", "DWORD", "LWORD",
    "POINTER", "REFERENCE",
];

fn needs_initializer(data_type: &str) -> bool {
    let base = base_type(data_type);
    let head = base.split_whitespace().next().unwrap_or("");
    CRITICAL_INIT_TYPES.contains(&head)
}

impl QaRuleChecker for UninitializedVariableRule {
    fn rule_id(&self) -> &str {
        "QA002"
    }
    fn rule_name(&self) -> &str {
        "Uninitialized variable"
    }
    fn description(&self) -> &str {
        "Detects new variables declared without an explicit initial value"
    }
    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn check_variable_change(&self, change: &VariableChange) -> Vec<QAIssue> {
        if change.change_type != ChangeType::Added || change.new_initial_value.is_some() {
            return Vec::new();
        }
        let Some(data_type) = change.new_data_type.as_deref() else {
            return Vec::new();
        };
        if !needs_initializer(data_type) {
            return Vec::new();
        }

        vec![QAIssue::new(self.rule_id(), self.severity(), category::INITIALIZATION, "Variable is not initialized")
            .at(&change.file_path, change.line)
            .description(format!("{} : {} has no initial value", change.variable_name, data_type))
            .why_dangerous(
                "After a warm restart or an online change the variable may hold a stale value, \
                 and pointers or references may point at released memory.",
            )
            .recommendation(format!("Declare an explicit initial value: {} : {} := <value>;", change.variable_name, data_type))
            .examples([
                format!("// risky: {} : {};", change.variable_name, data_type),
                format!("// safe:  {} : {} := 0;", change.variable_name, data_type),
            ])
            .snippets("", format!("{} : {};", change.variable_name, data_type))]
    }
}

static ARRAY_ACCESS_RE: LazyRegex = Lazy::new(|| Regex::new(r"(\w+)\[([^\]]+)\]"));
static BOUNDS_CHECK_RE: LazyRegex =
    Lazy::new(|| Regex::new(r"(?i)IF\s+(\w+)\s*(>=|>)\s*\d+\s*AND\s*(\w+)\s*(<=|<)\s*\d+"));

/// QA003: array access through a computed index with no bounds check in the same code.
pub struct ArrayBoundsRule;

impl ArrayBoundsRule {
    fn has_bounds_check(code: &str, index: &str) -> bool {
        let Ok(re) = BOUNDS_CHECK_RE.as_ref() else {
            return false;
        };
        re.captures_iter(code).any(|c| {
            let lower = c.get(1).map(|m| m.as_str()).unwrap_or("");
            let upper = c.get(3).map(|m| m.as_str()).unwrap_or("");
            lower.eq_ignore_ascii_case(index) && upper.eq_ignore_ascii_case(index)
        })
    }
}

impl QaRuleChecker for ArrayBoundsRule {
    fn rule_id(&self) -> &str {
        "QA003"
    }
    fn rule_name(&self) -> &str {
        "Array bounds check missing"
    }
    fn description(&self) -> &str {
        "Detects array indexing by variables or expressions without a preceding range check"
    }
    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn check_logic_change(&self, change: &LogicChange) -> Vec<QAIssue> {
        let Some(code) = change.code_to_check() else {
            return Vec::new();
        };
        let Ok(re) = ARRAY_ACCESS_RE.as_ref() else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut issues = Vec::new();
        for caps in re.captures_iter(code) {
            let (Some(whole), Some(array), Some(index)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            let index_text = index.as_str().trim();
            if array.as_str().eq_ignore_ascii_case("ARRAY") || index_text.contains("..") {
                continue;
            }
            if index_text.parse::<i64>().is_ok() {
                continue;
            }
            let computed = index_text.contains('+') || index_text.contains('-');
            if !computed && Self::has_bounds_check(code, index_text) {
                continue;
            }
            if !seen.insert(whole.as_str().to_string()) {
                continue;
            }

            let line = change.line_at(whole.start());
            issues.push(
                QAIssue::new(self.rule_id(), self.severity(), category::MEMORY_SAFETY, "Array accessed without bounds check")
                    .at(&change.file_path, line)
                    .description(format!("{} is accessed with index '{}' that is never range-checked", array.as_str(), index_text))
                    .why_dangerous(
                        "An out-of-range index writes into neighbouring memory or raises a page fault \
                         that stops the PLC task.",
                    )
                    .recommendation(format!(
                        "Guard the access: IF {idx} >= <lower> AND {idx} <= <upper> THEN ... END_IF",
                        idx = index_text
                    ))
                    .examples([
                        format!("IF {index_text} >= 0 AND {index_text} <= 9 THEN"),
                        format!("    value := {}[{index_text}];", array.as_str()),
                        "END_IF".to_string(),
                    ])
                    .snippets("", snippet(whole.as_str(), 80)),
            );
        }
        issues
    }
}

static DEREF_RE: LazyRegex = Lazy::new(|| Regex::new(r"(\w+)\^"));
static NULL_CHECK_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?i)IF\s+(\w+)\s*(<>|<\s*>)\s*(NULL|0|16#0)"));

/// QA004: pointer dereference with no null test.
pub struct NullCheckRule;

impl NullCheckRule {
    fn is_checked(code: &str, pointer: &str) -> bool {
        let upper = code.to_ascii_uppercase();
        if upper.contains("__ISVALIDREF") && upper.contains(&pointer.to_ascii_uppercase()) {
            return true;
        }
        let Ok(re) = NULL_CHECK_RE.as_ref() else {
            return false;
        };
        re.captures_iter(code)
            .any(|c| c.get(1).is_some_and(|m| m.as_str().eq_ignore_ascii_case(pointer)))
    }
}

impl QaRuleChecker for NullCheckRule {
    fn rule_id(&self) -> &str {
        "QA004"
    }
    fn rule_name(&self) -> &str {
        "Null pointer check missing"
    }
    fn description(&self) -> &str {
        "Detects pointer dereferences that are not guarded by a null or validity check"
    }
    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn check_logic_change(&self, change: &LogicChange) -> Vec<QAIssue> {
        let Some(code) = change.code_to_check() else {
            return Vec::new();
        };
        let Ok(re) = DEREF_RE.as_ref() else {
            return Vec::new();
        };

        let mut reported = HashSet::new();
        let mut issues = Vec::new();
        for caps in re.captures_iter(code) {
            let (Some(whole), Some(pointer)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = pointer.as_str();
            if !reported.insert(name.to_ascii_uppercase()) || Self::is_checked(code, name) {
                continue;
            }
            issues.push(
                QAIssue::new(self.rule_id(), self.severity(), category::MEMORY_SAFETY, "Pointer used without null check")
                    .at(&change.file_path, change.line_at(whole.start()))
                    .description(format!("{name}^ is dereferenced without checking {name} <> 0"))
                    .why_dangerous("Dereferencing a null or dangling pointer raises an access violation and halts the runtime.")
                    .recommendation(format!("Wrap the access in IF {name} <> 0 THEN ... END_IF or use __ISVALIDREF for references."))
                    .examples([
                        format!("IF {name} <> 0 THEN"),
                        format!("    value := {name}^;"),
                        "END_IF".to_string(),
                    ])
                    .snippets("", snippet(whole.as_str(), 80)),
            );
        }
        issues
    }

    fn check_data_type_change(&self, change: &DataTypeChange) -> Vec<QAIssue> {
        change
            .field_changes
            .iter()
            .filter(|f| f.change_type.adds_code())
            .filter(|f| f.new_data_type.as_deref().is_some_and(is_pointer_type))
            .map(|f| {
                let new_type = f.new_data_type.clone().unwrap_or_default();
                QAIssue::new(self.rule_id(), Severity::Warning, category::MEMORY_SAFETY, "Field changed to pointer or reference type")
                    .at(&change.file_path, change.line)
                    .description(format!("{}.{} is now {}", change.type_name, f.field_name, new_type))
                    .why_dangerous("Every consumer of this field now dereferences memory that may not be valid.")
                    .recommendation("Audit every access to the field and add null or __ISVALIDREF checks.")
                    .snippets(f.old_data_type.clone().unwrap_or_default(), new_type)
            })
            .collect()
    }
}

static FLOAT_COMPARE_RE: LazyRegex = Lazy::new(|| Regex::new(r"(\w[\w\.]*)\s*(=|<>)\s*([\w\.\-\+]+)"));
static SAFE_FLOAT_COMPARE_RE: LazyRegex =
    Lazy::new(|| Regex::new(r"(?i)ABS\s*\(\s*(\w+)\s*-\s*(\w+)\s*\)\s*<\s*[\d\.]+"));
static CONDITIONAL_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?i)\b(IF|ELSIF|WHILE|UNTIL)\b"));
static SCIENTIFIC_RE: LazyRegex = Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?[eE][+-]?\d+$"));

const FLOAT_NAME_HINTS: &[&str] = &[
    "temp", "speed", "position", "voltage", "current", "pressure", "flow", "rate", "ratio", "factor", "real",
    "float", "double",
];

fn looks_like_float(operand: &str) -> bool {
    if operand.contains('.') && operand.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '-') {
        return true;
    }
    if is_match(&SCIENTIFIC_RE, operand) {
        return true;
    }
    let lower = operand.to_ascii_lowercase();
    FLOAT_NAME_HINTS.iter().any(|h| lower.contains(h))
}

/// QA005: `=` or `<>` between floating point operands.
pub struct FloatingPointComparisonRule;

impl QaRuleChecker for FloatingPointComparisonRule {
    fn rule_id(&self) -> &str {
        "QA005"
    }
    fn rule_name(&self) -> &str {
        "Floating point equality"
    }
    fn description(&self) -> &str {
        "Detects REAL/LREAL values compared with = or <> instead of an epsilon test"
    }
    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn check_logic_change(&self, change: &LogicChange) -> Vec<QAIssue> {
        let Some(code) = change.code_to_check() else {
            return Vec::new();
        };
        if !is_match(&CONDITIONAL_RE, code) || is_match(&SAFE_FLOAT_COMPARE_RE, code) {
            return Vec::new();
        }
        let Ok(re) = FLOAT_COMPARE_RE.as_ref() else {
            return Vec::new();
        };

        let mut issues = Vec::new();
        for caps in re.captures_iter(code) {
            let (Some(whole), Some(left), Some(op), Some(right)) = (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
            else {
                continue;
            };
            // `:=`, `<=` and `>=` are not equality tests
            let before_op = code[..op.start()].trim_end().chars().last();
            if matches!(before_op, Some(':') | Some('<') | Some('>')) {
                continue;
            }
            let (l, r) = (left.as_str(), right.as_str());
            if !(looks_like_float(l) || looks_like_float(r)) {
                continue;
            }
            issues.push(
                QAIssue::new(self.rule_id(), self.severity(), category::FLOATING_POINT, "Direct floating point comparison")
                    .at(&change.file_path, change.line_at(whole.start()))
                    .description(format!("{l} {} {r}: REAL/LREAL values are compared exactly", op.as_str()))
                    .why_dangerous(
                        "Rounding error makes exact equality between computed floats unreliable, \
                         so the branch may never or always be taken.",
                    )
                    .recommendation(format!("Compare with a tolerance: IF ABS({l} - {r}) < {FLOAT_EPSILON} THEN"))
                    .examples([
                        format!("// risky: IF {l} = {r} THEN"),
                        format!("// safe:  IF ABS({l} - {r}) < EPSILON THEN"),
                    ])
                    .snippets("", snippet(whole.as_str(), 80)),
            );
        }
        issues
    }

    fn check_data_type_change(&self, change: &DataTypeChange) -> Vec<QAIssue> {
        change
            .field_changes
            .iter()
            .filter(|f| f.change_type.adds_code())
            .filter(|f| f.new_data_type.as_deref().is_some_and(is_real_type))
            .filter(|f| !f.old_data_type.as_deref().is_some_and(is_real_type))
            .map(|f| {
                let new_type = f.new_data_type.clone().unwrap_or_default();
                QAIssue::new(self.rule_id(), Severity::Warning, category::TYPE_SAFETY, "Field changed to floating point type")
                    .at(&change.file_path, change.line)
                    .description(format!("{}.{} is now {}", change.type_name, f.field_name, new_type))
                    .why_dangerous("Existing equality comparisons on this field become unreliable.")
                    .recommendation("Review every comparison on the field and switch to tolerance-based tests.")
                    .snippets(f.old_data_type.clone().unwrap_or_default(), new_type)
            })
            .collect()
    }
}

static IO_ADDRESS_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?i)AT\s+%[IQM][XBWDL]?\d+\.\d+"));

/// QA014: direct `AT %IX..` bindings instead of mapped symbols.
pub struct HardcodedIoAddressRule;

impl HardcodedIoAddressRule {
    fn issue(&self, file: &str, line: usize, address: &str) -> QAIssue {
        QAIssue::new(self.rule_id(), self.severity(), category::ARCHITECTURE, "Hard-coded I/O address")
            .at(file, line)
            .description(format!("Direct address binding '{address}'"))
            .why_dangerous("Hardware changes require code changes, and duplicate bindings to the same address go unnoticed.")
            .recommendation("Declare the signal without an address and link it through the I/O mapping.")
            .snippets("", address.to_string())
    }
}

impl QaRuleChecker for HardcodedIoAddressRule {
    fn rule_id(&self) -> &str {
        "QA014"
    }
    fn rule_name(&self) -> &str {
        "Hard-coded I/O address"
    }
    fn description(&self) -> &str {
        "Detects AT %I/%Q/%M bindings written directly in code"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_logic_change(&self, change: &LogicChange) -> Vec<QAIssue> {
        let Some(code) = change.code_to_check() else {
            return Vec::new();
        };
        let Ok(re) = IO_ADDRESS_RE.as_ref() else {
            return Vec::new();
        };
        re.find_iter(code)
            .map(|m| self.issue(&change.file_path, change.line_at(m.start()), m.as_str()))
            .collect()
    }
}

static COUNTER_BOUND_RE: LazyRegex =
    Lazy::new(|| Regex::new(r"(?i)\b(COUNT|COUNTER|ITERATION|INDEX)\s*<\s*\d+"));
static TIMEOUT_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?i)\b(TIMEOUT|TIME|ELAPSED)\b"));
static MAX_BOUND_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?i)\bMAX_\w+"));
static EXIT_RE: LazyRegex = Lazy::new(|| Regex::new(r"(?i)\bEXIT\b"));

/// QA015: WHILE/REPEAT loops with no visible way out.
pub struct InfiniteLoopRiskRule;

struct LoopBlock {
    keyword: &'static str,
    offset: usize,
    text: String,
}

fn loop_blocks(code: &str) -> Vec<LoopBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<LoopBlock> = None;
    for (offset, raw) in code.lines().enumerate() {
        let line = super::strip_line_comment(raw);
        let trimmed = line.trim().to_ascii_uppercase();
        if let Some(block) = current.as_mut() {
            block.text.push('\n');
            block.text.push_str(&line);
            let closes = match block.keyword {
                "WHILE" => trimmed.starts_with("END_WHILE"),
                _ => trimmed.starts_with("UNTIL"),
            };
            if closes {
                blocks.extend(current.take());
            }
            continue;
        }
        let keyword = if trimmed.starts_with("WHILE ") || trimmed == "WHILE" {
            Some("WHILE")
        } else if trimmed.starts_with("REPEAT") {
            Some("REPEAT")
        } else {
            None
        };
        if let Some(keyword) = keyword {
            current = Some(LoopBlock { keyword, offset, text: line });
        }
    }
    // unterminated loops are still inspected
    blocks.extend(current);
    blocks
}

impl QaRuleChecker for InfiniteLoopRiskRule {
    fn rule_id(&self) -> &str {
        "QA015"
    }
    fn rule_name(&self) -> &str {
        "Infinite loop risk"
    }
    fn description(&self) -> &str {
        "Detects WHILE/REPEAT loops without EXIT, counter limit or timeout"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_logic_change(&self, change: &LogicChange) -> Vec<QAIssue> {
        let Some(code) = change.code_to_check() else {
            return Vec::new();
        };
        loop_blocks(code)
            .into_iter()
            .filter(|b| {
                !(is_match(&EXIT_RE, &b.text)
                    || is_match(&COUNTER_BOUND_RE, &b.text)
                    || is_match(&TIMEOUT_RE, &b.text)
                    || is_match(&MAX_BOUND_RE, &b.text))
            })
            .map(|b| {
                QAIssue::new(self.rule_id(), self.severity(), category::SAFETY, "Infinite loop risk")
                    .at(&change.file_path, change.start_line + b.offset)
                    .description(format!("{} loop has no EXIT, iteration limit or timeout", b.keyword))
                    .why_dangerous("A loop that never terminates exceeds the task cycle time and trips the watchdog.")
                    .recommendation("Add an iteration counter limit (e.g. counter < MAX_ITERATIONS) or a timeout with EXIT.")
                    .snippets("", snippet(&b.text, 200))
            })
            .collect()
    }
}
