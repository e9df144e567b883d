//! Hand-written QA rules (QA001..QA021).
//!
//! Each rule is a unit-ish struct implementing [`QaRuleChecker`]. Rules that
//! take a threshold capture it at construction from [`RuleThresholds`], so a
//! rule value never changes after the engine is built.
use once_cell::sync::Lazy;
use regex::Regex;

use super::checker::QaRuleChecker;
use crate::config::RuleThresholds;

pub mod quality;
pub mod safety;
pub mod style;

pub use quality::{
    DeepNestingRule, DuplicateCodeRule, GlobalVariableOveruseRule, HighComplexityRule, LongFunctionRule,
    MagicNumberRule, MissingCaseElseRule, TooManyParametersRule, UnusedGlobalRule, UnusedVariableRule,
};
pub use safety::{
    ArrayBoundsRule, FloatingPointComparisonRule, HardcodedIoAddressRule, InfiniteLoopRiskRule, NullCheckRule,
    TypeNarrowingRule, UninitializedVariableRule,
};
pub use style::{ExcessivelyLongNameRule, InconsistentStyleRule, InsufficientCommentsRule, NamingConventionRule};

pub(crate) mod category {
    pub const TYPE_SAFETY: &str = "Type Safety";
    pub const INITIALIZATION: &str = "Initialization";
    pub const MEMORY_SAFETY: &str = "Memory Safety";
    pub const FLOATING_POINT: &str = "Floating Point";
    pub const SAFETY: &str = "Safety";
    pub const CODE_QUALITY: &str = "Code Quality";
    pub const MAINTAINABILITY: &str = "Maintainability";
    pub const COMPLEXITY: &str = "Complexity";
    pub const NAMING: &str = "Naming";
    pub const ARCHITECTURE: &str = "Architecture";
    pub const STYLE: &str = "Code Style";
}

/// Regex compiled on first use; a pattern that fails to compile disables the check instead of panicking.
pub(crate) type LazyRegex = Lazy<Result<Regex, regex::Error>>;

pub(crate) fn is_match(re: &LazyRegex, text: &str) -> bool {
    re.as_ref().map(|r| r.is_match(text)).unwrap_or(false)
}

/// Every hand-written rule, in id order.
pub fn default_rules(thresholds: &RuleThresholds) -> Vec<Box<dyn QaRuleChecker>> {
    vec![
        Box::new(TypeNarrowingRule),
        Box::new(UninitializedVariableRule),
        Box::new(ArrayBoundsRule),
        Box::new(NullCheckRule),
        Box::new(FloatingPointComparisonRule),
        Box::new(UnusedVariableRule),
        Box::new(MagicNumberRule),
        Box::new(LongFunctionRule::new(thresholds.max_function_lines, thresholds.critical_function_lines)),
        Box::new(DeepNestingRule::new(thresholds.max_nesting_depth)),
        Box::new(DuplicateCodeRule::default()),
        Box::new(MissingCaseElseRule),
        Box::new(NamingConventionRule),
        Box::new(GlobalVariableOveruseRule::new(thresholds.global_warning_count, thresholds.global_max_count)),
        Box::new(HardcodedIoAddressRule),
        Box::new(InfiniteLoopRiskRule),
        Box::new(InsufficientCommentsRule::new(thresholds.lines_per_comment)),
        Box::new(HighComplexityRule::new(thresholds.max_complexity)),
        Box::new(TooManyParametersRule::new(thresholds.max_parameters)),
        Box::new(ExcessivelyLongNameRule::new(thresholds.max_name_length)),
        Box::new(InconsistentStyleRule),
        Box::new(UnusedGlobalRule),
    ]
}

/// Drop `//` and `(* ... *)` comments from a single line.
pub(crate) fn strip_line_comment(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    loop {
        let line_comment = rest.find("//");
        let block_comment = rest.find("(*");
        match (line_comment, block_comment) {
            (Some(l), Some(b)) if l < b => {
                out.push_str(&rest[..l]);
                return out;
            }
            (Some(l), None) => {
                out.push_str(&rest[..l]);
                return out;
            }
            (_, Some(b)) => {
                out.push_str(&rest[..b]);
                match rest[b + 2..].find("*)") {
                    Some(end) => rest = &rest[b + 2 + end + 2..],
                    None => return out,
                }
            }
            (None, None) => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

/// `ARRAY[0..9] OF INT` becomes `INT`; anything else is upper-cased and trimmed.
pub(crate) fn base_type(data_type: &str) -> String {
    let upper = data_type.trim().to_ascii_uppercase();
    match upper.rfind(" OF ") {
        Some(idx) if upper.starts_with("ARRAY") => upper[idx + 4..].trim().to_string(),
        _ => upper,
    }
}

/// Storage width in bits for elementary numeric types.
pub(crate) fn type_bits(data_type: &str) -> Option<u32> {
    match base_type(data_type).as_str() {
        "SINT" | "USINT" | "BYTE" => Some(8),
        "INT" | "UINT" | "WORD" => Some(16),
        "DINT" | "UDINT" | "REAL" | "DWORD" => Some(32),
        "LINT" | "ULINT" | "LREAL" | "LWORD" => Some(64),
        _ => None,
    }
}

pub(crate) fn is_real_type(data_type: &str) -> bool {
    matches!(base_type(data_type).as_str(), "REAL" | "LREAL")
}

pub(crate) fn is_pointer_type(data_type: &str) -> bool {
    let upper = data_type.trim().to_ascii_uppercase();
    upper.starts_with("POINTER") || upper.starts_with("REFERENCE") || upper.starts_with("REF_TO")
}

/// First `max` characters of a snippet, for issue payloads.
pub(crate) fn snippet(code: &str, max: usize) -> String {
    crate::truncate_utf8_safe(code.trim(), max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_both_comment_styles() {
        assert_eq!(strip_line_comment("x := 1; // note").trim(), "x := 1;");
        assert_eq!(strip_line_comment("x (* a *) := 2;"), "x  := 2;");
        assert_eq!(strip_line_comment("(* open"), "");
    }

    #[test]
    fn array_types_resolve_to_element_type() {
        assert_eq!(base_type("ARRAY[0..9] OF int"), "INT");
        assert_eq!(type_bits("ARRAY[1..3] OF LREAL"), Some(64));
        assert_eq!(type_bits("ST_Motor"), None);
    }

    #[test]
    fn pointer_detection_covers_ref_to() {
        assert!(is_pointer_type("POINTER TO INT"));
        assert!(is_pointer_type("REF_TO ST_Data"));
        assert!(!is_pointer_type("DINT"));
    }
}
