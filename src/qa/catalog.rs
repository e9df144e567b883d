//! Table-driven rules following the TE1200 static analysis numbering (SA0001..SA0180).
//!
//! Each row is a single regex plus the text of the issue it raises. Rows are
//! compiled once; a row whose pattern fails to compile is logged and left out.
//! SA0005 is unassigned, so the table has 179 rows. Rows whose pattern only
//! approximates a check that needs the syntax tree are off by default.
use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::changes::{DataTypeChange, LogicChange, VariableChange};
use super::checker::QaRuleChecker;
use super::issue::{QAIssue, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaCategory {
    UnreachableUnusedCode,
    Conversions,
    Operations,
    VariablesAndConstants,
    Declarations,
    Initialization,
    Concurrency,
    ObjectOriented,
    NamingConventions,
    Metrics,
    Comments,
    StrictIEC,
    MemoryLayout,
    Safety,
    Miscellaneous,
}

impl fmt::Display for SaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SaCategory::UnreachableUnusedCode => "Unreachable/Unused Code",
            SaCategory::Conversions => "Conversions",
            SaCategory::Operations => "Operations",
            SaCategory::VariablesAndConstants => "Variables and Constants",
            SaCategory::Declarations => "Declarations",
            SaCategory::Initialization => "Initialization",
            SaCategory::Concurrency => "Concurrency",
            SaCategory::ObjectOriented => "Object Oriented",
            SaCategory::NamingConventions => "Naming Conventions",
            SaCategory::Metrics => "Metrics",
            SaCategory::Comments => "Comments",
            SaCategory::StrictIEC => "Strict IEC",
            SaCategory::MemoryLayout => "Memory Layout",
            SaCategory::Safety => "Safety",
            SaCategory::Miscellaneous => "Miscellaneous",
        };
        f.write_str(s)
    }
}

/// Which change record a row inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaTarget {
    /// New code of an added or modified logic block.
    Logic,
    /// `name : TYPE := init` rendering of an added or modified variable.
    Variable,
    /// New definition text of an added or modified data type.
    DataType,
}

#[derive(Debug, Clone, Copy)]
pub struct SaRuleSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub severity: Severity,
    pub category: SaCategory,
    pub target: SaTarget,
    pub pattern: &'static str,
    pub title: &'static str,
    pub recommendation: &'static str,
    pub enabled_by_default: bool,
}

macro_rules! sa {
    ($id:literal, $name:literal, $sev:ident, $cat:ident, $target:ident, $pattern:literal, $title:literal, $rec:literal) => {
        sa!($id, $name, $sev, $cat, $target, $pattern, $title, $rec, true)
    };
    ($id:literal, $name:literal, $sev:ident, $cat:ident, $target:ident, $pattern:literal, $title:literal, $rec:literal, $enabled:literal) => {
        SaRuleSpec {
            id: $id,
            name: $name,
            severity: Severity::$sev,
            category: SaCategory::$cat,
            target: SaTarget::$target,
            pattern: $pattern,
            title: $title,
            recommendation: $rec,
            enabled_by_default: $enabled,
        }
    };
}

pub static SA_RULES: &[SaRuleSpec] = &[
    sa!("SA0001", "Unreachable code", Warning, UnreachableUnusedCode, Logic,
        r"(?i)\bIF\s+(FALSE|0\s*=\s*1|1\s*=\s*0)\s+THEN",
        "Condition is always false",
        "Remove the dead branch or replace the constant with the intended condition."),
    sa!("SA0002", "Empty object", Warning, UnreachableUnusedCode, Logic,
        r"(?i)\b(PROGRAM|FUNCTION_BLOCK|FUNCTION|METHOD)\s+\w+(\s*:\s*\w+)?\s*END_(PROGRAM|FUNCTION_BLOCK|FUNCTION|METHOD)\b",
        "POU without declarations or body",
        "Implement the POU or delete it."),
    sa!("SA0003", "Empty statement", Info, UnreachableUnusedCode, Logic,
        r"(?m)^\s*;\s*$",
        "Empty statement",
        "Delete the stray semicolon."),
    sa!("SA0004", "Multiple write access on output", Warning, Concurrency, Logic,
        r"(?m)^\s*(q[A-Z]|Q_|o[A-Z])\w*\s*:=",
        "Output written in code",
        "Write each output from one place per cycle.",
        false),
    sa!("SA0006", "Write access from several tasks", Critical, Concurrency, Variable,
        r"^(g[A-Z]|G_)\w*\s*:",
        "Global variable added",
        "Decide which task owns the variable and keep writes in that task.",
        false),
    sa!("SA0007", "Address operator on constant", Warning, Operations, Logic,
        r"\bADR\s*\(\s*([A-Z_][A-Z0-9_]*|[0-9]+)\s*\)",
        "ADR applied to a constant",
        "Take the address of a variable; constants may live in read-only memory."),
    sa!("SA0008", "Subrange type", Warning, Conversions, Variable,
        r"\(\s*-?\d+\s*\.\.\s*-?\d+\s*\)",
        "Subrange type checked at runtime",
        "Range-check values before assigning them to the subrange variable."),
    sa!("SA0009", "Unused return value", Warning, UnreachableUnusedCode, Logic,
        r"(?m)^\s*F_\w+\s*\([^;]*\)\s*;",
        "Function result discarded",
        "Assign the result and check it, error codes in particular."),
    sa!("SA0010", "Array with only one element", Info, Declarations, Variable,
        r"(?i)ARRAY\s*\[\s*(0\s*\.\.\s*0|1\s*\.\.\s*1)\s*\]",
        "Single-element array",
        "Declare a plain variable instead of a one-element array."),
    sa!("SA0011", "Enumeration with one member", Info, Declarations, DataType,
        r":\s*\(\s*\w+\s*(:=\s*[^,)]+)?\)",
        "Single-member enumeration",
        "Use a constant or a BOOL instead."),
    sa!("SA0012", "Variable could be a constant", Info, VariablesAndConstants, Variable,
        r"^[A-Z][A-Z0-9]*_[A-Z0-9_]*\s*:\s*\w+\s*:=",
        "Constant-style name declared as a variable",
        "Move the declaration into VAR CONSTANT.",
        false),
    sa!("SA0013", "Local variable with global name", Warning, Declarations, Variable,
        r"^(g[A-Z]|G_)\w*\s*:\s*\w+\s*$",
        "Local name uses the global prefix",
        "Rename the variable so it cannot be mistaken for a global.",
        false),
    sa!("SA0014", "Assignment of instances", Warning, ObjectOriented, Logic,
        r"\bfb\w+\s*:=\s*fb\w+\s*;",
        "Function block instance copied by assignment",
        "Copy the needed outputs or use a reference; instance copies duplicate internal state."),
    sa!("SA0015", "Global access in FB_init", Warning, Initialization, Logic,
        r"(?s)(?i:\bMETHOD\s+FB_init\b)(?:[^E]|E[^N]|EN[^D])*?\b(GVL\w*\.\w+|g[A-Z]\w*)",
        "Global variable used in FB_init",
        "Pass the value as an FB_init parameter; globals may not be initialised yet."),
    sa!("SA0016", "Gaps in structures", Info, MemoryLayout, DataType,
        r"(?is)\b(BOOL|BYTE|SINT|USINT)\s*;\s*\w+\s*:\s*(LREAL|LINT|ULINT|LWORD|REAL|DINT|UDINT|DWORD|TIME)\b",
        "Small member followed by a wide one",
        "Order members from widest to narrowest to avoid padding."),
    sa!("SA0017", "Non-regular assignment to pointer", Critical, Operations, Logic,
        r"\bp[A-Z]\w*\s*:=\s*[1-9][0-9]*\s*;",
        "Pointer assigned a literal address",
        "Assign pointers only from ADR(), another pointer or 0."),
    sa!("SA0018", "Unusual bit access", Warning, Operations, Logic,
        r"\b[in][A-Z]\w*\.\d+\b",
        "Bit access on a signed integer",
        "Use an unsigned type or mask with AND.",
        false),
    sa!("SA0019", "Implicit pointer conversion", Warning, Conversions, Logic,
        r"(?i)POINTER\s+TO\s+\w+.*:=.*POINTER\s+TO",
        "Implicit conversion between pointer types",
        "Convert explicitly and check that the target types match."),
    sa!("SA0020", "Possibly truncated value assigned to REAL", Warning, Conversions, Logic,
        r"(?i)\b(DINT|UDINT|LINT|ULINT)_TO_REAL\s*\(",
        "Integer converted to REAL loses precision",
        "Convert to LREAL, or make sure the value fits in 24 bits."),
    sa!("SA0021", "Address of temporary variable", Critical, Safety, Logic,
        r"\bp[A-Z]\w*\s*:=\s*(?i:ADR)\s*\(\s*(?i:tmp|temp)\w*\s*\)",
        "Pointer to a temporary variable",
        "Point at a VAR_STAT or global; temporaries vanish when the call returns."),
    sa!("SA0022", "Return value never assigned", Warning, UnreachableUnusedCode, Logic,
        r"(?is)\bFUNCTION\s+\w+\s*:\s*\w+\s*(?:[^:]|:[^=])*?END_FUNCTION\b",
        "Function never assigns a result",
        "Assign the function name before every return path."),
    sa!("SA0023", "Complex return value", Info, Declarations, Logic,
        r"(?i)\bFUNCTION\s+\w+\s*:\s*(ARRAY|STRUCT|ST_)",
        "Function returns a structured value",
        "Return large values through VAR_IN_OUT or VAR_OUTPUT."),
    sa!("SA0024", "Untyped literal", Info, Conversions, Logic,
        r":=\s*\d{3,}\s*;",
        "Large untyped literal",
        "Write typed literals such as DINT#100000.",
        false),
    sa!("SA0025", "Unqualified enumeration constant", Info, NamingConventions, Logic,
        r"(?:^|[^.\w])e[A-Z][a-z]\w*\s*[;,)]",
        "Enumeration value without its type",
        "Qualify enumeration values, e.g. E_State.eIdle.",
        false),
    sa!("SA0026", "Direct address access", Warning, Safety, Logic,
        r"%[IQM][XBWD]?\d+(\.\d+)?",
        "Direct hardware address in code",
        "Use mapped symbolic variables instead of %I/%Q/%M addresses."),
    sa!("SA0027", "Unsafe type conversion", Warning, Conversions, Logic,
        r"(?i)\b(DINT_TO_INT|LINT_TO_DINT|INT_TO_SINT|DINT_TO_SINT|LREAL_TO_REAL)\s*\(",
        "Narrowing conversion",
        "Range-check the value before converting to the smaller type."),
    sa!("SA0028", "Nested comment", Warning, Comments, Logic,
        r"\(\*([^*]|\*[^)])*\(\*",
        "Nested block comment",
        "Nested (* *) comments are not portable; close the outer comment first."),
    sa!("SA0029", "TODO comment", Info, Comments, Logic,
        r"(?i)//\s*(TODO|FIXME|HACK|XXX|BUG):",
        "Open work marker in comment",
        "Resolve the marker or track it outside the code."),
    sa!("SA0030", "Missing error handling", Warning, Safety, Logic,
        r"\w+\s*/\s*[A-Za-z_]\w*\s*;",
        "Division by a variable without visible guard",
        "Check the divisor before dividing.",
        false),
    sa!("SA0031", "Unused signature", Warning, UnreachableUnusedCode, Logic,
        r"(?i)\bMETHOD\s+(PRIVATE|INTERNAL)\s+\w+",
        "Private method",
        "Check that the method is called; remove it otherwise.",
        false),
    sa!("SA0032", "Unused enumeration constant", Info, UnreachableUnusedCode, DataType,
        r"(?i)\b(unused|reserved|spare)\w*\s*(:=|,|\))",
        "Placeholder enumeration value",
        "Remove enumeration values nothing refers to.",
        false),
    sa!("SA0033", "Unused variable", Warning, UnreachableUnusedCode, Logic,
        r"(?im)^\s*(dummy|unused|tmp)\w*\s*:\s*\w+",
        "Declaration looks unused",
        "Remove the variable or use it.",
        false),
    sa!("SA0034", "Unused input", Warning, UnreachableUnusedCode, Logic,
        r"(?is)\bVAR_INPUT\b(?:[^E]|E[^N]|EN[^D])*?\b(unused|dummy|reserved)\w*\s*:",
        "Placeholder input",
        "Remove inputs the block never reads.",
        false),
    sa!("SA0035", "Unused output", Warning, UnreachableUnusedCode, Logic,
        r"(?is)\bVAR_OUTPUT\b(?:[^E]|E[^N]|EN[^D])*?\b(unused|dummy|reserved)\w*\s*:",
        "Placeholder output",
        "Remove outputs the block never writes.",
        false),
    sa!("SA0036", "Unused in-out", Warning, UnreachableUnusedCode, Logic,
        r"(?is)\bVAR_IN_OUT\b(?:[^E]|E[^N]|EN[^D])*?\b(unused|dummy|reserved)\w*\s*:",
        "Placeholder in-out parameter",
        "Remove in-out parameters the block never touches.",
        false),
    sa!("SA0037", "Unused temporary", Info, UnreachableUnusedCode, Logic,
        r"(?is)\bVAR_TEMP\b(?:[^E]|E[^N]|EN[^D])*?\b(unused|dummy|reserved)\w*\s*:",
        "Placeholder temporary",
        "Remove temporaries the code never uses.",
        false),
    sa!("SA0038", "Write-only variable", Warning, UnreachableUnusedCode, Variable,
        r"(?i)^(dummy|unused)\w*\s*:",
        "Variable named as write-only",
        "Drop the variable if nothing reads it."),
    sa!("SA0039", "Read-only value declared as variable", Info, VariablesAndConstants, Variable,
        r"^(MAX_|MIN_|DEFAULT_|C_)\w*\s*:|^\w+_CONST\s*:",
        "Constant-style name declared as a variable",
        "Declare the value in VAR CONSTANT so it cannot be overwritten."),
    sa!("SA0040", "Division by zero", Critical, Operations, Logic,
        r"(?i)(/|\bMOD)\s*0+(\.0+)?\s*(;|\))",
        "Division by literal zero",
        "Guard the divisor: IF divisor <> 0 THEN ... END_IF"),
    sa!("SA0041", "Loop-invariant code", Info, Operations, Logic,
        r"(?is)\bFOR\b[^;]*?\bDO\b(?:[^E]|E[^N]|EN[^D])*?\w+\s*:=\s*\d+\s*[-+*/]\s*\d+\s*;",
        "Constant expression computed inside a loop",
        "Compute the value once before the loop."),
    sa!("SA0042", "Inconsistent namespace access", Info, NamingConventions, Logic,
        r"\bGVL_\w+\.\w+",
        "Qualified global access",
        "Qualify globals the same way everywhere.",
        false),
    sa!("SA0043", "Suspicious semicolon", Warning, Operations, Logic,
        r"(?im)\b(THEN|DO)\s*;\s*$",
        "Semicolon directly after THEN or DO",
        "Remove the semicolon; the block body is probably not what was intended."),
    sa!("SA0044", "Parenthesis mismatch", Critical, Operations, Logic,
        r"(?m)\([^*()\n;][^()\n;]*;",
        "Statement ends inside an open parenthesis",
        "Close the parenthesis before the semicolon."),
    sa!("SA0045", "Assignment in condition", Warning, Operations, Logic,
        r"(?i)\b(IF|WHILE)\b[^;\n]*?:=[^;\n]*?\b(THEN|DO)\b",
        "Assignment inside a condition",
        "Compute the value before the IF/WHILE and test the result."),
    sa!("SA0046", "Comparison with boolean literal", Info, Operations, Logic,
        r"(?i)\b\w+\s*(=|<>)\s*(TRUE|FALSE)\b",
        "Redundant comparison with TRUE/FALSE",
        "Test the BOOL directly: IF bReady THEN / IF NOT bReady THEN"),
    sa!("SA0047", "Duplicate condition", Warning, Operations, Logic,
        r"(?i)\bELSIF\s+TRUE\s+THEN",
        "ELSIF TRUE hides later branches",
        "Use ELSE, or give the branch its real condition."),
    sa!("SA0048", "String concatenation in loop", Info, Operations, Logic,
        r"(?is)\b(FOR|WHILE|REPEAT)\b(?:[^E]|E[^N]|EN[^D])*?\bCONCAT\s*\(",
        "CONCAT inside a loop",
        "Build the string once or use a buffer with explicit length."),
    sa!("SA0049", "Magic number", Info, VariablesAndConstants, Logic,
        r"(?:[<>=*/+-]|:=)\s*\d{3,}(\.\d+)?\b",
        "Unnamed numeric literal",
        "Introduce a named constant.",
        false),
    sa!("SA0050", "Complex expression", Warning, Metrics, Logic,
        r"(?i)(\b(AND|OR|XOR)\b[^;\n]*){4,}",
        "Expression with many boolean operators",
        "Split the condition into named intermediate results."),
    sa!("SA0051", "POU too long", Warning, Metrics, Logic,
        r"(?i)\b(FUNCTION_BLOCK|FUNCTION|METHOD|PROGRAM)\s+\w+(?:[^\n]*\n){200}",
        "POU longer than 200 lines",
        "Split the POU into smaller functions or methods.",
        false),
    sa!("SA0052", "Too many parameters", Warning, Metrics, Logic,
        r"(?is)\bVAR_INPUT\b(\s*\w+\s*:[^;]*;){8,}",
        "Eight or more inputs",
        "Group related inputs into a structure."),
    sa!("SA0053", "Nesting too deep", Warning, Metrics, Logic,
        r"(?m)^(\t{5,}| {20,})(IF|FOR|WHILE|CASE|REPEAT)\b",
        "Control statement nested five levels deep",
        "Extract the inner logic into its own method.",
        false),
    sa!("SA0054", "Cyclomatic complexity", Warning, Metrics, Logic,
        r"(?is)(\b(IF|ELSIF|WHILE|FOR|REPEAT)\b.*?){15}",
        "Many decision points in one block",
        "Split the block; each decision point needs its own test case.",
        false),
    sa!("SA0055", "Cognitive complexity", Info, Metrics, Logic,
        r"(?i)\b(AND|OR)\b[^;\n]*\b(AND|OR)\b[^;\n]*\bNOT\b",
        "Mixed AND/OR/NOT in one condition",
        "Name the partial conditions.",
        false),
    sa!("SA0056", "Insufficient comments", Info, Comments, Logic,
        r"(?s)\A(?:[^/(]|/[^/]|\([^*])*\z",
        "Code without any comment",
        "Explain intent and units in comments.",
        false),
    sa!("SA0057", "Missing header comment", Info, Comments, Logic,
        r"(?i)\A\s*(FUNCTION_BLOCK|FUNCTION|PROGRAM|METHOD)\s+\w+",
        "POU starts without a header comment",
        "Describe purpose, inputs and outputs in a header comment.",
        false),
    sa!("SA0058", "Outdated comment", Info, Comments, Logic,
        r"(?i)(//|\(\*)[^\n]*\b(OLD|OBSOLETE|DEPRECATED)\b",
        "Comment marks code as outdated",
        "Remove the outdated code or update the comment."),
    sa!("SA0059", "Commented-out code", Warning, Comments, Logic,
        r"(?im)//\s*(\w+\s*:=|IF\s|FOR\s|WHILE\s|END_)|\(\*\s*(\w+\s*:=|IF\s|FOR\s|WHILE\s)",
        "Code left in a comment",
        "Delete it; version control keeps the history."),
    sa!("SA0060", "Ineffective operation", Warning, Operations, Logic,
        r"\w+\s*:=\s*\w+\s*([+-]\s*0|[*/]\s*1)\s*;",
        "Operation with no effect",
        "Remove the operation or fix the operand."),
    sa!("SA0061", "Suspicious pointer operation", Warning, Operations, Logic,
        r"(?i)\bPOINTER\s+TO\b[^;]*[+-]\s*\d+",
        "Offset applied to a pointer",
        "Use array indexing with bounds checks.",
        false),
    sa!("SA0062", "Constant condition", Warning, Operations, Logic,
        r"(?i)\b(IF|ELSIF)\s+(TRUE|1\s*=\s*1|0\s*=\s*0)\s+THEN",
        "Condition is always true",
        "Remove the condition or restore the intended test."),
    sa!("SA0063", "Floating point equality", Warning, Operations, Logic,
        r"(?i)\b\w+\s*(=|<>)\s*-?\d+\.\d+\b",
        "Exact comparison with a REAL literal",
        "Compare against a tolerance: ABS(a - b) < EPSILON."),
    sa!("SA0064", "Pointer arithmetic", Critical, Operations, Logic,
        r"\bp[A-Z]\w*\s*:=\s*(p[A-Z]\w*|ADR\s*\([^)]*\))\s*[+\-]",
        "Pointer arithmetic",
        "Index an array or use SIZEOF-based offsets with explicit bounds checks."),
    sa!("SA0065", "Variable without initial value", Warning, Initialization, Variable,
        r"^\s*\w+\s*:\s*[A-Za-z_]\w*\s*$",
        "Variable declared without initial value",
        "Give the declaration an explicit initial value.",
        false),
    sa!("SA0066", "Array out of bounds", Critical, Operations, Logic,
        r"\w+\[\s*-\s*\d+\s*\]",
        "Negative constant array index",
        "Index within the declared bounds."),
    sa!("SA0067", "Global access in function", Warning, VariablesAndConstants, Logic,
        r"(?s)(?i:\bFUNCTION\s)(?:[^E]|E[^N]|EN[^D])*?\b(GVL\w*\.\w+|g[A-Z]\w*)",
        "Function reads or writes a global",
        "Pass the value as a parameter so the function stays side-effect free."),
    sa!("SA0068", "Circular reference", Warning, ObjectOriented, Variable,
        r"(?i)^\w+\s*:\s*(POINTER|REFERENCE)\s+TO\s+FB_\w+",
        "Reference to a function block",
        "Check that the referenced block does not point back.",
        false),
    sa!("SA0069", "Unimplemented interface", Critical, ObjectOriented, Logic,
        r"(?is)\bIMPLEMENTS\s+\w+(?:[^M]|M[^E])*?END_FUNCTION_BLOCK",
        "Interface declared but no method implemented",
        "Implement every interface method."),
    sa!("SA0070", "Empty CASE branch", Warning, Operations, Logic,
        r"(?m)^\s*[\w.#]+(\s*(,|\.\.)\s*[\w.#]+)*\s*:\s*;",
        "CASE label without statements",
        "Handle the value or merge the label with another branch."),
    sa!("SA0071", "Missing ELSE", Info, Operations, Logic,
        r"(?is)\bELSIF\b(?:[^E]|E[^LN]|EL[^S]|ELS[^E]|EN[^D])*\bEND_IF\b",
        "IF-ELSIF chain without ELSE",
        "Add an ELSE branch for the remaining cases."),
    sa!("SA0072", "CASE without ELSE", Warning, Operations, Logic,
        r"(?is)\bCASE\b(?:[^E]|E[^LN]|EL[^S]|ELS[^E]|EN[^D])*\bEND_CASE\b",
        "CASE statement without ELSE branch",
        "Add ELSE to handle unexpected values."),
    sa!("SA0073", "Variable naming", Info, NamingConventions, Variable,
        r"^[ac-wyz]\w*\s*:\s*BOOL\b",
        "BOOL variable without b/x prefix",
        "Prefix BOOL variables with b or x.",
        false),
    sa!("SA0074", "Function block naming", Info, NamingConventions, Logic,
        r"\b(?i:FUNCTION_BLOCK)\s+([A-EG-Za-z_]\w*|F[AC-Za-z0-9_]\w*|FB[A-Za-z0-9]\w*|FB)\b",
        "Function block name without FB_ prefix",
        "Name function blocks FB_<Name>."),
    sa!("SA0075", "Interface naming", Info, NamingConventions, DataType,
        r"\b(?i:INTERFACE)\s+([A-HJ-Za-z_]\w*|I[A-Za-z0-9]\w*)\b",
        "Interface name without I_ prefix",
        "Name interfaces I_<Name>."),
    sa!("SA0076", "Enumeration naming", Info, NamingConventions, DataType,
        r"\b(?i:TYPE)\s+([A-DF-Za-z_]\w*|E[A-Za-z0-9]\w*)\s*:\s*\(",
        "Enumeration name without E_ prefix",
        "Name enumerations E_<Name>."),
    sa!("SA0077", "Structure naming", Info, NamingConventions, DataType,
        r"\b(?i:TYPE)\s+([A-RT-Za-z_]\w*|S[A-SU-Za-z0-9_]\w*|ST[A-Za-z0-9]\w*)\s*:\s*(?i:STRUCT)\b",
        "Structure name without ST_ prefix",
        "Name structures ST_<Name>."),
    sa!("SA0078", "Constant naming", Info, NamingConventions, Logic,
        r"(?s)(?i:\bVAR\s+CONSTANT\b)(?:[^E]|E[^N]|EN[^D])*?(?m:^)\s*[A-Z0-9_]*[a-z]\w*\s*:",
        "Constant name not in upper case",
        "Write constants in UPPER_CASE.",
        false),
    sa!("SA0079", "Global variable naming", Info, NamingConventions, Logic,
        r"(?s)(?i:\bVAR_GLOBAL\b)(?:[^E]|E[^N]|EN[^D])*?(?m:^)\s*([a-fh-zA-FH-Z_]\w*|g[a-z0-9_]\w*)\s*:",
        "Global variable without g prefix",
        "Prefix globals with g or G_.",
        false),
    sa!("SA0080", "Implicit conversion", Warning, Conversions, Logic,
        r"(?i):\s*(U?S?D?L?INT|BYTE|WORD|DWORD)\s*:=\s*-?\d+\.\d+",
        "Integer initialised with a REAL literal",
        "Use an integer literal or convert explicitly."),
    sa!("SA0081", "Lossy conversion", Warning, Conversions, Logic,
        r"(?i)\b(L?REAL_TO_U?[SDL]?INT|L?REAL_TO_(BYTE|WORD|DWORD)|TIME_TO_U?[SD]?INT)\s*\(",
        "Conversion that drops the fraction or range",
        "Round explicitly and range-check before converting."),
    sa!("SA0082", "Sign conversion", Warning, Conversions, Logic,
        r"(?i)\b(U(S|D|L)?INT_TO_(S|D|L)?INT|(S|D|L)?INT_TO_U(S|D|L)?INT)\s*\(",
        "Conversion between signed and unsigned types",
        "Check the sign and range before converting."),
    sa!("SA0083", "String length overflow", Warning, Operations, Logic,
        r"'[^'\n]{81,}'",
        "String literal longer than the default STRING length",
        "Declare the target as STRING(n) with enough room."),
    sa!("SA0084", "Timer or counter not reset", Warning, Initialization, Logic,
        r"(?i)\b\w+\s*:\s*(TON|TOF|TP|CTU|CTD|CTUD)\s*;",
        "Timer or counter instance declared",
        "Reset it (IN := FALSE / RESET := TRUE) on every path that restarts the sequence.",
        false),
    sa!("SA0085", "Initialised PERSISTENT variable", Info, Initialization, Logic,
        r"(?s)(?i:\bVAR\s+PERSISTENT\b)(?:[^E]|E[^N]|EN[^D])*?:=",
        "Initial value on a persistent variable",
        "Persistent values survive restarts; the initial value only applies once."),
    sa!("SA0086", "RETAIN variable", Info, VariablesAndConstants, Logic,
        r"(?i)\bVAR\s+(RETAIN|PERSISTENT)\b",
        "Retained variables declared",
        "Document restart behaviour for retained values.",
        false),
    sa!("SA0087", "AT declaration", Warning, MemoryLayout, Variable,
        r"(?i)\bAT\s+%",
        "Variable bound to a fixed address",
        "Link the variable through the I/O mapping instead.",
        false),
    sa!("SA0088", "VAR_ACCESS use", Info, VariablesAndConstants, Logic,
        r"(?i)\bVAR_ACCESS\b",
        "VAR_ACCESS block",
        "Document which external clients use the access paths."),
    sa!("SA0089", "Attribute use", Info, Declarations, Logic,
        r"\{attribute\s+'[^']+'\}",
        "Attribute pragma",
        "Review attributes when changing the runtime.",
        false),
    sa!("SA0090", "Pragma use", Info, Declarations, Logic,
        r"\{(attribute|warning|error|info)\b[^}]*\}",
        "Compiler pragma",
        "Review pragmas when porting between runtimes.",
        false),
    sa!("SA0091", "Duplicate type definition", Critical, Declarations, DataType,
        r"(?is)\bTYPE\b.*\bTYPE\s+\w+\s*:",
        "Several types in one definition",
        "Keep one type per definition and check the names are unique.",
        false),
    sa!("SA0092", "Circular type dependency", Warning, Declarations, DataType,
        r"(?i)\w+\s*:\s*(POINTER|REFERENCE)\s+TO\s+ST_\w+",
        "Structure refers to another structure by pointer",
        "Check the referenced structure does not refer back.",
        false),
    sa!("SA0093", "Non-standard data type", Info, StrictIEC, Variable,
        r"(?i):\s*(POINTER\s+TO|REFERENCE\s+TO|__XWORD|__UXINT|__XINT|PVOID)\b",
        "Type outside IEC 61131-3",
        "Isolate vendor types when portability matters.",
        false),
    sa!("SA0094", "EXIT statement", Info, Operations, Logic,
        r"(?i)\bEXIT\s*;",
        "EXIT inside loop",
        "Prefer a loop condition that expresses the termination.",
        false),
    sa!("SA0095", "CONTINUE statement", Info, Operations, Logic,
        r"(?i)\bCONTINUE\s*;",
        "CONTINUE inside loop",
        "Restructure the loop body with IF instead of CONTINUE.",
        false),
    sa!("SA0096", "JMP statement", Warning, Operations, Logic,
        r"(?i)\bJMP\s+\w+\s*;",
        "JMP statement",
        "Replace jumps with structured control flow."),
    sa!("SA0097", "Empty loop", Warning, UnreachableUnusedCode, Logic,
        r"(?i)\bDO\s*END_(FOR|WHILE)\b|\bREPEAT\s*UNTIL\b",
        "Loop with empty body",
        "Remove the loop or add the missing body."),
    sa!("SA0098", "Potential infinite loop", Warning, Operations, Logic,
        r"(?i)\bWHILE\s+(TRUE|1)\s+DO\b|\bUNTIL\s+(FALSE|0)\s*;?\s*END_REPEAT\b",
        "Loop without a reachable exit condition",
        "Give the loop a terminating condition or an iteration limit."),
    sa!("SA0099", "FOR counter modified", Warning, Operations, Logic,
        r"(?is)\bFOR\s+\w+\s*:=[^;]*?\bDO\b(?:[^E]|E[^N]|EN[^D])*?\b(i|j|k)\s*:=",
        "Loop counter assigned inside the loop",
        "Leave the FOR counter alone; use WHILE for custom stepping.",
        false),
    sa!("SA0100", "SIZEOF on pointer", Warning, Operations, Logic,
        r"\b(?i:SIZEOF)\s*\(\s*p[A-Z]\w*\s*\)",
        "SIZEOF of a pointer",
        "SIZEOF of a pointer is the pointer width; use SIZEOF of the pointee."),
    sa!("SA0101", "Unused library reference", Info, UnreachableUnusedCode, Logic,
        r"(?i)\bUSING\s+\w+\s*;",
        "Namespace import",
        "Remove imports nothing refers to.",
        false),
    sa!("SA0102", "Inefficient array initialisation", Info, Operations, Logic,
        r"(?is)\bFOR\s+\w+\s*:=[^;]*?\bDO\s*\w+\s*\[\s*\w+\s*\]\s*:=\s*0\s*;\s*END_FOR",
        "Array zeroed element by element",
        "Use MEMSET with SIZEOF of the array."),
    sa!("SA0103", "Excessive variable scope", Info, VariablesAndConstants, Variable,
        r"^g[A-Z]\w*\s*:",
        "Global variable",
        "Narrow the scope to the POU that uses it.",
        false),
    sa!("SA0104", "MEMCPY/MEMMOVE use", Warning, Operations, Logic,
        r"(?i)\b(MEMCPY|MEMMOVE|MEMSET)\s*\(",
        "Raw memory operation",
        "Check that the size argument is computed with SIZEOF of the destination."),
    sa!("SA0105", "Recursive call", Warning, Operations, Logic,
        r"(?i)\bTHIS\^\s*\.\s*\w+\s*\(",
        "Method calls itself through THIS",
        "Make sure the call chain terminates; stack space is fixed.",
        false),
    sa!("SA0106", "Dynamic memory allocation", Warning, Operations, Logic,
        r"(?i)\b(__NEW|__DELETE)\s*\(",
        "Dynamic memory allocation",
        "Allocate at initialisation time and check the returned pointer."),
    sa!("SA0107", "Output written in FB_init", Warning, Initialization, Logic,
        r"(?s)(?i:\bMETHOD\s+FB_init\b)(?:[^E]|E[^N]|EN[^D])*?\b(q|o)[A-Z]\w*\s*:=",
        "Output assigned during initialisation",
        "Set outputs in the cyclic body.",
        false),
    sa!("SA0108", "Missing SUPER call", Warning, ObjectOriented, Logic,
        r"(?is)\bMETHOD\s+(PUBLIC\s+|PROTECTED\s+)?OVERRIDE\s+\w+(?:[^S]|S[^U]|SU[^P])*?END_METHOD",
        "Override does not call SUPER^",
        "Call the base implementation unless replacing it is intended."),
    sa!("SA0109", "THIS pointer stored", Warning, ObjectOriented, Logic,
        r"(?i)\w+\s*:=\s*THIS\s*;",
        "THIS pointer stored in a variable",
        "Stored THIS pointers dangle after an online change; pass references per call."),
    sa!("SA0110", "FINAL method", Critical, ObjectOriented, Logic,
        r"(?i)\bMETHOD\s+(PUBLIC\s+|PROTECTED\s+)?FINAL\b",
        "Method cannot be overridden",
        "Check that derived blocks do not need to override it.",
        false),
    sa!("SA0111", "Interface segregation", Info, ObjectOriented, DataType,
        r"(?is)\bINTERFACE\b(.*?\bMETHOD\b){8}",
        "Interface with many methods",
        "Split it into smaller role interfaces.",
        false),
    sa!("SA0112", "Single responsibility", Info, ObjectOriented, Logic,
        r"(?is)(\bMETHOD\b.*?){15}",
        "Function block with many methods",
        "Split responsibilities into separate blocks.",
        false),
    sa!("SA0113", "High coupling", Info, ObjectOriented, Logic,
        r"(?s)(:\s*FB_\w+.*?){10}",
        "Many function block instances",
        "Reduce the number of collaborators or group them.",
        false),
    sa!("SA0114", "Low cohesion", Info, ObjectOriented, Logic,
        r"(?is)(\bMETHOD\s+\w+.*?){10}",
        "Many unrelated methods",
        "Keep methods that share state together and move the rest.",
        false),
    sa!("SA0115", "Hard-coded IP address", Warning, Safety, Logic,
        r"'\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}'",
        "Hard-coded IP address",
        "Move network addresses into configuration parameters."),
    sa!("SA0116", "Hard-coded path", Warning, Safety, Logic,
        r"(?i)'[A-Z]:\\[^']*'|'/(usr|home|tmp|var|etc)/[^']*'",
        "Hard-coded file path",
        "Move file paths into configuration parameters."),
    sa!("SA0117", "Bit operation precedence", Warning, Operations, Logic,
        r"(?i)\b(AND|OR|XOR)\s+(16#|2#|8#)[0-9A-F_]+\s*(=|<>)",
        "Mask compared without parentheses",
        "Comparison binds tighter than AND; write (x AND 16#01) <> 0."),
    sa!("SA0118", "Integer overflow", Warning, Operations, Logic,
        r"\*\s*[1-9]\d{2,}\b",
        "Multiplication by a large constant",
        "Check the result type is wide enough or widen before multiplying."),
    sa!("SA0119", "TIME() use", Info, Operations, Logic,
        r"(?i)\bTIME\s*\(\s*\)",
        "System time read with TIME()",
        "TIME() wraps around; measure durations with a timer block."),
    sa!("SA0120", "STRING/WSTRING mix", Warning, Conversions, Logic,
        r"(?i)\b(WSTRING_TO_STRING|STRING_TO_WSTRING)\s*\(",
        "Conversion between STRING and WSTRING",
        "Non-ASCII characters are lost in WSTRING_TO_STRING; keep one string type."),
    sa!("SA0121", "Enumeration value out of range", Warning, Declarations, DataType,
        r":=\s*(\d{6,}|[4-9]\d{4}|3[3-9]\d{3}|32[89]\d{2}|327[7-9]\d|3276[89])\s*[,)]",
        "Enumeration value beyond INT range",
        "Give the enumeration an explicit base type wide enough for its values."),
    sa!("SA0122", "Deep structure access", Info, Declarations, Variable,
        r"^\w+(\.\w+){3,}\s*:",
        "Access path with more than three levels",
        "Introduce an intermediate reference."),
    sa!("SA0123", "Generic conversion", Warning, Conversions, Logic,
        r"(?i)\b(ANY_TO_\w+|TO_\w+)\s*\(",
        "Conversion with inferred source type",
        "Use the explicit <SRC>_TO_<DST> function."),
    sa!("SA0124", "Many interfaces", Info, ObjectOriented, Logic,
        r"(?i)\bIMPLEMENTS\s+\w+(\s*,\s*\w+){2,}",
        "Function block implements three or more interfaces",
        "Check whether the block has too many roles."),
    sa!("SA0125", "Property with logic", Info, ObjectOriented, Logic,
        r"(?is)\bPROPERTY\b(?:[^E]|E[^N]|EN[^D])*?\b(FOR|WHILE|REPEAT)\b",
        "Loop inside a property",
        "Keep properties cheap; move work into a method."),
    sa!("SA0126", "String buffer size", Info, Declarations, Variable,
        r"(?i)^\w+\s*:\s*W?STRING\s*$",
        "STRING without explicit length",
        "Declare the length, e.g. STRING(32), instead of the default 80 characters."),
    sa!("SA0127", "Loop bound from SIZEOF", Warning, Operations, Logic,
        r"(?i)\bFOR\s+\w+\s*:=[^;]*?\bTO\s+SIZEOF\s*\(",
        "Loop bound counts bytes, not elements",
        "Divide by the element size or use UPPER_BOUND."),
    sa!("SA0128", "ACTION use", Info, Operations, Logic,
        r"(?i)\bACTION\s+\w+",
        "Action",
        "Prefer methods; actions share all variables of the block.",
        false),
    sa!("SA0129", "FB_reinit call", Warning, Operations, Logic,
        r"(?i)\bFB_reinit\s*\(",
        "Explicit FB_reinit call",
        "FB_reinit is called by the runtime after online change; do not call it from code."),
    sa!("SA0130", "Fixed I/O address", Warning, MemoryLayout, Logic,
        r"(?i)\bAT\s+%[IQM][XBWDL]?\d",
        "Variable located at a fixed address",
        "Use AT %I* / %Q* and link in the I/O configuration."),
    sa!("SA0131", "Unchecked pointer dereference", Critical, Safety, Logic,
        r"\bp[A-Z]\w*\^",
        "Pointer dereferenced",
        "Check the pointer against 0 before dereferencing.",
        false),
    sa!("SA0132", "Array index validation", Warning, Safety, Logic,
        r"\w+\[\s*[A-Za-z_]\w*\s*\]",
        "Array indexed by a variable",
        "Check the index against the array bounds.",
        false),
    sa!("SA0133", "Floating point loop counter", Warning, Operations, Logic,
        r"(?i)\bFOR\s+\w+\s*:=\s*-?\d+\.\d+",
        "FOR loop with floating point bounds",
        "Use an integer counter and derive the REAL value inside the loop."),
    sa!("SA0134", "Missing test note", Info, Comments, Logic,
        r"(?i)\b(NEEDS?\s*TEST|TODO:\s*TEST|TEST\s*REQUIRED)\b",
        "Code marked as untested",
        "Add the test and remove the marker."),
    sa!("SA0135", "FIXME comment", Warning, Comments, Logic,
        r"(?i)\bFIXME\b",
        "FIXME marker",
        "Fix the marked defect before release."),
    sa!("SA0136", "Pointer initialised in declaration", Warning, Conversions, Logic,
        r"(?i):\s*POINTER\s+TO\s+\w+\s*:=\s*ADR\s*\(",
        "ADR in a declaration",
        "Assign pointers in code; declaration-time addresses change after online change."),
    sa!("SA0137", "Redundant condition", Info, Operations, Logic,
        r"(?i)\bNOT\s+NOT\b",
        "Double negation",
        "Drop both NOTs."),
    sa!("SA0138", "Boolean literal assignment", Info, Operations, Logic,
        r"(?is)\bIF\s+[^;]+?\s+THEN\s+\w+\s*:=\s*TRUE\s*;\s*ELSE\s+\w+\s*:=\s*FALSE\s*;\s*END_IF",
        "IF used to assign a condition",
        "Assign the condition directly: x := condition;"),
    sa!("SA0139", "Empty exception handler", Warning, Operations, Logic,
        r"(?is)__CATCH\s*\(\s*\w+\s*\)\s*;?\s*__ENDTRY",
        "__CATCH without handling",
        "Log or react to the exception."),
    sa!("SA0140", "Many RETURN statements", Info, Metrics, Logic,
        r"(?is)(\bRETURN\s*;.*?){4}",
        "Four or more RETURN statements",
        "Restructure so the block has fewer exits.",
        false),
    sa!("SA0141", "Task shared variable", Warning, Concurrency, Logic,
        r"(?i)\bVAR_GLOBAL\b",
        "Global variables may be written by several tasks",
        "Confine writes to one task or protect them with a lock.",
        false),
    sa!("SA0142", "Synchronisation primitive", Info, Concurrency, Logic,
        r"\b(FB_IecCriticalSection|FB_Mutex|FB_Semaphore)\b",
        "Lock in cyclic code",
        "Keep critical sections short and release on every path.",
        false),
    sa!("SA0143", "Task priority", Info, Concurrency, Logic,
        r"(?i)\bPriority\s*:=\s*\d+",
        "Task priority set in code",
        "Configure priorities in the task configuration.",
        false),
    sa!("SA0144", "Blocking call", Warning, Concurrency, Logic,
        r"(?i)\b(SLEEP|DELAY|WAIT_FOR)\s*\(",
        "Blocking call in cyclic code",
        "Use a timer function block instead of waiting inside the cycle."),
    sa!("SA0145", "Spin lock", Warning, Concurrency, Logic,
        r"(?i)\bWHILE\s+(NOT\s+)?\w+\s+DO\s*;?\s*END_WHILE",
        "Busy wait on a flag",
        "Poll the flag once per cycle instead of looping."),
    sa!("SA0146", "Non-atomic increment", Warning, Concurrency, Logic,
        r"\bg[A-Z]\w*\s*:=\s*g[A-Z]\w*\s*[+-]\s*1\s*;",
        "Read-modify-write on a global",
        "Use an atomic operation or confine writes to one task.",
        false),
    sa!("SA0147", "Cycle time risk", Warning, Concurrency, Logic,
        r"(?i)\bFOR\s+\w+\s*:=\s*\d+\s+TO\s+\d{5,}\b",
        "Loop with ten thousand or more iterations",
        "Spread the work over several cycles."),
    sa!("SA0148", "Watchdog consideration", Info, Concurrency, Logic,
        r"(?i)\bWHILE\b",
        "WHILE loop in cyclic code",
        "Bound the iterations so the task watchdog cannot fire.",
        false),
    sa!("SA0149", "Deadlock risk", Critical, Concurrency, Logic,
        r"(?is)\.Enter\s*\(\s*\).*?\.Enter\s*\(\s*\)",
        "Nested lock acquisition",
        "Acquire locks in one fixed order and release before taking the next."),
    sa!("SA0150", "Interrupts disabled", Warning, Concurrency, Logic,
        r"\b(DisableInterrupts?|__disable_irq|TcInterruptDisable)\b",
        "Interrupts disabled from PLC code",
        "Use critical sections instead of disabling interrupts."),
    sa!("SA0151", "PLCopen block interface", Info, StrictIEC, Logic,
        r"(?m)^\s*Execute\s*:\s*BOOL\b",
        "Execute input",
        "Provide Done, Busy, Error and ErrorID outputs as PLCopen requires.",
        false),
    sa!("SA0152", "64-bit type", Info, StrictIEC, Variable,
        r"(?i):\s*(LWORD|LINT|ULINT)\b",
        "64-bit data type",
        "Check the target supports 64-bit types.",
        false),
    sa!("SA0153", "Marker address", Info, StrictIEC, Logic,
        r"%M[XBWDL]?\d+",
        "Marker memory address",
        "Use symbolic variables instead of %M addresses.",
        false),
    sa!("SA0154", "Language compatibility", Info, StrictIEC, Logic,
        r"(?i)\b(__ISVALIDREF|__QUERYINTERFACE|__QUERYPOINTER|__TRY|__CATCH)\b",
        "Vendor extension outside IEC 61131-3",
        "Isolate vendor extensions when portability matters.",
        false),
    sa!("SA0155", "VAR_CONFIG use", Info, StrictIEC, Logic,
        r"(?i)\bVAR_CONFIG\b",
        "VAR_CONFIG block",
        "Keep instance-specific addresses in the I/O configuration.",
        false),
    sa!("SA0156", "Hand-written MAX/MIN", Info, StrictIEC, Logic,
        r"(?is)\bIF\s+\w+\s*[<>]\s*\w+\s+THEN\s+\w+\s*:=\s*\w+\s*;\s*ELSE\s+\w+\s*:=\s*\w+\s*;\s*END_IF",
        "IF/ELSE selecting the larger or smaller value",
        "Use MAX, MIN or SEL."),
    sa!("SA0157", "Bit access notation", Info, StrictIEC, Logic,
        r"\b[A-Za-z_]\w*\.\d+\b",
        "Bit access with dot notation",
        "Dot bit access is a vendor extension; use masks for portable code.",
        false),
    sa!("SA0158", "Physical value without range", Info, Comments, Variable,
        r"(?i)^\w*(Temperature|Pressure|Speed|Position|Velocity|Current|Voltage)\w*\s*:\s*L?REAL\b",
        "Physical quantity without documented range",
        "Document unit and valid range next to the declaration.",
        false),
    sa!("SA0159", "Unit suffix", Info, NamingConventions, Variable,
        r"^\w*(Sec|Ms|Us|Ns|Mm|Cm|Km|Kg|Hz|Rpm|Deg|Rad)\s*:",
        "Unit encoded in the name",
        "Use the same unit suffixes throughout the project.",
        false),
    sa!("SA0160", "Program structure complexity", Info, Metrics, Logic,
        r"(?is)\bPROGRAM\b(.*?\b(METHOD|ACTION)\b){10}",
        "Program with many actions or methods",
        "Move parts of the program into function blocks.",
        false),
    sa!("SA0161", "Inheritance dependency", Warning, ObjectOriented, Logic,
        r"(?i)\bEXTENDS\s+\w+",
        "Function block extends another",
        "Check that the base does not depend on the derived block.",
        false),
    sa!("SA0162", "Module too large", Warning, Metrics, Logic,
        r"(?:[^\n]*\n){500}",
        "Block longer than 500 lines",
        "Split the module by responsibility.",
        false),
    sa!("SA0163", "Conditional compilation", Info, Declarations, Logic,
        r"(?i)\{\s*(IF|ELSIF)\s+defined\s*\(",
        "Conditional compilation",
        "Keep conditional compilation to configuration-specific code."),
    sa!("SA0164", "Duplicated constant", Info, VariablesAndConstants, Logic,
        r"(?i)\b\w+\s*:\s*L?REAL\s*:=\s*(3\.14\d*|9\.81\d*)\s*;",
        "Well-known constant redeclared",
        "Declare it once in a shared constant list.",
        false),
    sa!("SA0165", "Incomplete array initialisation", Warning, Initialization, Logic,
        r"(?i)ARRAY\s*\[\s*\d+\s*\.\.\s*\d+\s*\]\s*OF\s+\w+\s*:=\s*\[[^\]*]*\]",
        "Array initialiser may not cover every element",
        "List every element or use n(value) repetition.",
        false),
    sa!("SA0166", "Memory alignment", Info, MemoryLayout, DataType,
        r"(?is)\bBOOL\s*;\s*\w+\s*:\s*L?REAL\b",
        "REAL member after a BOOL",
        "Place REAL members before BOOL members.",
        false),
    sa!("SA0167", "Complex inheritance", Info, ObjectOriented, Logic,
        r"(?s)SUPER\^(.*?SUPER\^){2}",
        "Several SUPER^ calls in one block",
        "Flatten the hierarchy or delegate instead of inheriting.",
        false),
    sa!("SA0168", "Hard-coded timing", Info, Miscellaneous, Logic,
        r"(?i)\bT#\d+(MS|S|M|H)\b",
        "Hard-coded time literal",
        "Move timing values into named constants or parameters.",
        false),
    sa!("SA0169", "Incomplete implementation", Warning, Miscellaneous, Logic,
        r"(?i)\bNOT[_ ]IMPLEMENTED\b",
        "Unfinished implementation",
        "Complete the implementation or remove the placeholder."),
    sa!("SA0170", "Unused USING", Info, UnreachableUnusedCode, Logic,
        r"(?im)^\s*USING\s+[\w.]+\s*;",
        "USING directive",
        "Remove directives nothing refers to.",
        false),
    sa!("SA0171", "Safety variable protection", Critical, Safety, DataType,
        r"(?i)\b(bSafety|xSafety|bEStop|xEStop|bEmergency)\w*\s*:\s*BOOL\s*:=\s*TRUE",
        "Safety signal defaults to TRUE",
        "Safety signals default to the safe state FALSE."),
    sa!("SA0172", "Check after division", Warning, Safety, Logic,
        r"(?is)\w+\s*/\s*[A-Za-z_]\w*\s*;.*?\bIF\s+\w+\s*<>\s*0",
        "Zero check placed after the division",
        "Check the divisor before dividing.",
        false),
    sa!("SA0173", "Unbounded retry", Warning, Operations, Logic,
        r"(?i)\bb?(retry|repeat|again)\s*:=\s*TRUE\b",
        "Retry flag set without a limit",
        "Count retries and give up after a fixed number."),
    sa!("SA0174", "Expensive call in loop", Info, Operations, Logic,
        r"(?is)\b(FOR|WHILE|REPEAT)\b(?:[^E]|E[^N]|EN[^D])*?\b(MEMCPY|MEMSET|CONCAT|FIND|REPLACE|LOG|EXP|SQRT)\s*\(",
        "Costly function called every iteration",
        "Hoist the call out of the loop when its arguments do not change."),
    sa!("SA0175", "Cache-unfriendly access", Info, Operations, Logic,
        r"\w+\[\s*\w+\s*,\s*\w+\s*\]",
        "Two-dimensional array access",
        "Iterate the last index in the inner loop.",
        false),
    sa!("SA0176", "Nested CONCAT", Info, Operations, Logic,
        r"(?i)\bCONCAT\s*\(\s*CONCAT\s*\(",
        "CONCAT nested in CONCAT",
        "Build the string step by step or with a format function."),
    sa!("SA0177", "Parity by MOD", Info, Operations, Logic,
        r"(?i)\w+\s+MOD\s+2\s*(=|<>)",
        "MOD 2 used to test parity",
        "Test the lowest bit with AND 1."),
    sa!("SA0178", "Resource leak", Warning, Operations, Logic,
        r"(?i)\b(__NEW|FB_FileOpen|SysFileOpen)\b",
        "Resource acquired",
        "Release it (__DELETE, FB_FileClose) on every path.",
        false),
    sa!("SA0179", "Incomplete state machine", Warning, Operations, Logic,
        r"(?is)\bCASE\s+(e|n|i)?State\s+OF\b(?:[^E]|E[^LN]|EL[^S]|ELS[^E]|EN[^D])*\bEND_CASE\b",
        "State machine without ELSE branch",
        "Add ELSE that moves to a safe state."),
    sa!("SA0180", "Documentation level", Info, Comments, Logic,
        r"(?im)^\s*METHOD\s+PUBLIC\s+\w+[^\n]*\n\s*VAR",
        "Public method without comment",
        "Document what the method does and what it returns.",
        false),
];

pub struct CompiledSaRule {
    pub spec: &'static SaRuleSpec,
    regex: Regex,
}

impl CompiledSaRule {
    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

static COMPILED: Lazy<Vec<CompiledSaRule>> = Lazy::new(|| {
    SA_RULES
        .iter()
        .filter_map(|spec| match Regex::new(spec.pattern) {
            Ok(regex) => Some(CompiledSaRule { spec, regex }),
            Err(err) => {
                tracing::warn!(rule_id = %spec.id, error = %err, "catalogue rule pattern does not compile, rule skipped");
                None
            }
        })
        .collect()
});

pub fn compiled_rules() -> &'static [CompiledSaRule] {
    COMPILED.as_slice()
}

pub fn lookup(id: &str) -> Option<&'static SaRuleSpec> {
    SA_RULES.iter().find(|s| s.id == id)
}

/// One catalogue row as a checker.
pub struct TableRule {
    rule: &'static CompiledSaRule,
}

impl TableRule {
    pub fn new(rule: &'static CompiledSaRule) -> Self {
        Self { rule }
    }

    pub fn spec(&self) -> &'static SaRuleSpec {
        self.rule.spec
    }

    fn issue(&self, file: &str, line: usize, matched: &str) -> QAIssue {
        let spec = self.rule.spec;
        QAIssue::new(spec.id, spec.severity, &spec.category.to_string(), spec.title)
            .at(file, line)
            .description(format!("{}: '{}'", spec.name, crate::truncate_utf8_safe(matched.trim(), 80)))
            .why_dangerous(format!("{} ({})", spec.name, spec.category))
            .recommendation(spec.recommendation)
            .snippets("", matched.trim().to_string())
    }
}

/// Enabled rows, one checker each.
pub fn default_rules() -> Vec<Box<dyn QaRuleChecker>> {
    compiled_rules()
        .iter()
        .filter(|r| r.spec.enabled_by_default)
        .map(|r| Box::new(TableRule::new(r)) as Box<dyn QaRuleChecker>)
        .collect()
}

/// Every row, including those off by default.
pub fn all_rules() -> Vec<Box<dyn QaRuleChecker>> {
    compiled_rules()
        .iter()
        .map(|r| Box::new(TableRule::new(r)) as Box<dyn QaRuleChecker>)
        .collect()
}

impl QaRuleChecker for TableRule {
    fn rule_id(&self) -> &str {
        self.rule.spec.id
    }
    fn rule_name(&self) -> &str {
        self.rule.spec.name
    }
    fn description(&self) -> &str {
        self.rule.spec.title
    }
    fn severity(&self) -> Severity {
        self.rule.spec.severity
    }

    fn check_variable_change(&self, change: &VariableChange) -> Vec<QAIssue> {
        if self.rule.spec.target != SaTarget::Variable || !change.change_type.adds_code() {
            return Vec::new();
        }
        let mut text = format!("{} : {}", change.variable_name, change.new_data_type.as_deref().unwrap_or(""));
        if let Some(init) = change.new_initial_value.as_deref() {
            text.push_str(" := ");
            text.push_str(init);
        }
        match self.rule.regex.find(&text) {
            Some(m) => vec![self.issue(&change.file_path, change.line, m.as_str())],
            None => Vec::new(),
        }
    }

    fn check_logic_change(&self, change: &LogicChange) -> Vec<QAIssue> {
        if self.rule.spec.target != SaTarget::Logic {
            return Vec::new();
        }
        let Some(code) = change.code_to_check() else {
            return Vec::new();
        };
        let mut lines = HashSet::new();
        self.rule
            .regex
            .find_iter(code)
            .filter_map(|m| {
                let line = change.line_at(m.start());
                lines.insert(line).then(|| self.issue(&change.file_path, line, m.as_str()))
            })
            .collect()
    }

    fn check_data_type_change(&self, change: &DataTypeChange) -> Vec<QAIssue> {
        if self.rule.spec.target != SaTarget::DataType || !change.change_type.adds_code() {
            return Vec::new();
        }
        let Some(definition) = change.new_definition.as_deref() else {
            return Vec::new();
        };
        let newlines_before = |offset: usize| definition.as_bytes()[..offset].iter().filter(|b| **b == b'\n').count();
        self.rule
            .regex
            .find_iter(definition)
            .map(|m| self.issue(&change.file_path, change.line + newlines_before(m.start()), m.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pattern_compiles() {
        assert_eq!(compiled_rules().len(), SA_RULES.len(), "a catalogue pattern failed to compile");
    }

    #[test]
    fn ids_are_unique_and_in_range() {
        let mut seen = HashSet::new();
        for spec in SA_RULES {
            assert!(seen.insert(spec.id), "duplicate id {}", spec.id);
            let n: u32 = spec.id[2..].parse().unwrap_or(0);
            assert!((1..=180).contains(&n), "{} outside SA0001..SA0180", spec.id);
        }
    }

    #[test]
    fn every_assigned_number_has_a_row() {
        assert_eq!(SA_RULES.len(), 179);
        let ids: HashSet<&str> = SA_RULES.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), SA_RULES.len());
        assert!(!ids.contains("SA0005"));
        for n in (1..=180).filter(|n| *n != 5) {
            assert!(ids.contains(format!("SA{n:04}").as_str()), "SA{n:04} missing");
        }
    }

    #[test]
    fn rows_are_sorted_by_id() {
        assert!(SA_RULES.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn disabled_rows_are_not_registered_by_default() {
        let enabled = SA_RULES.iter().filter(|s| s.enabled_by_default).count();
        assert_eq!(default_rules().len(), enabled);
        assert!(all_rules().len() > enabled);
    }
}
