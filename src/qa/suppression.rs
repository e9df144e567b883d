//! Source-comment and configuration based issue suppression.
//!
//! Recognised markers, in either `//` or `(* *)` comments:
//! - `qa-ignore: QA001, SA0029` on the issue line or the line above
//! - `qa-ignore-start: QA007` ... `qa-ignore-end` around a region
//! - `qa-ignore-file: QA020` within the first ten lines
//!
//! `all` in place of a rule list matches every rule.
use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::issue::QAIssue;

const FILE_MARKER_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuppressionSource {
    Inline,
    Block,
    File,
    Config,
    Feedback,
}

impl fmt::Display for SuppressionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SuppressionSource::Inline => "inline",
            SuppressionSource::Block => "block",
            SuppressionSource::File => "file",
            SuppressionSource::Config => "config",
            SuppressionSource::Feedback => "feedback",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suppression {
    pub reason: String,
    pub source: SuppressionSource,
}

static MARKER_RE: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| {
    Regex::new(r"(?i)(?://|\(\*)\s*qa-ignore(-start|-end|-file)?\s*(?::\s*([A-Za-z0-9_,\s]+?))?\s*(?:\*\)|$)")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Marker {
    Line(RuleSet),
    Start(RuleSet),
    End,
    File(RuleSet),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct RuleSet {
    all: bool,
    ids: HashSet<String>,
}

impl RuleSet {
    fn parse(list: Option<&str>) -> Self {
        let mut set = RuleSet::default();
        for part in list.unwrap_or("all").split(|c: char| c == ',' || c.is_whitespace()).filter(|p| !p.is_empty()) {
            if part.eq_ignore_ascii_case("all") {
                set.all = true;
            } else {
                set.ids.insert(part.to_ascii_uppercase());
            }
        }
        set
    }

    fn covers(&self, rule_id: &str) -> bool {
        self.all || self.ids.contains(&rule_id.to_ascii_uppercase())
    }
}

fn parse_marker(line: &str) -> Option<Marker> {
    let re = MARKER_RE.as_ref().ok()?;
    let caps = re.captures(line)?;
    let rules = caps.get(2).map(|m| m.as_str());
    Some(match caps.get(1).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
        Some("-start") => Marker::Start(RuleSet::parse(rules)),
        Some("-end") => Marker::End,
        Some("-file") => Marker::File(RuleSet::parse(rules)),
        _ => Marker::Line(RuleSet::parse(rules)),
    })
}

/// Suppression markers of one source file, parsed once.
#[derive(Debug, Default)]
pub struct SuppressionChecker {
    /// 1-based line -> inline marker on that line
    inline: Vec<(usize, RuleSet)>,
    /// inclusive 1-based line ranges
    blocks: Vec<(usize, usize, RuleSet)>,
    file: Vec<RuleSet>,
    disabled_rules: HashSet<String>,
}

impl SuppressionChecker {
    pub fn new(source: &str) -> Self {
        let mut checker = SuppressionChecker::default();
        let mut open: Vec<(usize, RuleSet)> = Vec::new();
        let mut last_line = 0;
        for (idx, line) in source.lines().enumerate() {
            let line_no = idx + 1;
            last_line = line_no;
            match parse_marker(line) {
                Some(Marker::Line(rules)) => checker.inline.push((line_no, rules)),
                Some(Marker::Start(rules)) => open.push((line_no, rules)),
                Some(Marker::End) => {
                    if let Some((start, rules)) = open.pop() {
                        checker.blocks.push((start, line_no, rules));
                    }
                }
                Some(Marker::File(rules)) if line_no <= FILE_MARKER_WINDOW => checker.file.push(rules),
                Some(Marker::File(_)) | None => {}
            }
        }
        // unterminated blocks run to end of file
        for (start, rules) in open {
            checker.blocks.push((start, last_line, rules));
        }
        checker
    }

    /// Rules disabled in configuration count as suppressed with source `Config`.
    pub fn with_disabled_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.disabled_rules = rules.into_iter().map(|r| r.as_ref().to_ascii_uppercase()).collect();
        self
    }

    pub fn check(&self, rule_id: &str, line: usize) -> Option<Suppression> {
        if self.disabled_rules.contains(&rule_id.to_ascii_uppercase()) {
            return Some(Suppression { reason: format!("{rule_id} disabled in configuration"), source: SuppressionSource::Config });
        }
        if self.file.iter().any(|r| r.covers(rule_id)) {
            return Some(Suppression { reason: format!("qa-ignore-file: {rule_id}"), source: SuppressionSource::File });
        }
        let inline_hit = self
            .inline
            .iter()
            .any(|(l, r)| (*l == line || *l + 1 == line) && r.covers(rule_id));
        if inline_hit {
            return Some(Suppression { reason: format!("qa-ignore: {rule_id}"), source: SuppressionSource::Inline });
        }
        self.blocks
            .iter()
            .find(|(start, end, r)| (*start..=*end).contains(&line) && r.covers(rule_id))
            .map(|(start, end, _)| Suppression {
                reason: format!("qa-ignore-start: {rule_id} (lines {start}-{end})"),
                source: SuppressionSource::Block,
            })
    }

    pub fn check_issue(&self, issue: &QAIssue) -> Option<Suppression> {
        self.check(&issue.rule_id, issue.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_comment_styles() {
        assert!(matches!(parse_marker("x := 1; // qa-ignore: QA007"), Some(Marker::Line(_))));
        assert!(matches!(parse_marker("(* qa-ignore-start: QA001, QA002 *)"), Some(Marker::Start(_))));
        assert_eq!(parse_marker("(* qa-ignore-end *)"), Some(Marker::End));
        assert_eq!(parse_marker("x := 1; // plain comment"), None);
    }

    #[test]
    fn rule_lists_are_case_insensitive() {
        let set = RuleSet::parse(Some("qa007, SA0029"));
        assert!(set.covers("QA007"));
        assert!(set.covers("sa0029"));
        assert!(!set.covers("QA001"));
    }
}
