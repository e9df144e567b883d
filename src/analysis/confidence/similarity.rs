use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::qa::QAIssue;

/// What makes two findings "similar" for the repeated-occurrence bonus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityKey {
    RuleId,
    #[default]
    RuleAndCategory,
}

impl SimilarityKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rule" | "rule_id" => Some(SimilarityKey::RuleId),
            "rule_and_category" | "rule+category" => Some(SimilarityKey::RuleAndCategory),
            _ => None,
        }
    }

    fn key(self, issue: &QAIssue) -> (String, Option<String>) {
        match self {
            SimilarityKey::RuleId => (issue.rule_id.clone(), None),
            SimilarityKey::RuleAndCategory => (issue.rule_id.clone(), Some(issue.category.clone())),
        }
    }
}

/// For each issue, how many issues in the batch (itself included) share its key.
pub fn count_similar(issues: &[QAIssue], key: SimilarityKey) -> Vec<u32> {
    let mut counts: HashMap<(String, Option<String>), u32> = HashMap::new();
    for issue in issues {
        *counts.entry(key.key(issue)).or_default() += 1;
    }
    issues
        .iter()
        .map(|i| counts.get(&key.key(i)).copied().unwrap_or(1))
        .collect()
}
