//! One validation run over a project: scanned files, syntax trees, findings.
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::analysis::confidence::ConfidenceStatistics;
use crate::analysis::dependencies::DependencyAnalysis;
use crate::analysis::usage::VariableUsageAnalysis;
use crate::ast::SyntaxTree;
use crate::qa::{EnhancedQAIssue, QAIssue, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValidationMode {
    #[default]
    Full,
    Incremental,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedFile {
    pub path: String,
    pub language: String,
    pub line_count: usize,
}

impl ScannedFile {
    pub fn from_tree(tree: &SyntaxTree) -> Self {
        Self {
            path: tree.file_path.clone(),
            language: "StructuredText".to_string(),
            line_count: tree.line_count(),
        }
    }
}

/// Created and completed by the caller; analyses only attach results.
#[derive(Debug, Clone)]
pub struct ValidationSession {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub project_path: String,
    pub project_name: String,
    pub mode: ValidationMode,
    pub scanned_files: Vec<ScannedFile>,
    pub syntax_trees: Vec<SyntaxTree>,
    pub violations: Vec<QAIssue>,
    pub enhanced_issues: Vec<EnhancedQAIssue>,
    pub quality_score: f64,
    pub variable_analysis: Option<VariableUsageAnalysis>,
    pub dependency_analysis: Option<DependencyAnalysis>,
    pub confidence_statistics: Option<ConfidenceStatistics>,
}

fn session_id(project_path: &str, started_at: &DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(project_path.as_bytes());
    hasher.update(started_at.to_rfc3339().as_bytes());
    hasher.finalize().iter().take(8).map(|b| format!("{b:02x}")).collect()
}

impl ValidationSession {
    pub fn new(project_path: &str, mode: ValidationMode) -> Self {
        let started_at = Utc::now();
        let project_name = std::path::Path::new(project_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| project_path.to_string());
        Self {
            id: session_id(project_path, &started_at),
            started_at,
            completed_at: None,
            project_path: project_path.to_string(),
            project_name,
            mode,
            scanned_files: Vec::new(),
            syntax_trees: Vec::new(),
            violations: Vec::new(),
            enhanced_issues: Vec::new(),
            quality_score: 0.0,
            variable_analysis: None,
            dependency_analysis: None,
            confidence_statistics: None,
        }
    }

    pub fn add_tree(&mut self, tree: SyntaxTree) {
        self.scanned_files.push(ScannedFile::from_tree(&tree));
        self.syntax_trees.push(tree);
    }

    pub fn add_violations(&mut self, issues: impl IntoIterator<Item = QAIssue>) {
        self.violations.extend(issues);
    }

    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Elapsed time so far while the session is still open.
    pub fn duration(&self) -> Duration {
        self.completed_at.unwrap_or_else(Utc::now) - self.started_at
    }

    pub fn total_lines(&self) -> usize {
        self.scanned_files.iter().map(|f| f.line_count).sum()
    }

    pub fn violations_by_severity(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for v in &self.violations {
            *counts.entry(v.severity).or_insert(0) += 1;
        }
        counts
    }

    /// `100 - sum(severity weights) / files`, clamped. Zero with no files.
    pub fn calculate_quality_score(&mut self) -> f64 {
        self.quality_score = if self.scanned_files.is_empty() {
            0.0
        } else {
            let penalty: f64 = self.violations.iter().map(|v| f64::from(v.severity.weight())).sum();
            (100.0 - penalty / self.scanned_files.len() as f64).clamp(0.0, 100.0)
        };
        self.quality_score
    }

    /// Per issue category: `1 - violations / files`, clamped to [0, 1].
    pub fn constitution_compliance(&self) -> BTreeMap<String, f64> {
        let files = self.scanned_files.len().max(1) as f64;
        let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
        for v in &self.violations {
            *by_category.entry(v.category.clone()).or_insert(0) += 1;
        }
        by_category
            .into_iter()
            .map(|(category, count)| (category, (1.0 - count as f64 / files).clamp(0.0, 1.0)))
            .collect()
    }
}
