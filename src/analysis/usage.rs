//! Project-wide variable usage: unused and uninitialised variables, dead code.
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::dataflow::{self, DataFlowOptions, DeadCode, DeadCodeKind, PouDataFlow};
use crate::ast::{PouKind, SyntaxTree, VarScope};
use crate::orchestrator::CancellationToken;
use crate::qa::{QAIssue, Severity};

pub const UNUSED_VARIABLE_RULE: &str = "VAR001";
pub const UNINITIALIZED_VARIABLE_RULE: &str = "VAR002";
pub const DEAD_CODE_RULE: &str = "DEAD001";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnusedVariable {
    pub name: String,
    pub scope: VarScope,
    pub data_type: String,
    pub file_path: String,
    /// None for GVL entries.
    pub pou_name: Option<String>,
    pub declared_line: usize,
    /// Written somewhere but never read.
    pub assigned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UninitializedVariable {
    pub name: String,
    pub file_path: String,
    pub pou_name: String,
    pub declared_line: usize,
    pub first_use_line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableUsageStatistics {
    pub name: String,
    pub scope: VarScope,
    pub file_path: String,
    pub pou_name: Option<String>,
    pub reads: usize,
    pub writes: usize,
    pub first_line: Option<usize>,
    pub last_line: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableUsageAnalysis {
    pub project_path: String,
    pub analysed_at: DateTime<Utc>,
    pub unused: Vec<UnusedVariable>,
    pub uninitialized: Vec<UninitializedVariable>,
    pub dead_code: Vec<DeadCode>,
    pub usage: Vec<VariableUsageStatistics>,
    pub files_analyzed: usize,
    /// Set when cancellation left some files unanalysed; project-wide checks are skipped then.
    pub partial: bool,
}

impl VariableUsageAnalysis {
    pub fn total_issues(&self) -> usize {
        self.unused.len() + self.uninitialized.len() + self.dead_code.len()
    }

    pub fn usage_of(&self, name: &str) -> Option<&VariableUsageStatistics> {
        self.usage.iter().find(|u| u.name.eq_ignore_ascii_case(name))
    }

    /// Findings as issues so they flow through enhancement and session scoring.
    pub fn to_issues(&self) -> Vec<QAIssue> {
        let mut out = Vec::with_capacity(self.total_issues());
        for v in &self.unused {
            let owner = v.pou_name.as_deref().unwrap_or("global variable list");
            let title = if v.assigned { "Variable assigned but never read" } else { "Unused variable" };
            out.push(
                QAIssue::new(UNUSED_VARIABLE_RULE, Severity::Warning, "Code Quality", title)
                    .at(&v.file_path, v.declared_line)
                    .description(format!("{} ({}, {}) in {owner} is never read", v.name, v.scope, v.data_type))
                    .why_dangerous("Unused declarations hide typos and leftovers from removed logic.")
                    .recommendation(format!("Remove {} or use it", v.name)),
            );
        }
        for v in &self.uninitialized {
            out.push(
                QAIssue::new(UNINITIALIZED_VARIABLE_RULE, Severity::Critical, "Initialization", "Variable read before assignment")
                    .at(&v.file_path, v.first_use_line)
                    .description(format!(
                        "{} (declared at line {}) in {} is read at line {} on a path without an assignment",
                        v.name, v.declared_line, v.pou_name, v.first_use_line
                    ))
                    .why_dangerous("Reading an unassigned pointer or reference dereferences whatever the memory holds.")
                    .recommendation(format!("Assign {} before its first use or initialise it in the declaration", v.name)),
            );
        }
        for d in &self.dead_code {
            out.push(
                QAIssue::new(DEAD_CODE_RULE, Severity::Warning, "Code Quality", &dead_code_title(d.kind))
                    .at(&d.file_path, d.start_line)
                    .description(format!("{} (lines {}-{}): {}", d.pou_name, d.start_line, d.end_line, d.description))
                    .why_dangerous("Code that can never run misleads readers about what the controller does.")
                    .recommendation("Remove the dead code or fix the condition that hides it."),
            );
        }
        out
    }
}

fn dead_code_title(kind: DeadCodeKind) -> String {
    match kind {
        DeadCodeKind::UnreachableCode => "Unreachable code",
        DeadCodeKind::AlwaysFalseCondition => "Condition is always FALSE",
        DeadCodeKind::AlwaysTrueCondition => "Branch hidden by an always TRUE condition",
        DeadCodeKind::UnusedFunction => "Function is never called",
    }
    .to_string()
}

#[derive(Debug, Clone, Default)]
pub struct VariableUsageAnalyzer {
    pub options: DataFlowOptions,
    pub parallel: bool,
    /// Functions that are called from outside the project.
    pub entry_points: Vec<String>,
    /// The trees are a slice of a larger project: unused globals and
    /// uncalled functions cannot be decided and are not reported.
    pub per_file: bool,
}

impl VariableUsageAnalyzer {
    pub fn new(options: DataFlowOptions) -> Self {
        Self { options, parallel: true, entry_points: Vec::new(), per_file: false }
    }

    pub fn analyze(&self, project_path: &str, trees: &[SyntaxTree]) -> VariableUsageAnalysis {
        self.analyze_cancellable(project_path, trees, &CancellationToken::new())
    }

    /// Files finished before `token` fires are kept; the result is marked partial.
    pub fn analyze_cancellable(
        &self,
        project_path: &str,
        trees: &[SyntaxTree],
        token: &CancellationToken,
    ) -> VariableUsageAnalysis {
        let analyze_one = |tree: &SyntaxTree| -> Option<Vec<PouDataFlow>> {
            if token.is_cancelled() {
                return None;
            }
            debug!(file = %tree.file_path, pous = tree.pous().count(), "data flow");
            Some(dataflow::analyze_tree(tree, &self.options))
        };
        let results: Vec<Option<Vec<PouDataFlow>>> = if self.parallel {
            trees.par_iter().map(analyze_one).collect()
        } else {
            trees.iter().map(analyze_one).collect()
        };
        let files_analyzed = results.iter().filter(|r| r.is_some()).count();
        let partial = files_analyzed < trees.len();
        let flows: Vec<PouDataFlow> = results.into_iter().flatten().flatten().collect();

        let mut analysis = VariableUsageAnalysis {
            project_path: project_path.to_string(),
            analysed_at: Utc::now(),
            unused: Vec::new(),
            uninitialized: Vec::new(),
            dead_code: Vec::new(),
            usage: Vec::new(),
            files_analyzed,
            partial,
        };

        for flow in &flows {
            collect_pou(flow, &mut analysis);
        }
        if !partial && !self.per_file {
            collect_globals(trees, &flows, &mut analysis);
            analysis.dead_code.extend(unused_functions(trees, &flows, &self.entry_points));
        }

        info!(
            project = %project_path,
            files = files_analyzed,
            unused = analysis.unused.len(),
            uninitialized = analysis.uninitialized.len(),
            dead_code = analysis.dead_code.len(),
            partial,
            "variable usage analysis complete"
        );
        analysis
    }
}

fn span_of(lines: impl Iterator<Item = usize>) -> (Option<usize>, Option<usize>) {
    lines.fold((None, None), |(lo, hi): (Option<usize>, Option<usize>), l| {
        (Some(lo.map_or(l, |v| v.min(l))), Some(hi.map_or(l, |v| v.max(l))))
    })
}

fn is_unused(scope: VarScope, reads: usize, writes: usize) -> bool {
    match scope {
        VarScope::Local | VarScope::Temp | VarScope::Input => reads == 0,
        VarScope::InOut | VarScope::External => reads == 0 && writes == 0,
        // read by callers; globals are counted project-wide
        VarScope::Output | VarScope::Global => false,
    }
}

fn collect_pou(flow: &PouDataFlow, analysis: &mut VariableUsageAnalysis) {
    for info in flow.variables.values() {
        let (first_line, last_line) = span_of(info.definitions.iter().chain(&info.uses).copied());
        analysis.usage.push(VariableUsageStatistics {
            name: info.name.clone(),
            scope: info.scope,
            file_path: flow.file_path.clone(),
            pou_name: Some(flow.pou_name.clone()),
            reads: info.uses.len(),
            writes: info.definitions.len(),
            first_line,
            last_line,
        });
        if is_unused(info.scope, info.uses.len(), info.definitions.len()) {
            analysis.unused.push(UnusedVariable {
                name: info.name.clone(),
                scope: info.scope,
                data_type: info.data_type.clone(),
                file_path: flow.file_path.clone(),
                pou_name: Some(flow.pou_name.clone()),
                declared_line: info.declared_line,
                assigned: !info.definitions.is_empty(),
            });
        }
    }
    for read in &flow.uninitialized_reads {
        analysis.uninitialized.push(UninitializedVariable {
            name: read.variable.clone(),
            file_path: flow.file_path.clone(),
            pou_name: flow.pou_name.clone(),
            declared_line: read.declared_line,
            first_use_line: read.line,
        });
    }
    analysis.dead_code.extend(flow.dead_code.iter().cloned());
}

/// GVL entries are used when any POU reads them, directly or through VAR_EXTERNAL.
fn collect_globals(trees: &[SyntaxTree], flows: &[PouDataFlow], analysis: &mut VariableUsageAnalysis) {
    let mut reads: HashMap<String, Vec<usize>> = HashMap::new();
    let mut writes: HashMap<String, Vec<usize>> = HashMap::new();
    for flow in flows {
        for (name, lines) in &flow.external_reads {
            reads.entry(name.to_ascii_uppercase()).or_default().extend(lines);
        }
        for (name, lines) in &flow.external_writes {
            writes.entry(name.to_ascii_uppercase()).or_default().extend(lines);
        }
        for (k, info) in flow.variables.iter().filter(|(_, i)| i.scope == VarScope::External) {
            reads.entry(k.clone()).or_default().extend(&info.uses);
            writes.entry(k.clone()).or_default().extend(&info.definitions);
        }
    }

    for tree in trees {
        for list in tree.global_lists() {
            for decl in list.var_blocks.iter().flat_map(|b| b.variables.iter()) {
                let k = decl.name.to_ascii_uppercase();
                let r = reads.get(&k).map(Vec::as_slice).unwrap_or_default();
                let w = writes.get(&k).map(Vec::as_slice).unwrap_or_default();
                let (first_line, last_line) = span_of(r.iter().chain(w).copied());
                analysis.usage.push(VariableUsageStatistics {
                    name: decl.name.clone(),
                    scope: VarScope::Global,
                    file_path: tree.file_path.clone(),
                    pou_name: None,
                    reads: r.len(),
                    writes: w.len(),
                    first_line,
                    last_line,
                });
                if r.is_empty() {
                    analysis.unused.push(UnusedVariable {
                        name: decl.name.clone(),
                        scope: VarScope::Global,
                        data_type: decl.data_type.clone(),
                        file_path: tree.file_path.clone(),
                        pou_name: None,
                        declared_line: decl.meta.line(),
                        assigned: !w.is_empty(),
                    });
                }
            }
        }
    }
}

fn unused_functions(trees: &[SyntaxTree], flows: &[PouDataFlow], entry_points: &[String]) -> Vec<DeadCode> {
    let called: HashSet<String> = flows
        .iter()
        .flat_map(|f| f.calls.iter().map(|c| c.callee.to_ascii_uppercase()))
        .chain(entry_points.iter().map(|e| e.to_ascii_uppercase()))
        .collect();
    let mut out = BTreeMap::new();
    for tree in trees {
        for pou in tree.pous().filter(|p| matches!(p.kind, PouKind::Function { .. })) {
            if called.contains(&pou.name.to_ascii_uppercase()) {
                continue;
            }
            out.insert(
                (tree.file_path.clone(), pou.meta.line()),
                DeadCode {
                    kind: DeadCodeKind::UnusedFunction,
                    file_path: tree.file_path.clone(),
                    pou_name: pou.name.clone(),
                    start_line: pou.meta.span.start_line,
                    end_line: pou.meta.span.end_line,
                    description: format!("FUNCTION {} is never called", pou.name),
                },
            );
        }
    }
    out.into_values().collect()
}
