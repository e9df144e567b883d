//! Dependency and call graphs over program organisation units.
//!
//! Nodes are keyed by upper-cased name since Structured Text identifiers are
//! case-insensitive; the declared spelling is kept for display.
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ast::visitor::{walk_call, walk_variable_ref, Visitor};
use crate::ast::{FunctionCall, Pou, PouKind, SyntaxTree, VariableRef};
use crate::orchestrator::CancellationToken;
use crate::qa::{QAIssue, Severity};

pub const CIRCULAR_REFERENCE_RULE: &str = "DEP001";

fn key(name: &str) -> String {
    name.to_ascii_uppercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DependencyNodeKind {
    Program,
    FunctionBlock,
    Function,
    Global,
    DataType,
    Unknown,
}

impl DependencyNodeKind {
    pub fn label(self) -> &'static str {
        match self {
            DependencyNodeKind::Program => "PROGRAM",
            DependencyNodeKind::FunctionBlock => "FUNCTION_BLOCK",
            DependencyNodeKind::Function => "FUNCTION",
            DependencyNodeKind::Global => "GLOBAL",
            DependencyNodeKind::DataType => "TYPE",
            DependencyNodeKind::Unknown => "UNKNOWN",
        }
    }

    fn dot_color(self) -> &'static str {
        match self {
            DependencyNodeKind::Program => "lightblue",
            DependencyNodeKind::FunctionBlock => "lightgreen",
            DependencyNodeKind::Function => "lightyellow",
            _ => "white",
        }
    }

    fn of_pou(pou: &Pou) -> Self {
        match pou.kind {
            PouKind::Program => DependencyNodeKind::Program,
            PouKind::FunctionBlock { .. } => DependencyNodeKind::FunctionBlock,
            PouKind::Function { .. } => DependencyNodeKind::Function,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DependencyKind {
    FunctionCall,
    Inheritance,
    InterfaceImplementation,
    TypeUsage,
    VariableReference,
}

impl DependencyKind {
    fn dot_style(self) -> &'static str {
        match self {
            DependencyKind::FunctionCall => "solid",
            DependencyKind::Inheritance => "dashed",
            _ => "dotted",
        }
    }

    fn dot_label(self) -> &'static str {
        match self {
            DependencyKind::FunctionCall => "calls",
            DependencyKind::Inheritance => "extends",
            DependencyKind::InterfaceImplementation => "implements",
            DependencyKind::TypeUsage => "uses type",
            DependencyKind::VariableReference => "references",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub name: String,
    pub kind: DependencyNodeKind,
    pub file_path: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    pub kind: DependencyKind,
    /// Line of the first occurrence.
    pub line: usize,
}

/// Directed graph without parallel edges of the same kind.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, DependencyNode>,
    edges: BTreeMap<(String, String, DependencyKind), DependencyEdge>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first definition of a node; an `Unknown` placeholder is upgraded.
    pub fn add_node(&mut self, name: &str, kind: DependencyNodeKind, file_path: Option<&str>, description: &str) {
        let node = DependencyNode {
            name: name.to_string(),
            kind,
            file_path: file_path.map(str::to_string),
            description: description.to_string(),
        };
        match self.nodes.get_mut(&key(name)) {
            Some(existing) if existing.kind == DependencyNodeKind::Unknown && kind != DependencyNodeKind::Unknown => {
                *existing = node;
            }
            Some(_) => {}
            None => {
                self.nodes.insert(key(name), node);
            }
        }
    }

    /// Returns false when an edge of that kind already joins the pair.
    pub fn add_edge(&mut self, from: &str, to: &str, kind: DependencyKind, line: usize) -> bool {
        for name in [from, to] {
            if !self.nodes.contains_key(&key(name)) {
                self.add_node(name, DependencyNodeKind::Unknown, None, "");
            }
        }
        let k = (key(from), key(to), kind);
        if let Some(existing) = self.edges.get_mut(&k) {
            existing.line = existing.line.min(line);
            return false;
        }
        self.edges.insert(k, DependencyEdge { from: from.to_string(), to: to.to_string(), kind, line });
        true
    }

    /// Edge union; commutative and idempotent.
    pub fn merge(&mut self, other: DependencyGraph) {
        for node in other.nodes.into_values() {
            self.add_node(&node.name, node.kind, node.file_path.as_deref(), &node.description);
        }
        for edge in other.edges.into_values() {
            self.add_edge(&edge.from, &edge.to, edge.kind, edge.line);
        }
    }

    pub fn node(&self, name: &str) -> Option<&DependencyNode> {
        self.nodes.get(&key(name))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn dependencies_of(&self, name: &str) -> Vec<&DependencyEdge> {
        let k = key(name);
        self.edges.iter().filter(|((from, _, _), _)| *from == k).map(|(_, e)| e).collect()
    }

    pub fn dependents_of(&self, name: &str) -> Vec<&DependencyEdge> {
        let k = key(name);
        self.edges.iter().filter(|((_, to, _), _)| *to == k).map(|(_, e)| e).collect()
    }

    fn adjacency(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut adj: BTreeMap<&str, Vec<&str>> = self.nodes.keys().map(|k| (k.as_str(), Vec::new())).collect();
        for (from, to, _) in self.edges.keys() {
            if let Some(list) = adj.get_mut(from.as_str()) {
                if !list.contains(&to.as_str()) {
                    list.push(to.as_str());
                }
            }
        }
        adj
    }

    fn display_name<'a>(&'a self, k: &'a str) -> &'a str {
        self.nodes.get(k).map(|n| n.name.as_str()).unwrap_or(k)
    }

    /// White/gray/black DFS; every edge into a gray node closes one cycle.
    pub fn detect_circular_references(&self) -> Vec<CircularReference> {
        let adj = self.adjacency();
        let cycles = find_cycles(&adj);
        cycles
            .into_iter()
            .map(|cycle| {
                let all_calls = cycle.iter().zip(cycle.iter().cycle().skip(1)).all(|(from, to)| {
                    self.edges.contains_key(&(from.to_string(), to.to_string(), DependencyKind::FunctionCall))
                });
                let path: Vec<String> = cycle.iter().map(|k| self.display_name(k).to_string()).collect();
                let severity = if all_calls { Severity::Critical } else { Severity::Warning };
                let description = if all_calls {
                    format!("Recursive call chain across {} POU(s)", path.len())
                } else {
                    format!("Circular dependency across {} element(s)", path.len())
                };
                CircularReference { cycle_path: path, severity, description }
            })
            .collect()
    }

    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph Dependencies {\n    rankdir=LR;\n    node [shape=box, style=filled];\n");
        for node in self.nodes.values() {
            out.push_str(&format!(
                "    \"{}\" [label=\"{}\\n{}\", fillcolor={}];\n",
                escape(&node.name),
                escape(&node.name),
                node.kind.label(),
                node.kind.dot_color()
            ));
        }
        for edge in self.edges.values() {
            out.push_str(&format!(
                "    \"{}\" -> \"{}\" [style={}, label=\"{}\"];\n",
                escape(&edge.from),
                escape(&edge.to),
                edge.kind.dot_style(),
                edge.kind.dot_label()
            ));
        }
        out.push_str("}\n");
        out
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Distinct cycles, each rotated to start at its smallest key.
fn find_cycles<'a>(adj: &BTreeMap<&'a str, Vec<&'a str>>) -> Vec<Vec<&'a str>> {
    let mut color: HashMap<&str, Color> = adj.keys().map(|k| (*k, Color::White)).collect();
    let mut seen: BTreeSet<Vec<&str>> = BTreeSet::new();
    let mut cycles = Vec::new();

    for &start in adj.keys() {
        if color.get(start) != Some(&Color::White) {
            continue;
        }
        color.insert(start, Color::Gray);
        let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
        while let Some(&mut (node, ref mut next)) = stack.last_mut() {
            let children = adj.get(node).map(Vec::as_slice).unwrap_or_default();
            if *next < children.len() {
                let child = children[*next];
                *next += 1;
                match color.get(child).copied().unwrap_or(Color::White) {
                    Color::Gray => {
                        let from = stack.iter().position(|(n, _)| *n == child).unwrap_or(0);
                        let mut cycle: Vec<&str> = stack[from..].iter().map(|(n, _)| *n).collect();
                        let min = cycle.iter().enumerate().min_by_key(|(_, n)| **n).map(|(i, _)| i).unwrap_or(0);
                        cycle.rotate_left(min);
                        if seen.insert(cycle.clone()) {
                            cycles.push(cycle);
                        }
                    }
                    Color::White => {
                        color.insert(child, Color::Gray);
                        stack.push((child, 0));
                    }
                    Color::Black => {}
                }
            } else {
                color.insert(node, Color::Black);
                stack.pop();
            }
        }
    }
    cycles
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircularReference {
    /// Members in traversal order; the last one leads back to the first.
    pub cycle_path: Vec<String>,
    pub severity: Severity,
    pub description: String,
}

impl CircularReference {
    pub fn path_string(&self) -> String {
        let mut parts = self.cycle_path.clone();
        if let Some(first) = self.cycle_path.first() {
            parts.push(first.clone());
        }
        parts.join(" → ")
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cycle_path.iter().any(|n| n.eq_ignore_ascii_case(name))
    }
}

// ---------------------------------------------------------------------------
// Call graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallGraphNode {
    pub name: String,
    pub kind: DependencyNodeKind,
    pub file_path: Option<String>,
    /// Incoming call sites.
    pub call_count: usize,
}

/// Every call from `caller` to `callee`, one site per call statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEdge {
    pub caller: String,
    pub callee: String,
    /// `(file, line)` of each call, sorted.
    pub sites: Vec<(String, usize)>,
}

impl CallEdge {
    /// Returns false when the site was already recorded.
    fn add_site(&mut self, file_path: &str, line: usize) -> bool {
        let site = (file_path.to_string(), line);
        match self.sites.binary_search(&site) {
            Ok(_) => false,
            Err(pos) => {
                self.sites.insert(pos, site);
                true
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallDepth {
    /// Longest chain of call edges.
    Bounded(usize),
    /// A cycle is reachable, so depth has no finite bound.
    Undefined { cycle: Vec<String> },
}

impl fmt::Display for CallDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallDepth::Bounded(n) => write!(f, "{n}"),
            CallDepth::Undefined { cycle } => write!(f, "undefined (recursive: {})", cycle.join(" → ")),
        }
    }
}

/// One edge per caller/callee pair; repeated calls add sites to it.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    pub nodes: BTreeMap<String, CallGraphNode>,
    edges: BTreeMap<(String, String), CallEdge>,
}

impl CallGraph {
    pub fn add_node(&mut self, name: &str, kind: DependencyNodeKind, file_path: Option<&str>) {
        self.nodes.entry(key(name)).or_insert_with(|| CallGraphNode {
            name: name.to_string(),
            kind,
            file_path: file_path.map(str::to_string),
            call_count: 0,
        });
    }

    pub fn add_call(&mut self, caller: &str, callee: &str, line: usize, file_path: &str) {
        for name in [caller, callee] {
            self.add_node(name, DependencyNodeKind::Unknown, None);
        }
        let edge = self.edges.entry((key(caller), key(callee))).or_insert_with(|| CallEdge {
            caller: caller.to_string(),
            callee: callee.to_string(),
            sites: Vec::new(),
        });
        if edge.add_site(file_path, line) {
            if let Some(node) = self.nodes.get_mut(&key(callee)) {
                node.call_count += 1;
            }
        }
    }

    /// Union of nodes, edges and sites; merging a graph twice changes nothing.
    pub fn merge(&mut self, other: CallGraph) {
        for (k, node) in other.nodes {
            match self.nodes.get_mut(&k) {
                Some(existing) => {
                    if existing.kind == DependencyNodeKind::Unknown && node.kind != DependencyNodeKind::Unknown {
                        existing.kind = node.kind;
                        existing.file_path = node.file_path;
                        existing.name = node.name;
                    }
                }
                None => {
                    self.nodes.insert(k, CallGraphNode { call_count: 0, ..node });
                }
            }
        }
        for edge in other.edges.into_values() {
            for (file, line) in &edge.sites {
                self.add_call(&edge.caller, &edge.callee, *line, file);
            }
        }
    }

    pub fn edges(&self) -> impl Iterator<Item = &CallEdge> {
        self.edges.values()
    }

    pub fn edge(&self, caller: &str, callee: &str) -> Option<&CallEdge> {
        self.edges.get(&(key(caller), key(callee)))
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn callees(&self, name: &str) -> Vec<&str> {
        let k = key(name);
        let set: BTreeSet<&str> =
            self.edges.iter().filter(|((from, _), _)| *from == k).map(|(_, e)| e.callee.as_str()).collect();
        set.into_iter().collect()
    }

    pub fn callers(&self, name: &str) -> Vec<&str> {
        let k = key(name);
        let set: BTreeSet<&str> =
            self.edges.iter().filter(|((_, to), _)| *to == k).map(|(_, e)| e.caller.as_str()).collect();
        set.into_iter().collect()
    }

    fn adjacency(&self) -> BTreeMap<String, Vec<String>> {
        let mut adj: BTreeMap<String, Vec<String>> = self.nodes.keys().map(|k| (k.clone(), Vec::new())).collect();
        for (from, to) in self.edges.keys() {
            adj.entry(from.clone()).or_default().push(to.clone());
        }
        adj
    }

    fn display(&self, k: &str) -> String {
        self.nodes.get(k).map(|n| n.name.clone()).unwrap_or_else(|| k.to_string())
    }

    /// Longest call chain starting at `name`; `None` for an unknown node.
    pub fn depth_from(&self, name: &str) -> Option<CallDepth> {
        let adj = self.adjacency();
        let start = key(name);
        if !adj.contains_key(&start) {
            return None;
        }
        let mut memo = HashMap::new();
        Some(self.depth_dfs(&adj, &start, &mut memo))
    }

    /// Deepest chain from any node, or `Undefined` when any cycle exists.
    pub fn max_call_depth(&self) -> CallDepth {
        let adj = self.adjacency();
        let mut memo: HashMap<String, usize> = HashMap::new();
        let mut best = 0;
        for k in adj.keys() {
            match self.depth_dfs(&adj, k, &mut memo) {
                CallDepth::Bounded(d) => best = best.max(d),
                undefined => return undefined,
            }
        }
        CallDepth::Bounded(best)
    }

    /// Iterative DFS with memoised depths. The stack never holds a node twice,
    /// so it is bounded by the node count.
    fn depth_dfs(&self, adj: &BTreeMap<String, Vec<String>>, start: &str, memo: &mut HashMap<String, usize>) -> CallDepth {
        if let Some(d) = memo.get(start) {
            return CallDepth::Bounded(*d);
        }
        let mut on_stack: HashSet<&str> = HashSet::from([start]);
        let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
        while let Some(&mut (node, ref mut next)) = stack.last_mut() {
            let children = adj.get(node).map(Vec::as_slice).unwrap_or_default();
            if *next < children.len() {
                let child = children[*next].as_str();
                *next += 1;
                if memo.contains_key(child) {
                    continue;
                }
                if on_stack.contains(child) || stack.len() > adj.len() {
                    let from = stack.iter().position(|(n, _)| *n == child).unwrap_or(0);
                    let cycle = stack[from..].iter().map(|(n, _)| self.display(n)).collect();
                    return CallDepth::Undefined { cycle };
                }
                on_stack.insert(child);
                stack.push((child, 0));
            } else {
                let depth = children.iter().filter_map(|c| memo.get(c.as_str())).map(|d| d + 1).max().unwrap_or(0);
                memo.insert(node.to_string(), depth);
                on_stack.remove(node);
                stack.pop();
            }
        }
        CallDepth::Bounded(memo.get(start).copied().unwrap_or(0))
    }

    /// Nodes that lie on at least one call cycle.
    pub fn recursive_nodes(&self) -> Vec<String> {
        let adj = self.adjacency();
        let borrowed: BTreeMap<&str, Vec<&str>> =
            adj.iter().map(|(k, v)| (k.as_str(), v.iter().map(String::as_str).collect())).collect();
        let members: BTreeSet<&str> = find_cycles(&borrowed).into_iter().flatten().collect();
        members.into_iter().map(|k| self.display(k)).collect()
    }
}

// ---------------------------------------------------------------------------
// Construction from syntax trees
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ReferenceCollector {
    calls: Vec<(String, usize)>,
    refs: Vec<(String, usize)>,
}

impl Visitor for ReferenceCollector {
    fn visit_variable_ref(&mut self, var: &VariableRef) {
        self.refs.push((var.name.clone(), var.meta.line()));
        walk_variable_ref(self, var)
    }

    fn visit_target(&mut self, var: &VariableRef) {
        self.refs.push((var.name.clone(), var.meta.line()));
        walk_variable_ref(self, var)
    }

    fn visit_call(&mut self, call: &FunctionCall) {
        self.calls.push((call.name.clone(), call.meta.line()));
        walk_call(self, call)
    }
}

/// `ARRAY[..] OF POINTER TO T` -> `T`
fn referenced_type(data_type: &str) -> String {
    let mut t = data_type.trim();
    if let Some((prefix, rest)) = t.rsplit_once(" OF ") {
        if prefix.trim_start().to_ascii_uppercase().starts_with("ARRAY") {
            t = rest.trim();
        }
    }
    for prefix in ["POINTER TO ", "REFERENCE TO ", "REF_TO "] {
        if t.len() >= prefix.len() && t[..prefix.len()].eq_ignore_ascii_case(prefix) {
            t = t[prefix.len()..].trim();
        }
    }
    t.to_string()
}

fn declare_nodes(tree: &SyntaxTree, graph: &mut DependencyGraph) {
    let file = Some(tree.file_path.as_str());
    for pou in tree.pous() {
        graph.add_node(&pou.name, DependencyNodeKind::of_pou(pou), file, pou.type_label());
    }
    for list in tree.global_lists() {
        for decl in list.var_blocks.iter().flat_map(|b| b.variables.iter()) {
            graph.add_node(&decl.name, DependencyNodeKind::Global, file, &format!("{} in {}", decl.data_type, list.name));
        }
    }
    for ty in tree.data_types() {
        graph.add_node(&ty.name, DependencyNodeKind::DataType, file, &format!("{:?}", ty.kind()));
    }
}

/// Edges and call sites of one file, resolved against the project-wide node set.
fn file_fragment(tree: &SyntaxTree, known: &BTreeMap<String, DependencyNode>) -> (DependencyGraph, CallGraph) {
    let mut graph = DependencyGraph::new();
    let mut calls = CallGraph::default();
    let kind_of = |name: &str| known.get(&key(name)).map(|n| n.kind);

    for pou in tree.pous() {
        let line = pou.meta.line();
        if let PouKind::FunctionBlock { extends, implements } = &pou.kind {
            if let Some(base) = extends {
                graph.add_edge(&pou.name, base, DependencyKind::Inheritance, line);
            }
            for iface in implements {
                graph.add_edge(&pou.name, iface, DependencyKind::InterfaceImplementation, line);
            }
        }

        let mut locals: HashMap<String, String> = HashMap::new();
        for (_, decl) in pou.variables() {
            locals.insert(key(&decl.name), decl.data_type.clone());
            let ty = referenced_type(&decl.data_type);
            if matches!(kind_of(&ty), Some(DependencyNodeKind::FunctionBlock | DependencyNodeKind::DataType)) {
                graph.add_edge(&pou.name, &ty, DependencyKind::TypeUsage, decl.meta.line());
            }
        }

        let mut collector = ReferenceCollector::default();
        collector.visit_pou(pou);

        for (name, line) in collector.calls {
            // an instance call targets the instance's FB type
            let target = match locals.get(&key(&name)) {
                Some(ty) => referenced_type(ty),
                None => name,
            };
            if matches!(
                kind_of(&target),
                Some(DependencyNodeKind::Function | DependencyNodeKind::FunctionBlock | DependencyNodeKind::Program)
            ) {
                graph.add_edge(&pou.name, &target, DependencyKind::FunctionCall, line);
                calls.add_call(&pou.name, &target, line, &tree.file_path);
            }
        }
        for (name, line) in collector.refs {
            if locals.contains_key(&key(&name)) && !is_external(pou, &name) {
                continue;
            }
            if kind_of(&name) == Some(DependencyNodeKind::Global) {
                graph.add_edge(&pou.name, &name, DependencyKind::VariableReference, line);
            }
        }
    }
    (graph, calls)
}

fn is_external(pou: &Pou, name: &str) -> bool {
    pou.var_blocks
        .iter()
        .filter(|b| b.scope == crate::ast::VarScope::External)
        .any(|b| b.variables.iter().any(|v| v.name.eq_ignore_ascii_case(name)))
}

#[derive(Debug, Clone)]
pub struct DependencyAnalysis {
    pub graph: DependencyGraph,
    pub call_graph: CallGraph,
    pub cycles: Vec<CircularReference>,
    pub max_call_depth: CallDepth,
    pub analysed_at: DateTime<Utc>,
    pub files_analyzed: usize,
    pub partial: bool,
}

impl DependencyAnalysis {
    pub fn total_issues(&self) -> usize {
        self.cycles.len()
    }

    pub fn to_issues(&self) -> Vec<QAIssue> {
        self.cycles
            .iter()
            .map(|cycle| {
                let first = cycle.cycle_path.first().cloned().unwrap_or_default();
                let (file, line) = self
                    .graph
                    .node(&first)
                    .and_then(|n| n.file_path.clone())
                    .map(|f| {
                        let line = self
                            .graph
                            .dependencies_of(&first)
                            .iter()
                            .filter(|e| cycle.contains(&e.to))
                            .map(|e| e.line)
                            .min()
                            .unwrap_or(0);
                        (f, line)
                    })
                    .unwrap_or_default();
                QAIssue::new(CIRCULAR_REFERENCE_RULE, cycle.severity, "Architecture", "Circular reference")
                    .at(&file, line)
                    .description(format!("{}: {}", cycle.description, cycle.path_string()))
                    .why_dangerous("Cyclic POU dependencies make call depth unbounded and initialisation order undefined.")
                    .recommendation("Break the cycle by moving shared logic into a separate function block.")
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct DependencyAnalyzer {
    pub parallel: bool,
}

impl Default for DependencyAnalyzer {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl DependencyAnalyzer {
    pub fn new(parallel: bool) -> Self {
        Self { parallel }
    }

    pub fn analyze(&self, trees: &[SyntaxTree]) -> DependencyAnalysis {
        self.analyze_cancellable(trees, &CancellationToken::new())
    }

    /// Per-file fragments are built independently and merged by edge union.
    pub fn analyze_cancellable(&self, trees: &[SyntaxTree], token: &CancellationToken) -> DependencyAnalysis {
        let mut graph = DependencyGraph::new();
        for tree in trees {
            declare_nodes(tree, &mut graph);
        }
        let mut call_graph = CallGraph::default();
        for node in graph.nodes().filter(|n| {
            matches!(
                n.kind,
                DependencyNodeKind::Program | DependencyNodeKind::FunctionBlock | DependencyNodeKind::Function
            )
        }) {
            call_graph.add_node(&node.name, node.kind, node.file_path.as_deref());
        }

        let known = graph.nodes.clone();
        let build = |tree: &SyntaxTree| {
            if token.is_cancelled() {
                return None;
            }
            debug!(file = %tree.file_path, "dependency fragment");
            Some(file_fragment(tree, &known))
        };
        let fragments: Vec<Option<(DependencyGraph, CallGraph)>> = if self.parallel {
            trees.par_iter().map(build).collect()
        } else {
            trees.iter().map(build).collect()
        };

        let files_analyzed = fragments.iter().filter(|f| f.is_some()).count();
        for (fragment, calls) in fragments.into_iter().flatten() {
            graph.merge(fragment);
            call_graph.merge(calls);
        }

        let cycles = graph.detect_circular_references();
        let max_call_depth = call_graph.max_call_depth();
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            cycles = cycles.len(),
            max_call_depth = %max_call_depth,
            "dependency analysis complete"
        );
        DependencyAnalysis {
            graph,
            call_graph,
            cycles,
            max_call_depth,
            analysed_at: Utc::now(),
            files_analyzed,
            partial: files_analyzed < trees.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for (from, to) in edges {
            g.add_edge(from, to, DependencyKind::FunctionCall, 1);
        }
        g
    }

    #[test]
    fn three_node_cycle_is_reported_once() {
        let g = chain(&[("A", "B"), ("B", "C"), ("C", "A")]);
        let cycles = g.detect_circular_references();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].cycle_path, vec!["A", "B", "C"]);
        assert_eq!(cycles[0].path_string(), "A → B → C → A");
        assert_eq!(cycles[0].severity, Severity::Critical);
    }

    #[test]
    fn dag_has_no_cycles() {
        let g = chain(&[("A", "B"), ("B", "C"), ("A", "C")]);
        assert!(g.detect_circular_references().is_empty());
    }

    #[test]
    fn duplicate_edges_are_merged() {
        let mut g = chain(&[("A", "B")]);
        assert!(!g.add_edge("a", "b", DependencyKind::FunctionCall, 7));
        assert!(g.add_edge("A", "B", DependencyKind::TypeUsage, 7));
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn depth_of_chain_and_of_cycle() {
        let mut cg = CallGraph::default();
        cg.add_call("A", "B", 1, "f");
        cg.add_call("B", "C", 2, "f");
        cg.add_call("C", "D", 3, "f");
        assert_eq!(cg.depth_from("A"), Some(CallDepth::Bounded(3)));
        assert_eq!(cg.max_call_depth(), CallDepth::Bounded(3));

        cg.add_call("D", "A", 4, "f");
        assert!(matches!(cg.depth_from("A"), Some(CallDepth::Undefined { .. })));
        assert!(matches!(cg.max_call_depth(), CallDepth::Undefined { .. }));
        assert_eq!(cg.recursive_nodes(), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn repeated_calls_share_one_edge() {
        let mut cg = CallGraph::default();
        cg.add_call("MAIN", "F_Scale", 4, "main.st");
        cg.add_call("main", "f_scale", 9, "main.st");
        cg.add_call("MAIN", "F_Scale", 4, "main.st");
        assert_eq!(cg.edge_count(), 1);
        let edge = cg.edge("MAIN", "F_SCALE").expect("edge exists");
        assert_eq!(edge.sites, vec![("main.st".to_string(), 4), ("main.st".to_string(), 9)]);
        assert_eq!(cg.nodes["F_SCALE"].call_count, 2);
        assert_eq!(cg.callees("MAIN"), vec!["F_Scale"]);
    }

    #[test]
    fn merging_a_graph_into_itself_changes_nothing() {
        let mut cg = CallGraph::default();
        cg.add_node("MAIN", DependencyNodeKind::Program, Some("main.st"));
        cg.add_call("MAIN", "FB_Motor", 3, "main.st");
        cg.add_call("FB_Motor", "F_Scale", 7, "motor.st");
        cg.add_call("MAIN", "F_Scale", 5, "main.st");

        let before: Vec<CallEdge> = cg.edges().cloned().collect();
        let counts: Vec<usize> = cg.nodes.values().map(|n| n.call_count).collect();
        cg.merge(cg.clone());
        assert_eq!(cg.edges().cloned().collect::<Vec<_>>(), before);
        assert_eq!(cg.nodes.values().map(|n| n.call_count).collect::<Vec<_>>(), counts);
        assert_eq!(cg.nodes["F_SCALE"].call_count, 2);
        assert_eq!(cg.nodes["MAIN"].kind, DependencyNodeKind::Program);
    }

    #[test]
    fn referenced_type_strips_wrappers() {
        assert_eq!(referenced_type("ARRAY[1..10] OF POINTER TO FB_Motor"), "FB_Motor");
        assert_eq!(referenced_type("reference to ST_Data"), "ST_Data");
    }
}
