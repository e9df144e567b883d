//! Project-level analyses over syntax trees: confidence scoring, data flow,
//! variable usage and dependency graphs.
pub mod confidence;
pub mod dataflow;
pub mod dependencies;
pub mod error;
pub mod timings;
pub mod usage;

pub use confidence::{ConfidenceCalculator, ConfidenceLevel, ConfidenceResult, ConfidenceStatistics};
pub use dataflow::{analyze_tree, DataFlowOptions, DeadCode, DeadCodeKind, DefUseInfo, PouDataFlow};
pub use dependencies::{
    CallDepth, CallGraph, CircularReference, DependencyAnalysis, DependencyAnalyzer, DependencyEdge, DependencyGraph,
    DependencyKind, DependencyNode, DependencyNodeKind,
};
pub use error::AnalysisError;
pub use usage::{
    UninitializedVariable, UnusedVariable, VariableUsageAnalysis, VariableUsageAnalyzer, VariableUsageStatistics,
};
