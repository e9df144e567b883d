use serde::{Deserialize, Serialize};

use crate::ast::SyntaxTree;

/// Heuristic evidence about one finding, consumed by the confidence calculator.
///
/// Built fresh per issue; carries no identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstAnalysisSignals {
    pub confirmed_by_ast: bool,
    pub confirmed_by_dataflow: bool,
    pub ambiguous_context: bool,
    pub possible_external_reference: bool,
    pub is_io_variable: bool,
    pub is_global_variable: bool,
    pub similar_occurrences: u32,
    pub notes: Vec<String>,
    /// Ordered key/value pairs; only a short preview ends up in the reasons.
    pub context: Vec<(String, String)>,
}

impl AstAnalysisSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ast_confirmed(mut self) -> Self {
        self.confirmed_by_ast = true;
        self
    }

    pub fn dataflow_confirmed(mut self) -> Self {
        self.confirmed_by_dataflow = true;
        self
    }

    pub fn ambiguous(mut self) -> Self {
        self.ambiguous_context = true;
        self
    }

    pub fn external_reference(mut self) -> Self {
        self.possible_external_reference = true;
        self
    }

    pub fn io_variable(mut self) -> Self {
        self.is_io_variable = true;
        self
    }

    pub fn global_variable(mut self) -> Self {
        self.is_global_variable = true;
        self
    }

    pub fn similar(mut self, occurrences: u32) -> Self {
        self.similar_occurrences = occurrences;
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.push((key.into(), value.to_string()));
        self
    }

    /// A tree with parse errors makes every finding in it less certain.
    pub fn with_tree(mut self, tree: &SyntaxTree) -> Self {
        if !tree.is_valid() {
            self.ambiguous_context = true;
            self.notes.push(format!("{} parse error(s) in {}", tree.errors.len(), tree.file_path));
        }
        self
    }
}
