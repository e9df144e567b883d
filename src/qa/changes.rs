//! Change records produced by the diff layer and consumed by rule checkers.
use serde::{Deserialize, Serialize};

use crate::ast::{DataTypeKind, VarScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
    Moved,
}

impl ChangeType {
    pub fn adds_code(self) -> bool {
        matches!(self, ChangeType::Added | ChangeType::Modified)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableChange {
    pub change_type: ChangeType,
    pub variable_name: String,
    pub file_path: String,
    pub line: usize,
    pub scope: VarScope,
    pub old_data_type: Option<String>,
    pub new_data_type: Option<String>,
    pub old_initial_value: Option<String>,
    pub new_initial_value: Option<String>,
}

impl VariableChange {
    pub fn new(change_type: ChangeType, name: &str, scope: VarScope, file_path: &str, line: usize) -> Self {
        Self {
            change_type,
            variable_name: name.to_string(),
            file_path: file_path.to_string(),
            line,
            scope,
            old_data_type: None,
            new_data_type: None,
            old_initial_value: None,
            new_initial_value: None,
        }
    }

    pub fn with_types(mut self, old: Option<&str>, new: Option<&str>) -> Self {
        self.old_data_type = old.map(str::to_string);
        self.new_data_type = new.map(str::to_string);
        self
    }

    pub fn with_initial_values(mut self, old: Option<&str>, new: Option<&str>) -> Self {
        self.old_initial_value = old.map(str::to_string);
        self.new_initial_value = new.map(str::to_string);
        self
    }

    /// Data type on the side of the change that still exists.
    pub fn current_data_type(&self) -> Option<&str> {
        match self.change_type {
            ChangeType::Removed => self.old_data_type.as_deref(),
            _ => self.new_data_type.as_deref().or(self.old_data_type.as_deref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicChange {
    pub change_type: ChangeType,
    pub element_name: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub old_code: Option<String>,
    pub new_code: Option<String>,
    pub summary: String,
}

impl LogicChange {
    pub fn added(element: &str, file_path: &str, start_line: usize, code: &str) -> Self {
        Self {
            change_type: ChangeType::Added,
            element_name: element.to_string(),
            file_path: file_path.to_string(),
            start_line,
            end_line: start_line + code.lines().count().saturating_sub(1),
            old_code: None,
            new_code: Some(code.to_string()),
            summary: String::new(),
        }
    }

    pub fn modified(element: &str, file_path: &str, start_line: usize, old: &str, new: &str) -> Self {
        Self {
            change_type: ChangeType::Modified,
            old_code: Some(old.to_string()),
            ..Self::added(element, file_path, start_line, new)
        }
    }

    /// Code a checker should inspect: new code for additions and edits.
    pub fn code_to_check(&self) -> Option<&str> {
        if self.change_type.adds_code() {
            self.new_code.as_deref()
        } else {
            None
        }
    }

    pub fn changed_line_count(&self) -> usize {
        let old = self.old_code.as_deref().map(|c| c.lines().count()).unwrap_or(0);
        let new = self.new_code.as_deref().map(|c| c.lines().count()).unwrap_or(0);
        old.max(new)
    }

    /// Absolute line of a byte offset inside the new code.
    pub fn line_at(&self, offset: usize) -> usize {
        let code = self.new_code.as_deref().unwrap_or("");
        let end = offset.min(code.len());
        self.start_line + code.as_bytes()[..end].iter().filter(|b| **b == b'\n').count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub change_type: ChangeType,
    pub field_name: String,
    pub old_data_type: Option<String>,
    pub new_data_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValueChange {
    pub change_type: ChangeType,
    pub name: String,
    pub old_value: Option<i64>,
    pub new_value: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTypeChange {
    pub change_type: ChangeType,
    pub type_name: String,
    pub kind: DataTypeKind,
    pub file_path: String,
    pub line: usize,
    pub old_definition: Option<String>,
    pub new_definition: Option<String>,
    pub field_changes: Vec<FieldChange>,
    pub enum_changes: Vec<EnumValueChange>,
}

impl DataTypeChange {
    pub fn new(change_type: ChangeType, type_name: &str, kind: DataTypeKind, file_path: &str, line: usize) -> Self {
        Self {
            change_type,
            type_name: type_name.to_string(),
            kind,
            file_path: file_path.to_string(),
            line,
            old_definition: None,
            new_definition: None,
            field_changes: Vec::new(),
            enum_changes: Vec::new(),
        }
    }
}

/// Which of the three change kinds a checker was examining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Variable,
    Logic,
    DataType,
    ChangeSet,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub variable_changes: Vec<VariableChange>,
    pub logic_changes: Vec<LogicChange>,
    pub data_type_changes: Vec<DataTypeChange>,
}

impl ChangeSet {
    pub fn len(&self) -> usize {
        self.variable_changes.len() + self.logic_changes.len() + self.data_type_changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
