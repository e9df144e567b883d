//! Per-file syntax tree container and the node-id arena that backs parent lookups.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::AstError;
use super::nodes::{DataTypeDecl, GlobalVarList, NodeId, NodeKind, NodeRef, Pou, RootNode, Span};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsingError {
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub offending_symbol: Option<String>,
}

/// Arena entry for one node. Parent links are lookup-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeInfo {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct ParentIndex {
    entries: HashMap<NodeId, NodeInfo>,
}

impl ParentIndex {
    /// Index every node reachable from `roots`, rejecting nodes reachable twice.
    pub fn build(roots: &[RootNode]) -> Result<Self, AstError> {
        let mut index = Self::default();
        let mut stack: Vec<(NodeRef<'_>, Option<NodeId>)> =
            roots.iter().rev().map(|r| (NodeRef::from(r), None)).collect();

        while let Some((node, parent)) = stack.pop() {
            index.insert(node, parent)?;
            let id = node.id();
            for child in node.children().into_iter().rev() {
                stack.push((child, Some(id)));
            }
        }
        Ok(index)
    }

    fn insert(&mut self, node: NodeRef<'_>, parent: Option<NodeId>) -> Result<(), AstError> {
        let id = node.id();
        if let Some(existing) = self.entries.get(&id) {
            return Err(match (existing.parent, parent) {
                (Some(existing), Some(requested)) if existing != requested => {
                    AstError::NodeAlreadyParented { node: id, existing, requested }
                }
                _ => AstError::DuplicateNode(id),
            });
        }
        self.entries.insert(
            id,
            NodeInfo { kind: node.kind(), span: node.meta().span, parent },
        );
        Ok(())
    }

    /// Attach `child` under `parent`. Re-attaching under the same parent is a no-op;
    /// a parent that descends from `child` is rejected.
    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) -> Result<(), AstError> {
        if !self.entries.contains_key(&parent) {
            return Err(AstError::UnknownNode(parent));
        }
        if !self.entries.contains_key(&child) {
            return Err(AstError::UnknownNode(child));
        }
        if self.path_to_root(parent)?.contains(&child) {
            return Err(AstError::ParentCycle { node: child, parent });
        }
        let info = self.entries.get_mut(&child).ok_or(AstError::UnknownNode(child))?;
        match info.parent {
            Some(existing) if existing != parent => Err(AstError::NodeAlreadyParented {
                node: child,
                existing,
                requested: parent,
            }),
            _ => {
                info.parent = Some(parent);
                Ok(())
            }
        }
    }

    pub fn info(&self, id: NodeId) -> Option<&NodeInfo> {
        self.entries.get(&id)
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.entries.get(&id).and_then(|info| info.parent)
    }

    /// Ids from `id` up to its root, inclusive on both ends.
    pub fn path_to_root(&self, id: NodeId) -> Result<Vec<NodeId>, AstError> {
        let mut path = vec![id];
        let mut current = self.entries.get(&id).ok_or(AstError::UnknownNode(id))?;
        while let Some(parent) = current.parent {
            // A well-formed index cannot be longer than its node count.
            if path.len() > self.entries.len() {
                return Err(AstError::ParentCycle { node: id, parent });
            }
            path.push(parent);
            current = self.entries.get(&parent).ok_or(AstError::UnknownNode(parent))?;
        }
        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-node analysis annotations kept beside the tree, never inside it.
#[derive(Debug, Clone)]
pub struct SideTable<T> {
    values: HashMap<NodeId, T>,
}

impl<T> Default for SideTable<T> {
    fn default() -> Self {
        Self { values: HashMap::new() }
    }
}

impl<T> SideTable<T> {
    pub fn insert(&mut self, id: NodeId, value: T) -> Option<T> {
        self.values.insert(id, value)
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.values.get(&id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &T)> {
        self.values.iter()
    }
}

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    pub file_path: String,
    pub source: String,
    pub roots: Vec<RootNode>,
    pub errors: Vec<ParsingError>,
    index: ParentIndex,
}

impl SyntaxTree {
    pub fn new(
        file_path: impl Into<String>,
        source: impl Into<String>,
        roots: Vec<RootNode>,
        errors: Vec<ParsingError>,
    ) -> Result<Self, AstError> {
        let file_path = file_path.into();
        if roots.is_empty() && errors.is_empty() {
            return Err(AstError::EmptyTree(file_path));
        }
        let index = ParentIndex::build(&roots)?;
        Ok(Self {
            file_path,
            source: source.into(),
            roots,
            errors,
            index,
        })
    }

    /// Tree for a file the parser could not produce any nodes for.
    pub fn failed(file_path: impl Into<String>, source: impl Into<String>, errors: Vec<ParsingError>) -> Self {
        Self {
            file_path: file_path.into(),
            source: source.into(),
            roots: Vec::new(),
            errors,
            index: ParentIndex::default(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn index(&self) -> &ParentIndex {
        &self.index
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.index.parent_of(id)
    }

    pub fn parent_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.parent_of(id).and_then(|p| self.index.info(p)).map(|info| info.kind)
    }

    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    pub fn pous(&self) -> impl Iterator<Item = &Pou> {
        self.roots.iter().filter_map(|r| match r {
            RootNode::Pou(p) => Some(p),
            _ => None,
        })
    }

    pub fn global_lists(&self) -> impl Iterator<Item = &GlobalVarList> {
        self.roots.iter().filter_map(|r| match r {
            RootNode::GlobalVars(g) => Some(g),
            _ => None,
        })
    }

    pub fn data_types(&self) -> impl Iterator<Item = &DataTypeDecl> {
        self.roots.iter().filter_map(|r| match r {
            RootNode::DataType(d) => Some(d),
            _ => None,
        })
    }

    /// Pre-order walk over every node of every root.
    pub fn descendants(&self) -> Vec<NodeRef<'_>> {
        let mut out = Vec::with_capacity(self.index.len());
        let mut stack: Vec<NodeRef<'_>> = self.roots.iter().rev().map(NodeRef::from).collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children().into_iter().rev());
        }
        out
    }

    pub fn line_count(&self) -> usize {
        self.source.lines().count()
    }

    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| match &e.offending_symbol {
                Some(sym) => format!("{}:{}:{} {} (near '{}')", self.file_path, e.line, e.column, e.message, sym),
                None => format!("{}:{}:{} {}", self.file_path, e.line, e.column, e.message),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
