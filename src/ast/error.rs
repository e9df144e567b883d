use thiserror::Error;

use super::nodes::NodeId;

#[derive(Debug, Error)]
pub enum AstError {
    #[error("syntax tree for {0} has no root nodes")]
    EmptyTree(String),

    #[error("node {node} already has parent {existing}, refusing to attach it under {requested}")]
    NodeAlreadyParented {
        node: NodeId,
        existing: NodeId,
        requested: NodeId,
    },

    #[error("attaching node {node} under {parent} would make it its own ancestor")]
    ParentCycle { node: NodeId, parent: NodeId },

    #[error("node {0} appears more than once in the tree")]
    DuplicateNode(NodeId),

    #[error("unknown node id {0}")]
    UnknownNode(NodeId),
}
