/// Structured Text syntax tree: node model, container, builder and traversal
pub mod builder;
pub mod error;
pub mod nodes;
pub mod tree;
pub mod visitor;

// Re-export main types for convenience
pub use builder::AstBuilder;
pub use error::AstError;
pub use nodes::*;
pub use tree::{NodeInfo, ParentIndex, ParsingError, SideTable, SyntaxTree};
pub use visitor::{ComplexityMetrics, ComplexityVisitor, ExpressionFold, StatementFold, Visitor};
