//! # Expression Decomposition
//!
//! Parses infix arithmetic into an ordered plan of binary operations and
//! drives that plan through an [`OperationExecutor`].

pub mod resolver;
pub mod tokens;

pub use resolver::{Decomposer, LocalExecutor, OperationExecutor, RecordingExecutor};
pub use tokens::{parse, tokenize, Token};
