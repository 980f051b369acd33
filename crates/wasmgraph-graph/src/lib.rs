//! # wasmgraph Graph
//!
//! Decodes a bytecode body into an SSA graph of machine operations scheduled
//! into basic blocks, ready for a backend to lower.
//!
//! ```
//! use wasmgraph_bytecode::{encode::*, Environment, FunctionSignature};
//! use wasmgraph_graph::build_graph;
//!
//! let env = Environment::new(FunctionSignature::i_ii());
//! let graph = build_graph(&return_(i32_add(get_local(0), get_local(1))), &env)?;
//! assert_eq!(graph.returns().len(), 1);
//! # Ok::<(), wasmgraph_graph::DecodeError>(())
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod builder;
pub mod error;
pub mod graph;
pub mod passes;
mod printer;

pub use builder::build_graph;
pub use error::{DecodeError, DecodeErrorCode, Result};
pub use graph::{BinaryOp, Block, BlockId, Graph, Node, NodeId, NodeKind, Terminator, UnaryOp};
