//! Graph abstractions and algorithms.
//!
//! The CFG exposes itself to these algorithms through
//! [`BlockGraph`](crate::analysis::cfg::BlockGraph), a borrowed view that numbers blocks by
//! their position in the block order and implements the traits in this module.

pub mod algorithms;
mod node;
mod traits;

pub use node::NodeId;
pub use traits::{GraphBase, Predecessors, RootedGraph, Successors};
