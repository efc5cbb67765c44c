//! Graph algorithms for program analysis.
//!
//! ## Traversal
//!
//! - [`postorder`] / [`reverse_postorder`] - depth-first orders
//! - [`reachable_from`] / [`reaching`] - forward and backward reachability sets
//!
//! ## Dominator Analysis
//!
//! - [`compute_dominators`] - full dominator sets by iterative data flow
//! - [`NodeDominators`] - result of dominator computation
//!
//! | Algorithm | Time Complexity | Use Case |
//! |-----------|-----------------|----------|
//! | DFS orders | O(V + E) | Data-flow iteration order |
//! | Reachability | O(V + E) | Path queries for CSE |
//! | Dominators | O(V² / 64 × iterations) | CSE, SSA validation |

mod dominators;
mod traversal;

pub use dominators::{compute_dominators, NodeDominators};
pub use traversal::{postorder, reachable_from, reaching, reverse_postorder};
