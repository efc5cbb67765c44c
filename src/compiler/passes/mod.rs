//! Optimization passes over SSA-form CFGs.
//!
//! Each pass implements [`OptPass`](crate::compiler::OptPass) and also exposes its rewrite
//! as free functions, so single steps can be run and tested in isolation.
//!
//! - [`SsaMinimizationPass`] - redundant phi elimination ([`ssamin::minimize`])
//! - [`ConstantPropagationPass`] - SCCP rewrite ([`sccp::propagate_constants`])
//! - [`CommonSubexpressionPass`] - local and global CSE ([`cse::apply_cse`])
//! - [`CopyPropagationPass`] - removes the copies CSE leaves behind
//!   ([`copyprop::propagate_copies`])

pub mod copyprop;
pub mod cse;
pub mod sccp;
pub mod ssamin;

pub use copyprop::{propagate_copies, CopyPropagationPass};
pub use cse::{apply_cse, global_cse, local_cse, CommonSubexpressionPass, ExprKey};
pub use sccp::{propagate_constants, ConstantPropagationPass};
pub use ssamin::{minimize, nce, rename, SsaMinimizationPass};
