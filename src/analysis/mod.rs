//! Program analysis infrastructure for TAC procedures.
//!
//! This module provides the analyses the optimization passes in [`crate::compiler`] are
//! built on. It builds upon the generic graph infrastructure in [`crate::utils::graph`] to
//! provide domain-specific analysis tools.
//!
//! # Architecture
//!
//! The analysis module is organized into focused sub-modules:
//!
//! - [`cfg`] - Control flow graph construction, validation and linearization
//! - [`dominance`] - Full strict dominator sets per block
//! - [`ssa`] - Crude SSA construction
//! - [`dataflow`] - The SCCP lattice and analysis
//!
//! # Usage
//!
//! ```rust
//! use tacopt::analysis::{cfg::infer, crude_ssagen, dominators};
//! use tacopt::tac::parse_tac;
//!
//! let decls = parse_tac(r#"[{"proc": "@main", "args": [], "body": [
//!     {"opcode": "const", "args": [1], "result": "%x"},
//!     {"opcode": "ret", "args": ["%x"], "result": null}
//! ]}]"#)?;
//! let proc = decls[0].as_proc().unwrap();
//!
//! let mut cfg = infer(proc)?;
//! crude_ssagen(proc, &mut cfg);
//!
//! let doms = dominators(&cfg);
//! assert!(doms[cfg.entry()].is_empty());
//! # Ok::<(), tacopt::Error>(())
//! ```

pub mod cfg;
pub mod dataflow;
pub mod dominance;
pub mod ssa;

// Re-export primary types at module level
pub use cfg::{infer, linearize, Block, Cfg, CfgBuilder};
pub use dataflow::{ConstantPropagation, LatticeValue, SccpResult};
pub use dominance::{dominators, DominatorSets};
pub use ssa::crude_ssagen;
