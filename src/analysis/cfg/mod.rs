//! Control flow graphs of TAC procedures.
//!
//! # Key Components
//!
//! - [`Cfg`] - blocks keyed by label, with edges derived from terminators
//! - [`Block`] - a label, a body and an ordered terminator list
//! - [`BlockGraph`] - index-based view implementing the [`crate::utils::graph`] traits
//! - [`infer`] / [`linearize`] - conversion from and to a procedure's linear body
//! - [`CfgBuilder`] - closure-based construction for tests and benchmarks
//!
//! # Examples
//!
//! ```rust
//! use tacopt::analysis::cfg::{infer, linearize};
//! use tacopt::tac::{Instr, Operand, Proc};
//!
//! let mut proc = Proc::new("@main", vec![], vec![
//!     Instr::constant("%0", 1),
//!     Instr::ret(Some(Operand::from("%0"))),
//! ]);
//!
//! let cfg = infer(&proc)?;
//! assert_eq!(cfg.len(), 1);
//!
//! linearize(&mut proc, &cfg);
//! assert_eq!(proc.body.len(), 3); // label, const, ret
//! # Ok::<(), tacopt::Error>(())
//! ```

mod block;
mod builder;
mod graph;
mod infer;
mod view;

pub use block::Block;
pub use builder::{BlockBuilder, CfgBuilder, CfgContext};
pub use graph::Cfg;
pub use infer::{infer, linearize};
pub use view::BlockGraph;
