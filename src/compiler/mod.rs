//! Optimization pipeline for TAC procedures in SSA form.
//!
//! This module sits between the analyses and code generation:
//!
//! - [`crate::analysis`] - CFG construction, dominance, SSA construction, SCCP analysis
//! - [`compiler`](self) - the optimization passes and the pipeline running them
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Optimization Pipeline                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  Pipeline                    Fixed per-procedure sequence        │
//! │    ├─ infer                   linear body -> CFG                 │
//! │    ├─ crude_ssagen            phis everywhere, fresh versions    │
//! │    ├─ passes                  see below                          │
//! │    └─ linearize               CFG -> linear body                 │
//! │    Procedures run in parallel (rayon) unless disabled            │
//! │                                                                  │
//! │  OptPass trait               Interface for all passes            │
//! │    └─ run()                   in-place rewrite, reports change   │
//! │                                                                  │
//! │  Passes                                                          │
//! │    ├─ ssa-minimization        NCE + rename to fixpoint           │
//! │    ├─ sccp                    constants, dead blocks, branches   │
//! │    ├─ cse                     local epochs, global dominators    │
//! │    └─ copy-propagation        drops the copies CSE leaves        │
//! │                                                                  │
//! │  EventLog                    Change tracking and diagnostics     │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use tacopt::compiler::{Pipeline, PipelineConfig};
//! use tacopt::tac::parse_tac;
//!
//! let mut decls = parse_tac(r#"[{"proc": "@main", "args": [], "body": [
//!     {"opcode": "const", "args": [20], "result": "%0"},
//!     {"opcode": "add", "args": ["%0", 22], "result": "%1"},
//!     {"opcode": "ret", "args": ["%1"], "result": null}
//! ]}]"#)?;
//!
//! let events = Pipeline::new(PipelineConfig::default()).run(&mut decls)?;
//! println!("{}", events.summary());
//! assert_eq!(decls[0].as_proc().unwrap().body.last().unwrap().to_string(), "ret 42;");
//! # Ok::<(), tacopt::Error>(())
//! ```

mod events;
mod pass;
pub mod passes;
mod scheduler;

pub use events::{Event, EventBuilder, EventKind, EventLog};
pub use pass::OptPass;
pub use passes::{
    CommonSubexpressionPass, ConstantPropagationPass, CopyPropagationPass, SsaMinimizationPass,
};
pub use scheduler::{Pipeline, PipelineConfig};
