//! # tacopt Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and functions
//! from the tacopt library. Import this module to get quick access to everything needed to
//! load, optimize and run a TAC program.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all tacopt operations
pub use crate::Error;

/// The result type used throughout tacopt
pub use crate::Result;

// ================================================================================================
// Three-Address Code
// ================================================================================================

/// Names, operands and instructions
pub use crate::tac::{
    BinaryOp, Condition, Instr, Label, Op, Opcode, Operand, Temp, TempKind, UnaryOp,
};

/// Programs and their declarations
pub use crate::tac::{Decl, Gvar, Proc};

/// File format and interpreter
pub use crate::tac::{execute, load_tac, parse_tac, store_tac, to_json, ExecOutcome};

// ================================================================================================
// Analysis
// ================================================================================================

/// Control flow graphs
pub use crate::analysis::{infer, linearize, Block, Cfg, CfgBuilder};

/// Dominance, SSA construction and constant propagation
pub use crate::analysis::{
    crude_ssagen, dominators, ConstantPropagation, DominatorSets, LatticeValue, SccpResult,
};

// ================================================================================================
// Optimization
// ================================================================================================

/// The pipeline and its configuration
pub use crate::compiler::{Pipeline, PipelineConfig};

/// Passes and change tracking
pub use crate::compiler::{
    CommonSubexpressionPass, ConstantPropagationPass, CopyPropagationPass, Event, EventKind,
    EventLog, OptPass, SsaMinimizationPass,
};
