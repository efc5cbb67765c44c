//! The three-address code (TAC) intermediate form.
//!
//! A TAC program is a list of [`Decl`]arations: global variables ([`Gvar`]) and procedures
//! ([`Proc`]). A procedure body is a flat stream of [`Instr`]uctions in which `label`
//! pseudo-instructions mark where basic blocks begin.
//!
//! # Key Components
//!
//! - [`Temp`], [`Label`], [`Operand`] - names and values
//! - [`Instr`], [`Op`] - instructions and their operations
//! - [`load_tac`] / [`store_tac`] - the JSON file format
//! - [`execute`] - a reference interpreter
//!
//! # Examples
//!
//! ```rust
//! use tacopt::tac::{parse_tac, execute};
//!
//! let decls = parse_tac(r#"[
//!     {"proc": "@main", "args": [], "body": [
//!         {"opcode": "const", "args": [42], "result": "%0"},
//!         {"opcode": "param", "args": [1, "%0"], "result": null},
//!         {"opcode": "call", "args": ["@__bx_print_int", 1], "result": null},
//!         {"opcode": "ret", "args": [], "result": null}
//!     ]}
//! ]"#)?;
//!
//! let outcome = execute(&decls, "@main", &[])?;
//! assert_eq!(outcome.output, vec!["42"]);
//! # Ok::<(), tacopt::Error>(())
//! ```

mod instr;
mod interp;
mod json;
mod program;
mod temp;

pub use instr::{BinaryOp, Condition, Instr, Op, Opcode, UnaryOp};
pub use interp::{execute, ExecOutcome, Interpreter, DEFAULT_STEP_LIMIT};
pub use json::{load_tac, parse_tac, store_tac, to_json};
pub use program::{Decl, Gvar, Proc};
pub use temp::{Label, Operand, Temp, TempKind};
