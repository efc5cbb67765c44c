// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # tacopt
//!
//! An SSA-based optimizing middle-end for three-address code (TAC).
//!
//! `tacopt` takes procedures lowered to TAC, puts them into static single assignment form
//! and runs a fixed pipeline of classical optimizations over each procedure's control flow
//! graph before writing it back as linear TAC:
//!
//! - **Dominance analysis** - full strict dominator sets per block
//! - **SSA minimization** - removal of phis that merge a single value
//! - **SCCP** - sparse conditional constant propagation with unreachable-code removal
//! - **CSE** - common subexpression elimination within blocks and along dominators
//!
//! ## Quick Start
//!
//! ```rust
//! use tacopt::prelude::*;
//!
//! let mut decls = parse_tac(r#"[
//!     {"proc": "@main", "args": [], "body": [
//!         {"opcode": "const", "args": [2], "result": "%x"},
//!         {"opcode": "const", "args": [3], "result": "%y"},
//!         {"opcode": "mul", "args": ["%x", "%y"], "result": "%0"},
//!         {"opcode": "param", "args": [1, "%0"], "result": null},
//!         {"opcode": "call", "args": ["@__bx_print_int", 1], "result": null},
//!         {"opcode": "ret", "args": [], "result": null}
//!     ]}
//! ]"#)?;
//!
//! let events = Pipeline::default().run(&mut decls)?;
//! assert!(events.has(EventKind::ConstantFolded));
//!
//! let outcome = execute(&decls, "@main", &[])?;
//! assert_eq!(outcome.output, vec!["6"]);
//! # Ok::<(), tacopt::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`tac`] - The TAC model, its JSON file format and a reference interpreter
//! - [`analysis`] - CFG construction, dominance, SSA construction and the SCCP analysis
//! - [`compiler`] - The optimization passes, the event log and the pipeline
//! - [`utils`] - Bit sets and generic graph algorithms
//! - [`prelude`] - Convenient re-exports of commonly used types
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`]. Input problems surface as
//! [`Error::Malformed`], [`Error::Parse`] or [`Error::Structural`]; an
//! [`Error::InvariantViolation`] from a pass is always an internal error.
//!
//! ## Logging
//!
//! The library logs through the [`log`] facade: `debug` per pass and procedure, `trace` per
//! rewrite, `warn` for suspicious input. Install any logger to see it.

#[macro_use]
pub(crate) mod error;

/// Program analyses over TAC control flow graphs.
///
/// See the module documentation for the available analyses.
pub mod analysis;

/// The optimization passes and the pipeline that runs them.
pub mod compiler;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use tacopt::prelude::*;
///
/// let pipeline = Pipeline::new(PipelineConfig { parallel: false, ..Default::default() });
/// assert_eq!(
///     pipeline.pass_names(),
///     vec!["ssa-minimization", "sccp", "cse", "copy-propagation"]
/// );
/// ```
pub mod prelude;

/// The three-address code intermediate form.
pub mod tac;

/// Shared utilities: bit sets and graph algorithms.
pub mod utils;

/// `tacopt` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `tacopt` Error type
///
/// # Examples
///
/// ```rust
/// use tacopt::{tac::parse_tac, Error};
///
/// match parse_tac("not json") {
///     Err(Error::Parse(e)) => println!("invalid JSON: {}", e),
///     Err(e) => println!("Error: {}", e),
///     Ok(_) => unreachable!(),
/// }
/// ```
pub use error::Error;
