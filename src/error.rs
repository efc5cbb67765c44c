use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! invariant_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::InvariantViolation {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::InvariantViolation {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Malformed`] - A TAC file whose JSON shape does not describe a valid declaration
/// - [`Error::Parse`] - The TAC file is not valid JSON
/// - [`Error::Structural`] - A procedure whose control flow refers to missing or duplicate labels
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// ## Optimizer Errors
/// - [`Error::InvariantViolation`] - An internal assertion of an optimization pass failed. These
///   indicate a pass ordering bug or an input that was not in SSA form, never a property of the
///   source program.
///
/// ## Execution Errors
/// - [`Error::Runtime`] - The reference interpreter hit a run-time fault
/// - [`Error::UnknownProcedure`] - A call or entry point names a procedure that does not exist
///
/// # Examples
///
/// ```rust,no_run
/// use tacopt::{tac::load_tac, Error};
/// use std::path::Path;
///
/// match load_tac(Path::new("program.tac.json")) {
///     Ok(decls) => println!("loaded {} declarations", decls.len()),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed TAC: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The TAC input is well-formed JSON but does not describe valid declarations.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The input could not be decoded as JSON.
    #[error("{0}")]
    Parse(#[from] serde_json::Error),

    /// The control flow of a procedure is structurally invalid.
    ///
    /// Raised while building a CFG, e.g. for a jump to an undefined label, a phi keyed by a
    /// label that does not exist, or two blocks sharing a label.
    #[error("Structural error in {proc}: {message}")]
    Structural {
        /// The procedure that failed validation
        proc: String,
        /// What was wrong with it
        message: String,
    },

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// An optimization pass observed a state that its preconditions rule out.
    ///
    /// This is a programmer error (wrong pass order, non-SSA input), not a recoverable
    /// condition. The source location of the failed check is included.
    #[error("Invariant violated - {file}:{line}: {message}")]
    InvariantViolation {
        /// The message to be printed for the violation
        message: String,
        /// The source file in which the check failed
        file: &'static str,
        /// The source line in which the check failed
        line: u32,
    },

    /// The reference interpreter faulted while executing a program.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// A call or the entry point names a procedure that was never declared.
    #[error("Unknown procedure {0}")]
    UnknownProcedure(String),
}
