//! The interface every optimization pass implements.

use crate::{analysis::cfg::Cfg, compiler::EventLog, Result};

/// An optimization pass over one procedure's CFG in SSA form.
///
/// All passes must be thread-safe (`Send + Sync`) so the pipeline can run them on several
/// procedures in parallel. A pass receives exclusive access to the CFG it rewrites and
/// shared access to the event log.
///
/// # Pipeline Integration
///
/// Passes don't declare their own ordering. The [`Pipeline`](crate::compiler::Pipeline)
/// runs them in the fixed order minimization, SCCP, CSE, because each one relies on the
/// single-assignment form that the earlier steps establish.
pub trait OptPass: Send + Sync {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Run the pass on a single procedure.
    ///
    /// Returns `true` if any changes were made, `false` otherwise. Events should be
    /// recorded directly to `events`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if the CFG breaks an assumption of the
    /// pass. Passes are total on well-formed SSA input, so any error is an internal one.
    fn run(&self, cfg: &mut Cfg, events: &EventLog) -> Result<bool>;

    /// Get a description of what this pass does.
    fn description(&self) -> &'static str {
        "No description available"
    }
}
