//! Data flow analysis over procedure CFGs.
//!
//! # Analyses Provided
//!
//! - [`ConstantPropagation`]: sparse conditional constant propagation (SCCP), producing an
//!   [`SccpResult`] that the SCCP rewrite pass consumes
//!
//! The value domain is the three-level [`LatticeValue`] lattice; [`JoinSemiLattice`] and
//! [`Lattice`] describe the operations the fixpoint relies on.
//!
//! # Thread Safety
//!
//! All types in this module are `Send` and `Sync`.

mod lattice;
mod sccp;

pub use lattice::{JoinSemiLattice, Lattice, LatticeValue};
pub use sccp::{ConstantPropagation, SccpResult};
