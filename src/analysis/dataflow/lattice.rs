//! The constant-propagation lattice.
//!
//! SCCP approximates the run-time value of every temporary with an element of a three-level
//! lattice:
//!
//! ```text
//!              NonConstant          (top: proven to vary)
//!        /     /     |     \     \
//!   ... C(-1)  C(0)  C(1)  C(2) ...  (a single known integer)
//!        \     \     |     /     /
//!                Unused             (bottom: not yet proven defined)
//! ```
//!
//! Analysis values only ever move up: every update is the [`join`](JoinSemiLattice::join) of
//! the old value and the newly computed one, which keeps the fixpoint loop monotone and
//! guarantees termination (each temporary can change at most twice).

use std::fmt::{self, Debug};

/// A join semi-lattice with a join (least upper bound) operation.
///
/// The join must be:
///
/// - **Idempotent**: `x.join(x) = x`
/// - **Commutative**: `x.join(y) = y.join(x)`
/// - **Associative**: `x.join(y.join(z)) = (x.join(y)).join(z)`
pub trait JoinSemiLattice: Clone + Debug + PartialEq {
    /// Computes the least upper bound of two lattice elements.
    #[must_use]
    fn join(&self, other: &Self) -> Self;

    /// Returns `true` if this is the top element.
    ///
    /// Top absorbs every join: once reached, further joins cannot change the value.
    fn is_top(&self) -> bool;
}

/// A bounded join semi-lattice.
pub trait Lattice: JoinSemiLattice {
    /// Returns the top (⊤) element of the lattice.
    fn top() -> Self;

    /// Returns the bottom (⊥) element of the lattice, the identity of join.
    fn bottom() -> Self;
}

/// Abstract value of a temporary during SCCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LatticeValue {
    /// Not yet proven to be defined on any executable path (bottom).
    #[default]
    Unused,
    /// Holds exactly this integer on every executable path.
    Constant(i64),
    /// May hold more than one value (top).
    NonConstant,
}

impl LatticeValue {
    /// Returns `true` for [`LatticeValue::Unused`].
    #[must_use]
    pub const fn is_unused(&self) -> bool {
        matches!(self, Self::Unused)
    }

    /// Returns `true` for [`LatticeValue::Constant`].
    #[must_use]
    pub const fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }

    /// Returns `true` for [`LatticeValue::NonConstant`].
    #[must_use]
    pub const fn is_non_constant(&self) -> bool {
        matches!(self, Self::NonConstant)
    }

    /// Returns the known integer, if any.
    #[must_use]
    pub const fn as_constant(&self) -> Option<i64> {
        match self {
            Self::Constant(c) => Some(*c),
            _ => None,
        }
    }
}

impl JoinSemiLattice for LatticeValue {
    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Unused, x) | (x, Self::Unused) => *x,
            (Self::Constant(a), Self::Constant(b)) if a == b => Self::Constant(*a),
            _ => Self::NonConstant,
        }
    }

    fn is_top(&self) -> bool {
        self.is_non_constant()
    }
}

impl Lattice for LatticeValue {
    fn top() -> Self {
        Self::NonConstant
    }

    fn bottom() -> Self {
        Self::Unused
    }
}

impl PartialOrd for LatticeValue {
    /// The lattice order; two different constants are incomparable.
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        use std::cmp::Ordering;

        match (self, other) {
            (a, b) if a == b => Some(Ordering::Equal),
            (Self::Unused, _) | (_, Self::NonConstant) => Some(Ordering::Less),
            (_, Self::Unused) | (Self::NonConstant, _) => Some(Ordering::Greater),
            (Self::Constant(_), Self::Constant(_)) => None,
        }
    }
}

impl fmt::Display for LatticeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unused => write!(f, "⊥"),
            Self::Constant(c) => write!(f, "{c}"),
            Self::NonConstant => write!(f, "⊤"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join() {
        let c5 = LatticeValue::Constant(5);
        let c7 = LatticeValue::Constant(7);

        assert_eq!(LatticeValue::Unused.join(&c5), c5);
        assert_eq!(c5.join(&LatticeValue::Unused), c5);
        assert_eq!(c5.join(&c5), c5);
        assert_eq!(c5.join(&c7), LatticeValue::NonConstant);
        assert_eq!(
            LatticeValue::NonConstant.join(&c5),
            LatticeValue::NonConstant
        );
        assert_eq!(
            LatticeValue::Unused.join(&LatticeValue::Unused),
            LatticeValue::bottom()
        );
    }

    #[test]
    fn test_join_is_monotone() {
        let values = [
            LatticeValue::Unused,
            LatticeValue::Constant(0),
            LatticeValue::Constant(-3),
            LatticeValue::NonConstant,
        ];
        for a in &values {
            for b in &values {
                let j = a.join(b);
                assert!(*a <= j, "{a} <= {a} join {b}");
                assert!(*b <= j, "{b} <= {a} join {b}");
                assert_eq!(j, b.join(a));
            }
        }
    }

    #[test]
    fn test_order() {
        assert!(LatticeValue::Unused < LatticeValue::Constant(1));
        assert!(LatticeValue::Constant(1) < LatticeValue::NonConstant);
        assert!(LatticeValue::Unused < LatticeValue::NonConstant);
        assert_eq!(
            LatticeValue::Constant(1).partial_cmp(&LatticeValue::Constant(2)),
            None
        );
    }

    #[test]
    fn test_accessors() {
        assert!(LatticeValue::default().is_unused());
        assert!(LatticeValue::top().is_top());
        assert_eq!(LatticeValue::Constant(9).as_constant(), Some(9));
        assert_eq!(LatticeValue::NonConstant.as_constant(), None);
        assert_eq!(LatticeValue::Constant(-2).to_string(), "-2");
    }
}
