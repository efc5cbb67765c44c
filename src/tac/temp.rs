//! Names and operands of three-address code.
//!
//! TAC names every value with a [`Temp`]. The spelling of a temporary encodes what kind of
//! value it is:
//!
//! | Spelling    | Kind                   | Example          |
//! |-------------|------------------------|------------------|
//! | `@name`     | [`TempKind::Global`]   | `@counter`       |
//! | `%name`     | [`TempKind::Named`]    | `%x`, `%_tmp`    |
//! | `%N`        | [`TempKind::Versioned`] | `%0`, `%12`     |
//! | `%name.N`   | [`TempKind::Versioned`] | `%x.3`, `%0.1`  |
//!
//! Named temporaries are surface-level variables and parameters: before SSA renaming they may
//! be assigned along several paths, so analyses treat them conservatively. Versioned
//! temporaries are introduced by lowering or by SSA construction and are assigned exactly once
//! in valid SSA form.

use std::fmt;

/// The kind of a temporary, derived from its spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TempKind {
    /// A global variable (`@name`).
    Global,
    /// A surface-level variable or parameter (`%name`).
    Named,
    /// A compiler-introduced or SSA-renamed temporary (`%3`, `%x.2`).
    Versioned,
}

/// An identifier naming a value.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Temp(String);

impl Temp {
    /// Creates a temporary from its textual spelling.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the textual spelling, including the `%` or `@` sigil.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classifies the temporary by its spelling.
    #[must_use]
    pub fn kind(&self) -> TempKind {
        if self.0.starts_with('@') {
            return TempKind::Global;
        }

        let body = self.0.strip_prefix('%').unwrap_or(&self.0);
        match body.chars().next() {
            Some(c) if c.is_ascii_digit() => TempKind::Versioned,
            _ if body.rsplit_once('.').is_some_and(|(_, v)| {
                !v.is_empty() && v.chars().all(|c| c.is_ascii_digit())
            }) =>
            {
                TempKind::Versioned
            }
            _ => TempKind::Named,
        }
    }

    /// Returns `true` for global variables.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.kind() == TempKind::Global
    }

    /// Returns `true` for compiler-introduced or SSA-renamed temporaries.
    #[must_use]
    pub fn is_versioned(&self) -> bool {
        self.kind() == TempKind::Versioned
    }

    /// Returns the name with any SSA version suffix removed.
    ///
    /// `%x.3` becomes `%x`, `%4.1` becomes `%4`; other names are returned unchanged.
    #[must_use]
    pub fn base(&self) -> &str {
        match self.0.rsplit_once('.') {
            Some((base, version))
                if base.len() > 1 && version.chars().all(|c| c.is_ascii_digit()) =>
            {
                base
            }
            _ => &self.0,
        }
    }

    /// Returns the SSA rename `base.version` of this temporary.
    #[must_use]
    pub fn versioned(&self, version: usize) -> Self {
        Self(format!("{}.{version}", self.base()))
    }
}

impl fmt::Debug for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Temp {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// The name of a basic block (`%.L0` by convention).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(String);

impl Label {
    /// Creates a label from its textual spelling.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the textual spelling.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Label {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A value read by an instruction: a temporary or an integer immediate.
///
/// Immediates are produced by constant propagation, which substitutes known constants for
/// the uses of their temporaries.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operand {
    /// The current value of a temporary.
    Temp(Temp),
    /// A 64-bit integer literal.
    Imm(i64),
}

impl Operand {
    /// Returns the temporary if this operand reads one.
    #[must_use]
    pub const fn as_temp(&self) -> Option<&Temp> {
        match self {
            Self::Temp(t) => Some(t),
            Self::Imm(_) => None,
        }
    }

    /// Returns the literal if this operand is an immediate.
    #[must_use]
    pub const fn as_imm(&self) -> Option<i64> {
        match self {
            Self::Imm(v) => Some(*v),
            Self::Temp(_) => None,
        }
    }

    /// Returns `true` if this operand reads `temp`.
    #[must_use]
    pub fn reads(&self, temp: &Temp) -> bool {
        self.as_temp() == Some(temp)
    }
}

impl fmt::Debug for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temp(t) => write!(f, "{t}"),
            Self::Imm(v) => write!(f, "{v}"),
        }
    }
}

impl From<Temp> for Operand {
    fn from(temp: Temp) -> Self {
        Self::Temp(temp)
    }
}

impl From<&str> for Operand {
    fn from(name: &str) -> Self {
        Self::Temp(Temp::new(name))
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Self::Imm(value)
    }
}
