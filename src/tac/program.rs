//! Top-level TAC declarations: global variables and procedures.

use std::fmt;

use crate::tac::{Instr, Temp};

/// A global variable declaration, `var @g = init;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gvar {
    /// The variable's name, including the `@` sigil.
    pub name: String,
    /// The value the variable holds when the program starts.
    pub init: i64,
}

impl Gvar {
    /// Creates a global variable declaration.
    #[must_use]
    pub fn new(name: impl Into<String>, init: i64) -> Self {
        Self {
            name: name.into(),
            init,
        }
    }
}

impl fmt::Display for Gvar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "var {} = {};", self.name, self.init)
    }
}

/// A procedure: a name, its parameters and a linear instruction stream.
///
/// The body uses `label` pseudo-instructions to mark block boundaries. Passes never work on
/// the body directly; they work on the CFG built from it by
/// [`infer`](crate::analysis::cfg::infer), which is written back with
/// [`linearize`](crate::analysis::cfg::linearize).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proc {
    /// The procedure's name, including the `@` sigil.
    pub name: String,
    /// Parameter temporaries, bound to the call's arguments on entry.
    pub params: Vec<Temp>,
    /// The linear instruction stream.
    pub body: Vec<Instr>,
}

impl Proc {
    /// Creates a procedure.
    #[must_use]
    pub fn new(name: impl Into<String>, params: Vec<Temp>, body: Vec<Instr>) -> Self {
        Self {
            name: name.into(),
            params,
            body,
        }
    }
}

impl fmt::Display for Proc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proc {}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        writeln!(f, "):")?;

        for instr in &self.body {
            if instr.opcode() == crate::tac::Opcode::Label {
                writeln!(f, "{instr}")?;
            } else {
                writeln!(f, "  {instr}")?;
            }
        }
        Ok(())
    }
}

/// A top-level declaration of a TAC program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    /// A global variable.
    Var(Gvar),
    /// A procedure.
    Proc(Proc),
}

impl Decl {
    /// Returns the declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Decl::Var(gvar) => &gvar.name,
            Decl::Proc(proc) => &proc.name,
        }
    }

    /// Returns the procedure if this declares one.
    #[must_use]
    pub const fn as_proc(&self) -> Option<&Proc> {
        match self {
            Decl::Proc(proc) => Some(proc),
            Decl::Var(_) => None,
        }
    }
}

impl fmt::Display for Decl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decl::Var(gvar) => writeln!(f, "{gvar}"),
            Decl::Proc(proc) => write!(f, "{proc}"),
        }
    }
}
