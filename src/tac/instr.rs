//! TAC instructions.
//!
//! An [`Instr`] is an optional destination temporary plus an operation ([`Op`]). Operations
//! fall into a handful of categories:
//!
//! - **Arithmetic/bitwise**: [`BinaryOp`] and [`UnaryOp`] over [`Operand`]s
//! - **Data movement**: `const`, `copy`, `param`, `call`
//! - **Phi**: selects a source by the predecessor block control arrived from
//! - **Terminators**: `jmp`, the conditional jumps of [`Condition`], `ret`
//! - **Pseudo**: `label` (linear form only) and `nop`
//!
//! # Textual form
//!
//! ```text
//! %.L0:
//!   %2 = add %0, %1;
//!   %3 = phi(%.L1: %2, %.L2: %x);
//!   jl %3, %.L4;
//!   jmp %.L5;
//! ```

use std::{collections::BTreeMap, fmt};

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::tac::{Label, Operand, Temp};

/// Every opcode of the instruction set, spelled as in TAC files.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, Display, IntoStaticStr, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum Opcode {
    /// Wrapping addition.
    Add,
    /// Wrapping subtraction.
    Sub,
    /// Wrapping multiplication.
    Mul,
    /// Division truncating toward zero.
    Div,
    /// Remainder with the sign of the dividend.
    Mod,
    /// Bitwise and.
    And,
    /// Bitwise or.
    Or,
    /// Bitwise exclusive or.
    Xor,
    /// Left shift.
    Shl,
    /// Arithmetic right shift.
    Shr,
    /// Two's complement negation.
    Neg,
    /// Bitwise complement.
    Not,
    /// Load a literal.
    Const,
    /// Copy an operand.
    Copy,
    /// Stage an argument for the next call.
    Param,
    /// Call a procedure.
    Call,
    /// Select a value by predecessor block.
    Phi,
    /// Do nothing.
    Nop,
    /// Start of a block, linear form only.
    Label,
    /// Unconditional jump.
    Jmp,
    /// Jump if zero.
    Jz,
    /// Jump if not zero.
    Jnz,
    /// Jump if negative.
    Jl,
    /// Jump if negative or zero.
    Jle,
    /// Jump if not negative.
    Jnl,
    /// Jump if positive.
    Jnle,
    /// Return, with an optional value.
    Ret,
}

/// Binary arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum BinaryOp {
    /// Wrapping addition.
    Add,
    /// Wrapping subtraction.
    Sub,
    /// Wrapping multiplication.
    Mul,
    /// Division truncating toward zero.
    Div,
    /// Remainder with the sign of the dividend.
    Mod,
    /// Bitwise and.
    And,
    /// Bitwise or.
    Or,
    /// Bitwise exclusive or.
    Xor,
    /// Left shift.
    Shl,
    /// Arithmetic right shift.
    Shr,
}

impl BinaryOp {
    /// Evaluates the operator on 64-bit integers.
    ///
    /// Arithmetic wraps on overflow. Division truncates toward zero and the modulus is
    /// `u - v * trunc(u / v)`. Returns `None` where the result is a run-time fault or
    /// implementation-defined: a zero divisor, or a shift amount outside `0..64`.
    #[must_use]
    pub fn eval(self, u: i64, v: i64) -> Option<i64> {
        match self {
            Self::Add => Some(u.wrapping_add(v)),
            Self::Sub => Some(u.wrapping_sub(v)),
            Self::Mul => Some(u.wrapping_mul(v)),
            Self::Div => (v != 0).then(|| u.wrapping_div(v)),
            Self::Mod => (v != 0).then(|| u.wrapping_rem(v)),
            Self::And => Some(u & v),
            Self::Or => Some(u | v),
            Self::Xor => Some(u ^ v),
            Self::Shl => u32::try_from(v)
                .ok()
                .filter(|s| *s < 64)
                .map(|s| u.wrapping_shl(s)),
            Self::Shr => u32::try_from(v)
                .ok()
                .filter(|s| *s < 64)
                .map(|s| u.wrapping_shr(s)),
        }
    }

    /// Returns the corresponding [`Opcode`].
    #[must_use]
    pub const fn opcode(self) -> Opcode {
        match self {
            Self::Add => Opcode::Add,
            Self::Sub => Opcode::Sub,
            Self::Mul => Opcode::Mul,
            Self::Div => Opcode::Div,
            Self::Mod => Opcode::Mod,
            Self::And => Opcode::And,
            Self::Or => Opcode::Or,
            Self::Xor => Opcode::Xor,
            Self::Shl => Opcode::Shl,
            Self::Shr => Opcode::Shr,
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum UnaryOp {
    /// Two's complement negation.
    Neg,
    /// Bitwise complement.
    Not,
}

impl UnaryOp {
    /// Evaluates the operator; negation wraps.
    #[must_use]
    pub const fn eval(self, u: i64) -> i64 {
        match self {
            Self::Neg => u.wrapping_neg(),
            Self::Not => !u,
        }
    }

    /// Returns the corresponding [`Opcode`].
    #[must_use]
    pub const fn opcode(self) -> Opcode {
        match self {
            Self::Neg => Opcode::Neg,
            Self::Not => Opcode::Not,
        }
    }
}

/// The test performed by a conditional jump on its value operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Condition {
    /// Jump if zero.
    Jz,
    /// Jump if not zero.
    Jnz,
    /// Jump if negative.
    Jl,
    /// Jump if negative or zero.
    Jle,
    /// Jump if not negative.
    Jnl,
    /// Jump if positive.
    Jnle,
}

impl Condition {
    /// Returns `true` if the jump is taken for `value`.
    #[must_use]
    pub const fn holds(self, value: i64) -> bool {
        match self {
            Self::Jz => value == 0,
            Self::Jnz => value != 0,
            Self::Jl => value < 0,
            Self::Jle => value <= 0,
            Self::Jnl => value >= 0,
            Self::Jnle => value > 0,
        }
    }

    /// Returns the corresponding [`Opcode`].
    #[must_use]
    pub const fn opcode(self) -> Opcode {
        match self {
            Self::Jz => Opcode::Jz,
            Self::Jnz => Opcode::Jnz,
            Self::Jl => Opcode::Jl,
            Self::Jle => Opcode::Jle,
            Self::Jnl => Opcode::Jnl,
            Self::Jnle => Opcode::Jnle,
        }
    }
}

/// The operation performed by an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Does nothing.
    Nop,
    /// `dest = const value`
    Const {
        /// The literal.
        value: i64,
    },
    /// `dest = copy src`
    Copy {
        /// The copied value.
        src: Operand,
    },
    /// `dest = op left, right`
    Binary {
        /// The operator.
        op: BinaryOp,
        /// First operand.
        left: Operand,
        /// Second operand.
        right: Operand,
    },
    /// `dest = op operand`
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Operand,
    },
    /// `param index, value` - passes the `index`th (1-based) argument of the next call.
    Param {
        /// Argument position.
        index: u32,
        /// Argument value.
        value: Operand,
    },
    /// `dest = call target, argc`
    Call {
        /// The called procedure (`@name`).
        target: String,
        /// Number of preceding `param` instructions consumed.
        argc: u32,
    },
    /// `dest = phi(pred: source, ...)`, one source per CFG predecessor.
    Phi {
        /// Predecessor label to source operand.
        sources: BTreeMap<Label, Operand>,
    },
    /// Marks the start of a block in the linear instruction stream.
    Label {
        /// The block's label.
        label: Label,
    },
    /// Unconditional jump.
    Jump {
        /// Jump target.
        target: Label,
    },
    /// Conditional jump on `value`.
    Branch {
        /// The test applied to `value`.
        cond: Condition,
        /// The tested value.
        value: Operand,
        /// Target when the test holds.
        target: Label,
    },
    /// Return, optionally with a value.
    Ret {
        /// Returned value.
        value: Option<Operand>,
    },
}

/// A single three-address instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instr {
    /// The temporary written by this instruction, if any.
    pub dest: Option<Temp>,
    /// What the instruction does.
    pub op: Op,
}

impl Instr {
    /// Creates an instruction from its parts.
    #[must_use]
    pub const fn new(dest: Option<Temp>, op: Op) -> Self {
        Self { dest, op }
    }

    /// `dest = const value`
    #[must_use]
    pub fn constant(dest: impl Into<Temp>, value: i64) -> Self {
        Self::new(Some(dest.into()), Op::Const { value })
    }

    /// `dest = copy src`
    #[must_use]
    pub fn copy(dest: impl Into<Temp>, src: impl Into<Operand>) -> Self {
        Self::new(Some(dest.into()), Op::Copy { src: src.into() })
    }

    /// `dest = op left, right`
    #[must_use]
    pub fn binary(
        dest: impl Into<Temp>,
        op: BinaryOp,
        left: impl Into<Operand>,
        right: impl Into<Operand>,
    ) -> Self {
        Self::new(
            Some(dest.into()),
            Op::Binary {
                op,
                left: left.into(),
                right: right.into(),
            },
        )
    }

    /// `dest = op operand`
    #[must_use]
    pub fn unary(dest: impl Into<Temp>, op: UnaryOp, operand: impl Into<Operand>) -> Self {
        Self::new(
            Some(dest.into()),
            Op::Unary {
                op,
                operand: operand.into(),
            },
        )
    }

    /// `param index, value`
    #[must_use]
    pub fn param(index: u32, value: impl Into<Operand>) -> Self {
        Self::new(
            None,
            Op::Param {
                index,
                value: value.into(),
            },
        )
    }

    /// `[dest =] call target, argc`
    #[must_use]
    pub fn call(dest: Option<Temp>, target: impl Into<String>, argc: u32) -> Self {
        Self::new(
            dest,
            Op::Call {
                target: target.into(),
                argc,
            },
        )
    }

    /// `dest = phi(...)`
    #[must_use]
    pub fn phi<L, O>(dest: impl Into<Temp>, sources: impl IntoIterator<Item = (L, O)>) -> Self
    where
        L: Into<Label>,
        O: Into<Operand>,
    {
        Self::new(
            Some(dest.into()),
            Op::Phi {
                sources: sources
                    .into_iter()
                    .map(|(l, o)| (l.into(), o.into()))
                    .collect(),
            },
        )
    }

    /// `label:`
    #[must_use]
    pub fn label(label: impl Into<Label>) -> Self {
        Self::new(
            None,
            Op::Label {
                label: label.into(),
            },
        )
    }

    /// `jmp target`
    #[must_use]
    pub fn jump(target: impl Into<Label>) -> Self {
        Self::new(
            None,
            Op::Jump {
                target: target.into(),
            },
        )
    }

    /// `cond value, target`
    #[must_use]
    pub fn branch(cond: Condition, value: impl Into<Operand>, target: impl Into<Label>) -> Self {
        Self::new(
            None,
            Op::Branch {
                cond,
                value: value.into(),
                target: target.into(),
            },
        )
    }

    /// `ret [value]`
    #[must_use]
    pub fn ret(value: Option<Operand>) -> Self {
        Self::new(None, Op::Ret { value })
    }

    /// `nop`
    #[must_use]
    pub const fn nop() -> Self {
        Self::new(None, Op::Nop)
    }

    /// Returns the opcode of this instruction.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match &self.op {
            Op::Nop => Opcode::Nop,
            Op::Const { .. } => Opcode::Const,
            Op::Copy { .. } => Opcode::Copy,
            Op::Binary { op, .. } => op.opcode(),
            Op::Unary { op, .. } => op.opcode(),
            Op::Param { .. } => Opcode::Param,
            Op::Call { .. } => Opcode::Call,
            Op::Phi { .. } => Opcode::Phi,
            Op::Label { .. } => Opcode::Label,
            Op::Jump { .. } => Opcode::Jmp,
            Op::Branch { cond, .. } => cond.opcode(),
            Op::Ret { .. } => Opcode::Ret,
        }
    }

    /// Returns the destination temporary, if any.
    #[must_use]
    pub const fn dest(&self) -> Option<&Temp> {
        self.dest.as_ref()
    }

    /// Returns `true` if this instruction writes `temp`.
    #[must_use]
    pub fn defines(&self, temp: &Temp) -> bool {
        self.dest.as_ref() == Some(temp)
    }

    /// Returns every operand read by this instruction, phi sources included.
    #[must_use]
    pub fn uses(&self) -> Vec<&Operand> {
        match &self.op {
            Op::Copy { src } => vec![src],
            Op::Binary { left, right, .. } => vec![left, right],
            Op::Unary { operand, .. } => vec![operand],
            Op::Param { value, .. } | Op::Branch { value, .. } => vec![value],
            Op::Phi { sources } => sources.values().collect(),
            Op::Ret { value } => value.iter().collect(),
            Op::Nop | Op::Const { .. } | Op::Call { .. } | Op::Label { .. } | Op::Jump { .. } => {
                Vec::new()
            }
        }
    }

    /// Mutable access to every operand read by this instruction.
    pub fn uses_mut(&mut self) -> Vec<&mut Operand> {
        match &mut self.op {
            Op::Copy { src } => vec![src],
            Op::Binary { left, right, .. } => vec![left, right],
            Op::Unary { operand, .. } => vec![operand],
            Op::Param { value, .. } | Op::Branch { value, .. } => vec![value],
            Op::Phi { sources } => sources.values_mut().collect(),
            Op::Ret { value } => value.iter_mut().collect(),
            Op::Nop | Op::Const { .. } | Op::Call { .. } | Op::Label { .. } | Op::Jump { .. } => {
                Vec::new()
            }
        }
    }

    /// Iterates over the temporaries read by this instruction.
    pub fn used_temps(&self) -> impl Iterator<Item = &Temp> {
        self.uses().into_iter().filter_map(Operand::as_temp)
    }

    /// Returns `true` if any operand reads `temp`.
    #[must_use]
    pub fn reads(&self, temp: &Temp) -> bool {
        self.uses().into_iter().any(|o| o.reads(temp))
    }

    /// Rewrites every read of `temp` to `replacement`.
    ///
    /// Returns the number of operands rewritten.
    pub fn replace_uses(&mut self, temp: &Temp, replacement: &Operand) -> usize {
        let mut replaced = 0;
        for operand in self.uses_mut() {
            if operand.reads(temp) {
                *operand = replacement.clone();
                replaced += 1;
            }
        }
        replaced
    }

    /// Returns `true` for `jmp`, conditional jumps and `ret`.
    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        matches!(self.op, Op::Jump { .. } | Op::Branch { .. } | Op::Ret { .. })
    }

    /// Returns `true` for phi instructions.
    #[must_use]
    pub const fn is_phi(&self) -> bool {
        matches!(self.op, Op::Phi { .. })
    }

    /// Returns the jump target of `jmp` and conditional jumps.
    #[must_use]
    pub const fn target(&self) -> Option<&Label> {
        match &self.op {
            Op::Jump { target } | Op::Branch { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Returns the phi sources of a phi instruction.
    #[must_use]
    pub const fn phi_sources(&self) -> Option<&BTreeMap<Label, Operand>> {
        match &self.op {
            Op::Phi { sources } => Some(sources),
            _ => None,
        }
    }

    /// Mutable access to the phi sources of a phi instruction.
    pub fn phi_sources_mut(&mut self) -> Option<&mut BTreeMap<Label, Operand>> {
        match &mut self.op {
            Op::Phi { sources } => Some(sources),
            _ => None,
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dest) = &self.dest {
            write!(f, "{dest} = ")?;
        }

        let opcode = self.opcode();
        match &self.op {
            Op::Nop => write!(f, "{opcode}")?,
            Op::Const { value } => write!(f, "{opcode} {value}")?,
            Op::Copy { src } => write!(f, "{opcode} {src}")?,
            Op::Binary { left, right, .. } => write!(f, "{opcode} {left}, {right}")?,
            Op::Unary { operand, .. } => write!(f, "{opcode} {operand}")?,
            Op::Param { index, value } => write!(f, "{opcode} {index}, {value}")?,
            Op::Call { target, argc } => write!(f, "{opcode} {target}, {argc}")?,
            Op::Phi { sources } => {
                write!(f, "{opcode}(")?;
                for (i, (label, src)) in sources.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{label}: {src}")?;
                }
                write!(f, ")")?;
            }
            Op::Jump { target } => write!(f, "{opcode} {target}")?,
            Op::Branch { value, target, .. } => write!(f, "{opcode} {value}, {target}")?,
            Op::Ret { value: Some(v) } => write!(f, "{opcode} {v}")?,
            Op::Ret { value: None } => write!(f, "{opcode}")?,
            Op::Label { label } => return write!(f, "{label}:"),
        }
        write!(f, ";")
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_opcode_names() {
        assert_eq!(Opcode::from_str("jnle").unwrap(), Opcode::Jnle);
        assert_eq!(Opcode::Mod.to_string(), "mod");
        assert!(Opcode::from_str("mov").is_err());
        assert_eq!(BinaryOp::from_str("shl").unwrap(), BinaryOp::Shl);
        assert_eq!(Condition::from_str("jle").unwrap(), Condition::Jle);
    }

    #[test]
    fn test_binary_eval() {
        assert_eq!(BinaryOp::Add.eval(2, 3), Some(5));
        assert_eq!(BinaryOp::Div.eval(-7, 2), Some(-3));
        assert_eq!(BinaryOp::Mod.eval(-7, 2), Some(-1));
        assert_eq!(BinaryOp::Mod.eval(7, -2), Some(1));
        assert_eq!(BinaryOp::Div.eval(1, 0), None);
        assert_eq!(BinaryOp::Mod.eval(1, 0), None);
        assert_eq!(BinaryOp::Div.eval(i64::MIN, -1), Some(i64::MIN));
        assert_eq!(BinaryOp::Shl.eval(1, 4), Some(16));
        assert_eq!(BinaryOp::Shr.eval(-16, 2), Some(-4));
        assert_eq!(BinaryOp::Shl.eval(1, 64), None);
        assert_eq!(BinaryOp::Shr.eval(1, -1), None);
        assert_eq!(BinaryOp::Add.eval(i64::MAX, 1), Some(i64::MIN));
    }

    #[test]
    fn test_condition_holds() {
        assert!(Condition::Jz.holds(0));
        assert!(!Condition::Jnz.holds(0));
        assert!(Condition::Jl.holds(-1));
        assert!(Condition::Jle.holds(0));
        assert!(Condition::Jnl.holds(0));
        assert!(!Condition::Jnle.holds(0));
        assert!(Condition::Jnle.holds(3));
    }

    #[test]
    fn test_uses_and_replace() {
        let mut instr = Instr::binary("%2", BinaryOp::Add, "%0", "%0");
        assert_eq!(instr.uses().len(), 2);
        assert!(instr.reads(&Temp::new("%0")));

        let replaced = instr.replace_uses(&Temp::new("%0"), &Operand::Imm(4));
        assert_eq!(replaced, 2);
        assert!(!instr.reads(&Temp::new("%0")));
        assert_eq!(instr.to_string(), "%2 = add 4, 4;");
    }

    #[test]
    fn test_phi_uses() {
        let mut phi = Instr::phi("%x.3", [("%.L1", "%x.1"), ("%.L2", "%x.2")]);
        assert!(phi.is_phi());
        assert_eq!(phi.used_temps().count(), 2);
        phi.replace_uses(&Temp::new("%x.2"), &Operand::Imm(0));
        assert_eq!(phi.to_string(), "%x.3 = phi(%.L1: %x.1, %.L2: 0);");
    }

    #[test]
    fn test_display() {
        assert_eq!(Instr::constant("%0", 42).to_string(), "%0 = const 42;");
        assert_eq!(Instr::label("%.L0").to_string(), "%.L0:");
        assert_eq!(
            Instr::branch(Condition::Jz, "%0", "%.L1").to_string(),
            "jz %0, %.L1;"
        );
        assert_eq!(Instr::ret(None).to_string(), "ret;");
        assert_eq!(
            Instr::call(Some(Temp::new("%5")), "@f", 2).to_string(),
            "%5 = call @f, 2;"
        );
        assert_eq!(Instr::param(1, 7).to_string(), "param 1, 7;");
    }

    #[test]
    fn test_terminators() {
        assert!(Instr::jump("%.L0").is_terminator());
        assert!(Instr::ret(Some(Operand::Imm(1))).is_terminator());
        assert!(!Instr::nop().is_terminator());
        assert_eq!(
            Instr::branch(Condition::Jl, 1, "%.L1").target(),
            Some(&Label::new("%.L1"))
        );
    }
}
