//! Basic blocks.

use std::fmt;

use crate::tac::{Instr, Label, Op, Operand, Temp};

/// A basic block: a label, a straight-line body and an ordered list of terminators.
///
/// The body holds phis first (by convention) followed by ordinary instructions. The
/// terminator list holds zero or more conditional jumps followed by a final `jmp` or `ret`;
/// control leaves through the first conditional whose test holds, otherwise through the
/// final terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// The block's label.
    pub label: Label,
    /// Non-terminator instructions.
    pub body: Vec<Instr>,
    /// Terminators, evaluated in order.
    pub jumps: Vec<Instr>,
}

impl Block {
    /// Creates a block.
    #[must_use]
    pub fn new(label: impl Into<Label>, body: Vec<Instr>, jumps: Vec<Instr>) -> Self {
        Self {
            label: label.into(),
            body,
            jumps,
        }
    }

    /// Iterates over the body followed by the terminators.
    pub fn instrs(&self) -> impl Iterator<Item = &Instr> {
        self.body.iter().chain(self.jumps.iter())
    }

    /// Mutable iteration over the body followed by the terminators.
    pub fn instrs_mut(&mut self) -> impl Iterator<Item = &mut Instr> {
        self.body.iter_mut().chain(self.jumps.iter_mut())
    }

    /// Iterates over the phi instructions of the body.
    pub fn phis(&self) -> impl Iterator<Item = &Instr> {
        self.body.iter().filter(|i| i.is_phi())
    }

    /// Returns the distinct jump targets, in terminator order.
    #[must_use]
    pub fn successors(&self) -> Vec<&Label> {
        let mut targets: Vec<&Label> = Vec::with_capacity(self.jumps.len());
        for target in self.jumps.iter().filter_map(Instr::target) {
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        targets
    }

    /// Returns `true` if the final terminator is a `jmp` or `ret`.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.jumps
            .last()
            .is_some_and(|j| matches!(j.op, Op::Jump { .. } | Op::Ret { .. }))
    }

    /// Returns `true` if any instruction of the block writes `temp`.
    #[must_use]
    pub fn defines(&self, temp: &Temp) -> bool {
        self.body.iter().any(|i| i.defines(temp))
    }

    /// Rewrites every read of `temp` in the block, terminators and phi sources included.
    ///
    /// Returns the number of operands rewritten.
    pub fn replace_uses(&mut self, temp: &Temp, replacement: &Operand) -> usize {
        self.instrs_mut()
            .map(|instr| instr.replace_uses(temp, replacement))
            .sum()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.label)?;
        for instr in self.instrs() {
            writeln!(f, "  {instr}")?;
        }
        Ok(())
    }
}
