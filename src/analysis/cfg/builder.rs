//! Builder pattern for programmatic CFG construction.
//!
//! The builder uses a closure-based API where all blocks are defined within a single
//! expression, making the CFG structure visually clear:
//!
//! ```rust
//! use tacopt::analysis::cfg::CfgBuilder;
//! use tacopt::tac::{BinaryOp, Condition, Operand};
//!
//! let cfg = CfgBuilder::new("@f").params(["%x"]).build_with(|f| {
//!     f.block("%.L0", |b| {
//!         b.branch(Condition::Jz, "%x", "%.L2");
//!         b.jump("%.L1");
//!     });
//!     f.block("%.L1", |b| {
//!         b.binary("%0", BinaryOp::Add, "%x", 1);
//!         b.ret(Some(Operand::from("%0")));
//!     });
//!     f.block("%.L2", |b| {
//!         b.ret(Some(Operand::Imm(0)));
//!     });
//! })?;
//!
//! assert_eq!(cfg.len(), 3);
//! # Ok::<(), tacopt::Error>(())
//! ```
//!
//! The first block defined is the entry. Instructions are routed to the body or the
//! terminator list of their block by kind.

use crate::{
    analysis::cfg::{Block, Cfg},
    tac::{BinaryOp, Condition, Instr, Label, Operand, Proc, Temp, UnaryOp},
    Result,
};

/// Builder for constructing CFGs programmatically.
#[derive(Debug)]
pub struct CfgBuilder {
    proc_name: String,
    params: Vec<Temp>,
    blocks: Vec<Block>,
}

impl CfgBuilder {
    /// Creates a builder for the procedure `proc_name`.
    #[must_use]
    pub fn new(proc_name: impl Into<String>) -> Self {
        Self {
            proc_name: proc_name.into(),
            params: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Declares the procedure's parameters, used by [`CfgBuilder::build_proc_with`].
    #[must_use]
    pub fn params<I, T>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Temp>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Builds the CFG using a closure that defines all blocks.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Structural`] if the blocks do not form a valid CFG.
    pub fn build_with<F>(mut self, f: F) -> Result<Cfg>
    where
        F: FnOnce(&mut CfgContext<'_>),
    {
        let mut ctx = CfgContext {
            blocks: &mut self.blocks,
        };
        f(&mut ctx);
        Cfg::new(self.proc_name, self.blocks)
    }

    /// Builds the CFG together with an empty-bodied [`Proc`] carrying the name and
    /// parameters, ready for [`linearize`](crate::analysis::cfg::linearize).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Structural`] if the blocks do not form a valid CFG.
    pub fn build_proc_with<F>(self, f: F) -> Result<(Proc, Cfg)>
    where
        F: FnOnce(&mut CfgContext<'_>),
    {
        let proc = Proc::new(self.proc_name.clone(), self.params.clone(), Vec::new());
        let cfg = self.build_with(f)?;
        Ok((proc, cfg))
    }
}

/// Context passed to the build closure for defining blocks.
pub struct CfgContext<'a> {
    blocks: &'a mut Vec<Block>,
}

impl CfgContext<'_> {
    /// Defines a block with the given label using a closure.
    pub fn block<F>(&mut self, label: impl Into<Label>, f: F)
    where
        F: FnOnce(&mut BlockBuilder),
    {
        let mut builder = BlockBuilder {
            block: Block::new(label, Vec::new(), Vec::new()),
        };
        f(&mut builder);
        self.blocks.push(builder.block);
    }
}

/// Builder for the instructions of one block.
pub struct BlockBuilder {
    block: Block,
}

impl BlockBuilder {
    /// Adds an arbitrary instruction.
    pub fn instr(&mut self, instr: Instr) -> &mut Self {
        if instr.is_terminator() {
            self.block.jumps.push(instr);
        } else {
            self.block.body.push(instr);
        }
        self
    }

    /// Adds: `dest = const value`
    pub fn constant(&mut self, dest: impl Into<Temp>, value: i64) -> &mut Self {
        self.instr(Instr::constant(dest, value))
    }

    /// Adds: `dest = copy src`
    pub fn copy(&mut self, dest: impl Into<Temp>, src: impl Into<Operand>) -> &mut Self {
        self.instr(Instr::copy(dest, src))
    }

    /// Adds: `dest = op left, right`
    pub fn binary(
        &mut self,
        dest: impl Into<Temp>,
        op: BinaryOp,
        left: impl Into<Operand>,
        right: impl Into<Operand>,
    ) -> &mut Self {
        self.instr(Instr::binary(dest, op, left, right))
    }

    /// Adds: `dest = add left, right`
    pub fn add(
        &mut self,
        dest: impl Into<Temp>,
        left: impl Into<Operand>,
        right: impl Into<Operand>,
    ) -> &mut Self {
        self.binary(dest, BinaryOp::Add, left, right)
    }

    /// Adds: `dest = op operand`
    pub fn unary(
        &mut self,
        dest: impl Into<Temp>,
        op: UnaryOp,
        operand: impl Into<Operand>,
    ) -> &mut Self {
        self.instr(Instr::unary(dest, op, operand))
    }

    /// Adds: `dest = phi(...)`
    pub fn phi<L, O>(
        &mut self,
        dest: impl Into<Temp>,
        sources: impl IntoIterator<Item = (L, O)>,
    ) -> &mut Self
    where
        L: Into<Label>,
        O: Into<Operand>,
    {
        self.instr(Instr::phi(dest, sources))
    }

    /// Adds: `param index, value`
    pub fn param(&mut self, index: u32, value: impl Into<Operand>) -> &mut Self {
        self.instr(Instr::param(index, value))
    }

    /// Adds: `[dest =] call target, argc`
    pub fn call(&mut self, dest: Option<&str>, target: &str, argc: u32) -> &mut Self {
        self.instr(Instr::call(dest.map(Temp::new), target, argc))
    }

    /// Adds: `param 1, value; call @__bx_print_int, 1`
    pub fn print(&mut self, value: impl Into<Operand>) -> &mut Self {
        self.param(1, value).call(None, "@__bx_print_int", 1)
    }

    /// Adds: `jmp target`
    pub fn jump(&mut self, target: impl Into<Label>) -> &mut Self {
        self.instr(Instr::jump(target))
    }

    /// Adds: `cond value, target`
    pub fn branch(
        &mut self,
        cond: Condition,
        value: impl Into<Operand>,
        target: impl Into<Label>,
    ) -> &mut Self {
        self.instr(Instr::branch(cond, value, target))
    }

    /// Adds: `ret [value]`
    pub fn ret(&mut self, value: Option<Operand>) -> &mut Self {
        self.instr(Instr::ret(value))
    }
}
