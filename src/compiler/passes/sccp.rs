//! Sparse conditional constant propagation pass.
//!
//! Runs the [`ConstantPropagation`] analysis and rewrites the CFG with its results:
//!
//! 1. Blocks that never execute are deleted.
//! 2. Terminators are re-evaluated under the final lattice. A conditional on a constant
//!    becomes a `jmp` when taken and disappears when not; phi sources arriving along edges
//!    that never execute are dropped.
//! 3. Instructions whose destination or operands are never defined on an executable path
//!    are deleted (`param` is kept, it has no destination of its own).
//! 4. Every temporary proven constant is substituted by its value at each use and its
//!    definition is deleted.
//!
//! # Example
//!
//! Before:
//! ```text
//! %.L0:
//!   %0 = const 2;
//!   %1 = const 3;
//!   %2 = add %0, %1;
//!   ret %2;
//! ```
//!
//! After:
//! ```text
//! %.L0:
//!   ret 5;
//! ```
//!
//! Running the pass again on its own output changes nothing.

use std::collections::{BTreeMap, HashMap};

use crate::{
    analysis::{
        cfg::{Block, Cfg},
        dataflow::{ConstantPropagation, LatticeValue, SccpResult},
    },
    compiler::{pass::OptPass, EventKind, EventLog},
    tac::{Instr, Label, Op, Operand, Temp},
    Result,
};

const NAME: &str = "sccp";

/// Sparse conditional constant propagation pass.
///
/// Folds constants and deletes code that can never execute.
pub struct ConstantPropagationPass;

impl Default for ConstantPropagationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPropagationPass {
    /// Creates a new SCCP pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl OptPass for ConstantPropagationPass {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Folds constants and removes unreachable code with sparse conditional constant propagation"
    }

    fn run(&self, cfg: &mut Cfg, events: &EventLog) -> Result<bool> {
        propagate_constants(cfg, events)
    }
}

/// Runs SCCP on `cfg` and rewrites it in place.
///
/// Returns `true` if the CFG changed.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] if a surviving instruction still reads a
/// temporary that is never defined on an executable path. This cannot happen for SSA input
/// in which every use is dominated by its definition.
pub fn propagate_constants(cfg: &mut Cfg, events: &EventLog) -> Result<bool> {
    let result = ConstantPropagation::analyze(cfg);
    let proc = cfg.proc_name().to_string();
    let mut changed = false;

    let dead: Vec<Label> = cfg
        .labels()
        .iter()
        .filter(|l| !result.is_block_executable(l))
        .cloned()
        .collect();
    for label in &dead {
        if cfg.remove_block(label).is_some() {
            events
                .record(EventKind::BlockRemoved)
                .at(&proc, label)
                .pass(NAME);
            changed = true;
        }
    }

    let mut pruned_sources = 0;
    for block in cfg.blocks_mut() {
        changed |= resolve_terminators(block, &result, &proc, events);
        pruned_sources += prune_phi_sources(block, &result);
    }
    changed |= pruned_sources > 0;

    for block in cfg.blocks_mut() {
        changed |= remove_undefined(block, &result, &proc, events);
    }

    let constants: HashMap<Temp, i64> = result
        .constants()
        .map(|(temp, c)| (temp.clone(), c))
        .collect();
    if !constants.is_empty() {
        changed |= substitute_constants(cfg, &constants, &proc, events);
    }

    check_defined(cfg, &result)?;

    log::debug!(
        "sccp {}: {} constants, {} blocks removed, {} phi sources pruned",
        proc,
        constants.len(),
        dead.len(),
        pruned_sources
    );
    Ok(changed)
}

/// Re-walks the terminators of `block` under the final lattice, keeping only those control
/// can leave through.
///
/// Returns `true` if the terminator list changed.
fn resolve_terminators(block: &mut Block, result: &SccpResult, proc: &str, events: &EventLog) -> bool {
    let mut kept = Vec::with_capacity(block.jumps.len());

    for jump in &block.jumps {
        match &jump.op {
            Op::Branch {
                cond,
                value,
                target,
            } => match result.operand_value(value) {
                LatticeValue::NonConstant => kept.push(jump.clone()),
                LatticeValue::Constant(c) => {
                    let taken = cond.holds(c);
                    events
                        .record(EventKind::BranchSimplified)
                        .at(proc, &block.label)
                        .pass(NAME)
                        .message(format!(
                            "{jump} is {}",
                            if taken { "always taken" } else { "never taken" }
                        ));
                    if taken {
                        kept.push(Instr::jump(target.clone()));
                        break;
                    }
                }
                LatticeValue::Unused => break,
            },
            Op::Ret { value: Some(value) } if result.operand_value(value).is_unused() => {
                kept.push(Instr::ret(None));
                break;
            }
            _ => {
                kept.push(jump.clone());
                break;
            }
        }
    }

    if kept.last().is_none_or(|j| !matches!(j.op, Op::Jump { .. } | Op::Ret { .. })) {
        log::warn!(
            "sccp {}: {} has no reachable exit, closing it with ret",
            proc,
            block.label
        );
        events.warn(format!("{proc}: {} closed with ret", block.label));
        kept.push(Instr::ret(None));
    }

    if kept == block.jumps {
        return false;
    }
    block.jumps = kept;
    true
}

/// Drops phi sources whose incoming edge never executes.
fn prune_phi_sources(block: &mut Block, result: &SccpResult) -> usize {
    let label = block.label.clone();
    let mut removed = 0;
    for instr in &mut block.body {
        if let Some(sources) = instr.phi_sources_mut() {
            let before = sources.len();
            sources.retain(|pred, _| result.is_edge_executable(pred, &label));
            removed += before - sources.len();
        }
    }
    removed
}

/// Deletes instructions whose destination or operands are never defined.
///
/// Phi sources are exempt: the join already ignored them, and the phi itself is only
/// deleted when its destination is undefined.
fn remove_undefined(block: &mut Block, result: &SccpResult, proc: &str, events: &EventLog) -> bool {
    let before = block.body.len();
    block.body.retain(|instr| {
        if matches!(instr.op, Op::Param { .. }) {
            return true;
        }
        let undefined_dest = instr.dest().is_some_and(|d| result.value(d).is_unused());
        let undefined_use = !instr.is_phi() && instr.used_temps().any(|t| result.value(t).is_unused());
        if undefined_dest || undefined_use {
            log::trace!("sccp {}: removing undefined {}", proc, instr);
            events
                .record(EventKind::InstructionRemoved)
                .at(proc, &block.label)
                .pass(NAME)
                .message(instr.to_string());
            return false;
        }
        true
    });
    block.body.len() != before
}

/// Replaces every use of a constant temporary by its value and deletes its definition.
fn substitute_constants(
    cfg: &mut Cfg,
    constants: &HashMap<Temp, i64>,
    proc: &str,
    events: &EventLog,
) -> bool {
    let mut folded: BTreeMap<&Temp, i64> = BTreeMap::new();
    let mut changed = false;

    for block in cfg.blocks_mut() {
        let before = block.body.len();
        block.body.retain(|instr| {
            instr
                .dest()
                .is_none_or(|d| !constants.contains_key(d))
        });
        changed |= block.body.len() != before;

        for instr in block.instrs_mut() {
            for operand in instr.uses_mut() {
                let Operand::Temp(temp) = &*operand else {
                    continue;
                };
                if let Some((temp, c)) = constants.get_key_value(temp) {
                    *operand = Operand::Imm(*c);
                    folded.insert(temp, *c);
                    changed = true;
                }
            }
        }
    }

    for (temp, c) in folded {
        events
            .record(EventKind::ConstantFolded)
            .proc(proc)
            .pass(NAME)
            .message(format!("{temp} = {c}"));
    }
    changed
}

/// Checks that no surviving instruction outside a phi reads an undefined temporary.
fn check_defined(cfg: &Cfg, result: &SccpResult) -> Result<()> {
    for block in cfg.blocks() {
        for instr in block.instrs().filter(|i| !i.is_phi()) {
            if let Some(temp) = instr.used_temps().find(|t| result.value(t).is_unused()) {
                return Err(invariant_error!(
                    "{}: `{}` in {} reads {}, which is never defined on an executable path",
                    cfg.proc_name(),
                    instr,
                    block.label,
                    temp
                ));
            }
        }
    }
    Ok(())
}
