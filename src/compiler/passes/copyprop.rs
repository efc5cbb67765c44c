//! Global copy propagation.
//!
//! CSE leaves its rewrites behind as `dest = copy src`. When both names are assigned at most
//! once, every read of `dest` sees the value `src` had at the copy, so the copy is deleted
//! and every read of `dest` is rewritten to `src`, phi sources included.
//!
//! A copy is propagated when:
//!
//! - `dest` is a local written by this instruction and nowhere else;
//! - `src` is an immediate, or a local written at most once (parameters are written zero
//!   times).
//!
//! Globals are memory and stay on both sides of their copies. Chains collapse: after
//! `%1 = copy %0; %2 = copy %1`, reads of `%2` become reads of `%0`.
//!
//! # Example
//!
//! Before:
//! ```text
//! %.L0:
//!   %0 = mul %x, %x;
//!   %1 = copy %0;
//!   %2 = add %0, %1;
//!   ret %2;
//! ```
//!
//! After:
//! ```text
//! %.L0:
//!   %0 = mul %x, %x;
//!   %2 = add %0, %0;
//!   ret %2;
//! ```

use std::collections::HashMap;

use crate::{
    analysis::cfg::Cfg,
    compiler::{pass::OptPass, EventKind, EventLog},
    tac::{Op, Operand, Temp},
    Result,
};

const NAME: &str = "copy-propagation";

/// Global copy propagation pass.
pub struct CopyPropagationPass;

impl Default for CopyPropagationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl CopyPropagationPass {
    /// Creates a new copy propagation pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl OptPass for CopyPropagationPass {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Replaces temporaries defined by a copy with the copied value"
    }

    fn run(&self, cfg: &mut Cfg, events: &EventLog) -> Result<bool> {
        Ok(propagate_copies(cfg, events))
    }
}

fn definition_counts(cfg: &Cfg) -> HashMap<&Temp, usize> {
    let mut counts = HashMap::new();
    for dest in cfg.blocks().flat_map(|b| b.body.iter()).filter_map(|i| i.dest()) {
        *counts.entry(dest).or_insert(0) += 1;
    }
    counts
}

/// Returns the propagatable copies as `dest -> src`.
fn candidate_copies(cfg: &Cfg) -> HashMap<Temp, Operand> {
    let counts = definition_counts(cfg);
    let written = |t: &Temp| counts.get(t).copied().unwrap_or(0);

    let mut copies = HashMap::new();
    for instr in cfg.blocks().flat_map(|b| b.body.iter()) {
        let (Some(dest), Op::Copy { src }) = (instr.dest(), &instr.op) else {
            continue;
        };
        if dest.is_global() || written(dest) != 1 || src.reads(dest) {
            continue;
        }
        if let Operand::Temp(t) = src {
            if t.is_global() || written(t) > 1 {
                continue;
            }
        }
        copies.insert(dest.clone(), src.clone());
    }
    copies
}

/// Follows a chain of copies from `temp` to the first operand that is not itself copied.
///
/// Returns `None` for copies that only lead back into each other.
fn resolve(copies: &HashMap<Temp, Operand>, temp: &Temp) -> Option<Operand> {
    let mut current = copies.get(temp)?;
    for _ in 0..copies.len() {
        match current {
            Operand::Temp(t) => match copies.get(t) {
                Some(next) => current = next,
                None => return Some(current.clone()),
            },
            Operand::Imm(_) => return Some(current.clone()),
        }
    }
    None
}

/// Deletes every propagatable copy and rewrites the reads of its destination.
///
/// Returns `true` if the CFG changed.
pub fn propagate_copies(cfg: &mut Cfg, events: &EventLog) -> bool {
    let copies = candidate_copies(cfg);
    let resolved: HashMap<Temp, Operand> = copies
        .keys()
        .filter_map(|dest| resolve(&copies, dest).map(|src| (dest.clone(), src)))
        .collect();
    if resolved.is_empty() {
        return false;
    }

    let proc = cfg.proc_name().to_string();
    let mut rewritten = 0;
    for block in cfg.blocks_mut() {
        let label = block.label.clone();
        block.body.retain(|instr| {
            let propagated = matches!(instr.op, Op::Copy { .. })
                && instr.dest().is_some_and(|d| resolved.contains_key(d));
            if propagated {
                log::trace!("copyprop {}: removing {}", proc, instr);
                events
                    .record(EventKind::CopyPropagated)
                    .at(&proc, &label)
                    .pass(NAME)
                    .message(instr.to_string());
            }
            !propagated
        });

        for instr in block.instrs_mut() {
            for operand in instr.uses_mut() {
                if let Some(src) = operand.as_temp().and_then(|t| resolved.get(t)) {
                    *operand = src.clone();
                    rewritten += 1;
                }
            }
        }
    }

    log::debug!(
        "copyprop {}: {} copies propagated into {} reads",
        proc,
        resolved.len(),
        rewritten
    );
    true
}
