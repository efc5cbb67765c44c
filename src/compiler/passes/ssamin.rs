//! SSA minimization: redundant phi elimination.
//!
//! Crude SSA construction places a phi for every local at every join, most of which merge a
//! single value. Two rewrites remove them, repeated until neither applies:
//!
//! - **Null choice elimination (NCE)**: `%x.3 = phi(%.L1: %x.3, %.L2: %x.3)` only ever
//!   yields itself and is deleted.
//! - **Rename**: `%x.3 = phi(%.L1: %x.1, %.L2: %x.3)` only ever yields `%x.1`; the phi is
//!   deleted and every use of `%x.3` is rewritten to `%x.1`.
//!
//! Deleting one phi often makes another redundant, so both rewrites run until the CFG stops
//! changing.

use std::collections::BTreeSet;

use crate::{
    analysis::cfg::Cfg,
    compiler::{pass::OptPass, EventKind, EventLog},
    tac::{Instr, Label, Operand, Temp},
    Result,
};

const NAME: &str = "ssa-minimization";

/// Redundant phi elimination pass.
pub struct SsaMinimizationPass {
    max_rounds: usize,
}

impl Default for SsaMinimizationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl SsaMinimizationPass {
    /// Default cap on NCE/Rename rounds.
    pub const DEFAULT_MAX_ROUNDS: usize = 64;

    /// Creates a new pass with the default round cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_rounds(Self::DEFAULT_MAX_ROUNDS)
    }

    /// Creates a new pass that gives up after `max_rounds` rounds.
    #[must_use]
    pub fn with_max_rounds(max_rounds: usize) -> Self {
        Self {
            max_rounds: max_rounds.max(1),
        }
    }
}

impl OptPass for SsaMinimizationPass {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Removes phis that merge a single value (null choice elimination and renaming)"
    }

    fn run(&self, cfg: &mut Cfg, events: &EventLog) -> Result<bool> {
        Ok(minimize(cfg, self.max_rounds, events))
    }
}

/// Returns the operand a phi always yields, if it merges a single value.
///
/// Self-references are ignored. A phi with only self-references yields nothing
/// and is handled by NCE instead.
fn single_source(dest: &Temp, sources: impl IntoIterator<Item = Operand>) -> Option<Operand> {
    let distinct: BTreeSet<Operand> = sources
        .into_iter()
        .filter(|s| !s.reads(dest))
        .collect();
    if distinct.len() == 1 {
        distinct.into_iter().next()
    } else {
        None
    }
}

/// Returns `true` if every source of the phi is its own destination.
fn is_null_choice(instr: &Instr) -> bool {
    match (instr.dest(), instr.phi_sources()) {
        (Some(dest), Some(sources)) => {
            !sources.is_empty() && sources.values().all(|s| s.reads(dest))
        }
        _ => false,
    }
}

/// Deletes every phi whose sources all name its own destination.
///
/// Returns `true` if any phi was deleted.
pub fn nce(cfg: &mut Cfg, events: &EventLog) -> bool {
    let proc = cfg.proc_name().to_string();
    let mut changed = false;
    for block in cfg.blocks_mut() {
        let label = block.label.clone();
        block.body.retain(|instr| {
            if !is_null_choice(instr) {
                return true;
            }
            log::trace!("ssamin {}: nce {}", proc, instr);
            events
                .record(EventKind::PhiSimplified)
                .at(&proc, &label)
                .pass(NAME)
                .message(format!("removed self-only {instr}"));
            changed = true;
            false
        });
    }
    changed
}

/// Deletes one phi at a time that merges a single value and rewrites its uses.
///
/// Returns `true` if any phi was renamed away.
pub fn rename(cfg: &mut Cfg, events: &EventLog) -> bool {
    let proc = cfg.proc_name().to_string();
    let mut changed = false;

    while let Some((label, index, dest, replacement)) = find_renamable(cfg) {
        if let Some(block) = cfg.block_mut(&label) {
            block.body.remove(index);
        }
        let mut rewritten = 0;
        for block in cfg.blocks_mut() {
            rewritten += block.replace_uses(&dest, &replacement);
        }

        log::trace!(
            "ssamin {}: {} renamed to {} ({} uses)",
            proc,
            dest,
            replacement,
            rewritten
        );
        events
            .record(EventKind::PhiSimplified)
            .at(&proc, &label)
            .pass(NAME)
            .message(format!("{dest} -> {replacement}"));
        changed = true;
    }
    changed
}

fn find_renamable(cfg: &Cfg) -> Option<(Label, usize, Temp, Operand)> {
    cfg.blocks().find_map(|block| {
        block.body.iter().enumerate().find_map(|(index, instr)| {
            let dest = instr.dest()?;
            let sources = instr.phi_sources()?;
            let replacement = single_source(dest, sources.values().cloned())?;
            Some((block.label.clone(), index, dest.clone(), replacement))
        })
    })
}

/// Alternates [`rename`] and [`nce`] until neither changes the CFG or `max_rounds` rounds
/// have run.
///
/// Returns `true` if the CFG changed.
pub fn minimize(cfg: &mut Cfg, max_rounds: usize, events: &EventLog) -> bool {
    let before = cfg.instr_count();
    let mut changed = false;
    let mut converged = false;
    let mut rounds = 0;

    while rounds < max_rounds {
        rounds += 1;
        let renamed = rename(cfg, events);
        let removed = nce(cfg, events);
        if !renamed && !removed {
            converged = true;
            break;
        }
        changed = true;
    }
    if !converged {
        log::warn!(
            "ssamin {}: stopped after {} rounds without reaching a fixpoint",
            cfg.proc_name(),
            max_rounds
        );
    }

    log::debug!(
        "ssamin {}: {} -> {} instructions in {} rounds",
        cfg.proc_name(),
        before,
        cfg.instr_count(),
        rounds
    );
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{
            cfg::{infer, linearize, CfgBuilder},
            crude_ssagen,
        },
        tac::{execute, parse_tac, Condition, Decl},
    };

    fn l(name: &str) -> Label {
        Label::new(name)
    }

    #[test]
    fn test_nce_removes_self_only_phi() {
        let mut cfg = CfgBuilder::new("@f")
            .build_with(|f| {
                f.block("%.L0", |b| {
                    b.constant("%x.0", 1).jump("%.L1");
                });
                f.block("%.L1", |b| {
                    b.phi("%y.1", [("%.L0", "%y.1"), ("%.L1", "%y.1")])
                        .print("%x.0")
                        .jump("%.L1");
                });
            })
            .unwrap();

        let events = EventLog::new();
        assert!(nce(&mut cfg, &events));
        assert!(cfg.block(&l("%.L1")).unwrap().phis().next().is_none());
        assert_eq!(events.count_kind(EventKind::PhiSimplified), 1);
        assert!(!nce(&mut cfg, &events));
    }

    #[test]
    fn test_rename_collapses_single_value_phi() {
        let mut cfg = CfgBuilder::new("@f")
            .build_with(|f| {
                f.block("%.L0", |b| {
                    b.constant("%x.0", 1).jump("%.L1");
                });
                f.block("%.L1", |b| {
                    b.phi("%x.1", [("%.L0", "%x.0"), ("%.L1", "%x.1")])
                        .add("%y.0", "%x.1", 2)
                        .print("%y.0")
                        .jump("%.L1");
                });
            })
            .unwrap();

        let events = EventLog::new();
        assert!(rename(&mut cfg, &events));
        let block = cfg.block(&l("%.L1")).unwrap();
        assert!(block.phis().next().is_none());
        assert_eq!(block.body[0].to_string(), "%y.0 = add %x.0, 2;");
    }

    #[test]
    fn test_distinct_sources_kept() {
        let mut cfg = CfgBuilder::new("@f")
            .params(["%c"])
            .build_with(|f| {
                f.block("%.L0", |b| {
                    b.branch(Condition::Jz, "%c", "%.L2").jump("%.L1");
                });
                f.block("%.L1", |b| {
                    b.constant("%x.0", 1).jump("%.L3");
                });
                f.block("%.L2", |b| {
                    b.constant("%x.1", 2).jump("%.L3");
                });
                f.block("%.L3", |b| {
                    b.phi("%x.2", [("%.L1", "%x.0"), ("%.L2", "%x.1")])
                        .ret(Some("%x.2".into()));
                });
            })
            .unwrap();

        assert!(!minimize(&mut cfg, 8, &EventLog::new()));
        assert_eq!(cfg.block(&l("%.L3")).unwrap().phis().count(), 1);
    }

    #[test]
    fn test_rename_cascades() {
        // %a.1 only yields %a.0; once it is gone %a.2 only yields %a.0 too.
        let mut cfg = CfgBuilder::new("@f")
            .build_with(|f| {
                f.block("%.L0", |b| {
                    b.constant("%a.0", 7).jump("%.L1");
                });
                f.block("%.L1", |b| {
                    b.phi("%a.1", [("%.L0", "%a.0"), ("%.L2", "%a.2")])
                        .jump("%.L2");
                });
                f.block("%.L2", |b| {
                    b.phi("%a.2", [("%.L1", "%a.1")])
                        .print("%a.2")
                        .jump("%.L1");
                });
            })
            .unwrap();

        let events = EventLog::new();
        assert!(minimize(&mut cfg, 8, &events));
        assert_eq!(cfg.blocks().flat_map(|b| b.phis()).count(), 0);
        let print = &cfg.block(&l("%.L2")).unwrap().body[0];
        assert_eq!(print.to_string(), "param 1, %a.0;");
        assert_eq!(events.count_kind(EventKind::PhiSimplified), 2);
    }

    #[test]
    fn test_crude_ssa_minimized_preserves_semantics() {
        let text = r#"[
            {"proc": "@main", "args": [], "body": [
                {"opcode": "const", "args": [1], "result": "%f"},
                {"opcode": "const", "args": [4], "result": "%n"},
                {"opcode": "label", "args": ["%.L1"], "result": null},
                {"opcode": "jz", "args": ["%n", "%.L2"], "result": null},
                {"opcode": "mul", "args": ["%f", "%n"], "result": "%f"},
                {"opcode": "sub", "args": ["%n", 1], "result": "%n"},
                {"opcode": "jmp", "args": ["%.L1"], "result": null},
                {"opcode": "label", "args": ["%.L2"], "result": null},
                {"opcode": "param", "args": [1, "%f"], "result": null},
                {"opcode": "call", "args": ["@__bx_print_int", 1], "result": null},
                {"opcode": "ret", "args": [], "result": null}
            ]}
        ]"#;
        let decls = parse_tac(text).unwrap();
        let before = execute(&decls, "@main", &[]).unwrap();

        let mut proc = decls[0].as_proc().unwrap().clone();
        let mut cfg = infer(&proc).unwrap();
        let inserted = crude_ssagen(&proc, &mut cfg);
        minimize(&mut cfg, 64, &EventLog::new());

        let remaining = cfg.blocks().flat_map(|b| b.phis()).count();
        assert!(remaining < inserted);
        assert!(cfg.is_single_assignment());

        linearize(&mut proc, &cfg);
        let after = execute(&[Decl::Proc(proc)], "@main", &[]).unwrap();
        assert_eq!(before.output, vec!["24"]);
        assert_eq!(after.output, before.output);
    }
}
