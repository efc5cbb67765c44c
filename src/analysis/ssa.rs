//! Crude SSA construction.
//!
//! [`crude_ssagen`] converts a CFG into SSA form without computing dominance frontiers: every
//! block with a predecessor receives a phi for every local temporary of the procedure, and
//! then every definition is given a fresh versioned name. The result is correct but bloated;
//! SSA minimization removes the phis that merge a single value.
//!
//! # Naming
//!
//! A definition of `%x` becomes `%x.N`, a definition of the compiler temporary `%4` becomes
//! `%4.N`. Version numbers are unique per base name and never reuse a name already present
//! in the procedure. Globals (`@g`) are memory, not values, and are never renamed.
//!
//! A use with no reaching definition keeps its original name. Parameters are the common
//! case: they are live into the entry block under their declared names.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::{
    analysis::cfg::Cfg,
    tac::{Instr, Label, Operand, Proc, Temp},
};

/// The reaching definition of each temporary at some program point.
type Versions = HashMap<Temp, Temp>;

/// Hands out fresh `base.N` names.
struct VersionGen {
    taken: HashSet<Temp>,
    next: HashMap<String, usize>,
}

impl VersionGen {
    fn new(taken: HashSet<Temp>) -> Self {
        Self {
            taken,
            next: HashMap::new(),
        }
    }

    fn fresh(&mut self, temp: &Temp) -> Temp {
        let counter = self.next.entry(temp.base().to_string()).or_insert(0);
        loop {
            let candidate = temp.versioned(*counter);
            *counter += 1;
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// Puts `cfg` into SSA form in place.
///
/// Inserts, at the head of every block that has predecessors, one phi per non-global
/// temporary defined in the procedure (parameters included), then renames every definition
/// to a fresh version and every use to the version reaching it.
///
/// Returns the number of phis inserted.
pub fn crude_ssagen(proc: &Proc, cfg: &mut Cfg) -> usize {
    let mut locals: BTreeSet<Temp> = proc.params.iter().cloned().collect();
    let mut taken: HashSet<Temp> = proc.params.iter().cloned().collect();
    for instr in cfg.blocks().flat_map(|b| b.instrs()) {
        if let Some(dest) = instr.dest.as_ref().filter(|d| !d.is_global()) {
            locals.insert(dest.clone());
        }
        taken.extend(instr.dest.iter().cloned());
        taken.extend(instr.used_temps().cloned());
    }

    let preds: HashMap<Label, Vec<Label>> = cfg
        .predecessor_map()
        .into_iter()
        .map(|(l, ps)| (l.clone(), ps.into_iter().cloned().collect()))
        .collect();

    let mut inserted = 0;
    for block in cfg.blocks_mut() {
        let Some(block_preds) = preds.get(&block.label).filter(|ps| !ps.is_empty()) else {
            continue;
        };
        let phis = locals.iter().map(|temp| {
            Instr::phi(
                temp.clone(),
                block_preds
                    .iter()
                    .map(|p| (p.clone(), Operand::Temp(temp.clone()))),
            )
        });
        let body = std::mem::take(&mut block.body);
        block.body = phis.chain(body).collect();
        inserted += locals.len();
    }

    let mut versions = VersionGen::new(taken);
    let mut exits: HashMap<Label, Versions> = HashMap::with_capacity(cfg.len());
    for block in cfg.blocks_mut() {
        let mut current = Versions::new();
        for instr in block.body.iter_mut() {
            if !instr.is_phi() {
                rename_uses(instr, &current);
            }
            if let Some(dest) = instr.dest.as_mut().filter(|d| !d.is_global()) {
                let fresh = versions.fresh(dest);
                current.insert(dest.clone(), fresh.clone());
                *dest = fresh;
            }
        }
        for jump in &mut block.jumps {
            rename_uses(jump, &current);
        }
        exits.insert(block.label.clone(), current);
    }

    for block in cfg.blocks_mut() {
        for instr in &mut block.body {
            let Some(sources) = instr.phi_sources_mut() else {
                continue;
            };
            let resolved: BTreeMap<Label, Operand> = sources
                .iter()
                .map(|(pred, source)| {
                    let reaching = source
                        .as_temp()
                        .and_then(|t| exits.get(pred).and_then(|v| v.get(t)))
                        .map_or_else(|| source.clone(), |t| Operand::Temp(t.clone()));
                    (pred.clone(), reaching)
                })
                .collect();
            *sources = resolved;
        }
    }

    log::debug!(
        "ssagen {}: inserted {} phis over {} locals",
        cfg.proc_name(),
        inserted,
        locals.len()
    );
    inserted
}

fn rename_uses(instr: &mut Instr, current: &Versions) {
    for operand in instr.uses_mut() {
        if let Operand::Temp(temp) = operand {
            if let Some(version) = current.get(temp) {
                *temp = version.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::cfg::{infer, CfgBuilder},
        tac::{execute, BinaryOp, Condition, Decl, Op},
    };

    #[test]
    fn test_straight_line_renaming() {
        let (proc, mut cfg) = CfgBuilder::new("@f")
            .params(["%a"])
            .build_proc_with(|f| {
                f.block("%.L0", |b| {
                    b.add("%x", "%a", 1)
                        .add("%x", "%x", "%a")
                        .ret(Some("%x".into()));
                });
            })
            .unwrap();

        let inserted = crude_ssagen(&proc, &mut cfg);
        assert_eq!(inserted, 0);

        let block = cfg.block(&Label::new("%.L0")).unwrap();
        assert_eq!(block.body[0].to_string(), "%x.0 = add %a, 1;");
        assert_eq!(block.body[1].to_string(), "%x.1 = add %x.0, %a;");
        assert_eq!(block.jumps[0].to_string(), "ret %x.1;");
        assert!(cfg.is_single_assignment());
    }

    #[test]
    fn test_phis_at_join() {
        let (proc, mut cfg) = CfgBuilder::new("@f")
            .params(["%c"])
            .build_proc_with(|f| {
                f.block("%.L0", |b| {
                    b.branch(Condition::Jz, "%c", "%.L2").jump("%.L1");
                });
                f.block("%.L1", |b| {
                    b.constant("%x", 1).jump("%.L3");
                });
                f.block("%.L2", |b| {
                    b.constant("%x", 2).jump("%.L3");
                });
                f.block("%.L3", |b| {
                    b.ret(Some("%x".into()));
                });
            })
            .unwrap();

        // Three blocks with predecessors, two locals (%c and %x).
        assert_eq!(crude_ssagen(&proc, &mut cfg), 6);
        assert!(cfg.is_single_assignment());

        let join = cfg.block(&Label::new("%.L3")).unwrap();
        let x_phi = join
            .phis()
            .find(|p| p.dest().is_some_and(|d| d.base() == "%x"))
            .unwrap();
        let sources: Vec<String> = x_phi
            .phi_sources()
            .unwrap()
            .values()
            .map(ToString::to_string)
            .collect();
        let l1_x = cfg.block(&Label::new("%.L1")).unwrap().body[2]
            .dest()
            .unwrap()
            .clone();
        let l2_x = cfg.block(&Label::new("%.L2")).unwrap().body[2]
            .dest()
            .unwrap()
            .clone();
        assert_eq!(sources, vec![l1_x.to_string(), l2_x.to_string()]);

        let ret = &join.jumps[0];
        assert!(ret.reads(x_phi.dest().unwrap()));
    }

    #[test]
    fn test_undefined_use_keeps_name() {
        let (proc, mut cfg) = CfgBuilder::new("@f")
            .build_proc_with(|f| {
                f.block("%.L0", |b| {
                    b.jump("%.L1");
                });
                f.block("%.L1", |b| {
                    b.add("%y", "%0", 1).ret(Some("%y".into()));
                });
            })
            .unwrap();

        crude_ssagen(&proc, &mut cfg);
        let block = cfg.block(&Label::new("%.L1")).unwrap();
        let phi = &block.body[0];
        assert_eq!(
            phi.phi_sources().unwrap().get(&Label::new("%.L0")),
            Some(&Operand::from("%y"))
        );
        assert!(block.body[1].reads(&Temp::new("%0")));
    }

    #[test]
    fn test_globals_untouched() {
        let (proc, mut cfg) = CfgBuilder::new("@f")
            .build_proc_with(|f| {
                f.block("%.L0", |b| {
                    b.add("@g", "@g", 1).ret(None);
                });
            })
            .unwrap();

        crude_ssagen(&proc, &mut cfg);
        let block = cfg.block(&Label::new("%.L0")).unwrap();
        assert_eq!(block.body[0].to_string(), "@g = add @g, 1;");
    }

    #[test]
    fn test_fresh_names_avoid_existing() {
        let (proc, mut cfg) = CfgBuilder::new("@f")
            .build_proc_with(|f| {
                f.block("%.L0", |b| {
                    b.constant("%x", 1)
                        .copy("%z", "%x.0")
                        .ret(Some("%z".into()));
                });
            })
            .unwrap();

        crude_ssagen(&proc, &mut cfg);
        let block = cfg.block(&Label::new("%.L0")).unwrap();
        assert_eq!(block.body[0].dest(), Some(&Temp::new("%x.1")));
        assert!(block.body[1].reads(&Temp::new("%x.0")));
    }

    #[test]
    fn test_loop_preserves_semantics() {
        // sum = 0; i = 0; while i < n { sum += i; i += 1 }; print sum
        let text = r#"[
            {"proc": "@main", "args": [], "body": [
                {"opcode": "const", "args": [0], "result": "%sum"},
                {"opcode": "const", "args": [0], "result": "%i"},
                {"opcode": "const", "args": [5], "result": "%n"},
                {"opcode": "label", "args": ["%.L1"], "result": null},
                {"opcode": "sub", "args": ["%i", "%n"], "result": "%0"},
                {"opcode": "jnl", "args": ["%0", "%.L2"], "result": null},
                {"opcode": "add", "args": ["%sum", "%i"], "result": "%sum"},
                {"opcode": "add", "args": ["%i", 1], "result": "%i"},
                {"opcode": "jmp", "args": ["%.L1"], "result": null},
                {"opcode": "label", "args": ["%.L2"], "result": null},
                {"opcode": "param", "args": [1, "%sum"], "result": null},
                {"opcode": "call", "args": ["@__bx_print_int", 1], "result": null},
                {"opcode": "ret", "args": [], "result": null}
            ]}
        ]"#;
        let decls = crate::tac::parse_tac(text).unwrap();
        let before = execute(&decls, "@main", &[]).unwrap();

        let mut proc = decls[0].as_proc().unwrap().clone();
        let mut cfg = infer(&proc).unwrap();
        crude_ssagen(&proc, &mut cfg);
        assert!(cfg.is_single_assignment());
        crate::analysis::cfg::linearize(&mut proc, &cfg);

        let after = execute(&[Decl::Proc(proc)], "@main", &[]).unwrap();
        assert_eq!(before.output, vec!["10"]);
        assert_eq!(after.output, before.output);
    }

    #[test]
    fn test_phi_dests_are_versioned() {
        let (proc, mut cfg) = CfgBuilder::new("@f")
            .params(["%p"])
            .build_proc_with(|f| {
                f.block("%.L0", |b| {
                    b.jump("%.L1");
                });
                f.block("%.L1", |b| {
                    b.binary("%q", BinaryOp::Mul, "%p", 2).ret(Some("%q".into()));
                });
            })
            .unwrap();

        crude_ssagen(&proc, &mut cfg);
        for block in cfg.blocks() {
            for instr in &block.body {
                if let Op::Phi { .. } = instr.op {
                    assert!(instr.dest().unwrap().is_versioned());
                }
            }
        }
        // %p enters under its own name.
        let phi_p = &cfg.block(&Label::new("%.L1")).unwrap().body[0];
        assert_eq!(phi_p.to_string(), "%p.0 = phi(%.L0: %p);");
    }
}
