//! Common subexpression elimination.
//!
//! An expression is identified by its [`ExprKey`]: the operator and its operands. A
//! recomputation of an expression whose earlier result is still available is replaced by a
//! copy of that result.
//!
//! # Local CSE
//!
//! Within one block, the occurrences of a key are split into epochs. An epoch ends at every
//! redefinition of one of the key's operands, or of the destination holding the first
//! occurrence's result. An occurrence that overwrites one of its own operands ends its epoch
//! immediately. Inside an epoch, every occurrence after the first becomes
//! `dest = copy first_dest`.
//!
//! # Global CSE
//!
//! Across blocks, the dominator sets decide where a value can come from. For a block `X` and
//! a key whose first occurrence in `X` is not preceded by a redefinition of an operand, the
//! closest strict dominator `D` is chosen such that:
//!
//! - the key is available at the exit of `D`: `D`'s last computation of it is not followed
//!   in `D` by a redefinition of an operand or of its destination;
//! - no block on a path from `D` to `X` redefines an operand or `D`'s destination, and `X`
//!   does not overwrite `D`'s destination ahead of its own occurrence.
//!
//! `X`'s first occurrence then becomes a copy of `D`'s destination. In SSA form both
//! conditions reduce to dominance, but the checks keep the rewrite sound on code that still
//! assigns a surface name more than once.
//!
//! Expressions that read a global are never keyed: globals are memory and may be changed by
//! any call.

use std::collections::{HashMap, HashSet};

use crate::{
    analysis::{
        cfg::{Block, Cfg},
        dominance::DominatorSets,
    },
    compiler::{pass::OptPass, EventKind, EventLog},
    tac::{BinaryOp, Instr, Label, Op, Operand, Temp, UnaryOp},
    utils::{
        graph::{
            algorithms::{reachable_from, reaching},
            NodeId, Predecessors, Successors,
        },
        BitSet,
    },
    Result,
};

const NAME: &str = "cse";

/// The identity of a pure computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprKey {
    /// `op left, right`
    Binary(BinaryOp, Operand, Operand),
    /// `op operand`
    Unary(UnaryOp, Operand),
}

impl ExprKey {
    /// Returns the key of `instr`, if it computes a keyable expression.
    #[must_use]
    pub fn of(instr: &Instr) -> Option<Self> {
        let key = match &instr.op {
            Op::Binary { op, left, right } => Self::Binary(*op, left.clone(), right.clone()),
            Op::Unary { op, operand } => Self::Unary(*op, operand.clone()),
            _ => return None,
        };
        if key.operands().any(Temp::is_global) {
            return None;
        }
        Some(key)
    }

    /// Iterates over the temporaries the expression reads.
    pub fn operands(&self) -> impl Iterator<Item = &Temp> {
        let (first, second) = match self {
            Self::Binary(_, left, right) => (left, Some(right)),
            Self::Unary(_, operand) => (operand, None),
        };
        std::iter::once(first)
            .chain(second)
            .filter_map(Operand::as_temp)
    }

    /// Returns `true` if the expression reads `temp`.
    #[must_use]
    pub fn reads(&self, temp: &Temp) -> bool {
        self.operands().any(|t| t == temp)
    }
}

/// Common subexpression elimination pass.
pub struct CommonSubexpressionPass;

impl Default for CommonSubexpressionPass {
    fn default() -> Self {
        Self::new()
    }
}

impl CommonSubexpressionPass {
    /// Creates a new CSE pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl OptPass for CommonSubexpressionPass {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Replaces recomputed expressions by copies, within blocks and along dominators"
    }

    fn run(&self, cfg: &mut Cfg, events: &EventLog) -> Result<bool> {
        Ok(apply_cse(cfg, events))
    }
}

/// Drops every available expression that reads `temp` or whose value lives in `temp`.
fn kill(available: &mut HashMap<ExprKey, Temp>, temp: &Temp) {
    available.retain(|key, dest| dest != temp && !key.reads(temp));
}

/// Rewrites recomputations within `block` into copies.
///
/// Returns the rewritten instructions as `(index, previous instruction)` pairs.
pub fn local_cse(block: &mut Block) -> Vec<(usize, Instr)> {
    let mut available: HashMap<ExprKey, Temp> = HashMap::new();
    let mut rewritten = Vec::new();

    for (index, instr) in block.body.iter_mut().enumerate() {
        let key = ExprKey::of(instr);
        if let (Some(key), Some(dest)) = (&key, instr.dest.clone()) {
            if let Some(first) = available.get(key) {
                let copy = Instr::copy(dest, first.clone());
                rewritten.push((index, std::mem::replace(instr, copy)));
            }
        }

        let Some(dest) = instr.dest.clone() else {
            continue;
        };
        kill(&mut available, &dest);
        if let Some(key) = key.filter(|k| !k.reads(&dest)) {
            available.entry(key).or_insert(dest);
        }
    }
    rewritten
}

/// Returns the expressions available at the exit of `block`, with the temporary holding
/// each one's value.
fn available_at_exit(block: &Block) -> HashMap<ExprKey, (usize, Temp)> {
    let mut available: HashMap<ExprKey, (usize, Temp)> = HashMap::new();
    for (index, instr) in block.body.iter().enumerate() {
        let Some(dest) = instr.dest() else {
            continue;
        };
        available.retain(|key, (_, d)| d != dest && !key.reads(dest));
        if let Some(key) = ExprKey::of(instr).filter(|k| !k.reads(dest)) {
            available.insert(key, (index, dest.clone()));
        }
    }
    available
}

/// Returns the first occurrence of each key in `block` that no earlier instruction of the
/// block invalidates.
fn clean_first_occurrences(block: &Block) -> Vec<(usize, ExprKey)> {
    let mut defined: HashSet<&Temp> = HashSet::new();
    let mut seen: HashSet<ExprKey> = HashSet::new();
    let mut clean = Vec::new();
    for (index, instr) in block.body.iter().enumerate() {
        if let Some(key) = ExprKey::of(instr) {
            if seen.insert(key.clone()) && !key.operands().any(|t| defined.contains(t)) {
                clean.push((index, key));
            }
        }
        if let Some(dest) = instr.dest() {
            defined.insert(dest);
        }
    }
    clean
}

/// Blocks on some path of at least one edge from `from` and of at least one edge to `to`.
fn between<G: Successors + Predecessors>(
    graph: &G,
    from: NodeId,
    to: NodeId,
    node_count: usize,
) -> BitSet {
    let mut after = BitSet::new(node_count);
    for succ in graph.successors(from) {
        after.union_with(&reachable_from(graph, succ));
    }
    let mut before = BitSet::new(node_count);
    for pred in graph.predecessors(to) {
        before.union_with(&reaching(graph, pred));
    }
    after.intersect_with(&before);
    after
}

/// Returns `true` if some block strictly between `from` and `to` writes one of `temps`.
///
/// In `from` itself the defining instruction at `skip` is not counted: reaching it again
/// recomputes the same value.
fn redefined_between(cfg: &Cfg, from: &Label, skip: usize, to: &Label, temps: &[&Temp]) -> bool {
    let graph = cfg.graph();
    let (Some(from_node), Some(to_node)) = (graph.node(from), graph.node(to)) else {
        return true;
    };
    let region = between(&graph, from_node, to_node, cfg.len());

    region.iter().any(|index| {
        let label = graph.label(NodeId::new(index));
        cfg.block(label).is_some_and(|block| {
            block.instrs().enumerate().any(|(i, instr)| {
                !(label == from && i == skip)
                    && instr.dest().is_some_and(|d| temps.contains(&d))
            })
        })
    })
}

/// Rewrites the first occurrence of expressions already available from a dominator.
///
/// Returns the number of instructions rewritten.
pub fn global_cse(cfg: &mut Cfg, events: &EventLog) -> usize {
    let doms = DominatorSets::compute(cfg);
    let proc = cfg.proc_name().to_string();
    let mut rewritten = 0;

    for label in cfg.labels().to_vec() {
        let Some(block) = cfg.block(&label) else {
            continue;
        };
        let mut rewrites: Vec<(usize, Temp)> = Vec::new();
        for (index, key) in clean_first_occurrences(block) {
            let operands: Vec<&Temp> = key.operands().collect();
            let source = doms.closest_first(&label).into_iter().find_map(|dom| {
                let (at, value) = cfg
                    .block(dom)
                    .and_then(|d| available_at_exit(d).remove(&key))?;
                if block.body[..index].iter().any(|i| i.defines(&value)) {
                    return None;
                }
                let mut watched = operands.clone();
                watched.push(&value);
                if redefined_between(cfg, dom, at, &label, &watched) {
                    return None;
                }
                Some(value)
            });
            if let Some(value) = source {
                rewrites.push((index, value));
            }
        }

        let Some(block) = cfg.block_mut(&label) else {
            continue;
        };
        for (index, value) in rewrites {
            let Some(dest) = block.body[index].dest.clone() else {
                continue;
            };
            let copy = Instr::copy(dest, value);
            let before = std::mem::replace(&mut block.body[index], copy);
            log::trace!("cse {}: {} in {} -> {}", proc, before, label, block.body[index]);
            events
                .record(EventKind::ExpressionEliminated)
                .at(&proc, &label)
                .pass(NAME)
                .message(format!("{before} reuses a dominating computation"));
            rewritten += 1;
        }
    }
    rewritten
}

/// Runs local CSE on every block, then global CSE once.
///
/// Returns `true` if any instruction was rewritten.
pub fn apply_cse(cfg: &mut Cfg, events: &EventLog) -> bool {
    let proc = cfg.proc_name().to_string();
    let mut local = 0;
    for block in cfg.blocks_mut() {
        for (_, before) in local_cse(block) {
            events
                .record(EventKind::ExpressionEliminated)
                .at(&proc, &block.label)
                .pass(NAME)
                .message(format!("{before} reuses an earlier computation"));
            local += 1;
        }
    }
    let global = global_cse(cfg, events);

    log::debug!("cse {}: {} local, {} global", proc, local, global);
    local + global > 0
}
