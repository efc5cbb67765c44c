//! Conversion between a procedure's linear body and its CFG.
//!
//! [`infer`] splits the linear stream into blocks and makes every edge explicit:
//!
//! - a body that does not start with a label gets a fresh entry label
//! - a label reached by falling through gets an explicit `jmp` to it
//! - a non-terminator after a conditional jump starts a new block with a fresh label,
//!   reached by an explicit `jmp`
//! - instructions after a `jmp` or `ret` with no label in between form an unreachable
//!   block with a fresh label
//! - a final block that falls off the end of the body gets a `ret`
//! - if anything jumps to the first block, a fresh entry block jumping to it is inserted
//!
//! [`linearize`] writes the blocks back in block order and drops a final `jmp` to the
//! block emitted next, so `infer(linearize(infer(p)))` has the same blocks as `infer(p)`.

use std::collections::HashSet;

use crate::{
    analysis::cfg::{Block, Cfg},
    tac::{Instr, Label, Op, Proc},
    Result,
};

/// Generates labels that do not clash with any label of a procedure.
#[derive(Debug)]
struct LabelGen {
    taken: HashSet<Label>,
    next: usize,
}

impl LabelGen {
    fn new<'a>(taken: impl IntoIterator<Item = &'a Label>) -> Self {
        Self {
            taken: taken.into_iter().cloned().collect(),
            next: 0,
        }
    }

    fn fresh(&mut self) -> Label {
        loop {
            let label = Label::new(format!("%.L{}", self.next));
            self.next += 1;
            if self.taken.insert(label.clone()) {
                return label;
            }
        }
    }
}

struct Splitter {
    blocks: Vec<Block>,
    current: Option<Block>,
    labels: LabelGen,
}

impl Splitter {
    fn open(&mut self, label: Label) {
        self.current = Some(Block::new(label, Vec::new(), Vec::new()));
    }

    /// Closes the current block, adding a `jmp` to `next` if control would fall through.
    fn close_into(&mut self, next: &Label) {
        if let Some(mut block) = self.current.take() {
            if !block.is_closed() {
                block.jumps.push(Instr::jump(next.clone()));
            }
            self.blocks.push(block);
        }
    }

    /// Returns the block an ordinary instruction should be appended to, starting a new one
    /// if the current block already has terminators.
    fn body_block(&mut self) -> &mut Block {
        let block = match self.current.take() {
            Some(block) if block.jumps.is_empty() => block,
            previous => self.successor_of(previous),
        };
        self.current.insert(block)
    }

    /// Finishes `previous` and returns a fresh block after it. Control falls into the fresh
    /// block unless `previous` ends in `jmp` or `ret`.
    fn successor_of(&mut self, previous: Option<Block>) -> Block {
        let label = self.labels.fresh();
        if let Some(mut block) = previous {
            if !block.is_closed() {
                block.jumps.push(Instr::jump(label.clone()));
            }
            self.blocks.push(block);
        }
        Block::new(label, Vec::new(), Vec::new())
    }
}

/// Builds the CFG of a procedure from its linear body.
///
/// # Errors
///
/// Returns [`crate::Error::Structural`] if a jump or phi refers to an undefined label, or
/// a label is defined twice.
pub fn infer(proc: &Proc) -> Result<Cfg> {
    let taken = proc.body.iter().filter_map(|i| match &i.op {
        Op::Label { label } => Some(label),
        _ => None,
    });

    let mut splitter = Splitter {
        blocks: Vec::new(),
        current: None,
        labels: LabelGen::new(taken),
    };

    for instr in &proc.body {
        match &instr.op {
            Op::Label { label } => {
                splitter.close_into(label);
                splitter.open(label.clone());
            }
            _ if instr.is_terminator() => {
                let mut block = match splitter.current.take() {
                    Some(block) if !block.is_closed() => block,
                    previous => splitter.successor_of(previous),
                };
                block.jumps.push(instr.clone());
                splitter.current = Some(block);
            }
            _ => splitter.body_block().body.push(instr.clone()),
        }
    }

    match splitter.current.take() {
        Some(mut block) => {
            if !block.is_closed() {
                block.jumps.push(Instr::ret(None));
            }
            splitter.blocks.push(block);
        }
        None => {
            let label = splitter.labels.fresh();
            splitter
                .blocks
                .push(Block::new(label, Vec::new(), vec![Instr::ret(None)]));
        }
    }

    let mut blocks = splitter.blocks;
    let first = blocks[0].label.clone();
    let entry_targeted = blocks
        .iter()
        .flat_map(|b| b.jumps.iter())
        .any(|j| j.target() == Some(&first));
    if entry_targeted {
        let entry = splitter.labels.fresh();
        log::trace!("{}: inserting entry block {} before {}", proc.name, entry, first);
        blocks.insert(0, Block::new(entry, Vec::new(), vec![Instr::jump(first)]));
    }

    Cfg::new(proc.name.clone(), blocks)
}

/// Writes a CFG back into the procedure's linear body, in block order.
///
/// A block's final `jmp` is omitted when its target is emitted immediately after it.
pub fn linearize(proc: &mut Proc, cfg: &Cfg) {
    let labels = cfg.labels();
    let mut body = Vec::with_capacity(cfg.instr_count() + labels.len());

    for (i, block) in cfg.blocks().enumerate() {
        body.push(Instr::label(block.label.clone()));
        body.extend(block.body.iter().cloned());

        let next = labels.get(i + 1);
        let skip_last = matches!(
            block.jumps.last(),
            Some(Instr { op: Op::Jump { target }, .. }) if Some(target) == next
        );
        let keep = block.jumps.len() - usize::from(skip_last);
        body.extend(block.jumps[..keep].iter().cloned());
    }

    proc.body = body;
}
