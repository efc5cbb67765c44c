//! Change tracking for the optimization pipeline.
//!
//! Every rewrite a pass performs is recorded as an [`Event`] in a shared [`EventLog`],
//! together with pass boundaries and warnings about odd input. The log is what the CLI
//! reports with `-v` and what tests assert on; the optimizer itself never reads it.
//!
//! # Example
//!
//! ```rust
//! use tacopt::compiler::{EventKind, EventLog};
//! use tacopt::tac::Label;
//!
//! let log = EventLog::new();
//!
//! log.record(EventKind::ConstantFolded)
//!     .at("@main", &Label::new("%.L0"))
//!     .message("%2 = 5");
//! log.warn("%.L4 has no exit");
//!
//! assert_eq!(log.count_kind(EventKind::ConstantFolded), 1);
//! assert_eq!(log.summary(), "1 constant folded");
//! ```

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use crate::tac::Label;

/// What an [`Event`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// A temporary was proven constant and its uses replaced by the value.
    ConstantFolded,
    /// A conditional jump was resolved at compile time.
    BranchSimplified,
    /// A dead or undefined instruction was deleted.
    InstructionRemoved,
    /// A block that can never execute was deleted.
    BlockRemoved,
    /// A redundant phi was removed.
    PhiSimplified,
    /// A recomputation was replaced by a copy of an earlier result.
    ExpressionEliminated,
    /// A copy was deleted and the reads of its destination rewritten to its source.
    CopyPropagated,

    /// A pass started on a procedure.
    PassStarted,
    /// A pass completed on a procedure.
    PassCompleted,

    /// Statistics about a procedure, such as the phis placed by SSA construction.
    Info,
    /// Input the optimizer had to patch up, such as a block left without an exit.
    Warning,
}

impl EventKind {
    /// Returns the lowercase name used in summaries and tables.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::ConstantFolded => "constant folded",
            Self::BranchSimplified => "branch simplified",
            Self::InstructionRemoved => "instruction removed",
            Self::BlockRemoved => "block removed",
            Self::PhiSimplified => "phi simplified",
            Self::ExpressionEliminated => "expression eliminated",
            Self::CopyPropagated => "copy propagated",
            Self::PassStarted => "pass started",
            Self::PassCompleted => "pass completed",
            Self::Info => "info",
            Self::Warning => "warning",
        }
    }

    /// Returns `true` for events that describe a rewrite of the code.
    #[must_use]
    pub fn is_transformation(&self) -> bool {
        matches!(
            self,
            Self::ConstantFolded
                | Self::BranchSimplified
                | Self::InstructionRemoved
                | Self::BlockRemoved
                | Self::PhiSimplified
                | Self::ExpressionEliminated
                | Self::CopyPropagated
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// One recorded change or diagnostic.
#[derive(Debug, Clone)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// The procedure it happened in.
    pub proc: Option<String>,
    /// The block it happened in.
    pub block: Option<Label>,
    /// The rewritten instruction or a free-form note.
    pub message: String,
    /// The pass that recorded it.
    pub pass: Option<&'static str>,
}

impl Event {
    fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            proc: None,
            block: None,
            message: message.into(),
            pass: None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(proc) = &self.proc {
            write!(f, " {proc}")?;
        }
        if let Some(block) = &self.block {
            write!(f, " {block}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Fills in an event's location and message.
///
/// Returned by [`EventLog::record`]; the event is appended when the builder drops, so a
/// bare `log.record(kind);` records an event with the default message.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    kind: EventKind,
    proc: Option<String>,
    block: Option<Label>,
    message: Option<String>,
    pass: Option<&'static str>,
}

impl<'a> EventBuilder<'a> {
    fn new(log: &'a EventLog, kind: EventKind) -> Self {
        Self {
            log,
            kind,
            proc: None,
            block: None,
            message: None,
            pass: None,
        }
    }

    /// Locates the event at a block of a procedure.
    pub fn at(mut self, proc: &str, block: &Label) -> Self {
        self.proc = Some(proc.to_string());
        self.block = Some(block.clone());
        self
    }

    /// Locates the event in a procedure without naming a block.
    pub fn proc(mut self, proc: &str) -> Self {
        self.proc = Some(proc.to_string());
        self
    }

    /// Replaces the default message.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Names the pass recording the event.
    pub fn pass(mut self, pass_name: &'static str) -> Self {
        self.pass = Some(pass_name);
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        self.log.events.push(Event {
            kind: self.kind,
            proc: self.proc.take(),
            block: self.block.take(),
            message,
            pass: self.pass.take(),
        });
    }
}

/// Append-only log of the events of one pipeline run.
///
/// Appending takes `&self`, so procedures optimized on different rayon workers record into
/// the same log. Counts and summaries are computed from the events on demand.
#[derive(Debug)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Starts an event of `kind`.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder::new(self, kind)
    }

    /// Records an informational note that belongs to no particular pass.
    pub fn info(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Info, message));
    }

    /// Records a warning that belongs to no particular pass.
    pub fn warn(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Warning, message));
    }

    /// Returns `true` if an event of `kind` was recorded.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.iter().any(|e| e.kind == kind)
    }

    /// Counts the events of `kind`.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.filter_kind(kind).count()
    }

    /// Iterates over the events in recording order, per thread.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Iterates over the events of `kind`.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.kind == kind)
    }

    /// Iterates over the rewrites, skipping bookkeeping and warnings.
    pub fn transformations(&self) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(|e| e.kind.is_transformation())
    }

    /// Iterates over the warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &Event> + '_ {
        self.filter_kind(EventKind::Warning)
    }

    /// Counts the events of every kind that occurs.
    #[must_use]
    pub fn count_by_kind(&self) -> HashMap<EventKind, usize> {
        let mut counts = HashMap::new();
        for event in self.iter() {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Returns the number of rewrites.
    #[must_use]
    pub fn transformation_count(&self) -> usize {
        self.transformations().count()
    }

    /// Returns the number of procedures with at least one rewrite.
    #[must_use]
    pub fn procs_affected(&self) -> usize {
        self.transformations()
            .filter_map(|e| e.proc.as_deref())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Summarizes the rewrites as `"<count> <kind>"` pairs in alphabetical order.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no events".to_string();
        }

        let mut parts: Vec<String> = self
            .count_by_kind()
            .into_iter()
            .filter(|(k, _)| k.is_transformation())
            .map(|(kind, count)| format!("{} {}", count, kind.description()))
            .collect();

        if parts.is_empty() {
            return format!("{} events", self.len());
        }

        parts.sort();
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_record_and_query() {
        let log = EventLog::new();
        assert!(log.is_empty());

        log.record(EventKind::BlockRemoved)
            .at("@f", &Label::new("%.L3"))
            .pass("sccp");
        log.record(EventKind::PhiSimplified).proc("@g");
        log.warn("odd input");

        assert_eq!(log.len(), 3);
        assert!(log.has(EventKind::BlockRemoved));
        assert!(!log.has(EventKind::ExpressionEliminated));
        assert_eq!(log.transformation_count(), 2);
        assert_eq!(log.procs_affected(), 2);
        assert_eq!(log.warnings().count(), 1);
        assert_eq!(
            log.filter_kind(EventKind::BlockRemoved)
                .next()
                .and_then(|e| e.pass),
            Some("sccp")
        );

        let first = log.iter().next().unwrap();
        assert_eq!(first.message, "block removed");
        assert_eq!(first.to_string(), "[block removed] @f %.L3: block removed");
    }

    #[test]
    fn test_summary() {
        let log = EventLog::new();
        assert_eq!(log.summary(), "no events");

        log.info("hello");
        log.warn("careful");
        assert_eq!(log.summary(), "2 events");

        log.record(EventKind::ConstantFolded);
        log.record(EventKind::ConstantFolded);
        log.record(EventKind::BranchSimplified);
        assert_eq!(log.summary(), "1 branch simplified, 2 constant folded");
    }

    #[test]
    fn test_concurrent_append() {
        let log = EventLog::new();
        thread::scope(|s| {
            for i in 0..4 {
                let log = &log;
                s.spawn(move || {
                    for _ in 0..25 {
                        log.record(EventKind::InstructionRemoved)
                            .proc(&format!("@p{i}"));
                    }
                });
            }
        });
        assert_eq!(log.count_kind(EventKind::InstructionRemoved), 100);
        assert_eq!(log.procs_affected(), 4);
    }
}
