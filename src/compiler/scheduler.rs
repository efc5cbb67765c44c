//! Pipeline scheduler for running the optimization passes over a TAC program.
//!
//! The [`Pipeline`] takes every procedure of a program through the same fixed sequence:
//!
//! 1. **CFG inference** from the linear body
//! 2. **Crude SSA construction**
//! 3. **SSA minimization** (optional)
//! 4. **SCCP** (optional)
//! 5. **CSE** (optional)
//! 6. **Copy propagation** (optional)
//! 7. **Linearization** back into the procedure body
//!
//! The order is fixed: SCCP's phi merge, CSE's availability argument and copy propagation
//! all depend on the single-assignment form established by step 2.
//!
//! Procedures share no state, so they are optimized in parallel with rayon unless
//! [`PipelineConfig::parallel`] is turned off. All passes record into one shared
//! [`EventLog`].

use rayon::prelude::*;

use crate::{
    analysis::{
        cfg::{infer, linearize, Cfg},
        ssa::crude_ssagen,
    },
    compiler::{
        pass::OptPass,
        passes::{
            CommonSubexpressionPass, ConstantPropagationPass, CopyPropagationPass,
            SsaMinimizationPass,
        },
        EventKind, EventLog,
    },
    tac::{Decl, Proc},
    Result,
};

/// Which passes the [`Pipeline`] runs and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Run SSA minimization.
    pub minimize: bool,
    /// Run sparse conditional constant propagation.
    pub sccp: bool,
    /// Run common subexpression elimination.
    pub cse: bool,
    /// Run global copy propagation.
    pub copy_prop: bool,
    /// Optimize procedures in parallel.
    pub parallel: bool,
    /// Maximum number of SSA minimization rounds.
    pub max_rounds: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            minimize: true,
            sccp: true,
            cse: true,
            copy_prop: true,
            parallel: true,
            max_rounds: SsaMinimizationPass::DEFAULT_MAX_ROUNDS,
        }
    }
}

impl PipelineConfig {
    /// A configuration that only builds SSA form and linearizes it again.
    #[must_use]
    pub fn ssa_only() -> Self {
        Self {
            minimize: false,
            sccp: false,
            cse: false,
            copy_prop: false,
            ..Self::default()
        }
    }
}

/// Runs the optimization passes over every procedure of a program.
pub struct Pipeline {
    config: PipelineConfig,
    passes: Vec<Box<dyn OptPass>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Pipeline {
    /// Creates a pipeline running the passes enabled in `config`.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let mut passes: Vec<Box<dyn OptPass>> = Vec::with_capacity(4);
        if config.minimize {
            passes.push(Box::new(SsaMinimizationPass::with_max_rounds(
                config.max_rounds,
            )));
        }
        if config.sccp {
            passes.push(Box::new(ConstantPropagationPass::new()));
        }
        if config.cse {
            passes.push(Box::new(CommonSubexpressionPass::new()));
        }
        if config.copy_prop {
            passes.push(Box::new(CopyPropagationPass::new()));
        }
        Self { config, passes }
    }

    /// Returns the configuration this pipeline was built from.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the names of the enabled passes in the order they run.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Runs the enabled passes on a CFG already in SSA form.
    ///
    /// Returns `true` if any pass changed the CFG.
    ///
    /// # Errors
    ///
    /// Returns an error if a pass reports an invariant violation or leaves the CFG
    /// structurally invalid.
    pub fn optimize_cfg(&self, cfg: &mut Cfg, events: &EventLog) -> Result<bool> {
        let mut changed = false;
        for pass in &self.passes {
            events
                .record(EventKind::PassStarted)
                .proc(cfg.proc_name())
                .pass(pass.name());

            let pass_changed = pass.run(cfg, events)?;
            cfg.validate()?;

            events
                .record(EventKind::PassCompleted)
                .proc(cfg.proc_name())
                .pass(pass.name())
                .message(if pass_changed { "changed" } else { "unchanged" });
            log::debug!(
                "{} on {}: {}",
                pass.name(),
                cfg.proc_name(),
                if pass_changed { "changed" } else { "unchanged" }
            );
            changed |= pass_changed;
        }
        Ok(changed)
    }

    /// Optimizes one procedure in place.
    ///
    /// Returns `true` if any pass changed the procedure.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Structural`] if the body does not form a valid CFG, or any
    /// error reported by a pass.
    pub fn optimize_proc(&self, proc: &mut Proc, events: &EventLog) -> Result<bool> {
        let mut cfg = infer(proc)?;
        let before = cfg.instr_count();

        let phis = crude_ssagen(proc, &mut cfg);
        events.info(format!(
            "{}: {} phis placed in {} blocks",
            proc.name,
            phis,
            cfg.len()
        ));
        log::debug!(
            "{}: {} blocks, {} instructions, {} phis after SSA construction",
            proc.name,
            cfg.len(),
            before,
            phis
        );

        let changed = self.optimize_cfg(&mut cfg, events)?;
        linearize(proc, &cfg);

        log::debug!(
            "{}: {} -> {} instructions",
            proc.name,
            before,
            cfg.instr_count()
        );
        Ok(changed)
    }

    /// Optimizes every procedure of `decls` in place.
    ///
    /// Global variables are left untouched. Returns the events recorded by all passes.
    ///
    /// # Errors
    ///
    /// Returns the first error any procedure fails with; the remaining procedures may or
    /// may not have been optimized.
    pub fn run(&self, decls: &mut [Decl]) -> Result<EventLog> {
        let events = EventLog::new();
        let optimize = |decl: &mut Decl| -> Result<()> {
            if let Decl::Proc(proc) = decl {
                self.optimize_proc(proc, &events)?;
            }
            Ok(())
        };

        if self.config.parallel {
            decls.par_iter_mut().try_for_each(optimize)?;
        } else {
            decls.iter_mut().try_for_each(optimize)?;
        }

        log::debug!(
            "pipeline [{}]: {}",
            self.pass_names().join(", "),
            events.summary()
        );
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tac::{execute, parse_tac, Instr, Op, Operand};

    const PROGRAM: &str = r#"[
        {"var": "@count", "init": 3},
        {"proc": "@main", "args": [], "body": [
            {"opcode": "const", "args": [2], "result": "%a"},
            {"opcode": "const", "args": [3], "result": "%b"},
            {"opcode": "add", "args": ["%a", "%b"], "result": "%0"},
            {"opcode": "param", "args": [1, "%0"], "result": null},
            {"opcode": "call", "args": ["@__bx_print_int", 1], "result": null},
            {"opcode": "param", "args": [1, 6], "result": null},
            {"opcode": "call", "args": ["@square", 1], "result": "%1"},
            {"opcode": "param", "args": [1, "%1"], "result": null},
            {"opcode": "call", "args": ["@__bx_print_int", 1], "result": null},
            {"opcode": "ret", "args": [], "result": null}
        ]},
        {"proc": "@square", "args": ["%x"], "body": [
            {"opcode": "mul", "args": ["%x", "%x"], "result": "%0"},
            {"opcode": "mul", "args": ["%x", "%x"], "result": "%1"},
            {"opcode": "add", "args": ["%0", "%1"], "result": "%2"},
            {"opcode": "sub", "args": ["%2", "%0"], "result": "%3"},
            {"opcode": "ret", "args": ["%3"], "result": null}
        ]}
    ]"#;

    #[test]
    fn test_default_pass_order() {
        let pipeline = Pipeline::default();
        assert_eq!(
            pipeline.pass_names(),
            vec!["ssa-minimization", "sccp", "cse", "copy-propagation"]
        );
        assert!(Pipeline::new(PipelineConfig::ssa_only())
            .pass_names()
            .is_empty());
    }

    #[test]
    fn test_run_preserves_output() {
        let mut decls = parse_tac(PROGRAM).unwrap();
        let before = execute(&decls, "@main", &[]).unwrap();

        let events = Pipeline::default().run(&mut decls).unwrap();
        let after = execute(&decls, "@main", &[]).unwrap();

        assert_eq!(before.output, vec!["5", "36"]);
        assert_eq!(after.output, before.output);
        assert!(events.transformation_count() > 0);
        assert_eq!(events.count_kind(EventKind::PassStarted), 8);
        assert_eq!(events.count_kind(EventKind::PassCompleted), 8);
        assert!(matches!(decls[0], Decl::Var(_)));
    }

    #[test]
    fn test_constant_print_folds() {
        let mut decls = parse_tac(PROGRAM).unwrap();
        Pipeline::default().run(&mut decls).unwrap();

        let main = decls[1].as_proc().unwrap();
        assert!(main.body.contains(&Instr::param(1, 5)));
        assert!(!main
            .body
            .iter()
            .any(|i| matches!(i.op, Op::Binary { .. })));
    }

    #[test]
    fn test_cse_in_callee() {
        let mut decls = parse_tac(PROGRAM).unwrap();
        Pipeline::default().run(&mut decls).unwrap();

        let square = decls[2].as_proc().unwrap();
        let muls = square
            .body
            .iter()
            .filter(|i| i.opcode() == crate::tac::Opcode::Mul)
            .count();
        assert_eq!(muls, 1);
        assert!(!square.body.iter().any(|i| matches!(i.op, Op::Copy { .. })));
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let mut parallel = parse_tac(PROGRAM).unwrap();
        let mut sequential = parallel.clone();

        Pipeline::default().run(&mut parallel).unwrap();
        Pipeline::new(PipelineConfig {
            parallel: false,
            ..PipelineConfig::default()
        })
        .run(&mut sequential)
        .unwrap();

        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_ssa_only_keeps_semantics() {
        let mut decls = parse_tac(PROGRAM).unwrap();
        let events = Pipeline::new(PipelineConfig::ssa_only())
            .run(&mut decls)
            .unwrap();

        assert_eq!(events.transformation_count(), 0);
        assert_eq!(events.count_kind(EventKind::Info), 2);
        let main = decls[1].as_proc().unwrap();
        assert!(main
            .body
            .iter()
            .any(|i| i.uses().contains(&&Operand::Temp("%0.0".into()))));
        assert_eq!(
            execute(&decls, "@main", &[]).unwrap().output,
            vec!["5", "36"]
        );
    }
}
