//! Reference interpreter for TAC programs.
//!
//! The interpreter executes the linear form of a program directly: `label` instructions
//! mark block boundaries, and the phi instructions at the head of a block are evaluated in
//! parallel using the label of the block control arrived from. It exists to check that
//! optimizations preserve observable behavior, so it favors clear faults over speed: reading
//! a temporary that was never written, a runtime division by zero or exceeding the step
//! limit all produce [`Error::Runtime`].
//!
//! Two builtins are provided:
//!
//! | Procedure          | Effect                                              |
//! |--------------------|-----------------------------------------------------|
//! | `@__bx_print_int`  | appends its argument in decimal to the output       |
//! | `@__bx_print_bool` | appends `true` for a non-zero argument, else `false` |

use std::collections::{BTreeMap, HashMap};

use crate::{
    tac::{Decl, Instr, Label, Op, Operand, Proc, Temp},
    Error, Result,
};

/// Default bound on executed instructions before the interpreter gives up.
pub const DEFAULT_STEP_LIMIT: u64 = 50_000_000;

const MAX_CALL_DEPTH: usize = 2_000;

const PRINT_INT: &str = "@__bx_print_int";
const PRINT_BOOL: &str = "@__bx_print_bool";

/// The observable result of running a program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Lines printed by the builtins, in order.
    pub output: Vec<String>,
    /// The value returned by the entry procedure, if any.
    pub result: Option<i64>,
    /// Number of instructions executed.
    pub steps: u64,
}

/// Executes `entry` with `args` in the program `decls`.
///
/// # Errors
///
/// Returns [`Error::UnknownProcedure`] if `entry` or a called procedure is not declared, and
/// [`Error::Runtime`] for faults during execution.
pub fn execute(decls: &[Decl], entry: &str, args: &[i64]) -> Result<ExecOutcome> {
    Interpreter::new(decls).run(entry, args)
}

/// Interpreter state for one program run.
pub struct Interpreter<'a> {
    procs: HashMap<&'a str, &'a Proc>,
    globals: HashMap<&'a str, i64>,
    output: Vec<String>,
    steps: u64,
    step_limit: u64,
    depth: usize,
}

impl<'a> Interpreter<'a> {
    /// Prepares to run the program `decls` with globals at their initial values.
    #[must_use]
    pub fn new(decls: &'a [Decl]) -> Self {
        let mut procs = HashMap::new();
        let mut globals = HashMap::new();
        for decl in decls {
            match decl {
                Decl::Var(gvar) => {
                    globals.insert(gvar.name.as_str(), gvar.init);
                }
                Decl::Proc(proc) => {
                    procs.insert(proc.name.as_str(), proc);
                }
            }
        }

        Self {
            procs,
            globals,
            output: Vec::new(),
            steps: 0,
            step_limit: DEFAULT_STEP_LIMIT,
            depth: 0,
        }
    }

    /// Sets the number of instructions after which execution is aborted.
    #[must_use]
    pub fn with_step_limit(mut self, step_limit: u64) -> Self {
        self.step_limit = step_limit;
        self
    }

    /// Runs `entry` to completion.
    ///
    /// # Errors
    ///
    /// See [`execute`].
    pub fn run(mut self, entry: &str, args: &[i64]) -> Result<ExecOutcome> {
        let result = self.call(entry, args.to_vec())?;
        Ok(ExecOutcome {
            output: self.output,
            result,
            steps: self.steps,
        })
    }

    fn call(&mut self, name: &str, args: Vec<i64>) -> Result<Option<i64>> {
        match name {
            PRINT_INT => {
                let value = single_arg(name, &args)?;
                self.output.push(value.to_string());
                return Ok(None);
            }
            PRINT_BOOL => {
                let value = single_arg(name, &args)?;
                self.output.push((value != 0).to_string());
                return Ok(None);
            }
            _ => {}
        }

        let proc = *self
            .procs
            .get(name)
            .ok_or_else(|| Error::UnknownProcedure(name.to_string()))?;

        if args.len() != proc.params.len() {
            return Err(Error::Runtime(format!(
                "{} expects {} arguments, got {}",
                name,
                proc.params.len(),
                args.len()
            )));
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(Error::Runtime(format!("call depth exceeded in {name}")));
        }

        self.depth += 1;
        let result = self.run_body(proc, args);
        self.depth -= 1;
        result
    }

    fn run_body(&mut self, proc: &'a Proc, args: Vec<i64>) -> Result<Option<i64>> {
        let body = &proc.body;
        let labels: HashMap<&Label, usize> = body
            .iter()
            .enumerate()
            .filter_map(|(i, instr)| match &instr.op {
                Op::Label { label } => Some((label, i)),
                _ => None,
            })
            .collect();

        let mut locals: HashMap<Temp, i64> = proc.params.iter().cloned().zip(args).collect();
        let mut pending: BTreeMap<u32, i64> = BTreeMap::new();
        let mut previous: Option<&Label> = None;
        let mut current: Option<&Label> = None;
        let mut pc = 0;

        let jump = |target: &Label| -> Result<usize> {
            labels
                .get(target)
                .copied()
                .ok_or_else(|| Error::Runtime(format!("jump to undefined label {target}")))
        };

        while pc < body.len() {
            self.tick()?;
            let instr = &body[pc];

            if instr.is_phi() {
                let end = body[pc..]
                    .iter()
                    .position(|i| !i.is_phi())
                    .map_or(body.len(), |n| pc + n);
                self.eval_phis(&body[pc..end], previous, &mut locals)?;
                pc = end;
                continue;
            }

            pc += 1;
            match &instr.op {
                Op::Nop => {}
                Op::Label { label } => {
                    previous = current;
                    current = Some(label);
                }
                Op::Const { value } => self.write(instr, *value, &mut locals),
                Op::Copy { src } => {
                    let value = self.read(src, &locals)?;
                    self.write(instr, value, &mut locals);
                }
                Op::Unary { op, operand } => {
                    let value = op.eval(self.read(operand, &locals)?);
                    self.write(instr, value, &mut locals);
                }
                Op::Binary { op, left, right } => {
                    let u = self.read(left, &locals)?;
                    let v = self.read(right, &locals)?;
                    let value = op.eval(u, v).ok_or_else(|| {
                        Error::Runtime(format!("{op} of {u} by {v} faulted in {}", proc.name))
                    })?;
                    self.write(instr, value, &mut locals);
                }
                Op::Param { index, value } => {
                    let value = self.read(value, &locals)?;
                    pending.insert(*index, value);
                }
                Op::Call { target, argc } => {
                    let args = (1..=*argc)
                        .map(|i| {
                            pending.get(&i).copied().ok_or_else(|| {
                                Error::Runtime(format!("call to {target} is missing param {i}"))
                            })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    pending.clear();

                    match (self.call(target, args)?, &instr.dest) {
                        (Some(value), Some(_)) => self.write(instr, value, &mut locals),
                        (None, Some(dest)) => {
                            locals.remove(dest);
                        }
                        (_, None) => {}
                    }
                }
                Op::Jump { target } => pc = jump(target)?,
                Op::Branch {
                    cond,
                    value,
                    target,
                } => {
                    if cond.holds(self.read(value, &locals)?) {
                        pc = jump(target)?;
                    }
                }
                Op::Ret { value } => {
                    return value.as_ref().map(|v| self.read(v, &locals)).transpose();
                }
                // evaluated as a group above
                Op::Phi { .. } => {}
            }
        }

        Ok(None)
    }

    /// Evaluates a group of phis in parallel: every source is read before any destination is
    /// written. A source that was never written leaves its destination undefined.
    fn eval_phis(
        &self,
        phis: &[Instr],
        previous: Option<&Label>,
        locals: &mut HashMap<Temp, i64>,
    ) -> Result<()> {
        let Some(previous) = previous else {
            return Err(Error::Runtime("phi executed without a predecessor block".to_string()));
        };

        let mut updates = Vec::with_capacity(phis.len());
        for phi in phis {
            let (Some(dest), Some(sources)) = (&phi.dest, phi.phi_sources()) else {
                continue;
            };
            let source = sources.get(previous).ok_or_else(|| {
                Error::Runtime(format!("{dest} has no phi source for {previous}"))
            })?;
            updates.push((dest, self.read(source, locals).ok()));
        }

        for (dest, value) in updates {
            match value {
                Some(v) => {
                    locals.insert(dest.clone(), v);
                }
                None => {
                    locals.remove(dest);
                }
            }
        }
        Ok(())
    }

    fn read(&self, operand: &Operand, locals: &HashMap<Temp, i64>) -> Result<i64> {
        match operand {
            Operand::Imm(v) => Ok(*v),
            Operand::Temp(t) if t.is_global() => self
                .globals
                .get(t.as_str())
                .copied()
                .ok_or_else(|| Error::Runtime(format!("read of undeclared global {t}"))),
            Operand::Temp(t) => locals
                .get(t)
                .copied()
                .ok_or_else(|| Error::Runtime(format!("read of undefined temporary {t}"))),
        }
    }

    fn write(&mut self, instr: &Instr, value: i64, locals: &mut HashMap<Temp, i64>) {
        let Some(dest) = &instr.dest else {
            return;
        };
        if dest.is_global() {
            if let Some(slot) = self.globals.get_mut(dest.as_str()) {
                *slot = value;
            }
        } else {
            locals.insert(dest.clone(), value);
        }
    }

    fn tick(&mut self) -> Result<()> {
        self.steps += 1;
        if self.steps > self.step_limit {
            return Err(Error::Runtime(format!(
                "step limit of {} instructions exceeded",
                self.step_limit
            )));
        }
        Ok(())
    }
}

fn single_arg(name: &str, args: &[i64]) -> Result<i64> {
    match args {
        [value] => Ok(*value),
        _ => Err(Error::Runtime(format!(
            "{name} expects 1 argument, got {}",
            args.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tac::{parse_tac, BinaryOp, Condition, Gvar};

    fn main_proc(body: Vec<Instr>) -> Vec<Decl> {
        vec![Decl::Proc(Proc::new("@main", Vec::new(), body))]
    }

    fn print(operand: impl Into<Operand>) -> [Instr; 2] {
        [
            Instr::param(1, operand),
            Instr::call(None, "@__bx_print_int", 1),
        ]
    }

    #[test]
    fn test_straight_line() {
        let mut body = vec![
            Instr::constant("%0", 6),
            Instr::constant("%1", 7),
            Instr::binary("%2", BinaryOp::Mul, "%0", "%1"),
        ];
        body.extend(print("%2"));
        body.push(Instr::ret(Some(Operand::from("%2"))));

        let outcome = execute(&main_proc(body), "@main", &[]).unwrap();
        assert_eq!(outcome.output, vec!["42"]);
        assert_eq!(outcome.result, Some(42));
        assert_eq!(outcome.steps, 6);
    }

    #[test]
    fn test_loop_with_phis() {
        // Sum 1..=4 with a loop whose header carries two phis.
        let mut body = vec![
            Instr::label("%.L0"),
            Instr::constant("%i.0", 1),
            Instr::constant("%s.0", 0),
            Instr::jump("%.L1"),
            Instr::label("%.L1"),
            Instr::phi("%i.1", [("%.L0", "%i.0"), ("%.L2", "%i.2")]),
            Instr::phi("%s.1", [("%.L0", "%s.0"), ("%.L2", "%s.2")]),
            Instr::binary("%c", BinaryOp::Sub, "%i.1", 5),
            Instr::branch(Condition::Jnl, "%c", "%.L3"),
            Instr::jump("%.L2"),
            Instr::label("%.L2"),
            Instr::binary("%s.2", BinaryOp::Add, "%s.1", "%i.1"),
            Instr::binary("%i.2", BinaryOp::Add, "%i.1", 1),
            Instr::jump("%.L1"),
            Instr::label("%.L3"),
        ];
        body.extend(print("%s.1"));
        body.push(Instr::ret(None));

        let outcome = execute(&main_proc(body), "@main", &[]).unwrap();
        assert_eq!(outcome.output, vec!["10"]);
    }

    #[test]
    fn test_parallel_phi_swap() {
        let mut body = vec![
            Instr::label("%.L0"),
            Instr::constant("%a.0", 1),
            Instr::constant("%b.0", 2),
            Instr::constant("%n.0", 0),
            Instr::jump("%.L1"),
            Instr::label("%.L1"),
            Instr::phi("%a.1", [("%.L0", "%a.0"), ("%.L1", "%b.1")]),
            Instr::phi("%b.1", [("%.L0", "%b.0"), ("%.L1", "%a.1")]),
            Instr::phi("%n.1", [("%.L0", "%n.0"), ("%.L1", "%n.2")]),
            Instr::binary("%n.2", BinaryOp::Add, "%n.1", 1),
            Instr::binary("%t", BinaryOp::Sub, "%n.2", 3),
            Instr::branch(Condition::Jl, "%t", "%.L1"),
        ];
        body.extend(print("%a.1"));
        body.extend(print("%b.1"));
        body.push(Instr::ret(None));

        // The back edge is taken twice, so the pair is swapped back.
        let outcome = execute(&main_proc(body), "@main", &[]).unwrap();
        assert_eq!(outcome.output, vec!["1", "2"]);
    }

    #[test]
    fn test_calls_and_globals() {
        let decls = parse_tac(
            r#"[
            {"var": "@total", "init": 100},
            {"proc": "@twice", "args": ["%x"], "body": [
                {"opcode": "add", "args": ["%x", "%x"], "result": "%0"},
                {"opcode": "add", "args": ["@total", "%0"], "result": "@total"},
                {"opcode": "ret", "args": ["%0"], "result": null}
            ]},
            {"proc": "@main", "args": [], "body": [
                {"opcode": "param", "args": [1, 21], "result": null},
                {"opcode": "call", "args": ["@twice", 1], "result": "%r"},
                {"opcode": "param", "args": [1, "%r"], "result": null},
                {"opcode": "call", "args": ["@__bx_print_int", 1], "result": null},
                {"opcode": "param", "args": [1, "@total"], "result": null},
                {"opcode": "call", "args": ["@__bx_print_int", 1], "result": null},
                {"opcode": "param", "args": [1, 0], "result": null},
                {"opcode": "call", "args": ["@__bx_print_bool", 1], "result": null},
                {"opcode": "ret", "args": [], "result": null}
            ]}
        ]"#,
        )
        .unwrap();

        let outcome = execute(&decls, "@main", &[]).unwrap();
        assert_eq!(outcome.output, vec!["42", "142", "false"]);
    }

    #[test]
    fn test_runtime_faults() {
        let div = main_proc(vec![
            Instr::constant("%0", 0),
            Instr::binary("%1", BinaryOp::Div, 1, "%0"),
            Instr::ret(None),
        ]);
        assert!(matches!(execute(&div, "@main", &[]), Err(Error::Runtime(_))));

        let undefined = main_proc(vec![Instr::copy("%1", "%0"), Instr::ret(None)]);
        assert!(matches!(
            execute(&undefined, "@main", &[]),
            Err(Error::Runtime(_))
        ));

        assert!(matches!(
            execute(&undefined, "@missing", &[]),
            Err(Error::UnknownProcedure(_))
        ));
    }

    #[test]
    fn test_step_limit() {
        let spin = main_proc(vec![Instr::label("%.L0"), Instr::jump("%.L0")]);
        let result = Interpreter::new(&spin).with_step_limit(100).run("@main", &[]);
        assert!(matches!(result, Err(Error::Runtime(_))));
    }

    #[test]
    fn test_entry_arguments() {
        let decls = vec![
            Decl::Var(Gvar::new("@unused", 0)),
            Decl::Proc(Proc::new(
                "@neg",
                vec![Temp::new("%x")],
                vec![
                    Instr::unary("%0", crate::tac::UnaryOp::Neg, "%x"),
                    Instr::ret(Some(Operand::from("%0"))),
                ],
            )),
        ];
        let outcome = execute(&decls, "@neg", &[5]).unwrap();
        assert_eq!(outcome.result, Some(-5));
        assert!(execute(&decls, "@neg", &[]).is_err());
    }
}
