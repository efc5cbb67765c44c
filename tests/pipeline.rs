//! End-to-end pipeline tests.
//!
//! Every program is run through the reference interpreter before and after optimization
//! under several pipeline configurations; output and return value must not change.

use tacopt::{
    analysis::{infer, linearize, Cfg},
    compiler::{EventKind, Pipeline, PipelineConfig},
    tac::{execute, parse_tac, to_json, Decl, Opcode},
    Result,
};

/// Sum of 0..10 with a loop, a nested conditional and a helper procedure.
const LOOPS: &str = r#"[
    {"var": "@total", "init": 0},
    {"proc": "@main", "args": [], "body": [
        {"opcode": "const", "args": [0], "result": "%i"},
        {"opcode": "const", "args": [10], "result": "%n"},
        {"opcode": "label", "args": ["%.L1"], "result": null},
        {"opcode": "sub", "args": ["%i", "%n"], "result": "%0"},
        {"opcode": "jnl", "args": ["%0", "%.L3"], "result": null},
        {"opcode": "mod", "args": ["%i", 2], "result": "%1"},
        {"opcode": "jz", "args": ["%1", "%.L2"], "result": null},
        {"opcode": "param", "args": [1, "%i"], "result": null},
        {"opcode": "call", "args": ["@twice", 1], "result": "%2"},
        {"opcode": "add", "args": ["@total", "%2"], "result": "@total"},
        {"opcode": "label", "args": ["%.L2"], "result": null},
        {"opcode": "add", "args": ["%i", 1], "result": "%i"},
        {"opcode": "jmp", "args": ["%.L1"], "result": null},
        {"opcode": "label", "args": ["%.L3"], "result": null},
        {"opcode": "param", "args": [1, "@total"], "result": null},
        {"opcode": "call", "args": ["@__bx_print_int", 1], "result": null},
        {"opcode": "ret", "args": [], "result": null}
    ]},
    {"proc": "@twice", "args": ["%x"], "body": [
        {"opcode": "add", "args": ["%x", "%x"], "result": "%0"},
        {"opcode": "ret", "args": ["%0"], "result": null}
    ]}
]"#;

/// Constant conditions, a dead division by zero and redundant arithmetic.
const CONSTANTS: &str = r#"[
    {"proc": "@main", "args": [], "body": [
        {"opcode": "const", "args": [6], "result": "%a"},
        {"opcode": "const", "args": [7], "result": "%b"},
        {"opcode": "mul", "args": ["%a", "%b"], "result": "%0"},
        {"opcode": "sub", "args": ["%0", 42], "result": "%1"},
        {"opcode": "jz", "args": ["%1", "%.L1"], "result": null},
        {"opcode": "const", "args": [0], "result": "%z"},
        {"opcode": "div", "args": ["%a", "%z"], "result": "%2"},
        {"opcode": "param", "args": [1, "%2"], "result": null},
        {"opcode": "call", "args": ["@__bx_print_int", 1], "result": null},
        {"opcode": "label", "args": ["%.L1"], "result": null},
        {"opcode": "neg", "args": ["%0"], "result": "%3"},
        {"opcode": "param", "args": [1, "%3"], "result": null},
        {"opcode": "call", "args": ["@__bx_print_int", 1], "result": null},
        {"opcode": "param", "args": [1, "%1"], "result": null},
        {"opcode": "call", "args": ["@__bx_print_bool", 1], "result": null},
        {"opcode": "ret", "args": ["%0"], "result": null}
    ]}
]"#;

/// Redundant expressions along dominators, with a reassigned surface variable.
const EXPRESSIONS: &str = r#"[
    {"proc": "@main", "args": [], "body": [
        {"opcode": "param", "args": [1, 5], "result": null},
        {"opcode": "param", "args": [2, 3], "result": null},
        {"opcode": "call", "args": ["@f", 2], "result": "%r"},
        {"opcode": "param", "args": [1, "%r"], "result": null},
        {"opcode": "call", "args": ["@__bx_print_int", 1], "result": null},
        {"opcode": "param", "args": [1, -4], "result": null},
        {"opcode": "param", "args": [2, 9], "result": null},
        {"opcode": "call", "args": ["@f", 2], "result": "%r"},
        {"opcode": "param", "args": [1, "%r"], "result": null},
        {"opcode": "call", "args": ["@__bx_print_int", 1], "result": null},
        {"opcode": "ret", "args": [], "result": null}
    ]},
    {"proc": "@f", "args": ["%a", "%b"], "body": [
        {"opcode": "mul", "args": ["%a", "%b"], "result": "%p"},
        {"opcode": "jl", "args": ["%a", "%.Lneg"], "result": null},
        {"opcode": "mul", "args": ["%a", "%b"], "result": "%q"},
        {"opcode": "add", "args": ["%p", "%q"], "result": "%p"},
        {"opcode": "jmp", "args": ["%.Lend"], "result": null},
        {"opcode": "label", "args": ["%.Lneg"], "result": null},
        {"opcode": "const", "args": [1], "result": "%a"},
        {"opcode": "mul", "args": ["%a", "%b"], "result": "%q"},
        {"opcode": "sub", "args": ["%p", "%q"], "result": "%p"},
        {"opcode": "label", "args": ["%.Lend"], "result": null},
        {"opcode": "mul", "args": ["%a", "%b"], "result": "%s"},
        {"opcode": "add", "args": ["%p", "%s"], "result": "%p"},
        {"opcode": "ret", "args": ["%p"], "result": null}
    ]}
]"#;

fn configs() -> Vec<PipelineConfig> {
    let base = PipelineConfig {
        parallel: false,
        ..PipelineConfig::default()
    };
    vec![
        PipelineConfig::default(),
        PipelineConfig::ssa_only(),
        PipelineConfig {
            minimize: false,
            ..base.clone()
        },
        PipelineConfig {
            sccp: false,
            ..base.clone()
        },
        PipelineConfig {
            cse: false,
            ..base.clone()
        },
        PipelineConfig {
            copy_prop: false,
            ..base.clone()
        },
        PipelineConfig {
            max_rounds: 1,
            ..base
        },
    ]
}

fn assert_preserved(text: &str) -> Result<()> {
    let original = parse_tac(text)?;
    let expected = execute(&original, "@main", &[])?;

    for config in configs() {
        let mut decls = original.clone();
        Pipeline::new(config.clone()).run(&mut decls)?;
        let actual = execute(&decls, "@main", &[])?;
        assert_eq!(actual.output, expected.output, "output changed under {config:?}");
        assert_eq!(actual.result, expected.result, "result changed under {config:?}");
    }
    Ok(())
}

fn proc_named<'a>(decls: &'a [Decl], name: &str) -> &'a tacopt::tac::Proc {
    decls
        .iter()
        .filter_map(Decl::as_proc)
        .find(|p| p.name == name)
        .unwrap()
}

#[test]
fn test_loops_preserved() -> Result<()> {
    assert_preserved(LOOPS)
}

#[test]
fn test_constants_preserved() -> Result<()> {
    assert_preserved(CONSTANTS)
}

#[test]
fn test_expressions_preserved() -> Result<()> {
    assert_preserved(EXPRESSIONS)
}

#[test]
fn test_expected_outputs() -> Result<()> {
    let decls = parse_tac(LOOPS)?;
    assert_eq!(execute(&decls, "@main", &[])?.output, vec!["50"]);

    let decls = parse_tac(CONSTANTS)?;
    let outcome = execute(&decls, "@main", &[])?;
    assert_eq!(outcome.output, vec!["-42", "false"]);
    assert_eq!(outcome.result, Some(42));

    let decls = parse_tac(EXPRESSIONS)?;
    // f(5, 3) = 15 + 15 + 15; f(-4, 9) = -36 - 9 + 9
    assert_eq!(execute(&decls, "@main", &[])?.output, vec!["45", "-36"]);
    Ok(())
}

#[test]
fn test_constants_fold_away() -> Result<()> {
    let mut decls = parse_tac(CONSTANTS)?;
    let events = Pipeline::default().run(&mut decls)?;

    let main = proc_named(&decls, "@main");
    assert!(main.body.iter().all(|i| i.opcode() != Opcode::Div));
    assert!(main.body.iter().all(|i| !i.opcode().to_string().starts_with('j')
        || i.opcode() == Opcode::Jmp));
    assert_eq!(main.body.last().map(ToString::to_string), Some("ret 42;".to_string()));
    assert!(events.has(EventKind::BlockRemoved));
    assert!(events.has(EventKind::BranchSimplified));
    Ok(())
}

#[test]
fn test_dominating_multiplication_reused() -> Result<()> {
    let mut decls = parse_tac(EXPRESSIONS)?;
    let events = Pipeline::default().run(&mut decls)?;

    // The fall-through branch reuses the entry's product. The branch that reassigns %a and
    // the join, where %a arrives through a phi, compute their own.
    let f = proc_named(&decls, "@f");
    let muls = f.body.iter().filter(|i| i.opcode() == Opcode::Mul).count();
    assert_eq!(muls, 3);
    assert!(events.count_kind(EventKind::ExpressionEliminated) >= 1);
    Ok(())
}

#[test]
fn test_cse_copies_propagated() -> Result<()> {
    let copies = |decls: &[Decl]| {
        proc_named(decls, "@f")
            .body
            .iter()
            .filter(|i| i.opcode() == Opcode::Copy)
            .count()
    };

    let mut kept = parse_tac(EXPRESSIONS)?;
    Pipeline::new(PipelineConfig {
        copy_prop: false,
        ..PipelineConfig::default()
    })
    .run(&mut kept)?;
    assert!(copies(&kept) >= 1);

    let mut propagated = parse_tac(EXPRESSIONS)?;
    let events = Pipeline::default().run(&mut propagated)?;
    assert_eq!(copies(&propagated), 0);
    assert!(events.count_kind(EventKind::CopyPropagated) >= copies(&kept));
    Ok(())
}

#[test]
fn test_running_twice_is_stable() -> Result<()> {
    let mut once = parse_tac(CONSTANTS)?;
    Pipeline::default().run(&mut once)?;
    let mut twice = once.clone();
    Pipeline::default().run(&mut twice)?;

    assert_eq!(
        execute(&once, "@main", &[])?.output,
        execute(&twice, "@main", &[])?.output
    );
    let count = |decls: &[Decl]| -> usize {
        decls
            .iter()
            .filter_map(Decl::as_proc)
            .map(|p| p.body.iter().filter(|i| i.opcode() != Opcode::Label).count())
            .sum()
    };
    // A second run may still drop phis left with a single source, never add code.
    assert!(count(&twice) <= count(&once));
    Ok(())
}

#[test]
fn test_cfg_round_trip() -> Result<()> {
    for text in [LOOPS, CONSTANTS, EXPRESSIONS] {
        for decl in parse_tac(text)? {
            let Decl::Proc(mut proc) = decl else {
                continue;
            };
            let cfg = infer(&proc)?;
            linearize(&mut proc, &cfg);
            let again = infer(&proc)?;
            assert_eq!(shape(&again), shape(&cfg), "block structure of {}", proc.name);
        }
    }
    Ok(())
}

fn shape(cfg: &Cfg) -> Vec<(String, Vec<String>, usize)> {
    cfg.blocks()
        .map(|b| {
            (
                b.label.to_string(),
                b.successors().iter().map(ToString::to_string).collect(),
                b.body.len(),
            )
        })
        .collect()
}

#[test]
fn test_globals_survive() -> Result<()> {
    let mut decls = parse_tac(LOOPS)?;
    Pipeline::default().run(&mut decls)?;
    assert!(matches!(&decls[0], Decl::Var(g) if g.name == "@total" && g.init == 0));

    let json = to_json(&decls);
    assert_eq!(json[0]["var"], "@total");
    Ok(())
}
