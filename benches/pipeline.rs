//! Benchmarks for the optimization pipeline.
//!
//! Measures each stage on a generated program of straight-line arithmetic, nested loops and
//! constant branches:
//! - CFG inference and crude SSA construction
//! - Dominance analysis
//! - SSA minimization, SCCP and CSE individually
//! - The full pipeline, sequential and parallel

extern crate tacopt;

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use tacopt::{
    analysis::{crude_ssagen, dominators, infer, Cfg},
    compiler::{
        passes::{apply_cse, minimize, propagate_constants},
        EventLog, Pipeline, PipelineConfig,
    },
    tac::{BinaryOp, Condition, Decl, Instr, Label, Proc, Temp},
};

/// Builds a procedure with `loops` sequential counting loops, each with a redundant product
/// and a branch on a constant.
fn generated_proc(name: &str, loops: usize) -> Proc {
    let mut body = vec![Instr::constant("%acc", 0), Instr::constant("%k", 3)];
    for n in 0..loops {
        let head = Label::new(format!("%.head{n}"));
        let skip = Label::new(format!("%.skip{n}"));
        let exit = Label::new(format!("%.exit{n}"));
        body.extend([
            Instr::constant("%i", 0),
            Instr::label(head.clone()),
            Instr::binary("%t", BinaryOp::Sub, "%i", 16),
            Instr::branch(Condition::Jnl, "%t", exit.clone()),
            Instr::binary("%p", BinaryOp::Mul, "%i", "%k"),
            Instr::binary("%q", BinaryOp::Mul, "%i", "%k"),
            Instr::binary("%acc", BinaryOp::Add, "%acc", "%p"),
            Instr::binary("%acc", BinaryOp::Sub, "%acc", "%q"),
            Instr::binary("%c", BinaryOp::Sub, "%k", 3),
            Instr::branch(Condition::Jz, "%c", skip.clone()),
            Instr::binary("%acc", BinaryOp::Add, "%acc", 1),
            Instr::label(skip),
            Instr::binary("%i", BinaryOp::Add, "%i", 1),
            Instr::jump(head),
            Instr::label(exit),
        ]);
    }
    body.push(Instr::ret(Some("%acc".into())));
    Proc::new(name, Vec::<Temp>::new(), body)
}

fn ssa_cfg(proc: &Proc) -> Cfg {
    let mut cfg = infer(proc).unwrap();
    crude_ssagen(proc, &mut cfg);
    cfg
}

/// Benchmark CFG inference and crude SSA construction.
fn bench_ssa_construction(c: &mut Criterion) {
    let proc = generated_proc("@main", 32);

    c.bench_function("ssa_construction", |b| {
        b.iter(|| black_box(ssa_cfg(black_box(&proc))));
    });
}

/// Benchmark dominator set computation.
fn bench_dominators(c: &mut Criterion) {
    let cfg = ssa_cfg(&generated_proc("@main", 32));

    c.bench_function("dominators", |b| {
        b.iter(|| black_box(dominators(black_box(&cfg))));
    });
}

/// Benchmark SSA minimization on a freshly built crude SSA form.
fn bench_minimize(c: &mut Criterion) {
    let cfg = ssa_cfg(&generated_proc("@main", 32));

    c.bench_function("ssa_minimize", |b| {
        b.iter(|| {
            let mut cfg = cfg.clone();
            minimize(&mut cfg, 64, &EventLog::new());
            black_box(cfg)
        });
    });
}

/// Benchmark SCCP on minimized SSA.
fn bench_sccp(c: &mut Criterion) {
    let mut cfg = ssa_cfg(&generated_proc("@main", 32));
    minimize(&mut cfg, 64, &EventLog::new());

    c.bench_function("sccp", |b| {
        b.iter(|| {
            let mut cfg = cfg.clone();
            propagate_constants(&mut cfg, &EventLog::new()).unwrap();
            black_box(cfg)
        });
    });
}

/// Benchmark local and global CSE on minimized SSA.
fn bench_cse(c: &mut Criterion) {
    let mut cfg = ssa_cfg(&generated_proc("@main", 32));
    minimize(&mut cfg, 64, &EventLog::new());

    c.bench_function("cse", |b| {
        b.iter(|| {
            let mut cfg = cfg.clone();
            apply_cse(&mut cfg, &EventLog::new());
            black_box(cfg)
        });
    });
}

/// Benchmark the whole pipeline over a program of 16 procedures.
fn bench_pipeline(c: &mut Criterion) {
    let decls: Vec<Decl> = (0..16)
        .map(|i| Decl::Proc(generated_proc(&format!("@p{i}"), 8)))
        .collect();

    c.bench_function("pipeline_sequential", |b| {
        let pipeline = Pipeline::new(PipelineConfig {
            parallel: false,
            ..PipelineConfig::default()
        });
        b.iter(|| {
            let mut decls = decls.clone();
            black_box(pipeline.run(&mut decls).unwrap())
        });
    });

    c.bench_function("pipeline_parallel", |b| {
        let pipeline = Pipeline::default();
        b.iter(|| {
            let mut decls = decls.clone();
            black_box(pipeline.run(&mut decls).unwrap())
        });
    });
}

criterion_group!(
    benches,
    bench_ssa_construction,
    bench_dominators,
    bench_minimize,
    bench_sccp,
    bench_cse,
    bench_pipeline
);
criterion_main!(benches);
