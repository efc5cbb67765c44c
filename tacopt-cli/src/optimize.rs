use std::collections::BTreeMap;

use anyhow::Context;
use serde::Serialize;
use tacopt::{
    compiler::Pipeline,
    tac::{execute, load_tac, store_tac, to_json, Decl},
};

use crate::{
    app::Cli,
    output::{event_table, print_output},
};

#[derive(Debug, Serialize)]
struct OptimizeReport {
    file: String,
    procedures: usize,
    procedures_changed: usize,
    passes: Vec<&'static str>,
    instructions_before: usize,
    instructions_after: usize,
    events: BTreeMap<String, usize>,
    output: Option<Vec<String>>,
    result: Option<i64>,
}

fn instruction_count(decls: &[Decl]) -> usize {
    decls
        .iter()
        .filter_map(Decl::as_proc)
        .map(|p| p.body.len())
        .sum()
}

pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut decls = load_tac(&cli.path)
        .with_context(|| format!("failed to load TAC: {}", cli.path.display()))?;
    let before = instruction_count(&decls);

    let pipeline = Pipeline::new(cli.passes.config());
    let events = pipeline
        .run(&mut decls)
        .with_context(|| format!("optimization failed: {}", cli.path.display()))?;
    log::info!("{}: {}", cli.path.display(), events.summary());

    if let Some(output) = &cli.output {
        store_tac(output, &decls)
            .with_context(|| format!("failed to write output: {}", output.display()))?;
        log::info!("wrote {}", output.display());
    }

    if cli.verbose() {
        event_table(&events).eprint();
    }

    if cli.print {
        if cli.global.json {
            println!("{}", serde_json::to_string_pretty(&to_json(&decls))?);
        } else {
            for decl in &decls {
                print!("{decl}");
            }
        }
        return Ok(());
    }

    let outcome = if cli.output.is_none() {
        Some(
            execute(&decls, &cli.entry, &[])
                .with_context(|| format!("execution of {} failed", cli.entry))?,
        )
    } else {
        None
    };

    let report = OptimizeReport {
        file: cli.path.display().to_string(),
        procedures: decls.iter().filter(|d| d.as_proc().is_some()).count(),
        procedures_changed: events.procs_affected(),
        passes: pipeline.pass_names(),
        instructions_before: before,
        instructions_after: instruction_count(&decls),
        events: events
            .count_by_kind()
            .into_iter()
            .map(|(kind, count)| (kind.description().to_string(), count))
            .collect(),
        output: outcome.as_ref().map(|o| o.output.clone()),
        result: outcome.as_ref().and_then(|o| o.result),
    };

    print_output(&report, &cli.global, |r| {
        for line in r.output.iter().flatten() {
            println!("{line}");
        }
    })
}
