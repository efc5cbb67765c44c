use std::path::PathBuf;

use clap::Parser;
use tacopt::compiler::PipelineConfig;

/// tacopt - SSA-based optimizer for three-address code
#[derive(Debug, Parser)]
#[command(name = "tacopt", version, about, long_about = None)]
pub struct Cli {
    /// Path to the TAC JSON file.
    #[arg(value_name = "FILE")]
    pub path: PathBuf,

    /// Write the optimized program as TAC JSON to this file.
    #[arg(short, long, value_name = "OUT")]
    pub output: Option<PathBuf>,

    /// Print the optimized program as textual TAC instead of running it.
    #[arg(short, long)]
    pub print: bool,

    /// Procedure to run after optimization.
    #[arg(long, default_value = "@main")]
    pub entry: String,

    /// Pipeline options.
    #[command(flatten)]
    pub passes: PassOptions,

    /// Output options.
    #[command(flatten)]
    pub global: GlobalOptions,
}

impl Cli {
    /// Returns `true` if debug output was requested.
    pub fn verbose(&self) -> bool {
        self.global.verbose
    }
}

/// Flags selecting which passes run.
#[derive(Debug, Parser)]
pub struct PassOptions {
    /// Skip SSA minimization.
    #[arg(long)]
    pub no_minimize: bool,

    /// Skip sparse conditional constant propagation.
    #[arg(long)]
    pub no_sccp: bool,

    /// Skip common subexpression elimination.
    #[arg(long)]
    pub no_cse: bool,

    /// Skip global copy propagation.
    #[arg(long)]
    pub no_copy_prop: bool,

    /// Optimize procedures one after another instead of in parallel.
    #[arg(long)]
    pub sequential: bool,

    /// Maximum number of SSA minimization rounds.
    #[arg(long, value_name = "N")]
    pub max_rounds: Option<usize>,
}

impl PassOptions {
    /// Maps the flags onto a pipeline configuration.
    pub fn config(&self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            minimize: !self.no_minimize,
            sccp: !self.no_sccp,
            cse: !self.no_cse,
            copy_prop: !self.no_copy_prop,
            parallel: !self.sequential,
            max_rounds: self.max_rounds.unwrap_or(defaults.max_rounds),
        }
    }
}

/// Options shared by every kind of output.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output and the event summary.
    #[arg(short, long)]
    pub verbose: bool,
}
