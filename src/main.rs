use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

mod error;
mod ir;
mod learn;
mod oracle;
mod output;
mod parser;
mod preprocess;
mod repair;
mod sampling;
mod schedule;
mod semantics;
mod synth;

use error::{Result, SynthError};
use oracle::CommandTemplate;
use synth::{
    LearnConfig, OracleConfig, RepairConfig, SamplingConfig, SynthConfig, SynthResult, run_file,
};

// --- Command Line Arguments ---

#[derive(Parser, Debug)]
#[command(name = "skolem")]
#[command(about = "skolem - Skolem function synthesis for ∀X∃Y.Φ(X,Y)")]
#[command(version)]
#[command(arg_required_else_help = true)]
struct Args {
    /// QDIMACS input file
    input: PathBuf,

    // --- Preprocessing ---
    /// Skip unate detection
    #[arg(long)]
    no_preprocess: bool,
    /// Skip unique-definition extraction
    #[arg(long)]
    no_unique: bool,

    // --- Sampling ---
    /// Number of samples (overrides the size-based default)
    #[arg(long)]
    samples: Option<usize>,
    /// Sample uniformly instead of with per-variable weights
    #[arg(long)]
    uniform_sampling: bool,
    /// Probe bias levels before sampling (default with weighted sampling)
    #[arg(long, conflicts_with = "no_adaptive_bias")]
    adaptive_bias: bool,
    /// Use the fixed bias level for every learnable variable
    #[arg(long)]
    no_adaptive_bias: bool,

    // --- Learning ---
    /// Minimum weighted impurity decrease for a tree split
    #[arg(long, default_value = "0.005")]
    gini: f64,
    /// Learn clusters of coupled variables with multi-output trees
    #[arg(long)]
    multiclass: bool,
    /// Cluster radius in the clause co-occurrence graph
    #[arg(long, default_value = "3")]
    hop: usize,
    /// Maximum cluster size
    #[arg(long, default_value = "8")]
    cluster_size: usize,
    /// Worker threads for tree training
    #[arg(long, short = 'j', default_value = "1")]
    jobs: usize,
    /// Print every fitted decision tree
    #[arg(long)]
    show_trees: bool,

    // --- Repair ---
    /// Repair iterations before giving up
    #[arg(long, default_value = "5000")]
    max_repair_iterations: usize,
    /// Largest unsat core used as a repair condition
    #[arg(long, default_value = "30")]
    self_sub_threshold: usize,
    /// Weight localization soft clauses by dependency out-degree
    #[arg(long)]
    weighted_maxsat: bool,
    /// Retry unresolved repairs once with lexicographic localization
    #[arg(long)]
    lex_maxsat: bool,

    // --- Oracles ---
    /// External sampler command ({input} {output} {count} {seed})
    #[arg(long)]
    sampler_cmd: Option<String>,
    /// External SAT solver for verification ({input})
    #[arg(long)]
    verifier_cmd: Option<String>,
    /// External MaxSAT solver ({input})
    #[arg(long)]
    maxsat_cmd: Option<String>,
    /// External unate detector ({input})
    #[arg(long)]
    unate_cmd: Option<String>,
    /// Timeout in seconds for each oracle call
    #[arg(long, default_value = "600")]
    timeout: u64,
    /// Let oracle calls run without a time limit
    #[arg(long, conflicts_with = "timeout")]
    no_timeout: bool,
    /// Timeout in seconds for unate detection
    #[arg(long, default_value = "500")]
    unate_timeout: u64,

    // --- General ---
    /// Random seed
    #[arg(long, default_value = "10")]
    seed: u64,
    /// Verbosity (-v info, -vv debug)
    #[arg(long, short, action = ArgAction::Count)]
    verbose: u8,
    /// Directory for output files (defaults to the input's directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn command(flag: &str, text: Option<&String>) -> Result<Option<CommandTemplate>> {
    match text {
        None => Ok(None),
        Some(text) => CommandTemplate::parse(text)
            .map(Some)
            .ok_or_else(|| SynthError::Config(format!("{} must not be empty", flag))),
    }
}

impl Args {
    fn to_config(&self) -> Result<SynthConfig> {
        let weighted = !self.uniform_sampling;
        let adaptive = if self.adaptive_bias {
            true
        } else if self.no_adaptive_bias {
            false
        } else {
            weighted
        };
        let sampling = SamplingConfig::default()
            .with_samples_option(self.samples)
            .with_weighted(weighted)
            .with_adaptive(adaptive);
        let learn = LearnConfig::default()
            .with_gini(self.gini)
            .with_multiclass(self.multiclass)
            .with_hop(self.hop)
            .with_cluster_size(self.cluster_size)
            .with_jobs(self.jobs)
            .with_show_trees(self.show_trees);
        let repair = RepairConfig::default()
            .with_max_iterations(self.max_repair_iterations)
            .with_self_sub_threshold(self.self_sub_threshold)
            .with_weighted_maxsat(self.weighted_maxsat)
            .with_lex_maxsat(self.lex_maxsat);
        let oracle = OracleConfig::default()
            .with_sampler_cmd(command("--sampler-cmd", self.sampler_cmd.as_ref())?)
            .with_verifier_cmd(command("--verifier-cmd", self.verifier_cmd.as_ref())?)
            .with_maxsat_cmd(command("--maxsat-cmd", self.maxsat_cmd.as_ref())?)
            .with_unate_cmd(command("--unate-cmd", self.unate_cmd.as_ref())?)
            .with_timeout_option((!self.no_timeout).then(|| Duration::from_secs(self.timeout)))
            .with_unate_timeout(Duration::from_secs(self.unate_timeout));

        let config = SynthConfig::default()
            .with_preprocess(!self.no_preprocess)
            .with_unique(!self.no_unique)
            .with_sampling(sampling)
            .with_learn(learn)
            .with_repair(repair)
            .with_oracle(oracle)
            .with_seed(self.seed)
            .with_output_dir(self.output_dir.clone());
        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn print_summary(result: &SynthResult) {
    let stats = &result.statistics;
    println!("status: {}", result.status);
    println!(
        "unates: {} positive, {} negative; unique: {}; learned: {}",
        stats.positive_unates, stats.negative_unates, stats.unique, stats.learned
    );
    if stats.samples > 0 {
        println!("samples: {}, trees: {}", stats.samples, stats.trees);
    }
    println!("repairs: {}", stats.count_refine);
    if stats.escalations > 0 {
        println!("lexicographic escalations: {}", stats.escalations);
    }
}

fn run(args: &Args) -> Result<bool> {
    let config = args.to_config()?;
    let (result, paths) = run_file(&args.input, &config)?;
    print_summary(&result);
    println!("skolem functions: {}", paths.skolem.display());
    if !result.is_verified() {
        println!(
            "could not synthesize verified functions within {} repairs",
            config.repair.max_iterations
        );
    }
    Ok(result.is_verified())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        // unverified output was still written
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
