// src/main.rs
//
// Smoke-run CLI for the RNA design environment.
//
// - Targets come from a file: one `structure` or `id<TAB>structure` per line.
// - Config: --config YAML if given, else defaults; RIBODESIGN_* env vars
//   override either.
// - Deterministic runs via --seed (target order and random policy).
// - Prints a run header, one JSON line per episode, and a summary line.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};

use ribodesign::config::EnvConfig;
use ribodesign::oracle::{CommandOracle, FoldingOracle, NussinovOracle};
use ribodesign::rl::{
    run_episodes, EpisodeTelemetry, Environment, Policy, RandomPolicy, RnaDesignEnv, RunSummary,
};
use ribodesign::target::TargetSpec;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OracleArg {
    /// Built-in Nussinov base-pair maximisation.
    Builtin,
    /// External `RNAfold --noPS`.
    Rnafold,
}

#[derive(Debug, Parser)]
#[command(
    name = "ribodesign",
    about = "Run random-policy RNA design episodes over a batch of target structures",
    version
)]
struct Args {
    /// Targets file (dot-bracket per line, optional leading numeric id).
    #[arg(long)]
    targets: PathBuf,

    /// Number of episodes to run.
    #[arg(long, default_value_t = 10)]
    episodes: u64,

    /// Deterministic seed for target order and policy.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Environment config (YAML). Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Folding oracle.
    #[arg(long, value_enum, default_value_t = OracleArg::Builtin)]
    oracle: OracleArg,

    /// Verbosity: -v prints per-episode lines.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn load_config(path: Option<&PathBuf>) -> Result<EnvConfig> {
    let mut cfg = match path {
        Some(p) => EnvConfig::from_yaml_file(p)
            .with_context(|| format!("loading config {}", p.display()))?,
        None => EnvConfig::default(),
    };
    cfg.apply_env_overrides();
    cfg.validate().context("config after env overrides")?;
    Ok(cfg)
}

fn run<O: FoldingOracle>(args: &Args, specs: &[TargetSpec], cfg: EnvConfig, oracle: O) -> Result<()> {
    let mut env = RnaDesignEnv::from_specs(specs, cfg, oracle, args.seed)
        .context("building environment")?
        .with_telemetry(EpisodeTelemetry::from_env());
    let mut policy = RandomPolicy::new(args.seed);

    let spec = env.observation_spec();
    println!(
        "ribodesign | targets={} | episodes={} | seed={} | oracle={:?} | policy={} | obs={:?}x{:?}",
        specs.len(),
        args.episodes,
        args.seed,
        args.oracle,
        policy.name(),
        spec.dtype,
        spec.shape,
    );

    let outcomes = run_episodes(&mut env, &mut policy, args.episodes)?;
    if args.verbose > 0 {
        for outcome in &outcomes {
            println!("{}", serde_json::to_string(outcome)?);
        }
    }

    let summary = RunSummary::from_outcomes(&outcomes);
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let text = fs::read_to_string(&args.targets)
        .with_context(|| format!("reading targets {}", args.targets.display()))?;
    let specs = TargetSpec::parse_batch(&text);
    if specs.is_empty() {
        bail!("no targets in {}", args.targets.display());
    }

    let cfg = load_config(args.config.as_ref())?;

    match args.oracle {
        OracleArg::Builtin => run(&args, &specs, cfg, NussinovOracle::default()),
        OracleArg::Rnafold => run(&args, &specs, cfg, CommandOracle::default()),
    }
}
