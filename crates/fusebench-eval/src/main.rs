//! Fusebench CLI - compare retrieval methods and fuse saved runs.
//!
//! # Usage
//!
//! ```bash
//! # Evaluate saved method results against gold queries
//! fusebench evaluate --queries data/test_queries.json --results runs/all_results.json
//! fusebench evaluate --queries a.json b.json --results all.json --k-values 1,5,10 --json
//!
//! # Fuse per-backend scored runs into a new method run
//! fusebench fuse --run dense=runs/dense.json --run sparse=runs/sparse.json \
//!     --method rrf --output runs/all_results.json
//!
//! # Show help
//! fusebench --help
//! ```

mod output;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use fusebench_core::config::FusebenchConfig;
use fusebench_core::evaluation::{
    load_gold_queries, load_method_results, load_scored_run, relevance_sets, save_json,
    Evaluator, MethodResults, QueryResults, ScoredRun,
};
use fusebench_core::search::{fuse, FusionKind, FusionMethod, RankedList};
use indicatif::{ProgressBar, ProgressStyle};
use output::PerQueryMetrics;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Retrieval evaluation toolkit.
///
/// Scores saved retrieval runs with IR metrics and fuses per-backend runs
/// into hybrid rankings.
#[derive(Parser)]
#[command(name = "fusebench", version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML configuration file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare methods in a results file against gold relevance judgments
    Evaluate(EvaluateArgs),
    /// Fuse saved scored runs into a single parent-id run
    Fuse(FuseArgs),
}

#[derive(Args)]
struct EvaluateArgs {
    /// Gold query files (concatenated in order)
    #[arg(long, required = true, num_args = 1..)]
    queries: Vec<PathBuf>,

    /// Method results file: {"method": {"query_id": ["doc_id", ...]}}
    #[arg(long)]
    results: PathBuf,

    /// Cutoffs for recall, precision and F1 (overrides the config)
    #[arg(long, value_delimiter = ',')]
    k_values: Option<Vec<usize>>,

    /// Print JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Include per-query metrics
    #[arg(long)]
    per_query: bool,

    /// Also write the comparison as JSON to this file
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct FuseArgs {
    /// Scored run to fuse, as NAME=PATH (repeat for each backend)
    #[arg(long = "run", required = true, value_parser = parse_named_path)]
    runs: Vec<(String, PathBuf)>,

    /// Fusion method (overrides the config)
    #[arg(long)]
    method: Option<FusionKind>,

    /// RRF dampening constant (overrides the config)
    #[arg(long)]
    rrf_k: Option<usize>,

    /// Per-run weights for weighted fusion, in --run order
    #[arg(long, value_delimiter = ',')]
    weights: Option<Vec<f64>>,

    /// Results kept per query (overrides the config)
    #[arg(long)]
    top_k: Option<usize>,

    /// Method name for the fused run (default: hybrid_<method>)
    #[arg(long)]
    name: Option<String>,

    /// Method results file; an existing file gains or replaces this method
    #[arg(long)]
    output: PathBuf,
}

/// Parses `NAME=PATH` for `--run`.
fn parse_named_path(value: &str) -> Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got '{value}'")),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => FusebenchConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => FusebenchConfig::default(),
    };

    match cli.command {
        Command::Evaluate(args) => evaluate(&args, &config),
        Command::Fuse(args) => fuse_runs(&args, &config),
    }
}

// ============================================================================
// evaluate
// ============================================================================

/// Evaluator from the `[evaluation]` config, with `--k-values` taking
/// precedence over the configured cutoffs.
fn build_evaluator(args: &EvaluateArgs, config: &FusebenchConfig) -> Result<Evaluator> {
    match &args.k_values {
        Some(k_values) => {
            if k_values.contains(&0) {
                bail!("--k-values must be positive");
            }
            Ok(Evaluator::new(k_values.clone())
                .with_duplicate_policy(config.evaluation.duplicate_policy))
        }
        None => Ok(Evaluator::from_config(&config.evaluation)),
    }
}

fn evaluate(args: &EvaluateArgs, config: &FusebenchConfig) -> Result<()> {
    let gold = load_gold_queries(args.queries.as_slice())
        .context("Failed to load gold queries")?;
    let relevant = relevance_sets(&gold);
    info!(queries = gold.len(), judged = relevant.len(), "Loaded gold queries");

    let all = load_method_results(&args.results)
        .with_context(|| format!("Failed to load results {}", args.results.display()))?;
    if all.is_empty() {
        bail!("No methods found in {}", args.results.display());
    }

    let evaluator = build_evaluator(args, config)?;
    let table = evaluator.compare_methods(&all, &relevant);
    let per_query: Option<PerQueryMetrics> = args.per_query.then(|| {
        all.iter()
            .map(|(method, results)| (method.clone(), evaluator.per_query(results, &relevant)))
            .collect()
    });

    if args.json {
        println!("{}", output::format_json(&table, per_query.as_ref())?);
    } else {
        print!("{}", output::format_table(&table));
        print!("{}", output::format_rankings(&table));
        if let Some(per_query) = &per_query {
            print!("{}", output::format_per_query(per_query));
        }
    }

    if let Some(path) = &args.output {
        save_json(path, &table)
            .with_context(|| format!("Failed to write comparison {}", path.display()))?;
        info!(path = %path.display(), "Saved comparison");
    }

    Ok(())
}

// ============================================================================
// fuse
// ============================================================================

/// Resolves the fusion method from flags, falling back to the config.
fn resolve_method(args: &FuseArgs, config: &FusebenchConfig) -> Result<FusionMethod> {
    let hybrid = &config.search.hybrid;
    let kind = match args.method {
        Some(kind) => kind,
        None => hybrid.fusion_method.parse::<FusionKind>()?,
    };

    Ok(match kind {
        FusionKind::Rrf => FusionMethod::Rrf {
            k_constant: args.rrf_k.unwrap_or(hybrid.rrf_k),
        },
        FusionKind::Weighted => FusionMethod::Weighted {
            weights: args.weights.clone().unwrap_or_else(|| hybrid.weights.clone()),
        },
    })
}

/// Fuses the runs query by query over the union of their query ids.
///
/// A query missing from a run contributes an empty list for that run.
fn fuse_all(runs: &[ScoredRun], method: &FusionMethod, top_k: usize) -> Result<QueryResults> {
    let query_ids: BTreeSet<&String> = runs.iter().flat_map(|run| run.keys()).collect();

    let pb = ProgressBar::new(query_ids.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{msg} [{bar:40}] {pos}/{len}")?);
    pb.set_message("Fusing");

    let mut fused = QueryResults::new();
    for query_id in query_ids {
        let lists: Vec<RankedList> = runs
            .iter()
            .map(|run| run.get(query_id).cloned().unwrap_or_default())
            .collect();
        let ranked = fuse(&lists, top_k, method)
            .with_context(|| format!("Failed to fuse query {query_id}"))?;
        fused.insert(query_id.clone(), ranked.parent_ids());
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(fused)
}

fn load_existing(path: &Path) -> Result<MethodResults> {
    if !path.exists() {
        return Ok(MethodResults::new());
    }
    load_method_results(path)
        .with_context(|| format!("Failed to load existing results {}", path.display()))
}

fn fuse_runs(args: &FuseArgs, config: &FusebenchConfig) -> Result<()> {
    let method = resolve_method(args, config)?;
    if let FusionMethod::Weighted { weights } = &method {
        if weights.len() != args.runs.len() {
            bail!(
                "Weighted fusion needs one weight per run ({} runs, {} weights)",
                args.runs.len(),
                weights.len()
            );
        }
    }
    let top_k = args.top_k.unwrap_or(config.search.default_top_k);
    if top_k == 0 {
        bail!("--top-k must be positive");
    }

    let mut runs = Vec::with_capacity(args.runs.len());
    for (name, path) in &args.runs {
        let run = load_scored_run(path)
            .with_context(|| format!("Failed to load run '{name}' from {}", path.display()))?;
        info!(run = %name, queries = run.len(), "Loaded scored run");
        runs.push(run);
    }

    let fused = fuse_all(&runs, &method, top_k)?;
    let name = args
        .name
        .clone()
        .unwrap_or_else(|| format!("hybrid_{}", method.kind()));

    let mut all = load_existing(&args.output)?;
    let replaced = all.insert(name.clone(), fused).is_some();
    save_json(&args.output, &all)
        .with_context(|| format!("Failed to write results {}", args.output.display()))?;

    info!(method = %name, replaced, path = %args.output.display(), "Saved fused run");
    println!(
        "Wrote {} ({} queries) to {}",
        name,
        all.get(&name).map_or(0, |run| run.len()),
        args.output.display()
    );

    Ok(())
}
