//! decision-cli: evaluate analysis snapshots from JSON files.
//!
//! Each file holds one snapshot object or an array of them. Results are
//! printed to stdout as a JSON array in input order; logs go to stderr.
//!
//! Usage:
//!   decision-cli snapshots/2330.json
//!   decision-cli --memory signals.json --concurrency 8 watchlist/*.json
//!   decision-cli --rules

use analysis_core::{AnalysisSnapshot, SignalRecord};
use anyhow::{bail, Context, Result};
use decision_engine::scoring::{long_term_rules, short_term_rules, Rule, WEIGHT_TABLE_VERSION};
use decision_engine::{DecisionEngine, DecisionResult, EngineConfig, InMemorySignalStore};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Max concurrent evaluations
const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    memory: Option<PathBuf>,
    concurrency: usize,
    rules: bool,
    pretty: bool,
    json_logs: bool,
    files: Vec<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut parsed = CliArgs {
        concurrency: DEFAULT_CONCURRENCY,
        ..CliArgs::default()
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--memory" => {
                let path = iter.next().context("--memory needs a PATH")?;
                parsed.memory = Some(PathBuf::from(path));
            }
            "--concurrency" => {
                let n = iter.next().context("--concurrency needs a number")?;
                parsed.concurrency = n
                    .parse::<usize>()
                    .with_context(|| format!("invalid --concurrency value '{}'", n))?
                    .max(1);
            }
            "--rules" => parsed.rules = true,
            "--pretty" => parsed.pretty = true,
            "--json-logs" => parsed.json_logs = true,
            flag if flag.starts_with("--") => bail!("unknown option {}", flag),
            file => parsed.files.push(PathBuf::from(file)),
        }
    }
    Ok(parsed)
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  decision-cli [OPTIONS] FILE...   Evaluate snapshot files");
    eprintln!("  decision-cli --rules             Print the weight tables");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --memory PATH      Enable reversal cooldown, persisting signals to PATH");
    eprintln!("  --concurrency N    Max parallel evaluations (default: {})", DEFAULT_CONCURRENCY);
    eprintln!("  --pretty           Pretty-print the JSON output");
    eprintln!("  --json-logs        Emit logs as JSON");
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "decision_cli=info,decision_engine=info".into());
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Snapshots in one file; a top-level array yields one per element.
fn load_snapshots(path: &Path) -> Result<Vec<AnalysisSnapshot>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };
    let mut snapshots = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match AnalysisSnapshot::from_value(item) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => tracing::warn!("{} entry {} skipped: {}", path.display(), i, e),
        }
    }
    Ok(snapshots)
}

fn load_store(path: &Path) -> Result<InMemorySignalStore> {
    if !path.exists() {
        tracing::info!("Signal memory {} not found, starting empty", path.display());
        return Ok(InMemorySignalStore::new());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read signal memory {}", path.display()))?;
    let records: BTreeMap<String, SignalRecord> = serde_json::from_str(&text)
        .with_context(|| format!("invalid signal memory in {}", path.display()))?;
    tracing::info!("Loaded {} signal records from {}", records.len(), path.display());
    Ok(InMemorySignalStore::from_records(records))
}

fn save_store(path: &Path, store: &InMemorySignalStore) -> Result<()> {
    let text = serde_json::to_string_pretty(&store.records())?;
    std::fs::write(path, text)
        .with_context(|| format!("failed to write signal memory {}", path.display()))?;
    tracing::info!("Saved {} signal records to {}", store.len(), path.display());
    Ok(())
}

fn rule_lines(track: &str, rules: &[Rule]) -> Vec<String> {
    rules
        .iter()
        .map(|r| format!("{:<6} {:<18} {:<32} {:+}", track, format!("{:?}", r.category), r.name, r.weight))
        .collect()
}

/// Evaluate every snapshot, returning results in input order.
///
/// Snapshots of one symbol run sequentially in input order inside a single
/// blocking task, so the reversal cooldown always compares against the
/// previous day. Distinct symbols run in parallel, bounded by `concurrency`.
async fn evaluate_all(
    engine: Arc<DecisionEngine>,
    store: Option<Arc<InMemorySignalStore>>,
    snapshots: Vec<AnalysisSnapshot>,
    concurrency: usize,
) -> Vec<DecisionResult> {
    let total = snapshots.len();
    let groups = group_by_symbol(snapshots);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut handles = Vec::with_capacity(groups.len());

    for (symbol, group) in groups {
        let engine = Arc::clone(&engine);
        let store = store.clone();
        let semaphore = Arc::clone(&semaphore);

        let handle = tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok()?;
            let joined = tokio::task::spawn_blocking(move || {
                group
                    .into_iter()
                    .map(|(index, snapshot)| {
                        let result = match &store {
                            Some(store) => engine.evaluate_with_memory(&snapshot, &**store),
                            None => engine.evaluate(&snapshot),
                        };
                        (index, result)
                    })
                    .collect::<Vec<_>>()
            })
            .await;
            match joined {
                Ok(results) => Some(results),
                Err(e) => {
                    tracing::warn!("{} evaluation failed: {}", symbol, e);
                    None
                }
            }
        });
        handles.push(handle);
    }

    let mut slots: Vec<Option<DecisionResult>> = Vec::with_capacity(total);
    slots.resize_with(total, || None);
    for handle in handles {
        if let Ok(Some(results)) = handle.await {
            for (index, result) in results {
                slots[index] = Some(result);
            }
        }
    }
    slots.into_iter().flatten().collect()
}

/// Input positions grouped per symbol, groups ordered by first appearance.
fn group_by_symbol(
    snapshots: Vec<AnalysisSnapshot>,
) -> Vec<(String, Vec<(usize, AnalysisSnapshot)>)> {
    let mut groups: Vec<(String, Vec<(usize, AnalysisSnapshot)>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (index, snapshot) in snapshots.into_iter().enumerate() {
        let slot = *positions.entry(snapshot.symbol.clone()).or_insert_with(|| {
            groups.push((snapshot.symbol.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push((index, snapshot));
    }
    groups
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            print_usage();
            std::process::exit(2);
        }
    };
    init_tracing(args.json_logs);

    if args.rules {
        println!("weight table {}", WEIGHT_TABLE_VERSION);
        for line in rule_lines("short", short_term_rules())
            .into_iter()
            .chain(rule_lines("long", long_term_rules()))
        {
            println!("{}", line);
        }
        return Ok(());
    }
    if args.files.is_empty() {
        print_usage();
        std::process::exit(2);
    }

    let config = EngineConfig::from_env()?;
    let engine = Arc::new(DecisionEngine::new(config));

    let mut snapshots = Vec::new();
    for path in &args.files {
        match load_snapshots(path) {
            Ok(mut loaded) => {
                tracing::info!("{}: {} snapshots", path.display(), loaded.len());
                snapshots.append(&mut loaded);
            }
            Err(e) => tracing::warn!("Skipping {}: {:#}", path.display(), e),
        }
    }

    let store = match &args.memory {
        Some(path) => Some(Arc::new(load_store(path)?)),
        None => None,
    };

    tracing::info!(
        "decision-cli: {} snapshots, concurrency={}, memory={}",
        snapshots.len(),
        args.concurrency,
        args.memory.is_some()
    );
    let results = evaluate_all(engine, store.clone(), snapshots, args.concurrency).await;

    if let (Some(path), Some(store)) = (&args.memory, &store) {
        save_store(path, store)?;
    }

    let output = if args.pretty {
        serde_json::to_string_pretty(&results)?
    } else {
        serde_json::to_string(&results)?
    };
    println!("{}", output);

    if results.is_empty() {
        bail!("no snapshot was evaluated");
    }
    Ok(())
}
