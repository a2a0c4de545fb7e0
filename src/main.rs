use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use setlist_curator::config::{self, AppConfig, CliConfig, FileConfig};
use setlist_curator::curated_store::{ErrorLog, SqliteCuratedStore};
use setlist_curator::entity_kind::EntityKind;
use setlist_curator::load::load_file;
use setlist_curator::metrics;
use setlist_curator::orchestrator::Orchestrator;
use setlist_curator::raw_store::SqliteRawStore;
use setlist_curator::reconcile::Reconciler;
use setlist_curator::transform::TransformContext;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(name = "setlist-curator")]
#[command(about = "Transforms raw setlist API records into curated tables")]
struct CliArgs {
    /// Directory holding raw.db and curated.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Optional TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Raw records fetched per batch.
    #[clap(long, default_value_t = config::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Batches processed per entity kind in one pass.
    #[clap(long, default_value_t = config::DEFAULT_MAX_BATCHES_PER_KIND)]
    pub max_batches_per_kind: usize,

    /// Worker threads per transformer. 1 processes rows sequentially.
    #[clap(long, default_value_t = config::DEFAULT_WORKERS)]
    pub workers: usize,

    /// Messages shown per entity kind in the error summary.
    #[clap(long, default_value_t = config::DEFAULT_ERROR_SAMPLE_SIZE)]
    pub error_sample_size: usize,

    /// Ids listed per difference in a reconciliation report.
    #[clap(long, default_value_t = config::DEFAULT_RECONCILE_SAMPLE_SIZE)]
    pub reconcile_sample_size: usize,

    /// Directory of exported `<name>_<year>.json` snapshots to reconcile against.
    #[clap(long, value_parser = parse_path)]
    pub json_dir: Option<PathBuf>,

    /// Print Prometheus metrics to stdout before exiting.
    #[clap(long, default_value_t = false)]
    pub print_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Runs every transformer once, in dependency order.
    Run {
        /// Print the run report as JSON.
        #[clap(long, default_value_t = false)]
        json: bool,
    },

    /// Runs the transformer of a single entity kind.
    RunKind {
        kind: EntityKind,

        #[clap(long, default_value_t = false)]
        json: bool,
    },

    /// Shows the error summary, or recent entries with --limit.
    Errors {
        #[clap(long)]
        kind: Option<EntityKind>,

        /// Print this many recent entries instead of the summary.
        #[clap(long)]
        limit: Option<usize>,
    },

    /// Compares external ids per year across raw and curated layers.
    Reconcile {
        #[clap(long, default_value = "setlist_entry")]
        kind: EntityKind,

        /// Comma separated list, e.g. 2023,2024.
        #[clap(long, value_delimiter = ',')]
        years: Vec<i32>,

        /// Write the report here instead of stdout.
        #[clap(long, value_parser = parse_path)]
        output: Option<PathBuf>,
    },

    /// Appends the `data` array of an exported JSON file to the raw store.
    Load {
        #[clap(long)]
        kind: EntityKind,

        #[clap(value_parser = parse_path)]
        file: PathBuf,
    },
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            json_dir: self.json_dir.clone(),
            batch_size: self.batch_size,
            max_batches_per_kind: self.max_batches_per_kind,
            workers: self.workers,
            error_sample_size: self.error_sample_size,
            reconcile_sample_size: self.reconcile_sample_size,
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    metrics::init_metrics();

    info!("Opening raw store at {:?}...", app_config.raw_db_path());
    let raw_store = Arc::new(SqliteRawStore::new(app_config.raw_db_path())?);
    info!("Opening curated store at {:?}...", app_config.curated_db_path());
    let curated_store = Arc::new(SqliteCuratedStore::new(app_config.curated_db_path())?);

    match cli_args.command {
        Command::Run { json } => {
            let ctx = TransformContext::new(
                raw_store,
                curated_store.clone(),
                curated_store,
                app_config.transform_settings(),
            );
            let report = Orchestrator::new(ctx).run_full_pass();
            if json {
                print_json(&report)?;
            } else {
                for (kind, counts) in report.by_kind() {
                    match counts.error {
                        Some(error) => println!("{:<20} FAILED: {}", kind.as_str(), error),
                        None => println!(
                            "{:<20} succeeded={:<6} skipped={:<6} failed={:<6} {}ms",
                            kind.as_str(),
                            counts.succeeded,
                            counts.skipped,
                            counts.failed,
                            counts.elapsed_ms
                        ),
                    }
                }
                println!(
                    "total: attempted={} succeeded={} skipped={} failed={} in {}ms",
                    report.total_attempted,
                    report.total_succeeded,
                    report.total_skipped,
                    report.total_failed,
                    report.total_elapsed_ms
                );
            }
        }
        Command::RunKind { kind, json } => {
            let ctx = TransformContext::new(
                raw_store,
                curated_store.clone(),
                curated_store,
                app_config.transform_settings(),
            );
            let summary = Orchestrator::new(ctx).run_kind(kind)?;
            if json {
                print_json(&summary)?;
            } else {
                println!(
                    "{}: attempted={} inserted={} updated={} unchanged={} skipped={} failed={} in {}ms",
                    kind,
                    summary.attempted,
                    summary.inserted,
                    summary.updated,
                    summary.unchanged,
                    summary.skipped,
                    summary.failed,
                    summary.elapsed_ms
                );
            }
        }
        Command::Errors { kind, limit } => match limit {
            Some(limit) => print_json(&curated_store.recent_errors(kind, limit)?)?,
            None => {
                let summary = curated_store.error_summary(app_config.error_sample_size)?;
                let summary: Vec<_> = match kind {
                    Some(kind) => summary
                        .into_iter()
                        .filter(|s| s.entity_kind == kind.as_str())
                        .collect(),
                    None => summary,
                };
                print_json(&summary)?;
            }
        },
        Command::Reconcile {
            kind,
            years,
            output,
        } => {
            if years.is_empty() {
                warn!("No years given, nothing to reconcile");
            }
            let mut reconciler =
                Reconciler::new(raw_store, curated_store, app_config.reconcile_sample_size);
            if let Some(dir) = &app_config.json_dir {
                reconciler = reconciler.with_json_dir(dir.clone());
            }
            let report = reconciler.reconcile(kind, &years)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, serde_json::to_string_pretty(&report)?)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Wrote reconciliation report to {}", path.display());
                }
                None => print_json(&report)?,
            }
        }
        Command::Load { kind, file } => {
            let summary = load_file(raw_store.as_ref(), kind, &file)?;
            print_json(&summary)?;
        }
    }

    if cli_args.print_metrics {
        print!("{}", metrics::render());
    }
    Ok(())
}
