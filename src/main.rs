use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufWriter};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use wikingest::config::{self, Credentials, IngestConfig, PacingConfig, StoreConfig};
use wikingest::ingest::{self, CancelFlag, StopReason};
use wikingest::pacer::IndexSetup;
use wikingest::store::ElasticStore;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "wikingest")]
#[command(about = "Stream Wikipedia dumps into a search index")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a dump into Elasticsearch
    Ingest(IngestArgs),
    /// Print assembled documents as JSON lines without writing anywhere
    Inspect(InspectArgs),
}

#[derive(Args)]
struct IngestArgs {
    /// Path to the Wikipedia dump file (.xml or .xml.bz2)
    #[arg(short, long)]
    input: String,

    /// Search store host, optionally with scheme
    #[arg(long, default_value = config::DEFAULT_HOST)]
    host: String,

    /// Search store port
    #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Target index name
    #[arg(long, default_value = config::DEFAULT_INDEX_NAME)]
    index: String,

    /// JSON file with the index settings and mappings
    #[arg(long)]
    mapping: Option<String>,

    /// Basic auth user
    #[arg(long)]
    user: Option<String>,

    /// Basic auth password
    #[arg(long)]
    password: Option<String>,

    /// Write as fast as the store accepts, without cooldowns
    #[arg(long)]
    no_throttle: bool,

    /// Documents between cooldowns
    #[arg(long, default_value_t = config::PACE_INTERVAL, value_parser = clap::value_parser!(u64).range(1..))]
    throttle_interval: u64,

    /// Cooldown length in seconds
    #[arg(long, default_value_t = config::PACE_COOLDOWN_SECS)]
    cooldown_secs: u64,

    /// Request timeout in seconds
    #[arg(long, default_value_t = config::HTTP_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Limit number of pages to process (for testing)
    #[arg(long)]
    limit: Option<u64>,

    /// Directory for checkpoint state (enables checkpointing)
    #[arg(long)]
    checkpoint_dir: Option<String>,

    /// Checkpoint interval in pages processed
    #[arg(long, default_value_t = config::CHECKPOINT_INTERVAL)]
    checkpoint_interval: u64,

    /// Resume from last checkpoint if available
    #[arg(long)]
    resume: bool,
}

#[derive(Args)]
struct InspectArgs {
    /// Path to the Wikipedia dump file (.xml or .xml.bz2)
    #[arg(short, long)]
    input: String,

    /// Limit number of pages to process
    #[arg(long)]
    limit: Option<u64>,
}

fn build_config(args: IngestArgs) -> Result<IngestConfig> {
    let Some(mapping_path) = args.mapping else {
        bail!("Please provide a mapping file using the --mapping option.");
    };
    if args.resume && args.checkpoint_dir.is_none() {
        bail!("--resume needs --checkpoint-dir");
    }
    let credentials = Credentials::from_args(args.user, args.password)?;

    Ok(IngestConfig {
        input: args.input,
        mapping_path,
        store: StoreConfig {
            host: args.host,
            port: args.port,
            index: args.index,
            credentials,
            timeout: Duration::from_secs(args.timeout_secs),
        },
        pacing: PacingConfig {
            enabled: !args.no_throttle,
            interval: args.throttle_interval,
            cooldown: Duration::from_secs(args.cooldown_secs),
        },
        limit: args.limit,
        resume: args.resume,
        checkpoint_dir: args.checkpoint_dir,
        checkpoint_interval: args.checkpoint_interval,
    })
}

fn run_ingest(args: IngestArgs) -> Result<()> {
    let config = build_config(args)?;

    info!(
        input = %config.input,
        url = %config.store.base_url(),
        index = %config.store.index,
        "Starting ingest"
    );

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("wikingest-worker")
        .enable_io()
        .enable_time()
        .build()?;

    let start = Instant::now();
    let summary = rt.block_on(async {
        let cancel = CancelFlag::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current page");
                on_signal.cancel();
            }
        });

        let store = ElasticStore::new(&config.store)?;
        ingest::run_ingest(&config, store, &cancel).await
    })?;
    let elapsed = start.elapsed();

    if let IndexSetup::Failed(reason) = &summary.index_setup {
        warn!(reason = %reason, "Index setup failed; documents were written assuming the index is usable");
    }

    let stats = &summary.stats;
    println!();
    println!("=== Summary ===");
    println!("Total time:         {:.2}s", elapsed.as_secs_f64());
    println!("Pages processed:    {}", stats.pages());
    println!("Documents written:  {}", stats.documents());
    println!("Redirects skipped:  {}", stats.redirects());
    println!("Write failures:     {}", stats.failures());
    match summary.outcome.stop {
        StopReason::EndOfInput => {}
        StopReason::Limit => println!("Stopped at page limit."),
        StopReason::Cancelled => println!(
            "Cancelled after {} pages; rerun with --resume to continue.",
            summary.outcome.pages_read
        ),
    }

    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let stdout = io::stdout();
    let out = BufWriter::new(stdout.lock());
    let counts = ingest::inspect_dump(&args.input, args.limit, out)?;
    info!(
        pages = counts.pages,
        documents = counts.documents,
        redirects = counts.redirects,
        "Inspect complete"
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Ingest(args) => run_ingest(args),
        Commands::Inspect(args) => run_inspect(args),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
