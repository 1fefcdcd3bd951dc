//! eodnorm CLI: batch normalization of per-symbol end-of-day files.
//!
//! Commands:
//! - `normalize`: normalize every symbol in a directory (or from a list)
//! - `calendar`: load a trading calendar and report its coverage
//! - `config`: print the default configuration as TOML

mod batch;
mod symbols;

use anyhow::{bail, Context, Result};
use batch::{run_batch, write_summary, OutputOptions};
use clap::{Parser, Subcommand, ValueEnum};
use eodnorm_core::data::OutputFormat;
use eodnorm_core::{NormalizeConfig, Normalizer, TradingCalendar};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "eodnorm",
    about = "eodnorm: end-of-day price normalization"
)]
struct Cli {
    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize per-symbol raw files into calendar-aligned, rebased series.
    Normalize {
        /// Directory of raw per-symbol files (`SYMBOL[_...].csv` or `.parquet`).
        #[arg(long)]
        input_dir: PathBuf,

        /// Tab-separated symbol list (`symbol [start [end]]`). Defaults to
        /// every file in the input directory.
        #[arg(long)]
        symbols: Option<PathBuf>,

        /// Trading calendar file, one date per line. Without it, or when it
        /// cannot be read, the raw date axis is kept.
        #[arg(long)]
        calendar: Option<PathBuf>,

        /// TOML config (field mapping, date format, outlier band).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for normalized files and summary.json.
        #[arg(long, default_value = "normalized")]
        output_dir: PathBuf,

        /// Output file format.
        #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
        format: FormatArg,

        /// Write a leading symbol column in every output file.
        #[arg(long, default_value_t = false)]
        include_symbol: bool,

        /// Worker threads. Defaults to one per core.
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Load a trading calendar and print its size and range.
    Calendar {
        /// Calendar file, one date per line.
        path: PathBuf,
    },
    /// Print the default configuration as TOML.
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Parquet,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Parquet => OutputFormat::Parquet,
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Normalize {
            input_dir,
            symbols,
            calendar,
            config,
            output_dir,
            format,
            include_symbol,
            jobs,
        } => run_normalize(NormalizeArgs {
            input_dir,
            symbols,
            calendar,
            config,
            output: OutputOptions {
                dir: output_dir,
                format: format.into(),
                include_symbol,
            },
            jobs,
        }),
        Commands::Calendar { path } => run_calendar(&path),
        Commands::Config => run_config(),
    }
}

struct NormalizeArgs {
    input_dir: PathBuf,
    symbols: Option<PathBuf>,
    calendar: Option<PathBuf>,
    config: Option<PathBuf>,
    output: OutputOptions,
    jobs: Option<usize>,
}

fn run_normalize(args: NormalizeArgs) -> Result<()> {
    if !args.input_dir.is_dir() {
        bail!("input directory does not exist: {}", args.input_dir.display());
    }

    let config = match &args.config {
        Some(path) => NormalizeConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => NormalizeConfig::default(),
    };
    let calendar = args
        .calendar
        .as_deref()
        .and_then(TradingCalendar::load_optional)
        .map(Arc::new);
    let normalizer = Normalizer::new(config, calendar);

    let jobs = match &args.symbols {
        Some(list) => {
            let requests = symbols::load_symbol_list(list)?;
            info!(symbols = requests.len(), list = %list.display(), "loaded symbol list");
            symbols::resolve_jobs(&args.input_dir, requests)?
        }
        None => symbols::discover_jobs(&args.input_dir)?,
    };
    if jobs.is_empty() {
        bail!("no symbols to normalize in {}", args.input_dir.display());
    }

    let summary = match args.jobs {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .context("building worker pool")?
            .install(|| run_batch(&normalizer, &jobs, &args.output)),
        None => run_batch(&normalizer, &jobs, &args.output),
    };
    let summary_path = write_summary(&summary, &args.output.dir)?;

    println!();
    println!("=== Normalization ===");
    println!("Symbols:        {}", summary.total);
    println!("Succeeded:      {}", summary.succeeded);
    println!("Failed:         {}", summary.failed);
    println!("With warnings:  {}", summary.with_warnings);
    println!("Summary:        {}", summary_path.display());

    if !summary.all_succeeded() {
        for outcome in summary.symbols.iter().filter(|o| !o.succeeded()) {
            eprintln!(
                "Error for {}: {}",
                outcome.symbol,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run_calendar(path: &Path) -> Result<()> {
    let calendar = TradingCalendar::load(path)?;
    println!("Calendar: {}", path.display());
    println!("Days:     {}", calendar.len());
    if let (Some(first), Some(last)) = (calendar.first(), calendar.last()) {
        println!("Range:    {first} to {last}");
    }
    Ok(())
}

fn run_config() -> Result<()> {
    print!("{}", NormalizeConfig::default().to_toml()?);
    Ok(())
}
