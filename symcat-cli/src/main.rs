//! Symcat CLI — catalog, sanitize, and inspect commands.
//!
//! Commands:
//! - `catalog` — scan per-symbol price files and write the symbol catalog
//! - `sanitize` — rewrite numeric columns of price files in place
//! - `inspect` — print an existing catalog with human-readable dates

use anyhow::{bail, Context, Result};
use chrono::DateTime;
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use symcat_core::catalog::{Catalog, CatalogBuilder, CatalogError};
use symcat_core::data::{expand_globs, ScanError};
use symcat_core::{
    CancelToken, ExclusionSet, NormalizeError, Normalizer, PathTemplate, StdoutProgress,
    StreamScanner, SymcatConfig, TemplateSet,
};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Exit status for a run where some items failed.
const EXIT_FAILED: i32 = 1;

/// Exit status for a run stopped by an interrupt.
const EXIT_CANCELLED: i32 = 130;

#[derive(Parser)]
#[command(
    name = "symcat",
    version,
    about = "Symcat CLI — symbol catalogs and column normalization for price files"
)]
struct Cli {
    /// Verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a TOML config file. Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the symbol catalog from path templates, highest precedence first.
    Catalog {
        /// Templates with exactly one `*` standing for the symbol (e.g. 'data/A/*.csv').
        #[arg(required = true, value_parser = parse_template)]
        templates: Vec<PathTemplate>,

        /// Exclusion file, one symbol per line. Overrides `catalog.exclusion_file`.
        #[arg(long)]
        exclude: Option<PathBuf>,

        /// Catalog output path. Overrides `catalog.output`.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Normalize numeric columns of every file matching the glob patterns, in place.
    Sanitize {
        /// Glob patterns (e.g. 'resources/**/*.csv').
        #[arg(required = true)]
        patterns: Vec<String>,
    },
    /// Print an existing catalog.
    Inspect {
        /// Catalog path. Defaults to `catalog.output`.
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Only show these symbols.
        symbols: Vec<String>,

        /// Emit JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn parse_template(raw: &str) -> Result<PathTemplate, String> {
    PathTemplate::parse(raw).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = match &cli.config {
        Some(path) => SymcatConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SymcatConfig::default(),
    };

    let cancel = CancelToken::new();

    let status = match cli.command {
        Commands::Catalog {
            templates,
            exclude,
            output,
        } => {
            cancel_on_interrupt(cancel.clone())?;
            run_catalog(&config, templates, exclude, output, &cancel)?
        }
        Commands::Sanitize { patterns } => {
            cancel_on_interrupt(cancel.clone())?;
            run_sanitize(&config, &patterns, &cancel)?
        }
        Commands::Inspect {
            catalog,
            symbols,
            json,
        } => {
            let path = catalog.unwrap_or_else(|| config.catalog.output.clone());
            run_inspect(&path, &symbols, json)?;
            0
        }
    };

    if status != 0 {
        std::process::exit(status);
    }
    Ok(())
}

/// Cancel `token` on the first Ctrl+C so the row loops stop and clean up.
/// A second Ctrl+C exits at once.
fn cancel_on_interrupt(token: CancelToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start signal runtime")?;

    std::thread::spawn(move || {
        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            warn!("interrupt received, stopping");
            token.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(EXIT_CANCELLED);
            }
        });
    });
    Ok(())
}

fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")
}

fn run_catalog(
    config: &SymcatConfig,
    templates: Vec<PathTemplate>,
    exclude: Option<PathBuf>,
    output: Option<PathBuf>,
    cancel: &CancelToken,
) -> Result<i32> {
    let templates = TemplateSet::new(templates)?;

    let exclusions = match exclude.or_else(|| config.catalog.exclusion_path()) {
        Some(path) => ExclusionSet::from_path(&path)
            .with_context(|| format!("loading exclusion list {}", path.display()))?,
        None => ExclusionSet::default(),
    };
    let output = output.unwrap_or_else(|| config.catalog.output.clone());

    let settings = config.scan_settings();
    let scanner = StreamScanner::new(&settings, cancel);
    let builder = CatalogBuilder::new(&templates, &exclusions, scanner);

    let (catalog, summary) = match builder.build(&StdoutProgress) {
        Ok(result) => result,
        Err(CatalogError::Scan(ScanError::Cancelled)) => {
            eprintln!("Cancelled; catalog not written");
            return Ok(EXIT_CANCELLED);
        }
        Err(e) => return Err(e).context("building catalog"),
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    catalog
        .write_path(&output)
        .with_context(|| format!("writing catalog {}", output.display()))?;

    info!(
        resolved = summary.resolved,
        unresolved = summary.failures.len(),
        excluded = summary.excluded,
        "catalog written"
    );
    println!(
        "Wrote {} symbols to {} ({} without valid data, {} excluded)",
        catalog.len(),
        output.display(),
        summary.failures.len(),
        summary.excluded
    );

    Ok(0)
}

fn run_sanitize(config: &SymcatConfig, patterns: &[String], cancel: &CancelToken) -> Result<i32> {
    let files = expand_globs(patterns)?;
    if files.is_empty() {
        bail!("no files match {}", patterns.join(", "));
    }

    let settings = config.normalize_settings();
    let normalizer = Normalizer::new(&settings, cancel);

    let summary = match normalizer.normalize_all(files.iter().map(PathBuf::as_path), &StdoutProgress)
    {
        Ok(summary) => summary,
        Err(NormalizeError::Cancelled) => {
            eprintln!("Cancelled; remaining files untouched");
            return Ok(EXIT_CANCELLED);
        }
        Err(e) => return Err(e).context("normalizing files"),
    };

    let skipped = summary.reports.iter().filter(|r| r.skipped_empty).count();
    println!(
        "Rewrote {} cells across {} files ({} empty, {} failed)",
        summary.cells_rewritten(),
        summary.reports.len(),
        skipped,
        summary.failures.len()
    );

    if !summary.all_succeeded() {
        for (path, err) in &summary.failures {
            eprintln!("Error for {}: {err}", path.display());
        }
        return Ok(EXIT_FAILED);
    }

    Ok(0)
}

fn run_inspect(path: &Path, symbols: &[String], json: bool) -> Result<()> {
    let catalog =
        Catalog::from_path(path).with_context(|| format!("reading catalog {}", path.display()))?;

    let entries: Vec<_> = if symbols.is_empty() {
        catalog.entries().iter().collect()
    } else {
        let mut selected = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            match catalog.get(symbol) {
                Some(entry) => selected.push(entry),
                None => bail!("symbol {symbol} not in {}", path.display()),
            }
        }
        selected
    };

    if json {
        let rows: Vec<_> = entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "symbol": e.symbol,
                    "start": e.start,
                    "end": e.end,
                    "start_utc": format_utc(e.start),
                    "end_utc": format_utc(e.end),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Catalog is empty: {}", path.display());
        return Ok(());
    }

    println!("Catalog: {}", path.display());
    println!("Symbols: {}", entries.len());
    println!();
    println!("{:<10} {:<20} {:<20} {:>8}", "Symbol", "Start (UTC)", "End (UTC)", "Days");
    println!("{}", "-".repeat(61));
    for entry in &entries {
        let days = span_days(entry.start, entry.end);
        println!(
            "{:<10} {:<20} {:<20} {:>8.1}",
            entry.symbol,
            format_utc(entry.start),
            format_utc(entry.end),
            days
        );
    }

    Ok(())
}

/// Days between two epoch-second stamps. Computed in `f64` so no input overflows.
fn span_days(start: i64, end: i64) -> f64 {
    (end as f64 - start as f64) / 86_400.0
}

fn format_utc(seconds: i64) -> String {
    DateTime::from_timestamp(seconds, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| seconds.to_string())
}
