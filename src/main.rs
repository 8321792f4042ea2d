//! walkstat - storage usage reports from parallel file-walk CSV output.
//!
//! Usage:
//!   walkstat import <CSVPATH>            Build a snapshot store of directory rollups
//!   walkstat hotspots [STORE]            Write the hotspot CSV and summary
//!   walkstat info total <CSVPATH>        Total file bytes
//!   walkstat info filetypes <CSVPATH>    Bytes per file extension
//!   walkstat info duplicates <CSVPATH>   Likely duplicate files
//!   walkstat --help                      Show help

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail, eyre};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use walkstat_analyze::{
    AgeBoundaries, DuplicateConfig, DuplicateFinder, DuplicateReport, FileTypeAggregator,
    FileTypeReport, HotspotConfig, HotspotExtractor, HotspotSummary, SystemOwnerResolver,
    format_age,
};
use walkstat_core::units::{GIB, KIB, MIB, TIB};
use walkstat_ingest::{CsvIngestor, DEFAULT_STORE, IngestConfig, Inventory, Snapshot};

/// Hotspot CSV columns.
const HOTSPOT_HEADER: [&str; 10] = [
    "folder",
    "user",
    "group",
    "days_acc",
    "days_mod",
    "fileCount",
    "dirSizeSum",
    "TiB",
    "GiB",
    "MiBAvg",
];

/// Duplicate CSV columns.
const DUPLICATE_HEADER: [&str; 5] = ["filename", "modified", "bytesize", "no", "duplicates"];

#[derive(Parser)]
#[command(
    name = "walkstat",
    version,
    about = "Storage usage reports from parallel file-walk CSV output",
    long_about = "walkstat reads the CSV files written by a parallel file-system walker \
                  and reports where the space goes: large directory subtrees (hotspots), \
                  how long they have gone untouched, bytes per file type, and files that \
                  look like copies of each other."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Number of threads for CSV parsing (0 = all cores)
    #[arg(
        short = 'c',
        long,
        global = true,
        env = "SLURM_CPUS_ON_NODE",
        default_value_t = 0
    )]
    threads: usize,

    /// Skip input files with missing columns instead of failing
    #[arg(long, global = true)]
    lenient: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest walker CSV output into a snapshot store
    Import {
        /// CSV file or folder of CSV files
        csvpath: PathBuf,

        /// Snapshot store to write
        #[arg(short, long, default_value = DEFAULT_STORE)]
        store: PathBuf,
    },

    /// Report directories above a size threshold
    Hotspots {
        /// Snapshot store written by `import`
        #[arg(default_value = DEFAULT_STORE)]
        store: PathBuf,

        /// Minimum subtree size in GiB
        #[arg(short, long, default_value_t = 10.0)]
        threshold: f64,

        /// Age boundaries in days, comma separated
        #[arg(short, long, value_delimiter = ',')]
        ages: Vec<u64>,

        /// Output CSV (defaults to the store name with a .csv extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Quick reports straight from CSV input
    Info {
        #[command(subcommand)]
        command: InfoCommand,
    },
}

#[derive(Subcommand)]
enum InfoCommand {
    /// Total bytes of all files
    #[command(alias = "tot")]
    Total {
        /// CSV file or folder of CSV files
        csvpath: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Bytes and share per file extension
    #[command(alias = "typ")]
    Filetypes {
        /// CSV file or folder of CSV files
        csvpath: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Files sharing name, modification time and size
    #[command(alias = "dup")]
    Duplicates {
        /// CSV file or folder of CSV files
        csvpath: PathBuf,

        /// Output CSV
        #[arg(short, long, default_value = "duplicates.csv")]
        outfile: PathBuf,

        /// Only consider files larger than this (e.g., "1MiB", "500K")
        #[arg(short, long, default_value = "1MiB")]
        min_size: String,

        /// Skip paths containing this text (replaces the miniconda defaults)
        #[arg(short, long)]
        exclude: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    init_tracing(cli.debug);

    let options = IngestOptions {
        threads: cli.threads,
        lenient: cli.lenient,
    };

    match cli.command {
        Command::Import { csvpath, store } => run_import(&csvpath, &store, options),
        Command::Hotspots {
            store,
            threshold,
            ages,
            output,
        } => run_hotspots(&store, threshold, ages, output),
        Command::Info { command } => match command {
            InfoCommand::Total { csvpath, format } => run_total(&csvpath, options, format),
            InfoCommand::Filetypes { csvpath, format } => run_filetypes(&csvpath, options, format),
            InfoCommand::Duplicates {
                csvpath,
                outfile,
                min_size,
                exclude,
            } => run_duplicates(&csvpath, options, &outfile, &min_size, exclude),
        },
    }
}

fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "walkstat={level},walkstat_ingest={level},walkstat_analyze={level}"
        ))
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[derive(Debug, Clone, Copy)]
struct IngestOptions {
    threads: usize,
    lenient: bool,
}

/// Read CSV input and log anything that was skipped.
fn ingest(csvpath: &Path, options: IngestOptions) -> Result<Inventory> {
    let config = IngestConfig::builder()
        .input(csvpath)
        .threads(options.threads)
        .strict_schema(!options.lenient)
        .build()
        .map_err(|e| eyre!("{e}"))?;

    let inventory = CsvIngestor::new().ingest(&config)?;

    for warning in &inventory.warnings {
        warn!("{warning}");
    }
    if inventory.stats.warnings_suppressed > 0 {
        warn!(
            suppressed = inventory.stats.warnings_suppressed,
            "Further warnings were not shown"
        );
    }
    debug!(
        files = inventory.stats.files_read,
        rows = inventory.stats.rows_read,
        kept = inventory.stats.rows_kept,
        malformed = inventory.stats.malformed_rows,
        elapsed = ?inventory.stats.duration,
        "Ingest finished"
    );

    Ok(inventory)
}

/// Build the snapshot store.
fn run_import(csvpath: &Path, store: &Path, options: IngestOptions) -> Result<()> {
    let inventory = ingest(csvpath, options)?;
    let snapshot = Snapshot::from_inventory(&inventory);
    snapshot
        .save(store)
        .wrap_err_with(|| format!("Failed to write {}", store.display()))?;

    report(|out| {
        writeln!(
            out,
            "Imported {} rollups ({}) from {} file(s) into {}",
            snapshot.rollups.len(),
            format_size(snapshot.corpus_bytes()),
            inventory.stats.files_read,
            store.display()
        )
    })
}

/// Stream hotspot rows to CSV and print the summary.
fn run_hotspots(store: &Path, threshold: f64, ages: Vec<u64>, output: Option<PathBuf>) -> Result<()> {
    let age_boundaries = if ages.is_empty() {
        AgeBoundaries::default()
    } else {
        AgeBoundaries::new(ages)?
    };
    let config = HotspotConfig::builder()
        .threshold_gib(threshold)
        .age_boundaries(age_boundaries)
        .build()
        .map_err(|e| eyre!("{e}"))?;

    let inventory = Snapshot::load(store)?.into_inventory();
    let output = output.unwrap_or_else(|| Snapshot::report_path_for(store));

    info!(threshold_gib = threshold, store = %store.display(), "Querying hotspots");

    let extractor = HotspotExtractor::with_config(config);
    let resolver = SystemOwnerResolver::cached();
    let mut summary = extractor.summary(&inventory);

    let file = File::create(&output)
        .wrap_err_with(|| format!("Failed to create {}", output.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));
    writer.write_record(HOTSPOT_HEADER)?;
    for row in extractor.hotspots(&inventory, &resolver) {
        summary.record(&row);
        writer.serialize(&row)?;
    }
    writer.flush()?;

    report(|out| write_hotspot_summary(out, &summary, &output))
}

fn write_hotspot_summary(out: &mut dyn Write, summary: &HotspotSummary, output: &Path) -> io::Result<()> {
    writeln!(out, " Entire data consumption: {} TiB", tib(summary.corpus_bytes))?;
    writeln!(
        out,
        " Wrote {} with {} hotspots containing {} TiB total",
        output.display(),
        summary.hotspot_count,
        tib(summary.total_bytes)
    )?;
    for (days, bytes) in summary.aged.iter() {
        writeln!(
            out,
            "  {} TiB have not been accessed for {}",
            tib(bytes),
            format_age(days)
        )?;
    }
    Ok(())
}

#[derive(Serialize)]
struct Totals {
    total_bytes: u64,
    total_gib: f64,
    files: usize,
    directories: usize,
    corpus_bytes: u64,
}

/// Total bytes of file rows.
fn run_total(csvpath: &Path, options: IngestOptions, format: OutputFormat) -> Result<()> {
    let inventory = ingest(csvpath, options)?;
    let totals = Totals {
        total_bytes: inventory.file_bytes(),
        total_gib: round3(inventory.file_bytes() as f64 / GIB as f64),
        files: inventory.files().count(),
        directories: inventory.directories().count(),
        corpus_bytes: inventory.corpus_bytes(),
    };

    match format {
        OutputFormat::Text => report(|out| {
            writeln!(out, "Total Bytes: {}", totals.total_bytes)?;
            writeln!(out, "Total   GiB: {:.3}", totals.total_gib)
        }),
        OutputFormat::Json => print_json(&totals),
    }
}

/// Bytes per extension.
fn run_filetypes(csvpath: &Path, options: IngestOptions, format: OutputFormat) -> Result<()> {
    let inventory = ingest(csvpath, options)?;
    let report_data = FileTypeAggregator::new().aggregate(&inventory);

    match format {
        OutputFormat::Text => report(|out| write_filetypes(out, &report_data)),
        OutputFormat::Json => print_json(&report_data),
    }
}

fn write_filetypes(out: &mut dyn Write, report: &FileTypeReport) -> io::Result<()> {
    writeln!(out, "Extension, %, Bytes")?;
    for row in &report.rows {
        let extension = if row.extension.is_empty() {
            "(none)"
        } else {
            row.extension.as_str()
        };
        writeln!(out, "{}, {:.2}, {}", extension, row.share, row.bytes)?;
    }
    writeln!(out)?;
    writeln!(out, "{}", "─".repeat(28))?;
    writeln!(out, "Total File types: {}", report.rows.len())?;
    writeln!(out, "Total Bytes: {}", report.total_bytes)?;
    writeln!(out, "Total GiB: {:.3}", report.total_bytes as f64 / GIB as f64)
}

/// Write the duplicate CSV and print the reclaimable total.
fn run_duplicates(
    csvpath: &Path,
    options: IngestOptions,
    outfile: &Path,
    min_size: &str,
    exclude: Vec<String>,
) -> Result<()> {
    let min_bytes = parse_size(min_size)?;
    let mut builder = DuplicateConfig::builder();
    builder.min_size(min_bytes);
    if !exclude.is_empty() {
        builder.exclude_patterns(exclude);
    }
    let config = builder.build().map_err(|e| eyre!("{e}"))?;

    let inventory = ingest(csvpath, options)?;
    let duplicates = DuplicateFinder::with_config(config).find_duplicates(&inventory);

    info!(outfile = %outfile.display(), clusters = duplicates.clusters.len(), "Writing duplicates");
    write_duplicates_csv(outfile, &duplicates)?;

    report(|out| {
        writeln!(
            out,
            "Extra/duplicate data: {} Bytes or {:.3} GiB",
            duplicates.extra_bytes,
            duplicates.extra_bytes as f64 / GIB as f64
        )
    })
}

fn write_duplicates_csv(outfile: &Path, report: &DuplicateReport) -> Result<()> {
    let mut writer = csv::Writer::from_path(outfile)
        .wrap_err_with(|| format!("Failed to create {}", outfile.display()))?;
    writer.write_record(DUPLICATE_HEADER)?;
    for cluster in &report.clusters {
        let paths = serde_json::to_string(&cluster.paths)?;
        writer.write_record([
            cluster.stem.clone(),
            cluster.modified.to_string(),
            cluster.size.to_string(),
            cluster.count().to_string(),
            paths,
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write text to stdout; a closed pipe ends output quietly.
fn report(write: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> Result<()> {
    report_to(&mut io::stdout().lock(), write)
}

fn report_to<W: Write>(out: &mut W, write: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> Result<()> {
    match write(&mut *out).and_then(|()| out.flush()) {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => Ok(other?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    report(|out| writeln!(out, "{json}"))
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// TiB rounded to three places.
fn tib(bytes: u64) -> f64 {
    round3(bytes as f64 / TIB as f64)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Parse a size string (e.g., "1024", "500K", "1MiB", "2GB"). Units are binary.
fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();
    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (num, unit) = s.split_at(split);

    let num: f64 = num
        .parse()
        .wrap_err_with(|| format!("Invalid size: {s}"))?;
    let multiplier = match unit.trim() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => KIB,
        "M" | "MB" | "MIB" => MIB,
        "G" | "GB" | "GIB" => GIB,
        "T" | "TB" | "TIB" => TIB,
        other => bail!("Unknown size unit: {other}"),
    };

    Ok((num * multiplier as f64) as u64)
}
