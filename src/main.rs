//! mft-timeline CLI
//!
//! Command-line interface for decoding extracted $MFT files.

use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use mft_timeline::{
    CsvWriter, JsonLinesWriter, MftFile, MftParser, MftPipeline, ParseConfig, RowWriter,
    ScanSummary,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// mft-timeline - Offline NTFS MFT decoder
///
/// Turns an extracted $MFT file into timeline rows with resolved paths,
/// timestamps and data run extents.
#[derive(Parser)]
#[command(name = "mft-timeline")]
#[command(author = "mft-timeline Contributors")]
#[command(version)]
#[command(about = "Offline NTFS MFT decoder", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Pipe-delimited CSV
    Csv,
    /// One JSON object per line
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode every record and write timeline rows
    Parse {
        /// Extracted $MFT file
        #[arg(short, long)]
        mft: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: OutputFormat,

        /// Volume cluster size in bytes
        #[arg(short = 'c', long, default_value = "4096")]
        bytes_per_cluster: u64,

        /// Volume letter for the root path prefix
        #[arg(long, default_value = "C")]
        volume: char,

        /// Directory pass workers (default: available parallelism)
        #[arg(long)]
        workers: Option<usize>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Print the resolved directory tree
    Dirs {
        /// Extracted $MFT file
        #[arg(short, long)]
        mft: PathBuf,

        /// Volume letter for the root path prefix
        #[arg(long, default_value = "C")]
        volume: char,
    },

    /// Decode a single record slot and print it as JSON
    Record {
        /// Extracted $MFT file
        #[arg(short, long)]
        mft: PathBuf,

        /// MFT record number (slot index)
        record: u64,

        /// Volume cluster size in bytes
        #[arg(short = 'c', long, default_value = "4096")]
        bytes_per_cluster: u64,
    },
}

fn main() {
    let cli = Cli::parse();
    mft_timeline::logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Parse {
            mft,
            output,
            format,
            bytes_per_cluster,
            volume,
            workers,
            no_progress,
        } => {
            let mut config = ParseConfig::default()
                .with_bytes_per_cluster(bytes_per_cluster)
                .with_volume_letter(volume);
            if let Some(workers) = workers {
                config = config.with_workers(workers);
            }
            cmd_parse(&mft, output.as_deref(), format, config, !no_progress)
        }

        Commands::Dirs { mft, volume } => cmd_dirs(&mft, volume),

        Commands::Record {
            mft,
            record,
            bytes_per_cluster,
        } => cmd_record(&mft, record, bytes_per_cluster),
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Parse command implementation
fn cmd_parse(
    mft_path: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    config: ParseConfig,
    show_progress: bool,
) -> mft_timeline::Result<()> {
    let start = Instant::now();
    let pipeline = MftPipeline::new(config)?;
    let mft = MftFile::open(mft_path)?;

    eprintln!(
        "{} Decoding {} ({}, {} records)",
        style("→").cyan().bold(),
        style(mft_path.display()).yellow(),
        format_size(mft.len(), BINARY),
        mft.record_count()
    );

    let pipeline = if show_progress {
        pipeline.with_progress(progress_bar(mft.record_count()))
    } else {
        pipeline
    };

    let out: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut cursor = mft.cursor();
    let summary = match format {
        OutputFormat::Csv => run_with(&pipeline, &mut cursor, CsvWriter::new(out))?,
        OutputFormat::Json => run_with(&pipeline, &mut cursor, JsonLinesWriter::new(out))?,
    };

    print_summary(&summary, start);
    Ok(())
}

fn run_with<W: RowWriter>(
    pipeline: &MftPipeline,
    cursor: &mut io::Cursor<&[u8]>,
    mut writer: W,
) -> mft_timeline::Result<ScanSummary> {
    pipeline.run(cursor, &mut writer)
}

fn print_summary(summary: &ScanSummary, start: Instant) {
    eprintln!();
    eprintln!(
        "{} Decoded in {}",
        style("✓").green().bold(),
        style(HumanDuration(start.elapsed())).cyan()
    );
    eprintln!("  {} {}", style("Records:").bold(), summary.records_read);
    eprintln!("  {} {}", style("Rows:").bold(), summary.rows_emitted);
    eprintln!(
        "  {} {} ({} orphaned)",
        style("Directories:").bold(),
        summary.directories,
        summary.orphaned_directories
    );
    if summary.records_skipped > 0 {
        eprintln!(
            "  {} {}",
            style("Skipped:").bold(),
            style(summary.records_skipped).yellow()
        );
    }
    if summary.attribute_errors > 0 {
        eprintln!(
            "  {} {}",
            style("Attribute errors:").bold(),
            style(summary.attribute_errors).red()
        );
    }
}

/// Dirs command implementation
fn cmd_dirs(mft_path: &Path, volume: char) -> mft_timeline::Result<()> {
    let pipeline = MftPipeline::new(ParseConfig::default().with_volume_letter(volume))?;
    let mft = MftFile::open(mft_path)?;
    let tree = pipeline.build_directory_tree(mft.cursor())?;

    let mut entries: Vec<(u64, &str)> = tree.iter().collect();
    entries.sort_unstable_by_key(|&(record, _)| record);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for (record, path) in entries {
        writeln!(out, "{}\t{}", record, path)?;
    }
    out.flush()?;

    eprintln!(
        "{} {} directories, {} orphaned",
        style("✓").green().bold(),
        tree.len(),
        style(tree.orphan_count()).yellow()
    );
    Ok(())
}

/// Record command implementation
fn cmd_record(
    mft_path: &Path,
    record_number: u64,
    bytes_per_cluster: u64,
) -> mft_timeline::Result<()> {
    let parser = MftParser::new(bytes_per_cluster)?;
    let mft = MftFile::open(mft_path)?;

    let mut slot = match mft.record_slot(record_number) {
        Some(slot) => slot.to_vec(),
        None => {
            return Err(mft_timeline::MftError::Configuration(format!(
                "record {} is past the end of {} ({} records)",
                record_number,
                mft_path.display(),
                mft.record_count()
            )))
        }
    };

    let record = parser.parse_record(&mut slot)?;
    let value = serde_json::json!({
        "record_number": record.record_number(),
        "directory": record.is_directory(),
        "deleted": record.is_deleted(),
        "attributes_offset": record.header.attributes_offset,
        "standard_information": record.standard_information,
        "file_names": record.file_names,
        "data": record.data,
        "attribute_errors": record
            .attribute_errors
            .iter()
            .map(|e| format!("{}: {}", e.kind(), e))
            .collect::<Vec<_>>(),
    });

    let json = serde_json::to_string_pretty(&value).map_err(io::Error::from)?;
    println!("{}", json);
    Ok(())
}
