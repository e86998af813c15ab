mod artifacts;
mod reports;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use artifacts::{write_batch_report, write_batch_tables, write_run_report};
use reports::{
    BatchReport, generate_batch_console_report, generate_batch_markdown_report,
    generate_json_report, generate_run_console_report, generate_run_markdown_report,
};
use roguelab_core::{
    DEFAULT_EXTENSION, LoadOptions, Parallelism, analyze_run, load_run, load_runs_from_directory,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Colored summary for a terminal
    Console,
    /// The markdown report, also printed to stdout
    Markdown,
    /// Analysis structures as pretty JSON
    Json,
}

#[derive(Debug, Clone, clap::Args)]
struct ReportOptions {
    /// Directory that receives report files
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// What to print to stdout
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze a single telemetry file
    Run {
        /// JSON-lines telemetry file
        file: PathBuf,

        #[command(flatten)]
        options: ReportOptions,
    },
    /// Analyze every telemetry file in a directory
    Batch {
        /// Directory containing telemetry files
        directory: PathBuf,

        #[command(flatten)]
        options: ReportOptions,

        /// Skip runs_summary.csv and damage_events.csv
        #[arg(long)]
        no_csv: bool,

        /// Reconstruct files on this many threads (0 = one per core)
        #[arg(long)]
        workers: Option<usize>,

        /// Extension of telemetry files, without the dot
        #[arg(long, default_value = DEFAULT_EXTENSION)]
        extension: String,
    },
}

#[derive(Debug, Parser)]
#[command(name = "roguelab-report", version)]
#[command(about = "Reconstruct RogueLab runs from telemetry and report balance statistics")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose logging (debug level unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut stdout = BufWriter::new(io::stdout().lock());
    execute(&args, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn announce_banner<W: Write>(writer: &mut W) -> Result<()> {
    writeln!(writer, "{}", "🗡️  RogueLab Telemetry Report".bright_cyan().bold())?;
    writeln!(writer, "{}", "============================".cyan())?;
    Ok(())
}

fn execute<W: Write>(args: &Args, writer: &mut W) -> Result<()> {
    match &args.command {
        Command::Run { file, options } => report_run(file, options, writer),
        Command::Batch {
            directory,
            options,
            no_csv,
            workers,
            extension,
        } => {
            let load_options = LoadOptions {
                extension: extension.clone(),
                parallelism: workers.map_or(Parallelism::Sequential, Parallelism::Threads),
            };
            report_batch(directory, options, &load_options, !no_csv, writer)
        }
    }
}

fn report_run<W: Write>(file: &Path, options: &ReportOptions, writer: &mut W) -> Result<()> {
    let run = load_run(file)
        .with_context(|| format!("failed to load run from {}", file.display()))?;
    let analysis = analyze_run(&run);

    match options.report {
        ReportFormat::Console => {
            announce_banner(writer)?;
            generate_run_console_report(writer, &run, &analysis)?;
        }
        ReportFormat::Markdown => generate_run_markdown_report(writer, &run, &analysis)?,
        ReportFormat::Json => generate_json_report(writer, &analysis)?,
    }

    let report_path = write_run_report(&options.output, &run, &analysis)?;
    if options.report == ReportFormat::Console {
        writeln!(writer)?;
        writeln!(writer, "📝 Report saved to: {}", report_path.display())?;
    }
    Ok(())
}

fn report_batch<W: Write>(
    directory: &Path,
    options: &ReportOptions,
    load_options: &LoadOptions,
    write_tables: bool,
    writer: &mut W,
) -> Result<()> {
    if !directory.is_dir() {
        bail!("directory not found: {}", directory.display());
    }
    let batch = load_runs_from_directory(directory, load_options)
        .with_context(|| format!("failed to load runs from {}", directory.display()))?;
    let Some(report) = BatchReport::from_batch(&batch) else {
        bail!("no runs found in {}", directory.display());
    };

    match options.report {
        ReportFormat::Console => {
            announce_banner(writer)?;
            writeln!(
                writer,
                "Loaded {} runs from {}\n",
                batch.runs.len(),
                directory.display()
            )?;
            generate_batch_console_report(writer, &report)?;
        }
        ReportFormat::Markdown => generate_batch_markdown_report(writer, &report)?,
        ReportFormat::Json => generate_json_report(writer, &report)?,
    }

    let report_path = write_batch_report(&options.output, &report)?;
    let tables = if write_tables {
        write_batch_tables(&options.output, &batch.runs)?
    } else {
        Vec::new()
    };

    if options.report == ReportFormat::Console {
        writeln!(writer)?;
        writeln!(writer, "📝 Report saved to: {}", report_path.display())?;
        for table in tables {
            writeln!(writer, "📄 CSV saved to: {}", table.display())?;
        }
    }
    Ok(())
}
