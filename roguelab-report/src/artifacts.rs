//! Report files written into the output directory.
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use roguelab_core::{Run, RunAnalysis, damage_rows, run_rows};

use crate::reports::{BatchReport, generate_batch_markdown_report, generate_run_markdown_report};

pub const BATCH_REPORT_FILE: &str = "batch_report.md";
pub const RUNS_CSV_FILE: &str = "runs_summary.csv";
pub const DAMAGE_CSV_FILE: &str = "damage_events.csv";

pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))
}

fn create_file(path: &Path) -> Result<BufWriter<File>> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// `<run_id>_report.md`, with path separators, drive colons and control
/// characters in the id replaced by `_` so the result is one plain file name.
pub fn run_report_file_name(run_id: &str) -> String {
    let stem: String = run_id
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{stem}_report.md")
}

/// Write the run's markdown report into `dir` and return its path.
pub fn write_run_report(dir: &Path, run: &Run, analysis: &RunAnalysis) -> Result<PathBuf> {
    ensure_output_dir(dir)?;
    let path = dir.join(run_report_file_name(&run.run_id));
    let mut file = create_file(&path)?;
    generate_run_markdown_report(&mut file, run, analysis)?;
    file.flush()?;
    Ok(path)
}

pub fn write_batch_report(dir: &Path, report: &BatchReport) -> Result<PathBuf> {
    ensure_output_dir(dir)?;
    let path = dir.join(BATCH_REPORT_FILE);
    let mut file = create_file(&path)?;
    generate_batch_markdown_report(&mut file, report)?;
    file.flush()?;
    Ok(path)
}

/// Serialize rows as CSV with a header taken from the row type.
pub fn write_csv<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the run and damage tables; returns the files written.
pub fn write_batch_tables(dir: &Path, runs: &[Run]) -> Result<Vec<PathBuf>> {
    ensure_output_dir(dir)?;
    let runs_path = dir.join(RUNS_CSV_FILE);
    write_csv(create_file(&runs_path)?, &run_rows(runs))
        .with_context(|| format!("failed to write {}", runs_path.display()))?;

    let damage_path = dir.join(DAMAGE_CSV_FILE);
    write_csv(create_file(&damage_path)?, &damage_rows(runs))
        .with_context(|| format!("failed to write {}", damage_path.display()))?;

    log::debug!("wrote run and damage tables to {}", dir.display());
    Ok(vec![runs_path, damage_path])
}
