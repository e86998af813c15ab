//! Loading telemetry sources from disk or memory and reconstructing runs.
//!
//! A bad source never takes the batch down: it is logged, recorded as a
//! [`SourceFailure`] and skipped.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TelemetryError};
use crate::event::parse_events;
use crate::model::Run;
use crate::reconstruct::reconstruct_run;

pub const DEFAULT_EXTENSION: &str = "jsonl";

/// How sources in a batch are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parallelism {
    /// One source after another on the calling thread.
    #[default]
    Sequential,
    /// Reconstruct sources on a rayon pool with this many threads; `0` uses
    /// the global pool. Without the `parallel` feature this runs sequentially.
    Threads(usize),
}

/// Options for batch loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// File extension (without the dot) of telemetry files in a directory.
    pub extension: String,
    pub parallelism: Parallelism,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            parallelism: Parallelism::Sequential,
        }
    }
}

/// A source that could not be turned into a run.
#[derive(Debug)]
pub struct SourceFailure {
    pub source_name: String,
    pub error: TelemetryError,
}

/// Outcome of a batch load: the runs that reconstructed, in source order,
/// and the sources that did not.
#[derive(Debug, Default)]
pub struct BatchLoad {
    pub runs: Vec<Run>,
    pub failures: Vec<SourceFailure>,
}

/// Parse and reconstruct one in-memory source.
///
/// # Errors
///
/// Any parse or reconstruction failure for this source.
pub fn reconstruct_source(source_name: &str, text: &str) -> Result<Run> {
    let events = parse_events(text)?;
    reconstruct_run(source_name, events)
}

/// Read, parse and reconstruct a single telemetry file.
///
/// # Errors
///
/// [`TelemetryError::Io`] when the file cannot be read, otherwise any parse
/// or reconstruction failure.
pub fn load_run(path: impl AsRef<Path>) -> Result<Run> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| TelemetryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    reconstruct_source(&path.display().to_string(), &text)
}

/// Reconstruct many independent `(name, text)` sources.
pub fn load_runs<S, T>(sources: &[(S, T)], options: &LoadOptions) -> BatchLoad
where
    S: AsRef<str> + Sync,
    T: AsRef<str> + Sync,
{
    let outcomes = run_all(sources.len(), options.parallelism, |idx| {
        let (name, text) = &sources[idx];
        reconstruct_source(name.as_ref(), text.as_ref())
    });
    collect_outcomes(sources.iter().map(|(name, _)| name.as_ref().to_string()), outcomes)
}

/// Reconstruct every telemetry file in `dir` with the configured extension,
/// in path order.
///
/// # Errors
///
/// [`TelemetryError::Io`] only when the directory itself cannot be listed;
/// per-file failures are reported in [`BatchLoad::failures`].
pub fn load_runs_from_directory(dir: impl AsRef<Path>, options: &LoadOptions) -> Result<BatchLoad> {
    let paths = telemetry_files(dir.as_ref(), &options.extension)?;
    let outcomes = run_all(paths.len(), options.parallelism, |idx| load_run(&paths[idx]));
    let batch = collect_outcomes(paths.iter().map(|p| p.display().to_string()), outcomes);
    log::info!(
        "loaded {} run(s) from {} ({} skipped)",
        batch.runs.len(),
        dir.as_ref().display(),
        batch.failures.len()
    );
    Ok(batch)
}

fn telemetry_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let io_err = |source| TelemetryError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn collect_outcomes(
    names: impl Iterator<Item = String>,
    outcomes: Vec<Result<Run>>,
) -> BatchLoad {
    let mut batch = BatchLoad::default();
    for (source_name, outcome) in names.zip(outcomes) {
        match outcome {
            Ok(run) => batch.runs.push(run),
            Err(error) => {
                log::warn!("failed to load {source_name}: {error}");
                batch.failures.push(SourceFailure { source_name, error });
            }
        }
    }
    batch
}

/// Evaluate `job` for every index, returning results in index order whatever
/// the scheduling.
fn run_all<F>(count: usize, parallelism: Parallelism, job: F) -> Vec<Result<Run>>
where
    F: Fn(usize) -> Result<Run> + Sync + Send,
{
    match parallelism {
        Parallelism::Sequential => (0..count).map(job).collect(),
        Parallelism::Threads(workers) => run_threaded(count, workers, job),
    }
}

#[cfg(feature = "parallel")]
fn run_threaded<F>(count: usize, workers: usize, job: F) -> Vec<Result<Run>>
where
    F: Fn(usize) -> Result<Run> + Sync + Send,
{
    use rayon::prelude::*;

    let work = || -> Vec<Result<Run>> { (0..count).into_par_iter().map(&job).collect() };
    if workers == 0 {
        return work();
    }
    match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(work),
        Err(err) => {
            log::warn!("could not build a {workers}-thread pool ({err}); loading sequentially");
            (0..count).map(&job).collect()
        }
    }
}

#[cfg(not(feature = "parallel"))]
fn run_threaded<F>(count: usize, _workers: usize, job: F) -> Vec<Result<Run>>
where
    F: Fn(usize) -> Result<Run> + Sync + Send,
{
    (0..count).map(job).collect()
}
