use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use rxsynth_core::DatasetKind;
use rxsynth_generate::GenerationResult;
use rxsynth_plan::RunConfig;

use super::{RegistryError, RegistryResult};

/// One dataset of a recorded run.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub dataset: DatasetKind,
    pub rows: u64,
    pub shards: usize,
    pub bytes_written: u64,
    pub target_reached: bool,
    pub output_dir: PathBuf,
}

/// Metadata for one CLI invocation, kept outside the output directory.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub run_id: String,
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub seed: u64,
    pub config_fingerprint: String,
    pub datasets: Vec<DatasetSummary>,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

#[derive(Serialize)]
struct RunFile<'a> {
    #[serde(flatten)]
    record: &'a RunRecord,
    git: GitInfo,
}

pub fn summarize(results: &[GenerationResult]) -> Vec<DatasetSummary> {
    results
        .iter()
        .map(|result| DatasetSummary {
            dataset: result.report.dataset,
            rows: result.report.rows_written,
            shards: result.report.shards.len(),
            bytes_written: result.report.bytes_written(),
            target_reached: result.report.target_reached,
            output_dir: result.output_dir.clone(),
        })
        .collect()
}

/// Write `run.json` and the resolved `config.json` into a fresh directory
/// under `run_dir`; returns that directory.
pub fn record_run(run_dir: &Path, record: &RunRecord, config: &RunConfig) -> RegistryResult<PathBuf> {
    let timestamp = record.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let run_root = run_dir.join(format!("{timestamp}__run_{}", record.run_id));
    create_dir_all(&run_root)?;

    write_json(&run_root.join("config.json"), config)?;
    write_json(
        &run_root.join("run.json"),
        &RunFile {
            record,
            git: collect_git_info(),
        },
    )?;
    Ok(run_root)
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = OpenOptions::new().create(true).truncate(true).write(true).open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}
