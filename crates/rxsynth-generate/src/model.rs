use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use rxsynth_core::DatasetKind;
use rxsynth_plan::RunConfig;

use crate::output::ShardSummary;

/// Options for the generation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Directory holding upstream reference files.
    pub input_dir: PathBuf,
    /// Directory receiving output shards and reports.
    pub output_dir: PathBuf,
    /// Run seed; every dataset derives its own stream from it.
    pub seed: u64,
    /// Byte budget per output shard.
    pub shard_budget_bytes: u64,
    /// Overrides the configured record target of every dataset run.
    pub record_target: Option<u64>,
    /// Write `<prefix>_report.json` next to the shards.
    pub write_report: bool,
}

impl GenerateOptions {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            input_dir: config.run.input_dir.clone(),
            output_dir: config.run.output_dir.clone(),
            seed: config.run.seed,
            shard_budget_bytes: config.run.shard_budget_bytes,
            ..Self::default()
        }
    }
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("data"),
            seed: 42,
            shard_budget_bytes: 30 * 1024 * 1024,
            record_target: None,
            write_report: true,
        }
    }
}

/// Counters and value distributions collected while producing a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub counters: BTreeMap<String, u64>,
    pub distributions: BTreeMap<String, BTreeMap<String, u64>>,
}

impl DatasetStats {
    pub fn bump(&mut self, counter: &str) {
        self.add(counter, 1);
    }

    pub fn add(&mut self, counter: &str, amount: u64) {
        match self.counters.get_mut(counter) {
            Some(value) => *value += amount,
            None => {
                self.counters.insert(counter.to_string(), amount);
            }
        }
    }

    /// Count one occurrence of `value` for `field`.
    pub fn record(&mut self, field: &str, value: &str) {
        if !self.distributions.contains_key(field) {
            self.distributions.insert(field.to_string(), BTreeMap::new());
        }
        let Some(bucket) = self.distributions.get_mut(field) else {
            return;
        };
        match bucket.get_mut(value) {
            Some(count) => *count += 1,
            None => {
                bucket.insert(value.to_string(), 1);
            }
        }
    }

    pub fn counter(&self, counter: &str) -> u64 {
        self.counters.get(counter).copied().unwrap_or(0)
    }

    pub fn distribution(&self, field: &str) -> Option<&BTreeMap<String, u64>> {
        self.distributions.get(field)
    }
}

/// Report for one dataset run. Holds only values fixed by seed, config and
/// inputs, so reruns reproduce it byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub dataset: DatasetKind,
    pub file_prefix: String,
    pub seed: u64,
    /// SHA-256 of the serialized configuration.
    pub config_fingerprint: String,
    pub record_target: u64,
    pub rows_written: u64,
    /// Whether production stopped because the record target was reached.
    pub target_reached: bool,
    pub shards: Vec<ShardSummary>,
    pub stats: DatasetStats,
}

impl GenerationReport {
    pub fn bytes_written(&self) -> u64 {
        self.shards.iter().map(|shard| shard.bytes_written).sum()
    }
}
