use std::path::PathBuf;
use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use rxsynth_core::DatasetKind;
use rxsynth_plan::RunConfig;

use crate::datasets::{self, DatasetEnv, RunContext};
use crate::errors::Result;
use crate::model::{GenerateOptions, GenerationReport};
use crate::output::PartitionedWriter;
use crate::sampler::WeightedSampler;
use crate::source::list_shards;

/// Result of a dataset run.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub output_dir: PathBuf,
    pub report: GenerationReport,
}

/// Entry point for producing datasets from a run configuration.
#[derive(Debug, Clone)]
pub struct GenerationEngine {
    options: GenerateOptions,
    config: RunConfig,
}

impl GenerationEngine {
    pub fn new(options: GenerateOptions, config: RunConfig) -> Self {
        Self { options, config }
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Generate one dataset into the output directory.
    ///
    /// Reference inputs are loaded before anything is written, so a missing
    /// upstream dataset fails without touching the output directory. Shards
    /// left by an earlier run of the same dataset are replaced.
    pub fn run(&self, dataset: DatasetKind) -> Result<GenerationResult> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let prefix = dataset.file_prefix();
        let schema = datasets::dataset_schema(dataset)?;
        let reference_date = self.config.reference_date()?;
        let target = self
            .options
            .record_target
            .unwrap_or_else(|| datasets::record_target(dataset, &self.config));

        let env = DatasetEnv {
            config: &self.config,
            input_dir: &self.options.input_dir,
            reference_date,
        };
        let mut producer = datasets::prepare(dataset, &env)?;

        let output_dir = self.options.output_dir.clone();
        std::fs::create_dir_all(&output_dir)?;
        for stale in list_shards(&output_dir, prefix)? {
            debug!(file = %stale.display(), "removing stale shard");
            std::fs::remove_file(&stale)?;
        }

        let mut writer = PartitionedWriter::new(
            &output_dir,
            prefix,
            schema,
            self.options.shard_budget_bytes,
        )?;
        let sampler = WeightedSampler::for_stream(self.options.seed, dataset.as_str());

        info!(
            run_id = %run_id,
            dataset = %dataset,
            target,
            seed = self.options.seed,
            output_dir = %output_dir.display(),
            "generation started"
        );

        let progress_every = datasets::progress_every(dataset, &self.config);
        let mut ctx = RunContext::new(dataset, sampler, &mut writer, target, progress_every);
        let outcome = producer.produce(&mut ctx);
        let rows_written = ctx.rows_written();
        let stats = std::mem::take(&mut ctx.stats);
        drop(ctx);

        if let Err(err) = outcome {
            writer.abort();
            warn!(run_id = %run_id, dataset = %dataset, error = %err, "generation failed");
            return Err(err);
        }
        let shards = writer.close()?;

        let report = GenerationReport {
            dataset,
            file_prefix: prefix.to_string(),
            seed: self.options.seed,
            config_fingerprint: self.config_fingerprint()?,
            record_target: target,
            rows_written,
            target_reached: rows_written >= target,
            shards,
            stats,
        };

        if self.options.write_report {
            let report_path = output_dir.join(format!("{prefix}_report.json"));
            std::fs::write(&report_path, serde_json::to_vec_pretty(&report)?)?;
        }

        info!(
            run_id = %run_id,
            dataset = %dataset,
            rows = report.rows_written,
            shards = report.shards.len(),
            bytes_written = report.bytes_written(),
            target_reached = report.target_reached,
            duration_ms = start.elapsed().as_millis() as u64,
            "generation completed"
        );
        Ok(GenerationResult { output_dir, report })
    }

    /// Generate several datasets in dependency order.
    ///
    /// Every step reads its inputs from the output directory, so each
    /// dataset sees the files the previous steps just wrote.
    pub fn run_pipeline(&self, datasets: &[DatasetKind]) -> Result<Vec<GenerationResult>> {
        let order = pipeline_order(datasets);
        let step_options = GenerateOptions {
            input_dir: self.options.output_dir.clone(),
            ..self.options.clone()
        };
        let step = GenerationEngine::new(step_options, self.config.clone());

        info!(
            datasets = order.len(),
            output_dir = %self.options.output_dir.display(),
            "pipeline started"
        );
        let mut results = Vec::with_capacity(order.len());
        for dataset in order {
            results.push(step.run(dataset)?);
        }
        info!(datasets = results.len(), "pipeline completed");
        Ok(results)
    }

    /// SHA-256 of the serialized configuration, hex encoded.
    pub fn config_fingerprint(&self) -> Result<String> {
        let bytes = serde_json::to_vec(&self.config)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

/// Requested datasets, deduplicated and sorted so every dataset follows the
/// ones it reads.
pub fn pipeline_order(datasets: &[DatasetKind]) -> Vec<DatasetKind> {
    DatasetKind::ALL
        .iter()
        .copied()
        .filter(|kind| datasets.contains(kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_order_follows_dependencies() {
        let order = pipeline_order(&[
            DatasetKind::ClaimLines,
            DatasetKind::Drugs,
            DatasetKind::Claims,
            DatasetKind::Drugs,
        ]);
        assert_eq!(
            order,
            vec![DatasetKind::Drugs, DatasetKind::Claims, DatasetKind::ClaimLines]
        );
    }

    #[test]
    fn plan_and_network_datasets_follow_their_inputs() {
        let order = pipeline_order(&[
            DatasetKind::PharmacyNetworks,
            DatasetKind::Enrollments,
            DatasetKind::PlanRules,
            DatasetKind::Pharmacies,
            DatasetKind::Members,
        ]);
        assert_eq!(
            order,
            vec![
                DatasetKind::Members,
                DatasetKind::Pharmacies,
                DatasetKind::PlanRules,
                DatasetKind::Enrollments,
                DatasetKind::PharmacyNetworks,
            ]
        );
    }
}
