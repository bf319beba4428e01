//! Row producers, one per dataset.
//!
//! Each producer owns its resolved policy and reference data and streams
//! rows into a [`RunContext`], which enforces the record target and reports
//! progress.

use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use rxsynth_core::{ColumnSpec, DatasetKind, FieldValue, RowSchema};
use rxsynth_plan::RunConfig;

use crate::errors::Result;
use crate::model::DatasetStats;
use crate::output::PartitionedWriter;
use crate::sampler::WeightedSampler;

mod claim_lines;
mod claims;
mod drug_interactions;
mod drugs;
mod enrollments;
mod formularies;
mod formulary_drugs;
mod members;
mod pharmacies;
mod pharmacy_networks;
mod plan_rules;
pub(crate) mod reference;

/// Everything a producer may consult while preparing.
pub(crate) struct DatasetEnv<'a> {
    pub config: &'a RunConfig,
    pub input_dir: &'a Path,
    pub reference_date: NaiveDate,
}

pub(crate) trait DatasetProducer {
    /// Stream rows until the source is exhausted or the context is full.
    fn produce(&mut self, ctx: &mut RunContext<'_>) -> Result<()>;
}

/// Column list of a dataset's output files.
pub fn dataset_columns(kind: DatasetKind) -> &'static [ColumnSpec] {
    match kind {
        DatasetKind::Drugs => drugs::COLUMNS,
        DatasetKind::Members => members::COLUMNS,
        DatasetKind::Pharmacies => pharmacies::COLUMNS,
        DatasetKind::Formularies => formularies::COLUMNS,
        DatasetKind::FormularyDrugs => formulary_drugs::COLUMNS,
        DatasetKind::PlanRules => plan_rules::COLUMNS,
        DatasetKind::Enrollments => enrollments::COLUMNS,
        DatasetKind::PharmacyNetworks => pharmacy_networks::COLUMNS,
        DatasetKind::Claims => claims::COLUMNS,
        DatasetKind::ClaimLines => claim_lines::COLUMNS,
        DatasetKind::DrugInteractions => drug_interactions::COLUMNS,
    }
}

/// Validated schema of a dataset.
pub fn dataset_schema(kind: DatasetKind) -> rxsynth_core::Result<RowSchema> {
    RowSchema::new(kind.file_prefix(), dataset_columns(kind))
}

/// Configured record target of a dataset.
pub fn record_target(kind: DatasetKind, config: &RunConfig) -> u64 {
    match kind {
        DatasetKind::Drugs => config.drugs.record_target,
        DatasetKind::Members => config.members.record_target,
        DatasetKind::Pharmacies => config.pharmacies.record_target,
        DatasetKind::Formularies => config.formularies.record_target,
        DatasetKind::FormularyDrugs => config.formulary_drugs.record_target,
        DatasetKind::PlanRules => config.plan_rules.record_target,
        DatasetKind::Enrollments => config.enrollments.record_target,
        DatasetKind::PharmacyNetworks => config.pharmacy_networks.record_target,
        DatasetKind::Claims => config.claims.record_target,
        DatasetKind::ClaimLines => config.claim_lines.record_target,
        DatasetKind::DrugInteractions => config.drug_interactions.record_target,
    }
}

pub(crate) fn progress_every(kind: DatasetKind, config: &RunConfig) -> u64 {
    match kind {
        DatasetKind::Drugs => config.drugs.progress_every,
        DatasetKind::Members => config.members.progress_every,
        DatasetKind::Pharmacies => config.pharmacies.progress_every,
        DatasetKind::Formularies => config.formularies.progress_every,
        DatasetKind::FormularyDrugs => config.formulary_drugs.progress_every,
        DatasetKind::PlanRules => config.plan_rules.progress_every,
        DatasetKind::Enrollments => config.enrollments.progress_every,
        DatasetKind::PharmacyNetworks => config.pharmacy_networks.progress_every,
        DatasetKind::Claims => config.claims.progress_every,
        DatasetKind::ClaimLines => config.claim_lines.progress_every,
        DatasetKind::DrugInteractions => config.drug_interactions.progress_every,
    }
}

/// Load reference data and resolve policy for `kind`.
///
/// Runs before any output file exists, so a missing input leaves the output
/// directory untouched.
pub(crate) fn prepare(kind: DatasetKind, env: &DatasetEnv<'_>) -> Result<Box<dyn DatasetProducer>> {
    Ok(match kind {
        DatasetKind::Drugs => Box::new(drugs::DrugProducer::prepare(env)?),
        DatasetKind::Members => Box::new(members::MemberProducer::prepare(env)?),
        DatasetKind::Pharmacies => Box::new(pharmacies::PharmacyProducer::prepare(env)?),
        DatasetKind::Formularies => Box::new(formularies::FormularyProducer::prepare(env)?),
        DatasetKind::FormularyDrugs => {
            Box::new(formulary_drugs::FormularyDrugProducer::prepare(env)?)
        }
        DatasetKind::PlanRules => Box::new(plan_rules::PlanRuleProducer::prepare(env)?),
        DatasetKind::Enrollments => Box::new(enrollments::EnrollmentProducer::prepare(env)?),
        DatasetKind::PharmacyNetworks => {
            Box::new(pharmacy_networks::PharmacyNetworkProducer::prepare(env)?)
        }
        DatasetKind::Claims => Box::new(claims::ClaimProducer::prepare(env)?),
        DatasetKind::ClaimLines => Box::new(claim_lines::ClaimLineProducer::prepare(env)?),
        DatasetKind::DrugInteractions => {
            Box::new(drug_interactions::InteractionProducer::prepare(env)?)
        }
    })
}

/// Per-run state handed to a producer.
pub struct RunContext<'w> {
    pub sampler: WeightedSampler,
    pub stats: DatasetStats,
    writer: &'w mut PartitionedWriter,
    dataset: DatasetKind,
    target: u64,
    progress_every: u64,
    processed: u64,
}

impl<'w> RunContext<'w> {
    pub(crate) fn new(
        dataset: DatasetKind,
        sampler: WeightedSampler,
        writer: &'w mut PartitionedWriter,
        target: u64,
        progress_every: u64,
    ) -> Self {
        Self {
            sampler,
            stats: DatasetStats::default(),
            writer,
            dataset,
            target,
            progress_every,
            processed: 0,
        }
    }

    pub fn write(&mut self, row: &[FieldValue]) -> Result<()> {
        self.writer.write_row(row)
    }

    pub fn rows_written(&self) -> u64 {
        self.writer.rows_written()
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    pub fn remaining(&self) -> u64 {
        self.target.saturating_sub(self.rows_written())
    }

    pub fn is_full(&self) -> bool {
        self.rows_written() >= self.target
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Count one processed unit (record or parent), logging at the interval.
    pub fn advance(&mut self) {
        self.processed += 1;
        if self.progress_every > 0 && self.processed % self.progress_every == 0 {
            info!(
                dataset = %self.dataset,
                processed = self.processed,
                rows = self.rows_written(),
                target = self.target,
                "generation progress"
            );
        }
    }
}
