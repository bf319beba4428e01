use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use tracing::warn;

use rxsynth_core::{ColumnSpec, DatasetKind, FieldKind, FieldValue};
use rxsynth_plan::InteractionPolicy;

use crate::catalog::{Drug, DrugCatalog};
use crate::datasets::{DatasetEnv, DatasetProducer, RunContext};
use crate::errors::{GenerationError, Result};
use crate::sampler::WeightedSampler;

pub const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("interaction_id", FieldKind::Text),
    ColumnSpec::required("drug_1_name", FieldKind::Text),
    ColumnSpec::required("drug_1_ndc", FieldKind::Text),
    ColumnSpec::required("drug_2_name", FieldKind::Text),
    ColumnSpec::required("drug_2_ndc", FieldKind::Text),
    ColumnSpec::required("severity_level", FieldKind::Text),
    ColumnSpec::required("interaction_mechanism", FieldKind::Text),
    ColumnSpec::required("clinical_effects", FieldKind::Text),
    ColumnSpec::required("management_recommendation", FieldKind::Text),
    ColumnSpec::required("evidence_level", FieldKind::Text),
    ColumnSpec::required("onset_timing", FieldKind::Text),
    ColumnSpec::required("documentation_source", FieldKind::Text),
    ColumnSpec::required("requires_alert", FieldKind::Text),
    ColumnSpec::required("requires_intervention", FieldKind::Text),
    ColumnSpec::required("patient_counseling_required", FieldKind::Text),
    ColumnSpec::required("prescriber_notification_required", FieldKind::Text),
    ColumnSpec::required("last_reviewed_date", FieldKind::Date),
    ColumnSpec::required("last_updated_date", FieldKind::Date),
    ColumnSpec::required("active_status", FieldKind::Text),
    ColumnSpec::required("reference_id", FieldKind::Text),
    ColumnSpec::required("notes", FieldKind::Text),
];

const MECHANISMS: &[&str] = &[
    "CYP450 Enzyme Inhibition",
    "CYP450 Enzyme Induction",
    "P-glycoprotein Interaction",
    "Protein Binding Displacement",
    "Renal Excretion Competition",
    "Additive CNS Depression",
    "Additive QT Prolongation",
    "Additive Bleeding Risk",
    "Serotonin Syndrome Risk",
    "Hypertensive Crisis Risk",
    "Additive Nephrotoxicity",
    "Additive Hepatotoxicity",
    "Electrolyte Imbalance",
    "Pharmacodynamic Antagonism",
    "Pharmacodynamic Synergy",
    "Absorption Interference",
    "Metabolic Competition",
    "Receptor Competition",
    "Additive Anticholinergic Effects",
    "Additive Hypotension",
];

const CLINICAL_EFFECTS: &[&str] = &[
    "Increased bleeding risk",
    "Decreased therapeutic effect",
    "Increased drug levels/toxicity",
    "Decreased drug levels/efficacy",
    "QT interval prolongation",
    "Serotonin syndrome",
    "CNS depression/sedation",
    "Hypertensive crisis",
    "Hypotension",
    "Hyperkalemia",
    "Hypokalemia",
    "Renal impairment",
    "Hepatotoxicity",
    "Rhabdomyolysis",
    "Seizure risk",
    "Respiratory depression",
    "Cardiac arrhythmia",
    "Hypoglycemia",
    "Hyperglycemia",
    "Gastrointestinal bleeding",
    "Acute kidney injury",
    "Liver enzyme elevation",
    "Confusion/delirium",
    "Orthostatic hypotension",
    "Bradycardia",
    "Tachycardia",
];

const MANAGEMENT: &[&str] = &[
    "Avoid combination - use alternative therapy",
    "Monitor closely - adjust dose as needed",
    "Separate administration by 2-4 hours",
    "Monitor drug levels and adjust dose",
    "Monitor for signs of toxicity",
    "Monitor blood pressure regularly",
    "Monitor renal function",
    "Monitor liver function tests",
    "Monitor electrolytes",
    "Monitor INR/PT if on anticoagulants",
    "Monitor for bleeding signs",
    "Monitor for CNS effects",
    "Consider dose reduction of 25-50%",
    "Use lowest effective dose",
    "Monitor ECG for QT prolongation",
    "Educate patient on warning signs",
    "Consider therapeutic drug monitoring",
    "Consult specialist before combining",
    "Use with extreme caution",
    "Monitor glucose levels closely",
];

const ONSET_TIMING: &[&str] = &["Rapid (hours)", "Delayed (days)", "Prolonged (weeks)", "Variable"];

const DOCUMENTATION_SOURCES: &[&str] = &[
    "FDA Drug Label",
    "Clinical Trial Data",
    "Case Reports",
    "Pharmacokinetic Studies",
    "Post-Marketing Surveillance",
    "Expert Consensus",
    "Systematic Review",
    "Meta-Analysis",
];

const ACTIVE_STATUSES: &[&str] = &["Active", "Active", "Active", "Under Review"];

/// Severities that always raise an alert and notify the prescriber.
const ALERT_SEVERITIES: &[&str] = &["Contraindicated", "Major"];

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

/// `low..=high` distinct entries of `items`, in draw order, joined.
fn pick_joined(
    sampler: &mut WeightedSampler,
    items: &[&str],
    low: i64,
    high: i64,
    separator: &str,
) -> Result<String> {
    let amount = sampler.sample_int(low, high)? as usize;
    Ok(sampler
        .sample_indices(items.len(), amount)
        .into_iter()
        .map(|idx| items[idx])
        .collect::<Vec<_>>()
        .join(separator))
}

/// Pair ordered by drug name, then NDC, so `(a, b)` and `(b, a)` coincide.
fn ordered_pair<'a>(first: &'a Drug, second: &'a Drug) -> (&'a Drug, &'a Drug) {
    let key = |drug: &Drug| (drug.drug_name.clone(), drug.ndc_code.clone());
    if key(first) <= key(second) {
        (first, second)
    } else {
        (second, first)
    }
}

pub(crate) struct InteractionProducer {
    policy: InteractionPolicy,
    catalog: DrugCatalog,
    reference_date: NaiveDate,
    seen: HashSet<(String, String)>,
}

impl InteractionProducer {
    pub(crate) fn prepare(env: &DatasetEnv<'_>) -> Result<Self> {
        let catalog = DrugCatalog::load(env.input_dir, &[])?;
        if catalog.len() < 2 {
            return Err(GenerationError::EmptyReference {
                dataset: format!("{} (need two drugs to pair)", DatasetKind::Drugs.as_str()),
            });
        }
        Ok(Self {
            policy: env.config.drug_interactions.clone(),
            catalog,
            reference_date: env.reference_date,
            seen: HashSet::new(),
        })
    }

    fn pair_count(&self) -> u64 {
        let n = self.catalog.len() as u64;
        n * (n - 1) / 2
    }

    fn build_row(&self, first: &Drug, second: &Drug, ctx: &mut RunContext<'_>) -> Result<Vec<FieldValue>> {
        let sampler = &mut ctx.sampler;
        let severity = sampler.sample_category(&self.policy.severities)?.clone();
        let evidence = sampler.sample_category(&self.policy.evidence_levels)?.clone();
        let mechanisms = pick_joined(sampler, MECHANISMS, 1, 3, ", ")?;
        let effects = pick_joined(sampler, CLINICAL_EFFECTS, 1, 4, "; ")?;
        let management = pick_joined(sampler, MANAGEMENT, 1, 3, "; ")?;
        let sources = pick_joined(sampler, DOCUMENTATION_SOURCES, 1, 3, ", ")?;
        let onset = *sampler.choose(ONSET_TIMING)?;

        let updated = self.reference_date
            - Duration::days(sampler.sample_int(0, i64::from(self.policy.update_lookback_days))?);
        let reviewed =
            updated - Duration::days(sampler.sample_int(0, i64::from(self.policy.review_lag_days))?);

        let contraindicated = severity == "Contraindicated";
        let alerting = ALERT_SEVERITIES.contains(&severity.as_str());
        let requires_intervention = contraindicated || sampler.bernoulli(0.5);
        let counseling = sampler.bernoulli(0.5);
        let notify_prescriber = alerting || sampler.bernoulli(0.5);
        let active_status = *sampler.choose(ACTIVE_STATUSES)?;
        let interaction_id = format!("DI-{}", sampler.hex_upper(6));
        let reference_id = format!("REF-{}", sampler.sample_int(100_000, 999_999)?);
        let notes = format!(
            "Interaction between {} and {}. {severity} severity. Monitor patient closely.",
            first.drug_name, second.drug_name
        );

        ctx.stats.record("severity_level", &severity);
        ctx.stats.record("evidence_level", &evidence);
        ctx.stats.record("active_status", active_status);

        Ok(vec![
            FieldValue::from(interaction_id),
            FieldValue::from(first.drug_name.as_str()),
            FieldValue::from(first.ndc_code.as_str()),
            FieldValue::from(second.drug_name.as_str()),
            FieldValue::from(second.ndc_code.as_str()),
            FieldValue::from(severity),
            FieldValue::from(mechanisms),
            FieldValue::from(effects),
            FieldValue::from(management),
            FieldValue::from(evidence),
            FieldValue::from(onset),
            FieldValue::from(sources),
            FieldValue::from(yes_no(alerting)),
            FieldValue::from(yes_no(requires_intervention)),
            FieldValue::from(yes_no(counseling)),
            FieldValue::from(yes_no(notify_prescriber)),
            FieldValue::from(reviewed),
            FieldValue::from(updated),
            FieldValue::from(active_status),
            FieldValue::from(reference_id),
            FieldValue::from(notes),
        ])
    }
}

impl DatasetProducer for InteractionProducer {
    fn produce(&mut self, ctx: &mut RunContext<'_>) -> Result<()> {
        let pairs = self.pair_count();
        while !ctx.is_full() {
            if self.policy.duplicate_acceptance_rate <= 0.0 && self.seen.len() as u64 >= pairs {
                warn!(
                    pairs,
                    rows = ctx.rows_written(),
                    "every drug pair used and duplicates are disabled, stopping early"
                );
                break;
            }

            let picks = ctx.sampler.sample_indices(self.catalog.len(), 2);
            let (first, second) =
                ordered_pair(self.catalog.drug(picks[0]), self.catalog.drug(picks[1]));
            let key = (first.ndc_code.clone(), second.ndc_code.clone());
            let fresh = !self.seen.contains(&key);
            if !fresh && !ctx.sampler.bernoulli(self.policy.duplicate_acceptance_rate) {
                ctx.stats.bump("duplicates_rejected");
                continue;
            }
            if !fresh {
                ctx.stats.bump("duplicates_accepted");
            }

            let row = self.build_row(first, second, ctx)?;
            ctx.write(&row)?;
            self.seen.insert(key);
            ctx.advance();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DrugFamily;

    #[test]
    fn pairs_are_order_independent() {
        let a = Drug::new("00001-0001-01", DrugFamily::Generic, "STATIN").with_name("Atorva");
        let b = Drug::new("00002-0002-02", DrugFamily::Brand, "NSAID").with_name("Brufen");
        let (x, y) = ordered_pair(&b, &a);
        assert_eq!(x.drug_name, "Atorva");
        assert_eq!(y.drug_name, "Brufen");
        let (x, _) = ordered_pair(&a, &b);
        assert_eq!(x.drug_name, "Atorva");
    }

    #[test]
    fn joined_picks_are_distinct() {
        let mut sampler = WeightedSampler::seeded(11);
        for _ in 0..50 {
            let joined = pick_joined(&mut sampler, MECHANISMS, 1, 3, ", ").expect("pick");
            let parts: Vec<&str> = joined.split(", ").collect();
            let unique: HashSet<&str> = parts.iter().copied().collect();
            assert!((1..=3).contains(&parts.len()));
            assert_eq!(unique.len(), parts.len());
        }
    }
}
