use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, warn};

use rxsynth_core::{ColumnSpec, FieldKind, FieldValue};
use rxsynth_plan::FormularyPolicy;

use crate::catalog::KeyPool;
use crate::datasets::reference::STATE_CODES;
use crate::datasets::{DatasetEnv, DatasetProducer, RunContext};
use crate::errors::{GenerationError, Result};
use crate::source::{CsvSource, list_shards};

pub const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("formulary_code", FieldKind::Text),
    ColumnSpec::required("formulary_name", FieldKind::Text),
    ColumnSpec::required("plan_code", FieldKind::Text),
    ColumnSpec::required("market_segment", FieldKind::Text),
    ColumnSpec::required("carrier", FieldKind::Text),
    ColumnSpec::required("pbm", FieldKind::Text),
    ColumnSpec::required("formulary_type", FieldKind::Text),
    ColumnSpec::required("tier_count", FieldKind::Int),
    ColumnSpec::required("coverage_level", FieldKind::Text),
    ColumnSpec::required("effective_date", FieldKind::Date),
    ColumnSpec::required("termination_date", FieldKind::Date),
    ColumnSpec::required("region", FieldKind::Text),
    ColumnSpec::required("drug_count", FieldKind::Int),
    ColumnSpec::required("prior_auth_pct", FieldKind::Int),
    ColumnSpec::required("step_therapy_pct", FieldKind::Int),
    ColumnSpec::required("quantity_limit_pct", FieldKind::Int),
    ColumnSpec::required("is_active", FieldKind::Bool),
];

/// File prefix of the optional benefit-plan reference set.
pub const PLANS_PREFIX: &str = "us_pharmacy_plans";

const CARRIERS: &[(&str, &[&str])] = &[
    (
        "MEDICARE_PART_D",
        &[
            "HUMANA",
            "WELLCARE",
            "AETNA",
            "CIGNA",
            "UNITED_HEALTHCARE",
            "CVS_HEALTH",
            "ANTHEM",
            "KAISER",
            "BCBS",
            "CENTENE",
        ],
    ),
    (
        "MEDICARE_ADVANTAGE",
        &[
            "HUMANA",
            "UNITED_HEALTHCARE",
            "ANTHEM",
            "CVS_HEALTH",
            "AETNA",
            "KAISER",
            "CENTENE",
            "CIGNA",
            "BCBS",
            "WELLCARE",
            "MOLINA",
        ],
    ),
    (
        "COMMERCIAL",
        &[
            "UNITED_HEALTHCARE",
            "ANTHEM",
            "AETNA",
            "CIGNA",
            "HUMANA",
            "BCBS",
            "KAISER",
            "CENTENE",
            "MOLINA",
            "HEALTH_NET",
        ],
    ),
    (
        "MEDICAID",
        &[
            "CENTENE",
            "MOLINA",
            "ANTHEM",
            "UNITED_HEALTHCARE",
            "AETNA",
            "WELLCARE",
            "HEALTH_NET",
            "AMERIGROUP",
            "BCBS",
        ],
    ),
    (
        "FEDERAL",
        &[
            "VA",
            "TRICARE",
            "FEHB_BCBS",
            "FEHB_AETNA",
            "FEHB_KAISER",
            "FEHB_UNITED",
            "FEHB_GEHA",
        ],
    ),
];

const PBMS: &[&str] = &[
    "CVS_CAREMARK",
    "EXPRESS_SCRIPTS",
    "OPTUM_RX",
    "HUMANA_PHARMACY",
    "PRIME_THERAPEUTICS",
    "MAGELLAN_RX",
    "ENVOLVE_PHARMACY",
    "MEDIMPACT",
    "NAVITUS",
    "ELIXIR",
];

const COVERAGE_LEVELS: &[&str] = &["COMPREHENSIVE", "STANDARD", "BASIC", "LIMITED"];

/// Segments whose formularies are tied to one state.
const REGIONAL_SEGMENTS: &[&str] = &["MEDICAID", "REGIONAL"];

fn carriers_for(segment: &str) -> &'static [&'static str] {
    CARRIERS
        .iter()
        .find(|(name, _)| *name == segment)
        .or_else(|| CARRIERS.iter().find(|(name, _)| *name == "COMMERCIAL"))
        .map(|(_, carriers)| *carriers)
        .unwrap_or(&[])
}

fn type_name(formulary_type: &str) -> &'static str {
    match formulary_type {
        "ENHANCED" => "Enhanced",
        "BASIC" => "Basic",
        "SPECIALTY" => "Specialty",
        "MAIL_ORDER" => "Mail Order",
        _ => "Standard",
    }
}

fn code_part(value: &str) -> String {
    value.chars().take(4).collect::<String>().to_uppercase()
}

/// Plan codes used when no plan reference file exists.
pub fn default_plan_codes() -> Vec<String> {
    let mut codes = Vec::new();
    for idx in 1..=10 {
        for tier in ["PLATINUM", "GOLD", "SILVER", "BRONZE", "HDHP"] {
            codes.push(format!("COMM-{tier}-{idx:03}"));
        }
    }
    for idx in 1..=20 {
        for product in ["PARTD", "MAPD", "MEDIGAP"] {
            codes.push(format!("MCARE-{product}-{idx:03}"));
        }
    }
    for state in &STATE_CODES[..10] {
        codes.push(format!("MCAID-{state}-001"));
    }
    codes
}

/// Plan codes from `us_pharmacy_plans*.csv` in `dir`, or the defaults.
pub(crate) fn load_plan_codes(dir: &Path) -> Result<KeyPool> {
    if list_shards(dir, PLANS_PREFIX)?.is_empty() {
        warn!(dir = %dir.display(), "no plan reference file, using default plan codes");
        return KeyPool::from_keys("plans", default_plan_codes());
    }
    let source = CsvSource::discover(dir, "plans", PLANS_PREFIX)?;
    let mut codes = Vec::new();
    for row in source.rows() {
        let row = row?;
        let code = row.get("plan_code")?;
        if !code.is_empty() {
            codes.push(code.to_string());
        }
    }
    debug!(plans = codes.len(), "plan codes loaded");
    KeyPool::from_keys("plans", codes)
}

pub(crate) struct FormularyProducer {
    policy: FormularyPolicy,
    plans: KeyPool,
    effective: NaiveDate,
    termination: NaiveDate,
}

impl FormularyProducer {
    pub(crate) fn prepare(env: &DatasetEnv<'_>) -> Result<Self> {
        let policy = env.config.formularies.clone();
        let year = policy.plan_year;
        let effective = NaiveDate::from_ymd_opt(year, 1, 1);
        let termination = NaiveDate::from_ymd_opt(year, 12, 31);
        let (Some(effective), Some(termination)) = (effective, termination) else {
            return Err(GenerationError::InvalidConfig(format!(
                "plan year {year} is out of range"
            )));
        };
        Ok(Self {
            plans: load_plan_codes(env.input_dir)?,
            policy,
            effective,
            termination,
        })
    }

    fn build_row(
        &self,
        segment: &str,
        sequence: u64,
        ctx: &mut RunContext<'_>,
    ) -> Result<Vec<FieldValue>> {
        let sampler = &mut ctx.sampler;
        let carrier = *sampler.choose(carriers_for(segment))?;
        let pbm = *sampler.choose(PBMS)?;
        let formulary_type = sampler.sample_category(&self.policy.formulary_types)?.clone();
        let tier_count = *sampler.sample_category(&self.policy.tier_structures)?;
        let coverage_level = *sampler.choose(COVERAGE_LEVELS)?;
        let year = self.policy.plan_year;

        let formulary_code = format!(
            "FORM-{}-{}-{year}-{sequence:04}",
            code_part(segment),
            code_part(carrier)
        );
        let formulary_name = format!(
            "{carrier} {segment} {} {tier_count}-Tier Formulary {year}",
            type_name(&formulary_type)
        );
        let plan_code = self.plans.choose(sampler)?.to_string();
        let region = if REGIONAL_SEGMENTS.contains(&segment) {
            sampler.choose(STATE_CODES)?.to_string()
        } else {
            "NATIONAL".to_string()
        };
        let drug_count = match formulary_type.as_str() {
            "SPECIALTY" => sampler.sample_int(500, 1_500)?,
            "BASIC" => sampler.sample_int(1_000, 2_500)?,
            _ => sampler.sample_int(2_000, 4_000)?,
        };
        let prior_auth_pct = sampler.sample_int(5, 25)?;
        let step_therapy_pct = sampler.sample_int(3, 15)?;
        let quantity_limit_pct = sampler.sample_int(10, 30)?;
        let is_active = sampler.bernoulli(self.policy.active_rate);

        ctx.stats.record("market_segment", segment);
        ctx.stats.record("formulary_type", &formulary_type);
        ctx.stats.record("tier_count", &tier_count.to_string());
        ctx.stats.record("pbm", pbm);

        Ok(vec![
            FieldValue::from(formulary_code),
            FieldValue::from(formulary_name),
            FieldValue::from(plan_code),
            FieldValue::from(segment),
            FieldValue::from(carrier),
            FieldValue::from(pbm),
            FieldValue::from(formulary_type),
            FieldValue::from(tier_count),
            FieldValue::from(coverage_level),
            FieldValue::from(self.effective),
            FieldValue::from(self.termination),
            FieldValue::from(region),
            FieldValue::from(drug_count),
            FieldValue::from(prior_auth_pct),
            FieldValue::from(step_therapy_pct),
            FieldValue::from(quantity_limit_pct),
            FieldValue::from(is_active),
        ])
    }
}

impl DatasetProducer for FormularyProducer {
    fn produce(&mut self, ctx: &mut RunContext<'_>) -> Result<()> {
        // One sequence across segments keeps codes unique within the run.
        let mut sequence = 0_u64;
        for quota in &self.policy.segments {
            for _ in 0..quota.count {
                if ctx.is_full() {
                    return Ok(());
                }
                sequence += 1;
                let row = self.build_row(&quota.segment, sequence, ctx)?;
                ctx.write(&row)?;
                ctx.advance();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_codes_cover_each_line_of_business() {
        let codes = default_plan_codes();
        assert_eq!(codes.len(), 50 + 60 + 10);
        assert!(codes.contains(&"COMM-GOLD-001".to_string()));
        assert!(codes.contains(&"MCARE-MEDIGAP-020".to_string()));
        assert!(codes.contains(&"MCAID-AL-001".to_string()));
    }

    #[test]
    fn unknown_segments_fall_back_to_commercial_carriers() {
        assert_eq!(carriers_for("REGIONAL"), carriers_for("COMMERCIAL"));
        assert!(carriers_for("FEDERAL").contains(&"TRICARE"));
        assert_eq!(code_part("MEDICARE_PART_D"), "MEDI");
        assert_eq!(code_part("VA"), "VA");
    }
}
