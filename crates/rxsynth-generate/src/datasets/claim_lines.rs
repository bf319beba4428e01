use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;

use rxsynth_core::{ColumnSpec, FieldKind, FieldValue};
use rxsynth_plan::ClaimLinePolicy;

use crate::catalog::{ClaimHeader, ClaimSet, DrugCatalog, DrugFamily};
use crate::datasets::reference::npi;
use crate::datasets::{DatasetEnv, DatasetProducer, RunContext};
use crate::derive::AttributeDeriver;
use crate::errors::Result;
use crate::sampler::MoneyRange;

pub const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("claim_line_id", FieldKind::Int),
    ColumnSpec::required("claim_number", FieldKind::Text),
    ColumnSpec::required("line_number", FieldKind::Int),
    ColumnSpec::required("service_date", FieldKind::Date),
    ColumnSpec::required("ndc", FieldKind::Text),
    ColumnSpec::required("drug_name", FieldKind::Text),
    ColumnSpec::required("quantity_dispensed", FieldKind::Int),
    ColumnSpec::required("days_supply", FieldKind::Int),
    ColumnSpec::required("unit_of_measure", FieldKind::Text),
    ColumnSpec::required("rendering_provider_npi", FieldKind::Text),
    ColumnSpec::required("service_facility_npi", FieldKind::Text),
    ColumnSpec::required("place_of_service", FieldKind::Text),
    ColumnSpec::required("billed_amount", FieldKind::Money),
    ColumnSpec::required("allowed_amount", FieldKind::Money),
    ColumnSpec::required("paid_amount", FieldKind::Money),
    ColumnSpec::required("patient_responsibility", FieldKind::Money),
    ColumnSpec::required("copay_amount", FieldKind::Money),
    ColumnSpec::required("coinsurance_amount", FieldKind::Money),
    ColumnSpec::required("deductible_amount", FieldKind::Money),
    ColumnSpec::required("ingredient_cost", FieldKind::Money),
    ColumnSpec::required("dispensing_fee", FieldKind::Money),
    ColumnSpec::required("sales_tax", FieldKind::Money),
    ColumnSpec::required("line_status", FieldKind::Text),
    ColumnSpec::optional("denial_code", FieldKind::Text),
    ColumnSpec::optional("denial_reason", FieldKind::Text),
    ColumnSpec::optional("adjustment_reason", FieldKind::Text),
    ColumnSpec::optional("prior_auth_number", FieldKind::Text),
    ColumnSpec::required("formulary_status", FieldKind::Text),
    ColumnSpec::required("tier_level", FieldKind::Int),
    ColumnSpec::required("daw_code", FieldKind::Int),
    ColumnSpec::required("generic_indicator", FieldKind::Bool),
    ColumnSpec::required("brand_indicator", FieldKind::Bool),
    ColumnSpec::required("prescription_number", FieldKind::Text),
    ColumnSpec::required("refill_number", FieldKind::Int),
    ColumnSpec::required("date_written", FieldKind::Date),
    ColumnSpec::required("prescriber_npi", FieldKind::Text),
    ColumnSpec::required("processing_time_ms", FieldKind::Int),
    ColumnSpec::required("created_at", FieldKind::Timestamp),
];

const DENIAL_CODES: &[(&str, &str)] = &[
    ("70", "Product not covered"),
    ("75", "Prior authorization required"),
    ("76", "Plan limitations exceeded"),
    ("79", "Refill too soon"),
    ("85", "Patient not covered"),
    ("88", "DUR reject"),
    ("M4", "Missing/invalid NDC"),
    ("M6", "Missing/invalid quantity"),
];

const ADJUSTMENT_REASONS: &[&str] = &[
    "Pricing correction",
    "Quantity adjustment",
    "Coordination of benefits",
    "Duplicate claim adjustment",
];

const UNITS_OF_MEASURE: &[&str] = &["EA", "ML", "GM", "MG", "EACH"];

const PLACES_OF_SERVICE: &[&str] = &["01", "11", "12", "20", "21"];

/// Drug, quantity and submitted costs of one line.
struct LineItem {
    catalog_idx: usize,
    quantity: u32,
    days_supply: u32,
    ingredient_cost: Decimal,
    dispensing_fee: Decimal,
    prescription_number: String,
    refill_number: u32,
}

pub(crate) struct ClaimLineProducer {
    policy: ClaimLinePolicy,
    claims: ClaimSet,
    catalog: DrugCatalog,
    deriver: AttributeDeriver,
    extra_ingredient: MoneyRange,
    extra_fee: MoneyRange,
    created_at: NaiveDateTime,
    next_line_id: i64,
}

impl ClaimLineProducer {
    pub(crate) fn prepare(env: &DatasetEnv<'_>) -> Result<Self> {
        let policy = env.config.claim_lines.clone();
        let claims = ClaimSet::open(env.input_dir)?;
        let catalog = DrugCatalog::load(env.input_dir, &env.config.formulary_drugs.protected_classes)?;
        Ok(Self {
            extra_ingredient: MoneyRange::from_range(policy.additional_ingredient_cost)?,
            extra_fee: MoneyRange::from_range(policy.additional_dispensing_fee)?,
            deriver: AttributeDeriver::from_config(env.config)?,
            created_at: env.reference_date.and_time(chrono::NaiveTime::MIN),
            policy,
            claims,
            catalog,
            next_line_id: 1,
        })
    }

    fn first_line(&self, claim: &ClaimHeader) -> Result<LineItem> {
        // An NDC missing from the catalog means the inputs disagree.
        let catalog_idx = self.catalog.index_of(&claim.ndc)?;
        Ok(LineItem {
            catalog_idx,
            quantity: claim.quantity_dispensed,
            days_supply: claim.days_supply,
            ingredient_cost: claim.ingredient_cost,
            dispensing_fee: claim.dispensing_fee,
            prescription_number: claim.prescription_number.clone(),
            refill_number: claim.refill_number,
        })
    }

    fn additional_line(&self, ctx: &mut RunContext<'_>) -> Result<LineItem> {
        let sampler = &mut ctx.sampler;
        let catalog_idx = sampler.sample_int(0, self.catalog.len() as i64 - 1)? as usize;
        let days_supply = *sampler.choose(&self.policy.additional_days_supply)?;
        let quantity = if days_supply == 30 {
            sampler.sample_int(30, 90)?
        } else {
            sampler.sample_int(90, 270)?
        } as u32;
        Ok(LineItem {
            catalog_idx,
            quantity,
            days_supply,
            ingredient_cost: sampler.sample_money(self.extra_ingredient),
            dispensing_fee: sampler.sample_money(self.extra_fee),
            prescription_number: format!("RX{}", sampler.sample_int(1_000_000, 9_999_999)?),
            refill_number: sampler.sample_int(0, 11)? as u32,
        })
    }

    fn write_line(
        &mut self,
        claim: &ClaimHeader,
        line_number: u32,
        item: LineItem,
        ctx: &mut RunContext<'_>,
    ) -> Result<()> {
        let line_id = self.next_line_id;
        self.next_line_id += 1;

        let drug = self.catalog.drug(item.catalog_idx);
        let sampler = &mut ctx.sampler;
        let tier = *sampler.sample_category(&self.policy.tiers)?;
        let status = sampler.sample_category(&self.policy.statuses)?.clone();

        let mut pricing =
            self.deriver
                .derive_pricing(item.ingredient_cost, item.dispensing_fee, tier, sampler);
        let (denial_code, denial_reason) = if status == "DENIED" {
            pricing = pricing.denied();
            let (code, reason) = *sampler.choose(DENIAL_CODES)?;
            (Some(code), Some(reason))
        } else {
            (None, None)
        };
        let adjustment_reason = if status == "ADJUSTED" {
            Some(*sampler.choose(ADJUSTMENT_REASONS)?)
        } else {
            None
        };

        let daw_code = *sampler.sample_category(&self.policy.daw_codes)?;
        let unit_of_measure = *sampler.choose(UNITS_OF_MEASURE)?;
        let rendering_npi = if sampler.bernoulli(self.policy.rendering_matches_prescriber_rate) {
            claim.prescriber_npi.clone()
        } else {
            npi(sampler)?
        };
        let facility_npi = npi(sampler)?;
        let place_of_service = *sampler.choose(PLACES_OF_SERVICE)?;
        let prior_auth_number = if sampler.bernoulli(self.policy.prior_auth_number_rate) {
            Some(format!("PA{}", sampler.sample_int(100_000, 999_999)?))
        } else {
            None
        };
        let formulary_status = sampler
            .sample_category(&self.policy.formulary_statuses)?
            .clone();
        let date_written = claim.date_of_service - Duration::days(sampler.sample_int(1, 30)?);
        let processing_time_ms = sampler.sample_int(50, 500)?;
        let is_generic = drug.family == DrugFamily::Generic;

        ctx.stats.record("line_status", &status);
        ctx.stats.record("tier_level", &tier.to_string());
        ctx.stats.record("formulary_status", &formulary_status);
        if pricing.clamped {
            ctx.stats.bump("patient_responsibility_clamped");
        }

        let row = vec![
            FieldValue::from(line_id),
            FieldValue::from(claim.claim_number.as_str()),
            FieldValue::from(line_number),
            FieldValue::from(claim.date_of_service),
            FieldValue::from(drug.ndc_code.as_str()),
            FieldValue::from(drug.drug_name.as_str()),
            FieldValue::from(item.quantity),
            FieldValue::from(item.days_supply),
            FieldValue::from(unit_of_measure),
            FieldValue::from(rendering_npi),
            FieldValue::from(facility_npi),
            FieldValue::from(place_of_service),
            FieldValue::from(pricing.billed),
            FieldValue::from(pricing.allowed),
            FieldValue::from(pricing.plan_paid),
            FieldValue::from(pricing.patient_responsibility),
            FieldValue::from(pricing.copay),
            FieldValue::from(pricing.coinsurance),
            FieldValue::from(pricing.deductible),
            FieldValue::from(item.ingredient_cost),
            FieldValue::from(item.dispensing_fee),
            FieldValue::from(pricing.sales_tax),
            FieldValue::from(status),
            FieldValue::from(denial_code),
            FieldValue::from(denial_reason),
            FieldValue::from(adjustment_reason),
            FieldValue::from(prior_auth_number),
            FieldValue::from(formulary_status),
            FieldValue::from(tier),
            FieldValue::from(daw_code),
            FieldValue::from(is_generic),
            FieldValue::from(!is_generic),
            FieldValue::from(item.prescription_number),
            FieldValue::from(item.refill_number),
            FieldValue::from(date_written),
            FieldValue::from(claim.prescriber_npi.as_str()),
            FieldValue::from(processing_time_ms),
            FieldValue::from(self.created_at),
        ];
        ctx.write(&row)
    }
}

impl DatasetProducer for ClaimLineProducer {
    fn produce(&mut self, ctx: &mut RunContext<'_>) -> Result<()> {
        for claim in self.claims.iter() {
            if ctx.is_full() {
                break;
            }
            let claim = claim?;
            let lines = *ctx.sampler.sample_category(&self.policy.lines_per_claim)?;
            for line_number in 1..=lines.max(1) {
                if ctx.is_full() {
                    break;
                }
                let item = if line_number == 1 {
                    self.first_line(&claim)?
                } else {
                    self.additional_line(ctx)?
                };
                self.write_line(&claim, line_number, item, ctx)?;
            }
            ctx.stats.bump("claims");
            ctx.advance();
        }
        Ok(())
    }
}
