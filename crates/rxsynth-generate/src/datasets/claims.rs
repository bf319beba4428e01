use chrono::{Duration, NaiveDate, NaiveTime};

use rxsynth_core::{ColumnSpec, DatasetKind, FieldKind, FieldValue};
use rxsynth_plan::ClaimPolicy;

use crate::catalog::KeyPool;
use crate::datasets::reference::npi;
use crate::datasets::{DatasetEnv, DatasetProducer, RunContext};
use crate::derive::AttributeDeriver;
use crate::errors::{GenerationError, Result};

pub const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("claim_number", FieldKind::Text),
    ColumnSpec::required("transaction_type", FieldKind::Text),
    ColumnSpec::required("date_of_service", FieldKind::Date),
    ColumnSpec::required("received_timestamp", FieldKind::Timestamp),
    ColumnSpec::required("member_id", FieldKind::Text),
    ColumnSpec::required("person_code", FieldKind::Text),
    ColumnSpec::required("pharmacy_id", FieldKind::Text),
    ColumnSpec::required("pharmacy_npi", FieldKind::Text),
    ColumnSpec::required("prescription_number", FieldKind::Text),
    ColumnSpec::required("ndc", FieldKind::Text),
    ColumnSpec::required("quantity_dispensed", FieldKind::Int),
    ColumnSpec::required("days_supply", FieldKind::Int),
    ColumnSpec::required("refill_number", FieldKind::Int),
    ColumnSpec::required("daw_code", FieldKind::Int),
    ColumnSpec::required("date_written", FieldKind::Date),
    ColumnSpec::required("prescriber_npi", FieldKind::Text),
    ColumnSpec::required("prescriber_id", FieldKind::Text),
    ColumnSpec::required("ingredient_cost_submitted", FieldKind::Money),
    ColumnSpec::required("dispensing_fee_submitted", FieldKind::Money),
    ColumnSpec::required("patient_pay_amount", FieldKind::Money),
    ColumnSpec::required("plan_pay_amount", FieldKind::Money),
    ColumnSpec::required("tax_amount", FieldKind::Money),
];

/// Claims per hour of the service day: each hour gets its floored share of
/// `target`, the return value's second part is what is left over.
pub fn hourly_counts(weights: &[f64], target: u64) -> Result<(Vec<u64>, u64)> {
    let total: f64 = weights.iter().sum();
    if weights.is_empty() || !total.is_finite() || total <= 0.0 {
        return Err(GenerationError::InvalidDistribution(
            "hourly weights must have a positive sum".to_string(),
        ));
    }
    let counts: Vec<u64> = weights
        .iter()
        .map(|weight| (target as f64 * weight / total).floor() as u64)
        .collect();
    let assigned: u64 = counts.iter().sum();
    Ok((counts, target.saturating_sub(assigned)))
}

pub(crate) struct ClaimProducer {
    policy: ClaimPolicy,
    members: KeyPool,
    pharmacies: KeyPool,
    drugs: KeyPool,
    deriver: AttributeDeriver,
    service_date: NaiveDate,
    days_supply_weights: Vec<f64>,
    next_claim: u64,
}

impl ClaimProducer {
    pub(crate) fn prepare(env: &DatasetEnv<'_>) -> Result<Self> {
        let policy = env.config.claims.clone();
        Ok(Self {
            members: KeyPool::load(env.input_dir, DatasetKind::Members, "member_number")?,
            pharmacies: KeyPool::load(env.input_dir, DatasetKind::Pharmacies, "ncpdp_id")?,
            drugs: KeyPool::load(env.input_dir, DatasetKind::Drugs, "ndc_code")?,
            deriver: AttributeDeriver::from_config(env.config)?,
            service_date: env.reference_date,
            days_supply_weights: policy.days_supply.iter().map(|option| option.weight).collect(),
            policy,
            next_claim: 1,
        })
    }

    fn write_claim(&mut self, hour: u32, ctx: &mut RunContext<'_>) -> Result<()> {
        let sampler = &mut ctx.sampler;
        let claim_number = format!("CLM{:015}", self.next_claim);
        self.next_claim += 1;

        let member_id = self.members.choose(sampler)?.to_string();
        let pharmacy_id = self.pharmacies.choose(sampler)?.to_string();
        let ndc = self.drugs.choose(sampler)?.to_string();
        let transaction_type = sampler.sample_category(&self.policy.transaction_types)?.clone();
        let person_code = sampler.sample_category(&self.policy.person_codes)?.clone();

        let supply = &self.policy.days_supply[sampler.sample_index(&self.days_supply_weights)?];
        let quantity = sampler.sample_int(
            i64::from(supply.min_quantity),
            i64::from(supply.max_quantity),
        )? as u32;
        let refill_number = *sampler.sample_category(&self.policy.refill_numbers)?;
        let daw_code = *sampler.sample_category(&self.policy.daw_codes)?;
        let pricing = self.deriver.derive_claim_pricing(quantity, sampler)?;

        let minute = sampler.sample_int(0, 59)? as u32;
        let second = sampler.sample_int(0, 59)? as u32;
        let received = NaiveTime::from_hms_opt(hour % 24, minute, second)
            .map(|time| self.service_date.and_time(time))
            .ok_or_else(|| GenerationError::InvalidConfig(format!("invalid service hour {hour}")))?;
        let date_written = self.service_date - Duration::days(sampler.sample_int(1, 30)?);

        let prescriber_npi = npi(sampler)?;
        let pharmacy_npi = npi(sampler)?;
        let prescription_number = format!("RX{}", sampler.sample_int(1_000_000, 9_999_999)?);
        let prescriber_id = format!("PRES{}", sampler.sample_int(100_000, 999_999)?);

        ctx.stats.record("transaction_type", &transaction_type);
        ctx.stats.record("days_supply", &supply.days.to_string());
        ctx.stats.record("hour", &format!("{:02}", hour % 24));
        ctx.stats.record("pricing_tier", &pricing.tier.to_string());
        if pricing.clamped {
            ctx.stats.bump("patient_pay_clamped");
        }

        let row = vec![
            FieldValue::from(claim_number),
            FieldValue::from(transaction_type),
            FieldValue::from(self.service_date),
            FieldValue::from(received),
            FieldValue::from(member_id),
            FieldValue::from(person_code),
            FieldValue::from(pharmacy_id),
            FieldValue::from(pharmacy_npi),
            FieldValue::from(prescription_number),
            FieldValue::from(ndc),
            FieldValue::from(quantity),
            FieldValue::from(supply.days),
            FieldValue::from(refill_number),
            FieldValue::from(daw_code),
            FieldValue::from(date_written),
            FieldValue::from(prescriber_npi),
            FieldValue::from(prescriber_id),
            FieldValue::from(pricing.ingredient_cost),
            FieldValue::from(pricing.dispensing_fee),
            FieldValue::from(pricing.patient_pay),
            FieldValue::from(pricing.plan_pay),
            FieldValue::from(rust_decimal::Decimal::ZERO),
        ];
        ctx.write(&row)?;
        ctx.advance();
        Ok(())
    }
}

impl DatasetProducer for ClaimProducer {
    fn produce(&mut self, ctx: &mut RunContext<'_>) -> Result<()> {
        let (counts, remainder) = hourly_counts(&self.policy.hourly_weights, ctx.target())?;
        for (hour, count) in counts.iter().enumerate() {
            for _ in 0..*count {
                if ctx.is_full() {
                    return Ok(());
                }
                self.write_claim(hour as u32, ctx)?;
            }
        }

        let peak = self.policy.peak_hours;
        for _ in 0..remainder {
            if ctx.is_full() {
                break;
            }
            let hour = ctx
                .sampler
                .sample_int(i64::from(peak.min), i64::from(peak.max))? as u32;
            self.write_claim(hour, ctx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hourly_counts_floor_each_share_and_keep_the_rest() {
        let (counts, remainder) = hourly_counts(&[1.0, 1.0, 1.0], 10).expect("counts");
        assert_eq!(counts, vec![3, 3, 3]);
        assert_eq!(remainder, 1);
    }

    #[test]
    fn hourly_counts_reject_zero_weights() {
        assert!(hourly_counts(&[0.0, 0.0], 10).is_err());
    }
}
