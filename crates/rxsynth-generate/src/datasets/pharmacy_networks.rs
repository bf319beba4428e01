use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use rxsynth_core::{ColumnSpec, DatasetKind, FieldKind, FieldValue};
use rxsynth_plan::{CountRange, PharmacyNetworkPolicy, count_range};

use crate::catalog::KeyPool;
use crate::datasets::{DatasetEnv, DatasetProducer, RunContext};
use crate::errors::{GenerationError, Result};
use crate::sampler::{MoneyRange, WeightedSampler};

pub const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("network_id", FieldKind::Text),
    ColumnSpec::required("pharmacy_id", FieldKind::Text),
    ColumnSpec::required("network_name", FieldKind::Text),
    ColumnSpec::required("network_type", FieldKind::Text),
    ColumnSpec::required("network_tier", FieldKind::Text),
    ColumnSpec::required("contract_type", FieldKind::Text),
    ColumnSpec::required("effective_date", FieldKind::Date),
    ColumnSpec::optional("termination_date", FieldKind::Date),
    ColumnSpec::required("status", FieldKind::Text),
    ColumnSpec::required("reimbursement_rate", FieldKind::Text),
    ColumnSpec::required("dispensing_fee", FieldKind::Money),
    ColumnSpec::required("is_preferred", FieldKind::Bool),
    ColumnSpec::required("is_mail_order", FieldKind::Bool),
    ColumnSpec::required("is_specialty", FieldKind::Bool),
    ColumnSpec::required("created_at", FieldKind::Timestamp),
    ColumnSpec::required("updated_at", FieldKind::Timestamp),
];

/// Termination date for a contract in `status`, never before `effective`.
///
/// Active contracts usually run open-ended; inactive ones ended in the past,
/// pulled back before `reference` when the drawn term would reach it.
pub fn termination_date(
    status: &str,
    effective: NaiveDate,
    reference: NaiveDate,
    policy: &PharmacyNetworkPolicy,
    sampler: &mut WeightedSampler,
) -> Result<Option<NaiveDate>> {
    match status {
        "Active" => {
            if !sampler.bernoulli(policy.active_termination_rate) {
                return Ok(None);
            }
            Ok(Some(effective + span_days(sampler, policy.active_term_days)?))
        }
        "Inactive" => {
            let mut ended = effective + span_days(sampler, policy.inactive_term_days)?;
            if ended > reference {
                ended = reference - span_days(sampler, count_range(1, 365))?;
            }
            Ok(Some(ended.max(effective)))
        }
        _ => Ok(None),
    }
}

fn span_days(sampler: &mut WeightedSampler, range: CountRange) -> Result<Duration> {
    Ok(Duration::days(
        sampler.sample_int(i64::from(range.min), i64::from(range.max))?,
    ))
}

pub(crate) struct PharmacyNetworkProducer {
    policy: PharmacyNetworkPolicy,
    pharmacies: KeyPool,
    fee: MoneyRange,
    reference: NaiveDate,
    stamp: NaiveDateTime,
    next_network: u64,
}

impl PharmacyNetworkProducer {
    pub(crate) fn prepare(env: &DatasetEnv<'_>) -> Result<Self> {
        let policy = env.config.pharmacy_networks.clone();
        if policy.networks.is_empty() {
            return Err(GenerationError::InvalidConfig(
                "pharmacy networks need at least one network".to_string(),
            ));
        }
        Ok(Self {
            pharmacies: KeyPool::load(env.input_dir, DatasetKind::Pharmacies, "ncpdp_id")?,
            fee: MoneyRange::from_range(policy.dispensing_fee)?,
            reference: env.reference_date,
            stamp: env.reference_date.and_time(NaiveTime::MIN),
            policy,
            next_network: 1,
        })
    }

    fn build_row(
        &mut self,
        pharmacy_id: &str,
        network_idx: usize,
        ctx: &mut RunContext<'_>,
    ) -> Result<Vec<FieldValue>> {
        let sampler = &mut ctx.sampler;
        let network = &self.policy.networks[network_idx];
        let status = sampler.sample_category(&self.policy.statuses)?.clone();
        let contract_type = sampler.sample_category(&self.policy.contract_types)?.clone();
        let lookback = i64::from(self.policy.effective_lookback_days);
        let effective = self.reference - Duration::days(sampler.sample_int(0, lookback)?);
        let termination =
            termination_date(&status, effective, self.reference, &self.policy, sampler)?;
        let discount = *sampler.choose(&self.policy.awp_discounts)?;
        let dispensing_fee = sampler.sample_money(self.fee);

        let network_id = format!("NET{:010}", self.next_network);
        self.next_network += 1;

        ctx.stats.record("network_type", &network.network_type);
        ctx.stats.record("status", &status);
        ctx.stats.record("contract_type", &contract_type);

        Ok(vec![
            FieldValue::from(network_id),
            FieldValue::from(pharmacy_id),
            FieldValue::from(network.name.as_str()),
            FieldValue::from(network.network_type.as_str()),
            FieldValue::from(network.tier.as_str()),
            FieldValue::from(contract_type),
            FieldValue::from(effective),
            FieldValue::from(termination),
            FieldValue::from(status),
            FieldValue::from(format!("AWP-{discount}%")),
            FieldValue::from(dispensing_fee),
            FieldValue::from(network.tier == "Preferred"),
            FieldValue::from(network.network_type == "Mail-Order"),
            FieldValue::from(network.network_type == "Specialty"),
            FieldValue::from(self.stamp),
            FieldValue::from(self.stamp),
        ])
    }
}

impl DatasetProducer for PharmacyNetworkProducer {
    fn produce(&mut self, ctx: &mut RunContext<'_>) -> Result<()> {
        let range = self.policy.networks_per_pharmacy;
        let pharmacies = self.pharmacies.keys().to_vec();
        for pharmacy_id in &pharmacies {
            if ctx.is_full() {
                return Ok(());
            }
            let joined = ctx
                .sampler
                .sample_int(i64::from(range.min), i64::from(range.max))? as usize;
            let networks = ctx.sampler.sample_indices(self.policy.networks.len(), joined);
            for network_idx in networks {
                if ctx.is_full() {
                    return Ok(());
                }
                let row = self.build_row(pharmacy_id, network_idx, ctx)?;
                ctx.write(&row)?;
            }
            ctx.advance();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    #[test]
    fn termination_never_precedes_effective() {
        let policy = PharmacyNetworkPolicy::default();
        let reference = date(2024, 11, 9);
        let mut sampler = WeightedSampler::seeded(17);
        for status in ["Active", "Inactive", "Pending"] {
            for _ in 0..500 {
                let back = sampler.sample_int(0, 1_825).expect("days");
                let effective = reference - Duration::days(back);
                let ended = termination_date(status, effective, reference, &policy, &mut sampler)
                    .expect("termination");
                if let Some(ended) = ended {
                    assert!(ended >= effective, "{status}: {ended} before {effective}");
                }
            }
        }
    }

    #[test]
    fn inactive_contracts_end_by_the_reference_date() {
        let policy = PharmacyNetworkPolicy::default();
        let reference = date(2024, 11, 9);
        let mut sampler = WeightedSampler::seeded(23);
        for back in [0, 30, 400, 1_800] {
            let effective = reference - Duration::days(back);
            let ended = termination_date("Inactive", effective, reference, &policy, &mut sampler)
                .expect("termination")
                .expect("inactive contracts end");
            assert!(ended <= reference.max(effective));
        }
    }

    #[test]
    fn pending_contracts_stay_open() {
        let policy = PharmacyNetworkPolicy::default();
        let reference = date(2024, 11, 9);
        let mut sampler = WeightedSampler::seeded(5);
        let ended = termination_date("Pending", reference, reference, &policy, &mut sampler)
            .expect("termination");
        assert_eq!(ended, None);
    }
}
