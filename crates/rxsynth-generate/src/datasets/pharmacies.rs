use std::collections::HashSet;

use rxsynth_core::{ColumnSpec, FieldKind, FieldValue};
use rxsynth_plan::PharmacyPolicy;

use crate::datasets::reference::{
    STATE_WEIGHTS, STREET_NAMES, STREET_TYPES, major_cities, phone_parts, synthetic_city, zip_code,
};
use crate::datasets::{DatasetEnv, DatasetProducer, RunContext};
use crate::derive::wrap_identifier;
use crate::errors::{GenerationError, Result};
use crate::sampler::WeightedSampler;

pub const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("ncpdp_id", FieldKind::Text),
    ColumnSpec::required("pharmacy_name", FieldKind::Text),
    ColumnSpec::required("npi", FieldKind::Text),
    ColumnSpec::required("address", FieldKind::Text),
    ColumnSpec::required("city", FieldKind::Text),
    ColumnSpec::required("state", FieldKind::Text),
    ColumnSpec::required("zip_code", FieldKind::Text),
    ColumnSpec::required("phone", FieldKind::Text),
    ColumnSpec::required("pharmacy_type", FieldKind::Text),
    ColumnSpec::required("is_active", FieldKind::Bool),
];

const INDEPENDENT: &str = "INDEPENDENT";
const REGIONAL_CHAIN: &str = "REGIONAL CHAIN";

const INDEPENDENT_PREFIXES: &[&str] = &[
    "Family",
    "Community",
    "Main Street",
    "Corner",
    "Neighborhood",
    "Local",
    "Town",
    "Village",
    "City",
    "Professional",
];

const INDEPENDENT_SUFFIXES: &[&str] =
    &["Pharmacy", "Drug Store", "Apothecary", "Prescriptions", "Drugs"];

const REGIONAL_CHAINS: &[&str] = &[
    "Hy-Vee",
    "Meijer",
    "H-E-B",
    "Giant Eagle",
    "Wegmans",
    "ShopRite",
    "Stop & Shop",
    "Food Lion",
    "Harris Teeter",
    "Safeway",
    "Vons",
    "Jewel-Osco",
    "Acme",
    "Randalls",
];

/// Stores allotted to one chain.
#[derive(Debug, Clone, PartialEq)]
struct ChainQuota {
    chain: String,
    /// Real store count; store numbers wrap at it.
    store_count: u64,
    count: u64,
}

/// Split `target` across chains by weight, flooring each share. The
/// remainder goes to independents, or to the heaviest chain when no
/// independent entry is configured.
fn chain_quotas(policy: &PharmacyPolicy, target: u64) -> Result<Vec<ChainQuota>> {
    let total: f64 = policy.chains.iter().map(|chain| chain.weight).sum();
    if policy.chains.is_empty() || total <= 0.0 {
        return Err(GenerationError::InvalidDistribution(
            "pharmacy chains need a positive total weight".to_string(),
        ));
    }
    let mut quotas: Vec<ChainQuota> = policy
        .chains
        .iter()
        .map(|chain| ChainQuota {
            chain: chain.value.clone(),
            store_count: chain.weight.max(0.0) as u64,
            count: (chain.weight / total * target as f64).floor() as u64,
        })
        .collect();

    let assigned: u64 = quotas.iter().map(|quota| quota.count).sum();
    let remainder = target.saturating_sub(assigned);
    let sink = quotas
        .iter()
        .position(|quota| quota.chain == INDEPENDENT)
        .or_else(|| {
            policy
                .chains
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.weight.total_cmp(&b.1.weight))
                .map(|(idx, _)| idx)
        });
    if let Some(idx) = sink {
        quotas[idx].count += remainder;
    }
    Ok(quotas)
}

/// Draw from `low..=high` until the value is unused.
fn unique_number(
    sampler: &mut WeightedSampler,
    used: &mut HashSet<i64>,
    low: i64,
    high: i64,
) -> Result<i64> {
    if used.len() as i64 >= high - low + 1 {
        return Err(GenerationError::InvalidConfig(format!(
            "identifier space {low}..={high} is exhausted"
        )));
    }
    loop {
        let value = sampler.sample_int(low, high)?;
        if used.insert(value) {
            return Ok(value);
        }
    }
}

pub(crate) struct PharmacyProducer {
    policy: PharmacyPolicy,
    ncpdp_ids: HashSet<i64>,
    npis: HashSet<i64>,
}

impl PharmacyProducer {
    pub(crate) fn prepare(env: &DatasetEnv<'_>) -> Result<Self> {
        Ok(Self {
            policy: env.config.pharmacies.clone(),
            ncpdp_ids: HashSet::new(),
            npis: HashSet::new(),
        })
    }

    fn pharmacy_name(
        chain: &str,
        store_number: u64,
        city: &str,
        sampler: &mut WeightedSampler,
    ) -> Result<String> {
        Ok(match chain {
            INDEPENDENT => {
                let suffix = sampler.choose(INDEPENDENT_SUFFIXES)?;
                if sampler.bernoulli(0.3) {
                    format!("{city} {suffix}")
                } else {
                    format!("{} {suffix}", sampler.choose(INDEPENDENT_PREFIXES)?)
                }
            }
            REGIONAL_CHAIN => format!(
                "{} Pharmacy #{store_number}",
                sampler.choose(REGIONAL_CHAINS)?
            ),
            other => format!("{other} Pharmacy #{store_number}"),
        })
    }

    fn build_row(
        &mut self,
        quota: &ChainQuota,
        store_index: u64,
        ctx: &mut RunContext<'_>,
    ) -> Result<Vec<FieldValue>> {
        let sampler = &mut ctx.sampler;
        let ncpdp = unique_number(sampler, &mut self.ncpdp_ids, 1_000_000, 9_999_999)?;
        let npi = unique_number(sampler, &mut self.npis, 1_000_000_000, 9_999_999_999)?;

        let state = *sampler.sample_pair(STATE_WEIGHTS)?;
        let city = match major_cities(state) {
            Some(cities) if sampler.bernoulli(self.policy.major_city_rate) => {
                sampler.choose(cities)?.to_string()
            }
            _ => synthetic_city(sampler)?,
        };
        let mut address = format!(
            "{} {} {}",
            sampler.sample_int(1, 9_999)?,
            sampler.choose(STREET_NAMES)?,
            sampler.choose(STREET_TYPES)?
        );
        if sampler.bernoulli(self.policy.suite_rate) {
            address.push_str(&format!(", Suite {}", sampler.sample_int(1, 500)?));
        }
        let zip = zip_code(state, sampler)?;
        let (area, exchange, line) = phone_parts(sampler)?;

        let store_number = wrap_identifier(store_index + 1, quota.store_count);
        let name = Self::pharmacy_name(&quota.chain, store_number, &city, sampler)?;
        let pharmacy_type = sampler.sample_category(&self.policy.pharmacy_types)?.clone();
        let is_active = sampler.bernoulli(self.policy.active_rate);

        ctx.stats.record("chain", &quota.chain);
        ctx.stats.record("pharmacy_type", &pharmacy_type);
        ctx.stats.record("state", state);

        Ok(vec![
            FieldValue::from(ncpdp.to_string()),
            FieldValue::from(name),
            FieldValue::from(npi.to_string()),
            FieldValue::from(address),
            FieldValue::from(city),
            FieldValue::from(state),
            FieldValue::from(zip),
            FieldValue::from(format!("({area}) {exchange}-{line}")),
            FieldValue::from(pharmacy_type),
            FieldValue::from(is_active),
        ])
    }
}

impl DatasetProducer for PharmacyProducer {
    fn produce(&mut self, ctx: &mut RunContext<'_>) -> Result<()> {
        let quotas = chain_quotas(&self.policy, ctx.target())?;
        for quota in &quotas {
            for store_index in 0..quota.count {
                if ctx.is_full() {
                    return Ok(());
                }
                let row = self.build_row(quota, store_index, ctx)?;
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
    fn quotas_sum_to_target_with_remainder_on_independents() {
        let policy = PharmacyPolicy::default();
        let quotas = chain_quotas(&policy, 1_003).expect("quotas");
        let total: u64 = quotas.iter().map(|quota| quota.count).sum();
        assert_eq!(total, 1_003);

        let total_weight: f64 = policy.chains.iter().map(|chain| chain.weight).sum();
        let independent = quotas
            .iter()
            .find(|quota| quota.chain == INDEPENDENT)
            .expect("independent quota");
        let floor = (20_000.0 / total_weight * 1_003.0_f64).floor() as u64;
        assert!(independent.count >= floor);
    }

    #[test]
    fn store_numbers_wrap_at_chain_size() {
        assert_eq!(wrap_identifier(601, 600), 1);
        assert_eq!(wrap_identifier(600, 600), 600);
    }
}
