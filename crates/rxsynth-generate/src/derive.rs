//! Attribute derivation: tiers, utilization gates, formulary status and
//! cost sharing.
//!
//! Every amount is computed in fixed-point decimal and rounded half-even to
//! whole cents, so `plan_paid + patient_responsibility == allowed` holds
//! exactly for every row.

use rust_decimal::Decimal;

use rxsynth_core::{apply_basis_points, round_money};
use rxsynth_plan::{
    ClaimPricingPolicy, CopayBand, LinePricingPolicy, TierPolicy, TierSplit, UtilizationPolicy,
};

use crate::catalog::{Drug, DrugFamily};
use crate::errors::{GenerationError, Result};
use crate::sampler::{MoneyRange, RatioRange, WeightedSampler, basis_points};

/// Clamp an identifier into `1..=max` by wrapping.
pub fn wrap_identifier(value: u64, max: u64) -> u64 {
    if max == 0 || value <= max {
        return value;
    }
    ((value - 1) % max) + 1
}

/// Formulary status derived from the tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormularyStatus {
    Preferred,
    NonPreferred,
    Specialty,
}

impl FormularyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FormularyStatus::Preferred => "PREFERRED",
            FormularyStatus::NonPreferred => "NON_PREFERRED",
            FormularyStatus::Specialty => "SPECIALTY",
        }
    }
}

/// Utilization-management gates for one formulary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtilizationFlags {
    pub prior_auth: bool,
    pub step_therapy: bool,
    /// Set together with `days_supply_limit`.
    pub quantity_limit: Option<u32>,
    pub days_supply_limit: Option<u32>,
}

/// Adjudicated cost split of one claim line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePricing {
    pub billed: Decimal,
    pub allowed: Decimal,
    pub copay: Decimal,
    pub coinsurance: Decimal,
    pub deductible: Decimal,
    pub patient_responsibility: Decimal,
    pub plan_paid: Decimal,
    pub sales_tax: Decimal,
    /// Cost share exceeded allowed and was clamped.
    pub clamped: bool,
}

impl LinePricing {
    /// Zero the adjudicated side of a denied line; billed stays as submitted.
    pub fn denied(self) -> Self {
        Self {
            allowed: Decimal::ZERO,
            copay: Decimal::ZERO,
            coinsurance: Decimal::ZERO,
            deductible: Decimal::ZERO,
            patient_responsibility: Decimal::ZERO,
            plan_paid: Decimal::ZERO,
            ..self
        }
    }
}

/// Submitted cost split of a claim header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimPricing {
    pub tier: u8,
    pub ingredient_cost: Decimal,
    pub dispensing_fee: Decimal,
    pub patient_pay: Decimal,
    pub plan_pay: Decimal,
    pub clamped: bool,
}

#[derive(Debug, Clone)]
struct CostShare {
    copays: Vec<(u8, MoneyRange)>,
    coinsurance_bp: u32,
}

impl CostShare {
    fn new(copays: &[CopayBand], coinsurance_rate: f64) -> Result<Self> {
        let copays = copays
            .iter()
            .map(|band| Ok((band.tier, MoneyRange::from_bounds(band.min, band.max)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            copays,
            coinsurance_bp: basis_points(coinsurance_rate)?,
        })
    }

    fn copay_band(&self, tier: u8) -> Option<MoneyRange> {
        self.copays
            .iter()
            .find(|(band_tier, _)| *band_tier == tier)
            .map(|(_, range)| *range)
    }

    /// Copay for banded tiers, coinsurance on `base` otherwise.
    fn split(&self, tier: u8, base: Decimal, sampler: &mut WeightedSampler) -> (Decimal, Decimal) {
        match self.copay_band(tier) {
            Some(band) => (sampler.sample_money(band), Decimal::ZERO),
            None => (Decimal::ZERO, apply_basis_points(base, self.coinsurance_bp)),
        }
    }
}

#[derive(Debug, Clone)]
struct LineRules {
    allowed_ratio: RatioRange,
    deductible_rate: f64,
    deductible: MoneyRange,
    sales_tax_applied_rate: f64,
    sales_tax_bp: u32,
    share: CostShare,
}

#[derive(Debug, Clone)]
struct ClaimRules {
    unit_cost: MoneyRange,
    dispensing_fee: MoneyRange,
    tier_count: u8,
    share: CostShare,
}

/// Resolved derivation policy.
#[derive(Debug, Clone)]
pub struct AttributeDeriver {
    tiers: TierPolicy,
    utilization: UtilizationPolicy,
    non_preferred_rate: f64,
    line: LineRules,
    claim: ClaimRules,
}

impl AttributeDeriver {
    pub fn new(
        tiers: &TierPolicy,
        utilization: &UtilizationPolicy,
        non_preferred_rate: f64,
        line: &LinePricingPolicy,
        claim: &ClaimPricingPolicy,
    ) -> Result<Self> {
        if utilization.rates_for(utilization.fallback_tier).is_none() {
            return Err(GenerationError::InvalidConfig(format!(
                "no gate rates for fallback tier {}",
                utilization.fallback_tier
            )));
        }
        if claim.tier_count == 0 {
            return Err(GenerationError::InvalidConfig(
                "claim pricing tier_count must be positive".to_string(),
            ));
        }
        Ok(Self {
            tiers: tiers.clone(),
            utilization: utilization.clone(),
            non_preferred_rate,
            line: LineRules {
                allowed_ratio: RatioRange::from_range(line.allowed_ratio)?,
                deductible_rate: line.deductible_rate,
                deductible: MoneyRange::from_range(line.deductible)?,
                sales_tax_applied_rate: line.sales_tax_applied_rate,
                sales_tax_bp: basis_points(line.sales_tax_rate)?,
                share: CostShare::new(&line.copays, line.coinsurance_rate)?,
            },
            claim: ClaimRules {
                unit_cost: MoneyRange::from_range(claim.unit_cost)?,
                dispensing_fee: MoneyRange::from_range(claim.dispensing_fee)?,
                tier_count: claim.tier_count,
                share: CostShare::new(&claim.copays, claim.coinsurance_rate)?,
            },
        })
    }

    pub fn from_config(config: &rxsynth_plan::RunConfig) -> Result<Self> {
        let policy = &config.formulary_drugs;
        Self::new(
            &policy.tiers,
            &policy.utilization,
            policy.non_preferred_rate,
            &config.claim_lines.pricing,
            &config.claims.pricing,
        )
    }

    /// Tier in `1..=tier_count` from the drug family.
    pub fn derive_tier(&self, drug: &Drug, tier_count: u8, sampler: &mut WeightedSampler) -> u8 {
        let cap = tier_count.max(1);
        let fallback = self.tiers.default_tier.clamp(1, cap);
        match drug.family {
            DrugFamily::Generic => {
                if sampler.bernoulli(self.tiers.generic_tier1_rate) {
                    1
                } else {
                    fallback
                }
            }
            DrugFamily::Brand => split_tier(self.tiers.brand, cap, sampler),
            DrugFamily::Specialty => split_tier(self.tiers.specialty, cap, sampler),
            DrugFamily::Unclassified => fallback,
        }
    }

    /// Prior-auth, step-therapy and quantity-limit gates for a tier.
    pub fn derive_utilization_flags(
        &self,
        drug: &Drug,
        tier: u8,
        sampler: &mut WeightedSampler,
    ) -> Result<UtilizationFlags> {
        let rates = self.utilization.rates_for(tier).ok_or_else(|| {
            GenerationError::InvalidConfig(format!("no gate rates for tier {tier}"))
        })?;
        let prior_auth = sampler.bernoulli(rates.prior_auth);
        let step_therapy = sampler.bernoulli(rates.step_therapy);
        let (quantity_limit, days_supply_limit) = if sampler.bernoulli(rates.quantity_limit) {
            let quantity = *sampler.choose(self.utilization.quantity_choices(&drug.dosage_form))?;
            let days = *sampler.choose(&self.utilization.days_supply_limits)?;
            (Some(quantity), Some(days))
        } else {
            (None, None)
        };
        Ok(UtilizationFlags {
            prior_auth,
            step_therapy,
            quantity_limit,
            days_supply_limit,
        })
    }

    pub fn derive_status(&self, tier: u8, sampler: &mut WeightedSampler) -> FormularyStatus {
        match tier {
            0..=2 => FormularyStatus::Preferred,
            3 if sampler.bernoulli(self.non_preferred_rate) => FormularyStatus::NonPreferred,
            3 => FormularyStatus::Preferred,
            _ => FormularyStatus::Specialty,
        }
    }

    /// Adjudicate a claim line from its submitted costs.
    pub fn derive_pricing(
        &self,
        ingredient_cost: Decimal,
        dispensing_fee: Decimal,
        tier: u8,
        sampler: &mut WeightedSampler,
    ) -> LinePricing {
        let rules = &self.line;
        let billed = round_money(ingredient_cost + dispensing_fee);
        let ratio_bp = sampler.sample_basis_points(rules.allowed_ratio);
        let allowed = apply_basis_points(billed, ratio_bp);

        let (mut copay, mut coinsurance) = rules.share.split(tier, allowed, sampler);
        let mut deductible = if sampler.bernoulli(rules.deductible_rate) {
            sampler.sample_money(rules.deductible)
        } else {
            Decimal::ZERO
        };

        let mut patient_responsibility = copay + coinsurance + deductible;
        let clamped = patient_responsibility > allowed;
        if clamped {
            patient_responsibility = allowed;
            copay = allowed;
            coinsurance = Decimal::ZERO;
            deductible = Decimal::ZERO;
        }
        let plan_paid = allowed - patient_responsibility;

        let sales_tax = if sampler.bernoulli(rules.sales_tax_applied_rate) {
            apply_basis_points(billed, rules.sales_tax_bp)
        } else {
            Decimal::ZERO
        };

        LinePricing {
            billed,
            allowed,
            copay,
            coinsurance,
            deductible,
            patient_responsibility,
            plan_paid,
            sales_tax,
            clamped,
        }
    }

    /// Submitted costs and payer split of a claim header.
    pub fn derive_claim_pricing(&self, quantity: u32, sampler: &mut WeightedSampler) -> Result<ClaimPricing> {
        let rules = &self.claim;
        let unit_cost = sampler.sample_money(rules.unit_cost);
        let ingredient_cost = round_money(unit_cost * Decimal::from(quantity));
        let dispensing_fee = sampler.sample_money(rules.dispensing_fee);
        let total = ingredient_cost + dispensing_fee;

        let tier = sampler.sample_int(1, i64::from(rules.tier_count))? as u8;
        let (copay, coinsurance) = rules.share.split(tier, total, sampler);
        let mut patient_pay = copay + coinsurance;
        let clamped = patient_pay > total;
        if clamped {
            patient_pay = total;
        }

        Ok(ClaimPricing {
            tier,
            ingredient_cost,
            dispensing_fee,
            patient_pay,
            plan_pay: total - patient_pay,
            clamped,
        })
    }
}

fn split_tier(split: TierSplit, cap: u8, sampler: &mut WeightedSampler) -> u8 {
    if split.upper <= cap {
        if sampler.bernoulli(split.lower_rate) {
            split.lower
        } else {
            split.upper
        }
    } else {
        split.lower.clamp(1, cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_identifier_stays_in_range() {
        assert_eq!(wrap_identifier(5, 10), 5);
        assert_eq!(wrap_identifier(10, 10), 10);
        assert_eq!(wrap_identifier(11, 10), 1);
        assert_eq!(wrap_identifier(25, 10), 5);
        assert_eq!(wrap_identifier(7, 0), 7);
    }
}
