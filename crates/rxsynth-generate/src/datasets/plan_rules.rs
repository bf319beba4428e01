use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value, json};

use rxsynth_core::{ColumnSpec, FieldKind, FieldValue};
use rxsynth_plan::{PlanRulePolicy, PlanRuleType};

use crate::datasets::{DatasetEnv, DatasetProducer, RunContext};
use crate::errors::{GenerationError, Result};
use crate::sampler::WeightedSampler;

pub const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("rule_id", FieldKind::Int),
    ColumnSpec::required("plan_id", FieldKind::Int),
    ColumnSpec::required("rule_type", FieldKind::Text),
    ColumnSpec::required("rule_name", FieldKind::Text),
    ColumnSpec::required("rule_criteria", FieldKind::Text),
    ColumnSpec::required("rule_action", FieldKind::Text),
    ColumnSpec::required("priority", FieldKind::Int),
    ColumnSpec::required("is_active", FieldKind::Bool),
    ColumnSpec::required("created_at", FieldKind::Timestamp),
];

const DRUG_CLASSES: &[&str] = &[
    "ANTIHYPERTENSIVE",
    "ANTIDIABETIC",
    "STATIN",
    "ANTIBIOTIC",
    "ANTIDEPRESSANT",
    "ANTIPSYCHOTIC",
    "ANTICOAGULANT",
    "OPIOID_ANALGESIC",
    "NSAID",
    "PROTON_PUMP_INHIBITOR",
    "BRONCHODILATOR",
    "CORTICOSTEROID",
    "ANTICONVULSANT",
    "IMMUNOSUPPRESSANT",
    "SPECIALTY_ONCOLOGY",
    "SPECIALTY_RHEUMATOLOGY",
    "SPECIALTY_MS",
    "SPECIALTY_HIV",
    "CONTRACEPTIVE",
    "ERECTILE_DYSFUNCTION",
    "SLEEP_AID",
    "ANTIHISTAMINE",
];

/// ICD-10 codes referenced by diagnosis requirements.
const DIAGNOSIS_CODES: &[&str] = &[
    "E11.9", "I10", "J45.909", "F32.9", "M79.3", "K21.9", "C50.9", "C61", "M05.9", "G35", "B20",
];

const PHARMACY_TYPES: &[&str] = &["RETAIL", "MAIL_ORDER", "SPECIALTY", "LONG_TERM_CARE"];

const EDIT_MESSAGES: &[&str] = &[
    "Product not covered",
    "Prior authorization required",
    "Quantity limit exceeded",
    "Refill too soon",
    "Step therapy required",
    "Age restriction not met",
    "Gender restriction not met",
    "Duplicate therapy detected",
];

/// Copay ranges in cents for tiers 1 to 3; higher tiers pay coinsurance.
const COPAY_CENTS: &[(i64, i64)] = &[(500, 1_500), (1_500, 3_500), (3_500, 7_000)];
const SPECIALTY_COINSURANCE: f64 = 0.30;
/// Mail order pays this share of the retail copay, in percent.
const MAIL_ORDER_COPAY_PCT: i64 = 80;

/// Criteria, action and display name of one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleBody {
    pub criteria: Value,
    pub action: Value,
    pub name: String,
}

fn pick(sampler: &mut WeightedSampler, items: &[&'static str]) -> Result<&'static str> {
    sampler.choose(items).copied()
}

fn pick_number<T: Copy>(sampler: &mut WeightedSampler, items: &[T]) -> Result<T> {
    sampler.choose(items).copied()
}

fn coin(sampler: &mut WeightedSampler) -> bool {
    sampler.bernoulli(0.5)
}

fn dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Build the criteria and action documents for `rule_type`.
pub fn rule_body(rule_type: PlanRuleType, sampler: &mut WeightedSampler) -> Result<RuleBody> {
    let mut criteria = Map::new();
    let mut action = Map::new();

    let name = match rule_type {
        PlanRuleType::Coverage => {
            let drug_class = pick(sampler, DRUG_CLASSES)?;
            let tier = sampler.sample_int(1, 5)?;
            criteria.insert("drug_class".into(), json!(drug_class));
            criteria.insert("is_generic".into(), json!(coin(sampler)));
            if sampler.bernoulli(0.3) {
                criteria.insert("specialty".into(), json!(coin(sampler)));
            }
            let covered = !(sampler.bernoulli(0.1) && coin(sampler));
            action.insert("covered".into(), json!(covered));
            action.insert("tier".into(), json!(tier));
            action.insert("preferred".into(), json!(coin(sampler)));
            if !covered {
                action.insert("denial_message".into(), json!("Product not covered under plan"));
            }
            format!("Coverage for {drug_class} - Tier {tier}")
        }
        PlanRuleType::PriorAuth => {
            let drug_class = pick(sampler, DRUG_CLASSES)?;
            criteria.insert("drug_class".into(), json!(drug_class));
            if sampler.bernoulli(0.3) {
                criteria.insert("min_age".into(), json!(pick_number(sampler, &[18, 21, 65])?));
            }
            let diagnosis_required = sampler.bernoulli(0.5);
            if diagnosis_required {
                let amount = sampler.sample_int(1, 3)? as usize;
                let codes: Vec<&str> = sampler
                    .sample_indices(DIAGNOSIS_CODES.len(), amount)
                    .into_iter()
                    .map(|idx| DIAGNOSIS_CODES[idx])
                    .collect();
                criteria.insert("diagnosis_required".into(), json!(true));
                criteria.insert("diagnosis_codes".into(), json!(codes));
            }
            if sampler.bernoulli(0.2) {
                let threshold = pick_number(sampler, &[30, 60, 90, 100])?;
                criteria.insert("quantity_threshold".into(), json!(threshold));
            }
            let pa_type = pick(
                sampler,
                &["CLINICAL_REVIEW", "AUTOMATED", "PRESCRIBER_ATTESTATION"],
            )?;
            action.insert("requires_pa".into(), json!(true));
            action.insert("pa_type".into(), json!(pa_type));
            let days = pick_number(sampler, &[30, 60, 90, 180, 365])?;
            action.insert("approval_duration_days".into(), json!(days));
            if diagnosis_required {
                action.insert(
                    "required_documents".into(),
                    json!(["diagnosis", "treatment_plan"]),
                );
            }
            format!("Prior Auth for {drug_class}")
        }
        PlanRuleType::QuantityLimit => {
            let drug_class = pick(sampler, DRUG_CLASSES)?;
            criteria.insert("drug_class".into(), json!(drug_class));
            if sampler.bernoulli(0.4) {
                criteria.insert("acute_pain".into(), json!(coin(sampler)));
            }
            let max_quantity = pick_number(sampler, &[30, 60, 90, 100, 120])?;
            action.insert("max_quantity".into(), json!(max_quantity));
            let max_days = pick_number(sampler, &[7, 14, 30, 60, 90])?;
            action.insert("max_days_supply".into(), json!(max_days));
            action.insert("max_refills".into(), json!(sampler.sample_int(0, 11)?));
            action.insert("override_allowed".into(), json!(coin(sampler)));
            format!("Quantity Limit for {drug_class} - Max {max_quantity} units")
        }
        PlanRuleType::CostShare => {
            let tier = sampler.sample_int(1, 5)?;
            let pharmacy_type = pick(sampler, PHARMACY_TYPES)?;
            let days_supply = pick_number(sampler, &[30, 60, 90])?;
            criteria.insert("tier".into(), json!(tier));
            criteria.insert("pharmacy_type".into(), json!(pharmacy_type));
            criteria.insert("days_supply".into(), json!(days_supply));

            let (copay_cents, coinsurance) = match COPAY_CENTS.get(tier as usize - 1) {
                Some((low, high)) => (sampler.sample_int(*low, *high)?, 0.0),
                None => (0, SPECIALTY_COINSURANCE),
            };
            let copay_cents = if pharmacy_type == "MAIL_ORDER" {
                (copay_cents * MAIL_ORDER_COPAY_PCT + 50) / 100
            } else {
                copay_cents
            };
            action.insert("copay".into(), json!(dollars(copay_cents)));
            action.insert("coinsurance".into(), json!(coinsurance));
            action.insert("apply_deductible".into(), json!(coin(sampler)));
            format!("Cost Share Tier {tier} - {pharmacy_type} - {days_supply} days")
        }
        PlanRuleType::ClinicalEdit => {
            let drug_class = pick(sampler, DRUG_CLASSES)?;
            criteria.insert("drug_class".into(), json!(drug_class));
            if sampler.bernoulli(0.6) {
                if coin(sampler) {
                    criteria.insert("min_age".into(), json!(pick_number(sampler, &[18, 21, 65])?));
                } else {
                    criteria.insert("max_age".into(), json!(pick_number(sampler, &[12, 17, 21])?));
                }
            }
            if sampler.bernoulli(0.3) {
                criteria.insert("gender".into(), json!(pick(sampler, &["M", "F"])?));
            }
            if sampler.bernoulli(0.2) {
                criteria.insert("pregnancy_category".into(), json!(pick(sampler, &["X", "D"])?));
                criteria.entry("gender").or_insert_with(|| json!("F"));
                criteria.insert("age_range".into(), json!([15, 45]));
            }
            let edit = pick(sampler, &["REJECT", "REQUIRE_OVERRIDE", "WARNING"])?;
            action.insert("action".into(), json!(edit));
            action.insert("warning_message".into(), json!(pick(sampler, EDIT_MESSAGES)?));
            if edit == "REQUIRE_OVERRIDE" {
                action.insert("prescriber_contact_required".into(), json!(coin(sampler)));
            }
            format!("Clinical Edit for {drug_class}")
        }
        PlanRuleType::RefillRestriction => {
            let drug_class = pick(sampler, DRUG_CLASSES)?;
            criteria.insert("drug_class".into(), json!(drug_class));
            if coin(sampler) {
                criteria.insert(
                    "dea_schedule".into(),
                    json!(pick(sampler, &["II", "III", "IV", "V"])?),
                );
            }
            let threshold = pick_number(sampler, &[0.75, 0.80, 0.85, 0.90])?;
            action.insert("refill_too_soon_threshold".into(), json!(threshold));
            action.insert(
                "early_refill_days".into(),
                json!(pick_number(sampler, &[0, 2, 3, 5])?),
            );
            action.insert("vacation_override".into(), json!(coin(sampler)));
            action.insert("lost_stolen_allowed".into(), json!(coin(sampler)));
            format!("Refill Restriction for {drug_class}")
        }
        PlanRuleType::NetworkRestriction => {
            let drug_type = pick(sampler, &["SPECIALTY", "MAINTENANCE", "ACUTE"])?;
            criteria.insert("drug_type".into(), json!(drug_type));
            if sampler.bernoulli(0.4) {
                let threshold = sampler.sample_int(50_000, 200_000)?;
                criteria.insert("cost_threshold".into(), json!(dollars(threshold)));
            }
            if sampler.bernoulli(0.3) {
                criteria.insert("min_days_supply".into(), json!(pick_number(sampler, &[60, 90])?));
            }
            let required = pick(sampler, PHARMACY_TYPES)?;
            action.insert("required_pharmacy_type".into(), json!(required));
            action.insert("out_of_network_allowed".into(), json!(coin(sampler)));
            if required == "SPECIALTY" {
                let preferred: Vec<String> = sampler
                    .sample_indices(99, 3)
                    .into_iter()
                    .map(|idx| format!("SPEC{:03}", idx + 1))
                    .collect();
                action.insert("preferred_pharmacies".into(), json!(preferred));
            }
            format!("Network Restriction - {drug_type} requires {required}")
        }
        PlanRuleType::StepTherapy => {
            let drug_class = pick(sampler, DRUG_CLASSES)?;
            criteria.insert("drug_class".into(), json!(drug_class));
            if sampler.bernoulli(0.6) {
                criteria.insert("diagnosis".into(), json!(pick(sampler, DIAGNOSIS_CODES)?));
            }
            let steps = sampler.sample_int(1, 3)?;
            let prefix = drug_class.to_lowercase();
            let first_line: Vec<String> =
                (1..=steps).map(|idx| format!("{prefix}_generic_{idx}")).collect();
            action.insert("required_first_line".into(), json!(first_line));
            action.insert(
                "trial_duration_days".into(),
                json!(pick_number(sampler, &[14, 30, 60, 90])?),
            );
            action.insert(
                "failure_criteria".into(),
                json!(pick(
                    sampler,
                    &["inadequate_response", "adverse_reaction", "contraindication"]
                )?),
            );
            action.insert("override_with_pa".into(), json!(true));
            format!("Step Therapy for {drug_class}")
        }
    };

    Ok(RuleBody {
        criteria: Value::Object(criteria),
        action: Value::Object(action),
        name,
    })
}

pub(crate) struct PlanRuleProducer {
    policy: PlanRulePolicy,
    priority_bands: Vec<(i64, i64, f64)>,
    anchor: NaiveDateTime,
    next_rule: u64,
}

impl PlanRuleProducer {
    pub(crate) fn prepare(env: &DatasetEnv<'_>) -> Result<Self> {
        let policy = env.config.plan_rules.clone();
        if policy.rule_types.is_empty() {
            return Err(GenerationError::InvalidDistribution(
                "plan rules need at least one rule type".to_string(),
            ));
        }
        Ok(Self {
            priority_bands: policy
                .priorities
                .iter()
                .map(|band| (band.min, band.max, band.weight))
                .collect(),
            anchor: midnight(env.reference_date),
            policy,
            next_rule: 1,
        })
    }

    fn build_row(&mut self, plan_id: u32, ctx: &mut RunContext<'_>) -> Result<Vec<FieldValue>> {
        let sampler = &mut ctx.sampler;
        let rule_type = *sampler.sample_category(&self.policy.rule_types)?;
        let body = rule_body(rule_type, sampler)?;
        let priority = sampler.sample_tiered(&self.priority_bands)?;
        let is_active = sampler.bernoulli(self.policy.active_rate);
        let days_back = sampler.sample_int(0, i64::from(self.policy.created_lookback_days))?;
        let seconds = sampler.sample_int(0, 86_399)?;
        let created_at = self.anchor - Duration::days(days_back) + Duration::seconds(seconds);

        let rule_id = self.next_rule;
        self.next_rule += 1;

        ctx.stats.record("rule_type", rule_type.as_str());
        if let Some(band) = self
            .policy
            .priorities
            .iter()
            .find(|band| (band.min..=band.max).contains(&priority))
        {
            ctx.stats.record("priority_band", &band.label);
        }
        if !is_active {
            ctx.stats.bump("inactive_rules");
        }

        Ok(vec![
            FieldValue::Int(rule_id as i64),
            FieldValue::from(plan_id),
            FieldValue::from(rule_type.as_str()),
            FieldValue::from(body.name),
            FieldValue::from(body.criteria.to_string()),
            FieldValue::from(body.action.to_string()),
            FieldValue::from(priority),
            FieldValue::from(is_active),
            FieldValue::from(created_at),
        ])
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

impl DatasetProducer for PlanRuleProducer {
    fn produce(&mut self, ctx: &mut RunContext<'_>) -> Result<()> {
        let range = self.policy.rules_per_plan;
        for plan_id in 1..=self.policy.plan_count {
            let rules = ctx
                .sampler
                .sample_int(i64::from(range.min), i64::from(range.max))?;
            for _ in 0..rules {
                if ctx.is_full() {
                    return Ok(());
                }
                let row = self.build_row(plan_id, ctx)?;
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

    const ALL_TYPES: [PlanRuleType; 8] = [
        PlanRuleType::Coverage,
        PlanRuleType::PriorAuth,
        PlanRuleType::QuantityLimit,
        PlanRuleType::CostShare,
        PlanRuleType::ClinicalEdit,
        PlanRuleType::RefillRestriction,
        PlanRuleType::NetworkRestriction,
        PlanRuleType::StepTherapy,
    ];

    #[test]
    fn every_rule_type_builds_object_documents() {
        let mut sampler = WeightedSampler::seeded(3);
        for rule_type in ALL_TYPES {
            for _ in 0..20 {
                let body = rule_body(rule_type, &mut sampler).expect("rule body");
                assert!(body.criteria.is_object(), "{rule_type:?} criteria");
                assert!(body.action.is_object(), "{rule_type:?} action");
                assert!(!body.name.is_empty());
            }
        }
    }

    #[test]
    fn cost_share_pays_copay_or_coinsurance_by_tier() {
        let mut sampler = WeightedSampler::seeded(8);
        for _ in 0..200 {
            let body = rule_body(PlanRuleType::CostShare, &mut sampler).expect("cost share");
            let tier = body.criteria["tier"].as_i64().expect("tier");
            let copay = body.action["copay"].as_f64().expect("copay");
            let coinsurance = body.action["coinsurance"].as_f64().expect("coinsurance");
            if tier >= 4 {
                assert_eq!(copay, 0.0);
                assert_eq!(coinsurance, SPECIALTY_COINSURANCE);
            } else {
                assert!(copay > 0.0 && copay <= 70.0, "tier {tier} copay {copay}");
                assert_eq!(coinsurance, 0.0);
            }
        }
    }

    #[test]
    fn pregnancy_edits_restrict_to_female_members() {
        let mut sampler = WeightedSampler::seeded(21);
        let mut seen = 0;
        for _ in 0..500 {
            let body = rule_body(PlanRuleType::ClinicalEdit, &mut sampler).expect("edit");
            if body.criteria.get("pregnancy_category").is_some() {
                seen += 1;
                assert!(body.criteria["gender"].is_string());
                assert_eq!(body.criteria["age_range"], json!([15, 45]));
            }
        }
        assert!(seen > 0);
    }

    #[test]
    fn step_therapy_lists_one_to_three_first_line_drugs() {
        let mut sampler = WeightedSampler::seeded(5);
        for _ in 0..100 {
            let body = rule_body(PlanRuleType::StepTherapy, &mut sampler).expect("step");
            let drugs = body.action["required_first_line"].as_array().expect("array");
            assert!((1..=3).contains(&drugs.len()));
            assert_eq!(body.action["override_with_pa"], json!(true));
        }
    }
}
