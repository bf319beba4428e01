use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::PlanError;

/// Complete configuration for a generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub run: RunSettings,
    pub drugs: DrugPolicy,
    pub members: MemberPolicy,
    pub pharmacies: PharmacyPolicy,
    pub formularies: FormularyPolicy,
    pub formulary_drugs: FormularyDrugPolicy,
    pub plan_rules: PlanRulePolicy,
    pub enrollments: EnrollmentPolicy,
    pub pharmacy_networks: PharmacyNetworkPolicy,
    pub claims: ClaimPolicy,
    pub claim_lines: ClaimLinePolicy,
    pub drug_interactions: InteractionPolicy,
}

impl RunConfig {
    /// Parse the configured reference date.
    pub fn reference_date(&self) -> Result<NaiveDate, PlanError> {
        NaiveDate::parse_from_str(&self.run.reference_date, "%Y-%m-%d").map_err(|err| {
            PlanError::Invalid(format!(
                "reference_date '{}' is not YYYY-MM-DD: {err}",
                self.run.reference_date
            ))
        })
    }
}

/// Settings shared by every dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct RunSettings {
    /// Seed for every weighted draw of the run.
    pub seed: u64,
    /// Directory holding upstream reference files.
    pub input_dir: PathBuf,
    /// Directory receiving output shards.
    pub output_dir: PathBuf,
    /// Byte budget per output shard.
    pub shard_budget_bytes: u64,
    /// Anchor date for service dates, birth dates and audit timestamps.
    pub reference_date: String,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            input_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("data"),
            shard_budget_bytes: 30 * 1024 * 1024,
            reference_date: "2024-11-09".to_string(),
        }
    }
}

/// One entry of a discrete distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Weighted<T> {
    pub value: T,
    pub weight: f64,
}

pub fn weighted<T>(value: T, weight: f64) -> Weighted<T> {
    Weighted { value, weight }
}

fn labels(entries: &[(&str, f64)]) -> Vec<Weighted<String>> {
    entries
        .iter()
        .map(|(label, weight)| weighted(label.to_string(), *weight))
        .collect()
}

fn numbers(entries: &[(u32, f64)]) -> Vec<Weighted<u32>> {
    entries
        .iter()
        .map(|(value, weight)| weighted(*value, *weight))
        .collect()
}

/// Inclusive continuous range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

pub const fn value_range(min: f64, max: f64) -> ValueRange {
    ValueRange { min, max }
}

/// Inclusive integer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

pub const fn count_range(min: u32, max: u32) -> CountRange {
    CountRange { min, max }
}

/// Rate looked up by formulary type with a fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RateTable {
    pub default: f64,
    #[serde(default)]
    pub by_type: BTreeMap<String, f64>,
}

impl RateTable {
    pub fn rate_for(&self, formulary_type: &str) -> f64 {
        self.by_type
            .get(formulary_type)
            .copied()
            .unwrap_or(self.default)
    }
}

// ---------------------------------------------------------------------------
// drugs

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct DrugPolicy {
    pub record_target: u64,
    pub progress_every: u64,
    pub specialty_rate: f64,
    pub generic_rate: f64,
    /// Share of drugs in controllable classes that carry a DEA schedule.
    pub controlled_rate: f64,
    pub active_rate: f64,
    pub dosage_forms: Vec<Weighted<String>>,
    pub routes: Vec<Weighted<String>>,
    pub dea_schedules: Vec<Weighted<String>>,
    pub generic_price: PriceBand,
    pub brand_price: PriceBand,
    pub specialty_price: PriceBand,
}

/// Unit price policy for one drug family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PriceBand {
    pub awp: ValueRange,
    pub wac_ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_ratio: Option<f64>,
}

impl Default for DrugPolicy {
    fn default() -> Self {
        Self {
            record_target: 20_000,
            progress_every: 5_000,
            specialty_rate: 0.02,
            generic_rate: 0.75,
            controlled_rate: 0.15,
            active_rate: 0.98,
            dosage_forms: labels(&[
                ("TABLET", 0.40),
                ("CAPSULE", 0.25),
                ("SOLUTION", 0.10),
                ("INJECTION", 0.08),
                ("CREAM", 0.05),
                ("OINTMENT", 0.04),
                ("SUSPENSION", 0.03),
                ("PATCH", 0.02),
                ("INHALER", 0.02),
                ("SUPPOSITORY", 0.01),
            ]),
            routes: labels(&[
                ("ORAL", 0.70),
                ("TOPICAL", 0.10),
                ("INJECTION", 0.08),
                ("INHALATION", 0.05),
                ("OPHTHALMIC", 0.03),
                ("OTIC", 0.02),
                ("RECTAL", 0.01),
                ("TRANSDERMAL", 0.01),
            ]),
            dea_schedules: labels(&[("II", 0.30), ("III", 0.25), ("IV", 0.35), ("V", 0.10)]),
            generic_price: PriceBand {
                awp: value_range(0.10, 50.00),
                wac_ratio: 0.85,
                mac_ratio: Some(0.70),
            },
            brand_price: PriceBand {
                awp: value_range(10.00, 500.00),
                wac_ratio: 0.82,
                mac_ratio: None,
            },
            specialty_price: PriceBand {
                awp: value_range(1_000.00, 10_000.00),
                wac_ratio: 0.80,
                mac_ratio: None,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// members

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct MemberPolicy {
    pub record_target: u64,
    pub progress_every: u64,
    pub genders: Vec<Weighted<String>>,
    pub age_brackets: Vec<AgeBracket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AgeBracket {
    pub min_age: u32,
    pub max_age: u32,
    pub weight: f64,
}

impl Default for MemberPolicy {
    fn default() -> Self {
        let brackets = [
            (0, 4, 6.0),
            (5, 14, 6.5),
            (15, 24, 13.0),
            (25, 34, 13.0),
            (35, 44, 13.0),
            (45, 54, 13.0),
            (55, 64, 13.0),
            (65, 74, 13.0),
            (75, 95, 9.5),
        ];
        Self {
            record_target: 1_000_000,
            progress_every: 10_000,
            genders: labels(&[("F", 50.5), ("M", 49.3), ("U", 0.2)]),
            age_brackets: brackets
                .iter()
                .map(|(min_age, max_age, weight)| AgeBracket {
                    min_age: *min_age,
                    max_age: *max_age,
                    weight: *weight,
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// pharmacies

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct PharmacyPolicy {
    pub record_target: u64,
    pub progress_every: u64,
    pub active_rate: f64,
    /// Chance a street address carries a suite number.
    pub suite_rate: f64,
    /// Chance a pharmacy in a state with known metros lands in one of them.
    pub major_city_rate: f64,
    pub pharmacy_types: Vec<Weighted<String>>,
    /// Chains weighted by their real store counts; store numbers wrap at that count.
    pub chains: Vec<Weighted<String>>,
}

impl Default for PharmacyPolicy {
    fn default() -> Self {
        Self {
            record_target: 50_000,
            progress_every: 5_000,
            active_rate: 0.95,
            suite_rate: 0.20,
            major_city_rate: 0.60,
            pharmacy_types: labels(&[
                ("RETAIL", 0.70),
                ("MAIL_ORDER", 0.05),
                ("SPECIALTY", 0.10),
                ("LONG_TERM_CARE", 0.15),
            ]),
            chains: labels(&[
                ("CVS", 9_600.0),
                ("WALGREENS", 8_900.0),
                ("WALMART", 4_700.0),
                ("RITE AID", 2_400.0),
                ("KROGER", 2_200.0),
                ("ALBERTSONS", 1_700.0),
                ("PUBLIX", 1_200.0),
                ("COSTCO", 600.0),
                ("SAM'S CLUB", 600.0),
                ("TARGET", 1_800.0),
                ("INDEPENDENT", 20_000.0),
                ("REGIONAL CHAIN", 6_300.0),
            ]),
        }
    }
}

// ---------------------------------------------------------------------------
// formularies

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct FormularyPolicy {
    pub record_target: u64,
    pub progress_every: u64,
    pub active_rate: f64,
    pub plan_year: i32,
    pub segments: Vec<SegmentQuota>,
    pub formulary_types: Vec<Weighted<String>>,
    pub tier_structures: Vec<Weighted<u32>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SegmentQuota {
    pub segment: String,
    pub count: u64,
}

impl Default for FormularyPolicy {
    fn default() -> Self {
        let segments = [
            ("MEDICARE_PART_D", 800),
            ("MEDICARE_ADVANTAGE", 3_000),
            ("COMMERCIAL", 500),
            ("MEDICAID", 100),
            ("FEDERAL", 20),
            ("REGIONAL", 580),
        ];
        Self {
            record_target: 5_000,
            progress_every: 1_000,
            active_rate: 0.95,
            plan_year: 2024,
            segments: segments
                .iter()
                .map(|(segment, count)| SegmentQuota {
                    segment: segment.to_string(),
                    count: *count,
                })
                .collect(),
            formulary_types: labels(&[
                ("STANDARD", 0.40),
                ("ENHANCED", 0.25),
                ("BASIC", 0.20),
                ("SPECIALTY", 0.10),
                ("MAIL_ORDER", 0.05),
            ]),
            tier_structures: numbers(&[(3, 0.15), (4, 0.35), (5, 0.40), (6, 0.10)]),
        }
    }
}

// ---------------------------------------------------------------------------
// formulary drugs

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct FormularyDrugPolicy {
    /// Upper bound on relationship rows for the whole run.
    pub record_target: u64,
    /// Progress is reported every this many formularies.
    pub progress_every: u64,
    pub protected_rate: f64,
    /// Market segments where the protected-class floor applies.
    pub protected_segments: Vec<String>,
    /// Drug classes treated as protected.
    pub protected_classes: Vec<String>,
    /// Chance a tier-3 entry is marked non-preferred.
    pub non_preferred_rate: f64,
    pub generic_inclusion: RateTable,
    pub specialty_inclusion: RateTable,
    pub default_target: CountRange,
    /// Children-per-parent target range keyed by formulary type.
    pub targets: BTreeMap<String, CountRange>,
    pub tiers: TierPolicy,
    pub utilization: UtilizationPolicy,
}

/// Split of a drug family between two tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TierSplit {
    pub lower: u8,
    pub upper: u8,
    /// Probability of landing on `lower`.
    pub lower_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct TierPolicy {
    pub generic_tier1_rate: f64,
    /// Tier for unclassified drugs and generics that miss tier 1.
    pub default_tier: u8,
    pub brand: TierSplit,
    pub specialty: TierSplit,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            generic_tier1_rate: 0.95,
            default_tier: 2,
            brand: TierSplit {
                lower: 2,
                upper: 3,
                lower_rate: 0.60,
            },
            specialty: TierSplit {
                lower: 4,
                upper: 5,
                lower_rate: 0.70,
            },
        }
    }
}

/// Gate probabilities for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TierGateRates {
    pub tier: u8,
    pub prior_auth: f64,
    pub step_therapy: f64,
    pub quantity_limit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct UtilizationPolicy {
    /// Row used for tiers missing from `tiers`.
    pub fallback_tier: u8,
    pub default_quantity_limits: Vec<u32>,
    pub days_supply_limits: Vec<u32>,
    pub tiers: Vec<TierGateRates>,
    /// Quantity limit choices keyed by dosage form.
    pub quantity_limits: BTreeMap<String, Vec<u32>>,
}

impl UtilizationPolicy {
    pub fn rates_for(&self, tier: u8) -> Option<&TierGateRates> {
        self.tiers
            .iter()
            .find(|rates| rates.tier == tier)
            .or_else(|| self.tiers.iter().find(|rates| rates.tier == self.fallback_tier))
    }

    pub fn quantity_choices(&self, dosage_form: &str) -> &[u32] {
        self.quantity_limits
            .get(dosage_form)
            .map(Vec::as_slice)
            .unwrap_or(&self.default_quantity_limits)
    }
}

impl Default for UtilizationPolicy {
    fn default() -> Self {
        let gates = [
            (1, 0.02, 0.01, 0.05),
            (2, 0.10, 0.08, 0.15),
            (3, 0.25, 0.20, 0.30),
            (4, 0.60, 0.20, 0.50),
            (5, 0.90, 0.25, 0.70),
        ];
        let limits: [(&str, &[u32]); 10] = [
            ("TABLET", &[30, 60, 90]),
            ("CAPSULE", &[30, 60, 90]),
            ("SOLUTION", &[30, 60]),
            ("INJECTION", &[30, 90]),
            ("CREAM", &[30, 60]),
            ("OINTMENT", &[30, 60]),
            ("SUSPENSION", &[30]),
            ("PATCH", &[30]),
            ("INHALER", &[30, 90]),
            ("SUPPOSITORY", &[30]),
        ];
        Self {
            fallback_tier: 3,
            default_quantity_limits: vec![30],
            days_supply_limits: vec![30, 60, 90],
            tiers: gates
                .iter()
                .map(|(tier, prior_auth, step_therapy, quantity_limit)| TierGateRates {
                    tier: *tier,
                    prior_auth: *prior_auth,
                    step_therapy: *step_therapy,
                    quantity_limit: *quantity_limit,
                })
                .collect(),
            quantity_limits: limits
                .iter()
                .map(|(form, values)| (form.to_string(), values.to_vec()))
                .collect(),
        }
    }
}

impl Default for FormularyDrugPolicy {
    fn default() -> Self {
        let targets = [
            ("SPECIALTY", count_range(500, 1_500)),
            ("BASIC", count_range(1_500, 2_000)),
            ("STANDARD", count_range(1_800, 2_200)),
            ("ENHANCED", count_range(2_000, 2_500)),
            ("MAIL_ORDER", count_range(1_800, 2_200)),
        ];
        Self {
            record_target: 10_000_000,
            progress_every: 500,
            protected_rate: 0.92,
            protected_segments: vec![
                "MEDICARE_PART_D".to_string(),
                "MEDICARE_ADVANTAGE".to_string(),
            ],
            protected_classes: [
                "ANTICONVULSANT",
                "ANTIDEPRESSANT",
                "CHEMOTHERAPY",
                "TARGETED_THERAPY",
                "IMMUNOTHERAPY",
                "ANTIPSYCHOTIC",
                "IMMUNOSUPPRESSANT",
                "BIOLOGIC",
            ]
            .iter()
            .map(|class| class.to_string())
            .collect(),
            non_preferred_rate: 0.60,
            generic_inclusion: RateTable {
                default: 0.70,
                by_type: [("ENHANCED", 0.85), ("STANDARD", 0.85)]
                    .iter()
                    .map(|(kind, rate)| (kind.to_string(), *rate))
                    .collect(),
            },
            specialty_inclusion: RateTable {
                default: 0.20,
                by_type: [("SPECIALTY", 0.80), ("ENHANCED", 0.60), ("STANDARD", 0.40)]
                    .iter()
                    .map(|(kind, rate)| (kind.to_string(), *rate))
                    .collect(),
            },
            default_target: count_range(2_000, 3_000),
            targets: targets
                .iter()
                .map(|(kind, range)| (kind.to_string(), *range))
                .collect(),
            tiers: TierPolicy::default(),
            utilization: UtilizationPolicy::default(),
        }
    }
}

impl FormularyDrugPolicy {
    pub fn target_for(&self, formulary_type: &str) -> CountRange {
        self.targets
            .get(formulary_type)
            .copied()
            .unwrap_or(self.default_target)
    }
}

// ---------------------------------------------------------------------------
// pricing shared by claims and claim lines

/// Copay range for a tier; tiers without a band pay coinsurance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CopayBand {
    pub tier: u8,
    pub min: f64,
    pub max: f64,
}

fn default_copays() -> Vec<CopayBand> {
    vec![
        CopayBand {
            tier: 1,
            min: 5.00,
            max: 15.00,
        },
        CopayBand {
            tier: 2,
            min: 15.00,
            max: 35.00,
        },
        CopayBand {
            tier: 3,
            min: 35.00,
            max: 70.00,
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct LinePricingPolicy {
    /// Allowed amount as a fraction of billed.
    pub allowed_ratio: ValueRange,
    pub coinsurance_rate: f64,
    pub deductible_rate: f64,
    pub deductible: ValueRange,
    /// Share of lines carrying sales tax.
    pub sales_tax_applied_rate: f64,
    pub sales_tax_rate: f64,
    pub copays: Vec<CopayBand>,
}

impl Default for LinePricingPolicy {
    fn default() -> Self {
        Self {
            allowed_ratio: value_range(0.80, 0.95),
            coinsurance_rate: 0.30,
            deductible_rate: 0.10,
            deductible: value_range(10.00, 50.00),
            sales_tax_applied_rate: 0.05,
            sales_tax_rate: 0.06,
            copays: default_copays(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ClaimPricingPolicy {
    pub unit_cost: ValueRange,
    pub dispensing_fee: ValueRange,
    pub coinsurance_rate: f64,
    /// Highest tier drawn uniformly for claim-level cost share.
    pub tier_count: u8,
    pub copays: Vec<CopayBand>,
}

impl Default for ClaimPricingPolicy {
    fn default() -> Self {
        Self {
            unit_cost: value_range(0.50, 150.00),
            dispensing_fee: value_range(1.50, 3.50),
            coinsurance_rate: 0.30,
            tier_count: 5,
            copays: default_copays(),
        }
    }
}

// ---------------------------------------------------------------------------
// plan rules

/// Kind of rule a plan applies at adjudication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanRuleType {
    Coverage,
    PriorAuth,
    QuantityLimit,
    CostShare,
    ClinicalEdit,
    RefillRestriction,
    NetworkRestriction,
    StepTherapy,
}

impl PlanRuleType {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanRuleType::Coverage => "COVERAGE",
            PlanRuleType::PriorAuth => "PRIOR_AUTH",
            PlanRuleType::QuantityLimit => "QUANTITY_LIMIT",
            PlanRuleType::CostShare => "COST_SHARE",
            PlanRuleType::ClinicalEdit => "CLINICAL_EDIT",
            PlanRuleType::RefillRestriction => "REFILL_RESTRICTION",
            PlanRuleType::NetworkRestriction => "NETWORK_RESTRICTION",
            PlanRuleType::StepTherapy => "STEP_THERAPY",
        }
    }
}

/// Priority band; a band is drawn by weight, then a priority uniformly inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PriorityBand {
    pub label: String,
    pub min: i64,
    pub max: i64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct PlanRulePolicy {
    pub record_target: u64,
    pub progress_every: u64,
    /// Plans receive ids `1..=plan_count`.
    pub plan_count: u32,
    pub rules_per_plan: CountRange,
    pub rule_types: Vec<Weighted<PlanRuleType>>,
    pub priorities: Vec<PriorityBand>,
    pub active_rate: f64,
    /// How far back `created_at` may fall before the reference date.
    pub created_lookback_days: u32,
}

impl Default for PlanRulePolicy {
    fn default() -> Self {
        let bands = [("HIGH", 50, 100, 10.0), ("NORMAL", 0, 49, 80.0), ("LOW", -100, -1, 10.0)];
        Self {
            record_target: 25_000,
            progress_every: 5_000,
            plan_count: 30,
            rules_per_plan: count_range(667, 1_000),
            rule_types: vec![
                weighted(PlanRuleType::Coverage, 30.0),
                weighted(PlanRuleType::PriorAuth, 20.0),
                weighted(PlanRuleType::QuantityLimit, 15.0),
                weighted(PlanRuleType::CostShare, 15.0),
                weighted(PlanRuleType::ClinicalEdit, 10.0),
                weighted(PlanRuleType::RefillRestriction, 5.0),
                weighted(PlanRuleType::NetworkRestriction, 3.0),
                weighted(PlanRuleType::StepTherapy, 2.0),
            ],
            priorities: bands
                .iter()
                .map(|(label, min, max, weight)| PriorityBand {
                    label: label.to_string(),
                    min: *min,
                    max: *max,
                    weight: *weight,
                })
                .collect(),
            active_rate: 0.95,
            created_lookback_days: 365,
        }
    }
}

// ---------------------------------------------------------------------------
// enrollments

/// Shape of a member's enrollment history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentScenario {
    /// One active plan for the coverage year.
    Single,
    /// Two concurrent active plans sharing group and relationship.
    Dual,
    /// A terminated prior plan followed by an active one mid-year.
    Transition,
    /// One terminated plan covering the previous year.
    Historical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct EnrollmentPolicy {
    pub record_target: u64,
    pub progress_every: u64,
    /// Year active enrollments take effect; historical ones cover the year before.
    pub coverage_year: i32,
    pub scenarios: Vec<Weighted<EnrollmentScenario>>,
    pub relationships: Vec<Weighted<String>>,
    pub group_prefixes: Vec<String>,
    pub group_numbers: CountRange,
    /// Months in which a transition's new plan may start.
    pub transition_months: CountRange,
    /// Plan code prefixes eligible as the primary of a dual enrollment.
    pub dual_primary_prefixes: Vec<String>,
}

impl Default for EnrollmentPolicy {
    fn default() -> Self {
        Self {
            record_target: 2_000_000,
            progress_every: 50_000,
            coverage_year: 2024,
            scenarios: vec![
                weighted(EnrollmentScenario::Single, 0.70),
                weighted(EnrollmentScenario::Dual, 0.15),
                weighted(EnrollmentScenario::Transition, 0.10),
                weighted(EnrollmentScenario::Historical, 0.05),
            ],
            relationships: labels(&[("SELF", 0.60), ("SPOUSE", 0.25), ("DEPENDENT", 0.15)]),
            group_prefixes: ["GRP", "EMP", "UNI", "GOV", "IND"]
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
            group_numbers: count_range(10_000, 99_999),
            transition_months: count_range(2, 11),
            dual_primary_prefixes: vec!["MCARE".to_string(), "COMM".to_string()],
        }
    }
}

// ---------------------------------------------------------------------------
// pharmacy networks

/// A network pharmacies may contract with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NetworkDefinition {
    pub name: String,
    pub network_type: String,
    pub tier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct PharmacyNetworkPolicy {
    pub record_target: u64,
    pub progress_every: u64,
    pub networks: Vec<NetworkDefinition>,
    /// Distinct networks joined by each pharmacy.
    pub networks_per_pharmacy: CountRange,
    pub statuses: Vec<Weighted<String>>,
    pub contract_types: Vec<Weighted<String>>,
    /// How far back `effective_date` may fall before the reference date.
    pub effective_lookback_days: u32,
    /// Chance an active contract carries a scheduled termination.
    pub active_termination_rate: f64,
    pub active_term_days: CountRange,
    pub inactive_term_days: CountRange,
    /// Discounts off AWP rendered as `AWP-<n>%`.
    pub awp_discounts: Vec<u32>,
    pub dispensing_fee: ValueRange,
}

impl Default for PharmacyNetworkPolicy {
    fn default() -> Self {
        let networks = [
            ("CVS Caremark Network", "PBM", "Preferred"),
            ("CVS Caremark Standard Network", "PBM", "Standard"),
            ("Express Scripts Network", "PBM", "Preferred"),
            ("Express Scripts Standard Network", "PBM", "Standard"),
            ("OptumRx Network", "PBM", "Preferred"),
            ("OptumRx Standard Network", "PBM", "Standard"),
            ("Humana Pharmacy Network", "PBM", "Preferred"),
            ("Prime Therapeutics Network", "PBM", "Preferred"),
            ("Walgreens Retail Network", "Retail", "Preferred"),
            ("CVS Retail Network", "Retail", "Preferred"),
            ("Walmart Pharmacy Network", "Retail", "Standard"),
            ("Kroger Pharmacy Network", "Retail", "Standard"),
            ("Rite Aid Network", "Retail", "Standard"),
            ("Accredo Specialty Network", "Specialty", "Preferred"),
            ("CVS Specialty Network", "Specialty", "Preferred"),
            ("Walgreens Specialty Network", "Specialty", "Preferred"),
            ("BriovaRx Specialty Network", "Specialty", "Standard"),
            ("Express Scripts Mail Order", "Mail-Order", "Preferred"),
            ("CVS Caremark Mail Order", "Mail-Order", "Preferred"),
            ("OptumRx Mail Order", "Mail-Order", "Preferred"),
            ("Northeast Regional Network", "Regional", "Standard"),
            ("Southeast Regional Network", "Regional", "Standard"),
            ("Midwest Regional Network", "Regional", "Standard"),
            ("Southwest Regional Network", "Regional", "Standard"),
            ("West Coast Regional Network", "Regional", "Standard"),
            ("Independent Pharmacy Network", "Independent", "Standard"),
            ("Community Pharmacy Network", "Independent", "Standard"),
            ("Health Mart Network", "Independent", "Standard"),
        ];
        Self {
            record_target: 500_000,
            progress_every: 50_000,
            networks: networks
                .iter()
                .map(|(name, network_type, tier)| NetworkDefinition {
                    name: name.to_string(),
                    network_type: network_type.to_string(),
                    tier: tier.to_string(),
                })
                .collect(),
            networks_per_pharmacy: count_range(3, 8),
            statuses: labels(&[("Active", 4.0), ("Inactive", 1.0), ("Pending", 1.0)]),
            contract_types: labels(&[
                ("Direct", 1.0),
                ("Indirect", 1.0),
                ("PSAO", 1.0),
                ("Aggregator", 1.0),
            ]),
            effective_lookback_days: 1_825,
            active_termination_rate: 0.10,
            active_term_days: count_range(30, 730),
            inactive_term_days: count_range(180, 1_095),
            awp_discounts: vec![12, 13, 14, 15, 16, 17, 18, 19, 20, 22, 24],
            dispensing_fee: value_range(0.50, 3.50),
        }
    }
}

// ---------------------------------------------------------------------------
// claims

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DaysSupplyOption {
    pub days: u32,
    pub weight: f64,
    pub min_quantity: u32,
    pub max_quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ClaimPolicy {
    pub record_target: u64,
    pub progress_every: u64,
    /// Hours used for claims left over after the hourly split.
    pub peak_hours: CountRange,
    /// Relative claim volume for each hour of the service day.
    pub hourly_weights: Vec<f64>,
    pub transaction_types: Vec<Weighted<String>>,
    pub person_codes: Vec<Weighted<String>>,
    pub refill_numbers: Vec<Weighted<u32>>,
    pub daw_codes: Vec<Weighted<u32>>,
    pub days_supply: Vec<DaysSupplyOption>,
    pub pricing: ClaimPricingPolicy,
}

impl Default for ClaimPolicy {
    fn default() -> Self {
        let mut refills = vec![weighted(0, 40.0)];
        refills.extend((1..12).map(|refill| weighted(refill, 5.0)));
        let supply = [
            (30, 60.0, 30, 90),
            (90, 20.0, 90, 270),
            (60, 15.0, 60, 180),
            (7, 3.0, 7, 14),
            (14, 2.0, 14, 28),
        ];
        Self {
            record_target: 1_000_000,
            progress_every: 50_000,
            peak_hours: count_range(8, 17),
            hourly_weights: vec![
                0.02, 0.01, 0.01, 0.01, 0.02, 0.03, 0.05, 0.07, 0.09, 0.10, 0.09, 0.08, 0.07,
                0.06, 0.06, 0.07, 0.08, 0.07, 0.03, 0.02, 0.02, 0.01, 0.01, 0.01,
            ],
            transaction_types: labels(&[("B1", 95.0), ("B2", 3.0), ("B3", 2.0)]),
            person_codes: labels(&[("01", 60.0), ("02", 25.0), ("03", 10.0), ("04", 5.0)]),
            refill_numbers: refills,
            daw_codes: default_daw_codes(),
            days_supply: supply
                .iter()
                .map(|(days, weight, min_quantity, max_quantity)| DaysSupplyOption {
                    days: *days,
                    weight: *weight,
                    min_quantity: *min_quantity,
                    max_quantity: *max_quantity,
                })
                .collect(),
            pricing: ClaimPricingPolicy::default(),
        }
    }
}

fn default_daw_codes() -> Vec<Weighted<u32>> {
    numbers(&[
        (0, 70.0),
        (1, 10.0),
        (2, 5.0),
        (3, 5.0),
        (4, 3.0),
        (5, 2.0),
        (6, 2.0),
        (7, 1.0),
        (8, 1.0),
        (9, 1.0),
    ])
}

// ---------------------------------------------------------------------------
// claim lines

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ClaimLinePolicy {
    /// Upper bound on line rows for the whole run.
    pub record_target: u64,
    /// Progress is reported every this many claims.
    pub progress_every: u64,
    /// Chance the rendering provider equals the prescriber.
    pub rendering_matches_prescriber_rate: f64,
    pub prior_auth_number_rate: f64,
    pub lines_per_claim: Vec<Weighted<u32>>,
    /// Formulary tiers; tier 1 is the lowest.
    pub tiers: Vec<Weighted<u8>>,
    pub statuses: Vec<Weighted<String>>,
    pub formulary_statuses: Vec<Weighted<String>>,
    pub daw_codes: Vec<Weighted<u32>>,
    /// Days supply choices for lines beyond the first.
    pub additional_days_supply: Vec<u32>,
    pub additional_ingredient_cost: ValueRange,
    pub additional_dispensing_fee: ValueRange,
    pub pricing: LinePricingPolicy,
}

impl Default for ClaimLinePolicy {
    fn default() -> Self {
        Self {
            record_target: 10_000_000,
            progress_every: 50_000,
            rendering_matches_prescriber_rate: 0.90,
            prior_auth_number_rate: 0.05,
            lines_per_claim: numbers(&[(1, 85.0), (2, 12.0), (3, 2.0), (4, 0.5), (5, 0.5)]),
            tiers: [(1, 60.0), (2, 25.0), (3, 10.0), (4, 4.0), (5, 1.0)]
                .iter()
                .map(|(tier, weight)| weighted(*tier, *weight))
                .collect(),
            statuses: labels(&[
                ("APPROVED", 87.0),
                ("DENIED", 10.0),
                ("PENDING", 2.0),
                ("ADJUSTED", 1.0),
            ]),
            formulary_statuses: labels(&[
                ("COVERED", 85.0),
                ("NON_COVERED", 10.0),
                ("RESTRICTED", 5.0),
            ]),
            daw_codes: default_daw_codes(),
            additional_days_supply: vec![7, 14, 30, 60, 90],
            additional_ingredient_cost: value_range(10.00, 200.00),
            additional_dispensing_fee: value_range(1.50, 3.50),
            pricing: LinePricingPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// drug interactions

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct InteractionPolicy {
    pub record_target: u64,
    pub progress_every: u64,
    /// Chance an already-seen drug pair is emitted again.
    pub duplicate_acceptance_rate: f64,
    /// How far back `last_updated_date` may fall before the reference date.
    pub update_lookback_days: u32,
    /// Maximum gap between review and update.
    pub review_lag_days: u32,
    pub severities: Vec<Weighted<String>>,
    pub evidence_levels: Vec<Weighted<String>>,
}

impl Default for InteractionPolicy {
    fn default() -> Self {
        Self {
            record_target: 20_000,
            progress_every: 5_000,
            duplicate_acceptance_rate: 0.10,
            update_lookback_days: 730,
            review_lag_days: 180,
            severities: labels(&[
                ("Contraindicated", 0.05),
                ("Major", 0.20),
                ("Moderate", 0.45),
                ("Minor", 0.30),
            ]),
            evidence_levels: labels(&[
                ("Established", 0.30),
                ("Probable", 0.35),
                ("Theoretical", 0.25),
                ("Case Reports", 0.10),
            ]),
        }
    }
}
