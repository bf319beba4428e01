use std::collections::BTreeSet;

use jsonschema::JSONSchema;
use serde_json::Value;

use crate::errors::{PlanError, ValidationIssue, ValidationReport};
use crate::model::{
    ClaimLinePolicy, ClaimPolicy, CopayBand, CountRange, DrugPolicy, EnrollmentPolicy,
    FormularyDrugPolicy, FormularyPolicy, InteractionPolicy, MemberPolicy, PharmacyNetworkPolicy,
    PharmacyPolicy, PlanRulePolicy, RateTable, RunConfig, TierSplit, UtilizationPolicy,
    ValueRange, Weighted,
};
use crate::schema::config_json_schema;

/// Validated configuration with accumulated warnings.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub config: RunConfig,
    pub warnings: Vec<ValidationIssue>,
}

/// Validate a configuration document against the configuration JSON Schema.
pub fn validate_config_json(
    config_json: &Value,
    config_schema: &Value,
) -> Result<ValidationReport, PlanError> {
    let compiled =
        JSONSchema::compile(config_schema).map_err(|err| PlanError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();

    if let Err(errors) = compiled.validate(config_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push(ValidationIssue::error("schema_violation", path, error.to_string()));
        }
    }

    Ok(report)
}

/// Validate the configuration end-to-end, returning structured issues on failure.
pub fn validate_config(config_json: &Value) -> Result<ValidatedConfig, ValidationReport> {
    let schema = serde_json::to_value(config_json_schema()).map_err(|err| {
        single_error("schema_validation_error", "/", err.to_string())
    })?;

    let structural = validate_config_json(config_json, &schema)
        .map_err(|err| single_error("schema_validation_error", "/", err.to_string()))?;
    if !structural.is_ok() {
        return Err(structural);
    }

    let config: RunConfig = serde_json::from_value(config_json.clone())
        .map_err(|err| single_error("invalid_config_json", "/", err.to_string()))?;

    let semantic = validate_semantics(&config);
    if !semantic.is_ok() {
        return Err(semantic);
    }

    Ok(ValidatedConfig {
        config,
        warnings: semantic.warnings,
    })
}

/// Check rates, ranges, distributions and tier tables.
pub fn validate_semantics(config: &RunConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.reference_date().is_err() {
        report.push(
            ValidationIssue::error(
                "invalid_reference_date",
                "/run/reference_date",
                format!("'{}' is not a calendar date", config.run.reference_date),
            )
            .with_hint("use YYYY-MM-DD"),
        );
    }
    if config.run.shard_budget_bytes == 0 {
        report.push(ValidationIssue::error(
            "zero_shard_budget",
            "/run/shard_budget_bytes",
            "shard budget must be positive",
        ));
    }

    validate_drugs(&config.drugs, &mut report);
    validate_members(&config.members, &mut report);
    validate_pharmacies(&config.pharmacies, &mut report);
    validate_formularies(&config.formularies, &mut report);
    validate_formulary_drugs(&config.formulary_drugs, &mut report);
    validate_plan_rules(&config.plan_rules, &mut report);
    validate_enrollments(&config.enrollments, &mut report);
    validate_pharmacy_networks(&config.pharmacy_networks, &mut report);
    validate_claims(&config.claims, &mut report);
    validate_claim_lines(&config.claim_lines, &mut report);
    validate_interactions(&config.drug_interactions, &mut report);

    report
}

fn validate_drugs(policy: &DrugPolicy, report: &mut ValidationReport) {
    check_progress(policy.progress_every, "/drugs", report);
    check_rate(policy.specialty_rate, "/drugs/specialty_rate", report);
    check_rate(policy.generic_rate, "/drugs/generic_rate", report);
    check_rate(policy.controlled_rate, "/drugs/controlled_rate", report);
    check_rate(policy.active_rate, "/drugs/active_rate", report);
    if policy.specialty_rate + policy.generic_rate > 1.0 {
        report.push(ValidationIssue::error(
            "rate_out_of_range",
            "/drugs/generic_rate",
            "specialty_rate + generic_rate must not exceed 1",
        ));
    }
    check_weights(&policy.dosage_forms, "/drugs/dosage_forms", report);
    check_weights(&policy.routes, "/drugs/routes", report);
    check_weights(&policy.dea_schedules, "/drugs/dea_schedules", report);
    for (name, band) in [
        ("generic_price", &policy.generic_price),
        ("brand_price", &policy.brand_price),
        ("specialty_price", &policy.specialty_price),
    ] {
        let path = format!("/drugs/{name}");
        check_value_range(band.awp, &format!("{path}/awp"), report);
        check_rate(band.wac_ratio, &format!("{path}/wac_ratio"), report);
        if let Some(mac_ratio) = band.mac_ratio {
            check_rate(mac_ratio, &format!("{path}/mac_ratio"), report);
        }
    }
}

fn validate_members(policy: &MemberPolicy, report: &mut ValidationReport) {
    check_progress(policy.progress_every, "/members", report);
    check_weights(&policy.genders, "/members/genders", report);
    if policy.age_brackets.is_empty() || policy.age_brackets.iter().all(|b| b.weight <= 0.0) {
        report.push(ValidationIssue::error(
            "invalid_distribution",
            "/members/age_brackets",
            "at least one age bracket needs a positive weight",
        ));
    }
    for (idx, bracket) in policy.age_brackets.iter().enumerate() {
        let path = format!("/members/age_brackets/{idx}");
        check_count_range(
            CountRange {
                min: bracket.min_age,
                max: bracket.max_age,
            },
            &path,
            report,
        );
        check_weight(bracket.weight, &format!("{path}/weight"), report);
    }
}

fn validate_pharmacies(policy: &PharmacyPolicy, report: &mut ValidationReport) {
    check_progress(policy.progress_every, "/pharmacies", report);
    check_rate(policy.active_rate, "/pharmacies/active_rate", report);
    check_rate(policy.suite_rate, "/pharmacies/suite_rate", report);
    check_rate(policy.major_city_rate, "/pharmacies/major_city_rate", report);
    check_weights(&policy.pharmacy_types, "/pharmacies/pharmacy_types", report);
    check_weights(&policy.chains, "/pharmacies/chains", report);
    // ncpdp ids are seven digits
    if policy.record_target > 9_000_000 {
        report.push(ValidationIssue::error(
            "target_exceeds_key_space",
            "/pharmacies/record_target",
            "at most 9,000,000 unique seven-digit NCPDP ids exist",
        ));
    }
}

fn validate_formularies(policy: &FormularyPolicy, report: &mut ValidationReport) {
    check_progress(policy.progress_every, "/formularies", report);
    check_rate(policy.active_rate, "/formularies/active_rate", report);
    check_weights(&policy.formulary_types, "/formularies/formulary_types", report);
    check_weights(&policy.tier_structures, "/formularies/tier_structures", report);
    for (idx, tiers) in policy.tier_structures.iter().enumerate() {
        if tiers.value == 0 {
            report.push(ValidationIssue::error(
                "invalid_tier_count",
                format!("/formularies/tier_structures/{idx}/value"),
                "a formulary needs at least one tier",
            ));
        }
    }
    let quota: u64 = policy.segments.iter().map(|segment| segment.count).sum();
    if quota == 0 {
        report.push(ValidationIssue::error(
            "empty_segments",
            "/formularies/segments",
            "segment quotas sum to zero",
        ));
    } else if quota < policy.record_target {
        report.push(ValidationIssue::warning(
            "target_unreachable",
            "/formularies/record_target",
            format!(
                "segment quotas total {quota}, below record_target {}",
                policy.record_target
            ),
        ));
    }
}

fn validate_formulary_drugs(policy: &FormularyDrugPolicy, report: &mut ValidationReport) {
    check_progress(policy.progress_every, "/formulary_drugs", report);
    check_rate(policy.protected_rate, "/formulary_drugs/protected_rate", report);
    check_rate(
        policy.non_preferred_rate,
        "/formulary_drugs/non_preferred_rate",
        report,
    );
    check_rate_table(
        &policy.generic_inclusion,
        "/formulary_drugs/generic_inclusion",
        report,
    );
    check_rate_table(
        &policy.specialty_inclusion,
        "/formulary_drugs/specialty_inclusion",
        report,
    );
    if policy.protected_classes.is_empty() {
        report.push(
            ValidationIssue::warning(
                "empty_protected_classes",
                "/formulary_drugs/protected_classes",
                "no drug class is protected; the coverage floor selects nothing",
            )
            .with_hint("list classes such as ANTIDEPRESSANT or CHEMOTHERAPY"),
        );
    }
    check_count_range(
        policy.default_target,
        "/formulary_drugs/default_target",
        report,
    );
    for (kind, range) in &policy.targets {
        check_count_range(*range, &format!("/formulary_drugs/targets/{kind}"), report);
    }

    let tiers = &policy.tiers;
    check_rate(
        tiers.generic_tier1_rate,
        "/formulary_drugs/tiers/generic_tier1_rate",
        report,
    );
    if tiers.default_tier == 0 {
        report.push(ValidationIssue::error(
            "invalid_tier_split",
            "/formulary_drugs/tiers/default_tier",
            "tiers start at 1",
        ));
    }
    check_tier_split(tiers.brand, "/formulary_drugs/tiers/brand", report);
    check_tier_split(tiers.specialty, "/formulary_drugs/tiers/specialty", report);

    validate_utilization(&policy.utilization, report);
}

fn validate_utilization(policy: &UtilizationPolicy, report: &mut ValidationReport) {
    let base = "/formulary_drugs/utilization";
    if policy.tiers.is_empty() {
        report.push(ValidationIssue::error(
            "empty_gate_table",
            format!("{base}/tiers"),
            "utilization table has no tiers",
        ));
        return;
    }
    if !policy
        .tiers
        .iter()
        .any(|rates| rates.tier == policy.fallback_tier)
    {
        report.push(ValidationIssue::error(
            "missing_fallback_tier",
            format!("{base}/fallback_tier"),
            format!("fallback tier {} is not in the table", policy.fallback_tier),
        ));
    }

    let mut seen = BTreeSet::new();
    for (idx, rates) in policy.tiers.iter().enumerate() {
        let path = format!("{base}/tiers/{idx}");
        if !seen.insert(rates.tier) {
            report.push(ValidationIssue::error(
                "duplicate_tier",
                format!("{path}/tier"),
                format!("tier {} listed twice", rates.tier),
            ));
        }
        check_rate(rates.prior_auth, &format!("{path}/prior_auth"), report);
        check_rate(rates.step_therapy, &format!("{path}/step_therapy"), report);
        check_rate(rates.quantity_limit, &format!("{path}/quantity_limit"), report);
    }

    let mut ordered = policy.tiers.clone();
    ordered.sort_by_key(|rates| rates.tier);
    for pair in ordered.windows(2) {
        let (low, high) = (&pair[0], &pair[1]);
        let gates = [
            ("prior_auth", low.prior_auth, high.prior_auth),
            ("step_therapy", low.step_therapy, high.step_therapy),
            ("quantity_limit", low.quantity_limit, high.quantity_limit),
        ];
        for (gate, below, above) in gates {
            if above < below {
                report.push(ValidationIssue::warning(
                    "non_monotonic_gate_rate",
                    format!("{base}/tiers"),
                    format!(
                        "{gate} drops from {below} at tier {} to {above} at tier {}",
                        low.tier, high.tier
                    ),
                ));
            }
        }
    }

    if policy.default_quantity_limits.is_empty() {
        report.push(ValidationIssue::error(
            "empty_choices",
            format!("{base}/default_quantity_limits"),
            "no default quantity limit",
        ));
    }
    if policy.days_supply_limits.is_empty() {
        report.push(ValidationIssue::error(
            "empty_choices",
            format!("{base}/days_supply_limits"),
            "no days supply limit",
        ));
    }
    for (form, values) in &policy.quantity_limits {
        if values.is_empty() {
            report.push(ValidationIssue::error(
                "empty_choices",
                format!("{base}/quantity_limits/{form}"),
                format!("no quantity limit listed for {form}"),
            ));
        }
    }
}

fn validate_plan_rules(policy: &PlanRulePolicy, report: &mut ValidationReport) {
    check_progress(policy.progress_every, "/plan_rules", report);
    check_rate(policy.active_rate, "/plan_rules/active_rate", report);
    check_weights(&policy.rule_types, "/plan_rules/rule_types", report);
    check_count_range(policy.rules_per_plan, "/plan_rules/rules_per_plan", report);
    if policy.plan_count == 0 {
        report.push(ValidationIssue::error(
            "empty_plans",
            "/plan_rules/plan_count",
            "rules need at least one plan",
        ));
    }
    if policy.priorities.is_empty() || policy.priorities.iter().all(|band| band.weight <= 0.0) {
        report.push(ValidationIssue::error(
            "invalid_distribution",
            "/plan_rules/priorities",
            "at least one priority band needs a positive weight",
        ));
    }
    for (idx, band) in policy.priorities.iter().enumerate() {
        let path = format!("/plan_rules/priorities/{idx}");
        check_weight(band.weight, &format!("{path}/weight"), report);
        if band.min > band.max {
            report.push(ValidationIssue::error(
                "inverted_range",
                path,
                format!("min {} exceeds max {}", band.min, band.max),
            ));
        }
    }
    let reachable = u64::from(policy.plan_count) * u64::from(policy.rules_per_plan.max);
    if reachable < policy.record_target {
        report.push(ValidationIssue::warning(
            "target_unreachable",
            "/plan_rules/record_target",
            format!(
                "{} plans of at most {} rules stay below record_target {}",
                policy.plan_count, policy.rules_per_plan.max, policy.record_target
            ),
        ));
    }
}

fn validate_enrollments(policy: &EnrollmentPolicy, report: &mut ValidationReport) {
    check_progress(policy.progress_every, "/enrollments", report);
    check_weights(&policy.scenarios, "/enrollments/scenarios", report);
    check_weights(&policy.relationships, "/enrollments/relationships", report);
    if policy.group_prefixes.is_empty() {
        report.push(ValidationIssue::error(
            "empty_choices",
            "/enrollments/group_prefixes",
            "no group number prefixes",
        ));
    }
    check_count_range(policy.group_numbers, "/enrollments/group_numbers", report);
    check_count_range(
        policy.transition_months,
        "/enrollments/transition_months",
        report,
    );
    if policy.transition_months.min == 0 || policy.transition_months.max > 12 {
        report.push(ValidationIssue::error(
            "invalid_month",
            "/enrollments/transition_months",
            "transition months must fall within 1..=12",
        ));
    }
    if policy.dual_primary_prefixes.is_empty() {
        report.push(
            ValidationIssue::warning(
                "no_dual_primary",
                "/enrollments/dual_primary_prefixes",
                "dual enrollments draw their primary plan from every plan code",
            )
            .with_hint("list plan code prefixes such as MCARE or COMM"),
        );
    }
}

fn validate_pharmacy_networks(policy: &PharmacyNetworkPolicy, report: &mut ValidationReport) {
    check_progress(policy.progress_every, "/pharmacy_networks", report);
    if policy.networks.is_empty() {
        report.push(ValidationIssue::error(
            "empty_choices",
            "/pharmacy_networks/networks",
            "no networks to contract with",
        ));
    }
    check_count_range(
        policy.networks_per_pharmacy,
        "/pharmacy_networks/networks_per_pharmacy",
        report,
    );
    if policy.networks_per_pharmacy.max as usize > policy.networks.len() {
        report.push(ValidationIssue::error(
            "target_exceeds_key_space",
            "/pharmacy_networks/networks_per_pharmacy/max",
            format!(
                "a pharmacy cannot join {} distinct networks out of {}",
                policy.networks_per_pharmacy.max,
                policy.networks.len()
            ),
        ));
    }
    check_weights(&policy.statuses, "/pharmacy_networks/statuses", report);
    check_weights(
        &policy.contract_types,
        "/pharmacy_networks/contract_types",
        report,
    );
    check_rate(
        policy.active_termination_rate,
        "/pharmacy_networks/active_termination_rate",
        report,
    );
    check_count_range(
        policy.active_term_days,
        "/pharmacy_networks/active_term_days",
        report,
    );
    check_count_range(
        policy.inactive_term_days,
        "/pharmacy_networks/inactive_term_days",
        report,
    );
    if policy.awp_discounts.is_empty() {
        report.push(ValidationIssue::error(
            "empty_choices",
            "/pharmacy_networks/awp_discounts",
            "no AWP discounts",
        ));
    }
    check_value_range(
        policy.dispensing_fee,
        "/pharmacy_networks/dispensing_fee",
        report,
    );
}

fn validate_claims(policy: &ClaimPolicy, report: &mut ValidationReport) {
    check_progress(policy.progress_every, "/claims", report);
    if policy.hourly_weights.len() != 24 {
        report.push(ValidationIssue::error(
            "hourly_weights_length",
            "/claims/hourly_weights",
            format!("expected 24 hourly weights, got {}", policy.hourly_weights.len()),
        ));
    }
    let hourly_total: f64 = policy.hourly_weights.iter().sum();
    if policy.hourly_weights.iter().any(|w| !w.is_finite() || *w < 0.0) || hourly_total <= 0.0
    {
        report.push(ValidationIssue::error(
            "invalid_distribution",
            "/claims/hourly_weights",
            "hourly weights must be non-negative with a positive total",
        ));
    }
    check_count_range(policy.peak_hours, "/claims/peak_hours", report);
    if policy.peak_hours.max > 23 {
        report.push(ValidationIssue::error(
            "inverted_range",
            "/claims/peak_hours/max",
            "peak hours end at 23",
        ));
    }
    check_weights(&policy.transaction_types, "/claims/transaction_types", report);
    check_weights(&policy.person_codes, "/claims/person_codes", report);
    check_weights(&policy.refill_numbers, "/claims/refill_numbers", report);
    check_weights(&policy.daw_codes, "/claims/daw_codes", report);

    if policy.days_supply.is_empty() || policy.days_supply.iter().all(|o| o.weight <= 0.0) {
        report.push(ValidationIssue::error(
            "invalid_distribution",
            "/claims/days_supply",
            "at least one days supply option needs a positive weight",
        ));
    }
    for (idx, option) in policy.days_supply.iter().enumerate() {
        let path = format!("/claims/days_supply/{idx}");
        check_weight(option.weight, &format!("{path}/weight"), report);
        check_count_range(
            CountRange {
                min: option.min_quantity,
                max: option.max_quantity,
            },
            &path,
            report,
        );
    }

    let pricing = &policy.pricing;
    check_value_range(pricing.unit_cost, "/claims/pricing/unit_cost", report);
    check_value_range(pricing.dispensing_fee, "/claims/pricing/dispensing_fee", report);
    check_rate(
        pricing.coinsurance_rate,
        "/claims/pricing/coinsurance_rate",
        report,
    );
    if pricing.tier_count == 0 {
        report.push(ValidationIssue::error(
            "invalid_tier_count",
            "/claims/pricing/tier_count",
            "claim pricing needs at least one tier",
        ));
    }
    check_copays(&pricing.copays, "/claims/pricing/copays", report);
}

fn validate_claim_lines(policy: &ClaimLinePolicy, report: &mut ValidationReport) {
    check_progress(policy.progress_every, "/claim_lines", report);
    check_rate(
        policy.rendering_matches_prescriber_rate,
        "/claim_lines/rendering_matches_prescriber_rate",
        report,
    );
    check_rate(
        policy.prior_auth_number_rate,
        "/claim_lines/prior_auth_number_rate",
        report,
    );
    check_weights(&policy.lines_per_claim, "/claim_lines/lines_per_claim", report);
    if policy.lines_per_claim.iter().any(|entry| entry.value == 0) {
        report.push(ValidationIssue::error(
            "invalid_distribution",
            "/claim_lines/lines_per_claim",
            "every claim carries at least one line",
        ));
    }
    check_weights(&policy.tiers, "/claim_lines/tiers", report);
    for (idx, tier) in policy.tiers.iter().enumerate() {
        if tier.value == 0 {
            report.push(ValidationIssue::error(
                "invalid_tier",
                format!("/claim_lines/tiers/{idx}/value"),
                "tiers are numbered from 1",
            ));
        }
    }
    check_weights(&policy.statuses, "/claim_lines/statuses", report);
    check_weights(
        &policy.formulary_statuses,
        "/claim_lines/formulary_statuses",
        report,
    );
    check_weights(&policy.daw_codes, "/claim_lines/daw_codes", report);
    if policy.additional_days_supply.is_empty() {
        report.push(ValidationIssue::error(
            "empty_choices",
            "/claim_lines/additional_days_supply",
            "no days supply for additional lines",
        ));
    }
    check_value_range(
        policy.additional_ingredient_cost,
        "/claim_lines/additional_ingredient_cost",
        report,
    );
    check_value_range(
        policy.additional_dispensing_fee,
        "/claim_lines/additional_dispensing_fee",
        report,
    );

    let pricing = &policy.pricing;
    let base = "/claim_lines/pricing";
    check_value_range(pricing.allowed_ratio, &format!("{base}/allowed_ratio"), report);
    if pricing.allowed_ratio.min < 0.0 || pricing.allowed_ratio.max > 1.0 {
        report.push(ValidationIssue::error(
            "rate_out_of_range",
            format!("{base}/allowed_ratio"),
            "allowed ratio must stay within [0, 1]",
        ));
    }
    check_rate(pricing.coinsurance_rate, &format!("{base}/coinsurance_rate"), report);
    check_rate(pricing.deductible_rate, &format!("{base}/deductible_rate"), report);
    check_value_range(pricing.deductible, &format!("{base}/deductible"), report);
    check_rate(
        pricing.sales_tax_applied_rate,
        &format!("{base}/sales_tax_applied_rate"),
        report,
    );
    check_rate(pricing.sales_tax_rate, &format!("{base}/sales_tax_rate"), report);
    check_copays(&pricing.copays, &format!("{base}/copays"), report);
}

fn validate_interactions(policy: &InteractionPolicy, report: &mut ValidationReport) {
    check_progress(policy.progress_every, "/drug_interactions", report);
    check_rate(
        policy.duplicate_acceptance_rate,
        "/drug_interactions/duplicate_acceptance_rate",
        report,
    );
    if policy.duplicate_acceptance_rate <= 0.0 {
        report.push(
            ValidationIssue::warning(
                "no_duplicate_slack",
                "/drug_interactions/duplicate_acceptance_rate",
                "generation cannot exceed the number of distinct drug pairs",
            )
            .with_hint("the run stops early once every pair has been emitted"),
        );
    }
    check_weights(&policy.severities, "/drug_interactions/severities", report);
    check_weights(
        &policy.evidence_levels,
        "/drug_interactions/evidence_levels",
        report,
    );
}

fn check_progress(every: u64, base: &str, report: &mut ValidationReport) {
    if every == 0 {
        report.push(ValidationIssue::error(
            "zero_progress_interval",
            format!("{base}/progress_every"),
            "progress interval must be positive",
        ));
    }
}

fn check_rate(value: f64, path: &str, report: &mut ValidationReport) {
    if !(0.0..=1.0).contains(&value) {
        report.push(ValidationIssue::error(
            "rate_out_of_range",
            path,
            format!("probability {value} is outside [0, 1]"),
        ));
    }
}

fn check_rate_table(table: &RateTable, path: &str, report: &mut ValidationReport) {
    check_rate(table.default, &format!("{path}/default"), report);
    for (kind, rate) in &table.by_type {
        check_rate(*rate, &format!("{path}/by_type/{kind}"), report);
    }
}

fn check_weight(weight: f64, path: &str, report: &mut ValidationReport) {
    if !weight.is_finite() || weight < 0.0 {
        report.push(ValidationIssue::error(
            "invalid_distribution",
            path,
            format!("weight {weight} must be a non-negative number"),
        ));
    }
}

fn check_weights<T>(entries: &[Weighted<T>], path: &str, report: &mut ValidationReport) {
    for (idx, entry) in entries.iter().enumerate() {
        check_weight(entry.weight, &format!("{path}/{idx}/weight"), report);
    }
    let total: f64 = entries
        .iter()
        .filter(|entry| entry.weight.is_finite() && entry.weight > 0.0)
        .map(|entry| entry.weight)
        .sum();
    if total <= 0.0 {
        report.push(
            ValidationIssue::error(
                "invalid_distribution",
                path,
                "distribution is empty or every weight is zero",
            )
            .with_hint("give at least one entry a positive weight"),
        );
    }
}

fn check_value_range(range: ValueRange, path: &str, report: &mut ValidationReport) {
    if !range.min.is_finite() || !range.max.is_finite() || range.min < 0.0 {
        report.push(ValidationIssue::error(
            "invalid_range",
            path,
            "range bounds must be finite and non-negative",
        ));
    } else if range.min > range.max {
        report.push(ValidationIssue::error(
            "inverted_range",
            path,
            format!("min {} exceeds max {}", range.min, range.max),
        ));
    }
}

fn check_count_range(range: CountRange, path: &str, report: &mut ValidationReport) {
    if range.min > range.max {
        report.push(ValidationIssue::error(
            "inverted_range",
            path,
            format!("min {} exceeds max {}", range.min, range.max),
        ));
    }
}

fn check_tier_split(split: TierSplit, path: &str, report: &mut ValidationReport) {
    check_rate(split.lower_rate, &format!("{path}/lower_rate"), report);
    if split.lower == 0 || split.lower > split.upper {
        report.push(ValidationIssue::error(
            "invalid_tier_split",
            path,
            format!("tiers {} and {} are not ascending", split.lower, split.upper),
        ));
    }
}

fn check_copays(copays: &[CopayBand], path: &str, report: &mut ValidationReport) {
    let mut seen = BTreeSet::new();
    for (idx, band) in copays.iter().enumerate() {
        let band_path = format!("{path}/{idx}");
        if !seen.insert(band.tier) {
            report.push(ValidationIssue::error(
                "duplicate_tier",
                format!("{band_path}/tier"),
                format!("tier {} has two copay bands", band.tier),
            ));
        }
        check_value_range(
            ValueRange {
                min: band.min,
                max: band.max,
            },
            &band_path,
            report,
        );
    }
}

fn single_error(code: &str, path: &str, message: String) -> ValidationReport {
    let mut report = ValidationReport::default();
    report.push(ValidationIssue::error(code, path, message));
    report
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}
