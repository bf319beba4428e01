use rxsynth_plan::{
    RunConfig, config_json_schema, config_value_from_toml, parse_config, render_config,
    validate_config, validate_config_json, validate_semantics,
};

fn default_json() -> serde_json::Value {
    serde_json::to_value(RunConfig::default()).expect("serialize default config")
}

#[test]
fn default_config_validates_clean() {
    let validated = validate_config(&default_json()).expect("default config should validate");
    assert!(
        validated.warnings.is_empty(),
        "unexpected warnings: {:?}",
        validated.warnings
    );
    assert_eq!(validated.config, RunConfig::default());
}

#[test]
fn default_config_round_trips_through_toml() {
    let text = render_config(&RunConfig::default()).expect("render toml");
    let parsed = parse_config(&text).expect("parse rendered toml");
    assert_eq!(parsed, RunConfig::default());

    let json = config_value_from_toml(&text).expect("toml to json");
    validate_config(&json).expect("rendered config validates");
}

#[test]
fn partial_toml_falls_back_to_defaults() {
    let text = r#"
[run]
seed = 7
shard_budget_bytes = 4096

[formulary_drugs]
protected_rate = 0.95
"#;
    let config = parse_config(text).expect("parse partial config");
    assert_eq!(config.run.seed, 7);
    assert_eq!(config.run.shard_budget_bytes, 4096);
    assert_eq!(config.formulary_drugs.protected_rate, 0.95);
    assert_eq!(config.formulary_drugs.progress_every, 500);
    assert_eq!(config.claims, RunConfig::default().claims);
}

#[test]
fn unknown_fields_are_structural_errors() {
    let json = serde_json::json!({ "run": { "seed": 1, "shard_mb": 30 } });
    let schema = serde_json::to_value(config_json_schema()).expect("schema json");
    let report = validate_config_json(&json, &schema).expect("validate");
    assert!(!report.is_ok());
    assert!(report.errors.iter().all(|issue| issue.code == "schema_violation"));
}

#[test]
fn semantic_errors_are_reported_with_paths() {
    let mut config = RunConfig::default();
    config.formulary_drugs.protected_rate = 1.5;
    config.claim_lines.pricing.allowed_ratio.min = 0.99;
    config.claims.transaction_types.iter_mut().for_each(|entry| entry.weight = 0.0);
    config.formulary_drugs.tiers.brand.lower = 4;
    config.run.reference_date = "11/09/2024".to_string();

    let report = validate_semantics(&config);
    assert!(!report.is_ok());

    let paths: Vec<&str> = report.errors.iter().map(|issue| issue.path.as_str()).collect();
    assert!(paths.contains(&"/formulary_drugs/protected_rate"));
    assert!(paths.contains(&"/claim_lines/pricing/allowed_ratio"));
    assert!(paths.contains(&"/claims/transaction_types"));
    assert!(paths.contains(&"/formulary_drugs/tiers/brand"));
    assert!(report.has_code("invalid_reference_date"));
}

#[test]
fn decreasing_gate_rates_warn_without_failing() {
    let mut config = RunConfig::default();
    config.formulary_drugs.utilization.tiers[3].step_therapy = 0.15;

    let report = validate_semantics(&config);
    assert!(report.is_ok());
    assert!(report.has_code("non_monotonic_gate_rate"));
}

#[test]
fn missing_fallback_tier_is_an_error() {
    let mut config = RunConfig::default();
    config.formulary_drugs.utilization.fallback_tier = 9;
    let report = validate_semantics(&config);
    assert!(report.has_code("missing_fallback_tier"));
}

#[test]
fn claim_line_tier_zero_is_rejected() {
    let mut config = RunConfig::default();
    config.claim_lines.tiers[0].value = 0;
    let report = validate_semantics(&config);
    assert!(report.has_code("invalid_tier"));
    assert!(
        report
            .errors
            .iter()
            .any(|issue| issue.path == "/claim_lines/tiers/0/value")
    );
}

#[test]
fn plan_rule_and_network_policies_are_checked() {
    let mut config = RunConfig::default();
    config.plan_rules.priorities[0].min = 200;
    config.enrollments.transition_months.max = 13;
    config.pharmacy_networks.networks_per_pharmacy.max = 40;

    let report = validate_semantics(&config);
    let paths: Vec<&str> = report.errors.iter().map(|issue| issue.path.as_str()).collect();
    assert!(paths.contains(&"/plan_rules/priorities/0"));
    assert!(paths.contains(&"/enrollments/transition_months"));
    assert!(paths.contains(&"/pharmacy_networks/networks_per_pharmacy/max"));
}

#[test]
fn rule_types_parse_from_toml_labels() {
    let text = r#"
[plan_rules]
plan_count = 2
rule_types = [
    { value = "STEP_THERAPY", weight = 1.0 },
    { value = "COST_SHARE", weight = 3.0 },
]
"#;
    let config = parse_config(text).expect("parse rule types");
    assert_eq!(config.plan_rules.plan_count, 2);
    assert_eq!(
        config.plan_rules.rule_types[0].value,
        rxsynth_plan::PlanRuleType::StepTherapy
    );
    assert!(parse_config("[plan_rules]\nrule_types = [{ value = \"FORMULARY\", weight = 1.0 }]\n").is_err());
}
