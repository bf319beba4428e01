use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;

use rxsynth_core::DatasetKind;
use rxsynth_generate::catalog::{DrugCatalog, DrugCategory};
use rxsynth_generate::errors::GenerationError;
use rxsynth_generate::model::{GenerateOptions, GenerationReport};
use rxsynth_generate::selector::inclusion_count;
use rxsynth_generate::source::list_shards;
use rxsynth_generate::{GenerationEngine, dataset_columns};
use rxsynth_plan::{RunConfig, SegmentQuota, count_range};

type Row = HashMap<String, String>;

fn temp_out_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rxsynth_{label}_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn small_config() -> RunConfig {
    let mut config = RunConfig::default();
    config.drugs.record_target = 200;
    config.members.record_target = 50;
    config.pharmacies.record_target = 30;
    config.formularies.segments = vec![
        SegmentQuota {
            segment: "MEDICARE_PART_D".to_string(),
            count: 3,
        },
        SegmentQuota {
            segment: "COMMERCIAL".to_string(),
            count: 3,
        },
    ];
    config.formularies.record_target = 6;
    config.formulary_drugs.record_target = 100_000;
    config.plan_rules.plan_count = 3;
    config.plan_rules.rules_per_plan = count_range(5, 10);
    config.plan_rules.record_target = 1_000;
    config.enrollments.record_target = 1_000;
    config.pharmacy_networks.record_target = 10_000;
    config.claims.record_target = 100;
    config.claim_lines.record_target = 100;
    config.drug_interactions.record_target = 40;
    config
}

fn options(dir: &Path, seed: u64) -> GenerateOptions {
    GenerateOptions {
        input_dir: dir.to_path_buf(),
        output_dir: dir.to_path_buf(),
        seed,
        shard_budget_bytes: 16 * 1024,
        record_target: None,
        write_report: true,
    }
}

fn shard_files(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    list_shards(dir, prefix).expect("list shards")
}

fn read_rows(dir: &Path, kind: DatasetKind) -> Vec<Row> {
    let files = shard_files(dir, kind.file_prefix());
    assert!(!files.is_empty(), "no shards for {kind}");
    let mut rows = Vec::new();
    for file in files {
        let mut reader = csv::Reader::from_path(&file).expect("open shard");
        let headers = reader.headers().expect("headers").clone();
        let expected: Vec<&str> = dataset_columns(kind).iter().map(|spec| spec.name).collect();
        assert_eq!(headers.iter().collect::<Vec<_>>(), expected);
        for record in reader.records() {
            let record = record.expect("record");
            rows.push(
                headers
                    .iter()
                    .zip(record.iter())
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
            );
        }
    }
    rows
}

fn money(row: &Row, column: &str) -> Decimal {
    Decimal::from_str(&row[column]).expect("money column")
}

fn directory_contents(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| {
            let path = entry.expect("dir entry").path();
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .expect("file name")
                .to_string();
            (name, fs::read(&path).expect("read file"))
        })
        .collect()
}

#[test]
fn full_pipeline_produces_consistent_datasets() {
    let dir = temp_out_dir("pipeline");
    let config = small_config();
    let engine = GenerationEngine::new(options(&dir, 42), config.clone());
    let results = engine.run_pipeline(&DatasetKind::ALL).expect("pipeline");

    assert_eq!(results.len(), DatasetKind::ALL.len());
    for result in &results {
        let report = &result.report;
        assert!(report.rows_written > 0, "{} wrote nothing", report.dataset);
        let report_path = dir.join(format!("{}_report.json", report.file_prefix));
        let parsed: GenerationReport =
            serde_json::from_slice(&fs::read(&report_path).expect("read report")).expect("parse report");
        assert_eq!(&parsed, report);
    }

    let drugs = read_rows(&dir, DatasetKind::Drugs);
    assert_eq!(drugs.len(), 200);
    let ndcs: HashSet<&str> = drugs.iter().map(|row| row["ndc_code"].as_str()).collect();
    assert_eq!(ndcs.len(), drugs.len());

    assert_eq!(read_rows(&dir, DatasetKind::Members).len(), 50);
    assert_eq!(read_rows(&dir, DatasetKind::Pharmacies).len(), 30);

    let formularies = read_rows(&dir, DatasetKind::Formularies);
    assert_eq!(formularies.len(), 6);
    let medicare: HashSet<&str> = formularies
        .iter()
        .filter(|row| row["market_segment"] == "MEDICARE_PART_D")
        .map(|row| row["formulary_code"].as_str())
        .collect();
    assert_eq!(medicare.len(), 3);

    let formulary_drugs = read_rows(&dir, DatasetKind::FormularyDrugs);
    let mut pairs = HashSet::new();
    for row in &formulary_drugs {
        assert!(ndcs.contains(row["ndc_code"].as_str()));
        assert!(
            pairs.insert((row["formulary_code"].clone(), row["ndc_code"].clone())),
            "duplicate formulary drug {} / {}",
            row["formulary_code"],
            row["ndc_code"]
        );
        let has_quantity = !row["quantity_limit"].is_empty();
        assert_eq!(has_quantity, !row["days_supply_limit"].is_empty());
    }

    let catalog =
        DrugCatalog::load(&dir, &config.formulary_drugs.protected_classes).expect("catalog");
    let protected: HashSet<&str> = catalog
        .by_category(&DrugCategory::Protected)
        .map(|drug| drug.ndc_code.as_str())
        .collect();
    assert!(!protected.is_empty());
    let floor = inclusion_count(protected.len(), config.formulary_drugs.protected_rate);
    for code in &medicare {
        let kept = formulary_drugs
            .iter()
            .filter(|row| row["formulary_code"] == *code && protected.contains(row["ndc_code"].as_str()))
            .count();
        assert!(kept >= floor, "{code}: {kept} protected drugs, floor {floor}");
    }

    let rules = read_rows(&dir, DatasetKind::PlanRules);
    assert!((15..=30).contains(&rules.len()), "{} plan rules", rules.len());
    let rule_ids: HashSet<&str> = rules.iter().map(|row| row["rule_id"].as_str()).collect();
    assert_eq!(rule_ids.len(), rules.len());
    for rule in &rules {
        let plan_id: u32 = rule["plan_id"].parse().expect("plan id");
        assert!((1..=3).contains(&plan_id));
        let priority: i64 = rule["priority"].parse().expect("priority");
        assert!((-100..=100).contains(&priority));
        let criteria: serde_json::Value =
            serde_json::from_str(&rule["rule_criteria"]).expect("criteria json");
        let action: serde_json::Value =
            serde_json::from_str(&rule["rule_action"]).expect("action json");
        assert!(criteria.is_object() && action.is_object());
    }

    let member_numbers: HashSet<String> = read_rows(&dir, DatasetKind::Members)
        .into_iter()
        .map(|row| row["member_number"].clone())
        .collect();
    let enrollments = read_rows(&dir, DatasetKind::Enrollments);
    let enrolled: HashSet<&str> = enrollments
        .iter()
        .map(|row| row["member_number"].as_str())
        .collect();
    assert_eq!(enrolled.len(), member_numbers.len());
    assert!(enrolled.iter().all(|member| member_numbers.contains(*member)));
    for row in &enrollments {
        assert!(!row["plan_code"].is_empty());
        let active = row["is_active"] == "true";
        assert_eq!(active, row["termination_date"].is_empty(), "{row:?}");
        if !active {
            assert!(row["termination_date"] >= row["effective_date"]);
        }
    }

    let pharmacy_ids: HashSet<String> = read_rows(&dir, DatasetKind::Pharmacies)
        .into_iter()
        .map(|row| row["ncpdp_id"].clone())
        .collect();
    let networks = read_rows(&dir, DatasetKind::PharmacyNetworks);
    let mut per_pharmacy: HashMap<&str, HashSet<&str>> = HashMap::new();
    for row in &networks {
        assert!(pharmacy_ids.contains(&row["pharmacy_id"]));
        assert!(
            per_pharmacy
                .entry(row["pharmacy_id"].as_str())
                .or_default()
                .insert(row["network_name"].as_str()),
            "pharmacy joined {} twice",
            row["network_name"]
        );
        if !row["termination_date"].is_empty() {
            assert!(row["termination_date"] >= row["effective_date"], "{row:?}");
        }
        assert_eq!(row["is_preferred"] == "true", row["network_tier"] == "Preferred");
    }
    assert_eq!(per_pharmacy.len(), pharmacy_ids.len());
    assert!(per_pharmacy.values().all(|joined| (3..=8).contains(&joined.len())));

    let claims = read_rows(&dir, DatasetKind::Claims);
    assert_eq!(claims.len(), 100);
    let claim_numbers: HashSet<&str> = claims.iter().map(|row| row["claim_number"].as_str()).collect();
    assert_eq!(claim_numbers.len(), claims.len());
    for claim in &claims {
        assert!(ndcs.contains(claim["ndc"].as_str()));
        let total = money(claim, "ingredient_cost_submitted") + money(claim, "dispensing_fee_submitted");
        assert_eq!(money(claim, "patient_pay_amount") + money(claim, "plan_pay_amount"), total);
    }

    let lines = read_rows(&dir, DatasetKind::ClaimLines);
    assert_eq!(lines.len(), 100);
    for line in &lines {
        assert!(claim_numbers.contains(line["claim_number"].as_str()));
        assert!(ndcs.contains(line["ndc"].as_str()));
        let allowed = money(line, "allowed_amount");
        assert_eq!(
            money(line, "paid_amount") + money(line, "patient_responsibility"),
            allowed
        );
        if line["line_status"] == "DENIED" {
            assert!(allowed.is_zero());
            assert!(!line["denial_code"].is_empty());
        }
    }

    let interactions = read_rows(&dir, DatasetKind::DrugInteractions);
    assert_eq!(interactions.len(), 40);
    for row in &interactions {
        assert!(ndcs.contains(row["drug_1_ndc"].as_str()));
        assert!(ndcs.contains(row["drug_2_ndc"].as_str()));
        assert_ne!(row["drug_1_ndc"], row["drug_2_ndc"]);
    }

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn same_seed_reproduces_every_file() {
    let first = temp_out_dir("pipeline_seed_a");
    let second = temp_out_dir("pipeline_seed_b");
    let config = small_config();

    GenerationEngine::new(options(&first, 7), config.clone())
        .run_pipeline(&DatasetKind::ALL)
        .expect("first pipeline");
    GenerationEngine::new(options(&second, 7), config)
        .run_pipeline(&DatasetKind::ALL)
        .expect("second pipeline");

    let a = directory_contents(&first);
    let b = directory_contents(&second);
    assert_eq!(a.keys().collect::<Vec<_>>(), b.keys().collect::<Vec<_>>());
    for (name, bytes) in &a {
        assert!(bytes == &b[name], "{name} differs between runs");
    }

    fs::remove_dir_all(&first).ok();
    fs::remove_dir_all(&second).ok();
}

#[test]
fn rerun_replaces_previous_shards() {
    let dir = temp_out_dir("pipeline_rerun");
    let mut config = small_config();
    let engine = GenerationEngine::new(
        GenerateOptions {
            shard_budget_bytes: 2 * 1024,
            ..options(&dir, 3)
        },
        config.clone(),
    );
    let wide = engine.run(DatasetKind::Drugs).expect("first run");
    assert!(wide.report.shards.len() > 1);

    config.drugs.record_target = 5;
    let narrow = GenerationEngine::new(options(&dir, 3), config)
        .run(DatasetKind::Drugs)
        .expect("second run");
    assert_eq!(narrow.report.shards.len(), 1);
    assert_eq!(shard_files(&dir, DatasetKind::Drugs.file_prefix()).len(), 1);
    assert_eq!(read_rows(&dir, DatasetKind::Drugs).len(), 5);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_reference_fails_before_output_is_created() {
    let input = temp_out_dir("pipeline_missing");
    let output = input.join("out");
    let engine = GenerationEngine::new(
        GenerateOptions {
            input_dir: input.clone(),
            output_dir: output.clone(),
            ..GenerateOptions::default()
        },
        small_config(),
    );

    let err = engine.run(DatasetKind::Claims).expect_err("claims need upstream data");
    assert!(matches!(err, GenerationError::MissingReference { .. }), "{err}");
    assert!(!output.exists());

    fs::remove_dir_all(&input).ok();
}

#[test]
fn record_target_override_caps_rows() {
    let dir = temp_out_dir("pipeline_override");
    let engine = GenerationEngine::new(
        GenerateOptions {
            record_target: Some(12),
            write_report: false,
            ..options(&dir, 11)
        },
        small_config(),
    );
    let result = engine.run(DatasetKind::Members).expect("members");
    assert_eq!(result.report.rows_written, 12);
    assert!(result.report.target_reached);
    assert!(!dir.join("us_pharmacy_members_report.json").exists());

    fs::remove_dir_all(&dir).ok();
}
