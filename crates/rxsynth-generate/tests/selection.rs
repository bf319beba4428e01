use std::collections::HashSet;

use rxsynth_generate::catalog::{Drug, DrugCatalog, DrugCategory, DrugFamily, Formulary};
use rxsynth_generate::derive::AttributeDeriver;
use rxsynth_generate::sampler::WeightedSampler;
use rxsynth_generate::selector::{
    EntitySelector, RuleKind, RuleTarget, SelectionRule, formulary_rules, inclusion_count,
};
use rxsynth_plan::{FormularyDrugPolicy, RunConfig};

/// 60 generic, 30 brand and 10 specialty drugs; every tenth drug is an
/// anticonvulsant, which makes ten protected drugs spread over all families.
fn sample_catalog() -> DrugCatalog {
    let drugs = (0..100)
        .map(|idx| {
            let family = match idx {
                0..=59 => DrugFamily::Generic,
                60..=89 => DrugFamily::Brand,
                _ => DrugFamily::Specialty,
            };
            let class = if idx % 10 == 0 { "ANTICONVULSANT" } else { "STATIN" };
            Drug::new(format!("{:05}-{:04}-01", idx + 1, idx + 1), family, class)
        })
        .collect();
    DrugCatalog::from_drugs(drugs, &["ANTICONVULSANT".to_string()]).expect("catalog")
}

fn formulary(segment: &str, formulary_type: &str) -> Formulary {
    Formulary {
        formulary_code: format!("FORM-{segment}"),
        market_segment: segment.to_string(),
        formulary_type: formulary_type.to_string(),
        tier_count: 5,
    }
}

fn assert_unique(ids: &[usize]) {
    let unique: HashSet<usize> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len(), "selection holds duplicates");
}

#[test]
fn catalog_partitions_by_family_and_protection() {
    let catalog = sample_catalog();
    assert_eq!(catalog.category_indices(&DrugCategory::Generic).len(), 60);
    assert_eq!(catalog.category_indices(&DrugCategory::Brand).len(), 30);
    assert_eq!(catalog.category_indices(&DrugCategory::Specialty).len(), 10);
    assert_eq!(catalog.category_indices(&DrugCategory::Protected).len(), 10);
    assert!(
        catalog
            .by_category(&DrugCategory::Protected)
            .all(|drug| drug.drug_class == "ANTICONVULSANT")
    );
    assert_eq!(
        catalog
            .category_indices(&DrugCategory::DosageForm("TABLET".to_string()))
            .len(),
        100
    );
    assert!(catalog.by_id("99999-9999-99").is_err());
}

#[test]
fn duplicate_ndc_codes_are_rejected() {
    let drugs = vec![
        Drug::new("00001-0001-01", DrugFamily::Generic, "STATIN"),
        Drug::new("00001-0001-01", DrugFamily::Brand, "STATIN"),
    ];
    assert!(DrugCatalog::from_drugs(drugs, &[]).is_err());
}

#[test]
fn protected_floor_draws_exactly_the_rounded_share() {
    let catalog = sample_catalog();
    let selector = EntitySelector::new(&catalog);
    let rules = [SelectionRule::new(
        "protected_floor",
        DrugCategory::Protected,
        RuleTarget::InclusionRate(0.92),
        RuleKind::Floor,
    )];
    let protected: HashSet<usize> = catalog
        .category_indices(&DrugCategory::Protected)
        .iter()
        .copied()
        .collect();

    for seed in 0..20 {
        let mut sampler = WeightedSampler::seeded(seed);
        let selection = selector.select_children(50, &rules, &mut sampler);
        assert_eq!(selection.len(), 9);
        assert!(selection.ids.iter().all(|idx| protected.contains(idx)));
        assert_unique(&selection.ids);
    }
}

#[test]
fn fill_rule_tops_up_to_target_without_repeats() {
    let catalog = sample_catalog();
    let selector = EntitySelector::new(&catalog);
    let rules = [
        SelectionRule::new(
            "generic_inclusion",
            DrugCategory::Generic,
            RuleTarget::InclusionRate(0.5),
            RuleKind::Floor,
        ),
        SelectionRule::new(
            "brand_fill",
            DrugCategory::Brand,
            RuleTarget::RemainingCapacity,
            RuleKind::Fill,
        ),
    ];
    let mut sampler = WeightedSampler::seeded(4);
    let selection = selector.select_children(40, &rules, &mut sampler);

    assert_eq!(selection.len(), 40);
    assert_unique(&selection.ids);
    assert_eq!(selection.outcomes[0].added, 30);
    assert_eq!(selection.outcomes[1].added, 10);
}

#[test]
fn rate_rules_may_exceed_target() {
    let catalog = sample_catalog();
    let selector = EntitySelector::new(&catalog);
    let rules = [SelectionRule::new(
        "generic_inclusion",
        DrugCategory::Generic,
        RuleTarget::InclusionRate(0.85),
        RuleKind::Floor,
    )];
    let mut sampler = WeightedSampler::seeded(9);
    let selection = selector.select_children(10, &rules, &mut sampler);
    assert_eq!(selection.len(), inclusion_count(60, 0.85));
}

#[test]
fn empty_categories_are_skipped() {
    let drugs = vec![Drug::new("00001-0001-01", DrugFamily::Generic, "STATIN")];
    let catalog = DrugCatalog::from_drugs(drugs, &[]).expect("catalog");
    let policy = FormularyDrugPolicy::default();
    let rules = formulary_rules(&policy, &formulary("MEDICARE_PART_D", "STANDARD"));
    let mut sampler = WeightedSampler::seeded(2);
    let selection = EntitySelector::new(&catalog).select_children(10, &rules, &mut sampler);

    assert_eq!(selection.ids, vec![0]);
    let protected = &selection.outcomes[0];
    assert_eq!(protected.name, "protected_floor");
    assert_eq!(protected.eligible, 0);
}

#[test]
fn protected_floor_only_applies_to_medicare_segments() {
    let policy = FormularyDrugPolicy::default();
    let medicare = formulary_rules(&policy, &formulary("MEDICARE_ADVANTAGE", "BASIC"));
    let commercial = formulary_rules(&policy, &formulary("COMMERCIAL", "BASIC"));

    assert_eq!(medicare[0].name, "protected_floor");
    assert!(commercial.iter().all(|rule| rule.name != "protected_floor"));
    assert_eq!(commercial.last().map(|rule| rule.kind), Some(RuleKind::Fill));
}

#[test]
fn medicare_formulary_keeps_protected_floor_under_full_rules() {
    let catalog = sample_catalog();
    let policy = FormularyDrugPolicy::default();
    let parent = formulary("MEDICARE_PART_D", "STANDARD");
    let rules = formulary_rules(&policy, &parent);
    let protected: HashSet<usize> = catalog
        .category_indices(&DrugCategory::Protected)
        .iter()
        .copied()
        .collect();

    for seed in 0..10 {
        let mut sampler = WeightedSampler::seeded(seed);
        let selection = EntitySelector::new(&catalog).select_children(70, &rules, &mut sampler);
        assert_unique(&selection.ids);
        let kept = selection
            .ids
            .iter()
            .filter(|idx| protected.contains(idx))
            .count();
        assert!(kept >= 9, "seed {seed}: only {kept} protected drugs");
    }
}

#[test]
fn selected_generics_land_on_tier_one_at_the_configured_rate() {
    let catalog = sample_catalog();
    let config = RunConfig::default();
    let deriver = AttributeDeriver::from_config(&config).expect("deriver");
    let parent = formulary("MEDICARE_PART_D", "STANDARD");
    let rules = formulary_rules(&config.formulary_drugs, &parent);
    let selector = EntitySelector::new(&catalog);

    let mut generics = 0_u32;
    let mut tier_one = 0_u32;
    for seed in 0..200 {
        let mut sampler = WeightedSampler::seeded(seed);
        let selection = selector.select_children(70, &rules, &mut sampler);
        for &idx in &selection.ids {
            let drug = catalog.drug(idx);
            let tier = deriver.derive_tier(drug, parent.tier_count, &mut sampler);
            assert!((1..=parent.tier_count).contains(&tier));
            if drug.family == DrugFamily::Generic {
                generics += 1;
                if tier == 1 {
                    tier_one += 1;
                }
            }
        }
    }

    assert!(generics > 0);
    let share = f64::from(tier_one) / f64::from(generics);
    let expected = config.formulary_drugs.tiers.generic_tier1_rate;
    assert!(
        (share - expected).abs() < 0.02,
        "tier-1 share {share:.4} of {generics} generics, expected {expected}"
    );
}
