use rust_decimal::Decimal;

use rxsynth_generate::catalog::{Drug, DrugFamily};
use rxsynth_generate::derive::{AttributeDeriver, FormularyStatus};
use rxsynth_generate::sampler::WeightedSampler;
use rxsynth_plan::RunConfig;

fn deriver() -> AttributeDeriver {
    AttributeDeriver::from_config(&RunConfig::default()).expect("deriver from defaults")
}

fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

#[test]
fn tier_one_line_pricing_stays_in_expected_bands() {
    let deriver = deriver();
    for seed in 0..200 {
        let mut sampler = WeightedSampler::seeded(seed);
        let pricing = deriver.derive_pricing(cents(4_000), cents(200), 1, &mut sampler);

        assert_eq!(pricing.billed, cents(4_200));
        assert!(
            pricing.allowed >= cents(3_360) && pricing.allowed <= cents(3_990),
            "seed {seed}: allowed {}",
            pricing.allowed
        );
        assert_eq!(pricing.plan_paid + pricing.patient_responsibility, pricing.allowed);
        if !pricing.clamped && pricing.deductible.is_zero() {
            assert!(
                pricing.patient_responsibility >= cents(500)
                    && pricing.patient_responsibility <= cents(1_500),
                "seed {seed}: patient {}",
                pricing.patient_responsibility
            );
            assert!(pricing.coinsurance.is_zero());
        }
    }
}

#[test]
fn line_pricing_balances_for_every_tier() {
    let deriver = deriver();
    let mut sampler = WeightedSampler::seeded(17);
    for round in 0..500_i64 {
        let tier = (round % 5 + 1) as u8;
        let ingredient = cents(100 + round * 97 % 50_000);
        let fee = cents(150 + round % 200);
        let pricing = deriver.derive_pricing(ingredient, fee, tier, &mut sampler);

        assert_eq!(pricing.plan_paid + pricing.patient_responsibility, pricing.allowed);
        assert!(pricing.patient_responsibility <= pricing.allowed);
        assert!(pricing.plan_paid >= Decimal::ZERO);
        assert_eq!(
            pricing.patient_responsibility,
            pricing.copay + pricing.coinsurance + pricing.deductible
        );
        for amount in [
            pricing.billed,
            pricing.allowed,
            pricing.plan_paid,
            pricing.patient_responsibility,
            pricing.sales_tax,
        ] {
            assert_eq!(amount.round_dp(2), amount);
        }
        if tier >= 4 {
            assert!(pricing.copay.is_zero() || pricing.clamped);
        }
    }
}

#[test]
fn cheap_lines_clamp_cost_share_to_allowed() {
    let deriver = deriver();
    let mut clamped = 0;
    for seed in 0..100 {
        let mut sampler = WeightedSampler::seeded(seed);
        let pricing = deriver.derive_pricing(cents(300), cents(100), 2, &mut sampler);
        assert!(pricing.clamped, "tier 2 copay always exceeds a $4 line");
        assert_eq!(pricing.patient_responsibility, pricing.allowed);
        assert_eq!(pricing.copay, pricing.allowed);
        assert!(pricing.coinsurance.is_zero() && pricing.deductible.is_zero());
        assert!(pricing.plan_paid.is_zero());
        clamped += 1;
    }
    assert_eq!(clamped, 100);
}

#[test]
fn denied_lines_keep_billed_and_zero_the_rest() {
    let deriver = deriver();
    let mut sampler = WeightedSampler::seeded(5);
    let pricing = deriver
        .derive_pricing(cents(8_000), cents(250), 3, &mut sampler)
        .denied();
    assert_eq!(pricing.billed, cents(8_250));
    assert!(pricing.allowed.is_zero());
    assert!(pricing.plan_paid.is_zero());
    assert!(pricing.patient_responsibility.is_zero());
    assert_eq!(pricing.plan_paid + pricing.patient_responsibility, pricing.allowed);
}

#[test]
fn claim_pricing_splits_submitted_total() {
    let deriver = deriver();
    let mut sampler = WeightedSampler::seeded(23);
    for quantity in [1, 7, 30, 90, 270] {
        let pricing = deriver
            .derive_claim_pricing(quantity, &mut sampler)
            .expect("claim pricing");
        let total = pricing.ingredient_cost + pricing.dispensing_fee;
        assert_eq!(pricing.patient_pay + pricing.plan_pay, total);
        assert!(pricing.patient_pay <= total);
        assert!((1..=5).contains(&pricing.tier));
        assert!(pricing.dispensing_fee >= cents(150) && pricing.dispensing_fee <= cents(350));
    }
}

#[test]
fn tiers_stay_inside_the_formulary_structure() {
    let deriver = deriver();
    let drugs = [
        Drug::new("00001-0001-01", DrugFamily::Generic, "STATIN"),
        Drug::new("00002-0002-01", DrugFamily::Brand, "STATIN"),
        Drug::new("00003-0003-01", DrugFamily::Specialty, "BIOLOGIC"),
        Drug::new("00004-0004-01", DrugFamily::Unclassified, "VITAMIN"),
    ];
    let mut sampler = WeightedSampler::seeded(31);
    for tier_count in 1..=6_u8 {
        for drug in &drugs {
            for _ in 0..50 {
                let tier = deriver.derive_tier(drug, tier_count, &mut sampler);
                assert!(
                    (1..=tier_count).contains(&tier),
                    "{:?} drew tier {tier} of {tier_count}",
                    drug.family
                );
            }
        }
    }

    for _ in 0..50 {
        let tier = deriver.derive_tier(&drugs[2], 5, &mut sampler);
        assert!(tier == 4 || tier == 5);
        let tier = deriver.derive_tier(&drugs[1], 5, &mut sampler);
        assert!(tier == 2 || tier == 3);
    }
}

#[test]
fn quantity_and_days_supply_limits_come_together() {
    let deriver = deriver();
    let drug = Drug::new("00001-0001-01", DrugFamily::Specialty, "BIOLOGIC")
        .with_dosage_form("INJECTION");
    let mut sampler = WeightedSampler::seeded(13);
    let mut limited = 0;
    for tier in 1..=6_u8 {
        for _ in 0..100 {
            let flags = deriver
                .derive_utilization_flags(&drug, tier, &mut sampler)
                .expect("flags");
            assert_eq!(flags.quantity_limit.is_some(), flags.days_supply_limit.is_some());
            if let Some(quantity) = flags.quantity_limit {
                assert!(quantity == 30 || quantity == 90);
                limited += 1;
            }
        }
    }
    assert!(limited > 0);
}

#[test]
fn status_follows_tier() {
    let deriver = deriver();
    let mut sampler = WeightedSampler::seeded(2);
    let mut saw_non_preferred = false;
    for _ in 0..200 {
        assert_eq!(deriver.derive_status(1, &mut sampler), FormularyStatus::Preferred);
        assert_eq!(deriver.derive_status(2, &mut sampler), FormularyStatus::Preferred);
        assert_eq!(deriver.derive_status(5, &mut sampler), FormularyStatus::Specialty);
        match deriver.derive_status(3, &mut sampler) {
            FormularyStatus::NonPreferred => saw_non_preferred = true,
            FormularyStatus::Preferred => {}
            FormularyStatus::Specialty => panic!("tier 3 is never specialty"),
        }
    }
    assert!(saw_non_preferred);
}
