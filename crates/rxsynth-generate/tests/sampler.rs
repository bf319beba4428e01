use std::collections::HashSet;

use rust_decimal::Decimal;

use rxsynth_generate::errors::GenerationError;
use rxsynth_generate::sampler::{MoneyRange, WeightedSampler, basis_points, hash_seed};
use rxsynth_plan::weighted;

#[test]
fn streams_are_reproducible_and_independent() {
    let mut a = WeightedSampler::for_stream(42, "drugs");
    let mut b = WeightedSampler::for_stream(42, "drugs");
    let mut c = WeightedSampler::for_stream(42, "members");

    let draws_a: Vec<i64> = (0..16).map(|_| a.sample_int(0, 1_000_000).expect("draw")).collect();
    let draws_b: Vec<i64> = (0..16).map(|_| b.sample_int(0, 1_000_000).expect("draw")).collect();
    let draws_c: Vec<i64> = (0..16).map(|_| c.sample_int(0, 1_000_000).expect("draw")).collect();

    assert_eq!(draws_a, draws_b);
    assert_ne!(draws_a, draws_c);
    assert_ne!(hash_seed(42, "drugs"), hash_seed(43, "drugs"));
}

#[test]
fn zero_weight_entries_are_never_drawn() {
    let entries = vec![
        weighted("never".to_string(), 0.0),
        weighted("always".to_string(), 3.0),
    ];
    let mut sampler = WeightedSampler::seeded(7);
    for _ in 0..500 {
        assert_eq!(sampler.sample_category(&entries).expect("draw"), "always");
    }
}

#[test]
fn invalid_weight_tables_are_rejected() {
    let mut sampler = WeightedSampler::seeded(1);
    assert!(matches!(
        sampler.sample_index(&[0.0, 0.0]),
        Err(GenerationError::InvalidDistribution(_))
    ));
    assert!(matches!(
        sampler.sample_index(&[1.0, -0.5]),
        Err(GenerationError::InvalidDistribution(_))
    ));
    assert!(matches!(
        sampler.sample_index(&[f64::NAN]),
        Err(GenerationError::InvalidDistribution(_))
    ));
    assert!(sampler.sample_int(5, 4).is_err());
    assert!(sampler.choose::<u8>(&[]).is_err());
}

#[test]
fn weighted_draws_follow_proportions() {
    let mut sampler = WeightedSampler::seeded(99);
    let mut hits = [0_u32; 3];
    for _ in 0..20_000 {
        hits[sampler.sample_index(&[0.6, 0.3, 0.1]).expect("draw")] += 1;
    }
    let share = |count: u32| f64::from(count) / 20_000.0;
    assert!((share(hits[0]) - 0.6).abs() < 0.02, "{hits:?}");
    assert!((share(hits[1]) - 0.3).abs() < 0.02, "{hits:?}");
    assert!((share(hits[2]) - 0.1).abs() < 0.02, "{hits:?}");
}

#[test]
fn money_draws_stay_in_whole_cents_within_bounds() {
    let range = MoneyRange::from_bounds(5.00, 15.00).expect("range");
    let mut sampler = WeightedSampler::seeded(3);
    for _ in 0..1_000 {
        let amount = sampler.sample_money(range);
        assert!(amount >= Decimal::new(500, 2) && amount <= Decimal::new(1500, 2));
        assert_eq!(amount.round_dp(2), amount);
    }
    assert!(MoneyRange::from_bounds(10.0, 1.0).is_err());
}

#[test]
fn index_samples_are_distinct_and_capped() {
    let mut sampler = WeightedSampler::seeded(5);
    let picks = sampler.sample_indices(10, 25);
    assert_eq!(picks.len(), 10);
    let unique: HashSet<usize> = picks.iter().copied().collect();
    assert_eq!(unique.len(), 10);
    assert!(sampler.sample_indices(0, 3).is_empty());
}

#[test]
fn identifiers_have_expected_shape() {
    let mut sampler = WeightedSampler::seeded(8);
    let digits = sampler.digits(6);
    assert_eq!(digits.len(), 6);
    assert!(digits.chars().all(|c| c.is_ascii_digit()));

    let hex = sampler.hex_upper(6);
    assert_eq!(hex.len(), 12);
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));

    let id = sampler.uuid();
    assert_eq!(id.get_version_num(), 4);
    assert_eq!(basis_points(0.3).expect("bp"), 3_000);
    assert!(basis_points(1.5).is_err());
}
