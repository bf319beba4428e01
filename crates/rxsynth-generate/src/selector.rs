//! Rule-driven selection of children (drugs) for a parent (formulary).

use rxsynth_plan::FormularyDrugPolicy;

use crate::catalog::{DrugCatalog, DrugCategory, Formulary};
use crate::sampler::WeightedSampler;

/// How a rule treats ids already selected by earlier rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Samples the full category; overlaps with earlier picks are dropped.
    Floor,
    /// Samples only ids not yet selected.
    Fill,
}

/// How many ids a rule draws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleTarget {
    /// `round(eligible * rate)`.
    InclusionRate(f64),
    /// Whatever is left of the parent's target.
    RemainingCapacity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionRule {
    pub name: &'static str,
    pub category: DrugCategory,
    pub target: RuleTarget,
    pub kind: RuleKind,
}

impl SelectionRule {
    pub fn new(name: &'static str, category: DrugCategory, target: RuleTarget, kind: RuleKind) -> Self {
        Self {
            name,
            category,
            target,
            kind,
        }
    }
}

/// Per-rule accounting of one selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub name: &'static str,
    pub eligible: usize,
    pub drawn: usize,
    pub added: usize,
}

/// Ordered, duplicate-free catalog indices chosen for one parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub ids: Vec<usize>,
    pub outcomes: Vec<RuleOutcome>,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Number of ids an inclusion rate asks for, rounded half away from zero.
pub fn inclusion_count(eligible: usize, rate: f64) -> usize {
    if eligible == 0 || rate <= 0.0 {
        return 0;
    }
    ((eligible as f64 * rate.min(1.0)).round() as usize).min(eligible)
}

pub struct EntitySelector<'c> {
    catalog: &'c DrugCatalog,
}

impl<'c> EntitySelector<'c> {
    pub fn new(catalog: &'c DrugCatalog) -> Self {
        Self { catalog }
    }

    /// Apply `rules` in order and return the union of their picks.
    ///
    /// Rate-driven rules may push the total past `target`; it only bounds
    /// rules that fill remaining capacity.
    pub fn select_children(
        &self,
        target: usize,
        rules: &[SelectionRule],
        sampler: &mut WeightedSampler,
    ) -> Selection {
        let mut chosen = vec![false; self.catalog.len()];
        let mut selection = Selection::default();

        for rule in rules {
            let category = self.catalog.category_indices(&rule.category);
            let pool: Vec<usize> = match rule.kind {
                RuleKind::Floor => category.to_vec(),
                RuleKind::Fill => category
                    .iter()
                    .copied()
                    .filter(|idx| !chosen[*idx])
                    .collect(),
            };
            if pool.is_empty() {
                selection.outcomes.push(RuleOutcome {
                    name: rule.name,
                    eligible: 0,
                    drawn: 0,
                    added: 0,
                });
                continue;
            }

            let wanted = match rule.target {
                RuleTarget::InclusionRate(rate) => inclusion_count(pool.len(), rate),
                RuleTarget::RemainingCapacity => target.saturating_sub(selection.ids.len()),
            };
            let picks = sampler.sample_indices(pool.len(), wanted);
            let drawn = picks.len();
            let mut added = 0;
            for pick in picks {
                let idx = pool[pick];
                if !chosen[idx] {
                    chosen[idx] = true;
                    selection.ids.push(idx);
                    added += 1;
                }
            }
            selection.outcomes.push(RuleOutcome {
                name: rule.name,
                eligible: pool.len(),
                drawn,
                added,
            });
        }

        selection
    }
}

/// Rule set for one formulary: protected floor (qualifying segments only),
/// generic and specialty inclusion by formulary type, then brand fill.
pub fn formulary_rules(policy: &FormularyDrugPolicy, formulary: &Formulary) -> Vec<SelectionRule> {
    let mut rules = Vec::with_capacity(4);
    if policy
        .protected_segments
        .iter()
        .any(|segment| segment == &formulary.market_segment)
    {
        rules.push(SelectionRule::new(
            "protected_floor",
            DrugCategory::Protected,
            RuleTarget::InclusionRate(policy.protected_rate),
            RuleKind::Floor,
        ));
    }
    rules.push(SelectionRule::new(
        "generic_inclusion",
        DrugCategory::Generic,
        RuleTarget::InclusionRate(policy.generic_inclusion.rate_for(&formulary.formulary_type)),
        RuleKind::Floor,
    ));
    rules.push(SelectionRule::new(
        "specialty_inclusion",
        DrugCategory::Specialty,
        RuleTarget::InclusionRate(policy.specialty_inclusion.rate_for(&formulary.formulary_type)),
        RuleKind::Floor,
    ));
    rules.push(SelectionRule::new(
        "brand_fill",
        DrugCategory::Brand,
        RuleTarget::RemainingCapacity,
        RuleKind::Fill,
    ));
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inclusion_count_rounds_and_caps() {
        assert_eq!(inclusion_count(10, 0.92), 9);
        assert_eq!(inclusion_count(10, 0.95), 10);
        assert_eq!(inclusion_count(3, 0.5), 2);
        assert_eq!(inclusion_count(0, 0.5), 0);
        assert_eq!(inclusion_count(4, 1.5), 4);
    }
}
