use chrono::{Duration, NaiveDate};
use tracing::debug;

use rxsynth_core::{ColumnSpec, DatasetKind, FieldKind, FieldValue};
use rxsynth_plan::{EnrollmentPolicy, EnrollmentScenario};

use crate::catalog::KeyPool;
use crate::datasets::formularies::load_plan_codes;
use crate::datasets::{DatasetEnv, DatasetProducer, RunContext};
use crate::errors::{GenerationError, Result};
use crate::sampler::WeightedSampler;

pub const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("member_number", FieldKind::Text),
    ColumnSpec::required("plan_code", FieldKind::Text),
    ColumnSpec::required("group_number", FieldKind::Text),
    ColumnSpec::required("effective_date", FieldKind::Date),
    ColumnSpec::optional("termination_date", FieldKind::Date),
    ColumnSpec::required("relationship", FieldKind::Text),
    ColumnSpec::required("is_active", FieldKind::Bool),
];

/// One plan span of a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    pub plan_code: String,
    pub effective: NaiveDate,
    pub termination: Option<NaiveDate>,
    pub active: bool,
}

fn scenario_name(scenario: EnrollmentScenario) -> &'static str {
    match scenario {
        EnrollmentScenario::Single => "SINGLE",
        EnrollmentScenario::Dual => "DUAL",
        EnrollmentScenario::Transition => "TRANSITION",
        EnrollmentScenario::Historical => "HISTORICAL",
    }
}

fn year_start(year: i32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| {
        GenerationError::InvalidConfig(format!("coverage year {year} is out of range"))
    })
}

pub(crate) struct EnrollmentProducer {
    policy: EnrollmentPolicy,
    members: KeyPool,
    plans: KeyPool,
    /// Plan codes eligible as a dual primary; every code when none match.
    dual_primaries: Vec<String>,
    coverage_start: NaiveDate,
    prior_start: NaiveDate,
}

impl EnrollmentProducer {
    pub(crate) fn prepare(env: &DatasetEnv<'_>) -> Result<Self> {
        let policy = env.config.enrollments.clone();
        let members = KeyPool::load(env.input_dir, DatasetKind::Members, "member_number")?;
        let plans = load_plan_codes(env.input_dir)?;
        Self::new(policy, members, plans)
    }

    fn new(policy: EnrollmentPolicy, members: KeyPool, plans: KeyPool) -> Result<Self> {
        let mut dual_primaries: Vec<String> = plans
            .keys()
            .iter()
            .filter(|code| {
                policy
                    .dual_primary_prefixes
                    .iter()
                    .any(|prefix| code.starts_with(prefix.as_str()))
            })
            .cloned()
            .collect();
        if dual_primaries.is_empty() {
            dual_primaries = plans.keys().to_vec();
        }
        debug!(
            members = members.len(),
            plans = plans.len(),
            dual_primaries = dual_primaries.len(),
            "enrollment inputs loaded"
        );
        Ok(Self {
            coverage_start: year_start(policy.coverage_year)?,
            prior_start: year_start(policy.coverage_year - 1)?,
            policy,
            members,
            plans,
            dual_primaries,
        })
    }

    /// A plan code different from `other`, if the pool has one.
    fn other_plan(&self, other: &str, sampler: &mut WeightedSampler) -> Result<Option<String>> {
        let candidates: Vec<&String> =
            self.plans.keys().iter().filter(|code| code.as_str() != other).collect();
        if candidates.is_empty() {
            return Ok(None);
        }
        Ok(Some(sampler.choose(&candidates)?.to_string()))
    }

    fn single(&self, sampler: &mut WeightedSampler) -> Result<Vec<Enrollment>> {
        Ok(vec![Enrollment {
            plan_code: self.plans.choose(sampler)?.to_string(),
            effective: self.coverage_start,
            termination: None,
            active: true,
        }])
    }

    /// Plan spans for one member. Scenarios needing two distinct plans
    /// collapse to a single enrollment when the pool cannot supply them.
    pub(crate) fn spans(
        &self,
        scenario: EnrollmentScenario,
        sampler: &mut WeightedSampler,
    ) -> Result<(EnrollmentScenario, Vec<Enrollment>)> {
        match scenario {
            EnrollmentScenario::Single => Ok((scenario, self.single(sampler)?)),
            EnrollmentScenario::Dual => {
                let primary = sampler.choose(&self.dual_primaries)?.clone();
                let Some(secondary) = self.other_plan(&primary, sampler)? else {
                    return Ok((EnrollmentScenario::Single, self.single(sampler)?));
                };
                let span = |plan_code| Enrollment {
                    plan_code,
                    effective: self.coverage_start,
                    termination: None,
                    active: true,
                };
                Ok((scenario, vec![span(primary), span(secondary)]))
            }
            EnrollmentScenario::Transition => {
                let old_plan = self.plans.choose(sampler)?.to_string();
                let Some(new_plan) = self.other_plan(&old_plan, sampler)? else {
                    return Ok((EnrollmentScenario::Single, self.single(sampler)?));
                };
                let months = self.policy.transition_months;
                let month = sampler.sample_int(i64::from(months.min), i64::from(months.max))?;
                let switch = NaiveDate::from_ymd_opt(self.policy.coverage_year, month as u32, 1)
                    .ok_or_else(|| {
                        GenerationError::InvalidConfig(format!("transition month {month} is invalid"))
                    })?;
                Ok((
                    scenario,
                    vec![
                        Enrollment {
                            plan_code: old_plan,
                            effective: self.prior_start,
                            termination: Some(switch - Duration::days(1)),
                            active: false,
                        },
                        Enrollment {
                            plan_code: new_plan,
                            effective: switch,
                            termination: None,
                            active: true,
                        },
                    ],
                ))
            }
            EnrollmentScenario::Historical => Ok((
                scenario,
                vec![Enrollment {
                    plan_code: self.plans.choose(sampler)?.to_string(),
                    effective: self.prior_start,
                    termination: Some(self.coverage_start - Duration::days(1)),
                    active: false,
                }],
            )),
        }
    }
}

impl DatasetProducer for EnrollmentProducer {
    fn produce(&mut self, ctx: &mut RunContext<'_>) -> Result<()> {
        for member in self.members.keys() {
            if ctx.is_full() {
                return Ok(());
            }
            let sampler = &mut ctx.sampler;
            let drawn = *sampler.sample_category(&self.policy.scenarios)?;
            let (scenario, spans) = self.spans(drawn, sampler)?;
            let relationship = sampler.sample_category(&self.policy.relationships)?.clone();
            let prefix = sampler.choose(&self.policy.group_prefixes)?;
            let groups = self.policy.group_numbers;
            let group_number = format!(
                "{prefix}-{}",
                sampler.sample_int(i64::from(groups.min), i64::from(groups.max))?
            );

            ctx.stats.record("scenario", scenario_name(scenario));
            ctx.stats.record("relationship", &relationship);
            if scenario != drawn {
                ctx.stats.bump("collapsed_to_single");
            }

            for span in spans {
                if ctx.is_full() {
                    return Ok(());
                }
                ctx.write(&[
                    FieldValue::from(member.as_str()),
                    FieldValue::from(span.plan_code),
                    FieldValue::from(group_number.as_str()),
                    FieldValue::from(span.effective),
                    FieldValue::from(span.termination),
                    FieldValue::from(relationship.as_str()),
                    FieldValue::from(span.active),
                ])?;
            }
            ctx.advance();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Datelike;

    use super::*;

    fn producer(codes: &[&str]) -> EnrollmentProducer {
        let members = KeyPool::from_keys("members", vec!["M1".to_string()]).expect("members");
        let plans = KeyPool::from_keys("plans", codes.iter().map(|code| code.to_string()).collect())
            .expect("plans");
        EnrollmentProducer::new(EnrollmentPolicy::default(), members, plans).expect("producer")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    #[test]
    fn transition_ends_the_day_before_the_new_plan() {
        let producer = producer(&["COMM-GOLD-001", "MCARE-PARTD-001", "MCAID-AL-001"]);
        let mut sampler = WeightedSampler::seeded(4);
        for _ in 0..100 {
            let (scenario, spans) = producer
                .spans(EnrollmentScenario::Transition, &mut sampler)
                .expect("spans");
            assert_eq!(scenario, EnrollmentScenario::Transition);
            let [old, new] = spans.as_slice() else {
                panic!("expected two spans, got {spans:?}");
            };
            assert_ne!(old.plan_code, new.plan_code);
            assert_eq!(old.effective, date(2023, 1, 1));
            assert_eq!(old.termination, Some(new.effective - Duration::days(1)));
            assert!(!old.active && new.active);
            assert_eq!(new.effective.year(), 2024);
            assert!((2..=11).contains(&new.effective.month()));
            assert_eq!(new.effective.day(), 1);
        }
    }

    #[test]
    fn dual_primary_comes_from_medicare_or_commercial() {
        let producer = producer(&["MCAID-AL-001", "MCAID-AK-001", "COMM-GOLD-001"]);
        let mut sampler = WeightedSampler::seeded(9);
        for _ in 0..50 {
            let (_, spans) = producer
                .spans(EnrollmentScenario::Dual, &mut sampler)
                .expect("spans");
            assert_eq!(spans.len(), 2);
            assert_eq!(spans[0].plan_code, "COMM-GOLD-001");
            assert_ne!(spans[1].plan_code, spans[0].plan_code);
            assert!(spans.iter().all(|span| span.active && span.termination.is_none()));
        }
    }

    #[test]
    fn lone_plan_collapses_two_plan_scenarios() {
        let producer = producer(&["COMM-GOLD-001"]);
        let mut sampler = WeightedSampler::seeded(1);
        for scenario in [EnrollmentScenario::Dual, EnrollmentScenario::Transition] {
            let (resolved, spans) = producer.spans(scenario, &mut sampler).expect("spans");
            assert_eq!(resolved, EnrollmentScenario::Single);
            assert_eq!(spans.len(), 1);
        }
    }

    #[test]
    fn historical_covers_the_prior_year() {
        let producer = producer(&["COMM-GOLD-001"]);
        let mut sampler = WeightedSampler::seeded(2);
        let (_, spans) = producer
            .spans(EnrollmentScenario::Historical, &mut sampler)
            .expect("spans");
        assert_eq!(spans[0].effective, date(2023, 1, 1));
        assert_eq!(spans[0].termination, Some(date(2023, 12, 31)));
        assert!(!spans[0].active);
    }
}
