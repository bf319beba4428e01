use chrono::{Duration, NaiveDate};
use fake::Fake;
use fake::faker::address::en::{BuildingNumber, CityName, StreetName};
use fake::faker::internet::en::FreeEmailProvider;
use fake::faker::name::en::{FirstName, LastName};

use rxsynth_core::{ColumnSpec, FieldKind, FieldValue};
use rxsynth_plan::MemberPolicy;

use crate::datasets::reference::{STATE_WEIGHTS, phone_parts, zip_code};
use crate::datasets::{DatasetEnv, DatasetProducer, RunContext};
use crate::errors::Result;
use crate::sampler::WeightedSampler;

pub const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("member_number", FieldKind::Text),
    ColumnSpec::required("first_name", FieldKind::Text),
    ColumnSpec::required("last_name", FieldKind::Text),
    ColumnSpec::required("date_of_birth", FieldKind::Date),
    ColumnSpec::required("gender", FieldKind::Text),
    ColumnSpec::required("address", FieldKind::Text),
    ColumnSpec::required("city", FieldKind::Text),
    ColumnSpec::required("state", FieldKind::Text),
    ColumnSpec::required("zip_code", FieldKind::Text),
    ColumnSpec::required("phone", FieldKind::Text),
    ColumnSpec::required("email", FieldKind::Text),
];

pub(crate) struct MemberProducer {
    policy: MemberPolicy,
    bracket_weights: Vec<f64>,
    reference_date: NaiveDate,
}

impl MemberProducer {
    pub(crate) fn prepare(env: &DatasetEnv<'_>) -> Result<Self> {
        let policy = env.config.members.clone();
        Ok(Self {
            bracket_weights: policy.age_brackets.iter().map(|b| b.weight).collect(),
            policy,
            reference_date: env.reference_date,
        })
    }

    fn date_of_birth(&self, sampler: &mut WeightedSampler) -> Result<(u32, NaiveDate)> {
        let bracket = &self.policy.age_brackets[sampler.sample_index(&self.bracket_weights)?];
        let age = sampler.sample_int(i64::from(bracket.min_age), i64::from(bracket.max_age))?;
        let days = age * 365 + sampler.sample_int(0, 364)?;
        Ok((age as u32, self.reference_date - Duration::days(days)))
    }
}

fn email_local(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

impl DatasetProducer for MemberProducer {
    fn produce(&mut self, ctx: &mut RunContext<'_>) -> Result<()> {
        let mut sequence = 0_u64;
        while !ctx.is_full() {
            sequence += 1;
            let sampler = &mut ctx.sampler;

            let first_name: String = FirstName().fake_with_rng(sampler.rng());
            let last_name: String = LastName().fake_with_rng(sampler.rng());
            let (age, date_of_birth) = self.date_of_birth(sampler)?;
            let gender = sampler.sample_category(&self.policy.genders)?.clone();

            let state = *sampler.sample_pair(STATE_WEIGHTS)?;
            let building: String = BuildingNumber().fake_with_rng(sampler.rng());
            let street: String = StreetName().fake_with_rng(sampler.rng());
            let address = format!("{building} {street}").replace(',', "");
            let city = CityName()
                .fake_with_rng::<String, _>(sampler.rng())
                .replace(',', "");
            let zip = zip_code(state, sampler)?;
            let (area, exchange, line) = phone_parts(sampler)?;

            let provider: String = FreeEmailProvider().fake_with_rng(sampler.rng());
            let email = format!(
                "{}.{}{}@{}",
                email_local(&first_name),
                email_local(&last_name),
                sampler.sample_int(1, 999)?,
                provider.to_lowercase()
            );

            ctx.stats.record("gender", &gender);
            ctx.stats.record("state", state);
            ctx.stats.record("age_decade", &format!("{}0s", age / 10));

            let row = vec![
                FieldValue::from(format!("MBR{sequence:09}")),
                FieldValue::from(first_name),
                FieldValue::from(last_name),
                FieldValue::from(date_of_birth),
                FieldValue::from(gender),
                FieldValue::from(address),
                FieldValue::from(city),
                FieldValue::from(state),
                FieldValue::from(zip),
                FieldValue::from(format!("{area}-{exchange}-{line}")),
                FieldValue::from(email),
            ];
            ctx.write(&row)?;
            ctx.advance();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::email_local;

    #[test]
    fn email_local_part_is_plain_ascii() {
        assert_eq!(email_local("D'Angelo"), "dangelo");
        assert_eq!(email_local("Mary-Kate"), "marykate");
    }
}
