use tracing::debug;

use rxsynth_core::{ColumnSpec, FieldKind, FieldValue};
use rxsynth_plan::FormularyDrugPolicy;

use crate::catalog::{DrugCatalog, Formulary, FormularySet};
use crate::datasets::{DatasetEnv, DatasetProducer, RunContext};
use crate::derive::AttributeDeriver;
use crate::errors::Result;
use crate::selector::{EntitySelector, formulary_rules};

pub const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("formulary_drug_id", FieldKind::Text),
    ColumnSpec::required("formulary_code", FieldKind::Text),
    ColumnSpec::required("ndc_code", FieldKind::Text),
    ColumnSpec::required("tier", FieldKind::Int),
    ColumnSpec::required("status", FieldKind::Text),
    ColumnSpec::required("requires_prior_auth", FieldKind::Bool),
    ColumnSpec::required("requires_step_therapy", FieldKind::Bool),
    ColumnSpec::optional("quantity_limit", FieldKind::Int),
    ColumnSpec::optional("days_supply_limit", FieldKind::Int),
];

pub(crate) struct FormularyDrugProducer {
    policy: FormularyDrugPolicy,
    catalog: DrugCatalog,
    formularies: FormularySet,
    deriver: AttributeDeriver,
}

impl FormularyDrugProducer {
    pub(crate) fn prepare(env: &DatasetEnv<'_>) -> Result<Self> {
        let policy = env.config.formulary_drugs.clone();
        let catalog = DrugCatalog::load(env.input_dir, &policy.protected_classes)?;
        let formularies = FormularySet::load(env.input_dir)?;
        debug!(
            drugs = catalog.len(),
            formularies = formularies.len(),
            "formulary inputs loaded"
        );
        Ok(Self {
            deriver: AttributeDeriver::from_config(env.config)?,
            policy,
            catalog,
            formularies,
        })
    }

    fn write_formulary(&self, formulary: &Formulary, ctx: &mut RunContext<'_>) -> Result<()> {
        let range = self.policy.target_for(&formulary.formulary_type);
        let target = ctx
            .sampler
            .sample_int(i64::from(range.min), i64::from(range.max))? as usize;
        let rules = formulary_rules(&self.policy, formulary);
        let selection =
            EntitySelector::new(&self.catalog).select_children(target, &rules, &mut ctx.sampler);
        for outcome in &selection.outcomes {
            ctx.stats
                .add(&format!("rule.{}.added", outcome.name), outcome.added as u64);
        }

        for idx in selection.ids {
            if ctx.is_full() {
                return Ok(());
            }
            let drug = self.catalog.drug(idx);
            let sampler = &mut ctx.sampler;
            let tier = self.deriver.derive_tier(drug, formulary.tier_count, sampler);
            let flags = self.deriver.derive_utilization_flags(drug, tier, sampler)?;
            let status = self.deriver.derive_status(tier, sampler);
            let id = sampler.uuid();

            ctx.stats.record("tier", &tier.to_string());
            ctx.stats.record("status", status.as_str());
            if flags.prior_auth {
                ctx.stats.bump("prior_auth");
            }
            if flags.step_therapy {
                ctx.stats.bump("step_therapy");
            }
            if flags.quantity_limit.is_some() {
                ctx.stats.bump("quantity_limit");
            }

            let row = vec![
                FieldValue::from(id.to_string()),
                FieldValue::from(formulary.formulary_code.as_str()),
                FieldValue::from(drug.ndc_code.as_str()),
                FieldValue::from(tier),
                FieldValue::from(status.as_str()),
                FieldValue::from(flags.prior_auth),
                FieldValue::from(flags.step_therapy),
                FieldValue::from(flags.quantity_limit),
                FieldValue::from(flags.days_supply_limit),
            ];
            ctx.write(&row)?;
        }
        Ok(())
    }
}

impl DatasetProducer for FormularyDrugProducer {
    fn produce(&mut self, ctx: &mut RunContext<'_>) -> Result<()> {
        for formulary in self.formularies.iter() {
            if ctx.is_full() {
                break;
            }
            self.write_formulary(formulary, ctx)?;
            ctx.stats.bump("formularies");
            ctx.advance();
        }
        Ok(())
    }
}
