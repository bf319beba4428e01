use chrono::{Datelike, NaiveDate};

use rxsynth_core::{ColumnSpec, FieldKind, FieldValue, apply_basis_points};
use rxsynth_plan::{DrugPolicy, PriceBand};

use crate::catalog::DrugFamily;
use crate::datasets::reference::capitalize;
use crate::datasets::{DatasetEnv, DatasetProducer, RunContext};
use crate::errors::{GenerationError, Result};
use crate::sampler::{MoneyRange, basis_points};

pub const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("ndc_code", FieldKind::Text),
    ColumnSpec::required("drug_name", FieldKind::Text),
    ColumnSpec::required("generic_name", FieldKind::Text),
    ColumnSpec::required("strength", FieldKind::Text),
    ColumnSpec::required("dosage_form", FieldKind::Text),
    ColumnSpec::required("route", FieldKind::Text),
    ColumnSpec::required("manufacturer", FieldKind::Text),
    ColumnSpec::required("drug_class", FieldKind::Text),
    ColumnSpec::required("therapeutic_category", FieldKind::Text),
    ColumnSpec::required("is_generic", FieldKind::Bool),
    ColumnSpec::required("is_brand", FieldKind::Bool),
    ColumnSpec::required("is_specialty", FieldKind::Bool),
    ColumnSpec::required("is_controlled", FieldKind::Bool),
    ColumnSpec::optional("dea_schedule", FieldKind::Text),
    ColumnSpec::required("awp_price", FieldKind::Money),
    ColumnSpec::required("wac_price", FieldKind::Money),
    ColumnSpec::optional("mac_price", FieldKind::Money),
    ColumnSpec::required("package_size", FieldKind::Int),
    ColumnSpec::required("package_unit", FieldKind::Text),
    ColumnSpec::required("fda_approval_date", FieldKind::Date),
    ColumnSpec::required("is_active", FieldKind::Bool),
];

const THERAPEUTIC_CATEGORIES: &[(&str, f64, &[&str])] = &[
    (
        "CARDIOVASCULAR",
        0.15,
        &["ACE_INHIBITOR", "BETA_BLOCKER", "CALCIUM_CHANNEL_BLOCKER", "DIURETIC", "STATIN", "ANTICOAGULANT"],
    ),
    (
        "ANTIBIOTICS",
        0.12,
        &["PENICILLIN", "CEPHALOSPORIN", "MACROLIDE", "FLUOROQUINOLONE", "TETRACYCLINE"],
    ),
    (
        "CNS",
        0.12,
        &["ANTIDEPRESSANT", "ANTIPSYCHOTIC", "ANXIOLYTIC", "ANTICONVULSANT", "STIMULANT", "OPIOID"],
    ),
    (
        "DIABETES",
        0.08,
        &["INSULIN", "METFORMIN", "SULFONYLUREA", "DPP4_INHIBITOR", "GLP1_AGONIST", "SGLT2_INHIBITOR"],
    ),
    (
        "RESPIRATORY",
        0.08,
        &["BRONCHODILATOR", "CORTICOSTEROID", "ANTIHISTAMINE", "DECONGESTANT"],
    ),
    (
        "GASTROINTESTINAL",
        0.07,
        &["PPI", "H2_BLOCKER", "ANTACID", "ANTIEMETIC", "LAXATIVE"],
    ),
    (
        "PAIN_MANAGEMENT",
        0.10,
        &["NSAID", "OPIOID", "MUSCLE_RELAXANT", "TOPICAL_ANALGESIC"],
    ),
    (
        "ONCOLOGY",
        0.05,
        &["CHEMOTHERAPY", "TARGETED_THERAPY", "IMMUNOTHERAPY", "HORMONE_THERAPY"],
    ),
    ("IMMUNOLOGY", 0.05, &["IMMUNOSUPPRESSANT", "BIOLOGIC", "CORTICOSTEROID"]),
    ("ENDOCRINE", 0.04, &["THYROID", "HORMONE_REPLACEMENT", "OSTEOPOROSIS"]),
    (
        "DERMATOLOGY",
        0.04,
        &["TOPICAL_STEROID", "ANTIFUNGAL", "ACNE_TREATMENT", "PSORIASIS_TREATMENT"],
    ),
    (
        "OPHTHALMOLOGY",
        0.03,
        &["GLAUCOMA", "ANTIBIOTIC_EYE", "ANTI_INFLAMMATORY_EYE"],
    ),
    ("UROLOGY", 0.02, &["BPH_TREATMENT", "OVERACTIVE_BLADDER", "ED_TREATMENT"]),
    ("OTHER", 0.05, &["VITAMIN", "SUPPLEMENT", "ANTIPARASITIC", "ANTIVIRAL"]),
];

/// Classes eligible for a DEA schedule.
const CONTROLLABLE_CLASSES: &[&str] = &["OPIOID", "STIMULANT", "ANXIOLYTIC", "MUSCLE_RELAXANT"];

/// First fifteen are brand houses, last ten generic makers.
const MANUFACTURERS: &[&str] = &[
    "PFIZER",
    "JOHNSON_JOHNSON",
    "ROCHE",
    "NOVARTIS",
    "MERCK",
    "SANOFI",
    "GLAXOSMITHKLINE",
    "ABBVIE",
    "GILEAD",
    "AMGEN",
    "ASTRAZENECA",
    "BRISTOL_MYERS_SQUIBB",
    "ELI_LILLY",
    "BOEHRINGER_INGELHEIM",
    "BAYER",
    "TEVA",
    "MYLAN",
    "SANDOZ",
    "ACTAVIS",
    "DR_REDDY",
    "SUN_PHARMA",
    "LUPIN",
    "CIPLA",
    "AUROBINDO",
    "ZYDUS",
];

const GENERIC_PREFIXES: &[&str] = &[
    "am", "az", "ben", "cef", "cip", "clo", "di", "dox", "en", "flu", "gab", "hyd", "ibu", "ket",
    "lev", "met", "nap", "om", "par", "pred", "pro", "ris", "ser", "sim", "tam", "val", "var",
    "ven", "war", "zol",
];

const GENERIC_SUFFIXES: &[&str] = &[
    "azole", "cillin", "cycline", "dipine", "floxacin", "olol", "prazole", "pril", "sartan",
    "statin", "tidine", "triptan", "vir", "zepam", "zolam",
];

const BRAND_PREFIXES: &[&str] = &[
    "Acti", "Bio", "Cardi", "Derm", "Endo", "Flex", "Gluco", "Hepa", "Immuno", "Keto", "Lipo",
    "Medi", "Neuro", "Onco", "Phar", "Rena", "Sero", "Thera", "Ultra", "Vita", "Xeno", "Zymo",
];

const BRAND_SUFFIXES: &[&str] = &[
    "max", "plus", "pro", "forte", "xr", "cr", "sr", "la", "er", "od", "hct", "duo", "tri",
    "quad", "plex", "care", "guard", "shield",
];

const STRENGTHS: &[(&str, &[&str])] = &[
    ("TABLET", &["5mg", "10mg", "20mg", "25mg", "40mg", "50mg", "100mg", "250mg", "500mg"]),
    ("CAPSULE", &["10mg", "20mg", "25mg", "40mg", "50mg", "75mg", "100mg", "150mg", "200mg"]),
    ("SOLUTION", &["5mg/5ml", "10mg/5ml", "25mg/5ml", "50mg/5ml", "100mg/5ml"]),
    ("INJECTION", &["10mg/ml", "25mg/ml", "50mg/ml", "100mg/ml", "250mg/ml"]),
    ("CREAM", &["0.1%", "0.5%", "1%", "2%", "5%"]),
    ("OINTMENT", &["0.1%", "0.5%", "1%", "2%", "5%"]),
    ("SUSPENSION", &["125mg/5ml", "250mg/5ml", "500mg/5ml"]),
    ("PATCH", &["12mcg/hr", "25mcg/hr", "50mcg/hr", "75mcg/hr", "100mcg/hr"]),
    ("INHALER", &["90mcg", "100mcg", "200mcg", "250mcg"]),
    ("SUPPOSITORY", &["25mg", "50mg", "100mg", "200mg"]),
];

const PACKAGE_SIZES: &[(&str, &[i64])] = &[
    ("TABLET", &[30, 60, 90, 100, 500]),
    ("CAPSULE", &[30, 60, 90, 100, 500]),
    ("SOLUTION", &[100, 120, 240, 480]),
    ("INJECTION", &[1, 5, 10, 25]),
    ("CREAM", &[15, 30, 45, 60]),
    ("OINTMENT", &[15, 30, 45, 60]),
    ("SUSPENSION", &[100, 150, 200]),
    ("PATCH", &[5, 10, 30]),
    ("INHALER", &[1, 2, 3]),
    ("SUPPOSITORY", &[12, 24, 50]),
];

fn lookup<'a, T: ?Sized>(table: &'a [(&str, &'a T)], key: &str) -> Option<&'a T> {
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, value)| *value)
}

struct ResolvedBand {
    awp: MoneyRange,
    wac_bp: u32,
    mac_bp: Option<u32>,
}

impl ResolvedBand {
    fn new(band: &PriceBand) -> Result<Self> {
        Ok(Self {
            awp: MoneyRange::from_range(band.awp)?,
            wac_bp: basis_points(band.wac_ratio)?,
            mac_bp: band.mac_ratio.map(basis_points).transpose()?,
        })
    }
}

pub(crate) struct DrugProducer {
    policy: DrugPolicy,
    family_weights: [f64; 3],
    category_weights: Vec<f64>,
    generic_band: ResolvedBand,
    brand_band: ResolvedBand,
    specialty_band: ResolvedBand,
    last_year: i32,
}

impl DrugProducer {
    pub(crate) fn prepare(env: &DatasetEnv<'_>) -> Result<Self> {
        let policy = env.config.drugs.clone();
        let brand_rate = (1.0 - policy.specialty_rate - policy.generic_rate).max(0.0);
        Ok(Self {
            family_weights: [policy.specialty_rate, policy.generic_rate, brand_rate],
            category_weights: THERAPEUTIC_CATEGORIES
                .iter()
                .map(|(_, weight, _)| *weight)
                .collect(),
            generic_band: ResolvedBand::new(&policy.generic_price)?,
            brand_band: ResolvedBand::new(&policy.brand_price)?,
            specialty_band: ResolvedBand::new(&policy.specialty_price)?,
            last_year: env.reference_date.year(),
            policy,
        })
    }

    fn build_row(&self, sequence: u64, ctx: &mut RunContext<'_>) -> Result<Vec<FieldValue>> {
        let sampler = &mut ctx.sampler;
        let family = match sampler.sample_index(&self.family_weights)? {
            0 => DrugFamily::Specialty,
            1 => DrugFamily::Generic,
            _ => DrugFamily::Brand,
        };
        let is_generic = family == DrugFamily::Generic;
        let is_specialty = family == DrugFamily::Specialty;

        let (category, _, classes) =
            THERAPEUTIC_CATEGORIES[sampler.sample_index(&self.category_weights)?];
        let drug_class = *sampler.choose(classes)?;

        let generic_name = format!(
            "{}{}",
            sampler.choose(GENERIC_PREFIXES)?,
            sampler.choose(GENERIC_SUFFIXES)?
        );
        let drug_name = if is_generic {
            capitalize(&generic_name)
        } else {
            format!(
                "{}{}",
                sampler.choose(BRAND_PREFIXES)?,
                sampler.choose(BRAND_SUFFIXES)?
            )
        };

        let dosage_form = sampler.sample_category(&self.policy.dosage_forms)?.clone();
        let route = sampler.sample_category(&self.policy.routes)?.clone();
        let strength = match lookup(STRENGTHS, &dosage_form) {
            Some(options) => *sampler.choose(options)?,
            None => "10mg",
        };
        let manufacturer = if is_generic {
            *sampler.choose(&MANUFACTURERS[MANUFACTURERS.len() - 10..])?
        } else {
            *sampler.choose(&MANUFACTURERS[..15])?
        };

        let labeler = sampler.sample_int(1, 99_999)?;
        let package = sampler.sample_int(1, 99)?;
        let ndc_code = format!("{labeler:05}-{sequence:04}-{package:02}");

        let package_size = match lookup(PACKAGE_SIZES, &dosage_form) {
            Some(options) => *sampler.choose(options)?,
            None => 30,
        };
        let package_unit = if matches!(dosage_form.as_str(), "TABLET" | "CAPSULE") {
            "EA"
        } else {
            "ML"
        };

        let band = match family {
            DrugFamily::Specialty => &self.specialty_band,
            DrugFamily::Generic => &self.generic_band,
            _ => &self.brand_band,
        };
        let awp = sampler.sample_money(band.awp);
        let wac = apply_basis_points(awp, band.wac_bp);
        let mac = band.mac_bp.map(|bp| apply_basis_points(awp, bp));

        let is_controlled = CONTROLLABLE_CLASSES.contains(&drug_class)
            && sampler.bernoulli(self.policy.controlled_rate);
        let dea_schedule = if is_controlled {
            Some(sampler.sample_category(&self.policy.dea_schedules)?.clone())
        } else {
            None
        };

        let first_year = match family {
            DrugFamily::Specialty => 2010,
            DrugFamily::Generic => 1980,
            _ => 1990,
        };
        let year = sampler.sample_int(i64::from(first_year.min(self.last_year)), i64::from(self.last_year))?;
        let month = sampler.sample_int(1, 12)?;
        let day = sampler.sample_int(1, 28)?;
        let approval = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32).ok_or_else(
            || GenerationError::InvalidConfig(format!("invalid approval date {year}-{month}-{day}")),
        )?;
        let is_active = sampler.bernoulli(self.policy.active_rate);

        ctx.stats.record("family", family.as_str());
        ctx.stats.record("therapeutic_category", category);
        ctx.stats.record("dosage_form", &dosage_form);
        if is_controlled {
            ctx.stats.bump("controlled");
        }

        Ok(vec![
            FieldValue::from(ndc_code),
            FieldValue::from(drug_name),
            FieldValue::from(generic_name),
            FieldValue::from(strength),
            FieldValue::from(dosage_form),
            FieldValue::from(route),
            FieldValue::from(manufacturer),
            FieldValue::from(drug_class),
            FieldValue::from(category),
            FieldValue::from(is_generic),
            FieldValue::from(!is_generic),
            FieldValue::from(is_specialty),
            FieldValue::from(is_controlled),
            FieldValue::from(dea_schedule),
            FieldValue::from(awp),
            FieldValue::from(wac),
            FieldValue::from(mac),
            FieldValue::from(package_size),
            FieldValue::from(package_unit),
            FieldValue::from(approval),
            FieldValue::from(is_active),
        ])
    }
}

impl DatasetProducer for DrugProducer {
    fn produce(&mut self, ctx: &mut RunContext<'_>) -> Result<()> {
        let mut sequence = 0_u64;
        while !ctx.is_full() {
            sequence += 1;
            let row = self.build_row(sequence, ctx)?;
            ctx.write(&row)?;
            ctx.advance();
        }
        Ok(())
    }
}
