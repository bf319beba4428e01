use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use rxsynth_core::DatasetKind;

use crate::errors::{GenerationError, Result};
use crate::sampler::WeightedSampler;
use crate::source::{CsvSource, SourceRow, SourceRows};

/// Pricing family of a drug, read from its generic/brand/specialty flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrugFamily {
    Generic,
    Brand,
    Specialty,
    Unclassified,
}

impl DrugFamily {
    /// Generic wins over specialty, specialty over brand.
    pub fn from_flags(is_generic: bool, is_brand: bool, is_specialty: bool) -> Self {
        if is_generic {
            DrugFamily::Generic
        } else if is_specialty {
            DrugFamily::Specialty
        } else if is_brand {
            DrugFamily::Brand
        } else {
            DrugFamily::Unclassified
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DrugFamily::Generic => "generic",
            DrugFamily::Brand => "brand",
            DrugFamily::Specialty => "specialty",
            DrugFamily::Unclassified => "unclassified",
        }
    }
}

/// One catalog drug, carrying only what downstream datasets need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drug {
    pub ndc_code: String,
    pub drug_name: String,
    pub generic_name: String,
    pub family: DrugFamily,
    pub drug_class: String,
    pub dosage_form: String,
    pub route: String,
    pub protected: bool,
}

impl Drug {
    pub fn new(ndc_code: impl Into<String>, family: DrugFamily, drug_class: impl Into<String>) -> Self {
        let ndc_code = ndc_code.into();
        Self {
            drug_name: ndc_code.clone(),
            generic_name: ndc_code.clone(),
            ndc_code,
            family,
            drug_class: drug_class.into(),
            dosage_form: "TABLET".to_string(),
            route: "ORAL".to_string(),
            protected: false,
        }
    }

    pub fn with_name(mut self, drug_name: impl Into<String>) -> Self {
        self.drug_name = drug_name.into();
        self
    }

    pub fn with_dosage_form(mut self, dosage_form: impl Into<String>) -> Self {
        self.dosage_form = dosage_form.into();
        self
    }

    fn from_row(row: &SourceRow) -> Result<Self> {
        let family = DrugFamily::from_flags(
            row.flag("is_generic")?,
            row.flag("is_brand")?,
            row.flag("is_specialty")?,
        );
        let ndc_code = row.get("ndc_code")?;
        if ndc_code.is_empty() {
            return Err(row.invalid("ndc_code", ndc_code, "empty identifier"));
        }
        Ok(Self {
            ndc_code: ndc_code.to_string(),
            drug_name: row.get("drug_name")?.to_string(),
            generic_name: row.get("generic_name")?.to_string(),
            family,
            drug_class: row.get("drug_class")?.to_string(),
            dosage_form: row.get("dosage_form")?.to_string(),
            route: row.get("route")?.to_string(),
            protected: false,
        })
    }
}

/// Index into the catalog partitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DrugCategory {
    All,
    Generic,
    Brand,
    Specialty,
    Protected,
    DosageForm(String),
    Route(String),
}

/// In-memory drug catalog with precomputed category partitions.
#[derive(Debug, Clone)]
pub struct DrugCatalog {
    drugs: Vec<Drug>,
    by_ndc: HashMap<String, usize>,
    all: Vec<usize>,
    generic: Vec<usize>,
    brand: Vec<usize>,
    specialty: Vec<usize>,
    protected: Vec<usize>,
    by_form: BTreeMap<String, Vec<usize>>,
    by_route: BTreeMap<String, Vec<usize>>,
}

impl DrugCatalog {
    /// Load every drug shard from `dir`.
    pub fn load(dir: &Path, protected_classes: &[String]) -> Result<Self> {
        let source = CsvSource::discover(
            dir,
            DatasetKind::Drugs.as_str(),
            DatasetKind::Drugs.file_prefix(),
        )?;
        let mut drugs = Vec::new();
        for row in source.rows() {
            drugs.push(Drug::from_row(&row?)?);
        }
        if drugs.is_empty() {
            return Err(GenerationError::EmptyReference {
                dataset: source.dataset().to_string(),
            });
        }
        Self::from_drugs(drugs, protected_classes)
    }

    /// Build a catalog, marking drugs whose class is protected.
    pub fn from_drugs(mut drugs: Vec<Drug>, protected_classes: &[String]) -> Result<Self> {
        let protected_set: HashSet<&str> = protected_classes.iter().map(String::as_str).collect();
        let mut catalog = Self {
            drugs: Vec::with_capacity(drugs.len()),
            by_ndc: HashMap::with_capacity(drugs.len()),
            all: Vec::with_capacity(drugs.len()),
            generic: Vec::new(),
            brand: Vec::new(),
            specialty: Vec::new(),
            protected: Vec::new(),
            by_form: BTreeMap::new(),
            by_route: BTreeMap::new(),
        };

        for (idx, drug) in drugs.iter_mut().enumerate() {
            drug.protected = protected_set.contains(drug.drug_class.as_str());
            if catalog.by_ndc.insert(drug.ndc_code.clone(), idx).is_some() {
                return Err(GenerationError::InvalidField {
                    file: DatasetKind::Drugs.file_prefix().to_string(),
                    line: idx as u64 + 2,
                    column: "ndc_code".to_string(),
                    value: drug.ndc_code.clone(),
                    reason: "duplicate identifier".to_string(),
                });
            }
            catalog.all.push(idx);
            match drug.family {
                DrugFamily::Generic => catalog.generic.push(idx),
                DrugFamily::Brand => catalog.brand.push(idx),
                DrugFamily::Specialty => catalog.specialty.push(idx),
                DrugFamily::Unclassified => {}
            }
            if drug.protected {
                catalog.protected.push(idx);
            }
            catalog
                .by_form
                .entry(drug.dosage_form.clone())
                .or_default()
                .push(idx);
            catalog
                .by_route
                .entry(drug.route.clone())
                .or_default()
                .push(idx);
        }
        catalog.drugs = drugs;
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.drugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drugs.is_empty()
    }

    pub fn drug(&self, idx: usize) -> &Drug {
        &self.drugs[idx]
    }

    pub fn by_id(&self, ndc_code: &str) -> Result<&Drug> {
        self.index_of(ndc_code).map(|idx| &self.drugs[idx])
    }

    /// Catalog index of an NDC.
    pub fn index_of(&self, ndc_code: &str) -> Result<usize> {
        self.by_ndc
            .get(ndc_code)
            .copied()
            .ok_or_else(|| GenerationError::NotFound(ndc_code.to_string()))
    }

    /// Catalog indices of a category, in catalog order.
    pub fn category_indices(&self, category: &DrugCategory) -> &[usize] {
        match category {
            DrugCategory::All => &self.all,
            DrugCategory::Generic => &self.generic,
            DrugCategory::Brand => &self.brand,
            DrugCategory::Specialty => &self.specialty,
            DrugCategory::Protected => &self.protected,
            DrugCategory::DosageForm(form) => {
                self.by_form.get(form).map(Vec::as_slice).unwrap_or(&[])
            }
            DrugCategory::Route(route) => {
                self.by_route.get(route).map(Vec::as_slice).unwrap_or(&[])
            }
        }
    }

    pub fn by_category<'a>(&'a self, category: &DrugCategory) -> impl Iterator<Item = &'a Drug> + use<'a> {
        self.category_indices(category)
            .iter()
            .map(move |idx| &self.drugs[*idx])
    }
}

/// Parent formulary as read back from the formularies dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formulary {
    pub formulary_code: String,
    pub market_segment: String,
    pub formulary_type: String,
    pub tier_count: u8,
}

impl Formulary {
    fn from_row(row: &SourceRow) -> Result<Self> {
        let tier_count: u8 = row.parse("tier_count")?;
        if tier_count == 0 {
            return Err(row.invalid("tier_count", "0", "tier count must be positive"));
        }
        Ok(Self {
            formulary_code: row.get("formulary_code")?.to_string(),
            market_segment: row.get("market_segment")?.to_string(),
            formulary_type: row.get("formulary_type")?.to_string(),
            tier_count,
        })
    }
}

/// Formularies read back from the formularies dataset, in file order.
#[derive(Debug, Clone)]
pub struct FormularySet {
    formularies: Vec<Formulary>,
}

impl FormularySet {
    pub fn load(dir: &Path) -> Result<Self> {
        let source = CsvSource::discover(
            dir,
            DatasetKind::Formularies.as_str(),
            DatasetKind::Formularies.file_prefix(),
        )?;
        let mut formularies = Vec::new();
        for row in source.rows() {
            formularies.push(Formulary::from_row(&row?)?);
        }
        Self::new(formularies)
    }

    pub fn new(formularies: Vec<Formulary>) -> Result<Self> {
        if formularies.is_empty() {
            return Err(GenerationError::EmptyReference {
                dataset: DatasetKind::Formularies.as_str().to_string(),
            });
        }
        Ok(Self { formularies })
    }

    pub fn len(&self) -> usize {
        self.formularies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formularies.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Formulary> {
        self.formularies.iter()
    }
}

/// Identifier column of an upstream dataset, used for foreign-key picks.
#[derive(Debug, Clone)]
pub struct KeyPool {
    dataset: &'static str,
    keys: Vec<String>,
}

impl KeyPool {
    pub fn load(dir: &Path, dataset: DatasetKind, column: &str) -> Result<Self> {
        let source = CsvSource::discover(dir, dataset.as_str(), dataset.file_prefix())?;
        let mut keys = Vec::new();
        for row in source.rows() {
            let row = row?;
            let key = row.get(column)?;
            if key.is_empty() {
                return Err(row.invalid(column, key, "empty identifier"));
            }
            keys.push(key.to_string());
        }
        Self::from_keys(dataset.as_str(), keys)
    }

    pub fn from_keys(dataset: &'static str, keys: Vec<String>) -> Result<Self> {
        if keys.is_empty() {
            return Err(GenerationError::EmptyReference {
                dataset: dataset.to_string(),
            });
        }
        Ok(Self { dataset, keys })
    }

    pub fn dataset(&self) -> &str {
        self.dataset
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn choose(&self, sampler: &mut WeightedSampler) -> Result<&str> {
        sampler.choose(&self.keys).map(String::as_str)
    }
}

/// Claim header fields that claim lines inherit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimHeader {
    pub claim_number: String,
    pub date_of_service: NaiveDate,
    pub ndc: String,
    pub quantity_dispensed: u32,
    pub days_supply: u32,
    pub prescription_number: String,
    pub refill_number: u32,
    pub prescriber_npi: String,
    pub ingredient_cost: Decimal,
    pub dispensing_fee: Decimal,
}

impl ClaimHeader {
    fn from_row(row: &SourceRow) -> Result<Self> {
        let raw_date = row.get("date_of_service")?;
        let date_of_service = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
            .map_err(|err| row.invalid("date_of_service", raw_date, err))?;
        Ok(Self {
            claim_number: row.get("claim_number")?.to_string(),
            date_of_service,
            ndc: row.get("ndc")?.to_string(),
            quantity_dispensed: row.parse("quantity_dispensed")?,
            days_supply: row.parse("days_supply")?,
            prescription_number: row.get("prescription_number")?.to_string(),
            refill_number: row.parse("refill_number")?,
            prescriber_npi: row.get("prescriber_npi")?.to_string(),
            ingredient_cost: row.parse("ingredient_cost_submitted")?,
            dispensing_fee: row.parse("dispensing_fee_submitted")?,
        })
    }
}

/// Claim headers streamed from the claims dataset.
///
/// Claims are far larger than the other reference sets, so they are read
/// lazily rather than held in memory.
#[derive(Debug, Clone)]
pub struct ClaimSet {
    source: CsvSource,
}

impl ClaimSet {
    /// Locate the claim shards and check that at least one row exists.
    pub fn open(dir: &Path) -> Result<Self> {
        let source = CsvSource::discover(
            dir,
            DatasetKind::Claims.as_str(),
            DatasetKind::Claims.file_prefix(),
        )?;
        source.ensure_not_empty()?;
        Ok(Self { source })
    }

    pub fn iter(&self) -> ClaimHeaders {
        ClaimHeaders {
            rows: self.source.rows(),
        }
    }
}

pub struct ClaimHeaders {
    rows: SourceRows,
}

impl Iterator for ClaimHeaders {
    type Item = Result<ClaimHeader>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(row.and_then(|row| ClaimHeader::from_row(&row)))
    }
}
