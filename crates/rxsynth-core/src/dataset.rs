use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Datasets the generator can fabricate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetKind {
    Drugs,
    Members,
    Pharmacies,
    Formularies,
    FormularyDrugs,
    PlanRules,
    Enrollments,
    PharmacyNetworks,
    Claims,
    ClaimLines,
    DrugInteractions,
}

impl DatasetKind {
    /// All datasets in dependency order.
    pub const ALL: [DatasetKind; 11] = [
        DatasetKind::Drugs,
        DatasetKind::Members,
        DatasetKind::Pharmacies,
        DatasetKind::Formularies,
        DatasetKind::FormularyDrugs,
        DatasetKind::PlanRules,
        DatasetKind::Enrollments,
        DatasetKind::PharmacyNetworks,
        DatasetKind::Claims,
        DatasetKind::ClaimLines,
        DatasetKind::DrugInteractions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DatasetKind::Drugs => "drugs",
            DatasetKind::Members => "members",
            DatasetKind::Pharmacies => "pharmacies",
            DatasetKind::Formularies => "formularies",
            DatasetKind::FormularyDrugs => "formulary-drugs",
            DatasetKind::PlanRules => "plan-rules",
            DatasetKind::Enrollments => "enrollments",
            DatasetKind::PharmacyNetworks => "pharmacy-networks",
            DatasetKind::Claims => "claims",
            DatasetKind::ClaimLines => "claim-lines",
            DatasetKind::DrugInteractions => "drug-interactions",
        }
    }

    /// File prefix for output shards of this dataset.
    pub fn file_prefix(self) -> &'static str {
        match self {
            DatasetKind::Drugs => "us_pharmacy_drugs",
            DatasetKind::Members => "us_pharmacy_members",
            DatasetKind::Pharmacies => "us_pharmacy_pharmacies",
            DatasetKind::Formularies => "us_pharmacy_formularies",
            DatasetKind::FormularyDrugs => "us_pharmacy_formularies_drugs",
            DatasetKind::PlanRules => "us_pharmacy_plan_rules",
            DatasetKind::Enrollments => "us_pharmacy_enrollments",
            DatasetKind::PharmacyNetworks => "us_pharmacy_pharmacy_networks",
            DatasetKind::Claims => "us_pharmacy_claims",
            DatasetKind::ClaimLines => "us_pharmacy_claim_lines",
            DatasetKind::DrugInteractions => "us_pharmacy_drug_interactions",
        }
    }

    /// Upstream datasets that must already exist in the input directory.
    pub fn requires(self) -> &'static [DatasetKind] {
        match self {
            DatasetKind::Drugs
            | DatasetKind::Members
            | DatasetKind::Pharmacies
            | DatasetKind::Formularies
            | DatasetKind::PlanRules => &[],
            DatasetKind::FormularyDrugs => &[DatasetKind::Drugs, DatasetKind::Formularies],
            DatasetKind::Enrollments => &[DatasetKind::Members],
            DatasetKind::PharmacyNetworks => &[DatasetKind::Pharmacies],
            DatasetKind::Claims => &[
                DatasetKind::Members,
                DatasetKind::Pharmacies,
                DatasetKind::Drugs,
            ],
            DatasetKind::ClaimLines => &[DatasetKind::Claims, DatasetKind::Drugs],
            DatasetKind::DrugInteractions => &[DatasetKind::Drugs],
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        DatasetKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| Error::UnknownDataset(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_snake_and_kebab_names() {
        assert_eq!(
            "formulary_drugs".parse::<DatasetKind>().expect("parse"),
            DatasetKind::FormularyDrugs
        );
        assert_eq!(
            "Claim-Lines".parse::<DatasetKind>().expect("parse"),
            DatasetKind::ClaimLines
        );
        assert!("plans".parse::<DatasetKind>().is_err());
    }

    #[test]
    fn plan_and_network_datasets_parse() {
        for (name, kind) in [
            ("plan-rules", DatasetKind::PlanRules),
            ("enrollments", DatasetKind::Enrollments),
            ("pharmacy_networks", DatasetKind::PharmacyNetworks),
        ] {
            assert_eq!(name.parse::<DatasetKind>().expect("parse"), kind);
            assert!(DatasetKind::ALL.contains(&kind));
        }
    }

    #[test]
    fn file_prefixes_are_distinct() {
        let mut prefixes: Vec<&str> = DatasetKind::ALL.iter().map(|kind| kind.file_prefix()).collect();
        prefixes.sort();
        prefixes.dedup();
        assert_eq!(prefixes.len(), DatasetKind::ALL.len());
    }

    #[test]
    fn serializes_with_cli_names() {
        let json = serde_json::to_string(&DatasetKind::ClaimLines).expect("serialize");
        assert_eq!(json, "\"claim-lines\"");
    }

    #[test]
    fn dependencies_precede_dependents() {
        for (idx, kind) in DatasetKind::ALL.iter().enumerate() {
            for required in kind.requires() {
                let pos = DatasetKind::ALL
                    .iter()
                    .position(|candidate| candidate == required)
                    .expect("required dataset listed");
                assert!(pos < idx, "{required} must run before {kind}");
            }
        }
    }
}
