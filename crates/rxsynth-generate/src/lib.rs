//! Dataset generation for rxsynth.
//!
//! Each dataset is produced by a seeded producer that reads upstream shards
//! from the input directory, derives attributes from the run configuration,
//! and streams rows into size-capped CSV shards.

pub mod catalog;
pub mod datasets;
pub mod derive;
pub mod engine;
pub mod errors;
pub mod model;
pub mod output;
pub mod sampler;
pub mod selector;
pub mod source;

pub use catalog::{
    ClaimHeader, ClaimSet, Drug, DrugCatalog, DrugCategory, DrugFamily, Formulary, FormularySet,
    KeyPool,
};
pub use datasets::{RunContext, dataset_columns, dataset_schema, record_target};
pub use derive::{AttributeDeriver, FormularyStatus, LinePricing, UtilizationFlags};
pub use engine::{GenerationEngine, GenerationResult, pipeline_order};
pub use errors::GenerationError;
pub use model::{DatasetStats, GenerateOptions, GenerationReport};
pub use output::{PartitionedWriter, ShardSummary};
pub use sampler::WeightedSampler;
pub use selector::{EntitySelector, RuleKind, RuleTarget, SelectionRule};
