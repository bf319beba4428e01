//! Run configuration for rxsynth.
//!
//! Every probability, range, and target used by the generators lives here as
//! data. Configurations load from TOML, validate structurally against the
//! emitted JSON Schema, then semantically (rates, ranges, weights).

pub mod errors;
pub mod load;
pub mod model;
pub mod schema;
pub mod validate;

pub use errors::{IssueSeverity, PlanError, Result, ValidationIssue, ValidationReport};
pub use load::{config_value_from_toml, load_config, parse_config, render_config};
pub use model::*;
pub use schema::config_json_schema;
pub use validate::{ValidatedConfig, validate_config, validate_config_json, validate_semantics};
