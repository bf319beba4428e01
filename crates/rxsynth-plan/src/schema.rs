use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::model::RunConfig;

/// Emit the JSON Schema for the run configuration.
pub fn config_json_schema() -> RootSchema {
    schema_for!(RunConfig)
}
