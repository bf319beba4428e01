use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::errors::Result;
use crate::model::RunConfig;

/// Parse a TOML configuration; missing sections fall back to defaults.
pub fn parse_config(text: &str) -> Result<RunConfig> {
    Ok(toml::from_str(text)?)
}

pub fn load_config(path: &Path) -> Result<RunConfig> {
    let text = fs::read_to_string(path)?;
    parse_config(&text)
}

pub fn render_config(config: &RunConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

/// Convert TOML text to a JSON document for structural validation.
pub fn config_value_from_toml(text: &str) -> Result<Value> {
    let value: toml::Value = toml::from_str(text)?;
    Ok(serde_json::to_value(value)?)
}
