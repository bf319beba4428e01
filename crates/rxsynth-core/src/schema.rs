use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::FieldValue;

/// Logical type of a column in an output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Int,
    Bool,
    Money,
    Date,
    Timestamp,
}

/// One column of a dataset schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Whether the column may carry an empty value.
    pub nullable: bool,
}

impl ColumnSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: true,
        }
    }
}

/// Explicit ordered column list shared by row producers and the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSchema {
    name: String,
    columns: Vec<ColumnSpec>,
}

impl RowSchema {
    /// Build and validate a schema.
    ///
    /// Column names must be non-empty, unique, and free of characters that
    /// would force quoting in a header line.
    pub fn new(name: impl Into<String>, columns: &[ColumnSpec]) -> Result<Self> {
        let name = name.into();
        if columns.is_empty() {
            return Err(Error::InvalidSchema(format!("schema '{name}' has no columns")));
        }

        let mut seen = BTreeSet::new();
        for column in columns {
            if column.name.trim().is_empty() {
                return Err(Error::InvalidSchema(format!(
                    "schema '{name}' has an empty column name"
                )));
            }
            if column
                .name
                .chars()
                .any(|ch| matches!(ch, ',' | '"' | '\n' | '\r'))
            {
                return Err(Error::InvalidSchema(format!(
                    "column '{}' in schema '{name}' contains a reserved character",
                    column.name
                )));
            }
            if !seen.insert(column.name) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate column name: {name}.{}",
                    column.name
                )));
            }
        }

        Ok(Self {
            name,
            columns: columns.to_vec(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn header(&self) -> Vec<&'static str> {
        self.columns.iter().map(|column| column.name).collect()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|spec| spec.name == column)
    }

    /// Check a row's arity and per-column kinds.
    pub fn check_row(&self, row: &[FieldValue]) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::SchemaMismatch(format!(
                "{}: expected {} fields, got {}",
                self.name,
                self.columns.len(),
                row.len()
            )));
        }

        for (spec, value) in self.columns.iter().zip(row) {
            match value.kind() {
                None if spec.nullable => {}
                None => {
                    return Err(Error::SchemaMismatch(format!(
                        "{}.{} is required but empty",
                        self.name, spec.name
                    )));
                }
                Some(kind) if kind == spec.kind => {}
                Some(kind) => {
                    return Err(Error::SchemaMismatch(format!(
                        "{}.{} expects {:?}, got {:?}",
                        self.name, spec.name, spec.kind, kind
                    )));
                }
            }
        }

        Ok(())
    }
}
