//! Core contracts shared by the rxsynth crates.
//!
//! This crate defines the dataset catalog, the explicit ordered row schema
//! used by every producer and writer, the serialized field value, and the
//! fixed-point money helpers.

pub mod dataset;
pub mod error;
pub mod money;
pub mod schema;
pub mod value;

pub use dataset::DatasetKind;
pub use error::{Error, Result};
pub use money::{apply_basis_points, money_from_cents, money_from_f64, round_money, to_cents};
pub use schema::{ColumnSpec, FieldKind, RowSchema};
pub use value::FieldValue;
