use std::borrow::Cow;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::money::round_money;
use crate::schema::FieldKind;

/// A single serialized cell of a generated row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent optional value, written as an empty string.
    Empty,
    Text(String),
    Int(i64),
    Bool(bool),
    /// Fixed-point amount, always written with two decimals.
    Money(Decimal),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    /// Kind of the value, `None` for `Empty`.
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            FieldValue::Empty => None,
            FieldValue::Text(_) => Some(FieldKind::Text),
            FieldValue::Int(_) => Some(FieldKind::Int),
            FieldValue::Bool(_) => Some(FieldKind::Bool),
            FieldValue::Money(_) => Some(FieldKind::Money),
            FieldValue::Date(_) => Some(FieldKind::Date),
            FieldValue::Timestamp(_) => Some(FieldKind::Timestamp),
        }
    }

    /// Render the value exactly as it appears in a CSV cell (before quoting).
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Empty => Cow::Borrowed(""),
            FieldValue::Text(value) => Cow::Borrowed(value.as_str()),
            FieldValue::Int(value) => Cow::Owned(value.to_string()),
            FieldValue::Bool(true) => Cow::Borrowed("true"),
            FieldValue::Bool(false) => Cow::Borrowed("false"),
            FieldValue::Money(value) => Cow::Owned(round_money(*value).to_string()),
            FieldValue::Date(value) => Cow::Owned(value.format("%Y-%m-%d").to_string()),
            FieldValue::Timestamp(value) => {
                Cow::Owned(value.format("%Y-%m-%d %H:%M:%S").to_string())
            }
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<u8> for FieldValue {
    fn from(value: u8) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Money(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_booleans_lowercase_and_empty_as_blank() {
        assert_eq!(FieldValue::Bool(true).render(), "true");
        assert_eq!(FieldValue::Bool(false).render(), "false");
        assert_eq!(FieldValue::from(None::<u32>).render(), "");
    }

    #[test]
    fn renders_money_with_two_decimals() {
        assert_eq!(FieldValue::Money(Decimal::new(42, 0)).render(), "42.00");
        assert_eq!(FieldValue::Money(Decimal::new(12345, 3)).render(), "12.34");
        assert_eq!(FieldValue::Money(Decimal::new(12355, 3)).render(), "12.36");
    }
}
