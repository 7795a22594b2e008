//! X12 element
//!
//! An element is the smallest unit of an X12 transaction: an identifier (the
//! schema element code, e.g. `NM101`) and a string value. A value containing
//! the composite separator is additionally exposed as ordered sub-values.

use crate::separators::Separators;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single X12 element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    id: String,
    value: String,
    sub_values: Vec<String>,
}

impl Element {
    /// Create an element, splitting composite sub-values with `separators`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyElementId`] when `id` is empty.
    pub fn new(
        id: impl Into<String>,
        value: impl Into<String>,
        separators: &Separators,
    ) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::EmptyElementId);
        }
        let value = value.into();
        let sub_values = split_sub_values(&value, separators);
        Ok(Self {
            id,
            value,
            sub_values,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the value, recomputing composite sub-values.
    pub fn set_value(&mut self, value: impl Into<String>, separators: &Separators) {
        self.value = value.into();
        self.sub_values = split_sub_values(&self.value, separators);
    }

    /// The ordered composite sub-values of this element.
    pub fn sub_values(&self) -> &[String] {
        &self.sub_values
    }

    pub fn num_sub_values(&self) -> usize {
        self.sub_values.len()
    }

    /// The sub-value at `index`, or `None` past the end.
    pub fn sub_value(&self, index: usize) -> Option<&str> {
        self.sub_values.get(index).map(String::as_str)
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

fn split_sub_values(value: &str, separators: &Separators) -> Vec<String> {
    separators
        .split_composite(value)
        .map(|parts| parts.into_iter().map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_element() {
        let sep = Separators::default();
        let element = Element::new("NM101", "85", &sep).unwrap();
        assert_eq!(element.id(), "NM101");
        assert_eq!(element.value(), "85");
        assert_eq!(element.sub_values(), ["85"]);
    }

    #[test]
    fn test_composite_element() {
        let sep = Separators::default();
        let element = Element::new("SV101", "HC:99213:25", &sep).unwrap();
        assert_eq!(element.num_sub_values(), 3);
        assert_eq!(element.sub_value(0), Some("HC"));
        assert_eq!(element.sub_value(1), Some("99213"));
        assert_eq!(element.sub_value(2), Some("25"));
        assert_eq!(element.sub_value(3), None);
    }

    #[test]
    fn test_empty_id_rejected() {
        let sep = Separators::default();
        assert_eq!(
            Element::new("", "value", &sep).unwrap_err(),
            Error::EmptyElementId
        );
    }

    #[test]
    fn test_set_value_recomputes_sub_values() {
        let sep = Separators::default();
        let mut element = Element::new("SV101", "HC:99213", &sep).unwrap();
        element.set_value("AD:D0120", &sep);
        assert_eq!(element.value(), "AD:D0120");
        assert_eq!(element.sub_values(), ["AD", "D0120"]);
    }

    #[test]
    fn test_display_is_raw_value() {
        let sep = Separators::default();
        let element = Element::new("SV101", "HC:99213", &sep).unwrap();
        assert_eq!(element.to_string(), "HC:99213");
    }
}
