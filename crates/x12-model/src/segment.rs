//! X12 segment
//!
//! A segment is one delimited line of a transaction, identified by its first
//! token. Element identifiers follow the X12 reference-designator convention:
//! the segment id plus the 1-based element position, zero-padded to two
//! digits (`ISA01`, `ISA16`, `SV109`, `SV110`).

use crate::element::Element;
use crate::separators::Separators;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single X12 segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    id: String,
    elements: Vec<Element>,
}

impl Segment {
    /// Create an empty segment with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            elements: Vec::new(),
        }
    }

    /// Build a segment from a raw delimited line, e.g. `NM1*85*2*CLINIC`.
    ///
    /// The first token becomes the segment id; the remaining tokens become
    /// elements with generated reference designators.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementSeparatorDisabled`] when `separators` has no
    /// element separator.
    pub fn from_line(line: &str, separators: &Separators) -> Result<Self> {
        let tokens = separators
            .split_element(line)
            .ok_or(Error::ElementSeparatorDisabled)?;

        let Some((id, values)) = tokens.split_first() else {
            return Ok(Self::new(""));
        };

        let mut segment = Self::new(*id);
        for (i, value) in values.iter().enumerate() {
            let element_id = format!("{}{:02}", segment.id, i + 1);
            // the generated id is never empty, so construction cannot fail
            if let Ok(element) = Element::new(element_id, *value, separators) {
                segment.elements.push(element);
            }
        }
        Ok(segment)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Number of elements in the segment.
    pub fn size(&self) -> usize {
        self.elements.len()
    }

    /// Append an element.
    pub fn add_element(&mut self, element: Element) {
        self.elements.push(element);
    }

    /// Append an element built from an id and value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyElementId`] when `id` is empty.
    pub fn add_element_value(
        &mut self,
        id: impl Into<String>,
        value: impl Into<String>,
        separators: &Separators,
    ) -> Result<()> {
        self.elements.push(Element::new(id, value, separators)?);
        Ok(())
    }

    /// The element with the given reference designator.
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    /// The value of the element with the given reference designator.
    pub fn element_value(&self, id: &str) -> Option<&str> {
        self.element(id).map(Element::value)
    }

    /// The composite sub-value at `index` of the element with the given id.
    pub fn sub_element(&self, id: &str, index: usize) -> Option<&str> {
        self.element(id).and_then(|e| e.sub_value(index))
    }

    /// Replace the value of the element at the 1-based X12 position.
    ///
    /// Returns `false` when no element exists at that position.
    pub fn set_element_at(&mut self, position: usize, value: &str, separators: &Separators) -> bool {
        match position
            .checked_sub(1)
            .and_then(|i| self.elements.get_mut(i))
        {
            Some(element) => {
                element.set_value(value, separators);
                true
            }
            None => false,
        }
    }

    /// Remove and return the element at the 1-based X12 position.
    pub fn remove_element_at(&mut self, position: usize) -> Option<Element> {
        let index = position.checked_sub(1)?;
        if index < self.elements.len() {
            Some(self.elements.remove(index))
        } else {
            None
        }
    }

    /// Render the segment as delimited text, `id<sep>v1<sep>v2…`.
    pub fn to_x12(&self, separators: &Separators) -> String {
        let sep = separators
            .element()
            .map_or(String::new(), |c| c.to_string());
        let mut out = self.id.clone();
        for element in &self.elements {
            out.push_str(&sep);
            out.push_str(element.value());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_line() {
        let sep = Separators::default();
        let segment = Segment::from_line("NM1*85*2*PROVIDER", &sep).unwrap();
        assert_eq!(segment.id(), "NM1");
        assert_eq!(segment.size(), 3);
        assert_eq!(segment.element_value("NM101"), Some("85"));
        assert_eq!(segment.element_value("NM102"), Some("2"));
        assert_eq!(segment.element_value("NM103"), Some("PROVIDER"));
    }

    #[test]
    fn test_element_ids_are_zero_padded_then_plain() {
        let sep = Separators::default();
        let line = "SV1*a*b*c*d*e*f*g*h*i*j*k";
        let segment = Segment::from_line(line, &sep).unwrap();
        assert_eq!(segment.elements()[8].id(), "SV109");
        assert_eq!(segment.elements()[9].id(), "SV110");
        assert_eq!(segment.elements()[10].id(), "SV111");
    }

    #[test]
    fn test_interior_empty_elements_are_kept() {
        let sep = Separators::default();
        let segment = Segment::from_line("NM1**2", &sep).unwrap();
        assert_eq!(segment.element_value("NM101"), Some(""));
        assert_eq!(segment.element_value("NM102"), Some("2"));
    }

    #[test]
    fn test_trailing_empty_elements_are_dropped() {
        let sep = Separators::default();
        let segment = Segment::from_line("DTM*435*20240101*", &sep).unwrap();
        assert_eq!(segment.size(), 2);
    }

    #[test]
    fn test_to_x12_round_trip() {
        let sep = Separators::default();
        let line = "CLM*ABC123*100***11:B:1";
        let segment = Segment::from_line(line, &sep).unwrap();
        assert_eq!(segment.to_x12(&sep), line);
    }

    #[test]
    fn test_to_x12_id_only() {
        let sep = Separators::default();
        let segment = Segment::new("GE");
        assert_eq!(segment.to_x12(&sep), "GE");
    }

    #[test]
    fn test_set_element_at() {
        let sep = Separators::default();
        let mut segment = Segment::from_line("NM1*85*2", &sep).unwrap();
        assert!(segment.set_element_at(1, "87", &sep));
        assert_eq!(segment.element_value("NM101"), Some("87"));
        assert!(!segment.set_element_at(5, "X", &sep));
        assert!(!segment.set_element_at(0, "X", &sep));
    }

    #[test]
    fn test_remove_element_at() {
        let sep = Separators::default();
        let mut segment = Segment::from_line("NM1*85*2", &sep).unwrap();
        let removed = segment.remove_element_at(1).unwrap();
        assert_eq!(removed.value(), "85");
        assert_eq!(segment.size(), 1);
        assert!(segment.remove_element_at(9).is_none());
    }

    #[test]
    fn test_composite_sub_element_lookup() {
        let sep = Separators::default();
        let segment = Segment::from_line("CLM*ABC*100***11:B:1", &sep).unwrap();
        assert_eq!(segment.sub_element("CLM05", 0), Some("11"));
        assert_eq!(segment.sub_element("CLM05", 1), Some("B"));
        assert_eq!(segment.sub_element("CLM05", 2), Some("1"));
    }
}
