//! X12 delimiter definitions
//!
//! A separator set consists of a segment separator, an element separator and
//! a composite element separator, plus the line-break convention used when
//! serializing. Any of the three delimiters may be disabled, which disables
//! splitting on that level.

use serde::{Deserialize, Serialize};

/// Default segment separator.
pub const DEFAULT_SEGMENT_SEPARATOR: char = '~';
/// Default element separator.
pub const DEFAULT_ELEMENT_SEPARATOR: char = '*';
/// Default composite element separator.
pub const DEFAULT_COMPOSITE_SEPARATOR: char = ':';

/// Line-break convention used after each segment when serializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineBreak {
    /// No line breaks at all.
    #[default]
    None,
    /// Unix line endings.
    Lf,
    /// Windows line endings.
    CrLf,
}

impl LineBreak {
    /// The literal string appended after each segment separator.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineBreak::None => "",
            LineBreak::Lf => "\n",
            LineBreak::CrLf => "\r\n",
        }
    }
}

/// The delimiter set of one X12 transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Separators {
    segment: Option<char>,
    element: Option<char>,
    composite: Option<char>,
    line_break: LineBreak,
}

impl Default for Separators {
    fn default() -> Self {
        Self::new(
            DEFAULT_SEGMENT_SEPARATOR,
            DEFAULT_ELEMENT_SEPARATOR,
            DEFAULT_COMPOSITE_SEPARATOR,
        )
    }
}

impl Separators {
    /// Create a separator set from the segment, element and composite
    /// delimiters.
    pub fn new(segment: char, element: char, composite: char) -> Self {
        Self {
            segment: Some(segment),
            element: Some(element),
            composite: Some(composite),
            line_break: LineBreak::None,
        }
    }

    /// The segment separator, if enabled.
    pub fn segment(&self) -> Option<char> {
        self.segment
    }

    /// The element separator, if enabled.
    pub fn element(&self) -> Option<char> {
        self.element
    }

    /// The composite element separator, if enabled.
    pub fn composite(&self) -> Option<char> {
        self.composite
    }

    /// Replace the segment separator; `None` disables segment splitting.
    pub fn set_segment(&mut self, segment: Option<char>) {
        self.segment = segment;
    }

    /// Replace the element separator; `None` disables element splitting.
    pub fn set_element(&mut self, element: Option<char>) {
        self.element = element;
    }

    /// Replace the composite separator; `None` disables composite splitting.
    pub fn set_composite(&mut self, composite: Option<char>) {
        self.composite = composite;
    }

    /// The line-break convention used when serializing.
    pub fn line_break(&self) -> LineBreak {
        self.line_break
    }

    pub fn set_line_break(&mut self, line_break: LineBreak) {
        self.line_break = line_break;
    }

    /// Split a line on the segment separator, or `None` when disabled.
    pub fn split_segment<'a>(&self, line: &'a str) -> Option<Vec<&'a str>> {
        self.segment.map(|sep| split_on(line, sep))
    }

    /// Split a line on the element separator, or `None` when disabled.
    pub fn split_element<'a>(&self, line: &'a str) -> Option<Vec<&'a str>> {
        self.element.map(|sep| split_on(line, sep))
    }

    /// Split a value on the composite separator, or `None` when disabled.
    pub fn split_composite<'a>(&self, value: &'a str) -> Option<Vec<&'a str>> {
        self.composite.map(|sep| split_on(value, sep))
    }
}

impl PartialEq for Separators {
    fn eq(&self, other: &Self) -> bool {
        // line break is an output convention, not part of delimiter identity
        self.segment == other.segment
            && self.element == other.element
            && self.composite == other.composite
    }
}

impl Eq for Separators {}

impl std::fmt::Display for Separators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = |sep: Option<char>| sep.map_or(String::new(), |c| c.to_string());
        write!(
            f,
            "[{},{},{}]",
            c(self.segment),
            c(self.element),
            c(self.composite)
        )
    }
}

/// Split with trailing empty tokens removed.
///
/// Empty tokens in the middle of the line are preserved (element positions
/// are significant); input without the separator, including the empty string,
/// comes back as a single token.
fn split_on(line: &str, sep: char) -> Vec<&str> {
    if !line.contains(sep) {
        return vec![line];
    }
    let mut parts: Vec<&str> = line.split(sep).collect();
    while parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_separators() {
        let sep = Separators::default();
        assert_eq!(sep.segment(), Some('~'));
        assert_eq!(sep.element(), Some('*'));
        assert_eq!(sep.composite(), Some(':'));
        assert_eq!(sep.line_break(), LineBreak::None);
    }

    #[test]
    fn test_split_element() {
        let sep = Separators::default();
        let tokens = sep.split_element("NM1*85*2*PROVIDER").unwrap();
        assert_eq!(tokens, vec!["NM1", "85", "2", "PROVIDER"]);
    }

    #[test]
    fn test_split_preserves_interior_empty_tokens() {
        let sep = Separators::default();
        let tokens = sep.split_element("NM1**85").unwrap();
        assert_eq!(tokens, vec!["NM1", "", "85"]);
    }

    #[test]
    fn test_split_drops_trailing_empty_tokens() {
        let sep = Separators::default();
        let tokens = sep.split_element("DTM*435*20240101**").unwrap();
        assert_eq!(tokens, vec!["DTM", "435", "20240101"]);
    }

    #[test]
    fn test_split_without_separator_returns_whole_input() {
        let sep = Separators::default();
        assert_eq!(sep.split_element("IEA").unwrap(), vec!["IEA"]);
        assert_eq!(sep.split_element("").unwrap(), vec![""]);
    }

    #[test]
    fn test_split_only_separators_yields_nothing() {
        let sep = Separators::default();
        let tokens = sep.split_element("**").unwrap();
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_disabled_separator_disables_splitting() {
        let mut sep = Separators::default();
        sep.set_composite(None);
        assert!(sep.split_composite("A:B").is_none());
    }

    #[test]
    fn test_line_break_strings() {
        assert_eq!(LineBreak::None.as_str(), "");
        assert_eq!(LineBreak::Lf.as_str(), "\n");
        assert_eq!(LineBreak::CrLf.as_str(), "\r\n");
    }

    #[test]
    fn test_equality_ignores_line_break() {
        let mut a = Separators::default();
        let b = Separators::default();
        a.set_line_break(LineBreak::CrLf);
        assert_eq!(a, b);
    }
}
