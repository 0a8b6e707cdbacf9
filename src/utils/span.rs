//! Source location tracking

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::{Error, Result};

/// A single point in a named source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Name of the source (usually the file path)
    pub source_name: String,
    /// Byte offset into the source text
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(source_name: impl Into<String>, offset: usize, line: u32, column: u32) -> Self {
        Self {
            source_name: source_name.into(),
            offset,
            line,
            column,
        }
    }

    fn invalid() -> Self {
        Self {
            source_name: String::new(),
            offset: 0,
            line: 0,
            column: 0,
        }
    }
}

impl PartialOrd for SourceLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SourceLocation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.source_name
            .cmp(&other.source_name)
            .then(self.offset.cmp(&other.offset))
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source_name, self.line, self.column)
    }
}

/// A range between two locations of the same source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSpan")]
pub struct SourceSpan {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

/// Serialized form of a span, checked by `SourceSpan::new` on the way in
#[derive(Deserialize)]
struct RawSpan {
    start: SourceLocation,
    end: SourceLocation,
}

impl TryFrom<RawSpan> for SourceSpan {
    type Error = Error;

    fn try_from(raw: RawSpan) -> Result<Self> {
        SourceSpan::new(raw.start, raw.end)
    }
}

impl SourceSpan {
    /// Create a span, swapping the endpoints if they are out of order
    pub fn new(start: SourceLocation, end: SourceLocation) -> Result<Self> {
        if start.source_name != end.source_name {
            return Err(Error::SpanAcrossSources {
                start: start.source_name,
                end: end.source_name,
            });
        }

        if start.offset > end.offset {
            Ok(Self { start: end, end: start })
        } else {
            Ok(Self { start, end })
        }
    }

    /// Zero-width span at a single location
    pub fn at(location: SourceLocation) -> Self {
        Self {
            start: location.clone(),
            end: location,
        }
    }

    /// The "no span" sentinel
    pub fn invalid() -> Self {
        Self::at(SourceLocation::invalid())
    }

    pub fn is_invalid(&self) -> bool {
        *self == Self::invalid()
    }

    pub fn source_name(&self) -> &str {
        &self.start.source_name
    }

    /// Smallest span containing both; the invalid sentinel is the identity
    pub fn combine(&self, other: &SourceSpan) -> SourceSpan {
        if self.is_invalid() {
            return other.clone();
        }
        if other.is_invalid() || self.source_name() != other.source_name() {
            return self.clone();
        }

        SourceSpan {
            start: self.start.clone().min(other.start.clone()),
            end: self.end.clone().max(other.end.clone()),
        }
    }

    /// The text covered by this span, if it lies inside `source_text`
    pub fn slice<'a>(&self, source_text: &'a str) -> Option<&'a str> {
        source_text.get(self.start.offset..self.end.offset)
    }

    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }
}

impl Default for SourceSpan {
    fn default() -> Self {
        Self::invalid()
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loc(offset: usize, column: u32) -> SourceLocation {
        SourceLocation::new("main.ly", offset, 1, column)
    }

    #[test]
    fn test_new_normalizes_order() {
        let span = SourceSpan::new(loc(9, 10), loc(2, 3)).unwrap();
        assert_eq!(span.start.offset, 2);
        assert_eq!(span.end.offset, 9);
    }

    #[test]
    fn test_new_rejects_two_sources() {
        let other = SourceLocation::new("other.ly", 0, 1, 1);
        assert!(SourceSpan::new(loc(0, 1), other).is_err());
    }

    #[test]
    fn test_combine_is_union() {
        let a = SourceSpan::new(loc(4, 5), loc(8, 9)).unwrap();
        let b = SourceSpan::new(loc(1, 2), loc(6, 7)).unwrap();
        let both = a.combine(&b);
        assert_eq!(both.start.offset, 1);
        assert_eq!(both.end.offset, 8);
    }

    #[test]
    fn test_combine_invalid_is_identity() {
        let a = SourceSpan::new(loc(4, 5), loc(8, 9)).unwrap();
        assert_eq!(a.combine(&SourceSpan::invalid()), a);
        assert_eq!(SourceSpan::invalid().combine(&a), a);
    }

    #[test]
    fn test_slice() {
        let text = "i32 add(i32 a, i32 b)";
        let span = SourceSpan::new(loc(4, 5), loc(7, 8)).unwrap();
        assert_eq!(span.slice(text), Some("add"));
    }

    #[test]
    fn test_deserialize_normalizes_order() {
        let json = r#"{
            "start": {"source_name": "main.ly", "offset": 9, "line": 1, "column": 10},
            "end": {"source_name": "main.ly", "offset": 2, "line": 1, "column": 3}
        }"#;
        let span: SourceSpan = serde_json::from_str(json).unwrap();
        assert_eq!(span, SourceSpan::new(loc(2, 3), loc(9, 10)).unwrap());
        assert_eq!(span.len(), 7);
    }

    #[test]
    fn test_deserialize_rejects_two_sources() {
        let json = r#"{
            "start": {"source_name": "a.ly", "offset": 9, "line": 1, "column": 10},
            "end": {"source_name": "b.ly", "offset": 2, "line": 1, "column": 3}
        }"#;
        let err = serde_json::from_str::<SourceSpan>(json).unwrap_err();
        assert!(err.to_string().contains("a.ly"), "{}", err);
    }

    #[test]
    fn test_invalid_span_survives_serialization() {
        let json = serde_json::to_string(&SourceSpan::invalid()).unwrap();
        let span: SourceSpan = serde_json::from_str(&json).unwrap();
        assert!(span.is_invalid());
    }

    #[test]
    fn test_location_order_by_name_then_offset() {
        let a = SourceLocation::new("a.ly", 50, 3, 1);
        let b = SourceLocation::new("b.ly", 0, 1, 1);
        assert!(a < b);
        assert!(loc(1, 2) < loc(2, 1));
    }
}
