//! Shared enumerations and the structured exception description

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

// ============================================================================
// Exception description
// ============================================================================

/// Structured description of an engine exception.
///
/// Built from a captured exception and the context it was captured in, then
/// carried out of the engine as plain data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ExceptionError {
    /// `"<name>: <message>"` for error objects, the string form otherwise
    pub message: String,
    /// Where the exception was captured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// The error's `stack` property, when it has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ExceptionError {
    /// Create a description with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            stack: None,
        }
    }

    /// Attach a location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Attach a stack
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

// ============================================================================
// Property attributes
// ============================================================================

/// Attribute flags for accessor and data properties.
///
/// Bit values match the engine's `PropertyAttribute` so they can be passed
/// through the C ABI unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PropertyAttribute(u32);

impl PropertyAttribute {
    /// No attributes
    pub const NONE: PropertyAttribute = PropertyAttribute(0);
    /// Writes are ignored
    pub const READ_ONLY: PropertyAttribute = PropertyAttribute(1);
    /// Hidden from enumeration
    pub const DONT_ENUM: PropertyAttribute = PropertyAttribute(2);
    /// Cannot be deleted
    pub const DONT_DELETE: PropertyAttribute = PropertyAttribute(4);

    const ALL_BITS: u32 = 0b111;

    /// Build from raw bits, dropping unknown ones
    pub const fn from_bits_truncate(bits: u32) -> Self {
        PropertyAttribute(bits & Self::ALL_BITS)
    }

    /// Raw bits
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every flag in `other` is set
    pub const fn contains(self, other: PropertyAttribute) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no flags are set
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for PropertyAttribute {
    type Output = PropertyAttribute;

    fn bitor(self, rhs: Self) -> Self::Output {
        PropertyAttribute(self.0 | rhs.0)
    }
}

impl BitOrAssign for PropertyAttribute {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// ============================================================================
// Well-known symbols
// ============================================================================

/// Index of a well-known (builtin) symbol.
///
/// Numbering starts at 1 and is part of the C ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum SymbolIndex {
    /// `Symbol.asyncIterator`
    AsyncIterator = 1,
    /// `Symbol.hasInstance`
    HasInstance,
    /// `Symbol.isConcatSpreadable`
    IsConcatSpreadable,
    /// `Symbol.iterator`
    Iterator,
    /// `Symbol.match`
    Match,
    /// `Symbol.replace`
    Replace,
    /// `Symbol.search`
    Search,
    /// `Symbol.split`
    Split,
    /// `Symbol.toPrimitive`
    ToPrimitive,
    /// `Symbol.toStringTag`
    ToStringTag,
    /// `Symbol.unscopables`
    Unscopables,
}

impl SymbolIndex {
    /// Every well-known symbol, in index order
    pub const ALL: [SymbolIndex; 11] = [
        SymbolIndex::AsyncIterator,
        SymbolIndex::HasInstance,
        SymbolIndex::IsConcatSpreadable,
        SymbolIndex::Iterator,
        SymbolIndex::Match,
        SymbolIndex::Replace,
        SymbolIndex::Search,
        SymbolIndex::Split,
        SymbolIndex::ToPrimitive,
        SymbolIndex::ToStringTag,
        SymbolIndex::Unscopables,
    ];

    /// Look up by ABI index
    pub fn from_i32(index: i32) -> Option<Self> {
        if (1..=Self::ALL.len() as i32).contains(&index) {
            Some(Self::ALL[(index - 1) as usize])
        } else {
            None
        }
    }

    /// ABI index
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Zero-based position in [`SymbolIndex::ALL`]
    pub const fn ordinal(self) -> usize {
        (self as i32 - 1) as usize
    }

    /// The symbol's description text
    pub const fn description(self) -> &'static str {
        match self {
            SymbolIndex::AsyncIterator => "Symbol.asyncIterator",
            SymbolIndex::HasInstance => "Symbol.hasInstance",
            SymbolIndex::IsConcatSpreadable => "Symbol.isConcatSpreadable",
            SymbolIndex::Iterator => "Symbol.iterator",
            SymbolIndex::Match => "Symbol.match",
            SymbolIndex::Replace => "Symbol.replace",
            SymbolIndex::Search => "Symbol.search",
            SymbolIndex::Split => "Symbol.split",
            SymbolIndex::ToPrimitive => "Symbol.toPrimitive",
            SymbolIndex::ToStringTag => "Symbol.toStringTag",
            SymbolIndex::Unscopables => "Symbol.unscopables",
        }
    }
}

impl fmt::Display for SymbolIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_index_numbering() {
        assert_eq!(SymbolIndex::AsyncIterator.as_i32(), 1);
        assert_eq!(SymbolIndex::Unscopables.as_i32(), 11);
        for (i, sym) in SymbolIndex::ALL.iter().enumerate() {
            assert_eq!(sym.ordinal(), i);
            assert_eq!(SymbolIndex::from_i32(sym.as_i32()), Some(*sym));
        }
        assert_eq!(SymbolIndex::from_i32(0), None);
        assert_eq!(SymbolIndex::from_i32(12), None);
    }

    #[test]
    fn test_symbol_descriptions() {
        assert_eq!(SymbolIndex::Iterator.description(), "Symbol.iterator");
        assert_eq!(
            SymbolIndex::IsConcatSpreadable.description(),
            "Symbol.isConcatSpreadable"
        );
        assert_eq!(SymbolIndex::ToStringTag.to_string(), "Symbol.toStringTag");
    }

    #[test]
    fn test_property_attribute_flags() {
        let attrs = PropertyAttribute::READ_ONLY | PropertyAttribute::DONT_DELETE;
        assert!(attrs.contains(PropertyAttribute::READ_ONLY));
        assert!(attrs.contains(PropertyAttribute::DONT_DELETE));
        assert!(!attrs.contains(PropertyAttribute::DONT_ENUM));
        assert_eq!(attrs.bits(), 5);
        assert!(PropertyAttribute::NONE.is_empty());
        assert_eq!(PropertyAttribute::from_bits_truncate(0xff).bits(), 7);
    }

    #[test]
    fn test_exception_error_json() {
        let err = ExceptionError::new("TypeError: nope").with_location("context 1");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"location\":\"context 1\""));
        assert!(!json.contains("stack"));

        let back: ExceptionError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
        assert_eq!(back.to_string(), "TypeError: nope");
    }
}
