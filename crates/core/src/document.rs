//! Document type and keyword type definitions.

use serde::{Deserialize, Serialize};

/// Data type of a keyword, which decides how raw string values are parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordDataType {
    /// 32-bit signed integer.
    Numeric9,
    /// 64-bit signed integer.
    Numeric20,
    /// Free text.
    Alphanumeric,
    /// Decimal amount.
    Currency,
    /// Decimal amount in a fixed currency.
    SpecificCurrency,
    /// Calendar date.
    Date,
    /// Date with time of day.
    DateTime,
    /// Double precision float.
    FloatingPoint,
    /// Not configured; values cannot be assigned.
    Undefined,
}

impl KeywordDataType {
    /// Lowercase name used in error messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric9 => "numeric9",
            Self::Numeric20 => "numeric20",
            Self::Alphanumeric => "alphanumeric",
            Self::Currency => "currency",
            Self::SpecificCurrency => "specific_currency",
            Self::Date => "date",
            Self::DateTime => "date_time",
            Self::FloatingPoint => "floating_point",
            Self::Undefined => "undefined",
        }
    }
}

impl std::fmt::Display for KeywordDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A keyword type attached to a document type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordTypeDef {
    /// Keyword type name, matched case-insensitively.
    pub name: String,
    /// How values of this keyword are parsed.
    pub data_type: KeywordDataType,
}

/// A document type that uploaded documents are filed under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTypeDef {
    /// Numeric identifier.
    pub id: i64,
    /// Display name, matched case-insensitively on lookup.
    pub name: String,
    /// Document type group name.
    #[serde(default)]
    pub group: Option<String>,
    /// Keyword types that may be assigned to documents of this type.
    #[serde(default)]
    pub keyword_types: Vec<KeywordTypeDef>,
}

impl DocumentTypeDef {
    /// Find a keyword type by name (case-insensitive).
    pub fn find_keyword_type(&self, name: &str) -> Option<&KeywordTypeDef> {
        self.keyword_types
            .iter()
            .find(|kt| kt.name.eq_ignore_ascii_case(name))
    }
}
