//! Typed keyword values.
//!
//! Clients send every keyword value as a string. Before a document is
//! stored, each value is parsed according to the data type of its keyword
//! type, and the parsed value is recorded in a canonical text form.

use crate::error::{RepositoryError, RepositoryResult};
use docstage_core::{KeywordDataType, KeywordTypeDef};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

const DATE_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");
const DATE_TIME_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const DATE_T_TIME_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// A keyword value parsed according to its data type.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedKeyword {
    Numeric9(i32),
    Numeric20(i64),
    Alphanumeric(String),
    /// Decimal amount kept as normalized text to avoid float rounding.
    Currency(String),
    Date(Date),
    /// Date and time, normalized to UTC when an offset was supplied.
    DateTime(PrimitiveDateTime),
    FloatingPoint(f64),
}

impl TypedKeyword {
    /// Parse `raw` as a value of `keyword_type`.
    pub fn parse(keyword_type: &KeywordTypeDef, raw: &str) -> RepositoryResult<Self> {
        let invalid = |reason: &str| RepositoryError::InvalidKeyword {
            keyword: keyword_type.name.clone(),
            reason: reason.to_string(),
        };
        let trimmed = raw.trim();

        match keyword_type.data_type {
            KeywordDataType::Undefined => Err(invalid("cannot assign to an undefined keyword")),
            KeywordDataType::Numeric9 => trimmed
                .parse::<i32>()
                .map(Self::Numeric9)
                .map_err(|_| invalid("expected a 32-bit integer")),
            KeywordDataType::Numeric20 => trimmed
                .parse::<i64>()
                .map(Self::Numeric20)
                .map_err(|_| invalid("expected a 64-bit integer")),
            KeywordDataType::Alphanumeric => Ok(Self::Alphanumeric(raw.to_string())),
            KeywordDataType::Currency | KeywordDataType::SpecificCurrency => {
                normalize_decimal(trimmed)
                    .map(Self::Currency)
                    .ok_or_else(|| invalid("expected a decimal amount"))
            }
            KeywordDataType::Date => Date::parse(trimmed, DATE_FORMAT)
                .map(Self::Date)
                .map_err(|_| invalid("expected a date formatted as YYYY-MM-DD")),
            KeywordDataType::DateTime => parse_date_time(trimmed)
                .map(Self::DateTime)
                .ok_or_else(|| invalid("expected an RFC 3339 or YYYY-MM-DD HH:MM:SS date time")),
            KeywordDataType::FloatingPoint => match trimmed.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(Self::FloatingPoint(value)),
                _ => Err(invalid("expected a finite floating point number")),
            },
        }
    }

    /// The data type this value was parsed as.
    pub fn data_type(&self) -> KeywordDataType {
        match self {
            Self::Numeric9(_) => KeywordDataType::Numeric9,
            Self::Numeric20(_) => KeywordDataType::Numeric20,
            Self::Alphanumeric(_) => KeywordDataType::Alphanumeric,
            Self::Currency(_) => KeywordDataType::Currency,
            Self::Date(_) => KeywordDataType::Date,
            Self::DateTime(_) => KeywordDataType::DateTime,
            Self::FloatingPoint(_) => KeywordDataType::FloatingPoint,
        }
    }
}

impl fmt::Display for TypedKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric9(v) => write!(f, "{v}"),
            Self::Numeric20(v) => write!(f, "{v}"),
            Self::Alphanumeric(v) | Self::Currency(v) => f.write_str(v),
            Self::Date(d) => f.write_str(&d.format(DATE_FORMAT).map_err(|_| fmt::Error)?),
            Self::DateTime(dt) => {
                f.write_str(&dt.format(DATE_TIME_FORMAT).map_err(|_| fmt::Error)?)
            }
            Self::FloatingPoint(v) => write!(f, "{v}"),
        }
    }
}

/// A keyword attached to a stored document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    /// Keyword type name as configured on the document type.
    pub name: String,
    /// Data type the value was parsed as.
    pub data_type: KeywordDataType,
    /// Canonical text form of the parsed value.
    pub value: String,
}

impl Keyword {
    /// Parse `raw` for `keyword_type` and keep its canonical form.
    pub fn parse(keyword_type: &KeywordTypeDef, raw: &str) -> RepositoryResult<Self> {
        let typed = TypedKeyword::parse(keyword_type, raw)?;
        Ok(Self {
            name: keyword_type.name.clone(),
            data_type: keyword_type.data_type,
            value: typed.to_string(),
        })
    }
}

fn parse_date_time(s: &str) -> Option<PrimitiveDateTime> {
    if let Ok(with_offset) = OffsetDateTime::parse(s, &Rfc3339) {
        let utc = with_offset.to_offset(UtcOffset::UTC);
        return Some(PrimitiveDateTime::new(utc.date(), utc.time()));
    }
    PrimitiveDateTime::parse(s, DATE_TIME_FORMAT)
        .or_else(|_| PrimitiveDateTime::parse(s, DATE_T_TIME_FORMAT))
        .ok()
}

/// Validate a decimal amount and return it without sign noise or grouping.
///
/// Accepts an optional sign, `,` thousands separators in the integer part
/// and an optional fractional part.
fn normalize_decimal(s: &str) -> Option<String> {
    let (negative, unsigned) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let digits: String = int_part.chars().filter(|c| *c != ',').collect();
    if int_part.starts_with(',') || int_part.ends_with(',') || int_part.contains(",,") {
        return None;
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if let Some(frac) = frac_part {
        if !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if digits.is_empty() && frac.is_empty() {
            return None;
        }
    } else if digits.is_empty() {
        return None;
    }

    let int_trimmed = digits.trim_start_matches('0');
    let int_trimmed = if int_trimmed.is_empty() { "0" } else { int_trimmed };
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(int_trimmed);
    if let Some(frac) = frac_part.filter(|f| !f.is_empty()) {
        out.push('.');
        out.push_str(frac);
    }
    Some(out)
}
