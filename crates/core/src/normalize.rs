//! Numeric normalization for records read from the hosted backend.
//!
//! Stored numeric columns arrive as JSON numbers, numeric text, malformed
//! text, or null. Every monetary and quantity field is normalized once, when
//! a raw record is converted into its domain counterpart, so the aggregation
//! engine only ever sees `Decimal` values.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A numeric field exactly as it was stored upstream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(serde_json::Number),
    Text(String),
}

impl RawNumber {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

impl From<i64> for RawNumber {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(Self::Number)
            .unwrap_or_else(|| Self::Text(value.to_string()))
    }
}

impl From<Decimal> for RawNumber {
    fn from(value: Decimal) -> Self {
        let text = value.normalize().to_string();
        match serde_json::Number::from_str(&text) {
            Ok(number) => Self::Number(number),
            Err(_) => Self::Text(text),
        }
    }
}

impl From<&str> for RawNumber {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// A boolean flag that older rows stored as text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawFlag {
    Bool(bool),
    Text(String),
}

impl RawFlag {
    pub fn is_set(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Text(value) => value.trim().eq_ignore_ascii_case("true"),
        }
    }
}

impl From<bool> for RawFlag {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedAmount {
    pub value: Decimal,
    /// The column held a value (even a malformed one) rather than null.
    pub recorded: bool,
    pub malformed: bool,
}

impl NormalizedAmount {
    pub const ABSENT: Self = Self { value: Decimal::ZERO, recorded: false, malformed: false };
}

pub fn normalize_amount(raw: Option<&RawNumber>) -> NormalizedAmount {
    let Some(raw) = raw else {
        return NormalizedAmount::ABSENT;
    };

    let parsed = match raw {
        RawNumber::Number(number) => parse_decimal(&number.to_string()),
        RawNumber::Text(text) => parse_decimal(text),
    };

    match parsed {
        Some(value) => NormalizedAmount { value, recorded: true, malformed: false },
        None => NormalizedAmount { value: Decimal::ZERO, recorded: true, malformed: true },
    }
}

/// Parses plain or scientific decimal text. Blank text is not a number.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    Decimal::from_str(trimmed).ok().or_else(|| Decimal::from_scientific(trimmed).ok())
}

/// `base * (pct / 100)`, or `None` when the product leaves the `Decimal` range.
pub fn percent_of(base: Decimal, pct: Decimal) -> Option<Decimal> {
    base.checked_mul(pct.checked_div(Decimal::ONE_HUNDRED)?)
}

pub fn checked_sum<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().try_fold(Decimal::ZERO, Decimal::checked_add)
}

/// Zero for an empty slice; `None` on overflow.
pub fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return Some(Decimal::ZERO);
    }

    checked_sum(values.iter().copied())?.checked_div(Decimal::from(values.len()))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationIssue {
    pub record: String,
    pub field: String,
    pub raw: String,
}

/// Normalizes the numeric fields of one record, collecting an issue for every
/// malformed value.
pub struct FieldNormalizer<'a> {
    record: String,
    issues: &'a mut Vec<NormalizationIssue>,
}

impl<'a> FieldNormalizer<'a> {
    pub fn new(record: impl Into<String>, issues: &'a mut Vec<NormalizationIssue>) -> Self {
        Self { record: record.into(), issues }
    }

    pub fn amount(&mut self, field: &str, raw: Option<&RawNumber>) -> NormalizedAmount {
        let normalized = normalize_amount(raw);
        if normalized.malformed {
            let raw = match raw {
                Some(RawNumber::Text(text)) => text.clone(),
                Some(RawNumber::Number(number)) => number.to_string(),
                None => String::new(),
            };
            tracing::warn!(
                event_name = "normalization.malformed_numeric_field",
                record = %self.record,
                field,
                raw = %raw,
                "malformed numeric field normalized to zero"
            );
            self.issues.push(NormalizationIssue {
                record: self.record.clone(),
                field: field.to_owned(),
                raw,
            });
        }
        normalized
    }

    pub fn value(&mut self, field: &str, raw: Option<&RawNumber>) -> Decimal {
        self.amount(field, raw).value
    }
}
