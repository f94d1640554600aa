//! Generation rules: how the external generator produces a parameter value.
//!
//! A [`Rule`] carries exactly one [`RuleKind`], either a *range* over one
//! data type or a *constant*. Only range kinds can be narrowed by inline
//! override tokens.

use chrono::{DateTime as ChronoDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::wire::{int_str, opt_int_str};

/// A parameter generation rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RuleKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<Distribution>,
    /// Share of generated values that are NULL, in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_percentage: Option<u32>,
    #[serde(default)]
    pub unique: bool,
}

impl Rule {
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn null_percentage(mut self, percent: u32) -> Self {
        self.null_percentage = Some(percent);
        self
    }

    pub fn distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = Some(distribution);
        self
    }

    pub fn int32_range(min: i32, max: i32) -> Self {
        Self::new(RuleKind::Int32Range(Int32Range { min: Some(min), max }))
    }

    pub fn int64_range(min: i64, max: i64) -> Self {
        Self::new(RuleKind::Int64Range(Int64Range { min: Some(min), max }))
    }

    pub fn double_range(min: f64, max: f64) -> Self {
        Self::new(RuleKind::DoubleRange(DoubleRange { min: Some(min), max }))
    }

    pub fn string_range(min_len: u64, max_len: u64) -> Self {
        Self::new(RuleKind::StringRange(StringRange {
            alphabet: None,
            min_len: Some(min_len),
            max_len,
        }))
    }

    /// True when the rule holds a range kind.
    pub fn is_range(&self) -> bool {
        self.kind.as_ref().is_some_and(RuleKind::is_range)
    }
}

/// The oneof of a [`Rule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleKind {
    Int32Range(Int32Range),
    Int64Range(Int64Range),
    Uint32Range(UInt32Range),
    Uint64Range(UInt64Range),
    FloatRange(FloatRange),
    DoubleRange(DoubleRange),
    DecimalRange(DecimalRange),
    StringRange(StringRange),
    BoolRange(BoolRange),
    DatetimeRange(DateTimeRange),
    Int32Const(i32),
    Int64Const(#[serde(with = "int_str")] i64),
    Uint32Const(u32),
    Uint64Const(#[serde(with = "int_str")] u64),
    FloatConst(f32),
    DoubleConst(f64),
    DecimalConst(Decimal),
    StringConst(String),
    BoolConst(bool),
    DatetimeConst(DateTime),
}

impl RuleKind {
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            RuleKind::Int32Range(_)
                | RuleKind::Int64Range(_)
                | RuleKind::Uint32Range(_)
                | RuleKind::Uint64Range(_)
                | RuleKind::FloatRange(_)
                | RuleKind::DoubleRange(_)
                | RuleKind::DecimalRange(_)
                | RuleKind::StringRange(_)
                | RuleKind::BoolRange(_)
                | RuleKind::DatetimeRange(_)
        )
    }

    /// Wire name of the variant, e.g. `int32Range`.
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::Int32Range(_) => "int32Range",
            RuleKind::Int64Range(_) => "int64Range",
            RuleKind::Uint32Range(_) => "uint32Range",
            RuleKind::Uint64Range(_) => "uint64Range",
            RuleKind::FloatRange(_) => "floatRange",
            RuleKind::DoubleRange(_) => "doubleRange",
            RuleKind::DecimalRange(_) => "decimalRange",
            RuleKind::StringRange(_) => "stringRange",
            RuleKind::BoolRange(_) => "boolRange",
            RuleKind::DatetimeRange(_) => "datetimeRange",
            RuleKind::Int32Const(_) => "int32Const",
            RuleKind::Int64Const(_) => "int64Const",
            RuleKind::Uint32Const(_) => "uint32Const",
            RuleKind::Uint64Const(_) => "uint64Const",
            RuleKind::FloatConst(_) => "floatConst",
            RuleKind::DoubleConst(_) => "doubleConst",
            RuleKind::DecimalConst(_) => "decimalConst",
            RuleKind::StringConst(_) => "stringConst",
            RuleKind::BoolConst(_) => "boolConst",
            RuleKind::DatetimeConst(_) => "datetimeConst",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Int32Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i32>,
    #[serde(default)]
    pub max: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Int64Range {
    #[serde(default, with = "opt_int_str", skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, with = "int_str")]
    pub max: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UInt32Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    #[serde(default)]
    pub max: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UInt64Range {
    #[serde(default, with = "opt_int_str", skip_serializing_if = "Option::is_none")]
    pub min: Option<u64>,
    #[serde(default, with = "int_str")]
    pub max: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FloatRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f32>,
    #[serde(default)]
    pub max: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DoubleRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: f64,
}

/// String values bounded by length, optionally over a custom alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alphabet: Option<Alphabet>,
    #[serde(default, with = "opt_int_str", skip_serializing_if = "Option::is_none")]
    pub min_len: Option<u64>,
    #[serde(default, with = "int_str")]
    pub max_len: u64,
}

/// Code point ranges a generated string may draw from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Alphabet {
    #[serde(default)]
    pub ranges: Vec<UInt32Range>,
}

/// Lexical bounds for values rendered as strings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnyStringRange {
    #[serde(default)]
    pub min: String,
    #[serde(default)]
    pub max: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoolRange {
    /// Probability of `true`.
    #[serde(default)]
    pub ratio: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecimalRange {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<DecimalKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DecimalKind {
    Float(FloatRange),
    Double(DoubleRange),
    String(AnyStringRange),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DateTimeRange {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<DateTimeKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateTimeKind {
    String(AnyStringRange),
    TimestampPb(TimestampPbRange),
    /// Unix seconds.
    Timestamp(TimestampUnixRange),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampPbRange {
    pub min: ChronoDateTime<Utc>,
    pub max: ChronoDateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimestampUnixRange {
    #[serde(default)]
    pub min: u32,
    #[serde(default)]
    pub max: u32,
}

/// Arbitrary precision decimal kept in its textual form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Decimal {
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTime {
    pub value: ChronoDateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    #[serde(rename = "type", default)]
    pub kind: DistributionType,
    /// Skew parameter of the distribution.
    #[serde(default)]
    pub screw: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistributionType {
    #[default]
    Normal,
    Uniform,
    Zipf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_range_and_const_kinds() {
        assert!(Rule::int32_range(1, 10).is_range());
        assert!(Rule::new(RuleKind::BoolRange(BoolRange { ratio: 0.5 })).is_range());
        assert!(!Rule::new(RuleKind::Int32Const(4)).is_range());
        assert!(!Rule::default().is_range());
    }

    #[test]
    fn test_json_shape() {
        let rule = Rule::int64_range(1, 9_007_199_254_740_993).unique(true);
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            value,
            json!({
                "kind": { "int64Range": { "min": "1", "max": "9007199254740993" } },
                "unique": true
            })
        );
    }

    #[test]
    fn test_nested_oneof_json() {
        let value = json!({
            "kind": { "datetimeRange": { "type": { "timestamp": { "min": 0, "max": 100 } } } },
            "nullPercentage": 10
        });
        let rule: Rule = serde_json::from_value(value).unwrap();
        assert_eq!(rule.null_percentage, Some(10));
        assert_eq!(
            rule.kind,
            Some(RuleKind::DatetimeRange(DateTimeRange {
                kind: Some(DateTimeKind::Timestamp(TimestampUnixRange { min: 0, max: 100 })),
            }))
        );
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Rule::string_range(1, 5).kind.unwrap().name(), "stringRange");
        assert_eq!(RuleKind::Uint64Const(3).name(), "uint64Const");
    }
}
