//! Narrowing a range rule to the bounds of an override token.

use thiserror::Error;

use super::extract::format_bound;
use crate::descriptor::{DateTimeKind, DecimalKind, Rule, RuleKind};

/// Why a rule cannot take override bounds.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RangeRejection {
    #[error("generation rule has no kind")]
    Untyped,
    #[error("generation rule is a constant ({0}), not a range")]
    Constant(&'static str),
    #[error("bound {0} is out of range for a 32-bit float")]
    FloatOverflow(f64),
}

/// Copy `rule` with its bounds replaced by `min` / `max`.
///
/// An absent bound leaves the copy's bound untouched. Integer kinds round
/// half up; unsigned kinds and lengths clamp at zero. A bound that does not
/// fit a 32-bit float kind is rejected. `unique` upgrades the copy's flag and
/// never clears it.
pub fn update_range(
    rule: &Rule,
    min: Option<f64>,
    max: Option<f64>,
    unique: bool,
) -> Result<Rule, RangeRejection> {
    let mut updated = rule.clone();
    let kind = updated.kind.as_mut().ok_or(RangeRejection::Untyped)?;

    match kind {
        RuleKind::Int32Range(r) => {
            if let Some(v) = min {
                r.min = Some(to_i32(v));
            }
            if let Some(v) = max {
                r.max = to_i32(v);
            }
        }
        RuleKind::Int64Range(r) => {
            if let Some(v) = min {
                r.min = Some(to_i64(v));
            }
            if let Some(v) = max {
                r.max = to_i64(v);
            }
        }
        RuleKind::Uint32Range(r) => {
            if let Some(v) = min {
                r.min = Some(to_u32(v));
            }
            if let Some(v) = max {
                r.max = to_u32(v);
            }
        }
        RuleKind::Uint64Range(r) => {
            if let Some(v) = min {
                r.min = Some(to_u64(v));
            }
            if let Some(v) = max {
                r.max = to_u64(v);
            }
        }
        RuleKind::FloatRange(r) => {
            if let Some(v) = min {
                r.min = Some(to_f32(v)?);
            }
            if let Some(v) = max {
                r.max = to_f32(v)?;
            }
        }
        RuleKind::DoubleRange(r) => {
            if let Some(v) = min {
                r.min = Some(v);
            }
            if let Some(v) = max {
                r.max = v;
            }
        }
        RuleKind::StringRange(r) => {
            if let Some(v) = min {
                r.min_len = Some(to_u64(v));
            }
            if let Some(v) = max {
                r.max_len = to_u64(v);
            }
        }
        RuleKind::DecimalRange(d) => match &mut d.kind {
            Some(DecimalKind::Float(r)) => {
                if let Some(v) = min {
                    r.min = Some(to_f32(v)?);
                }
                if let Some(v) = max {
                    r.max = to_f32(v)?;
                }
            }
            Some(DecimalKind::Double(r)) => {
                if let Some(v) = min {
                    r.min = Some(v);
                }
                if let Some(v) = max {
                    r.max = v;
                }
            }
            Some(DecimalKind::String(r)) => {
                if let Some(v) = min {
                    r.min = format_bound(v);
                }
                if let Some(v) = max {
                    r.max = format_bound(v);
                }
            }
            None => {}
        },
        RuleKind::DatetimeRange(d) => match &mut d.kind {
            Some(DateTimeKind::Timestamp(r)) => {
                if let Some(v) = min {
                    r.min = to_u32(v);
                }
                if let Some(v) = max {
                    r.max = to_u32(v);
                }
            }
            Some(DateTimeKind::String(r)) => {
                if let Some(v) = min {
                    r.min = format_bound(v);
                }
                if let Some(v) = max {
                    r.max = format_bound(v);
                }
            }
            // no numeric mapping for protobuf timestamps
            Some(DateTimeKind::TimestampPb(_)) | None => {}
        },
        // a ratio, not bounds
        RuleKind::BoolRange(_) => {}
        other => return Err(RangeRejection::Constant(other.name())),
    }

    if unique {
        updated.unique = true;
    }
    Ok(updated)
}

/// Round half toward positive infinity.
fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

fn to_f32(v: f64) -> Result<f32, RangeRejection> {
    let narrowed = v as f32;
    if narrowed.is_finite() {
        Ok(narrowed)
    } else {
        Err(RangeRejection::FloatOverflow(v))
    }
}

// `as` saturates at the target type's limits.

fn to_i32(v: f64) -> i32 {
    round_half_up(v) as i32
}

fn to_i64(v: f64) -> i64 {
    round_half_up(v) as i64
}

fn to_u32(v: f64) -> u32 {
    round_half_up(v).max(0.0) as u32
}

fn to_u64(v: f64) -> u64 {
    round_half_up(v).max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{
        AnyStringRange, BoolRange, DateTimeRange, DecimalRange, DoubleRange, FloatRange, Int32Range,
        StringRange, TimestampPbRange, TimestampUnixRange, UInt32Range, UInt64Range,
    };
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn kind(rule: Rule) -> RuleKind {
        rule.kind.expect("rule has a kind")
    }

    #[test]
    fn test_int32_narrowing_with_unique() {
        let base = Rule::int32_range(1, 2_147_483_647);
        let updated = update_range(&base, Some(1.0), Some(50.0), true).unwrap();
        assert!(updated.unique);
        assert_eq!(kind(updated), RuleKind::Int32Range(Int32Range { min: Some(1), max: 50 }));
        assert!(!base.unique, "base rule must not be aliased");
    }

    #[test]
    fn test_integer_rounding_and_clamping() {
        let updated = update_range(&Rule::int32_range(0, 10), Some(-2.5), Some(7.5), false).unwrap();
        assert_eq!(kind(updated), RuleKind::Int32Range(Int32Range { min: Some(-2), max: 8 }));

        let base = Rule::new(RuleKind::Uint32Range(UInt32Range { min: Some(5), max: 10 }));
        let updated = update_range(&base, Some(-7.0), None, false).unwrap();
        assert_eq!(kind(updated), RuleKind::Uint32Range(UInt32Range { min: Some(0), max: 10 }));

        let base = Rule::new(RuleKind::Uint64Range(UInt64Range { min: None, max: 10 }));
        let updated = update_range(&base, None, Some(-1.0), false).unwrap();
        assert_eq!(kind(updated), RuleKind::Uint64Range(UInt64Range { min: None, max: 0 }));

        let updated = update_range(&Rule::int64_range(0, 1), Some(1e12), Some(4.4e12), false).unwrap();
        let json = serde_json::to_value(&updated).unwrap();
        assert_eq!(json["kind"]["int64Range"]["min"], "1000000000000");
        assert_eq!(json["kind"]["int64Range"]["max"], "4400000000000");
    }

    #[test]
    fn test_int32_saturates() {
        let updated = update_range(&Rule::int32_range(0, 1), None, Some(1e12), false).unwrap();
        assert_eq!(kind(updated), RuleKind::Int32Range(Int32Range { min: Some(0), max: i32::MAX }));
    }

    #[test]
    fn test_reals_pass_through() {
        let updated = update_range(&Rule::double_range(0.0, 1.0), Some(0.125), Some(0.75), false).unwrap();
        assert_eq!(
            kind(updated),
            RuleKind::DoubleRange(DoubleRange { min: Some(0.125), max: 0.75 })
        );

        let base = Rule::new(RuleKind::FloatRange(FloatRange { min: None, max: 1.0 }));
        let updated = update_range(&base, None, Some(2.5), false).unwrap();
        assert_eq!(kind(updated), RuleKind::FloatRange(FloatRange { min: None, max: 2.5 }));
    }

    #[test]
    fn test_string_lengths() {
        let base = Rule::string_range(10, 100);
        let updated = update_range(&base, None, Some(50.0), false).unwrap();
        let json = serde_json::to_value(&updated).unwrap();
        assert_eq!(json["kind"]["stringRange"]["maxLen"], "50");
        assert_eq!(json["kind"]["stringRange"]["minLen"], "10");

        let updated = update_range(&base, Some(-3.0), None, false).unwrap();
        assert_eq!(
            kind(updated),
            RuleKind::StringRange(StringRange {
                alphabet: None,
                min_len: Some(0),
                max_len: 100
            })
        );
    }

    #[test]
    fn test_decimal_dispatches_on_nested_kind() {
        let base = Rule::new(RuleKind::DecimalRange(DecimalRange {
            kind: Some(DecimalKind::Double(DoubleRange { min: Some(0.0), max: 1.0 })),
        }));
        let updated = update_range(&base, Some(1.5), None, false).unwrap();
        assert_eq!(
            kind(updated),
            RuleKind::DecimalRange(DecimalRange {
                kind: Some(DecimalKind::Double(DoubleRange { min: Some(1.5), max: 1.0 })),
            })
        );

        let base = Rule::new(RuleKind::DecimalRange(DecimalRange {
            kind: Some(DecimalKind::String(AnyStringRange {
                min: "0".into(),
                max: "1".into(),
            })),
        }));
        let updated = update_range(&base, Some(10.0), Some(99.5), false).unwrap();
        assert_eq!(
            kind(updated),
            RuleKind::DecimalRange(DecimalRange {
                kind: Some(DecimalKind::String(AnyStringRange {
                    min: "10".into(),
                    max: "99.5".into(),
                })),
            })
        );

        let base = Rule::new(RuleKind::DecimalRange(DecimalRange {
            kind: Some(DecimalKind::Float(FloatRange { min: Some(0.0), max: 1.0 })),
        }));
        let updated = update_range(&base, Some(0.25), Some(8.5), false).unwrap();
        assert_eq!(
            kind(updated),
            RuleKind::DecimalRange(DecimalRange {
                kind: Some(DecimalKind::Float(FloatRange { min: Some(0.25), max: 8.5 })),
            })
        );

        let empty = Rule::new(RuleKind::DecimalRange(DecimalRange::default()));
        assert_eq!(update_range(&empty, Some(1.0), Some(2.0), false).unwrap(), empty);
    }

    #[test]
    fn test_datetime_kinds() {
        let base = Rule::new(RuleKind::DatetimeRange(DateTimeRange {
            kind: Some(DateTimeKind::Timestamp(TimestampUnixRange { min: 0, max: 100 })),
        }));
        let updated = update_range(&base, Some(-5.0), Some(1_700_000_000.4), false).unwrap();
        assert_eq!(
            kind(updated),
            RuleKind::DatetimeRange(DateTimeRange {
                kind: Some(DateTimeKind::Timestamp(TimestampUnixRange {
                    min: 0,
                    max: 1_700_000_000
                })),
            })
        );

        let text = Rule::new(RuleKind::DatetimeRange(DateTimeRange {
            kind: Some(DateTimeKind::String(AnyStringRange {
                min: "2020-01-01".into(),
                max: "2030-01-01".into(),
            })),
        }));
        let updated = update_range(&text, None, Some(1_700_000_000.0), false).unwrap();
        assert_eq!(
            kind(updated),
            RuleKind::DatetimeRange(DateTimeRange {
                kind: Some(DateTimeKind::String(AnyStringRange {
                    min: "2020-01-01".into(),
                    max: "1700000000".into(),
                })),
            })
        );

        let pb = Rule::new(RuleKind::DatetimeRange(DateTimeRange {
            kind: Some(DateTimeKind::TimestampPb(TimestampPbRange {
                min: Utc.timestamp_opt(0, 0).unwrap(),
                max: Utc.timestamp_opt(100, 0).unwrap(),
            })),
        }));
        let updated = update_range(&pb, Some(1.0), Some(2.0), true).unwrap();
        assert_eq!(updated.kind, pb.kind);
        assert!(updated.unique);
    }

    #[test]
    fn test_float_overflow_is_rejected() {
        let base = Rule::new(RuleKind::FloatRange(FloatRange { min: Some(0.0), max: 1.0 }));
        assert_eq!(
            update_range(&base, None, Some(1e40), false),
            Err(RangeRejection::FloatOverflow(1e40))
        );
        assert_eq!(
            update_range(&base, Some(-1e39), None, false),
            Err(RangeRejection::FloatOverflow(-1e39))
        );

        let decimal = Rule::new(RuleKind::DecimalRange(DecimalRange {
            kind: Some(DecimalKind::Float(FloatRange { min: None, max: 1.0 })),
        }));
        assert!(update_range(&decimal, None, Some(f64::MAX), false).is_err());

        let updated = update_range(&base, None, Some(3.0e38), false).unwrap();
        let json = serde_json::to_string(&updated).unwrap();
        let back: Rule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, updated);
    }

    #[test]
    fn test_unique_never_downgrades() {
        let base = Rule::int32_range(1, 10).unique(true);
        let updated = update_range(&base, None, Some(5.0), false).unwrap();
        assert!(updated.unique);
    }

    #[test]
    fn test_other_fields_survive() {
        let base = Rule::int32_range(1, 10).null_percentage(20);
        let updated = update_range(&base, None, Some(5.0), false).unwrap();
        assert_eq!(updated.null_percentage, Some(20));
    }

    #[test]
    fn test_bool_range_keeps_ratio() {
        let base = Rule::new(RuleKind::BoolRange(BoolRange { ratio: 0.3 }));
        let updated = update_range(&base, Some(1.0), Some(2.0), true).unwrap();
        assert_eq!(updated.kind, base.kind);
        assert!(updated.unique);
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            update_range(&Rule::default(), Some(1.0), None, false),
            Err(RangeRejection::Untyped)
        );
        assert_eq!(
            update_range(&Rule::new(RuleKind::StringConst("x".into())), None, Some(1.0), false),
            Err(RangeRejection::Constant("stringConst"))
        );
    }
}
