//! Inline override token extraction.
//!
//! Recognizes `${name{range}}` and `${name!{range}}` where `range` is one of
//! `min:max`, `min:`, `:max`, a bare number (read as the maximum) or empty.

use nom::{
    bytes::complete::{tag, take_while, take_while1},
    character::complete::char,
    combinator::opt,
    IResult,
};
use std::fmt;
use tracing::warn;

/// One override token found in SQL text.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorMatch {
    /// Base parameter name.
    pub name: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// `!` marker: generated values must be unique.
    pub unique: bool,
    /// The exact token text, used for replacement.
    pub full_match: String,
}

impl GeneratorMatch {
    /// Name of the parameter this override resolves to, e.g.
    /// `accounts.id!{1:50}` or `amount{:1000}`.
    pub fn derived_name(&self) -> String {
        let mut name = self.name.clone();
        if self.unique {
            name.push('!');
        }
        if self.min.is_some() || self.max.is_some() {
            let min = self.min.map(format_bound).unwrap_or_default();
            let max = self.max.map(format_bound).unwrap_or_default();
            name.push_str(&format!("{{{}:{}}}", min, max));
        }
        name
    }

    /// The placeholder that replaces `full_match` in SQL.
    pub fn placeholder(&self) -> String {
        format!("${{{}}}", self.derived_name())
    }
}

impl fmt::Display for GeneratorMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_match)
    }
}

/// Render a bound the way it appears in derived names: `1`, `2.5`, `-3`.
///
/// Magnitudes of `1e21` and above, or below `1e-6`, use exponent form
/// (`1e+40`, `1.5e-7`).
pub fn format_bound(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-6..1e21).contains(&magnitude) {
        let exp = format!("{:e}", value);
        match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{}e+{}", mantissa, power),
            _ => exp,
        }
    } else {
        value.to_string()
    }
}

/// Scan `sql` for override tokens, left to right, without overlap.
///
/// A token with a malformed range is skipped with a warning; scanning
/// continues after it.
pub fn extract_generator_syntax(sql: &str) -> Vec<GeneratorMatch> {
    scan_tokens(sql)
        .into_iter()
        .filter_map(|(full_match, parsed)| match parsed {
            Ok(m) => Some(m),
            Err(reason) => {
                warn!(token = full_match, "{}", reason);
                None
            }
        })
        .collect()
}

/// Every `${name[!]{...}}` token in `sql` with its parsed form, or the
/// reason its range is malformed.
pub(crate) fn scan_tokens(sql: &str) -> Vec<(&str, Result<GeneratorMatch, String>)> {
    let mut tokens = Vec::new();
    let mut rest = sql;

    while let Some(pos) = rest.find("${") {
        let candidate = &rest[pos..];
        let Ok((remaining, (name, unique, range))) = generator_token(candidate) else {
            rest = &candidate[2..];
            continue;
        };
        let full_match = &candidate[..candidate.len() - remaining.len()];
        rest = remaining;

        let parsed = parse_range(range).map(|(min, max)| GeneratorMatch {
            name: name.to_string(),
            min,
            max,
            unique,
            full_match: full_match.to_string(),
        });
        tokens.push((full_match, parsed));
    }

    tokens
}

/// Parse one token: `${` name `!`? `{` range `}}`.
fn generator_token(input: &str) -> IResult<&str, (&str, bool, &str)> {
    let (input, _) = tag("${")(input)?;
    let (input, name) = take_while1(is_name_char)(input)?;
    let (input, bang) = opt(char('!'))(input)?;
    let (input, _) = char('{')(input)?;
    let (input, range) = take_while(|c| c != '}')(input)?;
    let (input, _) = tag("}}")(input)?;
    Ok((input, (name, bang.is_some(), range)))
}

fn is_name_char(c: char) -> bool {
    c != '!' && c != '{' && c != '}' && !c.is_whitespace()
}

type Bounds = (Option<f64>, Option<f64>);

fn parse_range(range: &str) -> Result<Bounds, String> {
    let range = range.trim();
    if range.is_empty() {
        return Ok((None, None));
    }

    let parts: Vec<&str> = range.split(':').collect();
    match parts.as_slice() {
        [max] => Ok((None, Some(parse_bound(max, "max")?))),
        [min, max] => {
            let min = if min.trim().is_empty() { None } else { Some(parse_bound(min, "min")?) };
            let max = if max.trim().is_empty() { None } else { Some(parse_bound(max, "max")?) };
            Ok((min, max))
        }
        _ => Err(format!("Invalid range '{}': expected at most one ':'", range)),
    }
}

fn parse_bound(raw: &str, which: &str) -> Result<f64, String> {
    let raw = raw.trim();
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("Invalid {} value in range: {}", which, raw))
}
