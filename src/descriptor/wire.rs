//! Serde adapters for the descriptor JSON form.
//!
//! 64-bit integers travel as JSON strings (`"count": "1"`) so that they
//! survive consumers limited to double precision. Reading accepts either a
//! string or a bare number.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serializer};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Deserialize)]
#[serde(untagged)]
enum StrOrNum<T> {
    Num(T),
    Str(String),
}

fn from_str_or_num<T>(raw: StrOrNum<T>) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        StrOrNum::Num(n) => Ok(n),
        StrOrNum::Str(s) => s.trim().parse().map_err(|e| format!("'{}': {}", s, e)),
    }
}

/// `i64` / `u64` as a JSON string.
pub mod int_str {
    use super::*;

    pub fn serialize<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr + Deserialize<'de>,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        from_str_or_num(StrOrNum::deserialize(deserializer)?).map_err(de::Error::custom)
    }
}

/// `Option<i64>` / `Option<u64>` as an optional JSON string.
pub mod opt_int_str {
    use super::*;

    pub fn serialize<T: Display, S: Serializer>(
        value: &Option<T>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: FromStr + Deserialize<'de>,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        match Option::<StrOrNum<T>>::deserialize(deserializer)? {
            Some(raw) => from_str_or_num(raw).map(Some).map_err(de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Probe {
        #[serde(with = "super::int_str")]
        count: u64,
        #[serde(default, with = "super::opt_int_str", skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
    }

    #[test]
    fn test_writes_strings() {
        let json = serde_json::to_string(&Probe { count: 7, min: Some(-3) }).unwrap();
        assert_eq!(json, r#"{"count":"7","min":"-3"}"#);
    }

    #[test]
    fn test_reads_strings_and_numbers() {
        let a: Probe = serde_json::from_str(r#"{"count":"7","min":-3}"#).unwrap();
        let b: Probe = serde_json::from_str(r#"{"count":7}"#).unwrap();
        assert_eq!(a, Probe { count: 7, min: Some(-3) });
        assert_eq!(b, Probe { count: 7, min: None });
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(serde_json::from_str::<Probe>(r#"{"count":"seven"}"#).is_err());
    }
}
