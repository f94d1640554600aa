//! Name-path lookup over a descriptor tree.
//!
//! A path has up to four segments: `workload/kind/unit/nested`, where `kind`
//! is `query` or `transaction` and `nested` names a query inside a
//! transaction.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::{
    QueryDescriptor, TransactionDescriptor, UnitDescriptor, WorkloadDescriptor,
    WorkloadUnitDescriptor,
};
use crate::error::{BenchError, BenchResult};

/// Unit kinds addressable by [`lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Query,
    Transaction,
}

impl UnitKind {
    fn matches(self, unit: &WorkloadUnitDescriptor) -> bool {
        matches!(
            (self, &unit.descriptor),
            (UnitKind::Query, Some(UnitDescriptor::Query(_)))
                | (UnitKind::Transaction, Some(UnitDescriptor::Transaction(_)))
        )
    }
}

impl FromStr for UnitKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(UnitKind::Query),
            "transaction" => Ok(UnitKind::Transaction),
            other => Err(BenchError::lookup(format!(
                "Invalid kind '{}'. Must be 'query' or 'transaction'",
                other
            ))),
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Query => write!(f, "query"),
            UnitKind::Transaction => write!(f, "transaction"),
        }
    }
}

/// A node found by [`lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LookupResult<'a> {
    All(&'a [WorkloadDescriptor]),
    Workload(&'a WorkloadDescriptor),
    Units(&'a [WorkloadUnitDescriptor], UnitKind),
    Query(&'a QueryDescriptor),
    Transaction(&'a TransactionDescriptor),
}

impl LookupResult<'_> {
    /// Pretty JSON of the resolved node.
    pub fn to_json(&self) -> BenchResult<String> {
        let json = match self {
            LookupResult::Units(units, kind) => {
                let selected: Vec<_> = units.iter().filter(|u| kind.matches(u)).collect();
                serde_json::to_string_pretty(&selected)?
            }
            other => serde_json::to_string_pretty(other)?,
        };
        Ok(json)
    }
}

impl Serialize for UnitKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Find a workload by name.
pub fn find_workload<'a>(
    workloads: &'a [WorkloadDescriptor],
    name: &str,
) -> Option<&'a WorkloadDescriptor> {
    workloads.iter().find(|w| w.name == name)
}

/// Resolve a `/`-separated path (see module docs).
pub fn lookup<'a>(workloads: &'a [WorkloadDescriptor], path: &str) -> BenchResult<LookupResult<'a>> {
    let segments: Vec<&str> = path
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let (wl_name, rest) = match segments.split_first() {
        None => return Ok(LookupResult::All(workloads)),
        Some(split) => split,
    };
    if rest.len() > 3 {
        return Err(BenchError::lookup(format!(
            "Path '{}' has {} segments, at most 4 are allowed",
            path,
            segments.len()
        )));
    }

    let wl = find_workload(workloads, wl_name)
        .ok_or_else(|| BenchError::lookup(format!("Workload '{}' not found", wl_name)))?;

    let Some(kind) = rest.first() else {
        return Ok(LookupResult::Workload(wl));
    };
    let kind: UnitKind = kind.parse()?;

    let Some(unit_name) = rest.get(1) else {
        return Ok(LookupResult::Units(&wl.units, kind));
    };

    let unit = wl
        .units
        .iter()
        .filter(|u| kind.matches(u))
        .filter_map(|u| u.descriptor.as_ref())
        .find(|d| d.name() == *unit_name)
        .ok_or_else(|| {
            BenchError::lookup(format!(
                "Unit '{}' of kind '{}' not found in workload '{}'",
                unit_name, kind, wl_name
            ))
        })?;

    match (unit, rest.get(2)) {
        (UnitDescriptor::Query(q), None) => Ok(LookupResult::Query(q)),
        (UnitDescriptor::Transaction(tx), None) => Ok(LookupResult::Transaction(tx)),
        (UnitDescriptor::Transaction(tx), Some(nested)) => tx
            .find_query(nested)
            .map(LookupResult::Query)
            .ok_or_else(|| {
                BenchError::lookup(format!(
                    "Nested query '{}' not found in transaction '{}'",
                    nested, unit_name
                ))
            }),
        (_, Some(nested)) => Err(BenchError::lookup(format!(
            "Cannot search for nested '{}' in non-transaction unit '{}'",
            nested, unit_name
        ))),
        (_, None) => Err(BenchError::lookup(format!(
            "Unit '{}' is not a {}",
            unit_name, kind
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{QueryDescriptor, TableDescriptor, TransactionDescriptor};

    fn tree() -> Vec<WorkloadDescriptor> {
        vec![
            WorkloadDescriptor::new("create_schema")
                .unit(
                    1,
                    TableDescriptor {
                        name: "accounts".into(),
                        ..TableDescriptor::default()
                    },
                )
                .unit(1, QueryDescriptor::new("create_accounts_table")),
            WorkloadDescriptor::new("workload").unit(
                1,
                TransactionDescriptor::new("update_and_log")
                    .query(QueryDescriptor::new("update_balance"))
                    .query(QueryDescriptor::new("insert_history")),
            ),
        ]
    }

    #[test]
    fn test_lookup_levels() {
        let wls = tree();

        assert!(matches!(lookup(&wls, ""), Ok(LookupResult::All(all)) if all.len() == 2));
        assert!(matches!(lookup(&wls, "workload"), Ok(LookupResult::Workload(w)) if w.name == "workload"));
        assert!(matches!(
            lookup(&wls, "create_schema/query/create_accounts_table"),
            Ok(LookupResult::Query(q)) if q.name == "create_accounts_table"
        ));
        assert!(matches!(
            lookup(&wls, "workload/transaction/update_and_log"),
            Ok(LookupResult::Transaction(t)) if t.queries.len() == 2
        ));
        assert!(matches!(
            lookup(&wls, "workload/transaction/update_and_log/insert_history"),
            Ok(LookupResult::Query(q)) if q.name == "insert_history"
        ));
    }

    #[test]
    fn test_units_json_keeps_only_requested_kind() {
        let wls = tree();
        let found = lookup(&wls, "create_schema/query").unwrap();
        let json: serde_json::Value = serde_json::from_str(&found.to_json().unwrap()).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_lookup_errors() {
        let wls = tree();

        let err = lookup(&wls, "missing").unwrap_err();
        assert_eq!(err.to_string(), "Lookup error: Workload 'missing' not found");

        let err = lookup(&wls, "workload/insert").unwrap_err();
        assert!(err.to_string().contains("Invalid kind 'insert'"));

        let err = lookup(&wls, "workload/query/update_and_log").unwrap_err();
        assert!(err.to_string().contains("of kind 'query' not found"));

        let err = lookup(&wls, "workload/transaction/update_and_log/nope").unwrap_err();
        assert!(err.to_string().contains("Nested query 'nope'"));

        let err = lookup(&wls, "create_schema/query/create_accounts_table/x").unwrap_err();
        assert!(err.to_string().contains("non-transaction unit"));
    }
}
