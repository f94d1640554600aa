//! Inline generator overrides.
//!
//! A query may narrow one of its parameters in place:
//!
//! ```text
//! WHERE id = ${accounts.id{1:100}}
//! ```
//!
//! [`apply_generator_ranges`] finds such tokens, registers a derived
//! parameter (`accounts.id{1:100}`) next to the base one with a narrowed copy
//! of its rule, and rewrites the token to `${accounts.id{1:100}}`. The
//! derived name depends only on the token's contents, so repeated tokens and
//! repeated passes resolve to the same parameter.

pub mod extract;
pub mod range;

pub use extract::{GeneratorMatch, extract_generator_syntax, format_bound};
pub use range::{RangeRejection, update_range};

use serde::Serialize;
use tracing::{debug, warn};

use crate::descriptor::{QueryDescriptor, QueryParamDescriptor, UnitDescriptor, WorkloadDescriptor};

/// Counts from one templating pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ApplyReport {
    /// Derived parameters appended to a scope.
    pub params_created: usize,
    /// Tokens resolved to a parameter (new or existing).
    pub tokens_resolved: usize,
    /// Tokens left in place because their base could not be used.
    pub matches_skipped: usize,
}

/// Where a query sits, for log fields.
#[derive(Debug, Clone, Copy)]
struct Location<'a> {
    workload: &'a str,
    transaction: Option<&'a str>,
    query: &'a str,
}

/// Resolve every override token in every query of `workloads`, in place.
pub fn apply_generator_ranges(workloads: &mut [WorkloadDescriptor]) -> ApplyReport {
    let mut report = ApplyReport::default();

    for workload in workloads.iter_mut() {
        for unit in workload.units.iter_mut() {
            match &mut unit.descriptor {
                Some(UnitDescriptor::Query(query)) => {
                    let QueryDescriptor { name, sql, params, .. } = query;
                    let at = Location {
                        workload: &workload.name,
                        transaction: None,
                        query: name.as_str(),
                    };
                    apply_to_sql(at, sql, &mut Vec::new(), params, &mut report);
                }
                Some(UnitDescriptor::Transaction(tx)) => {
                    for query in tx.queries.iter_mut() {
                        let QueryDescriptor { name, sql, params, .. } = query;
                        let at = Location {
                            workload: &workload.name,
                            transaction: Some(&tx.name),
                            query: name.as_str(),
                        };
                        apply_to_sql(at, sql, &mut tx.params, params, &mut report);
                    }
                }
                _ => {}
            }
        }
    }

    report
}

/// Resolve the tokens of one SQL string.
///
/// `shared` is the transaction scope (empty for standalone queries) and is
/// searched before `local`, the query's own parameters.
fn apply_to_sql(
    at: Location<'_>,
    sql: &mut String,
    shared: &mut Vec<QueryParamDescriptor>,
    local: &mut Vec<QueryParamDescriptor>,
    report: &mut ApplyReport,
) {
    for m in extract_generator_syntax(sql) {
        let scope = if shared.iter().any(|p| p.name == m.name) {
            &mut *shared
        } else if local.iter().any(|p| p.name == m.name) {
            &mut *local
        } else {
            warn!(
                workload = at.workload,
                transaction = at.transaction,
                query = at.query,
                token = %m.full_match,
                "base param '{}' not found",
                m.name
            );
            report.matches_skipped += 1;
            continue;
        };

        if register(at, scope, &m, report) {
            *sql = sql.replace(&m.full_match, &m.placeholder());
            report.tokens_resolved += 1;
        } else {
            report.matches_skipped += 1;
        }
    }
}

/// Make sure `scope` holds the derived parameter for `m`.
///
/// Returns false when the base parameter cannot take a range override.
fn register(
    at: Location<'_>,
    scope: &mut Vec<QueryParamDescriptor>,
    m: &GeneratorMatch,
    report: &mut ApplyReport,
) -> bool {
    let Some(base) = scope.iter().find(|p| p.name == m.name) else {
        return false;
    };

    let narrowed = match &base.generation_rule {
        Some(rule) => update_range(rule, m.min, m.max, m.unique),
        None => Err(RangeRejection::Untyped),
    };
    let rule = match narrowed {
        Ok(rule) => rule,
        Err(reason) => {
            warn!(
                workload = at.workload,
                transaction = at.transaction,
                query = at.query,
                token = %m.full_match,
                "param '{}' cannot take a range override: {}",
                m.name,
                reason
            );
            return false;
        }
    };

    let derived = m.derived_name();
    if scope.iter().any(|p| p.name == derived) {
        return true;
    }

    let param = QueryParamDescriptor {
        name: derived,
        replace_regex: base.replace_regex.clone(),
        generation_rule: Some(rule),
        db_specific: base.db_specific.clone(),
    };
    debug!(query = at.query, param = %param.name, "registered derived param");
    scope.push(param);
    report.params_created += 1;
    true
}

/// An override token still present after templating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedToken {
    pub workload: String,
    /// Query or transaction name.
    pub unit: String,
    /// Nested query name, for transactions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub token: String,
}

/// List override tokens still in SQL that do not resolve: a malformed
/// range, or a derived parameter missing from scope.
pub fn unresolved_tokens(workloads: &[WorkloadDescriptor]) -> Vec<UnresolvedToken> {
    let mut found = Vec::new();

    for workload in workloads {
        for unit in &workload.units {
            match &unit.descriptor {
                Some(UnitDescriptor::Query(q)) => {
                    for token in unresolved_in(&q.sql, &[], &q.params) {
                        found.push(UnresolvedToken {
                            workload: workload.name.clone(),
                            unit: q.name.clone(),
                            query: None,
                            token,
                        });
                    }
                }
                Some(UnitDescriptor::Transaction(tx)) => {
                    for q in &tx.queries {
                        for token in unresolved_in(&q.sql, &tx.params, &q.params) {
                            found.push(UnresolvedToken {
                                workload: workload.name.clone(),
                                unit: tx.name.clone(),
                                query: Some(q.name.clone()),
                                token,
                            });
                        }
                    }
                }
                _ => {}
            }
        }
    }

    found
}

fn unresolved_in(
    sql: &str,
    shared: &[QueryParamDescriptor],
    local: &[QueryParamDescriptor],
) -> Vec<String> {
    extract::scan_tokens(sql)
        .into_iter()
        .filter(|(_, parsed)| match parsed {
            Ok(m) => {
                let derived = m.derived_name();
                !shared.iter().chain(local).any(|p| p.name == derived)
            }
            Err(_) => true,
        })
        .map(|(full_match, _)| full_match.to_string())
        .collect()
}
