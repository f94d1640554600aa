//! Binds parsed SQL onto caller-declared workload skeletons.
//!
//! Matching is by name at every level. Only `sql` fields are written; a
//! skeleton node with no SQL counterpart is logged and left as declared.

use serde::Serialize;
use tracing::{debug, warn};

use crate::descriptor::{QueryDescriptor, TransactionDescriptor, UnitDescriptor, WorkloadDescriptor};
use crate::parser::{ParsedTransaction, ParsedWorkload};

/// Counts from one merge pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MergeReport {
    pub workloads_merged: usize,
    pub workloads_skipped: usize,
    pub queries_filled: usize,
    pub queries_skipped: usize,
}

/// Copy SQL from `parsed` into the matching queries of `skeletons`.
pub fn merge_sql(skeletons: &mut [WorkloadDescriptor], parsed: &[ParsedWorkload]) -> MergeReport {
    let mut report = MergeReport::default();

    for workload in skeletons.iter_mut() {
        let Some(source) = parsed.iter().find(|p| p.name == workload.name) else {
            warn!(workload = %workload.name, "no SQL found for workload");
            report.workloads_skipped += 1;
            continue;
        };
        report.workloads_merged += 1;

        for unit in workload.units.iter_mut() {
            match &mut unit.descriptor {
                Some(UnitDescriptor::Query(query)) => {
                    merge_query(&workload.name, query, source, &mut report);
                }
                Some(UnitDescriptor::Transaction(tx)) => match source.transaction(&tx.name) {
                    Some(parsed_tx) => merge_transaction(&workload.name, tx, parsed_tx, &mut report),
                    None => {
                        warn!(
                            workload = %workload.name,
                            transaction = %tx.name,
                            "no SQL found for transaction"
                        );
                        report.queries_skipped += tx.queries.len();
                    }
                },
                Some(UnitDescriptor::CreateTable(_)) | Some(UnitDescriptor::Insert(_)) | None => {}
            }
        }
    }

    report
}

fn merge_query(
    workload: &str,
    query: &mut QueryDescriptor,
    source: &ParsedWorkload,
    report: &mut MergeReport,
) {
    match source.query(&query.name) {
        Some(parsed) => {
            debug!(workload, query = %query.name, "filled query SQL");
            query.sql = parsed.sql.clone();
            report.queries_filled += 1;
        }
        None => {
            warn!(workload, query = %query.name, "no SQL found for query");
            report.queries_skipped += 1;
        }
    }
}

fn merge_transaction(
    workload: &str,
    tx: &mut TransactionDescriptor,
    source: &ParsedTransaction,
    report: &mut MergeReport,
) {
    for query in tx.queries.iter_mut() {
        match source.query(&query.name) {
            Some(parsed) => {
                debug!(workload, transaction = %tx.name, query = %query.name, "filled query SQL");
                query.sql = parsed.sql.clone();
                report.queries_filled += 1;
            }
            None => {
                warn!(
                    workload,
                    transaction = %tx.name,
                    query = %query.name,
                    "no SQL found for query in transaction"
                );
                report.queries_skipped += 1;
            }
        }
    }
}
