//! Scan, merge and template in one call.

use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::info;

use crate::descriptor::WorkloadDescriptor;
use crate::error::{BenchError, BenchResult};
use crate::generators::{ApplyReport, apply_generator_ranges, unresolved_tokens};
use crate::merge::{MergeReport, merge_sql};
use crate::parser::parse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildOptions {
    /// Fail when override tokens are left in SQL after templating.
    pub deny_unresolved: bool,
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny_unresolved(mut self, deny: bool) -> Self {
        self.deny_unresolved = deny;
        self
    }
}

/// What a build did to the skeleton tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BuildReport {
    pub workloads_merged: usize,
    pub workloads_skipped: usize,
    pub queries_filled: usize,
    pub queries_skipped: usize,
    pub params_created: usize,
    pub tokens_resolved: usize,
    pub matches_skipped: usize,
}

impl BuildReport {
    fn from_parts(merge: MergeReport, apply: ApplyReport) -> Self {
        Self {
            workloads_merged: merge.workloads_merged,
            workloads_skipped: merge.workloads_skipped,
            queries_filled: merge.queries_filled,
            queries_skipped: merge.queries_skipped,
            params_created: apply.params_created,
            tokens_resolved: apply.tokens_resolved,
            matches_skipped: apply.matches_skipped,
        }
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "workloads: {} merged, {} skipped",
            self.workloads_merged, self.workloads_skipped
        )?;
        writeln!(
            f,
            "queries:   {} filled, {} skipped",
            self.queries_filled, self.queries_skipped
        )?;
        write!(
            f,
            "overrides: {} resolved, {} params created, {} skipped",
            self.tokens_resolved, self.params_created, self.matches_skipped
        )
    }
}

/// Fill `skeletons` from the annotated SQL in `source` and resolve inline
/// overrides.
///
/// A scan error is returned before any skeleton is touched. With
/// `deny_unresolved`, leftover tokens are reported after the tree has
/// already been written.
pub fn build(
    source: &str,
    skeletons: &mut [WorkloadDescriptor],
    options: &BuildOptions,
) -> BenchResult<BuildReport> {
    let parsed = parse(source)?;
    let merged = merge_sql(skeletons, &parsed);
    let applied = apply_generator_ranges(skeletons);
    let report = BuildReport::from_parts(merged, applied);

    info!(
        workloads = report.workloads_merged,
        queries = report.queries_filled,
        params_created = report.params_created,
        skipped = report.workloads_skipped + report.queries_skipped + report.matches_skipped,
        "build finished"
    );

    if options.deny_unresolved {
        let leftover = unresolved_tokens(skeletons);
        if !leftover.is_empty() {
            return Err(BenchError::Unresolved(
                leftover
                    .into_iter()
                    .map(|t| match t.query {
                        Some(query) => format!("{}/{}/{}: {}", t.workload, t.unit, query, t.token),
                        None => format!("{}/{}: {}", t.workload, t.unit, t.token),
                    })
                    .collect(),
            ));
        }
    }

    Ok(report)
}

/// [`build`] with the SQL source read from `path`.
pub fn build_from_file(
    path: impl AsRef<Path>,
    skeletons: &mut [WorkloadDescriptor],
    options: &BuildOptions,
) -> BenchResult<BuildReport> {
    let source = std::fs::read_to_string(path)?;
    build(&source, skeletons, options)
}
