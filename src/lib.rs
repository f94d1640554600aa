//! # benchsql: annotated SQL for benchmark workloads
//!
//! > **Write the SQL once. Narrow the generators inline.**
//!
//! benchsql reads a SQL file split into named workloads, transactions and
//! queries by comment markers, copies each query's text into a workload
//! descriptor tree declared by the caller, and resolves inline generator
//! overrides into derived parameters.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use benchsql::prelude::*;
//!
//! let mut workloads = vec![WorkloadDescriptor::new("run").unit(
//!     1,
//!     QueryDescriptor::new("pick")
//!         .param(QueryParamDescriptor::new("id", Rule::int32_range(1, 1000))),
//! )];
//!
//! let report = benchsql::pipeline::build(
//!     "-- workload run\n-- query pick\nSELECT ${id{1:10}};\n-- query end\n-- workload end",
//!     &mut workloads,
//!     &BuildOptions::default(),
//! )?;
//! // pick now has sql "SELECT ${id{1:10}};" and a param "id{1:10}"
//! ```
//!
//! ## Markers
//!
//! | Marker                  | Opens / closes      |
//! |-------------------------|---------------------|
//! | `-- workload <name>`    | Workload            |
//! | `-- transaction <name>` | Transaction         |
//! | `-- query <name>`       | Query body          |
//! | `-- <kind> end`         | Closes that block   |
//!
//! ## Overrides
//!
//! | Token                 | Derived param    |
//! |-----------------------|------------------|
//! | `${id{1:100}}`        | `id{1:100}`      |
//! | `${id!{1:50}}`        | `id!{1:50}`      |
//! | `${amount{:10}}`      | `amount{:10}`    |
//! | `${amount{5}}`        | `amount{:5}`     |

pub mod config;
pub mod descriptor;
pub mod error;
pub mod generators;
pub mod merge;
pub mod parser;
pub mod pipeline;

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::descriptor::*;
    pub use crate::error::*;
    pub use crate::generators::{
        GeneratorMatch, UnresolvedToken, apply_generator_ranges, extract_generator_syntax,
        format_bound, unresolved_tokens, update_range,
    };
    pub use crate::merge::merge_sql;
    pub use crate::parser::{ParsedQuery, ParsedTransaction, ParsedUnit, ParsedWorkload, parse};
    pub use crate::pipeline::{BuildOptions, BuildReport, build};
}

/// Parse annotated SQL into workloads.
///
/// # Example
///
/// ```
/// use benchsql::parse;
///
/// let workloads = parse("-- workload w\n-- query q\nSELECT 1;\n-- query end\n-- workload end").unwrap();
/// assert_eq!(workloads[0].name, "w");
/// assert_eq!(workloads[0].query("q").unwrap().sql, "SELECT 1;");
/// ```
pub fn parse(input: &str) -> Result<Vec<parser::ParsedWorkload>, error::BenchError> {
    parser::parse(input)
}
