//! Workload descriptor tree.
//!
//! These types mirror the benchmark wire schema: a workload is an ordered
//! list of units, each wrapping one table, insert, query or transaction
//! descriptor. The JSON form produced by serde follows the protobuf JSON
//! mapping (camelCase fields, 64-bit integers as strings, oneofs as
//! single-key objects).
//!
//! Callers declare these trees up front with empty `sql` fields; the
//! [`merge`](crate::merge) and [`generators`](crate::generators) passes
//! fill them in place.

pub mod lookup;
pub mod rule;
pub mod value;
mod wire;

pub use lookup::{LookupResult, UnitKind, find_workload, lookup};
pub use rule::*;
pub use value::{Value, ValueKind, ValueList, ValueStruct};

use serde::{Deserialize, Serialize};

/// A named, ordered collection of units.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkloadDescriptor {
    pub name: String,
    #[serde(rename = "async", default, skip_serializing_if = "Option::is_none")]
    pub is_async: Option<bool>,
    #[serde(default)]
    pub units: Vec<WorkloadUnitDescriptor>,
}

impl WorkloadDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append a unit repeated `count` times.
    pub fn unit(mut self, count: u64, descriptor: impl Into<UnitDescriptor>) -> Self {
        self.units.push(WorkloadUnitDescriptor {
            descriptor: Some(descriptor.into()),
            count,
        });
        self
    }
}

/// One workload entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadUnitDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<UnitDescriptor>,
    #[serde(with = "wire::int_str")]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitDescriptor {
    CreateTable(TableDescriptor),
    Insert(InsertDescriptor),
    Query(QueryDescriptor),
    Transaction(TransactionDescriptor),
}

impl UnitDescriptor {
    pub fn name(&self) -> &str {
        match self {
            UnitDescriptor::CreateTable(t) => &t.name,
            UnitDescriptor::Insert(i) => &i.name,
            UnitDescriptor::Query(q) => &q.name,
            UnitDescriptor::Transaction(t) => &t.name,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            UnitDescriptor::CreateTable(_) => "create_table",
            UnitDescriptor::Insert(_) => "insert",
            UnitDescriptor::Query(_) => "query",
            UnitDescriptor::Transaction(_) => "transaction",
        }
    }
}

impl From<TableDescriptor> for UnitDescriptor {
    fn from(t: TableDescriptor) -> Self {
        UnitDescriptor::CreateTable(t)
    }
}

impl From<InsertDescriptor> for UnitDescriptor {
    fn from(i: InsertDescriptor) -> Self {
        UnitDescriptor::Insert(i)
    }
}

impl From<QueryDescriptor> for UnitDescriptor {
    fn from(q: QueryDescriptor) -> Self {
        UnitDescriptor::Query(q)
    }
}

impl From<TransactionDescriptor> for UnitDescriptor {
    fn from(t: TransactionDescriptor) -> Self {
        UnitDescriptor::Transaction(t)
    }
}

/// A single SQL statement with its parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescriptor {
    pub name: String,
    #[serde(default)]
    pub sql: String,
    #[serde(default)]
    pub params: Vec<QueryParamDescriptor>,
    #[serde(default)]
    pub groups: Vec<QueryParamGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_specific: Option<ValueStruct>,
}

impl QueryDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = sql.into();
        self
    }

    pub fn param(mut self, param: QueryParamDescriptor) -> Self {
        self.params.push(param);
        self
    }

    pub fn find_param(&self, name: &str) -> Option<&QueryParamDescriptor> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// Queries executed together under one isolation level.
///
/// `params` and `groups` are shared by every nested query and are searched
/// before the query's own parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDescriptor {
    pub name: String,
    #[serde(default)]
    pub isolation_level: TxIsolationLevel,
    #[serde(default)]
    pub queries: Vec<QueryDescriptor>,
    #[serde(default)]
    pub params: Vec<QueryParamDescriptor>,
    #[serde(default)]
    pub groups: Vec<QueryParamGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_specific: Option<ValueStruct>,
}

impl TransactionDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn isolation(mut self, level: TxIsolationLevel) -> Self {
        self.isolation_level = level;
        self
    }

    pub fn query(mut self, query: QueryDescriptor) -> Self {
        self.queries.push(query);
        self
    }

    pub fn param(mut self, param: QueryParamDescriptor) -> Self {
        self.params.push(param);
        self
    }

    pub fn find_param(&self, name: &str) -> Option<&QueryParamDescriptor> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn find_query(&self, name: &str) -> Option<&QueryDescriptor> {
        self.queries.iter().find(|q| q.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxIsolationLevel {
    #[default]
    Unspecified,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// A named query parameter and the rule that generates its values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParamDescriptor {
    pub name: String,
    /// Overrides the default placeholder pattern when binding the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_rule: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_specific: Option<ValueStruct>,
}

impl QueryParamDescriptor {
    pub fn new(name: impl Into<String>, rule: Rule) -> Self {
        Self {
            name: name.into(),
            generation_rule: Some(rule),
            ..Self::default()
        }
    }
}

/// Parameters generated together as a tuple.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryParamGroup {
    pub name: String,
    #[serde(default)]
    pub params: Vec<QueryParamDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescriptor {
    pub name: String,
    #[serde(default)]
    pub table_indexes: Vec<IndexDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_specific: Option<ValueStruct>,
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    pub sql_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDescriptor {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(rename = "type", default)]
    pub index_type: String,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_specific: Option<ValueStruct>,
}

/// Bulk data load into one table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertDescriptor {
    pub name: String,
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<InsertMethod>,
    #[serde(default)]
    pub params: Vec<QueryParamDescriptor>,
    #[serde(default)]
    pub groups: Vec<QueryParamGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsertMethod {
    PlainQuery,
    CopyFrom,
}
