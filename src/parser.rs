//! Annotated SQL scanner.
//!
//! Splits a SQL file into named workloads, transactions and queries using
//! comment markers, one per line:
//!
//! ```text
//! -- workload tpcb
//! -- transaction transfer
//! -- query debit
//! UPDATE accounts SET balance = balance - ${amount} WHERE id = ${accounts.id};
//! -- query end
//! -- transaction end
//! -- workload end
//! ```
//!
//! Lines outside a query are ignored. Every structural violation aborts the
//! scan with a [`BenchError::Parse`] carrying the line number.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::space1,
    combinator::{eof, rest, value},
    sequence::{pair, preceded},
    IResult,
};
use serde::Serialize;
use std::fmt;

use crate::error::{BenchError, BenchResult};

/// A workload as found in the SQL source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedWorkload {
    pub name: String,
    pub units: Vec<ParsedUnit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParsedUnit {
    Query(ParsedQuery),
    Transaction(ParsedTransaction),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedTransaction {
    pub name: String,
    pub queries: Vec<ParsedQuery>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedQuery {
    pub name: String,
    pub sql: String,
}

impl ParsedWorkload {
    /// First top-level query with this name.
    pub fn query(&self, name: &str) -> Option<&ParsedQuery> {
        self.units.iter().find_map(|u| match u {
            ParsedUnit::Query(q) if q.name == name => Some(q),
            _ => None,
        })
    }

    /// First transaction with this name.
    pub fn transaction(&self, name: &str) -> Option<&ParsedTransaction> {
        self.units.iter().find_map(|u| match u {
            ParsedUnit::Transaction(t) if t.name == name => Some(t),
            _ => None,
        })
    }

    /// Every query, including those nested in transactions.
    pub fn queries(&self) -> impl Iterator<Item = &ParsedQuery> {
        self.units.iter().flat_map(|u| match u {
            ParsedUnit::Query(q) => std::slice::from_ref(q).iter(),
            ParsedUnit::Transaction(t) => t.queries.iter(),
        })
    }
}

impl ParsedTransaction {
    pub fn query(&self, name: &str) -> Option<&ParsedQuery> {
        self.queries.iter().find(|q| q.name == name)
    }
}

/// Renders back to the annotated format, so `parse(&w.to_string())`
/// yields `w` again.
impl fmt::Display for ParsedWorkload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-- workload {}", self.name)?;
        for unit in &self.units {
            match unit {
                ParsedUnit::Query(q) => write!(f, "{}", q)?,
                ParsedUnit::Transaction(t) => {
                    writeln!(f, "-- transaction {}", t.name)?;
                    for q in &t.queries {
                        write!(f, "{}", q)?;
                    }
                    writeln!(f, "-- transaction end")?;
                }
            }
        }
        writeln!(f, "-- workload end")
    }
}

impl fmt::Display for ParsedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-- query {}", self.name)?;
        writeln!(f, "{}", self.sql)?;
        writeln!(f, "-- query end")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Workload,
    Transaction,
    Query,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::Workload => write!(f, "workload"),
            BlockKind::Transaction => write!(f, "transaction"),
            BlockKind::Query => write!(f, "query"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker<'a> {
    Open(BlockKind, &'a str),
    End(BlockKind),
}

/// Where the scanner currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    InWorkload,
    InTransaction,
    InQuery,
}

/// An open block and the line it was opened on.
struct Open<T> {
    node: T,
    line: usize,
}

struct OpenQuery {
    name: String,
    body: Vec<String>,
}

/// The scanner state machine: finished workloads plus the open nodes.
#[derive(Default)]
struct Scanner {
    done: Vec<ParsedWorkload>,
    workload: Option<Open<ParsedWorkload>>,
    transaction: Option<Open<ParsedTransaction>>,
    query: Option<Open<OpenQuery>>,
}

impl Scanner {
    fn state(&self) -> State {
        if self.query.is_some() {
            State::InQuery
        } else if self.transaction.is_some() {
            State::InTransaction
        } else if self.workload.is_some() {
            State::InWorkload
        } else {
            State::Outside
        }
    }

    fn line(&mut self, line_no: usize, raw: &str) -> BenchResult<()> {
        let trimmed = raw.trim();
        match parse_marker(trimmed) {
            Some(Marker::Open(kind, name)) => self.open(line_no, kind, name),
            Some(Marker::End(kind)) => self.close(line_no, kind),
            None => {
                if let Some(query) = &mut self.query {
                    query.node.body.push(raw.trim_end().to_string());
                }
                Ok(())
            }
        }
    }

    fn open(&mut self, line: usize, kind: BlockKind, name: &str) -> BenchResult<()> {
        if name.is_empty() {
            return Err(BenchError::parse(line, format!("{} declared without a name", kind)));
        }
        let state = self.state();
        match (kind, state) {
            (BlockKind::Workload, State::Outside) => {
                self.workload = Some(Open {
                    node: ParsedWorkload {
                        name: name.to_string(),
                        units: Vec::new(),
                    },
                    line,
                });
            }
            (BlockKind::Transaction, State::InWorkload) => {
                self.transaction = Some(Open {
                    node: ParsedTransaction {
                        name: name.to_string(),
                        queries: Vec::new(),
                    },
                    line,
                });
            }
            (BlockKind::Query, State::InWorkload | State::InTransaction) => {
                self.query = Some(Open {
                    node: OpenQuery {
                        name: name.to_string(),
                        body: Vec::new(),
                    },
                    line,
                });
            }
            (BlockKind::Transaction, State::InTransaction) => {
                return Err(self.nested(line, kind, name));
            }
            (_, State::InQuery) => return Err(self.nested(line, kind, name)),
            (BlockKind::Workload, _) => return Err(self.nested(line, kind, name)),
            (_, State::Outside) => {
                return Err(BenchError::parse(
                    line,
                    format!("{} '{}' declared outside of a workload", kind, name),
                ));
            }
        }
        Ok(())
    }

    fn nested(&self, line: usize, kind: BlockKind, name: &str) -> BenchError {
        let (outer, outer_name, outer_line) = match self.state() {
            State::InQuery => self.query.as_ref().map(|q| (BlockKind::Query, q.node.name.as_str(), q.line)),
            State::InTransaction => self
                .transaction
                .as_ref()
                .map(|t| (BlockKind::Transaction, t.node.name.as_str(), t.line)),
            _ => self
                .workload
                .as_ref()
                .map(|w| (BlockKind::Workload, w.node.name.as_str(), w.line)),
        }
        .unwrap_or((kind, "", line));
        BenchError::parse(
            line,
            format!(
                "{} '{}' cannot be nested inside {} '{}' opened at line {}",
                kind, name, outer, outer_name, outer_line
            ),
        )
    }

    fn close(&mut self, line: usize, kind: BlockKind) -> BenchResult<()> {
        let state = self.state();
        match (kind, state) {
            (BlockKind::Query, State::InQuery) => {
                if let Some(open) = self.query.take() {
                    self.commit_query(line, open.node)?;
                }
            }
            (BlockKind::Transaction, State::InTransaction) => {
                if let (Some(tx), Some(wl)) = (self.transaction.take(), &mut self.workload) {
                    wl.node.units.push(ParsedUnit::Transaction(tx.node));
                }
            }
            (BlockKind::Workload, State::InWorkload) => {
                if let Some(wl) = self.workload.take() {
                    self.done.push(wl.node);
                }
            }
            (_, State::InQuery) => {
                let q = self.query.as_ref().map(|q| (q.node.name.as_str(), q.line));
                let (name, opened) = q.unwrap_or(("", line));
                return Err(BenchError::parse(
                    line,
                    format!(
                        "{} end while query '{}' opened at line {} is still open",
                        kind, name, opened
                    ),
                ));
            }
            (BlockKind::Workload, State::InTransaction) => {
                let t = self.transaction.as_ref().map(|t| (t.node.name.as_str(), t.line));
                let (name, opened) = t.unwrap_or(("", line));
                return Err(BenchError::parse(
                    line,
                    format!(
                        "workload end while transaction '{}' opened at line {} is still open",
                        name, opened
                    ),
                ));
            }
            _ => {
                return Err(BenchError::parse(line, format!("{} end without an open {}", kind, kind)));
            }
        }
        Ok(())
    }

    fn commit_query(&mut self, line: usize, open: OpenQuery) -> BenchResult<()> {
        let sql = open.body.join("\n").trim().to_string();
        if sql.is_empty() {
            return Err(BenchError::parse(
                line,
                format!("query '{}' has an empty body", open.name),
            ));
        }
        let query = ParsedQuery {
            name: open.name,
            sql,
        };
        if let Some(tx) = &mut self.transaction {
            tx.node.queries.push(query);
        } else if let Some(wl) = &mut self.workload {
            wl.node.units.push(ParsedUnit::Query(query));
        }
        Ok(())
    }

    fn finish(self) -> BenchResult<Vec<ParsedWorkload>> {
        if let Some(q) = self.query {
            return Err(unclosed(BlockKind::Query, &q.node.name, q.line));
        }
        if let Some(t) = self.transaction {
            return Err(unclosed(BlockKind::Transaction, &t.node.name, t.line));
        }
        if let Some(w) = self.workload {
            return Err(unclosed(BlockKind::Workload, &w.node.name, w.line));
        }
        Ok(self.done)
    }
}

fn unclosed(kind: BlockKind, name: &str, line: usize) -> BenchError {
    BenchError::parse(line, format!("{} '{}' is never closed", kind, name))
}

/// Parse annotated SQL into workloads.
pub fn parse(source: &str) -> BenchResult<Vec<ParsedWorkload>> {
    let mut scanner = Scanner::default();
    for (idx, line) in source.lines().enumerate() {
        scanner.line(idx + 1, line)?;
    }
    scanner.finish()
}

/// Parse the block keyword.
fn block_kind(input: &str) -> IResult<&str, BlockKind> {
    alt((
        value(BlockKind::Workload, tag("workload")),
        value(BlockKind::Transaction, tag("transaction")),
        value(BlockKind::Query, tag("query")),
    ))(input)
}

/// Parse `-- <keyword>[ <rest>]` from a trimmed line.
fn marker_line(input: &str) -> IResult<&str, (BlockKind, &str)> {
    let (input, kind) = preceded(pair(tag("--"), space1), block_kind)(input)?;
    let (input, name) = alt((preceded(space1, rest), eof))(input)?;
    Ok((input, (kind, name.trim())))
}

fn parse_marker(line: &str) -> Option<Marker<'_>> {
    let (_, (kind, name)) = marker_line(line).ok()?;
    if name == "end" {
        Some(Marker::End(kind))
    } else {
        Some(Marker::Open(kind, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn q(name: &str, sql: &str) -> ParsedQuery {
        ParsedQuery {
            name: name.to_string(),
            sql: sql.to_string(),
        }
    }

    fn line_of(err: BenchError) -> usize {
        match err {
            BenchError::Parse { line, .. } => line,
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_marker_lines() {
        assert_eq!(
            parse_marker("-- workload tpcb"),
            Some(Marker::Open(BlockKind::Workload, "tpcb"))
        );
        assert_eq!(parse_marker("-- query end"), Some(Marker::End(BlockKind::Query)));
        assert_eq!(
            parse_marker("--   transaction   new order"),
            Some(Marker::Open(BlockKind::Transaction, "new order"))
        );
        assert_eq!(parse_marker("-- query"), Some(Marker::Open(BlockKind::Query, "")));
        assert_eq!(parse_marker("-- queryish thing"), None);
        assert_eq!(parse_marker("--query q"), None);
        assert_eq!(parse_marker("-- Query q"), None);
        assert_eq!(parse_marker("-- just a comment"), None);
    }

    #[test]
    fn test_single_query() {
        let src = "-- workload w\n-- query q\nSELECT 1;\n-- query end\n-- workload end";
        let parsed = parse(src).unwrap();
        assert_eq!(
            parsed,
            vec![ParsedWorkload {
                name: "w".into(),
                units: vec![ParsedUnit::Query(q("q", "SELECT 1;"))],
            }]
        );
    }

    #[test]
    fn test_transactions_and_stray_lines() {
        let src = r#"
-- schema for the mini tpcb run
-- workload workload
   -- transaction update_and_log
-- query update_balance
UPDATE accounts
SET balance = balance + ${amount}
WHERE id = ${accounts.id{1:100}};

-- query end
-- query insert_history
INSERT INTO history (account_id, amount, created_at)
VALUES (${accounts.id!{1:50}}, ${amount}, CURRENT_TIMESTAMP);
-- query end
-- transaction end
-- query tail
  -- keep me
  SELECT 2;
-- query end
-- workload end

-- workload cleanup
-- query drop_tables
DROP TABLE IF EXISTS accounts, history CASCADE;
-- query end
-- workload end
"#;
        let parsed = parse(src).unwrap();
        assert_eq!(parsed.len(), 2);

        let wl = &parsed[0];
        let tx = wl.transaction("update_and_log").unwrap();
        assert_eq!(
            tx.queries,
            vec![
                q(
                    "update_balance",
                    "UPDATE accounts\nSET balance = balance + ${amount}\nWHERE id = ${accounts.id{1:100}};"
                ),
                q(
                    "insert_history",
                    "INSERT INTO history (account_id, amount, created_at)\nVALUES (${accounts.id!{1:50}}, ${amount}, CURRENT_TIMESTAMP);"
                ),
            ]
        );
        assert_eq!(wl.query("tail").unwrap().sql, "-- keep me\n  SELECT 2;");
        assert_eq!(wl.queries().count(), 3);
        assert_eq!(parsed[1].query("drop_tables").unwrap().sql, "DROP TABLE IF EXISTS accounts, history CASCADE;");
    }

    #[test]
    fn test_display_roundtrip() {
        let src = "-- workload w\n-- transaction t\n-- query a\nSELECT 1;\n-- query end\n-- transaction end\n-- query b\nSELECT\n  2;\n-- query end\n-- workload end\n";
        let parsed = parse(src).unwrap();
        assert_eq!(parsed[0].to_string(), src);
        assert_eq!(parse(&parsed[0].to_string()).unwrap(), parsed);
    }

    #[test]
    fn test_missing_names() {
        assert_eq!(line_of(parse("-- workload").unwrap_err()), 1);
        assert_eq!(line_of(parse("-- workload w\n-- transaction   ").unwrap_err()), 2);
        let err = parse("-- workload w\n-- query\n").unwrap_err();
        assert_eq!(err.to_string(), "Parse error at line 2: query declared without a name");
    }

    #[test]
    fn test_end_without_open() {
        let err = parse("-- workload end").unwrap_err();
        assert_eq!(err.to_string(), "Parse error at line 1: workload end without an open workload");
        assert_eq!(line_of(parse("-- workload w\n-- transaction end").unwrap_err()), 2);
        assert_eq!(line_of(parse("-- workload w\n-- query end").unwrap_err()), 2);
    }

    #[test]
    fn test_nesting_is_rejected() {
        let err = parse("-- workload w\n-- transaction a\n-- transaction b\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parse error at line 3: transaction 'b' cannot be nested inside transaction 'a' opened at line 2"
        );

        let err = parse("-- workload w\n-- query a\nSELECT 1;\n-- query b\n").unwrap_err();
        assert_eq!(line_of(err), 4);

        let err = parse("-- workload w\n-- query a\n-- transaction t\n").unwrap_err();
        assert!(err.to_string().contains("cannot be nested inside query 'a'"));

        let err = parse("-- workload w\n-- workload v\n").unwrap_err();
        assert!(err.to_string().contains("workload 'v' cannot be nested inside workload 'w'"));
    }

    #[test]
    fn test_outside_workload() {
        let err = parse("-- query q\nSELECT 1;\n-- query end").unwrap_err();
        assert_eq!(err.to_string(), "Parse error at line 1: query 'q' declared outside of a workload");
    }

    #[test]
    fn test_empty_body() {
        let err = parse("-- workload w\n-- query q\n   \n\n-- query end\n-- workload end").unwrap_err();
        assert_eq!(err.to_string(), "Parse error at line 5: query 'q' has an empty body");
    }

    #[test]
    fn test_unclosed_blocks() {
        let err = parse("-- workload w\n-- query q\nSELECT 1;").unwrap_err();
        assert_eq!(err.to_string(), "Parse error at line 2: query 'q' is never closed");

        let err = parse("-- workload w\n-- transaction t\n").unwrap_err();
        assert_eq!(err.to_string(), "Parse error at line 2: transaction 't' is never closed");

        let err = parse("\n-- workload w\n").unwrap_err();
        assert_eq!(err.to_string(), "Parse error at line 2: workload 'w' is never closed");
    }

    #[test]
    fn test_mismatched_end() {
        let err = parse("-- workload w\n-- query q\nSELECT 1;\n-- workload end").unwrap_err();
        assert_eq!(line_of(err), 4);

        let err = parse("-- workload w\n-- transaction t\n-- workload end").unwrap_err();
        assert!(err.to_string().contains("transaction 't' opened at line 2 is still open"));
    }

    #[test]
    fn test_empty_source() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("-- only a comment\n\n").unwrap().is_empty());
    }
}
