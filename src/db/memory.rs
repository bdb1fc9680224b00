//! In-memory scripted database
//!
//! Answers execute/query calls from registered responses and records
//! every statement it receives. Used by the test suites and by dry runs.

use std::sync::Mutex;

use async_trait::async_trait;

use super::errors::{DbError, DbResult};
use super::{Database, Row};
use crate::value::Value;

/// Which contract entry point received a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Execute,
    Query,
}

/// A statement received by the database
#[derive(Debug, Clone, PartialEq)]
pub struct StatementRecord {
    pub kind: StatementKind,
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone)]
enum Response {
    Rows(Vec<Row>),
    Affected(u64),
    Fail(DbError),
}

#[derive(Debug, Clone)]
struct Rule {
    fragment: String,
    first_param: Option<Value>,
    response: Response,
}

impl Rule {
    fn matches(&self, sql: &str, params: &[Value]) -> bool {
        if !sql.contains(&self.fragment) {
            return false;
        }
        match &self.first_param {
            Some(expected) => params.first() == Some(expected),
            None => true,
        }
    }
}

/// Scripted database
///
/// Rules are matched in registration order: the first rule whose SQL
/// fragment occurs in the statement (and whose first parameter matches,
/// when one was given) answers it.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    rules: Mutex<Vec<Rule>>,
    statements: Mutex<Vec<StatementRecord>>,
}

impl MemoryDatabase {
    /// Create an empty database; every statement fails until scripted
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, fragment: &str, first_param: Option<Value>, response: Response) {
        let mut rules = self.rules.lock().unwrap_or_else(|p| p.into_inner());
        rules.push(Rule {
            fragment: fragment.to_string(),
            first_param,
            response,
        });
    }

    /// Answer queries containing `fragment` with `rows`
    pub fn on_query(&self, fragment: &str, rows: Vec<Row>) -> &Self {
        self.push(fragment, None, Response::Rows(rows));
        self
    }

    /// Answer queries containing `fragment` whose `$1` equals `param`
    pub fn on_query_with(&self, fragment: &str, param: impl Into<Value>, rows: Vec<Row>) -> &Self {
        self.push(fragment, Some(param.into()), Response::Rows(rows));
        self
    }

    /// Answer statements containing `fragment` with an affected-row count
    pub fn on_execute(&self, fragment: &str, affected: u64) -> &Self {
        self.push(fragment, None, Response::Affected(affected));
        self
    }

    /// Fail statements containing `fragment`
    pub fn fail_on(&self, fragment: &str, error: DbError) -> &Self {
        self.push(fragment, None, Response::Fail(error));
        self
    }

    /// Fail statements containing `fragment` whose `$1` equals `param`
    pub fn fail_on_with(&self, fragment: &str, param: impl Into<Value>, error: DbError) -> &Self {
        self.push(fragment, Some(param.into()), Response::Fail(error));
        self
    }

    /// Drop every scripted response
    pub fn clear_rules(&self) {
        self.rules.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }

    /// Statements received so far, in arrival order
    pub fn statements(&self) -> Vec<StatementRecord> {
        self.statements.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// The most recent statement
    pub fn last_statement(&self) -> Option<StatementRecord> {
        self.statements().pop()
    }

    fn answer(&self, kind: StatementKind, sql: &str, params: &[Value]) -> DbResult<Response> {
        self.statements
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(StatementRecord {
                kind,
                sql: sql.to_string(),
                params: params.to_vec(),
            });

        let rules = self.rules.lock().unwrap_or_else(|p| p.into_inner());
        rules
            .iter()
            .find(|rule| rule.matches(sql, params))
            .map(|rule| rule.response.clone())
            .ok_or_else(|| DbError::Query(format!("no scripted response for: {}", sql)))
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn execute(&self, sql: &str, params: &[Value]) -> DbResult<u64> {
        match self.answer(StatementKind::Execute, sql, params)? {
            Response::Affected(n) => Ok(n),
            Response::Rows(rows) => Ok(rows.len() as u64),
            Response::Fail(e) => Err(e),
        }
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        match self.answer(StatementKind::Query, sql, params)? {
            Response::Rows(rows) => Ok(rows),
            Response::Affected(_) => Ok(Vec::new()),
            Response::Fail(e) => Err(e),
        }
    }
}
