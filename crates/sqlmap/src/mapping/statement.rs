use super::bound_sql::BoundSql;
use crate::config::Configuration;
use crate::error::MapperResult;
use crate::monitor::QueryType;
use crate::scripting::SqlSource;
use crate::value::Value;
use serde::Deserialize;
use std::time::Duration;

/// Kind of statement a [`MappedStatement`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlCommandType {
    Select,
    Insert,
    Update,
    Delete,
}

impl SqlCommandType {
    pub fn is_select(self) -> bool {
        self == SqlCommandType::Select
    }
}

impl From<SqlCommandType> for QueryType {
    fn from(value: SqlCommandType) -> Self {
        match value {
            SqlCommandType::Select => QueryType::Select,
            SqlCommandType::Insert => QueryType::Insert,
            SqlCommandType::Update => QueryType::Update,
            SqlCommandType::Delete => QueryType::Delete,
        }
    }
}

/// A registered statement: its id, SQL source and execution hints.
#[derive(Debug)]
pub struct MappedStatement {
    id: String,
    command_type: SqlCommandType,
    sql_source: SqlSource,
    timeout: Option<Duration>,
    fetch_size: Option<u32>,
    flush_on_execute: bool,
}

impl MappedStatement {
    pub fn builder(
        id: impl Into<String>,
        command_type: SqlCommandType,
        sql_source: SqlSource,
    ) -> MappedStatementBuilder {
        MappedStatementBuilder {
            statement: MappedStatement {
                id: id.into(),
                command_type,
                sql_source,
                timeout: None,
                fetch_size: None,
                flush_on_execute: false,
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn command_type(&self) -> SqlCommandType {
        self.command_type
    }

    pub fn sql_source(&self) -> &SqlSource {
        &self.sql_source
    }

    /// Statement timeout; the configured default applies when unset.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn fetch_size(&self) -> Option<u32> {
        self.fetch_size
    }

    /// Pending batches are flushed right after this statement runs.
    pub fn flush_on_execute(&self) -> bool {
        self.flush_on_execute
    }

    pub fn bound_sql(&self, parameter: &Value, configuration: &Configuration) -> MapperResult<BoundSql> {
        self.sql_source.bound_sql(parameter, configuration)
    }
}

#[must_use]
pub struct MappedStatementBuilder {
    statement: MappedStatement,
}

impl MappedStatementBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.statement.timeout = Some(timeout);
        self
    }

    pub fn fetch_size(mut self, rows: u32) -> Self {
        self.statement.fetch_size = Some(rows);
        self
    }

    pub fn flush_on_execute(mut self, flush: bool) -> Self {
        self.statement.flush_on_execute = flush;
        self
    }

    pub fn build(self) -> MappedStatement {
        self.statement
    }
}

/// Offset and limit applied to query rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBounds {
    offset: usize,
    limit: usize,
}

impl Default for RowBounds {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

impl RowBounds {
    pub const UNBOUNDED: RowBounds = RowBounds {
        offset: 0,
        limit: usize::MAX,
    };

    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_unbounded(&self) -> bool {
        *self == Self::UNBOUNDED
    }

    /// Keep the rows inside the window.
    pub fn apply<T>(&self, rows: Vec<T>) -> Vec<T> {
        if self.is_unbounded() {
            return rows;
        }
        rows.into_iter().skip(self.offset).take(self.limit).collect()
    }
}
