//! The caller-facing unit of work.

use crate::backend::Row;
use crate::config::Configuration;
use crate::error::{MapperError, MapperResult};
use crate::executor::{BatchResult, Executor, ExecutorType};
use crate::mapping::RowBounds;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Runs mapped statements by id over one executor.
///
/// Without auto-commit, `commit` and `rollback` reach the transaction only
/// after a write (or when forced). Dropping an open session closes it, which
/// rolls back uncommitted writes.
///
/// List parameters are exposed to templates as both `collection` and `list`.
#[derive(Debug)]
pub struct SqlSession {
    configuration: Arc<Configuration>,
    executor: Executor,
    auto_commit: bool,
    dirty: bool,
}

impl SqlSession {
    pub fn new(configuration: Arc<Configuration>, executor: Executor, auto_commit: bool) -> Self {
        Self {
            configuration,
            executor,
            auto_commit,
            dirty: false,
        }
    }

    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }

    pub fn executor_type(&self) -> ExecutorType {
        self.executor.executor_type()
    }

    pub fn select_list(&mut self, statement_id: &str, parameter: impl Into<Value>) -> MapperResult<Vec<Row>> {
        self.select_list_bounded(statement_id, parameter, RowBounds::default())
    }

    pub fn select_list_bounded(
        &mut self,
        statement_id: &str,
        parameter: impl Into<Value>,
        row_bounds: RowBounds,
    ) -> MapperResult<Vec<Row>> {
        let statement = self.configuration.mapped_statement(statement_id)?;
        self.executor
            .query(&statement, &wrap_collection(parameter.into()), row_bounds)
    }

    /// At most one row; more than one is a [`MapperError::TooManyRows`].
    pub fn select_one(&mut self, statement_id: &str, parameter: impl Into<Value>) -> MapperResult<Option<Row>> {
        let mut rows = self.select_list(statement_id, parameter)?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            got => Err(MapperError::too_many_rows(1, got)),
        }
    }

    pub fn insert(&mut self, statement_id: &str, parameter: impl Into<Value>) -> MapperResult<u64> {
        self.update(statement_id, parameter)
    }

    pub fn update(&mut self, statement_id: &str, parameter: impl Into<Value>) -> MapperResult<u64> {
        let statement = self.configuration.mapped_statement(statement_id)?;
        self.dirty = true;
        self.executor
            .update(&statement, &wrap_collection(parameter.into()))
    }

    pub fn delete(&mut self, statement_id: &str, parameter: impl Into<Value>) -> MapperResult<u64> {
        self.update(statement_id, parameter)
    }

    pub fn flush_statements(&mut self) -> MapperResult<Vec<BatchResult>> {
        self.executor.flush_statements()
    }

    pub fn commit(&mut self) -> MapperResult<()> {
        self.commit_force(false)
    }

    /// Commit even when nothing was written.
    pub fn commit_force(&mut self, force: bool) -> MapperResult<()> {
        let required = self.commit_or_rollback_required(force);
        self.executor.commit(required)?;
        self.dirty = false;
        Ok(())
    }

    pub fn rollback(&mut self) -> MapperResult<()> {
        self.rollback_force(false)
    }

    pub fn rollback_force(&mut self, force: bool) -> MapperResult<()> {
        let required = self.commit_or_rollback_required(force);
        self.executor.rollback(required)?;
        self.dirty = false;
        Ok(())
    }

    pub fn close(&mut self) -> MapperResult<()> {
        let required = self.commit_or_rollback_required(false);
        let result = self.executor.close(required);
        self.dirty = false;
        result
    }

    pub fn is_closed(&self) -> bool {
        self.executor.is_closed()
    }

    fn commit_or_rollback_required(&self, force: bool) -> bool {
        (!self.auto_commit && self.dirty) || force
    }
}

impl Drop for SqlSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(target: "sqlmap", error = %e, "failed to close session");
        }
    }
}

/// Expose a list parameter under `collection` and `list`.
fn wrap_collection(parameter: Value) -> Value {
    match parameter {
        Value::List(_) => Value::Map(BTreeMap::from([
            ("collection".to_string(), parameter.clone()),
            ("list".to_string(), parameter),
        ])),
        other => other,
    }
}
