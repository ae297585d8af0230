//! Statement execution strategies.
//!
//! An [`Executor`] owns one [`Transaction`] and runs mapped statements
//! through a [`StatementHandler`] using one of three strategies:
//!
//! - `Simple`: a fresh handle per call, closed right after execution.
//! - `Reuse`: handles cached by final SQL for the life of the unit of work.
//! - `Batch`: updates accumulate on shared handles and run on flush.
//!
//! Executors are not shared between threads; a session owns one.

mod batch;
mod handler;
mod reuse;
mod simple;

pub use handler::StatementHandler;

use crate::backend::{Connection, ResultSet, Row, Transaction};
use crate::config::Configuration;
use crate::error::{MapperError, MapperResult};
use crate::mapping::{MappedStatement, RowBounds};
use crate::monitor::{QueryContext, QueryResult};
use crate::value::Value;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Execution strategy of an [`Executor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorType {
    #[default]
    Simple,
    Reuse,
    Batch,
}

impl fmt::Display for ExecutorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutorType::Simple => "simple",
            ExecutorType::Reuse => "reuse",
            ExecutorType::Batch => "batch",
        })
    }
}

/// Outcome of one flushed batch handle.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub statement_id: String,
    pub sql: String,
    /// One entry per accumulated parameter set, in submission order.
    pub parameter_objects: Vec<Value>,
    /// One count per parameter set; empty until flushed.
    pub update_counts: Vec<u64>,
}

impl BatchResult {
    pub fn new(statement_id: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            statement_id: statement_id.into(),
            sql: sql.into(),
            parameter_objects: Vec::new(),
            update_counts: Vec::new(),
        }
    }
}

/// What a strategy does with prepared handles.
pub(crate) trait StatementStrategy: Send {
    fn update(
        &mut self,
        handler: &StatementHandler<'_>,
        connection: &dyn Connection,
        transaction_timeout: Option<Duration>,
    ) -> MapperResult<u64>;

    fn query(
        &mut self,
        handler: &StatementHandler<'_>,
        connection: &dyn Connection,
        transaction_timeout: Option<Duration>,
    ) -> MapperResult<ResultSet>;

    /// Execute (or, when rolling back, discard) pending work and release
    /// cached handles.
    fn flush(&mut self, configuration: &Configuration, is_rollback: bool) -> MapperResult<Vec<BatchResult>>;

    /// Release every cached handle without executing anything.
    fn close_statements(&mut self);
}

/// Runs statements against one transaction.
pub struct Executor {
    configuration: Arc<Configuration>,
    transaction: Box<dyn Transaction>,
    executor_type: ExecutorType,
    strategy: Box<dyn StatementStrategy>,
    closed: bool,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("executor_type", &self.executor_type)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Executor {
    pub fn new(
        configuration: Arc<Configuration>,
        transaction: Box<dyn Transaction>,
        executor_type: ExecutorType,
    ) -> Self {
        let strategy: Box<dyn StatementStrategy> = match executor_type {
            ExecutorType::Simple => Box::new(simple::SimpleStrategy),
            ExecutorType::Reuse => Box::new(reuse::ReuseStrategy::default()),
            ExecutorType::Batch => Box::new(batch::BatchStrategy::default()),
        };
        Self {
            configuration,
            transaction,
            executor_type,
            strategy,
            closed: false,
        }
    }

    pub fn executor_type(&self) -> ExecutorType {
        self.executor_type
    }

    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_open(&self) -> MapperResult<()> {
        if self.closed {
            return Err(MapperError::execution("Executor was closed."));
        }
        Ok(())
    }

    /// Run an insert, update or delete.
    ///
    /// Under the batch strategy the statement is queued and `0` is returned;
    /// counts arrive with [`flush_statements`](Self::flush_statements).
    pub fn update(&mut self, statement: &MappedStatement, parameter: &Value) -> MapperResult<u64> {
        self.check_open()?;
        let configuration = Arc::clone(&self.configuration);
        let handler = StatementHandler::new(&configuration, statement, parameter, RowBounds::default())?;
        let ctx = handler.query_context(self.executor_type);
        let batching = self.executor_type == ExecutorType::Batch;

        let timeout = self.transaction.timeout();
        let connection = self.transaction.connection()?;
        let strategy = &mut self.strategy;
        let affected = observed(
            &configuration,
            &ctx,
            || strategy.update(&handler, connection, timeout),
            |n| {
                if batching {
                    QueryResult::Batched
                } else {
                    QueryResult::Affected(*n)
                }
            },
        )?;

        if statement.flush_on_execute() {
            self.flush_statements()?;
        }
        Ok(affected)
    }

    /// Run a select and return the rows inside `row_bounds`.
    ///
    /// Under the batch strategy pending updates are flushed first.
    pub fn query(
        &mut self,
        statement: &MappedStatement,
        parameter: &Value,
        row_bounds: RowBounds,
    ) -> MapperResult<Vec<Row>> {
        self.check_open()?;
        let configuration = Arc::clone(&self.configuration);
        let handler = StatementHandler::new(&configuration, statement, parameter, row_bounds)?;
        let ctx = handler.query_context(self.executor_type);

        let timeout = self.transaction.timeout();
        let connection = self.transaction.connection()?;
        let strategy = &mut self.strategy;
        let rows = observed(
            &configuration,
            &ctx,
            || strategy.query(&handler, connection, timeout),
            |rs| QueryResult::Rows(rs.len()),
        )?;

        if statement.flush_on_execute() {
            self.flush_statements()?;
        }
        Ok(rows.into_rows())
    }

    /// Execute pending batches and release cached handles.
    pub fn flush_statements(&mut self) -> MapperResult<Vec<BatchResult>> {
        self.check_open()?;
        self.strategy.flush(&self.configuration, false)
    }

    /// Flush pending work, then commit when `required`.
    pub fn commit(&mut self, required: bool) -> MapperResult<()> {
        if self.closed {
            return Err(MapperError::execution(
                "Cannot commit, transaction is already closed",
            ));
        }
        self.flush_statements()?;
        if required {
            self.transaction.commit()?;
        }
        Ok(())
    }

    /// Discard pending batches without executing them, then roll back when
    /// `required`.
    pub fn rollback(&mut self, required: bool) -> MapperResult<()> {
        if self.closed {
            return Ok(());
        }
        let discarded = self.strategy.flush(&self.configuration, true);
        if required {
            self.transaction.rollback()?;
        }
        discarded.map(|_| ())
    }

    /// Roll back (forced or not), release every handle and close the
    /// transaction. Closing twice is a no-op.
    pub fn close(&mut self, force_rollback: bool) -> MapperResult<()> {
        if self.closed {
            return Ok(());
        }
        if let Err(e) = self.rollback(force_rollback) {
            tracing::warn!(target: "sqlmap", error = %e, "unexpected error on close");
        }
        self.strategy.close_statements();
        self.closed = true;
        self.transaction.close()
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        if let Err(e) = self.close(false) {
            tracing::warn!(target: "sqlmap", error = %e, "failed to close executor");
        }
    }
}

/// Run `work` with monitor start/complete callbacks and slow-query
/// detection.
pub(crate) fn observed<T>(
    configuration: &Configuration,
    ctx: &QueryContext,
    work: impl FnOnce() -> MapperResult<T>,
    summarize: impl FnOnce(&T) -> QueryResult,
) -> MapperResult<T> {
    let monitor = configuration.monitor();
    monitor.on_query_start(ctx);
    let start = Instant::now();
    let result = work();
    let duration = start.elapsed();

    let summary = match &result {
        Ok(value) => summarize(value),
        Err(e) => QueryResult::error(e.to_string()),
    };
    monitor.on_query_complete(ctx, duration, &summary);
    if let Some(threshold) = configuration.settings().slow_query_duration()
        && duration > threshold
    {
        monitor.on_slow_query(ctx, duration);
    }
    if let Err(e) = &result {
        tracing::debug!(target: "sqlmap", statement = %ctx.statement_id, error = %e, "statement failed");
    }
    result
}
