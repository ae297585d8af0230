use super::ExecutorType;
use crate::backend::{Connection, ResultSet, Statement};
use crate::config::Configuration;
use crate::error::MapperResult;
use crate::mapping::{BoundSql, MappedStatement, RowBounds};
use crate::monitor::QueryContext;
use crate::value::Value;
use std::time::{Duration, Instant};

/// Drives one statement through prepare, parameterize and execute against a
/// backend handle. The handle itself belongs to the caller.
pub struct StatementHandler<'a> {
    configuration: &'a Configuration,
    statement: &'a MappedStatement,
    parameter: Value,
    bound_sql: BoundSql,
    row_bounds: RowBounds,
}

impl<'a> StatementHandler<'a> {
    /// Renders the statement's SQL for `parameter`.
    pub fn new(
        configuration: &'a Configuration,
        statement: &'a MappedStatement,
        parameter: &Value,
        row_bounds: RowBounds,
    ) -> MapperResult<Self> {
        let bound_sql = statement.bound_sql(parameter, configuration)?;
        Ok(Self {
            configuration,
            statement,
            parameter: parameter.clone(),
            bound_sql,
            row_bounds,
        })
    }

    pub fn statement(&self) -> &MappedStatement {
        self.statement
    }

    pub fn bound_sql(&self) -> &BoundSql {
        &self.bound_sql
    }

    pub fn parameter(&self) -> &Value {
        &self.parameter
    }

    pub(crate) fn configuration(&self) -> &'a Configuration {
        self.configuration
    }

    pub(crate) fn query_context(&self, executor_type: ExecutorType) -> QueryContext {
        QueryContext::new(
            self.statement.id(),
            self.bound_sql.sql(),
            self.bound_sql.parameter_mappings().len(),
            self.statement.command_type().into(),
            executor_type,
        )
    }

    /// Statement timeout (or the configured default), capped by what is left
    /// of the transaction's budget.
    pub fn timeout(&self, transaction_timeout: Option<Duration>) -> Option<Duration> {
        let statement_timeout = self
            .statement
            .timeout()
            .or_else(|| self.configuration.settings().statement_timeout());
        match (statement_timeout, transaction_timeout) {
            (Some(s), Some(t)) => Some(s.min(t)),
            (s, t) => s.or(t),
        }
    }

    /// Prepare a new handle with timeout and fetch size applied.
    pub fn prepare(
        &self,
        connection: &dyn Connection,
        transaction_timeout: Option<Duration>,
    ) -> MapperResult<Box<dyn Statement>> {
        let sql = self.bound_sql.sql();
        let start = Instant::now();
        let mut handle = connection.prepare(sql)?;
        self.configuration
            .monitor()
            .on_prepare(sql, start.elapsed());

        handle.set_query_timeout(self.timeout(transaction_timeout));
        if let Some(rows) = self
            .statement
            .fetch_size()
            .or(self.configuration.settings().default_fetch_size)
        {
            handle.set_fetch_size(rows);
        }
        Ok(handle)
    }

    /// Bind every parameter in marker order, starting at position 1.
    ///
    /// Null values without an explicit type hint carry the configured
    /// `jdbc_type_for_null`.
    pub fn parameterize(&self, handle: &mut dyn Statement) -> MapperResult<()> {
        let values = self
            .bound_sql
            .parameter_values(self.configuration.reflector_factory())?;
        let settings = self.configuration.settings();
        if settings.log_sql {
            tracing::debug!(
                target: "sqlmap.sql",
                statement = self.statement.id(),
                sql = self.bound_sql.sql(),
                parameters = ?values,
                "preparing"
            );
        }

        handle.clear_parameters();
        let mappings = self.bound_sql.parameter_mappings();
        for (position, (mapping, value)) in mappings.iter().zip(&values).enumerate() {
            let jdbc_type = match mapping.jdbc_type() {
                None if value.is_null() => Some(settings.jdbc_type_for_null),
                hint => hint,
            };
            handle.bind(position + 1, value, jdbc_type)?;
        }
        Ok(())
    }

    pub fn batch(&self, handle: &mut dyn Statement) -> MapperResult<()> {
        handle.add_batch()
    }

    pub fn update(&self, handle: &mut dyn Statement) -> MapperResult<u64> {
        let affected = handle.execute_update()?;
        if self.configuration.settings().log_sql {
            tracing::debug!(target: "sqlmap.sql", statement = self.statement.id(), affected, "updated");
        }
        Ok(affected)
    }

    /// Run the query and keep the rows inside the row bounds.
    pub fn query(&self, handle: &mut dyn Statement) -> MapperResult<ResultSet> {
        let result = handle.execute_query()?;
        let total = result.len();
        let result = if self.row_bounds.is_unbounded() {
            result
        } else {
            let columns = result.columns().to_vec();
            let rows = self
                .row_bounds
                .apply(result.into_rows())
                .into_iter()
                .map(|row| row.values().to_vec())
                .collect();
            ResultSet::new(columns, rows)
        };
        if self.configuration.settings().log_sql {
            tracing::debug!(
                target: "sqlmap.sql",
                statement = self.statement.id(),
                total,
                returned = result.len(),
                "queried"
            );
        }
        Ok(result)
    }
}

/// Close a handle; failures are logged and never replace the caller's
/// outcome.
pub(crate) fn release(handle: &mut dyn Statement) {
    if let Err(e) = handle.close() {
        tracing::warn!(target: "sqlmap", sql = handle.sql(), error = %e, "failed to close statement");
    }
}
