//! Backend seams: connections, prepared statement handles, transactions and
//! the rows they return.
//!
//! Executors only talk to these traits. Connection acquisition and pooling
//! stay with the application: hand a live [`Connection`] to a
//! [`ConnectionTransaction`] (or implement [`Transaction`] yourself) and pass
//! that to [`Configuration::open_session`](crate::config::Configuration::open_session).

#[cfg(feature = "postgres")]
pub mod postgres;

use crate::error::{MapperError, MapperResult};
use crate::mapping::JdbcType;
use crate::value::{FromValue, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// A prepared statement handle.
///
/// Parameters are bound by 1-based position and stay bound until
/// [`clear_parameters`](Statement::clear_parameters) or the next `bind` of the
/// same position.
pub trait Statement: Send {
    fn sql(&self) -> &str;

    fn bind(&mut self, position: usize, value: &Value, jdbc_type: Option<JdbcType>) -> MapperResult<()>;

    fn clear_parameters(&mut self);

    /// Hint for how many rows to fetch per round trip.
    fn set_fetch_size(&mut self, _rows: u32) {}

    fn set_query_timeout(&mut self, timeout: Option<Duration>);

    /// Run the statement; returns the number of affected rows.
    fn execute_update(&mut self) -> MapperResult<u64>;

    fn execute_query(&mut self) -> MapperResult<ResultSet>;

    /// Queue the currently bound parameter set for [`execute_batch`](Statement::execute_batch).
    fn add_batch(&mut self) -> MapperResult<()>;

    /// Run every queued parameter set in order; one update count per set.
    fn execute_batch(&mut self) -> MapperResult<Vec<u64>>;

    fn close(&mut self) -> MapperResult<()>;
}

/// A live backend connection.
pub trait Connection: Send {
    fn prepare(&self, sql: &str) -> MapperResult<Box<dyn Statement>>;

    fn commit(&self) -> MapperResult<()>;

    fn rollback(&self) -> MapperResult<()>;

    fn close(&self) -> MapperResult<()>;

    /// With auto-commit on, every statement commits on its own.
    fn set_auto_commit(&self, _auto_commit: bool) -> MapperResult<()> {
        Ok(())
    }
}

/// Owns a connection for one unit of work.
pub trait Transaction: Send {
    fn connection(&mut self) -> MapperResult<&dyn Connection>;

    fn commit(&mut self) -> MapperResult<()>;

    fn rollback(&mut self) -> MapperResult<()>;

    fn close(&mut self) -> MapperResult<()>;

    /// Remaining time budget; caps each statement timeout.
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

/// A [`Transaction`] over a single supplied connection.
///
/// Auto-commit is switched off on first use unless requested, so `commit`
/// and `rollback` are forwarded to the connection.
pub struct ConnectionTransaction<C> {
    connection: C,
    auto_commit: bool,
    timeout: Option<Duration>,
    configured: bool,
    closed: bool,
}

impl<C: Connection> ConnectionTransaction<C> {
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            auto_commit: false,
            timeout: None,
            configured: false,
            closed: false,
        }
    }

    pub fn auto_commit(mut self, auto_commit: bool) -> Self {
        self.auto_commit = auto_commit;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Borrow the connection without going through the transaction.
    pub fn inner(&self) -> &C {
        &self.connection
    }

    fn check_open(&self) -> MapperResult<()> {
        if self.closed {
            return Err(MapperError::execution("Transaction already closed"));
        }
        Ok(())
    }
}

impl<C: Connection> Transaction for ConnectionTransaction<C> {
    fn connection(&mut self) -> MapperResult<&dyn Connection> {
        self.check_open()?;
        if !self.configured {
            self.connection.set_auto_commit(self.auto_commit)?;
            self.configured = true;
        }
        Ok(&self.connection)
    }

    fn commit(&mut self) -> MapperResult<()> {
        self.check_open()?;
        if self.configured && !self.auto_commit {
            tracing::debug!(target: "sqlmap", "committing connection");
            self.connection.commit()?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> MapperResult<()> {
        self.check_open()?;
        if self.configured && !self.auto_commit {
            tracing::debug!(target: "sqlmap", "rolling back connection");
            self.connection.rollback()?;
        }
        Ok(())
    }

    fn close(&mut self) -> MapperResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.configured && !self.auto_commit {
            // leave nothing half-open behind
            if let Err(e) = self.connection.rollback() {
                tracing::warn!(target: "sqlmap", error = %e, "rollback on close failed");
            }
        }
        self.connection.close()
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// One result row: column names shared with its result set plus values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw cell by column name (case-insensitive).
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|i| self.values.get(i))
    }

    /// Typed cell by column name.
    pub fn get<T: FromValue>(&self, column: &str) -> MapperResult<T> {
        let value = self.value(column).ok_or_else(|| {
            MapperError::not_found(format!("Column '{column}' not found in result row"))
        })?;
        T::from_value(value.clone())
            .map_err(|e| MapperError::binding(format!("Error decoding column '{column}': {e}")))
    }

    /// Typed cell by 0-based position.
    pub fn get_index<T: FromValue>(&self, index: usize) -> MapperResult<T> {
        let value = self.values.get(index).ok_or_else(|| {
            MapperError::not_found(format!(
                "Column index {index} out of range ({} columns)",
                self.values.len()
            ))
        })?;
        T::from_value(value.clone())
    }

    /// The row as a map from column name to value.
    pub fn into_map(self) -> Value {
        Value::Map(
            self.columns
                .iter()
                .cloned()
                .zip(self.values)
                .collect::<BTreeMap<_, _>>(),
        )
    }
}

/// Rows returned by a query, in backend order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let shared: Arc<[String]> = columns.clone().into();
        let rows = rows
            .into_iter()
            .map(|values| Row::new(Arc::clone(&shared), values))
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests;
