//! PostgreSQL backend over `tokio-postgres`.
//!
//! The executor pipeline is synchronous, so each [`PgConnection`] owns a
//! current-thread `tokio` runtime and drives the client from it with
//! `block_on`. Do not call into a `PgConnection` from inside another async
//! runtime; use `spawn_blocking` there.
//!
//! Statements are prepared server-side and use `$n` markers, so configure
//! [`PlaceholderStyle::Dollar`](crate::config::PlaceholderStyle::Dollar).
//!
//! ```ignore
//! use sqlmap::backend::{ConnectionTransaction, postgres::PgConnection};
//!
//! let connection = PgConnection::connect(&database_url)?;
//! let mut session = configuration.open_session(
//!     Box::new(ConnectionTransaction::new(connection)),
//!     None,
//!     false,
//! );
//! ```

use super::{Connection, ResultSet, Statement};
use crate::error::{MapperError, MapperResult};
use crate::mapping::JdbcType;
use crate::value::Value;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use std::error::Error;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_postgres::{Client, NoTls};

struct PgShared {
    runtime: tokio::runtime::Runtime,
    client: Client,
    auto_commit: AtomicBool,
    in_transaction: AtomicBool,
    closed: AtomicBool,
}

impl PgShared {
    /// Run `future` to completion, bounded by `timeout` when set.
    ///
    /// On timeout the running query is cancelled server-side.
    fn run<T, F>(&self, timeout: Option<Duration>, future: F) -> MapperResult<T>
    where
        F: Future<Output = Result<T, tokio_postgres::Error>>,
    {
        self.runtime.block_on(async {
            match timeout {
                Some(timeout) => match tokio::time::timeout(timeout, future).await {
                    Ok(result) => result.map_err(MapperError::from),
                    Err(_) => {
                        let cancel_token = self.client.cancel_token();
                        if let Err(e) = cancel_token.cancel_query(NoTls).await {
                            tracing::warn!(target: "sqlmap", error = %e, "failed to cancel timed out query");
                        }
                        Err(MapperError::Timeout(timeout))
                    }
                },
                None => future.await.map_err(MapperError::from),
            }
        })
    }

    fn check_open(&self) -> MapperResult<()> {
        if self.closed.load(Ordering::Acquire) || self.client.is_closed() {
            return Err(MapperError::execution("Connection is closed"));
        }
        Ok(())
    }

    /// Open a transaction block before the first statement when auto-commit
    /// is off.
    fn begin_if_needed(&self) -> MapperResult<()> {
        if self.auto_commit.load(Ordering::Acquire) || self.in_transaction.load(Ordering::Acquire) {
            return Ok(());
        }
        self.run(None, self.client.batch_execute("BEGIN"))?;
        self.in_transaction.store(true, Ordering::Release);
        Ok(())
    }

    fn finish(&self, command: &str) -> MapperResult<()> {
        self.check_open()?;
        if !self.in_transaction.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        self.run(None, self.client.batch_execute(command))
    }
}

/// A PostgreSQL connection driven synchronously.
pub struct PgConnection {
    shared: Arc<PgShared>,
}

impl PgConnection {
    /// Connect with `NoTls` using a connection string or URL.
    pub fn connect(database_url: &str) -> MapperResult<Self> {
        let config: tokio_postgres::Config = database_url.parse()?;
        Self::connect_with(&config)
    }

    pub fn connect_with(config: &tokio_postgres::Config) -> MapperResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| MapperError::execution_with("failed to start connection runtime", e))?;
        let (client, connection) = runtime.block_on(config.connect(NoTls))?;
        // Polled whenever the runtime is driven by `block_on`.
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(target: "sqlmap", error = %e, "postgres connection closed with error");
            }
        });
        tracing::debug!(target: "sqlmap", "postgres connection established");

        Ok(Self {
            shared: Arc::new(PgShared {
                runtime,
                client,
                auto_commit: AtomicBool::new(true),
                in_transaction: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Run raw SQL (possibly several statements) without parameters.
    pub fn batch_execute(&self, sql: &str) -> MapperResult<()> {
        self.shared.check_open()?;
        self.shared.begin_if_needed()?;
        self.shared.run(None, self.shared.client.batch_execute(sql))
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire) || self.shared.client.is_closed()
    }
}

impl Connection for PgConnection {
    fn prepare(&self, sql: &str) -> MapperResult<Box<dyn Statement>> {
        self.shared.check_open()?;
        let statement = self.shared.run(None, self.shared.client.prepare(sql))?;
        Ok(Box::new(PgStatement {
            shared: Arc::clone(&self.shared),
            sql: sql.to_string(),
            statement,
            parameters: Vec::new(),
            batch: Vec::new(),
            timeout: None,
            closed: false,
        }))
    }

    fn commit(&self) -> MapperResult<()> {
        self.shared.finish("COMMIT")
    }

    fn rollback(&self) -> MapperResult<()> {
        self.shared.finish("ROLLBACK")
    }

    fn close(&self) -> MapperResult<()> {
        self.shared.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn set_auto_commit(&self, auto_commit: bool) -> MapperResult<()> {
        if auto_commit && self.shared.in_transaction.load(Ordering::Acquire) {
            self.shared.finish("COMMIT")?;
        }
        self.shared.auto_commit.store(auto_commit, Ordering::Release);
        Ok(())
    }
}

/// A server-side prepared statement.
pub struct PgStatement {
    shared: Arc<PgShared>,
    sql: String,
    statement: tokio_postgres::Statement,
    parameters: Vec<Value>,
    batch: Vec<Vec<Value>>,
    timeout: Option<Duration>,
    closed: bool,
}

impl PgStatement {
    fn check_open(&self) -> MapperResult<()> {
        if self.closed {
            return Err(MapperError::execution("Statement is closed"));
        }
        self.shared.check_open()
    }

    fn check_arity(&self, parameters: &[Value]) -> MapperResult<()> {
        let expected = self.statement.params().len();
        if parameters.len() != expected {
            return Err(MapperError::execution(format!(
                "Statement expects {expected} parameters but {} were bound",
                parameters.len()
            )));
        }
        Ok(())
    }

    fn execute_with(&self, parameters: &[Value]) -> MapperResult<u64> {
        self.check_arity(parameters)?;
        let params: Vec<&(dyn ToSql + Sync)> =
            parameters.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
        self.shared.begin_if_needed()?;
        self.shared
            .run(self.timeout, self.shared.client.execute(&self.statement, &params))
    }
}

impl Statement for PgStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn bind(&mut self, position: usize, value: &Value, _jdbc_type: Option<JdbcType>) -> MapperResult<()> {
        if position == 0 {
            return Err(MapperError::binding("Parameter positions start at 1"));
        }
        if self.parameters.len() < position {
            self.parameters.resize(position, Value::Null);
        }
        self.parameters[position - 1] = value.clone();
        Ok(())
    }

    fn clear_parameters(&mut self) {
        self.parameters.clear();
    }

    fn set_query_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    fn execute_update(&mut self) -> MapperResult<u64> {
        self.check_open()?;
        self.execute_with(&self.parameters)
    }

    fn execute_query(&mut self) -> MapperResult<ResultSet> {
        self.check_open()?;
        self.check_arity(&self.parameters)?;
        let params: Vec<&(dyn ToSql + Sync)> =
            self.parameters.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
        self.shared.begin_if_needed()?;
        let rows = self
            .shared
            .run(self.timeout, self.shared.client.query(&self.statement, &params))?;

        let columns: Vec<String> = self
            .statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let mut decoded = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut values = Vec::with_capacity(columns.len());
            for (index, column) in self.statement.columns().iter().enumerate() {
                values.push(decode_column(row, index, column.type_())?);
            }
            decoded.push(values);
        }
        Ok(ResultSet::new(columns, decoded))
    }

    fn add_batch(&mut self) -> MapperResult<()> {
        self.check_open()?;
        self.batch.push(self.parameters.clone());
        Ok(())
    }

    fn execute_batch(&mut self) -> MapperResult<Vec<u64>> {
        self.check_open()?;
        let batch = std::mem::take(&mut self.batch);
        let mut counts = Vec::with_capacity(batch.len());
        for parameters in &batch {
            counts.push(self.execute_with(parameters)?);
        }
        Ok(counts)
    }

    fn close(&mut self) -> MapperResult<()> {
        self.closed = true;
        self.batch.clear();
        self.parameters.clear();
        Ok(())
    }
}

// ==================== Value <-> Postgres ====================

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql_checked(ty, out),
            Value::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::OID => u32::try_from(*i)?.to_sql(ty, out),
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => i.to_string().to_sql(ty, out),
                _ => i.to_sql_checked(ty, out),
            },
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                _ => f.to_sql_checked(ty, out),
            },
            Value::Text(s) => match *ty {
                Type::UUID => uuid::Uuid::parse_str(s)?.to_sql(ty, out),
                Type::JSON | Type::JSONB => {
                    serde_json::Value::String(s.clone()).to_sql(ty, out)
                }
                _ => s.as_str().to_sql_checked(ty, out),
            },
            Value::Bytes(b) => b.as_slice().to_sql_checked(ty, out),
            Value::Timestamp(t) => match *ty {
                Type::TIMESTAMPTZ => Utc.from_utc_datetime(t).to_sql(ty, out),
                Type::DATE => t.date().to_sql(ty, out),
                _ => t.to_sql_checked(ty, out),
            },
            Value::Uuid(u) => u.to_sql_checked(ty, out),
            Value::Json(j) => j.to_sql_checked(ty, out),
            Value::List(items) => items.to_sql_checked(ty, out),
            Value::Map(_) | Value::Bean(_) => Err(format!(
                "cannot bind a {} value to a parameter of type {ty}",
                self.type_label()
            )
            .into()),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn decode_column(row: &tokio_postgres::Row, index: usize, ty: &Type) -> MapperResult<Value> {
    fn get<'a, T>(row: &'a tokio_postgres::Row, index: usize) -> MapperResult<Option<T>>
    where
        T: tokio_postgres::types::FromSql<'a>,
    {
        row.try_get::<_, Option<T>>(index).map_err(MapperError::from)
    }

    let value = match *ty {
        Type::BOOL => get::<bool>(row, index)?.map(Value::Bool),
        Type::INT2 => get::<i16>(row, index)?.map(Value::from),
        Type::INT4 => get::<i32>(row, index)?.map(Value::from),
        Type::INT8 => get::<i64>(row, index)?.map(Value::Int),
        Type::OID => get::<u32>(row, index)?.map(Value::from),
        Type::FLOAT4 => get::<f32>(row, index)?.map(Value::from),
        Type::FLOAT8 => get::<f64>(row, index)?.map(Value::Float),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            get::<String>(row, index)?.map(Value::Text)
        }
        Type::BYTEA => get::<Vec<u8>>(row, index)?.map(Value::Bytes),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, index)?.map(Value::Timestamp),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, index)?.map(|t| Value::Timestamp(t.naive_utc())),
        Type::DATE => get::<NaiveDate>(row, index)?.map(|d| Value::Timestamp(d.and_time(NaiveTime::MIN))),
        Type::UUID => get::<uuid::Uuid>(row, index)?.map(Value::Uuid),
        Type::JSON | Type::JSONB => get::<serde_json::Value>(row, index)?.map(Value::Json),
        Type::BOOL_ARRAY => get::<Vec<Option<bool>>>(row, index)?.map(Value::from),
        Type::INT2_ARRAY => get::<Vec<Option<i16>>>(row, index)?.map(Value::from),
        Type::INT4_ARRAY => get::<Vec<Option<i32>>>(row, index)?.map(Value::from),
        Type::INT8_ARRAY => get::<Vec<Option<i64>>>(row, index)?.map(Value::from),
        Type::FLOAT8_ARRAY => get::<Vec<Option<f64>>>(row, index)?.map(Value::from),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => get::<Vec<Option<String>>>(row, index)?.map(Value::from),
        Type::UUID_ARRAY => get::<Vec<Option<uuid::Uuid>>>(row, index)?.map(Value::from),
        ref other => {
            return Err(MapperError::execution(format!(
                "Unsupported column type {other} at position {index}"
            )));
        }
    };
    Ok(value.unwrap_or(Value::Null))
}
