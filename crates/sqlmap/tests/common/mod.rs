//! In-memory backend shared by the integration tests.

#![allow(dead_code)]

use sqlmap::backend::{Connection, ResultSet, Statement};
use sqlmap::{JdbcType, MapperError, MapperResult, Value};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// One executed statement with the parameters bound for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Default)]
struct Log {
    prepared: Vec<String>,
    executed: Vec<Executed>,
    batches: Vec<(String, usize)>,
    commits: usize,
    rollbacks: usize,
    closed_statements: usize,
    closed: bool,
    rows: Option<ResultSet>,
    reject: Option<String>,
}

/// Cloneable view onto everything a [`MemoryConnection`] was asked to do.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    log: Arc<Mutex<Log>>,
}

impl MemoryBackend {
    fn with<R>(&self, f: impl FnOnce(&mut Log) -> R) -> R {
        f(&mut self.log.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn connection(&self) -> MemoryConnection {
        MemoryConnection {
            backend: self.clone(),
        }
    }

    pub fn prepared(&self) -> Vec<String> {
        self.with(|l| l.prepared.clone())
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.with(|l| l.executed.clone())
    }

    pub fn batches(&self) -> Vec<(String, usize)> {
        self.with(|l| l.batches.clone())
    }

    pub fn commits(&self) -> usize {
        self.with(|l| l.commits)
    }

    pub fn rollbacks(&self) -> usize {
        self.with(|l| l.rollbacks)
    }

    pub fn closed_statements(&self) -> usize {
        self.with(|l| l.closed_statements)
    }

    pub fn is_closed(&self) -> bool {
        self.with(|l| l.closed)
    }

    /// Rows returned by every query from now on.
    pub fn respond_with(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        self.with(|l| l.rows = Some(ResultSet::new(columns, rows)));
    }

    /// Executing SQL containing `fragment` fails.
    pub fn reject(&self, fragment: &str) {
        self.with(|l| l.reject = Some(fragment.to_string()));
    }
}

pub struct MemoryConnection {
    backend: MemoryBackend,
}

impl Connection for MemoryConnection {
    fn prepare(&self, sql: &str) -> MapperResult<Box<dyn Statement>> {
        self.backend.with(|l| l.prepared.push(sql.to_string()));
        Ok(Box::new(MemoryStatement {
            backend: self.backend.clone(),
            sql: sql.to_string(),
            params: Vec::new(),
            batch: Vec::new(),
        }))
    }

    fn commit(&self) -> MapperResult<()> {
        self.backend.with(|l| l.commits += 1);
        Ok(())
    }

    fn rollback(&self) -> MapperResult<()> {
        self.backend.with(|l| l.rollbacks += 1);
        Ok(())
    }

    fn close(&self) -> MapperResult<()> {
        self.backend.with(|l| l.closed = true);
        Ok(())
    }
}

struct MemoryStatement {
    backend: MemoryBackend,
    sql: String,
    params: Vec<Value>,
    batch: Vec<Vec<Value>>,
}

impl MemoryStatement {
    fn run(&self, params: Vec<Value>) -> MapperResult<()> {
        let rejected = self
            .backend
            .with(|l| l.reject.as_deref().is_some_and(|f| self.sql.contains(f)));
        if rejected {
            return Err(MapperError::execution(format!("rejected: {}", self.sql)));
        }
        self.backend.with(|l| {
            l.executed.push(Executed {
                sql: self.sql.clone(),
                params,
            })
        });
        Ok(())
    }
}

impl Statement for MemoryStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn bind(&mut self, position: usize, value: &Value, _jdbc_type: Option<JdbcType>) -> MapperResult<()> {
        if self.params.len() < position {
            self.params.resize(position, Value::Null);
        }
        self.params[position - 1] = value.clone();
        Ok(())
    }

    fn clear_parameters(&mut self) {
        self.params.clear();
    }

    fn set_query_timeout(&mut self, _timeout: Option<Duration>) {}

    fn execute_update(&mut self) -> MapperResult<u64> {
        self.run(self.params.clone())?;
        Ok(1)
    }

    fn execute_query(&mut self) -> MapperResult<ResultSet> {
        self.run(self.params.clone())?;
        Ok(self.backend.with(|l| l.rows.clone().unwrap_or_default()))
    }

    fn add_batch(&mut self) -> MapperResult<()> {
        self.batch.push(std::mem::take(&mut self.params));
        Ok(())
    }

    fn execute_batch(&mut self) -> MapperResult<Vec<u64>> {
        let sets = std::mem::take(&mut self.batch);
        self.backend
            .with(|l| l.batches.push((self.sql.clone(), sets.len())));
        let mut counts = Vec::with_capacity(sets.len());
        for params in sets {
            self.run(params)?;
            counts.push(1);
        }
        Ok(counts)
    }

    fn close(&mut self) -> MapperResult<()> {
        self.backend.with(|l| l.closed_statements += 1);
        Ok(())
    }
}
