//! In-memory backend that records every call, for unit tests.

use super::{Connection, ResultSet, Statement};
use crate::error::{MapperError, MapperResult};
use crate::mapping::JdbcType;
use crate::value::Value;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    Prepare(String),
    Timeout(Option<Duration>),
    FetchSize(u32),
    Bind(usize, Value, Option<JdbcType>),
    Update(String),
    Query(String),
    AddBatch,
    ExecuteBatch(usize),
    Close(String),
    Commit,
    Rollback,
    CloseConnection,
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    rows: ResultSet,
    fail_bind: Option<Value>,
    fail_execute: Option<String>,
    fail_close: bool,
}

/// Shared handle onto the recorded calls and scripted failures.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    state: Arc<Mutex<State>>,
}

impl Recorder {
    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    pub(crate) fn connection(&self) -> RecordingConnection {
        RecordingConnection {
            recorder: self.clone(),
        }
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.with(|s| s.events.clone())
    }

    pub(crate) fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
        self.with(|s| s.events.iter().filter(|e| matches(e)).count())
    }

    pub(crate) fn bound_values(&self) -> Vec<Value> {
        self.with(|s| {
            s.events
                .iter()
                .filter_map(|e| match e {
                    Event::Bind(_, v, _) => Some(v.clone()),
                    _ => None,
                })
                .collect()
        })
    }

    pub(crate) fn clear(&self) {
        self.with(|s| s.events.clear());
    }

    pub(crate) fn set_rows(&self, rows: ResultSet) {
        self.with(|s| s.rows = rows);
    }

    /// Binding this value fails.
    pub(crate) fn fail_bind(&self, value: Value) {
        self.with(|s| s.fail_bind = Some(value));
    }

    /// Executing SQL containing this text fails.
    pub(crate) fn fail_execute(&self, sql_fragment: &str) {
        self.with(|s| s.fail_execute = Some(sql_fragment.to_string()));
    }

    pub(crate) fn fail_close(&self) {
        self.with(|s| s.fail_close = true);
    }

    fn record(&self, event: Event) {
        self.with(|s| s.events.push(event));
    }
}

pub(crate) struct RecordingConnection {
    recorder: Recorder,
}

impl Connection for RecordingConnection {
    fn prepare(&self, sql: &str) -> MapperResult<Box<dyn Statement>> {
        self.recorder.record(Event::Prepare(sql.to_string()));
        Ok(Box::new(RecordingStatement {
            recorder: self.recorder.clone(),
            sql: sql.to_string(),
            bound: 0,
            batch: Vec::new(),
        }))
    }

    fn commit(&self) -> MapperResult<()> {
        self.recorder.record(Event::Commit);
        Ok(())
    }

    fn rollback(&self) -> MapperResult<()> {
        self.recorder.record(Event::Rollback);
        Ok(())
    }

    fn close(&self) -> MapperResult<()> {
        self.recorder.record(Event::CloseConnection);
        Ok(())
    }
}

struct RecordingStatement {
    recorder: Recorder,
    sql: String,
    bound: usize,
    batch: Vec<usize>,
}

impl RecordingStatement {
    fn check_execute(&self) -> MapperResult<()> {
        let fails = self
            .recorder
            .with(|s| s.fail_execute.as_deref().is_some_and(|f| self.sql.contains(f)));
        if fails {
            return Err(MapperError::execution(format!("backend rejected: {}", self.sql)));
        }
        Ok(())
    }
}

impl Statement for RecordingStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn bind(&mut self, position: usize, value: &Value, jdbc_type: Option<JdbcType>) -> MapperResult<()> {
        if self.recorder.with(|s| s.fail_bind.as_ref() == Some(value)) {
            return Err(MapperError::execution(format!("cannot bind {value:?}")));
        }
        self.recorder.record(Event::Bind(position, value.clone(), jdbc_type));
        self.bound = self.bound.max(position);
        Ok(())
    }

    fn clear_parameters(&mut self) {
        self.bound = 0;
    }

    fn set_fetch_size(&mut self, rows: u32) {
        self.recorder.record(Event::FetchSize(rows));
    }

    fn set_query_timeout(&mut self, timeout: Option<Duration>) {
        self.recorder.record(Event::Timeout(timeout));
    }

    fn execute_update(&mut self) -> MapperResult<u64> {
        self.check_execute()?;
        self.recorder.record(Event::Update(self.sql.clone()));
        Ok(1)
    }

    fn execute_query(&mut self) -> MapperResult<ResultSet> {
        self.check_execute()?;
        self.recorder.record(Event::Query(self.sql.clone()));
        Ok(self.recorder.with(|s| s.rows.clone()))
    }

    fn add_batch(&mut self) -> MapperResult<()> {
        self.recorder.record(Event::AddBatch);
        self.batch.push(self.bound);
        Ok(())
    }

    fn execute_batch(&mut self) -> MapperResult<Vec<u64>> {
        self.check_execute()?;
        let sets = std::mem::take(&mut self.batch);
        self.recorder.record(Event::ExecuteBatch(sets.len()));
        // one affected row per bound parameter keeps counts distinguishable
        Ok(sets.into_iter().map(|n| n as u64).collect())
    }

    fn close(&mut self) -> MapperResult<()> {
        self.recorder.record(Event::Close(self.sql.clone()));
        if self.recorder.with(|s| s.fail_close) {
            return Err(MapperError::resource("close failed"));
        }
        Ok(())
    }
}
