use super::handler::{StatementHandler, release};
use super::{BatchResult, StatementStrategy};
use crate::backend::{Connection, ResultSet, Statement};
use crate::config::Configuration;
use crate::error::MapperResult;
use std::collections::HashMap;
use std::time::Duration;

/// Handles cached by final SQL text until the next flush.
///
/// A handle whose parameterize or execute fails is dropped from the cache
/// and closed.
#[derive(Default)]
pub(crate) struct ReuseStrategy {
    statements: HashMap<String, Box<dyn Statement>>,
}

impl ReuseStrategy {
    fn run<T>(
        &mut self,
        handler: &StatementHandler<'_>,
        connection: &dyn Connection,
        transaction_timeout: Option<Duration>,
        execute: impl FnOnce(&mut dyn Statement) -> MapperResult<T>,
    ) -> MapperResult<T> {
        let sql = handler.bound_sql().sql();
        let monitor = handler.configuration().monitor();
        let mut handle = match self.statements.remove(sql) {
            Some(mut cached) => {
                monitor.on_statement_cache(sql, true);
                cached.set_query_timeout(handler.timeout(transaction_timeout));
                cached
            }
            None => {
                monitor.on_statement_cache(sql, false);
                handler.prepare(connection, transaction_timeout)?
            }
        };

        match handler
            .parameterize(handle.as_mut())
            .and_then(|()| execute(handle.as_mut()))
        {
            Ok(value) => {
                self.statements.insert(sql.to_string(), handle);
                Ok(value)
            }
            Err(e) => {
                release(handle.as_mut());
                Err(e)
            }
        }
    }
}

impl StatementStrategy for ReuseStrategy {
    fn update(
        &mut self,
        handler: &StatementHandler<'_>,
        connection: &dyn Connection,
        transaction_timeout: Option<Duration>,
    ) -> MapperResult<u64> {
        self.run(handler, connection, transaction_timeout, |handle| handler.update(handle))
    }

    fn query(
        &mut self,
        handler: &StatementHandler<'_>,
        connection: &dyn Connection,
        transaction_timeout: Option<Duration>,
    ) -> MapperResult<ResultSet> {
        self.run(handler, connection, transaction_timeout, |handle| handler.query(handle))
    }

    fn flush(&mut self, _configuration: &Configuration, _is_rollback: bool) -> MapperResult<Vec<BatchResult>> {
        self.close_statements();
        Ok(Vec::new())
    }

    fn close_statements(&mut self) {
        for (_, mut handle) in self.statements.drain() {
            release(handle.as_mut());
        }
    }
}
