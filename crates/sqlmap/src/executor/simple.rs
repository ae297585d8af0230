use super::handler::{StatementHandler, release};
use super::{BatchResult, StatementStrategy};
use crate::backend::{Connection, ResultSet};
use crate::config::Configuration;
use crate::error::MapperResult;
use std::time::Duration;

/// One handle per call, closed on success and failure alike.
#[derive(Debug, Default)]
pub(crate) struct SimpleStrategy;

impl StatementStrategy for SimpleStrategy {
    fn update(
        &mut self,
        handler: &StatementHandler<'_>,
        connection: &dyn Connection,
        transaction_timeout: Option<Duration>,
    ) -> MapperResult<u64> {
        let mut handle = handler.prepare(connection, transaction_timeout)?;
        let result = handler
            .parameterize(handle.as_mut())
            .and_then(|()| handler.update(handle.as_mut()));
        release(handle.as_mut());
        result
    }

    fn query(
        &mut self,
        handler: &StatementHandler<'_>,
        connection: &dyn Connection,
        transaction_timeout: Option<Duration>,
    ) -> MapperResult<ResultSet> {
        let mut handle = handler.prepare(connection, transaction_timeout)?;
        let result = handler
            .parameterize(handle.as_mut())
            .and_then(|()| handler.query(handle.as_mut()));
        release(handle.as_mut());
        result
    }

    fn flush(&mut self, _configuration: &Configuration, _is_rollback: bool) -> MapperResult<Vec<BatchResult>> {
        Ok(Vec::new())
    }

    fn close_statements(&mut self) {}
}
