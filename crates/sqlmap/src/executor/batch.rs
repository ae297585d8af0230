use super::handler::{StatementHandler, release};
use super::{BatchResult, ExecutorType, StatementStrategy, observed};
use crate::backend::{Connection, ResultSet, Statement};
use crate::config::Configuration;
use crate::error::{MapperError, MapperResult};
use crate::monitor::{QueryContext, QueryResult, QueryType};
use std::time::Duration;

struct Pending {
    handle: Box<dyn Statement>,
    result: BatchResult,
}

/// Updates queue on shared handles; nothing runs until flush.
///
/// Consecutive updates with the same SQL text and statement id add a
/// parameter set to the last handle; anything else opens a new one. Handles
/// flush in the order they were opened.
#[derive(Default)]
pub(crate) struct BatchStrategy {
    pending: Vec<Pending>,
}

impl BatchStrategy {
    fn current(&mut self, statement_id: &str, sql: &str) -> Option<&mut Pending> {
        self.pending
            .last_mut()
            .filter(|p| p.result.sql == sql && p.result.statement_id == statement_id)
    }

    fn discard_all(&mut self) {
        for mut pending in self.pending.drain(..) {
            release(pending.handle.as_mut());
        }
    }
}

impl StatementStrategy for BatchStrategy {
    fn update(
        &mut self,
        handler: &StatementHandler<'_>,
        connection: &dyn Connection,
        transaction_timeout: Option<Duration>,
    ) -> MapperResult<u64> {
        let sql = handler.bound_sql().sql();
        let statement_id = handler.statement().id();

        let queued = match self.current(statement_id, sql) {
            Some(pending) => {
                pending
                    .handle
                    .set_query_timeout(handler.timeout(transaction_timeout));
                handler
                    .parameterize(pending.handle.as_mut())
                    .and_then(|()| handler.batch(pending.handle.as_mut()))
                    .map(|()| pending.result.parameter_objects.push(handler.parameter().clone()))
            }
            None => {
                let mut handle = handler.prepare(connection, transaction_timeout)?;
                let mut result = BatchResult::new(statement_id, sql);
                match handler
                    .parameterize(handle.as_mut())
                    .and_then(|()| handler.batch(handle.as_mut()))
                {
                    Ok(()) => {
                        result.parameter_objects.push(handler.parameter().clone());
                        self.pending.push(Pending { handle, result });
                        Ok(())
                    }
                    Err(e) => {
                        release(handle.as_mut());
                        return Err(e);
                    }
                }
            }
        };

        if let Err(e) = queued {
            // the shared handle may hold a half-bound set; drop it with its queue
            if let Some(mut poisoned) = self.pending.pop() {
                tracing::warn!(
                    target: "sqlmap",
                    statement = %poisoned.result.statement_id,
                    discarded = poisoned.result.parameter_objects.len(),
                    "discarding batch after bind failure"
                );
                release(poisoned.handle.as_mut());
            }
            return Err(e);
        }
        Ok(0)
    }

    fn query(
        &mut self,
        handler: &StatementHandler<'_>,
        connection: &dyn Connection,
        transaction_timeout: Option<Duration>,
    ) -> MapperResult<ResultSet> {
        self.flush(handler.configuration(), false)?;
        let mut handle = handler.prepare(connection, transaction_timeout)?;
        let result = handler
            .parameterize(handle.as_mut())
            .and_then(|()| handler.query(handle.as_mut()));
        release(handle.as_mut());
        result
    }

    fn flush(&mut self, configuration: &Configuration, is_rollback: bool) -> MapperResult<Vec<BatchResult>> {
        if is_rollback {
            self.discard_all();
            return Ok(Vec::new());
        }

        let total = self.pending.len();
        let mut results = Vec::with_capacity(total);
        let mut queue = std::mem::take(&mut self.pending).into_iter();
        while let Some(Pending { mut handle, mut result }) = queue.next() {
            let ctx = QueryContext::new(
                result.statement_id.as_str(),
                result.sql.as_str(),
                result.parameter_objects.len(),
                QueryType::Batch,
                ExecutorType::Batch,
            );
            let executed = observed(
                configuration,
                &ctx,
                || handle.execute_batch(),
                |counts| QueryResult::BatchCounts(counts.clone()),
            );
            release(handle.as_mut());

            match executed {
                Ok(counts) => {
                    configuration
                        .monitor()
                        .on_batch_flush(&result.statement_id, counts.len());
                    result.update_counts = counts;
                    results.push(result);
                }
                Err(e) => {
                    for mut rest in queue {
                        release(rest.handle.as_mut());
                    }
                    let message = format!(
                        "Error flushing statements. The cause is the statement '{}' (batch {} of {}, {} completed). Cause: {e}",
                        result.statement_id,
                        results.len() + 1,
                        total,
                        results.len()
                    );
                    return Err(MapperError::execution_with(message, e));
                }
            }
        }
        Ok(results)
    }

    fn close_statements(&mut self) {
        self.discard_all();
    }
}
