use crate::executor::ExecutorType;
use std::fmt;
use std::time::Duration;

/// The type of SQL operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// SELECT query
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// A batch flush covering several statements
    Batch,
}

/// Context information about the statement being executed.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// Id of the mapped statement.
    pub statement_id: String,
    /// The SQL sent to the backend.
    pub sql: String,
    /// Number of bound parameters.
    pub param_count: usize,
    /// Kind of statement.
    pub query_type: QueryType,
    /// Strategy the statement ran under.
    pub executor_type: ExecutorType,
}

impl QueryContext {
    pub fn new(
        statement_id: impl Into<String>,
        sql: impl Into<String>,
        param_count: usize,
        query_type: QueryType,
        executor_type: ExecutorType,
    ) -> Self {
        Self {
            statement_id: statement_id.into(),
            sql: sql.into(),
            param_count,
            query_type,
            executor_type,
        }
    }
}

/// Maximum length for error messages in `QueryResult::Error`.
const MAX_ERROR_LEN: usize = 512;

/// Result of a statement execution for monitoring purposes.
#[derive(Debug, Clone)]
pub enum QueryResult {
    /// Query returned rows.
    Rows(usize),
    /// Statement affected rows.
    Affected(u64),
    /// Update queued for a later batch flush.
    Batched,
    /// Batch flush; one count per accumulated parameter set.
    BatchCounts(Vec<u64>),
    /// Execution failed (truncated to 512 bytes).
    Error(String),
}

impl QueryResult {
    /// Create an error result, truncating the message to avoid monitoring data explosion.
    pub fn error(msg: String) -> Self {
        if msg.len() > MAX_ERROR_LEN {
            Self::Error(format!("{}...", super::truncate_sql_bytes(&msg, MAX_ERROR_LEN)))
        } else {
            Self::Error(msg)
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryResult::Error(_))
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResult::Rows(n) => write!(f, "{n} rows"),
            QueryResult::Affected(n) => write!(f, "{n} affected"),
            QueryResult::Batched => f.write_str("batched"),
            QueryResult::BatchCounts(counts) => write!(f, "batch {counts:?}"),
            QueryResult::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Trait for monitoring statement execution.
///
/// Implement this trait to collect metrics, log statements, or integrate
/// with observability systems. Only `on_query_complete` is required.
pub trait QueryMonitor: Send + Sync {
    /// Called before a statement is executed.
    fn on_query_start(&self, _ctx: &QueryContext) {}

    /// Called after a statement completes (success or failure).
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult);

    /// Called when a statement ran longer than the configured threshold.
    fn on_slow_query(&self, _ctx: &QueryContext, _duration: Duration) {}

    /// A backend statement was prepared.
    fn on_prepare(&self, _sql: &str, _duration: Duration) {}

    /// The reuse executor found (`hit = true`) or missed a cached handle.
    fn on_statement_cache(&self, _sql: &str, _hit: bool) {}

    /// A batch handle was flushed with this many parameter sets.
    fn on_batch_flush(&self, _statement_id: &str, _size: usize) {}
}
