use super::types::{QueryContext, QueryMonitor, QueryResult, QueryType};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// A no-op monitor that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

impl QueryMonitor for NoopMonitor {
    fn on_query_complete(&self, _ctx: &QueryContext, _duration: Duration, _result: &QueryResult) {}
}

fn saturating_add(counter: &AtomicU64, nanos: u64) {
    let prev = counter.fetch_add(nanos, Ordering::Relaxed);
    if prev.checked_add(nanos).is_none() {
        counter.store(u64::MAX, Ordering::Relaxed);
    }
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// A monitor that tracks execution statistics.
#[derive(Debug, Default)]
pub struct StatsMonitor {
    total_queries: AtomicU64,
    failed_queries: AtomicU64,
    total_duration_nanos: AtomicU64,
    select_count: AtomicU64,
    insert_count: AtomicU64,
    update_count: AtomicU64,
    delete_count: AtomicU64,
    max_duration_nanos: AtomicU64,
    slowest_query: Mutex<Option<String>>,
    stmt_cache_hits: AtomicU64,
    stmt_cache_misses: AtomicU64,
    stmt_prepare_count: AtomicU64,
    stmt_prepare_duration_nanos: AtomicU64,
    batch_flushes: AtomicU64,
    batched_statements: AtomicU64,
}

/// Collected statistics.
#[derive(Debug, Clone, Default)]
pub struct QueryStats {
    /// Total number of statements executed (batch flushes count once).
    pub total_queries: u64,
    /// Total number of failed statements.
    pub failed_queries: u64,
    /// Total execution time.
    pub total_duration: Duration,
    pub select_count: u64,
    pub insert_count: u64,
    pub update_count: u64,
    pub delete_count: u64,
    /// Slowest statement duration.
    pub max_duration: Duration,
    /// Slowest statement SQL.
    pub slowest_query: Option<String>,
    /// Reuse executor handle cache hits.
    pub stmt_cache_hits: u64,
    /// Reuse executor handle cache misses.
    pub stmt_cache_misses: u64,
    /// Number of backend prepares.
    pub stmt_prepare_count: u64,
    /// Total time spent preparing statements.
    pub stmt_prepare_duration: Duration,
    /// Number of batch handles flushed.
    pub batch_flushes: u64,
    /// Parameter sets executed through batch flushes.
    pub batched_statements: u64,
}

impl StatsMonitor {
    /// Create a new stats monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current statistics.
    pub fn stats(&self) -> QueryStats {
        QueryStats {
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            total_duration: Duration::from_nanos(self.total_duration_nanos.load(Ordering::Relaxed)),
            select_count: self.select_count.load(Ordering::Relaxed),
            insert_count: self.insert_count.load(Ordering::Relaxed),
            update_count: self.update_count.load(Ordering::Relaxed),
            delete_count: self.delete_count.load(Ordering::Relaxed),
            max_duration: Duration::from_nanos(self.max_duration_nanos.load(Ordering::Relaxed)),
            slowest_query: self
                .slowest_query
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            stmt_cache_hits: self.stmt_cache_hits.load(Ordering::Relaxed),
            stmt_cache_misses: self.stmt_cache_misses.load(Ordering::Relaxed),
            stmt_prepare_count: self.stmt_prepare_count.load(Ordering::Relaxed),
            stmt_prepare_duration: Duration::from_nanos(
                self.stmt_prepare_duration_nanos.load(Ordering::Relaxed),
            ),
            batch_flushes: self.batch_flushes.load(Ordering::Relaxed),
            batched_statements: self.batched_statements.load(Ordering::Relaxed),
        }
    }

    /// Reset all statistics.
    pub fn reset(&self) {
        for counter in [
            &self.total_queries,
            &self.failed_queries,
            &self.total_duration_nanos,
            &self.select_count,
            &self.insert_count,
            &self.update_count,
            &self.delete_count,
            &self.max_duration_nanos,
            &self.stmt_cache_hits,
            &self.stmt_cache_misses,
            &self.stmt_prepare_count,
            &self.stmt_prepare_duration_nanos,
            &self.batch_flushes,
            &self.batched_statements,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        *self
            .slowest_query
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl QueryMonitor for StatsMonitor {
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        let duration_nanos = nanos(duration);

        self.total_queries.fetch_add(1, Ordering::Relaxed);
        saturating_add(&self.total_duration_nanos, duration_nanos);

        let counter = match ctx.query_type {
            QueryType::Select => Some(&self.select_count),
            QueryType::Insert => Some(&self.insert_count),
            QueryType::Update => Some(&self.update_count),
            QueryType::Delete => Some(&self.delete_count),
            QueryType::Batch => None,
        };
        if let Some(counter) = counter {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        if result.is_error() {
            self.failed_queries.fetch_add(1, Ordering::Relaxed);
        }

        // Only the thread that raises the max records the slowest SQL.
        let mut current_max = self.max_duration_nanos.load(Ordering::Relaxed);
        while duration_nanos > current_max {
            match self.max_duration_nanos.compare_exchange_weak(
                current_max,
                duration_nanos,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    *self
                        .slowest_query
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Some(ctx.sql.clone());
                    break;
                }
                Err(updated) => current_max = updated,
            }
        }
    }

    fn on_prepare(&self, _sql: &str, duration: Duration) {
        self.stmt_prepare_count.fetch_add(1, Ordering::Relaxed);
        saturating_add(&self.stmt_prepare_duration_nanos, nanos(duration));
    }

    fn on_statement_cache(&self, _sql: &str, hit: bool) {
        let counter = if hit {
            &self.stmt_cache_hits
        } else {
            &self.stmt_cache_misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn on_batch_flush(&self, _statement_id: &str, size: usize) {
        self.batch_flushes.fetch_add(1, Ordering::Relaxed);
        self.batched_statements
            .fetch_add(size as u64, Ordering::Relaxed);
    }
}

/// A composite monitor that delegates to multiple monitors.
#[derive(Default)]
pub struct CompositeMonitor {
    monitors: Vec<Arc<dyn QueryMonitor>>,
}

impl CompositeMonitor {
    /// Create an empty composite monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a monitor.
    #[allow(clippy::should_implement_trait)]
    pub fn add<M: QueryMonitor + 'static>(mut self, monitor: M) -> Self {
        self.monitors.push(Arc::new(monitor));
        self
    }

    /// Add an Arc-wrapped monitor.
    pub fn add_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.monitors.push(monitor);
        self
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl QueryMonitor for CompositeMonitor {
    fn on_query_start(&self, ctx: &QueryContext) {
        for monitor in &self.monitors {
            monitor.on_query_start(ctx);
        }
    }

    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        for monitor in &self.monitors {
            monitor.on_query_complete(ctx, duration, result);
        }
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration) {
        for monitor in &self.monitors {
            monitor.on_slow_query(ctx, duration);
        }
    }

    fn on_prepare(&self, sql: &str, duration: Duration) {
        for monitor in &self.monitors {
            monitor.on_prepare(sql, duration);
        }
    }

    fn on_statement_cache(&self, sql: &str, hit: bool) {
        for monitor in &self.monitors {
            monitor.on_statement_cache(sql, hit);
        }
    }

    fn on_batch_flush(&self, statement_id: &str, size: usize) {
        for monitor in &self.monitors {
            monitor.on_batch_flush(statement_id, size);
        }
    }
}
