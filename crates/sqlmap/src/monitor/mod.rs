//! Statement monitoring.
//!
//! Executors report every statement to a [`QueryMonitor`]: start and
//! completion with timing, slow statements, prepares, reuse cache probes and
//! batch flushes.
//!
//! ```rust,ignore
//! use sqlmap::monitor::{CompositeMonitor, StatsMonitor, TracingMonitor};
//! use std::sync::Arc;
//!
//! let stats = Arc::new(StatsMonitor::new());
//! let monitor = CompositeMonitor::new()
//!     .add(TracingMonitor::new())
//!     .add_arc(stats.clone());
//! let configuration = Configuration::new(settings).with_monitor(monitor);
//! ```

mod monitors;
mod tracing_monitor;
mod types;


pub use monitors::{CompositeMonitor, NoopMonitor, QueryStats, StatsMonitor};
pub use tracing_monitor::TracingMonitor;
pub use types::{QueryContext, QueryMonitor, QueryResult, QueryType};

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
