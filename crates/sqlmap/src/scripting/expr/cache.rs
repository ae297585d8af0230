use super::parser::Expr;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

/// Parsed expressions keyed by their source text.
///
/// A zero capacity disables caching; every lookup misses and nothing is kept.
#[derive(Debug)]
pub(super) struct ExpressionCache {
    entries: Option<Mutex<LruCache<String, Arc<Expr>>>>,
}

impl ExpressionCache {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// The cached parse of `expression`, or the result of `parse` stored for
    /// next time. Parsing runs outside the lock.
    pub(super) fn get_or_parse<E>(
        &self,
        expression: &str,
        parse: impl FnOnce(&str) -> Result<Expr, E>,
    ) -> Result<Arc<Expr>, E> {
        let Some(entries) = &self.entries else {
            return parse(expression).map(Arc::new);
        };
        if let Some(expr) = entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(expression)
        {
            return Ok(Arc::clone(expr));
        }

        let parsed = Arc::new(parse(expression)?);
        let mut entries = entries.lock().unwrap_or_else(PoisonError::into_inner);
        // another thread may have parsed the same text meanwhile; keep the first
        Ok(Arc::clone(
            entries.get_or_insert(expression.to_string(), || parsed),
        ))
    }

    #[cfg(test)]
    pub(super) fn contains(&self, expression: &str) -> bool {
        self.entries.as_ref().is_some_and(|entries| {
            entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(expression)
        })
    }

    pub(super) fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| {
            entries.lock().unwrap_or_else(PoisonError::into_inner).len()
        })
    }
}
