use super::class_def::ClassDef;
use super::reflector::Reflector;
use super::Bean;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

type Slot = Arc<OnceLock<Arc<Reflector>>>;

/// Registry of [`Reflector`]s, one per described type.
///
/// Concurrent first lookups of the same type build its table exactly once;
/// published tables are never replaced. Share one factory through an `Arc`.
#[derive(Debug)]
pub struct ReflectorFactory {
    class_cache_enabled: AtomicBool,
    cache: RwLock<HashMap<(TypeId, String), Slot>>,
}

impl Default for ReflectorFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ReflectorFactory {
    pub fn new() -> Self {
        Self {
            class_cache_enabled: AtomicBool::new(true),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_class_cache_enabled(&self) -> bool {
        self.class_cache_enabled.load(Ordering::Relaxed)
    }

    /// With the cache disabled every lookup builds a fresh table.
    pub fn set_class_cache_enabled(&self, enabled: bool) {
        self.class_cache_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn find_for_class(&self, class: &ClassDef) -> Arc<Reflector> {
        if !self.is_class_cache_enabled() {
            return Arc::new(Reflector::new(class));
        }

        let key = (class.type_id, class.name().to_string());
        let existing = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        let slot = match existing {
            Some(slot) => slot,
            None => self
                .cache
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(key)
                .or_default()
                .clone(),
        };
        // The map lock is released here; racing builders wait on the slot.
        slot.get_or_init(|| {
            tracing::trace!(target: "sqlmap", class = class.name(), "building reflector");
            Arc::new(Reflector::new(class))
        })
        .clone()
    }

    /// Reflector for the runtime type of `bean`.
    pub fn find_for_bean(&self, bean: &dyn Bean) -> Arc<Reflector> {
        self.find_for_class(&bean.class_def())
    }

    /// Number of types with a published table.
    pub fn cached_types(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }
}
