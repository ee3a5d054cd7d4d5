//! Weakly-tracked sets of live resources.
//!
//! Registries never keep a resource alive. Dead entries are pruned the next
//! time the registry is enumerated.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Append-only list of weak references in creation order.
#[derive(Debug)]
pub struct Registry<T> {
    entries: Mutex<Vec<Weak<T>>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, resource: &Arc<T>) {
        self.entries.lock().push(Arc::downgrade(resource));
    }

    /// Live resources in creation order. Dead entries are dropped.
    pub fn live(&self) -> Vec<Arc<T>> {
        let mut entries = self.entries.lock();
        let mut live = Vec::with_capacity(entries.len());
        entries.retain(|weak| match weak.upgrade() {
            Some(resource) => {
                live.push(resource);
                true
            }
            None => false,
        });
        live
    }

    pub fn live_count(&self) -> usize {
        self.live().len()
    }

    /// Number of stored entries, including ones not yet pruned.
    pub fn tracked_count(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_prunes_dropped_entries() {
        let registry = Registry::new();
        let a = Arc::new(1);
        let b = Arc::new(2);
        let c = Arc::new(3);
        registry.register(&a);
        registry.register(&b);
        registry.register(&c);

        drop(b);
        assert_eq!(registry.tracked_count(), 3);

        let live: Vec<i32> = registry.live().iter().map(|v| **v).collect();
        assert_eq!(live, vec![1, 3]);
        assert_eq!(registry.tracked_count(), 2);
    }

    #[test]
    fn test_registry_does_not_extend_lifetime() {
        let registry = Registry::new();
        let value = Arc::new(String::from("mesh"));
        registry.register(&value);
        assert_eq!(Arc::strong_count(&value), 1);
    }
}
