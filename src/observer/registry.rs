//! Multi-observer broadcast registry.
//!
//! Observers are held weakly and addressed through the [`ObserverId`] handed
//! out at registration. Owners deregister explicitly on teardown; an observer
//! that was dropped without deregistering is skipped and pruned on the next
//! broadcast.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Handle identifying one registration. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

struct Registry<T: ?Sized> {
    next_id: u64,
    /// Keyed by registration sequence, so iteration follows registration order.
    entries: BTreeMap<u64, Weak<T>>,
}

pub struct ObserverSet<T: ?Sized> {
    registry: Mutex<Registry<T>>,
}

impl<T: ?Sized> Default for ObserverSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> ObserverSet<T> {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                next_id: 0,
                entries: BTreeMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry<T>> {
        // Observers never run while the lock is held, so a poisoned lock
        // still guards a consistent map.
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register an observer. Registering the same observer again returns its
    /// existing handle.
    pub fn add(&self, observer: &Arc<T>) -> ObserverId {
        let mut registry = self.lock();
        let weak = Arc::downgrade(observer);
        if let Some((&id, _)) = registry
            .entries
            .iter()
            .find(|(_, existing)| Weak::ptr_eq(existing, &weak))
        {
            return ObserverId(id);
        }
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.insert(id, weak);
        ObserverId(id)
    }

    /// Deregister by handle. Returns false if the handle was already removed.
    pub fn remove(&self, id: ObserverId) -> bool {
        self.lock().entries.remove(&id.0).is_some()
    }

    /// Deregister by identity.
    pub fn remove_observer(&self, observer: &Arc<T>) -> bool {
        let weak = Arc::downgrade(observer);
        let mut registry = self.lock();
        let before = registry.entries.len();
        registry
            .entries
            .retain(|_, existing| !Weak::ptr_eq(existing, &weak));
        registry.entries.len() != before
    }

    pub fn contains(&self, id: ObserverId) -> bool {
        self.lock()
            .entries
            .get(&id.0)
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Number of live observers.
    pub fn len(&self) -> usize {
        self.lock()
            .entries
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke `notify` on every live observer, in registration order.
    ///
    /// The set of observers is captured before the first call, so observers may
    /// register or deregister (themselves or others) while being notified.
    pub fn notify(&self, mut notify: impl FnMut(&T)) {
        let snapshot: Vec<Arc<T>> = {
            let mut registry = self.lock();
            registry.entries.retain(|_, weak| weak.strong_count() > 0);
            registry.entries.values().filter_map(Weak::upgrade).collect()
        };
        for observer in &snapshot {
            notify(observer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Listener: Send + Sync {
        fn ping(&self, log: &Mutex<Vec<&'static str>>);
    }

    struct Named(&'static str);

    impl Listener for Named {
        fn ping(&self, log: &Mutex<Vec<&'static str>>) {
            log.lock().unwrap().push(self.0);
        }
    }

    #[test]
    fn test_notify_in_registration_order() {
        let set: ObserverSet<dyn Listener> = ObserverSet::new();
        let first: Arc<dyn Listener> = Arc::new(Named("first"));
        let second: Arc<dyn Listener> = Arc::new(Named("second"));
        let third: Arc<dyn Listener> = Arc::new(Named("third"));
        set.add(&first);
        let second_id = set.add(&second);
        set.add(&third);
        set.remove(second_id);
        let late: Arc<dyn Listener> = Arc::new(Named("late"));
        set.add(&late);

        let log = Mutex::new(Vec::new());
        set.notify(|listener| listener.ping(&log));

        assert_eq!(*log.lock().unwrap(), vec!["first", "third", "late"]);
    }

    #[test]
    fn test_registration_is_idempotent() {
        let set: ObserverSet<dyn Listener> = ObserverSet::new();
        let observer: Arc<dyn Listener> = Arc::new(Named("only"));

        let id = set.add(&observer);
        assert_eq!(set.add(&observer), id);
        assert_eq!(set.len(), 1);

        assert!(set.remove(id));
        assert!(!set.remove(id));
        assert!(!set.remove_observer(&observer));
        assert!(set.is_empty());
    }

    #[test]
    fn test_dropped_observers_are_skipped() {
        let set: ObserverSet<dyn Listener> = ObserverSet::new();
        let kept: Arc<dyn Listener> = Arc::new(Named("kept"));
        set.add(&kept);
        {
            let dropped: Arc<dyn Listener> = Arc::new(Named("dropped"));
            let id = set.add(&dropped);
            assert!(set.contains(id));
        }

        let log = Mutex::new(Vec::new());
        set.notify(|listener| listener.ping(&log));
        assert_eq!(*log.lock().unwrap(), vec!["kept"]);
        assert_eq!(set.len(), 1);
    }

    struct SelfRemoving {
        set: Arc<ObserverSet<dyn Counter>>,
        id: Mutex<Option<ObserverId>>,
        calls: AtomicUsize,
    }

    trait Counter: Send + Sync {
        fn hit(&self);
    }

    impl Counter for SelfRemoving {
        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = self.id.lock().unwrap().take() {
                self.set.remove(id);
            }
        }
    }

    struct Plain(AtomicUsize);

    impl Counter for Plain {
        fn hit(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_observer_can_deregister_during_broadcast() {
        let set: Arc<ObserverSet<dyn Counter>> = Arc::new(ObserverSet::new());
        let remover = Arc::new(SelfRemoving {
            set: Arc::clone(&set),
            id: Mutex::new(None),
            calls: AtomicUsize::new(0),
        });
        let after = Arc::new(Plain(AtomicUsize::new(0)));

        let remover_dyn: Arc<dyn Counter> = remover.clone();
        let after_dyn: Arc<dyn Counter> = after.clone();
        let id = set.add(&remover_dyn);
        *remover.id.lock().unwrap() = Some(id);
        set.add(&after_dyn);

        set.notify(|observer| observer.hit());
        set.notify(|observer| observer.hit());

        // The remover saw only the first broadcast; the next listener saw both.
        assert_eq!(remover.calls.load(Ordering::SeqCst), 1);
        assert_eq!(after.0.load(Ordering::SeqCst), 2);
    }
}
