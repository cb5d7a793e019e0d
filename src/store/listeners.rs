use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// A zero-argument store listener. Identity is the `Rc` allocation.
pub type Listener = Rc<dyn Fn()>;

/// One registration in a [`ListenerSet`].
pub(crate) struct ListenerEntry {
    callback: Listener,
    active: Cell<bool>,
}

impl ListenerEntry {
    pub(crate) fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Invoke the callback unless the entry was removed in the meantime.
    pub(crate) fn fire(&self) {
        if self.active.get() {
            (self.callback)();
        }
    }
}

/// Identity-deduplicated listener registry owned by one store.
#[derive(Default)]
pub(crate) struct ListenerSet {
    entries: Vec<Rc<ListenerEntry>>,
}

impl ListenerSet {
    /// Register `callback`, or return the existing entry if the same `Rc` is
    /// already registered. The flag is `true` for a fresh registration.
    pub(crate) fn insert(&mut self, callback: Listener) -> (Rc<ListenerEntry>, bool) {
        if let Some(existing) = self
            .entries
            .iter()
            .find(|e| Rc::ptr_eq(&e.callback, &callback))
        {
            return (Rc::clone(existing), false);
        }
        let entry = Rc::new(ListenerEntry {
            callback,
            active: Cell::new(true),
        });
        self.entries.push(Rc::clone(&entry));
        (entry, true)
    }

    /// Deactivate and drop `entry`. Returns `false` if it was already gone.
    pub(crate) fn remove(&mut self, entry: &Rc<ListenerEntry>) -> bool {
        entry.active.set(false);
        let before = self.entries.len();
        self.entries.retain(|e| !Rc::ptr_eq(e, entry));
        self.entries.len() != before
    }

    /// Entries registered right now, for a fan-out that must not hold the
    /// registry borrow.
    pub(crate) fn snapshot(&self) -> Vec<Rc<ListenerEntry>> {
        self.entries.clone()
    }

    pub(crate) fn clear(&mut self) {
        for entry in self.entries.drain(..) {
            entry.active.set(false);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Capability that removes one listener from its store.
///
/// Dropping the guard unsubscribes. The removal happens at most once, and a
/// removed listener is skipped even by a fan-out already in progress.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    entry: Rc<ListenerEntry>,
    registry: Weak<RefCell<ListenerSet>>,
    label: Rc<str>,
}

impl Subscription {
    pub(crate) fn new(
        entry: Rc<ListenerEntry>,
        registry: Weak<RefCell<ListenerSet>>,
        label: Rc<str>,
    ) -> Self {
        Self {
            entry,
            registry,
            label,
        }
    }

    /// Remove the listener now.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }

    /// Whether the listener is still registered with a live store.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.entry.is_active() && self.registry.strong_count() > 0
    }

    fn remove(&self) {
        if !self.entry.is_active() {
            return;
        }
        match self.registry.upgrade() {
            Some(registry) => {
                if registry.borrow_mut().remove(&self.entry) {
                    tracing::trace!(store = %self.label, "listener unsubscribed");
                }
            }
            None => self.entry.active.set(false),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("store", &self.label)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Listener {
        Rc::new(|| {})
    }

    #[test]
    fn insert_dedupes_by_identity() {
        let mut set = ListenerSet::default();
        let a = noop();
        let (first, fresh) = set.insert(Rc::clone(&a));
        assert!(fresh);
        let (second, fresh) = set.insert(Rc::clone(&a));
        assert!(!fresh);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(set.len(), 1);

        // Equal behavior, different allocation: a separate listener.
        set.insert(noop());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn remove_deactivates_snapshotted_entries() {
        let mut set = ListenerSet::default();
        let (entry, _) = set.insert(noop());
        let snapshot = set.snapshot();
        assert!(set.remove(&entry));
        assert!(!set.remove(&entry));
        assert!(!snapshot[0].is_active());
    }

    #[test]
    fn clear_deactivates_everything() {
        let mut set = ListenerSet::default();
        let (a, _) = set.insert(noop());
        let (b, _) = set.insert(noop());
        set.clear();
        assert_eq!(set.len(), 0);
        assert!(!a.is_active());
        assert!(!b.is_active());
    }
}
