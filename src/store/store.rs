use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::hook::{StoreOptions, UpdateHook};
use super::listeners::{Listener, ListenerSet, Subscription};
use crate::state::{State, Update};

struct StoreInner<S> {
    state: RefCell<Rc<S>>,
    listeners: Rc<RefCell<ListenerSet>>,
    on_update: Option<UpdateHook<S>>,
    label: Rc<str>,
    version: Cell<u64>,
    torn_down: Cell<bool>,
}

/// A single-threaded store owning one state record and its listeners.
///
/// Every [`set`](Store::set) shallow-merges a partial update into a new
/// state value, runs the optional `on_update` hook with an owned snapshot,
/// and then calls every registered listener synchronously.
///
/// Cloning a `Store` creates a new handle to the **same** state and
/// listener set.
///
/// # Re-entrancy
///
/// No borrow is held while the hook or listeners run, so a listener may call
/// `set` again. The nested fan-out runs to completion before the outer one
/// resumes; listeners later in the outer fan-out then observe the newest
/// state. Nothing deduplicates the two walks.
pub struct Store<S> {
    inner: Rc<StoreInner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: State> Store<S> {
    /// Create a new store with the given initial state.
    pub fn new(initial: S) -> Self {
        Self::with_options(initial, StoreOptions::new())
    }

    /// Create a new store with a label and optional `on_update` hook.
    pub fn with_options(initial: S, options: StoreOptions<S>) -> Self {
        Self::from_shared(Rc::new(initial), options)
    }

    pub(crate) fn from_shared(initial: Rc<S>, options: StoreOptions<S>) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(initial),
                listeners: Rc::new(RefCell::new(ListenerSet::default())),
                on_update: options.on_update,
                label: options.label,
                version: Cell::new(0),
                torn_down: Cell::new(false),
            }),
        }
    }

    /// The current state. Each `set` replaces it with a new allocation, so
    /// a held `Rc` keeps showing the state it was taken from.
    pub fn get(&self) -> Rc<S> {
        Rc::clone(&self.inner.state.borrow())
    }

    /// Read the state without cloning the handle.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&S) -> R,
    {
        let state = self.get();
        f(&state)
    }

    /// Merge a partial update into the state and notify every listener.
    ///
    /// `update` is a patch or a `FnOnce(&S) -> S::Patch`. Notification
    /// happens even when the merge leaves the value unchanged. Once the
    /// store has been torn down the update is dropped unapplied.
    pub fn set(&self, update: impl Into<Update<S>>) {
        if self.rejects_writes() {
            return;
        }
        let current = self.get();
        let next = update.into().apply(&current);
        self.commit(next);
    }

    /// Function-form [`set`](Store::set) with the closure argument inferred.
    pub fn set_with<F>(&self, f: F)
    where
        F: FnOnce(&S) -> S::Patch,
    {
        if self.rejects_writes() {
            return;
        }
        let current = self.get();
        let next = current.merge(f(&current));
        self.commit(next);
    }

    fn rejects_writes(&self) -> bool {
        if self.inner.torn_down.get() {
            tracing::debug!(store = %self.inner.label, "update ignored after teardown");
            return true;
        }
        false
    }

    fn commit(&self, next: S) {
        let next = Rc::new(next);
        *self.inner.state.borrow_mut() = Rc::clone(&next);
        let version = self.inner.version.get() + 1;
        self.inner.version.set(version);

        if let Some(hook) = &self.inner.on_update {
            hook.invoke(&self.inner.label, version, S::clone(&next));
        }

        let listeners = self.inner.listeners.borrow().snapshot();
        tracing::trace!(
            store = %self.inner.label,
            version,
            listeners = listeners.len(),
            "state updated"
        );
        for entry in listeners {
            entry.fire();
        }
    }

    /// Register a listener, returning the capability that removes it.
    ///
    /// Registration is idempotent by identity: subscribing the same `Rc`
    /// again returns a second handle to the existing registration, and the
    /// listener still fires once per update. Dropping either handle removes
    /// it.
    pub fn subscribe(&self, listener: Listener) -> Subscription {
        let (entry, fresh) = self.inner.listeners.borrow_mut().insert(listener);
        if fresh {
            tracing::trace!(store = %self.inner.label, "listener subscribed");
        } else {
            tracing::debug!(store = %self.inner.label, "duplicate subscription ignored");
        }
        Subscription::new(
            entry,
            Rc::downgrade(&self.inner.listeners),
            Rc::clone(&self.inner.label),
        )
    }

    /// Subscribe a closure.
    pub fn subscribe_fn<F>(&self, f: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        self.subscribe(Rc::new(f))
    }

    /// Write handle shared by every consumer of this store.
    pub fn setter(&self) -> SetState<S> {
        SetState {
            store: self.clone(),
        }
    }

    /// Non-owning handle, upgradable while any strong handle lives.
    pub fn downgrade(&self) -> WeakStore<S> {
        WeakStore {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl<S> Store<S> {
    /// Number of updates applied so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Name used in log records.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Whether the providing scope that owned this store has ended.
    ///
    /// A torn-down store keeps its last state for reads but ignores `set`.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.get()
    }

    /// Whether two handles point at the same store.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Drop every listener and refuse further writes. Outstanding
    /// subscriptions become inert.
    pub(crate) fn teardown(&self) {
        self.inner.torn_down.set(true);
        let mut listeners = self.inner.listeners.borrow_mut();
        let dropped = listeners.len();
        listeners.clear();
        tracing::debug!(store = %self.inner.label, dropped, "store torn down");
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("label", &self.inner.label)
            .field("state", &self.inner.state.borrow())
            .field("version", &self.inner.version.get())
            .field("listener_count", &self.inner.listeners.borrow().len())
            .finish()
    }
}

/// Non-owning store handle.
pub struct WeakStore<S> {
    inner: Weak<StoreInner<S>>,
}

impl<S> Clone for WeakStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<S> WeakStore<S> {
    /// The store, if a strong handle still exists.
    pub fn upgrade(&self) -> Option<Store<S>> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}

/// The store's `set` operation as a standalone handle.
///
/// Every binding on a store hands out a handle to the same store, and each
/// one writes the full state, not just the slice its consumer reads.
pub struct SetState<S> {
    store: Store<S>,
}

impl<S> Clone for SetState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: State> SetState<S> {
    /// See [`Store::set`].
    pub fn set(&self, update: impl Into<Update<S>>) {
        self.store.set(update);
    }

    /// See [`Store::set_with`].
    pub fn set_with<F>(&self, f: F)
    where
        F: FnOnce(&S) -> S::Patch,
    {
        self.store.set_with(f);
    }
}

impl<S> SetState<S> {
    /// Whether both handles write to the same store.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.store.ptr_eq(&other.store)
    }
}

impl<S> std::fmt::Debug for SetState<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetState")
            .field("store", &self.store.label())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::state! {
        #[derive(Clone, Debug, PartialEq)]
        struct AppState => AppPatch {
            count: usize,
            name: String,
        }
    }

    fn app() -> Store<AppState> {
        Store::new(AppState {
            count: 0,
            name: "test".to_string(),
        })
    }

    fn counter(store: &Store<AppState>) -> (Rc<Cell<usize>>, Subscription) {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = Rc::clone(&calls);
        let sub = store.subscribe_fn(move || calls_clone.set(calls_clone.get() + 1));
        (calls, sub)
    }

    #[test]
    fn store_get_set() {
        let store = app();
        assert_eq!(store.get().count, 0);

        store.set(AppPatch::default().count(42).name("updated".to_string()));

        assert_eq!(store.get().count, 42);
        assert_eq!(store.get().name, "updated");
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn store_set_with() {
        let store = app();
        store.set_with(|s| AppPatch::default().count(s.count + 10));
        store.set(|s: &AppState| AppPatch::default().count(s.count + 1));
        assert_eq!(store.get().count, 11);
    }

    #[test]
    fn state_identity_changes_on_every_set() {
        let store = app();
        let before = store.get();
        store.set(AppPatch::default());
        let after = store.get();
        assert!(!Rc::ptr_eq(&before, &after));
        assert_eq!(*before, *after);
    }

    #[test]
    fn store_subscribe() {
        let store = app();
        let (calls, _sub) = counter(&store);

        assert_eq!(calls.get(), 0);
        store.set_with(|s| AppPatch::default().count(s.count + 1));
        assert_eq!(calls.get(), 1);
        store.set(AppPatch::default());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = app();
        let (calls, sub) = counter(&store);
        store.set(AppPatch::default());
        sub.unsubscribe();
        store.set(AppPatch::default());
        assert_eq!(calls.get(), 1);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn duplicate_subscribe_fires_once() {
        let store = app();
        let calls = Rc::new(Cell::new(0));
        let calls_clone = Rc::clone(&calls);
        let listener: Listener = Rc::new(move || calls_clone.set(calls_clone.get() + 1));

        let first = store.subscribe(Rc::clone(&listener));
        let second = store.subscribe(Rc::clone(&listener));
        assert_eq!(store.listener_count(), 1);

        store.set(AppPatch::default());
        assert_eq!(calls.get(), 1);

        drop(second);
        assert!(!first.is_active());
        store.set(AppPatch::default());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn listener_removed_mid_fanout_is_skipped() {
        let store = app();
        let victim_calls = Rc::new(Cell::new(0));
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let victim_slot = Rc::clone(&victim);
        let _killer = store.subscribe_fn(move || {
            victim_slot.borrow_mut().take();
        });

        let calls = Rc::clone(&victim_calls);
        *victim.borrow_mut() = Some(store.subscribe_fn(move || calls.set(calls.get() + 1)));

        store.set(AppPatch::default());
        assert_eq!(victim_calls.get(), 0);
    }

    #[test]
    fn reentrant_set_from_listener() {
        let store = app();
        let handle = store.clone();
        let _bump = store.subscribe_fn(move || {
            if handle.get().count == 1 {
                handle.set_with(|s| AppPatch::default().count(s.count + 1));
            }
        });
        let (calls, _sub) = counter(&store);

        store.set(AppPatch::default().count(1));
        assert_eq!(store.get().count, 2);
        assert_eq!(store.version(), 2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn hook_receives_owned_snapshot() {
        let seen: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let store = Store::with_options(
            AppState {
                count: 0,
                name: String::new(),
            },
            StoreOptions::new().on_update(move |snapshot: AppState| {
                seen_clone.borrow_mut().push(snapshot.count);
                Ok(())
            }),
        );
        store.set(AppPatch::default().count(3));
        store.set(AppPatch::default().count(4));
        assert_eq!(*seen.borrow(), vec![3, 4]);
    }

    #[test]
    fn failing_hook_does_not_block_listeners() {
        let store = Store::with_options(
            AppState {
                count: 0,
                name: String::new(),
            },
            StoreOptions::new()
                .label("failing")
                .on_update(|_: AppState| Err("rejected".into())),
        );
        let (calls, _sub) = counter(&store);

        store.set(AppPatch::default().count(1));
        store.set(AppPatch::default().count(2));
        assert_eq!(store.get().count, 2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn teardown_silences_subscriptions() {
        let store = app();
        let (calls, sub) = counter(&store);
        store.teardown();
        assert!(!sub.is_active());
        store.set(AppPatch::default());
        assert_eq!(calls.get(), 0);
        drop(sub);
    }

    #[test]
    fn torn_down_store_ignores_writes() {
        let hook_calls = Rc::new(Cell::new(0));
        let hook_calls_clone = Rc::clone(&hook_calls);
        let store = Store::with_options(
            AppState {
                count: 0,
                name: String::new(),
            },
            StoreOptions::new().on_update(move |_: AppState| {
                hook_calls_clone.set(hook_calls_clone.get() + 1);
                Ok(())
            }),
        );
        store.set(AppPatch::default().count(1));
        store.teardown();
        assert!(store.is_torn_down());

        store.set(AppPatch::default().count(2));
        store.set_with(|_| panic!("function update must not run after teardown"));
        store.setter().set(AppPatch::default().count(3));

        assert_eq!(store.get().count, 1);
        assert_eq!(store.version(), 1);
        assert_eq!(hook_calls.get(), 1);
    }

    #[test]
    fn setter_targets_same_store() {
        let store = app();
        let a = store.setter();
        let b = store.clone().setter();
        assert!(a.ptr_eq(&b));
        a.set(AppPatch::default().name("via setter".to_string()));
        assert_eq!(store.get().name, "via setter");
    }

    #[test]
    fn weak_store_does_not_keep_store_alive() {
        let store = app();
        let weak = store.downgrade();
        assert!(weak.upgrade().is_some());
        drop(store);
        assert!(weak.upgrade().is_none());
    }
}
