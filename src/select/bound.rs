use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ScopeError;
use crate::runtime::{self, ScopeKey};
use crate::state::State;
use crate::store::{SetState, Store, Subscription};

pub(crate) type Selector<S, O> = Rc<dyn Fn(&S) -> O>;
pub(crate) type Equality<O> = Rc<dyn Fn(&O, &O) -> bool>;

/// Last projection delivered to a consumer.
struct Slot<O> {
    value: O,
    revision: u64,
    invalidate: Option<Rc<dyn Fn()>>,
}

/// Find the innermost store provided under `key`.
pub(crate) fn resolve<S: State>(key: ScopeKey, label: &str) -> Result<Store<S>, ScopeError> {
    runtime::lookup(key)
        .and_then(|provided| provided.downcast_ref::<Store<S>>().cloned())
        .ok_or_else(|| ScopeError::NoProvider {
            store: label.to_string(),
        })
}

/// Store `next` unless it equals the delivered value, then fire the
/// consumer's invalidation hook. Returns whether a delivery happened.
fn deliver<O>(slot: &RefCell<Slot<O>>, eq: &dyn Fn(&O, &O) -> bool, next: O) -> bool {
    let invalidate = {
        let mut slot = slot.borrow_mut();
        if eq(&slot.value, &next) {
            return false;
        }
        slot.value = next;
        slot.revision += 1;
        slot.invalidate.clone()
    };
    if let Some(invalidate) = invalidate {
        invalidate();
    }
    true
}

/// A consumer's binding to the store of its enclosing providing scope.
///
/// The binding listens to every update but only delivers a new projection,
/// bumping [`revision`](BoundSelector::revision) and calling the
/// [`on_invalidate`](BoundSelector::on_invalidate) hook, when the selector's
/// output differs from the last delivered one under the binding's equality.
///
/// Dropping the binding removes its listener.
///
/// The selector runs inside `Store::set`; a panicking selector unwinds out
/// of the `set` call that triggered it.
pub struct BoundSelector<S: State, O> {
    key: ScopeKey,
    label: Rc<str>,
    store: Store<S>,
    selector: Selector<S, O>,
    eq: Equality<O>,
    slot: Rc<RefCell<Slot<O>>>,
    fallback: O,
    subscription: Option<Subscription>,
}

impl<S: State, O: 'static> BoundSelector<S, O> {
    pub(crate) fn bind(
        key: ScopeKey,
        label: Rc<str>,
        selector: Selector<S, O>,
        eq: Equality<O>,
        fallback: O,
    ) -> Result<Self, ScopeError> {
        let store = resolve::<S>(key, &label)?;
        let value = selector(&store.get());
        let slot = Rc::new(RefCell::new(Slot {
            value,
            revision: 0,
            invalidate: None,
        }));
        let subscription = Self::listen(&store, &selector, &eq, &slot);
        Ok(Self {
            key,
            label,
            store,
            selector,
            eq,
            slot,
            fallback,
            subscription: Some(subscription),
        })
    }

    fn listen(
        store: &Store<S>,
        selector: &Selector<S, O>,
        eq: &Equality<O>,
        slot: &Rc<RefCell<Slot<O>>>,
    ) -> Subscription {
        let weak_store = store.downgrade();
        let weak_slot = Rc::downgrade(slot);
        let selector = Rc::clone(selector);
        let eq = Rc::clone(eq);
        store.subscribe_fn(move || {
            let (Some(store), Some(slot)) = (weak_store.upgrade(), weak_slot.upgrade()) else {
                return;
            };
            let next = selector(&store.get());
            deliver(&slot, &*eq, next);
        })
    }

    /// Re-establish the binding against the store of the currently active
    /// scope, re-registering the listener and re-evaluating the selector.
    ///
    /// On error the existing binding is left untouched.
    pub fn rebind(&mut self) -> Result<(), ScopeError> {
        let store = resolve::<S>(self.key, &self.label)?;
        self.detach();
        self.subscription = Some(Self::listen(&store, &self.selector, &self.eq, &self.slot));
        let next = (self.selector)(&store.get());
        self.store = store;
        let changed = deliver(&self.slot, &*self.eq, next);
        tracing::debug!(store = %self.label, changed, "bound selector rebound");
        Ok(())
    }

    /// Remove the listener now. Later calls are no-ops.
    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    /// Whether the binding is still listening to a live store.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// Read the delivered projection without cloning it.
    ///
    /// # Panics
    ///
    /// Panics if `f` calls `set` on the same store.
    pub fn with<R>(&self, f: impl FnOnce(&O) -> R) -> R {
        f(&self.slot.borrow().value)
    }

    /// Number of projections delivered since the binding was created.
    ///
    /// A render host re-renders the consumer whenever this changes.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.slot.borrow().revision
    }

    /// Install the host's re-render callback, replacing any previous one.
    pub fn on_invalidate<F>(&self, f: F)
    where
        F: Fn() + 'static,
    {
        self.slot.borrow_mut().invalidate = Some(Rc::new(f));
    }

    /// The selector applied to the factory's initial state.
    ///
    /// Stable for the life of the binding, for reads that happen before a
    /// live value is available.
    pub fn fallback(&self) -> &O {
        &self.fallback
    }

    /// The store's shared write handle.
    pub fn set_state(&self) -> SetState<S> {
        self.store.setter()
    }

    /// The store this binding currently listens to.
    pub fn store(&self) -> &Store<S> {
        &self.store
    }
}

impl<S: State, O: Clone + 'static> BoundSelector<S, O> {
    /// The last delivered projection.
    pub fn get(&self) -> O {
        self.slot.borrow().value.clone()
    }

    /// The `(projection, setter)` pair a consumer renders from.
    pub fn parts(&self) -> (O, SetState<S>) {
        (self.get(), self.set_state())
    }
}

impl<S: State, O: std::fmt::Debug> std::fmt::Debug for BoundSelector<S, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.borrow();
        f.debug_struct("BoundSelector")
            .field("store", &self.label)
            .field("value", &slot.value)
            .field("revision", &slot.revision)
            .field("bound", &self.subscription.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreOptions;
    use std::any::Any;

    crate::state! {
        #[derive(Clone, Debug, PartialEq)]
        struct Counter => CounterPatch {
            count: i32,
            name: String,
        }
    }

    fn initial() -> Counter {
        Counter {
            count: 0,
            name: "a".to_string(),
        }
    }

    fn bind_count(key: ScopeKey) -> Result<BoundSelector<Counter, i32>, ScopeError> {
        let selector: Selector<Counter, i32> = Rc::new(|s: &Counter| s.count);
        let eq: Equality<i32> = Rc::new(|a: &i32, b: &i32| a == b);
        BoundSelector::bind(key, Rc::from("counter"), selector, eq, 0)
    }

    fn provided(store: &Store<Counter>) -> Rc<dyn Any> {
        Rc::new(store.clone())
    }

    #[test]
    fn bind_outside_scope_fails() {
        let err = bind_count(ScopeKey::next()).unwrap_err();
        assert_eq!(
            err,
            ScopeError::NoProvider {
                store: "counter".to_string()
            }
        );
    }

    #[test]
    fn delivers_only_on_change() {
        let key = ScopeKey::next();
        let store = Store::with_options(initial(), StoreOptions::new().label("counter"));
        runtime::with_provider(key, provided(&store), || {
            let bound = bind_count(key).unwrap();
            assert_eq!(bound.get(), 0);

            store.set(CounterPatch::default().name("b".to_string()));
            assert_eq!(bound.revision(), 0);

            store.set_with(|s| CounterPatch::default().count(s.count + 1));
            assert_eq!(bound.revision(), 1);
            assert_eq!(bound.get(), 1);
        });
    }

    #[test]
    fn invalidate_hook_runs_per_delivery() {
        let key = ScopeKey::next();
        let store = Store::new(initial());
        runtime::with_provider(key, provided(&store), || {
            let bound = bind_count(key).unwrap();
            let renders = Rc::new(std::cell::Cell::new(0));
            let renders_clone = Rc::clone(&renders);
            bound.on_invalidate(move || renders_clone.set(renders_clone.get() + 1));

            store.set(CounterPatch::default().count(5));
            store.set(CounterPatch::default().count(5));
            store.set(CounterPatch::default().count(6));
            assert_eq!(renders.get(), 2);
        });
    }

    #[test]
    fn drop_removes_listener() {
        let key = ScopeKey::next();
        let store = Store::new(initial());
        runtime::with_provider(key, provided(&store), || {
            let bound = bind_count(key).unwrap();
            assert_eq!(store.listener_count(), 1);
            drop(bound);
            assert_eq!(store.listener_count(), 0);
        });
    }

    #[test]
    fn detach_is_idempotent() {
        let key = ScopeKey::next();
        let store = Store::new(initial());
        runtime::with_provider(key, provided(&store), || {
            let mut bound = bind_count(key).unwrap();
            bound.detach();
            bound.detach();
            assert!(!bound.is_bound());
            store.set(CounterPatch::default().count(9));
            assert_eq!(bound.get(), 0);
        });
    }

    #[test]
    fn rebind_moves_to_inner_store() {
        let key = ScopeKey::next();
        let outer = Store::new(initial());
        let inner = Store::new(Counter {
            count: 40,
            name: "inner".to_string(),
        });
        runtime::with_provider(key, provided(&outer), || {
            let mut bound = bind_count(key).unwrap();
            runtime::with_provider(key, provided(&inner), || {
                bound.rebind().unwrap();
            });
            assert_eq!(bound.get(), 40);
            assert_eq!(bound.revision(), 1);
            assert_eq!(outer.listener_count(), 0);
            assert_eq!(inner.listener_count(), 1);

            inner.set(CounterPatch::default().count(41));
            assert_eq!(bound.get(), 41);
            assert!(bound.set_state().ptr_eq(&inner.setter()));
        });
    }

    #[test]
    fn failed_rebind_keeps_binding() {
        let key = ScopeKey::next();
        let store = Store::new(initial());
        let mut bound = runtime::with_provider(key, provided(&store), || bind_count(key).unwrap());
        assert!(bound.rebind().is_err());
        assert!(bound.is_bound());
        store.set(CounterPatch::default().count(2));
        assert_eq!(bound.get(), 2);
    }
}
