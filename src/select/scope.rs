use std::cell::Cell;
use std::rc::Rc;

use super::bound::{BoundSelector, Equality, Selector};
use crate::error::{HookError, ScopeError};
use crate::runtime::{self, ScopeKey};
use crate::state::State;
use crate::store::{Store, StoreOptions};

/// Create a selective store factory seeded with `initial`.
///
/// The factory does not hold a live store itself. Each activation of its
/// [`ProvidingScope`] creates one, and [`SelectiveStore::use_bound_selector`]
/// binds to the innermost active one.
///
/// # Examples
///
/// ```
/// use tincan_select::{create_selective_store, state};
///
/// state! {
///     #[derive(Clone, Debug, PartialEq)]
///     pub struct Counter => CounterPatch {
///         pub count: i32,
///     }
/// }
///
/// let counter = create_selective_store(Counter { count: 0 });
/// counter.provider().provide(|| {
///     let count = counter.use_bound_selector(|s: &Counter| s.count).unwrap();
///     let (value, set_state) = count.parts();
///     assert_eq!(value, 0);
///
///     set_state.set_with(|s| CounterPatch::default().count(s.count + 1));
///     assert_eq!(count.get(), 1);
/// });
/// ```
pub fn create_selective_store<S: State>(initial: S) -> SelectiveStore<S> {
    SelectiveStore {
        key: ScopeKey::next(),
        initial: Rc::new(initial),
        options: StoreOptions::new(),
        activations: Rc::new(Cell::new(0)),
    }
}

/// Factory returned by [`create_selective_store`].
///
/// Configure it with [`on_update`](SelectiveStore::on_update) and
/// [`label`](SelectiveStore::label) before handing out providers; a
/// [`ProvidingScope`] captures the options at the time it is created.
pub struct SelectiveStore<S: State> {
    key: ScopeKey,
    initial: Rc<S>,
    options: StoreOptions<S>,
    activations: Rc<Cell<u64>>,
}

impl<S: State> Clone for SelectiveStore<S> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            initial: Rc::clone(&self.initial),
            options: self.options.clone(),
            activations: Rc::clone(&self.activations),
        }
    }
}

impl<S: State> SelectiveStore<S> {
    /// Call `hook` with an owned snapshot of the new state after every
    /// update. Failures are logged and never reach the updater.
    #[must_use]
    pub fn on_update<F>(mut self, hook: F) -> Self
    where
        F: Fn(S) -> Result<(), HookError> + 'static,
    {
        self.options = self.options.on_update(hook);
        self
    }

    /// Name used in logs and in [`ScopeError::NoProvider`].
    #[must_use]
    pub fn label(mut self, label: impl AsRef<str>) -> Self {
        self.options = self.options.label(label);
        self
    }

    /// The scope boundary that instantiates this factory's stores.
    pub fn provider(&self) -> ProvidingScope<S> {
        ProvidingScope {
            key: self.key,
            initial: Rc::clone(&self.initial),
            options: self.options.clone(),
            activations: Rc::clone(&self.activations),
        }
    }

    /// Bind a consumer to the innermost active store, comparing successive
    /// projections with `PartialEq`.
    ///
    /// Fails with [`ScopeError::NoProvider`] outside every activation of
    /// this factory's [`ProvidingScope`].
    pub fn use_bound_selector<O, F>(&self, selector: F) -> Result<BoundSelector<S, O>, ScopeError>
    where
        O: PartialEq + 'static,
        F: Fn(&S) -> O + 'static,
    {
        self.use_bound_selector_by(selector, |a: &O, b: &O| a == b)
    }

    /// Like [`use_bound_selector`](SelectiveStore::use_bound_selector) with a
    /// caller-chosen equality, e.g. `Rc::ptr_eq` for projections that must
    /// be compared by identity.
    pub fn use_bound_selector_by<O, F, E>(
        &self,
        selector: F,
        eq: E,
    ) -> Result<BoundSelector<S, O>, ScopeError>
    where
        O: 'static,
        F: Fn(&S) -> O + 'static,
        E: Fn(&O, &O) -> bool + 'static,
    {
        let selector: Selector<S, O> = Rc::new(selector);
        let eq: Equality<O> = Rc::new(eq);
        let fallback = selector(&self.initial);
        BoundSelector::bind(
            self.key,
            Rc::clone(&self.options.label),
            selector,
            eq,
            fallback,
        )
    }

    /// The selector applied to the initial state, without any scope.
    pub fn initial_projection<O>(&self, selector: impl FnOnce(&S) -> O) -> O {
        selector(&self.initial)
    }

    /// The innermost store of this factory, if a scope is active.
    pub fn current_store(&self) -> Result<Store<S>, ScopeError> {
        super::bound::resolve(self.key, &self.options.label)
    }
}

impl<S: State + std::fmt::Debug> std::fmt::Debug for SelectiveStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectiveStore")
            .field("label", &self.options.label_str())
            .field("initial", &self.initial)
            .finish()
    }
}

/// Scope boundary that owns one [`Store`] per activation.
///
/// The store lives exactly as long as the [`provide`](ProvidingScope::provide)
/// call. When it returns, or unwinds, the store is torn down: every listener
/// is dropped and bindings that outlive the scope stop receiving updates.
pub struct ProvidingScope<S: State> {
    key: ScopeKey,
    initial: Rc<S>,
    options: StoreOptions<S>,
    activations: Rc<Cell<u64>>,
}

impl<S: State> Clone for ProvidingScope<S> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            initial: Rc::clone(&self.initial),
            options: self.options.clone(),
            activations: Rc::clone(&self.activations),
        }
    }
}

impl<S: State> ProvidingScope<S> {
    /// Activate the scope: create a store, make it reachable to bound
    /// selectors created inside `f`, run `f`, and tear the store down.
    pub fn provide<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.provide_with(|_| f())
    }

    /// Like [`provide`](ProvidingScope::provide), also handing `f` the store.
    pub fn provide_with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Store<S>) -> R,
    {
        let store = Store::from_shared(Rc::clone(&self.initial), self.options.clone());
        let activation = self.activations.get() + 1;
        self.activations.set(activation);
        tracing::debug!(store = %store.label(), activation, "providing scope activated");

        let store = scopeguard::guard(store, |store| store.teardown());
        let provided: Rc<dyn std::any::Any> = Rc::new(Store::clone(&store));
        runtime::with_provider(self.key, provided, || f(&store))
    }

    /// Number of times this factory's scope has been activated.
    #[must_use]
    pub fn activations(&self) -> u64 {
        self.activations.get()
    }
}

impl<S: State> std::fmt::Debug for ProvidingScope<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvidingScope")
            .field("label", &self.options.label_str())
            .field("activations", &self.activations.get())
            .finish()
    }
}
