use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Identifies the stores produced by one
/// [`create_selective_store`](crate::create_selective_store) call.
///
/// Two factories for the same state type get different keys, so their
/// stores never shadow each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ScopeKey(usize);

impl ScopeKey {
    pub(crate) fn next() -> Self {
        static NEXT_ID: AtomicUsize = AtomicUsize::new(0);
        ScopeKey(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// One active providing scope.
struct Frame {
    key: ScopeKey,
    store: Rc<dyn Any>,
}

// Thread-local stack of active providers, innermost last.
thread_local! {
    static PROVIDER_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Run `f` with `store` provided under `key`.
///
/// The frame is popped even if `f` panics; the panic then resumes.
pub(crate) fn with_provider<F, R>(key: ScopeKey, store: Rc<dyn Any>, f: F) -> R
where
    F: FnOnce() -> R,
{
    PROVIDER_STACK.with(|stack| {
        stack.borrow_mut().push(Frame { key, store });
    });

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    PROVIDER_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });

    match result {
        Ok(r) => r,
        Err(e) => std::panic::resume_unwind(e),
    }
}

/// The innermost store provided under `key`, if any.
pub(crate) fn lookup(key: ScopeKey) -> Option<Rc<dyn Any>> {
    PROVIDER_STACK.with(|stack| {
        stack
            .borrow()
            .iter()
            .rev()
            .find(|frame| frame.key == key)
            .map(|frame| Rc::clone(&frame.store))
    })
}

/// Number of providing scopes active on this thread, across all stores.
pub fn provider_depth() -> usize {
    PROVIDER_STACK.with(|stack| stack.borrow().len())
}
