use std::fmt;

/// A record held by a [`Store`](crate::Store).
///
/// `Patch` names a subset of the top-level fields. `merge` must return a new
/// record where every field named in the patch is replaced and every other
/// field is cloned from `self`. Nested records are replaced, never merged.
///
/// Most implementations come from the [`state!`](crate::state!) macro.
pub trait State: Clone + 'static {
    /// Partial record: every top-level field, each optional.
    type Patch;

    /// Shallow-merge `patch` into a copy of `self`.
    fn merge(&self, patch: Self::Patch) -> Self;
}

/// A partial update handed to [`Store::set`](crate::Store::set).
///
/// Either a ready patch, or a function computing one from the current state.
/// Any `FnOnce(&S) -> S::Patch` converts into `Update::With`; types generated
/// by [`state!`](crate::state!) convert their patch into `Update::Patch`.
pub enum Update<S: State> {
    /// Merge this patch as-is.
    Patch(S::Patch),
    /// Compute the patch from the current state, then merge it.
    With(Box<dyn FnOnce(&S) -> S::Patch>),
}

impl<S: State> Update<S> {
    /// Wrap a patch.
    pub fn patch(patch: S::Patch) -> Self {
        Update::Patch(patch)
    }

    /// Wrap a patch-producing function.
    pub fn with<F>(f: F) -> Self
    where
        F: FnOnce(&S) -> S::Patch + 'static,
    {
        Update::With(Box::new(f))
    }

    /// Resolve against `current` into the next state.
    pub(crate) fn apply(self, current: &S) -> S {
        let patch = match self {
            Update::Patch(patch) => patch,
            Update::With(f) => f(current),
        };
        current.merge(patch)
    }
}

impl<S, F> From<F> for Update<S>
where
    S: State,
    F: FnOnce(&S) -> S::Patch + 'static,
{
    fn from(f: F) -> Self {
        Update::With(Box::new(f))
    }
}

impl<S: State> fmt::Debug for Update<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Patch(_) => f.write_str("Update::Patch(..)"),
            Update::With(_) => f.write_str("Update::With(..)"),
        }
    }
}
