use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::error::HookError;

/// Callback run after every `set` with an owned snapshot of the new state.
///
/// The hook belongs to the application, not the store: an `Err` return or a
/// panic is logged and swallowed so it can never stop listener notification.
pub struct UpdateHook<S> {
    callback: Rc<dyn Fn(S) -> Result<(), HookError>>,
}

impl<S> Clone for UpdateHook<S> {
    fn clone(&self) -> Self {
        Self {
            callback: Rc::clone(&self.callback),
        }
    }
}

impl<S> UpdateHook<S> {
    /// Wrap a snapshot callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(S) -> Result<(), HookError> + 'static,
    {
        Self {
            callback: Rc::new(callback),
        }
    }

    /// Run the hook with `snapshot`. Returns whether it succeeded.
    pub(crate) fn invoke(&self, store: &str, version: u64, snapshot: S) -> bool {
        match catch_unwind(AssertUnwindSafe(|| (self.callback)(snapshot))) {
            Ok(Ok(())) => true,
            Ok(Err(error)) => {
                tracing::warn!(store, version, %error, "on_update hook failed");
                false
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                tracing::warn!(store, version, panic = %message, "on_update hook panicked");
                false
            }
        }
    }
}

impl<S> std::fmt::Debug for UpdateHook<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateHook").finish_non_exhaustive()
    }
}

/// Construction options for a [`Store`](crate::Store).
pub struct StoreOptions<S> {
    pub(crate) label: Rc<str>,
    pub(crate) on_update: Option<UpdateHook<S>>,
}

impl<S> StoreOptions<S> {
    /// Defaults: label `"store"`, no hook.
    pub fn new() -> Self {
        Self {
            label: Rc::from("store"),
            on_update: None,
        }
    }

    /// Name used in log records and [`ScopeError`](crate::ScopeError)s.
    #[must_use]
    pub fn label(mut self, label: impl AsRef<str>) -> Self {
        self.label = Rc::from(label.as_ref());
        self
    }

    /// Install an `on_update` hook, replacing any previous one.
    #[must_use]
    pub fn on_update<F>(mut self, hook: F) -> Self
    where
        F: Fn(S) -> Result<(), HookError> + 'static,
    {
        self.on_update = Some(UpdateHook::new(hook));
        self
    }

    /// The configured label.
    pub fn label_str(&self) -> &str {
        &self.label
    }
}

impl<S> Default for StoreOptions<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for StoreOptions<S> {
    fn clone(&self) -> Self {
        Self {
            label: Rc::clone(&self.label),
            on_update: self.on_update.clone(),
        }
    }
}

impl<S> std::fmt::Debug for StoreOptions<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreOptions")
            .field("label", &self.label)
            .field("on_update", &self.on_update.is_some())
            .finish()
    }
}
