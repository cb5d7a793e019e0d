//! Error types for store bindings and update hooks.

use thiserror::Error;

/// Error returned by an `on_update` hook.
///
/// Hook errors never leave [`Store::set`](crate::Store::set); they are logged
/// and dropped.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised when binding a consumer to a store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// A bound selector was requested outside every active providing scope
    /// for its store.
    #[error("no provider in scope for store '{store}'")]
    NoProvider {
        /// Label of the store that was looked up.
        store: String,
    },
}
