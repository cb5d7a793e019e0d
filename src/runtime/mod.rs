//! Runtime support for providing scopes.
//!
//! This module keeps the thread-local stack of active providers that
//! bound selectors resolve their store from.

mod context;

pub use context::provider_depth;
pub(crate) use context::{lookup, with_provider, ScopeKey};
