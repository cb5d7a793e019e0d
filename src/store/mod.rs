//! The store: one state record, its mutation protocol, and its listeners.
//!
//! A [`Store`] applies partial updates by shallow merge, isolates the
//! application's `on_update` hook, and fans out to every [`Listener`]
//! synchronously. Listeners are removed through their [`Subscription`].

mod hook;
mod listeners;
mod store;

pub use hook::{StoreOptions, UpdateHook};
pub use listeners::{Listener, Subscription};
pub use store::{SetState, Store, WeakStore};
