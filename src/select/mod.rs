//! Selective access to a provided store.
//!
//! [`create_selective_store`] returns a factory whose [`ProvidingScope`]
//! instantiates one store per activation, and whose bound selectors deliver
//! a new projection to their consumer only when it actually changes.

mod bound;
mod scope;

pub use bound::BoundSelector;
pub use scope::{create_selective_store, ProvidingScope, SelectiveStore};
