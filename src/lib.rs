//! # Tincan Select
//!
//! Selective-subscription state for component trees.
//!
//! Many consumers read one shared state record, and each one is invalidated
//! only when the slice it selects changes.
//!
//! ## Store
//!
//! - [`Store<S>`] - single-threaded state holder with shallow-merge updates
//! - [`Subscription`] - capability that removes a listener (also on drop)
//! - `on_update` hook - receives an owned snapshot after every update; its
//!   failures are logged, never propagated
//!
//! ## Selective access
//!
//! - [`create_selective_store`] - factory for one state shape
//! - [`ProvidingScope`] - creates a store per activation for nested consumers
//! - [`BoundSelector`] - per-consumer projection with change-gated delivery
//!
//! ## State records
//!
//! The [`state!`] macro declares a record and its patch type:
//!
//! ```
//! use tincan_select::{create_selective_store, state};
//!
//! state! {
//!     #[derive(Clone, Debug, PartialEq)]
//!     pub struct AppState => AppPatch {
//!         pub count: i32,
//!         pub name: String,
//!     }
//! }
//!
//! let app = create_selective_store(AppState { count: 0, name: "a".into() });
//! app.provider().provide(|| {
//!     let count = app.use_bound_selector(|s: &AppState| s.count).unwrap();
//!     let name = app.use_bound_selector(|s: &AppState| s.name.clone()).unwrap();
//!
//!     name.set_state().set(AppPatch::default().name("b".into()));
//!     assert_eq!(count.revision(), 0);
//!     assert_eq!(name.revision(), 1);
//! });
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod runtime;
pub mod select;
pub mod state;
pub mod store;

// Re-export main types for convenience
pub use error::{HookError, ScopeError};
pub use select::{create_selective_store, BoundSelector, ProvidingScope, SelectiveStore};
pub use state::{State, Update};
pub use store::{Listener, SetState, Store, StoreOptions, Subscription, UpdateHook, WeakStore};
