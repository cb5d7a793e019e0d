//! State records and the partial updates that are merged into them.
//!
//! A [`State`] is a plain record with a matching `Patch` type whose fields
//! are all optional. Applying a patch is a shallow, top-level merge: named
//! fields are replaced wholesale and every other field is kept.

mod macros;
mod state;

pub use state::{State, Update};
