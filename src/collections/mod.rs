//! Generic collections used by the object model and the control flow graph.
//!
//! - [`crate::collections::Collection`] - ordered list that reports every mutation to
//!   [`crate::collections::CollectionHooks`] before applying it
//! - [`crate::collections::UniqueList`] - ordered set preserving first-insertion order

mod collection;
mod unique;

pub use collection::{Collection, CollectionHooks};
pub use unique::UniqueList;
