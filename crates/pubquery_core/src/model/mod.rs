//! Published item model shared by caches, search hydration and the facade.
//!
//! # Responsibility
//! - Define the read model for published content and media items.
//! - Define the closed set of identifier forms callers resolve items by.
//!
//! # Invariants
//! - `id` and `key` of an item never change within one snapshot.
//! - Every identifier form resolves to at most one item.

pub mod id;
pub mod item;
pub mod udi;
