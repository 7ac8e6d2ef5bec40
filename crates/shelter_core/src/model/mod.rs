//! Document and predicate model shared by stores, repository and queries.
//!
//! # Responsibility
//! - Define the schemaless record shape exchanged with the document store.
//! - Define the structured selection predicate produced by query builders.
//!
//! # Invariants
//! - Documents are owned by the store; core never caches them.
//! - The store-assigned `_id` field is opaque and never interpreted.

pub mod document;
