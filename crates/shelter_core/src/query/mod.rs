//! Predicate builders for dashboard filters.
//!
//! # Invariants
//! - Builders are pure: no I/O, no state, no dependency on sessions.

pub mod rescue;
