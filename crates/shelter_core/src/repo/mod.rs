//! Data access over the bound shelter collection.
//!
//! # Responsibility
//! - Validate caller input before any store round trip.
//! - Contain store faults: sentinel API for compatibility, explicit
//!   `try_*` API for callers that must tell "no data" from "store down".
//!
//! # Invariants
//! - Validation failures always reach the caller.
//! - Each operation is exactly one store round trip (plus opt-in read retries).

pub mod shelter_repo;
