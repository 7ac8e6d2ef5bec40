//! Composition root for dashboard callers.
//!
//! # Responsibility
//! - Open the shelter session explicitly instead of at module load.
//! - Expose the table views the dashboard renders.

pub mod context;
