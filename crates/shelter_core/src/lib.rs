//! Data access core for the animal shelter outcomes dashboard.
//! Owns store sessions, CRUD policy and the rescue-category filters.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{ConfigError, ShelterConfig};
pub use db::{
    connect, connect_with_retry, ConnectionError, ConnectionTarget, Credentials, DbResult,
    RetryPolicy, Session,
};
pub use logging::{
    default_log_level, init_logging, init_stderr_logging, logging_status, LogSink, LoggingError,
};
pub use model::document::{without_id, Condition, Document, Predicate, ID_FIELD};
pub use query::rescue::{build_rescue_query, RescueCategory, UnknownCategory};
pub use repo::shelter_repo::{
    OperationError, RepoError, RepoResult, ShelterRepository, ValidationError,
};
pub use service::context::ShelterContext;
pub use store::{DocumentStore, MemoryStore, MongoStore, Namespace, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
