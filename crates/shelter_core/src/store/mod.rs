//! Document store contracts and backend implementations.
//!
//! # Responsibility
//! - Define the minimal store surface the session and repository need.
//! - Keep backend driver details (MongoDB, in-process) behind one trait.
//!
//! # Invariants
//! - Every trait call is exactly one round trip to the backend.
//! - `update_many`/`delete_many` match across the whole collection.
//! - A released store rejects further calls with `StoreError::Released`.

use std::error::Error;
use std::fmt::{Display, Formatter};

use mongodb::error::ErrorKind;

use crate::model::document::Document;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Fault raised by a store backend during a single call.
#[derive(Debug)]
pub enum StoreError {
    /// Backend is unreachable or currently failing.
    Unavailable(String),
    /// Backend refused the supplied credentials.
    Unauthorized(String),
    /// Backend refused the request shape (unknown operator, bad mutation).
    Rejected(String),
    /// Value could not be converted to or from the backend encoding.
    Encoding(String),
    /// Store handle was already released by its session.
    Released,
    Mongo(mongodb::error::Error),
}

impl StoreError {
    /// Returns whether retrying the same call could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::Mongo(err) => matches!(
                *err.kind,
                ErrorKind::Io(_)
                    | ErrorKind::ServerSelection { .. }
                    | ErrorKind::ConnectionPoolCleared { .. }
            ),
            Self::Unauthorized(_) | Self::Rejected(_) | Self::Encoding(_) | Self::Released => false,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
            Self::Unauthorized(message) => write!(f, "store rejected credentials: {message}"),
            Self::Rejected(message) => write!(f, "store rejected request: {message}"),
            Self::Encoding(message) => write!(f, "document encoding failed: {message}"),
            Self::Released => write!(f, "store handle already released"),
            Self::Mongo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Mongo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(value: mongodb::error::Error) -> Self {
        Self::Mongo(value)
    }
}

/// Database and collection pair a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Backend interface for schemaless document collections.
///
/// Filters and mutations arrive already validated as JSON objects and are
/// passed verbatim to the backend's native evaluator.
pub trait DocumentStore {
    /// Administrative no-op round trip proving reachability and credentials.
    fn ping(&self) -> StoreResult<()>;
    fn insert_one(&self, ns: &Namespace, doc: &Document) -> StoreResult<()>;
    fn find(&self, ns: &Namespace, filter: &Document) -> StoreResult<Vec<Document>>;
    /// Returns the number of documents actually modified.
    fn update_many(
        &self,
        ns: &Namespace,
        filter: &Document,
        mutation: &Document,
    ) -> StoreResult<u64>;
    /// Returns the number of documents removed.
    fn delete_many(&self, ns: &Namespace, filter: &Document) -> StoreResult<u64>;
    /// Releases backend resources. Must be safe to call more than once.
    fn release(&mut self);
}
