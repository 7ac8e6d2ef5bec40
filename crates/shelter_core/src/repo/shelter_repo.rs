//! Shelter collection repository.
//!
//! # Responsibility
//! - Provide create/read/update/delete over one verified session.
//! - Keep the dual error-signaling policy in one place.
//!
//! # Invariants
//! - Inputs that are not JSON objects are rejected as `ValidationError`.
//! - `create` rejects empty documents.
//! - Sentinel methods never surface store faults; they log and return
//!   `false`, an empty list or `0`.

use log::{debug, error, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

use crate::db::{RetryPolicy, Session};
use crate::model::document::Document;
use crate::store::{DocumentStore, StoreError};

pub type RepoResult<T> = Result<T, RepoError>;

/// Malformed caller input. A programming error at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Argument was a list, scalar or null instead of a mapping.
    NotAMapping {
        argument: &'static str,
        found: &'static str,
    },
    /// Document to insert had no fields.
    EmptyDocument,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAMapping { argument, found } => {
                write!(f, "{argument} must be a mapping, got {found}")
            }
            Self::EmptyDocument => write!(f, "document must be a non-empty mapping"),
        }
    }
}

impl Error for ValidationError {}

/// Store fault during one CRUD call on an already verified session.
#[derive(Debug)]
pub struct OperationError {
    pub operation: &'static str,
    pub cause: StoreError,
}

impl Display for OperationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} operation failed: {}", self.operation, self.cause)
    }
}

impl Error for OperationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.cause)
    }
}

/// Outcome of the explicit `try_*` API.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Operation(OperationError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Operation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Operation(err) => Some(err),
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<OperationError> for RepoError {
    fn from(value: OperationError) -> Self {
        Self::Operation(value)
    }
}

/// CRUD access to the shelter collection bound by a session.
pub struct ShelterRepository<S: DocumentStore> {
    session: Session<S>,
    read_retry: RetryPolicy,
}

impl<S: DocumentStore> ShelterRepository<S> {
    /// Wraps a verified session. Reads make a single attempt.
    pub fn new(session: Session<S>) -> Self {
        Self {
            session,
            read_retry: RetryPolicy::none(),
        }
    }

    /// Retries transient read faults per `policy`. Writes are never retried.
    pub fn with_read_retry(mut self, policy: RetryPolicy) -> Self {
        self.read_retry = policy;
        self
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    /// Consumes the repository, releasing its session.
    pub fn close(self) {
        self.session.close();
    }

    /// Inserts one document.
    ///
    /// Returns `Ok(false)` when the store fails; the fault is logged.
    pub fn create(&self, doc: impl Into<Value>) -> Result<bool, ValidationError> {
        contain(self.try_create(doc).map(|()| true), false)
    }

    /// Returns every document matching `predicate`; `{}` matches all.
    ///
    /// Returns `Ok(vec![])` when the store fails; the fault is logged.
    pub fn read(&self, predicate: impl Into<Value>) -> Result<Vec<Document>, ValidationError> {
        contain(self.try_read(predicate), Vec::new())
    }

    /// Applies `mutation` to every matching document; returns the modified count.
    ///
    /// Returns `Ok(0)` when the store fails; the fault is logged.
    pub fn update(
        &self,
        predicate: impl Into<Value>,
        mutation: impl Into<Value>,
    ) -> Result<u64, ValidationError> {
        contain(self.try_update(predicate, mutation), 0)
    }

    /// Removes every matching document; returns the deleted count.
    ///
    /// Returns `Ok(0)` when the store fails; the fault is logged.
    pub fn delete(&self, predicate: impl Into<Value>) -> Result<u64, ValidationError> {
        contain(self.try_delete(predicate), 0)
    }

    pub fn try_create(&self, doc: impl Into<Value>) -> RepoResult<()> {
        let doc = require_mapping("document", doc.into())?;
        if doc.is_empty() {
            return Err(ValidationError::EmptyDocument.into());
        }

        let started_at = Instant::now();
        let result = self.session.store().insert_one(self.session.namespace(), &doc);
        self.finish("create", started_at, result, |()| "inserted=1".to_string())
    }

    pub fn try_read(&self, predicate: impl Into<Value>) -> RepoResult<Vec<Document>> {
        let filter = require_mapping("predicate", predicate.into())?;

        let started_at = Instant::now();
        let store = self.session.store();
        let namespace = self.session.namespace();
        let result = self.read_retry.run_while(
            "repo_read",
            || store.find(namespace, &filter),
            StoreError::is_transient,
        );
        self.finish("read", started_at, result, |docs| {
            format!("returned={}", docs.len())
        })
    }

    pub fn try_update(
        &self,
        predicate: impl Into<Value>,
        mutation: impl Into<Value>,
    ) -> RepoResult<u64> {
        let filter = require_mapping("predicate", predicate.into())?;
        let mutation = require_mapping("mutation", mutation.into())?;

        let started_at = Instant::now();
        let result = self
            .session
            .store()
            .update_many(self.session.namespace(), &filter, &mutation);
        self.finish("update", started_at, result, |count| {
            format!("modified={count}")
        })
    }

    pub fn try_delete(&self, predicate: impl Into<Value>) -> RepoResult<u64> {
        let filter = require_mapping("predicate", predicate.into())?;

        let started_at = Instant::now();
        let result = self
            .session
            .store()
            .delete_many(self.session.namespace(), &filter);
        self.finish("delete", started_at, result, |count| {
            format!("deleted={count}")
        })
    }

    fn finish<T>(
        &self,
        operation: &'static str,
        started_at: Instant,
        result: Result<T, StoreError>,
        summary: impl FnOnce(&T) -> String,
    ) -> RepoResult<T> {
        match result {
            Ok(value) => {
                debug!(
                    "event=repo_{} module=repo status=ok namespace={} duration_ms={} {}",
                    operation,
                    self.session.namespace(),
                    started_at.elapsed().as_millis(),
                    summary(&value)
                );
                Ok(value)
            }
            Err(cause) => Err(OperationError { operation, cause }.into()),
        }
    }
}

fn require_mapping(argument: &'static str, value: Value) -> Result<Document, ValidationError> {
    match value {
        Value::Object(map) => Ok(map),
        other => {
            let err = ValidationError::NotAMapping {
                argument,
                found: json_kind(&other),
            };
            warn!("event=repo_validate module=repo status=error error_code=invalid_argument error={err}");
            Err(err)
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Folds an operation fault into `sentinel`, keeping validation errors.
fn contain<T>(result: RepoResult<T>, sentinel: T) -> Result<T, ValidationError> {
    match result {
        Ok(value) => Ok(value),
        Err(RepoError::Validation(err)) => Err(err),
        Err(RepoError::Operation(err)) => {
            error!(
                "event=repo_{} module=repo status=error error_code=operation_failed error={}",
                err.operation, err.cause
            );
            Ok(sentinel)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{contain, require_mapping, OperationError, RepoError, ValidationError};
    use crate::store::StoreError;
    use serde_json::json;

    #[test]
    fn require_mapping_names_argument_and_kind() {
        let err = require_mapping("predicate", json!([1, 2])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotAMapping {
                argument: "predicate",
                found: "a list"
            }
        );
        assert_eq!(err.to_string(), "predicate must be a mapping, got a list");
    }

    #[test]
    fn contain_maps_operation_fault_to_sentinel() {
        let fault: Result<u64, RepoError> = Err(OperationError {
            operation: "delete",
            cause: StoreError::Unavailable("down".to_string()),
        }
        .into());
        assert_eq!(contain(fault, 0), Ok(0));
    }

    #[test]
    fn contain_keeps_validation_errors() {
        let invalid: Result<u64, RepoError> = Err(ValidationError::EmptyDocument.into());
        assert_eq!(contain(invalid, 0), Err(ValidationError::EmptyDocument));
    }
}
