//! Verified, scoped session over one store namespace.

use log::{error, info};
use std::time::Instant;

use super::{ConnectionError, DbResult, RetryPolicy};
use crate::store::{DocumentStore, Namespace, StoreResult};

/// Authenticated handle bound to one database/collection pair.
///
/// The underlying store is released exactly once, either by [`Session::close`]
/// or when the session is dropped.
pub struct Session<S: DocumentStore> {
    store: S,
    namespace: Namespace,
    open: bool,
}

impl<S: DocumentStore> Session<S> {
    /// Probes `store` and binds it to `namespace`.
    ///
    /// # Errors
    /// - `ConnectionError::Probe` when the liveness probe fails; the store is
    ///   released before returning.
    pub fn establish(mut store: S, namespace: Namespace) -> DbResult<Self> {
        let started_at = Instant::now();
        match store.ping() {
            Ok(()) => {
                info!(
                    "event=session_open module=db status=ok namespace={} duration_ms={}",
                    namespace,
                    started_at.elapsed().as_millis()
                );
                Ok(Self {
                    store,
                    namespace,
                    open: true,
                })
            }
            Err(err) => {
                store.release();
                error!(
                    "event=session_open module=db status=error namespace={} duration_ms={} error_code=probe_failed error={}",
                    namespace,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(ConnectionError::Probe(err))
            }
        }
    }

    /// Opens a store with `open` and establishes a session, retrying
    /// transient failures per `retry`.
    pub fn establish_with<F>(mut open: F, namespace: Namespace, retry: &RetryPolicy) -> DbResult<Self>
    where
        F: FnMut() -> StoreResult<S>,
    {
        retry.run_while(
            "session_open",
            || {
                let store = open().map_err(ConnectionError::Open)?;
                Self::establish(store, namespace.clone())
            },
            ConnectionError::is_transient,
        )
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Releases the store now instead of at drop.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.store.release();
        info!(
            "event=session_close module=db status=ok namespace={}",
            self.namespace
        );
    }
}

impl<S: DocumentStore> Drop for Session<S> {
    fn drop(&mut self) {
        self.release();
    }
}
