//! Document store session bootstrap.
//!
//! # Responsibility
//! - Compose connection addresses from credentials and target coordinates.
//! - Open store clients and verify them with a liveness probe.
//! - Own the bound session handle and release it on every exit path.
//!
//! # Invariants
//! - No `Session` exists unless its probe succeeded.
//! - Secrets never reach logs; only redacted addresses are logged.

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::store::StoreError;

mod open;
mod retry;
mod session;

pub use open::{
    connect, connect_with_retry, connection_uri, redacted_uri, ConnectionTarget, Credentials,
    DEFAULT_AUTH_SOURCE,
};
pub use retry::RetryPolicy;
pub use session::Session;

pub type DbResult<T> = Result<T, ConnectionError>;

/// Session establishment failure. Fatal to component construction.
#[derive(Debug)]
pub enum ConnectionError {
    /// Target coordinates were rejected before any network I/O.
    InvalidTarget(String),
    /// Store client could not be created for the address.
    Open(StoreError),
    /// Liveness probe failed: unreachable store or rejected credentials.
    Probe(StoreError),
}

impl ConnectionError {
    /// Returns whether another attempt could succeed without caller changes.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::InvalidTarget(_) => false,
            Self::Open(err) | Self::Probe(err) => err.is_transient(),
        }
    }
}

impl Display for ConnectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTarget(message) => write!(f, "invalid connection target: {message}"),
            Self::Open(err) => write!(f, "failed to open store client: {err}"),
            Self::Probe(err) => write!(f, "store liveness probe failed: {err}"),
        }
    }
}

impl Error for ConnectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidTarget(_) => None,
            Self::Open(err) | Self::Probe(err) => Some(err),
        }
    }
}
