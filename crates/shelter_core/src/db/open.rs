//! Connection address composition and MongoDB session bootstrap.
//!
//! # Responsibility
//! - Percent-encode credentials into the connection address.
//! - Validate target coordinates before any network I/O.
//! - Open a MongoDB client and hand it to `Session` for probing.
//!
//! # Invariants
//! - Username and secret are always percent-encoded in the address.
//! - Logged addresses carry a redacted secret.

use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Debug, Formatter};
use std::time::{Duration, Instant};

use super::{ConnectionError, DbResult, RetryPolicy, Session};
use crate::store::{MongoStore, Namespace};

/// Administrative database used to validate credentials.
pub const DEFAULT_AUTH_SOURCE: &str = "admin";
const REDACTED_SECRET: &str = "****";

static HOST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9._\-]+|\[[0-9A-Fa-f:.]+\])$").expect("valid host regex")
});
static DATABASE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[^/\\. "$*<>:|?\x00]{1,63}$"#).expect("valid database name regex")
});
static COLLECTION_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^$\x00]+$").expect("valid collection name regex"));

/// Username/secret pair. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    secret: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &REDACTED_SECRET)
            .finish()
    }
}

/// Store coordinates plus the namespace the session binds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub collection: String,
    pub auth_source: String,
    /// Bounds how long the driver waits for a reachable server.
    pub server_selection_timeout: Option<Duration>,
}

impl ConnectionTarget {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            collection: collection.into(),
            auth_source: DEFAULT_AUTH_SOURCE.to_string(),
            server_selection_timeout: None,
        }
    }

    pub fn with_server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = Some(timeout);
        self
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::new(self.database.as_str(), self.collection.as_str())
    }

    /// Checks coordinates against MongoDB naming rules.
    pub fn validate(&self) -> DbResult<()> {
        if !HOST_RE.is_match(&self.host) {
            return Err(invalid(format!("host `{}` is not a valid hostname", self.host)));
        }
        if self.port == 0 {
            return Err(invalid("port must be non-zero".to_string()));
        }
        if !DATABASE_NAME_RE.is_match(&self.database) {
            return Err(invalid(format!(
                "database name `{}` is empty, too long or contains reserved characters",
                self.database
            )));
        }
        if !DATABASE_NAME_RE.is_match(&self.auth_source) {
            return Err(invalid(format!(
                "auth source `{}` is not a valid database name",
                self.auth_source
            )));
        }
        if !COLLECTION_NAME_RE.is_match(&self.collection) || self.collection.starts_with("system.")
        {
            return Err(invalid(format!(
                "collection name `{}` is empty, reserved or contains `$`",
                self.collection
            )));
        }
        Ok(())
    }
}

fn invalid(message: String) -> ConnectionError {
    ConnectionError::InvalidTarget(message)
}

/// Builds the connection address with percent-encoded credentials.
pub fn connection_uri(credentials: &Credentials, target: &ConnectionTarget) -> String {
    build_uri(
        &urlencoding::encode(&credentials.username),
        &urlencoding::encode(&credentials.secret),
        target,
    )
}

/// Same address as [`connection_uri`] with the secret masked, for logs.
pub fn redacted_uri(credentials: &Credentials, target: &ConnectionTarget) -> String {
    build_uri(
        &urlencoding::encode(&credentials.username),
        REDACTED_SECRET,
        target,
    )
}

fn build_uri(username: &str, secret: &str, target: &ConnectionTarget) -> String {
    let mut uri = format!(
        "mongodb://{}:{}@{}:{}/{}?authSource={}",
        username,
        secret,
        target.host,
        target.port,
        target.database,
        urlencoding::encode(&target.auth_source)
    );
    if let Some(timeout) = target.server_selection_timeout {
        uri.push_str(&format!("&serverSelectionTimeoutMS={}", timeout.as_millis()));
    }
    uri
}

/// Opens and verifies a MongoDB session with a single attempt.
///
/// # Errors
/// - `InvalidTarget` for malformed coordinates.
/// - `Open`/`Probe` carrying the driver failure.
pub fn connect(credentials: &Credentials, target: &ConnectionTarget) -> DbResult<Session<MongoStore>> {
    connect_with_retry(credentials, target, &RetryPolicy::none())
}

/// Opens and verifies a MongoDB session, retrying transient failures.
///
/// # Side effects
/// - Emits `db_connect` logging events with duration and status.
pub fn connect_with_retry(
    credentials: &Credentials,
    target: &ConnectionTarget,
    retry: &RetryPolicy,
) -> DbResult<Session<MongoStore>> {
    let started_at = Instant::now();
    let logged_uri = redacted_uri(credentials, target);
    info!("event=db_connect module=db status=start uri={logged_uri}");

    if let Err(err) = target.validate() {
        error!(
            "event=db_connect module=db status=error uri={} error_code=invalid_target error={}",
            logged_uri, err
        );
        return Err(err);
    }

    let uri = connection_uri(credentials, target);
    match Session::establish_with(|| MongoStore::open(&uri), target.namespace(), retry) {
        Ok(session) => {
            info!(
                "event=db_connect module=db status=ok uri={} duration_ms={}",
                logged_uri,
                started_at.elapsed().as_millis()
            );
            Ok(session)
        }
        Err(err) => {
            error!(
                "event=db_connect module=db status=error uri={} duration_ms={} error_code=connect_failed error={}",
                logged_uri,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}
