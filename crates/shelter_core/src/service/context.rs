//! Owned shelter context built once by the application.
//!
//! # Invariants
//! - A context always wraps a verified session.
//! - Table views drop the opaque `_id` field before returning rows.

use log::info;

use crate::config::ShelterConfig;
use crate::db::{connect_with_retry, DbResult, Session};
use crate::model::document::{without_id, Document};
use crate::query::rescue::RescueCategory;
use crate::repo::shelter_repo::{RepoResult, ShelterRepository};
use crate::store::{DocumentStore, MongoStore};

/// Repository plus view helpers, owned by the composition root.
pub struct ShelterContext<S: DocumentStore> {
    repo: ShelterRepository<S>,
}

impl ShelterContext<MongoStore> {
    /// Connects to MongoDB using `config`.
    pub fn init(config: &ShelterConfig) -> DbResult<Self> {
        let session =
            connect_with_retry(&config.credentials(), &config.target(), &config.retry_policy())?;
        Ok(Self::from_session(session))
    }
}

impl<S: DocumentStore> ShelterContext<S> {
    /// Builds a context around any verified session, e.g. an in-memory one.
    pub fn from_session(session: Session<S>) -> Self {
        info!(
            "event=context_init module=service status=ok namespace={}",
            session.namespace()
        );
        Self {
            repo: ShelterRepository::new(session),
        }
    }

    pub fn repository(&self) -> &ShelterRepository<S> {
        &self.repo
    }

    /// Rows for the given rescue filter, without `_id`.
    pub fn rescue_view(&self, category: RescueCategory) -> RepoResult<Vec<Document>> {
        let rows = self.repo.try_read(category.predicate())?;
        Ok(rows.iter().map(without_id).collect())
    }

    /// Rows for a raw selector value; unknown values show everything.
    pub fn selection_view(&self, selection: &str) -> RepoResult<Vec<Document>> {
        self.rescue_view(RescueCategory::from_selection(selection))
    }

    pub fn close(self) {
        self.repo.close();
    }
}
