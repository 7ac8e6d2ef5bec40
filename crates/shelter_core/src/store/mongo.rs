//! MongoDB-backed document store.
//!
//! # Responsibility
//! - Translate JSON documents to BSON and back at the driver boundary.
//! - Issue single blocking driver calls through the `sync` client.
//!
//! # Invariants
//! - Documents leave this module as relaxed extended JSON, so `_id`
//!   surfaces as an opaque `{"$oid": ...}` object.

use log::debug;
use mongodb::bson::{self, doc, Bson, Document as BsonDocument};
use mongodb::sync::{Client, Collection};
use serde_json::Value;

use super::{DocumentStore, Namespace, StoreError, StoreResult};
use crate::model::document::Document;

const ADMIN_DATABASE: &str = "admin";

/// Blocking MongoDB store over one client connection pool.
pub struct MongoStore {
    client: Option<Client>,
}

impl MongoStore {
    /// Creates a client for `uri`.
    ///
    /// The driver connects lazily; call [`DocumentStore::ping`] to verify
    /// reachability and credentials.
    pub fn open(uri: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri)?;
        Ok(Self {
            client: Some(client),
        })
    }

    fn client(&self) -> StoreResult<&Client> {
        self.client.as_ref().ok_or(StoreError::Released)
    }

    fn collection(&self, ns: &Namespace) -> StoreResult<Collection<BsonDocument>> {
        Ok(self
            .client()?
            .database(&ns.database)
            .collection(&ns.collection))
    }
}

impl DocumentStore for MongoStore {
    fn ping(&self) -> StoreResult<()> {
        self.client()?
            .database(ADMIN_DATABASE)
            .run_command(doc! { "ping": 1 }, None)?;
        Ok(())
    }

    fn insert_one(&self, ns: &Namespace, doc: &Document) -> StoreResult<()> {
        let encoded = to_bson_document(doc)?;
        self.collection(ns)?.insert_one(encoded, None)?;
        Ok(())
    }

    fn find(&self, ns: &Namespace, filter: &Document) -> StoreResult<Vec<Document>> {
        let cursor = self.collection(ns)?.find(to_bson_document(filter)?, None)?;
        cursor
            .map(|item| item.map_err(StoreError::from).and_then(from_bson_document))
            .collect()
    }

    fn update_many(
        &self,
        ns: &Namespace,
        filter: &Document,
        mutation: &Document,
    ) -> StoreResult<u64> {
        let result = self.collection(ns)?.update_many(
            to_bson_document(filter)?,
            to_bson_document(mutation)?,
            None,
        )?;
        Ok(result.modified_count)
    }

    fn delete_many(&self, ns: &Namespace, filter: &Document) -> StoreResult<u64> {
        let result = self
            .collection(ns)?
            .delete_many(to_bson_document(filter)?, None)?;
        Ok(result.deleted_count)
    }

    fn release(&mut self) {
        if self.client.take().is_some() {
            debug!("event=store_release module=store status=ok backend=mongodb");
        }
    }
}

fn to_bson_document(doc: &Document) -> StoreResult<BsonDocument> {
    bson::to_document(doc).map_err(|err| StoreError::Encoding(err.to_string()))
}

fn from_bson_document(doc: BsonDocument) -> StoreResult<Document> {
    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Encoding(format!(
            "expected document from driver, got `{other}`"
        ))),
    }
}
