//! In-process document store.
//!
//! # Responsibility
//! - Evaluate equality, `$in` and range filters the way the MongoDB filter
//!   evaluator does for the shapes core produces.
//! - Apply `$set`/`$unset`/`$inc` mutations with modified-count semantics.
//! - Offer fault switches (outage, credential rejection) for callers that
//!   need to exercise failure paths without a live server.
//!
//! # Invariants
//! - Clones share one backing state; release is tracked per handle.
//! - Inserted documents get a generated `_id` as their first field.
//! - A failed `update_many` leaves every document untouched.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{DocumentStore, Namespace, StoreError, StoreResult};
use crate::model::document::{Document, ID_FIELD};

#[derive(Debug, Default)]
struct MemoryState {
    collections: BTreeMap<Namespace, Vec<Document>>,
    outage: bool,
    reject_credentials: bool,
    releases: usize,
}

/// Shared in-memory store handle.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Mutex<MemoryState>>,
    released: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call (ping included) fail as unreachable.
    pub fn set_outage(&self, outage: bool) {
        if let Ok(mut state) = self.shared.lock() {
            state.outage = outage;
        }
    }

    /// Makes the liveness probe fail as an authentication error.
    pub fn reject_credentials(&self, reject: bool) {
        if let Ok(mut state) = self.shared.lock() {
            state.reject_credentials = reject;
        }
    }

    /// Returns how many handles sharing this state were released.
    pub fn release_count(&self) -> usize {
        self.shared.lock().map(|state| state.releases).unwrap_or(0)
    }

    /// Returns the number of stored documents in `ns`.
    pub fn len(&self, ns: &Namespace) -> usize {
        self.shared
            .lock()
            .map(|state| state.collections.get(ns).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, ns: &Namespace) -> bool {
        self.len(ns) == 0
    }

    fn open_state(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        if self.released {
            return Err(StoreError::Released);
        }
        let state = self
            .shared
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        if state.outage {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        Ok(state)
    }
}

impl DocumentStore for MemoryStore {
    fn ping(&self) -> StoreResult<()> {
        let state = self.open_state()?;
        if state.reject_credentials {
            return Err(StoreError::Unauthorized(
                "authentication failed".to_string(),
            ));
        }
        Ok(())
    }

    fn insert_one(&self, ns: &Namespace, doc: &Document) -> StoreResult<()> {
        let mut state = self.open_state()?;
        let collection = state.collections.entry(ns.clone()).or_default();

        let id = doc
            .get(ID_FIELD)
            .cloned()
            .unwrap_or_else(|| Value::String(Uuid::new_v4().to_string()));
        if collection
            .iter()
            .any(|existing| existing.get(ID_FIELD) == Some(&id))
        {
            return Err(StoreError::Rejected(format!("duplicate key `_id`: {id}")));
        }

        let mut stored = Map::with_capacity(doc.len() + 1);
        stored.insert(ID_FIELD.to_string(), id);
        for (field, value) in doc {
            if field != ID_FIELD {
                stored.insert(field.clone(), value.clone());
            }
        }
        collection.push(stored);
        Ok(())
    }

    fn find(&self, ns: &Namespace, filter: &Document) -> StoreResult<Vec<Document>> {
        let state = self.open_state()?;
        let Some(collection) = state.collections.get(ns) else {
            return Ok(Vec::new());
        };

        let mut found = Vec::new();
        for doc in collection {
            if matches_filter(doc, filter)? {
                found.push(doc.clone());
            }
        }
        Ok(found)
    }

    fn update_many(
        &self,
        ns: &Namespace,
        filter: &Document,
        mutation: &Document,
    ) -> StoreResult<u64> {
        let mut state = self.open_state()?;
        let Some(collection) = state.collections.get_mut(ns) else {
            return Ok(0);
        };

        let mut changes = Vec::new();
        for (index, doc) in collection.iter().enumerate() {
            if !matches_filter(doc, filter)? {
                continue;
            }
            let mut updated = doc.clone();
            apply_mutation(&mut updated, mutation)?;
            if &updated != doc {
                changes.push((index, updated));
            }
        }

        let modified = changes.len() as u64;
        for (index, updated) in changes {
            collection[index] = updated;
        }
        Ok(modified)
    }

    fn delete_many(&self, ns: &Namespace, filter: &Document) -> StoreResult<u64> {
        let mut state = self.open_state()?;
        let Some(collection) = state.collections.get_mut(ns) else {
            return Ok(0);
        };

        let mut matched = Vec::with_capacity(collection.len());
        for doc in collection.iter() {
            matched.push(matches_filter(doc, filter)?);
        }

        let before = collection.len();
        let mut matched = matched.into_iter();
        collection.retain(|_| !matched.next().unwrap_or(false));
        Ok((before - collection.len()) as u64)
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Ok(mut state) = self.shared.lock() {
            state.releases += 1;
        }
        debug!("event=store_release module=store status=ok backend=memory");
    }
}

fn matches_filter(doc: &Document, filter: &Document) -> StoreResult<bool> {
    for (path, expected) in filter {
        if !clause_matches(lookup(doc, path), expected)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clause_matches(actual: Option<&Value>, expected: &Value) -> StoreResult<bool> {
    let operators = match expected {
        Value::Object(ops) if is_operator_object(ops) => ops,
        Value::Null => return Ok(actual.map_or(true, Value::is_null)),
        _ => return Ok(actual.is_some_and(|value| values_equal(value, expected))),
    };

    for (op, operand) in operators {
        let matched = match op.as_str() {
            "$eq" => actual.is_some_and(|value| values_equal(value, operand)),
            "$ne" => !actual.is_some_and(|value| values_equal(value, operand)),
            "$in" => {
                let candidates = operand
                    .as_array()
                    .ok_or_else(|| StoreError::Rejected("`$in` needs an array".to_string()))?;
                actual.is_some_and(|value| {
                    candidates
                        .iter()
                        .any(|candidate| values_equal(value, candidate))
                })
            }
            "$gt" | "$gte" | "$lt" | "$lte" => actual
                .and_then(|value| compare_values(value, operand))
                .is_some_and(|ordering| match op.as_str() {
                    "$gt" => ordering == Ordering::Greater,
                    "$gte" => ordering != Ordering::Less,
                    "$lt" => ordering == Ordering::Less,
                    _ => ordering != Ordering::Greater,
                }),
            other => {
                return Err(StoreError::Rejected(format!(
                    "unsupported query operator `{other}`"
                )))
            }
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn is_operator_object(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|key| key.starts_with('$'))
}

fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => a.as_f64() == b.as_f64(),
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => left == right,
    }
}

fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn apply_mutation(doc: &mut Document, mutation: &Document) -> StoreResult<()> {
    if !is_operator_object(mutation) {
        return Err(StoreError::Rejected(
            "update document requires atomic operators".to_string(),
        ));
    }

    for (op, fields) in mutation {
        let fields = fields
            .as_object()
            .ok_or_else(|| StoreError::Rejected(format!("`{op}` expects a document")))?;
        for (field, value) in fields {
            if field == ID_FIELD {
                return Err(StoreError::Rejected("`_id` is immutable".to_string()));
            }
            match op.as_str() {
                "$set" => {
                    doc.insert(field.clone(), value.clone());
                }
                "$unset" => {
                    doc.shift_remove(field);
                }
                "$inc" => {
                    let current = doc.get(field).cloned().unwrap_or(Value::from(0));
                    let next = increment(&current, value).ok_or_else(|| {
                        StoreError::Rejected(format!("cannot `$inc` non-numeric field `{field}`"))
                    })?;
                    doc.insert(field.clone(), next);
                }
                other => {
                    return Err(StoreError::Rejected(format!(
                        "unsupported update operator `{other}`"
                    )))
                }
            }
        }
    }
    Ok(())
}

fn increment(current: &Value, delta: &Value) -> Option<Value> {
    let (Value::Number(current), Value::Number(delta)) = (current, delta) else {
        return None;
    };
    match (current.as_i64(), delta.as_i64()) {
        (Some(a), Some(b)) => a.checked_add(b).map(Value::from),
        _ => Some(Value::from(current.as_f64()? + delta.as_f64()?)),
    }
}

#[cfg(test)]
mod tests {
    use super::{matches_filter, MemoryStore};
    use crate::model::document::Document;
    use crate::store::{DocumentStore, Namespace, StoreError};
    use serde_json::{json, Value};

    fn object(value: Value) -> Document {
        value.as_object().cloned().expect("fixture must be an object")
    }

    fn ns() -> Namespace {
        Namespace::new("aac", "animals")
    }

    #[test]
    fn numeric_equality_ignores_integer_float_distinction() {
        let doc = object(json!({"age": 5}));
        assert!(matches_filter(&doc, &object(json!({"age": 5.0}))).unwrap());
    }

    #[test]
    fn range_and_membership_operators_combine() {
        let doc = object(json!({"breed": "Newfoundland", "weeks": 100}));
        let inside = object(json!({
            "breed": {"$in": ["Newfoundland", "Bloodhound"]},
            "weeks": {"$gte": 26, "$lte": 156},
        }));
        let outside = object(json!({"weeks": {"$gte": 101}}));
        assert!(matches_filter(&doc, &inside).unwrap());
        assert!(!matches_filter(&doc, &outside).unwrap());
    }

    #[test]
    fn missing_field_never_satisfies_range() {
        let doc = object(json!({"name": "Luna"}));
        let filter = object(json!({"weeks": {"$lte": 10}}));
        assert!(!matches_filter(&doc, &filter).unwrap());
    }

    #[test]
    fn dotted_path_reaches_nested_fields() {
        let doc = object(json!({"location": {"city": "Austin"}}));
        assert!(matches_filter(&doc, &object(json!({"location.city": "Austin"}))).unwrap());
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let doc = object(json!({"name": "Luna"}));
        let err = matches_filter(&doc, &object(json!({"name": {"$regex": "L"}}))).unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }

    #[test]
    fn update_without_operators_is_rejected_and_changes_nothing() {
        let store = MemoryStore::new();
        store.insert_one(&ns(), &object(json!({"name": "Luna", "age": 5}))).unwrap();

        let err = store
            .update_many(&ns(), &Document::new(), &object(json!({"age": 6})))
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));

        let docs = store.find(&ns(), &Document::new()).unwrap();
        assert_eq!(docs[0]["age"], json!(5));
    }

    #[test]
    fn update_counts_only_documents_that_changed() {
        let store = MemoryStore::new();
        store.insert_one(&ns(), &object(json!({"name": "Luna", "age": 6}))).unwrap();
        store.insert_one(&ns(), &object(json!({"name": "Milo", "age": 3}))).unwrap();

        let modified = store
            .update_many(&ns(), &Document::new(), &object(json!({"$set": {"age": 6}})))
            .unwrap();
        assert_eq!(modified, 1);

        let bumped = store
            .update_many(&ns(), &Document::new(), &object(json!({"$inc": {"age": 1}})))
            .unwrap();
        assert_eq!(bumped, 2);
    }

    #[test]
    fn inserted_documents_get_leading_identifier() {
        let store = MemoryStore::new();
        store.insert_one(&ns(), &object(json!({"name": "Luna"}))).unwrap();

        let docs = store.find(&ns(), &Document::new()).unwrap();
        let first_key = docs[0].keys().next().unwrap();
        assert_eq!(first_key, "_id");
        assert!(docs[0]["_id"].is_string());
    }

    #[test]
    fn released_handle_rejects_calls_but_clones_keep_working() {
        let mut store = MemoryStore::new();
        let other = store.clone();

        store.release();
        store.release();

        assert!(matches!(store.ping(), Err(StoreError::Released)));
        assert!(other.ping().is_ok());
        assert_eq!(other.release_count(), 1);
    }
}
