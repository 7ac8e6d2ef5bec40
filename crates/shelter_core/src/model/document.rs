//! Schemaless documents and selection predicates.
//!
//! # Responsibility
//! - Alias the ordered JSON object used as the document shape.
//! - Provide a typed builder for the three predicate forms accepted by the
//!   store filter evaluator: equality, set membership and numeric range.
//!
//! # Invariants
//! - Predicates keep clause insertion order on the wire.
//! - A predicate always serializes to a JSON object, never a list or scalar.

use serde_json::{Map, Value};

/// One schemaless record: ordered field name to value mapping.
pub type Document = Map<String, Value>;

/// Field name holding the store-assigned identifier.
pub const ID_FIELD: &str = "_id";

/// One clause constraint for a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the value exactly.
    Eq(Value),
    /// Field equals one of the listed values (`$in`).
    In(Vec<Value>),
    /// Numeric field within `[gte, lte]` inclusive.
    Range { gte: i64, lte: i64 },
}

impl Condition {
    fn to_value(&self) -> Value {
        match self {
            Self::Eq(value) => value.clone(),
            Self::In(values) => {
                let mut op = Map::new();
                op.insert("$in".to_string(), Value::Array(values.clone()));
                Value::Object(op)
            }
            Self::Range { gte, lte } => {
                let mut op = Map::new();
                op.insert("$gte".to_string(), Value::from(*gte));
                op.insert("$lte".to_string(), Value::from(*lte));
                Value::Object(op)
            }
        }
    }
}

/// Immutable selection filter passed to read/update/delete.
///
/// The empty predicate matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<(String, Condition)>,
}

impl Predicate {
    /// Creates the empty, match-everything predicate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an exact-match clause.
    pub fn equals(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Eq(value.into()))
    }

    /// Adds a set-membership clause.
    pub fn any_of<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.with(field, Condition::In(values))
    }

    /// Adds an inclusive numeric range clause.
    pub fn between(self, field: impl Into<String>, gte: i64, lte: i64) -> Self {
        self.with(field, Condition::Range { gte, lte })
    }

    fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        let field = field.into();
        // Last clause for a field wins, same as a JSON object literal.
        self.clauses.retain(|(existing, _)| existing != &field);
        self.clauses.push((field, condition));
        self
    }

    /// Returns whether this predicate matches every document.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Returns the constraint for `field`, if any.
    pub fn condition(&self, field: &str) -> Option<&Condition> {
        self.clauses
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, condition)| condition)
    }

    /// Returns constrained field names in clause order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.clauses.iter().map(|(name, _)| name.as_str())
    }

    /// Renders the wire-shape filter document.
    pub fn to_document(&self) -> Document {
        self.clauses
            .iter()
            .map(|(field, condition)| (field.clone(), condition.to_value()))
            .collect()
    }
}

impl From<Predicate> for Value {
    fn from(value: Predicate) -> Self {
        Value::Object(value.to_document())
    }
}

impl From<&Predicate> for Value {
    fn from(value: &Predicate) -> Self {
        Value::Object(value.to_document())
    }
}

/// Returns a copy of `doc` without the store-assigned identifier.
pub fn without_id(doc: &Document) -> Document {
    doc.iter()
        .filter(|(field, _)| field.as_str() != ID_FIELD)
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{without_id, Condition, Predicate};
    use serde_json::{json, Value};

    #[test]
    fn empty_predicate_renders_empty_object() {
        let value: Value = Predicate::new().into();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn predicate_renders_operator_forms_in_clause_order() {
        let predicate = Predicate::new()
            .equals("animal_type", "Dog")
            .any_of("breed", ["Newfoundland"])
            .between("age_upon_outcome_in_weeks", 26, 156);

        let value: Value = predicate.into();
        assert_eq!(
            value,
            json!({
                "animal_type": "Dog",
                "breed": {"$in": ["Newfoundland"]},
                "age_upon_outcome_in_weeks": {"$gte": 26, "$lte": 156},
            })
        );
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            ["animal_type", "breed", "age_upon_outcome_in_weeks"]
        );
    }

    #[test]
    fn repeated_field_keeps_last_clause() {
        let predicate = Predicate::new().equals("name", "Luna").equals("name", "Lucy");
        assert_eq!(predicate.fields().count(), 1);
        assert_eq!(
            predicate.condition("name"),
            Some(&Condition::Eq(json!("Lucy")))
        );
    }

    #[test]
    fn without_id_drops_only_identifier() {
        let doc = json!({"_id": "abc", "name": "Luna"});
        let stripped = without_id(doc.as_object().unwrap());
        assert_eq!(Value::Object(stripped), json!({"name": "Luna"}));
    }
}
