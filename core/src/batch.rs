//! Batch envelopes shared by every entity type.
//!
//! # Design
//! Writes go out as `{ "<kind>": { "<op>": [record, ...] } }` and come back
//! in the same shape. Reads come back as `{ "<list key>": [record, ...] }`.
//! An entity type plugs into this by describing its paths and keys in an
//! [`Endpoint`] and by saying how one record of an add reply maps to its
//! result. The functions here only build and read envelopes; sending them
//! is `Resource`'s job.
//!
//! Missing sections in a reply are read as "no results", never as errors.

use serde_json::{Map, Value};
use tracing::debug;

use crate::fields::{CustomField, Field, FieldBag};

/// Paths and envelope keys for one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Top-level key of write envelopes, e.g. `customers`.
    pub kind: &'static str,
    pub list_path: &'static str,
    pub set_path: &'static str,
    /// Key holding the records in a list reply.
    pub list_key: &'static str,
    /// Operation key used for additions (`add`, or `link` for links).
    pub add_op: &'static str,
    /// Keys to follow below `<kind>.<add_op>` to reach the created records.
    pub added_path: &'static [&'static str],
}

/// A record type the API can list and add.
pub trait Entity: Sized {
    type Field: Field;
    /// What one created record is reported back as.
    type Added;

    const ENDPOINT: Endpoint;

    fn fields(&self) -> &FieldBag<Self::Field>;

    fn fields_mut(&mut self) -> &mut FieldBag<Self::Field>;

    /// Map one record of an add reply. `None` when the record carries no
    /// usable result; the slot is kept either way.
    fn added(record: Value) -> Option<Self::Added>;

    /// Snapshot of every field set on the entity.
    fn values(&self) -> Map<String, Value> {
        self.fields().values()
    }

    /// Set a whitelisted field by name; other names are dropped.
    fn set_field(&mut self, name: &str, value: impl Into<Value>) -> bool {
        self.fields_mut().set_field(name, value)
    }

    fn add_custom_field(&mut self, field: CustomField) -> &mut Self {
        self.fields_mut().add_custom_field(field);
        self
    }
}

/// Entities that accept `<kind>.update`.
pub trait Updatable: Entity {}

/// Outcome of an add: one result for a single submitted entity, a list in
/// submission order otherwise. Add replies map to `Batch<Option<_>>` with
/// one slot per returned record.
#[derive(Debug, Clone, PartialEq)]
pub enum Batch<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Batch<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Batch::One(item) => vec![item],
            Batch::Many(items) => items,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Batch::One(_) => 1,
            Batch::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn single(self) -> Option<T> {
        match self {
            Batch::One(item) => Some(item),
            Batch::Many(_) => None,
        }
    }
}

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Batch::Many(Vec::new())
    }
}

/// `{ kind: { op: records } }`.
pub fn envelope(kind: &str, op: &str, records: Vec<Map<String, Value>>) -> Value {
    let records = records.into_iter().map(Value::Object).collect();
    let mut ops = Map::new();
    ops.insert(op.to_string(), Value::Array(records));
    let mut body = Map::new();
    body.insert(kind.to_string(), Value::Object(ops));
    Value::Object(body)
}

/// Add request for `entities`, one record per entity in order.
pub fn add_request<E: Entity>(entities: &[E]) -> Value {
    let endpoint = E::ENDPOINT;
    envelope(
        endpoint.kind,
        endpoint.add_op,
        entities.iter().map(E::values).collect(),
    )
}

/// Update record: the entity's values, then `id`, then `extra`, then
/// `last_modified`. Later keys overwrite earlier ones in place.
pub fn update_record<E: Updatable>(
    entity: &E,
    id: i64,
    extra: Map<String, Value>,
    last_modified: i64,
) -> Map<String, Value> {
    let mut record = entity.values();
    record.insert("id".to_string(), Value::from(id));
    record.extend(extra);
    record.insert("last_modified".to_string(), Value::from(last_modified));
    record
}

/// Records under `endpoint.list_key`, or nothing.
pub fn list_items(endpoint: &Endpoint, mut response: Value) -> Vec<Value> {
    match response.get_mut(endpoint.list_key).map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

/// Read an add reply for `submitted` entities. Every returned record keeps
/// its slot; records `E::added` cannot map become `None`.
pub fn added_items<E: Entity>(submitted: usize, response: Value) -> Batch<Option<E::Added>> {
    let endpoint = E::ENDPOINT;
    let Some(mut section) = response
        .get(endpoint.kind)
        .and_then(|kind| kind.get(endpoint.add_op))
        .cloned()
    else {
        debug!(kind = endpoint.kind, op = endpoint.add_op, "add reply without result section");
        return Batch::default();
    };
    for key in endpoint.added_path {
        section = match section.get_mut(*key) {
            Some(inner) => inner.take(),
            None => return Batch::default(),
        };
    }
    let Value::Array(records) = section else {
        return Batch::default();
    };

    let mut results = records.into_iter().map(E::added);
    if submitted == 1 {
        results.next().map(Batch::One).unwrap_or_default()
    } else {
        Batch::Many(results.collect())
    }
}

/// Whether a write reply carries the `<kind>` section at all.
pub fn has_section(endpoint: &Endpoint, response: &Value) -> bool {
    response.get(endpoint.kind).is_some()
}

/// Pull the integer `id` out of a created record.
pub fn record_id(record: Value) -> Option<i64> {
    match record.get("id")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::models::{Customer, Link, Task};

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn envelope_nests_records_under_kind_and_op() {
        let body = envelope("tasks", "add", vec![object(json!({ "text": "a" }))]);
        assert_eq!(body, json!({ "tasks": { "add": [{ "text": "a" }] } }));
        assert_eq!(envelope("links", "unlink", Vec::new()), json!({ "links": { "unlink": [] } }));
    }

    #[test]
    fn add_request_uses_entity_op() {
        let mut link = Link::new();
        link.set_quantity(1);
        assert_eq!(add_request(&[link]), json!({ "links": { "link": [{ "quantity": 1 }] } }));
    }

    #[test]
    fn update_record_orders_and_overrides_keys() {
        let mut task = Task::new();
        task.set_text("old").set_last_modified(5_i64).set_responsible_user_id(3);
        let extra = object(json!({ "text": "new", "status": 0 }));

        let record = update_record(&task, 8, extra, 99);
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["text", "last_modified", "responsible_user_id", "id", "status"]);
        assert_eq!(record["text"], json!("new"));
        assert_eq!(record["last_modified"], json!(99));
    }

    #[test]
    fn list_items_ignores_non_arrays() {
        let tasks = Task::ENDPOINT;
        assert_eq!(list_items(&tasks, json!({ "tasks": [{ "id": 1 }] })), vec![json!({ "id": 1 })]);
        assert!(list_items(&tasks, json!({ "tasks": { "id": 1 } })).is_empty());
        assert!(list_items(&tasks, json!({ "tasks": null })).is_empty());
        assert!(list_items(&tasks, json!([1, 2])).is_empty());
        assert!(list_items(&tasks, Value::Null).is_empty());
    }

    #[test]
    fn added_items_follows_added_path() {
        let reply = json!({ "customers": { "add": { "customers": [{ "id": 4 }, { "id": 5 }] } } });
        assert_eq!(added_items::<Customer>(2, reply), Batch::Many(vec![Some(4), Some(5)]));
    }

    #[test]
    fn added_items_stops_on_unexpected_shapes() {
        // The customers add section is an array instead of an object.
        let reply = json!({ "customers": { "add": [{ "id": 4 }] } });
        assert_eq!(added_items::<Customer>(1, reply), Batch::Many(Vec::new()));

        let reply = json!({ "customers": { "add": "done" } });
        assert_eq!(added_items::<Customer>(1, reply), Batch::Many(Vec::new()));

        let reply = json!({ "tasks": { "add": { "id": 4 } } });
        assert_eq!(added_items::<Task>(1, reply), Batch::Many(Vec::new()));

        assert_eq!(added_items::<Task>(2, Value::Null), Batch::Many(Vec::new()));
    }

    #[test]
    fn added_items_keeps_one_slot_per_record() {
        let reply = json!({ "tasks": { "add": [{ "id": 1 }, { "id": null }, { "id": "x" }, { "id": 4 }] } });
        assert_eq!(
            added_items::<Task>(4, reply),
            Batch::Many(vec![Some(1), None, None, Some(4)])
        );

        let reply = json!({ "tasks": { "add": [{ "id": 1 }, { "id": 2 }] } });
        assert_eq!(added_items::<Task>(1, reply), Batch::One(Some(1)));
    }

    #[test]
    fn has_section_checks_kind_only() {
        let customers = Customer::ENDPOINT;
        assert!(has_section(&customers, &json!({ "customers": {} })));
        assert!(!has_section(&customers, &json!({ "tasks": {} })));
        assert!(!has_section(&customers, &Value::Null));
    }

    #[test]
    fn record_id_accepts_numbers_and_numeric_strings() {
        assert_eq!(record_id(json!({ "id": 12 })), Some(12));
        assert_eq!(record_id(json!({ "id": "34" })), Some(34));
        assert_eq!(record_id(json!({ "id": "3a" })), None);
        assert_eq!(record_id(json!({ "id": 1.5 })), None);
        assert_eq!(record_id(json!({ "request_id": 0 })), None);
        assert_eq!(record_id(json!([1])), None);
    }
}
