//! Field storage shared by every entity.
//!
//! # Design
//! Each entity declares its field names as an enum implementing [`Field`].
//! The enum's `WHITELIST` is the set of names the generic
//! [`FieldBag::set_field`] accepts; anything else is dropped. Typed setters
//! on the entities write through [`FieldBag::set`] with an enum variant, so
//! the compiler checks their keys instead of a runtime lookup.
//!
//! Values are kept in insertion order, which is the order they appear in
//! request payloads.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::date::IntoTimestamp;

const CUSTOM_FIELDS_KEY: &str = "custom_fields";

/// The set of keys an entity may carry.
pub trait Field: Copy + Eq + fmt::Debug + 'static {
    /// Keys accepted by the generic, name-based setter.
    const WHITELIST: &'static [Self];

    /// Wire name of the field.
    fn name(self) -> &'static str;

    fn lookup(name: &str) -> Option<Self> {
        Self::WHITELIST.iter().copied().find(|f| f.name() == name)
    }
}

/// Ordered field values for one entity.
pub struct FieldBag<F> {
    values: Map<String, Value>,
    clock: Arc<dyn Clock>,
    _fields: PhantomData<F>,
}

impl<F: Field> FieldBag<F> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Bag whose date setters resolve relative input ("tomorrow", "+1 day")
    /// against `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            values: Map::new(),
            clock,
            _fields: PhantomData,
        }
    }

    pub fn set(&mut self, field: F, value: impl Into<Value>) {
        self.values.insert(field.name().to_string(), value.into());
    }

    /// Set a field by wire name. Returns `false`, and stores nothing, when
    /// the name is not in the entity's whitelist.
    pub fn set_field(&mut self, name: &str, value: impl Into<Value>) -> bool {
        match F::lookup(name) {
            Some(field) => {
                self.set(field, value);
                true
            }
            None => {
                debug!(field = name, "dropping field outside the whitelist");
                false
            }
        }
    }

    /// Store `date` as Unix seconds. Unparseable text stores `0`.
    pub fn set_date(&mut self, field: F, date: impl IntoTimestamp) {
        let ts = date.into_timestamp(self.clock.as_ref());
        self.set(field, ts);
    }

    /// Store `tags` joined with commas, in the given order.
    pub fn set_tags(&mut self, field: F, tags: impl IntoTags) {
        self.set(field, tags.into_tags());
    }

    /// Append one entry to the `custom_fields` array.
    pub fn add_custom_field(&mut self, field: CustomField) {
        let entry = field.to_value();
        match self.values.get_mut(CUSTOM_FIELDS_KEY) {
            Some(Value::Array(items)) => items.push(entry),
            _ => {
                self.values
                    .insert(CUSTOM_FIELDS_KEY.to_string(), Value::Array(vec![entry]));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Snapshot of every value set so far. No defaults are filled in.
    pub fn values(&self) -> Map<String, Value> {
        self.values.clone()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

impl<F: Field> Default for FieldBag<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> Clone for FieldBag<F> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            clock: Arc::clone(&self.clock),
            _fields: PhantomData,
        }
    }
}

impl<F> fmt::Debug for FieldBag<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBag").field("values", &self.values).finish()
    }
}

impl<F> PartialEq for FieldBag<F> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

/// Tag input: a single tag or an ordered collection.
pub trait IntoTags {
    fn into_tags(self) -> String;
}

impl IntoTags for &str {
    fn into_tags(self) -> String {
        self.to_string()
    }
}

impl IntoTags for String {
    fn into_tags(self) -> String {
        self
    }
}

impl IntoTags for i64 {
    fn into_tags(self) -> String {
        self.to_string()
    }
}

impl<T: AsRef<str>> IntoTags for &[T] {
    fn into_tags(self) -> String {
        self.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",")
    }
}

impl<T: AsRef<str>> IntoTags for Vec<T> {
    fn into_tags(self) -> String {
        self.as_slice().into_tags()
    }
}

impl<T: AsRef<str>, const N: usize> IntoTags for [T; N] {
    fn into_tags(self) -> String {
        self.as_slice().into_tags()
    }
}

/// One entry of an entity's `custom_fields` array.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomField {
    pub id: i64,
    pub values: Vec<CustomFieldValue>,
}

impl CustomField {
    /// Field with a single plain value.
    pub fn new(id: i64, value: impl Into<Value>) -> Self {
        Self {
            id,
            values: vec![CustomFieldValue::new(value)],
        }
    }

    /// Field with several values, e.g. phone numbers with different enums.
    pub fn multi(id: i64, values: impl IntoIterator<Item = CustomFieldValue>) -> Self {
        Self {
            id,
            values: values.into_iter().collect(),
        }
    }

    fn to_value(&self) -> Value {
        let values: Vec<Value> = self.values.iter().map(CustomFieldValue::to_value).collect();
        json!({ "id": self.id, "values": values })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomFieldValue {
    pub value: Value,
    pub enum_value: Option<Value>,
    pub subtype: Option<Value>,
}

impl CustomFieldValue {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            enum_value: None,
            subtype: None,
        }
    }

    /// Attach an enum, such as `WORK` or `MOB` for phone fields.
    pub fn with_enum(mut self, enum_value: impl Into<Value>) -> Self {
        self.enum_value = Some(enum_value.into());
        self
    }

    /// Attach a subtype, used by address fields.
    pub fn with_subtype(mut self, subtype: impl Into<Value>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert("value".to_string(), self.value.clone());
        if let Some(e) = &self.enum_value {
            out.insert("enum".to_string(), e.clone());
        }
        if let Some(s) = &self.subtype {
            out.insert("subtype".to_string(), s.clone());
        }
        Value::Object(out)
    }
}
