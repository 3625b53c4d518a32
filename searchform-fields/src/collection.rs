//! Immutable snapshot of the registered fields at one commit.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::field::RegisteredField;
use crate::types::{FieldName, PrimitiveMap, ValueMap};

/// Read-only view over the fields registered when a commit happened.
///
/// Every commit builds a new snapshot, even when no field changed, so two
/// collections are never the same snapshot unless one is a clone of the
/// other. Use the state's `touched` list, not [`FieldsCollection::same_snapshot`],
/// to decide whether anything changed.
#[derive(Clone, Default)]
pub struct FieldsCollection {
    fields: Arc<IndexMap<FieldName, RegisteredField>>,
}

impl FieldsCollection {
    /// Snapshot a field map. The map is copied; later changes to it do not
    /// reach this collection.
    pub fn from_map(fields: &IndexMap<FieldName, RegisteredField>) -> Self {
        Self {
            fields: Arc::new(fields.clone()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredField> {
        self.fields.get(name)
    }

    /// Fields in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredField> {
        self.fields.values()
    }

    pub fn names(&self) -> Vec<FieldName> {
        self.fields.keys().cloned().collect()
    }

    pub fn filter(&self, predicate: impl Fn(&RegisteredField) -> bool) -> Vec<RegisteredField> {
        self.iter().filter(|field| predicate(field)).cloned().collect()
    }

    pub fn map<T>(&self, mapper: impl Fn(&RegisteredField) -> T) -> Vec<T> {
        self.iter().map(mapper).collect()
    }

    pub fn to_vec(&self) -> Vec<RegisteredField> {
        self.iter().cloned().collect()
    }

    pub fn to_map(&self) -> IndexMap<FieldName, RegisteredField> {
        (*self.fields).clone()
    }

    /// Name → value, without `Null` values.
    pub fn to_values(&self) -> ValueMap {
        self.iter()
            .filter(|field| !field.value.is_null())
            .map(|field| (field.name.clone(), field.value.clone()))
            .collect()
    }

    /// Name → primitive, through each field's serializer. Values without a
    /// primitive form are left out.
    pub fn to_primitives(&self) -> PrimitiveMap {
        self.iter()
            .filter_map(|field| field.serialize().map(|primitive| (field.name.clone(), primitive)))
            .collect()
    }

    /// Fields whose value is not `Null`.
    pub fn only_actives(&self) -> Vec<RegisteredField> {
        self.filter(|field| !field.value.is_null())
    }

    /// Whether both collections are the same commit's snapshot.
    pub fn same_snapshot(&self, other: &FieldsCollection) -> bool {
        Arc::ptr_eq(&self.fields, &other.fields)
    }
}

impl<'a> IntoIterator for &'a FieldsCollection {
    type Item = &'a RegisteredField;
    type IntoIter = indexmap::map::Values<'a, FieldName, RegisteredField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.values()
    }
}

impl fmt::Debug for FieldsCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.fields.values()).finish()
    }
}
