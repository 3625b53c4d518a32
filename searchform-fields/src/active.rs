//! Active filters: humanized tags for fields that currently filter.

use crate::collection::FieldsCollection;
use crate::emitter::Subscription;
use crate::field::{Humanized, RegisteredField};
use crate::store::FieldStore;
use crate::types::FieldValue;

/// One removable chip describing an active filter.
#[derive(Debug, Clone)]
pub struct ActiveFilterTag {
    pub label: String,
    /// The entry's value for list-shaped labels; `None` for a single label.
    pub value: Option<FieldValue>,
    pub field: RegisteredField,
}

fn is_filtering(value: &FieldValue) -> bool {
    match value {
        FieldValue::Null => false,
        FieldValue::String(text) => !text.trim().is_empty(),
        FieldValue::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Tags for every humanizable field whose value is set.
pub fn active_filters(collection: &FieldsCollection) -> Vec<ActiveFilterTag> {
    collection
        .iter()
        .filter(|field| field.humanize.is_some() && is_filtering(&field.value))
        .flat_map(|field| match field.humanized(collection) {
            None => Vec::new(),
            Some(Humanized::Label(label)) => vec![ActiveFilterTag {
                label,
                value: None,
                field: field.clone(),
            }],
            Some(Humanized::Entries(entries)) => entries
                .into_iter()
                .map(|entry| ActiveFilterTag {
                    label: entry.label,
                    value: Some(entry.value),
                    field: field.clone(),
                })
                .collect(),
        })
        .collect()
}

/// Reset every field and return the tags left afterwards.
pub fn clear_all(store: &FieldStore) -> Vec<ActiveFilterTag> {
    store.reset();
    active_filters(&store.collection())
}

/// Recompute the tags each time the store persists.
pub fn watch_active_filters(
    store: &FieldStore,
    listener: impl Fn(Vec<ActiveFilterTag>) + Send + Sync + 'static,
) -> Subscription {
    store.on_field_persisted(move |collection| listener(active_filters(collection)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, HumanizedEntry};
    use crate::types::FieldType;
    use std::sync::{Arc, Mutex};

    fn store() -> FieldStore {
        let store = FieldStore::default();
        store
            .register(
                Field::new("q", FieldType::String)
                    .unwrap()
                    .value("")
                    .humanize(|value, _| value.as_str().map(|q| Humanized::Label(format!("Search: {q}")))),
            )
            .unwrap();
        store
            .register(Field::new("tags", FieldType::StringArray).unwrap().humanize(
                |value, _| {
                    let entries = value
                        .as_array()?
                        .iter()
                        .map(|tag| HumanizedEntry {
                            label: format!("#{tag}"),
                            value: tag.clone(),
                        })
                        .collect();
                    Some(Humanized::Entries(entries))
                },
            ))
            .unwrap();
        store
            .register(Field::new("page", FieldType::Number).unwrap().value(1i64))
            .unwrap();
        store
    }

    #[test]
    fn blank_values_produce_no_tags() {
        let store = store();
        store.set("q", "   ");
        assert!(active_filters(&store.collection()).is_empty());
    }

    #[test]
    fn labels_and_entries_become_tags() {
        let store = store();
        store.set("q", "shoes");
        store.set("tags", FieldValue::array(["red", "blue"]));

        let tags = active_filters(&store.collection());
        let labels: Vec<_> = tags.iter().map(|tag| tag.label.as_str()).collect();
        assert_eq!(labels, vec!["Search: shoes", "#red", "#blue"]);
        assert_eq!(tags[0].value, None);
        assert_eq!(tags[1].value, Some(FieldValue::from("red")));
        assert_eq!(tags[2].field.name, "tags");
    }

    #[test]
    fn clear_all_resets_the_store() {
        let store = store();
        store.set("q", "shoes");
        assert!(clear_all(&store).is_empty());
        assert_eq!(store.get("q").unwrap().value, FieldValue::from(""));
    }

    #[test]
    fn watch_reports_on_persist() {
        let store = store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = watch_active_filters(&store, move |tags| {
            sink.lock().unwrap().push(tags.len());
        });

        store.set("q", "shoes");
        store.persist();
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }
}
