//! Stores persisting to the query string of an in-memory history.

use std::sync::Arc;

use searchform_fields::{
    create_field_store, Field, FieldOperation, FieldStore, FieldType, FieldValue, FormSubmitter,
    MemoryHistory, StoreOptions, SubmitPolicy,
};

fn url_store(history: &MemoryHistory) -> FieldStore {
    create_field_store(StoreOptions::PersistInUrl {
        history: Some(Arc::new(history.clone())),
    })
    .unwrap()
}

fn register_filters(store: &FieldStore) {
    store
        .register(Field::new("status", FieldType::String).unwrap().value(""))
        .unwrap();
    store
        .register(Field::new("tags", FieldType::StringArray).unwrap())
        .unwrap();
    store
        .register(Field::new("page", FieldType::Number).unwrap().value(1i64))
        .unwrap();
}

fn strings(value: &FieldValue) -> Vec<String> {
    value
        .as_array()
        .unwrap_or_default()
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[test_log::test]
fn registers_from_query_string() {
    let history = MemoryHistory::new("/products?status=active&tags%5B%5D=b&tags%5B%5D=a&page=abc");
    let store = url_store(&history);
    register_filters(&store);

    assert_eq!(store.get("status").unwrap().value, FieldValue::from("active"));
    assert_eq!(strings(&store.get("tags").unwrap().value), vec!["b", "a"]);
    // malformed number falls back to the default
    assert_eq!(store.get("page").unwrap().value, FieldValue::from(1i64));
}

#[test_log::test]
fn persist_writes_sorted_query() {
    let history = MemoryHistory::new("/products");
    let store = url_store(&history);
    register_filters(&store);

    store.set("status", "active");
    store.set("tags", FieldValue::array(["red", "blue"]));
    store.persist();

    assert_eq!(
        history.location(),
        "/products?status=active&tags%5B%5D=blue&tags%5B%5D=red&page=1"
    );

    // nothing changed, no new history entry
    let entries = history.len();
    store.persist();
    assert_eq!(history.len(), entries);
}

#[test_log::test]
fn stores_sharing_a_url_keep_their_own_parameters() {
    let history = MemoryHistory::new("/products?campaign=spring");
    let filters = url_store(&history);
    register_filters(&filters);
    let sorting = url_store(&history);
    sorting
        .register(Field::new("sort", FieldType::String).unwrap().value("price"))
        .unwrap();

    filters.set("status", "active");
    filters.persist();
    sorting.persist();

    let location = history.location();
    assert!(location.contains("campaign=spring"), "{location}");
    assert!(location.contains("status=active"), "{location}");
    assert!(location.contains("sort=price"), "{location}");
}

#[test_log::test(tokio::test)]
async fn back_navigation_resyncs_values() {
    let history = MemoryHistory::new("/products");
    let store = url_store(&history);
    register_filters(&store);

    store.set("status", "active");
    store.persist();
    store.set("status", "archived");
    store.persist();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _sub = store.on_persistence_change(move |state| {
        let _ = tx.send(state.operation);
    });

    assert!(history.back());
    assert_eq!(rx.recv().await.unwrap(), Some(FieldOperation::Sync));
    assert_eq!(store.get("status").unwrap().value, FieldValue::from("active"));
}

#[test_log::test]
fn reset_submits_and_clears_the_query() {
    let history = MemoryHistory::new("/products?status=active");
    let store = url_store(&history);
    register_filters(&store);
    let submitter = FormSubmitter::new(store.clone(), SubmitPolicy::default());
    let _sub = submitter.attach();

    store.reset();

    assert_eq!(store.state().operation, Some(FieldOperation::Reset));
    assert_eq!(history.location(), "/products?status=&page=1");
}
