use std::sync::Arc;

use tracing::{debug, trace};
use url::form_urlencoded;

use super::{restrict, BrowserHistory, ChangeCallback, PersistenceAdapter};
use crate::emitter::Subscription;
use crate::types::{PrimitiveMap, PrimitiveValue};

const ARRAY_SUFFIX: &str = "[]";

/// Persists field values in the query string of a [`BrowserHistory`].
///
/// Lists are written as repeated `key[]=value` parameters in sorted
/// order so equal values always produce the same URL; scalars are
/// written as `key=value`. A write that would not change the query string
/// does not push a history entry.
#[derive(Clone)]
pub struct UrlPersistence {
    history: Arc<dyn BrowserHistory>,
}

impl UrlPersistence {
    pub fn new(history: Arc<dyn BrowserHistory>) -> Self {
        Self { history }
    }

    fn current_pairs(&self) -> Vec<(String, String)> {
        form_urlencoded::parse(self.history.search().as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect()
    }
}

fn base_key(key: &str) -> &str {
    key.strip_suffix(ARRAY_SUFFIX).unwrap_or(key)
}

fn encode<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

impl PersistenceAdapter for UrlPersistence {
    fn read(&self) -> PrimitiveMap {
        let pairs = self.current_pairs();
        let mut values = PrimitiveMap::new();

        for (key, _) in &pairs {
            let name = base_key(key);
            if key.ends_with(ARRAY_SUFFIX) {
                let all = pairs
                    .iter()
                    .filter(|(other, _)| other == key)
                    .map(|(_, value)| value.clone())
                    .collect();
                values.insert(name.to_string(), PrimitiveValue::Many(all));
            } else if let Some((_, first)) = pairs.iter().find(|(other, _)| other == key) {
                values.insert(name.to_string(), PrimitiveValue::Single(first.clone()));
            }
        }

        trace!(entries = values.len(), "read query string");
        values
    }

    fn write(&self, values: &PrimitiveMap, whitelist: Option<&[String]>) {
        let current = self.current_pairs();
        let mut next: Vec<(String, String)> = Vec::new();

        // Parameters owned by someone else survive a whitelisted write.
        if let Some(allowed) = whitelist {
            next.extend(
                current
                    .iter()
                    .filter(|(key, _)| !allowed.iter().any(|name| name == base_key(key)))
                    .cloned(),
            );
        }

        for (name, value) in &restrict(values, whitelist) {
            match value {
                PrimitiveValue::Single(single) => next.push((name.clone(), single.clone())),
                PrimitiveValue::Many(many) => {
                    let mut sorted = many.clone();
                    sorted.sort();
                    let key = format!("{name}{ARRAY_SUFFIX}");
                    next.extend(sorted.into_iter().map(|item| (key.clone(), item)));
                }
            }
        }

        let new_search = encode(next.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let old_search = encode(current.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if new_search == old_search {
            trace!("query string unchanged, skipping history entry");
            return;
        }

        let pathname = self.history.pathname();
        let url = if new_search.is_empty() {
            pathname
        } else {
            format!("{pathname}?{new_search}")
        };
        debug!(%url, "pushing query string");
        self.history.push_state(&url);
    }

    fn subscribe(&self, callback: ChangeCallback) -> Subscription {
        self.history.on_pop_state(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryHistory;

    fn adapter(url: &str) -> (MemoryHistory, UrlPersistence) {
        let history = MemoryHistory::new(url);
        let persistence = UrlPersistence::new(Arc::new(history.clone()));
        (history, persistence)
    }

    #[test]
    fn reads_scalars_and_arrays() {
        let (_, persistence) = adapter("/search?q=shoes&tags%5B%5D=b&tags%5B%5D=a&q=ignored");
        let values = persistence.read();
        assert_eq!(values["q"], PrimitiveValue::from("shoes"));
        assert_eq!(values["tags"], PrimitiveValue::from(vec!["b", "a"]));
    }

    #[test]
    fn writes_sorted_arrays() {
        let (history, persistence) = adapter("/search");
        let mut values = PrimitiveMap::new();
        values.insert("q".into(), PrimitiveValue::from("shoes"));
        values.insert("tags".into(), PrimitiveValue::from(vec!["b", "a"]));
        persistence.write(&values, None);
        assert_eq!(
            history.location(),
            "/search?q=shoes&tags%5B%5D=a&tags%5B%5D=b"
        );
    }

    #[test]
    fn unchanged_query_pushes_nothing() {
        let (history, persistence) = adapter("/search?q=shoes");
        let mut values = PrimitiveMap::new();
        values.insert("q".into(), PrimitiveValue::from("shoes"));
        persistence.write(&values, None);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn empty_values_clear_the_query() {
        let (history, persistence) = adapter("/search?q=shoes");
        persistence.write(&PrimitiveMap::new(), None);
        assert_eq!(history.location(), "/search");
    }

    #[test]
    fn whitelist_preserves_foreign_parameters() {
        let (history, persistence) = adapter("/search?utm=mail&q=old");
        let mut values = PrimitiveMap::new();
        values.insert("q".into(), PrimitiveValue::from("new"));
        values.insert("secret".into(), PrimitiveValue::from("x"));
        let whitelist = vec!["q".to_string()];
        persistence.write(&values, Some(&whitelist));
        assert_eq!(history.location(), "/search?utm=mail&q=new");
    }
}
