use super::{ChangeCallback, PersistenceAdapter};
use crate::emitter::Subscription;
use crate::types::PrimitiveMap;

/// Persists nothing; every store starts from its defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyPersistence;

impl PersistenceAdapter for EmptyPersistence {
    fn read(&self) -> PrimitiveMap {
        PrimitiveMap::new()
    }

    fn write(&self, _values: &PrimitiveMap, _whitelist: Option<&[String]>) {}

    fn subscribe(&self, _callback: ChangeCallback) -> Subscription {
        Subscription::noop()
    }
}
