//! Reactive Store
//!
//! A key-addressable reactive record. Each key has its own subscriber set, so
//! writing one field never re-runs subscribers that only read another.
//!
//! Fields are accessed through an explicit `get`/`set` pair. Typed wrappers
//! (see `app::Settings`) put named accessors on top.

use std::fmt::Debug;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::runtime::{ContainerHandle, ContainerId, PropertyKey, Runtime};

/// A reactive key → value record.
pub struct Store<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    inner: Arc<StoreInner<V>>,
}

struct StoreInner<V> {
    container: ContainerHandle,
    fields: RwLock<IndexMap<PropertyKey, V>>,
}

impl<V> Store<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create an empty store.
    pub fn new() -> Self {
        Self::from_fields(std::iter::empty::<(PropertyKey, V)>())
    }

    /// Create a store from initial fields.
    pub fn from_fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<PropertyKey>,
    {
        let fields = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            inner: Arc::new(StoreInner {
                container: ContainerHandle::new(),
                fields: RwLock::new(fields),
            }),
        }
    }

    /// The store's container identity in the dependency tracker.
    pub fn id(&self) -> ContainerId {
        self.inner.container.id()
    }

    /// Read a field, registering the running subscriber against `key`.
    ///
    /// Reading a missing key still subscribes, so a later insert notifies.
    pub fn get(&self, key: &str) -> Option<V> {
        let (tracked, value) = {
            let fields = self.inner.fields.read();
            match fields.get_key_value(key) {
                Some((k, v)) => (k.clone(), Some(v.clone())),
                None => (PropertyKey::Owned(key.to_owned()), None),
            }
        };
        Runtime::track(self.id(), tracked);
        value
    }

    /// Read a field without tracking.
    pub fn get_untracked(&self, key: &str) -> Option<V> {
        self.inner.fields.read().get(key).cloned()
    }

    /// Write a field. Returns `false` and notifies nobody when the stored
    /// value is already equal.
    pub fn set(&self, key: impl Into<PropertyKey>, value: V) -> bool {
        let key = key.into();
        {
            let mut fields = self.inner.fields.write();
            match fields.get_mut(&*key) {
                Some(current) if *current == value => return false,
                Some(current) => *current = value,
                None => {
                    fields.insert(key.clone(), value);
                }
            }
        }
        Runtime::notify(self.id(), &key);
        true
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.fields.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<PropertyKey> {
        self.inner.fields.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.fields.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of subscribers currently depending on `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        Runtime::subscriber_count(self.id(), key)
    }
}

impl<V> Default for Store<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for Store<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Debug for Store<V>
where
    V: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.id())
            .field("fields", &*self.inner.fields.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Effect;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn counting_reader(store: &Store<i32>, key: &'static str) -> (Effect, Arc<AtomicI32>) {
        let runs = Arc::new(AtomicI32::new(0));
        let effect = {
            let store = store.clone();
            let runs = runs.clone();
            Effect::new(move || {
                store.get(key);
                runs.fetch_add(1, Ordering::SeqCst);
            })
        };
        (effect, runs)
    }

    #[test]
    fn get_and_set_fields() {
        let store = Store::from_fields([("a", 1), ("b", 2)]);
        assert_eq!(store.get("a"), Some(1));
        assert_eq!(store.get("missing"), None);

        assert!(store.set("a", 10));
        assert!(!store.set("a", 10));
        assert_eq!(store.get("a"), Some(10));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn keys_are_isolated() {
        let store = Store::from_fields([("a", 1), ("b", 2)]);
        let (_effect, runs) = counting_reader(&store, "b");
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        store.set("a", 5);
        store.set("a", 6);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        store.set("b", 3);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn inserting_a_read_missing_key_notifies() {
        let store: Store<i32> = Store::new();
        let (_effect, runs) = counting_reader(&store, "late");

        store.set("late", 1);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(store.subscriber_count("late"), 1);
    }
}
