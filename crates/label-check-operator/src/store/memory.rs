use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde_json::Value;
use snafu::{OptionExt, ResultExt, ensure};
use tokio::sync::Mutex;

use super::{
    ConflictSnafu, ConvertSnafu, ObjectKey, ObjectStore, Result, StoreResource,
    UnavailableSnafu, UpdateMissingSnafu,
};

/// [`ObjectStore`] keeping all objects in process memory.
///
/// Every stored object gets a fresh `resourceVersion`, and updates carrying a
/// different one are rejected, mirroring the API server. Failures can be
/// injected to exercise error paths.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<ObjectKey, Value>,
    last_resource_version: u64,
    update_calls: usize,
    unavailable_kinds: BTreeSet<String>,
    remaining_successful_updates: Option<usize>,
}

impl State {
    fn store<K: StoreResource>(&mut self, key: ObjectKey, object: &K) -> Result<K> {
        self.last_resource_version += 1;

        let mut stored = object.clone();
        stored.meta_mut().resource_version = Some(self.last_resource_version.to_string());

        let value = serde_json::to_value(&stored).with_context(|_| ConvertSnafu {
            object: key.clone(),
        })?;
        self.objects.insert(key, value);

        Ok(stored)
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `object` as is, without any version check, and returns it with
    /// its assigned `resourceVersion`.
    pub async fn insert<K: StoreResource>(&self, object: K) -> Result<K> {
        let key = ObjectKey::of(&object)?;
        self.state.lock().await.store(key, &object)
    }

    /// Number of [`ObjectStore::update`] calls so far, failed ones included.
    pub async fn update_calls(&self) -> usize {
        self.state.lock().await.update_calls
    }

    /// Makes every following [`ObjectStore::get`] of kind `K` fail.
    pub async fn fail_gets<K: StoreResource>(&self) {
        self.state
            .lock()
            .await
            .unavailable_kinds
            .insert(K::kind(&()).into_owned());
    }

    /// Lets the next `successful` updates through and fails all updates after
    /// them.
    pub async fn fail_updates_after(&self, successful: usize) {
        self.state.lock().await.remaining_successful_updates = Some(successful);
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get<K: StoreResource>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        let key = ObjectKey::new::<K>(namespace, name);
        let state = self.state.lock().await;

        ensure!(
            !state.unavailable_kinds.contains(&key.kind),
            UnavailableSnafu { object: key }
        );

        state
            .objects
            .get(&key)
            .map(|value| serde_json::from_value::<K>(value.clone()))
            .transpose()
            .context(ConvertSnafu { object: key })
    }

    async fn update<K: StoreResource>(&self, object: &K) -> Result<K> {
        let key = ObjectKey::of(object)?;
        let mut state = self.state.lock().await;
        state.update_calls += 1;

        if let Some(remaining) = state.remaining_successful_updates.as_mut() {
            ensure!(*remaining > 0, UnavailableSnafu { object: key });
            *remaining -= 1;
        }

        let stored_version = state
            .objects
            .get(&key)
            .context(UpdateMissingSnafu { object: key.clone() })?
            .pointer("/metadata/resourceVersion")
            .and_then(Value::as_str)
            .map(str::to_owned);

        if let Some(version) = &object.meta().resource_version {
            ensure!(
                stored_version.as_ref() == Some(version),
                ConflictSnafu { object: key }
            );
        }

        state.store(key, object)
    }
}
