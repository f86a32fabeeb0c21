use async_trait::async_trait;
use kube::{Api, api::PostParams};
use snafu::ResultExt;

use super::{ConflictSnafu, KubeSnafu, ObjectKey, ObjectStore, Result, StoreResource};

/// HTTP status code the API server answers with when a write carries a
/// stale `resourceVersion`.
const CONFLICT_STATUS_CODE: u16 = 409;

/// [`ObjectStore`] backed by the Kubernetes API server.
///
/// Updates are full replaces (`PUT`), so the API server checks the
/// `resourceVersion` of the submitted object.
#[derive(Clone)]
pub struct KubeStore {
    client: kube::Client,
    post_params: PostParams,
}

impl KubeStore {
    /// Creates a store which records `field_manager` on every write.
    pub fn new(client: kube::Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            post_params: PostParams {
                field_manager: Some(field_manager.into()),
                ..PostParams::default()
            },
        }
    }

    fn api<K: StoreResource>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: StoreResource>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        self.api::<K>(namespace)
            .get_opt(name)
            .await
            .with_context(|_| KubeSnafu {
                object: ObjectKey::new::<K>(namespace, name),
            })
    }

    async fn update<K: StoreResource>(&self, object: &K) -> Result<K> {
        let key = ObjectKey::of(object)?;

        match self
            .api::<K>(&key.namespace)
            .replace(&key.name, &self.post_params, object)
            .await
        {
            Ok(updated) => Ok(updated),
            Err(error) if is_conflict(&error) => ConflictSnafu { object: key }.fail(),
            Err(error) => Err(error).context(KubeSnafu { object: key }),
        }
    }
}

/// Returns true if the API server rejected the request because the object was
/// modified in the meantime.
fn is_conflict(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == CONFLICT_STATUS_CODE)
}
