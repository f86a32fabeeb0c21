//! Read and write access to the objects the reconciler works on.
//!
//! The reconciler only needs two operations, [`ObjectStore::get`] and
//! [`ObjectStore::update`]. [`KubeStore`] talks to the Kubernetes API server,
//! [`InMemoryStore`] keeps everything in process and is used in tests.
use std::fmt::{Debug, Display};

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::{Serialize, de::DeserializeOwned};
use snafu::Snafu;
use strum::{EnumDiscriminants, IntoStaticStr};

mod kube_store;
mod memory;

pub use kube_store::KubeStore;
pub use memory::InMemoryStore;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu, EnumDiscriminants)]
#[strum_discriminants(derive(IntoStaticStr))]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("{object} was modified concurrently, the write is based on a stale resourceVersion"))]
    Conflict { object: ObjectKey },

    #[snafu(display("{object} cannot be updated because it does not exist"))]
    UpdateMissing { object: ObjectKey },

    #[snafu(display("{kind} object has no name"))]
    ObjectHasNoName { kind: String },

    #[snafu(display("{kind} {name:?} has no namespace"))]
    ObjectHasNoNamespace { kind: String, name: String },

    #[snafu(display("request for {object} to the Kubernetes API failed"))]
    Kube {
        source: kube::Error,
        object: ObjectKey,
    },

    #[snafu(display("failed to convert {object}"))]
    Convert {
        source: serde_json::Error,
        object: ObjectKey,
    },

    #[snafu(display("object store is unavailable while accessing {object}"))]
    Unavailable { object: ObjectKey },
}

/// Resources that can be read and written through an [`ObjectStore`].
pub trait StoreResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + DeserializeOwned
    + Serialize
    + Send
    + Sync
    + 'static
{
}

impl<K> StoreResource for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + DeserializeOwned
        + Serialize
        + Send
        + Sync
        + 'static
{
}

/// Identifies a single namespaced object of some kind.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ObjectKey {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new<K: StoreResource>(namespace: &str, name: &str) -> Self {
        Self {
            kind: K::kind(&()).into_owned(),
            namespace: namespace.to_owned(),
            name: name.to_owned(),
        }
    }

    /// Builds the key of an existing object from its metadata.
    pub fn of<K: StoreResource>(object: &K) -> Result<Self> {
        let kind = K::kind(&()).into_owned();
        let meta = object.meta();

        let name = match &meta.name {
            Some(name) => name.clone(),
            None => return ObjectHasNoNameSnafu { kind }.fail(),
        };
        let namespace = match &meta.namespace {
            Some(namespace) => namespace.clone(),
            None => return ObjectHasNoNamespaceSnafu { kind, name }.fail(),
        };

        Ok(Self {
            kind,
            namespace,
            name,
        })
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Get and update namespaced objects.
///
/// Implementations use optimistic concurrency: an update carrying a stale
/// `resourceVersion` is rejected with [`Error::Conflict`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetches the object, returning [`None`] if it does not exist.
    async fn get<K: StoreResource>(&self, namespace: &str, name: &str) -> Result<Option<K>>;

    /// Replaces the stored object with `object` and returns what was stored.
    async fn update<K: StoreResource>(&self, object: &K) -> Result<K>;
}
