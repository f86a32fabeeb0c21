//! Selection of the namespace checks are watched in.
use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Resource};

/// Parsed from the `--watch-namespace` flag, where an empty value means all
/// namespaces.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum WatchNamespace {
    All,
    One(String),
}

impl From<&str> for WatchNamespace {
    fn from(namespace: &str) -> Self {
        match namespace {
            "" => Self::All,
            namespace => Self::One(namespace.to_owned()),
        }
    }
}

impl WatchNamespace {
    /// An [`Api`] scoped to the watched namespace, or cluster wide.
    pub fn get_api<K>(&self, client: &kube::Client) -> Api<K>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        match self {
            Self::All => Api::all(client.clone()),
            Self::One(namespace) => Api::namespaced(client.clone(), namespace),
        }
    }
}
