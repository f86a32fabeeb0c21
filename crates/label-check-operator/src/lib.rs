//! A Kubernetes operator which makes sure the Deployments named by
//! `DeploymentLabelCheck` resources carry the `admission.datadoghq.com/enabled`
//! pod template label, rolling their pods when the label had to be added.
pub mod cli;
pub mod controller;
pub mod crd;
pub mod kvp;
pub mod logging;
pub mod namespace;
pub mod observe;
pub mod reconcile;
pub mod store;
pub mod utils;
pub mod yaml;

// Internal re-exports
pub use k8s_openapi;
pub use kube;
