//! Well-known label and annotation keys and values used on the corrected
//! workloads.
//!
//! These are part of the wire contract with the admission webhook and the
//! Deployment controller and are therefore not configurable.
use const_format::concatcp;

/// The Datadog admission controller key prefix.
const DATADOG_ADMISSION_KEY_PREFIX: &str = "admission.datadoghq.com/";

/// The Kubernetes Deployment key prefix.
const K8S_DEPLOYMENT_KEY_PREFIX: &str = "deployment.kubernetes.io/";

/// The pod template label key `admission.datadoghq.com/enabled`. Pods carrying
/// it with the value `true` are picked up by the admission webhook.
pub const ADMISSION_ENABLED_LABEL_KEY: &str = concatcp!(DATADOG_ADMISSION_KEY_PREFIX, "enabled");

/// Label value marking the pod template as enabled.
pub const ADMISSION_ENABLED_VALUE: &str = "true";

/// Label value marking an explicit opt-out, which is never overridden.
pub const ADMISSION_DISABLED_VALUE: &str = "false";

/// The Deployment annotation key `deployment.kubernetes.io/restartedAt`. Its
/// value is a base-10 counter, changing it rolls all pods of the Deployment.
pub const RESTARTED_AT_ANNOTATION_KEY: &str = concatcp!(K8S_DEPLOYMENT_KEY_PREFIX, "restartedAt");
