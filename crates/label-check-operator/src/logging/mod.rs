//! Reporting of reconcile results to the operator log and to Kubernetes events.
pub mod controller;
mod k8s_events;
