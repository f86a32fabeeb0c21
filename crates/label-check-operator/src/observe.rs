//! Hooks reporting the progress of a reconcile.
//!
//! The [`Reconciler`](crate::reconcile::Reconciler) calls a [`ReconcileObserver`]
//! at every branch it takes. [`TracingObserver`] turns these calls into
//! `tracing` events.
use crate::{
    crd::DeploymentLabelCheck,
    reconcile::{CheckRequest, EnablementState, Error},
    store::ObjectKey,
};

/// Receives the branches taken during a reconcile.
pub trait ReconcileObserver: Send + Sync {
    fn reconcile_started(&self, request: &CheckRequest);

    fn check_found(&self, request: &CheckRequest, check: &DeploymentLabelCheck);

    fn check_not_found(&self, request: &CheckRequest);

    fn workload_found(&self, workload: &ObjectKey);

    fn workload_not_found(&self, workload: &ObjectKey);

    fn label_classified(&self, workload: &ObjectKey, state: EnablementState);

    /// The enablement label has been written to the store.
    fn label_persisted(&self, workload: &ObjectKey);

    fn restart_triggered(&self, workload: &ObjectKey, restart_marker: &str);

    fn correction_failed(&self, workload: &ObjectKey, error: &Error);
}

/// Reports every reconcile branch as a `tracing` event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl ReconcileObserver for TracingObserver {
    fn reconcile_started(&self, request: &CheckRequest) {
        tracing::debug!(check = %request, "starting reconcile");
    }

    fn check_found(&self, request: &CheckRequest, check: &DeploymentLabelCheck) {
        tracing::info!(
            check = %request,
            deployment.namespace = %check.spec.target_namespace,
            deployment.name = %check.spec.target_name,
            status = ?check.status,
            "check found"
        );
    }

    fn check_not_found(&self, request: &CheckRequest) {
        tracing::info!(check = %request, "check not found, nothing to do");
    }

    fn workload_found(&self, workload: &ObjectKey) {
        tracing::info!(%workload, "deployment found");
    }

    fn workload_not_found(&self, workload: &ObjectKey) {
        tracing::info!(%workload, "deployment not found, nothing to do");
    }

    fn label_classified(&self, workload: &ObjectKey, state: EnablementState) {
        match state {
            EnablementState::Enabled => {
                tracing::info!(%workload, "admission label is already set to true");
            }
            EnablementState::OptedOut => {
                tracing::info!(%workload, "admission label is explicitly set to false");
            }
            EnablementState::Unset => {
                tracing::info!(%workload, "admission label is not set, enabling it");
            }
        }
    }

    fn label_persisted(&self, workload: &ObjectKey) {
        tracing::debug!(%workload, "admission label persisted");
    }

    fn restart_triggered(&self, workload: &ObjectKey, restart_marker: &str) {
        tracing::info!(%workload, restart_marker, "deployment restart triggered");
    }

    fn correction_failed(&self, workload: &ObjectKey, error: &Error) {
        tracing::error!(
            %workload,
            error = error as &dyn std::error::Error,
            "failed to correct deployment"
        );
    }
}
