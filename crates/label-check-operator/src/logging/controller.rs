//! Logs every result yielded by [`kube::runtime::Controller::run`].
use std::error::Error;

use kube::{
    Resource,
    core::DynamicObject,
    runtime::{
        controller::{self, Action},
        reflector::ObjectRef,
    },
};

use crate::logging::k8s_events::publish_controller_error_as_k8s_event;

/// Reconcile errors which can be shown to the owner of the reconciled object.
pub trait ReconcilerError: Error {
    /// Short `PascalCase` name of the failure, used as the event reason.
    ///
    /// Usually the name of the [`strum::EnumDiscriminants`] variant.
    fn category(&self) -> &'static str;

    /// Another object involved in the failure, for example the Deployment a
    /// check points to.
    fn secondary_object(&self) -> Option<ObjectRef<DynamicObject>> {
        None
    }
}

/// Logs the result of one reconcile.
///
/// Failed reconciles are additionally published as a `Warning` event on the
/// reconciled object.
pub fn report_controller_reconciled<K, ReconcileErr, QueueErr>(
    client: &kube::Client,
    controller_name: &str,
    result: &Result<(ObjectRef<K>, Action), controller::Error<ReconcileErr, QueueErr>>,
) where
    K: Resource,
    ReconcileErr: ReconcilerError + 'static,
    QueueErr: Error + 'static,
{
    let error = match result {
        Ok((object, action)) => {
            tracing::info!(
                controller.name = controller_name,
                %object,
                ?action,
                "reconciled object"
            );
            return;
        }
        Err(error) => error,
    };

    tracing::error!(
        controller.name = controller_name,
        error = error as &dyn Error,
        "failed to reconcile object",
    );
    publish_controller_error_as_k8s_event(client, controller_name, error);
}
