//! Runs the [`Reconciler`] for every [`DeploymentLabelCheck`] in the watched
//! namespace.
use std::{sync::Arc, time::Duration};

use const_format::concatcp;
use futures::StreamExt;
use kube::runtime::{Controller, controller::Action, watcher};
use snafu::{ResultExt, Snafu};

use crate::{
    cli::RunArguments,
    crd::DeploymentLabelCheck,
    logging::controller::report_controller_reconciled,
    observe::TracingObserver,
    reconcile::{self, CheckRequest, Reconciler},
    store::KubeStore,
    utils::signal::{SignalError, SignalWatcher},
};

pub const OPERATOR_NAME: &str = "label-check-operator";
pub const CONTROLLER_NAME: &str = "deploymentlabelcheck";
pub const FULL_CONTROLLER_NAME: &str = concatcp!(CONTROLLER_NAME, ".", OPERATOR_NAME);

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to watch for SIGTERM"))]
    CreateSignalWatcher { source: SignalError },
}

struct Ctx {
    reconciler: Reconciler<KubeStore, TracingObserver>,
    error_requeue_delay: Duration,
}

/// Watches checks and reconciles them until SIGTERM is received.
pub async fn run(client: kube::Client, args: RunArguments) -> Result<(), Error> {
    let RunArguments {
        watch_namespace,
        correction_writes,
        error_requeue_delay,
        field_manager,
        ..
    } = args;

    let sigterm_watcher = SignalWatcher::sigterm().context(CreateSignalWatcherSnafu)?;

    let checks = watch_namespace.get_api::<DeploymentLabelCheck>(&client);
    let ctx = Arc::new(Ctx {
        reconciler: Reconciler::new(
            KubeStore::new(client.clone(), field_manager),
            TracingObserver,
            correction_writes,
        ),
        error_requeue_delay: error_requeue_delay.into(),
    });

    tracing::info!(
        controller.name = FULL_CONTROLLER_NAME,
        ?watch_namespace,
        %correction_writes,
        "starting controller"
    );

    Controller::new(checks, watcher::Config::default())
        .graceful_shutdown_on(sigterm_watcher.handle())
        .run(reconcile_check, error_policy, ctx)
        .for_each(|result| {
            report_controller_reconciled(&client, FULL_CONTROLLER_NAME, &result);
            futures::future::ready(())
        })
        .await;

    tracing::info!(controller.name = FULL_CONTROLLER_NAME, "controller stopped");
    Ok(())
}

async fn reconcile_check(
    check: Arc<DeploymentLabelCheck>,
    ctx: Arc<Ctx>,
) -> Result<Action, reconcile::Error> {
    let request = CheckRequest::from_check(&check)?;
    ctx.reconciler.reconcile(&request).await?;

    Ok(Action::await_change())
}

fn error_policy(
    _check: Arc<DeploymentLabelCheck>,
    _error: &reconcile::Error,
    ctx: Arc<Ctx>,
) -> Action {
    Action::requeue(ctx.error_requeue_delay)
}
