//! The reconciler which keeps the admission enablement label on the
//! Deployments named by [`DeploymentLabelCheck`]s.
//!
//! A reconcile is a single sequential pass over one check:
//!
//! 1. fetch the check, stop if it is gone,
//! 2. fetch the Deployment it names, stop if it is gone,
//! 3. classify the pod template label and, if it is unset, label the pod
//!    template and bump the restart marker so all pods are recreated.
//!
//! Not-found is never an error. Store failures are returned to the caller
//! without retrying.
use std::fmt::Display;

use k8s_openapi::api::apps::v1::Deployment;
use kube::{ResourceExt, core::DynamicObject, runtime::reflector::ObjectRef};
use snafu::{OptionExt, ResultExt, Snafu};
use strum::{EnumDiscriminants, IntoStaticStr};

use crate::{
    crd::DeploymentLabelCheck,
    logging::controller::ReconcilerError,
    observe::ReconcileObserver,
    store::{self, ObjectKey, ObjectStore},
};

pub mod label;
pub mod restart;

pub use label::EnablementState;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu, EnumDiscriminants)]
#[strum_discriminants(derive(IntoStaticStr))]
pub enum Error {
    #[snafu(display("check {name:?} has no namespace"))]
    CheckHasNoNamespace { name: String },

    #[snafu(display("failed to get check {request}"))]
    GetCheck {
        source: store::Error,
        request: CheckRequest,
    },

    #[snafu(display("failed to get {workload}"))]
    GetWorkload {
        source: store::Error,
        workload: ObjectKey,
    },

    #[snafu(display("failed to update the pod template labels of {workload}"))]
    UpdateWorkload {
        source: store::Error,
        workload: ObjectKey,
    },

    #[snafu(display("failed to trigger a restart of {workload}"))]
    TriggerRestart {
        source: restart::Error,
        workload: ObjectKey,
    },

    #[snafu(display("failed to persist the restart marker of {workload}"))]
    PersistRestartMarker {
        source: store::Error,
        workload: ObjectKey,
    },
}

impl Error {
    /// The Deployment the error relates to, if any.
    pub fn workload(&self) -> Option<&ObjectKey> {
        match self {
            Self::CheckHasNoNamespace { .. } | Self::GetCheck { .. } => None,
            Self::GetWorkload { workload, .. }
            | Self::UpdateWorkload { workload, .. }
            | Self::TriggerRestart { workload, .. }
            | Self::PersistRestartMarker { workload, .. } => Some(workload),
        }
    }
}

impl ReconcilerError for Error {
    fn category(&self) -> &'static str {
        ErrorDiscriminants::from(self).into()
    }

    fn secondary_object(&self) -> Option<ObjectRef<DynamicObject>> {
        self.workload().map(|workload| {
            ObjectRef::<Deployment>::new(&workload.name)
                .within(&workload.namespace)
                .erase()
        })
    }
}

/// Identifies the check to reconcile.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CheckRequest {
    pub namespace: String,
    pub name: String,
}

impl CheckRequest {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// The request for an observed check object.
    pub fn from_check(check: &DeploymentLabelCheck) -> Result<Self> {
        let namespace = check
            .namespace()
            .context(CheckHasNoNamespaceSnafu {
                name: check.name_any(),
            })?;

        Ok(Self::new(namespace, check.name_any()))
    }
}

impl Display for CheckRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// How the label and the restart marker are written to the store.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    clap::ValueEnum,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum CorrectionWrites {
    /// Label and restart marker are persisted by a single update.
    ///
    /// A marker that cannot be incremented fails the reconcile before anything
    /// is written.
    #[default]
    Combined,

    /// The label is persisted first, the restart marker by a second update on
    /// the returned object.
    ///
    /// If the second update fails the Deployment stays labeled but is never
    /// restarted, because later reconciles classify it as enabled.
    Separate,
}

/// The branch a successful reconcile took.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The check no longer exists.
    CheckNotFound,

    /// The Deployment named by the check does not exist.
    WorkloadNotFound,

    /// The pod template label is already `true`.
    AlreadyEnabled,

    /// The pod template label is explicitly `false`.
    OptedOut,

    /// The label was set and a restart was triggered.
    Corrected { restart_marker: String },
}

/// Keeps the admission label on the Deployments named by checks.
pub struct Reconciler<S, O> {
    store: S,
    observer: O,
    correction_writes: CorrectionWrites,
}

impl<S, O> Reconciler<S, O>
where
    S: ObjectStore,
    O: ReconcileObserver,
{
    pub fn new(store: S, observer: O, correction_writes: CorrectionWrites) -> Self {
        Self {
            store,
            observer,
            correction_writes,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Runs one reconcile pass for the check identified by `request`.
    #[tracing::instrument(skip_all, fields(check = %request))]
    pub async fn reconcile(&self, request: &CheckRequest) -> Result<Outcome> {
        self.observer.reconcile_started(request);

        let check = self
            .store
            .get::<DeploymentLabelCheck>(&request.namespace, &request.name)
            .await
            .with_context(|_| GetCheckSnafu {
                request: request.clone(),
            })?;

        let Some(check) = check else {
            self.observer.check_not_found(request);
            return Ok(Outcome::CheckNotFound);
        };
        self.observer.check_found(request, &check);

        let workload_key = ObjectKey::new::<Deployment>(
            &check.spec.target_namespace,
            &check.spec.target_name,
        );
        let workload = self
            .store
            .get::<Deployment>(&workload_key.namespace, &workload_key.name)
            .await
            .with_context(|_| GetWorkloadSnafu {
                workload: workload_key.clone(),
            })?;

        let Some(workload) = workload else {
            self.observer.workload_not_found(&workload_key);
            return Ok(Outcome::WorkloadNotFound);
        };
        self.observer.workload_found(&workload_key);

        self.check_and_correct(workload, workload_key).await
    }

    /// Classifies the pod template label and applies the correction if needed.
    async fn check_and_correct(&self, workload: Deployment, key: ObjectKey) -> Result<Outcome> {
        let state = label::enablement_state(label::pod_template_labels(&workload));
        self.observer.label_classified(&key, state);

        match state {
            EnablementState::Enabled => Ok(Outcome::AlreadyEnabled),
            EnablementState::OptedOut => Ok(Outcome::OptedOut),
            EnablementState::Unset => match self.correct(workload, &key).await {
                Ok(restart_marker) => {
                    self.observer.restart_triggered(&key, &restart_marker);
                    Ok(Outcome::Corrected { restart_marker })
                }
                Err(error) => {
                    self.observer.correction_failed(&key, &error);
                    Err(error)
                }
            },
        }
    }

    /// Labels the pod template and bumps the restart marker, returning the
    /// new marker value.
    async fn correct(&self, mut workload: Deployment, key: &ObjectKey) -> Result<String> {
        label::enable(&mut workload);

        match self.correction_writes {
            CorrectionWrites::Combined => {
                let restart_marker = restart::stage_restart(&mut workload)
                    .context(TriggerRestartSnafu { workload: key.clone() })?;

                self.store
                    .update(&workload)
                    .await
                    .context(UpdateWorkloadSnafu { workload: key.clone() })?;
                self.observer.label_persisted(key);

                Ok(restart_marker)
            }
            CorrectionWrites::Separate => {
                let mut workload = self
                    .store
                    .update(&workload)
                    .await
                    .context(UpdateWorkloadSnafu { workload: key.clone() })?;
                self.observer.label_persisted(key);

                let restart_marker = restart::stage_restart(&mut workload)
                    .context(TriggerRestartSnafu { workload: key.clone() })?;

                self.store
                    .update(&workload)
                    .await
                    .context(PersistRestartMarkerSnafu { workload: key.clone() })?;

                Ok(restart_marker)
            }
        }
    }
}
