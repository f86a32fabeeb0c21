use std::{collections::BTreeMap, sync::Mutex};

use indoc::indoc;
use k8s_openapi::{api::apps::v1::Deployment, apimachinery::pkg::apis::meta::v1::ObjectMeta};
use label_check_operator::{
    crd::DeploymentLabelCheck,
    kvp::{ADMISSION_ENABLED_LABEL_KEY, RESTARTED_AT_ANNOTATION_KEY},
    logging::controller::ReconcilerError,
    observe::ReconcileObserver,
    reconcile::{
        CheckRequest, CorrectionWrites, EnablementState, Error, Outcome,
        Reconciler,
        label::pod_template_labels,
        restart::{self, restart_marker},
    },
    store::{InMemoryStore, ObjectKey, ObjectStore},
};
use rstest::rstest;

const CHECK: &str = indoc! {"
    apiVersion: demo.demo.jonlimpw.io/v1
    kind: DeploymentLabelCheck
    metadata:
      name: web-check
      namespace: checks
    spec:
      targetNamespace: shop
      targetName: web
    status:
      note: informational only
"};

const DEPLOYMENT: &str = indoc! {"
    apiVersion: apps/v1
    kind: Deployment
    metadata:
      name: web
      namespace: shop
    spec:
      selector:
        matchLabels:
          app: web
      template:
        metadata:
          labels:
            app: web
        spec:
          containers:
            - name: web
              image: nginx
"};

/// Records every observer call as a short string.
#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn record(&self, event: impl Into<String>) {
        self.events
            .lock()
            .expect("observer lock must not be poisoned")
            .push(event.into());
    }

    fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .expect("observer lock must not be poisoned")
            .clone()
    }
}

impl ReconcileObserver for RecordingObserver {
    fn reconcile_started(&self, request: &CheckRequest) {
        self.record(format!("started {request}"));
    }

    fn check_found(&self, _request: &CheckRequest, check: &DeploymentLabelCheck) {
        let status = if check.status.is_some() {
            "with status"
        } else {
            "without status"
        };
        self.record(format!("check found {status}"));
    }

    fn check_not_found(&self, _request: &CheckRequest) {
        self.record("check not found");
    }

    fn workload_found(&self, workload: &ObjectKey) {
        self.record(format!("found {workload}"));
    }

    fn workload_not_found(&self, workload: &ObjectKey) {
        self.record(format!("missing {workload}"));
    }

    fn label_classified(&self, _workload: &ObjectKey, state: EnablementState) {
        self.record(format!("label {state}"));
    }

    fn label_persisted(&self, _workload: &ObjectKey) {
        self.record("label persisted");
    }

    fn restart_triggered(&self, _workload: &ObjectKey, restart_marker: &str) {
        self.record(format!("restarted {restart_marker}"));
    }

    fn correction_failed(&self, _workload: &ObjectKey, error: &Error) {
        self.record(format!("failed {}", error.category()));
    }
}

type TestReconciler = Reconciler<InMemoryStore, RecordingObserver>;

fn request() -> CheckRequest {
    CheckRequest::new("checks", "web-check")
}

fn deployment(label: Option<&str>, marker: Option<&str>) -> Deployment {
    let mut deployment: Deployment =
        serde_yaml::from_str(DEPLOYMENT).expect("deployment fixture must parse");

    if let Some(label) = label {
        deployment
            .spec
            .as_mut()
            .and_then(|spec| spec.template.metadata.as_mut())
            .and_then(|metadata| metadata.labels.as_mut())
            .expect("fixture has pod template labels")
            .insert(ADMISSION_ENABLED_LABEL_KEY.to_owned(), label.to_owned());
    }
    if let Some(marker) = marker {
        deployment.metadata.annotations = Some(BTreeMap::from([(
            RESTARTED_AT_ANNOTATION_KEY.to_owned(),
            marker.to_owned(),
        )]));
    }

    deployment
}

async fn setup(workload: Option<Deployment>, correction_writes: CorrectionWrites) -> TestReconciler {
    let store = InMemoryStore::new();

    let check: DeploymentLabelCheck = serde_yaml::from_str(CHECK).expect("check fixture must parse");
    store.insert(check).await.expect("check must be stored");

    if let Some(workload) = workload {
        store.insert(workload).await.expect("deployment must be stored");
    }

    Reconciler::new(store, RecordingObserver::default(), correction_writes)
}

async fn stored_deployment(reconciler: &TestReconciler) -> Deployment {
    reconciler
        .store()
        .get::<Deployment>("shop", "web")
        .await
        .expect("get must succeed")
        .expect("deployment must exist")
}

fn admission_label(deployment: &Deployment) -> Option<&str> {
    pod_template_labels(deployment)?
        .get(ADMISSION_ENABLED_LABEL_KEY)
        .map(String::as_str)
}

#[rstest]
#[case(CorrectionWrites::Combined, 1)]
#[case(CorrectionWrites::Separate, 2)]
#[tokio::test]
async fn absent_label_is_enabled_and_restarted(
    #[case] correction_writes: CorrectionWrites,
    #[case] expected_updates: usize,
) {
    let reconciler = setup(Some(deployment(None, None)), correction_writes).await;

    let outcome = reconciler.reconcile(&request()).await.expect("reconcile must succeed");

    assert_eq!(
        outcome,
        Outcome::Corrected {
            restart_marker: "1".to_owned()
        }
    );
    let stored = stored_deployment(&reconciler).await;
    assert_eq!(admission_label(&stored), Some("true"));
    assert_eq!(restart_marker(&stored), Some("1"));
    assert_eq!(reconciler.store().update_calls().await, expected_updates);
}

#[tokio::test]
async fn empty_labels_and_annotations_are_filled() {
    let mut workload = deployment(None, None);
    workload
        .spec
        .as_mut()
        .expect("fixture has a spec")
        .template
        .metadata = None;
    workload.metadata.annotations = Some(BTreeMap::new());
    let reconciler = setup(Some(workload), CorrectionWrites::Combined).await;

    reconciler.reconcile(&request()).await.expect("reconcile must succeed");

    let stored = stored_deployment(&reconciler).await;
    assert_eq!(
        pod_template_labels(&stored),
        Some(&BTreeMap::from([(
            ADMISSION_ENABLED_LABEL_KEY.to_owned(),
            "true".to_owned()
        )]))
    );
    assert_eq!(
        stored.metadata.annotations,
        Some(BTreeMap::from([(
            RESTARTED_AT_ANNOTATION_KEY.to_owned(),
            "1".to_owned()
        )]))
    );
}

#[rstest]
#[case(CorrectionWrites::Combined)]
#[case(CorrectionWrites::Separate)]
#[tokio::test]
async fn existing_marker_is_incremented(#[case] correction_writes: CorrectionWrites) {
    let reconciler = setup(Some(deployment(Some("yes"), Some("41"))), correction_writes).await;

    let outcome = reconciler.reconcile(&request()).await.expect("reconcile must succeed");

    assert_eq!(
        outcome,
        Outcome::Corrected {
            restart_marker: "42".to_owned()
        }
    );
    let stored = stored_deployment(&reconciler).await;
    assert_eq!(admission_label(&stored), Some("true"));
    assert_eq!(restart_marker(&stored), Some("42"));
}

#[rstest]
#[case(Some("true"), Some("3"), Outcome::AlreadyEnabled)]
#[case(Some("true"), None, Outcome::AlreadyEnabled)]
#[case(Some("false"), Some("7"), Outcome::OptedOut)]
#[case(Some("false"), Some("abc"), Outcome::OptedOut)]
#[case(Some("false"), None, Outcome::OptedOut)]
#[tokio::test]
async fn decided_label_is_left_alone(
    #[case] label: Option<&str>,
    #[case] marker: Option<&str>,
    #[case] expected: Outcome,
) {
    let reconciler = setup(Some(deployment(label, marker)), CorrectionWrites::Combined).await;
    let before = stored_deployment(&reconciler).await;

    let outcome = reconciler.reconcile(&request()).await.expect("reconcile must succeed");

    assert_eq!(outcome, expected);
    assert_eq!(stored_deployment(&reconciler).await, before);
    assert_eq!(reconciler.store().update_calls().await, 0);
}

#[rstest]
#[case(CorrectionWrites::Combined)]
#[case(CorrectionWrites::Separate)]
#[tokio::test]
async fn second_reconcile_is_noop(#[case] correction_writes: CorrectionWrites) {
    let reconciler = setup(Some(deployment(None, Some("5"))), correction_writes).await;

    reconciler.reconcile(&request()).await.expect("first reconcile must succeed");
    let updates = reconciler.store().update_calls().await;
    let outcome = reconciler.reconcile(&request()).await.expect("second reconcile must succeed");

    assert_eq!(outcome, Outcome::AlreadyEnabled);
    assert_eq!(restart_marker(&stored_deployment(&reconciler).await), Some("6"));
    assert_eq!(reconciler.store().update_calls().await, updates);
}

#[tokio::test]
async fn malformed_marker_fails_before_any_write() {
    let reconciler = setup(Some(deployment(None, Some("abc"))), CorrectionWrites::Combined).await;

    let err = reconciler
        .reconcile(&request())
        .await
        .expect_err("marker is malformed");

    assert!(matches!(
        err,
        Error::TriggerRestart {
            source: restart::Error::MalformedRestartMarker { .. },
            ..
        }
    ));
    let stored = stored_deployment(&reconciler).await;
    assert_eq!(admission_label(&stored), None);
    assert_eq!(restart_marker(&stored), Some("abc"));
    assert_eq!(reconciler.store().update_calls().await, 0);
}

#[tokio::test]
async fn malformed_marker_after_label_write() {
    let reconciler = setup(Some(deployment(None, Some("abc"))), CorrectionWrites::Separate).await;

    let err = reconciler
        .reconcile(&request())
        .await
        .expect_err("marker is malformed");

    assert!(matches!(
        err,
        Error::TriggerRestart {
            source: restart::Error::MalformedRestartMarker { .. },
            ..
        }
    ));
    let stored = stored_deployment(&reconciler).await;
    assert_eq!(admission_label(&stored), Some("true"));
    assert_eq!(restart_marker(&stored), Some("abc"));
    assert_eq!(reconciler.store().update_calls().await, 1);
}

#[rstest]
#[case(CorrectionWrites::Combined)]
#[case(CorrectionWrites::Separate)]
#[tokio::test]
async fn missing_check_is_noop(#[case] correction_writes: CorrectionWrites) {
    let reconciler = setup(Some(deployment(None, None)), correction_writes).await;

    let outcome = reconciler
        .reconcile(&CheckRequest::new("checks", "other-check"))
        .await
        .expect("missing check is not an error");

    assert_eq!(outcome, Outcome::CheckNotFound);
    assert_eq!(admission_label(&stored_deployment(&reconciler).await), None);
    assert_eq!(reconciler.store().update_calls().await, 0);
    assert_eq!(
        reconciler.observer().events(),
        ["started checks/other-check", "check not found"]
    );
}

#[tokio::test]
async fn missing_workload_is_noop() {
    let reconciler = setup(None, CorrectionWrites::Combined).await;

    let outcome = reconciler
        .reconcile(&request())
        .await
        .expect("missing deployment is not an error");

    assert_eq!(outcome, Outcome::WorkloadNotFound);
    assert_eq!(reconciler.store().update_calls().await, 0);
    assert_eq!(
        reconciler.observer().events(),
        [
            "started checks/web-check",
            "check found with status",
            "missing Deployment shop/web"
        ]
    );
}

#[tokio::test]
async fn failing_check_lookup_is_surfaced() {
    let reconciler = setup(Some(deployment(None, None)), CorrectionWrites::Combined).await;
    reconciler.store().fail_gets::<DeploymentLabelCheck>().await;

    let err = reconciler
        .reconcile(&request())
        .await
        .expect_err("lookup fails");

    assert_eq!(err.category(), "GetCheck");
    assert_eq!(admission_label(&stored_deployment(&reconciler).await), None);
    assert_eq!(reconciler.store().update_calls().await, 0);
}

#[tokio::test]
async fn failing_workload_lookup_is_surfaced() {
    let reconciler = setup(Some(deployment(None, None)), CorrectionWrites::Combined).await;
    reconciler.store().fail_gets::<Deployment>().await;

    let err = reconciler
        .reconcile(&request())
        .await
        .expect_err("lookup fails");

    assert_eq!(err.category(), "GetWorkload");
    assert_eq!(reconciler.store().update_calls().await, 0);
}

#[rstest]
#[case(CorrectionWrites::Combined)]
#[case(CorrectionWrites::Separate)]
#[tokio::test]
async fn failing_label_write_never_restarts(#[case] correction_writes: CorrectionWrites) {
    let reconciler = setup(Some(deployment(None, Some("2"))), correction_writes).await;
    reconciler.store().fail_updates_after(0).await;

    let err = reconciler
        .reconcile(&request())
        .await
        .expect_err("label write fails");

    assert_eq!(err.category(), "UpdateWorkload");
    assert_eq!(reconciler.store().update_calls().await, 1);
    let stored = stored_deployment(&reconciler).await;
    assert_eq!(admission_label(&stored), None);
    assert_eq!(restart_marker(&stored), Some("2"));
}

#[tokio::test]
async fn failing_marker_write_leaves_label_without_restart() {
    let reconciler = setup(Some(deployment(None, Some("2"))), CorrectionWrites::Separate).await;
    reconciler.store().fail_updates_after(1).await;

    let err = reconciler
        .reconcile(&request())
        .await
        .expect_err("marker write fails");

    assert_eq!(err.category(), "PersistRestartMarker");
    let stored = stored_deployment(&reconciler).await;
    assert_eq!(admission_label(&stored), Some("true"));
    assert_eq!(restart_marker(&stored), Some("2"));

    let outcome = reconciler.reconcile(&request()).await.expect("reconcile must succeed");
    assert_eq!(outcome, Outcome::AlreadyEnabled);
}

#[tokio::test]
async fn observer_sees_every_branch_of_a_correction() {
    let reconciler = setup(Some(deployment(None, None)), CorrectionWrites::Separate).await;

    reconciler.reconcile(&request()).await.expect("reconcile must succeed");

    assert_eq!(
        reconciler.observer().events(),
        [
            "started checks/web-check",
            "check found with status",
            "found Deployment shop/web",
            "label unset",
            "label persisted",
            "restarted 1"
        ]
    );
}

#[tokio::test]
async fn observer_sees_failed_correction() {
    let reconciler = setup(Some(deployment(None, Some("abc"))), CorrectionWrites::Combined).await;

    reconciler
        .reconcile(&request())
        .await
        .expect_err("marker is malformed");

    let events = reconciler.observer().events();
    assert_eq!(events.last().map(String::as_str), Some("failed TriggerRestart"));
}

#[tokio::test]
async fn check_without_status_is_reconciled() {
    let store = InMemoryStore::new();
    let mut check: DeploymentLabelCheck =
        serde_yaml::from_str(CHECK).expect("check fixture must parse");
    check.status = None;
    store.insert(check).await.expect("check must be stored");
    store
        .insert(deployment(None, None))
        .await
        .expect("deployment must be stored");
    let reconciler = Reconciler::new(
        store,
        RecordingObserver::default(),
        CorrectionWrites::Combined,
    );

    let outcome = reconciler.reconcile(&request()).await.expect("reconcile must succeed");

    assert!(matches!(outcome, Outcome::Corrected { .. }));
    assert_eq!(reconciler.observer().events()[1], "check found without status");
}

#[tokio::test]
async fn check_with_cross_namespace_target() {
    let store = InMemoryStore::new();
    let check: DeploymentLabelCheck =
        serde_yaml::from_str(CHECK).expect("check fixture must parse");
    store.insert(check).await.expect("check must be stored");

    let mut other = deployment(None, None);
    other.metadata = ObjectMeta {
        name: Some("web".to_owned()),
        namespace: Some("checks".to_owned()),
        ..ObjectMeta::default()
    };
    store.insert(other).await.expect("deployment must be stored");
    let reconciler = Reconciler::new(
        store,
        RecordingObserver::default(),
        CorrectionWrites::Combined,
    );

    let outcome = reconciler.reconcile(&request()).await.expect("reconcile must succeed");

    assert_eq!(outcome, Outcome::WorkloadNotFound);
}
