//! Classification and correction of the admission enablement label on the pod
//! template of a Deployment.
use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;

use crate::kvp::{ADMISSION_DISABLED_VALUE, ADMISSION_ENABLED_LABEL_KEY, ADMISSION_ENABLED_VALUE};

/// What the pod template says about admission enablement.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum EnablementState {
    /// The label is present with the value `true`.
    Enabled,

    /// The label is present with the value `false`. This opt-out is honored.
    OptedOut,

    /// The label is absent or has any other value.
    Unset,
}

impl EnablementState {
    /// Returns true if the workload must be labeled and restarted.
    pub fn needs_correction(self) -> bool {
        self == Self::Unset
    }
}

/// Classifies the pod template labels. Values are compared exactly.
pub fn enablement_state(labels: Option<&BTreeMap<String, String>>) -> EnablementState {
    match labels
        .and_then(|labels| labels.get(ADMISSION_ENABLED_LABEL_KEY))
        .map(String::as_str)
    {
        Some(ADMISSION_ENABLED_VALUE) => EnablementState::Enabled,
        Some(ADMISSION_DISABLED_VALUE) => EnablementState::OptedOut,
        _ => EnablementState::Unset,
    }
}

/// The labels applied to every pod of the Deployment, if any are set.
pub fn pod_template_labels(deployment: &Deployment) -> Option<&BTreeMap<String, String>> {
    deployment
        .spec
        .as_ref()?
        .template
        .metadata
        .as_ref()?
        .labels
        .as_ref()
}

/// Sets the enablement label to `true`, creating the spec, the template
/// metadata and the label map along the way if they are missing.
pub fn enable(deployment: &mut Deployment) {
    deployment
        .spec
        .get_or_insert_with(Default::default)
        .template
        .metadata
        .get_or_insert_with(Default::default)
        .labels
        .get_or_insert_with(BTreeMap::new)
        .insert(
            ADMISSION_ENABLED_LABEL_KEY.to_owned(),
            ADMISSION_ENABLED_VALUE.to_owned(),
        );
}
