//! The `DeploymentLabelCheck` custom resource.
use std::{borrow::Cow, path::Path};

use kube::CustomResource;
use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::yaml::{self, SerializeOptions, YamlSchema};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to write CRD YAML schema to file"))]
    WriteToFile { source: yaml::Error },

    #[snafu(display("failed to write CRD YAML schema to stdout"))]
    WriteToStdout { source: yaml::Error },

    #[snafu(display("failed to generate CRD YAML schema"))]
    GenerateSchema { source: yaml::Error },
}

/// Names a Deployment whose pod template must carry the admission enablement
/// label.
///
/// The operator only reads this resource. When the referenced Deployment lacks
/// the label, it is added and the Deployment is rolled.
#[derive(Clone, CustomResource, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "demo.demo.jonlimpw.io",
    version = "v1",
    kind = "DeploymentLabelCheck",
    plural = "deploymentlabelchecks",
    shortname = "dlc",
    status = "DeploymentLabelCheckStatus",
    namespaced,
    crates(
        kube_core = "kube::core",
        k8s_openapi = "k8s_openapi",
        schemars = "schemars"
    )
)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentLabelCheckSpec {
    /// Namespace of the Deployment to inspect.
    pub target_namespace: String,

    /// Name of the Deployment to inspect.
    pub target_name: String,
}

/// Free-form observed status. It is reported but never used for decisions.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DeploymentLabelCheckStatus(pub serde_json::Map<String, serde_json::Value>);

impl JsonSchema for DeploymentLabelCheckStatus {
    fn schema_name() -> Cow<'static, str> {
        "DeploymentLabelCheckStatus".into()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        raw_object_schema(generator)
    }
}

/// Schema for an object whose fields are not validated by the API server.
pub fn raw_object_schema(_: &mut SchemaGenerator) -> Schema {
    json_schema!({
        "type": "object",
        "x-kubernetes-preserve-unknown-fields": true,
    })
}

/// Provides YAML schema generation and output capabilities for Kubernetes custom resources.
///
/// All output is an explicit document with leading dashes (`---`).
pub trait CustomResourceExt: kube::CustomResourceExt {
    /// Generates the YAML schema of a `CustomResourceDefinition` and writes it to the specified
    /// file at `path`.
    fn write_yaml_schema<P: AsRef<Path>>(path: P) -> Result<()> {
        Self::crd()
            .write_yaml_schema(path, SerializeOptions::default())
            .context(WriteToFileSnafu)
    }

    /// Generates the YAML schema of a `CustomResourceDefinition` and prints it to [stdout].
    ///
    /// [stdout]: std::io::stdout
    fn print_yaml_schema() -> Result<()> {
        Self::crd()
            .print_yaml_schema(SerializeOptions::default())
            .context(WriteToStdoutSnafu)
    }

    /// Generates the YAML schema of a `CustomResourceDefinition` and returns it as a [`String`].
    fn yaml_schema() -> Result<String> {
        Self::crd()
            .generate_yaml_schema(SerializeOptions::default())
            .context(GenerateSchemaSnafu)
    }
}

impl<T> CustomResourceExt for T where T: kube::CustomResourceExt {}
