//! PulsarSchema Custom Resource Definition

use super::{free_form_object, Describe, LifecyclePolicy, ResourceSpec};
use crate::conditions::PulsarStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// PulsarSchema is the Schema for the pulsarschemas API
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "pulsar.streamline.io",
    version = "v1alpha1",
    kind = "PulsarSchema",
    namespaced,
    status = "PulsarStatus",
    shortname = "pschema",
    printcolumn = r#"{"name":"Topic","type":"string","jsonPath":".spec.topic"}"#,
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSpec {
    pub tenant: String,
    pub namespace: String,
    pub topic: String,

    /// Schema type (AVRO, JSON, PROTOBUF, ...)
    #[serde(rename = "type", default = "default_schema_type")]
    pub schema_type: String,

    /// Schema definition document
    #[schemars(schema_with = "free_form_object")]
    pub schema: serde_json::Value,

    /// Properties attached to the schema version
    #[serde(default)]
    pub properties: Option<BTreeMap<String, String>>,

    /// Cluster that should adopt this resource
    #[serde(default)]
    pub cluster_name: Option<String>,

    #[serde(default)]
    pub lifecycle_policy: LifecyclePolicy,
}

fn default_schema_type() -> String {
    "AVRO".to_string()
}

impl ResourceSpec for SchemaSpec {
    fn cluster_name(&self) -> Option<&str> {
        self.cluster_name.as_deref()
    }

    fn lifecycle_policy(&self) -> LifecyclePolicy {
        self.lifecycle_policy
    }
}

impl Describe for SchemaSpec {
    fn describe(&self) -> String {
        format!("{}/{}/{}", self.tenant, self.namespace, self.topic)
    }
}
