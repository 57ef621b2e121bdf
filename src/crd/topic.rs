//! PulsarTopic Custom Resource Definition
//!
//! Defines the specification for creating and managing topics within a Pulsar namespace.

use super::{default_true, Describe, LifecyclePolicy, ResourceSpec, RolePermissions, TopicPolicies};
use crate::conditions::PulsarStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// PulsarTopic is the Schema for the pulsartopics API
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "pulsar.streamline.io",
    version = "v1alpha1",
    kind = "PulsarTopic",
    namespaced,
    status = "PulsarStatus",
    shortname = "ptopic",
    printcolumn = r#"{"name":"Tenant","type":"string","jsonPath":".spec.tenant"}"#,
    printcolumn = r#"{"name":"Namespace","type":"string","jsonPath":".spec.namespace"}"#,
    printcolumn = r#"{"name":"Topic","type":"string","jsonPath":".spec.topic"}"#,
    printcolumn = r#"{"name":"Partitions","type":"integer","jsonPath":".spec.partitions"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TopicSpec {
    /// Owning tenant
    pub tenant: String,

    /// Owning namespace
    pub namespace: String,

    /// Topic name within the namespace
    pub topic: String,

    /// Persistent or non-persistent topic
    #[serde(default = "default_true")]
    pub persistent: bool,

    /// Number of partitions; 0 creates a non-partitioned topic
    #[serde(default)]
    pub partitions: i32,

    /// Topic level policies
    #[serde(default)]
    pub policies: Option<TopicPolicies>,

    /// Permissions granted per role on top of the namespace permissions
    #[serde(default)]
    pub role_permissions: Option<RolePermissions>,

    /// Cluster that should adopt this resource
    #[serde(default)]
    pub cluster_name: Option<String>,

    #[serde(default)]
    pub lifecycle_policy: LifecyclePolicy,
}

impl TopicSpec {
    /// `persistent://tenant/namespace/topic` or the non-persistent variant
    pub fn full_name(&self) -> String {
        format!(
            "{}://{}/{}/{}",
            persistence(self.persistent),
            self.tenant,
            self.namespace,
            self.topic
        )
    }

    /// Whether any topic level policy is declared
    pub fn declares_policies(&self) -> bool {
        self.policies.as_ref().is_some_and(|p| !p.is_empty())
    }
}

/// URL and topic-name prefix for the persistence mode
pub fn persistence(persistent: bool) -> &'static str {
    if persistent {
        "persistent"
    } else {
        "non-persistent"
    }
}

impl ResourceSpec for TopicSpec {
    fn cluster_name(&self) -> Option<&str> {
        self.cluster_name.as_deref()
    }

    fn lifecycle_policy(&self) -> LifecyclePolicy {
        self.lifecycle_policy
    }
}

impl Describe for TopicSpec {
    fn describe(&self) -> String {
        self.full_name()
    }
}
