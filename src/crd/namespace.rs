//! PulsarNamespace Custom Resource Definition

use super::{Describe, LifecyclePolicy, NamespacePolicies, ResourceSpec, RolePermissions};
use crate::conditions::PulsarStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// PulsarNamespace is the Schema for the pulsarnamespaces API
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "pulsar.streamline.io",
    version = "v1alpha1",
    kind = "PulsarNamespace",
    namespaced,
    status = "PulsarStatus",
    shortname = "pns",
    printcolumn = r#"{"name":"Tenant","type":"string","jsonPath":".spec.tenant"}"#,
    printcolumn = r#"{"name":"Namespace","type":"string","jsonPath":".spec.namespace"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSpec {
    /// Owning tenant
    pub tenant: String,

    /// Namespace name within the tenant
    pub namespace: String,

    /// Namespace policies
    #[serde(default)]
    pub policies: Option<NamespacePolicies>,

    /// Permissions granted per role on the whole namespace
    #[serde(default)]
    pub role_permissions: Option<RolePermissions>,

    /// Cluster that should adopt this resource
    #[serde(default)]
    pub cluster_name: Option<String>,

    #[serde(default)]
    pub lifecycle_policy: LifecyclePolicy,
}

impl ResourceSpec for NamespaceSpec {
    fn cluster_name(&self) -> Option<&str> {
        self.cluster_name.as_deref()
    }

    fn lifecycle_policy(&self) -> LifecyclePolicy {
        self.lifecycle_policy
    }
}

impl Describe for NamespaceSpec {
    fn describe(&self) -> String {
        format!("{}/{}", self.tenant, self.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Permission, SchemaCompatibilityStrategy};

    #[test]
    fn test_namespace_spec_parsing() {
        let json = r#"{
            "tenant": "acme",
            "namespace": "orders",
            "policies": {
                "schemaValidationEnforced": true,
                "schemaCompatibilityStrategy": "FORWARD_TRANSITIVE",
                "maxConsumersPerTopic": 10
            },
            "rolePermissions": {"billing": ["consume", "produce"]}
        }"#;
        let spec: NamespaceSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.describe(), "acme/orders");

        let policies = spec.policies.unwrap();
        assert_eq!(policies.schema_validation_enforced, Some(true));
        assert_eq!(
            policies.schema_compatibility_strategy,
            Some(SchemaCompatibilityStrategy::ForwardTransitive)
        );
        assert_eq!(policies.max_consumers_per_topic, Some(10));

        let perms = spec.role_permissions.unwrap();
        assert!(perms["billing"].contains(&Permission::Consume));
        assert!(perms["billing"].contains(&Permission::Produce));
    }
}
