//! PulsarTenant Custom Resource Definition

use super::{Describe, LifecyclePolicy, ResourceSpec, TenantSettings};
use crate::conditions::PulsarStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// PulsarTenant is the Schema for the pulsartenants API
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "pulsar.streamline.io",
    version = "v1alpha1",
    kind = "PulsarTenant",
    namespaced,
    status = "PulsarStatus",
    shortname = "ptenant",
    printcolumn = r#"{"name":"Tenant","type":"string","jsonPath":".spec.tenant"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TenantSpec {
    /// Tenant name in Pulsar
    pub tenant: String,

    /// Admin roles and allowed clusters
    #[serde(default)]
    pub settings: Option<TenantSettings>,

    /// Cluster that should adopt this resource
    #[serde(default)]
    pub cluster_name: Option<String>,

    #[serde(default)]
    pub lifecycle_policy: LifecyclePolicy,
}

impl ResourceSpec for TenantSpec {
    fn cluster_name(&self) -> Option<&str> {
        self.cluster_name.as_deref()
    }

    fn lifecycle_policy(&self) -> LifecyclePolicy {
        self.lifecycle_policy
    }
}

impl Describe for TenantSpec {
    fn describe(&self) -> String {
        self.tenant.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_spec_parsing() {
        let json = r#"{
            "tenant": "acme",
            "settings": {"adminRoles": ["admin"], "allowedClusters": ["dev01"]},
            "lifecyclePolicy": "CleanUpAfterDeletion"
        }"#;
        let spec: TenantSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.tenant, "acme");
        assert_eq!(spec.lifecycle_policy, LifecyclePolicy::CleanUpAfterDeletion);
        let settings = spec.settings.unwrap();
        assert!(settings.admin_roles.unwrap().contains("admin"));
    }

    #[test]
    fn test_tenant_spec_defaults() {
        let spec: TenantSpec = serde_json::from_str(r#"{"tenant": "acme"}"#).unwrap();
        assert!(spec.settings.is_none());
        assert!(spec.cluster_name.is_none());
        assert_eq!(spec.lifecycle_policy, LifecyclePolicy::KeepAfterDeletion);
    }
}
