//! Namespace admin client

use super::error::{api_error, api_error_or_not_found, PulsarResult};
use super::permissions::plan_permission_sync;
use super::{HttpMethod, PulsarAdmin, ResourceClient, SettingsModel};
use crate::crd::{NamespacePolicies, NamespaceSpec, RolePermissions};
use async_trait::async_trait;

/// A namespace, its policies and the role permissions it should grant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub tenant: String,
    pub name: String,
    pub policies: NamespacePolicies,
    pub role_permissions: RolePermissions,
}

impl Namespace {
    /// Identity only, for existence checks.
    pub fn named(tenant: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            name: name.into(),
            policies: NamespacePolicies::default(),
            role_permissions: RolePermissions::new(),
        }
    }
}

impl From<&NamespaceSpec> for Namespace {
    fn from(spec: &NamespaceSpec) -> Self {
        Self {
            tenant: spec.tenant.clone(),
            name: spec.namespace.clone(),
            policies: spec.policies.clone().unwrap_or_default(),
            role_permissions: spec.role_permissions.clone().unwrap_or_default(),
        }
    }
}

pub struct NamespaceClient<'a> {
    admin: &'a PulsarAdmin,
}

impl<'a> NamespaceClient<'a> {
    pub(crate) fn new(admin: &'a PulsarAdmin) -> Self {
        Self { admin }
    }

    fn url(&self, namespace: &Namespace) -> String {
        self.admin
            .url(&format!("/namespaces/{}/{}", namespace.tenant, namespace.name))
    }

    fn permissions_url(&self, namespace: &Namespace) -> String {
        format!("{}/permissions", self.url(namespace))
    }

    /// Role permissions currently granted on the namespace.
    pub async fn permissions(&self, namespace: &Namespace) -> PulsarResult<RolePermissions> {
        self.admin
            .fetch_permissions(&self.permissions_url(namespace))
            .await
    }

    /// Make the granted role permissions match `namespace.role_permissions`.
    pub async fn sync_permissions(&self, namespace: &Namespace) -> PulsarResult<()> {
        let current = self.permissions(namespace).await?;
        let plan = plan_permission_sync(&current, &namespace.role_permissions);
        self.admin
            .apply_permission_plan(&self.permissions_url(namespace), &plan, false)
            .await
    }
}

#[async_trait]
impl ResourceClient for NamespaceClient<'_> {
    type Model = Namespace;

    /// Policies as reported by the broker. Permissions are read separately
    /// through [`NamespaceClient::permissions`].
    async fn get(&self, desired: &Namespace) -> PulsarResult<Namespace> {
        let res = self
            .admin
            .send(HttpMethod::Get, &self.url(desired), None)
            .await?;
        if res.status != 200 {
            return Err(api_error_or_not_found(
                &res,
                &format!("Namespace {}/{}", desired.tenant, desired.name),
            ));
        }

        Ok(Namespace {
            policies: res.json()?,
            role_permissions: RolePermissions::new(),
            ..Namespace::named(&desired.tenant, &desired.name)
        })
    }

    async fn create(&self, desired: &Namespace) -> PulsarResult<Namespace> {
        let body = serde_json::Value::Object(desired.policies.full_replace_dict());
        self.admin
            .send_ok(HttpMethod::Put, &self.url(desired), Some(&body))
            .await?;
        self.get(desired).await
    }

    /// One write per declared policy, then a fresh read.
    async fn update(&self, desired: &Namespace) -> PulsarResult<Namespace> {
        self.admin
            .apply_patches(&self.url(desired), desired.policies.patch_operations())
            .await?;
        self.get(desired).await
    }

    async fn delete(&self, desired: &Namespace) -> PulsarResult<()> {
        let res = self
            .admin
            .send(HttpMethod::Delete, &self.url(desired), None)
            .await?;
        if res.status != 204 {
            return Err(api_error(&res));
        }
        Ok(())
    }
}
