//! Tenant admin client

use super::error::{api_error, api_error_or_not_found, PulsarResult};
use super::{HttpMethod, PulsarAdmin, ResourceClient, SettingsModel};
use crate::crd::{TenantSettings, TenantSpec};
use async_trait::async_trait;

/// A tenant and its settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    pub name: String,
    pub settings: TenantSettings,
}

impl Tenant {
    /// Identity only, for existence checks.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: TenantSettings::default(),
        }
    }
}

impl From<&TenantSpec> for Tenant {
    fn from(spec: &TenantSpec) -> Self {
        Self {
            name: spec.tenant.clone(),
            settings: spec.settings.clone().unwrap_or_default(),
        }
    }
}

pub struct TenantClient<'a> {
    admin: &'a PulsarAdmin,
}

impl<'a> TenantClient<'a> {
    pub(crate) fn new(admin: &'a PulsarAdmin) -> Self {
        Self { admin }
    }

    fn url(&self, tenant: &Tenant) -> String {
        self.admin.url(&format!("/tenants/{}", tenant.name))
    }

    fn body(tenant: &Tenant) -> serde_json::Value {
        serde_json::Value::Object(tenant.settings.full_replace_dict())
    }
}

#[async_trait]
impl ResourceClient for TenantClient<'_> {
    type Model = Tenant;

    async fn get(&self, desired: &Tenant) -> PulsarResult<Tenant> {
        let res = self
            .admin
            .send(HttpMethod::Get, &self.url(desired), None)
            .await?;
        if res.status != 200 {
            return Err(api_error_or_not_found(&res, &format!("Tenant {}", desired.name)));
        }

        Ok(Tenant {
            name: desired.name.clone(),
            settings: res.json()?,
        })
    }

    async fn create(&self, desired: &Tenant) -> PulsarResult<Tenant> {
        self.admin
            .send_ok(HttpMethod::Put, &self.url(desired), Some(&Self::body(desired)))
            .await?;
        self.get(desired).await
    }

    /// Full replace of the tenant settings.
    async fn update(&self, desired: &Tenant) -> PulsarResult<Tenant> {
        self.admin
            .send_ok(HttpMethod::Post, &self.url(desired), Some(&Self::body(desired)))
            .await?;
        self.get(desired).await
    }

    async fn delete(&self, desired: &Tenant) -> PulsarResult<()> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::mock::MockTransport;
    use crate::admin::PulsarError;
    use serde_json::json;
    use std::sync::Arc;

    const BASE: &str = "http://pulsar/admin/v2";
    const URL: &str = "http://pulsar/admin/v2/tenants/acme";

    fn desired() -> Tenant {
        Tenant {
            name: "acme".to_string(),
            settings: TenantSettings {
                admin_roles: Some(["admin".to_string()].into_iter().collect()),
                allowed_clusters: Some(["dev01".to_string()].into_iter().collect()),
            },
        }
    }

    fn admin(mock: &Arc<MockTransport>) -> PulsarAdmin {
        PulsarAdmin::new(mock.clone(), BASE)
    }

    #[tokio::test]
    async fn test_exists() {
        let mock = Arc::new(MockTransport::new());
        let admin = admin(&mock);
        assert!(!admin.tenants().exists(&desired()).await.unwrap());

        mock.on_json(HttpMethod::Get, URL, 200, json!({"adminRoles": [], "allowedClusters": []}));
        assert!(admin.tenants().exists(&desired()).await.unwrap());
    }

    #[tokio::test]
    async fn test_exists_propagates_other_errors() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Get, URL, 500, "");
        let err = admin(&mock).tenants().exists(&desired()).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Put, URL, 204, "").on_json(
            HttpMethod::Get,
            URL,
            200,
            json!({"adminRoles": ["admin"], "allowedClusters": ["dev01"]}),
        );

        let created = admin(&mock).tenants().create(&desired()).await.unwrap();
        assert_eq!(created, desired());

        let put = &mock.requests()[0];
        assert_eq!(put.method, HttpMethod::Put);
        assert_eq!(
            put.body,
            Some(json!({"adminRoles": ["admin"], "allowedClusters": ["dev01"]}))
        );
    }

    #[tokio::test]
    async fn test_update_is_full_replace_post() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Post, URL, 204, "")
            .on_json(HttpMethod::Get, URL, 200, json!({"adminRoles": ["admin"]}));

        let tenant = Tenant {
            settings: TenantSettings {
                admin_roles: Some(["admin".to_string()].into_iter().collect()),
                allowed_clusters: None,
            },
            ..desired()
        };
        admin(&mock).tenants().update(&tenant).await.unwrap();
        assert_eq!(mock.requests()[0].body, Some(json!({"adminRoles": ["admin"]})));
    }

    #[tokio::test]
    async fn test_create_failure_message() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Put, URL, 409, r#"{"reason":"Tenant already exists"}"#);
        let err = admin(&mock).tenants().create(&desired()).await.unwrap_err();
        assert_eq!(
            err,
            PulsarError::Api {
                status: 409,
                message: "Tenant already exists".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_delete_requires_204() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Delete, URL, 200, "");
        assert!(admin(&mock).tenants().delete(&desired()).await.is_err());

        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Delete, URL, 204, "");
        admin(&mock).tenants().delete(&desired()).await.unwrap();
    }
}
