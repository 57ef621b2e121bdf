//! Client for the Pulsar admin REST API
//!
//! [`PulsarAdmin`] is built once at startup around a [`Transport`] and handed
//! to every reconciliation pass. Each entity kind gets a borrowed client
//! implementing [`ResourceClient`].

mod cache;
mod error;
mod namespace;
mod permissions;
mod schema;
mod settings;
mod tenant;
mod topic;
mod transport;

pub use cache::RuntimeConfigCache;
pub use error::{PulsarError, PulsarResult};
pub use namespace::{Namespace, NamespaceClient};
pub use permissions::{plan_permission_sync, topic_level_permissions, PermissionPlan};
pub use schema::{Schema, SchemaClient};
pub use settings::{camelize, PatchOperation, SettingsField, SettingsModel};
pub use tenant::{Tenant, TenantClient};
pub use topic::{Topic, TopicClient};
pub use transport::{
    HttpMethod, HttpTransport, HttpTransportConfig, Transport, TransportResponse,
    DEFAULT_TOKEN_PATH,
};

#[cfg(test)]
pub(crate) use transport::mock;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// How long broker runtime configuration is trusted
pub const RUNTIME_CONFIG_TTL: Duration = Duration::from_secs(60);

/// exists/get/create/update/delete against one entity kind.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    type Model: Send + Sync;

    /// Whether the entity exists on the broker.
    async fn exists(&self, desired: &Self::Model) -> PulsarResult<bool> {
        match self.get(desired).await {
            Ok(_) => Ok(true),
            Err(PulsarError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Current remote state. Fails with [`PulsarError::NotFound`] on a 404.
    async fn get(&self, desired: &Self::Model) -> PulsarResult<Self::Model>;

    async fn create(&self, desired: &Self::Model) -> PulsarResult<Self::Model>;

    async fn update(&self, desired: &Self::Model) -> PulsarResult<Self::Model>;

    async fn delete(&self, desired: &Self::Model) -> PulsarResult<()>;
}

/// Handle on one broker's admin API
pub struct PulsarAdmin {
    transport: Arc<dyn Transport>,
    base_url: String,
    runtime_config: RuntimeConfigCache,
}

impl PulsarAdmin {
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>) -> Self {
        Self::with_cache_ttl(transport, base_url, RUNTIME_CONFIG_TTL)
    }

    pub fn with_cache_ttl(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            runtime_config: RuntimeConfigCache::new(ttl),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tenants(&self) -> TenantClient<'_> {
        TenantClient::new(self)
    }

    pub fn namespaces(&self) -> NamespaceClient<'_> {
        NamespaceClient::new(self)
    }

    pub fn topics(&self) -> TopicClient<'_> {
        TopicClient::new(self)
    }

    pub fn schemas(&self) -> SchemaClient<'_> {
        SchemaClient::new(self)
    }

    /// Broker runtime configuration, served from cache while fresh.
    pub async fn runtime_config(&self) -> PulsarResult<Arc<serde_json::Map<String, serde_json::Value>>> {
        self.runtime_config
            .get_or_fetch(|| async {
                let url = self.url("/brokers/configuration/runtime");
                let res = self.send(HttpMethod::Get, &url, None).await?;
                if res.status != 200 {
                    return Err(error::api_error(&res));
                }
                match res.json::<serde_json::Value>()? {
                    serde_json::Value::Object(config) => Ok(config),
                    other => Err(PulsarError::Parsing(format!(
                        "Expected runtime configuration object, got {}",
                        other
                    ))),
                }
            })
            .await
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> PulsarResult<TransportResponse> {
        self.transport.send(method, url, body).await
    }

    /// Send and require a 200-204 answer.
    pub(crate) async fn send_ok(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> PulsarResult<TransportResponse> {
        let res = self.send(method, url, body).await?;
        if res.is_success() {
            Ok(res)
        } else {
            Err(error::api_error(&res))
        }
    }

    /// Apply single-field writes in key order, stopping at the first failure.
    pub(crate) async fn apply_patches(
        &self,
        base_url: &str,
        operations: impl IntoIterator<Item = (String, PatchOperation)>,
    ) -> PulsarResult<()> {
        for (field, op) in operations {
            tracing::debug!(field = %field, method = %op.method, sub_path = %op.sub_path, "Applying patch operation");
            self.send_ok(op.method, &op.url(base_url), Some(&op.value))
                .await?;
        }
        Ok(())
    }
}
