//! Topic admin client

use super::error::{api_error, PulsarResult};
use super::permissions::{plan_permission_sync, topic_level_permissions};
use super::{HttpMethod, PulsarAdmin, PulsarError, ResourceClient, SettingsModel};
use crate::crd::{persistence, RolePermissions, TopicPolicies, TopicSpec};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Runtime configuration key gating topic level policies
const TOPIC_LEVEL_POLICIES_KEY: &str = "topicLevelPoliciesEnabled";

/// A topic, its policies and the role permissions it should grant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub tenant: String,
    pub namespace: String,
    pub name: String,
    pub persistent: bool,
    /// 0 for a non-partitioned topic
    pub partitions: i32,
    pub policies: TopicPolicies,
    pub role_permissions: RolePermissions,
}

impl Topic {
    pub fn full_name(&self) -> String {
        format!(
            "{}://{}/{}/{}",
            persistence(self.persistent),
            self.tenant,
            self.namespace,
            self.name
        )
    }

    fn is_partitioned(&self) -> bool {
        self.partitions > 0
    }
}

impl From<&TopicSpec> for Topic {
    fn from(spec: &TopicSpec) -> Self {
        Self {
            tenant: spec.tenant.clone(),
            namespace: spec.namespace.clone(),
            name: spec.topic.clone(),
            persistent: spec.persistent,
            partitions: spec.partitions,
            policies: spec.policies.clone().unwrap_or_default(),
            role_permissions: spec.role_permissions.clone().unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct PartitionedMetadata {
    partitions: i32,
}

pub struct TopicClient<'a> {
    admin: &'a PulsarAdmin,
}

impl<'a> TopicClient<'a> {
    pub(crate) fn new(admin: &'a PulsarAdmin) -> Self {
        Self { admin }
    }

    fn listing_url(&self, topic: &Topic) -> String {
        let url = self.admin.url(&format!(
            "/{}/{}/{}",
            persistence(topic.persistent),
            topic.tenant,
            topic.namespace
        ));
        if topic.is_partitioned() {
            format!("{}/partitioned", url)
        } else {
            url
        }
    }

    fn url(&self, topic: &Topic) -> String {
        self.admin.url(&format!(
            "/{}/{}/{}/{}",
            persistence(topic.persistent),
            topic.tenant,
            topic.namespace,
            topic.name
        ))
    }

    fn permissions_url(&self, topic: &Topic) -> String {
        format!("{}/permissions", self.url(topic))
    }

    /// Whether the broker accepts topic level policies.
    pub async fn topic_level_policies_enabled(&self) -> PulsarResult<bool> {
        let config = self.admin.runtime_config().await?;
        Ok(matches!(
            config.get(TOPIC_LEVEL_POLICIES_KEY),
            Some(Value::String(flag)) if flag == "true"
        ))
    }

    /// Role permissions granted on the topic itself, namespace grants excluded.
    pub async fn permissions(&self, topic: &Topic) -> PulsarResult<RolePermissions> {
        let namespace_url = self
            .admin
            .url(&format!("/namespaces/{}/{}/permissions", topic.tenant, topic.namespace));
        let namespace = self.admin.fetch_permissions(&namespace_url).await?;
        let effective = self
            .admin
            .fetch_permissions(&self.permissions_url(topic))
            .await?;
        Ok(topic_level_permissions(&namespace, &effective))
    }

    /// Make the topic level role permissions match `topic.role_permissions`.
    pub async fn sync_permissions(&self, topic: &Topic) -> PulsarResult<()> {
        let current = self.permissions(topic).await?;
        let plan = plan_permission_sync(&current, &topic.role_permissions);
        self.admin
            .apply_permission_plan(&self.permissions_url(topic), &plan, true)
            .await
    }

    /// Read back each declared policy from its own endpoint.
    async fn fetch_policies(&self, desired: &Topic) -> PulsarResult<TopicPolicies> {
        let base_url = self.url(desired);
        let mut current = Map::new();

        for (key, op) in desired.policies.patch_operations() {
            let res = self
                .admin
                .send(HttpMethod::Get, &op.url(&base_url), None)
                .await?;
            if !res.is_success() {
                return Err(api_error(&res));
            }
            if res.body.trim().is_empty() {
                continue;
            }
            match res.json::<Value>()? {
                Value::Null => {}
                value => {
                    current.insert(key, value);
                }
            }
        }

        serde_json::from_value(Value::Object(current))
            .map_err(|e| PulsarError::Parsing(e.to_string()))
    }
}

#[async_trait]
impl ResourceClient for TopicClient<'_> {
    type Model = Topic;

    /// Membership of the full topic name in the namespace topic listing.
    async fn exists(&self, desired: &Topic) -> PulsarResult<bool> {
        let res = self
            .admin
            .send(HttpMethod::Get, &self.listing_url(desired), None)
            .await?;
        if res.status != 200 {
            return Err(api_error(&res));
        }
        let topics: Vec<String> = res.json()?;
        Ok(topics.contains(&desired.full_name()))
    }

    async fn get(&self, desired: &Topic) -> PulsarResult<Topic> {
        if !self.exists(desired).await? {
            return Err(PulsarError::NotFound(format!("Topic {}", desired.full_name())));
        }

        let partitions = if desired.is_partitioned() {
            let url = format!("{}/partitions", self.url(desired));
            let res = self.admin.send(HttpMethod::Get, &url, None).await?;
            if res.status != 200 {
                return Err(api_error(&res));
            }
            res.json::<PartitionedMetadata>()?.partitions
        } else {
            0
        };

        Ok(Topic {
            partitions,
            policies: self.fetch_policies(desired).await?,
            role_permissions: RolePermissions::new(),
            ..desired.clone()
        })
    }

    /// A bare PUT, or a PUT of the partition count for partitioned topics.
    async fn create(&self, desired: &Topic) -> PulsarResult<Topic> {
        let (url, body) = if desired.is_partitioned() {
            (
                format!("{}/partitions", self.url(desired)),
                Some(Value::from(desired.partitions)),
            )
        } else {
            (self.url(desired), None)
        };

        self.admin
            .send_ok(HttpMethod::Put, &url, body.as_ref())
            .await?;
        self.get(desired).await
    }

    /// One write per declared policy, then a fresh read.
    async fn update(&self, desired: &Topic) -> PulsarResult<Topic> {
        self.admin
            .apply_patches(&self.url(desired), desired.policies.patch_operations())
            .await?;
        self.get(desired).await
    }

    async fn delete(&self, desired: &Topic) -> PulsarResult<()> {
        let url = if desired.is_partitioned() {
            format!("{}/partitions", self.url(desired))
        } else {
            self.url(desired)
        };

        let res = self.admin.send(HttpMethod::Delete, &url, None).await?;
        if res.status != 204 {
            return Err(api_error(&res));
        }
        Ok(())
    }
}
