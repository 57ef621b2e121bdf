//! Tenant settings, namespace policies and topic policies
//!
//! These types serve two masters: they are part of the custom resource specs
//! (camelCase keys) and they parse what the broker returns from its GET
//! endpoints (Pulsar's own keys, accepted through serde aliases). What gets
//! written back is driven by the field metadata in the `SettingsModel` impls.

use crate::admin::{HttpMethod, SettingsField, SettingsModel};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Tenant configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TenantSettings {
    /// Roles allowed to administer the tenant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_roles: Option<BTreeSet<String>>,

    /// Clusters the tenant may use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_clusters: Option<BTreeSet<String>>,
}

impl SettingsModel for TenantSettings {
    fn fields(&self) -> Vec<SettingsField> {
        vec![
            SettingsField::new("admin_roles", &self.admin_roles),
            SettingsField::new("allowed_clusters", &self.allowed_clusters),
        ]
    }
}

/// Schema compatibility check applied on schema updates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaCompatibilityStrategy {
    Undefined,
    AlwaysIncompatible,
    AlwaysCompatible,
    Backward,
    Forward,
    Full,
    BackwardTransitive,
    ForwardTransitive,
    FullTransitive,
}

/// Kind of topic created on first use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AutoTopicType {
    Partitioned,
    NonPartitioned,
}

/// Namespace override of broker-level auto topic creation
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AutoTopicCreationOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_auto_topic_creation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_type: Option<AutoTopicType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_num_partitions: Option<i32>,
}

/// Message retention limits
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RetentionPolicies {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_time_in_minutes: Option<i32>,
    #[serde(
        default,
        rename = "retentionSizeInMB",
        skip_serializing_if = "Option::is_none"
    )]
    pub retention_size_in_mb: Option<i64>,
}

/// Namespace bundle layout, fixed at creation time
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BundlesData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundaries: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_bundles: Option<i32>,
}

/// Namespace policies
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NamespacePolicies {
    #[serde(default, alias = "schema_validation_enforced", skip_serializing_if = "Option::is_none")]
    pub schema_validation_enforced: Option<bool>,

    #[serde(default, alias = "schema_compatibility_strategy", skip_serializing_if = "Option::is_none")]
    pub schema_compatibility_strategy: Option<SchemaCompatibilityStrategy>,

    #[serde(default, alias = "is_allow_auto_update_schema", skip_serializing_if = "Option::is_none")]
    pub is_allow_auto_update_schema: Option<bool>,

    #[serde(default, alias = "max_consumers_per_topic", skip_serializing_if = "Option::is_none")]
    pub max_consumers_per_topic: Option<i32>,

    #[serde(default, alias = "max_producers_per_topic", skip_serializing_if = "Option::is_none")]
    pub max_producers_per_topic: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_topic_creation_override: Option<AutoTopicCreationOverride>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deduplication_enabled: Option<bool>,

    #[serde(default, alias = "replication_clusters", skip_serializing_if = "Option::is_none")]
    pub replication_clusters: Option<BTreeSet<String>>,

    #[serde(default, alias = "retention_policies", skip_serializing_if = "Option::is_none")]
    pub retention_policies: Option<RetentionPolicies>,

    #[serde(default, alias = "message_ttl_in_seconds", skip_serializing_if = "Option::is_none")]
    pub message_ttl_in_seconds: Option<i32>,

    #[serde(default, alias = "encryption_required", skip_serializing_if = "Option::is_none")]
    pub encryption_required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, String>>,

    /// Read back only; bundles cannot be changed through policies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundles: Option<BundlesData>,
}

impl SettingsModel for NamespacePolicies {
    fn fields(&self) -> Vec<SettingsField> {
        vec![
            SettingsField::new("schema_validation_enforced", &self.schema_validation_enforced)
                .alias("schema_validation_enforced"),
            SettingsField::new(
                "schema_compatibility_strategy",
                &self.schema_compatibility_strategy,
            )
            .alias("schema_compatibility_strategy")
            .method(HttpMethod::Put),
            SettingsField::new("is_allow_auto_update_schema", &self.is_allow_auto_update_schema)
                .alias("is_allow_auto_update_schema"),
            SettingsField::new("max_consumers_per_topic", &self.max_consumers_per_topic)
                .alias("max_consumers_per_topic"),
            SettingsField::new("max_producers_per_topic", &self.max_producers_per_topic)
                .alias("max_producers_per_topic"),
            SettingsField::new(
                "auto_topic_creation_override",
                &self.auto_topic_creation_override,
            )
            .path("/autoTopicCreation"),
            SettingsField::new("deduplication_enabled", &self.deduplication_enabled)
                .path("/deduplication"),
            SettingsField::new("replication_clusters", &self.replication_clusters)
                .alias("replication_clusters")
                .path("/replication"),
            SettingsField::new("retention_policies", &self.retention_policies)
                .alias("retention_policies")
                .path("/retention"),
            SettingsField::new("message_ttl_in_seconds", &self.message_ttl_in_seconds)
                .alias("message_ttl_in_seconds")
                .path("/messageTTL"),
            SettingsField::new("encryption_required", &self.encryption_required)
                .alias("encryption_required"),
            SettingsField::new("properties", &self.properties).method(HttpMethod::Put),
            SettingsField::new("bundles", &self.bundles).immutable(),
        ]
    }
}

/// What the broker removes once a topic is inactive
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum InactiveTopicDeleteMode {
    #[serde(rename = "delete_when_no_subscriptions")]
    DeleteWhenNoSubscriptions,
    #[serde(rename = "delete_when_subscriptions_caught_up")]
    DeleteWhenSubscriptionsCaughtUp,
}

/// Inactive topic cleanup
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InactiveTopicPolicies {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactive_topic_delete_mode: Option<InactiveTopicDeleteMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_inactive_duration_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_while_inactive: Option<bool>,
}

/// Topic level policies; only accepted by brokers with topic level policies enabled
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopicPolicies {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deduplication_enabled: Option<bool>,

    #[serde(default, alias = "retention_policies", skip_serializing_if = "Option::is_none")]
    pub retention_policies: Option<RetentionPolicies>,

    #[serde(default, alias = "inactive_topic_policies", skip_serializing_if = "Option::is_none")]
    pub inactive_topic_policies: Option<InactiveTopicPolicies>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_producers: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_consumers: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unacked_messages_on_consumer: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compaction_threshold: Option<i64>,
}

impl TopicPolicies {
    /// Whether any policy is declared at all.
    pub fn is_empty(&self) -> bool {
        self.full_replace_dict().is_empty()
    }
}

impl SettingsModel for TopicPolicies {
    fn fields(&self) -> Vec<SettingsField> {
        vec![
            SettingsField::new("deduplication_enabled", &self.deduplication_enabled),
            SettingsField::new("retention_policies", &self.retention_policies)
                .alias("retention_policies")
                .path("/retention"),
            SettingsField::new("inactive_topic_policies", &self.inactive_topic_policies)
                .alias("inactive_topic_policies")
                .path("/inactiveTopicPolicies"),
            SettingsField::new("max_producers", &self.max_producers),
            SettingsField::new("max_consumers", &self.max_consumers),
            SettingsField::new(
                "max_unacked_messages_on_consumer",
                &self.max_unacked_messages_on_consumer,
            ),
            SettingsField::new("compaction_threshold", &self.compaction_threshold),
        ]
    }
}
