//! Custom Resource Definitions for the Pulsar admin operator
//!
//! Defines the CRDs that the operator manages:
//! - PulsarTenant: a tenant and its admin roles / allowed clusters
//! - PulsarNamespace: a namespace, its policies and role permissions
//! - PulsarTopic: a (partitioned) topic, its policies and role permissions
//! - PulsarSchema: the schema registered for one topic

mod namespace;
mod policies;
mod schema;
mod tenant;
mod topic;

pub use namespace::{NamespaceSpec, PulsarNamespace};
pub use policies::{
    AutoTopicCreationOverride, AutoTopicType, BundlesData, InactiveTopicDeleteMode,
    InactiveTopicPolicies, NamespacePolicies, RetentionPolicies, SchemaCompatibilityStrategy,
    TenantSettings, TopicPolicies,
};
pub use schema::{PulsarSchema, SchemaSpec};
pub use tenant::{PulsarTenant, TenantSpec};
pub use topic::{persistence, PulsarTopic, TopicSpec};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// API group of all Pulsar custom resources
pub const API_GROUP: &str = "pulsar.streamline.io";

/// Annotation binding a resource to the Pulsar cluster that reconciles it
pub const CLUSTER_ANNOTATION: &str = "pulsar.streamline.io/cluster";

/// What happens to the Pulsar entity when the custom resource is deleted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum LifecyclePolicy {
    /// Delete the entity from Pulsar as well
    CleanUpAfterDeletion,
    /// Leave the entity in Pulsar
    #[default]
    KeepAfterDeletion,
}

/// Actions a role may be granted on a namespace or topic
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Produce,
    Consume,
    Functions,
    Sources,
    Sinks,
    Packages,
}

/// Role -> granted actions
pub type RolePermissions = BTreeMap<String, BTreeSet<Permission>>;

/// Fields every Pulsar resource spec carries
pub trait ResourceSpec {
    /// Cluster the resource should be adopted by when it carries no
    /// cluster annotation yet
    fn cluster_name(&self) -> Option<&str>;

    fn lifecycle_policy(&self) -> LifecyclePolicy;
}

/// Human readable identity for logs and messages
pub trait Describe {
    fn describe(&self) -> String;
}

fn default_true() -> bool {
    true
}

/// Schema for free-form JSON objects the API server must keep verbatim
fn free_form_object(_: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
    let mut schema = schemars::schema::SchemaObject {
        instance_type: Some(schemars::schema::InstanceType::Object.into()),
        ..Default::default()
    };
    schema.extensions.insert(
        "x-kubernetes-preserve-unknown-fields".to_string(),
        serde_json::Value::Bool(true),
    );
    schemars::schema::Schema::Object(schema)
}
