//! Pulsar Admin Operator
//!
//! A Kubernetes operator that keeps Pulsar tenants, namespaces, topics and
//! schemas in line with custom resources, through the Pulsar admin REST API.
//!
//! ## Custom Resources
//!
//! - `PulsarTenant`: Tenant with its admin roles and allowed clusters
//! - `PulsarNamespace`: Namespace policies and role permissions
//! - `PulsarTopic`: Persistent or non-persistent topic, optionally partitioned
//! - `PulsarSchema`: Schema registered on an existing topic
//!
//! Each instance manages a single Pulsar cluster and only touches resources
//! annotated with `pulsar.streamline.io/cluster` for that cluster.
//!
//! ## Example
//!
//! ```yaml
//! apiVersion: pulsar.streamline.io/v1alpha1
//! kind: PulsarTopic
//! metadata:
//!   name: orders-created
//! spec:
//!   clusterName: dev01
//!   tenant: acme
//!   namespace: orders
//!   topic: created
//!   partitions: 4
//!   policies:
//!     maxConsumers: 10
//! ```

pub mod admin;
pub mod conditions;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod reconcilers;

pub use admin::{PulsarAdmin, PulsarError};
pub use conditions::{PulsarCondition, PulsarPhase, PulsarStatus};
pub use controllers::PulsarController;
pub use crd::{
    LifecyclePolicy, NamespaceSpec, PulsarNamespace, PulsarSchema, PulsarTenant, PulsarTopic,
    SchemaSpec, TenantSpec, TopicSpec,
};
pub use error::{OperatorError, Result};
