//! Controllers for the Pulsar admin operator
//!
//! One kube-runtime controller per custom resource kind, all driven by the
//! same generic [`PulsarController`]. The controllers own everything the
//! reconcilers leave to their host: cluster scoping, finalizers, event
//! classification, status persistence and scheduling.

mod pulsar;

pub use pulsar::PulsarController;

use crate::conditions::PulsarStatus;
use crate::crd::{
    PulsarNamespace, PulsarSchema, PulsarTenant, PulsarTopic, CLUSTER_ANNOTATION,
};
use crate::reconcilers::{
    EventKind, HandlerError, HandlerResult, Reconcile, ResourceKind, TopicIndex, TopicSelector,
};
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::time::Duration;

/// Requeue delay after a Kubernetes API failure
const KUBE_ERROR_REQUEUE: Duration = Duration::from_secs(30);

/// A custom resource reconciled by [`PulsarController`]
pub trait PulsarResource:
    Resource<DynamicType = (), Scope = k8s_openapi::NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    type Spec: Reconcile + Clone + 'static;

    fn spec(&self) -> &Self::Spec;

    fn status(&self) -> Option<&PulsarStatus>;

    /// Hook run on every observed event once its scope is known.
    fn observe(&self, _index: &TopicIndex, _scope: Scope) {}
}

macro_rules! pulsar_resource {
    ($kind:ty, $spec:ty) => {
        impl PulsarResource for $kind {
            type Spec = $spec;

            fn spec(&self) -> &$spec {
                &self.spec
            }

            fn status(&self) -> Option<&PulsarStatus> {
                self.status.as_ref()
            }
        }
    };
}

pulsar_resource!(PulsarTenant, crate::crd::TenantSpec);
pulsar_resource!(PulsarNamespace, crate::crd::NamespaceSpec);
pulsar_resource!(PulsarSchema, crate::crd::SchemaSpec);

impl PulsarResource for PulsarTopic {
    type Spec = crate::crd::TopicSpec;

    fn spec(&self) -> &crate::crd::TopicSpec {
        &self.spec
    }

    fn status(&self) -> Option<&PulsarStatus> {
        self.status.as_ref()
    }

    /// Keep the index schemas resolve their topic through up to date.
    ///
    /// Only live topics managed by this cluster are indexed.
    fn observe(&self, index: &TopicIndex, scope: Scope) {
        let owner = object_key(self);
        if scope == Scope::Managed && self.meta().deletion_timestamp.is_none() {
            index.upsert(&owner, &self.spec);
        } else {
            index.remove(&owner, &TopicSelector::from(&self.spec));
        }
    }
}

/// How this process relates to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Annotated for this cluster
    Managed,
    /// Not annotated yet but asks for this cluster in its spec
    Adopt,
    /// Belongs to another cluster, or to none
    Ignore,
}

/// Decide whether the resource is ours from its annotations and spec.
pub fn scope(
    annotations: &BTreeMap<String, String>,
    spec_cluster: Option<&str>,
    cluster_name: &str,
) -> Scope {
    match annotations.get(CLUSTER_ANNOTATION) {
        Some(target) if target == cluster_name => Scope::Managed,
        Some(_) => Scope::Ignore,
        None if spec_cluster == Some(cluster_name) => Scope::Adopt,
        None => Scope::Ignore,
    }
}

/// Finalizer owned by the operator instance of `cluster_name`
pub fn finalizer_name(cluster_name: &str) -> String {
    format!("{}.pulsar.streamline.io/finalizer", cluster_name)
}

/// Classify the pass about to run.
pub fn event_kind(
    deleting: bool,
    first_seen: bool,
    generation: Option<i64>,
    observed_generation: Option<i64>,
) -> EventKind {
    if deleting {
        EventKind::Delete
    } else if first_seen {
        EventKind::Resume
    } else if generation != observed_generation {
        EventKind::Update
    } else {
        EventKind::Timer
    }
}

/// Delay before the next pass, given this pass's outcome.
///
/// `attempts` counts consecutive failures including this one. Delete passes
/// retry until they succeed.
pub fn next_delay(
    kind: ResourceKind,
    event: EventKind,
    result: &HandlerResult,
    attempts: u32,
) -> Duration {
    let timer = kind.timer_policy();
    match result {
        Ok(()) if event == EventKind::Resume => timer.initial_delay,
        Ok(()) => timer.interval,
        Err(HandlerError::Temporary { delay, .. }) if retries_left(kind, event, attempts) => *delay,
        Err(_) => timer.interval,
    }
}

/// Whether a failed pass may still be retried on its own delay.
pub fn retries_left(kind: ResourceKind, event: EventKind, attempts: u32) -> bool {
    event == EventKind::Delete || kind.retry_policy().allows(attempts)
}

/// `namespace/name`
pub fn object_key<K: Resource>(obj: &K) -> String {
    format!(
        "{}/{}",
        obj.namespace().unwrap_or_else(|| "default".to_string()),
        obj.name_any()
    )
}

/// Error policy shared by all controllers
pub fn error_policy_backoff<K, C>(
    _obj: std::sync::Arc<K>,
    _error: &crate::error::OperatorError,
    _ctx: std::sync::Arc<C>,
) -> Action {
    Action::requeue(KUBE_ERROR_REQUEUE)
}
