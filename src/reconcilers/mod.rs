//! Reconciliation passes for the four Pulsar resource kinds
//!
//! Every pass follows the same order: mark the cluster target, confirm each
//! dependency exists on the broker (tenant, then namespace, then topic),
//! converge the resource itself, and close the pass by settling the phase.
//! Outcomes are written into the status and reported back to the hosting
//! controller as a [`HandlerError`] carrying the retry decision.

mod index;
mod namespace;
mod schema;
mod tenant;
mod topic;

pub use index::{TopicIndex, TopicLookup, TopicSelector};

use crate::admin::{PulsarAdmin, PulsarResult, ResourceClient};
use crate::conditions::{PulsarPhase, PulsarStatus, Reason, CONDITION_CLUSTER_TARGET_OK};
use crate::crd::{Describe, LifecyclePolicy, ResourceSpec};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Delay before retrying after a missing dependency or a failed sync
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Delay before retrying a failed delete
pub const DELETE_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Why a pass is being run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// First pass for an object after the process started
    Resume,
    /// The spec changed since the last successful pass
    Update,
    /// Periodic drift correction
    Timer,
    /// The object is being deleted
    Delete,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            EventKind::Resume => "resume",
            EventKind::Update => "update",
            EventKind::Timer => "timer",
            EventKind::Delete => "delete",
        };
        f.write_str(kind)
    }
}

/// Failure of a pass, with the retry decision attached
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    /// Run the pass again after `delay`
    #[error("{message} (retry in {}s)", delay.as_secs())]
    Temporary { message: String, delay: Duration },

    /// Do not retry until the spec changes
    #[error("{message}")]
    Permanent { message: String },
}

impl HandlerError {
    pub fn temporary(message: impl Into<String>, delay: Duration) -> Self {
        HandlerError::Temporary {
            message: message.into(),
            delay,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        HandlerError::Permanent {
            message: message.into(),
        }
    }
}

pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Retry bound of a kind; `None` retries forever
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `attempts` failures.
    pub fn allows(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }
}

/// Periodic re-run schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerPolicy {
    pub initial_delay: Duration,
    pub interval: Duration,
}

impl Default for TimerPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(60),
            interval: Duration::from_secs(600),
        }
    }
}

/// The four reconciled kinds and their scheduling configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Tenant,
    Namespace,
    Topic,
    Schema,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Tenant => "PulsarTenant",
            ResourceKind::Namespace => "PulsarNamespace",
            ResourceKind::Topic => "PulsarTopic",
            ResourceKind::Schema => "PulsarSchema",
        }
    }

    /// Tenants retry without bound, everything else gives up after 3 attempts.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            ResourceKind::Tenant => RetryPolicy { max_attempts: None },
            _ => RetryPolicy {
                max_attempts: Some(3),
            },
        }
    }

    pub fn timer_policy(&self) -> TimerPolicy {
        TimerPolicy::default()
    }
}

/// Shared state handed to every pass
#[derive(Clone)]
pub struct Context {
    pub admin: Arc<PulsarAdmin>,
    pub topics: Arc<dyn TopicLookup>,
}

/// A spec that can be reconciled against the broker
#[async_trait]
pub trait Reconcile: ResourceSpec + Describe + Send + Sync {
    const KIND: ResourceKind;

    /// Converge the broker towards the spec.
    async fn reconcile(
        &self,
        ctx: &Context,
        status: &mut PulsarStatus,
        generation: Option<i64>,
    ) -> HandlerResult;

    /// Remove the entity from the broker.
    async fn cleanup(&self, ctx: &Context, status: &mut PulsarStatus) -> HandlerResult;
}

/// Run one pass and merge the resulting status into `patch`.
///
/// Delete events only touch the broker when the lifecycle policy asks for
/// clean up.
pub async fn dispatch<S: Reconcile>(
    event: EventKind,
    spec: &S,
    ctx: &Context,
    status: &mut PulsarStatus,
    generation: Option<i64>,
    patch: &mut Map<String, Value>,
) -> HandlerResult {
    info!(
        kind = S::KIND.as_str(),
        resource = %spec.describe(),
        event = %event,
        "Handling event"
    );

    let result = match event {
        EventKind::Delete if spec.lifecycle_policy() == LifecyclePolicy::CleanUpAfterDeletion => {
            spec.cleanup(ctx, status).await
        }
        EventKind::Delete => Ok(()),
        _ => spec.reconcile(ctx, status, generation).await,
    };

    match serde_json::to_value(&*status) {
        Ok(value) => {
            patch.insert("status".to_string(), value);
        }
        Err(e) => warn!(error = %e, "Unable to render status"),
    }

    if let Err(e) = &result {
        warn!(kind = S::KIND.as_str(), resource = %spec.describe(), error = %e, "Pass failed");
    }
    result
}

/// Record that this process targets the resource.
fn mark_cluster_target(status: &mut PulsarStatus) {
    status.mark(CONDITION_CLUSTER_TARGET_OK);
}

/// Confirm a dependency exists on the broker before going further.
async fn require<C: ResourceClient>(
    client: C,
    model: &C::Model,
    status: &mut PulsarStatus,
    condition: &str,
    missing: Reason,
    what: &str,
) -> HandlerResult {
    match client.exists(model).await {
        Ok(true) => {
            status.mark(condition);
            Ok(())
        }
        Ok(false) => {
            status.fail(condition, missing);
            status.set_phase(PulsarPhase::Failed);
            Err(HandlerError::temporary(
                format!("{} not found in Pulsar", what),
                RETRY_DELAY,
            ))
        }
        Err(e) => {
            status.set_condition(
                condition,
                false,
                Some(Reason::UnknownError.as_str()),
                Some(&e.to_string()),
            );
            status.set_phase(PulsarPhase::Pending);
            Err(HandlerError::temporary(
                format!("Unable to check {}: {}", what, e),
                RETRY_DELAY,
            ))
        }
    }
}

/// Record the outcome of the own-convergence step.
fn converged(
    status: &mut PulsarStatus,
    condition: &str,
    what: &str,
    result: PulsarResult<()>,
) -> HandlerResult {
    match result {
        Ok(()) => {
            status.mark(condition);
            Ok(())
        }
        Err(e) => {
            status.set_condition(condition, false, None, Some(&e.to_string()));
            status.set_phase(PulsarPhase::Pending);
            Err(HandlerError::temporary(
                format!("Unable to sync {}: {}", what, e),
                RETRY_DELAY,
            ))
        }
    }
}

/// Delete the entity if it still exists.
///
/// A failed existence check is logged and the resource released anyway, so a
/// broken broker never blocks finalization.
async fn release<C: ResourceClient>(
    client: C,
    model: &C::Model,
    status: &mut PulsarStatus,
    condition: &str,
    what: &str,
) -> HandlerResult {
    match client.exists(model).await {
        Ok(false) => Ok(()),
        Ok(true) => match client.delete(model).await {
            Ok(()) => {
                info!(resource = %what, "Deleted from Pulsar");
                Ok(())
            }
            Err(e) => {
                status.set_condition(
                    condition,
                    false,
                    Some(Reason::DeleteFailed.as_str()),
                    Some(&e.to_string()),
                );
                status.set_phase(PulsarPhase::Pending);
                Err(HandlerError::temporary(
                    format!("Unable to delete {}: {}", what, e),
                    DELETE_RETRY_DELAY,
                ))
            }
        },
        Err(e) => {
            warn!(resource = %what, error = %e, "Unable to check existence, releasing resource anyway");
            Ok(())
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the reconciler tests.

    use super::*;
    use crate::admin::mock::MockTransport;
    use crate::admin::HttpMethod;
    use serde_json::json;

    pub const BASE: &str = "http://pulsar/admin/v2";

    pub fn context(mock: &Arc<MockTransport>) -> Context {
        context_with_index(mock, Arc::new(TopicIndex::new()))
    }

    pub fn context_with_index(mock: &Arc<MockTransport>, topics: Arc<TopicIndex>) -> Context {
        Context {
            admin: Arc::new(PulsarAdmin::new(mock.clone(), BASE)),
            topics,
        }
    }

    pub fn tenant_exists(mock: &MockTransport, tenant: &str) {
        mock.on_json(
            HttpMethod::Get,
            &format!("{}/tenants/{}", BASE, tenant),
            200,
            json!({"adminRoles": [], "allowedClusters": []}),
        );
    }

    pub fn namespace_exists(mock: &MockTransport, tenant: &str, namespace: &str) {
        mock.on_json(
            HttpMethod::Get,
            &format!("{}/namespaces/{}/{}", BASE, tenant, namespace),
            200,
            json!({}),
        );
    }

    pub fn runtime_config(mock: &MockTransport, topic_level_policies: bool) {
        mock.on_json(
            HttpMethod::Get,
            &format!("{}/brokers/configuration/runtime", BASE),
            200,
            json!({"topicLevelPoliciesEnabled": topic_level_policies.to_string()}),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::admin::mock::MockTransport;
    use crate::admin::HttpMethod;
    use crate::crd::TenantSpec;

    #[test]
    fn test_retry_policies() {
        assert!(ResourceKind::Tenant.retry_policy().allows(1000));
        for kind in [ResourceKind::Namespace, ResourceKind::Topic, ResourceKind::Schema] {
            let policy = kind.retry_policy();
            assert!(policy.allows(2));
            assert!(!policy.allows(3));
        }
    }

    #[test]
    fn test_timer_policy() {
        let timer = ResourceKind::Topic.timer_policy();
        assert_eq!(timer.initial_delay, Duration::from_secs(60));
        assert_eq!(timer.interval, Duration::from_secs(600));
    }

    #[test]
    fn test_handler_error_display() {
        let err = HandlerError::temporary("Tenant 'acme' not found in Pulsar", RETRY_DELAY);
        assert_eq!(err.to_string(), "Tenant 'acme' not found in Pulsar (retry in 5s)");
        assert_eq!(HandlerError::permanent("Incompatible schema").to_string(), "Incompatible schema");
    }

    fn tenant_spec(lifecycle: &str) -> TenantSpec {
        serde_json::from_value(serde_json::json!({
            "tenant": "acme",
            "lifecyclePolicy": lifecycle,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_writes_status_into_patch() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Put, &format!("{}/tenants/acme", BASE), 204, "")
            .on(HttpMethod::Post, &format!("{}/tenants/acme", BASE), 204, "");
        tenant_exists(&mock, "acme");

        let mut status = PulsarStatus::default();
        let mut patch = Map::new();
        dispatch(
            EventKind::Update,
            &tenant_spec("KeepAfterDeletion"),
            &context(&mock),
            &mut status,
            Some(2),
            &mut patch,
        )
        .await
        .unwrap();

        assert_eq!(patch["status"]["phase"], "Ready");
        assert_eq!(patch["status"]["observedGeneration"], 2);
    }

    #[tokio::test]
    async fn test_dispatch_delete_respects_lifecycle_policy() {
        let mock = Arc::new(MockTransport::new());
        tenant_exists(&mock, "acme");
        mock.on(HttpMethod::Delete, &format!("{}/tenants/acme", BASE), 204, "");

        let mut patch = Map::new();
        dispatch(
            EventKind::Delete,
            &tenant_spec("KeepAfterDeletion"),
            &context(&mock),
            &mut PulsarStatus::default(),
            None,
            &mut patch,
        )
        .await
        .unwrap();
        assert!(mock.requests().is_empty());

        dispatch(
            EventKind::Delete,
            &tenant_spec("CleanUpAfterDeletion"),
            &context(&mock),
            &mut PulsarStatus::default(),
            None,
            &mut patch,
        )
        .await
        .unwrap();
        assert_eq!(mock.calls(HttpMethod::Delete, &format!("{}/tenants/acme", BASE)), 1);
    }
}
