//! PulsarSchema reconciliation
//!
//! The topic a schema belongs to is resolved through the topic index, since
//! only the PulsarTopic resource knows its persistence and partition count.

use super::{
    mark_cluster_target, release, require, Context, HandlerError, HandlerResult, Reconcile,
    ResourceKind, TopicSelector, RETRY_DELAY,
};
use crate::admin::{Namespace, PulsarError, ResourceClient, Schema, Tenant, Topic};
use crate::conditions::{
    PulsarPhase, PulsarStatus, Reason, CONDITION_NAMESPACE_READY, CONDITION_SCHEMA_IN_SYNC,
    CONDITION_TENANT_READY, CONDITION_TOPIC_READY,
};
use crate::crd::SchemaSpec;
use async_trait::async_trait;

#[async_trait]
impl Reconcile for SchemaSpec {
    const KIND: ResourceKind = ResourceKind::Schema;

    async fn reconcile(
        &self,
        ctx: &Context,
        status: &mut PulsarStatus,
        generation: Option<i64>,
    ) -> HandlerResult {
        mark_cluster_target(status);

        require(
            ctx.admin.tenants(),
            &Tenant::named(&self.tenant),
            status,
            CONDITION_TENANT_READY,
            Reason::TenantNotFound,
            &format!("Tenant '{}'", self.tenant),
        )
        .await?;
        require(
            ctx.admin.namespaces(),
            &Namespace::named(&self.tenant, &self.namespace),
            status,
            CONDITION_NAMESPACE_READY,
            Reason::NamespaceNotFound,
            &format!("Namespace '{}'", self.namespace),
        )
        .await?;

        let topic_name = self.describe_topic();
        let Some(topic_spec) = ctx.topics.lookup(&TopicSelector::from(self)) else {
            status.fail(CONDITION_TOPIC_READY, Reason::TopicNotFound);
            status.set_phase(PulsarPhase::Failed);
            return Err(HandlerError::temporary(
                format!("Topic '{}' not found in cluster", topic_name),
                RETRY_DELAY,
            ));
        };
        require(
            ctx.admin.topics(),
            &Topic::from(&topic_spec),
            status,
            CONDITION_TOPIC_READY,
            Reason::TopicNotFound,
            &format!("Topic '{}'", topic_name),
        )
        .await?;

        match ctx.admin.schemas().update(&Schema::from(self)).await {
            Ok(registered) => {
                tracing::debug!(topic = %topic_name, version = ?registered.version, "Schema registered");
                status.mark(CONDITION_SCHEMA_IN_SYNC);
            }
            Err(PulsarError::Incompatible) => {
                status.fail(CONDITION_SCHEMA_IN_SYNC, Reason::IncompatibleSchema);
                status.set_phase(PulsarPhase::Failed);
                return Err(HandlerError::permanent(Reason::IncompatibleSchema.message()));
            }
            Err(PulsarError::Parsing(e)) => {
                let message = format!("{}: {}", Reason::ResponseParsingError.message(), e);
                status.set_condition(
                    CONDITION_SCHEMA_IN_SYNC,
                    false,
                    Some(Reason::ResponseParsingError.as_str()),
                    Some(&message),
                );
                status.set_phase(PulsarPhase::Failed);
                return Err(HandlerError::permanent(message));
            }
            Err(e) => {
                status.set_condition(
                    CONDITION_SCHEMA_IN_SYNC,
                    false,
                    Some(Reason::UnknownError.as_str()),
                    Some(&e.to_string()),
                );
                status.set_phase(PulsarPhase::Pending);
                return Err(HandlerError::temporary(
                    format!("Unable to register schema for '{}': {}", topic_name, e),
                    RETRY_DELAY,
                ));
            }
        }

        status.settle(generation);
        Ok(())
    }

    async fn cleanup(&self, ctx: &Context, status: &mut PulsarStatus) -> HandlerResult {
        let what = format!("schema of '{}'", self.describe_topic());
        release(
            ctx.admin.schemas(),
            &Schema::from(self),
            status,
            CONDITION_SCHEMA_IN_SYNC,
            &what,
        )
        .await
    }
}

impl SchemaSpec {
    fn describe_topic(&self) -> String {
        format!("{}/{}/{}", self.tenant, self.namespace, self.topic)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::TopicIndex;
    use super::*;
    use crate::admin::mock::MockTransport;
    use crate::admin::HttpMethod;
    use crate::crd::TopicSpec;
    use serde_json::json;
    use std::sync::Arc;

    const SCHEMA_URL: &str = "http://pulsar/admin/v2/schemas/acme/orders/created/schema";
    const LIST: &str = "http://pulsar/admin/v2/persistent/acme/orders/partitioned";

    fn spec() -> SchemaSpec {
        serde_json::from_value(json!({
            "tenant": "acme",
            "namespace": "orders",
            "topic": "created",
            "schema": {"type": "record", "name": "Order", "fields": []},
            "lifecyclePolicy": "CleanUpAfterDeletion",
        }))
        .unwrap()
    }

    fn indexed_topic() -> Arc<TopicIndex> {
        let topic: TopicSpec = serde_json::from_value(json!({
            "tenant": "acme",
            "namespace": "orders",
            "topic": "created",
            "partitions": 4,
        }))
        .unwrap();
        let index = Arc::new(TopicIndex::new());
        index.upsert("default/created", &topic);
        index
    }

    fn ready_topic(mock: &MockTransport) {
        tenant_exists(mock, "acme");
        namespace_exists(mock, "acme", "orders");
        mock.on_json(
            HttpMethod::Get,
            LIST,
            200,
            json!(["persistent://acme/orders/created"]),
        );
    }

    #[tokio::test]
    async fn test_unindexed_topic_blocks_schema() {
        let mock = Arc::new(MockTransport::new());
        tenant_exists(&mock, "acme");
        namespace_exists(&mock, "acme", "orders");

        let mut status = PulsarStatus::default();
        let err = spec()
            .reconcile(&context(&mock), &mut status, Some(1))
            .await
            .unwrap_err();

        assert!(matches!(err, HandlerError::Temporary { delay, .. } if delay == RETRY_DELAY));
        assert!(!status.condition(CONDITION_TOPIC_READY));
        assert_eq!(status.phase, PulsarPhase::Failed);
        assert_eq!(mock.writes(), 0);
    }

    #[tokio::test]
    async fn test_topic_missing_on_broker() {
        let mock = Arc::new(MockTransport::new());
        tenant_exists(&mock, "acme");
        namespace_exists(&mock, "acme", "orders");
        mock.on_json(HttpMethod::Get, LIST, 200, json!([]));

        let mut status = PulsarStatus::default();
        let err = spec()
            .reconcile(&context_with_index(&mock, indexed_topic()), &mut status, Some(1))
            .await
            .unwrap_err();

        assert!(matches!(err, HandlerError::Temporary { .. }));
        assert_eq!(status.conditions.last().unwrap().reason.as_deref(), Some("TopicNotFound"));
        assert_eq!(mock.writes(), 0);
    }

    #[tokio::test]
    async fn test_registers_schema() {
        let mock = Arc::new(MockTransport::new());
        ready_topic(&mock);
        mock.on_json(HttpMethod::Post, SCHEMA_URL, 202, json!({"version": {"version": 0}}));

        let mut status = PulsarStatus::default();
        spec()
            .reconcile(&context_with_index(&mock, indexed_topic()), &mut status, Some(5))
            .await
            .unwrap();

        assert!(status.condition(CONDITION_SCHEMA_IN_SYNC));
        assert_eq!(status.phase, PulsarPhase::Ready);
        assert_eq!(status.observed_generation, Some(5));
        assert_eq!(status.conditions.len(), 5);
    }

    #[tokio::test]
    async fn test_incompatible_schema_is_permanent() {
        let mock = Arc::new(MockTransport::new());
        ready_topic(&mock);
        mock.on(HttpMethod::Post, SCHEMA_URL, 409, "");

        let mut status = PulsarStatus::default();
        let err = spec()
            .reconcile(&context_with_index(&mock, indexed_topic()), &mut status, Some(1))
            .await
            .unwrap_err();

        assert_eq!(err, HandlerError::permanent("Incompatible schema"));
        assert_eq!(status.phase, PulsarPhase::Failed);
        assert_eq!(
            status.conditions.last().unwrap().reason.as_deref(),
            Some("IncompatibleSchema")
        );
        assert_eq!(status.observed_generation, None);
    }

    #[tokio::test]
    async fn test_parsing_failure_is_permanent() {
        let mock = Arc::new(MockTransport::new());
        ready_topic(&mock);
        mock.on(HttpMethod::Post, SCHEMA_URL, 200, "not json");

        let mut status = PulsarStatus::default();
        let err = spec()
            .reconcile(&context_with_index(&mock, indexed_topic()), &mut status, Some(1))
            .await
            .unwrap_err();

        assert!(matches!(err, HandlerError::Permanent { .. }));
        let condition = status.conditions.last().unwrap();
        assert_eq!(condition.reason.as_deref(), Some("ResponseParsingError"));
        assert!(condition
            .message
            .as_deref()
            .unwrap()
            .starts_with("Error parsing response from Pulsar cluster: "));
    }

    #[tokio::test]
    async fn test_other_api_errors_are_retried() {
        let mock = Arc::new(MockTransport::new());
        ready_topic(&mock);
        mock.on(HttpMethod::Post, SCHEMA_URL, 500, "broker unavailable");

        let mut status = PulsarStatus::default();
        let err = spec()
            .reconcile(&context_with_index(&mock, indexed_topic()), &mut status, Some(1))
            .await
            .unwrap_err();

        assert!(matches!(err, HandlerError::Temporary { delay, .. } if delay == RETRY_DELAY));
        assert_eq!(status.phase, PulsarPhase::Pending);
    }

    #[tokio::test]
    async fn test_cleanup_requires_exact_200() {
        let mock = Arc::new(MockTransport::new());
        mock.on_json(
            HttpMethod::Get,
            SCHEMA_URL,
            200,
            json!({"version": 0, "type": "AVRO", "data": "{}"}),
        )
        .on(HttpMethod::Delete, SCHEMA_URL, 204, "");

        let mut status = PulsarStatus::default();
        let err = spec()
            .cleanup(&context(&mock), &mut status)
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Temporary { .. }));
        assert_eq!(status.conditions[0].reason.as_deref(), Some("DeleteFailed"));
    }
}
