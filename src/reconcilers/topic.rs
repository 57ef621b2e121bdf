//! PulsarTopic reconciliation

use super::{
    converged, mark_cluster_target, release, require, Context, HandlerError, HandlerResult,
    Reconcile, ResourceKind,
};
use crate::admin::{Namespace, ResourceClient, Tenant, Topic};
use crate::conditions::{
    PulsarPhase, PulsarStatus, Reason, CONDITION_NAMESPACE_READY, CONDITION_TENANT_READY,
    CONDITION_TOPIC_IN_SYNC,
};
use crate::crd::TopicSpec;
use async_trait::async_trait;

#[async_trait]
impl Reconcile for TopicSpec {
    const KIND: ResourceKind = ResourceKind::Topic;

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

        let topic = Topic::from(self);
        let client = ctx.admin.topics();
        let what = format!("topic '{}'", self.full_name());

        let policies_enabled = match client.topic_level_policies_enabled().await {
            Ok(enabled) => enabled,
            Err(e) => return converged(status, CONDITION_TOPIC_IN_SYNC, &what, Err(e)),
        };

        // The broker would reject every policy write; no retry can fix that
        if !policies_enabled && self.declares_policies() {
            status.fail(CONDITION_TOPIC_IN_SYNC, Reason::TopicLevelPoliciesDisabled);
            status.set_phase(PulsarPhase::Failed);
            return Err(HandlerError::permanent(
                Reason::TopicLevelPoliciesDisabled.message(),
            ));
        }

        let result = async {
            if !client.exists(&topic).await? {
                client.create(&topic).await?;
            }
            client.update(&topic).await?;
            client.sync_permissions(&topic).await
        }
        .await;
        converged(status, CONDITION_TOPIC_IN_SYNC, &what, result)?;

        status.settle(generation);
        Ok(())
    }

    async fn cleanup(&self, ctx: &Context, status: &mut PulsarStatus) -> HandlerResult {
        let what = format!("topic '{}'", self.full_name());
        release(
            ctx.admin.topics(),
            &Topic::from(self),
            status,
            CONDITION_TOPIC_IN_SYNC,
            &what,
        )
        .await
    }
}
