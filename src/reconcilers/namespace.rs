//! PulsarNamespace reconciliation

use super::{
    converged, mark_cluster_target, release, require, Context, HandlerResult, Reconcile,
    ResourceKind,
};
use crate::admin::{Namespace, ResourceClient, Tenant};
use crate::conditions::{
    PulsarStatus, Reason, CONDITION_NAMESPACE_IN_SYNC, CONDITION_TENANT_READY,
};
use crate::crd::NamespaceSpec;
use async_trait::async_trait;

#[async_trait]
impl Reconcile for NamespaceSpec {
    const KIND: ResourceKind = ResourceKind::Namespace;

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

        let namespace = Namespace::from(self);
        let client = ctx.admin.namespaces();
        let result = async {
            if !client.exists(&namespace).await? {
                client.create(&namespace).await?;
            }
            client.update(&namespace).await?;
            client.sync_permissions(&namespace).await
        }
        .await;
        converged(
            status,
            CONDITION_NAMESPACE_IN_SYNC,
            &format!("namespace '{}'", self.namespace),
            result,
        )?;

        status.settle(generation);
        Ok(())
    }

    async fn cleanup(&self, ctx: &Context, status: &mut PulsarStatus) -> HandlerResult {
        let what = format!("namespace '{}/{}'", self.tenant, self.namespace);
        release(
            ctx.admin.namespaces(),
            &Namespace::from(self),
            status,
            CONDITION_NAMESPACE_IN_SYNC,
            &what,
        )
        .await
    }
}
