//! PulsarTenant reconciliation

use super::{
    converged, mark_cluster_target, release, Context, HandlerResult, Reconcile, ResourceKind,
};
use crate::admin::{ResourceClient, Tenant};
use crate::conditions::{PulsarStatus, CONDITION_TENANT_IN_SYNC};
use crate::crd::TenantSpec;
use async_trait::async_trait;

#[async_trait]
impl Reconcile for TenantSpec {
    const KIND: ResourceKind = ResourceKind::Tenant;

    async fn reconcile(
        &self,
        ctx: &Context,
        status: &mut PulsarStatus,
        generation: Option<i64>,
    ) -> HandlerResult {
        mark_cluster_target(status);

        let tenant = Tenant::from(self);
        let client = ctx.admin.tenants();
        let result = async {
            if !client.exists(&tenant).await? {
                client.create(&tenant).await?;
            }
            client.update(&tenant).await.map(|_| ())
        }
        .await;
        converged(status, CONDITION_TENANT_IN_SYNC, &format!("tenant '{}'", self.tenant), result)?;

        status.settle(generation);
        Ok(())
    }

    async fn cleanup(&self, ctx: &Context, status: &mut PulsarStatus) -> HandlerResult {
        let what = format!("tenant '{}'", self.tenant);
        release(
            ctx.admin.tenants(),
            &Tenant::from(self),
            status,
            CONDITION_TENANT_IN_SYNC,
            &what,
        )
        .await
    }
}
