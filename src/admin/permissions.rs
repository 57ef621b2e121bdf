//! Role permission synchronization for namespaces and topics.
//!
//! Desired permissions overwrite whatever a role currently holds; roles that
//! hold permissions but are no longer declared lose them.

use super::error::{api_error, PulsarResult};
use super::{HttpMethod, PulsarAdmin};
use crate::crd::{Permission, RolePermissions};
use std::collections::BTreeSet;

/// Writes needed to bring a permission map to its desired state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionPlan {
    /// Roles to (re)grant, with the full permission set each should hold
    pub sets: Vec<(String, BTreeSet<Permission>)>,
    /// Roles to revoke entirely
    pub deletes: Vec<String>,
}

/// Every desired role is written; every current role not desired is revoked.
pub fn plan_permission_sync(current: &RolePermissions, desired: &RolePermissions) -> PermissionPlan {
    PermissionPlan {
        sets: desired
            .iter()
            .map(|(role, perms)| (role.clone(), perms.clone()))
            .collect(),
        deletes: current
            .keys()
            .filter(|role| !desired.contains_key(*role))
            .cloned()
            .collect(),
    }
}

/// Permissions granted on the topic itself.
///
/// The broker reports topic permissions merged with the namespace ones, so
/// namespace grants are subtracted per role. Roles left with nothing are
/// dropped.
pub fn topic_level_permissions(
    namespace: &RolePermissions,
    effective: &RolePermissions,
) -> RolePermissions {
    effective
        .iter()
        .filter_map(|(role, perms)| {
            let own: BTreeSet<Permission> = match namespace.get(role) {
                Some(inherited) => perms.difference(inherited).copied().collect(),
                None => perms.clone(),
            };
            (!own.is_empty()).then(|| (role.clone(), own))
        })
        .collect()
}

impl PulsarAdmin {
    /// GET a `.../permissions` endpoint.
    pub(crate) async fn fetch_permissions(&self, url: &str) -> PulsarResult<RolePermissions> {
        let res = self.send(HttpMethod::Get, url, None).await?;
        if res.status != 200 {
            return Err(api_error(&res));
        }
        res.json()
    }

    /// Execute a plan against `permissions_url`, all grants before any revoke.
    ///
    /// With `ignore_precondition_failed` a 412 on revoke counts as success;
    /// topics answer that way for roles granted only on their namespace.
    pub(crate) async fn apply_permission_plan(
        &self,
        permissions_url: &str,
        plan: &PermissionPlan,
        ignore_precondition_failed: bool,
    ) -> PulsarResult<()> {
        for (role, perms) in &plan.sets {
            let body = serde_json::to_value(perms)
                .map_err(|e| super::PulsarError::Parsing(e.to_string()))?;
            tracing::debug!(role = %role, url = %permissions_url, "Granting permissions");
            self.send_ok(HttpMethod::Post, &format!("{}/{}", permissions_url, role), Some(&body))
                .await?;
        }

        for role in &plan.deletes {
            tracing::debug!(role = %role, url = %permissions_url, "Revoking permissions");
            let res = self
                .send(HttpMethod::Delete, &format!("{}/{}", permissions_url, role), None)
                .await?;
            if res.is_success() || (ignore_precondition_failed && res.status == 412) {
                continue;
            }
            return Err(api_error(&res));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Permission::*;

    fn perms(entries: &[(&str, &[Permission])]) -> RolePermissions {
        entries
            .iter()
            .map(|(role, p)| (role.to_string(), p.iter().copied().collect()))
            .collect()
    }

    #[test]
    fn test_topic_level_permissions_subtracts_namespace() {
        let namespace = perms(&[("A", &[Consume, Produce])]);
        let effective = perms(&[("A", &[Consume, Produce]), ("B", &[Consume])]);
        assert_eq!(
            topic_level_permissions(&namespace, &effective),
            perms(&[("B", &[Consume])])
        );
    }

    #[test]
    fn test_topic_level_permissions_keeps_extra_actions() {
        let namespace = perms(&[("A", &[Consume])]);
        let effective = perms(&[("A", &[Consume, Produce])]);
        assert_eq!(
            topic_level_permissions(&namespace, &effective),
            perms(&[("A", &[Produce])])
        );
    }

    #[test]
    fn test_plan_overwrites_and_revokes() {
        let current = perms(&[("A", &[Consume]), ("B", &[Produce])]);
        let desired = perms(&[("A", &[Consume, Produce]), ("C", &[Functions])]);
        let plan = plan_permission_sync(&current, &desired);

        assert_eq!(
            plan.sets,
            vec![
                ("A".to_string(), [Consume, Produce].into_iter().collect()),
                ("C".to_string(), [Functions].into_iter().collect()),
            ]
        );
        assert_eq!(plan.deletes, vec!["B".to_string()]);
    }

    #[test]
    fn test_plan_is_idempotent() {
        let desired = perms(&[("A", &[Consume])]);
        let first = plan_permission_sync(&RolePermissions::new(), &desired);
        // After applying, the broker reports exactly the desired state
        let second = plan_permission_sync(&desired, &desired);

        assert!(second.deletes.is_empty());
        assert_eq!(first.sets, second.sets);
    }
}
