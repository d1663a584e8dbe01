use std::collections::BTreeMap;

use async_trait::async_trait;
use stagegate_application::PermissionGrantRepository;
use stagegate_core::AppResult;
use stagegate_domain::{PermissionId, RoleId, RolePermissionGrant, StaffId, StaffPermissionOverride};
use tokio::sync::RwLock;

/// In-memory store of role grants and staff overrides.
///
/// Rows are keyed by their natural pair so every write is an upsert.
#[derive(Debug, Default)]
pub struct InMemoryPermissionGrantRepository {
    role_grants: RwLock<BTreeMap<(RoleId, PermissionId), bool>>,
    overrides: RwLock<BTreeMap<(StaffId, PermissionId), bool>>,
}

impl InMemoryPermissionGrantRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionGrantRepository for InMemoryPermissionGrantRepository {
    async fn list_role_grants(&self) -> AppResult<Vec<RolePermissionGrant>> {
        Ok(self
            .role_grants
            .read()
            .await
            .iter()
            .map(|((role_id, permission_id), allowed)| RolePermissionGrant {
                role_id: role_id.clone(),
                permission_id: permission_id.clone(),
                allowed: *allowed,
            })
            .collect())
    }

    async fn list_overrides(&self) -> AppResult<Vec<StaffPermissionOverride>> {
        Ok(self
            .overrides
            .read()
            .await
            .iter()
            .map(|((staff_id, permission_id), allowed)| StaffPermissionOverride {
                staff_id: staff_id.clone(),
                permission_id: permission_id.clone(),
                allowed: *allowed,
            })
            .collect())
    }

    async fn upsert_role_grants(&self, grants: &[RolePermissionGrant]) -> AppResult<()> {
        let mut role_grants = self.role_grants.write().await;
        for grant in grants {
            role_grants.insert(
                (grant.role_id.clone(), grant.permission_id.clone()),
                grant.allowed,
            );
        }
        Ok(())
    }

    async fn upsert_override(&self, value: &StaffPermissionOverride) -> AppResult<()> {
        self.overrides.write().await.insert(
            (value.staff_id.clone(), value.permission_id.clone()),
            value.allowed,
        );
        Ok(())
    }

    async fn delete_override(
        &self,
        staff_id: &StaffId,
        permission_id: &PermissionId,
    ) -> AppResult<bool> {
        Ok(self
            .overrides
            .write()
            .await
            .remove(&(staff_id.clone(), permission_id.clone()))
            .is_some())
    }
}
