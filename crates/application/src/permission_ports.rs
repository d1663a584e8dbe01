use async_trait::async_trait;

use stagegate_core::AppResult;
use stagegate_domain::{PermissionId, RolePermissionGrant, StaffId, StaffPermissionOverride};

/// Persistence port for role grants and staff overrides.
///
/// Implementations must keep at most one row per `(role_id, permission_id)`
/// and per `(staff_id, permission_id)`: every write is an upsert.
#[async_trait]
pub trait PermissionGrantRepository: Send + Sync {
    /// Lists every stored role grant.
    async fn list_role_grants(&self) -> AppResult<Vec<RolePermissionGrant>>;

    /// Lists every stored staff override.
    async fn list_overrides(&self) -> AppResult<Vec<StaffPermissionOverride>>;

    /// Upserts a batch of role grants as one write.
    async fn upsert_role_grants(&self, grants: &[RolePermissionGrant]) -> AppResult<()>;

    /// Upserts one staff override.
    async fn upsert_override(&self, value: &StaffPermissionOverride) -> AppResult<()>;

    /// Deletes one staff override and returns whether a row existed.
    async fn delete_override(
        &self,
        staff_id: &StaffId,
        permission_id: &PermissionId,
    ) -> AppResult<bool>;
}
