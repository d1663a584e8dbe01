use async_trait::async_trait;

use stagegate_core::AppResult;
use stagegate_domain::{
    Department, DepartmentId, PermissionDefinition, PermissionKey, PermissionModule, Role, RoleId,
    Staff, StaffId,
};

/// Read access to the externally owned staff, role, department and permission records.
#[async_trait]
pub trait EntityDirectory: Send + Sync {
    /// Finds a staff member by identifier.
    async fn find_staff(&self, staff_id: &StaffId) -> AppResult<Option<Staff>>;

    /// Finds a role by identifier.
    async fn find_role(&self, role_id: &RoleId) -> AppResult<Option<Role>>;

    /// Finds a department by identifier.
    async fn find_department(&self, department_id: &DepartmentId)
    -> AppResult<Option<Department>>;

    /// Finds a catalog permission by its semantic key.
    async fn find_permission_by_key(
        &self,
        key: &PermissionKey,
    ) -> AppResult<Option<PermissionDefinition>>;

    /// Lists the whole permission catalog.
    async fn list_permissions(&self) -> AppResult<Vec<PermissionDefinition>>;

    /// Lists catalog permissions tagged with one module.
    async fn list_permissions_in_module(
        &self,
        module: &PermissionModule,
    ) -> AppResult<Vec<PermissionDefinition>>;
}
