use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use stagegate_application::EntityDirectory;
use stagegate_core::{AppError, AppResult};
use stagegate_domain::{
    Department, DepartmentId, PermissionDefinition, PermissionKey, PermissionModule, Role, RoleId,
    Staff, StaffId,
};
use tokio::sync::RwLock;

/// In-memory directory of staff, roles, departments and the permission catalog.
#[derive(Debug, Default)]
pub struct InMemoryEntityDirectory {
    staff: RwLock<HashMap<StaffId, Staff>>,
    roles: RwLock<HashMap<RoleId, Role>>,
    departments: RwLock<HashMap<DepartmentId, Department>>,
    permissions: RwLock<BTreeMap<PermissionKey, PermissionDefinition>>,
}

impl InMemoryEntityDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a staff projection.
    pub async fn upsert_staff(&self, staff: Staff) {
        self.staff.write().await.insert(staff.id().clone(), staff);
    }

    /// Inserts or replaces a role.
    pub async fn upsert_role(&self, role: Role) {
        self.roles.write().await.insert(role.id().clone(), role);
    }

    /// Inserts or replaces a department.
    pub async fn upsert_department(&self, department: Department) {
        self.departments
            .write()
            .await
            .insert(department.id().clone(), department);
    }

    /// Adds a catalog permission.
    ///
    /// Keys and storage ids are both unique within the catalog.
    pub async fn insert_permission(&self, permission: PermissionDefinition) -> AppResult<()> {
        let mut permissions = self.permissions.write().await;

        if permissions.contains_key(permission.key()) {
            return Err(AppError::Conflict(format!(
                "permission key '{}' already exists",
                permission.key()
            )));
        }
        if permissions
            .values()
            .any(|existing| existing.id() == permission.id())
        {
            return Err(AppError::Conflict(format!(
                "permission id '{}' already exists",
                permission.id()
            )));
        }

        permissions.insert(permission.key().clone(), permission);
        Ok(())
    }
}

#[async_trait]
impl EntityDirectory for InMemoryEntityDirectory {
    async fn find_staff(&self, staff_id: &StaffId) -> AppResult<Option<Staff>> {
        Ok(self.staff.read().await.get(staff_id).cloned())
    }

    async fn find_role(&self, role_id: &RoleId) -> AppResult<Option<Role>> {
        Ok(self.roles.read().await.get(role_id).cloned())
    }

    async fn find_department(
        &self,
        department_id: &DepartmentId,
    ) -> AppResult<Option<Department>> {
        Ok(self.departments.read().await.get(department_id).cloned())
    }

    async fn find_permission_by_key(
        &self,
        key: &PermissionKey,
    ) -> AppResult<Option<PermissionDefinition>> {
        Ok(self.permissions.read().await.get(key).cloned())
    }

    async fn list_permissions(&self) -> AppResult<Vec<PermissionDefinition>> {
        Ok(self.permissions.read().await.values().cloned().collect())
    }

    async fn list_permissions_in_module(
        &self,
        module: &PermissionModule,
    ) -> AppResult<Vec<PermissionDefinition>> {
        Ok(self
            .permissions
            .read()
            .await
            .values()
            .filter(|permission| permission.module() == module)
            .cloned()
            .collect())
    }
}
