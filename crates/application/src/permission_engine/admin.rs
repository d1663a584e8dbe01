use tracing::info;

use stagegate_core::{AppError, AppResult};
use stagegate_domain::{
    PermissionModule, RoleId, RolePermissionGrant, StaffId, StaffPermissionOverride,
};

use super::PermissionEngine;

impl PermissionEngine {
    /// Creates or replaces the role grant for one permission.
    pub async fn grant_role(
        &self,
        role_id: &RoleId,
        permission_key: &str,
        allowed: bool,
    ) -> AppResult<()> {
        self.require_role(role_id).await?;
        let permission = self.require_permission(permission_key).await?;
        let grant = RolePermissionGrant {
            role_id: role_id.clone(),
            permission_id: permission.id().clone(),
            allowed,
        };

        let _writer = self.writer.lock().await;
        self.repository
            .upsert_role_grants(std::slice::from_ref(&grant))
            .await?;
        self.publish(|tables| tables.put_role_grant(grant));

        info!(role_id = %role_id, permission_key, allowed, "role grant saved");
        Ok(())
    }

    /// Creates or replaces the staff override for one permission.
    pub async fn set_override(
        &self,
        staff_id: &StaffId,
        permission_key: &str,
        allowed: bool,
    ) -> AppResult<()> {
        self.require_staff(staff_id).await?;
        let permission = self.require_permission(permission_key).await?;
        let value = StaffPermissionOverride {
            staff_id: staff_id.clone(),
            permission_id: permission.id().clone(),
            allowed,
        };

        let _writer = self.writer.lock().await;
        self.repository.upsert_override(&value).await?;
        self.publish(|tables| tables.put_override(value));

        info!(staff_id = %staff_id, permission_key, allowed, "staff override saved");
        Ok(())
    }

    /// Removes the staff override so the role default applies again.
    ///
    /// Clearing an absent override is a no-op; the return value reports
    /// whether a row was removed.
    pub async fn clear_override(&self, staff_id: &StaffId, permission_key: &str) -> AppResult<bool> {
        self.require_staff(staff_id).await?;
        let permission = self.require_permission(permission_key).await?;

        let _writer = self.writer.lock().await;
        let removed = self
            .repository
            .delete_override(staff_id, permission.id())
            .await?;
        if removed {
            self.publish(|tables| tables.remove_override(staff_id, permission.id()));
            info!(staff_id = %staff_id, permission_key, "staff override cleared");
        }

        Ok(removed)
    }

    /// Grants or revokes every permission of a module for one role.
    ///
    /// Leaves the engine in the state sequential [`PermissionEngine::grant_role`]
    /// calls would, published as a single swap. Returns how many permissions
    /// the module holds.
    pub async fn toggle_module_group(
        &self,
        role_id: &RoleId,
        module: &str,
        allowed: bool,
    ) -> AppResult<usize> {
        self.require_role(role_id).await?;
        let module = PermissionModule::new(module)?;
        let grants: Vec<RolePermissionGrant> = self
            .directory
            .list_permissions_in_module(&module)
            .await?
            .into_iter()
            .map(|permission| RolePermissionGrant {
                role_id: role_id.clone(),
                permission_id: permission.id().clone(),
                allowed,
            })
            .collect();

        if grants.is_empty() {
            return Ok(0);
        }

        let _writer = self.writer.lock().await;
        self.repository.upsert_role_grants(&grants).await?;
        let count = grants.len();
        self.publish(|tables| {
            for grant in grants {
                tables.put_role_grant(grant);
            }
        });

        info!(role_id = %role_id, module = %module, allowed, count, "module group toggled");
        Ok(count)
    }

    async fn require_role(&self, role_id: &RoleId) -> AppResult<()> {
        self.directory
            .find_role(role_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
    }
}
