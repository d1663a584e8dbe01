use std::sync::Arc;

use chrono::Utc;

use stagegate_core::{AppError, AppResult};
use stagegate_domain::{AuditAction, EffectivePermission, PermissionKey, RoleId, StaffId};

use crate::audit_outbox::{AuditOutbox, AuditRecord};
use crate::{AuditEvent, AuditRepository, PermissionEngine};

/// Default permission required to administer grants and overrides.
pub const MANAGE_PERMISSIONS: &str = "manage_permissions";

/// Application service exposing the permission admin API to staff actors.
///
/// Every change requires the actor to hold the admin permission and is
/// recorded in the audit sink. An applied change stays applied when the sink
/// fails; its event waits in the queue for a later delivery.
#[derive(Clone)]
pub struct PermissionAdminService {
    engine: PermissionEngine,
    audit: AuditOutbox,
    admin_permission: PermissionKey,
}

impl PermissionAdminService {
    /// Creates a service gated by [`MANAGE_PERMISSIONS`].
    pub fn new(
        engine: PermissionEngine,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> AppResult<Self> {
        Ok(Self {
            engine,
            audit: AuditOutbox::new(audit_repository),
            admin_permission: PermissionKey::new(MANAGE_PERMISSIONS)?,
        })
    }

    /// Replaces the permission gating administration.
    pub fn with_admin_permission(mut self, permission_key: &str) -> AppResult<Self> {
        self.admin_permission = PermissionKey::new(permission_key)?;
        Ok(self)
    }

    /// Bounds the queue of undelivered audit events.
    #[must_use]
    pub fn with_audit_queue_capacity(mut self, capacity: usize) -> Self {
        self.audit = self.audit.with_capacity(capacity);
        self
    }

    /// Retries queued audit events and returns how many were delivered.
    pub async fn flush_pending_audit(&self) -> usize {
        self.audit.flush().await
    }

    /// Returns how many audit events are waiting for delivery.
    #[must_use]
    pub fn pending_audit_count(&self) -> usize {
        self.audit.pending_count()
    }

    /// Upserts a role grant on behalf of an administrator.
    pub async fn grant_role(
        &self,
        actor_id: &StaffId,
        role_id: &RoleId,
        permission_key: &str,
        allowed: bool,
    ) -> AppResult<()> {
        self.require_admin(actor_id).await?;
        self.engine
            .grant_role(role_id, permission_key, allowed)
            .await?;

        self.append(
            actor_id,
            AuditAction::PermissionRoleGrantSaved,
            "role_permission",
            format!("{role_id}:{permission_key}"),
            format!("set '{permission_key}' to {allowed} for role '{role_id}'"),
        )
        .await;

        Ok(())
    }

    /// Upserts a staff override on behalf of an administrator.
    pub async fn set_override(
        &self,
        actor_id: &StaffId,
        staff_id: &StaffId,
        permission_key: &str,
        allowed: bool,
    ) -> AppResult<()> {
        self.require_admin(actor_id).await?;
        self.engine
            .set_override(staff_id, permission_key, allowed)
            .await?;

        self.append(
            actor_id,
            AuditAction::PermissionOverrideSaved,
            "staff_permission_override",
            format!("{staff_id}:{permission_key}"),
            format!("overrode '{permission_key}' to {allowed} for staff '{staff_id}'"),
        )
        .await;

        Ok(())
    }

    /// Clears a staff override on behalf of an administrator.
    ///
    /// Nothing is audited when no override existed.
    pub async fn clear_override(
        &self,
        actor_id: &StaffId,
        staff_id: &StaffId,
        permission_key: &str,
    ) -> AppResult<bool> {
        self.require_admin(actor_id).await?;
        let removed = self.engine.clear_override(staff_id, permission_key).await?;

        if removed {
            self.append(
                actor_id,
                AuditAction::PermissionOverrideCleared,
                "staff_permission_override",
                format!("{staff_id}:{permission_key}"),
                format!("staff '{staff_id}' inherits '{permission_key}' from role again"),
            )
            .await;
        }

        Ok(removed)
    }

    /// Toggles a module group on behalf of an administrator.
    pub async fn toggle_module_group(
        &self,
        actor_id: &StaffId,
        role_id: &RoleId,
        module: &str,
        allowed: bool,
    ) -> AppResult<usize> {
        self.require_admin(actor_id).await?;
        let count = self
            .engine
            .toggle_module_group(role_id, module, allowed)
            .await?;

        self.append(
            actor_id,
            AuditAction::PermissionModuleGroupToggled,
            "role_permission_module",
            format!("{role_id}:{module}"),
            format!("set {count} '{module}' permissions to {allowed} for role '{role_id}'"),
        )
        .await;

        Ok(count)
    }

    /// Returns a staff member's permission matrix.
    ///
    /// Staff may always read their own matrix; reading another's requires the
    /// admin permission.
    pub async fn effective_permissions(
        &self,
        actor_id: &StaffId,
        staff_id: &StaffId,
    ) -> AppResult<Vec<EffectivePermission>> {
        if actor_id != staff_id {
            self.require_admin(actor_id).await?;
        }

        self.engine.effective_permissions(staff_id).await
    }

    async fn require_admin(&self, actor_id: &StaffId) -> AppResult<()> {
        if self
            .engine
            .resolve(actor_id, self.admin_permission.as_str())
            .await
        {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "staff '{actor_id}' is missing permission '{}'",
            self.admin_permission
        )))
    }

    async fn append(
        &self,
        actor_id: &StaffId,
        action: AuditAction,
        resource_type: &str,
        resource_id: String,
        detail: String,
    ) {
        self.audit.enqueue(AuditRecord::Event(AuditEvent {
            actor_id: actor_id.clone(),
            action,
            resource_type: resource_type.to_owned(),
            resource_id,
            detail: Some(detail),
            occurred_at: Utc::now(),
        }));
        self.audit.deliver().await;
    }
}
