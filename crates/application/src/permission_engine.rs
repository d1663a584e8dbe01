use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use stagegate_core::{AppError, AppResult};
use stagegate_domain::{
    EffectivePermission, PermissionDefinition, PermissionKey, PermissionModule, Staff, StaffId,
};

use crate::{EntityDirectory, PermissionGrantRepository};

mod admin;
mod snapshot;

use snapshot::GrantTables;
pub use snapshot::PermissionSnapshot;

/// Resolves whether an actor may perform an action.
///
/// Precedence is staff override, then role grant, then deny. Reads clone an
/// `Arc` to the current grant tables and never wait on writers for longer
/// than that; writes are serialized, persisted through the repository, then
/// published by swapping in a rebuilt table.
#[derive(Clone)]
pub struct PermissionEngine {
    directory: Arc<dyn EntityDirectory>,
    repository: Arc<dyn PermissionGrantRepository>,
    tables: Arc<RwLock<Arc<GrantTables>>>,
    writer: Arc<Mutex<()>>,
}

impl PermissionEngine {
    /// Builds an engine indexed from every row stored in the grant repository.
    pub async fn load(
        directory: Arc<dyn EntityDirectory>,
        repository: Arc<dyn PermissionGrantRepository>,
    ) -> AppResult<Self> {
        let tables = load_tables(repository.as_ref()).await?;

        Ok(Self {
            directory,
            repository,
            tables: Arc::new(RwLock::new(Arc::new(tables))),
            writer: Arc::new(Mutex::new(())),
        })
    }

    /// Rebuilds the in-memory index from the grant repository.
    pub async fn reload(&self) -> AppResult<()> {
        let _writer = self.writer.lock().await;
        let tables = load_tables(self.repository.as_ref()).await?;
        *self.tables.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(tables);
        Ok(())
    }

    /// Returns an immutable view of the current grants and overrides.
    #[must_use]
    pub fn snapshot(&self) -> PermissionSnapshot {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        PermissionSnapshot::new(Arc::clone(&tables))
    }

    /// Returns whether the staff member holds the permission.
    ///
    /// Fails closed: unknown staff, unknown keys and directory failures all
    /// resolve to `false`.
    pub async fn resolve(&self, staff_id: &StaffId, permission_key: &str) -> bool {
        self.resolve_with(&self.snapshot(), staff_id, permission_key)
            .await
    }

    /// Same as [`PermissionEngine::resolve`] against a caller-held snapshot.
    pub async fn resolve_with(
        &self,
        snapshot: &PermissionSnapshot,
        staff_id: &StaffId,
        permission_key: &str,
    ) -> bool {
        let Ok(key) = PermissionKey::new(permission_key) else {
            debug!(permission_key, "malformed permission key resolved to deny");
            return false;
        };

        let staff = match self.directory.find_staff(staff_id).await {
            Ok(Some(staff)) => staff,
            Ok(None) => {
                debug!(staff_id = %staff_id, "unknown staff resolved to deny");
                return false;
            }
            Err(error) => {
                warn!(staff_id = %staff_id, error = %error, "staff lookup failed during resolution");
                return false;
            }
        };

        self.resolve_for_staff(snapshot, &staff, &key).await
    }

    /// Resolves a permission for an already loaded staff record.
    pub async fn resolve_for_staff(
        &self,
        snapshot: &PermissionSnapshot,
        staff: &Staff,
        key: &PermissionKey,
    ) -> bool {
        let permission = match self.directory.find_permission_by_key(key).await {
            Ok(Some(permission)) => permission,
            Ok(None) => {
                debug!(permission_key = %key, "unknown permission resolved to deny");
                return false;
            }
            Err(error) => {
                warn!(permission_key = %key, error = %error, "permission lookup failed during resolution");
                return false;
            }
        };

        let role_exists = match self.directory.find_role(staff.role_id()).await {
            Ok(role) => role.is_some(),
            Err(error) => {
                warn!(role_id = %staff.role_id(), error = %error, "role lookup failed during resolution");
                return false;
            }
        };

        let allowed = snapshot.resolve(staff, permission.id(), role_exists);
        if !allowed {
            debug!(
                staff_id = %staff.id(),
                permission_key = %key,
                "permission resolved to deny"
            );
        }
        allowed
    }

    /// Returns every catalog permission classified for the staff member.
    ///
    /// Rows reflect stored configuration even for inactive staff, who still
    /// resolve every key to `false`.
    pub async fn effective_permissions(
        &self,
        staff_id: &StaffId,
    ) -> AppResult<Vec<EffectivePermission>> {
        let permissions = self.directory.list_permissions().await?;
        self.classify_permissions(staff_id, permissions).await
    }

    /// Returns the classified permissions of one module for the staff member.
    pub async fn effective_permissions_for_module(
        &self,
        staff_id: &StaffId,
        module: &str,
    ) -> AppResult<Vec<EffectivePermission>> {
        let module = PermissionModule::new(module)?;
        let permissions = self.directory.list_permissions_in_module(&module).await?;
        self.classify_permissions(staff_id, permissions).await
    }

    async fn classify_permissions(
        &self,
        staff_id: &StaffId,
        permissions: Vec<PermissionDefinition>,
    ) -> AppResult<Vec<EffectivePermission>> {
        let staff = self.require_staff(staff_id).await?;
        let role_exists = self.directory.find_role(staff.role_id()).await?.is_some();
        let snapshot = self.snapshot();

        let mut effective: Vec<EffectivePermission> = permissions
            .into_iter()
            .map(|permission| EffectivePermission {
                state: snapshot.classify(&staff, permission.id(), role_exists),
                key: permission.key().clone(),
                module: permission.module().clone(),
            })
            .collect();
        effective.sort_by(|left, right| left.key.cmp(&right.key));

        Ok(effective)
    }

    pub(crate) async fn require_staff(&self, staff_id: &StaffId) -> AppResult<Staff> {
        self.directory
            .find_staff(staff_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("staff '{staff_id}' does not exist")))
    }

    async fn require_permission(&self, permission_key: &str) -> AppResult<PermissionDefinition> {
        let not_found =
            || AppError::NotFound(format!("permission '{permission_key}' does not exist"));
        let key = PermissionKey::new(permission_key).map_err(|_| not_found())?;

        self.directory
            .find_permission_by_key(&key)
            .await?
            .ok_or_else(not_found)
    }

    fn publish(&self, mutate: impl FnOnce(&mut GrantTables)) {
        let mut current = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = GrantTables::clone(&current);
        mutate(&mut next);
        *current = Arc::new(next);
    }
}

async fn load_tables(repository: &dyn PermissionGrantRepository) -> AppResult<GrantTables> {
    let role_grants = repository.list_role_grants().await?;
    let overrides = repository.list_overrides().await?;
    Ok(GrantTables::from_rows(role_grants, overrides))
}

#[cfg(test)]
mod tests;
