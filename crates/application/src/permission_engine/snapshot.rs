use std::collections::HashMap;
use std::sync::Arc;

use stagegate_domain::{
    EffectivePermissionState, PermissionId, RoleId, RolePermissionGrant, Staff, StaffId,
    StaffPermissionOverride, resolve_precedence,
};

/// Indexed grant and override tables. Replaced wholesale on every write.
#[derive(Debug, Clone, Default)]
pub(crate) struct GrantTables {
    role_grants: HashMap<(RoleId, PermissionId), bool>,
    overrides: HashMap<(StaffId, PermissionId), bool>,
}

impl GrantTables {
    pub(crate) fn from_rows(
        role_grants: Vec<RolePermissionGrant>,
        overrides: Vec<StaffPermissionOverride>,
    ) -> Self {
        let mut tables = Self::default();
        for grant in role_grants {
            tables.put_role_grant(grant);
        }
        for value in overrides {
            tables.put_override(value);
        }
        tables
    }

    pub(crate) fn put_role_grant(&mut self, grant: RolePermissionGrant) {
        self.role_grants
            .insert((grant.role_id, grant.permission_id), grant.allowed);
    }

    pub(crate) fn put_override(&mut self, value: StaffPermissionOverride) {
        self.overrides
            .insert((value.staff_id, value.permission_id), value.allowed);
    }

    pub(crate) fn remove_override(&mut self, staff_id: &StaffId, permission_id: &PermissionId) {
        self.overrides
            .remove(&(staff_id.clone(), permission_id.clone()));
    }
}

/// Immutable view of grants and overrides taken at one instant.
///
/// Every check made while holding the same snapshot sees the same
/// configuration, whatever administrators change concurrently.
#[derive(Debug, Clone)]
pub struct PermissionSnapshot {
    tables: Arc<GrantTables>,
}

impl PermissionSnapshot {
    pub(crate) fn new(tables: Arc<GrantTables>) -> Self {
        Self { tables }
    }

    /// Returns the role grant value, if a row exists.
    #[must_use]
    pub fn role_grant(&self, role_id: &RoleId, permission_id: &PermissionId) -> Option<bool> {
        self.tables
            .role_grants
            .get(&(role_id.clone(), permission_id.clone()))
            .copied()
    }

    /// Returns the staff override value, if a row exists.
    #[must_use]
    pub fn override_value(
        &self,
        staff_id: &StaffId,
        permission_id: &PermissionId,
    ) -> Option<bool> {
        self.tables
            .overrides
            .get(&(staff_id.clone(), permission_id.clone()))
            .copied()
    }

    /// Returns the number of stored role grants.
    #[must_use]
    pub fn role_grant_count(&self) -> usize {
        self.tables.role_grants.len()
    }

    /// Returns the number of stored overrides.
    #[must_use]
    pub fn override_count(&self) -> usize {
        self.tables.overrides.len()
    }

    /// Resolves one permission for a staff member.
    ///
    /// `role_exists` is false when the staff member's role no longer resolves,
    /// in which case role grants are ignored. Inactive staff are always denied.
    #[must_use]
    pub fn resolve(&self, staff: &Staff, permission_id: &PermissionId, role_exists: bool) -> bool {
        if !staff.is_active() {
            return false;
        }

        resolve_precedence(
            self.override_value(staff.id(), permission_id),
            self.role_grant_if(role_exists, staff, permission_id),
        )
    }

    /// Classifies one permission for a staff member's permission matrix.
    #[must_use]
    pub fn classify(
        &self,
        staff: &Staff,
        permission_id: &PermissionId,
        role_exists: bool,
    ) -> EffectivePermissionState {
        EffectivePermissionState::classify(
            self.override_value(staff.id(), permission_id),
            self.role_grant_if(role_exists, staff, permission_id),
        )
    }

    fn role_grant_if(
        &self,
        role_exists: bool,
        staff: &Staff,
        permission_id: &PermissionId,
    ) -> Option<bool> {
        role_exists
            .then(|| self.role_grant(staff.role_id(), permission_id))
            .flatten()
    }
}
