use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use stagegate_application::{CaseRepository, EntityDirectory, PermissionGrantRepository};
use stagegate_core::{AppError, AppResult};
use stagegate_domain::{
    Case, Department, PermissionDefinition, PermissionId, PermissionKey, Role, RoleId,
    RolePermissionGrant, Staff, StaffId, StaffPermissionOverride,
};
use tracing::{info, warn};

use crate::{
    InMemoryAuditRepository, InMemoryCaseRepository, InMemoryEntityDirectory,
    InMemoryPermissionGrantRepository,
};

/// Role grant row addressed by permission key.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedRoleGrant {
    /// Role receiving the grant.
    pub role_id: RoleId,
    /// Catalog key of the granted permission.
    pub permission_key: PermissionKey,
    /// Allow or explicit deny.
    pub allowed: bool,
}

/// Staff override row addressed by permission key.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedOverride {
    /// Staff member receiving the override.
    pub staff_id: StaffId,
    /// Catalog key of the overridden permission.
    pub permission_key: PermissionKey,
    /// Allow or explicit deny.
    pub allowed: bool,
}

/// JSON seed describing the initial directory, grants and cases.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedData {
    /// Departments owning cases.
    pub departments: Vec<Department>,
    /// Roles referenced by staff and grants.
    pub roles: Vec<Role>,
    /// Permission catalog.
    pub permissions: Vec<PermissionDefinition>,
    /// Staff projections.
    pub staff: Vec<Staff>,
    /// Role grants.
    pub role_grants: Vec<SeedRoleGrant>,
    /// Staff overrides.
    pub overrides: Vec<SeedOverride>,
    /// Pre-existing cases.
    pub cases: Vec<Case>,
}

impl SeedData {
    /// Parses a seed document.
    pub fn from_json_str(value: &str) -> AppResult<Self> {
        serde_json::from_str(value)
            .map_err(|error| AppError::Validation(format!("invalid seed document: {error}")))
    }

    /// Reads and parses a seed file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|error| {
            AppError::Validation(format!(
                "failed to read seed file '{}': {error}",
                path.display()
            ))
        })?;

        Self::from_json_str(&contents)
    }
}

/// Row counts applied from a seed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Departments loaded.
    pub departments: usize,
    /// Roles loaded.
    pub roles: usize,
    /// Catalog permissions loaded.
    pub permissions: usize,
    /// Staff loaded.
    pub staff: usize,
    /// Role grants loaded.
    pub role_grants: usize,
    /// Overrides loaded.
    pub overrides: usize,
    /// Cases loaded.
    pub cases: usize,
}

/// In-memory adapters for every port, sharing one process lifetime.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    /// Staff, role, department and permission records.
    pub directory: Arc<InMemoryEntityDirectory>,
    /// Role grants and staff overrides.
    pub grants: Arc<InMemoryPermissionGrantRepository>,
    /// Workflow cases.
    pub cases: Arc<InMemoryCaseRepository>,
    /// Audit sink and audit reads.
    pub audit: Arc<InMemoryAuditRepository>,
}

impl InMemoryStore {
    /// Creates empty adapters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates adapters populated from a seed.
    pub async fn seeded(seed: SeedData) -> AppResult<(Self, SeedSummary)> {
        let store = Self::new();
        let summary = store.apply(seed).await?;
        Ok((store, summary))
    }

    /// Loads a seed into the adapters.
    ///
    /// Grants, overrides and cases must reference records present in the
    /// seed. Staff whose role is missing are kept and resolve no role grants.
    pub async fn apply(&self, seed: SeedData) -> AppResult<SeedSummary> {
        let SeedData {
            departments,
            roles,
            permissions,
            staff,
            role_grants,
            overrides,
            cases,
        } = seed;

        let mut summary = SeedSummary::default();
        let mut permission_ids: HashMap<PermissionKey, PermissionId> = HashMap::new();
        let mut known_roles: HashSet<RoleId> = HashSet::new();
        let mut known_staff: HashSet<StaffId> = HashSet::new();

        for department in departments {
            self.directory.upsert_department(department).await;
            summary.departments += 1;
        }

        for role in roles {
            known_roles.insert(role.id().clone());
            self.directory.upsert_role(role).await;
            summary.roles += 1;
        }

        for permission in permissions {
            permission_ids.insert(permission.key().clone(), permission.id().clone());
            self.directory.insert_permission(permission).await?;
            summary.permissions += 1;
        }

        for member in staff {
            if !known_roles.contains(member.role_id()) {
                warn!(
                    staff_id = %member.id(),
                    role_id = %member.role_id(),
                    "seeded staff references an unknown role"
                );
            }
            known_staff.insert(member.id().clone());
            self.directory.upsert_staff(member).await;
            summary.staff += 1;
        }

        let mut grants = Vec::with_capacity(role_grants.len());
        for grant in role_grants {
            if !known_roles.contains(&grant.role_id) {
                return Err(AppError::NotFound(format!(
                    "seed role grant references unknown role '{}'",
                    grant.role_id
                )));
            }
            grants.push(RolePermissionGrant {
                role_id: grant.role_id,
                permission_id: lookup_permission(&permission_ids, &grant.permission_key)?,
                allowed: grant.allowed,
            });
        }
        self.grants.upsert_role_grants(&grants).await?;
        summary.role_grants = grants.len();

        for value in overrides {
            if !known_staff.contains(&value.staff_id) {
                return Err(AppError::NotFound(format!(
                    "seed override references unknown staff '{}'",
                    value.staff_id
                )));
            }
            self.grants
                .upsert_override(&StaffPermissionOverride {
                    permission_id: lookup_permission(&permission_ids, &value.permission_key)?,
                    staff_id: value.staff_id,
                    allowed: value.allowed,
                })
                .await?;
            summary.overrides += 1;
        }

        for case in cases {
            if self
                .directory
                .find_department(case.owner_department_id())
                .await?
                .is_none()
            {
                return Err(AppError::NotFound(format!(
                    "seed case '{}' references unknown department '{}'",
                    case.id(),
                    case.owner_department_id()
                )));
            }
            self.cases.insert_case(case).await?;
            summary.cases += 1;
        }

        info!(
            departments = summary.departments,
            roles = summary.roles,
            permissions = summary.permissions,
            staff = summary.staff,
            role_grants = summary.role_grants,
            overrides = summary.overrides,
            cases = summary.cases,
            "seed applied"
        );

        Ok(summary)
    }
}

fn lookup_permission(
    permission_ids: &HashMap<PermissionKey, PermissionId>,
    key: &PermissionKey,
) -> AppResult<PermissionId> {
    permission_ids
        .get(key)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("seed references unknown permission '{key}'")))
}

#[cfg(test)]
mod tests;
