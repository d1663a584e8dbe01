use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use stagegate_core::{AppError, AppResult};
use stagegate_domain::{
    Case, CaseId, Department, DepartmentId, PermissionDefinition, PermissionId, PermissionKey,
    PermissionModule, Role, RoleId, RolePermissionGrant, Staff, StaffId, StaffPermissionOverride,
    StaffStatus,
};

use crate::{
    AuditEvent, AuditRepository, CaseListQuery, CaseRepository, EntityDirectory,
    PermissionEngine, PermissionGrantRepository, TransitionAuditEvent,
};

pub(crate) fn staff_id(value: &str) -> StaffId {
    StaffId::new(value).unwrap_or_else(|_| unreachable!())
}

pub(crate) fn role_id(value: &str) -> RoleId {
    RoleId::new(value).unwrap_or_else(|_| unreachable!())
}

pub(crate) fn department_id(value: &str) -> DepartmentId {
    DepartmentId::new(value).unwrap_or_else(|_| unreachable!())
}

#[derive(Default)]
pub(crate) struct FakeDirectory {
    staff: HashMap<StaffId, Staff>,
    roles: HashMap<RoleId, Role>,
    departments: HashMap<DepartmentId, Department>,
    permissions: Vec<PermissionDefinition>,
}

impl FakeDirectory {
    pub(crate) fn with_role(mut self, id: &str) -> Self {
        let role = Role::new(role_id(id), id).unwrap_or_else(|_| unreachable!());
        self.roles.insert(role.id().clone(), role);
        self
    }

    pub(crate) fn with_department(mut self, id: &str) -> Self {
        let department =
            Department::new(department_id(id), id).unwrap_or_else(|_| unreachable!());
        self.departments.insert(department.id().clone(), department);
        self
    }

    pub(crate) fn with_staff(self, id: &str, role: &str, department: &str) -> Self {
        self.with_staff_status(id, role, department, StaffStatus::Active)
    }

    pub(crate) fn with_staff_status(
        mut self,
        id: &str,
        role: &str,
        department: &str,
        status: StaffStatus,
    ) -> Self {
        let staff = Staff::new(staff_id(id), role_id(role), department_id(department), status);
        self.staff.insert(staff.id().clone(), staff);
        self
    }

    pub(crate) fn with_permission(mut self, key: &str, module: &str) -> Self {
        let permission = PermissionDefinition::new(
            PermissionId::new(format!("perm_{key}")).unwrap_or_else(|_| unreachable!()),
            PermissionKey::new(key).unwrap_or_else(|_| unreachable!()),
            PermissionModule::new(module).unwrap_or_else(|_| unreachable!()),
            None,
        );
        self.permissions.push(permission);
        self
    }
}

#[async_trait]
impl EntityDirectory for FakeDirectory {
    async fn find_staff(&self, staff_id: &StaffId) -> AppResult<Option<Staff>> {
        Ok(self.staff.get(staff_id).cloned())
    }

    async fn find_role(&self, role_id: &RoleId) -> AppResult<Option<Role>> {
        Ok(self.roles.get(role_id).cloned())
    }

    async fn find_department(
        &self,
        department_id: &DepartmentId,
    ) -> AppResult<Option<Department>> {
        Ok(self.departments.get(department_id).cloned())
    }

    async fn find_permission_by_key(
        &self,
        key: &PermissionKey,
    ) -> AppResult<Option<PermissionDefinition>> {
        Ok(self
            .permissions
            .iter()
            .find(|permission| permission.key() == key)
            .cloned())
    }

    async fn list_permissions(&self) -> AppResult<Vec<PermissionDefinition>> {
        Ok(self.permissions.clone())
    }

    async fn list_permissions_in_module(
        &self,
        module: &PermissionModule,
    ) -> AppResult<Vec<PermissionDefinition>> {
        Ok(self
            .permissions
            .iter()
            .filter(|permission| permission.module() == module)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct FakeGrantRepository {
    pub(crate) role_grants: Mutex<HashMap<(RoleId, PermissionId), bool>>,
    pub(crate) overrides: Mutex<HashMap<(StaffId, PermissionId), bool>>,
}

#[async_trait]
impl PermissionGrantRepository for FakeGrantRepository {
    async fn list_role_grants(&self) -> AppResult<Vec<RolePermissionGrant>> {
        Ok(self
            .role_grants
            .lock()
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
            .lock()
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
        let mut stored = self.role_grants.lock().await;
        for grant in grants {
            stored.insert(
                (grant.role_id.clone(), grant.permission_id.clone()),
                grant.allowed,
            );
        }
        Ok(())
    }

    async fn upsert_override(&self, value: &StaffPermissionOverride) -> AppResult<()> {
        self.overrides.lock().await.insert(
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
            .lock()
            .await
            .remove(&(staff_id.clone(), permission_id.clone()))
            .is_some())
    }
}

#[derive(Default)]
pub(crate) struct FakeAuditRepository {
    pub(crate) events: Mutex<Vec<AuditEvent>>,
    pub(crate) transitions: Mutex<Vec<TransitionAuditEvent>>,
    pub(crate) failing: AtomicBool,
    pub(crate) delay_ms: AtomicU64,
}

impl FakeAuditRepository {
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), Ordering::SeqCst);
    }

    async fn wait(&self) {
        let delay_ms = self.delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.wait().await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Internal("audit sink unavailable".to_owned()));
        }
        self.events.lock().await.push(event);
        Ok(())
    }

    async fn append_transition(&self, event: TransitionAuditEvent) -> AppResult<()> {
        self.wait().await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Internal("audit sink unavailable".to_owned()));
        }
        self.transitions.lock().await.push(event);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeCaseRepository {
    pub(crate) cases: Mutex<HashMap<CaseId, Case>>,
}

#[async_trait]
impl CaseRepository for FakeCaseRepository {
    async fn insert_case(&self, case: Case) -> AppResult<()> {
        let mut cases = self.cases.lock().await;
        if cases.contains_key(case.id()) {
            return Err(AppError::Conflict(format!(
                "case '{}' already exists",
                case.id()
            )));
        }
        cases.insert(case.id().clone(), case);
        Ok(())
    }

    async fn find_case(&self, case_id: &CaseId) -> AppResult<Option<Case>> {
        Ok(self.cases.lock().await.get(case_id).cloned())
    }

    async fn save_case(&self, case: Case, expected_version: u64) -> AppResult<()> {
        let mut cases = self.cases.lock().await;
        let stored = cases
            .get(case.id())
            .ok_or_else(|| AppError::NotFound(format!("case '{}' does not exist", case.id())))?;
        if stored.version() != expected_version {
            return Err(AppError::Conflict(format!(
                "case '{}' changed concurrently",
                case.id()
            )));
        }
        cases.insert(case.id().clone(), case);
        Ok(())
    }

    async fn list_cases(&self, query: CaseListQuery) -> AppResult<Vec<Case>> {
        Ok(self
            .cases
            .lock()
            .await
            .values()
            .filter(|case| query.matches(case))
            .cloned()
            .collect())
    }
}

pub(crate) async fn build_permission_engine(
    directory: FakeDirectory,
) -> (PermissionEngine, Arc<FakeGrantRepository>) {
    let repository = Arc::new(FakeGrantRepository::default());
    let engine = PermissionEngine::load(Arc::new(directory), repository.clone()).await;
    assert!(engine.is_ok());
    (engine.unwrap_or_else(|_| unreachable!()), repository)
}
