use stagegate_domain::{Case, CaseId, DepartmentId, Staff, StaffId, StageName};

use crate::PermissionSnapshot;

use super::{WorkflowEngine, WorkflowError};

impl WorkflowEngine {
    pub(super) async fn load_case(&self, case_id: &CaseId) -> Result<Case, WorkflowError> {
        self.cases
            .find_case(case_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("case '{case_id}' does not exist")))
    }

    pub(super) async fn load_actor(&self, actor_id: &StaffId) -> Result<Staff, WorkflowError> {
        self.directory
            .find_staff(actor_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("staff '{actor_id}' does not exist")))
    }

    /// Same department, or any cross-scope permission.
    pub(super) async fn check_scope(
        &self,
        snapshot: &PermissionSnapshot,
        actor: &Staff,
        owner_department_id: &DepartmentId,
    ) -> Result<(), WorkflowError> {
        if actor.department_id() == owner_department_id {
            return Ok(());
        }

        for key in self.pipeline.cross_scope_permissions() {
            if self
                .permissions
                .resolve_for_staff(snapshot, actor, key)
                .await
            {
                return Ok(());
            }
        }

        Err(WorkflowError::OutOfScope {
            actor_id: actor.id().clone(),
            actor_department_id: actor.department_id().clone(),
            owner_department_id: owner_department_id.clone(),
        })
    }

    /// Returns `true` when the case is locked and the actor bypasses the lock.
    pub(super) async fn check_lock(
        &self,
        snapshot: &PermissionSnapshot,
        actor: &Staff,
        case: &Case,
    ) -> Result<bool, WorkflowError> {
        let Some(lock) = self.pipeline.lock_policy() else {
            return Ok(false);
        };
        if !self.pipeline.is_locked(case.stage()) {
            return Ok(false);
        }

        if self
            .permissions
            .resolve_for_staff(snapshot, actor, lock.reopen_permission())
            .await
        {
            return Ok(true);
        }

        Err(WorkflowError::Locked {
            case_id: case.id().clone(),
            stage: case.stage().clone(),
        })
    }

    /// Requires the permission that leaves `stage`.
    pub(super) async fn check_stage_permission(
        &self,
        snapshot: &PermissionSnapshot,
        actor: &Staff,
        stage: &StageName,
    ) -> Result<(), WorkflowError> {
        let Some(required) = self.pipeline.required_permission(stage) else {
            return Err(WorkflowError::Internal(format!(
                "stage '{stage}' has no required permission in pipeline '{}'",
                self.pipeline.name()
            )));
        };

        if self
            .permissions
            .resolve_for_staff(snapshot, actor, required)
            .await
        {
            return Ok(());
        }

        Err(WorkflowError::Unauthorized {
            actor_id: actor.id().clone(),
            permission: required.clone(),
            stage: stage.clone(),
        })
    }
}
