use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use stagegate_core::{AppError, AppResult};
use stagegate_domain::{Case, CaseId, DepartmentId, PipelineDefinition, StaffId};

use crate::audit_outbox::AuditOutbox;
use crate::{AuditRepository, CaseListQuery, CaseRepository, EntityDirectory, PermissionEngine};

mod case_locks;
mod error;
mod guards;
mod transitions;

use case_locks::CaseLocks;
pub use error::{WorkflowError, WorkflowErrorKind};

/// Stage-gated approval engine for one configured pipeline.
///
/// Transitions are serialized per case and guarded by department scope,
/// the lock boundary and the permission required by the current stage.
#[derive(Clone)]
pub struct WorkflowEngine {
    pipeline: Arc<PipelineDefinition>,
    permissions: PermissionEngine,
    directory: Arc<dyn EntityDirectory>,
    cases: Arc<dyn CaseRepository>,
    audit: AuditOutbox,
    case_locks: Arc<CaseLocks>,
}

impl WorkflowEngine {
    /// Creates an engine from a validated pipeline and its collaborators.
    #[must_use]
    pub fn new(
        pipeline: PipelineDefinition,
        permissions: PermissionEngine,
        directory: Arc<dyn EntityDirectory>,
        cases: Arc<dyn CaseRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            permissions,
            directory,
            cases,
            audit: AuditOutbox::new(audit_repository),
            case_locks: Arc::new(CaseLocks::default()),
        }
    }

    /// Bounds the queue of undelivered audit events.
    #[must_use]
    pub fn with_audit_queue_capacity(mut self, capacity: usize) -> Self {
        self.audit = self.audit.with_capacity(capacity);
        self
    }

    /// Returns the pipeline this engine enforces.
    #[must_use]
    pub fn pipeline(&self) -> &PipelineDefinition {
        &self.pipeline
    }

    /// Checks the pipeline against the catalog and the stored cases.
    ///
    /// Every permission the pipeline references must exist, and every stored
    /// case must sit at a stage of the pipeline.
    pub async fn verify_configuration(&self) -> AppResult<()> {
        let stage_permissions = self
            .pipeline
            .stages()
            .filter_map(|stage| self.pipeline.required_permission(stage));
        let lock_permission = self
            .pipeline
            .lock_policy()
            .map(|lock| lock.reopen_permission());

        for key in stage_permissions
            .chain(lock_permission)
            .chain(self.pipeline.cross_scope_permissions())
        {
            if self.directory.find_permission_by_key(key).await?.is_none() {
                return Err(AppError::Validation(format!(
                    "pipeline '{}' references unknown permission '{key}'",
                    self.pipeline.name()
                )));
            }
        }

        for case in self.cases.list_cases(CaseListQuery::default()).await? {
            if self.pipeline.position(case.stage()).is_none() {
                return Err(AppError::Validation(format!(
                    "case '{}' is at stage '{}' unknown to pipeline '{}'",
                    case.id(),
                    case.stage(),
                    self.pipeline.name()
                )));
            }
        }

        Ok(())
    }

    /// Opens a case owned by a department at the pipeline's initial stage.
    ///
    /// The actor must be in scope for the department and hold the permission
    /// that leaves the initial stage.
    pub async fn open_case(
        &self,
        actor_id: &StaffId,
        owner_department_id: &DepartmentId,
    ) -> Result<Case, WorkflowError> {
        if self
            .directory
            .find_department(owner_department_id)
            .await?
            .is_none()
        {
            return Err(WorkflowError::NotFound(format!(
                "department '{owner_department_id}' does not exist"
            )));
        }

        let snapshot = self.permissions.snapshot();
        let actor = self.load_actor(actor_id).await?;
        self.check_scope(&snapshot, &actor, owner_department_id)
            .await?;

        let initial_stage = self.pipeline.initial_stage();
        self.check_stage_permission(&snapshot, &actor, initial_stage)
            .await?;

        let case = Case::open(
            CaseId::generate(),
            owner_department_id.clone(),
            initial_stage.clone(),
            actor_id.clone(),
            Utc::now(),
        );
        self.cases.insert_case(case.clone()).await?;

        info!(
            case_id = %case.id(),
            actor_id = %actor_id,
            owner_department_id = %owner_department_id,
            pipeline = self.pipeline.name(),
            "case opened"
        );
        Ok(case)
    }

    /// Returns a case with its stage and full history.
    pub async fn get_case(&self, case_id: &CaseId) -> Result<Case, WorkflowError> {
        self.load_case(case_id).await
    }

    /// Lists cases matching the query.
    pub async fn list_cases(&self, query: CaseListQuery) -> Result<Vec<Case>, WorkflowError> {
        Ok(self.cases.list_cases(query).await?)
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
}
