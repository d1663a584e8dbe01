use chrono::Utc;
use tracing::{info, warn};

use stagegate_domain::{Case, CaseId, StaffId, StageName, TransitionKind};

use crate::audit_outbox::AuditRecord;
use crate::{TransitionAuditEvent, TransitionAuditKind};

use super::{WorkflowEngine, WorkflowError};

impl WorkflowEngine {
    /// Moves a case exactly one stage forward.
    ///
    /// Checks run in order and stop at the first failure: case exists and is
    /// not terminal, actor exists, department scope, lock boundary, stage
    /// permission. A rejected call changes nothing.
    pub async fn advance(&self, case_id: &CaseId, actor_id: &StaffId) -> Result<Case, WorkflowError> {
        let result = {
            let _case_guard = self.case_locks.acquire(case_id).await;
            self.advance_exclusive(case_id, actor_id).await
        };
        self.deliver_audit(result).await
    }

    /// Moves a locked case back to the reopen stage.
    ///
    /// Requires the reopen permission; department scope does not apply. The
    /// transition is recorded as an override.
    pub async fn reopen(&self, case_id: &CaseId, actor_id: &StaffId) -> Result<Case, WorkflowError> {
        let result = {
            let _case_guard = self.case_locks.acquire(case_id).await;
            self.reopen_exclusive(case_id, actor_id).await
        };
        self.deliver_audit(result).await
    }

    /// Moves a case to `target_stage` when that is a legal transition.
    ///
    /// The next stage dispatches to [`WorkflowEngine::advance`], the reopen
    /// stage of a locked case to [`WorkflowEngine::reopen`]; anything else is
    /// rejected.
    pub async fn transition_to(
        &self,
        case_id: &CaseId,
        actor_id: &StaffId,
        target_stage: &StageName,
    ) -> Result<Case, WorkflowError> {
        let result = {
            let _case_guard = self.case_locks.acquire(case_id).await;
            self.transition_to_exclusive(case_id, actor_id, target_stage)
                .await
        };
        self.deliver_audit(result).await
    }

    async fn transition_to_exclusive(
        &self,
        case_id: &CaseId,
        actor_id: &StaffId,
        target_stage: &StageName,
    ) -> Result<Case, WorkflowError> {
        let case = self.load_case(case_id).await?;

        if self.pipeline.next_stage(case.stage()) == Some(target_stage) {
            return self.advance_exclusive(case_id, actor_id).await;
        }

        if self.pipeline.is_locked(case.stage())
            && self.pipeline.reopen_target() == Some(target_stage)
        {
            return self.reopen_exclusive(case_id, actor_id).await;
        }

        if self.pipeline.is_terminal(case.stage()) {
            return Err(WorkflowError::AlreadyTerminal {
                case_id: case_id.clone(),
                stage: case.stage().clone(),
            });
        }

        Err(WorkflowError::InvalidTransition(format!(
            "case '{case_id}' cannot move from '{}' to '{target_stage}'",
            case.stage()
        )))
    }

    async fn advance_exclusive(
        &self,
        case_id: &CaseId,
        actor_id: &StaffId,
    ) -> Result<Case, WorkflowError> {
        let snapshot = self.permissions.snapshot();
        let case = self.load_case(case_id).await?;

        if self.pipeline.is_terminal(case.stage()) {
            return Err(WorkflowError::AlreadyTerminal {
                case_id: case_id.clone(),
                stage: case.stage().clone(),
            });
        }
        let Some(next_stage) = self.pipeline.next_stage(case.stage()).cloned() else {
            return Err(WorkflowError::Internal(format!(
                "case '{case_id}' is at stage '{}' unknown to pipeline '{}'",
                case.stage(),
                self.pipeline.name()
            )));
        };

        let actor = self.load_actor(actor_id).await?;
        let rejected = |error: WorkflowError| {
            warn!(
                case_id = %case_id,
                actor_id = %actor_id,
                stage = %case.stage(),
                reason = error.kind().as_str(),
                "advance rejected"
            );
            error
        };

        self.check_scope(&snapshot, &actor, case.owner_department_id())
            .await
            .map_err(rejected)?;
        let lock_bypass = self
            .check_lock(&snapshot, &actor, &case)
            .await
            .map_err(rejected)?;
        self.check_stage_permission(&snapshot, &actor, case.stage())
            .await
            .map_err(rejected)?;

        let updated = case.with_transition(
            next_stage,
            actor_id.clone(),
            TransitionKind::Advance,
            Utc::now(),
        );
        self.cases
            .save_case(updated.clone(), case.version())
            .await?;

        let kind = if lock_bypass {
            warn!(
                case_id = %case_id,
                actor_id = %actor_id,
                from_stage = %case.stage(),
                to_stage = %updated.stage(),
                "case advanced through lock boundary"
            );
            TransitionAuditKind::LockBypass
        } else {
            info!(
                case_id = %case_id,
                actor_id = %actor_id,
                from_stage = %case.stage(),
                to_stage = %updated.stage(),
                "case advanced"
            );
            TransitionAuditKind::Advance
        };

        self.queue_transition(&case, &updated, actor_id, kind);
        Ok(updated)
    }

    async fn reopen_exclusive(
        &self,
        case_id: &CaseId,
        actor_id: &StaffId,
    ) -> Result<Case, WorkflowError> {
        let snapshot = self.permissions.snapshot();
        let case = self.load_case(case_id).await?;
        let actor = self.load_actor(actor_id).await?;

        let (Some(lock), Some(reopen_target)) =
            (self.pipeline.lock_policy(), self.pipeline.reopen_target())
        else {
            return Err(WorkflowError::InvalidTransition(format!(
                "pipeline '{}' does not support reopening",
                self.pipeline.name()
            )));
        };

        if !self.pipeline.is_locked(case.stage()) {
            return Err(WorkflowError::InvalidTransition(format!(
                "case '{case_id}' at stage '{}' is not locked and cannot be reopened",
                case.stage()
            )));
        }

        if !self
            .permissions
            .resolve_for_staff(&snapshot, &actor, lock.reopen_permission())
            .await
        {
            warn!(
                case_id = %case_id,
                actor_id = %actor_id,
                stage = %case.stage(),
                "reopen rejected"
            );
            return Err(WorkflowError::Unauthorized {
                actor_id: actor_id.clone(),
                permission: lock.reopen_permission().clone(),
                stage: case.stage().clone(),
            });
        }

        let updated = case.with_transition(
            reopen_target.clone(),
            actor_id.clone(),
            TransitionKind::Reopen,
            Utc::now(),
        );
        self.cases
            .save_case(updated.clone(), case.version())
            .await?;

        warn!(
            case_id = %case_id,
            actor_id = %actor_id,
            from_stage = %case.stage(),
            to_stage = %updated.stage(),
            "case reopened by override"
        );

        self.queue_transition(&case, &updated, actor_id, TransitionAuditKind::Reopen);
        Ok(updated)
    }

    /// Delivers queued audit after the case lock is released.
    async fn deliver_audit(
        &self,
        result: Result<Case, WorkflowError>,
    ) -> Result<Case, WorkflowError> {
        if result.is_ok() {
            self.audit.deliver().await;
        }
        result
    }

    /// Queues the transition event while the case lock is still held, so
    /// events of one case keep their commit order.
    fn queue_transition(
        &self,
        before: &Case,
        after: &Case,
        actor_id: &StaffId,
        kind: TransitionAuditKind,
    ) {
        let occurred_at = after
            .history()
            .last()
            .map(|record| record.occurred_at)
            .unwrap_or_else(Utc::now);

        self.audit
            .enqueue(AuditRecord::Transition(TransitionAuditEvent {
                case_id: after.id().clone(),
                actor_id: actor_id.clone(),
                from_stage: before.stage().clone(),
                to_stage: after.stage().clone(),
                kind,
                occurred_at,
            }));
    }
}
