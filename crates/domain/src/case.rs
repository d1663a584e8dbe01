use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CaseId, DepartmentId, StaffId, StageName};

/// How a case moved between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// One step forward.
    Advance,
    /// Administrative move back to the reopen stage.
    Reopen,
}

impl TransitionKind {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advance => "advance",
            Self::Reopen => "reopen",
        }
    }
}

/// Append-only history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Stage before the transition.
    pub from_stage: StageName,
    /// Stage after the transition.
    pub to_stage: StageName,
    /// Actor who performed it.
    pub actor_id: StaffId,
    /// When it happened.
    pub occurred_at: DateTime<Utc>,
    /// Transition kind.
    pub kind: TransitionKind,
}

/// Unit of work flowing through an approval pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    id: CaseId,
    owner_department_id: DepartmentId,
    stage: StageName,
    #[serde(default)]
    history: Vec<TransitionRecord>,
    #[serde(default)]
    version: u64,
    created_by: StaffId,
    created_at: DateTime<Utc>,
}

impl Case {
    /// Creates a case at the pipeline's initial stage.
    #[must_use]
    pub fn open(
        id: CaseId,
        owner_department_id: DepartmentId,
        initial_stage: StageName,
        created_by: StaffId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_department_id,
            stage: initial_stage,
            history: Vec::new(),
            version: 0,
            created_by,
            created_at,
        }
    }

    /// Returns the case identifier.
    #[must_use]
    pub fn id(&self) -> &CaseId {
        &self.id
    }

    /// Returns the department that authored the case.
    #[must_use]
    pub fn owner_department_id(&self) -> &DepartmentId {
        &self.owner_department_id
    }

    /// Returns the current stage.
    #[must_use]
    pub fn stage(&self) -> &StageName {
        &self.stage
    }

    /// Returns the transition history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    /// Returns the optimistic concurrency version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the staff member who opened the case.
    #[must_use]
    pub fn created_by(&self) -> &StaffId {
        &self.created_by
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns a copy moved to `to_stage` with one history entry appended.
    ///
    /// The receiver is left untouched so a failed save never exposes a
    /// half-applied transition.
    #[must_use]
    pub fn with_transition(
        &self,
        to_stage: StageName,
        actor_id: StaffId,
        kind: TransitionKind,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        let mut next = self.clone();
        next.history.push(TransitionRecord {
            from_stage: self.stage.clone(),
            to_stage: to_stage.clone(),
            actor_id,
            occurred_at,
            kind,
        });
        next.stage = to_stage;
        next.version = self.version.saturating_add(1);
        next
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{Case, TransitionKind};
    use crate::{CaseId, DepartmentId, StaffId, StageName};

    #[test]
    fn with_transition_appends_history_and_bumps_version() {
        let staff_id = StaffId::new("s1").unwrap_or_else(|_| unreachable!());
        let case = Case::open(
            CaseId::generate(),
            DepartmentId::new("dept_cs").unwrap_or_else(|_| unreachable!()),
            StageName::new("Draft").unwrap_or_else(|_| unreachable!()),
            staff_id.clone(),
            Utc::now(),
        );

        let submitted = StageName::new("Submitted").unwrap_or_else(|_| unreachable!());
        let next = case.with_transition(
            submitted.clone(),
            staff_id,
            TransitionKind::Advance,
            Utc::now(),
        );

        assert_eq!(case.history().len(), 0);
        assert_eq!(case.version(), 0);
        assert_eq!(next.stage(), &submitted);
        assert_eq!(next.version(), 1);
        assert_eq!(next.history().len(), 1);
        assert_eq!(next.history()[0].from_stage.as_str(), "Draft");
        assert_eq!(next.history()[0].kind, TransitionKind::Advance);
    }
}
