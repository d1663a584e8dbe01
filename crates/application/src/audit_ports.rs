use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stagegate_core::AppResult;
use stagegate_domain::{AuditAction, CaseId, StaffId, StageName};

/// Audit tag of a case transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAuditKind {
    /// Ordinary one-step advance.
    Advance,
    /// Advance through the lock boundary by an actor holding the reopen permission.
    LockBypass,
    /// Administrative reopen.
    Reopen,
}

impl TransitionAuditKind {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advance => "advance",
            Self::LockBypass => "lock_bypass",
            Self::Reopen => "reopen",
        }
    }

    /// Returns whether the transition bypassed the normal integrity guarantee.
    #[must_use]
    pub fn is_override(&self) -> bool {
        matches!(self, Self::LockBypass | Self::Reopen)
    }
}

/// Audit record emitted for every successful advance or reopen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionAuditEvent {
    /// Case that moved.
    pub case_id: CaseId,
    /// Actor who moved it.
    pub actor_id: StaffId,
    /// Stage before the transition.
    pub from_stage: StageName,
    /// Stage after the transition.
    pub to_stage: StageName,
    /// Transition tag.
    pub kind: TransitionAuditKind,
    /// Transition timestamp.
    pub occurred_at: DateTime<Utc>,
}

/// Audit record emitted by permission administration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Staff member who performed the action.
    pub actor_id: StaffId,
    /// Stable action identifier.
    pub action: AuditAction,
    /// Resource kind targeted by the action.
    pub resource_type: String,
    /// Stable resource identifier.
    pub resource_id: String,
    /// Optional human-readable detail payload.
    pub detail: Option<String>,
    /// Event timestamp.
    pub occurred_at: DateTime<Utc>,
}

/// Port for appending audit records to an external sink.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends one administrative audit event.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;

    /// Appends one case transition event.
    async fn append_transition(&self, event: TransitionAuditEvent) -> AppResult<()>;
}

/// Query parameters for transition audit listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionAuditQuery {
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    pub offset: usize,
    /// Optional case filter.
    pub case_id: Option<CaseId>,
    /// Optional actor filter.
    pub actor_id: Option<StaffId>,
    /// Optional kind filter.
    pub kind: Option<TransitionAuditKind>,
    /// Restricts results to lock bypasses and reopens.
    pub overrides_only: bool,
}

impl Default for TransitionAuditQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            case_id: None,
            actor_id: None,
            kind: None,
            overrides_only: false,
        }
    }
}

impl TransitionAuditQuery {
    /// Returns whether an event passes every filter of this query.
    #[must_use]
    pub fn matches(&self, event: &TransitionAuditEvent) -> bool {
        self.case_id
            .as_ref()
            .is_none_or(|case_id| case_id == &event.case_id)
            && self
                .actor_id
                .as_ref()
                .is_none_or(|actor_id| actor_id == &event.actor_id)
            && self.kind.is_none_or(|kind| kind == event.kind)
            && (!self.overrides_only || event.kind.is_override())
    }
}

/// Repository port for reading audit history.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Lists transition events, oldest first.
    async fn list_transition_events(
        &self,
        query: TransitionAuditQuery,
    ) -> AppResult<Vec<TransitionAuditEvent>>;

    /// Lists administrative events, oldest first.
    async fn list_events(&self, limit: usize, offset: usize) -> AppResult<Vec<AuditEvent>>;
}
