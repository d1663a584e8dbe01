use thiserror::Error;

use stagegate_core::AppError;
use stagegate_domain::{CaseId, DepartmentId, PermissionKey, StaffId, StageName};

/// Rejection or failure of a workflow operation.
///
/// Every expected rejection has its own variant so callers can render the
/// reason without inspecting messages.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Referenced case, staff member or department does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Actor lacks the permission the attempted transition requires.
    #[error("staff '{actor_id}' is missing permission '{permission}' at stage '{stage}'")]
    Unauthorized {
        /// Acting staff member.
        actor_id: StaffId,
        /// Permission that was required.
        permission: PermissionKey,
        /// Stage the transition started from.
        stage: StageName,
    },

    /// Actor's department differs from the case owner and no cross-scope permission applies.
    #[error(
        "staff '{actor_id}' of department '{actor_department_id}' cannot act on cases of department '{owner_department_id}'"
    )]
    OutOfScope {
        /// Acting staff member.
        actor_id: StaffId,
        /// Actor's department.
        actor_department_id: DepartmentId,
        /// Case owner department.
        owner_department_id: DepartmentId,
    },

    /// Case is at or beyond the lock boundary and the actor lacks override rights.
    #[error("case '{case_id}' is locked at stage '{stage}'")]
    Locked {
        /// Locked case.
        case_id: CaseId,
        /// Current stage.
        stage: StageName,
    },

    /// Case already reached the terminal stage.
    #[error("case '{case_id}' is already at terminal stage '{stage}'")]
    AlreadyTerminal {
        /// Terminal case.
        case_id: CaseId,
        /// Terminal stage.
        stage: StageName,
    },

    /// Requested move is neither one step forward nor a valid reopen.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Case changed concurrently; the caller may retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Fieldless discriminant of [`WorkflowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowErrorKind {
    /// See [`WorkflowError::NotFound`].
    NotFound,
    /// See [`WorkflowError::Unauthorized`].
    Unauthorized,
    /// See [`WorkflowError::OutOfScope`].
    OutOfScope,
    /// See [`WorkflowError::Locked`].
    Locked,
    /// See [`WorkflowError::AlreadyTerminal`].
    AlreadyTerminal,
    /// See [`WorkflowError::InvalidTransition`].
    InvalidTransition,
    /// See [`WorkflowError::Conflict`].
    Conflict,
    /// See [`WorkflowError::Internal`].
    Internal,
}

impl WorkflowErrorKind {
    /// Returns a stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::OutOfScope => "out_of_scope",
            Self::Locked => "locked",
            Self::AlreadyTerminal => "already_terminal",
            Self::InvalidTransition => "invalid_transition",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
        }
    }
}

impl WorkflowError {
    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> WorkflowErrorKind {
        match self {
            Self::NotFound(_) => WorkflowErrorKind::NotFound,
            Self::Unauthorized { .. } => WorkflowErrorKind::Unauthorized,
            Self::OutOfScope { .. } => WorkflowErrorKind::OutOfScope,
            Self::Locked { .. } => WorkflowErrorKind::Locked,
            Self::AlreadyTerminal { .. } => WorkflowErrorKind::AlreadyTerminal,
            Self::InvalidTransition(_) => WorkflowErrorKind::InvalidTransition,
            Self::Conflict(_) => WorkflowErrorKind::Conflict,
            Self::Internal(_) => WorkflowErrorKind::Internal,
        }
    }
}

impl From<AppError> for WorkflowError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::NotFound(message) => Self::NotFound(message),
            AppError::Conflict(message) => Self::Conflict(message),
            other => Self::Internal(other.to_string()),
        }
    }
}
