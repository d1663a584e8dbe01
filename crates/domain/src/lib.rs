//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod case;
mod directory;
mod identifiers;
mod security;
mod workflow;

pub use case::{Case, TransitionKind, TransitionRecord};
pub use directory::{Department, Role, Staff, StaffStatus};
pub use identifiers::{CaseId, DepartmentId, PermissionId, RoleId, StaffId};
pub use security::{
    AuditAction, EffectivePermission, EffectivePermissionState, PermissionDefinition,
    PermissionKey, PermissionModule, RolePermissionGrant, StaffPermissionOverride,
    resolve_precedence,
};
pub use workflow::{
    LockPolicy, LockPolicyInput, PipelineDefinition, PipelineDefinitionInput, StageInput,
    StageName, result_permissions, result_stages,
};
