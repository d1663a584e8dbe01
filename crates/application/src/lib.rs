//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_outbox;
mod audit_ports;
mod directory_ports;
mod permission_admin_service;
mod permission_engine;
mod permission_ports;
mod workflow_engine;
mod workflow_ports;

#[cfg(test)]
mod test_support;

pub use audit_outbox::DEFAULT_AUDIT_QUEUE_CAPACITY;
pub use audit_ports::{
    AuditEvent, AuditLogRepository, AuditRepository, TransitionAuditEvent, TransitionAuditKind,
    TransitionAuditQuery,
};
pub use directory_ports::EntityDirectory;
pub use permission_admin_service::{MANAGE_PERMISSIONS, PermissionAdminService};
pub use permission_engine::{PermissionEngine, PermissionSnapshot};
pub use permission_ports::PermissionGrantRepository;
pub use workflow_engine::{WorkflowEngine, WorkflowError, WorkflowErrorKind};
pub use workflow_ports::{CaseListQuery, CaseRepository};
