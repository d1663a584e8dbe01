//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_audit_repository;
mod in_memory_case_repository;
mod in_memory_entity_directory;
mod in_memory_permission_grant_repository;
mod seed;

pub use in_memory_audit_repository::InMemoryAuditRepository;
pub use in_memory_case_repository::InMemoryCaseRepository;
pub use in_memory_entity_directory::InMemoryEntityDirectory;
pub use in_memory_permission_grant_repository::InMemoryPermissionGrantRepository;
pub use seed::{InMemoryStore, SeedData, SeedOverride, SeedRoleGrant, SeedSummary};
