use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stagegate_core::{AppError, AppResult, NonEmptyString};

use crate::{PermissionId, RoleId, StaffId};

/// Semantic permission identity referenced by callers and transition guards.
///
/// Keys are lowercase ASCII, start with a letter, and may contain digits,
/// underscores and dots (`approve_result_faculty`, `exams.publish`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionKey(String);

impl PermissionKey {
    /// Creates a validated permission key.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        let mut characters = trimmed.chars();
        let starts_with_letter = characters
            .next()
            .is_some_and(|character| character.is_ascii_lowercase());
        if !starts_with_letter {
            return Err(AppError::Validation(format!(
                "permission key '{trimmed}' must start with a lowercase letter"
            )));
        }

        if !characters.all(|character| {
            character.is_ascii_lowercase()
                || character.is_ascii_digit()
                || character == '_'
                || character == '.'
        }) {
            return Err(AppError::Validation(format!(
                "permission key '{trimmed}' may only contain lowercase letters, digits, '_' and '.'"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for PermissionKey {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl TryFrom<String> for PermissionKey {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PermissionKey> for String {
    fn from(value: PermissionKey) -> Self {
        value.0
    }
}

impl std::fmt::Display for PermissionKey {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Categorical tag grouping permissions (`Exams`, `Finance`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionModule(NonEmptyString);

impl PermissionModule {
    /// Creates a validated module tag.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        NonEmptyString::new(value).map(Self)
    }

    /// Returns the module tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for PermissionModule {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Atomic capability in the permission catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    id: PermissionId,
    key: PermissionKey,
    module: PermissionModule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl PermissionDefinition {
    /// Creates a catalog entry.
    #[must_use]
    pub fn new(
        id: PermissionId,
        key: PermissionKey,
        module: PermissionModule,
        description: Option<String>,
    ) -> Self {
        let description = description.and_then(|value| {
            let trimmed = value.trim().to_owned();
            (!trimmed.is_empty()).then_some(trimmed)
        });

        Self {
            id,
            key,
            module,
            description,
        }
    }

    /// Returns the storage identity.
    #[must_use]
    pub fn id(&self) -> &PermissionId {
        &self.id
    }

    /// Returns the semantic key.
    #[must_use]
    pub fn key(&self) -> &PermissionKey {
        &self.key
    }

    /// Returns the module tag.
    #[must_use]
    pub fn module(&self) -> &PermissionModule {
        &self.module
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Default authorization for every actor holding a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissionGrant {
    /// Role receiving the grant.
    pub role_id: RoleId,
    /// Permission storage identity.
    pub permission_id: PermissionId,
    /// Allow or explicit deny.
    pub allowed: bool,
}

/// Actor-specific exception superseding the role default for one permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffPermissionOverride {
    /// Staff member receiving the override.
    pub staff_id: StaffId,
    /// Permission storage identity.
    pub permission_id: PermissionId,
    /// Allow or explicit deny.
    pub allowed: bool,
}

/// Applies override > role grant > default deny.
#[must_use]
pub fn resolve_precedence(override_value: Option<bool>, role_grant: Option<bool>) -> bool {
    override_value.or(role_grant).unwrap_or(false)
}

/// Where an actor's effective value for one permission comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectivePermissionState {
    /// Allowed by the role grant.
    InheritedAllow,
    /// Denied by the role grant, or no grant exists.
    InheritedDeny,
    /// Allowed by an actor override.
    OverrideAllow,
    /// Denied by an actor override.
    OverrideDeny,
}

impl EffectivePermissionState {
    /// Classifies a permission from its override and role grant rows.
    #[must_use]
    pub fn classify(override_value: Option<bool>, role_grant: Option<bool>) -> Self {
        match override_value {
            Some(true) => Self::OverrideAllow,
            Some(false) => Self::OverrideDeny,
            None if role_grant.unwrap_or(false) => Self::InheritedAllow,
            None => Self::InheritedDeny,
        }
    }

    /// Returns whether the permission is effectively allowed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::InheritedAllow | Self::OverrideAllow)
    }

    /// Returns whether an actor override decides the value.
    #[must_use]
    pub fn is_override(&self) -> bool {
        matches!(self, Self::OverrideAllow | Self::OverrideDeny)
    }

    /// Returns a stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InheritedAllow => "inherited-allow",
            Self::InheritedDeny => "inherited-deny",
            Self::OverrideAllow => "override-allow",
            Self::OverrideDeny => "override-deny",
        }
    }
}

/// One row of an actor's permission matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermission {
    /// Permission key.
    pub key: PermissionKey,
    /// Module the permission belongs to.
    pub module: PermissionModule,
    /// Classified effective state.
    pub state: EffectivePermissionState,
}

/// Stable audit actions emitted by permission administration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a role grant is created or replaced.
    PermissionRoleGrantSaved,
    /// Emitted when an actor override is created or replaced.
    PermissionOverrideSaved,
    /// Emitted when an actor override is removed.
    PermissionOverrideCleared,
    /// Emitted when a whole module is granted or revoked for a role.
    PermissionModuleGroupToggled,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermissionRoleGrantSaved => "permission.role_grant.saved",
            Self::PermissionOverrideSaved => "permission.override.saved",
            Self::PermissionOverrideCleared => "permission.override.cleared",
            Self::PermissionModuleGroupToggled => "permission.module_group.toggled",
        }
    }
}
