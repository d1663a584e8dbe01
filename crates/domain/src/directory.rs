use serde::{Deserialize, Serialize};
use stagegate_core::{AppResult, NonEmptyString};

use crate::{DepartmentId, RoleId, StaffId};

/// Lifecycle status of a staff record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffStatus {
    /// Staff member may act.
    #[default]
    Active,
    /// Staff member is retained for history but may not act.
    Inactive,
}

impl StaffStatus {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// Actor projection read from the HR directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    id: StaffId,
    role_id: RoleId,
    department_id: DepartmentId,
    #[serde(default)]
    status: StaffStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
}

impl Staff {
    /// Creates a staff projection.
    #[must_use]
    pub fn new(
        id: StaffId,
        role_id: RoleId,
        department_id: DepartmentId,
        status: StaffStatus,
    ) -> Self {
        Self {
            id,
            role_id,
            department_id,
            status,
            display_name: None,
        }
    }

    /// Attaches a human-readable name used in logs and listings.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        let display_name = display_name.into().trim().to_owned();
        self.display_name = (!display_name.is_empty()).then_some(display_name);
        self
    }

    /// Returns the staff identifier.
    #[must_use]
    pub fn id(&self) -> &StaffId {
        &self.id
    }

    /// Returns the single role assigned to the staff member.
    #[must_use]
    pub fn role_id(&self) -> &RoleId {
        &self.role_id
    }

    /// Returns the owning department.
    #[must_use]
    pub fn department_id(&self) -> &DepartmentId {
        &self.department_id
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> StaffStatus {
        self.status
    }

    /// Returns the optional display name.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Returns whether the staff member may act at all.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == StaffStatus::Active
    }
}

/// Named bundle of default authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    name: NonEmptyString,
}

impl Role {
    /// Creates a validated role.
    pub fn new(id: RoleId, name: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn id(&self) -> &RoleId {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }
}

/// Organizational unit owning workflow cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    id: DepartmentId,
    name: NonEmptyString,
}

impl Department {
    /// Creates a validated department.
    pub fn new(id: DepartmentId, name: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
        })
    }

    /// Returns the department identifier.
    #[must_use]
    pub fn id(&self) -> &DepartmentId {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }
}
