use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use stagegate_core::{AppError, AppResult, NonEmptyString};

use crate::PermissionKey;

/// Stage names of the result-processing pipeline.
pub mod result_stages {
    /// Initial authoring stage.
    pub const DRAFT: &str = "Draft";
    /// Submitted for department review.
    pub const SUBMITTED: &str = "Submitted";
    /// Reviewed by the owning department.
    pub const DEPARTMENT_APPROVED: &str = "DepartmentApproved";
    /// Approved by the faculty board.
    pub const FACULTY_APPROVED: &str = "FacultyApproved";
    /// Approved by the senate.
    pub const SENATE_APPROVED: &str = "SenateApproved";
    /// Terminal archival stage.
    pub const PUBLISHED: &str = "Published";
}

/// Permission keys guarding the result-processing pipeline.
pub mod result_permissions {
    /// `Draft -> Submitted`.
    pub const SUBMIT_RESULT: &str = "submit_result";
    /// `Submitted -> DepartmentApproved`.
    pub const REVIEW_RESULT_DEPARTMENT: &str = "review_result_department";
    /// `DepartmentApproved -> FacultyApproved`; also lifts department scope.
    pub const APPROVE_RESULT_FACULTY: &str = "approve_result_faculty";
    /// `FacultyApproved -> SenateApproved`; also lifts department scope.
    pub const APPROVE_RESULT_SENATE: &str = "approve_result_senate";
    /// `SenateApproved -> Published`.
    pub const PUBLISH_RESULT: &str = "publish_result";
    /// Reopens a locked case and bypasses the lock on advance.
    pub const REOPEN_RESULT: &str = "reopen_result";
}

/// One named stage in an approval pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageName(NonEmptyString);

impl StageName {
    /// Creates a validated stage name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        NonEmptyString::new(value).map(Self)
    }

    /// Returns the stage name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// One row of the stage table: the stage and the permission needed to leave it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageInput {
    /// Stage name.
    pub name: String,
    /// Permission required to advance out of this stage. Absent only on the terminal stage.
    #[serde(default)]
    pub advance_permission: Option<String>,
}

/// Lock and reopen configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockPolicyInput {
    /// First stage locked against ordinary advancement.
    pub from_stage: String,
    /// Stage a reopened case returns to.
    pub reopen_to: String,
    /// Permission required to reopen, or to advance through the lock.
    pub reopen_permission: String,
}

/// Input payload used to construct a validated pipeline definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDefinitionInput {
    /// Pipeline name used in logs.
    pub name: String,
    /// Ordered stages; first is initial, last is terminal.
    pub stages: Vec<StageInput>,
    /// Optional lock policy.
    #[serde(default)]
    pub lock: Option<LockPolicyInput>,
    /// Permissions that let an actor act outside their own department.
    #[serde(default)]
    pub cross_scope_permissions: Vec<String>,
}

impl PipelineDefinitionInput {
    /// Returns the result-processing pipeline configuration.
    #[must_use]
    pub fn result_processing() -> Self {
        use result_permissions as permissions;
        use result_stages as stages;

        let stage = |name: &str, permission: Option<&str>| StageInput {
            name: name.to_owned(),
            advance_permission: permission.map(str::to_owned),
        };

        Self {
            name: "result_processing".to_owned(),
            stages: vec![
                stage(stages::DRAFT, Some(permissions::SUBMIT_RESULT)),
                stage(
                    stages::SUBMITTED,
                    Some(permissions::REVIEW_RESULT_DEPARTMENT),
                ),
                stage(
                    stages::DEPARTMENT_APPROVED,
                    Some(permissions::APPROVE_RESULT_FACULTY),
                ),
                stage(
                    stages::FACULTY_APPROVED,
                    Some(permissions::APPROVE_RESULT_SENATE),
                ),
                stage(stages::SENATE_APPROVED, Some(permissions::PUBLISH_RESULT)),
                stage(stages::PUBLISHED, None),
            ],
            lock: Some(LockPolicyInput {
                from_stage: stages::FACULTY_APPROVED.to_owned(),
                reopen_to: stages::SUBMITTED.to_owned(),
                reopen_permission: permissions::REOPEN_RESULT.to_owned(),
            }),
            cross_scope_permissions: vec![
                permissions::APPROVE_RESULT_FACULTY.to_owned(),
                permissions::APPROVE_RESULT_SENATE.to_owned(),
            ],
        }
    }
}

/// Validated lock and reopen policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockPolicy {
    from_index: usize,
    reopen_index: usize,
    reopen_permission: PermissionKey,
}

impl LockPolicy {
    /// Returns the permission gating reopen and lock bypass.
    #[must_use]
    pub fn reopen_permission(&self) -> &PermissionKey {
        &self.reopen_permission
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StageDefinition {
    name: StageName,
    advance_permission: Option<PermissionKey>,
}

/// Validated ordered approval pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDefinition {
    name: NonEmptyString,
    stages: Vec<StageDefinition>,
    positions: HashMap<StageName, usize>,
    lock: Option<LockPolicy>,
    cross_scope_permissions: Vec<PermissionKey>,
}

impl PipelineDefinition {
    /// Creates a validated pipeline. Any error here is a configuration error.
    pub fn new(input: PipelineDefinitionInput) -> AppResult<Self> {
        let PipelineDefinitionInput {
            name,
            stages,
            lock,
            cross_scope_permissions,
        } = input;

        let name = NonEmptyString::new(name)
            .map_err(|_| AppError::Validation("pipeline name must not be empty".to_owned()))?;

        if stages.len() < 2 {
            return Err(AppError::Validation(format!(
                "pipeline '{name}' must declare at least two stages"
            )));
        }

        let terminal_index = stages.len() - 1;
        let mut definitions = Vec::with_capacity(stages.len());
        let mut positions = HashMap::with_capacity(stages.len());

        for (index, stage) in stages.into_iter().enumerate() {
            let stage_name = StageName::new(stage.name)?;
            if positions.insert(stage_name.clone(), index).is_some() {
                return Err(AppError::Validation(format!(
                    "pipeline '{name}' declares stage '{stage_name}' more than once"
                )));
            }

            let advance_permission = stage
                .advance_permission
                .map(PermissionKey::new)
                .transpose()?;
            match (&advance_permission, index == terminal_index) {
                (None, false) => {
                    return Err(AppError::Validation(format!(
                        "stage '{stage_name}' in pipeline '{name}' has no required permission"
                    )));
                }
                (Some(_), true) => {
                    return Err(AppError::Validation(format!(
                        "terminal stage '{stage_name}' in pipeline '{name}' cannot declare an advance permission"
                    )));
                }
                _ => {}
            }

            definitions.push(StageDefinition {
                name: stage_name,
                advance_permission,
            });
        }

        let lock = lock
            .map(|policy| validate_lock_policy(&name, &definitions, &positions, policy))
            .transpose()?;

        let mut seen = HashSet::new();
        let cross_scope_permissions = cross_scope_permissions
            .into_iter()
            .map(PermissionKey::new)
            .collect::<AppResult<Vec<_>>>()?
            .into_iter()
            .filter(|key| seen.insert(key.clone()))
            .collect();

        Ok(Self {
            name,
            stages: definitions,
            positions,
            lock,
            cross_scope_permissions,
        })
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns stage names in order.
    pub fn stages(&self) -> impl Iterator<Item = &StageName> {
        self.stages.iter().map(|stage| &stage.name)
    }

    /// Returns the initial stage.
    #[must_use]
    pub fn initial_stage(&self) -> &StageName {
        &self.stages[0].name
    }

    /// Returns the terminal stage.
    #[must_use]
    pub fn terminal_stage(&self) -> &StageName {
        &self.stages[self.stages.len() - 1].name
    }

    /// Returns the zero-based position of a stage.
    #[must_use]
    pub fn position(&self, stage: &StageName) -> Option<usize> {
        self.positions.get(stage).copied()
    }

    /// Returns whether the stage is terminal.
    #[must_use]
    pub fn is_terminal(&self, stage: &StageName) -> bool {
        stage == self.terminal_stage()
    }

    /// Returns the stage directly after `stage`.
    #[must_use]
    pub fn next_stage(&self, stage: &StageName) -> Option<&StageName> {
        let index = self.position(stage)?;
        self.stages.get(index + 1).map(|next| &next.name)
    }

    /// Returns the permission required to advance out of `stage`.
    #[must_use]
    pub fn required_permission(&self, stage: &StageName) -> Option<&PermissionKey> {
        let index = self.position(stage)?;
        self.stages[index].advance_permission.as_ref()
    }

    /// Returns whether `stage` is at or beyond the lock boundary.
    #[must_use]
    pub fn is_locked(&self, stage: &StageName) -> bool {
        match (&self.lock, self.position(stage)) {
            (Some(lock), Some(index)) => index >= lock.from_index,
            _ => false,
        }
    }

    /// Returns the lock policy, if the pipeline declares one.
    #[must_use]
    pub fn lock_policy(&self) -> Option<&LockPolicy> {
        self.lock.as_ref()
    }

    /// Returns the stage a reopened case returns to.
    #[must_use]
    pub fn reopen_target(&self) -> Option<&StageName> {
        self.lock
            .as_ref()
            .map(|lock| &self.stages[lock.reopen_index].name)
    }

    /// Returns permissions that lift the department scope rule.
    #[must_use]
    pub fn cross_scope_permissions(&self) -> &[PermissionKey] {
        &self.cross_scope_permissions
    }
}

fn validate_lock_policy(
    pipeline_name: &NonEmptyString,
    stages: &[StageDefinition],
    positions: &HashMap<StageName, usize>,
    policy: LockPolicyInput,
) -> AppResult<LockPolicy> {
    let lookup = |value: String, field: &str| -> AppResult<usize> {
        let stage = StageName::new(value)?;
        positions.get(&stage).copied().ok_or_else(|| {
            AppError::Validation(format!(
                "lock {field} '{stage}' is not a stage of pipeline '{pipeline_name}'"
            ))
        })
    };

    let from_index = lookup(policy.from_stage, "from_stage")?;
    if from_index == 0 {
        return Err(AppError::Validation(format!(
            "pipeline '{pipeline_name}' cannot lock its initial stage"
        )));
    }

    let reopen_index = lookup(policy.reopen_to, "reopen_to")?;
    if reopen_index >= from_index {
        return Err(AppError::Validation(format!(
            "pipeline '{pipeline_name}' must reopen to a stage before the lock boundary"
        )));
    }

    let reopen_permission = PermissionKey::new(policy.reopen_permission)?;
    if stages
        .iter()
        .any(|stage| stage.advance_permission.as_ref() == Some(&reopen_permission))
    {
        return Err(AppError::Validation(format!(
            "reopen permission '{reopen_permission}' must differ from every transition permission"
        )));
    }

    Ok(LockPolicy {
        from_index,
        reopen_index,
        reopen_permission,
    })
}
