use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use stagegate_application::{
    AuditLogRepository, CaseListQuery, PermissionAdminService, PermissionEngine,
    TransitionAuditQuery, WorkflowEngine, WorkflowError,
};
use stagegate_core::{AppError, AppResult};
use stagegate_domain::{CaseId, DepartmentId, RoleId, StaffId, StageName};

/// One step of an operator script.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ScriptCommand {
    Resolve {
        staff_id: StaffId,
        permission_key: String,
    },
    GrantRole {
        actor_id: StaffId,
        role_id: RoleId,
        permission_key: String,
        allowed: bool,
    },
    SetOverride {
        actor_id: StaffId,
        staff_id: StaffId,
        permission_key: String,
        allowed: bool,
    },
    ClearOverride {
        actor_id: StaffId,
        staff_id: StaffId,
        permission_key: String,
    },
    ToggleModuleGroup {
        actor_id: StaffId,
        role_id: RoleId,
        module: String,
        allowed: bool,
    },
    EffectivePermissions {
        actor_id: StaffId,
        staff_id: StaffId,
        #[serde(default)]
        module: Option<String>,
    },
    OpenCase {
        actor_id: StaffId,
        owner_department_id: DepartmentId,
        /// Name later steps may use in place of the generated case id.
        #[serde(default)]
        alias: Option<String>,
    },
    Advance {
        actor_id: StaffId,
        case: String,
    },
    Reopen {
        actor_id: StaffId,
        case: String,
    },
    TransitionTo {
        actor_id: StaffId,
        case: String,
        target_stage: StageName,
    },
    GetCase {
        case: String,
    },
    ListCases {
        #[serde(default)]
        owner_department_id: Option<DepartmentId>,
        #[serde(default)]
        stage: Option<StageName>,
    },
    TransitionAudit {
        #[serde(default)]
        case: Option<String>,
        #[serde(default)]
        overrides_only: bool,
    },
    FlushAudit,
}

impl ScriptCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Resolve { .. } => "resolve",
            Self::GrantRole { .. } => "grant_role",
            Self::SetOverride { .. } => "set_override",
            Self::ClearOverride { .. } => "clear_override",
            Self::ToggleModuleGroup { .. } => "toggle_module_group",
            Self::EffectivePermissions { .. } => "effective_permissions",
            Self::OpenCase { .. } => "open_case",
            Self::Advance { .. } => "advance",
            Self::Reopen { .. } => "reopen",
            Self::TransitionTo { .. } => "transition_to",
            Self::GetCase { .. } => "get_case",
            Self::ListCases { .. } => "list_cases",
            Self::TransitionAudit { .. } => "transition_audit",
            Self::FlushAudit => "flush_audit",
        }
    }
}

pub fn load_script(path: &Path) -> AppResult<Vec<ScriptCommand>> {
    let contents = std::fs::read_to_string(path).map_err(|error| {
        AppError::Validation(format!(
            "failed to read script file '{}': {error}",
            path.display()
        ))
    })?;

    serde_json::from_str(&contents)
        .map_err(|error| AppError::Validation(format!("invalid script file: {error}")))
}

/// Outcome of a rejected step.
#[derive(Debug)]
pub struct StepFailure {
    pub kind: &'static str,
    pub message: String,
}

impl From<AppError> for StepFailure {
    fn from(error: AppError) -> Self {
        let kind = match &error {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::Internal(_) => "internal",
        };

        Self {
            kind,
            message: error.to_string(),
        }
    }
}

impl From<WorkflowError> for StepFailure {
    fn from(error: WorkflowError) -> Self {
        Self {
            kind: error.kind().as_str(),
            message: error.to_string(),
        }
    }
}

/// Replays script commands against the engines.
pub struct ScriptRunner {
    permissions: PermissionEngine,
    admin: PermissionAdminService,
    workflow: WorkflowEngine,
    audit_log: Arc<dyn AuditLogRepository>,
    aliases: HashMap<String, CaseId>,
}

impl ScriptRunner {
    pub fn new(
        permissions: PermissionEngine,
        admin: PermissionAdminService,
        workflow: WorkflowEngine,
        audit_log: Arc<dyn AuditLogRepository>,
    ) -> Self {
        Self {
            permissions,
            admin,
            workflow,
            audit_log,
            aliases: HashMap::new(),
        }
    }

    pub async fn run(&mut self, command: ScriptCommand) -> Result<Value, StepFailure> {
        match command {
            ScriptCommand::Resolve {
                staff_id,
                permission_key,
            } => {
                let allowed = self
                    .permissions
                    .resolve(&staff_id, permission_key.as_str())
                    .await;
                Ok(json!({ "allowed": allowed }))
            }
            ScriptCommand::GrantRole {
                actor_id,
                role_id,
                permission_key,
                allowed,
            } => {
                self.admin
                    .grant_role(&actor_id, &role_id, permission_key.as_str(), allowed)
                    .await?;
                Ok(json!({ "saved": true }))
            }
            ScriptCommand::SetOverride {
                actor_id,
                staff_id,
                permission_key,
                allowed,
            } => {
                self.admin
                    .set_override(&actor_id, &staff_id, permission_key.as_str(), allowed)
                    .await?;
                Ok(json!({ "saved": true }))
            }
            ScriptCommand::ClearOverride {
                actor_id,
                staff_id,
                permission_key,
            } => {
                let removed = self
                    .admin
                    .clear_override(&actor_id, &staff_id, permission_key.as_str())
                    .await?;
                Ok(json!({ "removed": removed }))
            }
            ScriptCommand::ToggleModuleGroup {
                actor_id,
                role_id,
                module,
                allowed,
            } => {
                let updated = self
                    .admin
                    .toggle_module_group(&actor_id, &role_id, module.as_str(), allowed)
                    .await?;
                Ok(json!({ "updated": updated }))
            }
            ScriptCommand::EffectivePermissions {
                actor_id,
                staff_id,
                module,
            } => {
                let rows = self.admin.effective_permissions(&actor_id, &staff_id).await?;
                let rows: Vec<Value> = rows
                    .iter()
                    .filter(|row| {
                        module
                            .as_deref()
                            .is_none_or(|module| row.module.as_str() == module)
                    })
                    .map(|row| {
                        json!({
                            "key": row.key.as_str(),
                            "module": row.module.as_str(),
                            "state": row.state.as_str(),
                            "allowed": row.state.is_allowed(),
                        })
                    })
                    .collect();
                Ok(Value::Array(rows))
            }
            ScriptCommand::OpenCase {
                actor_id,
                owner_department_id,
                alias,
            } => {
                let case = self
                    .workflow
                    .open_case(&actor_id, &owner_department_id)
                    .await?;
                if let Some(alias) = alias {
                    self.aliases.insert(alias, case.id().clone());
                }
                to_value(&case)
            }
            ScriptCommand::Advance { actor_id, case } => {
                let case_id = self.case_id(&case)?;
                let case = self.workflow.advance(&case_id, &actor_id).await?;
                to_value(&case)
            }
            ScriptCommand::Reopen { actor_id, case } => {
                let case_id = self.case_id(&case)?;
                let case = self.workflow.reopen(&case_id, &actor_id).await?;
                to_value(&case)
            }
            ScriptCommand::TransitionTo {
                actor_id,
                case,
                target_stage,
            } => {
                let case_id = self.case_id(&case)?;
                let case = self
                    .workflow
                    .transition_to(&case_id, &actor_id, &target_stage)
                    .await?;
                to_value(&case)
            }
            ScriptCommand::GetCase { case } => {
                let case_id = self.case_id(&case)?;
                let case = self.workflow.get_case(&case_id).await?;
                to_value(&case)
            }
            ScriptCommand::ListCases {
                owner_department_id,
                stage,
            } => {
                let cases = self
                    .workflow
                    .list_cases(CaseListQuery {
                        owner_department_id,
                        stage,
                    })
                    .await?;
                to_value(&cases)
            }
            ScriptCommand::TransitionAudit {
                case,
                overrides_only,
            } => {
                let case_id = case.as_deref().map(|case| self.case_id(case)).transpose()?;
                let events = self
                    .audit_log
                    .list_transition_events(TransitionAuditQuery {
                        case_id,
                        overrides_only,
                        ..TransitionAuditQuery::default()
                    })
                    .await?;
                to_value(&events)
            }
            ScriptCommand::FlushAudit => {
                let delivered = self.workflow.flush_pending_audit().await
                    + self.admin.flush_pending_audit().await;
                Ok(json!({
                    "delivered": delivered,
                    "pending": self.workflow.pending_audit_count()
                        + self.admin.pending_audit_count(),
                }))
            }
        }
    }

    fn case_id(&self, reference: &str) -> Result<CaseId, StepFailure> {
        if let Some(case_id) = self.aliases.get(reference) {
            return Ok(case_id.clone());
        }

        Ok(CaseId::new(reference)?)
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, StepFailure> {
    serde_json::to_value(value).map_err(|error| StepFailure {
        kind: "internal",
        message: format!("failed to serialize step output: {error}"),
    })
}
