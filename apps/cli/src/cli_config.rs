use std::env;
use std::path::PathBuf;

use stagegate_application::MANAGE_PERMISSIONS;
use stagegate_core::{AppError, AppResult};
use stagegate_domain::PipelineDefinitionInput;

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub seed_file: PathBuf,
    pub pipeline_file: Option<PathBuf>,
    pub script_file: PathBuf,
    pub admin_permission: String,
}

impl CliConfig {
    pub fn load() -> AppResult<Self> {
        let seed_file = PathBuf::from(required_env("STAGEGATE_SEED_FILE")?);
        let pipeline_file = optional_env("STAGEGATE_PIPELINE_FILE").map(PathBuf::from);
        let script_file = env::args()
            .nth(1)
            .or_else(|| optional_env("STAGEGATE_SCRIPT_FILE"))
            .map(PathBuf::from)
            .ok_or_else(|| {
                AppError::Validation(
                    "STAGEGATE_SCRIPT_FILE or a script path argument is required".to_owned(),
                )
            })?;
        let admin_permission = optional_env("STAGEGATE_ADMIN_PERMISSION")
            .unwrap_or_else(|| MANAGE_PERMISSIONS.to_owned());

        Ok(Self {
            seed_file,
            pipeline_file,
            script_file,
            admin_permission,
        })
    }

    /// Reads the configured pipeline, or the result-processing default.
    pub fn pipeline_input(&self) -> AppResult<PipelineDefinitionInput> {
        let Some(path) = self.pipeline_file.as_ref() else {
            return Ok(PipelineDefinitionInput::result_processing());
        };

        let contents = std::fs::read_to_string(path).map_err(|error| {
            AppError::Validation(format!(
                "failed to read pipeline file '{}': {error}",
                path.display()
            ))
        })?;
        serde_json::from_str(&contents)
            .map_err(|error| AppError::Validation(format!("invalid pipeline file: {error}")))
    }
}

fn required_env(name: &str) -> AppResult<String> {
    optional_env(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
