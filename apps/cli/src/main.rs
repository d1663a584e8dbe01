//! Stagegate operator CLI.
//!
//! Seeds the in-memory store, builds the permission and workflow engines and
//! replays a JSON command script, printing one JSON line per step.

#![forbid(unsafe_code)]

mod cli_config;
mod script;

use stagegate_application::{PermissionAdminService, PermissionEngine, WorkflowEngine};
use stagegate_core::AppError;
use stagegate_domain::PipelineDefinition;
use stagegate_infrastructure::{InMemoryStore, SeedData};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli_config::CliConfig;
use crate::script::{ScriptRunner, load_script};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = CliConfig::load()?;
    let pipeline = PipelineDefinition::new(config.pipeline_input()?)?;
    let (store, summary) = InMemoryStore::seeded(SeedData::from_file(&config.seed_file)?).await?;

    let permissions = PermissionEngine::load(store.directory.clone(), store.grants.clone()).await?;
    let admin = PermissionAdminService::new(permissions.clone(), store.audit.clone())?
        .with_admin_permission(config.admin_permission.as_str())?;
    let workflow = WorkflowEngine::new(
        pipeline,
        permissions.clone(),
        store.directory.clone(),
        store.cases.clone(),
        store.audit.clone(),
    );
    workflow.verify_configuration().await?;

    info!(
        pipeline = workflow.pipeline().name(),
        staff = summary.staff,
        cases = summary.cases,
        "stagegate-cli started"
    );

    let commands = load_script(&config.script_file)?;
    let mut runner = ScriptRunner::new(
        permissions,
        admin.clone(),
        workflow.clone(),
        store.audit.clone(),
    );
    let mut failed_steps = 0_usize;

    for (step, command) in commands.into_iter().enumerate() {
        let name = command.name();
        match runner.run(command).await {
            Ok(output) => {
                info!(step, command = name, "step succeeded");
                println!(
                    "{}",
                    serde_json::json!({ "step": step, "command": name, "ok": output })
                );
            }
            Err(failure) => {
                failed_steps = failed_steps.saturating_add(1);
                warn!(
                    step,
                    command = name,
                    reason = failure.kind,
                    error = %failure.message,
                    "step rejected"
                );
                println!(
                    "{}",
                    serde_json::json!({
                        "step": step,
                        "command": name,
                        "error": { "kind": failure.kind, "message": failure.message },
                    })
                );
            }
        }
    }

    let delivered = workflow.flush_pending_audit().await + admin.flush_pending_audit().await;
    let pending = workflow.pending_audit_count() + admin.pending_audit_count();
    if pending > 0 {
        warn!(pending, "audit events remain undelivered");
    }

    info!(failed_steps, delivered, "stagegate-cli finished");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
