use async_trait::async_trait;
use stagegate_application::{
    AuditEvent, AuditLogRepository, AuditRepository, TransitionAuditEvent, TransitionAuditQuery,
};
use stagegate_core::AppResult;
use tokio::sync::RwLock;
use tracing::debug;

/// Append-only in-memory audit sink that also serves audit reads.
#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    events: RwLock<Vec<AuditEvent>>,
    transitions: RwLock<Vec<TransitionAuditEvent>>,
}

impl InMemoryAuditRepository {
    /// Creates an empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        debug!(
            actor_id = %event.actor_id,
            action = event.action.as_str(),
            resource_id = %event.resource_id,
            "audit event appended"
        );
        self.events.write().await.push(event);
        Ok(())
    }

    async fn append_transition(&self, event: TransitionAuditEvent) -> AppResult<()> {
        debug!(
            case_id = %event.case_id,
            kind = event.kind.as_str(),
            "transition audit event appended"
        );
        self.transitions.write().await.push(event);
        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditRepository {
    async fn list_transition_events(
        &self,
        query: TransitionAuditQuery,
    ) -> AppResult<Vec<TransitionAuditEvent>> {
        Ok(self
            .transitions
            .read()
            .await
            .iter()
            .filter(|event| query.matches(event))
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn list_events(&self, limit: usize, offset: usize) -> AppResult<Vec<AuditEvent>> {
        Ok(self
            .events
            .read()
            .await
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}
