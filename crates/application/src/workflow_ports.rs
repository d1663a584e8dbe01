use async_trait::async_trait;

use stagegate_core::AppResult;
use stagegate_domain::{Case, CaseId, DepartmentId, StageName};

/// Query parameters for case listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseListQuery {
    /// Optional owning department filter.
    pub owner_department_id: Option<DepartmentId>,
    /// Optional current stage filter.
    pub stage: Option<StageName>,
}

impl CaseListQuery {
    /// Returns whether a case passes every filter of this query.
    #[must_use]
    pub fn matches(&self, case: &Case) -> bool {
        self.owner_department_id
            .as_ref()
            .is_none_or(|department_id| department_id == case.owner_department_id())
            && self.stage.as_ref().is_none_or(|stage| stage == case.stage())
    }
}

/// Repository port for workflow cases.
#[async_trait]
pub trait CaseRepository: Send + Sync {
    /// Inserts a new case. Fails with `Conflict` when the id is taken.
    async fn insert_case(&self, case: Case) -> AppResult<()>;

    /// Finds a case by identifier.
    async fn find_case(&self, case_id: &CaseId) -> AppResult<Option<Case>>;

    /// Replaces a stored case when its stored version equals `expected_version`.
    ///
    /// Fails with `Conflict` on a version mismatch and `NotFound` when the
    /// case does not exist. Stage and history are written together.
    async fn save_case(&self, case: Case, expected_version: u64) -> AppResult<()>;

    /// Lists cases matching the query, ordered by creation time.
    async fn list_cases(&self, query: CaseListQuery) -> AppResult<Vec<Case>>;
}
