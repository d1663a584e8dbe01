use std::collections::HashMap;

use async_trait::async_trait;
use stagegate_application::{CaseListQuery, CaseRepository};
use stagegate_core::{AppError, AppResult};
use stagegate_domain::{Case, CaseId};
use tokio::sync::RwLock;

/// In-memory case store with optimistic version checks.
#[derive(Debug, Default)]
pub struct InMemoryCaseRepository {
    cases: RwLock<HashMap<CaseId, Case>>,
}

impl InMemoryCaseRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CaseRepository for InMemoryCaseRepository {
    async fn insert_case(&self, case: Case) -> AppResult<()> {
        let mut cases = self.cases.write().await;

        if cases.contains_key(case.id()) {
            return Err(AppError::Conflict(format!(
                "case '{}' already exists",
                case.id()
            )));
        }

        cases.insert(case.id().clone(), case);
        Ok(())
    }

    async fn find_case(&self, case_id: &CaseId) -> AppResult<Option<Case>> {
        Ok(self.cases.read().await.get(case_id).cloned())
    }

    async fn save_case(&self, case: Case, expected_version: u64) -> AppResult<()> {
        let mut cases = self.cases.write().await;
        let Some(stored) = cases.get_mut(case.id()) else {
            return Err(AppError::NotFound(format!(
                "case '{}' does not exist",
                case.id()
            )));
        };

        if stored.version() != expected_version {
            return Err(AppError::Conflict(format!(
                "case '{}' is at version {} but version {expected_version} was expected",
                case.id(),
                stored.version()
            )));
        }

        *stored = case;
        Ok(())
    }

    async fn list_cases(&self, query: CaseListQuery) -> AppResult<Vec<Case>> {
        let cases = self.cases.read().await;

        let mut values: Vec<Case> = cases
            .values()
            .filter(|case| query.matches(case))
            .cloned()
            .collect();
        values.sort_by(|left, right| {
            left.created_at()
                .cmp(&right.created_at())
                .then_with(|| left.id().cmp(right.id()))
        });

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use stagegate_application::{CaseListQuery, CaseRepository};
    use stagegate_core::AppError;
    use stagegate_domain::{
        Case, CaseId, DepartmentId, StaffId, StageName, TransitionKind, result_stages,
    };

    use super::InMemoryCaseRepository;

    fn case(id: &str, department: &str, minute: u32) -> Case {
        Case::open(
            CaseId::new(id).unwrap_or_else(|_| unreachable!()),
            DepartmentId::new(department).unwrap_or_else(|_| unreachable!()),
            StageName::new(result_stages::DRAFT).unwrap_or_else(|_| unreachable!()),
            StaffId::new("s1").unwrap_or_else(|_| unreachable!()),
            Utc.with_ymd_and_hms(2026, 1, 1, 9, minute, 0)
                .single()
                .unwrap_or_else(|| unreachable!()),
        )
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_ids() {
        let repository = InMemoryCaseRepository::new();
        assert!(repository.insert_case(case("c1", "dept_cs", 0)).await.is_ok());

        let duplicate = repository.insert_case(case("c1", "dept_me", 1)).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn save_checks_expected_version() {
        let repository = InMemoryCaseRepository::new();
        let original = case("c1", "dept_cs", 0);
        assert!(repository.insert_case(original.clone()).await.is_ok());

        let advanced = original.with_transition(
            StageName::new(result_stages::SUBMITTED).unwrap_or_else(|_| unreachable!()),
            StaffId::new("s1").unwrap_or_else(|_| unreachable!()),
            TransitionKind::Advance,
            Utc::now(),
        );
        assert!(repository.save_case(advanced.clone(), 0).await.is_ok());

        let stale = repository.save_case(advanced, 0).await;
        assert!(matches!(stale, Err(AppError::Conflict(_))));

        let stored = repository.find_case(original.id()).await.unwrap_or_default();
        assert_eq!(stored.map(|case| case.history().len()), Some(1));
    }

    #[tokio::test]
    async fn save_unknown_case_is_not_found() {
        let repository = InMemoryCaseRepository::new();
        let result = repository.save_case(case("c9", "dept_cs", 0), 0).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_filters_by_department_in_creation_order() {
        let repository = InMemoryCaseRepository::new();
        for value in [
            case("c2", "dept_cs", 5),
            case("c1", "dept_cs", 1),
            case("c3", "dept_me", 0),
        ] {
            assert!(repository.insert_case(value).await.is_ok());
        }

        let listed = repository
            .list_cases(CaseListQuery {
                owner_department_id: Some(
                    DepartmentId::new("dept_cs").unwrap_or_else(|_| unreachable!()),
                ),
                stage: None,
            })
            .await
            .unwrap_or_default();
        let ids: Vec<&str> = listed.iter().map(|case| case.id().as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }
}
