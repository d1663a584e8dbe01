use stagegate_application::{
    CaseListQuery, CaseRepository, EntityDirectory, PermissionGrantRepository,
};
use stagegate_core::AppError;
use stagegate_domain::{PermissionKey, StaffId};

use super::{InMemoryStore, SeedData};

const SEED: &str = r#"{
    "departments": [
        { "id": "dept_cs", "name": "Computer Science" },
        { "id": "dept_me", "name": "Mechanical Engineering" }
    ],
    "roles": [
        { "id": "role_academic_staff", "name": "Academic Staff" },
        { "id": "role_hod", "name": "Head of Department" }
    ],
    "permissions": [
        { "id": "perm_submit", "key": "submit_result", "module": "Exams" },
        { "id": "perm_review", "key": "review_result_department", "module": "Exams" }
    ],
    "staff": [
        { "id": "s1", "role_id": "role_academic_staff", "department_id": "dept_cs" },
        { "id": "s9", "role_id": "role_retired", "department_id": "dept_cs", "status": "inactive" }
    ],
    "role_grants": [
        { "role_id": "role_academic_staff", "permission_key": "submit_result", "allowed": true },
        { "role_id": "role_hod", "permission_key": "review_result_department", "allowed": true }
    ],
    "overrides": [
        { "staff_id": "s1", "permission_key": "review_result_department", "allowed": false }
    ],
    "cases": [
        {
            "id": "case_cs_2026",
            "owner_department_id": "dept_cs",
            "stage": "Draft",
            "created_by": "s1",
            "created_at": "2026-01-10T09:00:00Z"
        }
    ]
}"#;

#[tokio::test]
async fn seed_populates_every_adapter() {
    let seed = SeedData::from_json_str(SEED);
    assert!(seed.is_ok());

    let seeded = InMemoryStore::seeded(seed.unwrap_or_else(|_| unreachable!())).await;
    assert!(seeded.is_ok());
    let (store, summary) = seeded.unwrap_or_else(|_| unreachable!());

    assert_eq!(summary.departments, 2);
    assert_eq!(summary.staff, 2);
    assert_eq!(summary.role_grants, 2);
    assert_eq!(summary.overrides, 1);
    assert_eq!(summary.cases, 1);

    let inactive = store
        .directory
        .find_staff(&StaffId::new("s9").unwrap_or_else(|_| unreachable!()))
        .await
        .unwrap_or_default();
    assert_eq!(inactive.map(|staff| staff.is_active()), Some(false));

    let key = PermissionKey::new("submit_result").unwrap_or_else(|_| unreachable!());
    let permission = store
        .directory
        .find_permission_by_key(&key)
        .await
        .unwrap_or_default();
    assert_eq!(
        permission.map(|permission| permission.id().as_str().to_owned()),
        Some("perm_submit".to_owned())
    );

    assert_eq!(store.grants.list_overrides().await.unwrap_or_default().len(), 1);
    assert_eq!(
        store
            .cases
            .list_cases(CaseListQuery::default())
            .await
            .unwrap_or_default()
            .len(),
        1
    );
}

#[tokio::test]
async fn grant_for_unknown_permission_is_rejected() {
    let seed = SeedData::from_json_str(
        r#"{
            "roles": [{ "id": "role_hod", "name": "Head of Department" }],
            "role_grants": [
                { "role_id": "role_hod", "permission_key": "publish_result", "allowed": true }
            ]
        }"#,
    );
    assert!(seed.is_ok());

    let result = InMemoryStore::seeded(seed.unwrap_or_else(|_| unreachable!())).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn case_for_unknown_department_is_rejected() {
    let seed = SeedData::from_json_str(
        r#"{
            "cases": [{
                "id": "case_x",
                "owner_department_id": "dept_missing",
                "stage": "Draft",
                "created_by": "s1",
                "created_at": "2026-01-10T09:00:00Z"
            }]
        }"#,
    );
    assert!(seed.is_ok());

    let result = InMemoryStore::seeded(seed.unwrap_or_else(|_| unreachable!())).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[test]
fn malformed_seed_is_a_validation_error() {
    let result = SeedData::from_json_str(
        r#"{ "permissions": [{ "id": "p1", "key": "Bad Key", "module": "Exams" }] }"#,
    );
    assert!(matches!(result, Err(AppError::Validation(_))));
}
