use std::sync::Arc;

use stagegate_core::AppError;
use stagegate_domain::{EffectivePermissionState, StaffStatus};

use crate::PermissionEngine;
use crate::test_support::{FakeDirectory, build_permission_engine, role_id, staff_id};

fn directory() -> FakeDirectory {
    FakeDirectory::default()
        .with_role("role_academic_staff")
        .with_department("dept_cs")
        .with_staff("s1", "role_academic_staff", "dept_cs")
        .with_staff("s2", "role_academic_staff", "dept_cs")
        .with_staff_status("s3", "role_academic_staff", "dept_cs", StaffStatus::Inactive)
        .with_staff("orphan", "role_removed", "dept_cs")
        .with_permission("submit_result", "Exams")
        .with_permission("publish_result", "Exams")
        .with_permission("approve_payroll", "Finance")
}

#[tokio::test]
async fn override_deny_wins_over_role_allow() {
    let (engine, _) = build_permission_engine(directory()).await;
    let role = role_id("role_academic_staff");
    let staff = staff_id("s1");

    assert!(engine.grant_role(&role, "submit_result", true).await.is_ok());
    assert!(engine.resolve(&staff, "submit_result").await);

    assert!(engine.set_override(&staff, "submit_result", false).await.is_ok());
    assert!(!engine.resolve(&staff, "submit_result").await);
    assert!(engine.resolve(&staff_id("s2"), "submit_result").await);
}

#[tokio::test]
async fn override_allow_wins_over_role_deny() {
    let (engine, _) = build_permission_engine(directory()).await;
    let staff = staff_id("s1");

    assert!(
        engine
            .grant_role(&role_id("role_academic_staff"), "publish_result", false)
            .await
            .is_ok()
    );
    assert!(engine.set_override(&staff, "publish_result", true).await.is_ok());

    assert!(engine.resolve(&staff, "publish_result").await);
    assert!(!engine.resolve(&staff_id("s2"), "publish_result").await);
}

#[tokio::test]
async fn missing_grants_and_unknown_references_deny() {
    let (engine, _) = build_permission_engine(directory()).await;

    assert!(!engine.resolve(&staff_id("s1"), "submit_result").await);
    assert!(!engine.resolve(&staff_id("ghost"), "submit_result").await);
    assert!(!engine.resolve(&staff_id("s1"), "no_such_permission").await);
    assert!(!engine.resolve(&staff_id("s1"), "Not A Key").await);
}

#[tokio::test]
async fn clearing_override_twice_reverts_to_role_default() {
    let (engine, repository) = build_permission_engine(directory()).await;
    let staff = staff_id("s1");

    assert!(
        engine
            .grant_role(&role_id("role_academic_staff"), "submit_result", true)
            .await
            .is_ok()
    );
    assert!(engine.set_override(&staff, "submit_result", false).await.is_ok());

    let first = engine.clear_override(&staff, "submit_result").await;
    let second = engine.clear_override(&staff, "submit_result").await;
    assert!(matches!(first, Ok(true)));
    assert!(matches!(second, Ok(false)));

    assert!(engine.resolve(&staff, "submit_result").await);
    assert!(repository.overrides.lock().await.is_empty());
}

#[tokio::test]
async fn grants_are_upserted_not_duplicated() {
    let (engine, repository) = build_permission_engine(directory()).await;
    let role = role_id("role_academic_staff");

    assert!(engine.grant_role(&role, "submit_result", true).await.is_ok());
    assert!(engine.grant_role(&role, "submit_result", false).await.is_ok());

    assert_eq!(repository.role_grants.lock().await.len(), 1);
    assert_eq!(engine.snapshot().role_grant_count(), 1);
    assert!(!engine.resolve(&staff_id("s1"), "submit_result").await);
}

#[tokio::test]
async fn mutations_reject_unknown_references_without_change() {
    let (engine, repository) = build_permission_engine(directory()).await;

    let unknown_role = engine
        .grant_role(&role_id("role_missing"), "submit_result", true)
        .await;
    assert!(matches!(unknown_role, Err(AppError::NotFound(_))));

    let unknown_permission = engine
        .grant_role(&role_id("role_academic_staff"), "no_such_permission", true)
        .await;
    assert!(matches!(unknown_permission, Err(AppError::NotFound(_))));

    let unknown_staff = engine
        .set_override(&staff_id("ghost"), "submit_result", true)
        .await;
    assert!(matches!(unknown_staff, Err(AppError::NotFound(_))));

    let unknown_clear = engine.clear_override(&staff_id("ghost"), "submit_result").await;
    assert!(matches!(unknown_clear, Err(AppError::NotFound(_))));

    assert!(repository.role_grants.lock().await.is_empty());
    assert!(repository.overrides.lock().await.is_empty());
}

#[tokio::test]
async fn module_toggle_matches_sequential_grants() {
    let (toggled, _) = build_permission_engine(directory()).await;
    let (sequential, _) = build_permission_engine(directory()).await;
    let role = role_id("role_academic_staff");

    let count = toggled.toggle_module_group(&role, "Exams", true).await;
    assert!(matches!(count, Ok(2)));

    assert!(sequential.grant_role(&role, "submit_result", true).await.is_ok());
    assert!(sequential.grant_role(&role, "publish_result", true).await.is_ok());

    let left = toggled.effective_permissions(&staff_id("s1")).await;
    let right = sequential.effective_permissions(&staff_id("s1")).await;
    assert!(left.is_ok());
    assert_eq!(left.unwrap_or_default(), right.unwrap_or_default());
    assert!(!toggled.resolve(&staff_id("s1"), "approve_payroll").await);
}

#[tokio::test]
async fn module_toggle_with_unknown_module_touches_nothing() {
    let (engine, repository) = build_permission_engine(directory()).await;

    let count = engine
        .toggle_module_group(&role_id("role_academic_staff"), "Library", true)
        .await;
    assert!(matches!(count, Ok(0)));
    assert!(repository.role_grants.lock().await.is_empty());
}

#[tokio::test]
async fn effective_permissions_classify_every_catalog_entry() {
    let (engine, _) = build_permission_engine(directory()).await;
    let staff = staff_id("s1");
    let role = role_id("role_academic_staff");

    assert!(engine.grant_role(&role, "submit_result", true).await.is_ok());
    assert!(engine.grant_role(&role, "publish_result", true).await.is_ok());
    assert!(engine.set_override(&staff, "publish_result", false).await.is_ok());
    assert!(engine.set_override(&staff, "approve_payroll", true).await.is_ok());

    let effective = engine.effective_permissions(&staff).await;
    assert!(effective.is_ok());
    let states: Vec<(String, EffectivePermissionState)> = effective
        .unwrap_or_default()
        .into_iter()
        .map(|row| (row.key.as_str().to_owned(), row.state))
        .collect();

    assert_eq!(
        states,
        vec![
            (
                "approve_payroll".to_owned(),
                EffectivePermissionState::OverrideAllow
            ),
            (
                "publish_result".to_owned(),
                EffectivePermissionState::OverrideDeny
            ),
            (
                "submit_result".to_owned(),
                EffectivePermissionState::InheritedAllow
            ),
        ]
    );

    let exams = engine
        .effective_permissions_for_module(&staff_id("s2"), "Exams")
        .await;
    assert!(exams.is_ok());
    assert!(
        exams
            .unwrap_or_default()
            .iter()
            .all(|row| row.state == EffectivePermissionState::InheritedAllow)
    );
}

#[tokio::test]
async fn effective_permissions_for_unknown_staff_is_not_found() {
    let (engine, _) = build_permission_engine(directory()).await;
    let result = engine.effective_permissions(&staff_id("ghost")).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn inactive_staff_and_unresolved_roles_are_denied() {
    let (engine, _) = build_permission_engine(directory()).await;

    assert!(
        engine
            .grant_role(&role_id("role_academic_staff"), "submit_result", true)
            .await
            .is_ok()
    );
    assert!(!engine.resolve(&staff_id("s3"), "submit_result").await);

    assert!(engine.set_override(&staff_id("orphan"), "publish_result", true).await.is_ok());
    assert!(engine.resolve(&staff_id("orphan"), "publish_result").await);
    assert!(!engine.resolve(&staff_id("orphan"), "submit_result").await);
}

#[tokio::test]
async fn snapshots_are_isolated_from_later_writes() {
    let (engine, _) = build_permission_engine(directory()).await;
    let staff = staff_id("s1");
    let role = role_id("role_academic_staff");

    assert!(engine.grant_role(&role, "submit_result", true).await.is_ok());
    let snapshot = engine.snapshot();
    assert!(engine.grant_role(&role, "submit_result", false).await.is_ok());

    assert!(engine.resolve_with(&snapshot, &staff, "submit_result").await);
    assert!(!engine.resolve(&staff, "submit_result").await);
}

#[tokio::test]
async fn reload_rebuilds_index_from_repository() {
    let (engine, repository) = build_permission_engine(directory()).await;
    assert!(
        engine
            .grant_role(&role_id("role_academic_staff"), "submit_result", true)
            .await
            .is_ok()
    );

    let reloaded = PermissionEngine::load(Arc::new(directory()), repository).await;
    assert!(reloaded.is_ok());
    let reloaded = reloaded.unwrap_or_else(|_| unreachable!());
    assert!(reloaded.resolve(&staff_id("s1"), "submit_result").await);
    assert!(reloaded.reload().await.is_ok());
    assert_eq!(reloaded.snapshot().role_grant_count(), 1);
}

#[tokio::test]
async fn concurrent_readers_observe_consistent_values() {
    let (engine, _) = build_permission_engine(directory()).await;
    let role = role_id("role_academic_staff");
    assert!(engine.grant_role(&role, "submit_result", true).await.is_ok());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.resolve(&staff_id("s1"), "submit_result").await
        }));
    }

    for handle in handles {
        assert!(matches!(handle.await, Ok(true)));
    }
}
