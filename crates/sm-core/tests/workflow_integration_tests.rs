//! End-to-end workflow tests against an in-memory SQLite database.
//!
//! # Running these tests
//!
//! ```bash
//! cargo test -p sm-core --features database --test workflow_integration_tests
//! ```

#![cfg(feature = "database")]

use std::sync::Arc;

use sm_core::db::{
    create_assignment_repository, create_maintenance_repository, create_violation_repository,
    run_migrations, DbPool,
};
use sm_core::{
    default_directory, ActivityFilter, ActivityType, ActorContext, Aes256GcmCipher,
    AssignmentStatus, ChannelType, ComplianceError, ComplianceService, DetailCipher,
    NewViolation, ServiceConfig, Severity, ViolationFilter, ViolationOrigin, ViolationRecord,
    ViolationStatus, DECRYPTION_ERROR_PLACEHOLDER, PLACEHOLDER_TARGET,
};
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

const TEST_KEY: [u8; 32] = [42u8; 32];

/// Creates a migrated in-memory SQLite pool.
async fn create_test_pool() -> DbPool {
    let db_url = format!("sqlite:file:test_workflow_{}?mode=memory&cache=shared", Uuid::new_v4());

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&db_url)
        .await
        .expect("Failed to create pool");

    let pool = DbPool::Sqlite(pool);
    run_migrations(&pool).await.expect("Failed to run migrations");
    pool
}

fn cipher() -> Arc<dyn DetailCipher> {
    Arc::new(Aes256GcmCipher::new(TEST_KEY))
}

async fn service_with(config: ServiceConfig) -> (DbPool, ComplianceService) {
    let pool = create_test_pool().await;
    let service = ComplianceService::from_pool(&pool, cipher(), config);
    (pool, service)
}

/// Leaves exactly one Fax entry in the directory.
async fn single_fax_directory(pool: &DbPool) {
    let DbPool::Sqlite(sqlite) = pool else {
        unreachable!("tests run on sqlite");
    };
    sqlx::query(
        r#"
        INSERT INTO directory_entries (id, channel, display_name, target_value, department, notes)
        VALUES (?, 'fax', 'Regional Laboratory Services', '555-1234', 'Laboratory', '')
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .execute(sqlite)
    .await
    .expect("Failed to insert directory entry");
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_generation_draws_from_directory_or_placeholder() {
    let (pool, service) = service_with(ServiceConfig::default()).await;
    single_fax_directory(&pool).await;
    let admin = ActorContext::admin("admin");

    let summary = service
        .generate_assignments(
            &admin,
            &strings(&["MRN1", "MRN2", "MRN3"]),
            &strings(&["ana", "jordan"]),
        )
        .await
        .unwrap();
    assert_eq!(summary.created_count, 3);

    let assignments = service.list_assignments(&admin).await.unwrap();
    assert_eq!(assignments.len(), 3);
    for assignment in &assignments {
        assert_eq!(assignment.status, AssignmentStatus::Pending);
        assert!(["ana", "jordan"].contains(&assignment.assigned_to.as_str()));
        if assignment.channel == ChannelType::Fax {
            assert_eq!(assignment.expected_target_value, "555-1234");
        } else {
            assert_eq!(assignment.expected_target_value, PLACEHOLDER_TARGET);
        }
    }

    let trail = service.audit_trail(&admin, &ActivityFilter::default()).await.unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action_type, ActivityType::AssignmentsGenerated);
}

#[tokio::test]
async fn test_verification_outcomes_and_encrypted_detail() {
    let (pool, service) = service_with(ServiceConfig::default()).await;
    single_fax_directory(&pool).await;
    let admin = ActorContext::admin("admin");
    let ana = ActorContext::nurse("ana");

    service
        .generate_assignments(&admin, &strings(&["MRN1", "MRN2"]), &strings(&["ana"]))
        .await
        .unwrap();
    let assignments = service.list_assignments(&ana).await.unwrap();
    assert_eq!(assignments.len(), 2);

    let right = &assignments[0];
    let outcome = service
        .complete_assignment(&ana, right.id, &right.expected_target_value.to_uppercase())
        .await
        .unwrap();
    assert_eq!(outcome.status, AssignmentStatus::Completed);
    assert!(outcome.violation_id.is_none());

    let wrong = &assignments[1];
    let outcome = service
        .complete_assignment(&ana, wrong.id, "999-0000")
        .await
        .unwrap();
    assert_eq!(outcome.status, AssignmentStatus::Failed);
    let violation_id = outcome.violation_id.unwrap();

    let again = service.complete_assignment(&ana, wrong.id, "999-0000").await;
    assert!(matches!(again, Err(ComplianceError::InvalidState(_))));

    let mine = service
        .list_violations(&ana, &ViolationFilter::OwnedBy("ana".into()))
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, violation_id);
    assert_eq!(mine[0].origin, ViolationOrigin::NurseVerificationFailure);
    assert!(mine[0].detail.contains("999-0000"));
    assert!(mine[0].deadline.is_some());

    // The stored column holds ciphertext only.
    let DbPool::Sqlite(sqlite) = &pool else {
        unreachable!("tests run on sqlite");
    };
    let (stored,): (String,) =
        sqlx::query_as("SELECT encrypted_detail FROM violations WHERE id = ?")
            .bind(violation_id.to_string())
            .fetch_one(sqlite)
            .await
            .unwrap();
    assert!(!stored.contains("999-0000"));
    assert_eq!(cipher().decrypt(&stored).unwrap(), mine[0].detail);
}

#[tokio::test]
async fn test_trailing_whitespace_policy() {
    let cases = [
        (false, AssignmentStatus::Failed),
        (true, AssignmentStatus::Completed),
    ];
    for (trim, expected) in cases {
        let (pool, service) = service_with(ServiceConfig { trim_submission: trim }).await;
        single_fax_directory(&pool).await;
        let ana = ActorContext::nurse("ana");

        // Retry until the random channel lands on the only populated one.
        let fax = loop {
            service
                .generate_assignments(
                    &ActorContext::admin("admin"),
                    &strings(&["MRN1"]),
                    &strings(&["ana"]),
                )
                .await
                .unwrap();
            let found = service
                .list_assignments(&ana)
                .await
                .unwrap()
                .into_iter()
                .find(|a| a.channel == ChannelType::Fax && a.status == AssignmentStatus::Pending);
            if let Some(assignment) = found {
                break assignment;
            }
        };

        let outcome = service.complete_assignment(&ana, fax.id, "555-1234 ").await.unwrap();
        assert_eq!(outcome.status, expected);
    }
}

#[tokio::test]
async fn test_acknowledge_requires_owner_and_persists() {
    let (pool, service) = service_with(ServiceConfig::default()).await;
    single_fax_directory(&pool).await;

    service
        .generate_assignments(
            &ActorContext::admin("admin"),
            &strings(&["MRN1"]),
            &strings(&["ana"]),
        )
        .await
        .unwrap();
    let ana = ActorContext::nurse("ana");
    let assignment = service.list_assignments(&ana).await.unwrap().remove(0);
    let violation_id = service
        .complete_assignment(&ana, assignment.id, "wrong")
        .await
        .unwrap()
        .violation_id
        .unwrap();

    let jordan = service
        .acknowledge_violation(&ActorContext::nurse("jordan"), violation_id)
        .await;
    assert!(matches!(jordan, Err(ComplianceError::Forbidden(_))));

    let ack = service.acknowledge_violation(&ana, violation_id).await.unwrap();
    assert!(ack.changed);
    assert!(!service.acknowledge_violation(&ana, violation_id).await.unwrap().changed);

    let view = service
        .list_violations(&ana, &ViolationFilter::OwnedBy("ana".into()))
        .await
        .unwrap()
        .remove(0);
    assert_eq!(view.status, ViolationStatus::Acknowledged);
    assert_eq!(view.acknowledged_by.as_deref(), Some("ana"));
    assert!(view.deadline.unwrap().is_acknowledged);

    let admin = ActorContext::admin("admin");
    assert!(service.resolve_violation(&admin, violation_id).await.unwrap().changed);
    assert_eq!(service.reset_violation_statuses(&admin).await.unwrap(), 1);

    let trail = service
        .audit_trail(
            &admin,
            &ActivityFilter {
                action_type: Some(ActivityType::ViolationAcknowledged),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].actor, "ana");
}

#[tokio::test]
async fn test_seeds_and_demo_reset() {
    let (_pool, service) = service_with(ServiceConfig::default()).await;
    let admin = ActorContext::admin("admin");

    assert_eq!(service.seed_directory().await.unwrap(), 25);
    assert_eq!(service.seed_directory().await.unwrap(), 0);
    assert_eq!(service.seed_scanner_findings(&admin).await.unwrap(), 5);
    assert_eq!(service.seed_scanner_findings(&admin).await.unwrap(), 5);
    assert_eq!(service.seed_compliance_findings(&admin).await.unwrap(), 32);
    assert_eq!(service.seed_nurse_incidents(&admin).await.unwrap(), 5);

    let scanner = service
        .list_violations(&ActorContext::nurse("ana"), &ViolationFilter::ScannerOnly)
        .await
        .unwrap();
    assert_eq!(scanner.len(), 5);
    assert!(scanner.iter().all(|v| v.detail != DECRYPTION_ERROR_PLACEHOLDER));

    let organisational = service
        .list_violations(&admin, &ViolationFilter::ExcludeScanner)
        .await
        .unwrap();
    assert_eq!(organisational.len(), 37);
    let incidents: Vec<_> = organisational
        .iter()
        .filter(|v| v.origin == ViolationOrigin::NurseIncident)
        .collect();
    assert_eq!(incidents.len(), 5);
    assert!(incidents.iter().all(|v| v.owning_nurse.is_none()));
    assert!(organisational
        .iter()
        .filter(|v| v.origin == ViolationOrigin::ComplianceSeed)
        .all(|v| v.remediation_deadline.is_some()));

    let summary = service.reset_demo(&admin).await.unwrap();
    assert_eq!(summary.violations_deleted, 42);
    assert_eq!(summary.directory_seeded, 25);

    assert!(service.list_violations(&admin, &ViolationFilter::All).await.unwrap().is_empty());
    assert_eq!(service.list_directory().await.unwrap().len(), 25);
    let trail = service.audit_trail(&admin, &ActivityFilter::default()).await.unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action_type, ActivityType::DemoReset);
}

#[tokio::test]
async fn test_unreadable_detail_shows_placeholder() {
    let pool = create_test_pool().await;
    let admin = ActorContext::admin("admin");

    let writer = ComplianceService::from_pool(&pool, cipher(), ServiceConfig::default());
    writer.seed_scanner_findings(&admin).await.unwrap();

    let reader = ComplianceService::from_pool(
        &pool,
        Arc::new(Aes256GcmCipher::new([7u8; 32])),
        ServiceConfig::default(),
    );
    let views = reader.list_violations(&admin, &ViolationFilter::All).await.unwrap();
    assert_eq!(views.len(), 5);
    assert!(views.iter().all(|v| v.detail == DECRYPTION_ERROR_PLACEHOLDER));
}

fn nurse_violation(nurse: &str) -> ViolationRecord {
    NewViolation::new(
        "Incorrect FAX",
        Severity::High,
        ViolationOrigin::NurseVerificationFailure,
        "x",
    )
    .owned_by(nurse)
    .into_record(cipher().encrypt("x").unwrap())
}

#[tokio::test]
async fn test_failed_assignment_and_violation_commit_together() {
    let (pool, service) = service_with(ServiceConfig::default()).await;
    single_fax_directory(&pool).await;
    service
        .generate_assignments(
            &ActorContext::admin("admin"),
            &strings(&["MRN1"]),
            &strings(&["ana"]),
        )
        .await
        .unwrap();
    let assignment = service
        .list_assignments(&ActorContext::nurse("ana"))
        .await
        .unwrap()
        .remove(0);

    let assignments = create_assignment_repository(&pool);
    let violations = create_violation_repository(&pool);

    // An id clash makes the violation insert fail inside the transaction.
    let existing = nurse_violation("ana");
    violations.create(&existing).await.unwrap();
    let clash = assignments
        .fail_pending_with_violation(assignment.id, chrono::Utc::now(), &existing)
        .await;
    assert!(clash.is_err());

    let stored = assignments.get(assignment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AssignmentStatus::Pending);
    assert!(stored.completed_at.is_none());

    let fresh = nurse_violation("ana");
    assert!(assignments
        .fail_pending_with_violation(assignment.id, chrono::Utc::now(), &fresh)
        .await
        .unwrap());
    let stored = assignments.get(assignment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AssignmentStatus::Failed);
    assert!(violations.get(fresh.id).await.unwrap().is_some());

    // No longer pending: nothing is written.
    let late = nurse_violation("ana");
    assert!(!assignments
        .fail_pending_with_violation(assignment.id, chrono::Utc::now(), &late)
        .await
        .unwrap());
    assert!(violations.get(late.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_many_is_all_or_nothing() {
    let pool = create_test_pool().await;
    let violations = create_violation_repository(&pool);

    let first = nurse_violation("ana");
    let batch = vec![nurse_violation("ana"), first.clone(), first];
    assert!(violations.create_many(&batch).await.is_err());
    assert!(violations.list(&ViolationFilter::All).await.unwrap().is_empty());

    violations.create_many(&batch[..2]).await.unwrap();
    assert_eq!(violations.list(&ViolationFilter::All).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_reset_leaves_every_table_intact() {
    let (pool, service) = service_with(ServiceConfig::default()).await;
    let admin = ActorContext::admin("admin");
    service.seed_directory().await.unwrap();
    service.seed_scanner_findings(&admin).await.unwrap();
    service
        .generate_assignments(&admin, &strings(&["MRN1"]), &strings(&["ana"]))
        .await
        .unwrap();

    // A duplicated entry fails the re-seed after every DELETE has run.
    let entry = default_directory().remove(0);
    let result = create_maintenance_repository(&pool)
        .reset_all(&[entry.clone(), entry])
        .await;
    assert!(result.is_err());

    assert_eq!(service.list_directory().await.unwrap().len(), 25);
    assert_eq!(service.list_assignments(&admin).await.unwrap().len(), 1);
    assert_eq!(
        service
            .list_violations(&admin, &ViolationFilter::ScannerOnly)
            .await
            .unwrap()
            .len(),
        5
    );
    let trail = service.audit_trail(&admin, &ActivityFilter::default()).await.unwrap();
    assert_eq!(trail.len(), 3);
}
