mod common;

use chrono::NaiveDate;
use ledger::{Dimensions, JournalLineRequest, PostingRequestV1, SourceDocType};
use rust_decimal::Decimal;
use security::CapabilitySet;
use serial_test::serial;
use uuid::Uuid;

fn caps() -> CapabilitySet {
    CapabilitySet::from_strings(["gl.post".to_string()])
}

fn two_line_request(tenant_id: &str, date: NaiveDate, source_id: Uuid, debit_code: &str, credit_code: &str) -> PostingRequestV1 {
    PostingRequestV1 {
        tenant_id: tenant_id.to_string(),
        date,
        source_module: SourceDocType::Manual,
        source_id,
        memo: "test posting".to_string(),
        currency: "USD".to_string(),
        lines: vec![
            JournalLineRequest {
                account_code: debit_code.to_string(),
                debit: Decimal::new(10000, 2),
                credit: Decimal::ZERO,
                dimensions: Dimensions::default(),
            },
            JournalLineRequest {
                account_code: credit_code.to_string(),
                debit: Decimal::ZERO,
                credit: Decimal::new(10000, 2),
                dimensions: Dimensions::default(),
            },
        ],
    }
}

#[tokio::test]
#[serial]
async fn post_is_idempotent_on_repeated_source_id() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-post-idem";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    common::setup_test_period(
        &pool,
        tenant_id,
        "2026-01",
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
    )
    .await;
    common::setup_test_account(&pool, tenant_id, "1000", "Cash", "asset", "debit").await;
    common::setup_test_account(&pool, tenant_id, "4000", "Revenue", "revenue", "credit").await;

    let source_id = Uuid::new_v4();
    let req = two_line_request(tenant_id, NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(), source_id, "1000", "4000");

    let first = ledger::services::journal_service::post(&pool, &caps(), "tester", req.clone())
        .await
        .expect("first post should succeed");
    assert!(first.first_post);

    let second = ledger::services::journal_service::post(&pool, &caps(), "tester", req)
        .await
        .expect("retried post should be idempotent");
    assert!(!second.first_post);
    assert_eq!(first.entry.id, second.entry.id);

    common::cleanup_test_tenant(&pool, tenant_id).await;
}

#[tokio::test]
#[serial]
async fn reverse_of_reverse_nets_back_to_zero() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-reverse-twice";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    common::setup_test_period(
        &pool,
        tenant_id,
        "2026-02",
        NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 2, 28).unwrap(),
    )
    .await;
    common::setup_test_account(&pool, tenant_id, "1000", "Cash", "asset", "debit").await;
    common::setup_test_account(&pool, tenant_id, "4000", "Revenue", "revenue", "credit").await;

    let req = two_line_request(tenant_id, NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(), Uuid::new_v4(), "1000", "4000");
    let posted = ledger::services::journal_service::post(&pool, &caps(), "tester", req)
        .await
        .expect("post should succeed");

    let first_reversal = ledger::services::reversal_service::reverse(&pool, &caps(), "tester", tenant_id, posted.entry.id, "correction")
        .await
        .expect("first reversal should succeed");

    let second_reversal = ledger::services::reversal_service::reverse(
        &pool,
        &caps(),
        "tester",
        tenant_id,
        first_reversal.entry.id,
        "undo correction",
    )
    .await
    .expect("reversing a reversal must be allowed");

    assert_ne!(first_reversal.entry.id, second_reversal.entry.id);

    common::cleanup_test_tenant(&pool, tenant_id).await;
}

#[tokio::test]
#[serial]
async fn reversal_of_entry_in_soft_closed_period_lands_in_next_open_period() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-reverse-roll";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let jan_id = common::setup_test_period(
        &pool,
        tenant_id,
        "2026-01",
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
    )
    .await;
    common::setup_test_period(
        &pool,
        tenant_id,
        "2026-02",
        NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 2, 28).unwrap(),
    )
    .await;
    common::setup_test_account(&pool, tenant_id, "1000", "Cash", "asset", "debit").await;
    common::setup_test_account(&pool, tenant_id, "4000", "Revenue", "revenue", "credit").await;

    let req = two_line_request(tenant_id, NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(), Uuid::new_v4(), "1000", "4000");
    let posted = ledger::services::journal_service::post(&pool, &caps(), "tester", req)
        .await
        .expect("post should succeed");

    common::soft_close_period(&pool, jan_id).await;

    let reversal = ledger::services::reversal_service::reverse(&pool, &caps(), "tester", tenant_id, posted.entry.id, "late correction")
        .await
        .expect("reversal of a soft-closed entry should roll forward");

    assert_eq!(reversal.entry.date.format("%Y-%m").to_string(), "2026-02");

    common::cleanup_test_tenant(&pool, tenant_id).await;
}

#[tokio::test]
#[serial]
async fn void_then_void_again_is_rejected() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-void-twice";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    common::setup_test_period(
        &pool,
        tenant_id,
        "2026-03",
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
    )
    .await;
    common::setup_test_account(&pool, tenant_id, "1000", "Cash", "asset", "debit").await;
    common::setup_test_account(&pool, tenant_id, "4000", "Revenue", "revenue", "credit").await;

    let req = two_line_request(tenant_id, NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(), Uuid::new_v4(), "1000", "4000");
    let posted = ledger::services::journal_service::post(&pool, &caps(), "tester", req)
        .await
        .expect("post should succeed");

    ledger::services::void_service::void_entry(&pool, &caps(), "tester", tenant_id, posted.entry.id, "mistake")
        .await
        .expect("first void should succeed");

    let err = ledger::services::void_service::void_entry(&pool, &caps(), "tester", tenant_id, posted.entry.id, "again")
        .await
        .expect_err("second void should be rejected");
    assert!(matches!(err, ledger::VoidError::AlreadyVoid(_)));

    common::cleanup_test_tenant(&pool, tenant_id).await;
}

#[tokio::test]
#[serial]
async fn unbalanced_request_is_rejected_before_any_write() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-unbalanced";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    common::setup_test_period(
        &pool,
        tenant_id,
        "2026-04",
        NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 4, 30).unwrap(),
    )
    .await;
    common::setup_test_account(&pool, tenant_id, "1000", "Cash", "asset", "debit").await;
    common::setup_test_account(&pool, tenant_id, "4000", "Revenue", "revenue", "credit").await;

    let mut req = two_line_request(tenant_id, NaiveDate::from_ymd_opt(2026, 4, 10).unwrap(), Uuid::new_v4(), "1000", "4000");
    req.lines[1].credit = Decimal::new(9999, 2);

    let err = ledger::services::journal_service::post(&pool, &caps(), "tester", req)
        .await
        .expect_err("unbalanced posting must be rejected");
    assert_eq!(err.kind(), core_errors::ErrorKind::NotBalanced);

    common::cleanup_test_tenant(&pool, tenant_id).await;
}
