mod common;

use chrono::NaiveDate;
use procurement::services::{grn_service, po_service, pr_service};
use procurement::{GrnStatus, PoStatus, PrStatus};
use rust_decimal::Decimal;
use security::CapabilitySet;
use serial_test::serial;
use uuid::Uuid;

fn caps() -> CapabilitySet {
    CapabilitySet::from_strings([
        "grn.post".to_string(),
        "po.approve".to_string(),
        "inv.adjust".to_string(),
    ])
}

#[tokio::test]
#[serial]
async fn pr_create_and_submit() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-procurement-pr";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let pr = pr_service::create(&pool, "buyer-1", tenant_id, vec![(Uuid::new_v4(), Decimal::new(10, 0))])
        .await
        .expect("pr create should succeed");
    assert_eq!(pr.status, PrStatus::Draft);

    pr_service::submit(&pool, "buyer-1", tenant_id, pr.id)
        .await
        .expect("pr submit should succeed");

    let err = pr_service::submit(&pool, "buyer-1", tenant_id, pr.id)
        .await
        .expect_err("re-submitting an already-submitted PR should fail");
    assert!(matches!(err, pr_service::PrError::NotEditable(_)));
}

#[tokio::test]
#[serial]
async fn po_lifecycle_draft_to_approved() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-procurement-po";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let supplier_id = Uuid::new_v4();
    let po = po_service::create(
        &pool,
        "buyer-1",
        tenant_id,
        supplier_id,
        "USD",
        vec![(Uuid::new_v4(), Decimal::new(5, 0), Decimal::new(2000, 2))],
    )
    .await
    .expect("po create should succeed");
    assert_eq!(po.status, PoStatus::Draft);

    let err = po_service::approve(&pool, &caps(), "approver-1", tenant_id, po.id)
        .await
        .expect_err("approving a draft PO should fail");
    assert!(matches!(err, po_service::PoError::NotPendingApproval(_)));

    po_service::submit_for_approval(&pool, "buyer-1", tenant_id, po.id)
        .await
        .expect("submit for approval should succeed");
    po_service::approve(&pool, &caps(), "approver-1", tenant_id, po.id)
        .await
        .expect("approve should succeed");
}

#[tokio::test]
#[serial]
async fn grn_create_requires_approved_po() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-procurement-grn-gate";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let supplier_id = Uuid::new_v4();
    let po = po_service::create(&pool, "buyer-1", tenant_id, supplier_id, "USD", vec![]).await.unwrap();

    let err = grn_service::create(&pool, "wh-clerk", tenant_id, Some(po.id), Uuid::new_v4(), vec![])
        .await
        .expect_err("GRN against a draft PO should be rejected");
    assert!(matches!(err, grn_service::GrnError::PoNotApproved(_)));
}

#[tokio::test]
#[serial]
async fn grn_post_moves_inventory_and_emits_outbox_event() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-procurement-grn-post";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let warehouse_id = Uuid::new_v4();
    let product_id = Uuid::new_v4();

    let grn = grn_service::create(
        &pool,
        "wh-clerk",
        tenant_id,
        None,
        warehouse_id,
        vec![(product_id, Decimal::new(10, 0), Decimal::new(10000, 2))],
    )
    .await
    .expect("manual GRN create should succeed");
    assert_eq!(grn.status, GrnStatus::Draft);

    let outcome = grn_service::post_grn(&pool, &caps(), "wh-clerk", tenant_id, grn.id)
        .await
        .expect("grn post should succeed");
    assert_eq!(outcome.grn_id, grn.id);

    let row: (String, serde_json::Value) =
        sqlx::query_as("SELECT event_type, payload FROM events_outbox WHERE aggregate_id = $1")
            .bind(grn.id)
            .fetch_one(&pool)
            .await
            .expect("GRNPosted should be on the outbox");
    assert_eq!(row.0, "GRNPosted");
    assert_eq!(row.1["amount"], serde_json::json!("1000.00"));

    let err = grn_service::post_grn(&pool, &caps(), "wh-clerk", tenant_id, grn.id)
        .await
        .expect_err("posting an already-posted GRN should fail");
    assert!(matches!(err, grn_service::GrnError::NotDraft(_)));
}

#[tokio::test]
#[serial]
async fn cancel_grn_reverses_inventory_and_requires_posted_status() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-procurement-grn-cancel";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    common::setup_test_period(
        &pool,
        tenant_id,
        "2026-01",
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
    )
    .await;

    let warehouse_id = Uuid::new_v4();
    let product_id = Uuid::new_v4();

    let grn = grn_service::create(
        &pool,
        "wh-clerk",
        tenant_id,
        None,
        warehouse_id,
        vec![(product_id, Decimal::new(10, 0), Decimal::new(10000, 2))],
    )
    .await
    .unwrap();

    let err = grn_service::cancel_grn(&pool, &caps(), "wh-clerk", tenant_id, grn.id)
        .await
        .expect_err("cancelling a draft GRN should fail");
    assert!(matches!(err, grn_service::GrnError::NotPosted(_)));

    grn_service::post_grn(&pool, &caps(), "wh-clerk", tenant_id, grn.id).await.unwrap();

    grn_service::cancel_grn(&pool, &caps(), "wh-clerk", tenant_id, grn.id)
        .await
        .expect("cancelling a posted GRN should succeed");

    let balance_qty: (Decimal,) = sqlx::query_as(
        "SELECT qty FROM inventory_balances WHERE tenant_id = $1 AND warehouse_id = $2 AND product_id = $3",
    )
    .bind(tenant_id)
    .bind(warehouse_id)
    .bind(product_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(balance_qty.0, Decimal::ZERO);

    let status: GrnStatus = sqlx::query_scalar("SELECT status FROM goods_receipts WHERE id = $1")
        .bind(grn.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, GrnStatus::Cancelled);

    let repeat = grn_service::cancel_grn(&pool, &caps(), "wh-clerk", tenant_id, grn.id)
        .await
        .expect_err("cancelling an already-cancelled GRN should fail");
    assert!(matches!(repeat, grn_service::GrnError::NotPosted(_)));
}

#[tokio::test]
#[serial]
async fn cancel_grn_is_blocked_once_the_receiving_period_is_hard_closed() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-procurement-grn-cancel-locked";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let period_id = common::setup_test_period(
        &pool,
        tenant_id,
        "2026-01",
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
    )
    .await;

    let warehouse_id = Uuid::new_v4();
    let product_id = Uuid::new_v4();

    let grn = grn_service::create(
        &pool,
        "wh-clerk",
        tenant_id,
        None,
        warehouse_id,
        vec![(product_id, Decimal::new(10, 0), Decimal::new(10000, 2))],
    )
    .await
    .unwrap();

    grn_service::post_grn(&pool, &caps(), "wh-clerk", tenant_id, grn.id).await.unwrap();

    common::hard_close_period(&pool, period_id).await;

    let err = grn_service::cancel_grn(&pool, &caps(), "wh-clerk", tenant_id, grn.id)
        .await
        .expect_err("cancelling a GRN in a hard-closed period should fail");
    assert!(matches!(
        err,
        grn_service::GrnError::Period(period::repos::period_repo::PeriodError::PeriodLocked(_))
    ));
}
