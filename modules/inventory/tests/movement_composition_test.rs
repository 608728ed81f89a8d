mod common;

use inventory::services::movement_service::{self, InventoryError, MovementLine};
use rust_decimal::Decimal;
use security::CapabilitySet;
use serial_test::serial;
use uuid::Uuid;

fn caps() -> CapabilitySet {
    CapabilitySet::from_strings(["inv.adjust".to_string()])
}

#[tokio::test]
#[serial]
async fn two_inbound_batches_average_cost_by_weighted_quantity() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-avco";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let warehouse_id = Uuid::new_v4();
    let product_id = Uuid::new_v4();

    let first = movement_service::post_inbound(
        &pool,
        &caps(),
        tenant_id,
        warehouse_id,
        vec![MovementLine {
            warehouse_id,
            product_id,
            qty: Decimal::new(4, 0),
            unit_cost: Some(Decimal::new(5000, 2)),
        }],
        "TEST.INBOUND",
        Uuid::new_v4(),
    )
    .await
    .expect("first inbound should succeed");
    assert_eq!(first.balances[0].qty, Decimal::new(4, 0));
    assert_eq!(first.balances[0].avg_cost, Decimal::new(5000, 2));

    let second = movement_service::post_inbound(
        &pool,
        &caps(),
        tenant_id,
        warehouse_id,
        vec![MovementLine {
            warehouse_id,
            product_id,
            qty: Decimal::new(6, 0),
            unit_cost: Some(Decimal::new(7500, 2)),
        }],
        "TEST.INBOUND",
        Uuid::new_v4(),
    )
    .await
    .expect("second inbound should succeed");
    assert_eq!(second.balances[0].qty, Decimal::new(10, 0));
    assert_eq!(second.balances[0].avg_cost, Decimal::new(6500, 2));

    common::cleanup_test_tenant(&pool, tenant_id).await;
}

#[tokio::test]
#[serial]
async fn outbound_beyond_available_balance_fails_closed() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-insufficient";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let warehouse_id = Uuid::new_v4();
    let product_id = Uuid::new_v4();

    movement_service::post_inbound(
        &pool,
        &caps(),
        tenant_id,
        warehouse_id,
        vec![MovementLine {
            warehouse_id,
            product_id,
            qty: Decimal::new(2, 0),
            unit_cost: Some(Decimal::new(1000, 2)),
        }],
        "TEST.INBOUND",
        Uuid::new_v4(),
    )
    .await
    .expect("inbound should succeed");

    let err = movement_service::post_outbound(
        &pool,
        &caps(),
        tenant_id,
        warehouse_id,
        vec![MovementLine {
            warehouse_id,
            product_id,
            qty: Decimal::new(5, 0),
            unit_cost: None,
        }],
        "TEST.OUTBOUND",
        Uuid::new_v4(),
        false,
    )
    .await
    .expect_err("outbound beyond available stock must fail");
    assert!(matches!(err, InventoryError::InsufficientStock { .. }));

    common::cleanup_test_tenant(&pool, tenant_id).await;
}

#[tokio::test]
#[serial]
async fn transfer_preserves_source_average_cost_at_destination() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-transfer";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let src_warehouse = Uuid::new_v4();
    let dst_warehouse = Uuid::new_v4();
    let product_id = Uuid::new_v4();

    movement_service::post_inbound(
        &pool,
        &caps(),
        tenant_id,
        src_warehouse,
        vec![MovementLine {
            warehouse_id: src_warehouse,
            product_id,
            qty: Decimal::new(10, 0),
            unit_cost: Some(Decimal::new(4200, 2)),
        }],
        "TEST.INBOUND",
        Uuid::new_v4(),
    )
    .await
    .expect("inbound should succeed");

    let outcome = movement_service::post_transfer(
        &pool,
        &caps(),
        tenant_id,
        src_warehouse,
        dst_warehouse,
        vec![MovementLine {
            warehouse_id: src_warehouse,
            product_id,
            qty: Decimal::new(3, 0),
            unit_cost: None,
        }],
        "TEST.TRANSFER",
        Uuid::new_v4(),
        false,
    )
    .await
    .expect("transfer should succeed");

    // balances[0] is the source (outbound), balances[1] is the destination (inbound)
    assert_eq!(outcome.balances[0].qty, Decimal::new(7, 0));
    assert_eq!(outcome.balances[1].qty, Decimal::new(3, 0));
    assert_eq!(outcome.balances[1].avg_cost, Decimal::new(4200, 2));

    common::cleanup_test_tenant(&pool, tenant_id).await;
}

#[tokio::test]
#[serial]
async fn tx_scoped_inbound_participates_in_callers_own_transaction() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-tx-compose";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let warehouse_id = Uuid::new_v4();
    let product_id = Uuid::new_v4();
    let grn_id = Uuid::new_v4();

    // Simulate a caller (e.g. GRN posting) that needs the inventory effect
    // atomic with its own status-flip write, so it opens one transaction,
    // calls the `_tx` variant, does its own write, and commits once.
    let mut tx = pool.begin().await.expect("begin tx");
    let outcome = movement_service::post_inbound_tx(
        &mut tx,
        &caps(),
        tenant_id,
        warehouse_id,
        vec![MovementLine {
            warehouse_id,
            product_id,
            qty: Decimal::new(5, 0),
            unit_cost: Some(Decimal::new(1000, 2)),
        }],
        "PROCUREMENT.GRN",
        grn_id,
    )
    .await
    .expect("tx-scoped inbound should succeed");
    // Caller's own sibling write would go here, inside the same `tx`.
    tx.commit().await.expect("commit should persist both writes");

    assert_eq!(outcome.balances[0].qty, Decimal::new(5, 0));

    common::cleanup_test_tenant(&pool, tenant_id).await;
}
