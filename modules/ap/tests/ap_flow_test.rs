mod common;

use ap::repos::payment_repo::AllocationRequest;
use ap::services::{invoice_service, payment_service};
use procurement::services::grn_service;
use rust_decimal::Decimal;
use security::CapabilitySet;
use serial_test::serial;
use uuid::Uuid;

fn caps() -> CapabilitySet {
    CapabilitySet::from_strings(["ap.post".to_string(), "ap.pay".to_string(), "grn.post".to_string()])
}

async fn posted_grn(pool: &sqlx::PgPool, tenant_id: &str, amount_per_unit: Decimal) -> Uuid {
    let grn = grn_service::create(
        pool,
        "wh-clerk",
        tenant_id,
        None,
        Uuid::new_v4(),
        vec![(Uuid::new_v4(), Decimal::new(10, 0), amount_per_unit)],
    )
    .await
    .expect("grn create should succeed");
    grn_service::post_grn(pool, &caps(), "wh-clerk", tenant_id, grn.id)
        .await
        .expect("grn post should succeed");
    grn.id
}

#[tokio::test]
#[serial]
async fn invoice_from_grn_post_emits_outbox_event() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-ap-invoice";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let supplier_id = Uuid::new_v4();
    let grn_id = posted_grn(&pool, tenant_id, Decimal::new(10000, 2)).await;

    let invoice = invoice_service::create_from_grn(
        &pool,
        tenant_id,
        grn_id,
        supplier_id,
        vec![("ap.invoice.inventory".to_string(), Decimal::new(100000, 2))],
    )
    .await
    .expect("invoice creation from GRN should succeed");

    let posted = invoice_service::post(&pool, &caps(), "ap-clerk", tenant_id, invoice.id)
        .await
        .expect("invoice post should succeed");
    assert_eq!(posted.status, ap::ApInvoiceStatus::Posted);

    let row: (String, serde_json::Value) =
        sqlx::query_as("SELECT event_type, payload FROM events_outbox WHERE aggregate_id = $1")
            .bind(invoice.id)
            .fetch_one(&pool)
            .await
            .expect("APInvoicePosted should be on the outbox");
    assert_eq!(row.0, "APInvoicePosted");
    assert_eq!(row.1["goods_amount"], serde_json::json!("1000.00"));
}

#[tokio::test]
#[serial]
async fn duplicate_grn_invoice_is_rejected() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-ap-dup";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let supplier_id = Uuid::new_v4();
    let grn_id = posted_grn(&pool, tenant_id, Decimal::new(5000, 2)).await;

    invoice_service::create_from_grn(
        &pool,
        tenant_id,
        grn_id,
        supplier_id,
        vec![("ap.invoice.inventory".to_string(), Decimal::new(50000, 2))],
    )
    .await
    .expect("first invoice from this GRN should succeed");

    let err = invoice_service::create_from_grn(
        &pool,
        tenant_id,
        grn_id,
        supplier_id,
        vec![("ap.invoice.inventory".to_string(), Decimal::new(50000, 2))],
    )
    .await
    .expect_err("a second invoice against the same GRN should be rejected");
    assert!(matches!(err, invoice_service::ApInvoiceError::AlreadyLinked(_)));
}

#[tokio::test]
#[serial]
async fn register_payment_validates_all_allocations_before_writing() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-ap-payment";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let supplier_id = Uuid::new_v4();
    let grn_id = posted_grn(&pool, tenant_id, Decimal::new(10000, 2)).await;
    let invoice = invoice_service::create_from_grn(
        &pool,
        tenant_id,
        grn_id,
        supplier_id,
        vec![("ap.invoice.inventory".to_string(), Decimal::new(100000, 2))],
    )
    .await
    .unwrap();
    invoice_service::post(&pool, &caps(), "ap-clerk", tenant_id, invoice.id).await.unwrap();

    let err = payment_service::register_payment(
        &pool,
        &caps(),
        "ap-clerk",
        tenant_id,
        "USD",
        Decimal::new(200000, 2),
        vec![AllocationRequest {
            invoice_id: invoice.id,
            amount: Decimal::new(200000, 2),
        }],
    )
    .await
    .expect_err("allocation exceeding remaining balance should be rejected");
    assert!(matches!(err, payment_service::ApPaymentError::AllocationExceedsBalance { .. }));

    let payment = payment_service::register_payment(
        &pool,
        &caps(),
        "ap-clerk",
        tenant_id,
        "USD",
        Decimal::new(100000, 2),
        vec![AllocationRequest {
            invoice_id: invoice.id,
            amount: Decimal::new(100000, 2),
        }],
    )
    .await
    .expect("full allocation should succeed");

    let row: (String,) = sqlx::query_as("SELECT event_type FROM events_outbox WHERE aggregate_id = $1")
        .bind(payment.id)
        .fetch_one(&pool)
        .await
        .expect("APPaymentPosted should be on the outbox");
    assert_eq!(row.0, "APPaymentPosted");

    let invoice_status: (ap::ApInvoiceStatus,) =
        sqlx::query_as("SELECT status FROM ap_invoices WHERE id = $1")
            .bind(invoice.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(invoice_status.0, ap::ApInvoiceStatus::Paid);
}
