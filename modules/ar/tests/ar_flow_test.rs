mod common;

use ar::repos::payment_repo::AllocationRequest;
use ar::services::{aging_service, invoice_service, payment_service};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use security::CapabilitySet;
use serial_test::serial;
use uuid::Uuid;

fn caps() -> CapabilitySet {
    CapabilitySet::from_strings(["ar.post".to_string(), "ar.pay".to_string()])
}

#[tokio::test]
#[serial]
async fn invoice_post_emits_outbox_event() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-ar-invoice";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let customer_id = Uuid::new_v4();
    let invoice = invoice_service::create(
        &pool,
        tenant_id,
        customer_id,
        None,
        None,
        "USD",
        vec![("ar.invoice.revenue".to_string(), Decimal::new(50000, 2))],
        NaiveDate::from_ymd_opt(2026, 8, 26).unwrap(),
    )
    .await
    .expect("invoice create should succeed");
    assert_eq!(invoice.status, ar::ArInvoiceStatus::Draft);

    let posted = invoice_service::post(&pool, &caps(), "ar-clerk", tenant_id, invoice.id)
        .await
        .expect("invoice post should succeed");
    assert_eq!(posted.status, ar::ArInvoiceStatus::Issued);

    let row: (String, serde_json::Value) =
        sqlx::query_as("SELECT event_type, payload FROM events_outbox WHERE aggregate_id = $1")
            .bind(invoice.id)
            .fetch_one(&pool)
            .await
            .expect("ArInvoicePosted should be on the outbox");
    assert_eq!(row.0, "ArInvoicePosted");
    assert_eq!(row.1["revenue_amount"], serde_json::json!("500.00"));

    let err = invoice_service::post(&pool, &caps(), "ar-clerk", tenant_id, invoice.id)
        .await
        .expect_err("re-posting an issued invoice should fail");
    assert!(matches!(err, invoice_service::ArInvoiceError::NotDraft(_)));
}

#[tokio::test]
#[serial]
async fn register_payment_rejects_cross_customer_allocation() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-ar-mismatch";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let customer_a = Uuid::new_v4();
    let customer_b = Uuid::new_v4();
    let due = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();

    let inv_a = invoice_service::create(
        &pool, tenant_id, customer_a, None, None, "USD",
        vec![("ar.invoice.revenue".to_string(), Decimal::new(10000, 2))], due,
    ).await.unwrap();
    invoice_service::post(&pool, &caps(), "ar-clerk", tenant_id, inv_a.id).await.unwrap();

    let inv_b = invoice_service::create(
        &pool, tenant_id, customer_b, None, None, "USD",
        vec![("ar.invoice.revenue".to_string(), Decimal::new(10000, 2))], due,
    ).await.unwrap();
    invoice_service::post(&pool, &caps(), "ar-clerk", tenant_id, inv_b.id).await.unwrap();

    let err = payment_service::register_payment(
        &pool,
        &caps(),
        "ar-clerk",
        tenant_id,
        "USD",
        Decimal::new(20000, 2),
        vec![
            AllocationRequest { invoice_id: inv_a.id, amount: Decimal::new(10000, 2) },
            AllocationRequest { invoice_id: inv_b.id, amount: Decimal::new(10000, 2) },
        ],
    )
    .await
    .expect_err("allocations spanning two customers should be rejected");
    assert!(matches!(err, payment_service::ArPaymentError::CustomerMismatch));
}

#[tokio::test]
#[serial]
async fn register_payment_marks_invoice_paid_and_emits_outbox_event() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-ar-payment";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let customer_id = Uuid::new_v4();
    let due = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
    let invoice = invoice_service::create(
        &pool, tenant_id, customer_id, None, None, "USD",
        vec![("ar.invoice.revenue".to_string(), Decimal::new(30000, 2))], due,
    ).await.unwrap();
    invoice_service::post(&pool, &caps(), "ar-clerk", tenant_id, invoice.id).await.unwrap();

    let payment = payment_service::register_payment(
        &pool,
        &caps(),
        "ar-clerk",
        tenant_id,
        "USD",
        Decimal::new(30000, 2),
        vec![AllocationRequest { invoice_id: invoice.id, amount: Decimal::new(30000, 2) }],
    )
    .await
    .expect("full allocation should succeed");

    let row: (String,) = sqlx::query_as("SELECT event_type FROM events_outbox WHERE aggregate_id = $1")
        .bind(payment.id)
        .fetch_one(&pool)
        .await
        .expect("ArPaymentPosted should be on the outbox");
    assert_eq!(row.0, "ArPaymentPosted");

    let status: (ar::ArInvoiceStatus,) = sqlx::query_as("SELECT status FROM ar_invoices WHERE id = $1")
        .bind(invoice.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status.0, ar::ArInvoiceStatus::Paid);
}

#[tokio::test]
#[serial]
async fn register_payment_moves_invoice_through_partially_paid_before_paid() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-ar-partial-payment";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let customer_id = Uuid::new_v4();
    let due = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
    let invoice = invoice_service::create(
        &pool, tenant_id, customer_id, None, None, "USD",
        vec![("ar.invoice.revenue".to_string(), Decimal::new(100000, 2))], due,
    ).await.unwrap();
    invoice_service::post(&pool, &caps(), "ar-clerk", tenant_id, invoice.id).await.unwrap();

    payment_service::register_payment(
        &pool,
        &caps(),
        "ar-clerk",
        tenant_id,
        "USD",
        Decimal::new(60000, 2),
        vec![AllocationRequest { invoice_id: invoice.id, amount: Decimal::new(60000, 2) }],
    )
    .await
    .expect("first partial allocation should succeed");

    let status_after_partial: (ar::ArInvoiceStatus,) =
        sqlx::query_as("SELECT status FROM ar_invoices WHERE id = $1")
            .bind(invoice.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status_after_partial.0, ar::ArInvoiceStatus::PartiallyPaid);

    payment_service::register_payment(
        &pool,
        &caps(),
        "ar-clerk",
        tenant_id,
        "USD",
        Decimal::new(40000, 2),
        vec![AllocationRequest { invoice_id: invoice.id, amount: Decimal::new(40000, 2) }],
    )
    .await
    .expect("second allocation bringing the invoice to zero should succeed");

    let status_after_full: (ar::ArInvoiceStatus,) =
        sqlx::query_as("SELECT status FROM ar_invoices WHERE id = $1")
            .bind(invoice.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status_after_full.0, ar::ArInvoiceStatus::Paid);
}

#[tokio::test]
#[serial]
async fn aging_report_buckets_by_due_date() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-ar-aging";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let customer_id = Uuid::new_v4();
    let overdue_60 = chrono::Utc::now().date_naive() - chrono::Duration::days(45);
    let invoice = invoice_service::create(
        &pool, tenant_id, customer_id, None, None, "USD",
        vec![("ar.invoice.revenue".to_string(), Decimal::new(10000, 2))], overdue_60,
    ).await.unwrap();
    invoice_service::post(&pool, &caps(), "ar-clerk", tenant_id, invoice.id).await.unwrap();

    let buckets = aging_service::aging_report(&pool, tenant_id)
        .await
        .expect("aging report should succeed");
    let bucket_31_60 = buckets.iter().find(|b| b.bucket == "31-60");
    assert!(bucket_31_60.is_some(), "expected an outstanding balance in the 31-60 bucket");
    assert_eq!(bucket_31_60.unwrap().outstanding, Decimal::new(10000, 2));
}
