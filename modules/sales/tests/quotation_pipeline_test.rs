mod common;

use rust_decimal::Decimal;
use sales::services::{quotation_service, sales_order_service};
use security::CapabilitySet;
use serial_test::serial;
use uuid::Uuid;

fn caps() -> CapabilitySet {
    CapabilitySet::from_strings(["quotation.approve".to_string(), "so.confirm".to_string()])
}

fn one_line(product_id: Uuid) -> Vec<(Uuid, Decimal, Decimal, Decimal, Decimal)> {
    vec![(product_id, Decimal::new(3, 0), Decimal::new(10000, 2), Decimal::ZERO, Decimal::ZERO)]
}

#[tokio::test]
#[serial]
async fn quotation_create_computes_total_from_lines() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-sales-quote-create";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let quotation = quotation_service::create(
        &pool,
        "sales-rep-1",
        tenant_id,
        Uuid::new_v4(),
        "USD",
        one_line(Uuid::new_v4()),
    )
    .await
    .expect("quotation create should succeed");

    assert_eq!(quotation.status, sales::QuotationStatus::Draft);
    assert_eq!(quotation.total_amount, Decimal::new(30000, 2));
}

#[tokio::test]
#[serial]
async fn quotation_creator_cannot_approve_their_own_quotation() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-sales-self-approve";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let quotation = quotation_service::create(
        &pool,
        "sales-rep-1",
        tenant_id,
        Uuid::new_v4(),
        "USD",
        one_line(Uuid::new_v4()),
    )
    .await
    .unwrap();
    quotation_service::submit(&pool, "sales-rep-1", tenant_id, quotation.id).await.unwrap();

    let err = quotation_service::approve(&pool, &caps(), "sales-rep-1", tenant_id, quotation.id)
        .await
        .expect_err("creator approving their own quotation should fail");
    assert!(matches!(err, quotation_service::QuotationError::SelfApproval));

    quotation_service::approve(&pool, &caps(), "sales-manager-1", tenant_id, quotation.id)
        .await
        .expect("a different actor should be able to approve");
}

#[tokio::test]
#[serial]
async fn convert_to_sales_order_generates_its_own_number_and_copies_lines() {
    let pool = common::get_test_pool().await;
    let tenant_id = "tenant-sales-convert";
    common::cleanup_test_tenant(&pool, tenant_id).await;

    let product_id = Uuid::new_v4();
    let quotation = quotation_service::create(
        &pool,
        "sales-rep-1",
        tenant_id,
        Uuid::new_v4(),
        "USD",
        one_line(product_id),
    )
    .await
    .unwrap();
    quotation_service::submit(&pool, "sales-rep-1", tenant_id, quotation.id).await.unwrap();
    quotation_service::approve(&pool, &caps(), "sales-manager-1", tenant_id, quotation.id)
        .await
        .unwrap();

    let err = quotation_service::convert_to_sales_order(&pool, "sales-rep-1", tenant_id, Uuid::new_v4())
        .await
        .expect_err("converting a nonexistent quotation should fail");
    assert!(matches!(err, quotation_service::QuotationError::Database(_)));

    let so_id = quotation_service::convert_to_sales_order(&pool, "sales-rep-1", tenant_id, quotation.id)
        .await
        .expect("conversion should succeed");

    let row: (String, sales::SalesOrderStatus) =
        sqlx::query_as("SELECT number, status FROM sales_orders WHERE id = $1")
            .bind(so_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(row.0.starts_with("SO-"));
    assert_eq!(row.1, sales::SalesOrderStatus::Draft);

    let confirmed_status: sales::QuotationStatus =
        sqlx::query_scalar("SELECT status FROM quotations WHERE id = $1")
            .bind(quotation.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(confirmed_status, sales::QuotationStatus::Converted);

    sales_order_service::confirm(&pool, &caps(), "sales-manager-1", tenant_id, so_id)
        .await
        .expect("confirming the derived sales order should succeed");
}
