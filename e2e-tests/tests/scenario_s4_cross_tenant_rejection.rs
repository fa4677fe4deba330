//! S4 — cross-tenant rejection: tenant A creates an invoice, tenant B's
//! `find_by_id` lookup for that same invoice id must behave as if it does
//! not exist, and no row anywhere gets touched by the rejected attempt.

mod common;

use ar_rs::repos::invoice_repo::{self, InvoiceError};
use ar_rs::services::invoice_service::{self, CreateInvoiceInput, CreateInvoiceLineInput};
use chrono::NaiveDate;
use common::{cleanup_tenant, get_test_pool, seed_service_item, seed_tenant, setup_test_period};
use gl_rs::services::company_bootstrap_service::SALES_INCOME_CODE;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn tenant_b_cannot_see_or_post_tenant_a_invoice() {
    let pool = get_test_pool().await;
    let tenant_a = seed_tenant(&pool, "S4 Tenant A").await.expect("seed tenant a");
    let tenant_b = seed_tenant(&pool, "S4 Tenant B").await.expect("seed tenant b");
    setup_test_period(
        &pool,
        &tenant_a.tenant_id.to_string(),
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
    )
    .await;

    let customer = party_rs::repos::customer_repo::insert(&pool, tenant_a.tenant_id, "Gamma Co", None, None)
        .await
        .expect("seed customer");
    let item = seed_service_item(&pool, tenant_a.tenant_id, SALES_INCOME_CODE).await;

    let mut tx = pool.begin().await.unwrap();
    let (invoice, _) = invoice_service::create_invoice(
        &mut tx,
        CreateInvoiceInput {
            tenant_id: tenant_a.tenant_id,
            customer_id: customer.id,
            number: "INV-S4-001".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
            due_date: None,
            currency: "MMK".to_string(),
            location_id: None,
            lines: vec![CreateInvoiceLineInput {
                item_id: item.id,
                description: "Consulting".to_string(),
                quantity: dec!(1),
                unit_price: dec!(1000),
                discount_amount: Decimal::ZERO,
                tax_rate: Decimal::ZERO,
                income_account_code: SALES_INCOME_CODE.to_string(),
            }],
        },
    )
    .await
    .expect("create invoice under tenant A");
    tx.commit().await.unwrap();

    // Tenant B reads the same invoice id under its own tenant scope.
    let lookup = invoice_repo::find_by_id(&pool, tenant_b.tenant_id, invoice.id).await;
    assert!(
        matches!(lookup, Err(InvoiceError::NotFound { .. })),
        "tenant B must not be able to resolve tenant A's invoice"
    );

    // The rejected lookup wrote nothing: tenant B still has zero invoices,
    // and tenant A's row is untouched (still DRAFT).
    let tenant_b_invoice_count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM invoices WHERE tenant_id = $1")
            .bind(tenant_b.tenant_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(tenant_b_invoice_count.0, 0);

    let still_draft = invoice_repo::find_by_id(&pool, tenant_a.tenant_id, invoice.id)
        .await
        .expect("tenant A can still read its own invoice");
    assert_eq!(still_draft.status, ar_rs::repos::invoice_repo::InvoiceStatus::Draft);

    cleanup_tenant(&pool, tenant_a.tenant_id).await;
    cleanup_tenant(&pool, tenant_b.tenant_id).await;
}
