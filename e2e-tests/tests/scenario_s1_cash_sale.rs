//! S1 — cash sale: create a DRAFT invoice for a service line, post it, pay
//! it in full, and check the ledger and invoice status land exactly where
//! the spec's literal walkthrough says they should.

mod common;

use ar_rs::repos::invoice_repo::InvoiceStatus;
use ar_rs::services::invoice_service::{self, CreateInvoiceInput, CreateInvoiceLineInput};
use ar_rs::services::payment_service;
use chrono::NaiveDate;
use common::{cleanup_tenant, get_test_pool, seed_service_item, seed_tenant, setup_test_period};
use gl_rs::services::company_bootstrap_service::{AR_CODE, CASH_CODE, SALES_INCOME_CODE};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serial_test::serial;
use uuid::Uuid;

#[tokio::test]
#[serial]
async fn cash_sale_balances_and_pays_in_full() {
    let pool = get_test_pool().await;
    let tenant = seed_tenant(&pool, "S1 Cash Sale Co").await.expect("seed tenant");
    setup_test_period(
        &pool,
        &tenant.tenant_id.to_string(),
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
    )
    .await;

    let customer = party_rs::repos::customer_repo::insert(&pool, tenant.tenant_id, "Acme Co", None, None)
        .await
        .expect("seed customer");
    let item = seed_service_item(&pool, tenant.tenant_id, SALES_INCOME_CODE).await;

    let mut tx = pool.begin().await.unwrap();
    let (invoice, _lines) = invoice_service::create_invoice(
        &mut tx,
        CreateInvoiceInput {
            tenant_id: tenant.tenant_id,
            customer_id: customer.id,
            number: "INV-S1-001".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
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
    .expect("create invoice");
    tx.commit().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let posted = invoice_service::post_invoice(&mut tx, &pool, tenant.tenant_id, invoice.id, None)
        .await
        .expect("post invoice");
    tx.commit().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let recorded = payment_service::record_payment(
        &mut tx,
        tenant.tenant_id,
        invoice.id,
        NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
        dec!(1000),
        CASH_CODE.to_string(),
        None,
    )
    .await
    .expect("record payment");
    tx.commit().await.unwrap();

    assert_eq!(recorded.invoice.status, InvoiceStatus::Paid);
    assert_eq!(recorded.invoice.amount_paid, dec!(1000));

    let tenant_id_str = tenant.tenant_id.to_string();
    let journal_entry_count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM journal_entries WHERE tenant_id = $1")
            .bind(&tenant_id_str)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(journal_entry_count.0, 2, "one entry for the post, one for the payment");

    let cash_net: (Decimal,) = sqlx::query_as(
        "SELECT COALESCE(SUM(jl.debit_minor - jl.credit_minor), 0)::numeric / 100
         FROM journal_lines jl
         JOIN journal_entries je ON je.id = jl.journal_entry_id
         WHERE je.tenant_id = $1 AND jl.account_ref = $2",
    )
    .bind(&tenant_id_str)
    .bind(CASH_CODE)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(cash_net.0, dec!(1000));

    let sales_income_net: (Decimal,) = sqlx::query_as(
        "SELECT COALESCE(SUM(jl.credit_minor - jl.debit_minor), 0)::numeric / 100
         FROM journal_lines jl
         JOIN journal_entries je ON je.id = jl.journal_entry_id
         WHERE je.tenant_id = $1 AND jl.account_ref = $2",
    )
    .bind(&tenant_id_str)
    .bind(SALES_INCOME_CODE)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(sales_income_net.0, dec!(1000));

    let ar_net: (Decimal,) = sqlx::query_as(
        "SELECT COALESCE(SUM(jl.debit_minor - jl.credit_minor), 0)::numeric / 100
         FROM journal_lines jl
         JOIN journal_entries je ON je.id = jl.journal_entry_id
         WHERE je.tenant_id = $1 AND jl.account_ref = $2",
    )
    .bind(&tenant_id_str)
    .bind(AR_CODE)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(ar_net.0, Decimal::ZERO, "AR nets to zero once paid in full");

    cleanup_tenant(&pool, tenant.tenant_id).await;
}
