//! C9 external POS import: idempotently upserts a posted sales invoice (plus
//! an optional cash receipt) or a posted credit note from a foreign sale or
//! refund id, auto-creating customer/item reference mappings along the way.
//! Reuses C6's invoice/payment/credit-note services wholesale rather than
//! building a second posting path — a POS sale is just an invoice whose
//! customer and items happen to be resolved from a foreign id instead of a
//! local one, and whose lines are never inventory-tracked (spec §4.9).

use ar_rs::repos::invoice_repo::{Invoice, InvoiceError};
use ar_rs::services::credit_note_service::{self, CreditNoteServiceError, IssueCreditNoteInput};
use ar_rs::services::invoice_service::{self, CreateInvoiceInput, CreateInvoiceLineInput, InvoiceServiceError};
use ar_rs::services::payment_service::{self, PaymentServiceError};
use chrono::NaiveDate;
use gl_rs::services::company_bootstrap_service::SALES_INCOME_CODE;
use inventory_rs::repos::item_repo::{self, ItemError};
use party_rs::repos::customer_repo::{self, CustomerError};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::repos::entity_map_repo::{self, EntityMapError};

const INTEGRATION: &str = "piti";

#[derive(Debug, thiserror::Error)]
pub enum PosImportServiceError {
    #[error("sale must have at least one line")]
    NoLines,
    #[error(transparent)]
    EntityMap(#[from] EntityMapError),
    #[error(transparent)]
    Customer(#[from] CustomerError),
    #[error(transparent)]
    Item(#[from] ItemError),
    #[error(transparent)]
    Invoice(#[from] InvoiceServiceError),
    #[error(transparent)]
    InvoiceRepo(#[from] InvoiceError),
    #[error(transparent)]
    Payment(#[from] PaymentServiceError),
    #[error(transparent)]
    CreditNote(#[from] CreditNoteServiceError),
}

pub struct PosSaleLineInput {
    pub external_item_id: Option<String>,
    pub sku: String,
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
}

pub struct PosPaymentInput {
    pub amount: Decimal,
    pub bank_account_code: String,
}

pub struct PosSaleInput {
    pub tenant_id: Uuid,
    pub external_sale_id: String,
    pub external_customer_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub currency: String,
    pub sale_date: NaiveDate,
    pub lines: Vec<PosSaleLineInput>,
    pub payment: Option<PosPaymentInput>,
    pub closed_through_date: Option<NaiveDate>,
}

pub struct PosRefundInput {
    pub tenant_id: Uuid,
    pub external_refund_id: String,
    pub external_customer_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub currency: String,
    pub refund_date: NaiveDate,
    pub amount: Decimal,
    pub tax_amount: Decimal,
    pub closed_through_date: Option<NaiveDate>,
}

/// Resolves a customer by external-id mapping, then by phone, else creates
/// one — and always writes/confirms the `IntegrationEntityMap` row so the
/// next import for this foreign customer id is a single indexed lookup.
async fn resolve_customer(
    pool: &PgPool,
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    name: &str,
    phone: Option<&str>,
    external_customer_id: Option<&str>,
) -> Result<Uuid, PosImportServiceError> {
    let customer = customer_repo::find_or_create_by_external_ref_or_phone(
        pool,
        tenant_id,
        name,
        phone,
        external_customer_id,
    )
    .await?;

    if let Some(ext_id) = external_customer_id {
        entity_map_repo::find_or_insert(tx, tenant_id, INTEGRATION, "customer", ext_id, customer.id).await?;
    }
    Ok(customer.id)
}

/// Resolves an item by external-id mapping, then by SKU, else creates one
/// with `trackInventory=false` — items created through this path are never
/// inventory-tracked, since the foreign POS owns stock truth (spec §4.9).
async fn resolve_item(
    pool: &PgPool,
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    tenant_id_str: &str,
    line: &PosSaleLineInput,
) -> Result<Uuid, PosImportServiceError> {
    if let Some(ext_id) = &line.external_item_id {
        if let Some(mapped) = entity_map_repo::find(tx, tenant_id, INTEGRATION, "item", ext_id).await? {
            return Ok(mapped.local_id);
        }
    }

    let item = item_repo::find_or_create_untracked_by_sku(
        pool,
        tenant_id_str,
        &line.name,
        &line.sku,
        line.unit_price,
        SALES_INCOME_CODE,
    )
    .await?;

    if let Some(ext_id) = &line.external_item_id {
        entity_map_repo::find_or_insert(tx, tenant_id, INTEGRATION, "item", ext_id, item.id).await?;
    }
    Ok(item.id)
}

pub struct ImportedSale {
    pub invoice: Invoice,
    pub already_imported: bool,
}

pub async fn import_sale(
    pool: &PgPool,
    tx: &mut Transaction<'_, Postgres>,
    input: PosSaleInput,
) -> Result<ImportedSale, PosImportServiceError> {
    if input.lines.is_empty() {
        return Err(PosImportServiceError::NoLines);
    }

    if let Some(existing) =
        entity_map_repo::find(tx, input.tenant_id, INTEGRATION, "invoice", &input.external_sale_id).await?
    {
        let invoice = ar_rs::repos::invoice_repo::find_by_id(&mut **tx, input.tenant_id, existing.local_id).await?;
        return Ok(ImportedSale {
            invoice,
            already_imported: true,
        });
    }

    let tenant_id_str = input.tenant_id.to_string();
    let customer_id = resolve_customer(
        pool,
        tx,
        input.tenant_id,
        &input.customer_name,
        input.customer_phone.as_deref(),
        input.external_customer_id.as_deref(),
    )
    .await?;

    let mut lines = Vec::with_capacity(input.lines.len());
    for line in &input.lines {
        let item_id = resolve_item(pool, tx, input.tenant_id, &tenant_id_str, line).await?;
        lines.push(CreateInvoiceLineInput {
            item_id,
            description: line.name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            discount_amount: Decimal::ZERO,
            tax_rate: line.tax_rate,
            income_account_code: SALES_INCOME_CODE.to_string(),
        });
    }

    let (invoice, _lines) = invoice_service::create_invoice(
        tx,
        CreateInvoiceInput {
            tenant_id: input.tenant_id,
            customer_id,
            number: format!("POS-{}", input.external_sale_id),
            invoice_date: input.sale_date,
            due_date: None,
            currency: input.currency.clone(),
            location_id: None,
            lines,
        },
    )
    .await?;

    let posted = invoice_service::post_invoice(
        tx,
        pool,
        input.tenant_id,
        invoice.id,
        input.closed_through_date,
    )
    .await?;

    if let Some(payment) = input.payment {
        payment_service::record_payment(
            tx,
            input.tenant_id,
            invoice.id,
            input.sale_date,
            payment.amount,
            payment.bank_account_code,
            input.closed_through_date,
        )
        .await?;
    }

    entity_map_repo::insert(
        tx,
        input.tenant_id,
        INTEGRATION,
        "invoice",
        &input.external_sale_id,
        invoice.id,
    )
    .await?;

    let final_invoice = ar_rs::repos::invoice_repo::find_by_id(&mut **tx, input.tenant_id, posted.invoice.id).await?;
    Ok(ImportedSale {
        invoice: final_invoice,
        already_imported: false,
    })
}

pub struct ImportedRefund {
    pub credit_note_id: Uuid,
    pub already_imported: bool,
}

pub async fn import_refund(
    pool: &PgPool,
    tx: &mut Transaction<'_, Postgres>,
    input: PosRefundInput,
) -> Result<ImportedRefund, PosImportServiceError> {
    if let Some(existing) = entity_map_repo::find(
        tx,
        input.tenant_id,
        INTEGRATION,
        "credit_note",
        &input.external_refund_id,
    )
    .await?
    {
        return Ok(ImportedRefund {
            credit_note_id: existing.local_id,
            already_imported: true,
        });
    }

    let customer_id = resolve_customer(
        pool,
        tx,
        input.tenant_id,
        &input.customer_name,
        input.customer_phone.as_deref(),
        input.external_customer_id.as_deref(),
    )
    .await?;

    let credit_note = credit_note_service::issue_credit_note(
        tx,
        IssueCreditNoteInput {
            tenant_id: input.tenant_id,
            customer_id,
            credit_date: input.refund_date,
            currency: input.currency,
            amount: input.amount,
            income_account_code: SALES_INCOME_CODE.to_string(),
            tax_amount: input.tax_amount,
            closed_through_date: input.closed_through_date,
        },
    )
    .await?;

    entity_map_repo::insert(
        tx,
        input.tenant_id,
        INTEGRATION,
        "credit_note",
        &input.external_refund_id,
        credit_note.id,
    )
    .await?;

    Ok(ImportedRefund {
        credit_note_id: credit_note.id,
        already_imported: false,
    })
}
