//! C6 invoice lifecycle: draft creation, posting (Dr AR / Cr income+tax,
//! plus the Dr COGS / Cr Inventory leg for tracked lines), and void. Posting
//! and void each build their own `GlPostingRequestV1` and hand it straight to
//! `gl_rs::posting::post_journal_entry` inside the caller's transaction —
//! there is no separate reversal engine here (see DESIGN.md).

use chrono::NaiveDate;
use gl_rs::contracts::gl_posting_request_v1::{GlPostingRequestV1, JournalLine, SourceDocType};
use gl_rs::services::company_bootstrap_service::{AR_CODE, COGS_CODE, INVENTORY_ASSET_CODE, TAX_PAYABLE_CODE};
use inventory_rs::repos::item_repo;
use inventory_rs::repos::stock_move_repo::Direction;
use inventory_rs::services::location_service::{self, LocationResolutionError};
use inventory_rs::services::move_service::{self, MoveCost, RecordMoveRequest};
use money::Money;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tax_core::TaxLine;
use uuid::Uuid;

use crate::repos::invoice_repo::{
    self, Invoice, InvoiceError, InvoiceLine, InvoiceStatus, NewInvoice, NewInvoiceLine,
};
use crate::repos::payment_repo;

#[derive(Debug, thiserror::Error)]
pub enum InvoiceServiceError {
    #[error("invoice must have at least one line")]
    NoLines,
    #[error("line quantity must be greater than zero")]
    InvalidQuantity,
    #[error("tax rate must be within [0, 1], got {0}")]
    InvalidTaxRate(Decimal),
    #[error("discount amount {discount} exceeds line subtotal {subtotal}")]
    DiscountExceedsSubtotal { discount: Decimal, subtotal: Decimal },
    #[error(transparent)]
    Invoice(#[from] InvoiceError),
    #[error(transparent)]
    Payment(#[from] payment_repo::PaymentError),
    #[error("invoice {id} is not in DRAFT status")]
    NotDraft { id: Uuid },
    #[error("invoice {id} is not POSTED or PARTIAL")]
    NotVoidable { id: Uuid },
    #[error(transparent)]
    Item(#[from] item_repo::ItemError),
    #[error(transparent)]
    Location(#[from] LocationResolutionError),
    #[error(transparent)]
    Move(#[from] move_service::MoveError),
    #[error(transparent)]
    Posting(#[from] gl_rs::posting::PostingError),
    #[error(transparent)]
    Outbox(#[from] event_bus::outbox::OutboxError),
}

pub struct CreateInvoiceLineInput {
    pub item_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_amount: Decimal,
    pub tax_rate: Decimal,
    pub income_account_code: String,
}

pub struct CreateInvoiceInput {
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub number: String,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub currency: String,
    pub location_id: Option<Uuid>,
    pub lines: Vec<CreateInvoiceLineInput>,
}

/// Recomputes `taxAmount`/`lineTotal` from `unitPrice`/`discountAmount`/`taxRate`
/// rather than trusting caller-supplied totals, per the posting engine's own
/// "never trust client-computed totals" rule (spec §4.4).
pub async fn create_invoice(
    tx: &mut Transaction<'_, Postgres>,
    input: CreateInvoiceInput,
) -> Result<(Invoice, Vec<InvoiceLine>), InvoiceServiceError> {
    if input.lines.is_empty() {
        return Err(InvoiceServiceError::NoLines);
    }

    let mut subtotal = Decimal::ZERO;
    let mut tax_total = Decimal::ZERO;
    let mut new_lines = Vec::with_capacity(input.lines.len());

    for line in input.lines {
        if line.quantity <= Decimal::ZERO {
            return Err(InvoiceServiceError::InvalidQuantity);
        }
        let gross = Money::from_decimal(line.quantity * line.unit_price);
        if line.discount_amount > gross.inner() {
            return Err(InvoiceServiceError::DiscountExceedsSubtotal {
                discount: line.discount_amount,
                subtotal: gross.inner(),
            });
        }
        let net = gross.checked_sub(Money::from_decimal(line.discount_amount));
        let rate = money::Rate::new(line.tax_rate)
            .map_err(|_| InvoiceServiceError::InvalidTaxRate(line.tax_rate))?;
        let tax_line = TaxLine {
            taxable_amount: net,
            rate,
        };
        let tax_amount = tax_line.tax_amount();
        let line_total = tax_line.total_with_tax();

        subtotal = subtotal + net.inner();
        tax_total = tax_total + tax_amount.inner();

        new_lines.push(NewInvoiceLine {
            item_id: line.item_id,
            description: line.description,
            quantity: line.quantity,
            unit_price: line.unit_price,
            discount_amount: line.discount_amount,
            tax_rate: line.tax_rate,
            tax_amount: tax_amount.inner(),
            line_total: line_total.inner(),
            income_account_code: line.income_account_code,
        });
    }

    let total = subtotal + tax_total;

    let (invoice, lines) = invoice_repo::insert_draft(
        tx,
        NewInvoice {
            tenant_id: input.tenant_id,
            customer_id: input.customer_id,
            number: input.number,
            invoice_date: input.invoice_date,
            due_date: input.due_date,
            currency: input.currency,
            subtotal,
            tax_amount: tax_total,
            total,
            location_id: input.location_id,
            lines: new_lines,
        },
    )
    .await?;

    Ok((invoice, lines))
}

pub struct PostedInvoice {
    pub invoice: Invoice,
    pub journal_entry_id: Uuid,
}

#[allow(clippy::too_many_arguments)]
pub async fn post_invoice(
    tx: &mut Transaction<'_, Postgres>,
    pool: &PgPool,
    tenant_id: Uuid,
    invoice_id: Uuid,
    closed_through_date: Option<NaiveDate>,
) -> Result<PostedInvoice, InvoiceServiceError> {
    let invoice = invoice_repo::find_by_id(&mut **tx, tenant_id, invoice_id).await?;
    if invoice.status != InvoiceStatus::Draft {
        return Err(InvoiceServiceError::NotDraft { id: invoice_id });
    }
    let lines = invoice_repo::lines_for(&mut **tx, invoice_id).await?;

    let mut gl_lines = vec![JournalLine {
        account_ref: AR_CODE.to_string(),
        debit: invoice.total,
        credit: Decimal::ZERO,
        memo: Some(format!("Invoice {}", invoice.number)),
        dimensions: Some(gl_rs::contracts::gl_posting_request_v1::Dimensions {
            customer_id: Some(invoice.customer_id.to_string()),
            vendor_id: None,
            location_id: invoice.location_id.map(|l| l.to_string()),
            job_id: None,
            department: None,
            class: None,
            project: None,
        }),
    }];

    let mut cogs_total = Decimal::ZERO;
    let mut tracked_move_ids = Vec::new();
    let tenant_id_str = tenant_id.to_string();

    for line in &lines {
        let net_amount = line.line_total - line.tax_amount;
        gl_lines.push(JournalLine {
            account_ref: line.income_account_code.clone(),
            debit: Decimal::ZERO,
            credit: net_amount,
            memo: Some(line.description.clone()),
            dimensions: None,
        });

        let item = item_repo::find_by_id_tx(tx, &tenant_id_str, line.item_id).await?;
        if item.track_inventory {
            let location_id = location_service::resolve_location(pool, &tenant_id_str, &item, invoice.location_id)
                .await?
                .expect("tracked item resolved a location or erred");

            let recorded = move_service::record_move(
                tx,
                RecordMoveRequest {
                    tenant_id: tenant_id_str.clone(),
                    item_id: item.id,
                    location_id,
                    direction: Direction::Out,
                    move_date: invoice.invoice_date,
                    quantity: line.quantity,
                    reference_type: "ArInvoice".to_string(),
                    reference_id: invoice_id.to_string(),
                    journal_entry_id: None,
                },
                MoveCost::CurrentAverage,
                closed_through_date,
                &invoice.currency,
            )
            .await?;
            cogs_total += recorded.stock_move.total_cost_applied;
            tracked_move_ids.push(recorded.stock_move.id);
        }
    }

    if invoice.tax_amount > Decimal::ZERO {
        gl_lines.push(JournalLine {
            account_ref: TAX_PAYABLE_CODE.to_string(),
            debit: Decimal::ZERO,
            credit: invoice.tax_amount,
            memo: Some("Sales tax".to_string()),
            dimensions: None,
        });
    }

    if cogs_total > Decimal::ZERO {
        gl_lines.push(JournalLine {
            account_ref: COGS_CODE.to_string(),
            debit: cogs_total,
            credit: Decimal::ZERO,
            memo: Some("COGS".to_string()),
            dimensions: None,
        });
        gl_lines.push(JournalLine {
            account_ref: INVENTORY_ASSET_CODE.to_string(),
            debit: Decimal::ZERO,
            credit: cogs_total,
            memo: Some("Inventory issue".to_string()),
            dimensions: None,
        });
    }

    let event_id = Uuid::new_v4();
    let payload = GlPostingRequestV1 {
        posting_date: invoice.invoice_date.format("%Y-%m-%d").to_string(),
        currency: invoice.currency.clone(),
        source_doc_type: SourceDocType::ArInvoice,
        source_doc_id: invoice_id.to_string(),
        description: format!("Invoice {}", invoice.number),
        lines: gl_lines,
    };

    let journal_entry_id = gl_rs::posting::post_journal_entry(
        tx,
        &tenant_id_str,
        closed_through_date,
        "ar",
        event_id,
        &invoice_id.to_string(),
        &payload,
    )
    .await?;

    invoice_repo::mark_posted(tx, invoice_id, journal_entry_id).await?;

    for move_id in tracked_move_ids {
        inventory_rs::repos::stock_move_repo::attach_journal_entry(tx, move_id, journal_entry_id)
            .await
            .map_err(move_service::MoveError::from)?;
    }

    event_bus::outbox::enqueue(
        tx,
        Some(tenant_id),
        "invoice",
        invoice_id,
        "ar.invoice.posted.v1",
        1,
        &platform_contracts::InvoicePostedV1 {
            invoice_id,
            tenant_id,
            customer_id: invoice.customer_id,
            currency: invoice.currency.clone(),
            total: invoice.total.to_string(),
        },
    )
    .await?;

    let mut posted = invoice;
    posted.status = InvoiceStatus::Posted;
    posted.journal_entry_id = Some(journal_entry_id);

    Ok(PostedInvoice {
        invoice: posted,
        journal_entry_id,
    })
}

/// Reverses the invoice's posting entry (Dr/Cr swapped) and any still-active
/// payments against it, in that order, all inside the caller's transaction.
/// Inventory-tracked lines get an `ArInvoiceVoid`-referenced compensating
/// move that restores the exact quantity and cost the original issue move
/// consumed (`MoveCost::Preserved`).
pub async fn void_invoice(
    tx: &mut Transaction<'_, Postgres>,
    pool: &PgPool,
    tenant_id: Uuid,
    invoice_id: Uuid,
    closed_through_date: Option<NaiveDate>,
) -> Result<Uuid, InvoiceServiceError> {
    let invoice = invoice_repo::find_by_id(&mut **tx, tenant_id, invoice_id).await?;
    if !matches!(invoice.status, InvoiceStatus::Posted | InvoiceStatus::Partial) {
        return Err(InvoiceServiceError::NotVoidable { id: invoice_id });
    }
    let original_entry_id = invoice
        .journal_entry_id
        .expect("posted/partial invoice always carries a journal_entry_id");

    let lines = invoice_repo::lines_for(&mut **tx, invoice_id).await?;
    let tenant_id_str = tenant_id.to_string();

    let mut reversing_lines = vec![JournalLine {
        account_ref: AR_CODE.to_string(),
        debit: Decimal::ZERO,
        credit: invoice.total,
        memo: Some(format!("Void invoice {}", invoice.number)),
        dimensions: None,
    }];

    let mut cogs_total = Decimal::ZERO;
    let mut tracked_move_ids = Vec::new();
    for line in &lines {
        let net_amount = line.line_total - line.tax_amount;
        reversing_lines.push(JournalLine {
            account_ref: line.income_account_code.clone(),
            debit: net_amount,
            credit: Decimal::ZERO,
            memo: Some(line.description.clone()),
            dimensions: None,
        });

        let item = item_repo::find_by_id_tx(tx, &tenant_id_str, line.item_id).await?;
        if item.track_inventory {
            let location_id = location_service::resolve_location(pool, &tenant_id_str, &item, invoice.location_id)
                .await?
                .expect("tracked item resolved a location or erred");

            let original_moves = inventory_rs::repos::stock_move_repo::load_ordered_range(
                tx,
                &tenant_id_str,
                location_id,
                item.id,
                None,
                None,
            )
            .await
            .map_err(move_service::MoveError::from)?;
            let original_move = original_moves
                .iter()
                .find(|m| m.reference_type == "ArInvoice" && m.reference_id == invoice_id.to_string())
                .expect("original ArInvoice move exists for a posted invoice");

            let recorded = move_service::record_move(
                tx,
                RecordMoveRequest {
                    tenant_id: tenant_id_str.clone(),
                    item_id: item.id,
                    location_id,
                    direction: Direction::In,
                    move_date: chrono::Utc::now().date_naive(),
                    quantity: line.quantity,
                    reference_type: "ArInvoiceVoid".to_string(),
                    reference_id: invoice_id.to_string(),
                    journal_entry_id: None,
                },
                MoveCost::Preserved {
                    unit_cost: original_move.unit_cost_applied,
                    total_cost: original_move.total_cost_applied,
                },
                closed_through_date,
                &invoice.currency,
            )
            .await?;
            cogs_total += recorded.stock_move.total_cost_applied;
            tracked_move_ids.push(recorded.stock_move.id);
        }
    }

    if invoice.tax_amount > Decimal::ZERO {
        reversing_lines.push(JournalLine {
            account_ref: TAX_PAYABLE_CODE.to_string(),
            debit: invoice.tax_amount,
            credit: Decimal::ZERO,
            memo: Some("Void sales tax".to_string()),
            dimensions: None,
        });
    }

    if cogs_total > Decimal::ZERO {
        reversing_lines.push(JournalLine {
            account_ref: INVENTORY_ASSET_CODE.to_string(),
            debit: cogs_total,
            credit: Decimal::ZERO,
            memo: Some("Void inventory issue".to_string()),
            dimensions: None,
        });
        reversing_lines.push(JournalLine {
            account_ref: COGS_CODE.to_string(),
            debit: Decimal::ZERO,
            credit: cogs_total,
            memo: Some("Void COGS".to_string()),
            dimensions: None,
        });
    }

    let event_id = Uuid::new_v4();
    let payload = GlPostingRequestV1 {
        posting_date: chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string(),
        currency: invoice.currency.clone(),
        source_doc_type: SourceDocType::ArAdjustment,
        source_doc_id: format!("void:{invoice_id}"),
        description: format!("Void of invoice {} (entry {})", invoice.number, original_entry_id),
        lines: reversing_lines,
    };

    let reversal_entry_id = gl_rs::posting::post_journal_entry(
        tx,
        &tenant_id_str,
        closed_through_date,
        "ar",
        event_id,
        &invoice_id.to_string(),
        &payload,
    )
    .await?;

    invoice_repo::mark_void(tx, invoice_id).await?;

    for move_id in tracked_move_ids {
        inventory_rs::repos::stock_move_repo::attach_journal_entry(tx, move_id, reversal_entry_id)
            .await
            .map_err(move_service::MoveError::from)?;
    }

    event_bus::outbox::enqueue(
        tx,
        Some(tenant_id),
        "invoice",
        invoice_id,
        "ar.invoice.voided.v1",
        1,
        &platform_contracts::InvoiceVoidedV1 {
            invoice_id,
            tenant_id,
            customer_id: invoice.customer_id,
            reversal_journal_entry_id: reversal_entry_id,
        },
    )
    .await?;

    Ok(reversal_entry_id)
}
