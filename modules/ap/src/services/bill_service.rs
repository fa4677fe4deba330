//! C7 bill lifecycle: draft creation, posting (Dr Inventory/Expense per line,
//! Dr Tax Receivable, Cr AP), and void. Reversed-polarity mirror of
//! `ar-rs`'s `invoice_service` — posting a bill's tracked lines records IN
//! moves at the bill's own line cost (`MoveCost::Supplied`) rather than OUT
//! moves at the running average, since a purchase is what sets the average,
//! not what draws down from it.

use chrono::NaiveDate;
use gl_rs::contracts::gl_posting_request_v1::{GlPostingRequestV1, JournalLine, SourceDocType};
use gl_rs::services::company_bootstrap_service::{AP_CODE, INVENTORY_ASSET_CODE, TAX_RECEIVABLE_CODE};
use inventory_rs::repos::item_repo;
use inventory_rs::repos::stock_move_repo::Direction;
use inventory_rs::services::location_service::{self, LocationResolutionError};
use inventory_rs::services::move_service::{self, MoveCost, RecordMoveRequest};
use money::Money;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tax_core::TaxLine;
use uuid::Uuid;

use crate::repos::ap_payment_repo;
use crate::repos::bill_repo::{self, Bill, BillError, BillLine, BillStatus, NewBill, NewBillLine};

#[derive(Debug, thiserror::Error)]
pub enum BillServiceError {
    #[error("bill must have at least one line")]
    NoLines,
    #[error("line quantity must be greater than zero")]
    InvalidQuantity,
    #[error("tax rate must be within [0, 1], got {0}")]
    InvalidTaxRate(Decimal),
    #[error("discount amount {discount} exceeds line subtotal {subtotal}")]
    DiscountExceedsSubtotal { discount: Decimal, subtotal: Decimal },
    #[error(transparent)]
    Bill(#[from] BillError),
    #[error(transparent)]
    Payment(#[from] ap_payment_repo::ApPaymentError),
    #[error("bill {id} is not in DRAFT status")]
    NotDraft { id: Uuid },
    #[error("bill {id} is not POSTED or PARTIAL")]
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

pub struct CreateBillLineInput {
    pub item_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub discount_amount: Decimal,
    pub tax_rate: Decimal,
    pub expense_account_code: String,
}

pub struct CreateBillInput {
    pub tenant_id: Uuid,
    pub vendor_id: Uuid,
    pub number: String,
    pub bill_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub currency: String,
    pub location_id: Option<Uuid>,
    pub lines: Vec<CreateBillLineInput>,
}

/// Recomputes `taxAmount`/`lineTotal` from `unitCost`/`discountAmount`/`taxRate`
/// rather than trusting caller-supplied totals, mirroring `invoice_service`'s
/// "never trust client-computed totals" rule (spec §4.4).
pub async fn create_bill(
    tx: &mut Transaction<'_, Postgres>,
    input: CreateBillInput,
) -> Result<(Bill, Vec<BillLine>), BillServiceError> {
    if input.lines.is_empty() {
        return Err(BillServiceError::NoLines);
    }

    let mut subtotal = Decimal::ZERO;
    let mut tax_total = Decimal::ZERO;
    let mut new_lines = Vec::with_capacity(input.lines.len());

    for line in input.lines {
        if line.quantity <= Decimal::ZERO {
            return Err(BillServiceError::InvalidQuantity);
        }
        let gross = Money::from_decimal(line.quantity * line.unit_cost);
        if line.discount_amount > gross.inner() {
            return Err(BillServiceError::DiscountExceedsSubtotal {
                discount: line.discount_amount,
                subtotal: gross.inner(),
            });
        }
        let net = gross.checked_sub(Money::from_decimal(line.discount_amount));
        let rate = money::Rate::new(line.tax_rate)
            .map_err(|_| BillServiceError::InvalidTaxRate(line.tax_rate))?;
        let tax_line = TaxLine {
            taxable_amount: net,
            rate,
        };
        let tax_amount = tax_line.tax_amount();
        let line_total = tax_line.total_with_tax();

        subtotal = subtotal + net.inner();
        tax_total = tax_total + tax_amount.inner();

        new_lines.push(NewBillLine {
            item_id: line.item_id,
            description: line.description,
            quantity: line.quantity,
            unit_cost: line.unit_cost,
            discount_amount: line.discount_amount,
            tax_rate: line.tax_rate,
            tax_amount: tax_amount.inner(),
            line_total: line_total.inner(),
            expense_account_code: line.expense_account_code,
        });
    }

    let total = subtotal + tax_total;

    let (bill, lines) = bill_repo::insert_draft(
        tx,
        NewBill {
            tenant_id: input.tenant_id,
            vendor_id: input.vendor_id,
            number: input.number,
            bill_date: input.bill_date,
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

    Ok((bill, lines))
}

pub struct PostedBill {
    pub bill: Bill,
    pub journal_entry_id: Uuid,
}

#[allow(clippy::too_many_arguments)]
pub async fn post_bill(
    tx: &mut Transaction<'_, Postgres>,
    pool: &PgPool,
    tenant_id: Uuid,
    bill_id: Uuid,
    closed_through_date: Option<NaiveDate>,
) -> Result<PostedBill, BillServiceError> {
    let bill = bill_repo::find_by_id(&mut **tx, tenant_id, bill_id).await?;
    if bill.status != BillStatus::Draft {
        return Err(BillServiceError::NotDraft { id: bill_id });
    }
    let lines = bill_repo::lines_for(&mut **tx, bill_id).await?;

    let mut gl_lines = Vec::with_capacity(lines.len() + 2);
    let mut tracked_move_ids = Vec::new();
    let tenant_id_str = tenant_id.to_string();

    for line in &lines {
        let net_amount = line.line_total - line.tax_amount;
        let item = item_repo::find_by_id_tx(tx, &tenant_id_str, line.item_id).await?;

        if item.track_inventory {
            let location_id = location_service::resolve_location(pool, &tenant_id_str, &item, bill.location_id)
                .await?
                .expect("tracked item resolved a location or erred");

            let unit_cost = if line.quantity.is_zero() {
                Decimal::ZERO
            } else {
                net_amount / line.quantity
            };

            let recorded = move_service::record_move(
                tx,
                RecordMoveRequest {
                    tenant_id: tenant_id_str.clone(),
                    item_id: item.id,
                    location_id,
                    direction: Direction::In,
                    move_date: bill.bill_date,
                    quantity: line.quantity,
                    reference_type: "ApBill".to_string(),
                    reference_id: bill_id.to_string(),
                    journal_entry_id: None,
                },
                MoveCost::Supplied(unit_cost),
                closed_through_date,
                &bill.currency,
            )
            .await?;
            tracked_move_ids.push(recorded.stock_move.id);

            gl_lines.push(JournalLine {
                account_ref: INVENTORY_ASSET_CODE.to_string(),
                debit: net_amount,
                credit: Decimal::ZERO,
                memo: Some(line.description.clone()),
                dimensions: None,
            });
        } else {
            gl_lines.push(JournalLine {
                account_ref: line.expense_account_code.clone(),
                debit: net_amount,
                credit: Decimal::ZERO,
                memo: Some(line.description.clone()),
                dimensions: None,
            });
        }
    }

    if bill.tax_amount > Decimal::ZERO {
        gl_lines.push(JournalLine {
            account_ref: TAX_RECEIVABLE_CODE.to_string(),
            debit: bill.tax_amount,
            credit: Decimal::ZERO,
            memo: Some("Input tax".to_string()),
            dimensions: None,
        });
    }

    gl_lines.push(JournalLine {
        account_ref: AP_CODE.to_string(),
        debit: Decimal::ZERO,
        credit: bill.total,
        memo: Some(format!("Bill {}", bill.number)),
        dimensions: Some(gl_rs::contracts::gl_posting_request_v1::Dimensions {
            customer_id: None,
            vendor_id: Some(bill.vendor_id.to_string()),
            location_id: bill.location_id.map(|l| l.to_string()),
            job_id: None,
            department: None,
            class: None,
            project: None,
        }),
    });

    let event_id = Uuid::new_v4();
    let payload = GlPostingRequestV1 {
        posting_date: bill.bill_date.format("%Y-%m-%d").to_string(),
        currency: bill.currency.clone(),
        source_doc_type: SourceDocType::ApBill,
        source_doc_id: bill_id.to_string(),
        description: format!("Bill {}", bill.number),
        lines: gl_lines,
    };

    let journal_entry_id = gl_rs::posting::post_journal_entry(
        tx,
        &tenant_id_str,
        closed_through_date,
        "ap",
        event_id,
        &bill_id.to_string(),
        &payload,
    )
    .await?;

    bill_repo::mark_posted(tx, bill_id, journal_entry_id).await?;

    for move_id in tracked_move_ids {
        inventory_rs::repos::stock_move_repo::attach_journal_entry(tx, move_id, journal_entry_id)
            .await
            .map_err(move_service::MoveError::from)?;
    }

    event_bus::outbox::enqueue(
        tx,
        Some(tenant_id),
        "bill",
        bill_id,
        "ap.bill.posted.v1",
        1,
        &platform_contracts::BillPostedV1 {
            bill_id,
            tenant_id,
            vendor_id: bill.vendor_id,
            currency: bill.currency.clone(),
            total: bill.total.to_string(),
        },
    )
    .await?;

    let mut posted = bill;
    posted.status = BillStatus::Posted;
    posted.journal_entry_id = Some(journal_entry_id);

    Ok(PostedBill {
        bill: posted,
        journal_entry_id,
    })
}

/// Reverses the bill's posting entry (Dr/Cr swapped). Inventory-tracked
/// lines get an `ApBillVoid`-referenced compensating OUT move that removes
/// the exact quantity and cost the original receipt move added, mirroring
/// `invoice_service::void_invoice`'s `MoveCost::Preserved` treatment.
pub async fn void_bill(
    tx: &mut Transaction<'_, Postgres>,
    pool: &PgPool,
    tenant_id: Uuid,
    bill_id: Uuid,
    closed_through_date: Option<NaiveDate>,
) -> Result<Uuid, BillServiceError> {
    let bill = bill_repo::find_by_id(&mut **tx, tenant_id, bill_id).await?;
    if !matches!(bill.status, BillStatus::Posted | BillStatus::Partial) {
        return Err(BillServiceError::NotVoidable { id: bill_id });
    }
    let original_entry_id = bill
        .journal_entry_id
        .expect("posted/partial bill always carries a journal_entry_id");

    let lines = bill_repo::lines_for(&mut **tx, bill_id).await?;
    let tenant_id_str = tenant_id.to_string();

    let mut reversing_lines = Vec::with_capacity(lines.len() + 2);
    let mut tracked_move_ids = Vec::new();

    for line in &lines {
        let net_amount = line.line_total - line.tax_amount;
        let item = item_repo::find_by_id_tx(tx, &tenant_id_str, line.item_id).await?;

        if item.track_inventory {
            let location_id = location_service::resolve_location(pool, &tenant_id_str, &item, bill.location_id)
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
                .find(|m| m.reference_type == "ApBill" && m.reference_id == bill_id.to_string())
                .expect("original ApBill move exists for a posted bill");

            let recorded = move_service::record_move(
                tx,
                RecordMoveRequest {
                    tenant_id: tenant_id_str.clone(),
                    item_id: item.id,
                    location_id,
                    direction: Direction::Out,
                    move_date: chrono::Utc::now().date_naive(),
                    quantity: line.quantity,
                    reference_type: "ApBillVoid".to_string(),
                    reference_id: bill_id.to_string(),
                    journal_entry_id: None,
                },
                MoveCost::Preserved {
                    unit_cost: original_move.unit_cost_applied,
                    total_cost: original_move.total_cost_applied,
                },
                closed_through_date,
                &bill.currency,
            )
            .await?;
            tracked_move_ids.push(recorded.stock_move.id);

            reversing_lines.push(JournalLine {
                account_ref: INVENTORY_ASSET_CODE.to_string(),
                debit: Decimal::ZERO,
                credit: net_amount,
                memo: Some(line.description.clone()),
                dimensions: None,
            });
        } else {
            reversing_lines.push(JournalLine {
                account_ref: line.expense_account_code.clone(),
                debit: Decimal::ZERO,
                credit: net_amount,
                memo: Some(line.description.clone()),
                dimensions: None,
            });
        }
    }

    if bill.tax_amount > Decimal::ZERO {
        reversing_lines.push(JournalLine {
            account_ref: TAX_RECEIVABLE_CODE.to_string(),
            debit: Decimal::ZERO,
            credit: bill.tax_amount,
            memo: Some("Void input tax".to_string()),
            dimensions: None,
        });
    }

    reversing_lines.push(JournalLine {
        account_ref: AP_CODE.to_string(),
        debit: bill.total,
        credit: Decimal::ZERO,
        memo: Some(format!("Void bill {}", bill.number)),
        dimensions: None,
    });

    let event_id = Uuid::new_v4();
    let payload = GlPostingRequestV1 {
        posting_date: chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string(),
        currency: bill.currency.clone(),
        source_doc_type: SourceDocType::ArAdjustment,
        source_doc_id: format!("void:{bill_id}"),
        description: format!("Void of bill {} (entry {})", bill.number, original_entry_id),
        lines: reversing_lines,
    };

    let reversal_entry_id = gl_rs::posting::post_journal_entry(
        tx,
        &tenant_id_str,
        closed_through_date,
        "ap",
        event_id,
        &bill_id.to_string(),
        &payload,
    )
    .await?;

    bill_repo::mark_void(tx, bill_id).await?;

    for move_id in tracked_move_ids {
        inventory_rs::repos::stock_move_repo::attach_journal_entry(tx, move_id, reversal_entry_id)
            .await
            .map_err(move_service::MoveError::from)?;
    }

    Ok(reversal_entry_id)
}
