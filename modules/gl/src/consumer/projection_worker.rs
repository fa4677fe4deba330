//! Subscribes to `journal.entry.created` and applies each entry's lines into
//! the read-side projections (C11), via `projections::handle_journal_entry_created`.
//!
//! Grounded on `consumer::gl_posting_consumer` for the subscribe/process shape,
//! generalized through `event_consumer::EventHandler` so the retry-then-dead-letter
//! policy lives in one place instead of being copy-pasted per consumer.

use std::sync::Arc;

use event_consumer::EventHandler;
use platform_contracts::JournalEntryCreatedV1;
use sqlx::PgPool;

use crate::repos::account_repo::{self, AccountType};

pub struct ProjectionWorker {
    pool: PgPool,
}

impl ProjectionWorker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_account_class(account_type: AccountType) -> projections::AccountClass {
    match account_type {
        AccountType::Asset => projections::AccountClass::Asset,
        AccountType::Liability => projections::AccountClass::Liability,
        AccountType::Equity => projections::AccountClass::Equity,
        AccountType::Revenue => projections::AccountClass::Income,
        AccountType::Expense => projections::AccountClass::Expense,
    }
}

#[async_trait::async_trait]
impl EventHandler for ProjectionWorker {
    async fn handle(&self, message: &event_bus::BusMessage) -> Result<(), String> {
        let event: JournalEntryCreatedV1 =
            serde_json::from_slice(&message.payload).map_err(|e| e.to_string())?;

        let tenant_id = event.tenant_id.to_string();
        let mut lines = Vec::with_capacity(event.lines.len());
        for line in &event.lines {
            let account = account_repo::find_by_code(&self.pool, &tenant_id, &line.account_code)
                .await
                .map_err(|e| e.to_string())?
                .ok_or_else(|| format!("unknown account code {} for tenant {}", line.account_code, tenant_id))?;

            let debit: rust_decimal::Decimal = line.debit.parse().map_err(|e: rust_decimal::Error| e.to_string())?;
            let credit: rust_decimal::Decimal = line.credit.parse().map_err(|e: rust_decimal::Error| e.to_string())?;

            lines.push(projections::ProjectionLine {
                account_id: account.id,
                account_class: to_account_class(account.account_type),
                debit,
                credit,
            });
        }

        let mut tx = self.pool.begin().await.map_err(|e| e.to_string())?;
        projections::handle_journal_entry_created(&mut tx, event.journal_entry_id, &event, lines)
            .await
            .map_err(|e| e.to_string())?;
        tx.commit().await.map_err(|e| e.to_string())?;

        Ok(())
    }
}

/// Subject the outbox publisher uses for this event: `{aggregate_type}.events.{event_type}`,
/// where `journal_entry`'s outbox rows are enqueued by `posting::emit_journal_entry_created`.
pub const JOURNAL_ENTRY_CREATED_SUBJECT: &str = "journal_entry.events.journal.entry.created";

pub async fn start_projection_worker(bus: Arc<dyn event_bus::EventBus>, pool: PgPool) {
    let handler: Arc<dyn EventHandler> = Arc::new(ProjectionWorker::new(pool));
    let on_dead_letter = Arc::new(|msg: &event_bus::BusMessage, reason: &str| {
        tracing::error!(
            subject = %msg.subject,
            error = %reason,
            "projection worker exhausted retries, dropping event"
        );
    });

    tokio::spawn(async move {
        if let Err(e) = event_consumer::run_consumer_loop(
            bus,
            JOURNAL_ENTRY_CREATED_SUBJECT,
            handler,
            event_bus::consumer_retry::RetryConfig::default(),
            on_dead_letter,
        )
        .await
        {
            tracing::error!(error = %e, "projection worker consumer loop ended");
        }
    });
}
