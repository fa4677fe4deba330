//! Balance delta computation from journal entries
//!
//! This module provides deterministic computation of balance deltas from journal lines.
//! Deltas are grouped by (account_code, currency) to support multi-currency accounting.

use std::collections::HashMap;
use thiserror::Error;

/// Balance delta for a single account/currency combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDelta {
    pub account_code: String,
    pub currency: String,
    pub debit_delta: i64,
    pub credit_delta: i64,
}

/// Key for grouping deltas by account and currency
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DeltaKey {
    account_code: String,
    currency: String,
}

/// Errors that can occur during delta computation
#[derive(Debug, Error)]
pub enum DeltaError {
    #[error("Currency mismatch: journal entry must have single currency, found multiple")]
    CurrencyMismatch,

    #[error("Empty journal lines: cannot compute deltas from empty line set")]
    EmptyLines,
}

/// Input journal line for delta computation
///
/// This is a simplified view of journal lines that only includes
/// the fields needed for balance delta calculation.
#[derive(Debug, Clone)]
pub struct JournalLineInput {
    pub account_ref: String,
    pub debit_minor: i64,
    pub credit_minor: i64,
}

/// Compute balance deltas from journal lines
///
/// Groups debits and credits by (account_code, currency) to determine
/// which balances need to be updated.
///
/// # Arguments
/// * `lines` - Journal lines to process
/// * `currency` - Journal entry currency (all lines must have same currency)
///
/// # Returns
/// Vector of balance deltas, one per unique (account_code, currency) combination
///
/// # Errors
/// * `DeltaError::EmptyLines` - If lines vector is empty
///
/// # Example
/// ```
/// use gl_rs::services::balance_deltas::{compute_deltas, JournalLineInput};
///
/// let lines = vec![
///     JournalLineInput {
///         account_ref: "1000".to_string(),
///         debit_minor: 10000,
///         credit_minor: 0,
///     },
///     JournalLineInput {
///         account_ref: "4000".to_string(),
///         debit_minor: 0,
///         credit_minor: 10000,
///     },
/// ];
///
/// let deltas = compute_deltas(&lines, "USD").unwrap();
/// assert_eq!(deltas.len(), 2);
/// ```
pub fn compute_deltas(
    lines: &[JournalLineInput],
    currency: &str,
) -> Result<Vec<BalanceDelta>, DeltaError> {
    if lines.is_empty() {
        return Err(DeltaError::EmptyLines);
    }

    // Accumulate deltas by (account_code, currency)
    let mut delta_map: HashMap<DeltaKey, (i64, i64)> = HashMap::new();

    for line in lines {
        let key = DeltaKey {
            account_code: line.account_ref.clone(),
            currency: currency.to_string(),
        };

        let (debit_sum, credit_sum) = delta_map.entry(key).or_insert((0, 0));
        *debit_sum += line.debit_minor;
        *credit_sum += line.credit_minor;
    }

    // Convert map to vector of deltas
    let mut deltas: Vec<BalanceDelta> = delta_map
        .into_iter()
        .map(|(key, (debit_delta, credit_delta))| BalanceDelta {
            account_code: key.account_code,
            currency: key.currency,
            debit_delta,
            credit_delta,
        })
        .collect();

    // Sort for deterministic ordering (important for testing and audit)
    deltas.sort_by(|a, b| {
        a.account_code
            .cmp(&b.account_code)
            .then_with(|| a.currency.cmp(&b.currency))
    });

    Ok(deltas)
}
