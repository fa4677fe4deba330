//! Shared tax rate validation and amount computation used by `ar` and `ap`
//! line totals. A `TaxProvider` trait point is kept for a future external
//! tax-calculation service, but the ledger core itself only needs a flat
//! per-line rate — the spec's non-goals exclude jurisdictional tax engines.

use money::{Money, Rate};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum TaxError {
    #[error("tax rate must be between 0 and 1: {0}")]
    InvalidRate(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TaxLine {
    pub taxable_amount: Money,
    pub rate: Rate,
}

impl TaxLine {
    pub fn tax_amount(&self) -> Money {
        self.rate.apply(self.taxable_amount)
    }

    pub fn total_with_tax(&self) -> Money {
        self.taxable_amount + self.tax_amount()
    }
}

/// A pluggable source of tax rates, kept as a seam for an external tax
/// service without the ledger core depending on one concretely.
pub trait TaxProvider: Send + Sync {
    fn rate_for(&self, tax_code: &str) -> Option<Rate>;
}

pub struct FlatTaxProvider {
    pub default_rate: Rate,
}

impl TaxProvider for FlatTaxProvider {
    fn rate_for(&self, _tax_code: &str) -> Option<Rate> {
        Some(self.default_rate)
    }
}
