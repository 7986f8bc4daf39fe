//! Fund allocation across a customer's incentive sources.
//!
//! Splits an amount owed (typically the upfront charges the cap cost
//! reduction formula could not absorb) across lease cash, cash down, trade
//! equity and rebates in priority order. Each source is drained before the
//! next is touched. Whatever cannot be covered is reported as an unpaid
//! balance.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LeaseQuoteError;
use crate::types::Money;
use crate::LeaseQuoteResult;

/// A named source of customer funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundSource {
    LeaseCash,
    CashDown,
    TradeValue,
    Rebates,
}

/// Lease cash, then cash down, then trade equity, then rebates.
pub const CANONICAL_PRIORITY: [FundSource; 4] = [
    FundSource::LeaseCash,
    FundSource::CashDown,
    FundSource::TradeValue,
    FundSource::Rebates,
];

pub fn canonical_priority() -> Vec<FundSource> {
    CANONICAL_PRIORITY.to_vec()
}

/// Amounts available (or consumed) per source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FundPool {
    #[serde(default)]
    pub lease_cash: Money,
    #[serde(default)]
    pub cash_down: Money,
    #[serde(default)]
    pub trade_value: Money,
    #[serde(default)]
    pub rebates: Money,
}

impl FundPool {
    pub fn get(&self, source: FundSource) -> Money {
        match source {
            FundSource::LeaseCash => self.lease_cash,
            FundSource::CashDown => self.cash_down,
            FundSource::TradeValue => self.trade_value,
            FundSource::Rebates => self.rebates,
        }
    }

    /// Copy of the pool with one source replaced.
    pub fn with(mut self, source: FundSource, amount: Money) -> Self {
        match source {
            FundSource::LeaseCash => self.lease_cash = amount,
            FundSource::CashDown => self.cash_down = amount,
            FundSource::TradeValue => self.trade_value = amount,
            FundSource::Rebates => self.rebates = amount,
        }
        self
    }

    pub fn total(&self) -> Money {
        self.lease_cash + self.cash_down + self.trade_value + self.rebates
    }
}

/// Result of one allocation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Amount drawn from each source
    pub consumed: FundPool,
    /// Amount left in each source
    pub remaining: FundPool,
    /// Part of the requested amount no source could cover
    pub unpaid_balance: Money,
}

impl Allocation {
    pub fn is_fully_covered(&self) -> bool {
        self.unpaid_balance.is_zero()
    }
}

/// Draw `amount` from `sources` in `priority` order.
///
/// A non-positive amount consumes nothing. Sources missing from `priority`
/// are never drawn on.
pub fn allocate(
    amount: Money,
    sources: &FundPool,
    priority: &[FundSource],
) -> LeaseQuoteResult<Allocation> {
    validate_sources(sources)?;
    validate_priority(priority)?;

    let mut needed = amount.max(Decimal::ZERO);
    let mut consumed = FundPool::default();
    let mut remaining = *sources;

    for &source in priority {
        if needed.is_zero() {
            break;
        }
        let available = remaining.get(source);
        let take = available.min(needed);
        consumed = consumed.with(source, take);
        remaining = remaining.with(source, available - take);
        needed -= take;
    }

    if needed > Decimal::ZERO {
        warn!(
            requested = %amount,
            unpaid = %needed,
            "Customer funds do not cover the amount due"
        );
    } else {
        debug!(requested = %amount, consumed = %consumed.total(), "Allocated customer funds");
    }

    Ok(Allocation {
        consumed,
        remaining,
        unpaid_balance: needed,
    })
}

fn validate_sources(sources: &FundPool) -> LeaseQuoteResult<()> {
    for source in CANONICAL_PRIORITY {
        if sources.get(source) < Decimal::ZERO {
            return Err(LeaseQuoteError::InvalidInput {
                field: format!("{source:?}"),
                reason: "Fund source amounts cannot be negative".into(),
            });
        }
    }
    Ok(())
}

fn validate_priority(priority: &[FundSource]) -> LeaseQuoteResult<()> {
    for (i, source) in priority.iter().enumerate() {
        if priority[..i].contains(source) {
            return Err(LeaseQuoteError::InvalidInput {
                field: "fund_priority".into(),
                reason: format!("{source:?} appears more than once"),
            });
        }
    }
    Ok(())
}
