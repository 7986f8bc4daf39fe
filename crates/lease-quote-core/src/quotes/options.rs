//! Quote option generation.
//!
//! Expands lease program rows into term x mileage options, adjusting the
//! residual for mileage and the money factor for tier and markup. Options
//! are priced lazily: nothing is evaluated until `price` or `balance` is
//! called, so editing one option's price or lease cash only reprices it.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use super::sources::LeaseProgramRow;
use crate::error::LeaseQuoteError;
use crate::payment::allocation::{self, FundSource};
use crate::payment::deal::{self, DealQuote};
use crate::payment::formula::{DealParameters, TaxPolicy};
use crate::payment::solver::{self, SolverResult, SolverSettings};
use crate::types::{round_cents, Money, MoneyFactor, Rate};
use crate::LeaseQuoteResult;
use tracing::warn;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const MILEAGE_OPTIONS: [u32; 3] = [10_000, 12_000, 15_000];
pub const DEFAULT_MONEY_FACTOR_MARKUP: MoneyFactor = dec!(0.0004);

const LOW_MILEAGE: u32 = 10_000;
const HIGH_MILEAGE: u32 = 15_000;
const LOW_MILEAGE_RESIDUAL_BUMP: Rate = dec!(0.01);
const HIGH_MILEAGE_RESIDUAL_CUT: Rate = dec!(0.02);
const LOW_MILEAGE_TERMS: RangeInclusive<u32> = 33..=48;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Availability {
    Available,
    Unavailable { reason: String },
}

/// One term x mileage lease option for a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteOption {
    pub term_months: u32,
    /// Annual mileage allowance
    pub mileage: u32,
    /// Mileage-adjusted residual as a fraction of MSRP
    pub residual_rate: Rate,
    pub residual_value: Money,
    pub money_factor: MoneyFactor,
    pub available_lease_cash: Money,
    pub lease_cash_used: Money,
    pub selling_price: Money,
    pub availability: Availability,
}

/// Funds the customer brings to every option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerFunds {
    #[serde(default)]
    pub trade_value: Money,
    #[serde(default)]
    pub cash_down: Money,
    #[serde(default)]
    pub rebates: Money,
}

/// Fees, tax and allocation rules shared by every option in a quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealTerms {
    #[serde(default)]
    pub taxable_fees: Money,
    #[serde(default)]
    pub non_taxable_fees: Money,
    pub tax_rate: Rate,
    #[serde(default)]
    pub tax_policy: TaxPolicy,
    #[serde(default = "allocation::canonical_priority")]
    pub fund_priority: Vec<FundSource>,
}

/// An option together with its priced deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedOption {
    pub key: String,
    pub option: QuoteOption,
    pub quote: DealQuote,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    LowestPayment,
    LowestTerm,
    LowestMileage,
    MostLeaseCash,
}

/// Restricts options to chosen terms and mileages. Empty sets match all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionFilter {
    #[serde(default)]
    pub terms: BTreeSet<u32>,
    #[serde(default)]
    pub mileages: BTreeSet<u32>,
}

impl OptionFilter {
    pub fn matches(&self, option: &QuoteOption) -> bool {
        (self.terms.is_empty() || self.terms.contains(&option.term_months))
            && (self.mileages.is_empty() || self.mileages.contains(&option.mileage))
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Build every term x mileage option from `programs`. A `markup` of true
/// adds the standard 0.0004 to each money factor. When several rows share
/// a term, the first one wins.
pub fn generate_options(
    programs: &[LeaseProgramRow],
    msrp: Money,
    tier: u8,
    markup: bool,
) -> LeaseQuoteResult<Vec<QuoteOption>> {
    let markup = if markup {
        DEFAULT_MONEY_FACTOR_MARKUP
    } else {
        Decimal::ZERO
    };
    generate_options_with_markup(programs, msrp, tier, markup)
}

/// As `generate_options` with an explicit money factor markup.
pub fn generate_options_with_markup(
    programs: &[LeaseProgramRow],
    msrp: Money,
    tier: u8,
    markup: MoneyFactor,
) -> LeaseQuoteResult<Vec<QuoteOption>> {
    if msrp <= Decimal::ZERO {
        return Err(LeaseQuoteError::InvalidInput {
            field: "msrp".into(),
            reason: "MSRP must be positive".into(),
        });
    }
    if markup < Decimal::ZERO {
        return Err(LeaseQuoteError::InvalidInput {
            field: "money_factor_markup".into(),
            reason: "Markup cannot be negative".into(),
        });
    }

    let mut seen_terms = BTreeSet::new();
    let mut options = Vec::with_capacity(programs.len() * MILEAGE_OPTIONS.len());
    for row in programs {
        if !seen_terms.insert(row.term_months) {
            warn!(
                model = %row.model_number,
                term = row.term_months,
                "Duplicate lease program row for term, keeping the first"
            );
            continue;
        }
        for mileage in MILEAGE_OPTIONS {
            options.push(build_option(row, msrp, tier, markup, mileage));
        }
    }
    Ok(options)
}

fn build_option(
    row: &LeaseProgramRow,
    msrp: Money,
    tier: u8,
    markup: MoneyFactor,
    mileage: u32,
) -> QuoteOption {
    let mut unavailable: Option<String> = None;

    let residual_rate = match row.residual {
        Some(base) => match mileage {
            LOW_MILEAGE if !LOW_MILEAGE_TERMS.contains(&row.term_months) => {
                unavailable = Some(format!(
                    "10,000 mi/yr residuals are only published for {}-{} month terms",
                    LOW_MILEAGE_TERMS.start(),
                    LOW_MILEAGE_TERMS.end()
                ));
                base
            }
            LOW_MILEAGE => base + LOW_MILEAGE_RESIDUAL_BUMP,
            HIGH_MILEAGE => base - HIGH_MILEAGE_RESIDUAL_CUT,
            _ => base,
        },
        None => {
            unavailable = Some("No residual published for this term".into());
            Decimal::ZERO
        }
    };

    if row.term_months == 0 {
        unavailable.get_or_insert_with(|| "Program term is zero months".into());
    }
    if residual_rate < Decimal::ZERO {
        unavailable.get_or_insert_with(|| {
            format!("Residual {residual_rate} is negative after the mileage adjustment")
        });
    }

    let money_factor = match row.money_factor_by_tier.get(&tier) {
        Some(mf) if *mf < Decimal::ZERO => {
            unavailable.get_or_insert_with(|| format!("Negative money factor for tier {tier}"));
            Decimal::ZERO
        }
        Some(mf) => *mf + markup,
        None => {
            unavailable.get_or_insert_with(|| format!("No money factor for tier {tier}"));
            Decimal::ZERO
        }
    };

    QuoteOption {
        term_months: row.term_months,
        mileage,
        residual_rate,
        residual_value: round_cents(msrp * residual_rate),
        money_factor,
        available_lease_cash: row.lease_cash,
        lease_cash_used: row.lease_cash,
        selling_price: msrp,
        availability: match unavailable {
            Some(reason) => Availability::Unavailable { reason },
            None => Availability::Available,
        },
    }
}

// ---------------------------------------------------------------------------
// Per-option pricing
// ---------------------------------------------------------------------------

impl QuoteOption {
    /// Stable identifier, e.g. `36_12000`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.term_months, self.mileage)
    }

    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }

    pub fn with_selling_price(mut self, selling_price: Money) -> LeaseQuoteResult<Self> {
        if selling_price <= Decimal::ZERO {
            return Err(LeaseQuoteError::InvalidInput {
                field: "selling_price".into(),
                reason: "Selling price must be positive".into(),
            });
        }
        self.selling_price = selling_price;
        Ok(self)
    }

    pub fn with_lease_cash_used(mut self, lease_cash_used: Money) -> LeaseQuoteResult<Self> {
        if lease_cash_used < Decimal::ZERO || lease_cash_used > self.available_lease_cash {
            return Err(LeaseQuoteError::InvalidInput {
                field: "lease_cash_used".into(),
                reason: format!(
                    "Lease cash used must be between 0 and {}",
                    self.available_lease_cash
                ),
            });
        }
        self.lease_cash_used = lease_cash_used;
        Ok(self)
    }

    /// Deal parameters for this option with the customer's funds.
    pub fn deal_parameters(
        &self,
        funds: &CustomerFunds,
        terms: &DealTerms,
    ) -> LeaseQuoteResult<DealParameters> {
        if let Availability::Unavailable { reason } = &self.availability {
            return Err(LeaseQuoteError::InsufficientData(format!(
                "Option {} is unavailable: {reason}",
                self.key()
            )));
        }
        Ok(DealParameters {
            selling_price: self.selling_price,
            trade_value: funds.trade_value,
            cash_down: funds.cash_down,
            lease_cash_used: self.lease_cash_used,
            rebates: funds.rebates,
            taxable_fees: terms.taxable_fees,
            non_taxable_fees: terms.non_taxable_fees,
            residual_value: self.residual_value,
            money_factor: self.money_factor,
            term_months: self.term_months,
            tax_rate: terms.tax_rate,
            tax_policy: terms.tax_policy,
        })
    }

    pub fn price(&self, funds: &CustomerFunds, terms: &DealTerms) -> LeaseQuoteResult<DealQuote> {
        let params = self.deal_parameters(funds, terms)?;
        deal::price_deal(&params, &terms.fund_priority)
    }

    /// Solve this option for a target total due at signing. The customer's
    /// cash down is what gets solved for, so it is ignored. Lease cash used
    /// and rebates reduce the cap cost on top of the solved amount without
    /// counting toward the signing total; trade equity reduces the price.
    pub fn balance(
        &self,
        target_due_at_signing: Money,
        funds: &CustomerFunds,
        terms: &DealTerms,
        settings: &SolverSettings,
    ) -> LeaseQuoteResult<SolverResult> {
        let params = self.deal_parameters(funds, terms)?;
        solver::solve(
            target_due_at_signing,
            &params,
            settings.tolerance,
            settings.max_iterations,
        )
    }
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Price every available option passing `filter` and order them by `sort_by`.
pub fn rank_options(
    options: &[QuoteOption],
    filter: &OptionFilter,
    sort_by: SortKey,
    funds: &CustomerFunds,
    terms: &DealTerms,
) -> LeaseQuoteResult<Vec<PricedOption>> {
    let mut priced = options
        .iter()
        .filter(|o| o.is_available() && filter.matches(o))
        .map(|o| {
            Ok(PricedOption {
                key: o.key(),
                option: o.clone(),
                quote: o.price(funds, terms)?,
            })
        })
        .collect::<LeaseQuoteResult<Vec<_>>>()?;

    priced.sort_by(|a, b| compare(a, b, sort_by));
    Ok(priced)
}

fn compare(a: &PricedOption, b: &PricedOption, sort_by: SortKey) -> Ordering {
    let by_term = a.option.term_months.cmp(&b.option.term_months);
    let by_mileage = a.option.mileage.cmp(&b.option.mileage);
    match sort_by {
        SortKey::LowestPayment => a
            .quote
            .breakdown
            .monthly_payment
            .cmp(&b.quote.breakdown.monthly_payment)
            .then(by_term)
            .then(by_mileage),
        SortKey::LowestTerm => by_term.then(by_mileage),
        SortKey::LowestMileage => by_mileage.then(by_term),
        SortKey::MostLeaseCash => b
            .option
            .available_lease_cash
            .cmp(&a.option.available_lease_cash)
            .then(by_term)
            .then(by_mileage),
    }
}
