//! Deal pricing: formula plus fund allocation.
//!
//! The upfront charges are paid out of the customer's pool first (lease cash
//! before cash down before trade by default). Whatever is left of the cash
//! sources becomes the cap cost reduction and leftover trade equity comes
//! off the selling price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::allocation::{self, Allocation, FundPool, FundSource};
use super::formula::{self, DealParameters, PaymentBreakdown};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::LeaseQuoteResult;

/// Deal parameters plus the order in which customer funds are drawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealQuoteInput {
    #[serde(flatten)]
    pub deal: DealParameters,
    #[serde(default = "allocation::canonical_priority")]
    pub fund_priority: Vec<FundSource>,
}

/// A fully priced deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealQuote {
    pub breakdown: PaymentBreakdown,
    pub allocation: Allocation,
    /// Non-taxable fees plus tax on the first payment
    pub upfront_charges: Money,
    /// Trade equity left over after the upfront charges
    pub trade_applied_to_price: Money,
    /// Upfront charges no source could cover
    pub unpaid_balance: Money,
}

impl FundPool {
    /// The customer's funds as stated on the deal.
    pub fn from_deal(params: &DealParameters) -> Self {
        FundPool {
            lease_cash: params.lease_cash_used,
            cash_down: params.cash_down,
            trade_value: params.trade_value,
            rebates: params.rebates,
        }
    }
}

/// Price a deal, resolving upfront charges against the customer's funds.
pub fn price_deal(params: &DealParameters, priority: &[FundSource]) -> LeaseQuoteResult<DealQuote> {
    formula::validate_deal(params)?;

    let upfront_charges = formula::upfront_charges(params);
    let pool = FundPool::from_deal(params);
    let allocation = allocation::allocate(upfront_charges, &pool, priority)?;

    let remaining = &allocation.remaining;
    let cap_cost_reduction = remaining.lease_cash + remaining.cash_down + remaining.rebates;
    let trade_applied_to_price = remaining.trade_value;

    let breakdown =
        formula::evaluate_with_reduction(params, cap_cost_reduction, trade_applied_to_price)?;
    let unpaid_balance = allocation.unpaid_balance;

    Ok(DealQuote {
        breakdown,
        allocation,
        upfront_charges,
        trade_applied_to_price,
        unpaid_balance,
    })
}

/// Price a deal and wrap the result with methodology and warnings.
pub fn quote_deal(input: &DealQuoteInput) -> LeaseQuoteResult<ComputationOutput<DealQuote>> {
    let start = Instant::now();
    let quote = price_deal(&input.deal, &input.fund_priority)?;

    let mut warnings = Vec::new();
    if quote.unpaid_balance > Decimal::ZERO {
        warnings.push(format!(
            "Customer funds leave {} of the upfront charges unpaid; it is due at signing.",
            quote.unpaid_balance
        ));
    }
    if quote.breakdown.depreciation < Decimal::ZERO {
        warnings.push(
            "Reductions exceed the depreciable amount; depreciation is negative.".into(),
        );
    }

    Ok(with_metadata(
        "Closed-form lease disclosure with priority fund allocation",
        input,
        warnings,
        start.elapsed().as_micros() as u64,
        quote,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::allocation::CANONICAL_PRIORITY;
    use crate::payment::formula::TaxPolicy;
    use rust_decimal_macros::dec;

    fn sample_deal() -> DealParameters {
        DealParameters {
            selling_price: dec!(25040),
            trade_value: Decimal::ZERO,
            cash_down: Decimal::ZERO,
            lease_cash_used: Decimal::ZERO,
            rebates: Decimal::ZERO,
            taxable_fees: Decimal::ZERO,
            non_taxable_fees: Decimal::ZERO,
            residual_value: dec!(15255),
            money_factor: dec!(0.00131),
            term_months: 36,
            tax_rate: dec!(0.0725),
            tax_policy: TaxPolicy::OnPayment,
        }
    }

    #[test]
    fn test_matches_closed_form_when_cash_covers_charges() {
        let mut deal = sample_deal();
        deal.cash_down = dec!(2000);

        let priced = price_deal(&deal, &CANONICAL_PRIORITY).unwrap();
        let closed_form = formula::evaluate(&deal).unwrap();

        assert_eq!(priced.breakdown.cap_cost_reduction, closed_form.cap_cost_reduction);
        assert_eq!(priced.breakdown.monthly_payment, closed_form.monthly_payment);
        assert_eq!(priced.allocation.consumed.cash_down, dec!(23.53));
    }

    #[test]
    fn test_trade_covers_charges_before_price_reduction() {
        let mut deal = sample_deal();
        deal.trade_value = dec!(3000);

        let priced = price_deal(&deal, &CANONICAL_PRIORITY).unwrap();

        // Upfront charges use the trade-reduced first payment: 0.0725 * 237.33
        assert_eq!(priced.upfront_charges, dec!(17.21));
        assert_eq!(priced.allocation.consumed.trade_value, dec!(17.21));
        assert_eq!(priced.trade_applied_to_price, dec!(2982.79));
        assert_eq!(priced.breakdown.cap_cost_reduction, Decimal::ZERO);
        assert!(priced.allocation.is_fully_covered());
    }

    #[test]
    fn test_lease_cash_consumed_before_cash_down() {
        let mut deal = sample_deal();
        deal.lease_cash_used = dec!(10);
        deal.cash_down = dec!(1000);

        let priced = price_deal(&deal, &CANONICAL_PRIORITY).unwrap();

        assert_eq!(priced.allocation.consumed.lease_cash, dec!(10));
        assert_eq!(priced.allocation.consumed.cash_down, dec!(13.53));
        assert_eq!(priced.breakdown.cap_cost_reduction, dec!(986.47));
    }

    #[test]
    fn test_no_funds_leaves_unpaid_balance() {
        let output = quote_deal(&DealQuoteInput {
            deal: sample_deal(),
            fund_priority: allocation::canonical_priority(),
        })
        .unwrap();

        assert_eq!(output.result.unpaid_balance, dec!(23.53));
        assert_eq!(output.result.breakdown.cap_cost_reduction, Decimal::ZERO);
        assert_eq!(output.result.breakdown.monthly_payment, dec!(348.12));
        assert!(output.warnings.iter().any(|w| w.contains("unpaid")));
    }

    #[test]
    fn test_reduction_never_negative() {
        let mut deal = sample_deal();
        deal.non_taxable_fees = dec!(400);
        for cash in [dec!(0), dec!(100), dec!(423.53), dec!(500)] {
            deal.cash_down = cash;
            let priced = price_deal(&deal, &CANONICAL_PRIORITY).unwrap();
            assert!(priced.breakdown.cap_cost_reduction >= Decimal::ZERO);
            assert!(priced.unpaid_balance >= Decimal::ZERO);
        }
    }
}
