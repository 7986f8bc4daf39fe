//! Closed-form lease payment disclosure formula.
//!
//! Turns a set of deal parameters into the figures a lease disclosure
//! shows: adjusted capitalized cost, monthly depreciation, rent charge,
//! base payment, sales tax and the total monthly payment. The cap cost
//! reduction is derived from the customer's credits after upfront charges;
//! a negative result is never returned, it is reported as `overflow`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LeaseQuoteError;
use crate::types::{round_cents, Money, MoneyFactor, Rate};
use crate::LeaseQuoteResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How sales tax is applied to the lease.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxPolicy {
    /// Tax is charged on each base payment.
    #[default]
    OnPayment,
    /// Tax on the cap cost reduction and taxable fees is amortized into the
    /// payment on top of the tax on the base payment.
    OnCapReduction,
}

/// Inputs for a single lease deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealParameters {
    /// Negotiated selling price of the vehicle
    pub selling_price: Money,
    /// Trade-in equity
    #[serde(default)]
    pub trade_value: Money,
    /// Customer cash down
    #[serde(default)]
    pub cash_down: Money,
    /// Manufacturer lease cash applied to the deal
    #[serde(default)]
    pub lease_cash_used: Money,
    /// Other rebates
    #[serde(default)]
    pub rebates: Money,
    /// Capitalized fees subject to tax (doc + acquisition)
    #[serde(default)]
    pub taxable_fees: Money,
    /// Fees collected at signing (license + title)
    #[serde(default)]
    pub non_taxable_fees: Money,
    /// Contract residual value at lease end
    pub residual_value: Money,
    /// Lease money factor
    pub money_factor: MoneyFactor,
    /// Lease term in months
    pub term_months: u32,
    /// Sales tax rate as a decimal (0.0725 = 7.25%)
    pub tax_rate: Rate,
    /// Tax treatment
    #[serde(default)]
    pub tax_policy: TaxPolicy,
}

impl DealParameters {
    /// Cash-like credits available to reduce the capitalized cost.
    pub fn credits(&self) -> Money {
        self.cash_down + self.lease_cash_used + self.rebates
    }
}

/// Monthly payment disclosure for one deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentBreakdown {
    /// Cap cost reduction applied (never negative)
    pub cap_cost_reduction: Money,
    /// Upfront charges the credits could not cover
    pub overflow: Money,
    /// Net capitalized cost after reductions
    pub adjusted_cap_cost: Money,
    /// Monthly depreciation
    pub depreciation: Money,
    /// Monthly rent charge
    pub rent_charge: Money,
    /// Depreciation plus rent charge
    pub base_payment: Money,
    /// Sales tax per month
    pub monthly_tax: Money,
    /// Base payment plus tax
    pub monthly_payment: Money,
    /// Total advance for disclosure
    pub total_advance: Money,
    /// Depreciation restated against the total advance
    pub average_monthly_depreciation: Money,
    /// Rent charge restated against the total advance
    pub average_lease_charge: Money,
    /// Sales tax over the full term
    pub total_sales_tax: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Evaluate a deal, deriving the cap cost reduction from the customer's
/// credits. Trade value is applied to the selling price in full.
pub fn evaluate(params: &DealParameters) -> LeaseQuoteResult<PaymentBreakdown> {
    validate_deal(params)?;

    let upfront = upfront_charges(params);
    let raw_ccr = params.credits() - upfront;
    let (ccr, overflow) = if raw_ccr < Decimal::ZERO {
        (Decimal::ZERO, -raw_ccr)
    } else {
        (raw_ccr, Decimal::ZERO)
    };

    let mut breakdown = compute_breakdown(params, ccr, params.trade_value);
    breakdown.overflow = overflow;
    Ok(breakdown)
}

/// Evaluate a deal with an explicit cap cost reduction and the portion of
/// trade equity applied to the selling price. Credits on `params` are ignored.
pub fn evaluate_with_reduction(
    params: &DealParameters,
    cap_cost_reduction: Money,
    trade_applied_to_price: Money,
) -> LeaseQuoteResult<PaymentBreakdown> {
    validate_deal(params)?;
    if cap_cost_reduction < Decimal::ZERO {
        return Err(LeaseQuoteError::InvalidInput {
            field: "cap_cost_reduction".into(),
            reason: "Cap cost reduction cannot be negative".into(),
        });
    }
    if trade_applied_to_price < Decimal::ZERO {
        return Err(LeaseQuoteError::InvalidInput {
            field: "trade_applied_to_price".into(),
            reason: "Applied trade value cannot be negative".into(),
        });
    }
    Ok(compute_breakdown(
        params,
        cap_cost_reduction,
        trade_applied_to_price,
    ))
}

/// Amount due at signing before any cap cost reduction: non-taxable fees
/// plus the tax on the unreduced first payment.
pub fn upfront_charges(params: &DealParameters) -> Money {
    let unreduced = base_payment(params, Decimal::ZERO, params.trade_value);
    round_cents(params.non_taxable_fees + params.tax_rate * unreduced)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub(crate) fn validate_deal(params: &DealParameters) -> LeaseQuoteResult<()> {
    if params.term_months == 0 {
        return Err(LeaseQuoteError::InvalidInput {
            field: "term_months".into(),
            reason: "Lease term must be greater than zero".into(),
        });
    }
    if params.selling_price <= Decimal::ZERO {
        return Err(LeaseQuoteError::InvalidInput {
            field: "selling_price".into(),
            reason: "Selling price must be positive".into(),
        });
    }
    if params.tax_rate < Decimal::ZERO || params.tax_rate > Decimal::ONE {
        return Err(LeaseQuoteError::InvalidInput {
            field: "tax_rate".into(),
            reason: "Tax rate must be a decimal between 0 and 1".into(),
        });
    }
    if params.money_factor < Decimal::ZERO {
        return Err(LeaseQuoteError::InvalidInput {
            field: "money_factor".into(),
            reason: "Money factor cannot be negative".into(),
        });
    }

    let amounts = [
        ("trade_value", params.trade_value),
        ("cash_down", params.cash_down),
        ("lease_cash_used", params.lease_cash_used),
        ("rebates", params.rebates),
        ("taxable_fees", params.taxable_fees),
        ("non_taxable_fees", params.non_taxable_fees),
        ("residual_value", params.residual_value),
    ];
    for (field, amount) in amounts {
        if amount < Decimal::ZERO {
            return Err(LeaseQuoteError::InvalidInput {
                field: field.into(),
                reason: "Amount cannot be negative".into(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn adjusted_cap_cost(params: &DealParameters, ccr: Money, trade_applied: Money) -> Money {
    params.selling_price + params.taxable_fees - ccr - trade_applied
}

/// Unrounded monthly depreciation and rent charge.
fn payment_components(params: &DealParameters, ccr: Money, trade_applied: Money) -> (Money, Money) {
    let net_cap_cost = adjusted_cap_cost(params, ccr, trade_applied);
    let term = Decimal::from(params.term_months);
    let depreciation = (net_cap_cost - params.residual_value) / term;
    let rent_charge = params.money_factor * (net_cap_cost + params.residual_value);
    (depreciation, rent_charge)
}

fn base_payment(params: &DealParameters, ccr: Money, trade_applied: Money) -> Money {
    let (depreciation, rent_charge) = payment_components(params, ccr, trade_applied);
    round_cents(depreciation + rent_charge)
}

fn compute_breakdown(params: &DealParameters, ccr: Money, trade_applied: Money) -> PaymentBreakdown {
    let term = Decimal::from(params.term_months);
    let (depreciation, rent_charge) = payment_components(params, ccr, trade_applied);
    let base_payment = round_cents(depreciation + rent_charge);

    let monthly_tax = match params.tax_policy {
        TaxPolicy::OnPayment => round_cents(base_payment * params.tax_rate),
        TaxPolicy::OnCapReduction => round_cents(
            params.tax_rate * (base_payment + (ccr + params.taxable_fees) / term),
        ),
    };
    let monthly_payment = base_payment + monthly_tax;
    let total_sales_tax = monthly_tax * term;

    let total_advance = round_cents(
        params.selling_price - trade_applied + total_sales_tax + params.taxable_fees - ccr,
    );
    let average_monthly_depreciation = round_cents((total_advance - params.residual_value) / term);
    let average_lease_charge =
        round_cents(params.money_factor * (total_advance + params.residual_value));

    PaymentBreakdown {
        cap_cost_reduction: ccr,
        overflow: Decimal::ZERO,
        adjusted_cap_cost: adjusted_cap_cost(params, ccr, trade_applied),
        depreciation: round_cents(depreciation),
        rent_charge: round_cents(rent_charge),
        base_payment,
        monthly_tax,
        monthly_payment,
        total_advance,
        average_monthly_depreciation,
        average_lease_charge,
        total_sales_tax,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// 36-month lease on a $25,040 vehicle at a 61% residual.
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
    fn test_reference_scenario_to_the_cent() {
        let result = evaluate(&sample_deal()).unwrap();

        // (25040 - 15255) / 36 = 271.8056
        assert_eq!(result.depreciation, dec!(271.81));
        // 0.00131 * (25040 + 15255) = 52.7865
        assert_eq!(result.rent_charge, dec!(52.79));
        assert_eq!(result.base_payment, dec!(324.59));
        assert_eq!(result.monthly_tax, dec!(23.53));
        assert_eq!(result.monthly_payment, dec!(348.12));
        assert_eq!(result.total_sales_tax, dec!(847.08));
        assert_eq!(result.total_advance, dec!(25887.08));
        assert_eq!(result.average_monthly_depreciation, dec!(295.34));
        assert_eq!(result.average_lease_charge, dec!(53.90));
    }

    #[test]
    fn test_zero_incentives_leave_no_reduction() {
        let result = evaluate(&sample_deal()).unwrap();

        assert_eq!(result.cap_cost_reduction, Decimal::ZERO);
        assert_eq!(result.adjusted_cap_cost, dec!(25040));
        // Tax on the unreduced first payment is still owed at signing
        assert_eq!(result.overflow, dec!(23.53));
    }

    #[test]
    fn test_credits_cover_upfront_charges() {
        let mut deal = sample_deal();
        deal.cash_down = dec!(2000);
        let result = evaluate(&deal).unwrap();

        assert_eq!(result.cap_cost_reduction, dec!(1976.47));
        assert_eq!(result.overflow, Decimal::ZERO);
        assert_eq!(result.base_payment, dec!(267.10));
        assert_eq!(result.monthly_tax, dec!(19.36));
        assert_eq!(result.monthly_payment, dec!(286.46));
    }

    #[test]
    fn test_trade_reduces_selling_price() {
        let mut deal = sample_deal();
        deal.trade_value = dec!(3000);
        let result = evaluate(&deal).unwrap();

        assert_eq!(result.adjusted_cap_cost, dec!(22040));
        assert_eq!(result.base_payment, dec!(237.33));
        assert_eq!(result.monthly_payment, dec!(254.54));
        assert_eq!(result.total_advance, dec!(22659.56));
    }

    #[test]
    fn test_non_taxable_fees_add_to_overflow() {
        let mut deal = sample_deal();
        deal.non_taxable_fees = dec!(150);
        deal.cash_down = dec!(100);
        let result = evaluate(&deal).unwrap();

        assert_eq!(result.cap_cost_reduction, Decimal::ZERO);
        // 150 + 23.53 - 100
        assert_eq!(result.overflow, dec!(73.53));
    }

    #[test]
    fn test_tax_on_cap_reduction_policy() {
        let mut deal = sample_deal();
        deal.taxable_fees = dec!(962.50);
        let on_payment = evaluate(&deal).unwrap();

        deal.tax_policy = TaxPolicy::OnCapReduction;
        let on_reduction = evaluate(&deal).unwrap();

        assert_eq!(on_payment.base_payment, dec!(352.59));
        assert_eq!(on_payment.monthly_tax, dec!(25.56));
        // 0.0725 * (352.59 + 962.50 / 36)
        assert_eq!(on_reduction.monthly_tax, dec!(27.50));
        assert_eq!(on_reduction.base_payment, on_payment.base_payment);
    }

    #[test]
    fn test_explicit_reduction_ignores_credits() {
        let mut deal = sample_deal();
        deal.cash_down = dec!(5000);
        let result = evaluate_with_reduction(&deal, dec!(1000), Decimal::ZERO).unwrap();

        assert_eq!(result.cap_cost_reduction, dec!(1000));
        assert_eq!(result.adjusted_cap_cost, dec!(24040));
        assert_eq!(result.overflow, Decimal::ZERO);
    }

    #[test]
    fn test_more_cash_down_never_raises_payment() {
        let mut deal = sample_deal();
        let mut previous = evaluate(&deal).unwrap().monthly_payment;
        for step in 1..=40 {
            deal.cash_down = Decimal::from(step * 125);
            let payment = evaluate(&deal).unwrap().monthly_payment;
            assert!(
                payment <= previous,
                "payment rose from {previous} to {payment} at cash down {}",
                deal.cash_down
            );
            previous = payment;
        }
    }

    #[test]
    fn test_zero_term_rejected() {
        let mut deal = sample_deal();
        deal.term_months = 0;
        let err = evaluate(&deal).unwrap_err();
        assert!(matches!(
            err,
            LeaseQuoteError::InvalidInput { ref field, .. } if field == "term_months"
        ));
    }

    #[test]
    fn test_tax_rate_out_of_range_rejected() {
        let mut deal = sample_deal();
        deal.tax_rate = dec!(7.25);
        assert!(evaluate(&deal).is_err());
    }

    #[test]
    fn test_negative_amounts_rejected() {
        let mut deal = sample_deal();
        deal.rebates = dec!(-1);
        assert!(evaluate(&deal).is_err());

        let deal = sample_deal();
        assert!(evaluate_with_reduction(&deal, dec!(-5), Decimal::ZERO).is_err());
    }
}
