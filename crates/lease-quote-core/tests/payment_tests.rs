use lease_quote_core::payment::allocation::{self, FundPool, FundSource, CANONICAL_PRIORITY};
use lease_quote_core::payment::deal::{self, DealQuoteInput};
use lease_quote_core::payment::formula::{self, DealParameters, TaxPolicy};
use lease_quote_core::payment::solver::{self, SolverInput, SolverSettings};
use lease_quote_core::LeaseQuoteError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn elantra_36() -> DealParameters {
    // $25,040 sedan, 61% residual, tier 1 money factor, 7.25% county tax
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

// ===========================================================================
// Formula
// ===========================================================================

#[test]
fn test_reference_deal_payment() {
    let b = formula::evaluate(&elantra_36()).unwrap();

    assert_eq!(b.cap_cost_reduction, Decimal::ZERO);
    assert_eq!(b.base_payment, dec!(324.59));
    assert_eq!(b.monthly_tax, dec!(23.53));
    assert_eq!(b.monthly_payment, dec!(348.12));
}

#[test]
fn test_zero_incentive_baseline_matches_direct_formula() {
    let deal = elantra_36();
    let b = formula::evaluate(&deal).unwrap();

    let term = Decimal::from(deal.term_months);
    let direct_base = ((deal.selling_price - deal.residual_value) / term
        + deal.money_factor * (deal.selling_price + deal.residual_value))
        .round_dp(2);
    let direct_tax = (direct_base * deal.tax_rate).round_dp(2);

    assert_eq!(b.monthly_payment, direct_base + direct_tax);
}

#[test]
fn test_reduction_non_negative_across_inputs() {
    let mut deal = elantra_36();
    deal.non_taxable_fees = dec!(250);
    for cash in [0, 50, 100, 273, 274, 1000, 5000] {
        for trade in [0, 500, 4000] {
            deal.cash_down = Decimal::from(cash);
            deal.trade_value = Decimal::from(trade);
            let b = formula::evaluate(&deal).unwrap();
            assert!(b.cap_cost_reduction >= Decimal::ZERO);
            assert!(b.overflow >= Decimal::ZERO);
            // Exactly one of the two is positive, or both zero
            assert!(b.cap_cost_reduction.is_zero() || b.overflow.is_zero());
        }
    }
}

#[test]
fn test_payment_monotonic_in_cash_down() {
    let mut deal = elantra_36();
    deal.taxable_fees = dec!(962.50);
    deal.lease_cash_used = dec!(500);

    let payments: Vec<Decimal> = (0..=20)
        .map(|i| {
            deal.cash_down = Decimal::from(i * 250);
            deal::price_deal(&deal, &CANONICAL_PRIORITY)
                .unwrap()
                .breakdown
                .monthly_payment
        })
        .collect();

    assert!(payments.windows(2).all(|w| w[1] <= w[0]));
}

#[test]
fn test_invalid_deal_rejected_everywhere() {
    let mut deal = elantra_36();
    deal.money_factor = dec!(-0.001);

    assert!(matches!(
        formula::evaluate(&deal),
        Err(LeaseQuoteError::InvalidInput { .. })
    ));
    assert!(deal::price_deal(&deal, &CANONICAL_PRIORITY).is_err());
    assert!(solver::solve(dec!(2000), &deal, dec!(0.005), 100).is_err());
}

// ===========================================================================
// Allocation
// ===========================================================================

#[test]
fn test_allocation_conservation_and_order() {
    let pool = FundPool {
        lease_cash: dec!(1000),
        cash_down: dec!(2000),
        trade_value: dec!(3500),
        rebates: dec!(500),
    };

    for amount in [dec!(0), dec!(999.99), dec!(3000), dec!(6500), dec!(7000), dec!(10000)] {
        let a = allocation::allocate(amount, &pool, &CANONICAL_PRIORITY).unwrap();
        assert_eq!(a.consumed.total() + a.remaining.total(), pool.total());
        assert_eq!(a.consumed.total() + a.unpaid_balance, amount);
    }

    let a = allocation::allocate(dec!(3000), &pool, &CANONICAL_PRIORITY).unwrap();
    assert_eq!(a.consumed.get(FundSource::LeaseCash), dec!(1000));
    assert_eq!(a.consumed.get(FundSource::CashDown), dec!(2000));
    assert_eq!(a.consumed.get(FundSource::TradeValue), Decimal::ZERO);
}

#[test]
fn test_allocation_unpaid_balance() {
    let pool = FundPool {
        lease_cash: dec!(100),
        cash_down: dec!(200),
        trade_value: Decimal::ZERO,
        rebates: dec!(50),
    };
    let a = allocation::allocate(dec!(500), &pool, &CANONICAL_PRIORITY).unwrap();

    assert_eq!(a.remaining, FundPool::default());
    assert_eq!(a.unpaid_balance, dec!(150));
}

// ===========================================================================
// Deal pricing
// ===========================================================================

#[test]
fn test_quote_deal_from_json() {
    let input: DealQuoteInput = serde_json::from_str(
        r#"{
            "selling_price": "25040",
            "cash_down": "2000",
            "residual_value": "15255",
            "money_factor": "0.00131",
            "term_months": 36,
            "tax_rate": "0.0725"
        }"#,
    )
    .unwrap();
    assert_eq!(input.fund_priority, allocation::canonical_priority());

    let output = deal::quote_deal(&input).unwrap();
    assert_eq!(output.result.breakdown.cap_cost_reduction, dec!(1976.47));
    assert_eq!(output.result.breakdown.monthly_payment, dec!(286.46));
    assert!(output.warnings.is_empty());
}

// ===========================================================================
// Solver
// ===========================================================================

#[test]
fn test_solver_converges_within_reachable_range() {
    let mut deal = elantra_36();
    deal.taxable_fees = dec!(962.50);
    deal.non_taxable_fees = dec!(120);

    let floor = solver::solve(Decimal::ZERO, &deal, dec!(0.005), 1000)
        .unwrap()
        .total_due_at_signing;

    for target in [floor + dec!(1), dec!(1500), dec!(2999.99), dec!(5000)] {
        let r = solver::solve(target, &deal, dec!(0.005), 1000).unwrap();
        assert!(r.converged, "no convergence for target {target}");
        assert!((r.total_due_at_signing - target).abs() <= dec!(0.005));
        assert_eq!(r.ccr_tax, (r.capped_ccr * deal.tax_rate).round_dp(4));
    }
}

#[test]
fn test_solver_input_defaults() {
    let input: SolverInput = serde_json::from_str(
        r#"{
            "selling_price": "25040",
            "residual_value": "15255",
            "money_factor": "0.00131",
            "term_months": 36,
            "tax_rate": "0.0725",
            "target_due_at_signing": "2000"
        }"#,
    )
    .unwrap();
    assert_eq!(input.settings, SolverSettings::default());

    let output = solver::solve_due_at_signing(&input).unwrap();
    assert!(output.result.converged);
    assert!(output.warnings.is_empty());
}
