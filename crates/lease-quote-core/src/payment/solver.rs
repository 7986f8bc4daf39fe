//! Cap cost reduction balancing solver.
//!
//! Finds the cap cost reduction whose total due at signing
//! (reduction + tax on the reduction + first payment) matches a target,
//! by bisection over `[0, target]`. Total due at signing is assumed to be
//! non-decreasing in the reduction, which holds because each dollar of
//! reduction adds `1 + tax_rate` upfront while lowering the first payment
//! by far less.
//!
//! Manufacturer lease cash and rebates are not paid by the customer at
//! signing: they reduce the cap cost on top of every guess and are left
//! out of the total due at signing. Cash down is what the solver finds, so
//! the deal's `cash_down` is ignored.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use super::formula::{self, DealParameters, PaymentBreakdown};
use crate::error::LeaseQuoteError;
use crate::types::{round_cents, with_metadata, ComputationOutput, Money};
use crate::LeaseQuoteResult;

pub const DEFAULT_TOLERANCE: Decimal = dec!(0.005);
pub const DEFAULT_MAX_ITERATIONS: u32 = 1000;

/// Guesses are kept on a 0.0001 grid.
const GUESS_DP: u32 = 4;
const GUESS_STEP: Decimal = dec!(0.0001);

/// Tolerance and iteration cap for the solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    #[serde(default = "default_tolerance")]
    pub tolerance: Money,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

fn default_tolerance() -> Money {
    DEFAULT_TOLERANCE
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

/// Solver request: a deal (cash down ignored) and the target due at signing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverInput {
    #[serde(flatten)]
    pub deal: DealParameters,
    pub target_due_at_signing: Money,
    #[serde(flatten)]
    pub settings: SolverSettings,
}

/// Outcome of a balancing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverResult {
    /// Customer-paid cap cost reduction found
    pub capped_ccr: Money,
    /// Lease cash and rebates applied on top of `capped_ccr`
    pub incentive_reduction: Money,
    /// Sales tax on the reduction
    pub ccr_tax: Money,
    /// Monthly payment plus the prorated upfront fee
    pub first_payment: Money,
    /// Reduction + reduction tax + first payment
    pub total_due_at_signing: Money,
    pub iteration_count: u32,
    /// False when the figures are approximate
    pub converged: bool,
    /// Payment breakdown at the returned reduction
    pub breakdown: PaymentBreakdown,
}

/// Due-at-signing figures for one candidate reduction.
struct SigningPoint {
    ccr_tax: Money,
    first_payment: Money,
    total: Money,
    breakdown: PaymentBreakdown,
}

fn incentive_reduction(params: &DealParameters) -> Money {
    params.lease_cash_used + params.rebates
}

fn signing_point(params: &DealParameters, ccr: Money) -> LeaseQuoteResult<SigningPoint> {
    let breakdown = formula::evaluate_with_reduction(
        params,
        ccr + incentive_reduction(params),
        params.trade_value,
    )?;
    let ccr_tax = (ccr * params.tax_rate).round_dp(GUESS_DP);
    let prorated_fee = round_cents(params.non_taxable_fees / Decimal::from(params.term_months));
    let first_payment = breakdown.monthly_payment + prorated_fee;
    Ok(SigningPoint {
        ccr_tax,
        first_payment,
        total: ccr + ccr_tax + first_payment,
        breakdown,
    })
}

/// Search for the cap cost reduction that makes the total due at signing
/// equal `target` within `tolerance`.
///
/// Running out of iterations is not an error: the last guess is returned
/// with `converged = false`.
pub fn solve(
    target: Money,
    params: &DealParameters,
    tolerance: Money,
    max_iterations: u32,
) -> LeaseQuoteResult<SolverResult> {
    formula::validate_deal(params)?;
    if target < Decimal::ZERO {
        return Err(LeaseQuoteError::InvalidInput {
            field: "target_due_at_signing".into(),
            reason: "Target due at signing cannot be negative".into(),
        });
    }
    if tolerance <= Decimal::ZERO {
        return Err(LeaseQuoteError::InvalidInput {
            field: "tolerance".into(),
            reason: "Tolerance must be positive".into(),
        });
    }
    if max_iterations == 0 {
        return Err(LeaseQuoteError::InvalidInput {
            field: "max_iterations".into(),
            reason: "At least one iteration is required".into(),
        });
    }

    let mut lower = Decimal::ZERO;
    let mut upper = target;
    let mut guess = Decimal::ZERO;
    let mut point = signing_point(params, guess)?;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations {
        iterations += 1;
        guess = ((lower + upper) / dec!(2)).round_dp(GUESS_DP);
        point = signing_point(params, guess)?;

        let delta = point.total - target;
        if delta.abs() <= tolerance {
            converged = true;
            break;
        }
        if delta > Decimal::ZERO {
            upper = guess;
        } else {
            lower = guess;
        }
        if upper - lower <= GUESS_STEP {
            break;
        }
    }

    if converged {
        debug!(target = %target, ccr = %guess, iterations, "Balanced cap cost reduction");
    } else {
        warn!(
            target = %target,
            ccr = %guess,
            total = %point.total,
            iterations,
            "Cap cost reduction solver did not converge"
        );
    }

    Ok(SolverResult {
        capped_ccr: guess,
        incentive_reduction: incentive_reduction(params),
        ccr_tax: point.ccr_tax,
        first_payment: point.first_payment,
        total_due_at_signing: point.total,
        iteration_count: iterations,
        converged,
        breakdown: point.breakdown,
    })
}

/// Run the solver and flag approximate results as warnings.
pub fn solve_due_at_signing(
    input: &SolverInput,
) -> LeaseQuoteResult<ComputationOutput<SolverResult>> {
    let start = Instant::now();
    let result = solve(
        input.target_due_at_signing,
        &input.deal,
        input.settings.tolerance,
        input.settings.max_iterations,
    )?;

    let mut warnings = Vec::new();
    if !result.converged {
        warnings.push(format!(
            "Solver did not reach the target within tolerance after {} iterations; \
             total due at signing {} is approximate (target {}).",
            result.iteration_count, result.total_due_at_signing, input.target_due_at_signing
        ));
    }

    Ok(with_metadata(
        "Bisection on cap cost reduction against total due at signing",
        input,
        warnings,
        start.elapsed().as_micros() as u64,
        result,
    ))
}
