use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use lease_quote_core::payment::allocation::{self, FundPool, FundSource};
use lease_quote_core::payment::deal::{self, DealQuoteInput};
use lease_quote_core::payment::formula::{DealParameters, TaxPolicy};
use lease_quote_core::payment::solver::{self, SolverInput, SolverSettings};
use lease_quote_core::settings::QuoteSettings;

use super::{parse_enum, parse_enum_list};
use crate::input;

/// Deal terms shared by `payment` and `solve`
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct DealFlags {
    /// Negotiated selling price
    #[arg(long)]
    pub selling_price: Option<Decimal>,

    /// Residual value in dollars
    #[arg(long)]
    pub residual_value: Option<Decimal>,

    /// Money factor (e.g. 0.00131)
    #[arg(long, alias = "mf")]
    pub money_factor: Option<Decimal>,

    /// Lease term in months
    #[arg(long)]
    pub term: Option<u32>,

    /// Sales tax rate as a decimal (e.g. 0.0725)
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Trade-in equity
    #[arg(long)]
    pub trade_value: Option<Decimal>,

    /// Capitalized doc + acquisition fees (defaults to configured value)
    #[arg(long)]
    pub taxable_fees: Option<Decimal>,

    /// License + title fees due at signing (defaults to configured value)
    #[arg(long)]
    pub non_taxable_fees: Option<Decimal>,

    /// Tax treatment: on_payment or on_cap_reduction
    #[arg(long)]
    pub tax_policy: Option<String>,
}

/// Arguments for a monthly payment quote
#[derive(Args)]
pub struct PaymentArgs {
    #[command(flatten)]
    pub deal: DealFlags,

    /// Customer cash down
    #[arg(long)]
    pub cash_down: Option<Decimal>,

    /// Manufacturer lease cash applied
    #[arg(long)]
    pub lease_cash: Option<Decimal>,

    /// Other rebates
    #[arg(long)]
    pub rebates: Option<Decimal>,

    /// Comma-separated fund order (e.g. lease_cash,cash_down,trade_value,rebates)
    #[arg(long)]
    pub priority: Option<String>,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for fund allocation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct AllocateArgs {
    /// Amount to cover
    #[arg(long)]
    pub amount: Option<Decimal>,

    #[arg(long)]
    pub lease_cash: Option<Decimal>,

    #[arg(long)]
    pub cash_down: Option<Decimal>,

    #[arg(long)]
    pub trade_value: Option<Decimal>,

    #[arg(long)]
    pub rebates: Option<Decimal>,

    /// Comma-separated fund order
    #[arg(long)]
    pub priority: Option<String>,

    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the due-at-signing solver
#[derive(Args)]
pub struct SolveArgs {
    #[command(flatten)]
    pub deal: DealFlags,

    /// Target total due at signing
    #[arg(long)]
    pub target: Option<Decimal>,

    /// Allowed difference from the target
    #[arg(long)]
    pub tolerance: Option<Decimal>,

    /// Iteration cap
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AllocationRequest {
    amount: Decimal,
    sources: FundPool,
    #[serde(default = "allocation::canonical_priority")]
    priority: Vec<FundSource>,
}

impl DealFlags {
    fn to_deal(&self, settings: &QuoteSettings) -> Result<DealParameters, Box<dyn std::error::Error>> {
        let tax_policy = match &self.tax_policy {
            Some(s) => parse_enum::<TaxPolicy>(s, "--tax-policy")?,
            None => settings.tax_policy,
        };
        Ok(DealParameters {
            selling_price: self
                .selling_price
                .ok_or("--selling-price is required (or provide --input)")?,
            trade_value: self.trade_value.unwrap_or(Decimal::ZERO),
            cash_down: Decimal::ZERO,
            lease_cash_used: Decimal::ZERO,
            rebates: Decimal::ZERO,
            taxable_fees: self.taxable_fees.unwrap_or(settings.taxable_fees),
            non_taxable_fees: self.non_taxable_fees.unwrap_or(settings.non_taxable_fees),
            residual_value: self
                .residual_value
                .ok_or("--residual-value is required (or provide --input)")?,
            money_factor: self
                .money_factor
                .ok_or("--money-factor is required (or provide --input)")?,
            term_months: self.term.ok_or("--term is required (or provide --input)")?,
            tax_rate: self
                .tax_rate
                .ok_or("--tax-rate is required (or provide --input)")?,
            tax_policy,
        })
    }
}

fn priority_or_default(
    priority: &Option<String>,
    settings: &QuoteSettings,
) -> Result<Vec<FundSource>, Box<dyn std::error::Error>> {
    match priority {
        Some(list) => parse_enum_list(list, "--priority"),
        None => Ok(settings.fund_priority.clone()),
    }
}

pub fn run_payment(
    args: PaymentArgs,
    settings: &QuoteSettings,
) -> Result<Value, Box<dyn std::error::Error>> {
    let deal_input: DealQuoteInput = match input::file_or_stdin(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => {
            let mut deal = args.deal.to_deal(settings)?;
            deal.cash_down = args.cash_down.unwrap_or(Decimal::ZERO);
            deal.lease_cash_used = args.lease_cash.unwrap_or(Decimal::ZERO);
            deal.rebates = args.rebates.unwrap_or(Decimal::ZERO);
            DealQuoteInput {
                deal,
                fund_priority: priority_or_default(&args.priority, settings)?,
            }
        }
    };
    let result = deal::quote_deal(&deal_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_allocate(
    args: AllocateArgs,
    settings: &QuoteSettings,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request: AllocationRequest = match input::file_or_stdin(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => AllocationRequest {
            amount: args
                .amount
                .ok_or("--amount is required (or provide --input)")?,
            sources: FundPool {
                lease_cash: args.lease_cash.unwrap_or(Decimal::ZERO),
                cash_down: args.cash_down.unwrap_or(Decimal::ZERO),
                trade_value: args.trade_value.unwrap_or(Decimal::ZERO),
                rebates: args.rebates.unwrap_or(Decimal::ZERO),
            },
            priority: priority_or_default(&args.priority, settings)?,
        },
    };
    let result = allocation::allocate(request.amount, &request.sources, &request.priority)?;
    Ok(serde_json::json!({ "result": result }))
}

pub fn run_solve(
    args: SolveArgs,
    settings: &QuoteSettings,
) -> Result<Value, Box<dyn std::error::Error>> {
    let solver_input: SolverInput = match input::file_or_stdin(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => SolverInput {
            deal: args.deal.to_deal(settings)?,
            target_due_at_signing: args
                .target
                .ok_or("--target is required (or provide --input)")?,
            settings: SolverSettings {
                tolerance: args.tolerance.unwrap_or(settings.solver.tolerance),
                max_iterations: args.max_iterations.unwrap_or(settings.solver.max_iterations),
            },
        },
    };
    let result = solver::solve_due_at_signing(&solver_input)?;
    Ok(serde_json::to_value(result)?)
}
