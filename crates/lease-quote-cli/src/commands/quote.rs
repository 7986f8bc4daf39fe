use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;

use lease_quote_core::quotes::engine::{QuoteEngine, QuoteRequest};
use lease_quote_core::quotes::grid::{self, GridSpec};
use lease_quote_core::quotes::options::{
    self, CustomerFunds, DealTerms, OptionFilter, PricedOption, SortKey,
};
use lease_quote_core::quotes::sources::{
    Inventory, LeaseProgramRow, ProgramTable, QuoteDataset, TaxRateTable,
};
use lease_quote_core::settings::QuoteSettings;
use lease_quote_core::types::MoneyFactor;

use super::parse_enum;
use crate::input;

type DatasetEngine = QuoteEngine<Inventory, ProgramTable, TaxRateTable>;

/// Vehicle, county and customer funds shared by the dataset-backed commands
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct VehicleFlags {
    /// JSON file with vehicles, lease programs and county tax rates
    #[arg(long)]
    pub dataset: String,

    /// 17-character VIN
    #[arg(long)]
    pub vin: Option<String>,

    /// County used for the sales tax rate (defaults to configured county)
    #[arg(long)]
    pub county: Option<String>,

    /// Credit tier (defaults to configured tier)
    #[arg(long)]
    pub tier: Option<u8>,

    /// Add the configured money-factor markup
    #[arg(long)]
    pub markup: bool,

    #[arg(long)]
    pub trade_value: Option<Decimal>,

    #[arg(long)]
    pub cash_down: Option<Decimal>,

    #[arg(long)]
    pub rebates: Option<Decimal>,
}

/// Arguments for a full vehicle quote
#[derive(Args)]
pub struct QuoteArgs {
    #[command(flatten)]
    pub vehicle: VehicleFlags,

    /// lowest_payment, lowest_term, lowest_mileage or most_lease_cash
    #[arg(long)]
    pub sort_by: Option<String>,

    /// Only these terms (comma-separated months)
    #[arg(long, value_delimiter = ',')]
    pub terms: Vec<u32>,

    /// Only these annual mileages (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub mileages: Vec<u32>,

    /// Print one summary row per option instead of the full sheet
    #[arg(long)]
    pub summary: bool,

    /// Path to a JSON quote request (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the down-payment grid
#[derive(Args)]
pub struct GridArgs {
    #[command(flatten)]
    pub vehicle: VehicleFlags,

    /// Option keys to include, e.g. 36_12000,48_10000 (default: all available)
    #[arg(long, value_delimiter = ',')]
    pub keys: Vec<String>,

    /// Cash down for the first row (defaults to --cash-down or configured value)
    #[arg(long)]
    pub base_down: Option<Decimal>,

    /// Cash-down increment between rows
    #[arg(long)]
    pub step: Option<Decimal>,

    /// Number of rows
    #[arg(long)]
    pub rows: Option<u32>,
}

/// Arguments for solving one option to a due-at-signing target
#[derive(Args)]
pub struct BalanceArgs {
    #[command(flatten)]
    pub vehicle: VehicleFlags,

    /// Option key, e.g. 36_12000
    #[arg(long)]
    pub key: String,

    /// Target total due at signing
    #[arg(long)]
    pub target: Decimal,
}

/// Arguments for pricing explicit program rows without a dataset
#[derive(Args)]
pub struct OptionsArgs {
    /// Path to JSON options request (or pipe via stdin)
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OptionsRequest {
    programs: Vec<LeaseProgramRow>,
    msrp: Decimal,
    #[serde(default = "default_tier")]
    tier: u8,
    #[serde(default)]
    money_factor_markup: MoneyFactor,
    #[serde(default)]
    funds: CustomerFunds,
    terms: DealTerms,
    #[serde(default)]
    sort_by: SortKey,
    #[serde(default)]
    filter: OptionFilter,
}

fn default_tier() -> u8 {
    1
}

fn load_engine(
    path: &str,
    settings: &QuoteSettings,
) -> Result<DatasetEngine, Box<dyn std::error::Error>> {
    let dataset: QuoteDataset = input::file::read_json(path, "dataset")?;
    let (vehicles, programs, tax_rates) = dataset.into_sources();
    Ok(QuoteEngine::new(vehicles, programs, tax_rates, settings.clone()))
}

impl VehicleFlags {
    fn vin(&self) -> Result<&str, Box<dyn std::error::Error>> {
        Ok(self.vin.as_deref().ok_or("--vin is required")?)
    }

    /// Empty when not given; the engine then falls back to the configured county.
    fn county(&self) -> &str {
        self.county.as_deref().unwrap_or_default()
    }

    fn funds(&self) -> CustomerFunds {
        CustomerFunds {
            trade_value: self.trade_value.unwrap_or(Decimal::ZERO),
            cash_down: self.cash_down.unwrap_or(Decimal::ZERO),
            rebates: self.rebates.unwrap_or(Decimal::ZERO),
        }
    }
}

fn summary_rows(options: &[PricedOption]) -> Value {
    Value::Array(
        options
            .iter()
            .map(|p| {
                json!({
                    "option": p.key,
                    "term_months": p.option.term_months,
                    "mileage": p.option.mileage,
                    "money_factor": p.option.money_factor,
                    "residual_value": p.option.residual_value,
                    "lease_cash": p.option.lease_cash_used,
                    "cap_cost_reduction": p.quote.breakdown.cap_cost_reduction,
                    "monthly_payment": p.quote.breakdown.monthly_payment,
                    "unpaid_balance": p.quote.unpaid_balance,
                })
            })
            .collect(),
    )
}

pub fn run_quote(
    args: QuoteArgs,
    settings: &QuoteSettings,
) -> Result<Value, Box<dyn std::error::Error>> {
    let engine = load_engine(&args.vehicle.dataset, settings)?;
    let request: QuoteRequest = match input::file_or_stdin(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => QuoteRequest {
            vin: args.vehicle.vin()?.to_string(),
            county: args.vehicle.county().to_string(),
            tier: args.vehicle.tier,
            apply_markup: args.vehicle.markup,
            funds: args.vehicle.funds(),
            sort_by: args
                .sort_by
                .as_deref()
                .map(|s| parse_enum::<SortKey>(s, "--sort-by"))
                .transpose()?,
            filter: OptionFilter {
                terms: args.terms.iter().copied().collect::<BTreeSet<_>>(),
                mileages: args.mileages.iter().copied().collect::<BTreeSet<_>>(),
            },
        },
    };

    let output = engine.quote(&request)?;
    if args.summary {
        return Ok(summary_rows(&output.result.options));
    }
    Ok(serde_json::to_value(output)?)
}

pub fn run_grid(
    args: GridArgs,
    settings: &QuoteSettings,
) -> Result<Value, Box<dyn std::error::Error>> {
    let engine = load_engine(&args.vehicle.dataset, settings)?;
    let vehicle = engine.vehicle(args.vehicle.vin()?)?;
    let terms = engine.deal_terms(args.vehicle.county())?;
    let tier = args.vehicle.tier.unwrap_or(settings.default_tier);

    let selected: Vec<_> = engine
        .options_for(&vehicle, tier, args.vehicle.markup)?
        .into_iter()
        .filter(|o| o.is_available())
        .filter(|o| args.keys.is_empty() || args.keys.contains(&o.key()))
        .collect();
    if selected.is_empty() {
        return Err("No available options match the requested keys".into());
    }

    let spec = GridSpec {
        base_down: args
            .base_down
            .or(args.vehicle.cash_down)
            .unwrap_or(settings.grid.base_down),
        step: args.step.unwrap_or(settings.grid.step),
        rows: args.rows.unwrap_or(settings.grid.rows),
    };
    let result = grid::payment_grid(&selected, &spec, &args.vehicle.funds(), &terms)?;
    Ok(json!({ "result": result }))
}

pub fn run_balance(
    args: BalanceArgs,
    settings: &QuoteSettings,
) -> Result<Value, Box<dyn std::error::Error>> {
    let engine = load_engine(&args.vehicle.dataset, settings)?;
    let vehicle = engine.vehicle(args.vehicle.vin()?)?;
    let terms = engine.deal_terms(args.vehicle.county())?;
    let tier = args.vehicle.tier.unwrap_or(settings.default_tier);

    let option = engine
        .options_for(&vehicle, tier, args.vehicle.markup)?
        .into_iter()
        .find(|o| o.key() == args.key)
        .ok_or_else(|| format!("Option '{}' not found for {}", args.key, vehicle.vin))?;
    if !option.is_available() {
        return Err(format!("Option '{}' is not available at tier {}", args.key, tier).into());
    }

    let result = option.balance(args.target, &args.vehicle.funds(), &terms, &settings.solver)?;
    Ok(json!({ "result": result }))
}

pub fn run_options(args: OptionsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: OptionsRequest = input::file_or_stdin(args.input.as_deref())?
        .ok_or("options requires --input <file.json> or JSON on stdin")?;

    let all = options::generate_options_with_markup(
        &request.programs,
        request.msrp,
        request.tier,
        request.money_factor_markup,
    )?;
    let ranked = options::rank_options(
        &all,
        &request.filter,
        request.sort_by,
        &request.funds,
        &request.terms,
    )?;
    let unavailable: Vec<_> = all.into_iter().filter(|o| !o.is_available()).collect();
    Ok(json!({ "result": { "options": ranked, "unavailable": unavailable } }))
}
