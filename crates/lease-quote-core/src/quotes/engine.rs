//! Quote engine: the composition root the presentation layer calls.
//!
//! Sources and settings are injected at construction; every request is
//! computed from scratch.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use super::options::{
    self, CustomerFunds, DealTerms, OptionFilter, PricedOption, QuoteOption, SortKey,
};
use super::sources::{normalize_vin, LeaseProgramSource, TaxRateSource, VehicleInfo, VehicleSource};
use crate::error::LeaseQuoteError;
use crate::settings::QuoteSettings;
use crate::types::{with_metadata, ComputationOutput, Rate};
use crate::LeaseQuoteResult;

/// A customer's quote request for one vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub vin: String,
    /// County for the sales tax rate; the configured default when empty
    #[serde(default)]
    pub county: String,
    /// Credit tier; the configured default when absent
    #[serde(default)]
    pub tier: Option<u8>,
    #[serde(default)]
    pub apply_markup: bool,
    #[serde(default)]
    pub funds: CustomerFunds,
    #[serde(default)]
    pub sort_by: Option<SortKey>,
    #[serde(default)]
    pub filter: OptionFilter,
}

/// Ranked options for one vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteSheet {
    pub vehicle: VehicleInfo,
    pub tier: u8,
    pub tax_rate: Rate,
    pub options: Vec<PricedOption>,
    /// Options that could not be offered, with the reason
    pub unavailable: Vec<QuoteOption>,
}

pub struct QuoteEngine<V, P, T> {
    vehicles: V,
    programs: P,
    tax_rates: T,
    settings: QuoteSettings,
}

impl<V, P, T> QuoteEngine<V, P, T>
where
    V: VehicleSource,
    P: LeaseProgramSource,
    T: TaxRateSource,
{
    pub fn new(vehicles: V, programs: P, tax_rates: T, settings: QuoteSettings) -> Self {
        Self {
            vehicles,
            programs,
            tax_rates,
            settings,
        }
    }

    pub fn settings(&self) -> &QuoteSettings {
        &self.settings
    }

    pub fn vehicle(&self, vin: &str) -> LeaseQuoteResult<VehicleInfo> {
        let vin = normalize_vin(vin)?;
        self.vehicles
            .find_by_vin(&vin)
            .ok_or(LeaseQuoteError::VehicleNotFound(vin))
    }

    /// The requested county, or the configured default when none is given.
    pub fn county<'a>(&'a self, requested: &'a str) -> LeaseQuoteResult<&'a str> {
        let requested = requested.trim();
        if !requested.is_empty() {
            return Ok(requested);
        }
        self.settings.default_county.as_deref().ok_or_else(|| {
            LeaseQuoteError::ConfigurationError(
                "No county given and no default county configured".into(),
            )
        })
    }

    /// Decimal tax rate for a county. A miss is a configuration error.
    pub fn tax_rate(&self, county: &str) -> LeaseQuoteResult<Rate> {
        let percent = self.tax_rates.tax_rate_percent(county).ok_or_else(|| {
            LeaseQuoteError::ConfigurationError(format!("No tax rate configured for county '{county}'"))
        })?;
        if percent < Decimal::ZERO || percent > dec!(100) {
            return Err(LeaseQuoteError::ConfigurationError(format!(
                "Tax rate {percent}% for county '{county}' is out of range"
            )));
        }
        Ok(percent / dec!(100))
    }

    /// Fees, tax and allocation rules for a county under current settings.
    pub fn deal_terms(&self, county: &str) -> LeaseQuoteResult<DealTerms> {
        let county = self.county(county)?;
        Ok(DealTerms {
            taxable_fees: self.settings.taxable_fees,
            non_taxable_fees: self.settings.non_taxable_fees,
            tax_rate: self.tax_rate(county)?,
            tax_policy: self.settings.tax_policy,
            fund_priority: self.settings.fund_priority.clone(),
        })
    }

    /// Unpriced options for a vehicle.
    pub fn options_for(
        &self,
        vehicle: &VehicleInfo,
        tier: u8,
        apply_markup: bool,
    ) -> LeaseQuoteResult<Vec<QuoteOption>> {
        let programs = self.programs.programs_for_model(&vehicle.model_number);
        if programs.is_empty() {
            return Err(LeaseQuoteError::InsufficientData(format!(
                "No lease programs for model {}",
                vehicle.model_number
            )));
        }
        let markup = if apply_markup {
            self.settings.money_factor_markup
        } else {
            Decimal::ZERO
        };
        let generated =
            options::generate_options_with_markup(&programs, vehicle.msrp, tier, markup)?;
        if self.settings.auto_apply_lease_cash {
            return Ok(generated);
        }
        Ok(generated
            .into_iter()
            .map(|mut o| {
                o.lease_cash_used = Decimal::ZERO;
                o
            })
            .collect())
    }

    /// Look up the vehicle, tax rate and programs, then price and rank
    /// every available option.
    pub fn quote(&self, request: &QuoteRequest) -> LeaseQuoteResult<ComputationOutput<QuoteSheet>> {
        let start = Instant::now();

        let terms = self.deal_terms(&request.county)?;
        let vehicle = self.vehicle(&request.vin)?;
        let tier = request.tier.unwrap_or(self.settings.default_tier);
        info!(vin = %vehicle.vin, model = %vehicle.model_number, tier, "Building lease quote");

        let all = self.options_for(&vehicle, tier, request.apply_markup)?;
        let sort_by = request.sort_by.unwrap_or(self.settings.sort_by);
        let ranked = options::rank_options(&all, &request.filter, sort_by, &request.funds, &terms)?;
        let unavailable: Vec<QuoteOption> = all.into_iter().filter(|o| !o.is_available()).collect();
        debug!(
            priced = ranked.len(),
            unavailable = unavailable.len(),
            "Ranked quote options"
        );

        let mut warnings = Vec::new();
        if ranked.is_empty() {
            warnings.push("No options are available for this vehicle and tier.".into());
        }
        for u in &unavailable {
            if let options::Availability::Unavailable { reason } = &u.availability {
                warnings.push(format!("Option {} unavailable: {reason}", u.key()));
            }
        }
        if let Some(first) = ranked.iter().find(|p| p.quote.unpaid_balance > Decimal::ZERO) {
            warnings.push(format!(
                "Customer funds do not cover upfront charges; {} remains due at signing on {}.",
                first.quote.unpaid_balance, first.key
            ));
        }

        let sheet = QuoteSheet {
            vehicle,
            tier,
            tax_rate: terms.tax_rate,
            options: ranked,
            unavailable,
        };

        Ok(with_metadata(
            "Program residual and money factor by term x mileage, priced per option",
            request,
            warnings,
            start.elapsed().as_micros() as u64,
            sheet,
        ))
    }
}
