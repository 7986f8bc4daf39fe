//! Lookups the quote engine depends on: vehicles by VIN, lease programs by
//! model number and tax rates by county. Callers inject implementations;
//! the in-memory tables here back the CLI and tests.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::LeaseQuoteError;
use crate::types::{Money, MoneyFactor, Rate};
use crate::LeaseQuoteResult;

const VIN_LENGTH: usize = 17;

/// A vehicle in dealer inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub vin: String,
    pub msrp: Money,
    pub model_number: String,
    pub year: u16,
    pub make: String,
    pub model: String,
    #[serde(default)]
    pub trim: String,
}

/// One lease program row for a model and term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseProgramRow {
    pub model_number: String,
    pub term_months: u32,
    /// Base residual as a fraction of MSRP (0.61 = 61%), at 12,000 mi/yr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residual: Option<Rate>,
    /// Money factor keyed by credit tier (1 = best)
    #[serde(default)]
    pub money_factor_by_tier: BTreeMap<u8, MoneyFactor>,
    /// Manufacturer lease cash available on this program
    #[serde(default)]
    pub lease_cash: Money,
}

pub trait VehicleSource {
    fn find_by_vin(&self, vin: &str) -> Option<VehicleInfo>;
}

pub trait LeaseProgramSource {
    fn programs_for_model(&self, model_number: &str) -> Vec<LeaseProgramRow>;
}

pub trait TaxRateSource {
    /// Tax rate for a county as a percentage (7.25 = 7.25%).
    fn tax_rate_percent(&self, county: &str) -> Option<Decimal>;
}

/// Vehicles held in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    pub vehicles: Vec<VehicleInfo>,
}

impl VehicleSource for Inventory {
    fn find_by_vin(&self, vin: &str) -> Option<VehicleInfo> {
        let wanted = normalize_vin(vin).ok()?;
        self.vehicles
            .iter()
            .find(|v| v.vin.eq_ignore_ascii_case(&wanted))
            .cloned()
    }
}

/// Lease program rows held in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramTable {
    pub rows: Vec<LeaseProgramRow>,
}

impl LeaseProgramSource for ProgramTable {
    fn programs_for_model(&self, model_number: &str) -> Vec<LeaseProgramRow> {
        let wanted = model_number.trim();
        let mut rows: Vec<LeaseProgramRow> = self
            .rows
            .iter()
            .filter(|r| r.model_number.trim() == wanted)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.term_months);
        rows
    }
}

/// County tax rates in percent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxRateTable {
    pub rates: BTreeMap<String, Decimal>,
}

impl TaxRateSource for TaxRateTable {
    fn tax_rate_percent(&self, county: &str) -> Option<Decimal> {
        let wanted = county.trim();
        self.rates
            .iter()
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(wanted))
            .map(|(_, rate)| *rate)
    }
}

/// Everything the engine needs, as one JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteDataset {
    #[serde(default)]
    pub vehicles: Vec<VehicleInfo>,
    #[serde(default)]
    pub programs: Vec<LeaseProgramRow>,
    #[serde(default)]
    pub tax_rates: BTreeMap<String, Decimal>,
}

impl QuoteDataset {
    pub fn into_sources(self) -> (Inventory, ProgramTable, TaxRateTable) {
        (
            Inventory {
                vehicles: self.vehicles,
            },
            ProgramTable {
                rows: self.programs,
            },
            TaxRateTable {
                rates: self.tax_rates,
            },
        )
    }
}

/// Uppercase a VIN, strip spaces and dashes, and check it is 17 characters
/// without I, O or Q.
pub fn normalize_vin(raw: &str) -> LeaseQuoteResult<String> {
    let vin: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if vin.len() != VIN_LENGTH {
        return Err(LeaseQuoteError::InvalidInput {
            field: "vin".into(),
            reason: format!("VIN must be {VIN_LENGTH} characters, got {}", vin.len()),
        });
    }
    if let Some(bad) = vin
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() || matches!(c, 'I' | 'O' | 'Q'))
    {
        return Err(LeaseQuoteError::InvalidInput {
            field: "vin".into(),
            reason: format!("VIN contains invalid character '{bad}'"),
        });
    }
    Ok(vin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normalize_vin_strips_separators() {
        let vin = normalize_vin(" 5npe3 4af-5kh012345 ").unwrap();
        assert_eq!(vin, "5NPE34AF5KH012345");
    }

    #[test]
    fn test_normalize_vin_rejects_bad_input() {
        assert!(normalize_vin("5NPE34AF5KH01234").is_err());
        assert!(normalize_vin("5NPE34AF5KH01234O").is_err());
        assert!(normalize_vin("5NPE34AF5KH01234!").is_err());
    }

    #[test]
    fn test_inventory_lookup_is_case_insensitive() {
        let inventory = Inventory {
            vehicles: vec![VehicleInfo {
                vin: "5NPE34AF5KH012345".into(),
                msrp: dec!(25040),
                model_number: "E4452F4S".into(),
                year: 2025,
                make: "Hyundai".into(),
                model: "Elantra".into(),
                trim: "SEL".into(),
            }],
        };
        assert!(inventory.find_by_vin("5npe34af5kh012345").is_some());
        assert!(inventory.find_by_vin("5NPE34AF5KH099999").is_none());
    }

    #[test]
    fn test_programs_sorted_by_term() {
        let row = |term| LeaseProgramRow {
            model_number: "E4452F4S".into(),
            term_months: term,
            residual: Some(dec!(0.58)),
            money_factor_by_tier: BTreeMap::new(),
            lease_cash: Decimal::ZERO,
        };
        let table = ProgramTable {
            rows: vec![row(48), row(24), row(36)],
        };
        let terms: Vec<u32> = table
            .programs_for_model("E4452F4S")
            .iter()
            .map(|r| r.term_months)
            .collect();
        assert_eq!(terms, vec![24, 36, 48]);
        assert!(table.programs_for_model("OTHER").is_empty());
    }

    #[test]
    fn test_tax_rate_table_lookup() {
        let mut rates = BTreeMap::new();
        rates.insert("Adams".to_string(), dec!(7.25));
        let table = TaxRateTable { rates };
        assert_eq!(table.tax_rate_percent("adams"), Some(dec!(7.25)));
        assert_eq!(table.tax_rate_percent("Denver"), None);
    }
}
