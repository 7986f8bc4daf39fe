//! Dealership quoting defaults.
//!
//! Plain serde structure; loading from files or the environment is left to
//! the caller. Every field has a default so partial documents deserialize.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::payment::allocation::{self, FundSource};
use crate::payment::formula::TaxPolicy;
use crate::payment::solver::SolverSettings;
use crate::quotes::grid::GridSpec;
use crate::quotes::options::{SortKey, DEFAULT_MONEY_FACTOR_MARKUP};
use crate::types::{Money, MoneyFactor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSettings {
    /// Doc + acquisition fees capitalized into every deal
    #[serde(default = "default_taxable_fees")]
    pub taxable_fees: Money,
    /// License + title fees collected at signing
    #[serde(default)]
    pub non_taxable_fees: Money,
    /// Added to the tier money factor when markup is requested
    #[serde(default = "default_markup")]
    pub money_factor_markup: MoneyFactor,
    #[serde(default)]
    pub tax_policy: TaxPolicy,
    #[serde(default = "allocation::canonical_priority")]
    pub fund_priority: Vec<FundSource>,
    #[serde(default = "default_tier")]
    pub default_tier: u8,
    /// County used when a request names none
    #[serde(default)]
    pub default_county: Option<String>,
    /// Start each option with its full program lease cash applied;
    /// otherwise lease cash used starts at zero
    #[serde(default = "default_auto_apply_lease_cash")]
    pub auto_apply_lease_cash: bool,
    #[serde(default)]
    pub sort_by: SortKey,
    #[serde(default)]
    pub solver: SolverSettings,
    #[serde(default)]
    pub grid: GridSpec,
}

impl Default for QuoteSettings {
    fn default() -> Self {
        Self {
            taxable_fees: default_taxable_fees(),
            non_taxable_fees: Money::ZERO,
            money_factor_markup: default_markup(),
            tax_policy: TaxPolicy::default(),
            fund_priority: allocation::canonical_priority(),
            default_tier: default_tier(),
            default_county: None,
            auto_apply_lease_cash: default_auto_apply_lease_cash(),
            sort_by: SortKey::default(),
            solver: SolverSettings::default(),
            grid: GridSpec::default(),
        }
    }
}

fn default_taxable_fees() -> Money {
    dec!(962.50)
}

fn default_markup() -> MoneyFactor {
    DEFAULT_MONEY_FACTOR_MARKUP
}

fn default_tier() -> u8 {
    1
}

fn default_auto_apply_lease_cash() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_uses_defaults() {
        let settings: QuoteSettings =
            serde_json::from_str(r#"{ "non_taxable_fees": "180", "tax_policy": "on_cap_reduction" }"#)
                .unwrap();

        assert_eq!(settings.taxable_fees, dec!(962.50));
        assert_eq!(settings.non_taxable_fees, dec!(180));
        assert_eq!(settings.tax_policy, TaxPolicy::OnCapReduction);
        assert_eq!(settings.fund_priority, allocation::canonical_priority());
        assert_eq!(settings.solver, SolverSettings::default());
        assert_eq!(settings.grid.step, dec!(1500));
        assert_eq!(settings.default_county, None);
        assert!(settings.auto_apply_lease_cash);
    }

    #[test]
    fn test_counter_defaults_parse() {
        let settings: QuoteSettings = serde_json::from_str(
            r#"{ "default_county": "Adams", "auto_apply_lease_cash": false }"#,
        )
        .unwrap();
        assert_eq!(settings.default_county.as_deref(), Some("Adams"));
        assert!(!settings.auto_apply_lease_cash);
    }
}
