//! Down-payment grid for printed quotes: one column per selected option,
//! one row per cash-down level.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::options::{CustomerFunds, DealTerms, QuoteOption};
use crate::error::LeaseQuoteError;
use crate::types::Money;
use crate::LeaseQuoteResult;

/// Cash-down rows start at `base_down` and rise by `step`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    #[serde(default)]
    pub base_down: Money,
    #[serde(default = "default_step")]
    pub step: Money,
    #[serde(default = "default_rows")]
    pub rows: u32,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            base_down: Decimal::ZERO,
            step: default_step(),
            rows: default_rows(),
        }
    }
}

fn default_step() -> Money {
    dec!(1500)
}

fn default_rows() -> u32 {
    3
}

/// Largest number of cash-down rows a grid may have.
pub const MAX_GRID_ROWS: u32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridColumn {
    pub key: String,
    pub term_months: u32,
    pub mileage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRow {
    pub cash_down: Money,
    /// Monthly payment per column, in column order
    pub payments: Vec<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentGrid {
    pub columns: Vec<GridColumn>,
    pub rows: Vec<GridRow>,
}

/// Price each option at every cash-down level in `spec`. The cash down in
/// `funds` is replaced row by row; trade and rebates are kept.
pub fn payment_grid(
    options: &[QuoteOption],
    spec: &GridSpec,
    funds: &CustomerFunds,
    terms: &DealTerms,
) -> LeaseQuoteResult<PaymentGrid> {
    if options.is_empty() {
        return Err(LeaseQuoteError::InsufficientData(
            "Payment grid requires at least one option".into(),
        ));
    }
    if spec.rows == 0 || spec.rows > MAX_GRID_ROWS {
        return Err(LeaseQuoteError::InvalidInput {
            field: "rows".into(),
            reason: format!("Payment grid needs between 1 and {MAX_GRID_ROWS} rows"),
        });
    }
    if spec.base_down < Decimal::ZERO || spec.step < Decimal::ZERO {
        return Err(LeaseQuoteError::InvalidInput {
            field: "base_down".into(),
            reason: "Cash-down levels cannot be negative".into(),
        });
    }

    let columns = options
        .iter()
        .map(|o| GridColumn {
            key: o.key(),
            term_months: o.term_months,
            mileage: o.mileage,
        })
        .collect();

    let mut rows = Vec::with_capacity(spec.rows as usize);
    for i in 0..spec.rows {
        let cash_down = spec.base_down + spec.step * Decimal::from(i);
        let row_funds = CustomerFunds { cash_down, ..*funds };
        let payments = options
            .iter()
            .map(|o| Ok(o.price(&row_funds, terms)?.breakdown.monthly_payment))
            .collect::<LeaseQuoteResult<Vec<_>>>()?;
        rows.push(GridRow {
            cash_down,
            payments,
        });
    }

    Ok(PaymentGrid { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::allocation;
    use crate::payment::formula::TaxPolicy;
    use crate::quotes::options::{generate_options, Availability};
    use crate::quotes::sources::LeaseProgramRow;
    use std::collections::BTreeMap;

    fn options() -> Vec<QuoteOption> {
        let mut tiers = BTreeMap::new();
        tiers.insert(1, dec!(0.00131));
        let rows = vec![
            LeaseProgramRow {
                model_number: "E4452F4S".into(),
                term_months: 36,
                residual: Some(dec!(0.61)),
                money_factor_by_tier: tiers.clone(),
                lease_cash: dec!(500),
            },
            LeaseProgramRow {
                model_number: "E4452F4S".into(),
                term_months: 48,
                residual: Some(dec!(0.52)),
                money_factor_by_tier: tiers,
                lease_cash: Decimal::ZERO,
            },
        ];
        generate_options(&rows, dec!(25040), 1, false)
            .unwrap()
            .into_iter()
            .filter(|o| o.mileage == 12_000)
            .collect()
    }

    fn terms() -> DealTerms {
        DealTerms {
            taxable_fees: dec!(962.50),
            non_taxable_fees: Decimal::ZERO,
            tax_rate: dec!(0.0725),
            tax_policy: TaxPolicy::OnPayment,
            fund_priority: allocation::canonical_priority(),
        }
    }

    #[test]
    fn test_default_grid_shape() {
        let spec = GridSpec {
            base_down: dec!(1000),
            ..GridSpec::default()
        };
        let grid = payment_grid(&options(), &spec, &CustomerFunds::default(), &terms()).unwrap();

        assert_eq!(grid.columns.len(), 2);
        assert_eq!(grid.columns[0].key, "36_12000");
        let downs: Vec<Money> = grid.rows.iter().map(|r| r.cash_down).collect();
        assert_eq!(downs, vec![dec!(1000), dec!(2500), dec!(4000)]);
        assert!(grid.rows.iter().all(|r| r.payments.len() == 2));
    }

    #[test]
    fn test_payments_fall_as_cash_down_rises() {
        let grid = payment_grid(
            &options(),
            &GridSpec::default(),
            &CustomerFunds::default(),
            &terms(),
        )
        .unwrap();

        for col in 0..grid.columns.len() {
            assert!(grid.rows[0].payments[col] > grid.rows[1].payments[col]);
            assert!(grid.rows[1].payments[col] > grid.rows[2].payments[col]);
        }
    }

    #[test]
    fn test_grid_rejects_empty_and_unavailable() {
        let funds = CustomerFunds::default();
        assert!(payment_grid(&[], &GridSpec::default(), &funds, &terms()).is_err());

        let mut opts = options();
        opts[0].availability = Availability::Unavailable {
            reason: "withdrawn".into(),
        };
        assert!(payment_grid(&opts, &GridSpec::default(), &funds, &terms()).is_err());
    }

    #[test]
    fn test_row_count_is_bounded() {
        let funds = CustomerFunds::default();
        let too_many = GridSpec {
            rows: u32::MAX,
            ..GridSpec::default()
        };
        assert!(matches!(
            payment_grid(&options(), &too_many, &funds, &terms()),
            Err(LeaseQuoteError::InvalidInput { .. })
        ));

        let at_cap = GridSpec {
            step: dec!(100),
            rows: MAX_GRID_ROWS,
            ..GridSpec::default()
        };
        let grid = payment_grid(&options(), &at_cap, &funds, &terms()).unwrap();
        assert_eq!(grid.rows.len(), MAX_GRID_ROWS as usize);
    }
}
