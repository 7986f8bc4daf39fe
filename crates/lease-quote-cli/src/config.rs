use config::{Config, Environment, File};
use tracing::debug;

use lease_quote_core::settings::QuoteSettings;

/// Default settings file, looked up in the working directory.
const DEFAULT_SETTINGS_FILE: &str = "lease-quote";

/// Load quoting settings.
///
/// Later sources override earlier ones:
/// 1. `lease-quote.toml` in the working directory (optional)
/// 2. the file given with `--config` (required when given)
/// 3. environment variables prefixed with `LEASE_QUOTE__`
///    (e.g. `LEASE_QUOTE__TAXABLE_FEES=899`, `LEASE_QUOTE__SOLVER__TOLERANCE=0.01`,
///    `LEASE_QUOTE__FUND_PRIORITY=cash_down,lease_cash`)
pub fn load_settings(path: Option<&str>) -> Result<QuoteSettings, Box<dyn std::error::Error>> {
    let mut builder =
        Config::builder().add_source(File::with_name(DEFAULT_SETTINGS_FILE).required(false));
    if let Some(path) = path {
        builder = builder.add_source(File::with_name(path).required(true));
    }
    let config = builder
        .add_source(
            Environment::with_prefix("LEASE_QUOTE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("fund_priority"),
        )
        .build()
        .map_err(|e| format!("Failed to load settings: {}", e))?;

    let settings: QuoteSettings = config
        .try_deserialize()
        .map_err(|e| format!("Invalid settings: {}", e))?;
    debug!(
        taxable_fees = %settings.taxable_fees,
        tax_policy = ?settings.tax_policy,
        default_tier = settings.default_tier,
        "Loaded quote settings"
    );
    Ok(settings)
}
