//! Exchange rate command.

use solshop_core::ExchangeRate;
use solshop_storefront::config::StorefrontConfig;
use solshop_storefront::services::PriceOracle;
use tracing::{info, warn};

/// Fetch the rate once and report it.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the price client cannot
/// be built. A failed fetch is reported, not returned.
pub async fn show_rate() -> Result<(), Box<dyn std::error::Error>> {
    let config = StorefrontConfig::from_env()?;
    let oracle = PriceOracle::from_config(&config.price)?;

    match oracle.refresh().await {
        ExchangeRate::Fresh(quote) | ExchangeRate::Stale(quote) => {
            info!(
                usd_per_sol = %quote.usd_per_sol,
                fetched_at = %quote.fetched_at,
                "1 SOL = ${:.2}",
                quote.usd_per_sol
            );
        }
        ExchangeRate::Unset => {
            warn!(api = %config.price.base_url, "No exchange rate available");
        }
    }
    Ok(())
}
