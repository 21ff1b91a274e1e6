//! Catalog listing command.

use solshop_storefront::catalog::Catalog;
use solshop_storefront::config::StorefrontConfig;
use solshop_storefront::services::PriceOracle;
use tracing::info;

/// List every product with its USD price and SOL price at the current rate.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the catalog cannot be
/// loaded.
pub async fn list_products() -> Result<(), Box<dyn std::error::Error>> {
    let config = StorefrontConfig::from_env()?;
    let catalog = Catalog::load(config.catalog_path.as_deref())?;
    let oracle = PriceOracle::from_config(&config.price)?;
    let rate = oracle.refresh().await;

    info!(products = catalog.len(), "Catalog loaded");
    for product in catalog.products() {
        info!(
            id = %product.id,
            usd = %product.unit_price().display(),
            sol = %rate.display_sol(product.unit_price()),
            "{}",
            product.name
        );
    }
    Ok(())
}
