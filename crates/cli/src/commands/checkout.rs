//! Headless checkout command.
//!
//! Builds a cart from `--item` arguments and pays for it with the keypair at
//! `SOLSHOP_KEYPAIR_PATH` (a burner if unset), using the same checkout flow
//! as the storefront.

use std::str::FromStr;

use solshop_core::{Cart, ProductId};
use solshop_storefront::catalog::Catalog;
use solshop_storefront::config::StorefrontConfig;
use solshop_storefront::services::{CheckoutService, CheckoutSettings, PriceOracle};
use solshop_storefront::solana::{KeypairWallet, SolanaRpc, Wallet};
use thiserror::Error;
use tracing::info;

/// Errors in `--item` arguments or cart assembly.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("invalid item '{0}', expected <id> or <id>:<quantity>")]
    Format(String),

    #[error("quantity must be at least 1 in '{0}'")]
    ZeroQuantity(String),

    #[error("no product with id {0}")]
    UnknownProduct(ProductId),
}

/// One `--item` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemArg {
    pub id: ProductId,
    pub quantity: u32,
}

impl FromStr for ItemArg {
    type Err = ItemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, quantity) = match s.split_once(':') {
            Some((id, quantity)) => (id, Some(quantity)),
            None => (s, None),
        };

        let id = id
            .parse::<ProductId>()
            .map_err(|_| ItemError::Format(s.to_string()))?;
        let quantity = match quantity {
            Some(q) => q
                .trim()
                .parse::<u32>()
                .map_err(|_| ItemError::Format(s.to_string()))?,
            None => 1,
        };
        if quantity == 0 {
            return Err(ItemError::ZeroQuantity(s.to_string()));
        }

        Ok(Self { id, quantity })
    }
}

/// Build a cart holding `items` from `catalog`.
///
/// # Errors
///
/// Returns `ItemError::UnknownProduct` for an id not in the catalog.
pub fn build_cart(catalog: &Catalog, items: &[ItemArg]) -> Result<Cart, ItemError> {
    let mut cart = Cart::new();
    for item in items {
        let product = catalog
            .get(item.id)
            .ok_or(ItemError::UnknownProduct(item.id))?;
        for _ in 0..item.quantity {
            cart.add(product);
        }
    }
    Ok(cart)
}

/// Run one checkout for `items`.
///
/// # Errors
///
/// Returns an error if configuration, catalog or keypair loading fails, an
/// item is invalid, or the checkout does not complete.
pub async fn run(items: &[ItemArg]) -> Result<(), Box<dyn std::error::Error>> {
    let config = StorefrontConfig::from_env()?;
    let catalog = Catalog::load(config.catalog_path.as_deref())?;
    let mut cart = build_cart(&catalog, items)?;

    let oracle = PriceOracle::from_config(&config.price)?;
    let rate = oracle.refresh().await;

    let wallet = KeypairWallet::from_optional_file(config.solana.keypair_path.as_deref())?;
    let payer = wallet.connect()?;
    let rpc = SolanaRpc::new(&config.solana.rpc_url, config.solana.commitment);
    let service = CheckoutService::new(CheckoutSettings::from(&config.solana));

    info!(
        %payer,
        receiver = %config.solana.receiver,
        items = cart.item_count(),
        total = %cart.total_usd().display(),
        "Starting checkout"
    );

    let receipt = service.checkout(&mut cart, &rate, &wallet, &rpc).await?;

    info!(
        order = %receipt.order,
        signature = %receipt.signature,
        sol = %receipt.total_sol.display(),
        lamports = receipt.lamports.get(),
        "Payment successful!"
    );
    Ok(())
}
