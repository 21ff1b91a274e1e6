//! Application state shared across handlers.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::catalog::{Catalog, CatalogError};
use crate::config::StorefrontConfig;
use crate::services::{
    CheckoutService, CheckoutSettings, PriceError, PriceOracle, WalletProvider,
};
use crate::solana::{ChainRpc, SolanaRpc, WalletError};

/// Error assembling the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("price client error: {0}")]
    Price(#[from] PriceError),
    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the catalog, the exchange rate, and the Solana collaborators. Wallets
/// are per session; this only holds what they are opened from.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Catalog,
    oracle: Arc<PriceOracle>,
    wallets: WalletProvider,
    rpc: Arc<dyn ChainRpc>,
    checkout: CheckoutService,
}

impl AppState {
    /// Create the application state with live collaborators.
    ///
    /// Loads the catalog, builds the price client and opens the configured
    /// keypair. Without one, each session gets a burner wallet.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog, price client, or keypair cannot be
    /// loaded.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let catalog = Catalog::load(config.catalog_path.as_deref())?;
        let oracle = Arc::new(PriceOracle::from_config(&config.price)?);

        let wallets = WalletProvider::from_config(&config.solana)?;
        let rpc = SolanaRpc::new(&config.solana.rpc_url, config.solana.commitment);

        Ok(Self::from_parts(
            config,
            catalog,
            oracle,
            wallets,
            Arc::new(rpc),
        ))
    }

    /// Assemble state from already-built collaborators.
    #[must_use]
    pub fn from_parts(
        config: StorefrontConfig,
        catalog: Catalog,
        oracle: Arc<PriceOracle>,
        wallets: WalletProvider,
        rpc: Arc<dyn ChainRpc>,
    ) -> Self {
        let checkout = CheckoutService::new(CheckoutSettings::from(&config.solana));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                oracle,
                wallets,
                rpc,
                checkout,
            }),
        }
    }

    /// Fetch the rate now and keep refreshing it in the background if
    /// `PRICE_REFRESH_SECS` is set.
    pub fn start_price_feed(&self) -> JoinHandle<()> {
        Arc::clone(&self.inner.oracle).spawn_refresh(self.inner.config.price.refresh_interval)
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn oracle(&self) -> &PriceOracle {
        &self.inner.oracle
    }

    #[must_use]
    pub fn wallets(&self) -> &WalletProvider {
        &self.inner.wallets
    }

    #[must_use]
    pub fn rpc(&self) -> &dyn ChainRpc {
        self.inner.rpc.as_ref()
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }
}
