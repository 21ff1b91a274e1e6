//! Integration test support for solshop.
//!
//! Provides an in-memory [`FakeRpc`] and a [`TestShop`] that wires it and a
//! preloaded price oracle into an `AppState` whose sessions get burner
//! wallets. A separate connected burner [`KeypairWallet`] drives the checkout
//! service directly. Nothing here touches the network.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p solshop-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use rust_decimal::Decimal;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use solshop_core::{Commitment, Lamports};
use solshop_storefront::catalog::Catalog;
use solshop_storefront::config::StorefrontConfig;
use solshop_storefront::routes;
use solshop_storefront::services::{PriceClient, PriceOracle, WalletProvider};
use solshop_storefront::solana::{ChainRpc, KeypairWallet, RpcError, SignatureStatus, Wallet};
use solshop_storefront::state::AppState;
use tokio::sync::Notify;

/// In-memory RPC endpoint.
///
/// Balance and signature status are adjustable; every submitted transaction
/// is recorded.
pub struct FakeRpc {
    balance: AtomicU64,
    balance_fails: AtomicBool,
    status: Mutex<SignatureStatus>,
    sent: Mutex<Vec<Transaction>>,
    balance_queries: AtomicUsize,
    hold_submission: Mutex<Option<Arc<Notify>>>,
    held: AtomicUsize,
}

impl FakeRpc {
    #[must_use]
    pub fn with_balance(lamports: u64) -> Self {
        Self {
            balance: AtomicU64::new(lamports),
            balance_fails: AtomicBool::new(false),
            status: Mutex::new(SignatureStatus::Confirmed),
            sent: Mutex::new(Vec::new()),
            balance_queries: AtomicUsize::new(0),
            hold_submission: Mutex::new(None),
            held: AtomicUsize::new(0),
        }
    }

    pub fn set_status(&self, status: SignatureStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    pub fn fail_balance_queries(&self) {
        self.balance_fails.store(true, Ordering::SeqCst);
    }

    /// Block the next submission until the returned handle is notified.
    pub fn hold_submissions(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self
            .hold_submission
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&notify));
        notify
    }

    #[must_use]
    pub fn sent(&self) -> Vec<Transaction> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn balance_queries(&self) -> usize {
        self.balance_queries.load(Ordering::SeqCst)
    }

    /// Submissions currently blocked by [`Self::hold_submissions`].
    #[must_use]
    pub fn held(&self) -> usize {
        self.held.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainRpc for FakeRpc {
    async fn get_balance(&self, _pubkey: &Pubkey) -> Result<Lamports, RpcError> {
        self.balance_queries.fetch_add(1, Ordering::SeqCst);
        if self.balance_fails.load(Ordering::SeqCst) {
            return Err(RpcError::Unavailable("connection refused".to_string()));
        }
        Ok(Lamports::new(self.balance.load(Ordering::SeqCst)))
    }

    async fn latest_blockhash(&self) -> Result<Hash, RpcError> {
        Ok(Hash::new_unique())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, RpcError> {
        let hold = self
            .hold_submission
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(hold) = hold {
            self.held.fetch_add(1, Ordering::SeqCst);
            hold.notified().await;
            self.held.fetch_sub(1, Ordering::SeqCst);
        }

        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(transaction.clone());
        transaction
            .signatures
            .first()
            .copied()
            .ok_or_else(|| RpcError::TransactionFailed("unsigned transaction".to_string()))
    }

    async fn signature_status(
        &self,
        _signature: &Signature,
        _commitment: Commitment,
    ) -> Result<SignatureStatus, RpcError> {
        Ok(self
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// A storefront wired to fakes.
pub struct TestShop {
    pub state: AppState,
    pub rpc: Arc<FakeRpc>,
    /// Connected burner for calling the checkout service directly.
    pub wallet: Arc<KeypairWallet>,
    pub oracle: Arc<PriceOracle>,
}

impl TestShop {
    /// A shop with the bundled catalog, every wallet holding `balance`
    /// lamports, and no exchange rate yet.
    ///
    /// Sessions start with their own auto-connected burner.
    ///
    /// # Panics
    ///
    /// Panics if the bundled catalog or the price client cannot be built.
    #[must_use]
    pub fn new(balance: u64) -> Self {
        let mut config = StorefrontConfig::default();
        config.solana.confirm_timeout = Duration::from_millis(100);
        config.solana.confirm_poll_interval = Duration::from_millis(5);
        config.price.refresh_interval = None;

        let catalog = Catalog::bundled().expect("bundled catalog");
        let client = PriceClient::new(&config.price).expect("price client");
        let oracle = Arc::new(PriceOracle::new(client, config.price.stale_after));

        let wallet = Arc::new(KeypairWallet::burner());
        wallet.connect().expect("burner connects");
        let rpc = Arc::new(FakeRpc::with_balance(balance));

        let state = AppState::from_parts(
            config,
            catalog,
            Arc::clone(&oracle),
            WalletProvider::burners(true),
            Arc::clone(&rpc) as Arc<dyn ChainRpc>,
        );

        Self {
            state,
            rpc,
            wallet,
            oracle,
        }
    }

    /// Set the current rate to `usd_per_sol`, fetched now.
    #[must_use]
    pub fn with_rate(self, usd_per_sol: i64) -> Self {
        self.oracle.record(Decimal::from(usd_per_sol));
        self
    }

    /// The full router, sessions included.
    ///
    /// Each call builds a fresh session store; clone the returned router to
    /// keep one shopper's session across requests.
    #[must_use]
    pub fn app(&self) -> Router {
        routes::app(self.state.clone())
    }
}
