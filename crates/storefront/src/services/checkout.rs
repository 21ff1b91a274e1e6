//! SOL checkout.
//!
//! Turns a cart into one confirmed SOL transfer to the shop's receiving
//! address. Every precondition failure leaves the cart untouched; only a
//! confirmed payment clears it.
//!
//! The attempt walks the [`CheckoutPhase`] state machine and logs each
//! transition with its order reference. A per-wallet in-flight guard
//! rejects a second checkout while one is still pending.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solshop_core::{
    Cart, CheckoutPhase, Commitment, ExchangeRate, Lamports, OrderReference, Price, SolAmount,
};
use thiserror::Error;

use crate::config::SolanaConfig;
use crate::solana::{ChainRpc, RpcError, Wallet, await_confirmation, payment_instructions};

/// Why a checkout did not complete.
///
/// `Display` is the message shown to the shopper.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Please connect your wallet first!")]
    WalletNotConnected,

    #[error("A payment is already in progress")]
    AlreadyInProgress,

    #[error("Exchange rate is out of date, please try again")]
    StaleRate,

    #[error("Could not check wallet balance: {0}")]
    BalanceUnavailable(#[source] RpcError),

    #[error("Insufficient funds in your wallet!")]
    InsufficientFunds { balance: Lamports, required: Decimal },

    #[error("Invalid amount to send!")]
    InvalidAmount,

    /// Signing, submission or confirmation failed; carries the raw message.
    #[error("Payment failed: {message}")]
    PaymentFailed {
        message: String,
        /// Set once the wallet has returned a signature.
        signature: Option<Signature>,
        /// The transaction was handed to the RPC node.
        submitted: bool,
    },
}

impl CheckoutError {
    /// Whether a transaction may have reached the network.
    ///
    /// Retrying such a checkout risks paying twice.
    #[must_use]
    pub const fn may_have_submitted(&self) -> bool {
        matches!(self, Self::PaymentFailed { submitted: true, .. })
    }
}

/// A confirmed payment.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order: OrderReference,
    pub signature: Signature,
    pub payer: Pubkey,
    pub receiver: Pubkey,
    pub total_usd: Price,
    pub total_sol: SolAmount,
    pub lamports: Lamports,
}

/// Fixed parameters of every checkout.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub receiver: Pubkey,
    pub commitment: Commitment,
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
    pub attach_memo: bool,
}

impl From<&SolanaConfig> for CheckoutSettings {
    fn from(config: &SolanaConfig) -> Self {
        Self {
            receiver: config.receiver,
            commitment: config.commitment,
            confirm_timeout: config.confirm_timeout,
            poll_interval: config.confirm_poll_interval,
            attach_memo: config.attach_memo,
        }
    }
}

/// Runs checkouts and tracks which wallets have one in flight.
pub struct CheckoutService {
    settings: CheckoutSettings,
    in_flight: Mutex<HashSet<Pubkey>>,
}

/// Releases a wallet's in-flight slot when dropped.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<Pubkey>>,
    payer: Pubkey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.payer);
    }
}

/// Phase tracking for one attempt.
struct Attempt {
    order: OrderReference,
    phase: CheckoutPhase,
}

impl Attempt {
    fn start() -> Self {
        Self {
            order: OrderReference::generate(),
            phase: CheckoutPhase::Idle,
        }
    }

    fn advance(&mut self, next: CheckoutPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal checkout transition {} -> {next}",
            self.phase
        );
        tracing::debug!(order = %self.order, from = %self.phase, to = %next, "Checkout transition");
        self.phase = next;
    }

    fn fail(&mut self, err: CheckoutError) -> CheckoutError {
        tracing::warn!(
            order = %self.order,
            phase = %self.phase,
            submitted = self.phase.is_submitted(),
            error = %err,
            "Checkout failed"
        );
        self.advance(CheckoutPhase::Failed);
        err
    }
}

impl Drop for Attempt {
    fn drop(&mut self) {
        if self.phase.is_terminal() {
            self.advance(CheckoutPhase::Idle);
        }
    }
}

impl CheckoutService {
    #[must_use]
    pub fn new(settings: CheckoutSettings) -> Self {
        Self {
            settings,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &CheckoutSettings {
        &self.settings
    }

    /// Whether `payer` has a checkout pending.
    #[must_use]
    pub fn is_in_flight(&self, payer: &Pubkey) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(payer)
    }

    fn try_begin(&self, payer: Pubkey) -> Option<InFlightGuard<'_>> {
        let inserted = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(payer);
        inserted.then_some(InFlightGuard {
            in_flight: &self.in_flight,
            payer,
        })
    }

    /// Pay for `cart` at `rate` with `wallet`, clearing the cart on success.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` describing the first precondition or network
    /// step that failed. The cart is unchanged in every error case.
    pub async fn checkout(
        &self,
        cart: &mut Cart,
        rate: &ExchangeRate,
        wallet: &dyn Wallet,
        rpc: &dyn ChainRpc,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let mut attempt = Attempt::start();

        attempt.advance(CheckoutPhase::ValidatingWallet);
        let payer = match wallet.public_key() {
            Some(pubkey) if wallet.is_connected() => pubkey,
            _ => return Err(attempt.fail(CheckoutError::WalletNotConnected)),
        };
        let Some(_guard) = self.try_begin(payer) else {
            return Err(attempt.fail(CheckoutError::AlreadyInProgress));
        };

        attempt.advance(CheckoutPhase::ComputingAmount);
        if matches!(rate, ExchangeRate::Stale(_)) {
            return Err(attempt.fail(CheckoutError::StaleRate));
        }
        let total_usd = cart.total_usd();
        let total_sol = cart.total_sol(rate);
        tracing::info!(
            order = %attempt.order,
            total_usd = %total_usd.amount,
            total_sol = ?total_sol.map(|s| s.amount()),
            "Checkout amount computed"
        );

        attempt.advance(CheckoutPhase::CheckingBalance);
        let balance = match rpc.get_balance(&payer).await {
            Ok(balance) => balance,
            Err(e) => return Err(attempt.fail(CheckoutError::BalanceUnavailable(e))),
        };
        tracing::info!(order = %attempt.order, balance_sol = %balance.to_sol().amount(), "Wallet balance");
        // Without a SOL total there is nothing to compare; amount validation rejects it.
        if let Some(required) = total_sol
            .and_then(|sol| sol.lamports_exact())
            .filter(|required| Decimal::from(balance.get()) < *required)
        {
            return Err(attempt.fail(CheckoutError::InsufficientFunds { balance, required }));
        }

        attempt.advance(CheckoutPhase::BuildingTransaction);
        let (total_sol, lamports) = match total_sol
            .and_then(|sol| sol.to_lamports_floor().map(|lamports| (sol, lamports)))
        {
            Some((sol, lamports)) if !lamports.is_zero() => (sol, lamports),
            _ => return Err(attempt.fail(CheckoutError::InvalidAmount)),
        };
        tracing::info!(order = %attempt.order, lamports = lamports.get(), "Lamports to send");

        let reference = self.settings.attach_memo.then_some(&attempt.order);
        let instructions =
            payment_instructions(&payer, &self.settings.receiver, lamports, reference);

        attempt.advance(CheckoutPhase::AwaitingSignature);
        let signature = match wallet.send_transaction(&instructions, rpc).await {
            Ok(signature) => signature,
            Err(e) => {
                return Err(attempt.fail(CheckoutError::PaymentFailed {
                    message: e.to_string(),
                    signature: None,
                    submitted: e.reached_network(),
                }));
            }
        };
        tracing::info!(order = %attempt.order, %signature, "Transaction submitted");

        attempt.advance(CheckoutPhase::AwaitingConfirmation);
        if let Err(e) = await_confirmation(
            rpc,
            &signature,
            self.settings.commitment,
            self.settings.confirm_timeout,
            self.settings.poll_interval,
        )
        .await
        {
            return Err(attempt.fail(CheckoutError::PaymentFailed {
                message: e.to_string(),
                signature: Some(signature),
                submitted: true,
            }));
        }

        attempt.advance(CheckoutPhase::Succeeded);
        cart.clear();
        tracing::info!(order = %attempt.order, %signature, "Payment confirmed");

        Ok(CheckoutReceipt {
            order: attempt.order,
            signature,
            payer,
            receiver: self.settings.receiver,
            total_usd,
            total_sol,
            lamports,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use solana_sdk::hash::Hash;
    use solana_sdk::instruction::Instruction;
    use solana_sdk::transaction::Transaction;
    use solshop_core::{Product, ProductId, RateQuote};
    use tokio::sync::Notify;

    use super::*;
    use crate::solana::{SignatureStatus, WalletError};

    struct FakeRpc {
        balance: u64,
        status: SignatureStatus,
        status_polls: AtomicUsize,
    }

    impl FakeRpc {
        fn with_balance(balance: u64) -> Self {
            Self {
                balance,
                status: SignatureStatus::Confirmed,
                status_polls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChainRpc for FakeRpc {
        async fn get_balance(&self, _pubkey: &Pubkey) -> Result<Lamports, RpcError> {
            Ok(Lamports::new(self.balance))
        }

        async fn latest_blockhash(&self) -> Result<Hash, RpcError> {
            Ok(Hash::default())
        }

        async fn send_transaction(&self, _tx: &Transaction) -> Result<Signature, RpcError> {
            Ok(Signature::new_unique())
        }

        async fn signature_status(
            &self,
            _signature: &Signature,
            _commitment: Commitment,
        ) -> Result<SignatureStatus, RpcError> {
            self.status_polls.fetch_add(1, Ordering::SeqCst);
            Ok(self.status.clone())
        }
    }

    struct FakeWallet {
        pubkey: Pubkey,
        connected: bool,
        sent: Mutex<Vec<Vec<Instruction>>>,
        reject_with: Option<String>,
        broadcast_error: Option<String>,
        hold: Option<Arc<Notify>>,
    }

    impl FakeWallet {
        fn connected() -> Self {
            Self {
                pubkey: Pubkey::new_unique(),
                connected: true,
                sent: Mutex::new(Vec::new()),
                reject_with: None,
                broadcast_error: None,
                hold: None,
            }
        }

        fn sends(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Wallet for FakeWallet {
        fn is_connected(&self) -> bool {
            self.connected
        }

        fn public_key(&self) -> Option<Pubkey> {
            self.connected.then_some(self.pubkey)
        }

        fn connect(&self) -> Result<Pubkey, WalletError> {
            Ok(self.pubkey)
        }

        fn disconnect(&self) {}

        async fn send_transaction(
            &self,
            instructions: &[Instruction],
            _rpc: &dyn ChainRpc,
        ) -> Result<Signature, WalletError> {
            if let Some(hold) = &self.hold {
                hold.notified().await;
            }
            if let Some(reason) = &self.reject_with {
                return Err(WalletError::Signing(reason.clone()));
            }
            if let Some(reason) = &self.broadcast_error {
                return Err(WalletError::Submit(RpcError::Unavailable(reason.clone())));
            }
            self.sent.lock().unwrap().push(instructions.to_vec());
            Ok(Signature::new_unique())
        }
    }

    fn service() -> CheckoutService {
        CheckoutService::new(CheckoutSettings {
            receiver: Pubkey::new_unique(),
            commitment: Commitment::Confirmed,
            confirm_timeout: Duration::from_millis(50),
            poll_interval: Duration::from_millis(1),
            attach_memo: true,
        })
    }

    fn cart_of(cents: i64, quantity: u32) -> Cart {
        let product = Product {
            id: ProductId::new(1),
            name: "Mug".to_string(),
            description: String::new(),
            image_url: String::new(),
            price: Decimal::new(cents, 2),
        };
        let mut cart = Cart::new();
        for _ in 0..quantity {
            cart.add(&product);
        }
        cart
    }

    fn fresh(usd_per_sol: i64) -> ExchangeRate {
        ExchangeRate::Fresh(RateQuote::new(Decimal::from(usd_per_sol), Utc::now()))
    }

    #[tokio::test]
    async fn test_successful_checkout_clears_cart() {
        let service = service();
        let wallet = FakeWallet::connected();
        let rpc = FakeRpc::with_balance(5_000_000_000);
        let mut cart = cart_of(1000, 2);

        let receipt = service
            .checkout(&mut cart, &fresh(20), &wallet, &rpc)
            .await
            .unwrap();

        assert!(cart.is_empty());
        assert_eq!(receipt.total_usd.amount, Decimal::new(2000, 2));
        assert_eq!(receipt.total_sol.amount(), Decimal::ONE);
        assert_eq!(receipt.lamports, Lamports::new(1_000_000_000));
        assert_eq!(receipt.payer, wallet.pubkey);
        assert_eq!(wallet.sends(), 1);
        assert!(!service.is_in_flight(&wallet.pubkey));
    }

    #[tokio::test]
    async fn test_transfer_and_memo_are_submitted() {
        let service = service();
        let wallet = FakeWallet::connected();
        let rpc = FakeRpc::with_balance(5_000_000_000);
        let mut cart = cart_of(1000, 2);

        let receipt = service
            .checkout(&mut cart, &fresh(20), &wallet, &rpc)
            .await
            .unwrap();

        let sent = wallet.sent.lock().unwrap();
        let instructions = sent.first().unwrap();
        assert_eq!(instructions.len(), 2);
        let memo = instructions.get(1).unwrap();
        assert_eq!(memo.data, receipt.order.memo().into_bytes());
    }

    #[tokio::test]
    async fn test_disconnected_wallet_aborts_without_touching_cart() {
        let service = service();
        let wallet = FakeWallet {
            connected: false,
            ..FakeWallet::connected()
        };
        let rpc = FakeRpc::with_balance(5_000_000_000);
        let mut cart = cart_of(1000, 2);
        let before = cart.clone();

        let err = service
            .checkout(&mut cart, &fresh(20), &wallet, &rpc)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::WalletNotConnected));
        assert_eq!(err.to_string(), "Please connect your wallet first!");
        assert_eq!(cart, before);
        assert_eq!(wallet.sends(), 0);
    }

    #[tokio::test]
    async fn test_insufficient_funds() {
        let service = service();
        let wallet = FakeWallet::connected();
        let rpc = FakeRpc::with_balance(500_000_000);
        let mut cart = cart_of(1000, 2);
        let before = cart.clone();

        let err = service
            .checkout(&mut cart, &fresh(20), &wallet, &rpc)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::InsufficientFunds { balance, .. } if balance == Lamports::new(500_000_000)
        ));
        assert_eq!(err.to_string(), "Insufficient funds in your wallet!");
        assert_eq!(cart, before);
        assert_eq!(wallet.sends(), 0);
    }

    #[tokio::test]
    async fn test_unset_rate_fails_amount_validation() {
        let service = service();
        let wallet = FakeWallet::connected();
        let rpc = FakeRpc::with_balance(5_000_000_000);
        let mut cart = cart_of(1000, 2);
        let before = cart.clone();

        let err = service
            .checkout(&mut cart, &ExchangeRate::Unset, &wallet, &rpc)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::InvalidAmount));
        assert_eq!(err.to_string(), "Invalid amount to send!");
        assert_eq!(cart, before);
        assert_eq!(wallet.sends(), 0);
    }

    #[tokio::test]
    async fn test_empty_cart_is_invalid_amount() {
        let service = service();
        let wallet = FakeWallet::connected();
        let rpc = FakeRpc::with_balance(5_000_000_000);
        let mut cart = Cart::new();

        let err = service
            .checkout(&mut cart, &fresh(20), &wallet, &rpc)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::InvalidAmount));
    }

    #[tokio::test]
    async fn test_stale_rate_refused() {
        let service = service();
        let wallet = FakeWallet::connected();
        let rpc = FakeRpc::with_balance(5_000_000_000);
        let mut cart = cart_of(1000, 2);
        let stale = ExchangeRate::Stale(RateQuote::new(Decimal::from(20), Utc::now()));

        let err = service
            .checkout(&mut cart, &stale, &wallet, &rpc)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::StaleRate));
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn test_wallet_rejection_reports_raw_message() {
        let service = service();
        let wallet = FakeWallet {
            reject_with: Some("User rejected the request.".to_string()),
            ..FakeWallet::connected()
        };
        let rpc = FakeRpc::with_balance(5_000_000_000);
        let mut cart = cart_of(1000, 2);

        let err = service
            .checkout(&mut cart, &fresh(20), &wallet, &rpc)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Payment failed: signing failed: User rejected the request."
        );
        assert!(!err.may_have_submitted());
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_error_may_have_submitted() {
        let service = service();
        let wallet = FakeWallet {
            broadcast_error: Some("request timed out".to_string()),
            ..FakeWallet::connected()
        };
        let rpc = FakeRpc::with_balance(5_000_000_000);
        let mut cart = cart_of(1000, 2);

        let err = service
            .checkout(&mut cart, &fresh(20), &wallet, &rpc)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::PaymentFailed { signature: None, submitted: true, .. }
        ));
        assert!(err.may_have_submitted());
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn test_confirmation_failure_keeps_cart() {
        let service = service();
        let wallet = FakeWallet::connected();
        let rpc = FakeRpc {
            status: SignatureStatus::Failed("InstructionError(0, Custom(1))".to_string()),
            ..FakeRpc::with_balance(5_000_000_000)
        };
        let mut cart = cart_of(1000, 2);

        let err = service
            .checkout(&mut cart, &fresh(20), &wallet, &rpc)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::PaymentFailed { signature: Some(_), .. }
        ));
        assert!(err.to_string().starts_with("Payment failed: transaction failed"));
        assert!(!cart.is_empty());
        assert!(!service.is_in_flight(&wallet.pubkey));
    }

    #[tokio::test]
    async fn test_confirmation_timeout_keeps_cart() {
        let service = service();
        let wallet = FakeWallet::connected();
        let rpc = FakeRpc {
            status: SignatureStatus::Pending,
            ..FakeRpc::with_balance(5_000_000_000)
        };
        let mut cart = cart_of(1000, 2);

        let err = service
            .checkout(&mut cart, &fresh(20), &wallet, &rpc)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("was not confirmed"));
        assert!(rpc.status_polls.load(Ordering::SeqCst) >= 1);
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn test_second_checkout_rejected_while_first_pending() {
        let service = Arc::new(service());
        let hold = Arc::new(Notify::new());
        let wallet = Arc::new(FakeWallet {
            hold: Some(Arc::clone(&hold)),
            ..FakeWallet::connected()
        });
        let rpc = Arc::new(FakeRpc::with_balance(5_000_000_000));

        let first = {
            let (service, wallet, rpc) =
                (Arc::clone(&service), Arc::clone(&wallet), Arc::clone(&rpc));
            tokio::spawn(async move {
                let mut cart = cart_of(1000, 2);
                service
                    .checkout(&mut cart, &fresh(20), wallet.as_ref(), rpc.as_ref())
                    .await
                    .map(|_| cart)
            })
        };

        while !service.is_in_flight(&wallet.pubkey) {
            tokio::task::yield_now().await;
        }

        let mut second_cart = cart_of(1000, 1);
        let err = service
            .checkout(&mut second_cart, &fresh(20), wallet.as_ref(), rpc.as_ref())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::AlreadyInProgress));
        assert!(!second_cart.is_empty());

        hold.notify_one();
        let first_cart = first.await.unwrap().unwrap();
        assert!(first_cart.is_empty());
        assert!(!service.is_in_flight(&wallet.pubkey));
    }
}
