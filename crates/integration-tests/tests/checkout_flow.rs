//! Integration tests for the SOL checkout flow.
//!
//! These drive `CheckoutService` from `AppState` with a real burner keypair
//! signing against an in-memory RPC endpoint.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use solshop_core::{Cart, ExchangeRate, Lamports, ProductId, RateQuote};
use solshop_integration_tests::TestShop;
use solshop_storefront::services::CheckoutError;
use solshop_storefront::solana::{MEMO_PROGRAM_ID, SignatureStatus, Wallet};

const MUG: u32 = 2;
const ONE_SOL: u64 = 1_000_000_000;

/// Two mugs at $12.50 is $25.00, one SOL at $25/SOL.
fn two_mugs(shop: &TestShop) -> Cart {
    let mug = shop.state.catalog().get(ProductId::new(MUG)).unwrap();
    let mut cart = Cart::new();
    cart.add(mug);
    cart.add(mug);
    cart
}

async fn run_checkout(
    shop: &TestShop,
    cart: &mut Cart,
) -> Result<solshop_storefront::services::CheckoutReceipt, CheckoutError> {
    let rate = shop.state.oracle().current();
    shop.state
        .checkout()
        .checkout(cart, &rate, shop.wallet.as_ref(), shop.state.rpc())
        .await
}

// =============================================================================
// Successful Payment
// =============================================================================

#[tokio::test]
async fn test_successful_checkout_sends_one_sol_and_clears_cart() {
    let shop = TestShop::new(5 * ONE_SOL).with_rate(25);
    let mut cart = two_mugs(&shop);

    let receipt = run_checkout(&shop, &mut cart).await.unwrap();

    assert!(cart.is_empty());
    assert_eq!(receipt.total_usd.amount, Decimal::new(2500, 2));
    assert_eq!(receipt.total_sol.amount(), Decimal::ONE);
    assert_eq!(receipt.lamports, Lamports::new(ONE_SOL));
    assert_eq!(receipt.payer, shop.wallet.public_key().unwrap());
    assert_eq!(receipt.receiver, shop.state.config().solana.receiver);
}

#[tokio::test]
async fn test_submitted_transaction_pays_receiver_with_memo() {
    let shop = TestShop::new(5 * ONE_SOL).with_rate(25);
    let mut cart = two_mugs(&shop);

    let receipt = run_checkout(&shop, &mut cart).await.unwrap();

    let sent = shop.rpc.sent();
    assert_eq!(sent.len(), 1);
    let tx = sent.first().unwrap();
    assert!(tx.verify().is_ok());
    assert_eq!(tx.signatures.first(), Some(&receipt.signature));

    let keys = &tx.message.account_keys;
    assert_eq!(keys.first(), Some(&shop.wallet.public_key().unwrap()));
    assert!(keys.contains(&receipt.receiver));
    assert!(keys.contains(&MEMO_PROGRAM_ID));

    let mut transfer_data = 2_u32.to_le_bytes().to_vec();
    transfer_data.extend_from_slice(&ONE_SOL.to_le_bytes());
    let instructions = &tx.message.instructions;
    assert_eq!(instructions.len(), 2);
    assert_eq!(instructions.first().unwrap().data, transfer_data);
    assert_eq!(
        instructions.get(1).unwrap().data,
        receipt.order.memo().into_bytes()
    );
}

// =============================================================================
// Precondition Failures
// =============================================================================

#[tokio::test]
async fn test_disconnected_wallet_leaves_cart_untouched() {
    let shop = TestShop::new(5 * ONE_SOL).with_rate(25);
    shop.wallet.disconnect();
    let mut cart = two_mugs(&shop);
    let before = cart.clone();

    let err = run_checkout(&shop, &mut cart).await.unwrap_err();

    assert_eq!(err.to_string(), "Please connect your wallet first!");
    assert_eq!(cart, before);
    assert_eq!(shop.rpc.balance_queries(), 0);
    assert!(shop.rpc.sent().is_empty());
}

#[tokio::test]
async fn test_insufficient_funds_leaves_cart_untouched() {
    let shop = TestShop::new(ONE_SOL / 2).with_rate(25);
    let mut cart = two_mugs(&shop);
    let before = cart.clone();

    let err = run_checkout(&shop, &mut cart).await.unwrap_err();

    assert_eq!(err.to_string(), "Insufficient funds in your wallet!");
    assert_eq!(cart, before);
    assert!(shop.rpc.sent().is_empty());
}

#[tokio::test]
async fn test_exact_balance_is_enough() {
    let shop = TestShop::new(ONE_SOL).with_rate(25);
    let mut cart = two_mugs(&shop);

    assert!(run_checkout(&shop, &mut cart).await.is_ok());
}

#[tokio::test]
async fn test_unset_rate_never_submits() {
    let shop = TestShop::new(5 * ONE_SOL);
    let mut cart = two_mugs(&shop);
    let before = cart.clone();

    let err = run_checkout(&shop, &mut cart).await.unwrap_err();

    assert!(matches!(err, CheckoutError::InvalidAmount));
    assert_eq!(err.to_string(), "Invalid amount to send!");
    // The balance is still looked up before the amount is validated.
    assert_eq!(shop.rpc.balance_queries(), 1);
    assert!(shop.rpc.sent().is_empty());
    assert_eq!(cart, before);
}

#[tokio::test]
async fn test_stale_rate_is_refused() {
    let shop = TestShop::new(5 * ONE_SOL);
    let mut cart = two_mugs(&shop);
    let stale = ExchangeRate::Stale(RateQuote::new(Decimal::from(25), Utc::now()));

    let err = shop
        .state
        .checkout()
        .checkout(&mut cart, &stale, shop.wallet.as_ref(), shop.state.rpc())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::StaleRate));
    assert!(!cart.is_empty());
}

#[tokio::test]
async fn test_balance_lookup_failure_is_reported() {
    let shop = TestShop::new(5 * ONE_SOL).with_rate(25);
    shop.rpc.fail_balance_queries();
    let mut cart = two_mugs(&shop);

    let err = run_checkout(&shop, &mut cart).await.unwrap_err();

    assert!(matches!(err, CheckoutError::BalanceUnavailable(_)));
    assert!(err.to_string().contains("connection refused"));
    assert!(!cart.is_empty());
}

// =============================================================================
// Post-Submission Failures
// =============================================================================

#[tokio::test]
async fn test_on_chain_failure_reports_raw_message() {
    let shop = TestShop::new(5 * ONE_SOL).with_rate(25);
    shop.rpc
        .set_status(SignatureStatus::Failed("custom program error: 0x1".to_string()));
    let mut cart = two_mugs(&shop);

    let err = run_checkout(&shop, &mut cart).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Payment failed: transaction failed: custom program error: 0x1"
    );
    assert!(err.may_have_submitted());
    assert!(!cart.is_empty());
}

#[tokio::test]
async fn test_unconfirmed_payment_times_out() {
    let shop = TestShop::new(5 * ONE_SOL).with_rate(25);
    shop.rpc.set_status(SignatureStatus::Pending);
    let mut cart = two_mugs(&shop);

    let err = run_checkout(&shop, &mut cart).await.unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::PaymentFailed {
            signature: Some(_),
            ..
        }
    ));
    assert!(!cart.is_empty());
}

// =============================================================================
// In-Flight Guard
// =============================================================================

#[tokio::test]
async fn test_second_checkout_rejected_while_first_pending() {
    let shop = TestShop::new(5 * ONE_SOL).with_rate(25);
    let release = shop.rpc.hold_submissions();
    let payer = shop.wallet.public_key().unwrap();

    let state = shop.state.clone();
    let wallet = Arc::clone(&shop.wallet);
    let mut first_cart = two_mugs(&shop);
    let first = tokio::spawn(async move {
        let rate = state.oracle().current();
        let result = state
            .checkout()
            .checkout(&mut first_cart, &rate, wallet.as_ref(), state.rpc())
            .await;
        (result.is_ok(), first_cart)
    });

    while !shop.state.checkout().is_in_flight(&payer) {
        tokio::task::yield_now().await;
    }

    let mut second_cart = two_mugs(&shop);
    let err = run_checkout(&shop, &mut second_cart).await.unwrap_err();
    assert_eq!(err.to_string(), "A payment is already in progress");
    assert!(!second_cart.is_empty());

    release.notify_one();
    let (succeeded, first_cart) = first.await.unwrap();
    assert!(succeeded);
    assert!(first_cart.is_empty());
    assert!(!shop.state.checkout().is_in_flight(&payer));

    // The slot is free again.
    assert!(run_checkout(&shop, &mut second_cart).await.is_ok());
}
