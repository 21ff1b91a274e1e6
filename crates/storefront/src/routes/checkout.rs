//! Checkout route handler.
//!
//! Runs the SOL checkout against the session's wallet and renders the result
//! as a fragment. Success and failure both return 200 so HTMX swaps the
//! message in. A plain form post has nowhere to swap it, so the outcome is
//! kept in the session for the next page load instead.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::models::{LastCheckout, keys};
use crate::routes::cart::{load_cart, save_cart};
use crate::routes::wallet::load_wallet;
use crate::services::{CheckoutError, CheckoutReceipt};
use crate::state::AppState;

/// Message shown after a confirmed payment.
pub const PAYMENT_SUCCESSFUL: &str = "Payment successful!";

impl LastCheckout {
    #[must_use]
    pub fn succeeded(receipt: &CheckoutReceipt) -> Self {
        Self {
            success: true,
            message: PAYMENT_SUCCESSFUL.to_string(),
            order: Some(receipt.order),
            signature: Some(receipt.signature.to_string()),
        }
    }

    #[must_use]
    pub fn failed(err: &CheckoutError) -> Self {
        let signature = match err {
            CheckoutError::PaymentFailed { signature, .. } => {
                signature.as_ref().map(ToString::to_string)
            }
            _ => None,
        };
        Self {
            success: false,
            message: err.to_string(),
            order: None,
            signature,
        }
    }
}

/// Checkout result fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/checkout_result.html")]
pub struct CheckoutResultTemplate {
    pub result: LastCheckout,
}

/// Pay for the session's cart in SOL.
#[instrument(skip(state, session, headers))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<Response> {
    let mut cart = load_cart(&session).await?;
    let wallet = load_wallet(&state, &session).await?;
    let rate = state.oracle().current();

    let outcome = state
        .checkout()
        .checkout(&mut cart, &rate, &wallet.wallet, state.rpc())
        .await;

    let result = match outcome {
        Ok(receipt) => {
            save_cart(&session, &cart).await?;
            add_breadcrumb(
                "checkout",
                "Payment confirmed",
                Some(&[("order", &receipt.order.to_string())]),
            );
            LastCheckout::succeeded(&receipt)
        }
        Err(err) => {
            if err.may_have_submitted() {
                tracing::warn!(error = %err, "Checkout failed after submission");
            }
            LastCheckout::failed(&err)
        }
    };

    if !headers.contains_key("HX-Request") {
        session.insert(keys::LAST_CHECKOUT, &result).await?;
    }

    let trigger = if result.success { "cart-updated" } else { "checkout-failed" };
    Ok((
        [("HX-Trigger", trigger)],
        CheckoutResultTemplate { result },
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_message_is_checkout_display() {
        let last = LastCheckout::failed(&CheckoutError::WalletNotConnected);
        assert!(!last.success);
        assert_eq!(last.message, "Please connect your wallet first!");
        assert!(last.signature.is_none());
    }

    #[test]
    fn test_payment_failure_keeps_raw_message() {
        let last = LastCheckout::failed(&CheckoutError::PaymentFailed {
            message: "blockhash not found".to_string(),
            signature: None,
            submitted: false,
        });
        assert_eq!(last.message, "Payment failed: blockhash not found");
    }
}
