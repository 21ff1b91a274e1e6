//! Session-stored state.
//!
//! The cart itself is the session payload; see [`solshop_core::Cart`].

use serde::{Deserialize, Serialize};
use solshop_core::OrderReference;

/// Outcome of the most recent checkout in this session.
///
/// Shown on the next page load so a refresh after paying still tells the
/// shopper what happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastCheckout {
    pub success: bool,
    pub message: String,
    pub order: Option<OrderReference>,
    pub signature: Option<String>,
}

/// One shopper's wallet.
///
/// Connection state is per session, so one shopper disconnecting never
/// affects another. `burner` holds the session's own throwaway secret key
/// when the shop has no configured keypair. It lives only in the
/// server-side store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    pub connected: bool,
    pub burner: Option<Vec<u8>>,
}

/// Session keys.
pub mod keys {
    /// Key for the shopper's cart.
    pub const CART: &str = "cart";

    /// Key for the most recent checkout outcome.
    pub const LAST_CHECKOUT: &str = "last_checkout";

    /// Key for the shopper's wallet.
    pub const WALLET: &str = "wallet";
}
