//! Session models for storefront.

pub mod session;

pub use session::{LastCheckout, WalletSession, keys};
