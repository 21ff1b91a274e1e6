//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `price_oracle` - USD/SOL quote fetching and staleness tracking
//! - `checkout` - Cart to confirmed SOL transfer
//! - `wallets` - Per-session wallets over a shared or burner keypair

pub mod checkout;
pub mod price_oracle;
pub mod wallets;

pub use checkout::{CheckoutError, CheckoutReceipt, CheckoutService, CheckoutSettings};
pub use price_oracle::{PriceClient, PriceError, PriceOracle};
pub use wallets::WalletProvider;
