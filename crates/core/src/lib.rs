//! solshop Core - Shared types library.
//!
//! This crate provides the domain types used across all solshop components:
//! - `storefront` - Public-facing shop with SOL checkout
//! - `cli` - Command-line tools for browsing and headless checkout
//!
//! # Architecture
//!
//! The core crate contains only types and pure arithmetic - no I/O, no RPC
//! clients, no HTTP. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, lamports, rates and statuses
//! - [`cart`] - The shopping cart and its totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{Cart, CartLine};
pub use types::*;
