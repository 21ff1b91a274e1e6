//! Core types for solshop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod product;
pub mod rate;
pub mod status;
pub mod token;

pub use id::*;
pub use price::{CurrencyCode, Price};
pub use product::Product;
pub use rate::{ExchangeRate, RateQuote};
pub use status::*;
pub use token::{LAMPORTS_PER_SOL, Lamports, SolAmount};
