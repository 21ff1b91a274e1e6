//! solshop storefront library.
//!
//! A small merch shop that prices its catalog in USD and takes payment as a
//! single SOL transfer. This crate provides the storefront as a library so
//! the binary, the CLI and the integration tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod solana;
pub mod state;
