//! JSON API for the catalog, the exchange rate and the session cart.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::Serialize;
use solshop_core::{CartLine, ExchangeRate, Product};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::routes::cart::load_cart;
use crate::state::AppState;

/// A catalog product with its price in SOL at the current rate.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    #[serde(flatten)]
    pub product: Product,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub price_sol: Option<Decimal>,
}

/// The session cart with totals.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    pub item_count: u32,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_usd: Decimal,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub total_sol: Option<Decimal>,
    /// Amount a checkout would send right now, if computable.
    pub lamports: Option<u64>,
}

#[instrument(skip(state))]
pub async fn products(State(state): State<AppState>) -> Json<Vec<ProductListing>> {
    let rate = state.oracle().current();
    Json(
        state
            .catalog()
            .products()
            .iter()
            .map(|product| ProductListing {
                price_sol: rate.convert(product.unit_price()).map(|s| s.amount()),
                product: product.clone(),
            })
            .collect(),
    )
}

#[instrument(skip(state))]
pub async fn rate(State(state): State<AppState>) -> Json<ExchangeRate> {
    Json(state.oracle().current())
}

#[instrument(skip(state, session))]
pub async fn cart(State(state): State<AppState>, session: Session) -> Result<Json<CartSummary>> {
    let cart = load_cart(&session).await?;
    let total_sol = cart.total_sol(&state.oracle().current());

    Ok(Json(CartSummary {
        item_count: cart.item_count(),
        total_usd: cart.total_usd().amount,
        total_sol: total_sol.map(|s| s.amount()),
        lamports: total_sol
            .and_then(|s| s.to_lamports_floor())
            .map(|l| l.get()),
        lines: cart.lines().to_vec(),
    }))
}
