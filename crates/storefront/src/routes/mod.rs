//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Product grid, cart, wallet and checkout
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Ready once a SOL price is known
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart summary fragment
//! POST /cart/add               - Add one unit (form: product_id)
//! POST /cart/clear             - Empty the cart
//!
//! # Checkout
//! POST /checkout               - Pay in SOL, returns result fragment
//!
//! # Wallet (HTMX fragments)
//! POST /wallet/connect         - Connect this session's wallet
//! POST /wallet/disconnect      - Disconnect it
//!
//! # JSON API
//! GET  /api/products           - Catalog with SOL prices
//! GET  /api/rate               - Current exchange rate
//! GET  /api/cart               - Session cart with totals
//! ```

pub mod api;
pub mod cart;
pub mod checkout;
pub mod health;
pub mod home;
pub mod wallet;

use axum::{
    Router,
    http::Request,
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::middleware::{create_session_layer, request_id_middleware};
use crate::state::AppState;

/// Static asset directory, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/storefront/static";

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/clear", post(cart::clear))
}

/// Create the wallet routes router.
pub fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/connect", post(wallet::connect))
        .route("/disconnect", post(wallet::disconnect))
}

/// Create the JSON API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(api::products))
        .route("/rate", get(api::rate))
        .route("/cart", get(api::cart))
}

/// Create all page and fragment routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::checkout))
        .nest("/wallet", wallet_routes())
        .nest("/api", api_routes())
}

/// Build the complete application: routes, health checks, static files,
/// sessions, request IDs and request tracing.
///
/// Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}
