//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use solshop_core::{ExchangeRate, Product};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::models::{LastCheckout, keys};
use crate::routes::cart::{CartView, load_cart};
use crate::routes::wallet::{WalletView, load_wallet};
use crate::state::AppState;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub price_usd: String,
    pub price_sol: String,
}

impl ProductView {
    fn new(product: &Product, rate: &ExchangeRate) -> Self {
        Self {
            id: product.id.as_u32(),
            name: product.name.clone(),
            description: product.description.clone(),
            image_url: product.image_url.clone(),
            price_usd: product.unit_price().display(),
            price_sol: rate.display_sol(product.unit_price()),
        }
    }
}

/// Exchange rate banner data.
#[derive(Clone)]
pub struct RateView {
    /// `fresh`, `stale` or `unset`; used as a CSS modifier.
    pub state: &'static str,
    pub label: String,
}

impl From<&ExchangeRate> for RateView {
    fn from(rate: &ExchangeRate) -> Self {
        match rate {
            ExchangeRate::Unset => Self {
                state: "unset",
                label: "Fetching SOL price…".to_string(),
            },
            ExchangeRate::Fresh(quote) => Self {
                state: "fresh",
                label: format!("1 SOL = ${:.2}", quote.usd_per_sol),
            },
            ExchangeRate::Stale(quote) => Self {
                state: "stale",
                label: format!(
                    "1 SOL = ${:.2} (as of {})",
                    quote.usd_per_sol,
                    quote.fetched_at.format("%H:%M UTC")
                ),
            },
        }
    }
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub products: Vec<ProductView>,
    pub cart: CartView,
    pub wallet: WalletView,
    pub rate: RateView,
    /// Outcome of a checkout made before this page load, shown once.
    pub notice: Option<LastCheckout>,
}

/// Display the product grid with cart, wallet and checkout controls.
#[instrument(skip(state, session))]
pub async fn home(State(state): State<AppState>, session: Session) -> Result<IndexTemplate> {
    let rate = state.oracle().current();
    let cart = load_cart(&session).await?;
    let notice = session.remove::<LastCheckout>(keys::LAST_CHECKOUT).await?;
    let wallet = load_wallet(&state, &session).await?;

    Ok(IndexTemplate {
        products: state
            .catalog()
            .products()
            .iter()
            .map(|p| ProductView::new(p, &rate))
            .collect(),
        cart: CartView::new(&cart, &rate),
        wallet: WalletView::new(&wallet.wallet),
        rate: RateView::from(&rate),
        notice,
    })
}
