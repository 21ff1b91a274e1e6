//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The cart is stored whole in the session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse},
};
use serde::Deserialize;
use solshop_core::{Cart, CartLine, ExchangeRate, ProductId};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::keys;
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub product_id: u32,
    pub name: String,
    pub quantity: u32,
    pub unit_price: String,
    pub subtotal_usd: String,
    pub subtotal_sol: String,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
    pub total_usd: String,
    pub total_sol: String,
    pub rate_is_stale: bool,
}

impl CartView {
    /// Render `cart` with SOL amounts at `rate`.
    #[must_use]
    pub fn new(cart: &Cart, rate: &ExchangeRate) -> Self {
        Self {
            lines: cart
                .lines()
                .iter()
                .map(|line| CartLineView::new(line, rate))
                .collect(),
            item_count: cart.item_count(),
            total_usd: cart.total_usd().display(),
            total_sol: rate.display_sol(cart.total_usd()),
            rate_is_stale: matches!(rate, ExchangeRate::Stale(_)),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl CartLineView {
    fn new(line: &CartLine, rate: &ExchangeRate) -> Self {
        let subtotal = line.subtotal();
        Self {
            product_id: line.product.id.as_u32(),
            name: line.product.name.clone(),
            quantity: line.quantity,
            unit_price: line.product.unit_price().display(),
            subtotal_usd: subtotal.display(),
            subtotal_sol: rate.display_sol(subtotal),
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Load the cart from the session, empty if none is stored.
///
/// # Errors
///
/// Returns `AppError::Session` if the session store fails.
pub async fn load_cart(session: &Session) -> Result<Cart> {
    Ok(session.get::<Cart>(keys::CART).await?.unwrap_or_default())
}

/// Store the cart in the session.
///
/// # Errors
///
/// Returns `AppError::Session` if the session store fails.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(keys::CART, cart).await?;
    Ok(())
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
}

/// Cart summary fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart.html")]
pub struct CartTemplate {
    pub cart: CartView,
}

/// Display the cart fragment.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<CartTemplate> {
    let cart = load_cart(&session).await?;
    Ok(CartTemplate {
        cart: CartView::new(&cart, &state.oracle().current()),
    })
}

/// Add one unit of a product to the cart (HTMX).
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<impl IntoResponse> {
    let id: ProductId = form
        .product_id
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid product id '{}'", form.product_id)))?;

    let product = state
        .catalog()
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let mut cart = load_cart(&session).await?;
    cart.add(product);
    save_cart(&session, &cart).await?;

    tracing::info!(product_id = %id, items = cart.item_count(), "Added to cart");
    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", &id.to_string())]));

    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartTemplate {
            cart: CartView::new(&cart, &state.oracle().current()),
        },
    ))
}

/// Empty the cart (HTMX).
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<impl IntoResponse> {
    let mut cart = load_cart(&session).await?;
    cart.clear();
    save_cart(&session, &cart).await?;

    tracing::info!("Cart cleared");
    add_breadcrumb("cart", "Cleared cart", None);

    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartTemplate {
            cart: CartView::new(&cart, &state.oracle().current()),
        },
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use solshop_core::{Product, RateQuote};

    use super::*;

    fn mug() -> Product {
        Product {
            id: ProductId::new(2),
            name: "Lamport Mug".to_string(),
            description: String::new(),
            image_url: String::new(),
            price: Decimal::new(1000, 2),
        }
    }

    #[test]
    fn test_cart_view_with_rate() {
        let mut cart = Cart::new();
        cart.add(&mug());
        cart.add(&mug());
        let rate = ExchangeRate::Fresh(RateQuote::new(Decimal::from(20), Utc::now()));

        let view = CartView::new(&cart, &rate);
        assert_eq!(view.item_count, 2);
        assert_eq!(view.total_usd, "$20.00");
        assert_eq!(view.total_sol, "1.0000 SOL");
        assert!(!view.rate_is_stale);

        let line = view.lines.first().map(|l| (l.quantity, l.subtotal_sol.clone()));
        assert_eq!(line, Some((2, "1.0000 SOL".to_string())));
    }

    #[test]
    fn test_cart_view_without_rate() {
        let mut cart = Cart::new();
        cart.add(&mug());

        let view = CartView::new(&cart, &ExchangeRate::Unset);
        assert_eq!(view.total_usd, "$10.00");
        assert_eq!(view.total_sol, "— SOL");
    }

    #[test]
    fn test_empty_cart_view() {
        let view = CartView::new(&Cart::new(), &ExchangeRate::Unset);
        assert!(view.is_empty());
        assert_eq!(view.total_usd, "$0.00");
    }
    #[test]
    fn test_empty_cart_hides_actions() {
        let html = CartTemplate {
            cart: CartView::new(&Cart::new(), &ExchangeRate::Unset),
        }
        .render()
        .unwrap();
        assert!(html.contains("Your cart is empty."));
        assert!(!html.contains("Checkout with SOL"));
        assert!(!html.contains("Clear cart"));
    }

    #[test]
    fn test_filled_cart_shows_actions() {
        let mut cart = Cart::new();
        cart.add(&mug());
        let html = CartTemplate {
            cart: CartView::new(&cart, &ExchangeRate::Unset),
        }
        .render()
        .unwrap();
        assert!(html.contains("Checkout with SOL"));
        assert!(html.contains("Clear cart"));
    }
}
