//! Shopping cart.
//!
//! A cart is an ordered list of lines with at most one line per product.
//! Lines are only ever appended or incremented; the only way to shrink a
//! cart is to clear it.

use serde::{Deserialize, Serialize};

use crate::types::{ExchangeRate, Price, Product, ProductId, SolAmount};

/// One row in the cart: a product and how many of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    /// Line subtotal in USD (unit price × quantity).
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.product.unit_price().times(self.quantity)
    }
}

/// An ordered collection of cart lines keyed by product id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add one unit of `product`.
    ///
    /// Increments the existing line for the product if there is one,
    /// otherwise appends a new line with quantity 1.
    pub fn add(&mut self, product: &Product) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product.id == product.id) {
            line.quantity = line.quantity.saturating_add(1);
        } else {
            self.lines.push(CartLine {
                product: product.clone(),
                quantity: 1,
            });
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product.id == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |acc, l| acc.saturating_add(l.quantity))
    }

    /// Exact USD total: Σ(price × quantity).
    #[must_use]
    pub fn total_usd(&self) -> Price {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// SOL equivalent of [`Self::total_usd`] at `rate`.
    #[must_use]
    pub fn total_sol(&self, rate: &ExchangeRate) -> Option<SolAmount> {
        rate.convert(self.total_usd())
    }
}
