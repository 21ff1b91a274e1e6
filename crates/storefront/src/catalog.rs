//! Static product catalog.
//!
//! The catalog is read once at startup and never mutated. The bundled JSON
//! is compiled into the binary; `CATALOG_PATH` swaps in a file instead.

use std::collections::HashSet;
use std::path::Path;

use solshop_core::{Product, ProductId};
use thiserror::Error;

/// Catalog compiled into the binary.
const BUNDLED_CATALOG: &str = include_str!("../catalog/products.json");

/// Errors loading the product catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate product id {0} in catalog")]
    DuplicateId(ProductId),
}

/// Ordered, immutable list of products.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Load the catalog from `path`, or the bundled catalog when `None`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the file cannot be read, is not a JSON array
    /// of products, or repeats a product id.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                let catalog = Self::from_json(&raw)?;
                tracing::info!(path = %path.display(), products = catalog.len(), "Catalog loaded");
                Ok(catalog)
            }
            None => Self::bundled(),
        }
    }

    /// The catalog shipped with the binary.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the bundled JSON is malformed.
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED_CATALOG)
    }

    /// Parse a catalog from a JSON array.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` on malformed JSON or duplicate ids.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let products: Vec<Product> = serde_json::from_str(raw)?;
        Self::from_products(products)
    }

    /// Build a catalog from already-parsed products, preserving order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateId` if two products share an id.
    pub fn from_products(products: Vec<Product>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(products.len());
        for product in &products {
            if !seen.insert(product.id) {
                return Err(CatalogError::DuplicateId(product.id));
            }
        }
        Ok(Self { products })
    }

    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Look up a product by id.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
