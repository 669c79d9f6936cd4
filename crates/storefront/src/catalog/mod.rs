//! Product catalog gateway.
//!
//! # Architecture
//!
//! - The remote catalog is the source of truth - NO local sync, direct API
//!   calls through [`CatalogClient`]
//! - In-memory caching via `moka` for read responses (short TTL)
//! - The [`CatalogGateway`] trait seams the transport so the cart core can
//!   be exercised against an in-memory catalog in tests
//!
//! # Example
//!
//! ```rust,ignore
//! use saltbox_storefront::catalog::{CatalogClient, CatalogGateway};
//!
//! let catalog = CatalogClient::new(&config.catalog)?;
//!
//! let products = catalog.list_products().await?;
//! let product = catalog.get_product(products[0].id).await?;
//! let image = catalog.get_product_image(product.id).await?;
//! ```

mod cache;
mod client;
#[cfg(test)]
pub(crate) mod mock;
pub mod types;

pub use client::CatalogClient;
pub use types::{Product, ProductImage, ProductUpdate};

use saltbox_core::ProductId;
use thiserror::Error;

/// Errors that can occur when talking to the catalog service.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Concurrent modification rejected by the catalog.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Catalog returned an unexpected status code.
    #[error("Unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// Catalog endpoint URL could not be constructed.
    #[error("Invalid catalog URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Abstract gateway to the remote product catalog.
///
/// All calls may fail with a transport error; consumers treat transport
/// errors identically to explicit `NotFound`/`Conflict` for the purposes
/// of per-item isolation during reconciliation.
// The cart core awaits gateway calls strictly sequentially within one
// session; callers never spawn these futures onto other threads.
#[allow(async_fn_in_trait)]
pub trait CatalogGateway {
    /// Fetch the full current product list.
    async fn list_products(&self) -> Result<Vec<Product>, CatalogError>;

    /// Fetch a single product by id.
    async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError>;

    /// Fetch the binary image for a product.
    async fn get_product_image(&self, id: ProductId) -> Result<ProductImage, CatalogError>;

    /// Replace a product record (full replace, not a merge patch).
    async fn update_product(&self, id: ProductId, update: ProductUpdate)
    -> Result<(), CatalogError>;

    /// Search products by name keyword.
    ///
    /// An empty or whitespace-only keyword yields `Ok(vec![])` without any
    /// network call.
    async fn search_products(&self, keyword: &str) -> Result<Vec<Product>, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_error_display() {
        let err = CatalogError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");

        let err = CatalogError::Conflict("stock changed".to_string());
        assert_eq!(err.to_string(), "Conflict: stock changed");
    }

    #[test]
    fn test_catalog_error_status_display() {
        let err = CatalogError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "Unexpected status 502: bad gateway");
    }
}
