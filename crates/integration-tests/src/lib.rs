//! Integration tests for Saltbox.
//!
//! The storefront core is generic over [`CatalogGateway`], so the suite
//! runs against [`TestCatalog`], an in-memory catalog service with
//! failure injection and a call log. Tests drive the public crate
//! surface end to end: seed a catalog, mutate a session cart, reconcile,
//! check out, and assert on both the cart and the catalog afterwards.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p saltbox-integration-tests
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use bytes::Bytes;
use rust_decimal::Decimal;

use saltbox_core::ProductId;
use saltbox_storefront::catalog::{
    CatalogError, CatalogGateway, Product, ProductImage, ProductUpdate,
};

// =============================================================================
// TestCatalog
// =============================================================================

#[derive(Debug, Default)]
struct CatalogState {
    products: Vec<Product>,
    images: HashMap<ProductId, ProductImage>,
    failing_images: HashSet<ProductId>,
    failing_updates: HashSet<ProductId>,
    calls: Vec<String>,
}

/// In-memory catalog service used by the integration suite.
///
/// Behaves like the real service over its whole surface: listing,
/// per-product fetch, image fetch, full-record update with optional
/// image re-upload, and keyword search. Specific products can be made
/// to fail, and every call is recorded for ordering assertions.
#[derive(Debug, Default)]
pub struct TestCatalog {
    state: Mutex<CatalogState>,
}

impl TestCatalog {
    /// Create a catalog seeded with the given products.
    #[must_use]
    pub fn seeded(products: Vec<Product>) -> Self {
        Self {
            state: Mutex::new(CatalogState {
                products,
                ..CatalogState::default()
            }),
        }
    }

    /// Store an image for a product.
    pub fn put_image(&self, id: ProductId, bytes: &'static [u8]) {
        let image = ProductImage {
            file_name: format!("product-{id}.png"),
            content_type: "image/png".to_string(),
            bytes: Bytes::from_static(bytes),
        };
        self.lock().images.insert(id, image);
    }

    /// Make image fetches for a product fail with a 503.
    pub fn fail_image(&self, id: ProductId) {
        self.lock().failing_images.insert(id);
    }

    /// Make updates for a product fail with a 503.
    pub fn fail_update(&self, id: ProductId) {
        self.lock().failing_updates.insert(id);
    }

    /// Delete a product from the catalog.
    pub fn remove_product(&self, id: ProductId) {
        self.lock().products.retain(|p| p.id != id);
    }

    /// Overwrite a product's stock level.
    pub fn set_stock(&self, id: ProductId, stock: u32) {
        let mut state = self.lock();
        if let Some(product) = state.products.iter_mut().find(|p| p.id == id) {
            *product = product.with_stock(stock);
        }
    }

    /// Overwrite a product's unit price.
    pub fn set_price(&self, id: ProductId, price: Decimal) {
        let mut state = self.lock();
        if let Some(product) = state.products.iter_mut().find(|p| p.id == id) {
            product.price = price;
        }
    }

    /// Current stock for a product, if it exists.
    #[must_use]
    pub fn stock(&self, id: ProductId) -> Option<u32> {
        self.lock()
            .products
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.stock_quantity)
    }

    /// The full stored record for a product, if it exists.
    #[must_use]
    pub fn stored_product(&self, id: ProductId) -> Option<Product> {
        self.lock().products.iter().find(|p| p.id == id).cloned()
    }

    /// The stored image for a product, if one exists.
    #[must_use]
    pub fn stored_image(&self, id: ProductId) -> Option<ProductImage> {
        self.lock().images.get(&id).cloned()
    }

    /// Every gateway call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of gateway calls made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CatalogState> {
        self.state.lock().expect("test catalog poisoned")
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }

    fn injected_failure() -> CatalogError {
        CatalogError::Status {
            status: 503,
            body: "injected failure".to_string(),
        }
    }
}

impl CatalogGateway for TestCatalog {
    async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        self.record("list_products".to_string());
        Ok(self.lock().products.clone())
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.record(format!("get_product:{id}"));
        self.stored_product(id)
            .ok_or_else(|| CatalogError::NotFound(format!("product {id}")))
    }

    async fn get_product_image(&self, id: ProductId) -> Result<ProductImage, CatalogError> {
        self.record(format!("get_product_image:{id}"));
        let state = self.lock();
        if state.failing_images.contains(&id) {
            return Err(Self::injected_failure());
        }
        state
            .images
            .get(&id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("image for product {id}")))
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<(), CatalogError> {
        self.record(format!("update_product:{id}"));
        let mut state = self.lock();
        if state.failing_updates.contains(&id) {
            return Err(Self::injected_failure());
        }
        let Some(stored) = state.products.iter_mut().find(|p| p.id == id) else {
            return Err(CatalogError::NotFound(format!("product {id}")));
        };
        *stored = update.product;
        if let Some(image) = update.image {
            state.images.insert(id, image);
        }
        Ok(())
    }

    async fn search_products(&self, keyword: &str) -> Result<Vec<Product>, CatalogError> {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }
        self.record(format!("search_products:{keyword}"));
        Ok(self
            .lock()
            .products
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&keyword)
                    || p.brand.to_lowercase().contains(&keyword)
                    || p.category.to_lowercase().contains(&keyword)
            })
            .cloned()
            .collect())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Build a catalog product with sensible defaults for tests.
///
/// # Panics
///
/// Panics if `price` is not a valid decimal literal.
#[must_use]
pub fn product(id: i32, name: &str, price: &str, stock: u32) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        brand: "Saltbox".to_string(),
        description: format!("{name} from the Saltbox test range"),
        price: price.parse().expect("valid price literal"),
        category: "Kitchen".to_string(),
        release_date: chrono::NaiveDate::from_ymd_opt(2025, 3, 1),
        product_available: stock > 0,
        stock_quantity: stock,
        image_name: Some(format!("{}.png", name.to_lowercase().replace(' ', "-"))),
    }
}

/// Parse a decimal literal, panicking on malformed input.
///
/// # Panics
///
/// Panics if `literal` is not a valid decimal.
#[must_use]
pub fn dec(literal: &str) -> Decimal {
    literal.parse().expect("valid decimal literal")
}
