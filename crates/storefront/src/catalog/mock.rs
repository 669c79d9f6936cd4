//! In-memory catalog used to exercise the cart core in unit tests.
//!
//! Records every gateway call so tests can assert network silence, and
//! supports per-product failure injection plus an optional per-call delay
//! for interleaving tests under a paused tokio clock.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use saltbox_core::ProductId;

use super::types::{Product, ProductImage, ProductUpdate};
use super::{CatalogError, CatalogGateway};

pub(crate) struct MockCatalog {
    state: Mutex<MockState>,
    delay: Option<Duration>,
}

#[derive(Default)]
struct MockState {
    products: Vec<Product>,
    images: HashMap<ProductId, ProductImage>,
    failing_images: HashSet<ProductId>,
    failing_updates: HashSet<ProductId>,
    calls: Vec<String>,
}

impl MockCatalog {
    pub(crate) fn new(products: Vec<Product>) -> Self {
        Self {
            state: Mutex::new(MockState {
                products,
                ..MockState::default()
            }),
            delay: None,
        }
    }

    /// Add a per-call delay (requires a paused tokio clock in tests).
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn insert_image(&self, id: ProductId, bytes: &'static [u8]) {
        let image = ProductImage {
            file_name: format!("product-{id}.png"),
            content_type: "image/png".to_string(),
            bytes: Bytes::from_static(bytes),
        };
        self.lock().images.insert(id, image);
    }

    pub(crate) fn fail_image(&self, id: ProductId) {
        self.lock().failing_images.insert(id);
    }

    pub(crate) fn fail_update(&self, id: ProductId) {
        self.lock().failing_updates.insert(id);
    }

    pub(crate) fn remove_product(&self, id: ProductId) {
        self.lock().products.retain(|p| p.id != id);
    }

    pub(crate) fn set_stock(&self, id: ProductId, stock: u32) {
        let mut state = self.lock();
        if let Some(product) = state.products.iter_mut().find(|p| p.id == id) {
            *product = product.with_stock(stock);
        }
    }

    pub(crate) fn stock(&self, id: ProductId) -> Option<u32> {
        self.lock()
            .products
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.stock_quantity)
    }

    pub(crate) fn stored_product(&self, id: ProductId) -> Option<Product> {
        self.lock().products.iter().find(|p| p.id == id).cloned()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock catalog poisoned")
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn injected_failure() -> CatalogError {
        CatalogError::Status {
            status: 503,
            body: "injected failure".to_string(),
        }
    }
}

impl CatalogGateway for MockCatalog {
    async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        self.record("list_products".to_string());
        self.pause().await;
        Ok(self.lock().products.clone())
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.record(format!("get_product:{id}"));
        self.pause().await;
        self.stored_product(id)
            .ok_or_else(|| CatalogError::NotFound(format!("product {id}")))
    }

    async fn get_product_image(&self, id: ProductId) -> Result<ProductImage, CatalogError> {
        self.record(format!("get_product_image:{id}"));
        self.pause().await;
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
        self.pause().await;
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
        self.pause().await;
        Ok(self
            .lock()
            .products
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&keyword))
            .cloned()
            .collect())
    }
}
