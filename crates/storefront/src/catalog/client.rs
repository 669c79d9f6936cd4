//! HTTP catalog client.
//!
//! Plain JSON REST against the catalog service using `reqwest`.
//! Caches products and images using `moka` (5-minute TTL).

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use saltbox_core::ProductId;

use crate::config::CatalogConfig;

use super::cache::CacheValue;
use super::types::{Product, ProductImage, ProductUpdate};
use super::{CatalogError, CatalogGateway};

const CACHE_CAPACITY: u64 = 1000;
const CACHE_TTL: Duration = Duration::from_secs(300); // 5 minutes
const PRODUCTS_CACHE_KEY: &str = "products";

// =============================================================================
// CatalogClient
// =============================================================================

/// Client for the remote product catalog API.
///
/// Provides typed access to products, images, search, and inventory
/// updates. Read responses are cached for 5 minutes; mutations invalidate
/// the affected entries.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    /// API root, e.g. `http://localhost:8080/api`.
    endpoint: String,
    api_token: Option<String>,
    cache: Cache<String, CacheValue>,
}

impl CatalogClient {
    /// Create a new catalog API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base URL is not a valid URL.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        // Validate up front so a bad URL fails at startup, not per request
        Url::parse(&config.base_url)?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        let endpoint = format!("{}/api", config.base_url.trim_end_matches('/'));

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client: reqwest::Client::new(),
                endpoint,
                api_token: config
                    .api_token
                    .as_ref()
                    .map(|token| token.expose_secret().to_string()),
                cache,
            }),
        })
    }

    /// Build a request with the auth header applied when configured.
    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let mut builder = self.inner.client.request(method, url);
        if let Some(token) = &self.inner.api_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Execute a request expecting a JSON body.
    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T, CatalogError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(what.to_string()));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %truncate_body(&response_text),
                "Catalog API returned non-success status"
            );
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body: truncate_body(&response_text),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate_body(&response_text),
                "Failed to parse catalog response"
            );
            CatalogError::Parse(e)
        })
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Invalidate cached entries for a single product.
    pub async fn invalidate_product(&self, id: ProductId) {
        self.inner.cache.invalidate(&product_cache_key(id)).await;
        self.inner.cache.invalidate(&image_cache_key(id)).await;
        self.inner
            .cache
            .invalidate(&PRODUCTS_CACHE_KEY.to_string())
            .await;
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

impl CatalogGateway for CatalogClient {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        let cache_key = PRODUCTS_CACHE_KEY.to_string();

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product list");
            return Ok(products);
        }

        let url = format!("{}/products", self.inner.endpoint);
        let products: Vec<Product> = self
            .execute_json(self.request(reqwest::Method::GET, url), "product list")
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        let cache_key = product_cache_key(id);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = format!("{}/product/{id}", self.inner.endpoint);
        let product: Product = self
            .execute_json(
                self.request(reqwest::Method::GET, url),
                &format!("product {id}"),
            )
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product_image(&self, id: ProductId) -> Result<ProductImage, CatalogError> {
        let cache_key = image_cache_key(id);

        if let Some(CacheValue::Image(image)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product image");
            return Ok(image);
        }

        let url = format!("{}/product/{id}/image", self.inner.endpoint);
        let response = self.request(reqwest::Method::GET, url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(format!("image for product {id}")));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %truncate_body(&body),
                "Catalog API returned non-success status for image"
            );
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let file_name = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_disposition_file_name)
            .unwrap_or_else(|| format!("product-{id}"));

        let image = ProductImage {
            file_name,
            content_type,
            bytes: response.bytes().await?,
        };

        self.inner
            .cache
            .insert(cache_key, CacheValue::Image(image.clone()))
            .await;

        Ok(image)
    }

    #[instrument(skip(self, update), fields(product_id = %id))]
    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<(), CatalogError> {
        let product_json = serde_json::to_string(&update.product)?;
        let mut form = Form::new().part(
            "product",
            Part::text(product_json).mime_str("application/json")?,
        );

        if let Some(image) = update.image {
            form = form.part(
                "imageFile",
                Part::bytes(image.bytes.to_vec())
                    .file_name(image.file_name)
                    .mime_str(&image.content_type)?,
            );
        }

        let url = format!("{}/product/{id}", self.inner.endpoint);
        let response = self
            .request(reqwest::Method::PUT, url)
            .multipart(form)
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(format!("product {id}")));
        }
        if status == StatusCode::CONFLICT {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Conflict(truncate_body(&body)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %truncate_body(&body),
                "Catalog API rejected product update"
            );
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        self.invalidate_product(id).await;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn search_products(&self, keyword: &str) -> Result<Vec<Product>, CatalogError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            // An empty keyword is not a query; skip the round-trip entirely
            debug!("Empty search keyword, skipping catalog call");
            return Ok(Vec::new());
        }

        let url = format!("{}/products/search", self.inner.endpoint);
        let request = self
            .request(reqwest::Method::GET, url)
            .query(&[("keyword", keyword)]);

        // Search results are not cached: every keystroke is a new query
        self.execute_json(request, "product search").await
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn product_cache_key(id: ProductId) -> String {
    format!("product:{id}")
}

fn image_cache_key(id: ProductId) -> String {
    format!("image:{id}")
}

/// Truncate a response body for logging and error messages.
fn truncate_body(body: &str) -> String {
    body.chars().take(500).collect()
}

/// Extract `filename="..."` from a Content-Disposition header value.
fn parse_disposition_file_name(value: &str) -> Option<String> {
    let (_, after) = value.split_once("filename=")?;
    let name = after
        .split(';')
        .next()
        .unwrap_or(after)
        .trim()
        .trim_matches('"');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
