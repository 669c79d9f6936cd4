//! Application state shared by embedding frontends.

use std::sync::Arc;

use crate::cart::SessionContext;
use crate::catalog::{CatalogClient, CatalogError};
use crate::config::StorefrontConfig;
use crate::error;

/// Application state shared across the storefront.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// catalog client, the shopper's session, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: CatalogClient,
    session: SessionContext,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured catalog base URL is invalid.
    pub fn new(config: StorefrontConfig) -> Result<Self, CatalogError> {
        let catalog = CatalogClient::new(&config.catalog)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                session: SessionContext::new(),
            }),
        })
    }

    /// Create application state from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or
    /// invalid, or if the catalog base URL cannot be parsed.
    pub fn from_env() -> error::Result<Self> {
        let config = StorefrontConfig::from_env()?;
        Ok(Self::new(config)?)
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the catalog client.
    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    /// Get a reference to the shopper's session.
    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.inner.session
    }
}
