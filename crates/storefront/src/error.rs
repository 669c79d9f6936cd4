//! Unified error handling.
//!
//! Provides a single `AppError` type that wraps the layer-specific errors
//! so embedding applications can report one taxonomy. Layer code keeps its
//! own error enums; `AppError` is the seam at the library surface.

use thiserror::Error;

use crate::cart::CheckoutError;
use crate::catalog::CatalogError;
use crate::config::ConfigError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration loading or validation failed.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Catalog service operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Checkout transaction failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Resource not found. Constructed by embedding frontends (the
    /// library itself reports missing products via [`CatalogError`]).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input from the caller. Constructed by embedding frontends
    /// when request validation fails before the core is invoked.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal error. Catch-all for embedding frontends.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the error is worth retrying as-is (transient upstream
    /// failure rather than caller mistake).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Catalog(err) => matches!(
                err,
                CatalogError::Http(_) | CatalogError::Status { .. }
            ),
            Self::Checkout(err) => matches!(err, CheckoutError::Transport { .. }),
            _ => false,
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
