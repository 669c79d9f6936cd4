//! Cache types for catalog API responses.

use crate::catalog::types::{Product, ProductImage};

/// Cached value types.
///
/// Images are cached under keys derived from the product id, never by
/// fetch order, so a cached image can only ever be served for the product
/// it belongs to.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
    Image(ProductImage),
}
