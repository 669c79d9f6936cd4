//! Domain types for the remote product catalog.
//!
//! These types mirror the catalog service's JSON wire format (camelCase
//! keys) while exposing a clean, strongly typed API to the rest of the
//! crate.

use bytes::Bytes;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use saltbox_core::ProductId;
use serde::{Deserialize, Serialize};

// =============================================================================
// Product Types
// =============================================================================

/// A product in the catalog.
///
/// Owned by the catalog; read-only to the cart core. `stock_quantity` and
/// `price` are only authoritative at the moment they were fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Stable catalog identifier.
    pub id: ProductId,
    /// Product name.
    pub name: String,
    /// Brand name.
    pub brand: String,
    /// Plain text description.
    pub description: String,
    /// Unit price (non-negative).
    pub price: Decimal,
    /// Product category.
    pub category: String,
    /// Release date, if published.
    pub release_date: Option<NaiveDate>,
    /// Whether the product is listed as purchasable.
    pub product_available: bool,
    /// Units currently in stock (non-negative).
    pub stock_quantity: u32,
    /// Stored image file name, if an image has been uploaded.
    pub image_name: Option<String>,
}

impl Product {
    /// Copy of this product with a new stock figure.
    ///
    /// Availability is re-derived: a product with zero stock is no longer
    /// purchasable, matching the catalog's own derivation. All other fields
    /// are carried unchanged so a full-record update never drops data.
    #[must_use]
    pub fn with_stock(&self, stock_quantity: u32) -> Self {
        Self {
            stock_quantity,
            product_available: self.product_available && stock_quantity > 0,
            ..self.clone()
        }
    }
}

// =============================================================================
// Image Types
// =============================================================================

/// Binary product image fetched from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductImage {
    /// File name the catalog stores the image under.
    pub file_name: String,
    /// MIME content type (e.g., `image/png`).
    pub content_type: String,
    /// Raw image bytes.
    pub bytes: Bytes,
}

impl ProductImage {
    /// Image size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the image payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// =============================================================================
// Update Types
// =============================================================================

/// Full-record product update sent to the catalog.
///
/// The catalog's update endpoint replaces the stored record, so the update
/// always carries every product field. The image part is optional: when
/// absent the catalog keeps the stored image.
#[derive(Debug, Clone)]
pub struct ProductUpdate {
    /// Complete replacement record.
    pub product: Product,
    /// Replacement image, if one should be re-attached.
    pub image: Option<ProductImage>,
}

impl ProductUpdate {
    /// Build an update that changes only the stock figure.
    #[must_use]
    pub fn stock_only(product: &Product, stock_quantity: u32) -> Self {
        Self {
            product: product.with_stock(stock_quantity),
            image: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        Product {
            id: ProductId::new(1),
            name: "Walnut Desk Organizer".to_string(),
            brand: "Saltbox".to_string(),
            description: "Five-slot organizer".to_string(),
            price: Decimal::new(2499, 2),
            category: "Office".to_string(),
            release_date: NaiveDate::from_ymd_opt(2025, 3, 1),
            product_available: true,
            stock_quantity: 12,
            image_name: Some("organizer.png".to_string()),
        }
    }

    #[test]
    fn test_product_wire_format_is_camel_case() {
        let json = serde_json::to_value(sample_product()).expect("serialize");
        assert!(json.get("stockQuantity").is_some());
        assert!(json.get("productAvailable").is_some());
        assert!(json.get("releaseDate").is_some());
        assert!(json.get("imageName").is_some());
        assert!(json.get("stock_quantity").is_none());
    }

    #[test]
    fn test_product_deserializes_from_catalog_json() {
        let raw = r#"{
            "id": 3,
            "name": "Cast Iron Pan",
            "brand": "Hearth",
            "description": "10 inch",
            "price": "34.50",
            "category": "Kitchen",
            "releaseDate": null,
            "productAvailable": true,
            "stockQuantity": 4,
            "imageName": "pan.jpg"
        }"#;
        let product: Product = serde_json::from_str(raw).expect("deserialize");
        assert_eq!(product.id, ProductId::new(3));
        assert_eq!(product.price, Decimal::new(3450, 2));
        assert_eq!(product.stock_quantity, 4);
    }

    #[test]
    fn test_with_stock_preserves_other_fields() {
        let product = sample_product();
        let updated = product.with_stock(3);
        assert_eq!(updated.stock_quantity, 3);
        assert_eq!(updated.name, product.name);
        assert_eq!(updated.description, product.description);
        assert_eq!(updated.release_date, product.release_date);
        assert_eq!(updated.image_name, product.image_name);
        assert!(updated.product_available);
    }

    #[test]
    fn test_with_stock_zero_marks_unavailable() {
        let updated = sample_product().with_stock(0);
        assert_eq!(updated.stock_quantity, 0);
        assert!(!updated.product_available);
    }

    #[test]
    fn test_stock_only_update_has_no_image() {
        let update = ProductUpdate::stock_only(&sample_product(), 11);
        assert!(update.image.is_none());
        assert_eq!(update.product.stock_quantity, 11);
    }
}
