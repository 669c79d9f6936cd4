//! In-memory cart state.
//!
//! The store is an insertion-ordered set of lines keyed by product id.
//! Quantities are clamped, never rejected: asking for more than the
//! catalog has in stock stores the stock figure and reports the clamp so
//! the UI can tell the shopper.

use rust_decimal::Decimal;
use saltbox_core::ProductId;

use crate::catalog::{Product, ProductImage};

// =============================================================================
// Line Types
// =============================================================================

/// Locally cached rendering handle for a line's image.
///
/// Derived state only - never persisted, never sent back to the catalog
/// as-is. Reconciliation replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayImage {
    /// Image fetched from the catalog for this line's product.
    Fetched(ProductImage),
    /// Placeholder shown when the catalog image could not be fetched.
    Placeholder,
}

impl DisplayImage {
    /// The fetched image, if this is not a placeholder.
    #[must_use]
    pub const fn as_fetched(&self) -> Option<&ProductImage> {
        match self {
            Self::Fetched(image) => Some(image),
            Self::Placeholder => None,
        }
    }
}

/// One product entry in the shopper's pending purchase set.
///
/// `snapshot_price` and `snapshot_stock` are copied from the catalog at
/// the last reconciliation; they drive optimistic display and are never
/// authoritative at checkout time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    /// Weak reference to the catalog product.
    pub product_id: ProductId,
    /// Units the shopper intends to buy (>= 1).
    pub quantity: u32,
    /// Unit price at last reconciliation.
    pub snapshot_price: Decimal,
    /// Stock level at last reconciliation.
    pub snapshot_stock: u32,
    /// Display image attached by the reconciler.
    pub display_image: Option<DisplayImage>,
}

impl CartLine {
    /// Line subtotal (`snapshot_price * quantity`).
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.snapshot_price * Decimal::from(self.quantity)
    }
}

/// Result of an `add` or `set_quantity` call.
///
/// Clamping is silent at the state level but observable here so the UI
/// can notify the shopper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityOutcome {
    /// Stored exactly as requested.
    Stored {
        /// Resulting line quantity.
        quantity: u32,
    },
    /// Request exceeded available stock; the stored quantity was clamped.
    Clamped {
        /// Quantity the caller asked for.
        requested: u32,
        /// Quantity actually stored.
        stored: u32,
    },
    /// Product has no stock at all; nothing was stored.
    OutOfStock,
}

impl QuantityOutcome {
    /// Whether the request was reduced (or refused) to fit stock.
    #[must_use]
    pub const fn was_clamped(&self) -> bool {
        matches!(self, Self::Clamped { .. } | Self::OutOfStock)
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable copy of cart state handed to the reconciler and orchestrator.
///
/// A snapshot shares no mutable state with the live cart; mutations after
/// the snapshot was taken are invisible to it.
#[derive(Debug, Clone, Default)]
pub struct CartSnapshot {
    lines: Vec<CartLine>,
}

impl CartSnapshot {
    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the snapshot holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of line subtotals.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::subtotal).sum()
    }
}

// =============================================================================
// CartStore
// =============================================================================

/// Process-wide, in-memory cart state for one session.
///
/// Lines are unique by product id and kept in insertion order. The store
/// is the only mutable shared resource in the cart core; consumers hold
/// it behind the session lock (see `SessionContext`).
#[derive(Debug, Clone, Default)]
pub struct CartStore {
    lines: Vec<CartLine>,
}

impl CartStore {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Look up a line by product id.
    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of line subtotals.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Insert a new line or increment an existing one.
    ///
    /// The resulting quantity is clamped to the product's current stock.
    /// Also refreshes the line's price/stock snapshot from `product`.
    pub fn add(&mut self, product: &Product, quantity: u32) -> QuantityOutcome {
        if product.stock_quantity == 0 {
            return QuantityOutcome::OutOfStock;
        }

        // Zero is not a valid line quantity; treat it as a single unit
        let quantity = quantity.max(1);

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product.id)
        {
            let requested = line.quantity.saturating_add(quantity);
            let stored = requested.min(product.stock_quantity);
            line.quantity = stored;
            line.snapshot_price = product.price;
            line.snapshot_stock = product.stock_quantity;
            return clamp_outcome(requested, stored);
        }

        let stored = quantity.min(product.stock_quantity);
        self.lines.push(CartLine {
            product_id: product.id,
            quantity: stored,
            snapshot_price: product.price,
            snapshot_stock: product.stock_quantity,
            display_image: None,
        });
        clamp_outcome(quantity, stored)
    }

    /// Delete a line if present. Removing an absent line is a no-op.
    ///
    /// Returns whether a line was removed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() < before
    }

    /// Set a line's quantity, clamped to `[1, snapshot_stock]`.
    ///
    /// Returns `None` when no line exists for `product_id`.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> Option<QuantityOutcome> {
        let line = self.lines.iter_mut().find(|l| l.product_id == product_id)?;
        let requested = quantity.max(1);
        let stored = requested.min(line.snapshot_stock);
        line.quantity = stored;
        Some(clamp_outcome(requested, stored))
    }

    /// Empty the cart unconditionally.
    ///
    /// Used by the checkout orchestrator after every line committed.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Immutable copy of current state.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            lines: self.lines.clone(),
        }
    }

    /// Replace an existing line with its reconciled form.
    ///
    /// The reconciler corrects lines but never introduces new ones: if the
    /// line's product is no longer in the cart (the shopper removed it
    /// mid-reconciliation) the update is dropped.
    pub(crate) fn apply_reconciled(&mut self, line: CartLine) {
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            *existing = line;
        }
    }
}

const fn clamp_outcome(requested: u32, stored: u32) -> QuantityOutcome {
    if stored < requested {
        QuantityOutcome::Clamped { requested, stored }
    } else {
        QuantityOutcome::Stored { quantity: stored }
    }
}
