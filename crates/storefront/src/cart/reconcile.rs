//! Cart reconciliation against catalog truth.
//!
//! Triggered whenever the catalog is refreshed (e.g., on cart view mount).
//! A pass prunes lines whose product left the catalog, refreshes each
//! surviving line's price/stock snapshot, clamps quantities into range,
//! attaches the current product image (placeholder on per-item failure),
//! and derives the cart total. Reconciliation is idempotent: with an
//! unchanged catalog, a second pass yields the same surviving set and a
//! byte-identical total.

use std::collections::HashMap;

use rust_decimal::Decimal;
use saltbox_core::ProductId;
use tracing::{debug, instrument, warn};

use crate::catalog::{CatalogError, CatalogGateway, Product};

use super::session::SessionContext;
use super::store::{CartLine, DisplayImage};

/// Summary of an applied reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Lines that survived the pass, in insertion order.
    pub surviving: Vec<ProductId>,
    /// Lines dropped because their product left the catalog.
    pub pruned: Vec<ProductId>,
    /// Lines dropped because their product has no stock left.
    pub out_of_stock: Vec<ProductId>,
    /// Lines whose quantity was clamped down to current stock.
    pub clamped: Vec<ProductId>,
    /// Lines that received a placeholder because the image fetch failed.
    pub image_failures: Vec<ProductId>,
    /// Cart total over the reconciled set.
    pub total: Decimal,
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The pass's corrections were applied to the cart.
    Applied(ReconcileReport),
    /// A newer pass started while this one was in flight; its results
    /// were discarded (last reconciliation wins, never merge).
    Superseded,
}

/// Reconcile the session cart against current catalog truth.
///
/// Per-item image failures are absorbed (placeholder substituted); only a
/// failure to fetch the product list fails the pass as a whole. The
/// reconciler removes and corrects lines but never adds new ones.
///
/// # Errors
///
/// Returns an error when the catalog's product list cannot be fetched.
#[instrument(skip(catalog, session))]
pub async fn reconcile<G: CatalogGateway>(
    catalog: &G,
    session: &SessionContext,
) -> Result<ReconcileOutcome, CatalogError> {
    let token = session.begin_reconcile();
    let snapshot = session.snapshot().await;

    if snapshot.is_empty() {
        debug!("Cart empty, nothing to reconcile");
        return Ok(ReconcileOutcome::Applied(ReconcileReport::default()));
    }

    let products = catalog.list_products().await?;
    let by_id: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let mut report = ReconcileReport::default();
    let mut reconciled: Vec<CartLine> = Vec::with_capacity(snapshot.len());

    for line in snapshot.lines() {
        let Some(product) = by_id.get(&line.product_id) else {
            // Deletion by another actor is an expected race, not a fault
            debug!(product_id = %line.product_id, "Pruning line for product no longer in catalog");
            report.pruned.push(line.product_id);
            continue;
        };

        if product.stock_quantity == 0 {
            debug!(product_id = %line.product_id, "Dropping line for product with no stock");
            report.out_of_stock.push(line.product_id);
            continue;
        }

        let quantity = line.quantity.min(product.stock_quantity);
        if quantity < line.quantity {
            report.clamped.push(line.product_id);
        }

        // One item's image failure never blocks the others
        let display_image = match catalog.get_product_image(line.product_id).await {
            Ok(image) => DisplayImage::Fetched(image),
            Err(e) => {
                warn!(
                    product_id = %line.product_id,
                    error = %e,
                    "Image fetch failed during reconciliation, using placeholder"
                );
                report.image_failures.push(line.product_id);
                DisplayImage::Placeholder
            }
        };

        report.surviving.push(line.product_id);
        reconciled.push(CartLine {
            product_id: line.product_id,
            quantity,
            snapshot_price: product.price,
            snapshot_stock: product.stock_quantity,
            display_image: Some(display_image),
        });
    }

    report.total = reconciled.iter().map(CartLine::subtotal).sum();

    let mut pruned_ids = report.pruned.clone();
    pruned_ids.extend(&report.out_of_stock);

    if session.commit_reconcile(token, &pruned_ids, reconciled).await {
        debug!(
            surviving = report.surviving.len(),
            pruned = report.pruned.len(),
            total = %report.total,
            "Reconciliation applied"
        );
        Ok(ReconcileOutcome::Applied(report))
    } else {
        debug!("Reconciliation superseded by a newer pass, results discarded");
        Ok(ReconcileOutcome::Superseded)
    }
}
