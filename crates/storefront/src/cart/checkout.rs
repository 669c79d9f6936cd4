//! Checkout orchestration.
//!
//! Commits the reconciled cart as a sequence of remote inventory
//! mutations, all-or-nothing from the shopper's perspective. The catalog
//! offers no multi-item transaction primitive, so updates are issued
//! strictly one at a time; on the first failure the run aborts, leaves
//! the cart untouched for retry, and reports one aggregate error. Only
//! when every line succeeded is the cart cleared.
//!
//! A late failure after several successful updates leaves the remote
//! catalog decremented for those items even though the cart was not
//! cleared. That inconsistency window is documented in the error rather
//! than hidden.

use std::collections::HashMap;

use rust_decimal::Decimal;
use saltbox_core::{ProductId, format_usd};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::catalog::{CatalogError, CatalogGateway, ProductImage, ProductUpdate};

use super::session::SessionContext;
use super::store::CartSnapshot;

// =============================================================================
// Transaction Types
// =============================================================================

/// One inventory mutation to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    /// Product whose stock will be decremented.
    pub product_id: ProductId,
    /// Units being purchased.
    pub requested_quantity: u32,
    /// Unit price captured when checkout was confirmed.
    pub price_at_checkout: Decimal,
}

/// Ephemeral, ordered set of inventory mutations derived from the cart at
/// the moment checkout is confirmed.
///
/// Consumed by one orchestrator run and discarded after terminal success
/// or failure; no retry state is retained. Images are keyed by product
/// id, never by fetch order, so a re-upload always attaches to the
/// product it belongs to.
#[derive(Debug, Clone)]
pub struct CheckoutTransaction {
    lines: Vec<CheckoutLine>,
    images: HashMap<ProductId, ProductImage>,
}

impl CheckoutTransaction {
    /// Derive a transaction from a cart snapshot, preserving insertion
    /// order.
    #[must_use]
    pub fn from_snapshot(snapshot: &CartSnapshot) -> Self {
        let lines = snapshot
            .lines()
            .iter()
            .map(|line| CheckoutLine {
                product_id: line.product_id,
                requested_quantity: line.quantity,
                price_at_checkout: line.snapshot_price,
            })
            .collect();
        let images = snapshot
            .lines()
            .iter()
            .filter_map(|line| {
                let image = line.display_image.as_ref()?.as_fetched()?;
                Some((line.product_id, image.clone()))
            })
            .collect();
        Self { lines, images }
    }

    /// Mutations in cart insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CheckoutLine] {
        &self.lines
    }

    /// The reconciled image for a product, if one was attached.
    #[must_use]
    pub fn image(&self, product_id: ProductId) -> Option<&ProductImage> {
        self.images.get(&product_id)
    }

    /// Order total at the captured prices.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines
            .iter()
            .map(|l| l.price_at_checkout * Decimal::from(l.requested_quantity))
            .sum()
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Checkout state machine phases.
///
/// `Running` is the only phase permitting network calls; `Committed` and
/// `Aborted` are terminal per invocation. There is intentionally no
/// partial-commit phase: the cart is all purchased or none purchased.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckoutPhase {
    /// No checkout performed yet in this cycle.
    #[default]
    Idle,
    /// Inventory updates in flight.
    Running,
    /// Every line committed; the cart was cleared.
    Committed,
    /// A line failed; the cart was left untouched.
    Aborted,
}

/// Outcome of a fully committed checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    /// Number of inventory updates applied.
    pub lines_committed: usize,
    /// Order total at the captured prices.
    pub total: Decimal,
}

impl CheckoutReceipt {
    /// The order total formatted for display, e.g. `$90.00`.
    #[must_use]
    pub fn formatted_total(&self) -> String {
        format_usd(self.total)
    }
}

/// Aggregate checkout failure reported to the caller.
///
/// On any failure the cart retains its original contents so the shopper
/// can retry; retry is a new user-initiated checkout over a freshly
/// reconciled snapshot, never automatic.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout invoked with zero lines; rejected before any network call.
    #[error("cart is empty; nothing to check out")]
    EmptyCart,

    /// Another checkout is already running for this session.
    #[error("a checkout is already in progress for this session")]
    AlreadyRunning,

    /// A line requested more units than the catalog has at commit time.
    /// Aborts the whole transaction; remaining stock is never forced
    /// negative.
    #[error(
        "product {product_id}: requested {requested} but only {available} in stock \
         ({applied} earlier update(s) already applied)"
    )]
    LineInvalid {
        /// Offending product.
        product_id: ProductId,
        /// Units the line asked for.
        requested: u32,
        /// Units the catalog reports available.
        available: u32,
        /// Updates applied before the abort; they remain applied remotely.
        applied: usize,
    },

    /// The catalog rejected or failed a line's update. Updates applied
    /// before the failure remain applied remotely (documented
    /// inconsistency, not auto-repaired).
    #[error("checkout aborted at product {product_id} after {applied} applied update(s): {source}")]
    Transport {
        /// Product whose update failed.
        product_id: ProductId,
        /// Updates applied before the abort.
        applied: usize,
        /// Underlying catalog error.
        source: CatalogError,
    },
}

/// Executes the multi-item checkout transaction.
///
/// One orchestrator serves one invocation cycle; `phase` exposes where
/// the last run ended. Cross-invocation exclusivity lives on the session
/// (a second `checkout` while one is running is rejected, not queued).
#[derive(Debug, Default)]
pub struct CheckoutOrchestrator {
    phase: CheckoutPhase,
}

impl CheckoutOrchestrator {
    /// Create an orchestrator in the `Idle` phase.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: CheckoutPhase::Idle,
        }
    }

    /// Phase the current (or last) invocation reached.
    #[must_use]
    pub const fn phase(&self) -> CheckoutPhase {
        self.phase
    }

    /// Commit the session's cart as a sequence of inventory updates.
    ///
    /// For each line, in insertion order: fetch the product's current
    /// record, validate the requested quantity against current stock,
    /// and push a full-record update with the decremented figure. Updates
    /// await one another; nothing is dispatched in parallel. On success
    /// the cart is cleared; on the first failure the run aborts with the
    /// cart untouched.
    ///
    /// # Errors
    ///
    /// See [`CheckoutError`] for the failure taxonomy.
    #[instrument(skip(self, catalog, session))]
    pub async fn checkout<G: CatalogGateway>(
        &mut self,
        catalog: &G,
        session: &SessionContext,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        // A new invocation always starts a fresh Idle -> Running cycle
        self.phase = CheckoutPhase::Idle;

        let Some(_permit) = session.try_begin_checkout() else {
            return Err(CheckoutError::AlreadyRunning);
        };

        let snapshot = session.snapshot().await;
        if snapshot.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let transaction = CheckoutTransaction::from_snapshot(&snapshot);
        self.phase = CheckoutPhase::Running;
        info!(
            lines = transaction.lines().len(),
            total = %transaction.total(),
            "Starting checkout"
        );

        let mut applied = 0usize;
        for line in transaction.lines() {
            // Strictly one update in flight: await each response before
            // issuing the next
            let current = match catalog.get_product(line.product_id).await {
                Ok(product) => product,
                Err(source) => {
                    self.phase = CheckoutPhase::Aborted;
                    error!(
                        product_id = %line.product_id,
                        applied,
                        error = %source,
                        "Checkout aborted: product fetch failed"
                    );
                    return Err(CheckoutError::Transport {
                        product_id: line.product_id,
                        applied,
                        source,
                    });
                }
            };

            if line.requested_quantity > current.stock_quantity {
                self.phase = CheckoutPhase::Aborted;
                error!(
                    product_id = %line.product_id,
                    requested = line.requested_quantity,
                    available = current.stock_quantity,
                    "Checkout aborted: line exceeds current stock"
                );
                return Err(CheckoutError::LineInvalid {
                    product_id: line.product_id,
                    requested: line.requested_quantity,
                    available: current.stock_quantity,
                    applied,
                });
            }

            let remaining = current.stock_quantity - line.requested_quantity;

            let mut update = ProductUpdate::stock_only(&current, remaining);
            // Re-attach the reconciled image for this product; without one,
            // fall back to fetching, and failing that let the catalog keep
            // its stored image
            update.image = match transaction.image(line.product_id) {
                Some(image) => Some(image.clone()),
                None => catalog.get_product_image(line.product_id).await.ok(),
            };

            if let Err(source) = catalog.update_product(line.product_id, update).await {
                self.phase = CheckoutPhase::Aborted;
                error!(
                    product_id = %line.product_id,
                    applied,
                    error = %source,
                    "Checkout aborted: inventory update failed"
                );
                return Err(CheckoutError::Transport {
                    product_id: line.product_id,
                    applied,
                    source,
                });
            }

            applied += 1;
        }

        // Terminal success path: the only place that clears the cart
        session.cart().await.clear();
        self.phase = CheckoutPhase::Committed;
        info!(
            lines_committed = applied,
            total = %format_usd(transaction.total()),
            "Checkout committed"
        );

        Ok(CheckoutReceipt {
            lines_committed: applied,
            total: transaction.total(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::catalog::Product;
    use crate::catalog::mock::MockCatalog;
    use crate::cart::reconcile::{ReconcileOutcome, reconcile};

    fn product(id: i32, price: &str, stock: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            brand: "Saltbox".to_string(),
            description: String::new(),
            price: price.parse().expect("price"),
            category: "Test".to_string(),
            release_date: None,
            product_available: stock > 0,
            stock_quantity: stock,
            image_name: Some(format!("product-{id}.png")),
        }
    }

    async fn session_with(catalog: &MockCatalog, items: &[(i32, u32)]) -> SessionContext {
        let session = SessionContext::new();
        {
            let mut cart = session.cart().await;
            for (id, quantity) in items {
                let p = catalog
                    .stored_product(ProductId::new(*id))
                    .expect("mock product");
                cart.add(&p, *quantity);
            }
        }
        session
    }

    #[tokio::test]
    async fn test_empty_cart_rejected_without_network() {
        let catalog = MockCatalog::new(vec![product(1, "10.00", 5)]);
        let session = SessionContext::new();
        let mut orchestrator = CheckoutOrchestrator::new();

        let result = orchestrator.checkout(&catalog, &session).await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert_eq!(catalog.call_count(), 0);
        assert_eq!(orchestrator.phase(), CheckoutPhase::Idle);
    }

    #[tokio::test]
    async fn test_single_line_success_decrements_stock_and_clears_cart() {
        let catalog = MockCatalog::new(vec![product(1, "10.00", 10)]);
        catalog.insert_image(ProductId::new(1), b"img1");
        let session = session_with(&catalog, &[(1, 1)]).await;
        let mut orchestrator = CheckoutOrchestrator::new();

        let receipt = orchestrator
            .checkout(&catalog, &session)
            .await
            .expect("checkout");

        assert_eq!(receipt.lines_committed, 1);
        assert_eq!(receipt.total, "10.00".parse::<Decimal>().expect("decimal"));
        assert_eq!(catalog.stock(ProductId::new(1)), Some(9));
        assert!(session.snapshot().await.is_empty());
        assert_eq!(orchestrator.phase(), CheckoutPhase::Committed);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_cart_and_applies_first_line() {
        // Cart [(A, qty=2, stock=5), (B, qty=3, stock=3)]; B's update fails
        let catalog = MockCatalog::new(vec![product(1, "10.00", 5), product(2, "4.00", 3)]);
        let session = session_with(&catalog, &[(1, 2), (2, 3)]).await;
        catalog.fail_update(ProductId::new(2));
        let mut orchestrator = CheckoutOrchestrator::new();

        let result = orchestrator.checkout(&catalog, &session).await;
        match result {
            Err(CheckoutError::Transport {
                product_id,
                applied,
                ..
            }) => {
                assert_eq!(product_id, ProductId::new(2));
                assert_eq!(applied, 1);
            }
            other => panic!("expected transport abort, got {other:?}"),
        }

        // A's decrement persists remotely; B's never happened
        assert_eq!(catalog.stock(ProductId::new(1)), Some(3));
        assert_eq!(catalog.stock(ProductId::new(2)), Some(3));

        // The cart is left whole, not partially cleared
        let cart = session.snapshot().await;
        assert_eq!(cart.len(), 2);
        assert_eq!(orchestrator.phase(), CheckoutPhase::Aborted);
    }

    #[tokio::test]
    async fn test_invalid_line_aborts_before_its_update() {
        let catalog = MockCatalog::new(vec![product(1, "10.00", 2)]);
        let session = session_with(&catalog, &[(1, 2)]).await;
        // Stock shrank between reconciliation and checkout confirmation
        catalog.set_stock(ProductId::new(1), 1);
        let mut orchestrator = CheckoutOrchestrator::new();

        let result = orchestrator.checkout(&catalog, &session).await;
        match result {
            Err(CheckoutError::LineInvalid {
                product_id,
                requested,
                available,
                applied,
            }) => {
                assert_eq!(product_id, ProductId::new(1));
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
                assert_eq!(applied, 0);
            }
            other => panic!("expected invalid line, got {other:?}"),
        }

        // Stock was never forced negative, never decremented
        assert_eq!(catalog.stock(ProductId::new(1)), Some(1));
        assert_eq!(session.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_updates_are_issued_in_insertion_order() {
        let catalog = MockCatalog::new(vec![
            product(3, "1.00", 5),
            product(1, "1.00", 5),
            product(2, "1.00", 5),
        ]);
        let session = session_with(&catalog, &[(3, 1), (1, 1), (2, 1)]).await;
        let mut orchestrator = CheckoutOrchestrator::new();

        orchestrator
            .checkout(&catalog, &session)
            .await
            .expect("checkout");

        let updates: Vec<String> = catalog
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("update_product"))
            .collect();
        assert_eq!(
            updates,
            vec![
                "update_product:3".to_string(),
                "update_product:1".to_string(),
                "update_product:2".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_update_reattaches_image_keyed_by_product() {
        let catalog = MockCatalog::new(vec![product(1, "10.00", 5), product(2, "4.00", 5)]);
        catalog.insert_image(ProductId::new(1), b"image-a");
        catalog.insert_image(ProductId::new(2), b"image-b");
        let session = session_with(&catalog, &[(1, 1), (2, 1)]).await;

        // Reconcile first so each line carries its own product's image
        let outcome = reconcile(&catalog, &session).await.expect("reconcile");
        assert!(matches!(outcome, ReconcileOutcome::Applied(_)));

        let snapshot = session.snapshot().await;
        let transaction = CheckoutTransaction::from_snapshot(&snapshot);
        assert_eq!(
            transaction
                .image(ProductId::new(1))
                .map(|i| i.bytes.as_ref()),
            Some(b"image-a".as_ref())
        );
        assert_eq!(
            transaction
                .image(ProductId::new(2))
                .map(|i| i.bytes.as_ref()),
            Some(b"image-b".as_ref())
        );

        let mut orchestrator = CheckoutOrchestrator::new();
        orchestrator
            .checkout(&catalog, &session)
            .await
            .expect("checkout");
    }

    #[tokio::test]
    async fn test_full_record_update_preserves_catalog_fields() {
        let mut rich = product(1, "10.00", 5);
        rich.description = "Hand-forged carbon steel".to_string();
        rich.release_date = chrono::NaiveDate::from_ymd_opt(2025, 6, 1);
        let catalog = MockCatalog::new(vec![rich.clone()]);
        let session = session_with(&catalog, &[(1, 2)]).await;
        let mut orchestrator = CheckoutOrchestrator::new();

        orchestrator
            .checkout(&catalog, &session)
            .await
            .expect("checkout");

        let stored = catalog.stored_product(ProductId::new(1)).expect("product");
        assert_eq!(stored.stock_quantity, 3);
        assert_eq!(stored.description, rich.description);
        assert_eq!(stored.release_date, rich.release_date);
        assert_eq!(stored.name, rich.name);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_checkout_rejected_without_double_decrement() {
        let catalog = MockCatalog::new(vec![product(1, "10.00", 10)])
            .with_delay(Duration::from_millis(50));
        let session = session_with(&catalog, &[(1, 2)]).await;

        let mut first = CheckoutOrchestrator::new();
        let mut second = CheckoutOrchestrator::new();

        let (first_result, second_result) = tokio::join!(
            first.checkout(&catalog, &session),
            async {
                // Give the first invocation a head start into Running
                tokio::time::sleep(Duration::from_millis(1)).await;
                second.checkout(&catalog, &session).await
            },
        );

        assert!(first_result.is_ok());
        assert!(matches!(second_result, Err(CheckoutError::AlreadyRunning)));

        // Exactly one decrement of 2, never a double-decrement
        assert_eq!(catalog.stock(ProductId::new(1)), Some(8));
    }

    #[tokio::test]
    async fn test_retry_after_abort_succeeds_on_fresh_attempt() {
        let catalog = MockCatalog::new(vec![product(1, "10.00", 5)]);
        let session = session_with(&catalog, &[(1, 2)]).await;
        catalog.fail_update(ProductId::new(1));

        let mut orchestrator = CheckoutOrchestrator::new();
        assert!(orchestrator.checkout(&catalog, &session).await.is_err());
        assert_eq!(orchestrator.phase(), CheckoutPhase::Aborted);

        // The failed run released the session's checkout slot
        let catalog_ok = MockCatalog::new(vec![product(1, "10.00", 5)]);
        let mut retry = CheckoutOrchestrator::new();
        let receipt = retry
            .checkout(&catalog_ok, &session)
            .await
            .expect("retry checkout");
        assert_eq!(receipt.lines_committed, 1);
        assert_eq!(retry.phase(), CheckoutPhase::Committed);
    }

    #[test]
    fn test_transaction_total_uses_captured_prices() {
        let mut store = crate::cart::CartStore::new();
        store.add(&product(1, "10.50", 5), 2);
        store.add(&product(2, "3.25", 5), 3);

        let transaction = CheckoutTransaction::from_snapshot(&store.snapshot());
        assert_eq!(
            transaction.total(),
            "30.75".parse::<Decimal>().expect("decimal")
        );
    }
}
