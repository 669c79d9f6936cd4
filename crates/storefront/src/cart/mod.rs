//! Session cart core: store, reconciler, and checkout orchestrator.
//!
//! # Architecture
//!
//! - [`CartStore`] owns the in-memory cart state for one browser session;
//!   it is never persisted and does not survive a reload
//! - [`reconcile`] corrects the cart against current catalog truth: stale
//!   lines are pruned, snapshots refreshed, images attached per product
//! - [`CheckoutOrchestrator`] commits the cart as a strictly sequential
//!   run of inventory updates and clears the cart only if every line
//!   succeeded
//!
//! The catalog is always authoritative; the quantities, prices, and stock
//! figures held in cart lines are optimistic snapshots for display.

mod checkout;
mod reconcile;
mod session;
mod store;

pub use checkout::{
    CheckoutError, CheckoutLine, CheckoutOrchestrator, CheckoutPhase, CheckoutReceipt,
    CheckoutTransaction,
};
pub use reconcile::{ReconcileOutcome, ReconcileReport, reconcile};
pub use session::SessionContext;
pub use store::{CartLine, CartSnapshot, CartStore, DisplayImage, QuantityOutcome};
