//! Session-scoped cart ownership and coordination.
//!
//! The session context is the single owner of mutable cart state for the
//! lifetime of a browser session. It also carries the two coordination
//! primitives the cart core needs:
//!
//! - a checkout guard: at most one checkout may be running per session,
//!   a concurrent attempt is rejected rather than queued
//! - a reconciliation generation counter: a late-completing reconciliation
//!   superseded by a newer pass discards its results (last wins, never
//!   merge)

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use saltbox_core::ProductId;
use tokio::sync::{Mutex, MutexGuard};

use super::store::{CartLine, CartSnapshot, CartStore};

/// Session-scoped context owning the cart.
///
/// Cheaply cloneable via `Arc`; all clones share the same cart. Lifecycle
/// is bound to the session: created empty, dropped on teardown, never
/// persisted.
#[derive(Clone, Default)]
pub struct SessionContext {
    inner: Arc<SessionInner>,
}

#[derive(Default)]
struct SessionInner {
    cart: Mutex<CartStore>,
    checkout_running: AtomicBool,
    reconcile_generation: AtomicU64,
}

impl SessionContext {
    /// Create a session with an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the cart for mutation by a user-action handler.
    pub async fn cart(&self) -> MutexGuard<'_, CartStore> {
        self.inner.cart.lock().await
    }

    /// Immutable copy of current cart state.
    pub async fn snapshot(&self) -> CartSnapshot {
        self.inner.cart.lock().await.snapshot()
    }

    // =========================================================================
    // Checkout exclusivity
    // =========================================================================

    /// Try to become the session's sole running checkout.
    ///
    /// Returns `None` when another checkout is already running; the caller
    /// must reject, not queue. The permit releases the slot on drop.
    pub(crate) fn try_begin_checkout(&self) -> Option<CheckoutPermit<'_>> {
        self.inner
            .checkout_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CheckoutPermit { session: self })
    }

    // =========================================================================
    // Reconciliation generations
    // =========================================================================

    /// Start a reconciliation pass, superseding any in-flight pass.
    ///
    /// Returns the pass's generation token.
    pub(crate) fn begin_reconcile(&self) -> u64 {
        self.inner
            .reconcile_generation
            .fetch_add(1, Ordering::AcqRel)
            + 1
    }

    /// Apply a completed reconciliation pass to the cart.
    ///
    /// Returns `false` (and applies nothing) when a newer pass has started
    /// since `token` was issued. The generation check happens under the
    /// cart lock so a superseding pass cannot interleave with the apply.
    pub(crate) async fn commit_reconcile(
        &self,
        token: u64,
        pruned: &[ProductId],
        reconciled: Vec<CartLine>,
    ) -> bool {
        let mut cart = self.inner.cart.lock().await;
        if self.inner.reconcile_generation.load(Ordering::Acquire) != token {
            return false;
        }
        for id in pruned {
            cart.remove(*id);
        }
        for line in reconciled {
            cart.apply_reconciled(line);
        }
        true
    }
}

/// Exclusive permission to run a checkout for one session.
///
/// Dropping the permit (on success, failure, or panic unwind) releases
/// the slot for the next attempt.
pub(crate) struct CheckoutPermit<'a> {
    session: &'a SessionContext,
}

impl Drop for CheckoutPermit<'_> {
    fn drop(&mut self) {
        self.session
            .inner
            .checkout_running
            .store(false, Ordering::Release);
    }
}
