//! Pending-call table: outstanding outbound calls keyed by correlation id.
//!
//! Each outbound call parks a oneshot sender here before its frame is
//! written; the event loop settles it when the matching reply arrives.
//! Settlement is remove-then-send under the table lock, so a slot can be
//! consumed exactly once no matter which path (reply, timeout, disconnect)
//! gets there first.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use serde_json::Value;
use tokio::sync::{oneshot, Mutex};
use tracing::debug;

use switchboard_protocol::RpcId;

use crate::error::SessionError;

type Slot = oneshot::Sender<Result<Value, SessionError>>;

/// Table of outstanding outbound calls.
///
/// Ids come from a monotone counter and are never reused within a session's
/// lifetime, which is what keeps concurrently outstanding calls collision
/// free.
pub(crate) struct PendingCalls {
    next_id: AtomicI64,
    slots: Mutex<HashMap<RpcId, Slot>>,
    // Read and written only under the `slots` lock; once set, no new slot
    // ever enters the table.
    closed: AtomicBool,
}

impl PendingCalls {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            slots: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Allocate a fresh correlation id and park a completion slot for it.
    ///
    /// The entry is in the table before the caller writes its frame, so a
    /// fast reply can never race past an unregistered id. A call that slips
    /// in after [`PendingCalls::fail_all`] has drained the table is settled
    /// here with `ConnectionClosed` instead of being parked, so it cannot
    /// sit unanswered until its deadline.
    pub(crate) async fn register(
        &self,
    ) -> (RpcId, oneshot::Receiver<Result<Value, SessionError>>) {
        let id = RpcId::Number(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        let mut slots = self.slots.lock().await;
        if self.closed.load(Ordering::Relaxed) {
            let _ = tx.send(Err(SessionError::ConnectionClosed));
        } else {
            slots.insert(id.clone(), tx);
        }
        (id, rx)
    }

    /// Settle the call with the given id, if it is still outstanding.
    ///
    /// Returns `false` when no entry matches (already timed out, already
    /// settled, or never ours) so the caller can log the stray reply.
    pub(crate) async fn settle(&self, id: &RpcId, outcome: Result<Value, SessionError>) -> bool {
        let slot = self.slots.lock().await.remove(id);
        match slot {
            Some(tx) => {
                // A receiver dropped mid-settlement just means the caller
                // gave up; nothing left to deliver to.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Drop the entry for `id` without settling it (timeout path).
    pub(crate) async fn remove(&self, id: &RpcId) {
        self.slots.lock().await.remove(id);
    }

    /// Fail every outstanding call with `ConnectionClosed` (disconnect path)
    /// and refuse further registrations.
    pub(crate) async fn fail_all(&self) {
        let mut slots = self.slots.lock().await;
        self.closed.store(true, Ordering::Relaxed);
        let count = slots.len();
        for (_, tx) in slots.drain() {
            let _ = tx.send(Err(SessionError::ConnectionClosed));
        }
        if count > 0 {
            debug!(count, "failed outstanding calls on shutdown");
        }
    }

    #[cfg(test)]
    pub(crate) async fn contains(&self, id: &RpcId) -> bool {
        self.slots.lock().await.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_are_unique_while_outstanding() {
        let pending = PendingCalls::new();
        let (id_a, _rx_a) = pending.register().await;
        let (id_b, _rx_b) = pending.register().await;
        let (id_c, _rx_c) = pending.register().await;

        assert_ne!(id_a, id_b);
        assert_ne!(id_b, id_c);
        assert_ne!(id_a, id_c);
    }

    #[tokio::test]
    async fn test_settle_delivers_and_removes() {
        let pending = PendingCalls::new();
        let (id, rx) = pending.register().await;

        assert!(pending.settle(&id, Ok(serde_json::json!(8))).await);
        assert_eq!(rx.await.unwrap().unwrap(), serde_json::json!(8));

        // Second settlement finds nothing.
        assert!(!pending.settle(&id, Ok(serde_json::json!(9))).await);
    }

    #[tokio::test]
    async fn test_out_of_order_settlement() {
        let pending = PendingCalls::new();
        let (id_first, rx_first) = pending.register().await;
        let (id_second, rx_second) = pending.register().await;

        assert!(pending.settle(&id_second, Ok(serde_json::json!("b"))).await);
        assert!(pending.settle(&id_first, Ok(serde_json::json!("a"))).await);

        assert_eq!(rx_first.await.unwrap().unwrap(), serde_json::json!("a"));
        assert_eq!(rx_second.await.unwrap().unwrap(), serde_json::json!("b"));
    }

    #[tokio::test]
    async fn test_remove_then_late_settle_is_discarded() {
        let pending = PendingCalls::new();
        let (id, _rx) = pending.register().await;

        pending.remove(&id).await;
        assert!(!pending.contains(&id).await);
        assert!(!pending.settle(&id, Ok(serde_json::json!(1))).await);
    }

    #[tokio::test]
    async fn test_register_after_fail_all_settles_immediately() {
        let pending = PendingCalls::new();
        pending.fail_all().await;

        let (id, rx) = pending.register().await;
        assert!(!pending.contains(&id).await);
        assert!(matches!(
            rx.await.unwrap(),
            Err(SessionError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_fail_all_settles_everything() {
        let pending = PendingCalls::new();
        let (_, rx_a) = pending.register().await;
        let (_, rx_b) = pending.register().await;

        pending.fail_all().await;

        assert!(matches!(
            rx_a.await.unwrap(),
            Err(SessionError::ConnectionClosed)
        ));
        assert!(matches!(
            rx_b.await.unwrap(),
            Err(SessionError::ConnectionClosed)
        ));
    }
}
