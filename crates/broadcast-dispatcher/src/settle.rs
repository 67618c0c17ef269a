//! Single-settlement adapter for callback-style signers.
//!
//! Wraps a oneshot channel so the first of (callback, timeout) wins. A
//! callback arriving after the waiter gave up finds the receiver gone and
//! has no effect.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Settle-once handle given to the callback side.
pub struct SingleSettlement<T> {
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

/// How a settlement wait ended.
#[derive(Debug, PartialEq, Eq)]
pub enum SettlementOutcome<T> {
    Settled(T),
    TimedOut,
    /// Callback side was dropped without settling.
    Abandoned,
}

/// Create a settlement handle and the receiver that waits on it.
pub fn single_settlement<T>() -> (Arc<SingleSettlement<T>>, oneshot::Receiver<T>) {
    let (tx, rx) = oneshot::channel();
    (
        Arc::new(SingleSettlement {
            sender: Mutex::new(Some(tx)),
        }),
        rx,
    )
}

impl<T> SingleSettlement<T> {
    /// Deliver `value`. Returns false if already settled or nobody is
    /// waiting anymore.
    pub fn settle(&self, value: T) -> bool {
        match self.sender.lock().take() {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.sender.lock().is_none()
    }
}

/// Wait up to `timeout` for a settled value.
pub async fn await_settlement<T>(rx: oneshot::Receiver<T>, timeout: Duration) -> SettlementOutcome<T> {
    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(value)) => SettlementOutcome::Settled(value),
        Ok(Err(_)) => SettlementOutcome::Abandoned,
        Err(_) => SettlementOutcome::TimedOut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_settle_wins() {
        let (settlement, rx) = single_settlement();
        assert!(settlement.settle(1));
        assert!(!settlement.settle(2));
        assert_eq!(
            await_settlement(rx, Duration::from_secs(1)).await,
            SettlementOutcome::Settled(1)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_after_timeout_has_no_effect() {
        let (settlement, rx) = single_settlement::<u32>();
        let outcome = await_settlement(rx, Duration::from_secs(60)).await;
        assert_eq!(outcome, SettlementOutcome::TimedOut);
        assert!(!settlement.settle(7));
        assert!(settlement.is_settled());
    }

    #[tokio::test]
    async fn test_dropped_callback_side_abandons() {
        let (settlement, rx) = single_settlement::<u32>();
        drop(settlement);
        assert_eq!(
            await_settlement(rx, Duration::from_secs(1)).await,
            SettlementOutcome::Abandoned
        );
    }

    #[tokio::test]
    async fn test_settle_from_other_task() {
        let (settlement, rx) = single_settlement();
        tokio::spawn(async move {
            settlement.settle("done");
        });
        assert_eq!(
            await_settlement(rx, Duration::from_secs(5)).await,
            SettlementOutcome::Settled("done")
        );
    }
}
