//! Quorum barrier for WAIT.
//!
//! A barrier is armed with the number of acknowledgements still needed.
//! Every inbound `REPLCONF ACK` decrements it; the waiting task wakes when
//! the count reaches zero. The timeout race lives at the call site.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

#[derive(Debug)]
pub struct AckBarrier {
    remaining: AtomicUsize,
    notify: Notify,
}

impl AckBarrier {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(count),
            notify: Notify::new(),
        }
    }

    /// Records one acknowledgement. Acks beyond the armed count are
    /// ignored.
    pub fn ack(&self) {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        if previous == Ok(1) {
            // notify_one stores a permit, so the single waiter cannot miss
            // a wakeup that lands between its count check and its await.
            self.notify.notify_one();
        }
    }

    /// Waits until the count reaches zero. Returns immediately if it
    /// already has.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();

            if self.remaining.load(Ordering::Acquire) == 0 {
                return;
            }

            notified.await;
        }
    }
}
