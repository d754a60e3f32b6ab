//! Shared sender task, grounded in `uvm_sender.c`'s `uvm_sender_thread_func`:
//! one task drains the outgoing request queue and dispatches to whichever
//! link the request targets, instead of a sender-per-link, which matches
//! the original's single-thread-many-links design and keeps send ordering
//! serialized across the whole CCU.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::Notify;

use crate::protocol::Message;
use crate::queue::Queue;
use crate::transport::SendTransport;

use super::link::{Link, LinkStatus};

/// A unit of work for the shared sender task.
pub enum CcuRequest {
    Send { target_id: usize, message: Message },
    Shutdown,
}

/// Tracks in-flight sends so the sequencer can wait for a batch to drain,
/// grounded in `uvm_outstanding_sends` / `uvm_all_sent_cond`.
pub struct SendTracker {
    outstanding: std::sync::atomic::AtomicU32,
    all_sent: Notify,
}

impl SendTracker {
    pub fn new() -> Arc<SendTracker> {
        Arc::new(SendTracker {
            outstanding: std::sync::atomic::AtomicU32::new(0),
            all_sent: Notify::new(),
        })
    }

    pub fn mark_outstanding(&self) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
    }

    fn mark_sent(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.all_sent.notify_waiters();
        }
    }

    /// Waits until the outstanding count reaches zero or `timeout` elapses,
    /// resetting the counter to zero on timeout (mirroring
    /// `wait_for_outstanding_sends`'s one-second timed-wait loop that gives
    /// up and resets after logging a warning).
    pub async fn wait_for_drain(&self, timeout: std::time::Duration) {
        if self.outstanding.load(Ordering::SeqCst) == 0 {
            return;
        }
        let notified = self.all_sent.notified();
        tokio::select! {
            _ = notified => {}
            _ = tokio::time::sleep(timeout) => {
                tracing::warn!("timed out waiting for outstanding sends to drain, resetting counter");
                self.outstanding.store(0, Ordering::SeqCst);
            }
        }
    }
}

pub async fn run(requests: Arc<Queue<CcuRequest>>, links: Arc<Vec<Arc<Link>>>, tracker: Arc<SendTracker>) {
    loop {
        let request = match requests.dequeue().await {
            Ok(r) => r,
            Err(_) => break,
        };

        let (target_id, message) = match request {
            CcuRequest::Shutdown => break,
            CcuRequest::Send { target_id, message } => (target_id, message),
        };

        let Some(link) = links.iter().find(|l| l.id == target_id) else {
            tracing::warn!(target_id, "sender: unknown link target");
            tracker.mark_sent();
            continue;
        };

        let is_active = matches!(link.status().await, LinkStatus::Active | LinkStatus::Warning);
        if !is_active {
            tracing::warn!(target_id, "sender: link not active, dropping message");
            tracker.mark_sent();
            continue;
        }

        let bytes = match message.encode() {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(target_id, error = %e, "sender: failed to encode message");
                tracker.mark_sent();
                continue;
            }
        };

        let mut guard = link.send_half.lock().await;
        let Some(half) = guard.as_mut() else {
            tracing::warn!(target_id, "sender: no send half installed for link");
            drop(guard);
            tracker.mark_sent();
            continue;
        };
        if let Err(e) = half.send_all(&bytes).await {
            tracing::warn!(target_id, error = %e, "sender: send failed, marking link failed");
            half.shutdown().await;
            drop(guard);
            link.set_status(LinkStatus::Failed).await;
        }

        tracker.mark_sent();
    }
}
