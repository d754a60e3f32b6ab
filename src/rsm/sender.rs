//! Single process-wide sender task, grounded in `svm_sender.c`'s
//! `sender_thread_func` and mirroring `ccu::sender::run`: the original's
//! `svm_outgoing_queue` and `sender_thread_func` are both process-global,
//! spawned once at startup and shared by every SVM instance, not recreated
//! per connection. One task drains the shared outgoing queue and dispatches
//! each message to whichever instance it targets, writing through that
//! instance's currently installed send half.
//!
//! A send failure, or `disconnect_after_messages` (§6) being reached, tears
//! the connection down exactly as the original does: stop the timer (via
//! the per-connection disconnect signal) and abandon the receiver's blocked
//! read, so the listener loops to accept the next connection.

use std::sync::Arc;

use crate::protocol::Message;
use crate::queue::Queue;
use crate::transport::SendTransport;

use super::instance::Instance;

/// A unit of work for the shared sender task.
pub enum RsmRequest {
    Send { target_id: usize, message: Message },
    Shutdown,
}

pub async fn run(outgoing: Arc<Queue<RsmRequest>>, instances: Arc<Vec<Arc<Instance>>>) {
    loop {
        let request = match outgoing.dequeue().await {
            Ok(r) => r,
            Err(_) => break,
        };

        let (target_id, message) = match request {
            RsmRequest::Shutdown => break,
            RsmRequest::Send { target_id, message } => (target_id, message),
        };

        let Some(instance) = instances.iter().find(|i| i.id == target_id) else {
            tracing::warn!(target_id, "sender: unknown instance target");
            continue;
        };

        let bytes = match message.encode() {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(instance = target_id, error = %e, "sender: failed to encode message, dropping");
                continue;
            }
        };

        let mut guard = instance.send_half.lock().await;
        let Some(half) = guard.as_mut() else {
            tracing::warn!(instance = target_id, "sender: no connection installed, dropping message");
            continue;
        };
        if let Err(e) = half.send_all(&bytes).await {
            tracing::warn!(instance = target_id, error = %e, "sender: send failed, tearing down connection");
            half.shutdown().await;
            drop(guard);
            instance.signal_disconnect().await;
            continue;
        }
        drop(guard);

        if instance.record_message_sent() {
            tracing::info!(instance = target_id, "disconnect_after_messages reached, closing connection");
            instance.force_disconnect().await;
        }
    }
}
