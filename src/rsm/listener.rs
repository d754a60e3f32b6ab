//! Per-instance accept loop, grounded in `svm_main.c`'s
//! `listener_thread_func`: bind, then forever accept a connection, reset
//! counters, run it to completion (receiver + processor + timer, joined in
//! that order), and loop back to accept the next one. The sender is not
//! part of this per-connection set: it is the single process-wide task
//! spawned once in `rsm::run`, matching `svm_main.c`'s one global
//! `svm_outgoing_queue` and `sender_thread_func` serving every instance.
//! Because this loop never calls `accept` again until the previous
//! connection's tasks have all finished, it is serial by construction — the
//! original's defensive `is_active` recheck after `accept` has no window to
//! fire here and is not reproduced (see DESIGN.md).

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::watch;

use crate::defaults::INSTANCE_QUEUE_CAPACITY;
use crate::protocol::Message;
use crate::queue::Queue;
use crate::transport::tcp_listen;

use super::instance::Instance;
use super::sender::RsmRequest;
use super::{processor, receiver, timer};

pub async fn run(instance: Arc<Instance>, outgoing: Arc<Queue<RsmRequest>>, mut shutdown: watch::Receiver<bool>) {
    let listener = match tcp_listen(instance.port).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(instance = instance.id, port = instance.port, error = %e, "failed to bind listener");
            return;
        }
    };
    tracing::info!(instance = instance.id, port = instance.port, "listening");

    loop {
        let (transport, peer) = tokio::select! {
            accepted = crate::transport::tcp_accept(&listener) => {
                match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!(instance = instance.id, error = %e, "accept failed");
                        continue;
                    }
                }
            }
            _ = shutdown.changed() => {
                tracing::info!(instance = instance.id, "listener shutting down");
                return;
            }
        };
        tracing::info!(instance = instance.id, %peer, "connection accepted");

        instance.is_active.store(true, Ordering::SeqCst);
        instance.reset_on_accept().await;

        let (recv_half, send_half) = transport.split();
        *instance.send_half.lock().await = Some(send_half);
        let (disconnect_tx, disconnect_rx) = tokio::sync::oneshot::channel();
        *instance.disconnect_signal.lock().await = Some(disconnect_tx);

        let incoming: Arc<Queue<Message>> = Queue::new(INSTANCE_QUEUE_CAPACITY);
        let (timer_stop_tx, timer_stop_rx) = tokio::sync::oneshot::channel();

        let timer_handle = tokio::spawn(timer::run(instance.clone(), timer_stop_rx));
        let receiver_handle = tokio::spawn(receiver::run(instance.id, recv_half, incoming.clone(), disconnect_rx));
        let processor_handle = tokio::spawn(processor::run(
            instance.clone(),
            incoming,
            outgoing.clone(),
            timer_stop_tx,
        ));

        let _ = receiver_handle.await;
        let _ = processor_handle.await;
        let _ = timer_handle.await;

        instance.is_active.store(false, Ordering::SeqCst);
        *instance.send_half.lock().await = None;
        *instance.disconnect_signal.lock().await = None;
        tracing::info!(instance = instance.id, %peer, "connection closed");
    }
}
