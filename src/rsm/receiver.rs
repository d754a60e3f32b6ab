//! Reads frames off the wire and enqueues them, grounded in
//! `svm_receiver.c`'s `receiver_thread_func`: read header, read body,
//! decode, enqueue; a clean peer close, decode error, or a forced
//! disconnect from the shared sender all end the loop and tear the
//! connection's other tasks down via `incoming`'s shutdown.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::protocol::{Direction, Header, Message, HEADER_LEN};
use crate::queue::Queue;
use crate::transport::RecvTransport;

pub async fn run(
    instance_id: usize,
    mut transport: impl RecvTransport,
    incoming: Arc<Queue<Message>>,
    mut disconnect: oneshot::Receiver<()>,
) {
    loop {
        let mut header_bytes = [0u8; HEADER_LEN];
        let header_result = tokio::select! {
            result = transport.recv_exact(&mut header_bytes) => result,
            _ = &mut disconnect => {
                tracing::info!(instance = instance_id, "receiver: forced disconnect");
                break;
            }
        };
        if let Err(e) = header_result {
            tracing::info!(instance = instance_id, error = %e, "receiver: connection ended");
            break;
        }

        let header = match Header::parse(&header_bytes) {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(instance = instance_id, error = %e, "receiver: malformed header");
                break;
            }
        };
        if header.check_direction(Direction::CcuToRsm).is_err() {
            tracing::warn!(instance = instance_id, "receiver: wrong direction bit, dropping connection");
            break;
        }

        let mut body_bytes = vec![0u8; header.body_length as usize];
        let body_result = tokio::select! {
            result = transport.recv_exact(&mut body_bytes) => result,
            _ = &mut disconnect => {
                tracing::info!(instance = instance_id, "receiver: forced disconnect mid-frame");
                break;
            }
        };
        if let Err(e) = body_result {
            tracing::info!(instance = instance_id, error = %e, "receiver: connection ended mid-frame");
            break;
        }

        let message = match Message::decode_from_parts(&header, &body_bytes) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(instance = instance_id, error = %e, "receiver: failed to decode body");
                break;
            }
        };

        if incoming.enqueue(message).await.is_err() {
            tracing::debug!(instance = instance_id, "receiver: incoming queue closed");
            break;
        }
    }

    let _ = transport;
    incoming.shutdown();
}
