//! Per-link receive loop, grounded in `uvm_receiver.c`'s
//! `uvm_receiver_thread_func`: each link has its own receiver reading off
//! its own connection, tagging every decoded frame with the link it came
//! from before pushing it onto one shared response queue that the
//! sequencer and status stream both drain. A clean peer close is reported
//! as `Inactive`; any other read/decode error is reported as `Failed`,
//! matching the original's distinct GUI-event text for each case.

use std::sync::Arc;

use crate::error::TransportError;
use crate::protocol::{Direction, Header, Message, HEADER_LEN};
use crate::queue::Queue;
use crate::transport::RecvTransport;

use super::link::{Link, LinkStatus};

/// A frame received on some link, tagged with which one.
pub struct TaggedMessage {
    pub source_id: usize,
    pub message: Message,
}

pub async fn run(link: Arc<Link>, mut transport: impl RecvTransport, responses: Arc<Queue<TaggedMessage>>) {
    loop {
        let mut header_bytes = [0u8; HEADER_LEN];
        let result = transport.recv_exact(&mut header_bytes).await;
        if let Err(e) = result {
            report_end(&link, &e).await;
            break;
        }

        let header = match Header::parse(&header_bytes) {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(link = link.id, error = %e, "receiver: malformed header");
                link.set_status(LinkStatus::Failed).await;
                break;
            }
        };
        if header.check_direction(Direction::RsmToCcu).is_err() {
            tracing::warn!(link = link.id, "receiver: wrong direction bit, dropping connection");
            link.set_status(LinkStatus::Failed).await;
            break;
        }

        let mut body_bytes = vec![0u8; header.body_length as usize];
        if let Err(e) = transport.recv_exact(&mut body_bytes).await {
            report_end(&link, &e).await;
            break;
        }

        let message = match Message::decode_from_parts(&header, &body_bytes) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(link = link.id, error = %e, "receiver: failed to decode body");
                link.set_status(LinkStatus::Failed).await;
                break;
            }
        };

        link.touch().await;
        if responses
            .enqueue(TaggedMessage {
                source_id: link.id,
                message,
            })
            .await
            .is_err()
        {
            tracing::debug!(link = link.id, "receiver: response queue closed");
            break;
        }
    }
}

async fn report_end(link: &Arc<Link>, error: &TransportError) {
    if matches!(error, TransportError::PeerClosed) {
        tracing::info!(link = link.id, "receiver: peer closed connection");
        link.set_status(LinkStatus::Inactive).await;
    } else {
        tracing::warn!(link = link.id, error = %error, "receiver: connection error");
        link.set_status(LinkStatus::Failed).await;
    }
}
