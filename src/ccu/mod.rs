//! The CCU (central control unit) client core: one link per configured
//! RSM target, a single shared sender, one receiver per link, the status
//! publication stream, and a single command sequencer driving every link
//! through startup and then steady state — the tokio-task shape of
//! `uvm_main.c`'s one UVM main thread + N receiver threads + one sender
//! thread.

pub mod link;
pub mod payloads;
pub mod receiver;
pub mod sender;
pub mod sequencer;
pub mod status;

use std::sync::Arc;

use tokio::sync::watch;

use crate::cli::RadarMode;
use crate::config::CcuConfig;
use crate::defaults::{CCU_REQUEST_QUEUE_CAPACITY, CCU_RESPONSE_QUEUE_CAPACITY_PER_TARGET};
use crate::queue::Queue;
use crate::transport::tcp_connect;

use link::{Link, LinkStatus};
use receiver::TaggedMessage;
use sender::{CcuRequest, SendTracker};
use sequencer::Sequencer;

/// Connects every configured target, runs each through the startup
/// sequence, then falls into steady state until `shutdown` fires. Returns
/// the number of links that reached Active, so the binary can exit
/// non-zero when none did (§7's ResourceError policy).
pub async fn run(config: CcuConfig, mode: RadarMode, shutdown: watch::Receiver<bool>) -> usize {
    let links: Arc<Vec<Arc<Link>>> = Arc::new(
        config
            .targets
            .iter()
            .map(|t| Link::new(t.id, t.port, t.assigned_lak))
            .collect(),
    );

    let requests: Arc<Queue<CcuRequest>> = Queue::new(CCU_REQUEST_QUEUE_CAPACITY);
    let responses: Arc<Queue<TaggedMessage>> = Queue::new(
        CCU_RESPONSE_QUEUE_CAPACITY_PER_TARGET * links.len().max(1),
    );
    let tracker = SendTracker::new();

    let events = status::run(config.status_publisher_port, links.clone(), shutdown.clone()).await;

    let sender_handle = tokio::spawn(sender::run(requests.clone(), links.clone(), tracker.clone()));

    let mut active_count = 0;
    let mut receiver_handles = Vec::new();

    for link in links.iter() {
        match tcp_connect(&config.target_ip, link.port).await {
            Ok(transport) => {
                let (recv_half, send_half) = transport.split();
                *link.send_half.lock().await = Some(send_half);
                link.set_status(LinkStatus::Connecting).await;
                receiver_handles.push(tokio::spawn(receiver::run(link.clone(), recv_half, responses.clone())));
            }
            Err(e) => {
                tracing::warn!(link = link.id, port = link.port, error = %e, "failed to connect");
                link.set_status(LinkStatus::Failed).await;
                continue;
            }
        }
    }

    let mut sequencer = Sequencer::new(links.clone(), requests.clone(), responses.clone(), tracker.clone(), events);
    for link in links.iter() {
        if link.status().await != LinkStatus::Connecting {
            continue;
        }
        match sequencer.run_startup(link, mode).await {
            Ok(()) => active_count += 1,
            Err(e) => tracing::warn!(link = link.id, error = %e, "startup sequence failed"),
        }
    }

    tracing::info!(active_count, total = links.len(), "startup complete, entering steady state");
    sequencer.run_steady_state(shutdown).await;

    let _ = requests.enqueue(CcuRequest::Shutdown).await;
    requests.shutdown();
    responses.shutdown();
    for link in links.iter() {
        let mut half = link.send_half.lock().await;
        if let Some(h) = half.as_mut() {
            use crate::transport::SendTransport;
            h.shutdown().await;
        }
    }
    let _ = sender_handle.await;
    for handle in receiver_handles {
        let _ = handle.await;
    }

    active_count
}
