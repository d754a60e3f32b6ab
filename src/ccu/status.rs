//! Line-delimited text status-publication stream (§6), grounded in
//! `uvm_gui.c`'s `send_to_gui_socket`: the original pushes event strings to
//! one connected GUI socket. Here any number of monitors can subscribe, so
//! the single-socket push becomes a `tokio::sync::broadcast` channel that
//! a listener task fans out to every connected client as the same
//! line-delimited text.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;

use super::link::{Link, LinkStatus};

#[derive(Debug, Clone)]
pub enum StatusEvent {
    Warning {
        link_id: usize,
        tks: u8,
    },
    LinkStatus {
        link_id: usize,
        status: LinkStatus,
        assigned_lak: u8,
    },
    Unsolicited {
        link_id: usize,
        type_code: u8,
    },
}

fn status_code(status: LinkStatus) -> u8 {
    match status {
        LinkStatus::Inactive => 0,
        LinkStatus::Connecting => 1,
        LinkStatus::Active => 2,
        LinkStatus::Warning => 3,
        LinkStatus::Failed => 4,
        LinkStatus::Disconnecting => 5,
    }
}

impl StatusEvent {
    fn to_line(&self) -> String {
        match self {
            StatusEvent::Warning { link_id, tks } => {
                format!("EVENT;SVM_ID:{link_id};Type:Warning;Details:TKS={tks}\n")
            }
            StatusEvent::LinkStatus {
                link_id,
                status,
                assigned_lak,
            } => format!(
                "EVENT;SVM_ID:{link_id};Type:LinkStatus;Details:NewStatus={},AssignedLAK=0x{assigned_lak:02x}\n",
                status_code(*status)
            ),
            StatusEvent::Unsolicited { link_id, type_code } => {
                format!("EVENT;SVM_ID:{link_id};Type:Unsolicited;Details:TypeCode={type_code}\n")
            }
        }
    }
}

/// Cloneable handle used by the sequencer to publish events; a no-op when
/// nobody is subscribed (`broadcast::Sender::send` only fails then).
#[derive(Clone)]
pub struct EventSender {
    tx: broadcast::Sender<StatusEvent>,
}

impl EventSender {
    pub fn publish(&self, event: StatusEvent) {
        let _ = self.tx.send(event);
    }
}

/// One line per link, joined with `|`, per §6:
/// `ID:<n>;Status:<0..5>;LAK:<dec>;SentType:<dec>;SentNum:<dec>;RecvType:<dec>;RecvNum:<dec>`.
async fn snapshot_line(links: &[Arc<Link>]) -> String {
    let mut parts = Vec::with_capacity(links.len());
    for link in links {
        let snapshot = link.status_snapshot().await;
        parts.push(format!(
            "ID:{};Status:{};LAK:{};SentType:{};SentNum:{};RecvType:{};RecvNum:{}",
            link.id,
            status_code(snapshot.status),
            link.assigned_lak,
            snapshot.last_sent_type,
            snapshot.last_sent_number,
            snapshot.last_recv_type,
            snapshot.last_recv_number,
        ));
    }
    parts.join("|")
}

/// Binds the status-publication port and serves a text stream: a snapshot
/// line on connect, then one line per subsequent event, to every connected
/// client concurrently.
pub async fn run(port: u16, links: Arc<Vec<Arc<Link>>>, mut shutdown: tokio::sync::watch::Receiver<bool>) -> EventSender {
    let (tx, _rx) = broadcast::channel(256);
    let sender = EventSender { tx: tx.clone() };

    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", port)).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(port, error = %e, "status publisher: failed to bind");
            return sender;
        }
    };
    tracing::info!(port, "status publisher listening");

    tokio::spawn(async move {
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let Ok((stream, peer)) = accepted else { continue };
                    let rx = tx.subscribe();
                    let links = links.clone();
                    tokio::spawn(serve_client(stream, peer, rx, links));
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("status publisher shutting down");
                        return;
                    }
                }
            }
        }
    });

    sender
}

async fn serve_client(
    mut stream: tokio::net::TcpStream,
    peer: std::net::SocketAddr,
    mut rx: broadcast::Receiver<StatusEvent>,
    links: Arc<Vec<Arc<Link>>>,
) {
    let snapshot = snapshot_line(&links).await;
    if stream.write_all(format!("{snapshot}\n").as_bytes()).await.is_err() {
        return;
    }

    loop {
        match rx.recv().await {
            Ok(event) => {
                if stream.write_all(event.to_line().as_bytes()).await.is_err() {
                    tracing::debug!(%peer, "status publisher: client disconnected");
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(%peer, skipped, "status publisher: client fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
