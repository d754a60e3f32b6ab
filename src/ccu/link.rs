//! Per-target link state, grounded in `uvm_types.h`'s `UvmSvmLink` /
//! `UvmLinkStatus`. The original keeps a fixed `svm_links[MAX_SVM_INSTANCES]`
//! array guarded by one mutex; here each link owns its own `Mutex`-guarded
//! state and the CCU core holds a `Vec<Arc<Link>>`, which gives the same
//! "read/write under a lock, one lock per link" shape without forcing every
//! link through a single shared mutex.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::defaults::MESSAGE_NUMBER_WRAP;
use crate::transport::TcpSendHalf;

/// Mirrors `UvmLinkStatus`, plus a `Warning` state (§4.11) the original only
/// expresses as a TODO comment ("react by transitioning to FAILED") — here
/// it is a first-class status so the CCU can both log and later recover
/// from, instead of just logging, per §4.12's extended state set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Inactive,
    Connecting,
    Active,
    Warning,
    Failed,
    Disconnecting,
}

/// Last-seen bookkeeping per §3's "CCU link state" data model: the type
/// and number of the last message sent and received, the last BCB seen,
/// the last RSK (`ControlResults`) and the last TKS (`Warning`).
pub struct LinkState {
    pub status: LinkStatus,
    pub last_activity: Instant,
    pub last_warning_tks: Option<u8>,
    pub last_sent_type: u8,
    pub last_sent_number: u16,
    pub last_recv_type: u8,
    pub last_recv_number: u16,
    pub last_bcb: u32,
    pub last_rsk: Option<u8>,
}

pub struct Link {
    pub id: usize,
    pub port: u16,
    pub assigned_lak: u8,
    pub state: Mutex<LinkState>,
    pub send_half: Mutex<Option<TcpSendHalf>>,
    outbound_sequence: AtomicU32,
}

impl Link {
    pub fn new(id: usize, port: u16, assigned_lak: u8) -> Arc<Link> {
        Arc::new(Link {
            id,
            port,
            assigned_lak,
            state: Mutex::new(LinkState {
                status: LinkStatus::Inactive,
                last_activity: Instant::now(),
                last_warning_tks: None,
                last_sent_type: 0,
                last_sent_number: 0,
                last_recv_type: 0,
                last_recv_number: 0,
                last_bcb: 0,
                last_rsk: None,
            }),
            send_half: Mutex::new(None),
            outbound_sequence: AtomicU32::new(0),
        })
    }

    pub fn next_message_number(&self) -> u16 {
        let n = self.outbound_sequence.fetch_add(1, Ordering::SeqCst);
        (n % MESSAGE_NUMBER_WRAP as u32) as u16
    }

    pub async fn status(&self) -> LinkStatus {
        self.state.lock().await.status
    }

    pub async fn set_status(&self, status: LinkStatus) {
        self.state.lock().await.status = status;
    }

    pub async fn touch(&self) {
        self.state.lock().await.last_activity = Instant::now();
    }

    /// Records a just-sent message's type and number, per §3's "last sent"
    /// bookkeeping.
    pub async fn record_sent(&self, type_code: u8, number: u16) {
        let mut state = self.state.lock().await;
        state.last_sent_type = type_code;
        state.last_sent_number = number;
    }

    /// Records a normal (non-Warning) response's type, number and BCB, per
    /// §4.11 step 5's "update bookkeeping fields" on every normal response.
    pub async fn record_received(&self, type_code: u8, number: u16, bcb: u32) {
        let mut state = self.state.lock().await;
        state.last_recv_type = type_code;
        state.last_recv_number = number;
        state.last_bcb = bcb;
    }

    pub async fn set_last_rsk(&self, rsk: u8) {
        self.state.lock().await.last_rsk = Some(rsk);
    }

    /// Snapshot of the fields the status stream (§6) reports per link.
    pub async fn status_snapshot(&self) -> LinkSnapshot {
        let state = self.state.lock().await;
        LinkSnapshot {
            status: state.status,
            last_sent_type: state.last_sent_type,
            last_sent_number: state.last_sent_number,
            last_recv_type: state.last_recv_type,
            last_recv_number: state.last_recv_number,
        }
    }
}

pub struct LinkSnapshot {
    pub status: LinkStatus,
    pub last_sent_type: u8,
    pub last_sent_number: u16,
    pub last_recv_type: u8,
    pub last_recv_number: u16,
}
