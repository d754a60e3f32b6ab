//! Per-instance RSM state: the fields `svm_main.c` resets on every accept
//! (counters, message sequence, fault-injection bookkeeping) plus the
//! shared counters `svm_timers.c` updates from its own task, all behind
//! one `tokio::sync::Mutex` since updates are infrequent (one per 50ms
//! tick) compared to the cost of a lock-free scheme.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};

use crate::config::RsmInstanceSettings;
use crate::defaults::MESSAGE_NUMBER_WRAP;
use crate::transport::{SendTransport, TcpSendHalf};

/// Mirrors `SVMState` in `svm_handlers.c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    NotInitialized,
    Initialized,
    SelfTest,
}

/// The BCB / line-state counters `svm_timers.c` maintains globally; here
/// scoped per instance so multiple RSM instances never share a clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    pub bcb_counter: u32,
    pub link_up_changes: u16,
    pub link_up_low_time_us100: u32,
    pub sign_det_changes: u16,
}

pub struct Instance {
    pub id: usize,
    pub port: u16,
    pub default_lak: u8,
    pub simulate_control_failure: bool,
    pub disconnect_after_messages: i32,
    pub simulate_response_timeout: bool,
    pub send_warning_on_confirm: bool,
    pub warning_tks: u8,

    pub assigned_lak: Mutex<u8>,
    pub state: Mutex<InstanceState>,
    pub counters: Mutex<Counters>,
    pub messages_sent_count: AtomicU32,
    outbound_sequence: AtomicU32,
    pub is_active: AtomicBool,

    /// The current connection's write half, installed by the listener on
    /// accept and cleared on disconnect; the single shared sender task
    /// looks instances up by id and sends through whichever half is
    /// currently installed here, mirroring `ccu::link::Link::send_half`.
    pub send_half: Mutex<Option<TcpSendHalf>>,
    /// Fires to unblock the receiver's current read, installed fresh on
    /// every accept. Used to force a connection closed from the shared
    /// sender (send failure or `disconnect_after_messages` reached).
    pub disconnect_signal: Mutex<Option<oneshot::Sender<()>>>,

    /// Elapsed time of the most recent self-test, in milliseconds, reported
    /// as VSK on the next `VydatControlResults`. `0` until a self-test runs.
    pub last_self_test_duration_ms: Mutex<u64>,
}

impl Instance {
    pub fn new(settings: RsmInstanceSettings) -> Arc<Instance> {
        Arc::new(Instance {
            id: settings.id,
            port: settings.port,
            default_lak: settings.lak,
            simulate_control_failure: settings.simulate_control_failure,
            disconnect_after_messages: settings.disconnect_after_messages,
            simulate_response_timeout: settings.simulate_response_timeout,
            send_warning_on_confirm: settings.send_warning_on_confirm,
            warning_tks: settings.warning_tks,
            assigned_lak: Mutex::new(settings.lak),
            state: Mutex::new(InstanceState::NotInitialized),
            counters: Mutex::new(Counters::default()),
            messages_sent_count: AtomicU32::new(0),
            outbound_sequence: AtomicU32::new(0),
            is_active: AtomicBool::new(false),
            send_half: Mutex::new(None),
            disconnect_signal: Mutex::new(None),
            last_self_test_duration_ms: Mutex::new(0),
        })
    }

    /// Resets all per-connection state, mirroring `listener_thread_func`'s
    /// reset of counters on every accept.
    pub async fn reset_on_accept(&self) {
        *self.assigned_lak.lock().await = self.default_lak;
        *self.state.lock().await = InstanceState::NotInitialized;
        *self.counters.lock().await = Counters::default();
        self.messages_sent_count.store(0, Ordering::SeqCst);
        self.outbound_sequence.store(0, Ordering::SeqCst);
        *self.last_self_test_duration_ms.lock().await = 0;
    }

    pub fn next_message_number(&self) -> u16 {
        let n = self.outbound_sequence.fetch_add(1, Ordering::SeqCst);
        (n % MESSAGE_NUMBER_WRAP as u32) as u16
    }

    /// Counts one more response as sent, whether it actually reached the
    /// wire or was silently dropped by `simulate_response_timeout` — §9
    /// resolves that a dropped response still counts toward
    /// `messages_sent_count`. Returns whether `disconnect_after_messages`
    /// has now been reached.
    pub fn record_message_sent(&self) -> bool {
        let sent = self.messages_sent_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.disconnect_after_messages >= 0 && sent as i64 >= self.disconnect_after_messages as i64
    }

    /// Fires the disconnect signal without touching the send half, for
    /// callers that already hold (and have already dealt with) the
    /// `send_half` lock themselves.
    pub async fn signal_disconnect(&self) {
        if let Some(tx) = self.disconnect_signal.lock().await.take() {
            let _ = tx.send(());
        }
    }

    /// Forces the current connection closed: fires the disconnect signal
    /// and shuts the write half down, so the receiver's blocked read is
    /// abandoned and the listener loops to accept the next connection.
    pub async fn force_disconnect(&self) {
        self.signal_disconnect().await;
        let mut half = self.send_half.lock().await;
        if let Some(h) = half.as_mut() {
            h.shutdown().await;
        }
    }
}
