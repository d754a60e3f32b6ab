//! One function per incoming message type, grounded directly in
//! `svm_handlers.c`'s `handle_*` functions and its `message_handlers`
//! dispatch table (reproduced here as the `match` in `processor.rs`).
//! Each handler returns the zero, one, or two outbound bodies it produces;
//! `Vec` rather than `Option` because `send_warning_on_confirm` (§6) makes
//! `handle_init_channel` able to emit a bonus `Warning` right after
//! `ConfirmInit`.

use std::time::Duration;

use crate::defaults::{RSK_FAILURE, RSK_OK, SELFTEST_SLEEP_MS};
use crate::protocol::{type_code, Body};

use super::instance::{Instance, InstanceState};

/// §4.6's "State precondition: Initialized" column, checked by every
/// handler below InitChannel. A message arriving outside its precondition
/// is logged only — no state change, no response — mirroring
/// `handle_unexpected`.
async fn require_initialized(instance: &Instance, type_code: u8) -> bool {
    if *instance.state.lock().await == InstanceState::Initialized {
        return true;
    }
    tracing::warn!(
        instance = instance.id,
        type_code,
        "received outside Initialized precondition, logging only"
    );
    false
}

pub async fn handle_init_channel(instance: &Instance, lauvm: u8, lak: u8) -> Vec<Body> {
    let _ = lauvm;
    *instance.assigned_lak.lock().await = lak;
    *instance.state.lock().await = InstanceState::Initialized;
    let bcb = instance.counters.lock().await.bcb_counter;

    tracing::info!(instance = instance.id, lak, "channel initialized");

    let mut out = vec![Body::ConfirmInit {
        lak,
        slp: 0x03,
        vdr: 0x10,
        vor1: 0x11,
        vor2: 0x12,
        bcb,
    }];
    if instance.send_warning_on_confirm {
        out.push(Body::Warning {
            lak,
            tks: instance.warning_tks,
            pks: [0; 6],
            bcb,
        });
    }
    out
}

pub async fn handle_provesti_kontrol(instance: &Instance, tk: u8) -> Vec<Body> {
    if !require_initialized(instance, type_code::PROVESTI_CONTROL).await {
        return Vec::new();
    }
    *instance.state.lock().await = InstanceState::SelfTest;
    tracing::info!(instance = instance.id, "self-test started");

    let start = tokio::time::Instant::now();
    tokio::time::sleep(Duration::from_millis(SELFTEST_SLEEP_MS)).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    *instance.last_self_test_duration_ms.lock().await = elapsed_ms;

    *instance.state.lock().await = InstanceState::Initialized;
    tracing::info!(instance = instance.id, elapsed_ms, "self-test finished");

    let lak = *instance.assigned_lak.lock().await;
    let bcb = instance.counters.lock().await.bcb_counter;
    vec![Body::ControlConfirm { lak, tk, bcb }]
}

pub async fn handle_vydat_control_results(instance: &Instance, vrk: u8) -> Vec<Body> {
    let _ = vrk;
    if !require_initialized(instance, type_code::VYDAT_CONTROL_RESULTS).await {
        return Vec::new();
    }
    let lak = *instance.assigned_lak.lock().await;
    let bcb = instance.counters.lock().await.bcb_counter;
    let rsk = if instance.simulate_control_failure {
        RSK_FAILURE
    } else {
        RSK_OK
    };
    let vsk = (*instance.last_self_test_duration_ms.lock().await).min(u16::MAX as u64) as u16;

    if instance.simulate_control_failure {
        tracing::warn!(instance = instance.id, rsk, "reporting simulated control failure");
    }

    vec![Body::ControlResults { lak, rsk, vsk, bcb }]
}

pub async fn handle_vydat_line_state(instance: &Instance) -> Vec<Body> {
    if !require_initialized(instance, type_code::VYDAT_LINE_STATE).await {
        return Vec::new();
    }
    let lak = *instance.assigned_lak.lock().await;
    let counters = *instance.counters.lock().await;
    vec![Body::LineState {
        lak,
        kla: counters.link_up_changes,
        sla: counters.link_up_low_time_us100,
        ksa: counters.sign_det_changes,
        bcb: counters.bcb_counter,
    }]
}

/// Parameter-accept and navigation-data messages carry no response, per
/// §4.6 and the stub handlers in `svm_handlers.c`.
pub fn handle_send_only(instance: &Instance, type_code: u8) -> Vec<Body> {
    tracing::debug!(instance = instance.id, type_code, "accepted, no response");
    Vec::new()
}

/// Messages the RSM never expects to receive (its own outbound types
/// looped back, or an unknown code): logged, no response.
pub fn handle_unexpected(instance: &Instance, type_code: u8) -> Vec<Body> {
    tracing::warn!(instance = instance.id, type_code, "unexpected message type received");
    Vec::new()
}
