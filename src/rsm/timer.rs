//! Per-connection BCB / line-state counter timer, grounded exactly in
//! `svm_timers.c`'s `timer_thread_func`: a 50ms tick increments the BCB
//! counter every time, and every 2000ms (40 ticks) rolls dice to bump the
//! link-up-changes / link-up-low-time / sign-det-changes counters.

use std::sync::Arc;

use rand::Rng;
use tokio::time::{interval, Duration};

use crate::defaults::{
    BCB_PERIOD_MS, LINK_CHANGE_PROBABILITY, LINK_LOW_PROBABILITY, LINK_LOW_TIME_INCREMENT_US100,
    LINK_PERIOD_TICKS, SIGN_DET_CHANGE_PROBABILITY,
};

use super::instance::Instance;

/// Runs until `shutdown` fires. One task per accepted connection, stopped
/// when the connection ends (mirrors `stop_timer_thread` being called from
/// `svm_main.c`'s connection-cleanup path).
pub async fn run(instance: Arc<Instance>, mut shutdown: tokio::sync::oneshot::Receiver<()>) {
    let mut ticker = interval(Duration::from_millis(BCB_PERIOD_MS));
    let mut ticks_since_link_update = 0u64;
    let mut rng = rand::thread_rng();

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::debug!(instance = instance.id, "timer task stopped");
                return;
            }
            _ = ticker.tick() => {
                let mut counters = instance.counters.lock().await;
                counters.bcb_counter = counters.bcb_counter.wrapping_add(1);
                ticks_since_link_update += 1;

                if ticks_since_link_update >= LINK_PERIOD_TICKS {
                    ticks_since_link_update = 0;
                    if rng.gen_range(0..LINK_CHANGE_PROBABILITY) == 0 {
                        counters.link_up_changes = counters.link_up_changes.saturating_add(1);
                        if rng.gen_range(0..LINK_LOW_PROBABILITY) == 0 {
                            counters.link_up_low_time_us100 = counters
                                .link_up_low_time_us100
                                .saturating_add(LINK_LOW_TIME_INCREMENT_US100);
                        }
                    }
                    if rng.gen_range(0..SIGN_DET_CHANGE_PROBABILITY) == 0 {
                        counters.sign_det_changes = counters.sign_det_changes.saturating_add(1);
                    }
                }
            }
        }
    }
}
