//! The RSM (simulated radar unit) core: one listener task per configured
//! instance, each running the receiver/processor/timer pipeline from
//! `svm_main.c` for whichever connection it currently holds, plus the
//! single process-wide sender task (`svm_main.c`'s one global
//! `svm_outgoing_queue` + `sender_thread_func`) shared by every instance.

pub mod handlers;
pub mod instance;
pub mod listener;
pub mod processor;
pub mod receiver;
pub mod sender;
pub mod timer;

use std::sync::Arc;

use tokio::sync::watch;

use crate::config::RsmConfig;
use crate::defaults::INSTANCE_QUEUE_CAPACITY;
use crate::queue::Queue;

use sender::RsmRequest;

/// Spawns the shared sender and one listener per configured instance, waits
/// for `shutdown` to fire, then waits for every listener and the sender to
/// return.
pub async fn run(config: RsmConfig, mut shutdown: watch::Receiver<bool>) {
    let instances: Arc<Vec<Arc<Instance>>> = Arc::new(
        config.instances.into_iter().map(instance::Instance::new).collect(),
    );

    let outgoing: Arc<Queue<RsmRequest>> = Queue::new(INSTANCE_QUEUE_CAPACITY);
    let sender_handle = tokio::spawn(sender::run(outgoing.clone(), instances.clone()));

    let mut handles = Vec::new();
    for instance in instances.iter() {
        let shutdown_rx = shutdown.clone();
        handles.push(tokio::spawn(listener::run(instance.clone(), outgoing.clone(), shutdown_rx)));
    }

    shutdown.changed().await.ok();
    for handle in handles {
        let _ = handle.await;
    }

    let _ = outgoing.enqueue(RsmRequest::Shutdown).await;
    outgoing.shutdown();
    let _ = sender_handle.await;
}

pub use instance::{Counters, Instance, InstanceState};
