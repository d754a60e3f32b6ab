//! Dequeues incoming messages and dispatches them to a handler, grounded in
//! `svm_processor.c`'s `processor_thread_func`. The original dispatches
//! through a 256-entry function-pointer table keyed by the raw type byte;
//! here the already-decoded `Body` enum lets the dispatch be an exhaustive
//! `match`, which the type system checks covers every variant.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::protocol::{Body, Direction, Message};
use crate::queue::Queue;

use super::handlers;
use super::instance::Instance;
use super::sender::RsmRequest;

pub async fn run(
    instance: Arc<Instance>,
    incoming: Arc<Queue<Message>>,
    outgoing: Arc<Queue<RsmRequest>>,
    timer_stop: oneshot::Sender<()>,
) {
    loop {
        let message = match incoming.dequeue().await {
            Ok(m) => m,
            Err(_) => {
                tracing::debug!(instance = instance.id, "processor: incoming queue closed");
                break;
            }
        };

        let response_bodies = match message.body {
            Body::InitChannel { lauvm, lak } => {
                handlers::handle_init_channel(&instance, lauvm, lak).await
            }
            Body::ProvestiControl { tk } => handlers::handle_provesti_kontrol(&instance, tk).await,
            Body::VydatControlResults { vrk } => {
                handlers::handle_vydat_control_results(&instance, vrk).await
            }
            Body::VydatLineState => handlers::handle_vydat_line_state(&instance).await,
            Body::ParameterAccept { kind, .. } => {
                handlers::handle_send_only(&instance, kind.type_code())
            }
            Body::NavigationData { .. } => {
                handlers::handle_send_only(&instance, crate::protocol::type_code::NAVIGATION_DATA)
            }
            other => handlers::handle_unexpected(&instance, other.type_code()),
        };

        if instance.simulate_response_timeout && !response_bodies.is_empty() {
            tracing::warn!(
                instance = instance.id,
                "simulate_response_timeout: dropping {} response(s)",
                response_bodies.len()
            );
            // §9: a dropped response still counts toward messages_sent_count,
            // since it never reaches the shared sender to be counted there.
            let mut threshold_reached = false;
            for _ in &response_bodies {
                if instance.record_message_sent() {
                    threshold_reached = true;
                }
            }
            if threshold_reached {
                tracing::info!(instance = instance.id, "disconnect_after_messages reached, closing connection");
                instance.force_disconnect().await;
            }
            continue;
        }

        // Read after dispatch: InitChannel's handler may just have changed
        // assigned_lak, and the response frame must carry the new value.
        let lak = *instance.assigned_lak.lock().await;
        for body in response_bodies {
            let response = Message::new(lak, Direction::RsmToCcu, instance.next_message_number(), body);
            let request = RsmRequest::Send { target_id: instance.id, message: response };
            if outgoing.enqueue(request).await.is_err() {
                tracing::debug!(instance = instance.id, "processor: outgoing queue closed");
                let _ = timer_stop.send(());
                return;
            }
        }
    }
    let _ = timer_stop.send(());
}
