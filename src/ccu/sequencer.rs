//! The single command sequencer, grounded in `uvm/uvm_main.c`'s main
//! thread: one task drives every link through initialization, self-test,
//! line-state query and session preparation in turn, then falls into a
//! steady-state dispatch loop that classifies whatever else arrives and
//! runs the keep-alive watchdog. The original uses exactly one UVM main
//! thread for this whole sequence (plus one receiver per link and one
//! shared sender), so a single sequencer task here is a direct match
//! rather than one task per link.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::cli::RadarMode;
use crate::defaults::{KEEPALIVE_TIMEOUT_SECS, RESPONSE_TIMEOUT_MS, RSK_OK, SELFTEST_TK, SELFTEST_VRK};
use crate::error::{CommsError, ProtocolError};
use crate::protocol::{type_code, Body, Direction, Message};
use crate::queue::Queue;

use super::link::{Link, LinkStatus};
use super::payloads::session_prep_sequence;
use super::receiver::TaggedMessage;
use super::sender::{CcuRequest, SendTracker};
use super::status::{EventSender, StatusEvent};

pub struct Sequencer {
    links: Arc<Vec<Arc<Link>>>,
    requests: Arc<Queue<CcuRequest>>,
    responses: Arc<Queue<TaggedMessage>>,
    tracker: Arc<SendTracker>,
    events: EventSender,
    pending: VecDeque<TaggedMessage>,
}

impl Sequencer {
    pub fn new(
        links: Arc<Vec<Arc<Link>>>,
        requests: Arc<Queue<CcuRequest>>,
        responses: Arc<Queue<TaggedMessage>>,
        tracker: Arc<SendTracker>,
        events: EventSender,
    ) -> Sequencer {
        Sequencer {
            links,
            requests,
            responses,
            tracker,
            events,
            pending: VecDeque::new(),
        }
    }

    async fn send(&self, link: &Link, body: Body) -> Result<(), CommsError> {
        let number = link.next_message_number();
        let type_code = body.type_code();
        let message = Message::new(link.assigned_lak, Direction::CcuToRsm, number, body);
        link.record_sent(type_code, number).await;
        self.tracker.mark_outstanding();
        self.requests
            .enqueue(CcuRequest::Send {
                target_id: link.id,
                message,
            })
            .await
            .map_err(|_| CommsError::Resource("sender request queue closed".to_string()))
    }

    /// Drains the shared response queue until a message from `target_id`
    /// with `expected_type` arrives, or `timeout` elapses. Non-matching
    /// messages already seen are kept in `pending` so the steady-state
    /// dispatch can still classify them later, per §4.11.
    async fn wait_for_specific_response(
        &mut self,
        target_id: usize,
        expected_type: u8,
    ) -> Result<Message, CommsError> {
        if let Some(idx) = self
            .pending
            .iter()
            .position(|m| m.source_id == target_id && m.message.body.type_code() == expected_type)
        {
            return Ok(self.pending.remove(idx).unwrap().message);
        }

        let deadline = tokio::time::Instant::now() + Duration::from_millis(RESPONSE_TIMEOUT_MS);
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(CommsError::Timeout);
            }
            let tagged = match tokio::time::timeout(remaining, self.responses.dequeue()).await {
                Ok(Ok(m)) => m,
                Ok(Err(_)) => {
                    return Err(CommsError::Resource("response queue closed".to_string()))
                }
                Err(_) => return Err(CommsError::Timeout),
            };
            if tagged.source_id == target_id && tagged.message.body.type_code() == expected_type {
                return Ok(tagged.message);
            }
            self.pending.push_back(tagged);
        }
    }

    /// Drives one link through init, self-test, line-state query and
    /// session preparation. Returns `Ok(())` if the link reached Active
    /// and is ready for steady state; any failure leaves it Failed.
    pub async fn run_startup(&mut self, link: &Arc<Link>, mode: RadarMode) -> Result<(), CommsError> {
        self.send(
            link,
            Body::InitChannel {
                lauvm: crate::defaults::LOGICAL_ADDRESS_CCU,
                lak: link.assigned_lak,
            },
        )
        .await?;
        let confirm = self
            .wait_for_specific_response(link.id, type_code::CONFIRM_INIT)
            .await?;
        let Body::ConfirmInit { lak, .. } = confirm.body else {
            unreachable!("type_code matched ConfirmInit")
        };
        if lak != link.assigned_lak {
            tracing::warn!(link = link.id, expected = link.assigned_lak, actual = lak, "LAK mismatch on init");
            link.set_status(LinkStatus::Failed).await;
            self.publish_link_status(link).await;
            return Err(CommsError::Protocol(ProtocolError::LakMismatch {
                expected: link.assigned_lak,
                actual: lak,
            }));
        }

        self.send(link, Body::ProvestiControl { tk: SELFTEST_TK }).await?;
        self.wait_for_specific_response(link.id, type_code::CONTROL_CONFIRM)
            .await?;

        self.send(link, Body::VydatControlResults { vrk: SELFTEST_VRK }).await?;
        let results = self
            .wait_for_specific_response(link.id, type_code::CONTROL_RESULTS)
            .await?;
        if let Body::ControlResults { rsk, .. } = results.body {
            if rsk != RSK_OK {
                tracing::warn!(link = link.id, rsk, "self-test reported failure, continuing");
            }
        }

        self.send(link, Body::VydatLineState).await?;
        self.wait_for_specific_response(link.id, type_code::LINE_STATE)
            .await?;

        for body in session_prep_sequence(mode, link.id) {
            self.send(link, body).await?;
        }
        self.tracker.wait_for_drain(Duration::from_secs(1)).await;

        link.set_status(LinkStatus::Active).await;
        self.publish_link_status(link).await;
        tracing::info!(link = link.id, "startup sequence complete, link active");
        Ok(())
    }

    async fn publish_link_status(&self, link: &Link) {
        let status = link.status().await;
        self.events.publish(StatusEvent::LinkStatus {
            link_id: link.id,
            status,
            assigned_lak: link.assigned_lak,
        });
    }

    /// Classifies whatever arrives after startup: Warning transitions the
    /// link to Warning and publishes an event; anything else is logged as
    /// an unsolicited message and forwarded to the status stream. Also
    /// runs the keep-alive watchdog every pass through the loop.
    pub async fn run_steady_state(&mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                return;
            }
            while let Some(tagged) = self.pending.pop_front() {
                self.classify(tagged).await;
            }

            tokio::select! {
                result = tokio::time::timeout(Duration::from_secs(1), self.responses.dequeue()) => {
                    match result {
                        Ok(Ok(tagged)) => self.classify(tagged).await,
                        Ok(Err(_)) => return,
                        Err(_) => {}
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }

            self.run_keepalive_watchdog().await;
        }
    }

    async fn classify(&self, tagged: TaggedMessage) {
        let Some(link) = self.links.iter().find(|l| l.id == tagged.source_id) else {
            return;
        };
        link.touch().await;
        let type_code = tagged.message.body.type_code();
        let number = tagged.message.message_number;
        match tagged.message.body {
            Body::Warning { tks, .. } => {
                tracing::warn!(link = link.id, tks, "warning received");
                if link.status().await == LinkStatus::Active {
                    link.set_status(LinkStatus::Warning).await;
                }
                self.events.publish(StatusEvent::Warning { link_id: link.id, tks });
                self.publish_link_status(link).await;
            }
            // Normal response (§4.11 step 5): update last-recv bookkeeping.
            Body::ConfirmInit { bcb, .. } | Body::ControlConfirm { bcb, .. } | Body::LineState { bcb, .. } => {
                link.record_received(type_code, number, bcb).await;
            }
            Body::ControlResults { bcb, rsk, .. } => {
                link.record_received(type_code, number, bcb).await;
                link.set_last_rsk(rsk).await;
            }
            other => {
                tracing::debug!(link = link.id, type_code = other.type_code(), "unsolicited message");
                self.events.publish(StatusEvent::Unsolicited {
                    link_id: link.id,
                    type_code: other.type_code(),
                });
            }
        }
    }

    async fn run_keepalive_watchdog(&self) {
        for link in self.links.iter() {
            let status = link.status().await;
            if !matches!(status, LinkStatus::Active | LinkStatus::Warning) {
                continue;
            }
            let silent_for = {
                let state = link.state.lock().await;
                state.last_activity.elapsed()
            };
            if silent_for > Duration::from_secs(KEEPALIVE_TIMEOUT_SECS) {
                tracing::warn!(link = link.id, "keep-alive timeout, marking link failed");
                link.set_status(LinkStatus::Failed).await;
                let mut half = link.send_half.lock().await;
                if let Some(h) = half.as_mut() {
                    use crate::transport::SendTransport;
                    h.shutdown().await;
                }
                drop(half);
                self.publish_link_status(link).await;
            }
        }
    }
}
