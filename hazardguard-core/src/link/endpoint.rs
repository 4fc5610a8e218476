//! Link endpoint: one poll per tick
//!
//! ```text
//! poll(now)
//!  ├─ staleness check ........ mirror.is_stale after stale_timeout of silence
//!  ├─ link down? ............. re-init on the fixed reinit interval, else stop
//!  ├─ drain ≤ 10 datagrams ... dedup every frame, commit only the newest
//!  ├─ acks ................... each accepted Event and a repeat of the last
//!  │                           one; responder: newest Data
//!  ├─ pending event .......... retransmit after ack_timeout, fail after max_retries
//!  ├─ next queued event ...... only when nothing is pending
//!  └─ periodic data .......... initiator only, on send_interval
//! ```
//!
//! A transport send error tears the session down: the pending event is
//! reported failed, queued events wait, and the transport is re-initialised
//! on the reinit interval.

use heapless::{Deque, Vec};
use serde::{Deserialize, Serialize};

use super::codec;
use super::message::{LinkMessage, MessageType, Payload};
use super::session::{Delivery, EventReason, LinkSession, LinkStats, PendingAck, RxVerdict};
use super::transport::Transport;
use crate::constants::{timers, EVENT_QUEUE_DEPTH, MAX_DRAIN_PER_POLL};
use crate::errors::{CodecError, ConfigError, TaskError, TransportError};
use crate::mirror::PeerStateMirror;
use crate::scheduler::Scheduler;
use crate::time::{elapsed_ms, Timestamp};

#[cfg_attr(not(feature = "log"), allow(dead_code))]
const LOG: &str = "hazardguard::link";

/// Which side of the link this node plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Publishes its snapshot on a fixed cadence
    Initiator,
    /// Replies to every inbound snapshot with its own
    Responder,
}

/// Protocol timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkTimings {
    pub send_interval_ms: u32,
    pub ack_timeout_ms: u32,
    pub max_retries: u8,
    pub stale_timeout_ms: u32,
    pub reinit_interval_ms: u32,
}

impl LinkTimings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("send_interval_ms", self.send_interval_ms),
            ("ack_timeout_ms", self.ack_timeout_ms),
            ("stale_timeout_ms", self.stale_timeout_ms),
            ("reinit_interval_ms", self.reinit_interval_ms),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ZeroInterval { field: *field });
        }
        if self.stale_timeout_ms <= self.ack_timeout_ms {
            return Err(ConfigError::StaleNotAboveAck {
                ack_timeout_ms: self.ack_timeout_ms,
                stale_timeout_ms: self.stale_timeout_ms,
            });
        }
        Ok(())
    }
}

/// An urgent event waiting for transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedEvent {
    pub reason: EventReason,
    pub queued_at: Timestamp,
}

/// What one poll did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Datagrams taken from the transport
    pub received: u16,
    /// `msg_id` committed to the mirror
    pub applied: Option<u32>,
    /// Accepted frames superseded by a newer one in the same drain
    pub discarded: u16,
    pub duplicates: u16,
    /// Malformed, wrong-version or foreign datagrams
    pub rejected: u16,
    pub sent: u16,
    pub deliveries: Vec<Delivery, 2>,
    pub went_stale: bool,
    pub link_up: bool,
    pub error: Option<TaskError>,
}

/// Protocol engine for one peer
#[derive(Debug, Clone)]
pub struct LinkEndpoint<A> {
    role: Role,
    timings: LinkTimings,
    session: LinkSession<A>,
    events: Deque<QueuedEvent, EVENT_QUEUE_DEPTH>,
    up: bool,
    stats: LinkStats,
}

impl<A: Clone + PartialEq + core::fmt::Debug> LinkEndpoint<A> {
    /// Endpoint with the link down; the first poll initialises the transport
    pub fn new(role: Role, peer: A, timings: LinkTimings) -> Self {
        Self {
            role,
            timings,
            session: LinkSession::new(peer),
            events: Deque::new(),
            up: false,
            stats: LinkStats::default(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn timings(&self) -> &LinkTimings {
        &self.timings
    }

    pub fn session(&self) -> &LinkSession<A> {
        &self.session
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn is_up(&self) -> bool {
        self.up
    }

    pub fn queued_events(&self) -> usize {
        self.events.len()
    }

    /// Request an immediate publish; returns true if an older event was superseded
    pub fn queue_event(&mut self, reason: EventReason, now: Timestamp) -> bool {
        let superseded = if self.events.is_full() {
            self.events.pop_front()
        } else {
            None
        };
        if let Some(old) = superseded {
            self.stats.superseded_events += 1;
            log_debug!(target: LOG, "event {:?} superseded by {:?}", old.reason, reason);
        }
        let _ = self.events.push_back(QueuedEvent { reason, queued_at: now });
        superseded.is_some()
    }

    /// Run the protocol once; never blocks
    pub fn poll<T, L, R, const N: usize>(
        &mut self,
        transport: &mut T,
        scheduler: &mut Scheduler<N>,
        now: Timestamp,
        local: &L,
        mirror: &mut PeerStateMirror<R>,
    ) -> PollReport
    where
        T: Transport<Address = A>,
        L: Payload,
        R: Payload,
    {
        let mut report = PollReport::default();

        if self.session.check_stale(now, self.timings.stale_timeout_ms) {
            mirror.mark_stale();
            report.went_stale = true;
            log_warn!(
                target: LOG,
                "peer {:?} stale: nothing received for {} ms",
                self.session.peer(),
                self.timings.stale_timeout_ms
            );
        }

        if !self.up && !self.reinit(transport, scheduler, now, &mut report) {
            report.link_up = false;
            return report;
        }

        if let Err(error) = self.exchange(transport, scheduler, now, local, mirror, &mut report) {
            report.error = Some(error);
        }
        report.link_up = self.up;
        report
    }

    fn reinit<T, const N: usize>(
        &mut self,
        transport: &mut T,
        scheduler: &mut Scheduler<N>,
        now: Timestamp,
        report: &mut PollReport,
    ) -> bool
    where
        T: Transport<Address = A>,
    {
        if !scheduler.elapsed(timers::LINK_REINIT, self.timings.reinit_interval_ms, now) {
            return false;
        }
        self.stats.reinit_attempts += 1;
        match transport.init() {
            Ok(()) => {
                self.up = true;
                log_info!(target: LOG, "link up (attempt {})", self.stats.reinit_attempts);
                true
            }
            Err(error) => {
                log_warn!(
                    target: LOG,
                    "link init failed: {}; retrying in {} ms",
                    error,
                    self.timings.reinit_interval_ms
                );
                report.error = Some(error.into());
                false
            }
        }
    }

    fn exchange<T, L, R, const N: usize>(
        &mut self,
        transport: &mut T,
        scheduler: &mut Scheduler<N>,
        now: Timestamp,
        local: &L,
        mirror: &mut PeerStateMirror<R>,
        report: &mut PollReport,
    ) -> Result<(), TaskError>
    where
        T: Transport<Address = A>,
        L: Payload,
        R: Payload,
    {
        let acks = self.drain(transport, now, mirror, report);
        for reply_to in acks {
            self.send_frame(transport, MessageType::Ack, Some(reply_to), local, now, report)?;
        }

        self.service_pending(transport, now, report)?;
        let event_sent = self.send_next_event(transport, now, local, report)?;

        let data_due = scheduler.elapsed(timers::LINK_SEND, self.timings.send_interval_ms, now);
        if self.role == Role::Initiator && data_due && !event_sent {
            self.send_frame(transport, MessageType::Data, None, local, now, report)?;
        }
        Ok(())
    }

    /// Take up to [`MAX_DRAIN_PER_POLL`] datagrams, commit the newest accepted
    /// one and return the ids that need an acknowledgement
    fn drain<T, R>(
        &mut self,
        transport: &mut T,
        now: Timestamp,
        mirror: &mut PeerStateMirror<R>,
        report: &mut PollReport,
    ) -> Vec<u32, MAX_DRAIN_PER_POLL>
    where
        T: Transport<Address = A>,
        R: Payload,
    {
        let mut acks: Vec<u32, MAX_DRAIN_PER_POLL> = Vec::new();
        let mut newest: Option<LinkMessage<R>> = None;
        let mut newest_needs_ack = false;

        for _ in 0..MAX_DRAIN_PER_POLL {
            let datagram = match transport.recv() {
                Ok(datagram) => datagram,
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(error)) => {
                    self.stats.receive_errors += 1;
                    log_debug!(target: LOG, "receive error: {}", error);
                    break;
                }
            };
            self.stats.frames_received += 1;
            report.received += 1;

            if datagram.from != *self.session.peer() {
                self.stats.foreign_peers += 1;
                report.rejected += 1;
                log_debug!(target: LOG, "ignoring datagram from {:?}", datagram.from);
                continue;
            }

            let message = match codec::decode::<R>(&datagram.bytes) {
                Ok(message) => message,
                Err(error) => {
                    match error {
                        CodecError::VersionMismatch { expected, found } => {
                            self.stats.version_mismatches += 1;
                            log_warn!(target: LOG, "skipping frame with schema v{} (expected v{})", found, expected);
                        }
                        _ => {
                            self.stats.malformed += 1;
                            log_debug!(target: LOG, "dropping frame: {}", error);
                        }
                    }
                    report.rejected += 1;
                    continue;
                }
            };

            if self.session.accept(message.msg_id, message.kind) == RxVerdict::Duplicate {
                self.stats.duplicates += 1;
                report.duplicates += 1;
                log_debug!(target: LOG, "duplicate {:?} id={}", message.kind, message.msg_id);
                if message.kind == MessageType::Event && self.session.is_repeat_event(message.msg_id) {
                    let _ = acks.push(message.msg_id);
                }
                continue;
            }

            self.stats.accepted += 1;
            if self.session.heard(now) {
                log_info!(target: LOG, "peer {:?} fresh (id={})", self.session.peer(), message.msg_id);
            }
            log_debug!(target: LOG, "rx {:?} id={}", message.kind, message.msg_id);

            if let Some(reply_to) = message.reply_to {
                self.settle(reply_to, report);
            }
            match message.kind {
                MessageType::Event => {
                    let _ = acks.push(message.msg_id);
                    newest_needs_ack = false;
                }
                MessageType::Data => newest_needs_ack = self.role == Role::Responder,
                MessageType::Ack => newest_needs_ack = false,
            }

            if newest.replace(message).is_some() {
                report.discarded += 1;
            }
        }

        if let Some(message) = newest {
            if newest_needs_ack {
                let _ = acks.push(message.msg_id);
            }
            report.applied = Some(message.msg_id);
            mirror.commit(message.payload, message.msg_id, now);
        }
        if report.discarded > 0 {
            self.stats.backlog_discarded += u32::from(report.discarded);
            log_debug!(target: LOG, "burst: applied newest, discarded {} older frames", report.discarded);
        }
        acks
    }

    fn settle(&mut self, reply_to: u32, report: &mut PollReport) {
        if let Some(pending) = self.session.acknowledge(reply_to) {
            self.stats.delivered += 1;
            log_info!(
                target: LOG,
                "event {} delivered after {} retries",
                pending.seq,
                pending.retries
            );
            let _ = report.deliveries.push(Delivery::Delivered {
                seq: pending.seq,
                reason: pending.reason,
            });
        }
    }

    fn service_pending<T>(&mut self, transport: &mut T, now: Timestamp, report: &mut PollReport) -> Result<(), TaskError>
    where
        T: Transport<Address = A>,
    {
        let (ack_timeout, max_retries) = (self.timings.ack_timeout_ms, self.timings.max_retries);
        let Some(pending) = self.session.pending_mut() else {
            return Ok(());
        };
        if elapsed_ms(now, pending.sent_at) < ack_timeout {
            return Ok(());
        }

        if pending.retries >= max_retries {
            if let Some(failed) = self.session.take_pending() {
                self.fail(&failed, report);
            }
            return Ok(());
        }

        pending.retries += 1;
        pending.sent_at = now;
        let frame = pending.frame.clone();
        log_debug!(target: LOG, "retransmitting event {} (retry {})", pending.seq, pending.retries);
        self.stats.retransmissions += 1;
        self.transmit(transport, &frame, report)
    }

    fn send_next_event<T, L>(
        &mut self,
        transport: &mut T,
        now: Timestamp,
        local: &L,
        report: &mut PollReport,
    ) -> Result<bool, TaskError>
    where
        T: Transport<Address = A>,
        L: Payload,
    {
        if self.session.pending_ack().is_some() {
            return Ok(false);
        }
        let Some(event) = self.events.pop_front() else {
            return Ok(false);
        };

        let seq = self.session.take_tx_id();
        let frame = match codec::encode(&Self::frame(MessageType::Event, seq, None, local, now)) {
            Ok(frame) => frame,
            Err(error) => {
                self.stats.delivery_failures += 1;
                log_error!(target: LOG, "event {} ({:?}) not sent: {}", seq, event.reason, error);
                let _ = report.deliveries.push(Delivery::Failed {
                    seq,
                    reason: event.reason,
                });
                return Err(error.into());
            }
        };
        self.session.set_pending(PendingAck {
            seq,
            sent_at: now,
            retries: 0,
            reason: event.reason,
            frame: frame.clone(),
        });
        log_info!(target: LOG, "event {} sent ({:?})", seq, event.reason);
        self.transmit(transport, &frame, report)?;
        Ok(true)
    }

    fn send_frame<T, L>(
        &mut self,
        transport: &mut T,
        kind: MessageType,
        reply_to: Option<u32>,
        local: &L,
        now: Timestamp,
        report: &mut PollReport,
    ) -> Result<(), TaskError>
    where
        T: Transport<Address = A>,
        L: Payload,
    {
        let msg_id = self.session.take_tx_id();
        let frame = codec::encode(&Self::frame(kind, msg_id, reply_to, local, now))?;
        log_debug!(target: LOG, "tx {:?} id={} ({} bytes)", kind, msg_id, frame.len());
        self.transmit(transport, &frame, report)
    }

    fn frame<L: Payload>(
        kind: MessageType,
        msg_id: u32,
        reply_to: Option<u32>,
        local: &L,
        now: Timestamp,
    ) -> LinkMessage<&L> {
        LinkMessage {
            version: L::SCHEMA_VERSION,
            kind,
            msg_id,
            timestamp: now,
            reply_to,
            payload: local,
        }
    }

    fn transmit<T>(&mut self, transport: &mut T, frame: &[u8], report: &mut PollReport) -> Result<(), TaskError>
    where
        T: Transport<Address = A>,
    {
        match transport.send(self.session.peer(), frame) {
            Ok(()) => {
                self.stats.frames_sent += 1;
                report.sent += 1;
                Ok(())
            }
            Err(error) => {
                self.tear_down(transport, error, report);
                Err(error.into())
            }
        }
    }

    fn tear_down<T>(&mut self, transport: &mut T, error: TransportError, report: &mut PollReport)
    where
        T: Transport<Address = A>,
    {
        self.up = false;
        self.stats.link_failures += 1;
        transport.close();
        log_warn!(target: LOG, "link down: {}", error);
        if let Some(pending) = self.session.tear_down() {
            self.fail(&pending, report);
        }
    }

    fn fail(&mut self, pending: &PendingAck, report: &mut PollReport) {
        self.stats.delivery_failures += 1;
        log_warn!(
            target: LOG,
            "event {} ({:?}) failed after {} retries",
            pending.seq,
            pending.reason,
            pending.retries
        );
        let _ = report.deliveries.push(Delivery::Failed {
            seq: pending.seq,
            reason: pending.reason,
        });
    }
}

impl Default for LinkTimings {
    fn default() -> Self {
        use crate::constants::link;
        Self {
            send_interval_ms: link::SEND_INTERVAL_MS,
            ack_timeout_ms: link::ACK_TIMEOUT_MS,
            max_retries: link::MAX_RETRIES,
            stale_timeout_ms: link::STALE_TIMEOUT_MS,
            reinit_interval_ms: link::REINIT_INTERVAL_MS,
        }
    }
}
