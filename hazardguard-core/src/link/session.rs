//! Sequence, acknowledgement and freshness bookkeeping for one peer

use alloc::vec::Vec;

use serde::Serialize;

use super::message::MessageType;
use crate::time::{elapsed_ms, Timestamp};

/// Why an urgent event was queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventReason {
    /// A channel changed alarm level
    Level(crate::alarm::LevelChange),
    /// The manual SOS latch was raised or cleared
    Manual { active: bool },
    /// Application-defined event (e.g. a button press on the actuating node)
    Application(u8),
}

/// The one event waiting for its acknowledgement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAck {
    pub seq: u32,
    pub sent_at: Timestamp,
    pub retries: u8,
    pub reason: EventReason,
    pub(crate) frame: Vec<u8>,
}

/// Outcome of an urgent event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered { seq: u32, reason: EventReason },
    Failed { seq: u32, reason: EventReason },
}

/// Deduplication verdict for an inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxVerdict {
    Fresh,
    Duplicate,
}

/// Protocol state shared with one peer
///
/// Invariants: at most one `pending_ack`; `next_tx_id` only increases.
#[derive(Debug, Clone)]
pub struct LinkSession<A> {
    peer: A,
    next_tx_id: u32,
    last_rx_id: u32,
    last_event_id: Option<u32>,
    pending_ack: Option<PendingAck>,
    last_rx_time: Option<Timestamp>,
    is_stale: bool,
}

impl<A> LinkSession<A> {
    /// New session; the peer counts as stale until it is first heard
    pub fn new(peer: A) -> Self {
        Self {
            peer,
            next_tx_id: 1,
            last_rx_id: 0,
            last_event_id: None,
            pending_ack: None,
            last_rx_time: None,
            is_stale: true,
        }
    }

    pub fn peer(&self) -> &A {
        &self.peer
    }

    pub fn next_tx_id(&self) -> u32 {
        self.next_tx_id
    }

    pub fn last_rx_id(&self) -> u32 {
        self.last_rx_id
    }

    /// Id of the newest Event accepted from the peer
    pub fn last_event_id(&self) -> Option<u32> {
        self.last_event_id
    }

    /// True for a retransmission of the newest accepted Event, whose ack
    /// may have been lost. Any other old Event was never applied.
    pub fn is_repeat_event(&self, msg_id: u32) -> bool {
        self.last_event_id == Some(msg_id)
    }

    pub fn pending_ack(&self) -> Option<&PendingAck> {
        self.pending_ack.as_ref()
    }

    pub fn last_rx_time(&self) -> Option<Timestamp> {
        self.last_rx_time
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale
    }

    /// Allocate the id for the next outgoing frame
    pub(crate) fn take_tx_id(&mut self) -> u32 {
        let id = self.next_tx_id;
        self.next_tx_id = self.next_tx_id.wrapping_add(1).max(1);
        id
    }

    /// Dedup check for an inbound frame; acks are never deduplicated
    pub(crate) fn accept(&mut self, msg_id: u32, kind: MessageType) -> RxVerdict {
        if kind == MessageType::Ack {
            return RxVerdict::Fresh;
        }
        if msg_id <= self.last_rx_id {
            return RxVerdict::Duplicate;
        }
        self.last_rx_id = msg_id;
        if kind == MessageType::Event {
            self.last_event_id = Some(msg_id);
        }
        RxVerdict::Fresh
    }

    /// Record liveness; returns true if the peer was stale
    pub(crate) fn heard(&mut self, now: Timestamp) -> bool {
        self.last_rx_time = Some(now);
        core::mem::replace(&mut self.is_stale, false)
    }

    /// Flag the peer stale once `timeout` ms pass without traffic
    ///
    /// Returns true on the transition. Going stale also forgets the receive
    /// sequence so a rebooted peer, whose ids restart at 1, is accepted.
    pub(crate) fn check_stale(&mut self, now: Timestamp, timeout: u32) -> bool {
        if self.is_stale {
            return false;
        }
        let Some(last) = self.last_rx_time else {
            return false;
        };
        if elapsed_ms(now, last) < timeout {
            return false;
        }
        self.is_stale = true;
        self.last_rx_id = 0;
        self.last_event_id = None;
        true
    }

    pub(crate) fn set_pending(&mut self, pending: PendingAck) {
        self.pending_ack = Some(pending);
    }

    pub(crate) fn pending_mut(&mut self) -> Option<&mut PendingAck> {
        self.pending_ack.as_mut()
    }

    /// Clear the pending entry if `reply_to` acknowledges it
    pub(crate) fn acknowledge(&mut self, reply_to: u32) -> Option<PendingAck> {
        match &self.pending_ack {
            Some(pending) if pending.seq == reply_to => self.pending_ack.take(),
            _ => None,
        }
    }

    pub(crate) fn take_pending(&mut self) -> Option<PendingAck> {
        self.pending_ack.take()
    }

    /// Teardown after a transport failure
    ///
    /// Drops the pending entry and the receive sequence; `next_tx_id` and
    /// freshness carry over into the rebuilt session.
    pub(crate) fn tear_down(&mut self) -> Option<PendingAck> {
        self.last_rx_id = 0;
        self.last_event_id = None;
        self.pending_ack.take()
    }
}

/// Link diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub frames_sent: u32,
    pub frames_received: u32,
    pub accepted: u32,
    pub duplicates: u32,
    pub malformed: u32,
    pub version_mismatches: u32,
    pub foreign_peers: u32,
    pub backlog_discarded: u32,
    pub retransmissions: u32,
    pub delivered: u32,
    pub delivery_failures: u32,
    pub superseded_events: u32,
    pub reinit_attempts: u32,
    pub link_failures: u32,
    pub receive_errors: u32,
}
