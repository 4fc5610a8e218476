//! Peer state mirror
//!
//! The last snapshot received from the remote node. Only the link layer
//! writes it, and only whole: a frame is fully decoded before [`commit`]
//! swaps the snapshot, so readers never see a mix of old and new fields.
//!
//! Consumers must check [`PeerStateMirror::is_stale`] (or use
//! [`PeerStateMirror::fresh`]) before acting on the data.
//!
//! [`commit`]: PeerStateMirror::commit

use crate::time::{elapsed_ms, Timestamp};

#[derive(Debug, Clone, PartialEq)]
pub struct PeerStateMirror<P> {
    snapshot: Option<P>,
    last_update: Option<Timestamp>,
    source_msg_id: Option<u32>,
    is_stale: bool,
}

impl<P> Default for PeerStateMirror<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> PeerStateMirror<P> {
    /// Empty mirror; stale until the first commit
    pub const fn new() -> Self {
        Self {
            snapshot: None,
            last_update: None,
            source_msg_id: None,
            is_stale: true,
        }
    }

    /// Replace the snapshot in one step and mark it fresh
    pub(crate) fn commit(&mut self, snapshot: P, msg_id: u32, now: Timestamp) {
        *self = Self {
            snapshot: Some(snapshot),
            last_update: Some(now),
            source_msg_id: Some(msg_id),
            is_stale: false,
        };
    }

    /// Returns true if the flag changed
    pub(crate) fn mark_stale(&mut self) -> bool {
        !core::mem::replace(&mut self.is_stale, true)
    }

    /// Last snapshot, fresh or not
    pub fn snapshot(&self) -> Option<&P> {
        self.snapshot.as_ref()
    }

    /// Last snapshot, only while the peer is fresh
    pub fn fresh(&self) -> Option<&P> {
        if self.is_stale {
            None
        } else {
            self.snapshot.as_ref()
        }
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale
    }

    pub fn last_update(&self) -> Option<Timestamp> {
        self.last_update
    }

    /// `msg_id` of the frame the snapshot came from
    pub fn source_msg_id(&self) -> Option<u32> {
        self.source_msg_id
    }

    pub fn age(&self, now: Timestamp) -> Option<u32> {
        self.last_update.map(|at| elapsed_ms(now, at))
    }
}
