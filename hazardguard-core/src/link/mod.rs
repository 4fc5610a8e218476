//! Reliable-enough messaging over an unreliable datagram link
//!
//! Two nodes exchange JSON snapshots over a lossy point-to-point medium:
//!
//! ```text
//!   Initiator (sensing node)                 Responder (actuating node)
//!   ── data id=41 ─────────────────────────▶ commit, reply
//!                 ◀──────────────────────── ack r=41 (own snapshot)
//!   ── event id=42 (alarm changed) ────────▶ commit, ack
//!                 ◀──────────────────────── ack r=42
//! ```
//!
//! - **Sequencing**: ids strictly increase per sender; non-ack frames with an
//!   id at or below the last accepted one are dropped and counted.
//! - **Acknowledgement**: one event in flight, retransmitted after the ack
//!   timeout, reported failed once retries run out.
//! - **Burst drain**: every queued frame goes through dedup, only the newest
//!   reaches the [`PeerStateMirror`](crate::mirror::PeerStateMirror).
//! - **Staleness**: silence longer than the stale timeout flags the mirror.
//! - **Recovery**: transport failures tear the session down; re-init is
//!   retried on a fixed interval.

mod codec;
mod endpoint;
mod memory;
mod message;
mod session;
mod transport;

pub use codec::{decode, encode};
pub use endpoint::{LinkEndpoint, LinkTimings, PollReport, QueuedEvent, Role};
pub use memory::{FaultPlan, MemoryTransport};
pub use message::{LinkMessage, MessageType, Payload};
pub use session::{Delivery, EventReason, LinkSession, LinkStats, PendingAck, RxVerdict};
pub use transport::{Datagram, Transport};
