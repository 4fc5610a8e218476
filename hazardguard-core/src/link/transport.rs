//! Datagram transport contract

use alloc::vec::Vec;
use core::fmt::Debug;

use crate::errors::TransportError;

/// One received datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram<A> {
    pub from: A,
    pub bytes: Vec<u8>,
}

/// Unreliable point-to-point datagram medium
///
/// Datagrams may be lost, duplicated or reordered. Nothing here may block:
/// `recv` returns `WouldBlock` when the receive queue is empty, and `send`
/// only hands the datagram to the medium.
///
/// An init or send error makes the link layer tear the session down and
/// call `init` again on a fixed interval. Receive errors are transient.
pub trait Transport {
    type Address: Clone + PartialEq + Debug;

    fn init(&mut self) -> Result<(), TransportError>;

    fn send(&mut self, peer: &Self::Address, bytes: &[u8]) -> Result<(), TransportError>;

    fn recv(&mut self) -> nb::Result<Datagram<Self::Address>, TransportError>;

    /// Release the medium after a failure; `init` is called before reuse
    fn close(&mut self) {}
}
