//! Link transport over a non-blocking UDP socket

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use hazardguard_core::constants::MAX_DATAGRAM_LEN;
use hazardguard_core::errors::TransportError;
use hazardguard_core::link::{Datagram, Transport};

use crate::ConnectorError;

const LOG: &str = "hazardguard::udp";

// Room to receive oversized datagrams whole so the codec can reject them
const RECV_BUFFER_LEN: usize = 2 * MAX_DATAGRAM_LEN;

/// UDP socket standing in for the point-to-point radio
///
/// The socket is bound on [`Transport::init`] and dropped on
/// [`Transport::close`], so the link layer's teardown and re-init cycle
/// really rebinds it.
#[derive(Debug)]
pub struct UdpTransport {
    bind: SocketAddr,
    socket: Option<UdpSocket>,
    buffer: [u8; RECV_BUFFER_LEN],
}

impl UdpTransport {
    /// Unbound transport; the socket is created by `init`
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            socket: None,
            buffer: [0; RECV_BUFFER_LEN],
        }
    }

    /// Bind immediately; useful with port 0 to learn the assigned address
    pub fn bound(bind: SocketAddr) -> Result<Self, ConnectorError> {
        let mut transport = Self::new(bind);
        transport.init()?;
        Ok(transport)
    }

    /// Address the socket is bound to, if it is open
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|socket| socket.local_addr().ok())
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }
}

impl Transport for UdpTransport {
    type Address = SocketAddr;

    fn init(&mut self) -> Result<(), TransportError> {
        // Rebinding a fixed port after a close must reuse the same address
        let bind = self.local_addr().unwrap_or(self.bind);
        self.socket = None;

        let socket = UdpSocket::bind(bind).map_err(|error| {
            log::warn!(target: LOG, "bind {bind} failed: {error}");
            TransportError::InitFailed { reason: "bind failed" }
        })?;
        socket.set_nonblocking(true).map_err(|error| {
            log::warn!(target: LOG, "set_nonblocking on {bind} failed: {error}");
            TransportError::InitFailed {
                reason: "non-blocking mode unavailable",
            }
        })?;

        if let Ok(local) = socket.local_addr() {
            log::info!(target: LOG, "listening on {local}");
            self.bind = local;
        }
        self.socket = Some(socket);
        Ok(())
    }

    fn send(&mut self, peer: &SocketAddr, bytes: &[u8]) -> Result<(), TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotInitialized)?;
        if bytes.len() > MAX_DATAGRAM_LEN {
            return Err(TransportError::Oversized {
                len: bytes.len(),
                max: MAX_DATAGRAM_LEN,
            });
        }
        match socket.send_to(bytes, peer) {
            Ok(sent) if sent == bytes.len() => Ok(()),
            Ok(_) => Err(TransportError::SendFailed { reason: "short write" }),
            Err(error) => {
                log::debug!(target: LOG, "send to {peer} failed: {error}");
                Err(TransportError::SendFailed { reason: "send_to failed" })
            }
        }
    }

    fn recv(&mut self) -> nb::Result<Datagram<SocketAddr>, TransportError> {
        let socket = self
            .socket
            .as_ref()
            .ok_or(nb::Error::Other(TransportError::NotInitialized))?;
        match socket.recv_from(&mut self.buffer) {
            Ok((len, from)) => Ok(Datagram {
                from,
                bytes: self.buffer[..len].to_vec(),
            }),
            Err(error) if error.kind() == ErrorKind::WouldBlock => Err(nb::Error::WouldBlock),
            // ICMP port unreachable from an earlier send; nothing to read
            Err(error) if matches!(error.kind(), ErrorKind::ConnectionReset | ErrorKind::ConnectionRefused) => {
                Err(nb::Error::WouldBlock)
            }
            Err(error) => {
                log::debug!(target: LOG, "recv failed: {error}");
                Err(nb::Error::Other(TransportError::ReceiveFailed {
                    reason: "recv_from failed",
                }))
            }
        }
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            log::info!(target: LOG, "closed {}", self.bind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[test]
    fn unbound_transport_refuses_io() {
        let mut transport = UdpTransport::new(loopback());
        assert!(!transport.is_open());
        assert_eq!(
            transport.send(&loopback(), b"x"),
            Err(TransportError::NotInitialized)
        );
        assert_eq!(
            transport.recv(),
            Err(nb::Error::Other(TransportError::NotInitialized))
        );
    }

    #[test]
    fn empty_socket_would_block() {
        let mut transport = UdpTransport::bound(loopback()).unwrap();
        assert_eq!(transport.recv(), Err(nb::Error::WouldBlock));
    }

    #[test]
    fn oversized_datagrams_are_refused() {
        let mut transport = UdpTransport::bound(loopback()).unwrap();
        let peer = transport.local_addr().unwrap();
        let big = vec![b'x'; MAX_DATAGRAM_LEN + 1];
        assert_eq!(
            transport.send(&peer, &big),
            Err(TransportError::Oversized {
                len: MAX_DATAGRAM_LEN + 1,
                max: MAX_DATAGRAM_LEN
            })
        );
    }

    #[test]
    fn reinit_keeps_the_assigned_port() {
        let mut transport = UdpTransport::bound(loopback()).unwrap();
        let first = transport.local_addr().unwrap();

        transport.close();
        assert!(transport.local_addr().is_none());
        transport.init().unwrap();

        assert_eq!(transport.local_addr(), Some(first));
    }
}
