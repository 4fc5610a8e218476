//! Hosted Connectors for HazardGuard Nodes
//!
//! ## Overview
//!
//! The core crate never touches a network stack. This crate supplies what a
//! node needs when it runs on a host (a gateway, a simulator, a developer
//! machine) instead of on the boards:
//!
//! - [`UdpTransport`]: the link [`Transport`](hazardguard_core::link::Transport)
//!   over a non-blocking UDP socket, standing in for the point-to-point radio
//! - [`load_node_config`]: a validated [`RuntimeConfig`] read from a JSON file
//!
//! ## Radio Parity
//!
//! UDP on a LAN is far more reliable than the radio link, but it has the same
//! shape: unordered datagrams, silent loss, no connection. The link protocol
//! runs unchanged on top of it. Datagrams larger than the radio limit are
//! refused on send so a host node can never emit a frame a board would drop.
//!
//! ## Example
//!
//! ```no_run
//! use hazardguard_connectors::{load_node_config, UdpTransport};
//! use hazardguard_core::Node;
//! use hazardguard_schemas::SensorNodeApp;
//!
//! let config = load_node_config("sensing.json")?;
//! let transport = UdpTransport::new("0.0.0.0:4210".parse()?);
//! let peer = "192.168.4.2:4210".parse()?;
//! let mut node = Node::new(config, transport, peer, SensorNodeApp::new())?;
//! node.tick(0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! `hazardguard-connectors/examples/udp_pair.rs` runs both nodes on the
//! loopback interface.
//!
//! [`RuntimeConfig`]: hazardguard_core::config::RuntimeConfig

pub mod config;
pub mod udp;

pub use config::load_node_config;
pub use udp::UdpTransport;

use hazardguard_core::errors::{ConfigError, TransportError};
use thiserror::Error;

/// Errors from host-side setup
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration in {path}: {source}")]
    Config { path: String, source: ConfigError },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}
