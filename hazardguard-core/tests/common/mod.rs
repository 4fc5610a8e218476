//! Shared fixtures for the integration tests
//!
//! - [`Beacon`]: a tiny payload for both directions of the link
//! - [`LinkHarness`]: one endpoint on a memory transport plus a scripted far end
//! - [`TestApp`]: actuator/snapshot collaborator that records what it was told
//! - [`node_pair`]: sensing and actuating node wired back to back

#![allow(dead_code)]

pub mod scenarios;

use hazardguard_core::alarm::{AlarmLevel, SystemAlarm};
use hazardguard_core::config::NodeConfig;
use hazardguard_core::errors::ActuatorError;
use hazardguard_core::link::{
    self, LinkEndpoint, LinkMessage, LinkTimings, MemoryTransport, MessageType, Payload, PollReport, Role,
};
use hazardguard_core::mirror::PeerStateMirror;
use hazardguard_core::runtime::{ManualCommand, Node, NodeView};
use hazardguard_core::scheduler::Scheduler;
use hazardguard_core::time::Timestamp;
use hazardguard_core::traits::{Actuator, SnapshotSource};
use serde::{Deserialize, Serialize};

pub const LOCAL: &str = "node-a";
pub const REMOTE: &str = "node-b";

pub const SENSING: &str = "sensing";
pub const ACTUATING: &str = "actuating";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beacon {
    pub n: u32,
    pub level: AlarmLevel,
}

impl Beacon {
    pub fn new(n: u32) -> Self {
        Self {
            n,
            level: AlarmLevel::Normal,
        }
    }
}

impl Payload for Beacon {
    const SCHEMA_VERSION: u16 = 1;
}

pub fn data(id: u32, n: u32) -> LinkMessage<Beacon> {
    LinkMessage::new(MessageType::Data, id, 0, Beacon::new(n))
}

pub fn event(id: u32, n: u32) -> LinkMessage<Beacon> {
    LinkMessage::new(MessageType::Event, id, 0, Beacon::new(n))
}

pub fn ack(id: u32, reply_to: u32, n: u32) -> LinkMessage<Beacon> {
    LinkMessage::ack(id, reply_to, 0, Beacon::new(n))
}

/// One endpoint under test; the harness plays the far end by hand
pub struct LinkHarness {
    pub endpoint: LinkEndpoint<&'static str>,
    pub transport: MemoryTransport,
    pub far: MemoryTransport,
    pub scheduler: Scheduler,
    pub mirror: PeerStateMirror<Beacon>,
    pub local: Beacon,
}

impl LinkHarness {
    pub fn new(role: Role) -> Self {
        Self::with_timings(role, LinkTimings::default())
    }

    pub fn with_timings(role: Role, timings: LinkTimings) -> Self {
        let (transport, far) = MemoryTransport::pair(LOCAL, REMOTE);
        Self {
            endpoint: LinkEndpoint::new(role, REMOTE, timings),
            transport,
            far,
            scheduler: Scheduler::new(),
            mirror: PeerStateMirror::new(),
            local: Beacon::new(0),
        }
    }

    pub fn poll(&mut self, now: Timestamp) -> PollReport {
        self.endpoint
            .poll(&mut self.transport, &mut self.scheduler, now, &self.local, &mut self.mirror)
    }

    /// Deliver a frame as if the far end had sent it
    pub fn inject(&self, message: &LinkMessage<Beacon>) {
        let bytes = link::encode(message).expect("test frame encodes");
        self.transport.inject(REMOTE, &bytes);
    }

    /// Everything the endpoint sent since the last call, decoded
    pub fn sent(&self) -> Vec<LinkMessage<Beacon>> {
        self.far
            .drain()
            .into_iter()
            .map(|datagram| link::decode(&datagram.bytes).expect("endpoint sends valid frames"))
            .collect()
    }
}

/// Records everything the runtime asks of it
#[derive(Debug, Default)]
pub struct TestApp {
    pub applied: Vec<SystemAlarm>,
    pub peer: Option<Beacon>,
    pub peer_stale: bool,
    pub commands: Vec<ManualCommand>,
}

impl Actuator for TestApp {
    type Peer = Beacon;

    fn apply(&mut self, alarm: &SystemAlarm, _now: Timestamp) -> Result<(), ActuatorError> {
        if self.applied.last() != Some(alarm) {
            self.applied.push(*alarm);
        }
        Ok(())
    }

    fn apply_peer_snapshot(&mut self, mirror: &PeerStateMirror<Beacon>, _now: Timestamp) -> Result<(), ActuatorError> {
        self.peer = mirror.snapshot().cloned();
        self.peer_stale = mirror.is_stale();
        Ok(())
    }

    fn poll_command(&mut self) -> Option<ManualCommand> {
        self.commands.pop()
    }
}

impl SnapshotSource for TestApp {
    type Payload = Beacon;

    fn snapshot(&mut self, view: &NodeView<'_>) -> Beacon {
        Beacon {
            n: view.stats.frames_sent,
            level: view.system.level,
        }
    }
}

pub type TestNode = Node<MemoryTransport, TestApp>;

pub fn sensing_node(transport: MemoryTransport) -> TestNode {
    let config = NodeConfig::sensing_node().validate().expect("preset is valid");
    Node::new(config, transport, ACTUATING, TestApp::default()).expect("node builds")
}

pub fn actuating_node(transport: MemoryTransport) -> TestNode {
    let config = NodeConfig::actuating_node().validate().expect("preset is valid");
    Node::new(config, transport, SENSING, TestApp::default()).expect("node builds")
}

/// Sensing and actuating node connected back to back
pub fn node_pair() -> (TestNode, TestNode) {
    let (a, b) = MemoryTransport::pair(SENSING, ACTUATING);
    (sensing_node(a), actuating_node(b))
}

/// Tick both nodes every `step` ms over `[from, to]`
pub fn run_pair(sensing: &mut TestNode, actuating: &mut TestNode, from: u32, to: u32, step: u32) {
    let mut now = from;
    while now <= to {
        sensing.tick(now);
        actuating.tick(now);
        now += step;
    }
}
