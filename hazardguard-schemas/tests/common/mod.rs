//! Two reference nodes wired back to back over the in-memory transport

#![allow(dead_code)]

use hazardguard_core::config::NodeConfig;
use hazardguard_core::link::MemoryTransport;
use hazardguard_core::Node;
use hazardguard_schemas::{ActuatorNodeApp, SensorNodeApp};

pub const SENSING: &str = "sensing";
pub const ACTUATING: &str = "actuating";

pub type SensingNode = Node<MemoryTransport, SensorNodeApp>;
pub type ActuatingNode = Node<MemoryTransport, ActuatorNodeApp>;

pub fn node_pair() -> (SensingNode, ActuatingNode) {
    let (a, b) = MemoryTransport::pair(SENSING, ACTUATING);
    let sensing = NodeConfig::sensing_node().validate().expect("preset is valid");
    let actuating = NodeConfig::actuating_node().validate().expect("preset is valid");
    (
        Node::new(sensing, a, ACTUATING, SensorNodeApp::new()).expect("sensing node builds"),
        Node::new(actuating, b, SENSING, ActuatorNodeApp::new()).expect("actuating node builds"),
    )
}

/// Tick both nodes every `step` ms over `[from, to]`, sampling the SOS
/// button of the actuating node from `button` first
pub fn run(
    sensing: &mut SensingNode,
    actuating: &mut ActuatingNode,
    from: u32,
    to: u32,
    step: u32,
    mut button: impl FnMut(u32) -> bool,
) {
    let mut now = from;
    while now <= to {
        actuating.app_mut().button(button(now), now);
        sensing.tick(now);
        actuating.tick(now);
        now += step;
    }
}

pub fn released(_now: u32) -> bool {
    false
}
