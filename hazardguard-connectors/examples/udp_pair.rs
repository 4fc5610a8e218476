//! Both HazardGuard nodes on the loopback interface
//!
//! The sensing node replays a CO leak; press Ctrl-C to stop early.
//!
//! ```text
//! RUST_LOG=info cargo run -p hazardguard-connectors --example udp_pair
//! ```

use std::thread;
use std::time::Duration;

use hazardguard_connectors::UdpTransport;
use hazardguard_core::alarm::{ChannelId, Reading};
use hazardguard_core::config::NodeConfig;
use hazardguard_core::sensors::{ScriptStep, ScriptedSensor};
use hazardguard_core::time::MonotonicClock;
use hazardguard_core::{Node, TimeSource};
use hazardguard_schemas::{ActuatorNodeApp, SensorNodeApp};

const RUN_FOR_MS: u32 = 70_000;
const TICK: Duration = Duration::from_millis(20);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let sensing_socket = UdpTransport::bound("127.0.0.1:0".parse()?)?;
    let actuating_socket = UdpTransport::bound("127.0.0.1:0".parse()?)?;
    let sensing_addr = sensing_socket.local_addr().ok_or_else(closed)?;
    let actuating_addr = actuating_socket.local_addr().ok_or_else(closed)?;

    let mut sensing = Node::new(
        NodeConfig::sensing_node().validate()?,
        sensing_socket,
        actuating_addr,
        SensorNodeApp::new(),
    )?;
    let mut actuating = Node::new(
        NodeConfig::actuating_node().validate()?,
        actuating_socket,
        sensing_addr,
        ActuatorNodeApp::new(),
    )?;

    let leak = ScriptedSensor::new(vec![
        ScriptStep::value(0, Reading::Scalar(8.0)),
        ScriptStep::value(5_000, Reading::Scalar(140.0)),
        ScriptStep::value(45_000, Reading::Scalar(8.0)),
    ]);
    sensing.add_sensor(ChannelId::Gas, leak)?;
    sensing.add_sensor(ChannelId::Temperature, ScriptedSensor::constant(Reading::Scalar(22.5)))?;

    let clock = MonotonicClock::new();
    let mut shown = None;
    loop {
        let now = clock.now();
        sensing.tick(now);
        actuating.tick(now);

        let outputs = actuating.app().outputs();
        if shown.as_ref() != Some(outputs) {
            log::info!(
                "t={:>6} ms  sensing={}  leds g/b/r={:?}/{:?}/{:?}  buzzer={:?}  lcd=[{}|{}]",
                now,
                sensing.system().level,
                outputs.leds.green,
                outputs.leds.blue,
                outputs.leds.red,
                outputs.buzzer,
                outputs.display.line1(),
                outputs.display.line2(),
            );
            shown = Some(outputs.clone());
        }

        if now >= RUN_FOR_MS {
            break;
        }
        thread::sleep(TICK);
    }

    let stats = sensing.link_stats();
    log::info!(
        "done: sent={} received={} delivered={} failures={}",
        stats.frames_sent,
        stats.frames_received,
        stats.delivered,
        stats.delivery_failures
    );
    Ok(())
}

fn closed() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::NotConnected, "socket closed")
}
