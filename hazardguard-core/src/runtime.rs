//! Node runtime: the run-loop tick
//!
//! [`Node`] owns every piece of mutable node state. The caller drives it by
//! calling [`Node::tick`] with the current time, as often as it likes; each
//! tick runs whatever is due, in a fixed order, and returns:
//!
//! ```text
//! tick(now)
//!  1. commands ....... manual SOS, injected readings, override release
//!  2. sensors ........ due read timers and in-flight conversions
//!  3. alarm .......... evaluation on the logic interval (or forced by SOS)
//!  4. link ........... LinkEndpoint::poll
//!  5. actuators ...... system alarm, then mirrored peer state
//!  6. diagnostics .... periodic summary
//! ```
//!
//! A failing task is recorded in the [`TickReport`]; the tasks after it
//! still run.

use alloc::boxed::Box;
use alloc::vec::Vec;

use heapless::Deque;
use serde::Serialize;

use crate::alarm::{AlarmEngine, ChannelAlarmState, ChannelId, Evaluation, Reading, SystemAlarm};
use crate::config::RuntimeConfig;
use crate::constants::{timers, MAX_CHANNELS};
use crate::errors::{ConfigError, TaskError};
use crate::link::{Delivery, EventReason, LinkEndpoint, LinkStats, PollReport, Transport};
use crate::mirror::PeerStateMirror;
use crate::scheduler::Scheduler;
use crate::time::Timestamp;
use crate::traits::{Actuator, Sensor, SnapshotSource};

#[cfg_attr(not(feature = "log"), allow(dead_code))]
const LOG: &str = "hazardguard::runtime";

const COMMAND_QUEUE_DEPTH: usize = 8;
const MAX_COMMANDS_PER_TICK: usize = 4;
const MAX_TASK_FAILURES: usize = MAX_CHANNELS + 4;

/// Operator input, from a button, a console or a test
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ManualCommand {
    /// Record a reading as if the sensor had produced it and hold off
    /// automatic reads of that channel; `None` uses the configured window
    InjectReading {
        channel: ChannelId,
        reading: Reading,
        hold_ms: Option<u32>,
    },
    /// Raise or clear the manual SOS latch
    Sos(bool),
    /// End an injection hold early
    ReleaseOverride(ChannelId),
}

/// Read-only state handed to [`SnapshotSource::snapshot`]
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    pub now: Timestamp,
    pub system: SystemAlarm,
    pub engine: &'a AlarmEngine,
    pub peer_stale: bool,
    pub stats: &'a LinkStats,
}

/// Which tick task failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Sensor(ChannelId),
    Link,
    Actuator,
    PeerActuator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskFailure {
    pub task: Task,
    pub error: TaskError,
}

/// Running totals, logged on the diagnostics interval
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub ticks: u32,
    pub commands: u32,
    pub readings: u32,
    pub sensor_failures: u32,
    pub evaluations: u32,
    pub link_errors: u32,
    pub actuator_failures: u32,
    pub events_queued: u32,
    pub dropped_commands: u32,
}

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub now: Timestamp,
    pub commands: u8,
    pub readings: u8,
    pub evaluation: Option<Evaluation>,
    pub link: PollReport,
    pub diagnostics: Option<Diagnostics>,
    pub failures: heapless::Vec<TaskFailure, MAX_TASK_FAILURES>,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, task: Task, error: TaskError) {
        let _ = self.failures.push(TaskFailure { task, error });
    }
}

struct SensorBinding {
    channel: ChannelId,
    interval_ms: u32,
    sensor: Box<dyn Sensor>,
    in_flight: bool,
}

/// Scheduler timer that paces reads of `channel`
pub const fn read_timer(channel: ChannelId) -> &'static str {
    match channel {
        ChannelId::Gas => timers::READ_GAS,
        ChannelId::Temperature => timers::READ_TEMPERATURE,
        ChannelId::Vitals => timers::READ_VITALS,
        ChannelId::Presence => timers::READ_PRESENCE,
    }
}

/// All mutable state of one node
pub struct Node<T: Transport, A: Actuator + SnapshotSource> {
    config: RuntimeConfig,
    scheduler: Scheduler,
    engine: AlarmEngine,
    link: LinkEndpoint<T::Address>,
    transport: T,
    mirror: PeerStateMirror<A::Peer>,
    sensors: Vec<SensorBinding>,
    commands: Deque<ManualCommand, COMMAND_QUEUE_DEPTH>,
    app: A,
    diagnostics: Diagnostics,
}

impl<T: Transport, A: Actuator + SnapshotSource> Node<T, A> {
    pub fn new(config: RuntimeConfig, transport: T, peer: T::Address, app: A) -> Result<Self, ConfigError> {
        let engine = AlarmEngine::new(&config.alarm_channels())?;
        let link = LinkEndpoint::new(config.role(), peer, *config.link_timings());
        log_info!(
            target: LOG,
            "node ready: {:?}, {} channel(s)",
            config.role(),
            config.channels().len()
        );
        Ok(Self {
            config,
            scheduler: Scheduler::new(),
            engine,
            link,
            transport,
            mirror: PeerStateMirror::new(),
            sensors: Vec::new(),
            commands: Deque::new(),
            app,
            diagnostics: Diagnostics::default(),
        })
    }

    /// Attach the sensor for a configured channel
    pub fn add_sensor(&mut self, channel: ChannelId, sensor: impl Sensor + 'static) -> Result<(), ConfigError> {
        let settings = self
            .config
            .channel(channel)
            .ok_or(ConfigError::UnknownChannel {
                channel: channel.as_str(),
            })?;
        if self.sensors.iter().any(|binding| binding.channel == channel) {
            return Err(ConfigError::DuplicateChannel {
                channel: channel.as_str(),
            });
        }
        self.sensors.push(SensorBinding {
            channel,
            interval_ms: settings.read_interval_ms,
            sensor: Box::new(sensor),
            in_flight: false,
        });
        Ok(())
    }

    /// Queue a command for the next tick; false if the queue is full
    pub fn submit(&mut self, command: ManualCommand) -> bool {
        if self.commands.push_back(command).is_err() {
            self.diagnostics.dropped_commands += 1;
            log_warn!(target: LOG, "command queue full, dropping {:?}", command);
            return false;
        }
        true
    }

    /// Queue an application event for immediate publication
    pub fn raise_event(&mut self, code: u8, now: Timestamp) {
        self.diagnostics.events_queued += 1;
        self.link.queue_event(EventReason::Application(code), now);
    }

    pub fn tick(&mut self, now: Timestamp) -> TickReport {
        let mut report = TickReport {
            now,
            ..TickReport::default()
        };
        self.diagnostics.ticks += 1;

        let force_evaluation = self.run_commands(now, &mut report);
        self.read_sensors(now, &mut report);
        self.evaluate(now, force_evaluation, &mut report);
        self.poll_link(now, &mut report);
        self.drive_actuators(now, &mut report);
        self.report_diagnostics(now, &mut report);

        report
    }

    /// Returns true when the alarm must be re-evaluated this tick
    fn run_commands(&mut self, now: Timestamp, report: &mut TickReport) -> bool {
        let mut force = false;
        for _ in 0..MAX_COMMANDS_PER_TICK {
            let Some(command) = self.commands.pop_front().or_else(|| self.app.poll_command()) else {
                break;
            };
            report.commands += 1;
            self.diagnostics.commands += 1;

            match command {
                ManualCommand::Sos(active) => {
                    if self.engine.set_manual(active) {
                        self.diagnostics.events_queued += 1;
                        self.link.queue_event(EventReason::Manual { active }, now);
                        force = true;
                    }
                }
                ManualCommand::InjectReading {
                    channel,
                    reading,
                    hold_ms,
                } => {
                    if !self.engine.record_reading(channel, reading, now) {
                        log_warn!(target: LOG, "ignoring injected reading for unconfigured channel {}", channel);
                        continue;
                    }
                    let window = hold_ms.unwrap_or(self.config.schedule().manual_override_ms);
                    self.scheduler.mark_override(read_timer(channel), window, now);
                    log_info!(target: LOG, "{} reading injected, automatic reads held for {} ms", channel, window);
                }
                ManualCommand::ReleaseOverride(channel) => {
                    if self.scheduler.clear_override(read_timer(channel)) {
                        log_info!(target: LOG, "{} override released", channel);
                    }
                }
            }
        }
        force
    }

    fn read_sensors(&mut self, now: Timestamp, report: &mut TickReport) {
        for binding in self.sensors.iter_mut() {
            let timer = read_timer(binding.channel);
            if self.scheduler.override_active(timer, now) {
                continue;
            }
            if !binding.in_flight && !self.scheduler.elapsed(timer, binding.interval_ms, now) {
                continue;
            }

            match binding.sensor.poll_read(now) {
                Ok(Some(reading)) => {
                    binding.in_flight = false;
                    self.engine.record_reading(binding.channel, reading, now);
                    report.readings += 1;
                    self.diagnostics.readings += 1;
                }
                Ok(None) => {
                    binding.in_flight = false;
                    self.engine.record_missing(binding.channel);
                }
                Err(nb::Error::WouldBlock) => binding.in_flight = true,
                Err(nb::Error::Other(error)) => {
                    binding.in_flight = false;
                    self.engine.record_missing(binding.channel);
                    self.diagnostics.sensor_failures += 1;
                    log_warn!(target: LOG, "{} read failed: {}", binding.channel, error);
                    report.fail(Task::Sensor(binding.channel), error.into());
                }
            }
        }
    }

    fn evaluate(&mut self, now: Timestamp, force: bool, report: &mut TickReport) {
        let due = self
            .scheduler
            .elapsed(timers::LOGIC, self.config.schedule().logic_interval_ms, now);
        if !due && !force {
            return;
        }

        let evaluation = self.engine.evaluate(now);
        self.diagnostics.evaluations += 1;
        for change in &evaluation.transitions {
            self.diagnostics.events_queued += 1;
            self.link.queue_event(EventReason::Level(*change), now);
        }
        report.evaluation = Some(evaluation);
    }

    fn poll_link(&mut self, now: Timestamp, report: &mut TickReport) {
        let view = NodeView {
            now,
            system: self.engine.system(),
            engine: &self.engine,
            peer_stale: self.mirror.is_stale(),
            stats: self.link.stats(),
        };
        let local = self.app.snapshot(&view);

        let poll = self
            .link
            .poll(&mut self.transport, &mut self.scheduler, now, &local, &mut self.mirror);

        for delivery in &poll.deliveries {
            match delivery {
                Delivery::Delivered { seq, reason } => {
                    log_debug!(target: LOG, "event {} delivered ({:?})", seq, reason);
                }
                Delivery::Failed { seq, reason } => {
                    log_warn!(target: LOG, "event {} not acknowledged ({:?})", seq, reason);
                }
            }
        }
        if let Some(error) = poll.error {
            self.diagnostics.link_errors += 1;
            report.fail(Task::Link, error);
        }
        report.link = poll;
    }

    fn drive_actuators(&mut self, now: Timestamp, report: &mut TickReport) {
        if let Err(error) = self.app.apply(&self.engine.system(), now) {
            self.diagnostics.actuator_failures += 1;
            log_warn!(target: LOG, "actuator failed: {}", error);
            report.fail(Task::Actuator, error.into());
        }
        if let Err(error) = self.app.apply_peer_snapshot(&self.mirror, now) {
            self.diagnostics.actuator_failures += 1;
            log_warn!(target: LOG, "peer actuator failed: {}", error);
            report.fail(Task::PeerActuator, error.into());
        }
    }

    fn report_diagnostics(&mut self, now: Timestamp, report: &mut TickReport) {
        let interval = self.config.schedule().diagnostics_interval_ms;
        if !self.scheduler.elapsed(timers::DIAGNOSTICS, interval, now) {
            return;
        }
        log_info!(
            target: LOG,
            "system {} | link {} peer {} | tx {} rx {} dup {} bad {} | failed events {} | sensor errors {}",
            self.engine.system().level,
            if self.link.is_up() { "up" } else { "down" },
            if self.mirror.is_stale() { "stale" } else { "fresh" },
            self.link.stats().frames_sent,
            self.link.stats().frames_received,
            self.link.stats().duplicates,
            self.link.stats().malformed + self.link.stats().version_mismatches,
            self.link.stats().delivery_failures,
            self.diagnostics.sensor_failures
        );
        report.diagnostics = Some(self.diagnostics);
    }

    pub fn channel_state(&self, channel: ChannelId) -> Option<&ChannelAlarmState> {
        self.engine.channel_state(channel)
    }

    pub fn system(&self) -> SystemAlarm {
        self.engine.system()
    }

    pub fn engine(&self) -> &AlarmEngine {
        &self.engine
    }

    pub fn mirror(&self) -> &PeerStateMirror<A::Peer> {
        &self.mirror
    }

    pub fn link(&self) -> &LinkEndpoint<T::Address> {
        &self.link
    }

    pub fn link_stats(&self) -> &LinkStats {
        self.link.stats()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Direct access for application-defined timers
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Shorthand for [`Scheduler::elapsed`]
    pub fn elapsed(&mut self, name: &'static str, interval: u32, now: Timestamp) -> bool {
        self.scheduler.elapsed(name, interval, now)
    }

    /// Shorthand for [`Scheduler::mark_override`]
    pub fn mark_override(&mut self, name: &'static str, window: u32, now: Timestamp) -> bool {
        self.scheduler.mark_override(name, window, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::AlarmLevel;
    use crate::config::NodeConfig;
    use crate::errors::{ActuatorError, SensorError};
    use crate::link::{MemoryTransport, Payload};
    use crate::sensors::ScriptedSensor;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Beacon {
        level: AlarmLevel,
    }

    impl Payload for Beacon {
        const SCHEMA_VERSION: u16 = 1;
    }

    #[derive(Default)]
    struct Recorder {
        applied: Vec<SystemAlarm>,
        fail_apply: bool,
        button: Option<ManualCommand>,
    }

    impl Actuator for Recorder {
        type Peer = Beacon;

        fn apply(&mut self, alarm: &SystemAlarm, _now: Timestamp) -> Result<(), ActuatorError> {
            if self.fail_apply {
                return Err(ActuatorError::Failed { reason: "buzzer" });
            }
            self.applied.push(*alarm);
            Ok(())
        }

        fn apply_peer_snapshot(&mut self, _: &PeerStateMirror<Beacon>, _: Timestamp) -> Result<(), ActuatorError> {
            Ok(())
        }

        fn poll_command(&mut self) -> Option<ManualCommand> {
            self.button.take()
        }
    }

    impl SnapshotSource for Recorder {
        type Payload = Beacon;

        fn snapshot(&mut self, view: &NodeView<'_>) -> Beacon {
            Beacon {
                level: view.system.level,
            }
        }
    }

    fn sensing_node() -> Node<MemoryTransport, Recorder> {
        let (local, _remote) = MemoryTransport::pair("sensor", "actuator");
        let config = NodeConfig::sensing_node().validate().unwrap();
        Node::new(config, local, "actuator", Recorder::default()).unwrap()
    }

    #[test]
    fn sos_forces_danger_in_the_same_tick() {
        let mut node = sensing_node();
        node.tick(0);

        node.submit(ManualCommand::Sos(true));
        let report = node.tick(50);

        assert_eq!(report.commands, 1);
        assert!(report.evaluation.is_some());
        assert_eq!(node.system().level, AlarmLevel::Danger);
        assert_eq!(node.app().applied.last().map(|alarm| alarm.level), Some(AlarmLevel::Danger));
    }

    #[test]
    fn button_commands_are_polled() {
        let mut node = sensing_node();
        node.app_mut().button = Some(ManualCommand::Sos(true));
        node.tick(0);
        assert!(node.engine().manual_active());
    }

    #[test]
    fn injected_reading_holds_off_sensor() {
        let mut node = sensing_node();
        node.add_sensor(ChannelId::Gas, ScriptedSensor::constant(Reading::Scalar(5.0)))
            .unwrap();

        node.submit(ManualCommand::InjectReading {
            channel: ChannelId::Gas,
            reading: Reading::Scalar(400.0),
            hold_ms: Some(10_000),
        });
        node.tick(0);
        node.tick(5_000);
        assert_eq!(node.engine().reading(ChannelId::Gas), Some(Reading::Scalar(400.0)));

        node.tick(10_000);
        assert_eq!(node.engine().reading(ChannelId::Gas), Some(Reading::Scalar(5.0)));
    }

    #[test]
    fn failing_task_does_not_stop_the_tick() {
        let mut node = sensing_node();
        node.add_sensor(
            ChannelId::Temperature,
            ScriptedSensor::new(alloc::vec![crate::sensors::ScriptStep {
                at_ms: 0,
                outcome: crate::sensors::StepOutcome::Fail(SensorError::Timeout),
            }]),
        )
        .unwrap();
        node.app_mut().fail_apply = true;

        let report = node.tick(0);

        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].task, Task::Sensor(ChannelId::Temperature));
        assert_eq!(report.failures[1].task, Task::Actuator);
        assert!(report.evaluation.is_some());
        assert!(report.link.link_up);
        assert!(report.diagnostics.is_some());
    }

    #[test]
    fn sensor_for_unknown_channel_rejected() {
        let (local, _remote) = MemoryTransport::pair("actuator", "sensor");
        let config = NodeConfig::actuating_node().validate().unwrap();
        let mut node = Node::new(config, local, "sensor", Recorder::default()).unwrap();

        assert_eq!(
            node.add_sensor(ChannelId::Gas, ScriptedSensor::constant(Reading::Scalar(1.0))),
            Err(ConfigError::UnknownChannel { channel: "co" })
        );
    }
}
