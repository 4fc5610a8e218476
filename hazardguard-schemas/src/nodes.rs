//! Reference node applications
//!
//! [`SensorNodeApp`] and [`ActuatorNodeApp`] are the `A` in
//! `Node<T, A>` for the two boards. They only keep the logical state that
//! travels over the link; a board port reads [`ActuatorNodeApp::outputs`]
//! and drives the real pins from it.
//!
//! SOS flows in a loop: a gesture on the actuating board latches SOS there,
//! the latch is published as `"O"`, and the sensing node follows it with
//! `ManualCommand::Sos` so its own snapshot (and every alarm event) says
//! `"M": true` with source `manual`. Only a latch raised that way is
//! released when the peer clears; an SOS the sensing node latched itself
//! stays until it is cleared locally.

use alloc::collections::VecDeque;

use hazardguard_core::alarm::{AlarmLevel, AlarmSource, SystemAlarm};
use hazardguard_core::errors::ActuatorError;
use hazardguard_core::mirror::PeerStateMirror;
use hazardguard_core::runtime::{ManualCommand, NodeView};
use hazardguard_core::time::Timestamp;
use hazardguard_core::traits::{Actuator, SnapshotSource};

use crate::actuator::{ActuatorSnapshot, Audio, Buzzer, DisplayLines, LedMode, Leds, Servo};
use crate::sensor::{AlarmPanel, Buttons, SensorSnapshot};
use crate::sos::{Gesture, SosDetector};

/// Servo angle while a danger alarm is active
pub const SERVO_DANGER_DEG: u8 = 180;
pub const SERVO_REST_DEG: u8 = 0;

/// Application side of the sensing node
#[derive(Debug, Default)]
pub struct SensorNodeApp {
    buttons: Buttons,
    last_alarm: SystemAlarm,
    peer_sos: bool,
    // The local latch was raised by following the peer, not by this board
    sos_from_peer: bool,
    commands: VecDeque<ManualCommand>,
}

impl SensorNodeApp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest sampled button levels, published with the next snapshot
    pub fn set_buttons(&mut self, buttons: Buttons) {
        self.buttons = buttons;
    }

    pub fn last_alarm(&self) -> SystemAlarm {
        self.last_alarm
    }

    /// Whether the actuating board currently holds an SOS latch
    pub fn peer_sos(&self) -> bool {
        self.peer_sos
    }
}

impl Actuator for SensorNodeApp {
    type Peer = ActuatorSnapshot;

    fn apply(&mut self, alarm: &SystemAlarm, _now: Timestamp) -> Result<(), ActuatorError> {
        self.last_alarm = *alarm;
        Ok(())
    }

    fn apply_peer_snapshot(
        &mut self,
        mirror: &PeerStateMirror<ActuatorSnapshot>,
        _now: Timestamp,
    ) -> Result<(), ActuatorError> {
        // A stale peer keeps its last latch; only fresh frames change it
        if let Some(peer) = mirror.fresh() {
            if peer.sos != self.peer_sos {
                self.peer_sos = peer.sos;
                if peer.sos {
                    if self.last_alarm.source != Some(AlarmSource::Manual) {
                        self.sos_from_peer = true;
                        self.commands.push_back(ManualCommand::Sos(true));
                    }
                } else if core::mem::take(&mut self.sos_from_peer) {
                    self.commands.push_back(ManualCommand::Sos(false));
                }
            }
        }
        Ok(())
    }

    fn poll_command(&mut self) -> Option<ManualCommand> {
        self.commands.pop_front()
    }
}

impl SnapshotSource for SensorNodeApp {
    type Payload = SensorSnapshot;

    fn snapshot(&mut self, view: &NodeView<'_>) -> SensorSnapshot {
        SensorSnapshot::new(view.engine, view.system, self.buttons)
    }
}

/// Application side of the actuating node
#[derive(Debug)]
pub struct ActuatorNodeApp {
    local: SystemAlarm,
    outputs: ActuatorSnapshot,
    sos: SosDetector,
    commands: VecDeque<ManualCommand>,
}

impl Default for ActuatorNodeApp {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorNodeApp {
    pub fn new() -> Self {
        Self {
            local: SystemAlarm::NORMAL,
            outputs: render_outputs(&SystemAlarm::NORMAL, None),
            sos: SosDetector::new(),
            commands: VecDeque::new(),
        }
    }

    /// Sample the SOS button; queues a manual command on a gesture
    pub fn button(&mut self, pressed: bool, now: Timestamp) -> Option<Gesture> {
        let gesture = self.sos.update(pressed, now)?;
        let active = gesture == Gesture::SosRaised;
        self.commands.push_back(ManualCommand::Sos(active));
        Some(gesture)
    }

    /// Logical output state after the last tick
    pub fn outputs(&self) -> &ActuatorSnapshot {
        &self.outputs
    }
}

impl Actuator for ActuatorNodeApp {
    type Peer = SensorSnapshot;

    fn apply(&mut self, alarm: &SystemAlarm, _now: Timestamp) -> Result<(), ActuatorError> {
        self.local = *alarm;
        Ok(())
    }

    fn apply_peer_snapshot(
        &mut self,
        mirror: &PeerStateMirror<SensorSnapshot>,
        _now: Timestamp,
    ) -> Result<(), ActuatorError> {
        self.outputs = render_outputs(&self.local, mirror.fresh().map(|peer| &peer.alarm));
        Ok(())
    }

    fn poll_command(&mut self) -> Option<ManualCommand> {
        self.commands.pop_front()
    }
}

impl SnapshotSource for ActuatorNodeApp {
    type Payload = ActuatorSnapshot;

    fn snapshot(&mut self, _view: &NodeView<'_>) -> ActuatorSnapshot {
        self.outputs.clone()
    }
}

/// Output state for the local alarm and the fresh peer alarm, if any
///
/// The more severe of the two wins; a local SOS always shows. Without fresh
/// sensing data and without SOS the board signals the lost link instead of
/// pretending everything is normal.
pub fn render_outputs(local: &SystemAlarm, peer: Option<&AlarmPanel>) -> ActuatorSnapshot {
    let sos = local.source == Some(AlarmSource::Manual);

    let shown = match peer {
        Some(panel) if !sos && panel.level > local.level => panel.system(),
        Some(_) => *local,
        None if sos => *local,
        None => return link_lost(),
    };

    let source = shown.source.map_or("", AlarmSource::as_str);
    let mut outputs = match shown.level {
        AlarmLevel::Normal => ActuatorSnapshot {
            leds: Leds {
                green: LedMode::On,
                ..Leds::default()
            },
            servo: Servo {
                angle: Some(SERVO_REST_DEG),
            },
            display: DisplayLines::fit("ALL CLEAR", ""),
            ..ActuatorSnapshot::default()
        },
        AlarmLevel::Warning => ActuatorSnapshot {
            leds: Leds {
                red: LedMode::Blinking,
                ..Leds::default()
            },
            servo: Servo {
                angle: Some(SERVO_REST_DEG),
            },
            display: DisplayLines::fit("WARNING", source),
            ..ActuatorSnapshot::default()
        },
        AlarmLevel::Danger => ActuatorSnapshot {
            leds: Leds {
                red: LedMode::On,
                ..Leds::default()
            },
            servo: Servo {
                angle: Some(SERVO_DANGER_DEG),
            },
            display: DisplayLines::fit("DANGER", source),
            buzzer: Buzzer::On,
            audio: Audio::Play,
            ..ActuatorSnapshot::default()
        },
    };
    outputs.sos = sos;
    outputs
}

fn link_lost() -> ActuatorSnapshot {
    ActuatorSnapshot {
        leds: Leds {
            blue: LedMode::Blinking,
            ..Leds::default()
        },
        servo: Servo {
            angle: Some(SERVO_REST_DEG),
        },
        display: DisplayLines::fit("NO SENSOR LINK", "waiting"),
        ..ActuatorSnapshot::default()
    }
}
