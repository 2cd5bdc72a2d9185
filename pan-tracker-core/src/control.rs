//! Control loop
//!
//! Ties the selector, the bearing normalizer and the calibration sequencer to
//! the inbound event streams. Every event is handled to completion before the
//! next one, and all commands it produces are returned (or transmitted) in
//! order.

use crate::bearing::command_angle;
use crate::calibration::{CalibrationSequencer, CalibrationState};
use crate::config::{CommandGate, ControlConfig};
use crate::selector::{SelectionOutcome, SelectorState, TargetSelector};
use crate::types::{MotorCommand, Result, SubjectId, TrackedBatch};

/// Decimals used for test-mode angles
pub const TEST_MODE_PRECISION: usize = 1;

/// Inbound event for the control loop
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// The zero-point delay has run out
    DelayElapsed,
    /// The serial link is open for writing
    TransportOpened,
    /// A batch of tracked subjects
    Batch(TrackedBatch),
    /// Explicit target id
    Override(SubjectId),
    /// Test-mode tick carrying a random angle in [-180, 180]
    TestTick(f64),
}

/// Outbound seam for motor commands
pub trait CommandSink {
    fn transmit(&mut self, command: MotorCommand) -> Result<()>;
}

impl CommandSink for Vec<MotorCommand> {
    fn transmit(&mut self, command: MotorCommand) -> Result<()> {
        self.push(command);
        Ok(())
    }
}

/// The control loop
#[derive(Debug)]
pub struct ControlLoop {
    config: ControlConfig,
    selector: TargetSelector,
    calibration: CalibrationSequencer,
}

impl ControlLoop {
    /// Create a control loop and start calibration
    pub fn new(config: ControlConfig) -> Self {
        let mut calibration = CalibrationSequencer::new(config.wait_to_zero_ms);
        calibration.start();
        Self {
            config,
            selector: TargetSelector::new(),
            calibration,
        }
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn selector_state(&self) -> SelectorState {
        self.selector.state()
    }

    pub fn calibration_state(&self) -> CalibrationState {
        self.calibration.state()
    }

    /// Handle one event and return the commands to transmit, in order
    pub fn handle(&mut self, event: ControlEvent) -> Vec<MotorCommand> {
        let mut commands = Vec::new();
        // Collecting into a Vec cannot fail
        let _ = self.dispatch(event, &mut commands);
        commands
    }

    /// Handle one event and transmit its commands through `sink`
    ///
    /// Stops at the first transmit error; the event itself has already been
    /// applied to the loop state. The zero point only counts as set once the
    /// sink has accepted it.
    pub fn dispatch<S: CommandSink>(&mut self, event: ControlEvent, sink: &mut S) -> Result<()> {
        let mut commands = Vec::new();

        match event {
            ControlEvent::DelayElapsed => {
                if let Some(zero) = self.calibration.delay_elapsed() {
                    return self.send_zero(zero, sink);
                }
            }
            ControlEvent::TransportOpened => {
                if let Some(zero) = self.calibration.link_opened() {
                    return self.send_zero(zero, sink);
                }
            }
            ControlEvent::Batch(batch) => self.on_batch(&batch, &mut commands),
            ControlEvent::Override(id) => {
                self.selector.override_target(id);
            }
            ControlEvent::TestTick(angle) => {
                if self.config.test_mode && self.may_transmit() {
                    log::debug!("sending RANDOM angle {:.1}", angle);
                    commands.push(MotorCommand::fixed(angle, TEST_MODE_PRECISION));
                }
            }
        }

        for command in commands {
            sink.transmit(command)?;
        }
        Ok(())
    }

    fn send_zero<S: CommandSink>(&mut self, zero: MotorCommand, sink: &mut S) -> Result<()> {
        sink.transmit(zero)?;
        self.calibration.acknowledge_sent();
        Ok(())
    }

    fn on_batch(&mut self, batch: &TrackedBatch, commands: &mut Vec<MotorCommand>) {
        let target = match self.selector.resolve(batch) {
            SelectionOutcome::Confirmed(id) | SelectionOutcome::Reacquired(id) => id,
            SelectionOutcome::NoMatch => return,
        };

        if !self.may_transmit() {
            log::trace!("Holding commands for target {} ({})", target, self.calibration.state());
            return;
        }

        for subject in batch.matching(target) {
            let angle = command_angle(subject.bearing, self.config.flip_direction);
            log::debug!(
                "currentTargetId={} id={} bearing={} angle={}",
                target,
                subject.id,
                subject.bearing,
                angle
            );
            commands.push(MotorCommand::angle(angle));
        }
    }

    /// Whether subject and test-mode commands may go out right now
    fn may_transmit(&self) -> bool {
        if !self.calibration.link_open() {
            return false;
        }
        match self.config.command_gate {
            CommandGate::Passthrough => true,
            CommandGate::UntilZeroed => self.calibration.is_running(),
        }
    }
}
