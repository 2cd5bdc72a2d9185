//! Startup calibration sequencing
//!
//! Holds off the zero-point command until the operator delay has elapsed and
//! the serial link has reported open. The two conditions are independent and
//! may be satisfied in either order. The sequencer does no I/O or timing of
//! its own: the caller feeds it the two signals and transmits what it returns.

use crate::types::MotorCommand;
use std::fmt;

/// Calibration phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    Idle,
    /// Waiting for the delay and the link
    AwaitingZero,
    /// Zero command handed out, not yet acknowledged as written
    ZeroSent,
    Running,
}

impl fmt::Display for CalibrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationState::Idle => write!(f, "Idle"),
            CalibrationState::AwaitingZero => write!(f, "AwaitingZero"),
            CalibrationState::ZeroSent => write!(f, "ZeroSent"),
            CalibrationState::Running => write!(f, "Running"),
        }
    }
}

/// One-shot zero-point sequencer
#[derive(Debug)]
pub struct CalibrationSequencer {
    state: CalibrationState,
    wait_to_zero_ms: u64,
    delay_elapsed: bool,
    link_open: bool,
}

impl CalibrationSequencer {
    pub fn new(wait_to_zero_ms: u64) -> Self {
        Self {
            state: CalibrationState::Idle,
            wait_to_zero_ms,
            delay_elapsed: false,
            link_open: false,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn wait_to_zero_ms(&self) -> u64 {
        self.wait_to_zero_ms
    }

    pub fn is_running(&self) -> bool {
        self.state == CalibrationState::Running
    }

    pub fn link_open(&self) -> bool {
        self.link_open
    }

    /// Enter `AwaitingZero`. The caller starts the delay timer alongside.
    pub fn start(&mut self) {
        if self.state != CalibrationState::Idle {
            return;
        }
        self.state = CalibrationState::AwaitingZero;
        log::warn!(
            "Please move motor to Zero point. System will start in {}s ...",
            self.wait_to_zero_ms as f64 / 1000.0
        );
    }

    /// The configured delay has run out
    pub fn delay_elapsed(&mut self) -> Option<MotorCommand> {
        if !self.delay_elapsed {
            log::debug!("Zero-point delay of {}ms elapsed", self.wait_to_zero_ms);
        }
        self.delay_elapsed = true;
        self.try_zero()
    }

    /// The transport reported it is open for writing
    pub fn link_opened(&mut self) -> Option<MotorCommand> {
        if !self.link_open {
            log::debug!("Serial link reported open");
        }
        self.link_open = true;
        self.try_zero()
    }

    /// The zero command returned earlier has been written
    pub fn acknowledge_sent(&mut self) {
        if self.state == CalibrationState::ZeroSent {
            self.state = CalibrationState::Running;
            log::info!("Calibration complete, running");
        }
    }

    fn try_zero(&mut self) -> Option<MotorCommand> {
        if self.state != CalibrationState::AwaitingZero || !self.delay_elapsed || !self.link_open {
            return None;
        }
        log::warn!("Setting zero point!");
        self.state = CalibrationState::ZeroSent;
        Some(MotorCommand::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_then_open() {
        let mut seq = CalibrationSequencer::new(9000);
        seq.start();
        assert_eq!(seq.state(), CalibrationState::AwaitingZero);

        assert_eq!(seq.delay_elapsed(), None);
        assert_eq!(seq.link_opened(), Some(MotorCommand::zero()));
        assert_eq!(seq.state(), CalibrationState::ZeroSent);

        seq.acknowledge_sent();
        assert!(seq.is_running());
    }

    #[test]
    fn test_open_then_delay() {
        let mut seq = CalibrationSequencer::new(0);
        seq.start();

        assert_eq!(seq.link_opened(), None);
        assert_eq!(seq.delay_elapsed(), Some(MotorCommand::zero()));
    }

    #[test]
    fn test_zero_emitted_once() {
        let mut seq = CalibrationSequencer::new(0);
        seq.start();
        seq.delay_elapsed();
        assert!(seq.link_opened().is_some());

        assert_eq!(seq.link_opened(), None);
        assert_eq!(seq.delay_elapsed(), None);
        seq.acknowledge_sent();
        assert_eq!(seq.link_opened(), None);
    }

    #[test]
    fn test_link_never_opens() {
        let mut seq = CalibrationSequencer::new(100);
        seq.start();

        assert_eq!(seq.delay_elapsed(), None);
        assert_eq!(seq.state(), CalibrationState::AwaitingZero);
    }

    #[test]
    fn test_nothing_before_start() {
        let mut seq = CalibrationSequencer::new(0);

        assert_eq!(seq.delay_elapsed(), None);
        assert_eq!(seq.link_opened(), None);
        assert_eq!(seq.state(), CalibrationState::Idle);

        seq.start();
        seq.delay_elapsed();
        assert_eq!(seq.state(), CalibrationState::ZeroSent);
    }
}
