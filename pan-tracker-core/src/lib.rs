//! Pan Tracker Core Library
//!
//! Decision logic for driving a pan motor from a live stream of tracked
//! subjects: which subject to follow, which angle to send, and when the
//! startup zero point is set.
//!
//! # Architecture
//!
//! This library is intentionally free of I/O and timing:
//! - Consumes already-decoded batches of tracked subjects and target overrides
//! - Produces motor commands for the caller to write
//! - Sequences calibration from signals the caller feeds in
//!
//! The library does NOT:
//! - Open serial ports
//! - Talk to the message broker
//! - Decode wire payloads
//! - Run timers
//!
//! All of that lives in the application layer (pan-tracker-cli).
//!
//! # Example Usage
//!
//! ```
//! use pan_tracker_core::{ControlConfig, ControlEvent, ControlLoop, TrackedSubject};
//!
//! let config = ControlConfig::new().with_wait_to_zero(0);
//! let mut control = ControlLoop::new(config);
//!
//! // Calibration: delay elapsed, then the serial link opens
//! assert!(control.handle(ControlEvent::DelayElapsed).is_empty());
//! let zero = control.handle(ControlEvent::TransportOpened);
//! assert_eq!(zero[0].to_line(), "0\n");
//!
//! // A batch arrives; subject 5 is picked and its bearing transmitted
//! let batch = vec![TrackedSubject::new(5, 30.0)].into();
//! let commands = control.handle(ControlEvent::Batch(batch));
//! assert_eq!(commands[0].to_line(), "30\n");
//! ```

// Public modules
pub mod bearing;
pub mod calibration;
pub mod config;
pub mod control;
pub mod selector;
pub mod types;

// Re-export main types for convenience
pub use bearing::{command_angle, normalize};
pub use calibration::{CalibrationSequencer, CalibrationState};
pub use config::{CommandGate, ControlConfig};
pub use control::{CommandSink, ControlEvent, ControlLoop};
pub use selector::{SelectionOutcome, SelectorState, TargetSelector};
pub use types::{
    MotorCommand, Result, SubjectId, TrackedBatch, TrackedSubject, TrackerError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
