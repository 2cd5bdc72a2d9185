//! Core types for the pan tracker
//!
//! This module defines the data that flows through the control loop: tracked
//! subjects as delivered by the tracking system, the batches they arrive in,
//! and the motor commands written to the serial link.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned to a subject by the tracking system
pub type SubjectId = i64;

/// Result type for pan tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

/// A single tracked subject, as produced by the tracking system once per update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedSubject {
    /// Tracker-assigned identifier
    pub id: SubjectId,
    /// Position in the tracking plane
    pub x: f64,
    pub y: f64,
    /// Signed bearing in degrees, conventionally within [-180, 180]
    pub bearing: f64,
    /// Optional velocity estimate (vx, vy)
    #[serde(default)]
    pub velocity: Option<(f64, f64)>,
}

impl TrackedSubject {
    /// Create a subject at the origin with the given bearing
    pub fn new(id: SubjectId, bearing: f64) -> Self {
        Self {
            id,
            x: 0.0,
            y: 0.0,
            bearing,
            velocity: None,
        }
    }

    /// Builder method: set the position
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Builder method: set the velocity
    pub fn with_velocity(mut self, vx: f64, vy: f64) -> Self {
        self.velocity = Some((vx, vy));
        self
    }
}

/// All subjects reported for one instant in time
///
/// Order is preserved exactly as received. Ids are not required to be unique;
/// duplicates are passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackedBatch(Vec<TrackedSubject>);

impl TrackedBatch {
    pub fn new(subjects: Vec<TrackedSubject>) -> Self {
        Self(subjects)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrackedSubject> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First subject carrying `id`, if any
    pub fn find(&self, id: SubjectId) -> Option<&TrackedSubject> {
        self.0.iter().find(|s| s.id == id)
    }

    /// Every subject carrying `id`, in batch order
    pub fn matching(&self, id: SubjectId) -> impl Iterator<Item = &TrackedSubject> {
        self.0.iter().filter(move |s| s.id == id)
    }
}

impl From<Vec<TrackedSubject>> for TrackedBatch {
    fn from(subjects: Vec<TrackedSubject>) -> Self {
        Self(subjects)
    }
}

impl<'a> IntoIterator for &'a TrackedBatch {
    type Item = &'a TrackedSubject;
    type IntoIter = std::slice::Iter<'a, TrackedSubject>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A single angle command for the pan motor
///
/// Serialized as ASCII text followed by a newline. Commands derived from
/// subject bearings use the shortest exact representation (`30`, `-12.5`);
/// test-mode commands use a fixed number of decimals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorCommand {
    /// Signed angle in degrees
    pub angle: f64,
    /// Fixed number of decimals, or `None` for the shortest representation
    pub precision: Option<usize>,
}

impl MotorCommand {
    /// Line delimiter expected by the motor controller
    pub const DELIMITER: &'static str = "\n";

    pub fn angle(angle: f64) -> Self {
        Self {
            angle,
            precision: None,
        }
    }

    pub fn fixed(angle: f64, precision: usize) -> Self {
        Self {
            angle,
            precision: Some(precision),
        }
    }

    /// The calibration zero-point command
    pub fn zero() -> Self {
        Self::angle(0.0)
    }

    /// Full line as written to the serial link
    pub fn to_line(&self) -> String {
        format!("{}{}", self, Self::DELIMITER)
    }
}

impl fmt::Display for MotorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // -0 is written as plain 0
        let angle = if self.angle == 0.0 { 0.0 } else { self.angle };
        match self.precision {
            Some(p) => {
                let text = format!("{:.*}", p, angle);
                // Rounding can still produce "-0.0"
                match text.strip_prefix('-') {
                    Some(rest) if rest.chars().all(|c| c == '0' || c == '.') => {
                        write!(f, "{}", rest)
                    }
                    _ => write!(f, "{}", text),
                }
            }
            None => write!(f, "{}", angle),
        }
    }
}

/// Errors that can occur around the control loop
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Invalid payload on {topic}: {reason}")]
    InvalidPayload { topic: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TrackerError {
    pub fn invalid_payload(topic: impl Into<String>, reason: impl fmt::Display) -> Self {
        TrackerError::InvalidPayload {
            topic: topic.into(),
            reason: reason.to_string(),
        }
    }
}
