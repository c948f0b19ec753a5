//! Tracker collaborator interface and calibration retry policy

use crate::controller::buttons::ButtonSet;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of one calibration attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationStatus {
    /// Controller sphere found and colour locked in
    Calibrated,
    /// Still searching, try again
    Calibrating,
    /// The tracker gave up on this attempt
    Failed,
}

/// Everything the tracker reports for one tick
///
/// Produced fresh each tick and dropped at the end of it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControllerSample {
    /// Position in camera pixels
    pub x: f32,
    pub y: f32,
    /// Normalised accelerometer vector
    pub accel: [f32; 3],
    pub buttons: ButtonSet,
}

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Tracker stream closed")]
    Disconnected,

    #[error("Tracker I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed tracker line {line:?}: {reason}")]
    Protocol { line: String, reason: String },

    #[error("Tracker did not calibrate after {attempts} attempts")]
    CalibrationTimeout { attempts: u32 },
}

/// Camera tracker plus the controller it follows
///
/// One tick calls `update_image`, `update_pose` and `drain_pending_reports` in
/// that order and then reads the getters.
pub trait Tracker: Send {
    /// Camera frame size in pixels
    fn frame_size(&self) -> (u32, u32);

    /// Runs one blocking calibration attempt
    fn calibrate(&mut self) -> Result<CalibrationStatus, TrackerError>;

    /// Blocks until the next camera frame is available
    fn update_image(&mut self) -> Result<(), TrackerError>;

    /// Recomputes the controller position from the last frame
    fn update_pose(&mut self);

    /// Consumes controller reports that are already buffered without blocking
    fn drain_pending_reports(&mut self) -> Result<(), TrackerError>;

    fn position(&self) -> (f32, f32);

    fn buttons(&self) -> ButtonSet;

    fn accelerometer(&self) -> [f32; 3];

    /// Snapshot of the getters as one sample
    fn sample(&self) -> ControllerSample {
        let (x, y) = self.position();
        ControllerSample {
            x,
            y,
            accel: self.accelerometer(),
            buttons: self.buttons(),
        }
    }
}

/// Bounded retry for tracker calibration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalibrationPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for CalibrationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            retry_delay: Duration::from_millis(100),
        }
    }
}

impl CalibrationPolicy {
    /// Calls `calibrate` until it succeeds or the attempts run out
    pub fn run(&self, tracker: &mut dyn Tracker) -> Result<u32, TrackerError> {
        for attempt in 1..=self.max_attempts {
            match tracker.calibrate()? {
                CalibrationStatus::Calibrated => {
                    info!("Tracker calibrated after {} attempt(s)", attempt);
                    return Ok(attempt);
                }
                CalibrationStatus::Calibrating => {
                    debug!("Calibration attempt {} still in progress", attempt);
                }
                CalibrationStatus::Failed => {
                    warn!("Calibration attempt {} failed, retrying", attempt);
                }
            }
            if attempt < self.max_attempts && !self.retry_delay.is_zero() {
                thread::sleep(self.retry_delay);
            }
        }
        Err(TrackerError::CalibrationTimeout {
            attempts: self.max_attempts,
        })
    }
}
