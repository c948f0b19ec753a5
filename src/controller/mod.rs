//! Controller subsystem: PS Move buttons and the camera tracker
//!
//! # Architecture
//!
//! ```text
//! Tracking helper ──[line protocol]──► LineTracker ──► ControllerSample
//!                                        (Tracker)      (per tick)
//! ```
//!
//! The tracker is consumed through the [`Tracker`] trait so the tick loop can
//! be driven by an in-memory script in tests.

pub mod buttons;
pub mod line_tracker;
pub mod tracker;

pub use buttons::{Button, ButtonSet};
pub use line_tracker::LineTracker;
pub use tracker::{CalibrationPolicy, CalibrationStatus, ControllerSample, Tracker, TrackerError};
