//! Tracker fed by the camera-tracking helper over a line protocol
//!
//! The helper owns the camera and the controller connection and prints one
//! line per event:
//!
//! ```text
//! size 640 480                     once, before anything else
//! calibrating | calibrated | calibration-failed
//! frame 312.5 201.0                once per camera frame
//! report 524288 0.01 0.98 -0.12    per controller report (buttons ax ay az)
//! ```

use crate::controller::buttons::ButtonSet;
use crate::controller::tracker::{CalibrationStatus, Tracker, TrackerError};
use std::io::{BufRead, BufReader, Read};
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq)]
enum TrackerLine {
    Size(u32, u32),
    Calibration(CalibrationStatus),
    Frame(f32, f32),
    Report { buttons: ButtonSet, accel: [f32; 3] },
}

fn protocol_error(line: &str, reason: impl Into<String>) -> TrackerError {
    TrackerError::Protocol {
        line: line.to_string(),
        reason: reason.into(),
    }
}

fn field<T: FromStr>(line: &str, value: Option<&str>, name: &str) -> Result<T, TrackerError> {
    let value = value.ok_or_else(|| protocol_error(line, format!("missing {}", name)))?;
    value
        .parse()
        .map_err(|_| protocol_error(line, format!("invalid {}: {}", name, value)))
}

fn parse_line(line: &str) -> Result<TrackerLine, TrackerError> {
    let mut parts = line.split_whitespace();
    let kind = parts.next().unwrap_or_default();
    let parsed = match kind {
        "size" => TrackerLine::Size(
            field(line, parts.next(), "width")?,
            field(line, parts.next(), "height")?,
        ),
        "calibrating" => TrackerLine::Calibration(CalibrationStatus::Calibrating),
        "calibrated" => TrackerLine::Calibration(CalibrationStatus::Calibrated),
        "calibration-failed" => TrackerLine::Calibration(CalibrationStatus::Failed),
        "frame" => TrackerLine::Frame(
            field(line, parts.next(), "x")?,
            field(line, parts.next(), "y")?,
        ),
        "report" => TrackerLine::Report {
            buttons: ButtonSet::from_raw(field(line, parts.next(), "buttons")?),
            accel: [
                field(line, parts.next(), "ax")?,
                field(line, parts.next(), "ay")?,
                field(line, parts.next(), "az")?,
            ],
        },
        other => return Err(protocol_error(line, format!("unknown kind {:?}", other))),
    };
    if parts.next().is_some() {
        return Err(protocol_error(line, "trailing fields"));
    }
    Ok(parsed)
}

pub struct LineTracker<R> {
    reader: BufReader<R>,
    line: String,
    frame_size: (u32, u32),
    pending_position: Option<(f32, f32)>,
    position: (f32, f32),
    buttons: ButtonSet,
    accel: [f32; 3],
}

impl<R: Read> LineTracker<R> {
    /// Wraps the helper's output and waits for its `size` header
    pub fn connect(inner: R) -> Result<Self, TrackerError> {
        let mut tracker = Self {
            reader: BufReader::new(inner),
            line: String::new(),
            frame_size: (0, 0),
            pending_position: None,
            position: (0.0, 0.0),
            buttons: ButtonSet::EMPTY,
            accel: [0.0; 3],
        };

        match tracker.next_line()? {
            TrackerLine::Size(w, h) => {
                info!("Tracker connected, camera frame {}x{}", w, h);
                tracker.frame_size = (w, h);
                Ok(tracker)
            }
            other => Err(protocol_error(
                &format!("{:?}", other),
                "expected size header first",
            )),
        }
    }

    fn next_line(&mut self) -> Result<TrackerLine, TrackerError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Err(TrackerError::Disconnected);
            }
            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }
            return parse_line(line);
        }
    }

    fn apply(&mut self, line: TrackerLine) {
        match line {
            TrackerLine::Report { buttons, accel } => {
                self.buttons = buttons;
                self.accel = accel;
            }
            TrackerLine::Frame(x, y) => self.pending_position = Some((x, y)),
            TrackerLine::Size(w, h) => debug!("Ignoring repeated size header {}x{}", w, h),
            TrackerLine::Calibration(status) => {
                debug!("Ignoring calibration status {:?} outside calibration", status)
            }
        }
    }

    /// Next buffered report line, if a complete one is already in memory
    fn buffered_report(&mut self) -> Result<Option<TrackerLine>, TrackerError> {
        let (parsed, consumed) = {
            let buffer = self.reader.buffer();
            let Some(end) = buffer.iter().position(|&b| b == b'\n') else {
                return Ok(None);
            };
            let line = std::str::from_utf8(&buffer[..end])
                .map_err(|e| protocol_error("<binary>", e.to_string()))?
                .trim();
            if !line.starts_with("report") {
                return Ok(None);
            }
            (parse_line(line)?, end + 1)
        };
        self.reader.consume(consumed);
        Ok(Some(parsed))
    }
}

impl<R: Read + Send> Tracker for LineTracker<R> {
    fn frame_size(&self) -> (u32, u32) {
        self.frame_size
    }

    fn calibrate(&mut self) -> Result<CalibrationStatus, TrackerError> {
        loop {
            match self.next_line()? {
                TrackerLine::Calibration(status) => return Ok(status),
                other => self.apply(other),
            }
        }
    }

    fn update_image(&mut self) -> Result<(), TrackerError> {
        loop {
            let line = self.next_line()?;
            let is_frame = matches!(line, TrackerLine::Frame(..));
            self.apply(line);
            if is_frame {
                return Ok(());
            }
        }
    }

    fn update_pose(&mut self) {
        if let Some(position) = self.pending_position.take() {
            self.position = position;
        }
    }

    fn drain_pending_reports(&mut self) -> Result<(), TrackerError> {
        while let Some(report) = self.buffered_report()? {
            self.apply(report);
        }
        Ok(())
    }

    fn position(&self) -> (f32, f32) {
        self.position
    }

    fn buttons(&self) -> ButtonSet {
        self.buttons
    }

    fn accelerometer(&self) -> [f32; 3] {
        self.accel
    }
}
