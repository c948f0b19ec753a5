use std::io::{Cursor, Read};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use th_track::bridge::{self, Bridge, BridgeError, BridgeHandle, StopReason};
use th_track::config::{ConfigLayer, Configuration};
use th_track::controller::{
    Button, ButtonSet, CalibrationStatus, LineTracker, Tracker, TrackerError,
};
use th_track::device::{DeviceError, KeySink};
use th_track::target::{GamePosition, MemoryError, MemoryReader};
use th_track::KeyCode;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Recorded {
    Key(KeyCode, bool),
    Sync,
}

#[derive(Clone, Default)]
struct RecordingSink(Arc<Mutex<Vec<Recorded>>>);

impl RecordingSink {
    fn take(&self) -> Vec<Recorded> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl KeySink for RecordingSink {
    fn emit_key(&mut self, code: KeyCode, pressed: bool) -> Result<(), DeviceError> {
        self.0.lock().unwrap().push(Recorded::Key(code, pressed));
        Ok(())
    }

    fn emit_sync(&mut self) -> Result<(), DeviceError> {
        self.0.lock().unwrap().push(Recorded::Sync);
        Ok(())
    }
}

/// Memory reader returning one fixed position, or failing when `None`
struct FixedMemory(Option<GamePosition>);

impl MemoryReader for FixedMemory {
    fn read_floats(&self, _pid: u32, offset: u64, count: usize) -> Result<Vec<f32>, MemoryError> {
        match self.0 {
            Some(position) => Ok(vec![position.x, position.y][..count].to_vec()),
            None => Err(MemoryError::ShortRead {
                offset,
                expected: count * 4,
                actual: 0,
            }),
        }
    }
}

fn config(extra: &str) -> Configuration {
    let layer = ConfigLayer::from_toml(&format!(
        r#"
        addr_x = 0x4B8B8C
        precision_normal = 5
        precision_focus = 1
        cam_min_x = 0
        cam_max_x = 100
        cam_min_y = 0
        cam_max_y = 100
        th_min_x = 0
        th_max_x = 200
        th_min_y = 0
        th_max_y = 200
        shot = "CROSS"
        bomb = "CIRCLE"
        focus = "T"
        skip = "SQUARE"
        pause = "SELECT"
        calibration_attempts = 3
        calibration_retry_ms = 0
        {}
        "#,
        extra
    ))
    .unwrap();
    Configuration::from_layer(layer, (100, 100)).unwrap()
}

fn line_tracker(script: &str) -> Box<dyn Tracker> {
    Box::new(LineTracker::connect(Cursor::new(script.as_bytes().to_vec())).unwrap())
}

const START: u32 = Button::Start.mask();
const CROSS: u32 = Button::Cross.mask();
const PS: u32 = Button::Ps.mask();

fn session_script() -> String {
    format!(
        "size 100 100\n\
         calibrating\n\
         calibrated\n\
         frame 50 50\n\
         report {START} 0 0 1\n\
         frame 50 50\n\
         report 0 0 0 1\n\
         frame 50 50\n\
         report {CROSS} 0 0 1\n\
         frame 50 50\n\
         report {PS} 0 0 1\n"
    )
}

const PLAYER: GamePosition = GamePosition { x: 50.0, y: 50.0 };

#[test]
fn test_session_until_quit_button() {
    let sink = RecordingSink::default();
    let bridge = Bridge::create(
        line_tracker(&session_script()),
        Box::new(FixedMemory(Some(PLAYER))),
        Box::new(sink.clone()),
        config(""),
        4242,
    );

    let running = bridge.calibrate().unwrap();
    let stopped = running.run(&Default::default());
    let reason = stopped.shutdown().unwrap();

    assert!(matches!(reason, StopReason::QuitButton));
    assert_eq!(
        sink.take(),
        vec![
            // aim at 315 degrees after switching to movement
            Recorded::Key(KeyCode::RIGHT, true),
            Recorded::Key(KeyCode::DOWN, true),
            Recorded::Sync,
            Recorded::Key(KeyCode::Z, true),
            Recorded::Sync,
            // shutdown
            Recorded::Key(KeyCode::RIGHT, false),
            Recorded::Key(KeyCode::DOWN, false),
            Recorded::Key(KeyCode::Z, false),
            Recorded::Sync,
        ]
    );
}

#[test]
fn test_unavailable_position_skips_movement_only() {
    let sink = RecordingSink::default();
    let bridge = Bridge::create(
        line_tracker(&session_script()),
        Box::new(FixedMemory(None)),
        Box::new(sink.clone()),
        config(""),
        4242,
    );

    let reason = bridge
        .calibrate()
        .unwrap()
        .run(&Default::default())
        .shutdown()
        .unwrap();

    assert!(matches!(reason, StopReason::QuitButton));
    assert_eq!(
        sink.take(),
        vec![
            Recorded::Key(KeyCode::Z, true),
            Recorded::Sync,
            Recorded::Key(KeyCode::Z, false),
            Recorded::Sync,
        ]
    );
}

#[test]
fn test_disconnect_releases_keys_and_fails() {
    let script = format!(
        "size 100 100\ncalibrated\nframe 50 50\nreport {CROSS} 0 0 1\n"
    );
    let sink = RecordingSink::default();
    let bridge = Bridge::create(
        line_tracker(&script),
        Box::new(FixedMemory(Some(PLAYER))),
        Box::new(sink.clone()),
        config(""),
        4242,
    );

    let result = bridge.calibrate().unwrap().run(&Default::default()).shutdown();

    assert!(matches!(
        result,
        Err(BridgeError::Tracker(TrackerError::Disconnected))
    ));
    assert_eq!(
        sink.take(),
        vec![
            Recorded::Key(KeyCode::Z, true),
            Recorded::Sync,
            Recorded::Key(KeyCode::Z, false),
            Recorded::Sync,
        ]
    );
}

#[test]
fn test_calibration_gives_up() {
    let script = "size 100 100\ncalibrating\ncalibration-failed\ncalibrating\ncalibrated\n";
    let bridge = Bridge::create(
        line_tracker(script),
        Box::new(FixedMemory(Some(PLAYER))),
        Box::new(RecordingSink::default()),
        config(""),
        4242,
    );

    assert!(matches!(
        bridge.calibrate(),
        Err(BridgeError::Tracker(TrackerError::CalibrationTimeout { attempts: 3 }))
    ));
}

/// Tracker that reports the same frame forever
struct EndlessTracker;

impl Tracker for EndlessTracker {
    fn frame_size(&self) -> (u32, u32) {
        (100, 100)
    }

    fn calibrate(&mut self) -> Result<CalibrationStatus, TrackerError> {
        Ok(CalibrationStatus::Calibrated)
    }

    fn update_image(&mut self) -> Result<(), TrackerError> {
        std::thread::sleep(Duration::from_millis(1));
        Ok(())
    }

    fn update_pose(&mut self) {}

    fn drain_pending_reports(&mut self) -> Result<(), TrackerError> {
        Ok(())
    }

    fn position(&self) -> (f32, f32) {
        (50.0, 50.0)
    }

    fn buttons(&self) -> ButtonSet {
        ButtonSet::EMPTY
    }

    fn accelerometer(&self) -> [f32; 3] {
        [0.0, 0.0, 1.0]
    }
}

#[tokio::test]
async fn test_handle_cancel() {
    let sink = RecordingSink::default();
    let bridge = Bridge::create(
        Box::new(EndlessTracker),
        Box::new(FixedMemory(Some(PLAYER))),
        Box::new(sink.clone()),
        config(""),
        4242,
    );

    let mut handle = BridgeHandle::spawn(bridge);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!handle.is_finished());

    handle.cancel();
    let reason = handle.wait().await.unwrap();
    assert!(matches!(reason, StopReason::Cancelled));

    // navigation mode with nothing pressed never touches the keyboard
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn test_handle_runs_to_quit() {
    let mut handle = BridgeHandle::spawn(Bridge::create(
        line_tracker(&session_script()),
        Box::new(FixedMemory(Some(PLAYER))),
        Box::new(RecordingSink::default()),
        config("smart_shot = \"REVERSE\""),
        4242,
    ));

    assert!(matches!(
        handle.wait().await,
        Ok(StopReason::QuitButton)
    ));
}

/// Pipe whose writer stays open after the calibration header
struct StalledPipe {
    pending: Vec<u8>,
    more: Receiver<Vec<u8>>,
}

impl Read for StalledPipe {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.pending.is_empty() {
            match self.more.recv() {
                Ok(bytes) => self.pending = bytes,
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

#[test]
fn test_stalled_tracker_does_not_block_exit() {
    let (writer, more) = mpsc::channel();
    let pipe = StalledPipe {
        pending: b"size 100 100\ncalibrated\n".to_vec(),
        more,
    };
    let tracker = LineTracker::connect(pipe).unwrap();
    let bridge = Bridge::create(
        Box::new(tracker),
        Box::new(FixedMemory(Some(PLAYER))),
        Box::new(RecordingSink::default()),
        config(""),
        4242,
    );

    let (done, finished) = mpsc::channel();
    std::thread::spawn(move || {
        let result = bridge::block_on_session(async move {
            let mut handle = BridgeHandle::spawn(bridge);
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(!handle.is_finished());
            handle.stop(Duration::from_millis(200)).await
        });
        let _ = done.send(result);
    });

    let result = finished
        .recv_timeout(Duration::from_secs(5))
        .expect("session did not return while the tracker was silent");
    assert!(matches!(result, Ok(Ok(StopReason::Cancelled))));

    // unblocks the abandoned tick loop
    drop(writer);
}
