//! Session lifecycle around the tick loop
//!
//! ```text
//! Calibrating ──calibrate()──► Running ──run()──► Stopped ──shutdown()──► StopReason
//!      │                                            ▲
//!      └──── CalibrationTimeout (bridge dropped) ───┘ (device destroyed on drop)
//! ```
//!
//! The loop itself is blocking. [`BridgeHandle`] moves it onto tokio's
//! blocking pool and stops it through a [`CancellationToken`].

use crate::config::{self, ConfigError, Configuration};
use crate::controller::{Tracker, TrackerError};
use crate::device::{DeviceError, KeySink, VirtualKeyboard};
use crate::mapping::{KeyEventEmitter, TranslationEngine};
use crate::target::{MemoryReader, ProcMemoryReader, TargetError, TargetProcess};
use chrono::Local;
use statum::{machine, state};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("Bridge task failed: {0}")]
    Task(String),
}

/// Why the tick loop ended
#[derive(Debug)]
pub enum StopReason {
    QuitButton,
    Cancelled,
    Failed(BridgeError),
}

#[state]
#[derive(Debug, Clone)]
pub enum BridgeState {
    Calibrating,
    Running,
    Stopped,
}

#[machine]
pub struct Bridge<S: BridgeState> {
    tracker: Box<dyn Tracker>,
    memory: Box<dyn MemoryReader>,
    keyboard: Box<dyn KeySink>,
    engine: TranslationEngine,
    emitter: KeyEventEmitter,
    pid: u32,
    stop_reason: Option<StopReason>,
}

impl<S: BridgeState> Bridge<S> {
    pub fn engine(&self) -> &TranslationEngine {
        &self.engine
    }

    pub fn emitter(&self) -> &KeyEventEmitter {
        &self.emitter
    }
}

impl Bridge<Calibrating> {
    pub fn create(
        tracker: Box<dyn Tracker>,
        memory: Box<dyn MemoryReader>,
        keyboard: Box<dyn KeySink>,
        config: Configuration,
        pid: u32,
    ) -> Self {
        info!(
            "Creating bridge for pid {} reading position at {:#x}",
            pid, config.position_offset
        );
        Self::new(
            tracker,
            memory,
            keyboard,
            TranslationEngine::new(config),
            KeyEventEmitter::new(),
            pid,
            None, // stop_reason
        )
    }

    /// Wires the production collaborators
    ///
    /// Resolves the game process, loads its configuration layers (camera
    /// bounds default to the tracker's frame) and registers the virtual
    /// keyboard with exactly the configured keys.
    pub fn open(
        target: &str,
        config_dir: &Path,
        tracker: Box<dyn Tracker>,
    ) -> Result<Self, BridgeError> {
        let process = TargetProcess::resolve(target)?;
        let config = Configuration::load(config_dir, process.game_name(), tracker.frame_size())?;
        debug!(
            "Configuration layer for this game: {}",
            config::layer_path(config_dir, process.game_name()).display()
        );
        let keyboard = VirtualKeyboard::create(&config.declared_keys())?;

        Ok(Self::create(
            tracker,
            Box::new(ProcMemoryReader::default()),
            Box::new(keyboard),
            config,
            process.pid,
        ))
    }

    /// Runs the bounded calibration retry
    pub fn calibrate(mut self) -> Result<Bridge<Running>, BridgeError> {
        let policy = self.engine.config().calibration;
        info!(
            "Calibrating tracker (up to {} attempts, {:?} apart)",
            policy.max_attempts, policy.retry_delay
        );
        policy.run(self.tracker.as_mut())?;
        Ok(self.transition())
    }
}

impl Bridge<Running> {
    /// Ticks until the quit button, cancellation or an error
    ///
    /// Always reaches [`Stopped`], the reason is kept for
    /// [`Bridge::shutdown`].
    pub fn run(mut self, cancel: &CancellationToken) -> Bridge<Stopped> {
        info!("Entering tick loop in {:?} mode", self.engine.mode());

        let mut ticks: u64 = 0;
        let mut events_at_last_stats = self.emitter.events_emitted();
        let mut last_stats_time = Local::now();
        let stats_interval = chrono::Duration::seconds(30);
        let mut position_available = true;

        let reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            match self.tick(&mut position_available) {
                Ok(true) => break StopReason::QuitButton,
                Ok(false) => {}
                // a dying tracker helper is expected after Ctrl-C
                Err(_) if cancel.is_cancelled() => break StopReason::Cancelled,
                Err(e) => {
                    error!("Tick failed: {}", e);
                    break StopReason::Failed(e);
                }
            }
            ticks += 1;

            let now = Local::now();
            if now - last_stats_time > stats_interval {
                let elapsed_seconds = (now - last_stats_time).num_seconds().max(1);
                let events = self.emitter.events_emitted() - events_at_last_stats;
                info!(
                    "Bridge stats: {} ticks, {} key events in {} seconds ({:.1} ticks/sec)",
                    ticks,
                    events,
                    elapsed_seconds,
                    ticks as f64 / elapsed_seconds as f64
                );
                ticks = 0;
                events_at_last_stats = self.emitter.events_emitted();
                last_stats_time = now;
            }
        };

        info!("Tick loop ended: {:?}", reason);
        self.stop_reason = Some(reason);
        self.transition()
    }

    /// One tick, `Ok(true)` when the quit button is held
    fn tick(&mut self, position_available: &mut bool) -> Result<bool, BridgeError> {
        self.tracker.update_image()?;
        self.tracker.update_pose();
        self.tracker.drain_pending_reports()?;
        let sample = self.tracker.sample();

        let offset = self.engine.config().position_offset;
        let game = match self.memory.read_position(self.pid, offset) {
            Ok(position) => {
                if !*position_available {
                    info!("Game position available again");
                    *position_available = true;
                }
                Some(position)
            }
            Err(e) => {
                if *position_available {
                    warn!("Game position unavailable: {}", e);
                    *position_available = false;
                } else {
                    debug!("Game position still unavailable: {}", e);
                }
                None
            }
        };

        let outcome = self.engine.tick(&sample, game);
        if outcome.quit {
            return Ok(true);
        }
        for event in &outcome.events {
            debug!("{} {}", event.code, if event.pressed { "down" } else { "up" });
        }
        self.emitter.emit(self.keyboard.as_mut(), &outcome.events)?;
        Ok(false)
    }
}

impl Bridge<Stopped> {
    /// Releases every held key in one batch and drops the collaborators
    pub fn shutdown(mut self) -> Result<StopReason, BridgeError> {
        let releases = self.engine.release_all();
        if !releases.is_empty() {
            info!("Releasing {} held keys", releases.len());
        }
        let released = self.emitter.emit(self.keyboard.as_mut(), &releases);

        let reason = self.stop_reason.take().unwrap_or(StopReason::Cancelled);
        match reason {
            StopReason::Failed(e) => {
                if let Err(release_error) = released {
                    warn!("Could not release held keys: {}", release_error);
                }
                Err(e)
            }
            reason => {
                released?;
                info!(
                    "Bridge shut down after {} key events",
                    self.emitter.events_emitted()
                );
                Ok(reason)
            }
        }
    }
}

/// Runs a bridge on the blocking pool
#[derive(Debug)]
pub struct BridgeHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<StopReason, BridgeError>>,
}

impl BridgeHandle {
    /// Calibrates, runs and shuts down the bridge in a blocking task
    pub fn spawn(bridge: Bridge<Calibrating>) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::task::spawn_blocking(move || {
            let running = bridge.calibrate()?;
            running.run(&token).shutdown()
        });
        Self { cancel, task }
    }

    pub fn cancel(&self) {
        info!("Cancelling bridge");
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the blocking task, call once
    pub async fn wait(&mut self) -> Result<StopReason, BridgeError> {
        match (&mut self.task).await {
            Ok(result) => result,
            Err(e) => {
                error!("Bridge task panicked: {}", e);
                Err(BridgeError::Task(e.to_string()))
            }
        }
    }

    /// Cancels and waits up to `grace` for the held keys to be released
    ///
    /// A loop blocked on a silent tracker never sees the cancellation. It is
    /// abandoned after `grace` and reported as cancelled.
    pub async fn stop(&mut self, grace: Duration) -> Result<StopReason, BridgeError> {
        self.cancel();
        match tokio::time::timeout(grace, self.wait()).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Tick loop still blocked on the tracker after {:?}", grace);
                Ok(StopReason::Cancelled)
            }
        }
    }
}

/// Runs `session` on its own runtime
///
/// The runtime is shut down in the background, so a blocking task stuck in a
/// tracker read does not keep the caller waiting.
pub fn block_on_session<F: Future>(session: F) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(session);
    runtime.shutdown_background();
    Ok(output)
}
