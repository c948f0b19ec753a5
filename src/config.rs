//! Layered configuration for one game session
//!
//! Configuration lives in flat TOML files inside the config directory:
//! `default.toml` first, then `<game>.toml` on top of it. Each layer is
//! deserialized into a [`ConfigLayer`] where every key is optional, the layers
//! are merged key by key, and the result is validated into an immutable
//! [`Configuration`].

use crate::controller::{Button, CalibrationPolicy};
use crate::mapping::{Action, KeyCode, SmartShot};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_LAYER: &str = "default";
const CONFIG_SUFFIX: &str = "toml";
const LOCAL_CONFIG_DIR: &str = "config";
const APP_DIR: &str = "th-track";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Default configuration {0} does not exist")]
    DefaultLayerMissing(PathBuf),

    #[error("Missing required key `{0}`")]
    Missing(&'static str),

    #[error("Invalid {name} bounds: min {min} must be below max {max}")]
    InvalidBounds {
        name: &'static str,
        min: f32,
        max: f32,
    },

    #[error("Key `{key}` = {value} is out of range, expected {expected}")]
    OutOfRange {
        key: &'static str,
        value: f32,
        expected: &'static str,
    },
}

/// One configuration file with every key optional
///
/// Key names are the ones the game profiles have always used. Unknown keys
/// are ignored so profiles can carry notes for other tools.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ConfigLayer {
    pub addr_x: Option<u64>,
    pub precision_normal: Option<f32>,
    pub precision_focus: Option<f32>,
    pub th_min_x: Option<f32>,
    pub th_max_x: Option<f32>,
    pub th_min_y: Option<f32>,
    pub th_max_y: Option<f32>,
    pub shot: Option<Button>,
    pub bomb: Option<Button>,
    pub focus: Option<Button>,
    pub skip: Option<Button>,
    pub pause: Option<Button>,
    pub ecode_shot: Option<KeyCode>,
    pub ecode_bomb: Option<KeyCode>,
    pub ecode_focus: Option<KeyCode>,
    pub ecode_skip: Option<KeyCode>,
    pub ecode_pause: Option<KeyCode>,
    pub cam_min_x: Option<f32>,
    pub cam_max_x: Option<f32>,
    pub cam_min_y: Option<f32>,
    pub cam_max_y: Option<f32>,
    pub smart_shot: Option<SmartShot>,
    pub nav_threshold_x: Option<f32>,
    pub nav_threshold_y: Option<f32>,
    pub mode_toggle: Option<Button>,
    pub navigate: Option<Button>,
    pub quit: Option<Button>,
    pub calibration_attempts: Option<u32>,
    pub calibration_retry_ms: Option<u64>,
}

macro_rules! overlay_fields {
    ($base:expr, $top:expr, $($field:ident),+ $(,)?) => {
        ConfigLayer {
            $($field: $top.$field.or($base.$field),)+
        }
    };
}

impl ConfigLayer {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Reads one layer, `Ok(None)` if the file does not exist
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let layer = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Read configuration layer {}", path.display());
        Ok(Some(layer))
    }

    /// Keys set in `top` win over keys set in `self`
    pub fn overlay(self, top: ConfigLayer) -> ConfigLayer {
        overlay_fields!(
            self,
            top,
            addr_x,
            precision_normal,
            precision_focus,
            th_min_x,
            th_max_x,
            th_min_y,
            th_max_y,
            shot,
            bomb,
            focus,
            skip,
            pause,
            ecode_shot,
            ecode_bomb,
            ecode_focus,
            ecode_skip,
            ecode_pause,
            cam_min_x,
            cam_max_x,
            cam_min_y,
            cam_max_y,
            smart_shot,
            nav_threshold_x,
            nav_threshold_y,
            mode_toggle,
            navigate,
            quit,
            calibration_attempts,
            calibration_retry_ms,
        )
    }
}

/// Axis-aligned rectangle, `min < max` on both axes once validated
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

/// Distance to the target under which the player stops moving
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Precision {
    pub normal: f32,
    /// Used while the focus action's button is held
    pub focus: f32,
}

/// Accelerometer tilt needed to pick a menu direction, fractions of 1 g
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NavThresholds {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    pub button: Button,
    pub key: KeyCode,
}

/// Controller button and output key for each [`Action`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionBindings([Binding; 5]);

impl ActionBindings {
    pub fn new(
        shot: Binding,
        bomb: Binding,
        focus: Binding,
        skip: Binding,
        pause: Binding,
    ) -> Self {
        Self([shot, bomb, focus, skip, pause])
    }

    pub fn get(&self, action: Action) -> Binding {
        self.0[action.index()]
    }

    /// Bindings in dispatch order
    pub fn iter(&self) -> impl Iterator<Item = (Action, Binding)> + '_ {
        Action::ALL.into_iter().map(|action| (action, self.get(action)))
    }
}

/// Buttons that steer the bridge itself rather than the game
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlButtons {
    /// Flips between navigation and movement mode
    pub mode_toggle: Button,
    /// Held in navigation mode to pick a direction by tilt
    pub navigate: Button,
    /// Ends the session
    pub quit: Button,
}

impl Default for ControlButtons {
    fn default() -> Self {
        Self {
            mode_toggle: Button::Start,
            navigate: Button::Move,
            quit: Button::Ps,
        }
    }
}

/// Validated, read-only configuration snapshot
#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    /// Byte offset of the player's `(x, y)` floats in the game's memory
    pub position_offset: u64,
    pub camera: Bounds,
    pub target: Bounds,
    pub precision: Precision,
    pub navigation: NavThresholds,
    pub bindings: ActionBindings,
    pub smart_shot: SmartShot,
    pub controls: ControlButtons,
    pub calibration: CalibrationPolicy,
}

fn required<T>(value: Option<T>, key: &'static str) -> Result<T, ConfigError> {
    value.ok_or(ConfigError::Missing(key))
}

fn finite(value: f32, key: &'static str) -> Result<f32, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange {
            key,
            value,
            expected: "a finite number",
        })
    }
}

fn bounds(
    name: &'static str,
    min_x: f32,
    max_x: f32,
    min_y: f32,
    max_y: f32,
) -> Result<Bounds, ConfigError> {
    for (min, max) in [(min_x, max_x), (min_y, max_y)] {
        if !(min.is_finite() && max.is_finite() && min < max) {
            return Err(ConfigError::InvalidBounds { name, min, max });
        }
    }
    Ok(Bounds {
        min_x,
        max_x,
        min_y,
        max_y,
    })
}

fn precision_radius(value: Option<f32>, key: &'static str) -> Result<f32, ConfigError> {
    let value = finite(required(value, key)?, key)?;
    if value < 0.0 {
        return Err(ConfigError::OutOfRange {
            key,
            value,
            expected: "a radius >= 0",
        });
    }
    Ok(value)
}

fn nav_threshold(value: Option<f32>, key: &'static str) -> Result<f32, ConfigError> {
    let value = finite(value.unwrap_or(0.0), key)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::OutOfRange {
            key,
            value,
            expected: "a fraction in [0, 1]",
        });
    }
    Ok(value)
}

impl Configuration {
    /// Validates a merged layer
    ///
    /// Camera bounds default to the full camera frame.
    pub fn from_layer(layer: ConfigLayer, frame_size: (u32, u32)) -> Result<Self, ConfigError> {
        let camera = bounds(
            "camera",
            layer.cam_min_x.unwrap_or(0.0),
            layer.cam_max_x.unwrap_or(frame_size.0 as f32),
            layer.cam_min_y.unwrap_or(0.0),
            layer.cam_max_y.unwrap_or(frame_size.1 as f32),
        )?;
        let target = bounds(
            "target threshold",
            required(layer.th_min_x, "th_min_x")?,
            required(layer.th_max_x, "th_max_x")?,
            required(layer.th_min_y, "th_min_y")?,
            required(layer.th_max_y, "th_max_y")?,
        )?;

        let precision = Precision {
            normal: precision_radius(layer.precision_normal, "precision_normal")?,
            focus: precision_radius(layer.precision_focus, "precision_focus")?,
        };
        let navigation = NavThresholds {
            x: nav_threshold(layer.nav_threshold_x, "nav_threshold_x")?,
            y: nav_threshold(layer.nav_threshold_y, "nav_threshold_y")?,
        };

        let bindings = ActionBindings::new(
            Binding {
                button: required(layer.shot, "shot")?,
                key: layer.ecode_shot.unwrap_or(KeyCode::Z),
            },
            Binding {
                button: required(layer.bomb, "bomb")?,
                key: layer.ecode_bomb.unwrap_or(KeyCode::X),
            },
            Binding {
                button: required(layer.focus, "focus")?,
                key: layer.ecode_focus.unwrap_or(KeyCode::LEFT_SHIFT),
            },
            Binding {
                button: required(layer.skip, "skip")?,
                key: layer.ecode_skip.unwrap_or(KeyCode::LEFT_CTRL),
            },
            Binding {
                button: required(layer.pause, "pause")?,
                key: layer.ecode_pause.unwrap_or(KeyCode::ESC),
            },
        );

        let defaults = ControlButtons::default();
        let controls = ControlButtons {
            mode_toggle: layer.mode_toggle.unwrap_or(defaults.mode_toggle),
            navigate: layer.navigate.unwrap_or(defaults.navigate),
            quit: layer.quit.unwrap_or(defaults.quit),
        };

        let default_policy = CalibrationPolicy::default();
        let max_attempts = layer
            .calibration_attempts
            .unwrap_or(default_policy.max_attempts);
        if max_attempts == 0 {
            return Err(ConfigError::OutOfRange {
                key: "calibration_attempts",
                value: 0.0,
                expected: "at least 1",
            });
        }
        let calibration = CalibrationPolicy {
            max_attempts,
            retry_delay: layer
                .calibration_retry_ms
                .map(Duration::from_millis)
                .unwrap_or(default_policy.retry_delay),
        };

        let config = Self {
            position_offset: required(layer.addr_x, "addr_x")?,
            camera,
            target,
            precision,
            navigation,
            bindings,
            smart_shot: layer.smart_shot.unwrap_or_default(),
            controls,
            calibration,
        };
        debug!("Validated configuration: {:#?}", config);
        Ok(config)
    }

    /// Loads `default.toml` and the optional `<game>.toml` from `dir`
    pub fn load(dir: &Path, game: &str, frame_size: (u32, u32)) -> Result<Self, ConfigError> {
        let default_path = layer_path(dir, DEFAULT_LAYER);
        let base = ConfigLayer::load(&default_path)?
            .ok_or_else(|| ConfigError::DefaultLayerMissing(default_path.clone()))?;

        let game_path = layer_path(dir, game);
        let merged = if game == DEFAULT_LAYER {
            base
        } else {
            match ConfigLayer::load(&game_path)? {
                Some(layer) => base.overlay(layer),
                None => {
                    warn!(
                        "No game configuration at {}, using defaults only",
                        game_path.display()
                    );
                    base
                }
            }
        };

        let config = Self::from_layer(merged, frame_size)?;
        info!(
            "Configuration loaded: offset {:#x}, smart shot {:?}, camera {:?}, target {:?}",
            config.position_offset, config.smart_shot, config.camera, config.target
        );
        Ok(config)
    }

    /// Every key code the virtual keyboard must declare
    pub fn declared_keys(&self) -> Vec<KeyCode> {
        let mut keys: Vec<KeyCode> = self.bindings.iter().map(|(_, b)| b.key).collect();
        keys.extend(crate::mapping::Direction::ALL.iter().map(|d| d.key()));
        keys.sort_unstable();
        keys.dedup();
        keys
    }
}

pub fn layer_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name).with_extension(CONFIG_SUFFIX)
}

/// Picks the configuration directory
///
/// An explicit directory wins, then `./config`, then the user config dir.
pub fn config_dir(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir;
    }
    let local = PathBuf::from(LOCAL_CONFIG_DIR);
    if local.is_dir() {
        return local;
    }
    match dirs::config_dir() {
        Some(mut dir) => {
            dir.push(APP_DIR);
            dir
        }
        None => {
            warn!("Could not determine user config directory, using ./config");
            local
        }
    }
}
