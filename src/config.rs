//! Startup configuration for the translator.
//!
//! Values come from an optional TOML file (by default
//! `<config_dir>/puppet_midi/config.toml`) and are then overridden by the
//! command line. Everything is validated once before the frame loop starts;
//! the translator itself never re-checks ranges.

use crate::controller::test_pattern::TestPattern;
use crate::mapping::controller_values::ControllerEnablement;
use crate::mapping::note_table::{NoteTable, NoteTableError};
use crate::mapping::strategy::{PalmStrategy, ZoneStrategy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const APP_DIR: &str = "puppet_midi";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("No config directory available on this system")]
    NoConfigDir,

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid note layout: {0}")]
    NoteLayout(#[from] NoteTableError),
}

/// World-space box mapped onto the 0..127 controller range
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min_x: 0.0,
            max_x: 1.8,
            min_y: 0.8,
            max_y: 1.8,
        }
    }
}

/// Per-installation calibration of the tracked space
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Calibration {
    pub bounds: Bounds,
    /// Heading offsets in degrees, 0..=359
    pub left_hand_angle: i32,
    pub right_hand_angle: i32,
    pub controllers: ControllerEnablement,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            bounds: Bounds::default(),
            left_hand_angle: 0,
            right_hand_angle: 0,
            controllers: ControllerEnablement::all(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MidiConfig {
    /// Output port, either an index into the port list or a name fragment.
    /// The first port is used when unset.
    pub port: Option<String>,
    pub channel: u8,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            port: None,
            channel: 0,
        }
    }
}

/// Base note of each puppet side; every side spans 29 notes from its base
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct NoteBases {
    pub left: u8,
    pub right: u8,
}

impl Default for NoteBases {
    fn default() -> Self {
        Self { left: 20, right: 60 }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Gamepad,
    #[default]
    Pattern,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub pattern: TestPattern,
    /// Frames each test-pattern step is held for
    pub hold_frames: u64,
    /// Number of pattern cycles before quitting; runs forever when unset
    pub cycles: Option<u32>,
    pub touch_deadzone: f32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            pattern: TestPattern::default(),
            hold_frames: 12,
            cycles: None,
            touch_deadzone: crate::controller::gamepad_source::DEFAULT_TOUCH_DEADZONE,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct ClassifierConfig {
    pub palm: PalmStrategy,
    pub zone: ZoneStrategy,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Frames per second of the polling loop, 1..=100
    pub fps: u32,
    /// Send NoteOff for held palm and touchpad notes when the loop ends
    pub release_on_shutdown: bool,
    pub midi: MidiConfig,
    pub notes: NoteBases,
    pub calibration: Calibration,
    pub classifier: ClassifierConfig,
    pub source: SourceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fps: 25,
            release_on_shutdown: true,
            midi: MidiConfig::default(),
            notes: NoteBases::default(),
            calibration: Calibration::default(),
            classifier: ClassifierConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads an explicit file, or the default file when it exists, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        info!("Loading config from {}", path.display());
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::ReadError {
            path: path.clone(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Writes this config as pretty TOML, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::WriteError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| ConfigError::WriteError {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Wrote config to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.fps) {
            return Err(ConfigError::Invalid(format!(
                "fps must be in the range 1 to 100, got {}",
                self.fps
            )));
        }
        if self.midi.channel > 15 {
            return Err(ConfigError::Invalid(format!(
                "midi channel must be in the range 0 to 15, got {}",
                self.midi.channel
            )));
        }

        let bounds = &self.calibration.bounds;
        if !(bounds.max_x - bounds.min_x).is_normal() || !(bounds.max_y - bounds.min_y).is_normal()
        {
            return Err(ConfigError::Invalid(format!(
                "calibration bounds must span a non-empty range, got {:?}",
                bounds
            )));
        }
        for (hand, angle) in [
            ("left", self.calibration.left_hand_angle),
            ("right", self.calibration.right_hand_angle),
        ] {
            if !(0..360).contains(&angle) {
                return Err(ConfigError::Invalid(format!(
                    "{} hand angle must be in the range 0 to 359, got {}",
                    hand, angle
                )));
            }
        }

        self.classifier.palm.validate()?;
        self.classifier.zone.validate()?;

        if self.source.hold_frames == 0 {
            return Err(ConfigError::Invalid(
                "source.hold_frames must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.source.touch_deadzone) {
            return Err(ConfigError::Invalid(format!(
                "source.touch_deadzone must be in [0, 1), got {}",
                self.source.touch_deadzone
            )));
        }

        self.note_table().map(|_| ())
    }

    pub fn note_table(&self) -> Result<NoteTable, ConfigError> {
        Ok(NoteTable::with_bases(self.notes.left, self.notes.right)?)
    }
}
