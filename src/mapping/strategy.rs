//! Selectable classifier heuristics.
//!
//! Tracking setups disagree on how decisive a palm or thumb position has to
//! be, so both classifiers take a strategy value from the configuration.
//! The defaults are the dominant-axis palm test and radial 8-sector zoning.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Center radius used by the radial zoning when none is configured
pub const DEFAULT_CENTER_RADIUS: f32 = 0.5;

/// How a pose's palm basis is turned into a palm direction
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PalmStrategy {
    /// Whichever of the vertical and depth components is larger decides
    #[default]
    DominantAxis,

    /// The vertical component decides once its magnitude reaches
    /// `threshold`, otherwise the depth component does
    Threshold { threshold: f32 },
}

impl PalmStrategy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            PalmStrategy::DominantAxis => Ok(()),
            PalmStrategy::Threshold { threshold } if *threshold > 0.0 && *threshold <= 1.0 => {
                Ok(())
            }
            PalmStrategy::Threshold { threshold } => Err(ConfigError::Invalid(format!(
                "palm threshold must be in (0, 1], got {}",
                threshold
            ))),
        }
    }
}

impl Display for PalmStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PalmStrategy::DominantAxis => write!(f, "dominant axis"),
            PalmStrategy::Threshold { threshold } => write!(f, "threshold {}", threshold),
        }
    }
}

/// How a touchpad displacement is turned into one of the nine zones
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZoneStrategy {
    /// Center disc of `center_radius`, eight 45 degree sectors around it
    Radial { center_radius: f32 },

    /// Pad split into thirds along both axes
    Grid,
}

impl Default for ZoneStrategy {
    fn default() -> Self {
        ZoneStrategy::Radial {
            center_radius: DEFAULT_CENTER_RADIUS,
        }
    }
}

impl ZoneStrategy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ZoneStrategy::Radial { center_radius } if *center_radius > 0.0 => Ok(()),
            ZoneStrategy::Radial { center_radius } => Err(ConfigError::Invalid(format!(
                "zone center radius must be positive, got {}",
                center_radius
            ))),
            ZoneStrategy::Grid => Ok(()),
        }
    }
}

impl Display for ZoneStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneStrategy::Radial { center_radius } => {
                write!(f, "radial (center radius {})", center_radius)
            }
            ZoneStrategy::Grid => write!(f, "3x3 grid"),
        }
    }
}
