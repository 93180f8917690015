//! Match tuning
//!
//! Loaded from a JSON file when one is given, defaults otherwise. Missing
//! fields fall back to their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{
    BOARD_HEIGHT, BOARD_WIDTH, CASCADE_TICKS, DEFAULT_LEVEL, MAX_GARBAGE_PIECES, MAX_LEVEL,
    SOFT_DROP_TICKS,
};
use crate::error::ConfigError;

/// Match settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Board ===
    pub board_width: usize,
    pub board_height: usize,

    // === Players ===
    /// Level new players join at
    pub starting_level: u32,

    // === Timing (ticks at 60 Hz) ===
    /// Gravity wait while soft drop is held
    pub soft_drop_ticks: u32,
    /// Wait between cascade steps
    pub cascade_ticks: u32,

    // === Garbage ===
    /// Most fragments inserted from one batch
    pub max_garbage_pieces: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            board_width: BOARD_WIDTH,
            board_height: BOARD_HEIGHT,
            starting_level: DEFAULT_LEVEL,
            soft_drop_ticks: SOFT_DROP_TICKS,
            cascade_ticks: CASCADE_TICKS,
            max_garbage_pieces: MAX_GARBAGE_PIECES,
        }
    }
}

impl Settings {
    /// Parse and validate settings from JSON text
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Range checks the simulation relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board_width < BOARD_WIDTH || self.board_height < BOARD_HEIGHT {
            return Err(ConfigError::Invalid(format!(
                "board must be at least {}x{}, got {}x{}",
                BOARD_WIDTH, BOARD_HEIGHT, self.board_width, self.board_height
            )));
        }
        if self.starting_level > MAX_LEVEL {
            return Err(ConfigError::Invalid(format!(
                "starting_level {} above {}",
                self.starting_level, MAX_LEVEL
            )));
        }
        if self.soft_drop_ticks == 0 {
            return Err(ConfigError::Invalid("soft_drop_ticks must be positive".into()));
        }
        // Fragments go in every other column of the top row
        if self.max_garbage_pieces == 0 || self.max_garbage_pieces * 2 > self.board_width {
            return Err(ConfigError::Invalid(format!(
                "max_garbage_pieces must be in 1..={}, got {}",
                self.board_width / 2,
                self.max_garbage_pieces
            )));
        }
        Ok(())
    }
}
