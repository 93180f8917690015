//! Error types for the simulation core and its configuration

use thiserror::Error;

/// Errors raised by the simulation.
///
/// `PlayerOutOfRange` is an ordinary caller mistake and can be handled.
/// The remaining variants mean upstream state was built wrong; a tick that
/// returns one of them must be treated as aborted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("player index {index} not in range (player count {count})")]
    PlayerOutOfRange { index: usize, count: usize },

    #[error("broken capsule link at row {row}, col {col}")]
    BrokenLink { row: i32, col: i32 },

    #[error("garbage drop needs at least 2 pieces, got {len}")]
    GarbageTooSmall { len: usize },

    #[error("board {width}x{height} is below the minimum size")]
    BoardTooSmall { width: usize, height: usize },

    #[error("capsule at row {row}, col {col} does not fit the board")]
    LockBlocked { row: i32, col: i32 },
}

impl SimError {
    /// Whether the caller can carry on after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SimError::PlayerOutOfRange { .. })
    }
}

/// Errors raised while loading or validating [`crate::Settings`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}
