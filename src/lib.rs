//! Breaktime - versus falling-capsule puzzle simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (boards, capsules, garbage, match flow)
//! - `settings`: Data-driven match tuning
//! - `error`: Error types shared by the above
//!
//! Rendering, input polling and audio live outside this crate; they drive
//! [`sim::MatchDriver::tick`] once per frame and read back snapshots.

pub mod error;
pub mod settings;
pub mod sim;

pub use error::{ConfigError, SimError};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Simulation rate the timing tables are expressed in
    pub const TICKS_PER_SECOND: u32 = 60;

    /// Reference board dimensions
    pub const BOARD_WIDTH: usize = 8;
    pub const BOARD_HEIGHT: usize = 16;

    /// Spawn cell of the primary capsule half (the linked half sits at col + 1)
    pub const SPAWN_ROW: i32 = 0;
    pub const SPAWN_COL: i32 = 3;

    /// Level bounds and the level new players join at
    pub const MIN_LEVEL: u32 = 0;
    pub const MAX_LEVEL: u32 = 20;
    pub const DEFAULT_LEVEL: u32 = 10;

    /// Frames (at 30 fps) per gravity row, indexed by pieces dropped / 10
    pub const SPEED_TABLE: [u32; 50] = [
        20, 19, 18, 17, 16, 15, 14, 13, 12, 11, 10, 10, 9, 9, 8, 8, 7, 7, 6, 6, 6, 6, 6, 6, 6, 6,
        6, 6, 6, 6, 5, 5, 5, 5, 5, 4, 4, 4, 4, 4, 3, 3, 3, 3, 3, 2, 2, 2, 2, 2,
    ];

    /// Gravity wait while soft drop is held (a tenth of a second)
    pub const SOFT_DROP_TICKS: u32 = 5;

    /// Ticks between cascade steps while the board resolves
    pub const CASCADE_TICKS: u32 = 7;

    /// Most fragments a single garbage batch can place
    pub const MAX_GARBAGE_PIECES: usize = 4;

    /// Combo threshold: total cleared runs needed before garbage is sent
    pub const COMBO_MIN_CLEARS: usize = 2;
}

/// Ticks to wait before the active capsule falls one row
///
/// The table is in 30 fps frames, so the value is doubled for the 60 Hz tick.
#[inline]
pub fn gravity_ticks(pieces_dropped: u32) -> u32 {
    use consts::SPEED_TABLE;
    let index = ((pieces_dropped / 10) as usize).min(SPEED_TABLE.len() - 1);
    SPEED_TABLE[index] * 2
}

/// Clamp a level into the playable range
#[inline]
pub fn clamp_level(level: i64) -> u32 {
    level.clamp(consts::MIN_LEVEL as i64, consts::MAX_LEVEL as i64) as u32
}
