//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed tick only (60 Hz)
//! - Seeded RNG only; the match seed is the single source of randomness
//! - Stable iteration order (by player index)
//! - No rendering or platform dependencies

pub mod driver;
pub mod garbage;
pub mod generator;
pub mod input;
pub mod piece;
pub mod player;
pub mod playfield;
pub mod snapshot;
pub mod space;

pub use driver::{Finish, FinishKind, MatchDriver};
pub use garbage::{DropPattern, distribute, pick_victims};
pub use generator::{generate, populate, validate};
pub use input::{ButtonEvent, PlayerInputs};
pub use piece::{Capsule, Orientation, Rotation};
pub use player::{Phase, PlayerEvent, PlayerState, new_player_rng};
pub use playfield::{PlayField, StepOutcome};
pub use snapshot::{MatchSnapshot, PlayerSnapshot};
pub use space::{Color, Content, Linkage, Space};
