//! Read-only views handed to renderers and tests

use serde::{Deserialize, Serialize};

use super::driver::Finish;
use super::piece::Capsule;
use super::player::{Phase, PlayerState};
use super::playfield::PlayField;

/// Everything needed to draw one player's side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub level: u32,
    pub ready: bool,
    pub phase: Phase,
    pub field: PlayField,
    pub active: Option<Capsule>,
    pub next: Capsule,
    pub viruses_remaining: usize,
    pub drop_inbound: bool,
    pub pieces_dropped: u32,
}

impl PlayerSnapshot {
    pub fn capture(player: &PlayerState) -> Self {
        Self {
            level: player.level(),
            ready: player.is_ready(),
            phase: player.phase(),
            field: player.field().clone(),
            active: player.active_capsule(),
            next: player.next_capsule(),
            viruses_remaining: player.viruses_remaining(),
            drop_inbound: player.is_drop_inbound(),
            pieces_dropped: player.pieces_dropped(),
        }
    }
}

/// Whole-match view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub seed: Option<u64>,
    pub started: bool,
    pub ended: bool,
    pub winner: Option<usize>,
    pub finishes: Vec<Finish>,
    pub players: Vec<PlayerSnapshot>,
}

impl MatchSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
