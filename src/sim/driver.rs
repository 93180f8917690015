//! Match orchestration
//!
//! The driver owns every player and advances them in index order once per
//! tick. Everything downstream of the match seed is deterministic: boards,
//! capsule sequences and garbage columns all derive from it, so a match is
//! a pure function of (seed, input trace).

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::garbage;
use super::input::{PlayerInputs, soft_drop_held};
use super::piece::Capsule;
use super::player::{Phase, PlayerEvent, PlayerState};
use super::playfield::PlayField;
use super::snapshot::{MatchSnapshot, PlayerSnapshot};
use crate::error::{ConfigError, SimError};
use crate::settings::Settings;

/// PCG stream for garbage column draws
const GARBAGE_STREAM: u64 = 0x0a02_bdbf_7bb3_c0a7;

/// How a player left the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishKind {
    Filled,
    Cleared,
}

/// One finish, recorded in the order they happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finish {
    pub player: usize,
    pub kind: FinishKind,
}

/// Garbage column RNG for a match seed
pub fn garbage_rng(seed: u64) -> Pcg32 {
    Pcg32::new(seed, GARBAGE_STREAM)
}

pub struct MatchDriver {
    settings: Settings,
    players: Vec<PlayerState>,
    /// Source of match seeds
    match_rng: Pcg32,
    garbage_rng: Pcg32,
    seed: Option<u64>,
    started: bool,
    ended: bool,
    winner: Option<usize>,
    finishes: Vec<Finish>,
}

impl Default for MatchDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchDriver {
    /// Default settings, match seeds drawn from OS entropy
    pub fn new() -> Self {
        Self::with_rng(Settings::default(), Pcg32::from_os_rng())
    }

    pub fn with_settings(settings: Settings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self::with_rng(settings, Pcg32::from_os_rng()))
    }

    /// Match seeds drawn from a seeded RNG, for reproducible sessions
    pub fn with_seed(settings: Settings, seed: u64) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self::with_rng(settings, Pcg32::seed_from_u64(seed)))
    }

    fn with_rng(settings: Settings, match_rng: Pcg32) -> Self {
        Self {
            settings,
            players: Vec::new(),
            match_rng,
            garbage_rng: garbage_rng(0),
            seed: None,
            started: false,
            ended: false,
            winner: None,
            finishes: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Add a player at the configured starting level. Returns its index.
    pub fn add_player(&mut self) -> usize {
        self.players.push(PlayerState::new(
            self.settings.starting_level,
            self.settings.board_width,
            self.settings.board_height,
        ));
        self.players.len() - 1
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, index: usize) -> Result<&PlayerState, SimError> {
        let count = self.players.len();
        self.players
            .get(index)
            .ok_or(SimError::PlayerOutOfRange { index, count })
    }

    fn player_mut(&mut self, index: usize) -> Result<&mut PlayerState, SimError> {
        let count = self.players.len();
        self.players
            .get_mut(index)
            .ok_or(SimError::PlayerOutOfRange { index, count })
    }

    // === Lobby ===

    /// Shift a player's level by `delta`, clamped to the level range
    pub fn change_level(&mut self, index: usize, delta: i64) -> Result<(), SimError> {
        let player = self.player_mut(index)?;
        let level = player.level() as i64 + delta;
        player.set_level(level);
        Ok(())
    }

    pub fn set_level(&mut self, index: usize, level: i64) -> Result<(), SimError> {
        self.player_mut(index)?.set_level(level);
        Ok(())
    }

    pub fn level(&self, index: usize) -> Result<u32, SimError> {
        Ok(self.player(index)?.level())
    }

    pub fn set_ready(&mut self, index: usize, ready: bool) -> Result<(), SimError> {
        self.player_mut(index)?.set_ready(ready);
        Ok(())
    }

    pub fn is_ready(&self, index: usize) -> Result<bool, SimError> {
        Ok(self.player(index)?.is_ready())
    }

    /// True when there is at least one player and all of them are ready
    pub fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(PlayerState::is_ready)
    }

    // === Match lifecycle ===

    /// Start a match with a seed from the match RNG. Ignored while a match
    /// is running.
    pub fn start_match(&mut self) -> Result<(), SimError> {
        if self.in_progress() {
            log::debug!("start_match ignored, match in progress");
            return Ok(());
        }
        let seed = self.match_rng.random::<u64>();
        self.begin(seed)
    }

    /// Start a match with a fixed seed. Ignored while a match is running.
    pub fn start_match_with_seed(&mut self, seed: u64) -> Result<(), SimError> {
        if self.in_progress() {
            log::debug!("start_match_with_seed ignored, match in progress");
            return Ok(());
        }
        self.begin(seed)
    }

    /// Abandon whatever is running and start fresh
    pub fn reset_and_start_match(&mut self) -> Result<(), SimError> {
        for player in &mut self.players {
            player.reset();
        }
        self.started = false;
        self.ended = false;
        self.winner = None;
        self.finishes.clear();
        self.start_match()
    }

    fn in_progress(&self) -> bool {
        self.started && !self.ended
    }

    fn begin(&mut self, seed: u64) -> Result<(), SimError> {
        for player in &mut self.players {
            player.begin_match(seed)?;
        }
        self.garbage_rng = garbage_rng(seed);
        self.seed = Some(seed);
        self.finishes.clear();
        self.winner = None;
        self.ended = false;
        self.started = true;
        log::info!(
            "Match started: {} player(s), seed {}",
            self.players.len(),
            seed
        );
        Ok(())
    }

    /// Advance every player by one tick
    pub fn tick(&mut self, inputs: &PlayerInputs) -> Result<(), SimError> {
        if !self.in_progress() {
            return Ok(());
        }

        for index in 0..self.players.len() {
            let events = inputs.get(&index).map(Vec::as_slice).unwrap_or(&[]);
            let player = &mut self.players[index];
            player.apply_input(events);
            let event = player.step(soft_drop_held(events), &self.settings, &mut self.garbage_rng)?;

            if let Some(event) = event {
                self.apply_event(index, event);
            }
            if self.ended {
                break;
            }
        }
        Ok(())
    }

    fn apply_event(&mut self, index: usize, event: PlayerEvent) {
        match event {
            PlayerEvent::Combo(clears) => {
                garbage::distribute(index, &clears, &mut self.players);
            }
            PlayerEvent::BoardFilled => {
                self.finishes.push(Finish {
                    player: index,
                    kind: FinishKind::Filled,
                });
                log::info!("Player {} filled their board", index);

                let filled = self
                    .players
                    .iter()
                    .filter(|p| p.phase() == Phase::FilledBoard)
                    .count();
                if filled + 1 >= self.players.len() {
                    let winner = self
                        .players
                        .iter()
                        .rposition(|p| p.phase() != Phase::FilledBoard);
                    self.finish(winner);
                }
            }
            PlayerEvent::VirusesCleared => {
                self.finishes.push(Finish {
                    player: index,
                    kind: FinishKind::Cleared,
                });
                log::info!("Player {} cleared every virus", index);
                self.finish(Some(index));
            }
        }
    }

    fn finish(&mut self, winner: Option<usize>) {
        self.ended = true;
        self.winner = winner;
        match winner {
            Some(index) => log::info!("Match over, player {} wins", index),
            None => log::info!("Match over, no winner"),
        }
    }

    // === Per-player queries ===

    pub fn viruses_remaining(&self, index: usize) -> Result<usize, SimError> {
        Ok(self.player(index)?.viruses_remaining())
    }

    pub fn next_capsule(&self, index: usize) -> Result<Capsule, SimError> {
        Ok(self.player(index)?.next_capsule())
    }

    pub fn active_capsule(&self, index: usize) -> Result<Option<Capsule>, SimError> {
        Ok(self.player(index)?.active_capsule())
    }

    pub fn is_drop_inbound(&self, index: usize) -> Result<bool, SimError> {
        Ok(self.player(index)?.is_drop_inbound())
    }

    pub fn playfield(&self, index: usize) -> Result<&PlayField, SimError> {
        Ok(self.player(index)?.field())
    }

    pub fn phase(&self, index: usize) -> Result<Phase, SimError> {
        Ok(self.player(index)?.phase())
    }

    pub fn snapshot(&self, index: usize) -> Result<PlayerSnapshot, SimError> {
        Ok(PlayerSnapshot::capture(self.player(index)?))
    }

    // === Match queries ===

    pub fn winner(&self) -> Option<usize> {
        self.winner
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn finishes(&self) -> &[Finish] {
        &self.finishes
    }

    /// Seed of the current (or last) match
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn match_snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            seed: self.seed,
            started: self.started,
            ended: self.ended,
            winner: self.winner,
            finishes: self.finishes.clone(),
            players: self.players.iter().map(PlayerSnapshot::capture).collect(),
        }
    }
}
