//! Per-player state machine
//!
//! One `PlayerState` owns a board, its piece RNG and the capsule queue.
//! `step` advances it by one tick and reports anything other players need
//! to know about as a `PlayerEvent`; the driver applies those.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::generator;
use super::input::ButtonEvent;
use super::piece::Capsule;
use super::playfield::{PlayField, StepOutcome};
use super::space::{Color, Linkage, Space};
use crate::consts::{COMBO_MIN_CLEARS, SPAWN_COL, SPAWN_ROW};
use crate::error::SimError;
use crate::settings::Settings;
use crate::{clamp_level, gravity_ticks};

/// Lifecycle phase of one player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Match started, no capsule spawned yet
    Start,
    /// Capsule under player control
    PlacingPill(Capsule),
    /// Board resolving clears and falls
    Evaluate,
    /// Board settled, next capsule spawns this tick
    ReadyForNext,
    /// Pending garbage goes in before the next capsule
    InsertDrops,
    /// Spawn cell blocked (lost)
    FilledBoard,
    /// Every virus cleared (won)
    VirusesCleared,
}

impl Phase {
    /// True once the player has finished (won or lost)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::FilledBoard | Phase::VirusesCleared)
    }

    pub fn active_capsule(&self) -> Option<Capsule> {
        match self {
            Phase::PlacingPill(capsule) => Some(*capsule),
            _ => None,
        }
    }
}

/// Something a player's tick produced that the match has to react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Cascade finished with enough clears to attack; one color list per step
    Combo(Vec<Vec<Color>>),
    BoardFilled,
    VirusesCleared,
}

/// Piece RNG for a match seed. Every player gets the same capsule sequence.
pub fn new_player_rng(seed: u64) -> Pcg32 {
    Pcg32::seed_from_u64(seed)
}

#[derive(Debug, Clone)]
pub struct PlayerState {
    field: PlayField,
    piece_rng: Pcg32,
    next: Capsule,
    phase: Phase,
    level: u32,
    ready: bool,
    /// Ticks since the last gravity or cascade step
    ticks_since_step: u32,
    pieces_dropped: u32,
    /// Garbage batches waiting to be inserted, oldest first
    pending_drops: VecDeque<Vec<Color>>,
    /// Colors cleared by each step of the current cascade
    cleared_colors: Vec<Vec<Color>>,
}

impl PlayerState {
    pub fn new(level: u32, width: usize, height: usize) -> Self {
        let mut piece_rng = new_player_rng(0);
        let next = Capsule::spawn(&mut piece_rng);
        Self {
            field: PlayField::new(width, height),
            piece_rng,
            next,
            phase: Phase::Start,
            level: clamp_level(level as i64),
            ready: false,
            ticks_since_step: 0,
            pieces_dropped: 0,
            pending_drops: VecDeque::new(),
            cleared_colors: Vec::new(),
        }
    }

    /// Clear everything a match leaves behind. Level and readiness stay.
    pub fn reset(&mut self) {
        self.field.clear();
        self.phase = Phase::Start;
        self.ticks_since_step = 0;
        self.pieces_dropped = 0;
        self.pending_drops.clear();
        self.cleared_colors.clear();
    }

    /// Reset, then build the board and capsule queue for `seed`
    pub fn begin_match(&mut self, seed: u64) -> Result<(), SimError> {
        self.reset();
        generator::populate(&mut self.field, self.level, seed)?;
        self.piece_rng = new_player_rng(seed);
        self.next = Capsule::spawn(&mut self.piece_rng);
        Ok(())
    }

    pub fn field(&self) -> &PlayField {
        &self.field
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn next_capsule(&self) -> Capsule {
        self.next
    }

    pub fn active_capsule(&self) -> Option<Capsule> {
        self.phase.active_capsule()
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn set_level(&mut self, level: i64) {
        self.level = clamp_level(level);
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn pieces_dropped(&self) -> u32 {
        self.pieces_dropped
    }

    pub fn viruses_remaining(&self) -> usize {
        self.field.pathogen_count()
    }

    pub fn is_drop_inbound(&self) -> bool {
        !self.pending_drops.is_empty()
    }

    pub fn pending_drops(&self) -> usize {
        self.pending_drops.len()
    }

    pub fn is_alive(&self) -> bool {
        !self.phase.is_terminal()
    }

    /// Queue a garbage batch for insertion after the current cascade
    pub fn enqueue_drop(&mut self, batch: Vec<Color>) {
        self.pending_drops.push_back(batch);
    }

    /// Route movement and rotation to the active capsule. Ignored outside
    /// `PlacingPill`.
    pub fn apply_input(&mut self, events: &[ButtonEvent]) {
        let Phase::PlacingPill(capsule) = &mut self.phase else {
            return;
        };
        for &event in events {
            match event {
                ButtonEvent::LeftJustPressed => {
                    capsule.move_left(&self.field);
                }
                ButtonEvent::RightJustPressed => {
                    capsule.move_right(&self.field);
                }
                ButtonEvent::PrimaryJustPressed | ButtonEvent::SecondaryJustPressed => {
                    if let Some(rotation) = event.rotation() {
                        capsule.rotate(rotation, &self.field);
                    }
                }
                ButtonEvent::DownPressed => {}
            }
        }
    }

    /// Advance one tick
    pub fn step(
        &mut self,
        soft_drop: bool,
        settings: &Settings,
        garbage_rng: &mut Pcg32,
    ) -> Result<Option<PlayerEvent>, SimError> {
        match self.phase {
            Phase::Start | Phase::ReadyForNext => Ok(self.spawn_next()),
            Phase::PlacingPill(capsule) => self.gravity_step(capsule, soft_drop, settings),
            Phase::Evaluate => self.evaluate(false, settings),
            Phase::InsertDrops => {
                match self.pending_drops.pop_front() {
                    Some(batch) => {
                        self.insert_drop(&batch, settings.max_garbage_pieces, garbage_rng)?;
                        self.phase = Phase::Evaluate;
                    }
                    None => {
                        log::warn!("InsertDrops with an empty drop queue, skipping to next capsule");
                        self.phase = Phase::ReadyForNext;
                    }
                }
                Ok(None)
            }
            Phase::FilledBoard | Phase::VirusesCleared => Ok(None),
        }
    }

    fn spawn_next(&mut self) -> Option<PlayerEvent> {
        let spawn_open = self.field.is_open(SPAWN_ROW, SPAWN_COL)
            && self.field.is_open(SPAWN_ROW, SPAWN_COL + 1);
        if !spawn_open {
            self.phase = Phase::FilledBoard;
            return Some(PlayerEvent::BoardFilled);
        }

        let mut active = self.next;
        active.row = SPAWN_ROW;
        active.col = SPAWN_COL;
        self.next = Capsule::spawn(&mut self.piece_rng);
        self.phase = Phase::PlacingPill(active);
        None
    }

    fn gravity_step(
        &mut self,
        mut capsule: Capsule,
        soft_drop: bool,
        settings: &Settings,
    ) -> Result<Option<PlayerEvent>, SimError> {
        let gravity = gravity_ticks(self.pieces_dropped);
        let wait = if soft_drop && gravity > settings.soft_drop_ticks {
            settings.soft_drop_ticks
        } else {
            gravity
        };

        if self.ticks_since_step < wait {
            self.ticks_since_step += 1;
            return Ok(None);
        }

        let event = if capsule.descend(&self.field) {
            self.phase = Phase::PlacingPill(capsule);
            None
        } else {
            self.lock(capsule, settings)?
        };
        self.ticks_since_step = 0;
        Ok(event)
    }

    /// Write the capsule into the board and run the first cascade step now
    fn lock(&mut self, capsule: Capsule, settings: &Settings) -> Result<Option<PlayerEvent>, SimError> {
        if !capsule.lock(&mut self.field) {
            return Err(SimError::LockBlocked {
                row: capsule.row,
                col: capsule.col,
            });
        }
        self.pieces_dropped += 1;
        log::trace!(
            "piece {} locked at ({}, {})",
            self.pieces_dropped,
            capsule.row,
            capsule.col
        );
        self.phase = Phase::Evaluate;
        self.evaluate(true, settings)
    }

    /// One cascade step, gated by the cascade timer unless `ignore_timing`
    pub fn evaluate(
        &mut self,
        ignore_timing: bool,
        settings: &Settings,
    ) -> Result<Option<PlayerEvent>, SimError> {
        if !ignore_timing && self.ticks_since_step < settings.cascade_ticks {
            self.ticks_since_step += 1;
            return Ok(None);
        }
        self.ticks_since_step = 0;

        let (outcome, colors) = self.field.evaluate_one_step();
        let event = match outcome {
            StepOutcome::NoAction => {
                let clears: usize = self.cleared_colors.iter().map(Vec::len).sum();
                let cascade = std::mem::take(&mut self.cleared_colors);
                self.phase = if self.pending_drops.is_empty() {
                    Phase::ReadyForNext
                } else {
                    Phase::InsertDrops
                };
                (clears >= COMBO_MIN_CLEARS).then_some(PlayerEvent::Combo(cascade))
            }
            StepOutcome::Fall => {
                self.field.advance_one_step()?;
                None
            }
            StepOutcome::Clear => {
                self.field.advance_one_step()?;
                if self.field.pathogen_count() == 0 {
                    self.phase = Phase::VirusesCleared;
                    Some(PlayerEvent::VirusesCleared)
                } else {
                    self.cleared_colors.push(colors);
                    None
                }
            }
        };
        Ok(event)
    }

    /// Drop loose fragments into the top row, every other column from a
    /// random start
    pub fn insert_drop(
        &mut self,
        batch: &[Color],
        max_pieces: usize,
        rng: &mut Pcg32,
    ) -> Result<(), SimError> {
        if batch.len() < 2 {
            return Err(SimError::GarbageTooSmall { len: batch.len() });
        }

        let width = self.field.width();
        if width == 0 {
            return Err(SimError::BoardTooSmall {
                width,
                height: self.field.height(),
            });
        }
        let start = rng.random_range(0..width);
        for (i, &color) in batch.iter().take(max_pieces).enumerate() {
            let Some(piece) = Space::pill(color, Linkage::Unlinked) else {
                continue;
            };
            let col = (start + 2 * i) % width;
            self.field.force_put(0, col as i32, piece);
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn field_mut(&mut self) -> &mut PlayField {
        &mut self.field
    }

    #[cfg(test)]
    pub(crate) fn with_field(level: u32, field: PlayField) -> Self {
        let mut player = Self::new(level, field.width(), field.height());
        player.field = field;
        player
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::piece::Rotation;

    fn settings() -> Settings {
        Settings::default()
    }

    fn garbage_rng() -> Pcg32 {
        Pcg32::seed_from_u64(7)
    }

    /// Step until the phase leaves `PlacingPill` or `limit` ticks pass
    fn run_until_locked(player: &mut PlayerState, soft_drop: bool, limit: u32) -> Vec<PlayerEvent> {
        let settings = settings();
        let mut rng = garbage_rng();
        let mut events = Vec::new();
        for _ in 0..limit {
            if let Some(event) = player.step(soft_drop, &settings, &mut rng).unwrap() {
                events.push(event);
            }
            if !matches!(player.phase(), Phase::PlacingPill(_)) {
                break;
            }
        }
        events
    }

    #[test]
    fn test_start_spawns_capsule() {
        let mut player = PlayerState::new(5, 8, 16);
        player.begin_match(11).unwrap();
        let queued = player.next_capsule();
        let event = player.step(false, &settings(), &mut garbage_rng()).unwrap();
        assert!(event.is_none());
        let active = player.active_capsule().unwrap();
        assert_eq!(active.primary.color, queued.primary.color);
        assert_eq!((active.row, active.col), (SPAWN_ROW, SPAWN_COL));
    }

    #[test]
    fn test_blocked_spawn_fills_board() {
        let field = PlayField::from_ascii(&["....r...", "........", "........", "........"]);
        let mut player = PlayerState::with_field(0, field);
        let event = player.step(false, &settings(), &mut garbage_rng()).unwrap();
        assert_eq!(event, Some(PlayerEvent::BoardFilled));
        assert_eq!(player.phase(), Phase::FilledBoard);
        assert!(!player.is_alive());

        // Terminal phases ignore further ticks
        assert!(player.step(false, &settings(), &mut garbage_rng()).unwrap().is_none());
        assert_eq!(player.phase(), Phase::FilledBoard);
    }

    #[test]
    fn test_gravity_waits_for_speed_table() {
        let mut player = PlayerState::with_field(0, PlayField::new(8, 16));
        player.step(false, &settings(), &mut garbage_rng()).unwrap();
        let wait = gravity_ticks(0);
        for _ in 0..wait {
            player.step(false, &settings(), &mut garbage_rng()).unwrap();
        }
        assert_eq!(player.active_capsule().unwrap().row, 0);
        player.step(false, &settings(), &mut garbage_rng()).unwrap();
        assert_eq!(player.active_capsule().unwrap().row, 1);
    }

    #[test]
    fn test_soft_drop_shortens_wait() {
        let s = settings();
        let mut player = PlayerState::with_field(0, PlayField::new(8, 16));
        player.step(true, &s, &mut garbage_rng()).unwrap();
        for _ in 0..=s.soft_drop_ticks {
            player.step(true, &s, &mut garbage_rng()).unwrap();
        }
        assert_eq!(player.active_capsule().unwrap().row, 1);
    }

    #[test]
    fn test_lock_moves_to_evaluate() {
        let mut player = PlayerState::with_field(0, PlayField::new(8, 4));
        player.step(false, &settings(), &mut garbage_rng()).unwrap();
        let active = player.active_capsule().unwrap();

        run_until_locked(&mut player, true, 1_000);

        assert_eq!(player.pieces_dropped(), 1);
        assert_eq!(player.field().get(3, 3), Some(active.primary));
        assert_eq!(player.field().get(3, 4), Some(active.linked));
        // The immediate evaluation found nothing to resolve
        assert_eq!(player.phase(), Phase::ReadyForNext);
    }

    #[test]
    fn test_inputs_only_route_while_placing() {
        let mut player = PlayerState::with_field(0, PlayField::new(8, 16));
        player.apply_input(&[ButtonEvent::LeftJustPressed]);
        assert_eq!(player.phase(), Phase::Start);

        player.step(false, &settings(), &mut garbage_rng()).unwrap();
        player.apply_input(&[ButtonEvent::LeftJustPressed, ButtonEvent::LeftJustPressed]);
        assert_eq!(player.active_capsule().unwrap().col, SPAWN_COL - 2);
        player.apply_input(&[ButtonEvent::PrimaryJustPressed]);
        let capsule = player.active_capsule().unwrap();
        assert_eq!(capsule.primary.linkage, Linkage::Up);

        let mut expected = capsule;
        expected.rotate(Rotation::Clockwise, player.field());
        player.apply_input(&[ButtonEvent::PrimaryJustPressed]);
        assert_eq!(player.active_capsule(), Some(expected));
    }

    #[test]
    fn test_clearing_last_virus_wins() {
        // Red half lands on a red column of two viruses and a loose fragment
        let field = PlayField::from_ascii(&["........", "........", "...R....", "...R....", "...r...."]);
        let mut player = PlayerState::with_field(0, field);
        player.phase = Phase::PlacingPill(Capsule::new(Color::Red, Color::Blue).unwrap());

        // The evaluation run at lock time clears the column
        let events = run_until_locked(&mut player, true, 1_000);
        assert_eq!(events, vec![PlayerEvent::VirusesCleared]);
        assert_eq!(player.phase(), Phase::VirusesCleared);
        assert_eq!(player.viruses_remaining(), 0);
        assert!(!player.is_alive());
    }

    #[test]
    fn test_two_step_cascade_reports_combo() {
        // Blue row clears, the red fragments fall onto the red viruses, red clears
        let field = PlayField::from_ascii(&[
            "........",
            "........",
            "........",
            "r.......",
            "r.......",
            "bbbb....",
            "R.......",
            "R......Y",
        ]);
        let mut player = PlayerState::with_field(0, field);
        player.phase = Phase::Evaluate;
        let s = settings();
        let mut rng = garbage_rng();

        let mut events = Vec::new();
        for _ in 0..200 {
            if let Some(event) = player.step(false, &s, &mut rng).unwrap() {
                events.push(event);
            }
            if player.phase() == Phase::ReadyForNext {
                break;
            }
        }
        assert_eq!(player.phase(), Phase::ReadyForNext);
        assert_eq!(
            events,
            vec![PlayerEvent::Combo(vec![vec![Color::Blue], vec![Color::Red]])]
        );
        assert_eq!(player.viruses_remaining(), 1);
    }

    #[test]
    fn test_cascade_steps_wait_for_timer() {
        let field = PlayField::from_ascii(&["r.......", "........", "........", ".......Y"]);
        let mut player = PlayerState::with_field(0, field.clone());
        player.phase = Phase::Evaluate;
        let s = settings();
        let mut rng = garbage_rng();

        for _ in 0..s.cascade_ticks {
            assert!(player.step(false, &s, &mut rng).unwrap().is_none());
            assert_eq!(player.field(), &field);
        }
        player.step(false, &s, &mut rng).unwrap();
        assert!(player.field().is_open(0, 0));
        assert!(player.field().get(1, 0).unwrap().is_pill());
        assert_eq!(player.phase(), Phase::Evaluate);

        // Ignoring the timer advances straight away
        player.evaluate(true, &s).unwrap();
        assert!(player.field().get(2, 0).unwrap().is_pill());
    }

    #[test]
    fn test_lock_off_the_board_is_an_error() {
        let mut player = PlayerState::with_field(0, PlayField::new(8, 16));
        // Vertical at the top row: the linked half would sit above the board
        let mut capsule = Capsule::new(Color::Red, Color::Blue).unwrap();
        capsule.primary.linkage = Linkage::Up;
        capsule.linked.linkage = Linkage::Down;
        let err = player.lock(capsule, &settings()).unwrap_err();
        assert_eq!(err, SimError::LockBlocked { row: SPAWN_ROW, col: SPAWN_COL });
        assert!(!err.is_recoverable());
        assert_eq!(player.pieces_dropped(), 0);
        assert_eq!(player.field().cells().iter().filter(|s| s.is_pill()).count(), 0);
    }

    #[test]
    fn test_single_clear_is_not_a_combo() {
        let field = PlayField::from_ascii(&["........", "bbbb...Y"]);
        let mut player = PlayerState::with_field(0, field);
        player.phase = Phase::Evaluate;
        let s = settings();
        assert!(player.evaluate(true, &s).unwrap().is_none());
        assert_eq!(player.phase(), Phase::Evaluate);
        assert!(player.evaluate(true, &s).unwrap().is_none());
        assert_eq!(player.phase(), Phase::ReadyForNext);
    }

    #[test]
    fn test_settled_board_with_garbage_goes_to_insert() {
        let mut player = PlayerState::with_field(0, PlayField::new(8, 16));
        player.enqueue_drop(vec![Color::Red, Color::Blue]);
        player.phase = Phase::Evaluate;
        let s = settings();
        let mut rng = garbage_rng();

        player.evaluate(true, &s).unwrap();
        assert_eq!(player.phase(), Phase::InsertDrops);
        assert!(player.is_drop_inbound());

        player.step(false, &s, &mut rng).unwrap();
        assert_eq!(player.phase(), Phase::Evaluate);
        assert!(!player.is_drop_inbound());
        let top: Vec<Space> = player.field().rows().next().unwrap().to_vec();
        assert_eq!(top.iter().filter(|s| s.is_pill()).count(), 2);
    }

    #[test]
    fn test_insert_drop_columns() {
        let mut player = PlayerState::with_field(0, PlayField::new(8, 16));
        let batch = [Color::Red, Color::Blue, Color::Yellow, Color::Red, Color::Blue];
        let mut rng = garbage_rng();
        let start = garbage_rng().random_range(0..8usize);

        player.insert_drop(&batch, 4, &mut rng).unwrap();

        for (i, color) in batch.iter().take(4).enumerate() {
            let col = ((start + 2 * i) % 8) as i32;
            let space = player.field().get(0, col).unwrap();
            assert_eq!(space.color, *color);
            assert_eq!(space.linkage, Linkage::Unlinked);
        }
        assert_eq!(player.field().cells().iter().filter(|s| s.is_pill()).count(), 4);
    }

    #[test]
    fn test_insert_drop_rejects_small_batch() {
        let mut player = PlayerState::with_field(0, PlayField::new(8, 16));
        let err = player.insert_drop(&[Color::Red], 4, &mut garbage_rng()).unwrap_err();
        assert_eq!(err, SimError::GarbageTooSmall { len: 1 });
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_reset_keeps_level_and_ready() {
        let mut player = PlayerState::new(25, 8, 16);
        assert_eq!(player.level(), 20);
        player.set_ready(true);
        player.begin_match(3).unwrap();
        player.enqueue_drop(vec![Color::Red, Color::Red]);
        player.reset();
        assert_eq!(player.level(), 20);
        assert!(player.is_ready());
        assert_eq!(player.phase(), Phase::Start);
        assert_eq!(player.viruses_remaining(), 0);
        assert!(!player.is_drop_inbound());
    }

    #[test]
    fn test_begin_match_matches_generator() {
        let mut player = PlayerState::new(8, 8, 16);
        player.begin_match(404).unwrap();
        assert_eq!(player.field(), &generator::generate(8, 404));
        let mut rng = new_player_rng(404);
        assert_eq!(player.next_capsule(), Capsule::spawn(&mut rng));
    }
}
