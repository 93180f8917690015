//! Seeded virus board generation
//!
//! Boards are a pure function of (level, seed) so every player in a match
//! at the same level starts on the same layout.
//!
//! Placement never puts two same-colored viruses exactly two cells apart in
//! a row or column, which rules out three of a color inside any four-cell
//! window. `validate` re-checks that as a hard invariant.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::playfield::PlayField;
use super::space::{Color, Space};
use crate::consts::{BOARD_HEIGHT, BOARD_WIDTH, MAX_LEVEL};
use crate::error::SimError;

/// Virus rows below level 15
pub const BASE_VIRUS_ROWS: usize = 9;

/// Consecutive draws without a placement before an attempt is abandoned
const MAX_MISSES: u32 = 1_000;

/// Offsets checked for same-colored viruses around a candidate cell
const SECOND_NEIGHBORS: [(i32, i32); 4] = [(0, -2), (0, 2), (2, 0), (-2, 0)];

/// Number of viruses placed at `level`
pub fn virus_count(level: u32) -> usize {
    (level.min(MAX_LEVEL) * 4 + 4) as usize
}

/// Height of the band (counted up from the bottom row) viruses may occupy
pub fn virus_rows(level: u32) -> usize {
    let level = level.min(MAX_LEVEL);
    if level >= 15 {
        BASE_VIRUS_ROWS + ((level - 13) / 2) as usize
    } else {
        BASE_VIRUS_ROWS
    }
}

/// RNG for board generation at a given level
pub fn board_rng(level: u32, seed: u64) -> Pcg32 {
    Pcg32::seed_from_u64(seed ^ (level as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Generate a reference-size board
pub fn generate(level: u32, seed: u64) -> PlayField {
    let mut field = PlayField::new(BOARD_WIDTH, BOARD_HEIGHT);
    fill(&mut field, level, seed);
    field
}

/// Clear `field` and fill it with viruses for `level`. The field must be at
/// least reference size.
pub fn populate(field: &mut PlayField, level: u32, seed: u64) -> Result<(), SimError> {
    let (width, height) = (field.width(), field.height());
    if width < BOARD_WIDTH || height < BOARD_HEIGHT {
        return Err(SimError::BoardTooSmall { width, height });
    }
    fill(field, level, seed);
    Ok(())
}

fn fill(field: &mut PlayField, level: u32, seed: u64) {
    let level = level.min(MAX_LEVEL);
    let rows = virus_rows(level).min(field.height());
    let mut rng = board_rng(level, seed);

    let mut colors: Vec<Color> = (0..virus_count(level))
        .map(|i| match i % 3 {
            0 => Color::Red,
            1 => Color::Blue,
            _ => Color::Yellow,
        })
        .collect();

    let mut attempts = 0u32;
    loop {
        attempts += 1;
        colors.shuffle(&mut rng);
        field.clear();
        if place_canonical(field, rows, &colors, &mut rng) && validate(field) {
            break;
        }
    }

    log::debug!(
        "Level {} board: {} viruses in {} rows after {} attempt(s)",
        level,
        colors.len(),
        rows,
        attempts
    );
}

fn playable_index(color: Color) -> usize {
    Color::PLAYABLE
        .iter()
        .position(|&c| c == color)
        .unwrap_or(0)
}

/// Colors already present two cells away, indexed like `Color::PLAYABLE`
fn second_neighbor_colors(field: &PlayField, row: i32, col: i32) -> [bool; 3] {
    let mut taken = [false; 3];
    for (dr, dc) in SECOND_NEIGHBORS {
        if let Some(space) = field.get(row + dr, col + dc) {
            if space.color.is_playable() {
                taken[playable_index(space.color)] = true;
            }
        }
    }
    taken
}

/// First color at or below `preferred` (wrapping) that is not taken
fn pick_color(preferred: usize, taken: &[bool; 3]) -> Option<Color> {
    if taken.iter().all(|&t| t) {
        return None;
    }
    let mut index = preferred % 3;
    while taken[index] {
        index = if index == 0 { 2 } else { index - 1 };
    }
    Some(Color::PLAYABLE[index])
}

/// One placement attempt. Returns false if it got stuck.
fn place_canonical(field: &mut PlayField, rows: usize, colors: &[Color], rng: &mut Pcg32) -> bool {
    let width = field.width() as i32;
    let height = field.height() as i32;
    let max_row = field.bottom_row_index();
    let min_row = max_row - (rows as i32 - 1);

    let mut remaining = colors.len();
    let mut misses = 0u32;

    while remaining > 0 {
        misses += 1;
        if misses > MAX_MISSES {
            return false;
        }

        let mut col = rng.random_range(0..width);
        let mut row = rng.random_range(0..height);
        while row < min_row {
            row = rng.random_range(0..height);
        }

        let preferred = match remaining % 4 {
            3 => playable_index(colors[remaining - 1]),
            index => index,
        };

        // Walk down-right until an empty, live cell turns up or the band runs out
        let placement = loop {
            while field.get(row, col).is_some_and(|s| !s.is_empty()) {
                row += 1;
                col = (col + 1) % width;
            }
            if row > max_row {
                break None;
            }
            let taken = second_neighbor_colors(field, row, col);
            if let Some(color) = pick_color(preferred, &taken) {
                break Some((row, col, color));
            }
            row += 1;
            col = (col + 1) % width;
        };

        if let Some((row, col, color)) = placement {
            if let Some(virus) = Space::virus(color) {
                if field.put_if_empty(row, col, virus) {
                    remaining -= 1;
                    misses = 0;
                }
            }
        }
    }

    true
}

/// True when no 4-cell window in any row or column holds 3+ of one color
pub fn validate(field: &PlayField) -> bool {
    let width = field.width() as i32;
    let height = field.height() as i32;

    let window_ok = |cells: [Option<Space>; 4]| {
        let mut counts = [0u8; 3];
        for space in cells.into_iter().flatten() {
            if space.color.is_playable() {
                counts[playable_index(space.color)] += 1;
            }
        }
        counts.iter().all(|&n| n < 3)
    };

    for row in 0..height {
        for col in 0..width {
            let cells = [0, 1, 2, 3].map(|i| field.get(row, col - 3 + i));
            if !window_ok(cells) {
                return false;
            }
        }
    }

    for col in 0..width {
        for row in 0..height {
            let cells = [0, 1, 2, 3].map(|i| field.get(row - 3 + i, col));
            if !window_ok(cells) {
                return false;
            }
        }
    }

    true
}
