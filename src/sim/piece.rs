//! Active capsule movement and rotation
//!
//! The capsule is positioned by its primary half. A horizontal capsule has
//! the linked half to the right of the primary, a vertical one has it above.
//! Nothing here writes to the board until `lock`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::playfield::PlayField;
use super::space::{Color, Content, Linkage, Space};
use crate::consts::{SPAWN_COL, SPAWN_ROW};

/// Rotation direction (primary button = clockwise)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Rotation attempts as (cell that must be empty, root shift), relative to
/// the root. The first attempt whose cell is open wins.
const HORIZONTAL_TO_VERTICAL: [((i32, i32), (i32, i32)); 4] = [
    ((-1, 0), (0, 0)), // up in place
    ((-1, 1), (0, 1)), // linked half becomes the root
    ((1, 0), (1, 0)),  // drop a row
    ((1, 1), (1, 1)),  // drop a row under the linked half
];

const VERTICAL_TO_HORIZONTAL: [((i32, i32), (i32, i32)); 2] = [
    ((0, 1), (0, 0)),   // right in place
    ((0, -1), (0, -1)), // kick off the right obstruction
];

/// A two-half capsule in play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capsule {
    pub primary: Space,
    pub linked: Space,
    pub row: i32,
    pub col: i32,
}

impl Capsule {
    /// Horizontal capsule at the spawn cell. `None` if either color is `None`.
    pub fn new(primary: Color, linked: Color) -> Option<Self> {
        let (primary, linked) = Space::linked_pair(Linkage::Right, primary, linked)?;
        Some(Self {
            primary,
            linked,
            row: SPAWN_ROW,
            col: SPAWN_COL,
        })
    }

    /// Random colors from the player's piece RNG
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut half = |linkage| Space {
            content: Content::Pill,
            color: Color::PLAYABLE[rng.random_range(0..Color::PLAYABLE.len())],
            linkage,
        };
        let primary = half(Linkage::Right);
        let linked = half(Linkage::Left);
        Self {
            primary,
            linked,
            row: SPAWN_ROW,
            col: SPAWN_COL,
        }
    }

    pub fn orientation(&self) -> Orientation {
        if self.primary.linkage == Linkage::Up {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        }
    }

    pub fn linked_position(&self) -> (i32, i32) {
        PlayField::linked_offset(self.row, self.col, self.primary.linkage)
    }

    /// Both halves with their board coordinates, primary first
    pub fn cells(&self) -> [(i32, i32, Space); 2] {
        let (linked_row, linked_col) = self.linked_position();
        [
            (self.row, self.col, self.primary),
            (linked_row, linked_col, self.linked),
        ]
    }

    pub fn move_left(&mut self, field: &PlayField) -> bool {
        if !field.is_open(self.row, self.col - 1) {
            return false;
        }
        if self.orientation() == Orientation::Vertical && !field.is_open(self.row - 1, self.col - 1) {
            return false;
        }
        self.col -= 1;
        true
    }

    pub fn move_right(&mut self, field: &PlayField) -> bool {
        let open = match self.orientation() {
            Orientation::Vertical => {
                field.is_open(self.row, self.col + 1) && field.is_open(self.row - 1, self.col + 1)
            }
            Orientation::Horizontal => field.is_open(self.row, self.col + 2),
        };
        if open {
            self.col += 1;
        }
        open
    }

    /// Rotate with kicks. Returns false (and leaves the capsule alone) when
    /// every attempt is blocked.
    pub fn rotate(&mut self, rotation: Rotation, field: &PlayField) -> bool {
        let (attempts, target, swap): (&[((i32, i32), (i32, i32))], _, _) = match self.orientation() {
            Orientation::Horizontal => (
                &HORIZONTAL_TO_VERTICAL,
                Orientation::Vertical,
                rotation == Rotation::Clockwise,
            ),
            Orientation::Vertical => (
                &VERTICAL_TO_HORIZONTAL,
                Orientation::Horizontal,
                rotation == Rotation::CounterClockwise,
            ),
        };

        let Some(&(_, (dr, dc))) = attempts
            .iter()
            .find(|((pr, pc), _)| field.is_open(self.row + pr, self.col + pc))
        else {
            return false;
        };

        self.row += dr;
        self.col += dc;
        if swap {
            std::mem::swap(&mut self.primary, &mut self.linked);
        }
        let linkage = match target {
            Orientation::Vertical => Linkage::Up,
            Orientation::Horizontal => Linkage::Right,
        };
        self.primary.linkage = linkage;
        self.linked.linkage = linkage.opposite();
        true
    }

    /// True when both halves have an empty cell directly below
    pub fn can_descend(&self, field: &PlayField) -> bool {
        self.cells()
            .iter()
            .all(|&(row, col, _)| field.is_open(row + 1, col))
    }

    /// Move down one row if possible
    pub fn descend(&mut self, field: &PlayField) -> bool {
        let can = self.can_descend(field);
        if can {
            self.row += 1;
        }
        can
    }

    /// Write both halves into the board
    pub fn lock(&self, field: &mut PlayField) -> bool {
        field.place_linked_pair(self.row, self.col, self.primary, self.linked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn capsule() -> Capsule {
        Capsule::new(Color::Red, Color::Blue).unwrap()
    }

    fn vertical_at(row: i32, col: i32) -> Capsule {
        let mut c = capsule();
        c.primary.linkage = Linkage::Up;
        c.linked.linkage = Linkage::Down;
        c.row = row;
        c.col = col;
        c
    }

    #[test]
    fn test_spawn_is_horizontal_at_spawn_cell() {
        let mut rng = Pcg32::seed_from_u64(3);
        let c = Capsule::spawn(&mut rng);
        assert_eq!((c.row, c.col), (SPAWN_ROW, SPAWN_COL));
        assert_eq!(c.orientation(), Orientation::Horizontal);
        assert_eq!(c.linked_position(), (SPAWN_ROW, SPAWN_COL + 1));
        assert!(c.primary.color.is_playable() && c.linked.color.is_playable());
    }

    #[test]
    fn test_moves_stop_at_walls() {
        let field = PlayField::new(8, 16);
        let mut c = capsule();
        while c.move_left(&field) {}
        assert_eq!(c.col, 0);
        while c.move_right(&field) {}
        assert_eq!(c.col, 6);
        assert_eq!(c.linked_position().1, 7);
    }

    #[test]
    fn test_blocked_move_is_idempotent() {
        let mut field = PlayField::new(8, 16);
        field.force_put(0, 2, Space::virus(Color::Yellow).unwrap());
        field.force_put(0, 5, Space::virus(Color::Yellow).unwrap());
        let mut c = capsule();
        let before = c;
        for _ in 0..10 {
            assert!(!c.move_left(&field));
            assert!(!c.move_right(&field));
        }
        assert_eq!(c, before);
    }

    #[test]
    fn test_vertical_move_checks_both_halves() {
        let mut field = PlayField::new(8, 16);
        // Only the upper half is obstructed on each side
        field.force_put(4, 2, Space::virus(Color::Red).unwrap());
        field.force_put(4, 4, Space::virus(Color::Red).unwrap());
        let mut c = vertical_at(5, 3);
        assert!(!c.move_left(&field));
        assert!(!c.move_right(&field));
        assert_eq!(c.col, 3);
    }

    #[test]
    fn test_rotate_clockwise_round_trip() {
        let field = PlayField::new(8, 16);
        let mut c = capsule();
        c.row = 5;

        assert!(c.rotate(Rotation::Clockwise, &field));
        assert_eq!(c.orientation(), Orientation::Vertical);
        // Left half went to the top
        assert_eq!(c.primary.color, Color::Blue);
        assert_eq!(c.linked.color, Color::Red);
        assert_eq!((c.row, c.col), (5, 3));

        assert!(c.rotate(Rotation::Clockwise, &field));
        assert_eq!(c.orientation(), Orientation::Horizontal);
        assert_eq!(c.primary.color, Color::Blue);
        assert_eq!(c.primary.linkage, Linkage::Right);
        assert_eq!(c.linked.linkage, Linkage::Left);
    }

    #[test]
    fn test_rotate_counter_clockwise_keeps_primary_at_bottom() {
        let field = PlayField::new(8, 16);
        let mut c = capsule();
        c.row = 5;
        assert!(c.rotate(Rotation::CounterClockwise, &field));
        assert_eq!(c.primary.color, Color::Red);
        assert_eq!(c.primary.linkage, Linkage::Up);

        assert!(c.rotate(Rotation::CounterClockwise, &field));
        assert_eq!(c.primary.color, Color::Blue);
        assert_eq!(c.orientation(), Orientation::Horizontal);
    }

    #[test]
    fn test_vertical_kicks_off_right_wall() {
        let field = PlayField::new(8, 16);
        let mut c = vertical_at(5, 7);
        assert!(c.rotate(Rotation::Clockwise, &field));
        assert_eq!((c.row, c.col), (5, 6));
        assert_eq!(c.linked_position(), (5, 7));
    }

    #[test]
    fn test_vertical_rotation_blocked_both_sides() {
        let mut field = PlayField::new(8, 16);
        field.force_put(5, 2, Space::virus(Color::Red).unwrap());
        field.force_put(5, 4, Space::virus(Color::Red).unwrap());
        let mut c = vertical_at(5, 3);
        let before = c;
        assert!(!c.rotate(Rotation::Clockwise, &field));
        assert!(!c.rotate(Rotation::CounterClockwise, &field));
        assert_eq!(c, before);
    }

    #[test]
    fn test_horizontal_rotation_at_top_drops_a_row() {
        let field = PlayField::new(8, 16);
        let mut c = capsule();
        assert!(c.rotate(Rotation::Clockwise, &field));
        assert_eq!((c.row, c.col), (1, 3));
        assert_eq!(c.linked_position(), (0, 3));
    }

    #[test]
    fn test_horizontal_rotation_uses_linked_column() {
        let mut field = PlayField::new(8, 16);
        field.force_put(4, 3, Space::virus(Color::Blue).unwrap());
        let mut c = capsule();
        c.row = 5;
        assert!(c.rotate(Rotation::Clockwise, &field));
        assert_eq!((c.row, c.col), (5, 4));
    }

    #[test]
    fn test_horizontal_rotation_fully_blocked() {
        let mut field = PlayField::new(8, 16);
        for col in 3..=4 {
            field.force_put(4, col, Space::virus(Color::Blue).unwrap());
            field.force_put(6, col, Space::virus(Color::Blue).unwrap());
        }
        let mut c = capsule();
        c.row = 5;
        let before = c;
        assert!(!c.rotate(Rotation::Clockwise, &field));
        assert_eq!(c, before);
    }

    #[test]
    fn test_descend_and_lock() {
        let mut field = PlayField::new(8, 4);
        let mut c = capsule();
        while c.descend(&field) {}
        assert_eq!(c.row, 3);
        assert!(!c.can_descend(&field));
        assert!(c.lock(&mut field));
        assert_eq!(field.get(3, 3), Some(c.primary));
        assert_eq!(field.get(3, 4), Some(c.linked));
    }

    #[test]
    fn test_horizontal_descent_blocked_under_either_half() {
        let mut field = PlayField::new(8, 16);
        field.force_put(1, 4, Space::virus(Color::Yellow).unwrap());
        let c = capsule();
        assert!(!c.can_descend(&field));
    }
}
