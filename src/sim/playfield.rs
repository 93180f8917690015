//! Board grid and cascade engine
//!
//! Row 0 is the top of the board. Out-of-bounds lookups return `None`, which
//! every caller treats as a blocked cell.
//!
//! Resolution happens one physical step at a time: `evaluate_one_step` looks
//! ahead without mutating, `advance_one_step` applies the same step. Clears
//! (any horizontal or vertical run of 4+ same-colored cells) win over falls.

use serde::{Deserialize, Serialize};

use super::space::{Color, Linkage, Space};
use crate::error::SimError;

/// Minimum run length that clears
pub const CLEAR_RUN: usize = 4;

/// What the next cascade step would do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    NoAction,
    Fall,
    Clear,
}

/// Fixed-size grid of spaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayField {
    width: usize,
    height: usize,
    cells: Vec<Space>,
}

impl PlayField {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Space::EMPTY; width * height],
        }
    }

    /// Empty every cell
    pub fn clear(&mut self) {
        self.cells.fill(Space::EMPTY);
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn bottom_row_index(&self) -> i32 {
        self.height as i32 - 1
    }

    /// Row-major view of all cells
    pub fn cells(&self) -> &[Space] {
        &self.cells
    }

    /// Iterate rows top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Space]> {
        self.cells.chunks(self.width.max(1))
    }

    #[inline]
    fn index(&self, row: i32, col: i32) -> Option<usize> {
        if row < 0 || col < 0 || row as usize >= self.height || col as usize >= self.width {
            return None;
        }
        Some(row as usize * self.width + col as usize)
    }

    /// Space at (row, col), or `None` when out of bounds
    #[inline]
    pub fn get(&self, row: i32, col: i32) -> Option<Space> {
        self.index(row, col).map(|i| self.cells[i])
    }

    /// True when (row, col) is on the board and empty
    #[inline]
    pub fn is_open(&self, row: i32, col: i32) -> bool {
        self.get(row, col).is_some_and(|s| s.is_empty())
    }

    /// Overwrite a cell. Returns false if out of bounds.
    ///
    /// Overwriting one half of a capsule leaves the other half unlinked.
    pub fn force_put(&mut self, row: i32, col: i32, space: Space) -> bool {
        let Some(i) = self.index(row, col) else {
            return false;
        };
        let old = self.cells[i];
        if old.is_pill() && old.is_linked() {
            let (pr, pc) = Self::linked_offset(row, col, old.linkage);
            if let Some(p) = self.index(pr, pc) {
                if self.cells[p].linkage == old.linkage.opposite() {
                    self.cells[p].linkage = Linkage::Unlinked;
                }
            }
        }
        self.cells[i] = space;
        true
    }

    /// Write a cell only if it is empty. Returns whether it was written.
    pub fn put_if_empty(&mut self, row: i32, col: i32, space: Space) -> bool {
        match self.index(row, col) {
            Some(i) if self.cells[i].is_empty() => {
                self.cells[i] = space;
                true
            }
            _ => false,
        }
    }

    /// Write `primary` at (row, col) and `linked` at the cell its linkage
    /// points to. Writes nothing and returns false if either cell is off the
    /// board.
    pub fn place_linked_pair(&mut self, row: i32, col: i32, primary: Space, linked: Space) -> bool {
        let (linked_row, linked_col) = Self::linked_offset(row, col, primary.linkage);
        match (self.index(row, col), self.index(linked_row, linked_col)) {
            (Some(a), Some(b)) => {
                self.cells[a] = primary;
                self.cells[b] = linked;
                true
            }
            _ => false,
        }
    }

    /// Coordinate of the partner of a half at (row, col) with `linkage`
    #[inline]
    pub fn linked_offset(row: i32, col: i32, linkage: Linkage) -> (i32, i32) {
        let (dr, dc) = linkage.delta();
        (row + dr, col + dc)
    }

    pub fn pathogen_count(&self) -> usize {
        self.cells.iter().filter(|s| s.is_virus()).count()
    }

    /// Look ahead at the next cascade step without changing the board.
    ///
    /// On `Clear` the color list has one entry per cleared run.
    pub fn evaluate_one_step(&self) -> (StepOutcome, Vec<Color>) {
        let (_, colors) = self.find_runs();
        if !colors.is_empty() {
            return (StepOutcome::Clear, colors);
        }
        if self.falling_cells().iter().any(|&f| f) {
            return (StepOutcome::Fall, Vec::new());
        }
        (StepOutcome::NoAction, Vec::new())
    }

    /// Apply one cascade step: clear every run, or drop every unsupported
    /// piece one row.
    pub fn advance_one_step(&mut self) -> Result<(), SimError> {
        self.check_links()?;

        let (marked, colors) = self.find_runs();
        if !colors.is_empty() {
            self.apply_clear(&marked);
            return Ok(());
        }

        let falling = self.falling_cells();
        if falling.iter().any(|&f| f) {
            self.apply_fall(&falling);
        }
        Ok(())
    }

    /// Every linked half must have a partner that links back
    fn check_links(&self) -> Result<(), SimError> {
        for row in 0..self.height as i32 {
            for col in 0..self.width as i32 {
                let Some(space) = self.get(row, col) else {
                    continue;
                };
                if !space.is_pill() || !space.is_linked() {
                    continue;
                }
                let (pr, pc) = Self::linked_offset(row, col, space.linkage);
                match self.get(pr, pc) {
                    Some(partner) if partner.is_pill() && partner.linkage == space.linkage.opposite() => {}
                    _ => return Err(SimError::BrokenLink { row, col }),
                }
            }
        }
        Ok(())
    }

    /// Mark cells in runs of `CLEAR_RUN`+ and collect one color per run
    fn find_runs(&self) -> (Vec<bool>, Vec<Color>) {
        let mut marked = vec![false; self.cells.len()];
        let mut colors = Vec::new();

        // Horizontal
        for row in 0..self.height {
            let mut col = 0;
            while col < self.width {
                let color = self.cells[row * self.width + col].color;
                let mut end = col + 1;
                while end < self.width && self.cells[row * self.width + end].color == color {
                    end += 1;
                }
                if color.is_playable() && end - col >= CLEAR_RUN {
                    for c in col..end {
                        marked[row * self.width + c] = true;
                    }
                    colors.push(color);
                }
                col = end;
            }
        }

        // Vertical
        for col in 0..self.width {
            let mut row = 0;
            while row < self.height {
                let color = self.cells[row * self.width + col].color;
                let mut end = row + 1;
                while end < self.height && self.cells[end * self.width + col].color == color {
                    end += 1;
                }
                if color.is_playable() && end - row >= CLEAR_RUN {
                    for r in row..end {
                        marked[r * self.width + col] = true;
                    }
                    colors.push(color);
                }
                row = end;
            }
        }

        (marked, colors)
    }

    fn apply_clear(&mut self, marked: &[bool]) {
        for row in 0..self.height as i32 {
            for col in 0..self.width as i32 {
                let Some(i) = self.index(row, col) else {
                    continue;
                };
                if !marked[i] {
                    continue;
                }
                let space = self.cells[i];
                if space.is_linked() {
                    let (pr, pc) = Self::linked_offset(row, col, space.linkage);
                    if let Some(p) = self.index(pr, pc) {
                        if !marked[p] {
                            self.cells[p].linkage = Linkage::Unlinked;
                        }
                    }
                }
                self.cells[i] = Space::EMPTY;
            }
        }
    }

    /// Pill pieces that would drop one row this step.
    ///
    /// Scans bottom-up so a piece resting on a falling piece falls with it.
    fn falling_cells(&self) -> Vec<bool> {
        let mut falling = vec![false; self.cells.len()];
        if self.height < 2 {
            return falling;
        }

        let drops_into = |falling: &[bool], row: i32, col: i32| match self.index(row, col) {
            Some(i) => self.cells[i].is_empty() || falling[i],
            None => false,
        };

        for row in (0..self.bottom_row_index()).rev() {
            for col in 0..self.width as i32 {
                let Some(i) = self.index(row, col) else {
                    continue;
                };
                let space = self.cells[i];
                if !space.is_pill() {
                    continue;
                }
                match space.linkage {
                    Linkage::Unlinked => {
                        if drops_into(&falling, row + 1, col) {
                            falling[i] = true;
                        }
                    }
                    Linkage::Right => {
                        let Some(p) = self.index(row, col + 1) else {
                            continue;
                        };
                        if drops_into(&falling, row + 1, col) && drops_into(&falling, row + 1, col + 1) {
                            falling[i] = true;
                            falling[p] = true;
                        }
                    }
                    Linkage::Up => {
                        let Some(p) = self.index(row - 1, col) else {
                            continue;
                        };
                        if drops_into(&falling, row + 1, col) {
                            falling[i] = true;
                            falling[p] = true;
                        }
                    }
                    // Handled from the partner half
                    Linkage::Left | Linkage::Down => {}
                }
            }
        }

        falling
    }

    fn apply_fall(&mut self, falling: &[bool]) {
        for row in (0..self.bottom_row_index()).rev() {
            for col in 0..self.width as i32 {
                let (Some(from), Some(to)) = (self.index(row, col), self.index(row + 1, col)) else {
                    continue;
                };
                if falling[from] {
                    self.cells[to] = self.cells[from];
                    self.cells[from] = Space::EMPTY;
                }
            }
        }
    }

    /// Build a field from text rows. `.` empty, `R`/`B`/`Y` viruses,
    /// `r`/`b`/`y` loose pill fragments.
    #[cfg(test)]
    pub(crate) fn from_ascii(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut field = Self::new(width, height);
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                let space = match ch {
                    'R' => Space::virus(Color::Red),
                    'B' => Space::virus(Color::Blue),
                    'Y' => Space::virus(Color::Yellow),
                    'r' => Space::pill(Color::Red, Linkage::Unlinked),
                    'b' => Space::pill(Color::Blue, Linkage::Unlinked),
                    'y' => Space::pill(Color::Yellow, Linkage::Unlinked),
                    _ => None,
                };
                if let Some(space) = space {
                    field.force_put(row as i32, col as i32, space);
                }
            }
        }
        field
    }
}
