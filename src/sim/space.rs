//! Single board cell
//!
//! A capsule is two `Pill` spaces whose linkages point at each other.

use serde::{Deserialize, Serialize};

/// What occupies a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Content {
    #[default]
    Empty,
    Virus,
    Pill,
}

/// Cell color. `None` only appears on empty cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Color {
    #[default]
    None,
    Red,
    Blue,
    Yellow,
}

impl Color {
    /// The three playable colors, in the order pieces and viruses index them
    pub const PLAYABLE: [Color; 3] = [Color::Yellow, Color::Red, Color::Blue];

    pub fn is_playable(self) -> bool {
        self != Color::None
    }
}

/// Direction from a capsule half to its partner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Linkage {
    #[default]
    Unlinked,
    Up,
    Down,
    Left,
    Right,
}

impl Linkage {
    pub fn opposite(self) -> Self {
        match self {
            Linkage::Unlinked => Linkage::Unlinked,
            Linkage::Up => Linkage::Down,
            Linkage::Down => Linkage::Up,
            Linkage::Left => Linkage::Right,
            Linkage::Right => Linkage::Left,
        }
    }

    /// (row, col) step toward the partner
    pub fn delta(self) -> (i32, i32) {
        match self {
            Linkage::Unlinked => (0, 0),
            Linkage::Up => (-1, 0),
            Linkage::Down => (1, 0),
            Linkage::Left => (0, -1),
            Linkage::Right => (0, 1),
        }
    }
}

/// One board cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Space {
    pub content: Content,
    pub color: Color,
    pub linkage: Linkage,
}

impl Space {
    pub const EMPTY: Space = Space {
        content: Content::Empty,
        color: Color::None,
        linkage: Linkage::Unlinked,
    };

    /// A virus of the given color. Returns `None` for `Color::None`.
    pub fn virus(color: Color) -> Option<Self> {
        color.is_playable().then_some(Self {
            content: Content::Virus,
            color,
            linkage: Linkage::Unlinked,
        })
    }

    /// A pill half. Returns `None` for `Color::None`.
    pub fn pill(color: Color, linkage: Linkage) -> Option<Self> {
        color.is_playable().then_some(Self {
            content: Content::Pill,
            color,
            linkage,
        })
    }

    /// Two halves of a capsule linked along `linkage` (primary → linked)
    pub fn linked_pair(linkage: Linkage, primary: Color, linked: Color) -> Option<(Self, Self)> {
        if linkage == Linkage::Unlinked {
            return None;
        }
        Some((
            Self::pill(primary, linkage)?,
            Self::pill(linked, linkage.opposite())?,
        ))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.content == Content::Empty
    }

    #[inline]
    pub fn is_virus(&self) -> bool {
        self.content == Content::Virus
    }

    #[inline]
    pub fn is_pill(&self) -> bool {
        self.content == Content::Pill
    }

    #[inline]
    pub fn is_linked(&self) -> bool {
        self.linkage != Linkage::Unlinked
    }
}
