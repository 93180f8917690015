//! Per-tick controller input

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::piece::Rotation;

/// One controller event for one tick.
///
/// The `JustPressed` events fire once per press; `DownPressed` is reported
/// every tick the button is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonEvent {
    LeftJustPressed,
    RightJustPressed,
    DownPressed,
    /// Rotate clockwise
    PrimaryJustPressed,
    /// Rotate counter-clockwise
    SecondaryJustPressed,
}

impl ButtonEvent {
    pub fn rotation(self) -> Option<Rotation> {
        match self {
            ButtonEvent::PrimaryJustPressed => Some(Rotation::Clockwise),
            ButtonEvent::SecondaryJustPressed => Some(Rotation::CounterClockwise),
            _ => None,
        }
    }
}

/// Events for one tick, keyed by player index. Ordered so routing is stable.
pub type PlayerInputs = BTreeMap<usize, Vec<ButtonEvent>>;

/// Whether soft drop is held in this batch
pub fn soft_drop_held(events: &[ButtonEvent]) -> bool {
    events.contains(&ButtonEvent::DownPressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_mapping() {
        assert_eq!(ButtonEvent::PrimaryJustPressed.rotation(), Some(Rotation::Clockwise));
        assert_eq!(
            ButtonEvent::SecondaryJustPressed.rotation(),
            Some(Rotation::CounterClockwise)
        );
        assert_eq!(ButtonEvent::DownPressed.rotation(), None);
    }

    #[test]
    fn test_soft_drop_held() {
        assert!(!soft_drop_held(&[]));
        assert!(soft_drop_held(&[ButtonEvent::LeftJustPressed, ButtonEvent::DownPressed]));
    }
}
