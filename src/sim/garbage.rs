//! Combo garbage targeting
//!
//! With two live players the opponent takes everything. With three or more,
//! the colors of the first cleared step pick the direction: red attacks to
//! the left, blue to the right, yellow across the table. A player is hit at
//! most once per combo.

use super::player::PlayerState;
use super::space::Color;

/// How a color searches the table for its victim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPattern {
    /// Decreasing index, wrapping
    Left,
    /// Increasing index, wrapping
    Right,
    /// Start half the table away, then increasing index
    Across,
}

impl DropPattern {
    pub fn for_color(color: Color) -> Option<Self> {
        match color {
            Color::Red => Some(DropPattern::Left),
            Color::Yellow => Some(DropPattern::Across),
            Color::Blue => Some(DropPattern::Right),
            Color::None => None,
        }
    }
}

/// Colors in the order their attacks are resolved
const ATTACK_ORDER: [Color; 3] = [Color::Red, Color::Yellow, Color::Blue];

/// Player index `step` places along `pattern` from `attacker`, on a table of `n`
fn index_for(attacker: usize, n: usize, pattern: DropPattern, step: usize) -> usize {
    match pattern {
        DropPattern::Left => (attacker + n - step % n) % n,
        DropPattern::Right => (attacker + step) % n,
        DropPattern::Across => (attacker + n / 2 + step) % n,
    }
}

/// First live, not yet hit player along `pattern`, never the attacker
fn find_target(attacker: usize, alive: &[bool], pattern: DropPattern, hit: &[usize]) -> Option<usize> {
    let n = alive.len();
    (0..n)
        .map(|step| index_for(attacker, n, pattern, step))
        .filter(|&i| i != attacker)
        .find(|&i| alive[i] && !hit.contains(&i))
}

/// Victims of `attacker`'s combo, in the order they are hit
pub fn pick_victims(attacker: usize, alive: &[bool], clears: &[Vec<Color>]) -> Vec<usize> {
    if attacker >= alive.len() {
        return Vec::new();
    }
    let live = alive.iter().filter(|&&a| a).count();
    if live <= 1 {
        return Vec::new();
    }
    if live == 2 {
        return find_target(attacker, alive, DropPattern::Right, &[])
            .into_iter()
            .collect();
    }

    let Some(first) = clears.first() else {
        return Vec::new();
    };

    let mut victims = Vec::new();
    for color in ATTACK_ORDER {
        if !first.contains(&color) {
            continue;
        }
        let Some(pattern) = DropPattern::for_color(color) else {
            continue;
        };
        match find_target(attacker, alive, pattern, &victims) {
            Some(victim) => victims.push(victim),
            None => log::debug!(
                "{:?} attack from player {} found no target",
                color,
                attacker
            ),
        }
    }
    victims
}

/// Queue the flattened combo on every victim. Returns the victims.
pub fn distribute(attacker: usize, clears: &[Vec<Color>], players: &mut [PlayerState]) -> Vec<usize> {
    let alive: Vec<bool> = players.iter().map(PlayerState::is_alive).collect();
    let victims = pick_victims(attacker, &alive, clears);
    if victims.is_empty() {
        return victims;
    }

    let batch: Vec<Color> = clears.iter().flatten().copied().collect();
    for &victim in &victims {
        if let Some(player) = players.get_mut(victim) {
            player.enqueue_drop(batch.clone());
        }
    }
    log::debug!(
        "player {} sent {} piece(s) to {:?}",
        attacker,
        batch.len(),
        victims
    );
    victims
}
