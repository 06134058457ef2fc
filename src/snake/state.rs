//! Snake board state

use std::collections::VecDeque;

use glam::IVec2;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::consts::{SNAKE_START, SNAKE_TILE_COUNT};

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SnakePhase {
    /// Board shown with the start hint
    Idle,
    /// 3-2-1 countdown before the first move
    Countdown { elapsed_ms: f64 },
    Running,
    Paused,
    /// Run ended; the board stays frozen until restarted
    GameOver,
}

/// Steering input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn delta(self) -> IVec2 {
        match self {
            Direction::Up => IVec2::new(0, -1),
            Direction::Down => IVec2::new(0, 1),
            Direction::Left => IVec2::new(-1, 0),
            Direction::Right => IVec2::new(1, 0),
        }
    }

    /// `KeyboardEvent.key` of the arrow keys
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowUp" => Some(Direction::Up),
            "ArrowDown" => Some(Direction::Down),
            "ArrowLeft" => Some(Direction::Left),
            "ArrowRight" => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Keys the game swallows (no page scrolling)
pub fn is_game_key(key: &str) -> bool {
    key == " " || Direction::from_key(key).is_some()
}

/// Complete board state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnakeState {
    /// Head first
    pub body: VecDeque<IVec2>,
    pub food: IVec2,
    /// Movement per step, zero before the first start
    pub velocity: IVec2,
    pub score: u64,
    pub phase: SnakePhase,
    /// Time banked toward the next step (ms)
    pub step_timer_ms: f64,
}

impl SnakeState {
    pub fn new(rng: &mut impl Rng) -> Self {
        let mut state = Self {
            body: VecDeque::from([SNAKE_START]),
            food: IVec2::ZERO,
            velocity: IVec2::ZERO,
            score: 0,
            phase: SnakePhase::Idle,
            step_timer_ms: 0.0,
        };
        state.food = state.random_free_cell(rng).unwrap_or(IVec2::ZERO);
        state
    }

    pub fn head(&self) -> IVec2 {
        self.body.front().copied().unwrap_or(SNAKE_START)
    }

    /// Back to a fresh idle board
    pub fn reset(&mut self, rng: &mut impl Rng) {
        *self = Self::new(rng);
    }

    /// Start keys and the start button only work when nothing is in progress
    pub fn can_start(&self) -> bool {
        matches!(self.phase, SnakePhase::Idle | SnakePhase::GameOver)
    }

    /// Begin the countdown; a finished board is cleared first
    pub fn begin_countdown(&mut self, rng: &mut impl Rng) -> bool {
        if !self.can_start() {
            return false;
        }
        if self.phase == SnakePhase::GameOver {
            self.reset(rng);
        }
        self.phase = SnakePhase::Countdown { elapsed_ms: 0.0 };
        true
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, SnakePhase::Running | SnakePhase::Paused)
    }

    pub fn in_bounds(cell: IVec2) -> bool {
        (0..SNAKE_TILE_COUNT).contains(&cell.x) && (0..SNAKE_TILE_COUNT).contains(&cell.y)
    }

    /// Any grid cell the snake does not cover
    pub fn random_free_cell(&self, rng: &mut impl Rng) -> Option<IVec2> {
        let free: Vec<IVec2> = (0..SNAKE_TILE_COUNT)
            .flat_map(|y| (0..SNAKE_TILE_COUNT).map(move |x| IVec2::new(x, y)))
            .filter(|cell| !self.body.contains(cell))
            .collect();
        free.choose(rng).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_new_board() {
        let mut rng = Pcg32::seed_from_u64(9);
        let state = SnakeState::new(&mut rng);
        assert_eq!(state.head(), IVec2::new(10, 10));
        assert_eq!(state.velocity, IVec2::ZERO);
        assert_ne!(state.food, state.head());
        assert!(SnakeState::in_bounds(state.food));
        assert!(state.can_start());
    }

    #[test]
    fn test_free_cell_skips_body() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut state = SnakeState::new(&mut rng);
        state.body = (0..SNAKE_TILE_COUNT)
            .flat_map(|y| (0..SNAKE_TILE_COUNT).map(move |x| IVec2::new(x, y)))
            .filter(|c| *c != IVec2::new(3, 4))
            .collect();
        assert_eq!(state.random_free_cell(&mut rng), Some(IVec2::new(3, 4)));
        state.body.push_back(IVec2::new(3, 4));
        assert_eq!(state.random_free_cell(&mut rng), None);
    }

    #[test]
    fn test_restart_after_game_over_clears_board() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut state = SnakeState::new(&mut rng);
        state.score = 40;
        state.phase = SnakePhase::GameOver;
        assert!(state.begin_countdown(&mut rng));
        assert_eq!(state.score, 0);
        assert!(matches!(state.phase, SnakePhase::Countdown { .. }));
        assert!(!state.begin_countdown(&mut rng));
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(Direction::from_key("ArrowLeft"), Some(Direction::Left));
        assert_eq!(Direction::from_key("a"), None);
        assert!(is_game_key(" "));
        assert!(!is_game_key("Enter"));
    }
}
