//! Fixed-interval snake step
//!
//! The browser feeds frame time into [`tick`]; the board only moves when
//! enough time has been banked for the current speed.

use rand::Rng;

use super::state::{Direction, SnakePhase, SnakeState};
use crate::consts::*;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Arrow key pressed
    pub turn: Option<Direction>,
    /// Space pressed
    pub toggle_pause: bool,
}

/// What the countdown overlay shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownLabel {
    Number(u32),
    Go,
}

impl CountdownLabel {
    pub fn text(self) -> String {
        match self {
            CountdownLabel::Number(n) => n.to_string(),
            CountdownLabel::Go => "开始!".to_string(),
        }
    }
}

/// Notable things that happened during a tick
#[derive(Debug, Clone, PartialEq)]
pub enum SnakeEvent {
    Started,
    Paused,
    Resumed,
    Ate { score: u64 },
    GameOver { score: u64 },
}

/// Delay between steps for a score: 150 ms, 10 ms faster every 50 points
pub fn step_interval_ms(score: u64) -> f64 {
    let faster = (score / 50) as f64 * SNAKE_SPEEDUP_MS;
    (SNAKE_BASE_INTERVAL_MS - faster).max(SNAKE_MIN_INTERVAL_MS)
}

/// Overlay for a countdown `elapsed_ms` in
pub fn countdown_label(elapsed_ms: f64) -> CountdownLabel {
    let whole = (elapsed_ms / COUNTDOWN_STEP_MS).floor() as u32;
    if whole >= COUNTDOWN_FROM {
        CountdownLabel::Go
    } else {
        CountdownLabel::Number(COUNTDOWN_FROM - whole)
    }
}

/// Total countdown length including the "go" flash
pub fn countdown_total_ms() -> f64 {
    COUNTDOWN_FROM as f64 * COUNTDOWN_STEP_MS + COUNTDOWN_GO_MS
}

/// Advance by `dt_ms` of wall time
pub fn tick(
    state: &mut SnakeState,
    input: &TickInput,
    dt_ms: f64,
    rng: &mut impl Rng,
) -> Vec<SnakeEvent> {
    let mut events = Vec::new();

    if input.toggle_pause {
        match state.phase {
            SnakePhase::Running => {
                state.phase = SnakePhase::Paused;
                events.push(SnakeEvent::Paused);
            }
            SnakePhase::Paused => {
                state.phase = SnakePhase::Running;
                state.step_timer_ms = 0.0;
                events.push(SnakeEvent::Resumed);
            }
            _ => {}
        }
    }

    if let (Some(dir), SnakePhase::Running) = (input.turn, state.phase) {
        steer(state, dir);
    }

    match state.phase {
        SnakePhase::Countdown { elapsed_ms } => {
            let elapsed_ms = elapsed_ms + dt_ms;
            if elapsed_ms >= countdown_total_ms() {
                state.phase = SnakePhase::Running;
                state.velocity = Direction::Right.delta();
                state.step_timer_ms = 0.0;
                events.push(SnakeEvent::Started);
            } else {
                state.phase = SnakePhase::Countdown { elapsed_ms };
            }
        }
        SnakePhase::Running => {
            state.step_timer_ms += dt_ms;
            while state.phase == SnakePhase::Running {
                let interval = step_interval_ms(state.score);
                if state.step_timer_ms < interval {
                    break;
                }
                state.step_timer_ms -= interval;
                if let Some(event) = step(state, rng) {
                    events.push(event);
                }
            }
        }
        _ => {}
    }

    events
}

/// Change heading unless it would reverse straight into the neck
fn steer(state: &mut SnakeState, dir: Direction) {
    let delta = dir.delta();
    if delta != -state.velocity {
        state.velocity = delta;
    }
}

/// Move one cell
pub fn step(state: &mut SnakeState, rng: &mut impl Rng) -> Option<SnakeEvent> {
    let head = state.head() + state.velocity;
    state.body.push_front(head);

    let hit_self = state.body.iter().skip(1).any(|&cell| cell == head);
    if !SnakeState::in_bounds(head) || hit_self {
        state.phase = SnakePhase::GameOver;
        log::info!("Snake game over at {} points", state.score);
        return Some(SnakeEvent::GameOver { score: state.score });
    }

    if head == state.food {
        state.score += SNAKE_FOOD_SCORE;
        match state.random_free_cell(rng) {
            Some(cell) => state.food = cell,
            None => log::warn!("Board full, no room for food"),
        }
        Some(SnakeEvent::Ate { score: state.score })
    } else {
        state.body.pop_back();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn running(rng: &mut Pcg32) -> SnakeState {
        let mut state = SnakeState::new(rng);
        state.begin_countdown(rng);
        tick(&mut state, &TickInput::default(), countdown_total_ms(), rng);
        state
    }

    #[test]
    fn test_step_interval() {
        assert_eq!(step_interval_ms(0), 150.0);
        assert_eq!(step_interval_ms(49), 150.0);
        assert_eq!(step_interval_ms(50), 140.0);
        assert_eq!(step_interval_ms(590), 40.0);
        assert_eq!(step_interval_ms(600), 30.0);
        assert_eq!(step_interval_ms(5000), 30.0);
    }

    #[test]
    fn test_countdown_sequence() {
        assert_eq!(countdown_label(0.0), CountdownLabel::Number(3));
        assert_eq!(countdown_label(1_000.0), CountdownLabel::Number(2));
        assert_eq!(countdown_label(2_999.0), CountdownLabel::Number(1));
        assert_eq!(countdown_label(3_000.0), CountdownLabel::Go);
        assert_eq!(CountdownLabel::Go.text(), "开始!");
        assert_eq!(countdown_total_ms(), 3_500.0);
    }

    #[test]
    fn test_countdown_then_moves_right() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut state = SnakeState::new(&mut rng);
        state.begin_countdown(&mut rng);

        let events = tick(&mut state, &TickInput::default(), 3_400.0, &mut rng);
        assert!(events.is_empty());
        // no steering during the countdown
        let input = TickInput {
            turn: Some(Direction::Up),
            ..Default::default()
        };
        let events = tick(&mut state, &input, 100.0, &mut rng);
        assert_eq!(events, vec![SnakeEvent::Started]);
        assert_eq!(state.velocity, IVec2::new(1, 0));

        state.food = IVec2::new(0, 0);
        tick(&mut state, &TickInput::default(), 150.0, &mut rng);
        assert_eq!(state.head(), IVec2::new(11, 10));
        assert_eq!(state.body.len(), 1);
    }

    #[test]
    fn test_reverse_is_ignored() {
        let mut rng = Pcg32::seed_from_u64(4);
        let mut state = running(&mut rng);
        let input = TickInput {
            turn: Some(Direction::Left),
            ..Default::default()
        };
        tick(&mut state, &input, 0.0, &mut rng);
        assert_eq!(state.velocity, IVec2::new(1, 0));

        let input = TickInput {
            turn: Some(Direction::Down),
            ..Default::default()
        };
        tick(&mut state, &input, 0.0, &mut rng);
        assert_eq!(state.velocity, IVec2::new(0, 1));
    }

    #[test]
    fn test_eating_grows_and_scores() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut state = running(&mut rng);
        state.food = IVec2::new(11, 10);
        let event = step(&mut state, &mut rng);
        assert_eq!(event, Some(SnakeEvent::Ate { score: 10 }));
        assert_eq!(state.body.len(), 2);
        assert!(!state.body.contains(&state.food));
    }

    #[test]
    fn test_wall_ends_the_run() {
        let mut rng = Pcg32::seed_from_u64(6);
        let mut state = running(&mut rng);
        state.food = IVec2::new(0, 0);
        let mut over = None;
        for _ in 0..20 {
            if let Some(SnakeEvent::GameOver { score }) = step(&mut state, &mut rng) {
                over = Some(score);
                break;
            }
        }
        assert_eq!(over, Some(0));
        assert_eq!(state.phase, SnakePhase::GameOver);
        assert_eq!(state.head(), IVec2::new(20, 10));
    }

    #[test]
    fn test_self_collision() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut state = running(&mut rng);
        state.body = [(5, 5), (4, 5), (4, 6), (5, 6), (6, 6)]
            .into_iter()
            .map(|(x, y)| IVec2::new(x, y))
            .collect();
        state.velocity = IVec2::new(0, 1);
        state.food = IVec2::new(0, 0);
        assert!(matches!(
            step(&mut state, &mut rng),
            Some(SnakeEvent::GameOver { .. })
        ));
    }

    #[test]
    fn test_pause_stops_steps() {
        let mut rng = Pcg32::seed_from_u64(8);
        let mut state = running(&mut rng);
        state.food = IVec2::new(0, 0);
        let pause = TickInput {
            toggle_pause: true,
            ..Default::default()
        };
        assert_eq!(tick(&mut state, &pause, 0.0, &mut rng), vec![SnakeEvent::Paused]);
        tick(&mut state, &TickInput::default(), 1_000.0, &mut rng);
        assert_eq!(state.head(), IVec2::new(10, 10));

        assert_eq!(tick(&mut state, &pause, 0.0, &mut rng), vec![SnakeEvent::Resumed]);
        tick(&mut state, &TickInput::default(), 300.0, &mut rng);
        assert_eq!(state.head(), IVec2::new(12, 10));
    }
}
