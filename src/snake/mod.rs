//! Snake mini-game
//!
//! Pure board logic. Drawing lives in `renderer::snake`, DOM wiring in `ui::snake`.

pub mod state;
pub mod tick;

pub use state::{Direction, SnakePhase, SnakeState, is_game_key};
pub use tick::{
    CountdownLabel, SnakeEvent, TickInput, countdown_label, countdown_total_ms, step,
    step_interval_ms, tick,
};
