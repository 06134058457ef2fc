//! Moyu Garden - blog widgets compiled to WebAssembly
//!
//! Core modules:
//! - `cultivation`: Idle cultivation game (realms, tribulation, adventures)
//! - `persistence`: Versioned save export, migration and repair
//! - `idle_timer`: Accumulated "fish time" that drives cultivation
//! - `snake`: Snake mini-game, `highscores` its leaderboard
//! - `fireworks`: Background particle show
//! - `census`: Blog statistics dashboard
//! - `renderer`: Canvas 2D draw lists
//! - `platform`: Browser/native platform abstraction
//! - `ui`: DOM wiring (web only)

pub mod census;
pub mod comments;
pub mod cultivation;
pub mod fireworks;
pub mod highscores;
pub mod idle_timer;
pub mod nickname;
pub mod persistence;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod snake;
#[cfg(target_arch = "wasm32")]
pub mod ui;

pub use cultivation::{Cultivation, CultivationData};
pub use highscores::Leaderboard;
pub use idle_timer::IdleTimer;
pub use settings::{QualityPreset, Settings};

use glam::IVec2;

/// Widget configuration constants
pub mod consts {
    use glam::IVec2;

    /// Snake board cells per side
    pub const SNAKE_TILE_COUNT: i32 = 20;
    /// Pixel size of one snake cell
    pub const SNAKE_CELL_PX: f64 = 20.0;
    pub const SNAKE_START: IVec2 = IVec2::new(10, 10);
    pub const SNAKE_FOOD_SCORE: u64 = 10;

    /// Step delay at zero score (ms)
    pub const SNAKE_BASE_INTERVAL_MS: f64 = 150.0;
    /// Delay removed per 50 points
    pub const SNAKE_SPEEDUP_MS: f64 = 10.0;
    pub const SNAKE_MIN_INTERVAL_MS: f64 = 30.0;

    /// Countdown starts at this number
    pub const COUNTDOWN_FROM: u32 = 3;
    pub const COUNTDOWN_STEP_MS: f64 = 1000.0;
    /// How long "开始!" stays up
    pub const COUNTDOWN_GO_MS: f64 = 500.0;

    /// Idle timer display refresh (ms)
    pub const TIMER_TICK_MS: i32 = 1000;
    /// Theme re-render delay after a click (ms)
    pub const THEME_REFRESH_MS: i32 = 100;
}

/// Pixel position of a snake cell's top-left corner
#[inline]
pub fn cell_to_px(cell: IVec2) -> (f64, f64) {
    (
        cell.x as f64 * consts::SNAKE_CELL_PX,
        cell.y as f64 * consts::SNAKE_CELL_PX,
    )
}

/// Snake canvas side length in pixels
#[inline]
pub fn board_px() -> f64 {
    consts::SNAKE_TILE_COUNT as f64 * consts::SNAKE_CELL_PX
}
