//! Moyu Garden entry point
//!
//! In the browser this mounts the widgets. Natively it runs a short
//! headless walkthrough of the game logic against in-memory storage.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    moyu_garden::ui::run().await;
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Moyu Garden (native) starting...");
    log::info!("Widgets need a browser - build with wasm-pack for the web version");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);
    demo::run(seed);
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use moyu_garden::census::{Post, SiteInfo, analyze};
    use moyu_garden::idle_timer::format_duration;
    use moyu_garden::platform::{MemoryStore, now_ms};
    use moyu_garden::snake::{Direction, SnakePhase, SnakeState, step};
    use moyu_garden::{Cultivation, CultivationData, IdleTimer, Leaderboard};

    /// Simulated idle time fed to the cultivation game
    const IDLE_HOURS: u64 = 6;
    const SNAKE_MAX_STEPS: usize = 2_000;

    pub fn run(seed: u64) {
        let mut rng = Pcg32::seed_from_u64(seed);
        let store = MemoryStore::new();
        let start = now_ms();

        println!("\n== Idle cultivation ==");
        let timer = IdleTimer::init(Box::new(store.clone()), start);
        let mut game = Cultivation::load(Box::new(store.clone()), CultivationData::bundled());
        if let Err(e) = game.set_character_name("摸鱼道人") {
            log::error!("{}", e);
        }
        for hour in 1..=IDLE_HOURS {
            let now = start + (hour * 3_600_000) as f64;
            let total = timer.tick(now).total_seconds;
            game.sync_with_total_seconds(total, now, &mut rng);
            let view = game.status_view();
            println!("[{}] {} ({}%)", format_duration(total), view.title, view.percent);
            if view.tribulation_ready {
                if let Some(text) = game.try_tribulation(0, now, &mut rng).alert_text() {
                    println!("{}", text);
                }
            }
        }
        for line in game.recent_logs().iter().take(5) {
            println!("  {}", line);
        }

        println!("\n== Snake ==");
        let mut board = SnakeState::new(&mut rng);
        board.phase = SnakePhase::Running;
        board.velocity = Direction::Right.delta();
        let mut steps = 0;
        while board.phase == SnakePhase::Running && steps < SNAKE_MAX_STEPS {
            board.velocity = greedy_turn(&board);
            step(&mut board, &mut rng);
            steps += 1;
        }
        println!("Autoplay scored {} in {} steps", board.score, steps);

        let mut leaderboard = Leaderboard::new(Box::new(store.clone()));
        leaderboard.set_current_player(game.character_name());
        leaderboard.record_personal_best(board.score);
        leaderboard.save_score(board.score, now_ms(), &mut rng);
        for row in leaderboard.board(now_ms(), &mut rng).iter().take(5) {
            println!("{} {} {} {}", row.rank_label(), row.kind.icon(), row.name, row.score);
        }

        println!("\n== Census ==");
        let posts = vec![
            Post {
                date: Some("2024-03-01T08:00:00Z".to_string()),
                text: Some("Hello, world".to_string()),
                ..Default::default()
            },
            Post {
                date: Some("2024-05-20".to_string()),
                text: Some("摸鱼日记".to_string()),
                ..Default::default()
            },
        ];
        let analysis = analyze(&posts);
        for (icon, value, label) in SiteInfo::new(&analysis, now_ms()).cards() {
            println!("{} {}: {}", icon, label, value);
        }
    }

    /// Head toward the food, avoiding walls and the body where possible
    fn greedy_turn(board: &SnakeState) -> glam::IVec2 {
        let head = board.head();
        let safe = |delta: glam::IVec2| {
            let next = head + delta;
            SnakeState::in_bounds(next) && !board.body.contains(&next) && delta != -board.velocity
        };
        let toward = (board.food - head).signum();
        [glam::IVec2::new(toward.x, 0), glam::IVec2::new(0, toward.y)]
            .into_iter()
            .chain([
                Direction::Up.delta(),
                Direction::Right.delta(),
                Direction::Down.delta(),
                Direction::Left.delta(),
            ])
            .find(|&d| d != glam::IVec2::ZERO && safe(d))
            .unwrap_or(board.velocity)
    }
}
