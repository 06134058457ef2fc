//! A full snake run ending on the leaderboard

use glam::IVec2;
use moyu_garden::Leaderboard;
use moyu_garden::highscores::{HIGH_SCORE_KEY, RowKind};
use moyu_garden::platform::{KeyValueStore, MemoryStore};
use moyu_garden::snake::{
    Direction, SnakeEvent, SnakePhase, SnakeState, TickInput, countdown_total_ms, tick,
};
use rand::SeedableRng;
use rand_pcg::Pcg32;

const NOW: f64 = 1_722_470_400_000.0;

/// Count down, then run right into the wall, eating whatever is placed ahead
fn play_run(rng: &mut Pcg32, meals: i32) -> (u64, Vec<SnakeEvent>) {
    let mut state = SnakeState::new(rng);
    assert!(state.begin_countdown(rng));

    let mut events = tick(&mut state, &TickInput::default(), countdown_total_ms(), rng);
    assert_eq!(state.phase, SnakePhase::Running);
    assert_eq!(state.velocity, Direction::Right.delta());

    let mut placed = 0;
    while state.phase == SnakePhase::Running {
        if placed < meals && state.food.y != state.head().y {
            state.food = state.head() + IVec2::new(1, 0);
            placed += 1;
        }
        events.extend(tick(&mut state, &TickInput::default(), 160.0, rng));
    }
    (state.score, events)
}

#[test]
fn test_run_to_game_over() {
    let mut rng = Pcg32::seed_from_u64(3);
    let (score, events) = play_run(&mut rng, 2);
    assert_eq!(events.first(), Some(&SnakeEvent::Started));
    assert!(matches!(events.last(), Some(SnakeEvent::GameOver { .. })));
    assert_eq!(
        events.iter().filter(|e| matches!(e, SnakeEvent::Ate { .. })).count() as u64,
        score / 10
    );
}

#[test]
fn test_game_over_reaches_leaderboard() {
    let store = MemoryStore::new();
    let mut rng = Pcg32::seed_from_u64(4);
    let mut board = Leaderboard::new(Box::new(store.clone()));
    board.set_current_player("青云子");

    let score = 40;
    board.update_current_score(score);
    assert_eq!(board.record_personal_best(score), 40);
    assert!(board.save_score(score, NOW, &mut rng));
    assert_eq!(store.get(HIGH_SCORE_KEY).as_deref(), Some("40"));

    // a worse run changes nothing
    assert_eq!(board.record_personal_best(20), 40);
    assert!(!board.save_score(20, NOW + 1000.0, &mut rng));

    let rows = board.board(NOW, &mut rng);
    assert_eq!(rows.len(), 10);
    assert!(rows.windows(2).all(|w| w[0].score >= w[1].score));
    // generated rows all score at least 100, so a 40 does not make the top ten
    assert!(rows.iter().all(|r| r.kind == RowKind::Global));

    let all = board.records(NOW, &mut rng);
    let mine: Vec<_> = all.iter().filter(|r| r.name == "青云子").collect();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].score, 40);
}

#[test]
fn test_high_score_tops_the_board() {
    let store = MemoryStore::new();
    let mut rng = Pcg32::seed_from_u64(5);
    let mut board = Leaderboard::new(Box::new(store.clone()));
    board.set_current_player("摸鱼道人");
    assert!(board.save_score(900, NOW, &mut rng));

    // a second device session sees the stored record
    let reopened = Leaderboard::new(Box::new(store));
    let rows = reopened.board(NOW, &mut rng);
    assert_eq!(rows[0].name, "摸鱼道人");
    assert_eq!(rows[0].rank_label(), "🥇");
    assert_eq!(rows[0].kind, RowKind::Local);
}

#[test]
fn test_anonymous_runs_are_not_recorded() {
    let mut rng = Pcg32::seed_from_u64(6);
    let mut board = Leaderboard::new(Box::new(MemoryStore::new()));
    assert!(!board.save_score(500, NOW, &mut rng));
    assert!(board.records(NOW, &mut rng).iter().all(|r| r.is_global));
}
