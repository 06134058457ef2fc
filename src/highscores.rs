//! Snake leaderboard
//!
//! Local records are persisted in LocalStorage (one per player, top 100).
//! The "global" rows are generated on the client around fixed base scores.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::platform::KeyValueStore;
use crate::platform::storage::get_int;
use crate::platform::time::{format_date_time, local_date};

pub const STORAGE_KEY: &str = "snakeScoreRecords_v2";
pub const LEGACY_STORAGE_KEY: &str = "snakeScoreRecords";
pub const HIGH_SCORE_KEY: &str = "snakeHighScore";
const STORAGE_VERSION: u32 = 2;

/// Local records kept after sorting
pub const MAX_RECORDS: usize = 100;
/// Rows on the displayed board
pub const MAX_DISPLAYED: usize = 10;
/// Scores below this are not recorded
pub const MIN_RECORDED_SCORE: u64 = 10;
/// Shown in place of the name before one is picked
pub const DEFAULT_PLAYER_LABEL: &str = "使用修仙仙号";
pub const EMPTY_BOARD_TEXT: &str = "暂无记录，快来成为第一名吧！";

const GLOBAL_NAMES: [&str; 10] = [
    "摸鱼王者", "代码侠", "算法大师", "键盘飞侠", "编程小白",
    "调试专家", "代码诗人", "函数猎手", "Bug终结者", "逻辑大师",
];
const GLOBAL_BASE_SCORES: [i64; 10] = [520, 480, 450, 420, 390, 360, 330, 300, 280, 260];
const GLOBAL_VARIATION: i64 = 20;
const GLOBAL_MIN_SCORE: i64 = 100;

/// A single leaderboard entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreRecord {
    pub name: String,
    pub score: u64,
    /// Human-readable time of play
    pub date: String,
    /// Unix timestamp (ms), absent on generated rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub is_global: bool,
}

impl ScoreRecord {
    /// Date column of the board
    pub fn display_date(&self) -> String {
        if let Some(ts) = self.timestamp {
            return local_date(ts).slash();
        }
        self.date
            .split_whitespace()
            .next()
            .map(str::to_string)
            .unwrap_or_else(|| "未知日期".to_string())
    }
}

/// On-disk layout of [`STORAGE_KEY`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordFile {
    #[serde(default)]
    records: Vec<ScoreRecord>,
    #[serde(default)]
    last_updated: f64,
    #[serde(default)]
    version: u32,
}

/// Whose row it is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    CurrentPlayer,
    Global,
    Local,
}

impl RowKind {
    pub fn icon(self) -> &'static str {
        match self {
            RowKind::CurrentPlayer => "👤",
            RowKind::Global => "🌐",
            RowKind::Local => "💻",
        }
    }
}

/// One rendered line of the board
#[derive(Debug, Clone, PartialEq)]
pub struct BoardRow {
    pub rank: usize,
    pub name: String,
    pub score: u64,
    pub date: String,
    pub kind: RowKind,
}

impl BoardRow {
    /// 🥇🥈🥉 for the podium, `N.` below it
    pub fn rank_label(&self) -> String {
        match self.rank {
            1 => "🥇".to_string(),
            2 => "🥈".to_string(),
            3 => "🥉".to_string(),
            n => format!("{}.", n),
        }
    }

    pub fn score_color(&self) -> &'static str {
        match self.rank {
            1 => "#FFD700",
            2 => "#C0C0C0",
            3 => "#CD7F32",
            _ => "#333",
        }
    }
}

/// Unique-enough id: base-36 timestamp plus random base-36 digits
pub fn record_id(now_ms: f64, rng: &mut impl Rng) -> String {
    let mut id = to_base36(now_ms.max(0.0) as u64);
    for _ in 0..10 {
        let digit = rng.random_range(0..36u32);
        if let Some(c) = char::from_digit(digit, 36) {
            id.push(c);
        }
    }
    id
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        if let Some(c) = char::from_digit((n % 36) as u32, 36) {
            digits.push(c);
        }
        n /= 36;
    }
    digits.iter().rev().collect()
}

/// Ten generated rows, sorted by score
pub fn global_records(now_ms: f64, rng: &mut impl Rng) -> Vec<ScoreRecord> {
    let today = local_date(now_ms);
    let mut records: Vec<ScoreRecord> = GLOBAL_NAMES
        .iter()
        .zip(GLOBAL_BASE_SCORES)
        .enumerate()
        .map(|(i, (name, base))| {
            let variation = rng.random_range(-GLOBAL_VARIATION..=GLOBAL_VARIATION);
            ScoreRecord {
                name: name.to_string(),
                score: (base + variation).max(GLOBAL_MIN_SCORE) as u64,
                date: today.add_days(-(i as i64)).slash(),
                is_global: true,
                ..Default::default()
            }
        })
        .collect();
    sort_by_score(&mut records);
    records
}

fn sort_by_score(records: &mut [ScoreRecord]) {
    records.sort_by(|a, b| b.score.cmp(&a.score));
}

/// Leaderboard bound to a store
pub struct Leaderboard {
    store: Box<dyn KeyValueStore>,
    current_player: String,
    /// Best score of this page session
    current_score: u64,
}

impl std::fmt::Debug for Leaderboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Leaderboard")
            .field("current_player", &self.current_player)
            .field("current_score", &self.current_score)
            .finish_non_exhaustive()
    }
}

impl Leaderboard {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self {
            store,
            current_player: String::new(),
            current_score: 0,
        }
    }

    pub fn current_player(&self) -> &str {
        &self.current_player
    }

    /// Label for the "current player" slot
    pub fn player_label(&self) -> &str {
        if self.current_player.is_empty() {
            DEFAULT_PLAYER_LABEL
        } else {
            &self.current_player
        }
    }

    pub fn set_current_player(&mut self, name: &str) {
        self.current_player = name.trim().to_string();
    }

    pub fn current_score(&self) -> u64 {
        self.current_score
    }

    pub fn update_current_score(&mut self, score: u64) {
        self.current_score = self.current_score.max(score);
    }

    fn write_records(&self, records: &[ScoreRecord], now_ms: f64) {
        let file = RecordFile {
            records: records.to_vec(),
            last_updated: now_ms,
            version: STORAGE_VERSION,
        };
        match serde_json::to_string(&file) {
            Ok(json) => self.store.set(STORAGE_KEY, &json),
            Err(e) => log::error!("Failed to encode score records: {}", e),
        }
    }

    /// Records saved on this device, migrating the legacy key on first read
    pub fn local_records(&self, now_ms: f64, rng: &mut impl Rng) -> Vec<ScoreRecord> {
        if let Some(raw) = self.store.get(STORAGE_KEY) {
            match serde_json::from_str::<RecordFile>(&raw) {
                Ok(file) => {
                    return file
                        .records
                        .into_iter()
                        .map(|r| ScoreRecord {
                            is_global: false,
                            ..r
                        })
                        .collect();
                }
                Err(e) => log::error!("Failed to parse score records: {}", e),
            }
        }

        if let Some(raw) = self.store.get(LEGACY_STORAGE_KEY) {
            match serde_json::from_str::<Vec<ScoreRecord>>(&raw) {
                Ok(old) => {
                    let migrated: Vec<ScoreRecord> = old
                        .into_iter()
                        .map(|r| ScoreRecord {
                            id: record_id(now_ms, rng),
                            is_global: false,
                            ..r
                        })
                        .collect();
                    self.write_records(&migrated, now_ms);
                    self.store.remove(LEGACY_STORAGE_KEY);
                    log::info!("Migrated {} legacy score records", migrated.len());
                    return migrated;
                }
                Err(e) => log::error!("Failed to migrate legacy score records: {}", e),
            }
        }

        Vec::new()
    }

    /// Record a finished run. Returns true when it set a new personal record.
    pub fn save_score(&mut self, score: u64, now_ms: f64, rng: &mut impl Rng) -> bool {
        if self.current_player.is_empty() || score < MIN_RECORDED_SCORE {
            log::info!(
                "Score not recorded (player '{}', score {})",
                self.current_player,
                score
            );
            return false;
        }

        let mut records = self.local_records(now_ms, rng);
        let record = ScoreRecord {
            name: self.current_player.clone(),
            score,
            date: format_date_time(now_ms),
            timestamp: Some(now_ms),
            id: record_id(now_ms, rng),
            is_global: false,
        };

        match records.iter_mut().find(|r| r.name == self.current_player) {
            Some(existing) if score > existing.score => *existing = record,
            Some(_) => return false,
            None => records.push(record),
        }

        sort_by_score(&mut records);
        records.truncate(MAX_RECORDS);
        self.write_records(&records, now_ms);
        log::info!("New record for {}: {}", self.current_player, score);
        true
    }

    /// Local and generated rows merged, best first
    pub fn records(&self, now_ms: f64, rng: &mut impl Rng) -> Vec<ScoreRecord> {
        let mut all = self.local_records(now_ms, rng);
        all.extend(global_records(now_ms, rng));
        sort_by_score(&mut all);
        all
    }

    /// Top ten rows ready for display
    pub fn board(&self, now_ms: f64, rng: &mut impl Rng) -> Vec<BoardRow> {
        self.records(now_ms, rng)
            .into_iter()
            .take(MAX_DISPLAYED)
            .enumerate()
            .map(|(i, record)| {
                let name = if record.name.is_empty() {
                    "匿名玩家".to_string()
                } else {
                    record.name.clone()
                };
                let kind = if record.is_global {
                    RowKind::Global
                } else if name == self.current_player {
                    RowKind::CurrentPlayer
                } else {
                    RowKind::Local
                };
                BoardRow {
                    rank: i + 1,
                    date: record.display_date(),
                    score: record.score,
                    name,
                    kind,
                }
            })
            .collect()
    }

    /// All-time best on this device (`snakeHighScore`)
    pub fn personal_best(&self) -> u64 {
        get_int(self.store.as_ref(), HIGH_SCORE_KEY)
            .unwrap_or(0)
            .max(0) as u64
    }

    /// Store `score` if it beats the personal best; returns the best after the update
    pub fn record_personal_best(&self, score: u64) -> u64 {
        let best = self.personal_best();
        if score > best {
            self.store.set(HIGH_SCORE_KEY, &score.to_string());
            score
        } else {
            best
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStore;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const NOW: f64 = 1_722_470_400_000.0; // 2024-08-01

    fn board_with_player(name: &str) -> (Leaderboard, MemoryStore) {
        let store = MemoryStore::new();
        let mut board = Leaderboard::new(Box::new(store.clone()));
        board.set_current_player(name);
        (board, store)
    }

    #[test]
    fn test_save_requires_name_and_minimum_score() {
        let mut rng = Pcg32::seed_from_u64(1);
        let (mut board, store) = board_with_player("");
        assert!(!board.save_score(100, NOW, &mut rng));

        board.set_current_player("青云子");
        assert!(!board.save_score(9, NOW, &mut rng));
        assert!(store.get(STORAGE_KEY).is_none());
        assert!(board.save_score(10, NOW, &mut rng));
    }

    #[test]
    fn test_one_record_per_player_only_improves() {
        let mut rng = Pcg32::seed_from_u64(2);
        let (mut board, _store) = board_with_player("青云子");
        assert!(board.save_score(50, NOW, &mut rng));
        assert!(!board.save_score(40, NOW, &mut rng));
        assert!(board.save_score(70, NOW, &mut rng));

        let local = board.local_records(NOW, &mut rng);
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].score, 70);
        assert!(!local[0].id.is_empty());
    }

    #[test]
    fn test_keeps_top_hundred() {
        let mut rng = Pcg32::seed_from_u64(3);
        let (mut board, _store) = board_with_player("p");
        for i in 0..120u64 {
            board.set_current_player(&format!("p{}", i));
            board.save_score(10 + i, NOW, &mut rng);
        }
        let local = board.local_records(NOW, &mut rng);
        assert_eq!(local.len(), MAX_RECORDS);
        assert_eq!(local[0].score, 129);
        assert!(local.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_legacy_records_migrate() {
        let mut rng = Pcg32::seed_from_u64(4);
        let (board, store) = board_with_player("x");
        store.set(
            LEGACY_STORAGE_KEY,
            r#"[{"name":"老玩家","score":80,"date":"2023/1/2 10:00:00"}]"#,
        );
        let local = board.local_records(NOW, &mut rng);
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].name, "老玩家");
        assert!(!local[0].id.is_empty());
        assert!(store.get(LEGACY_STORAGE_KEY).is_none());

        let raw = store.get(STORAGE_KEY).unwrap();
        let file: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(file["version"], 2);
        assert_eq!(file["records"][0]["isGlobal"], false);
    }

    #[test]
    fn test_global_rows_stay_in_band() {
        let mut rng = Pcg32::seed_from_u64(5);
        let rows = global_records(NOW, &mut rng);
        assert_eq!(rows.len(), 10);
        assert!(rows.iter().all(|r| r.is_global && r.score >= 240 && r.score <= 540));
        assert!(rows.windows(2).all(|w| w[0].score >= w[1].score));
        let top = rows.iter().find(|r| r.name == "摸鱼王者").unwrap();
        assert_eq!(top.date, "2024/8/1");
        let last = rows.iter().find(|r| r.name == "逻辑大师").unwrap();
        assert_eq!(last.date, "2024/7/23");
    }

    #[test]
    fn test_board_marks_current_player() {
        let mut rng = Pcg32::seed_from_u64(6);
        let (mut board, _store) = board_with_player("青云子");
        board.save_score(999, NOW, &mut rng);
        let rows = board.board(NOW, &mut rng);
        assert_eq!(rows.len(), MAX_DISPLAYED);
        assert_eq!(rows[0].name, "青云子");
        assert_eq!(rows[0].kind, RowKind::CurrentPlayer);
        assert_eq!(rows[0].rank_label(), "🥇");
        assert_eq!(rows[0].date, "2024/8/1");
        assert_eq!(rows[3].rank_label(), "4.");
        assert!(rows[1..].iter().all(|r| r.kind == RowKind::Global));
    }

    #[test]
    fn test_personal_best_and_session_score() {
        let (mut board, store) = board_with_player("a");
        assert_eq!(board.personal_best(), 0);
        assert_eq!(board.record_personal_best(40), 40);
        assert_eq!(board.record_personal_best(30), 40);
        assert_eq!(store.get(HIGH_SCORE_KEY).as_deref(), Some("40"));

        board.update_current_score(20);
        board.update_current_score(10);
        assert_eq!(board.current_score(), 20);
    }

    #[test]
    fn test_record_id_is_base36() {
        let mut rng = Pcg32::seed_from_u64(7);
        let id = record_id(NOW, &mut rng);
        assert!(id.starts_with(&to_base36(NOW as u64)));
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
