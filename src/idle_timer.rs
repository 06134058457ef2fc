//! "Fish time" idle clock
//!
//! Counts seconds spent on the page across visits. The running total feeds
//! the cultivation game; a visit more than a day after the last save starts
//! the count over.

use crate::platform::KeyValueStore;
use crate::platform::storage::{get_int, parse_int_prefix};
use crate::platform::time::{MS_PER_DAY, MS_PER_SECOND};

pub const START_KEY: &str = "fishStartTime";
pub const TOTAL_KEY: &str = "fishTotalTime";
pub const LAST_SAVE_KEY: &str = "fishLastSaveTime";

/// Auto-save cadence in seconds of total time
pub const AUTOSAVE_EVERY_SECS: u64 = 30;

pub const RESET_CONFIRM: &str =
    "⚠️ 确定要重置吗？\n\n这将会清空：\n• 所有累积摸鱼时间\n• 修仙等级和进度\n\n此操作不可撤销！";
pub const RESET_DONE: &str = "🎉 重置成功！摸鱼时间和修仙等级已清零，开始新的修仙之旅吧！";

/// One second of the display loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    pub total_seconds: u64,
    /// The state was written to storage this tick
    pub saved: bool,
}

pub struct IdleTimer {
    /// Start of the current session (ms)
    start_ms: f64,
    /// Seconds carried over from earlier sessions
    accumulated: u64,
    store: Box<dyn KeyValueStore>,
}

impl std::fmt::Debug for IdleTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleTimer")
            .field("start_ms", &self.start_ms)
            .field("accumulated", &self.accumulated)
            .finish_non_exhaustive()
    }
}

impl IdleTimer {
    /// Resume from storage, or start fresh
    pub fn init(store: Box<dyn KeyValueStore>, now_ms: f64) -> Self {
        let mut timer = Self {
            start_ms: now_ms,
            accumulated: 0,
            store,
        };

        let has_start = timer.store.get(START_KEY).is_some();
        let last_save_raw = timer.store.get(LAST_SAVE_KEY);

        match (has_start, last_save_raw) {
            (true, Some(raw)) => {
                let last_save = parse_int_prefix(&raw);
                match last_save {
                    Some(last) if now_ms - (last as f64) <= MS_PER_DAY => {
                        timer.accumulated = get_int(timer.store.as_ref(), TOTAL_KEY)
                            .unwrap_or(0)
                            .max(0) as u64;
                        timer.store.set(START_KEY, &(now_ms as i64).to_string());
                        log::info!("Idle timer resumed at {}s", timer.accumulated);
                    }
                    _ => {
                        log::info!("Idle timer stale (>24h), resetting");
                        timer.reset(now_ms);
                    }
                }
            }
            _ => {
                let stamp = (now_ms as i64).to_string();
                timer.store.set(START_KEY, &stamp);
                timer.store.set(LAST_SAVE_KEY, &stamp);
            }
        }
        timer
    }

    /// Zero the count and start a new session
    pub fn reset(&mut self, now_ms: f64) {
        self.start_ms = now_ms;
        self.accumulated = 0;
        let stamp = (now_ms as i64).to_string();
        self.store.set(START_KEY, &stamp);
        self.store.set(TOTAL_KEY, "0");
        self.store.set(LAST_SAVE_KEY, &stamp);
    }

    pub fn total_seconds(&self, now_ms: f64) -> u64 {
        let session = ((now_ms - self.start_ms) / MS_PER_SECOND).floor().max(0.0) as u64;
        self.accumulated + session
    }

    /// Persist the running total; returns it
    pub fn save(&self, now_ms: f64) -> u64 {
        let total = self.total_seconds(now_ms);
        self.store.set(TOTAL_KEY, &total.to_string());
        self.store.set(LAST_SAVE_KEY, &(now_ms as i64).to_string());
        total
    }

    /// Called once a second; saves on every 30th second of total time
    pub fn tick(&self, now_ms: f64) -> TimerTick {
        let total_seconds = self.total_seconds(now_ms);
        let saved = total_seconds % AUTOSAVE_EVERY_SECS == 0;
        if saved {
            self.save(now_ms);
        }
        TimerTick {
            total_seconds,
            saved,
        }
    }
}

/// `1天 2时 3分 4秒`, leading zero units omitted
pub fn format_duration(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{}天 ", days));
    }
    if hours > 0 {
        out.push_str(&format!("{}时 ", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}分 ", minutes));
    }
    out.push_str(&format!("{}秒", secs));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStore;

    const HOUR: f64 = 3_600_000.0;

    #[test]
    fn test_first_visit_records_start() {
        let store = MemoryStore::new();
        let timer = IdleTimer::init(Box::new(store.clone()), 1_000.0);
        assert_eq!(store.get(START_KEY).as_deref(), Some("1000"));
        assert_eq!(store.get(LAST_SAVE_KEY).as_deref(), Some("1000"));
        assert_eq!(timer.total_seconds(11_500.0), 10);
    }

    #[test]
    fn test_resume_within_a_day() {
        let store = MemoryStore::new();
        let timer = IdleTimer::init(Box::new(store.clone()), 0.0);
        timer.save(120_000.0);

        let resumed = IdleTimer::init(Box::new(store.clone()), 5.0 * HOUR);
        assert_eq!(resumed.total_seconds(5.0 * HOUR), 120);
        assert_eq!(resumed.total_seconds(5.0 * HOUR + 3_000.0), 123);
    }

    #[test]
    fn test_stale_or_garbage_resets() {
        let store = MemoryStore::new();
        let timer = IdleTimer::init(Box::new(store.clone()), 0.0);
        timer.save(600_000.0);

        let later = IdleTimer::init(Box::new(store.clone()), 600_000.0 + 25.0 * HOUR);
        assert_eq!(later.total_seconds(600_000.0 + 25.0 * HOUR), 0);
        assert_eq!(store.get(TOTAL_KEY).as_deref(), Some("0"));

        store.set(LAST_SAVE_KEY, "not a number");
        store.set(TOTAL_KEY, "999");
        let garbage = IdleTimer::init(Box::new(store.clone()), 0.0);
        assert_eq!(garbage.total_seconds(0.0), 0);
    }

    #[test]
    fn test_tick_autosaves_every_thirty_seconds() {
        let store = MemoryStore::new();
        let timer = IdleTimer::init(Box::new(store.clone()), 0.0);
        assert!(!timer.tick(29_000.0).saved);
        let tick = timer.tick(30_000.0);
        assert!(tick.saved);
        assert_eq!(tick.total_seconds, 30);
        assert_eq!(store.get(TOTAL_KEY).as_deref(), Some("30"));
    }

    #[test]
    fn test_manual_reset() {
        let store = MemoryStore::new();
        let mut timer = IdleTimer::init(Box::new(store.clone()), 0.0);
        timer.reset(90_000.0);
        assert_eq!(timer.total_seconds(90_000.0), 0);
        assert_eq!(timer.total_seconds(95_000.0), 5);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0秒");
        assert_eq!(format_duration(59), "59秒");
        assert_eq!(format_duration(3_600), "1时 0秒");
        assert_eq!(format_duration(90_061), "1天 1时 1分 1秒");
    }
}
