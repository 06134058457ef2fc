//! Cultivation manager
//!
//! Idle minutes turn into experience, levels, stages and realm breakthroughs.
//! Every operation mutates the state, appends log lines, persists, and
//! returns the [`CultivationEvent`]s the UI needs to refresh.

use rand::Rng;
use serde_json::Value;
use thiserror::Error;

use super::data::{CultivationData, DEFAULT_LOG_CONTENT, Realm};
use super::select::{SelectOptions, Weighted, select_by_weight_and_condition};
use super::state::{Attr, CultivationState, LATE_STAGE, MAX_LEVEL, STAGES, Tribulation};
use crate::persistence::validation::load_state;
use crate::persistence::{ImportPlan, PersistenceError, PersistenceResult, SaveEnvelope, welcome_message};
use crate::platform::KeyValueStore;
use crate::platform::storage::get_int;
use crate::platform::time::format_clock;

pub const STATE_KEY: &str = "cultivationState_v2";
pub const APPLIED_KEY: &str = "cultivationAppliedMinutes_v2";
pub const LOGS_KEY: &str = "cultivationLogs_v1";
pub const CHARACTER_NAME_KEY: &str = "cultivationCharacterName";

/// Log lines kept in storage
pub const MAX_LOGS: usize = 100;
/// Log lines rendered in the panel
pub const VISIBLE_LOGS: usize = 10;
/// Minutes applied per batch when catching up on idle time
pub const MAX_SYNC_BATCH: u64 = 60;
/// Minimum gap between adventures
pub const ADVENTURE_COOLDOWN_MS: f64 = 60_000.0;
/// Chance per session of an attribute boost
pub const BOOST_TRIGGER_RATE: f64 = 0.3;
/// Level-ups processed per update, guards against huge exp dumps
const MAX_LEVEL_UPS: u32 = 100;
/// Exp converted per grand-master growth step
const GRANDMASTER_EXP_STEP: i64 = 100;

const TRIBULATION_REMINDER: &str = "⚡ 境界圆满：天劫已至，请点击『渡劫』按钮以突破！";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CultivationError {
    #[error("✨ 仙号需要2-10个字符！请输入一个合适的仙号。")]
    InvalidName,
}

/// What changed, for the UI
#[derive(Debug, Clone, PartialEq)]
pub enum CultivationEvent {
    LevelUp { level: u32 },
    StageBreakthrough { stage_index: usize },
    TribulationPending,
    Adventure { id: String },
    AttributesChanged,
    GrandmasterGrowth,
    NameChanged,
    Reset,
}

/// Result of a tribulation attempt
#[derive(Debug, Clone, PartialEq)]
pub enum TribulationOutcome {
    /// No tribulation pending
    NotPending,
    Success { message: String },
    Failure { message: String, next_rate: f64 },
}

impl TribulationOutcome {
    /// Alert text shown after the attempt
    pub fn alert_text(&self) -> Option<String> {
        match self {
            TribulationOutcome::NotPending => None,
            TribulationOutcome::Success { message } => Some(format!("⚡ 渡劫成功！\n\n{message}")),
            TribulationOutcome::Failure { message, next_rate } => Some(format!(
                "💀 渡劫失败！\n\n{message}\n下一次成功率 {:.0}%",
                next_rate * 100.0
            )),
        }
    }
}

/// Progress panel contents
#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    pub title: String,
    pub desc: String,
    /// Progress bar width, 0..=100
    pub percent: u32,
    /// Show the tribulation button
    pub tribulation_ready: bool,
}

/// Random attribute gain after a session
struct AttributeBoost {
    attr: Attr,
    base: f64,
    spread: f64,
}

impl Weighted for AttributeBoost {
    fn base_weight(&self) -> f64 {
        1.0
    }
}

static BOOSTS: [AttributeBoost; 5] = [
    AttributeBoost { attr: Attr::Attack, base: 1.0, spread: 3.0 },
    AttributeBoost { attr: Attr::Defense, base: 1.0, spread: 3.0 },
    AttributeBoost { attr: Attr::Hp, base: 5.0, spread: 15.0 },
    AttributeBoost { attr: Attr::Mana, base: 3.0, spread: 10.0 },
    AttributeBoost { attr: Attr::Spirit, base: 1.0, spread: 3.0 },
];

/// Amount with integral values printed without decimals
fn fmt_amount(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Adventure trigger chance from luck (sigmoid around 10)
pub fn adventure_chance(luck: i64) -> f64 {
    let bonus = 0.8 / (1.0 + (-0.2 * (luck as f64 - 10.0)).exp());
    (0.1 + bonus).min(0.95)
}

/// Tribulation success chance for a state
pub fn tribulation_rate(state: &CultivationState) -> f64 {
    let base = tribulation_base_rate(state);
    let luck_bonus = (state.attributes.luck as f64 * 0.01).min(0.2);
    let spirit_bonus = (state.attributes.spirit as f64 * 0.002).min(0.1);
    (base + luck_bonus + spirit_bonus).min(0.95)
}

/// Validate and trim a character name
pub fn normalize_character_name(name: &str) -> Result<String, CultivationError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if (2..=10).contains(&len) {
        Ok(trimmed.to_string())
    } else {
        Err(CultivationError::InvalidName)
    }
}

pub struct Cultivation {
    state: CultivationState,
    applied_minutes: u64,
    logs: Vec<String>,
    data: CultivationData,
    store: Box<dyn KeyValueStore>,
    last_adventure_ms: Option<f64>,
}

impl std::fmt::Debug for Cultivation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cultivation")
            .field("state", &self.state)
            .field("applied_minutes", &self.applied_minutes)
            .field("logs", &self.logs.len())
            .finish_non_exhaustive()
    }
}

impl Cultivation {
    /// Load persisted progress; corrupt or missing state starts fresh
    pub fn load(store: Box<dyn KeyValueStore>, data: CultivationData) -> Self {
        let mut game = Self {
            state: CultivationState::default(),
            applied_minutes: 0,
            logs: Vec::new(),
            data,
            store,
            last_adventure_ms: None,
        };

        let loaded = game.store.get(STATE_KEY).and_then(|raw| {
            let parsed = serde_json::from_str::<Value>(&raw)
                .map_err(PersistenceError::from)
                .and_then(|value| load_state(&value, game.data.realms.len(), STAGES.len()));
            match parsed {
                Ok(state) => Some(state),
                Err(e) => {
                    log::warn!("Cultivation state unreadable, starting over: {}", e);
                    None
                }
            }
        });

        match loaded {
            Some(mut state) => {
                if state.character_name.is_empty() {
                    state.character_name = game.store.get(CHARACTER_NAME_KEY).unwrap_or_default();
                }
                game.state = state;
                game.applied_minutes = get_int(game.store.as_ref(), APPLIED_KEY)
                    .unwrap_or(0)
                    .max(0) as u64;
                game.logs = game
                    .store
                    .get(LOGS_KEY)
                    .and_then(|raw| serde_json::from_str(&raw).ok())
                    .unwrap_or_default();
            }
            None => game.reset_state(),
        }
        log::info!(
            "Cultivation loaded: realm {} stage {} level {}",
            game.state.realm_index,
            game.state.stage_index,
            game.state.level
        );
        game
    }

    pub fn save(&self) {
        match serde_json::to_string(&self.state) {
            Ok(json) => self.store.set(STATE_KEY, &json),
            Err(e) => log::error!("Failed to encode cultivation state: {}", e),
        }
        self.store.set(APPLIED_KEY, &self.applied_minutes.to_string());
        match serde_json::to_string(&self.logs) {
            Ok(json) => self.store.set(LOGS_KEY, &json),
            Err(e) => log::error!("Failed to encode cultivation logs: {}", e),
        }
        if !self.state.character_name.is_empty() {
            self.store.set(CHARACTER_NAME_KEY, &self.state.character_name);
        }
    }

    /// Fresh character; the stored name survives
    fn reset_state(&mut self) {
        self.state = CultivationState {
            character_name: self.store.get(CHARACTER_NAME_KEY).unwrap_or_default(),
            ..Default::default()
        };
        self.applied_minutes = 0;
        self.logs.clear();
        self.save();
    }

    /// Start over (the idle timer was reset)
    pub fn reset(&mut self) -> Vec<CultivationEvent> {
        self.reset_state();
        self.last_adventure_ms = None;
        vec![CultivationEvent::Reset]
    }

    // === Accessors ===

    pub fn state(&self) -> &CultivationState {
        &self.state
    }

    pub fn applied_minutes(&self) -> u64 {
        self.applied_minutes
    }

    pub fn data(&self) -> &CultivationData {
        &self.data
    }

    /// Swap in freshly fetched tables
    pub fn set_data(&mut self, data: CultivationData) {
        self.data = data;
        let last = self.data.last_realm_index();
        if self.state.realm_index > last {
            log::warn!("Realm index {} beyond table, clamping", self.state.realm_index);
            self.state.realm_index = last;
            self.save();
        }
    }

    pub fn realm(&self) -> Option<&Realm> {
        self.data.realms.get(self.state.realm_index)
    }

    fn realm_name(&self) -> String {
        self.realm().map(|r| r.name.clone()).unwrap_or_default()
    }

    pub fn is_grandmaster(&self) -> bool {
        self.state.realm_index >= self.data.last_realm_index()
    }

    /// All logs, newest first
    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn recent_logs(&self) -> &[String] {
        &self.logs[..self.logs.len().min(VISIBLE_LOGS)]
    }

    fn add_log(&mut self, now_ms: f64, message: &str) {
        self.logs.insert(0, format!("[{}] {}", format_clock(now_ms), message));
        self.logs.truncate(MAX_LOGS);
    }

    pub fn character_name(&self) -> &str {
        &self.state.character_name
    }

    pub fn set_character_name(&mut self, name: &str) -> Result<Vec<CultivationEvent>, CultivationError> {
        self.state.character_name = normalize_character_name(name)?;
        self.save();
        Ok(vec![CultivationEvent::NameChanged])
    }

    /// The snake game needs a name for the leaderboard
    pub fn can_play_snake(&self) -> bool {
        !self.state.character_name.trim().is_empty()
    }

    // === Progression ===

    /// Exp needed for the next level
    pub fn need_exp(&self) -> i64 {
        let base = 10f64.powi(self.state.realm_index as i32) * (self.state.stage_index as f64 + 1.0) * 5.0;
        let comprehension = self.state.attributes.comprehension as f64;
        let need = (base / (1.0 + comprehension * 0.05)).floor();
        if need.is_nan() { 1 } else { (need as i64).max(1) }
    }

    /// One idle session of `minutes`
    pub fn update_cultivation(
        &mut self,
        minutes: u64,
        now_ms: f64,
        rng: &mut impl Rng,
    ) -> Vec<CultivationEvent> {
        let mut events = Vec::new();
        if minutes == 0 {
            return events;
        }
        let gained = minutes as i64;
        self.state.total_cultivation_time += minutes;

        self.try_adventure(now_ms, rng, &mut events);

        let template = select_by_weight_and_condition(
            &self.data.logs,
            &self.state,
            SelectOptions { trigger_rate: 1.0, allow_empty: false },
            rng,
        )
        .map(|t| t.content.clone())
        .unwrap_or_else(|| DEFAULT_LOG_CONTENT.to_string());

        let boost = select_by_weight_and_condition(
            &BOOSTS,
            &self.state,
            SelectOptions { trigger_rate: BOOST_TRIGGER_RATE, allow_empty: true },
            rng,
        );
        match boost {
            Some(boost) => {
                let factor = self.state.realm_factor() as f64 * self.state.stage_factor();
                let gain = ((rng.random::<f64>() * boost.spread + boost.base) * factor).floor() as i64;
                self.state.attributes.add(boost.attr, gain);
                self.add_log(now_ms, &format!("💪 修炼：{} ({}+{})", template, boost.attr.label(), gain));
                events.push(CultivationEvent::AttributesChanged);
            }
            None => self.add_log(now_ms, &format!("💪 修炼：{}", template)),
        }

        if self.is_grandmaster() {
            self.state.exp += gained;
            while self.state.exp >= GRANDMASTER_EXP_STEP {
                self.state.exp -= GRANDMASTER_EXP_STEP;
                self.apply_grandmaster_growth(now_ms);
                events.push(CultivationEvent::GrandmasterGrowth);
            }
            if self.state.tribulation.needed {
                self.add_log(now_ms, TRIBULATION_REMINDER);
            }
        } else if self.state.tribulation.needed {
            self.add_log(now_ms, TRIBULATION_REMINDER);
        } else {
            self.state.exp += gained;
            self.level_up_loop(now_ms, &mut events);
        }

        self.save();
        events
    }

    fn apply_grandmaster_growth(&mut self, now_ms: f64) {
        let factor = self.state.realm_factor() as f64 * self.state.stage_factor();
        let grow = |base: f64| (base * factor).floor() as i64;
        let gains = [
            (Attr::Attack, grow(2.0)),
            (Attr::Defense, grow(2.0)),
            (Attr::Hp, grow(20.0)),
            (Attr::Mana, grow(15.0)),
            (Attr::Spirit, grow(1.0)),
        ];
        for (attr, gain) in gains {
            self.state.attributes.add(attr, gain);
        }
        let summary: Vec<String> = gains
            .iter()
            .map(|(attr, gain)| format!("{}+{}", attr.label(), gain))
            .collect();
        self.add_log(
            now_ms,
            &format!("✨ 大圆满境界中，修为积累化为实力增长 ({})", summary.join("，")),
        );
    }

    fn level_up_loop(&mut self, now_ms: f64, events: &mut Vec<CultivationEvent>) {
        let mut need = self.need_exp();
        let mut level_ups = 0;

        while !self.state.tribulation.needed && self.state.exp >= need && level_ups < MAX_LEVEL_UPS {
            self.state.exp -= need;
            level_ups += 1;

            if self.state.level < MAX_LEVEL {
                self.state.level += 1;
                self.add_log(
                    now_ms,
                    &format!("⬆️ 等级提升：修为更进一步，当前{}重。", self.state.level),
                );
                events.push(CultivationEvent::LevelUp { level: self.state.level });
            } else {
                self.state.level = 1;
                if self.state.stage_index < LATE_STAGE {
                    self.state.stage_index += 1;
                    let msg = format!(
                        "🌟 阶段突破：进入{}{}，实力大增！",
                        self.realm_name(),
                        self.state.stage_name()
                    );
                    self.add_log(now_ms, &msg);
                    let attrs = &mut self.state.attributes;
                    attrs.attack += 10;
                    attrs.defense += 8;
                    attrs.hp += 50;
                    attrs.mana += 30;
                    events.push(CultivationEvent::StageBreakthrough {
                        stage_index: self.state.stage_index,
                    });
                } else {
                    self.state.stage_index = 0;
                    self.state.tribulation.needed = true;
                    self.add_log(now_ms, "⚡ 境界圆满：感受到天劫将至，准备渡劫突破！");
                    events.push(CultivationEvent::TribulationPending);
                    break;
                }
            }
            need = self.need_exp();
        }
    }

    fn try_adventure(&mut self, now_ms: f64, rng: &mut impl Rng, events: &mut Vec<CultivationEvent>) {
        if self.data.adventures.is_empty() {
            return;
        }
        if self
            .last_adventure_ms
            .is_some_and(|last| now_ms - last < ADVENTURE_COOLDOWN_MS)
        {
            return;
        }

        let options = SelectOptions {
            trigger_rate: adventure_chance(self.state.attributes.luck),
            allow_empty: true,
        };
        let Some(adventure) =
            select_by_weight_and_condition(&self.data.adventures, &self.state, options, rng).cloned()
        else {
            return;
        };

        let mut gains = Vec::new();
        for (key, amount) in &adventure.rewards {
            let shown = fmt_amount(*amount);
            if key == "exp" {
                self.state.exp += amount.round() as i64;
                gains.push(format!("经验+{}", shown));
            } else if let Some(attr) = Attr::from_key(key) {
                self.state.attributes.add(attr, amount.round() as i64);
                gains.push(format!("{}+{}", attr.label(), shown));
            } else if let Some(current) = self.state.attributes.extra.get(key).and_then(Value::as_f64) {
                self.state.attributes.extra.insert(key.clone(), Value::from(current + amount));
                gains.push(format!("{}+{}", key, shown));
            }
        }

        let mut message = format!("🎲 奇遇：{}", adventure.desc);
        if !gains.is_empty() {
            message.push_str(&format!(" ({})", gains.join("，")));
        }
        self.add_log(now_ms, &message);
        self.last_adventure_ms = Some(now_ms);
        events.push(CultivationEvent::Adventure { id: adventure.id });
        events.push(CultivationEvent::AttributesChanged);
    }

    /// Attempt the pending tribulation
    ///
    /// `minutes` is the session length when the attempt happens mid-session;
    /// a failed attempt then still credits that time.
    pub fn try_tribulation(&mut self, minutes: u64, now_ms: f64, rng: &mut impl Rng) -> TribulationOutcome {
        if !self.state.tribulation.needed {
            return TribulationOutcome::NotPending;
        }

        let rate = tribulation_rate(&self.state);
        let outcome = if rng.random::<f64>() < rate {
            let old_realm = self.state.realm_index;
            let last = self.data.last_realm_index();
            let state = &mut self.state;
            state.realm_index = (state.realm_index + 1).min(last);
            state.stage_index = 0;
            state.level = 1;
            state.exp = 0;
            state.tribulation = Tribulation::default();

            let factor = state.realm_factor();
            let attrs = &mut state.attributes;
            attrs.attack += 20 * factor;
            attrs.defense += 15 * factor;
            attrs.hp += 100 * factor;
            attrs.mana += 80 * factor;
            attrs.spirit += 25 * factor;
            attrs.luck += 1;
            attrs.spiritual_stone += 200 * factor;

            let realm = self.realm().cloned().unwrap_or_default();
            let message = if old_realm == self.state.realm_index {
                format!("⚡ 渡劫成功！已达最高境界【{}】！", realm.name)
            } else {
                realm.breakthrough
            };
            self.add_log(now_ms, &format!("🎉 {}", message));
            log::info!("Tribulation passed, realm {}", self.state.realm_index);
            TribulationOutcome::Success { message }
        } else {
            let base = tribulation_base_rate(&self.state);
            let trib = &mut self.state.tribulation;
            trib.fail_count += 1;
            trib.success_rate = (base + 0.1).min(0.95);
            let next_rate = trib.success_rate;

            let factor = self.state.realm_factor() as f64 * self.state.stage_factor();
            let spirit = (2.0 * factor).floor() as i64;
            let defense = factor.floor() as i64;
            let exp = (20.0 * factor).floor() as i64;
            self.state.attributes.spirit += spirit;
            self.state.attributes.defense += defense;
            self.state.exp += exp;
            self.add_log(
                now_ms,
                &format!("💀 渡劫失败：吸收天劫余威，获得神识+{spirit}，防御+{defense}，经验+{exp}。"),
            );

            if minutes > 0 {
                self.state.exp += minutes as i64;
                self.state.attributes.spirit += (minutes / 10) as i64;
            }

            let message = "天劫威能恐怖，这次未能成功，但你从中汲取经验。".to_string();
            self.add_log(now_ms, &format!("💀 渡劫失败：{}", message));
            TribulationOutcome::Failure { message, next_rate }
        };

        self.save();
        outcome
    }

    /// Catch up with the idle timer's running total
    ///
    /// Time running backwards is ignored; a large gap is applied in
    /// hour-sized batches.
    pub fn sync_with_total_seconds(
        &mut self,
        total_seconds: u64,
        now_ms: f64,
        rng: &mut impl Rng,
    ) -> Vec<CultivationEvent> {
        let total_minutes = total_seconds / 60;
        if total_minutes < self.applied_minutes {
            log::warn!(
                "Idle time went backwards ({} < {}), ignoring",
                total_minutes,
                self.applied_minutes
            );
            return Vec::new();
        }

        let mut events = Vec::new();
        let mut remaining = total_minutes - self.applied_minutes;
        if remaining == 0 {
            return events;
        }
        while remaining > 0 {
            let step = remaining.min(MAX_SYNC_BATCH);
            events.extend(self.update_cultivation(step, now_ms, rng));
            remaining -= step;
        }
        self.applied_minutes = total_minutes;
        self.store.set(APPLIED_KEY, &self.applied_minutes.to_string());
        events
    }

    // === View ===

    pub fn status_view(&self) -> StatusView {
        let realm_name = self.realm_name();

        if self.state.tribulation.needed {
            return StatusView {
                title: format!("⚡ 【{} 圆满】天劫将至", realm_name),
                desc: format!(
                    "即将面临天劫考验，当前成功率：{:.0}%",
                    tribulation_base_rate(&self.state) * 100.0
                ),
                percent: 100,
                tribulation_ready: true,
            };
        }

        if self.is_grandmaster() {
            let percent = (self.state.exp.max(0) as f64).round().min(100.0) as u32;
            return StatusView {
                title: format!("✨ {} 大圆满修炼中", realm_name),
                desc: format!("经验累积中：{}%", percent),
                percent,
                tribulation_ready: false,
            };
        }

        let need = self.need_exp();
        let percent = ((self.state.exp.max(0) as f64 / need as f64) * 100.0)
            .round()
            .min(100.0) as u32;
        StatusView {
            title: format!(
                "境界：{} {} {}重",
                realm_name,
                self.state.stage_name(),
                self.state.level
            ),
            desc: self.realm().map(|r| r.desc.clone()).unwrap_or_default(),
            percent,
            tribulation_ready: false,
        }
    }

    // === Export / import ===

    pub fn export(&self, now_ms: f64) -> Result<SaveEnvelope, serde_json::Error> {
        SaveEnvelope::export(&self.state, self.applied_minutes, &self.logs, now_ms)
    }

    /// Replace progress with an imported save
    ///
    /// Current progress is restored if the save cannot be loaded. Returns the
    /// welcome text on success.
    pub fn import(&mut self, plan: &ImportPlan) -> PersistenceResult<String> {
        let backup = (self.state.clone(), self.applied_minutes, self.logs.clone());

        match load_state(plan.state(), self.data.realms.len(), STAGES.len()) {
            Ok(state) => {
                self.state = state;
                self.applied_minutes = plan.applied_minutes();
                self.logs = plan.logs();
                self.logs.truncate(MAX_LOGS);
                self.save();
                let state_value = serde_json::to_value(&self.state)?;
                log::info!("Save imported for '{}'", self.state.character_name);
                Ok(welcome_message(plan, &state_value, &self.data.realms))
            }
            Err(e) => {
                log::error!("Import failed, restoring backup: {}", e);
                (self.state, self.applied_minutes, self.logs) = backup;
                self.save();
                Err(e)
            }
        }
    }
}

/// Displayed base rate (`successRate || 0.3`)
fn tribulation_base_rate(state: &CultivationState) -> f64 {
    if state.tribulation.success_rate == 0.0 {
        Tribulation::default().success_rate
    } else {
        state.tribulation.success_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStore;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn game_with(store: &MemoryStore) -> Cultivation {
        let mut data = CultivationData::bundled();
        data.adventures.clear();
        Cultivation::load(Box::new(store.clone()), data)
    }

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(2024)
    }

    #[test]
    fn test_need_exp_formula() {
        let store = MemoryStore::new();
        let mut game = game_with(&store);
        // 1 * 1 * 5 / (1 + 7 * 0.05) = 3.7
        assert_eq!(game.need_exp(), 3);

        game.state.realm_index = 2;
        game.state.stage_index = 1;
        game.state.attributes.comprehension = 0;
        assert_eq!(game.need_exp(), 1000);

        game.state.realm_index = 0;
        game.state.stage_index = 0;
        game.state.attributes.comprehension = 1000;
        assert_eq!(game.need_exp(), 1);
    }

    #[test]
    fn test_zero_minutes_is_noop() {
        let store = MemoryStore::new();
        let mut game = game_with(&store);
        let before = game.state.clone();
        assert!(game.update_cultivation(0, 0.0, &mut rng()).is_empty());
        assert_eq!(game.state, before);
        assert!(game.logs().is_empty());
    }

    #[test]
    fn test_level_ups_and_stage_breakthrough() {
        let store = MemoryStore::new();
        let mut game = game_with(&store);
        game.state.level = MAX_LEVEL;
        game.state.attributes.comprehension = 0;
        let attack = game.state.attributes.attack;

        // need_exp = 5 at stage 0
        let events = game.update_cultivation(5, 0.0, &mut rng());
        assert_eq!(game.state.stage_index, 1);
        assert_eq!(game.state.level, 1);
        assert!(events.contains(&CultivationEvent::StageBreakthrough { stage_index: 1 }));
        assert!(game.state.attributes.attack >= attack + 10);
        assert!(game.logs().iter().any(|l| l.contains("阶段突破")));
    }

    #[test]
    fn test_late_stage_sets_tribulation_pending() {
        let store = MemoryStore::new();
        let mut game = game_with(&store);
        game.state.stage_index = LATE_STAGE;
        game.state.level = MAX_LEVEL;
        game.state.attributes.comprehension = 0;

        let events = game.update_cultivation(1000, 0.0, &mut rng());
        assert!(game.state.tribulation.needed);
        assert_eq!(game.state.stage_index, 0);
        assert_eq!(game.state.level, 1);
        assert!(events.contains(&CultivationEvent::TribulationPending));

        // Pending tribulation blocks further exp
        let exp = game.state.exp;
        game.update_cultivation(50, 0.0, &mut rng());
        assert_eq!(game.state.exp, exp);
        assert!(game.logs()[0].contains("天劫已至"));
    }

    #[test]
    fn test_level_up_loop_is_bounded() {
        let store = MemoryStore::new();
        let mut game = game_with(&store);
        game.state.attributes.comprehension = 10_000;
        game.update_cultivation(1_000_000, 0.0, &mut rng());
        let level_ups = game
            .logs()
            .iter()
            .filter(|l| l.contains("等级提升") || l.contains("阶段突破") || l.contains("天劫将至"))
            .count();
        assert!(level_ups <= MAX_LEVEL_UPS as usize);
    }

    #[test]
    fn test_grandmaster_growth() {
        let store = MemoryStore::new();
        let mut game = game_with(&store);
        game.state.realm_index = game.data.last_realm_index();
        let hp = game.state.attributes.hp;

        let events = game.update_cultivation(250, 0.0, &mut rng());
        let growth = events
            .iter()
            .filter(|e| **e == CultivationEvent::GrandmasterGrowth)
            .count();
        assert_eq!(growth, 2);
        assert_eq!(game.state.exp, 50);
        let factor = game.state.realm_factor();
        assert!(game.state.attributes.hp >= hp + 2 * 20 * factor);
        assert!(game.status_view().title.contains("大圆满修炼中"));
        assert_eq!(game.status_view().percent, 50);
    }

    #[test]
    fn test_tribulation_success_and_failure() {
        let store = MemoryStore::new();
        let mut game = game_with(&store);
        assert_eq!(game.try_tribulation(0, 0.0, &mut rng()), TribulationOutcome::NotPending);

        // Guaranteed success: 0.95 cap is still < 1, so retry until it passes
        game.state.tribulation.needed = true;
        game.state.tribulation.success_rate = 0.95;
        let mut r = rng();
        let mut outcome = game.try_tribulation(0, 0.0, &mut r);
        while matches!(outcome, TribulationOutcome::Failure { .. }) {
            game.state.tribulation.needed = true;
            outcome = game.try_tribulation(0, 0.0, &mut r);
        }
        assert_eq!(game.state.realm_index, 1);
        assert!(!game.state.tribulation.needed);
        assert_eq!(game.state.attributes.spiritual_stone, 400);
        match outcome {
            TribulationOutcome::Success { message } => {
                assert_eq!(message, game.data.realms[1].breakthrough)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_tribulation_failure_compensates() {
        let store = MemoryStore::new();
        let mut game = game_with(&store);
        game.state.tribulation.needed = true;
        game.state.tribulation.success_rate = 0.3;
        game.state.attributes.luck = -1000;
        game.state.attributes.spirit = -1000;
        // rate = max bonus 0.3 - 10 - 2 < 0, always fails
        let outcome = game.try_tribulation(30, 0.0, &mut rng());
        match &outcome {
            TribulationOutcome::Failure { next_rate, .. } => assert!((next_rate - 0.4).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(game.state.tribulation.fail_count, 1);
        assert_eq!(game.state.exp, 20 + 30);
        assert_eq!(game.state.attributes.spirit, -1000 + 2 + 3);
        assert!(game.state.tribulation.needed);
        assert!(outcome.alert_text().unwrap().contains("下一次成功率 40%"));
    }

    #[test]
    fn test_tribulation_failure_from_unset_rate_starts_at_base() {
        let store = MemoryStore::new();
        let mut game = game_with(&store);
        game.state.tribulation.needed = true;
        game.state.tribulation.success_rate = 0.0;
        game.state.attributes.luck = -1000;
        game.state.attributes.spirit = -1000;
        assert!(game.status_view().desc.contains("当前成功率：30%"));
        match game.try_tribulation(0, 0.0, &mut rng()) {
            TribulationOutcome::Failure { next_rate, .. } => assert!((next_rate - 0.4).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
        assert!((game.state.tribulation.success_rate - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_sync_batches_and_ignores_rewind() {
        let store = MemoryStore::new();
        let mut game = game_with(&store);
        game.sync_with_total_seconds(150 * 60, 0.0, &mut rng());
        assert_eq!(game.applied_minutes(), 150);
        assert_eq!(game.state.total_cultivation_time, 150);
        // three sessions: 60 + 60 + 30
        let sessions = game.logs().iter().filter(|l| l.contains("💪 修炼")).count();
        assert_eq!(sessions, 3);
        assert_eq!(store.get(APPLIED_KEY).as_deref(), Some("150"));

        game.sync_with_total_seconds(60, 0.0, &mut rng());
        assert_eq!(game.applied_minutes(), 150);
    }

    #[test]
    fn test_logs_are_capped_and_stamped() {
        let store = MemoryStore::new();
        let mut game = game_with(&store);
        for i in 0..150 {
            game.add_log(3_723_000.0, &format!("line {i}"));
        }
        assert_eq!(game.logs().len(), MAX_LOGS);
        assert_eq!(game.recent_logs().len(), VISIBLE_LOGS);
        assert_eq!(game.logs()[0], "[01:02:03] line 149");
    }

    #[test]
    fn test_character_name_rules() {
        let store = MemoryStore::new();
        let mut game = game_with(&store);
        assert!(!game.can_play_snake());
        assert_eq!(game.set_character_name(" 仙 "), Err(CultivationError::InvalidName));
        assert!(game.set_character_name("这个名字实在是太长了吧").is_err());
        game.set_character_name("  青云子 ").unwrap();
        assert_eq!(game.character_name(), "青云子");
        assert!(game.can_play_snake());
        assert_eq!(store.get(CHARACTER_NAME_KEY).as_deref(), Some("青云子"));
    }

    #[test]
    fn test_persistence_round_trip_and_corruption() {
        let store = MemoryStore::new();
        {
            let mut game = game_with(&store);
            game.set_character_name("逍遥子").unwrap();
            game.sync_with_total_seconds(600, 0.0, &mut rng());
        }
        let game = game_with(&store);
        assert_eq!(game.character_name(), "逍遥子");
        assert_eq!(game.applied_minutes(), 10);
        assert!(!game.logs().is_empty());

        store.set(STATE_KEY, "{broken");
        let game = game_with(&store);
        assert_eq!(game.state().level, 1);
        assert_eq!(game.applied_minutes(), 0);
        // The name survives a reset
        assert_eq!(game.character_name(), "逍遥子");
    }

    #[test]
    fn test_reset_keeps_name() {
        let store = MemoryStore::new();
        let mut game = game_with(&store);
        game.set_character_name("清风").unwrap();
        game.sync_with_total_seconds(6000, 0.0, &mut rng());
        assert_eq!(game.reset(), vec![CultivationEvent::Reset]);
        assert_eq!(game.applied_minutes(), 0);
        assert!(game.logs().is_empty());
        assert_eq!(game.state().realm_index, 0);
        assert_eq!(game.character_name(), "清风");
    }

    #[test]
    fn test_adventure_cooldown() {
        let store = MemoryStore::new();
        let mut data = CultivationData::bundled();
        for adventure in &mut data.adventures {
            adventure.conditions.clear();
        }
        let mut game = Cultivation::load(Box::new(store), data);
        game.state.attributes.luck = 1000;

        let mut r = rng();
        let mut first = None;
        for minute in 0..50 {
            let now = minute as f64 * 1000.0;
            let events = game.update_cultivation(1, now, &mut r);
            if events.iter().any(|e| matches!(e, CultivationEvent::Adventure { .. })) {
                match first {
                    None => first = Some(now),
                    Some(t) => panic!("second adventure at {now} within cooldown of {t}"),
                }
            }
        }
        assert!(first.is_some());
        assert!(game.logs().iter().any(|l| l.contains("🎲 奇遇")));
    }

    #[test]
    fn test_status_views() {
        let store = MemoryStore::new();
        let mut game = game_with(&store);
        let view = game.status_view();
        assert_eq!(view.title, format!("境界：{} 前期 1重", game.data.realms[0].name));
        assert!(!view.tribulation_ready);

        game.state.tribulation.needed = true;
        let view = game.status_view();
        assert!(view.title.contains("圆满】天劫将至"));
        assert!(view.desc.ends_with("30%"));
        assert_eq!(view.percent, 100);
        assert!(view.tribulation_ready);
    }

    #[test]
    fn test_adventure_chance_curve() {
        assert!((adventure_chance(10) - 0.5).abs() < 1e-9);
        assert!(adventure_chance(1000) <= 0.95);
        assert!(adventure_chance(-1000) >= 0.1);
    }

    #[test]
    fn test_export_import_round_trip() {
        let store = MemoryStore::new();
        let mut game = game_with(&store);
        game.set_character_name("玄真").unwrap();
        game.state.realm_index = 2;
        game.state.attributes.attack = 321;
        let json = game.export(0.0).unwrap().to_pretty_json().unwrap();

        let other_store = MemoryStore::new();
        let mut other = game_with(&other_store);
        let plan = ImportPlan::parse(&json, other.data.realms.len()).unwrap();
        let welcome = other.import(&plan).unwrap();
        assert!(welcome.contains("欢迎回来，玄真道友"));
        assert_eq!(other.state().realm_index, 2);
        assert_eq!(other.state().attributes.attack, 321);
        assert_eq!(other_store.get(CHARACTER_NAME_KEY).as_deref(), Some("玄真"));
    }
}
