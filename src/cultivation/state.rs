//! Cultivation save state
//!
//! Everything that is persisted between page loads lives here. Field names
//! serialize as camelCase so saves written by older front-ends keep loading.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stage names inside a realm (early / middle / late)
pub const STAGES: [&str; 3] = ["前期", "中期", "后期"];

/// Index of the late stage; growth is boosted there
pub const LATE_STAGE: usize = 2;

/// Levels per stage
pub const MAX_LEVEL: u32 = 10;

/// Base tribulation success rate before luck/spirit bonuses
pub const BASE_TRIBULATION_RATE: f64 = 0.3;

/// Character attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attr {
    Attack,
    Defense,
    Hp,
    Mana,
    Spirit,
    Luck,
    Comprehension,
    SpiritualStone,
}

impl Attr {
    pub const ALL: [Attr; 8] = [
        Attr::Attack,
        Attr::Defense,
        Attr::Hp,
        Attr::Mana,
        Attr::Spirit,
        Attr::Luck,
        Attr::Comprehension,
        Attr::SpiritualStone,
    ];

    /// JSON key
    pub fn key(self) -> &'static str {
        match self {
            Attr::Attack => "attack",
            Attr::Defense => "defense",
            Attr::Hp => "hp",
            Attr::Mana => "mana",
            Attr::Spirit => "spirit",
            Attr::Luck => "luck",
            Attr::Comprehension => "comprehension",
            Attr::SpiritualStone => "spiritualStone",
        }
    }

    /// Display name
    pub fn label(self) -> &'static str {
        match self {
            Attr::Attack => "攻击",
            Attr::Defense => "防御",
            Attr::Hp => "气血",
            Attr::Mana => "真元",
            Attr::Spirit => "神识",
            Attr::Luck => "福缘",
            Attr::Comprehension => "悟性",
            Attr::SpiritualStone => "灵石",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Attr::ALL.into_iter().find(|a| a.key() == key)
    }

    /// Starting value for a new character
    pub fn default_value(self) -> i64 {
        match self {
            Attr::Attack => 10,
            Attr::Defense => 8,
            Attr::Hp => 100,
            Attr::Mana => 50,
            Attr::Spirit => 30,
            Attr::Luck => 5,
            Attr::Comprehension => 7,
            Attr::SpiritualStone => 0,
        }
    }
}

/// Attribute bag
///
/// Keys this version does not know about (written by a newer front-end) are
/// kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Attributes {
    pub attack: i64,
    pub defense: i64,
    pub hp: i64,
    pub mana: i64,
    pub spirit: i64,
    pub luck: i64,
    pub comprehension: i64,
    pub spiritual_stone: i64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            attack: Attr::Attack.default_value(),
            defense: Attr::Defense.default_value(),
            hp: Attr::Hp.default_value(),
            mana: Attr::Mana.default_value(),
            spirit: Attr::Spirit.default_value(),
            luck: Attr::Luck.default_value(),
            comprehension: Attr::Comprehension.default_value(),
            spiritual_stone: Attr::SpiritualStone.default_value(),
            extra: BTreeMap::new(),
        }
    }
}

impl Attributes {
    pub fn get(&self, attr: Attr) -> i64 {
        match attr {
            Attr::Attack => self.attack,
            Attr::Defense => self.defense,
            Attr::Hp => self.hp,
            Attr::Mana => self.mana,
            Attr::Spirit => self.spirit,
            Attr::Luck => self.luck,
            Attr::Comprehension => self.comprehension,
            Attr::SpiritualStone => self.spiritual_stone,
        }
    }

    pub fn get_mut(&mut self, attr: Attr) -> &mut i64 {
        match attr {
            Attr::Attack => &mut self.attack,
            Attr::Defense => &mut self.defense,
            Attr::Hp => &mut self.hp,
            Attr::Mana => &mut self.mana,
            Attr::Spirit => &mut self.spirit,
            Attr::Luck => &mut self.luck,
            Attr::Comprehension => &mut self.comprehension,
            Attr::SpiritualStone => &mut self.spiritual_stone,
        }
    }

    pub fn add(&mut self, attr: Attr, delta: i64) {
        *self.get_mut(attr) += delta;
    }

    /// Look up any attribute by JSON key, including numeric extras
    pub fn value_of(&self, key: &str) -> Option<f64> {
        match Attr::from_key(key) {
            Some(attr) => Some(self.get(attr) as f64),
            None => self.extra.get(key).and_then(Value::as_f64),
        }
    }
}

/// Tribulation (realm breakthrough trial) bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tribulation {
    /// Late stage level 10 reached; the player must attempt the trial
    pub needed: bool,
    /// Base success rate, raised after each failure
    pub success_rate: f64,
    pub fail_count: u32,
}

impl Default for Tribulation {
    fn default() -> Self {
        Self {
            needed: false,
            success_rate: BASE_TRIBULATION_RATE,
            fail_count: 0,
        }
    }
}

/// Complete persisted cultivation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CultivationState {
    pub realm_index: usize,
    pub stage_index: usize,
    /// 1..=10 within the current stage
    pub level: u32,
    pub exp: i64,
    pub tribulation: Tribulation,
    pub attributes: Attributes,
    /// Minutes of idle time ever applied
    pub total_cultivation_time: u64,
    pub character_name: String,
    /// Fields written by newer versions, preserved verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for CultivationState {
    fn default() -> Self {
        Self {
            realm_index: 0,
            stage_index: 0,
            level: 1,
            exp: 0,
            tribulation: Tribulation::default(),
            attributes: Attributes::default(),
            total_cultivation_time: 0,
            character_name: String::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl CultivationState {
    /// Growth multiplier from the realm (realm 0 -> 1)
    pub fn realm_factor(&self) -> i64 {
        self.realm_index as i64 + 1
    }

    /// 1.5 in the late stage, 1.0 otherwise
    pub fn stage_factor(&self) -> f64 {
        stage_factor(self.stage_index)
    }

    /// Value used by reward conditions (`level>=5`, `luck>10`, ...)
    pub fn field_value(&self, field: &str) -> Option<f64> {
        match field {
            "level" => Some(self.level as f64),
            "realm" | "realmIndex" => Some(self.realm_index as f64),
            "stage" | "stageIndex" => Some(self.stage_index as f64),
            "exp" => Some(self.exp as f64),
            other => self.attributes.value_of(other),
        }
    }

    pub fn stage_name(&self) -> &'static str {
        STAGES.get(self.stage_index).copied().unwrap_or(STAGES[0])
    }
}

pub fn stage_factor(stage_index: usize) -> f64 {
    if stage_index == LATE_STAGE { 1.5 } else { 1.0 }
}
