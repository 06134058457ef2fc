//! Export envelope (format version 3)

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cultivation::CultivationState;
use crate::platform::CivilDate;
use crate::platform::time::format_date_time;

pub const FORMAT_VERSION: u64 = 3;
pub const VERSION: &str = "3.0.0";
pub const GAME_VERSION: &str = "修仙系统 v3.0";
pub const EXPORTED_BY: &str = "CultivationManager v3.0";
pub const MIN_SUPPORTED_VERSION: &str = "1.0.0";

/// Cultivation payload of an envelope
///
/// `state` stays untyped: migrated and future saves may carry fields the
/// state record does not know yet, and validation runs on the raw value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCultivation {
    pub state: Value,
    #[serde(default)]
    pub applied_minutes: u64,
    #[serde(default)]
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compatibility {
    pub min_supported_version: String,
    pub required_features: Vec<String>,
    pub optional_features: Vec<String>,
}

impl Compatibility {
    pub fn current() -> Self {
        Self::new(&["基础修仙", "属性系统", "渡劫系统"], &["奇遇系统", "日志系统"])
    }

    pub fn new(required: &[&str], optional: &[&str]) -> Self {
        Self {
            min_supported_version: MIN_SUPPORTED_VERSION.to_string(),
            required_features: required.iter().map(|s| s.to_string()).collect(),
            optional_features: optional.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub character_name: String,
    pub description: String,
    pub exported_by: String,
    pub platform: String,
}

impl Metadata {
    pub fn new(character_name: &str, description: &str) -> Self {
        Self {
            character_name: character_name.to_string(),
            description: description.to_string(),
            exported_by: EXPORTED_BY.to_string(),
            platform: if cfg!(target_arch = "wasm32") { "Web" } else { "Native" }.to_string(),
        }
    }
}

/// Complete export file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveEnvelope {
    pub version: String,
    pub format_version: u64,
    pub timestamp: f64,
    pub date: String,
    pub game_version: String,
    pub cultivation: SavedCultivation,
    pub compatibility: Compatibility,
    pub metadata: Metadata,
}

impl SaveEnvelope {
    /// Envelope around a raw state value
    pub fn wrap(
        state: Value,
        applied_minutes: u64,
        logs: Vec<String>,
        compatibility: Compatibility,
        metadata: Metadata,
        now_ms: f64,
    ) -> Self {
        Self {
            version: VERSION.to_string(),
            format_version: FORMAT_VERSION,
            timestamp: now_ms,
            date: format_date_time(now_ms),
            game_version: GAME_VERSION.to_string(),
            cultivation: SavedCultivation {
                state,
                applied_minutes,
                logs,
            },
            compatibility,
            metadata,
        }
    }

    /// Export of the live game
    pub fn export(
        state: &CultivationState,
        applied_minutes: u64,
        logs: &[String],
        now_ms: f64,
    ) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(state)?;
        Ok(Self::wrap(
            value,
            applied_minutes,
            logs.to_vec(),
            Compatibility::current(),
            Metadata::new(&state.character_name, "修仙系统存档文件 - 支持向后兼容"),
            now_ms,
        ))
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// `修仙存档_<name>_<YYYY-MM-DD>.json`
pub fn export_file_name(character_name: &str, now_ms: f64) -> String {
    let name = if character_name.is_empty() {
        "未命名"
    } else {
        character_name
    };
    format!("修仙存档_{}_{}.json", name, CivilDate::from_ms_utc(now_ms).iso())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_layout() {
        let mut state = CultivationState::default();
        state.character_name = "青云子".into();
        let env = SaveEnvelope::export(&state, 42, &["[00:00:01] hi".into()], 0.0).unwrap();
        let json: Value = serde_json::from_str(&env.to_pretty_json().unwrap()).unwrap();

        assert_eq!(json["formatVersion"], 3);
        assert_eq!(json["version"], "3.0.0");
        assert_eq!(json["gameVersion"], "修仙系统 v3.0");
        assert_eq!(json["cultivation"]["appliedMinutes"], 42);
        assert_eq!(json["cultivation"]["state"]["characterName"], "青云子");
        assert_eq!(json["cultivation"]["state"]["attributes"]["spiritualStone"], 0);
        assert_eq!(json["compatibility"]["minSupportedVersion"], "1.0.0");
        assert_eq!(json["metadata"]["characterName"], "青云子");
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("", 0.0), "修仙存档_未命名_1970-01-01.json");
        assert_eq!(
            export_file_name("道友", 86_400_000.0),
            "修仙存档_道友_1970-01-02.json"
        );
    }
}
