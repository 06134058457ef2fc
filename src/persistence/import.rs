//! Import flow: parse, migrate, validate, then describe the save to the player

use serde_json::Value;

use super::envelope::FORMAT_VERSION;
use super::migration::{cultivation_state, migrate};
use super::validation::validate;
use super::PersistenceResult;
use crate::cultivation::data::Realm;
use crate::cultivation::state::{Attr, STAGES};

/// A save file that passed migration and validation, awaiting confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct ImportPlan {
    /// The file as read
    pub raw: Value,
    /// v3 envelope built from it
    pub migrated: Value,
}

impl ImportPlan {
    pub fn parse(text: &str, realm_count: usize) -> PersistenceResult<Self> {
        let raw: Value = serde_json::from_str(text)?;
        let migrated = migrate(&raw)?;
        validate(&migrated, realm_count)?;
        Ok(Self { raw, migrated })
    }

    pub fn state(&self) -> &Value {
        cultivation_state(&self.migrated).unwrap_or(&Value::Null)
    }

    pub fn applied_minutes(&self) -> u64 {
        self.migrated["cultivation"]["appliedMinutes"]
            .as_u64()
            .unwrap_or(0)
    }

    pub fn logs(&self) -> Vec<String> {
        self.migrated["cultivation"]["logs"]
            .as_array()
            .map(|logs| logs.iter().filter_map(|l| l.as_str().map(String::from)).collect())
            .unwrap_or_default()
    }

    fn upgraded(&self) -> bool {
        self.migrated.get("formatVersion").and_then(Value::as_u64) != Some(FORMAT_VERSION)
    }

    /// Text for the "overwrite current progress?" prompt
    pub fn confirmation(&self, realms: &[Realm]) -> String {
        let state = self.state();
        let mut msg = String::from("📁 检测到修仙存档文件！\n\n");

        if let Some(name) = state.get("characterName").and_then(Value::as_str) {
            if !name.is_empty() {
                msg.push_str(&format!("🧙\u{200d}♂️ 仙号：{}\n", name));
            }
        }
        if let Some(line) = realm_line(state, realms) {
            msg.push_str(&format!("⚡ 境界：{}\n", line));
        }
        if let Some(attrs) = state.get("attributes").filter(|a| a.is_object()) {
            msg.push_str(&format!(
                "💪 总属性：攻击{} 防御{} 气血{}\n",
                display(&attrs["attack"]),
                display(&attrs["defense"]),
                display(&attrs["hp"])
            ));
        }
        if let Some(minutes) = state.get("totalCultivationTime").and_then(Value::as_u64) {
            if minutes > 0 {
                msg.push_str(&format!("⏰ 修炼时间：{}小时{}分钟\n", minutes / 60, minutes % 60));
            }
        }

        let version = [&self.migrated, &self.raw]
            .iter()
            .find_map(|v| v.get("version").and_then(Value::as_str))
            .unwrap_or("未知版本");
        msg.push_str(&format!("📋 版本：{}\n", version));

        if self.upgraded() {
            msg.push_str("\n⚠️ 此存档版本较旧，将自动升级为最新格式\n");
        }
        msg.push_str("\n❓ 确定要导入此存档吗？\n（当前进度将被覆盖）");
        msg
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => "undefined".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `炼气 前期 3重` when the realm index is known
fn realm_line(state: &Value, realms: &[Realm]) -> Option<String> {
    let realm = realms.get(state.get("realmIndex")?.as_u64()? as usize)?;
    let stage = state
        .get("stageIndex")
        .and_then(Value::as_u64)
        .and_then(|i| STAGES.get(i as usize))
        .unwrap_or(&STAGES[0]);
    let level = state.get("level").map(display).unwrap_or_else(|| "1".into());
    Some(format!("{} {} {}重", realm.name, stage, level))
}

/// Default-valued attributes the original file never mentioned
pub fn new_attribute_labels(state: &Value, raw: &Value) -> Vec<&'static str> {
    let original_state = cultivation_state(raw)
        .or_else(|| raw.get("state"))
        .unwrap_or(raw);
    let original_attrs = original_state.get("attributes");
    Attr::ALL
        .iter()
        .filter(|attr| {
            let current = state["attributes"][attr.key()].as_i64();
            let mentioned = original_attrs.is_some_and(|a| a.get(attr.key()).is_some());
            current == Some(attr.default_value()) && !mentioned
        })
        .map(|attr| attr.label())
        .collect()
}

/// Text shown after a successful import
pub fn welcome_message(plan: &ImportPlan, state: &Value, realms: &[Realm]) -> String {
    let mut msg = String::from("✨ 存档导入成功！\n\n");
    match state.get("characterName").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => {
            msg.push_str(&format!("🎉 欢迎回来，{}道友！\n", name))
        }
        _ => msg.push_str("🎉 欢迎回来，道友！\n"),
    }
    if let Some(line) = realm_line(state, realms) {
        msg.push_str(&format!("⚡ 当前境界：{}\n", line));
    }
    if plan.upgraded() {
        msg.push_str("\n🔄 存档已自动升级为最新格式\n");
        msg.push_str("💫 新功能已激活，继续您的修仙之路！\n");
    }
    let fresh = new_attribute_labels(state, &plan.raw);
    if !fresh.is_empty() {
        msg.push_str(&format!("\n🆕 新增属性已初始化：{}\n", fresh.join("、")));
    }
    msg.push_str("\n🚀 修仙之路，继续前行！");
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cultivation::data::CultivationData;
    use crate::persistence::PersistenceError;

    #[test]
    fn test_parse_pipeline_errors() {
        assert!(matches!(
            ImportPlan::parse("not json", 8),
            Err(PersistenceError::Parse(_))
        ));
        assert!(matches!(
            ImportPlan::parse(r#"{"hello":1}"#, 8),
            Err(PersistenceError::Unsupported)
        ));
        assert!(matches!(
            ImportPlan::parse(r#"{"realmIndex":99}"#, 8),
            Err(PersistenceError::Invalid(_))
        ));
    }

    #[test]
    fn test_confirmation_for_legacy_save() {
        let realms = CultivationData::bundled().realms;
        let text = r#"{"cultivation":{"state":{"realmIndex":1,"stageIndex":2,"level":4,
            "characterName":"青云子","totalCultivationTime":125,"attributes":{"attack":20}}}}"#;
        let plan = ImportPlan::parse(text, realms.len()).unwrap();
        let msg = plan.confirmation(&realms);
        assert!(msg.contains("仙号：青云子"));
        assert!(msg.contains(&format!("境界：{} 后期 4重", realms[1].name)));
        assert!(msg.contains("攻击20 防御8 气血100"));
        assert!(msg.contains("2小时5分钟"));
        assert!(msg.contains("版本：3.0.0"));
        assert!(!msg.contains("较旧"));
    }

    #[test]
    fn test_future_save_is_flagged_as_upgrade() {
        let text = r#"{"formatVersion":4,"version":"4.1.0",
            "cultivation":{"state":{"realmIndex":0,"attributes":{}}}}"#;
        let plan = ImportPlan::parse(text, 8).unwrap();
        assert!(plan.confirmation(&[]).contains("较旧"));
    }

    #[test]
    fn test_welcome_lists_new_attributes() {
        let realms = CultivationData::bundled().realms;
        let text = r#"{"cultivation":{"state":{"realmIndex":0,
            "attributes":{"attack":11,"defense":9,"hp":120,"mana":60,"spirit":31}}}}"#;
        let plan = ImportPlan::parse(text, realms.len()).unwrap();
        let state = plan.state().clone();
        let labels = new_attribute_labels(&state, &plan.raw);
        assert_eq!(labels, vec!["福缘", "悟性", "灵石"]);

        let msg = welcome_message(&plan, &state, &realms);
        assert!(msg.contains("欢迎回来，道友"));
        assert!(msg.contains("新增属性已初始化：福缘、悟性、灵石"));
    }
}
