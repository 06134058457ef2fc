//! Save format detection and migration
//!
//! Layouts seen in the wild:
//! - v3: `formatVersion: 3` envelope (current)
//! - v2: `version: "2.0"` with a `cultivation` block
//! - v1: `{cultivation: {state, appliedMinutes, logs}}` without version tags
//! - v0: a bare state object, `{state: ...}`, or a minimal record
//!
//! Everything older than v3 is rebuilt into a v3 envelope. Newer formats are
//! passed through as long as they still carry `cultivation.state`.

use serde_json::{Map, Value, json};

use super::envelope::{Compatibility, FORMAT_VERSION, Metadata, SaveEnvelope};
use super::{PersistenceError, PersistenceResult};
use crate::cultivation::state::{Attr, BASE_TRIBULATION_RATE};
use crate::platform::storage::parse_int_prefix;
use crate::platform::time::now_ms;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// Numeric `formatVersion` (v3 and later)
    New,
    V2,
    Legacy,
    Ancient,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveVersion {
    pub major: u64,
    pub format: SaveFormat,
}

impl SaveVersion {
    const fn new(major: u64, format: SaveFormat) -> Self {
        Self { major, format }
    }
}

/// JavaScript truthiness of an optional JSON value
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

/// `x || fallback` for JSON values
fn or_value<'a>(value: Option<&'a Value>, fallback: &'a Value) -> &'a Value {
    value.filter(|v| truthy(Some(*v))).unwrap_or(fallback)
}

/// `cultivation.state` when present and truthy
pub(crate) fn cultivation_state(raw: &Value) -> Option<&Value> {
    raw.get("cultivation")?
        .get("state")
        .filter(|v| truthy(Some(*v)))
}

pub fn detect_version(raw: &Value) -> SaveVersion {
    if let Some(major) = raw.get("formatVersion").and_then(Value::as_u64) {
        if major > 0 {
            return SaveVersion::new(major, SaveFormat::New);
        }
    }
    if raw.get("version").and_then(Value::as_str) == Some("2.0") {
        return SaveVersion::new(2, SaveFormat::V2);
    }
    if cultivation_state(raw).is_some() {
        return SaveVersion::new(1, SaveFormat::Legacy);
    }
    let has_realm = raw.get("realmIndex").is_some();
    if has_realm || truthy(raw.get("state")) {
        return SaveVersion::new(0, SaveFormat::Ancient);
    }
    SaveVersion::new(0, SaveFormat::Unknown)
}

/// Bring any supported layout up to a v3 envelope value
pub fn migrate(raw: &Value) -> PersistenceResult<Value> {
    let version = detect_version(raw);
    log::info!("Detected save version {:?}", version);

    match version.major {
        0 => generic_migration(raw),
        1 => migrate_from_v1(raw),
        2 => migrate_from_v2(raw),
        FORMAT_VERSION => Ok(raw.clone()),
        major => {
            log::info!("Save from future format v{}, trying forward compatibility", major);
            if cultivation_state(raw).is_some() {
                Ok(raw.clone())
            } else {
                Err(PersistenceError::Unsupported)
            }
        }
    }
}

/// `Math.max(min, parseInt(v) || default)`
fn lenient_int(value: Option<&Value>, default: i64, min: i64) -> i64 {
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => parse_int_prefix(s),
        _ => None,
    };
    parsed.filter(|n| *n != 0).unwrap_or(default).max(min)
}

/// Default attributes overlaid with every numeric attribute from the save
fn merged_attributes(original: Option<&Value>) -> Map<String, Value> {
    let mut merged: Map<String, Value> = Attr::ALL
        .iter()
        .map(|a| (a.key().to_string(), Value::from(a.default_value())))
        .collect();
    if let Some(Value::Object(attrs)) = original {
        for (key, value) in attrs {
            if value.is_number() {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}

fn default_tribulation() -> Value {
    json!({ "needed": false, "successRate": BASE_TRIBULATION_RATE, "failCount": 0 })
}

fn name_of(state: &Value) -> &str {
    state.get("characterName").and_then(Value::as_str).unwrap_or("")
}

fn rebuild_state(original: &Value) -> Value {
    let fallback_trib = default_tribulation();
    json!({
        "realmIndex": lenient_int(original.get("realmIndex"), 0, 0),
        "stageIndex": lenient_int(original.get("stageIndex"), 0, 0),
        "level": lenient_int(original.get("level"), 1, 1),
        "exp": lenient_int(original.get("exp"), 0, 0),
        "tribulation": or_value(original.get("tribulation"), &fallback_trib),
        "attributes": merged_attributes(original.get("attributes")),
        "totalCultivationTime": lenient_int(original.get("totalCultivationTime"), 0, 0),
        "characterName": name_of(original),
    })
}

fn logs_of(cultivation: &Value) -> Vec<String> {
    cultivation
        .get("logs")
        .and_then(Value::as_array)
        .map(|logs| {
            logs.iter()
                .filter_map(|l| l.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

fn rebuilt_envelope(
    original_state: &Value,
    cultivation: &Value,
    compatibility: Compatibility,
    description: &str,
) -> PersistenceResult<Value> {
    let name = match name_of(original_state) {
        "" => "道友",
        n => n,
    };
    let envelope = SaveEnvelope::wrap(
        rebuild_state(original_state),
        lenient_int(cultivation.get("appliedMinutes"), 0, 0) as u64,
        logs_of(cultivation),
        compatibility,
        Metadata::new(name, description),
        now_ms(),
    );
    Ok(serde_json::to_value(envelope)?)
}

fn migrate_from_v1(raw: &Value) -> PersistenceResult<Value> {
    let original_state = cultivation_state(raw).unwrap_or(raw);
    let cultivation = raw.get("cultivation").unwrap_or(&Value::Null);
    rebuilt_envelope(
        original_state,
        cultivation,
        Compatibility::new(&["基础修仙", "属性系统"], &["渡劫系统", "奇遇系统", "日志系统"]),
        "修仙系统存档文件 - 从V1迁移",
    )
}

fn migrate_from_v2(raw: &Value) -> PersistenceResult<Value> {
    let cultivation = or_value(raw.get("cultivation"), raw);
    let original_state = or_value(cultivation.get("state"), cultivation);
    rebuilt_envelope(
        original_state,
        cultivation,
        Compatibility::current(),
        "修仙系统存档文件 - 从V2迁移",
    )
}

/// Wrap a loose state into the v1 layout, then migrate that
fn wrap_v1(state: Value, raw: &Value) -> PersistenceResult<Value> {
    let empty = json!([]);
    let wrapped = json!({
        "cultivation": {
            "state": state,
            "appliedMinutes": or_value(raw.get("appliedMinutes"), &Value::from(0)),
            "logs": or_value(raw.get("logs"), &empty),
        }
    });
    migrate_from_v1(&wrapped)
}

fn generic_migration(raw: &Value) -> PersistenceResult<Value> {
    let Some(obj) = raw.as_object() else {
        return Err(PersistenceError::Unsupported);
    };

    if truthy(obj.get("cultivation")) {
        return migrate_from_v2(raw);
    }

    if obj.contains_key("realmIndex") || truthy(obj.get("attributes")) || obj.contains_key("level")
    {
        return wrap_v1(raw.clone(), raw);
    }

    if let Some(state) = obj.get("state").filter(|s| truthy(Some(*s))) {
        return wrap_v1(state.clone(), raw);
    }

    if truthy(obj.get("name")) || obj.contains_key("exp") || truthy(obj.get("characterName")) {
        log::info!("Migrating from a minimal record");
        let zero = Value::from(0);
        let one = Value::from(1);
        let name = or_value(obj.get("characterName"), or_value(obj.get("name"), &Value::Null));
        let minimal = json!({
            "realmIndex": or_value(obj.get("realmIndex"), &zero),
            "stageIndex": or_value(obj.get("stageIndex"), &zero),
            "level": or_value(obj.get("level"), &one),
            "exp": or_value(obj.get("exp"), &zero),
            "characterName": name.as_str().unwrap_or(""),
            "attributes": or_value(obj.get("attributes"), &Value::Null),
        });
        return wrap_v1(minimal, raw);
    }

    log::warn!(
        "Unrecognized save layout, keys: {:?}",
        obj.keys().collect::<Vec<_>>()
    );
    Err(PersistenceError::Unsupported)
}
