//! Save validation and state repair

use serde_json::{Map, Value};

use super::migration::{cultivation_state, truthy};
use super::{PersistenceError, PersistenceResult};
use crate::cultivation::state::{Attr, BASE_TRIBULATION_RATE, CultivationState, MAX_LEVEL};

/// Minimal structural check on a migrated envelope
pub fn validate(envelope: &Value, realm_count: usize) -> PersistenceResult<()> {
    let state = cultivation_state(envelope)
        .ok_or_else(|| PersistenceError::Invalid("missing cultivation.state".into()))?;

    let realm = state
        .get("realmIndex")
        .and_then(Value::as_f64)
        .ok_or_else(|| PersistenceError::Invalid("realmIndex is not a number".into()))?;
    if realm < 0.0 || realm >= realm_count as f64 {
        return Err(PersistenceError::Invalid(format!(
            "realmIndex {} outside 0..{}",
            realm, realm_count
        )));
    }

    if !state.get("attributes").is_some_and(Value::is_object) {
        return Err(PersistenceError::Invalid("attributes missing".into()));
    }
    Ok(())
}

fn non_negative_int(value: &Value, min: i64) -> bool {
    value.as_i64().is_some_and(|n| n >= min)
}

/// Whether a save value may replace the template value for `key`
fn is_valid_value(key: &str, value: &Value) -> bool {
    match key {
        "realmIndex" | "stageIndex" | "exp" | "totalCultivationTime" => non_negative_int(value, 0),
        "level" => non_negative_int(value, 1),
        "characterName" => value.is_string(),
        _ => !value.is_null(),
    }
}

/// Known attributes keep valid non-negative numbers; unknown numeric ones
/// are carried along for newer versions.
fn complete_attributes(template: &Map<String, Value>, source: &Value) -> Map<String, Value> {
    let mut completed = template.clone();
    let Some(source) = source.as_object() else {
        return completed;
    };
    for (key, value) in source {
        let Some(n) = value.as_f64() else { continue };
        if completed.contains_key(key) {
            if n >= 0.0 {
                completed.insert(key.clone(), value.clone());
            }
        } else {
            log::debug!("Keeping unknown attribute {} = {}", key, value);
            completed.insert(key.clone(), value.clone());
        }
    }
    completed
}

/// Overlay a saved state on the default template
fn complete_state(source: &Value) -> PersistenceResult<Map<String, Value>> {
    let Value::Object(mut completed) = serde_json::to_value(CultivationState::default())? else {
        return Err(PersistenceError::Load("default state is not an object".into()));
    };
    let Some(source) = source.as_object() else {
        return Ok(completed);
    };

    for (key, value) in source {
        match key.as_str() {
            "attributes" => {
                let template = completed
                    .get("attributes")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                completed.insert(key.clone(), Value::Object(complete_attributes(&template, value)));
            }
            "tribulation" => {
                let mut merged = completed
                    .get("tribulation")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                if let Some(overrides) = value.as_object() {
                    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                completed.insert(key.clone(), Value::Object(merged));
            }
            _ if completed.contains_key(key) => {
                if is_valid_value(key, value) {
                    completed.insert(key.clone(), value.clone());
                }
            }
            _ => {
                log::debug!("Keeping unknown state field {}", key);
                completed.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(completed)
}

fn clamp_index(state: &mut Map<String, Value>, key: &str, count: usize) {
    let last = count.saturating_sub(1) as u64;
    if let Some(index) = state.get(key).and_then(Value::as_u64) {
        if index > last {
            log::warn!("Repairing {}: {} -> {}", key, index, last);
            state.insert(key.to_string(), Value::from(last));
        }
    }
}

fn repair_tribulation(trib: &mut Map<String, Value>) {
    let rate = trib
        .get("successRate")
        .and_then(Value::as_f64)
        .filter(|r| *r != 0.0 && r.is_finite())
        .unwrap_or(BASE_TRIBULATION_RATE)
        .clamp(0.0, 1.0);
    trib.insert("successRate".into(), Value::from(rate));

    let fails = match trib.get("failCount") {
        Some(Value::Number(n)) => n.as_f64().map(|f| f.trunc()).unwrap_or(0.0),
        Some(Value::String(s)) => crate::platform::storage::parse_int_prefix(s).unwrap_or(0) as f64,
        _ => 0.0,
    };
    trib.insert("failCount".into(), Value::from(fails.clamp(0.0, u32::MAX as f64) as u32));

    let needed = truthy(trib.get("needed"));
    trib.insert("needed".into(), Value::Bool(needed));
}

/// Attributes become integers (known keys) and never negative
fn repair_attributes(attrs: &mut Map<String, Value>) {
    for (key, value) in attrs.iter_mut() {
        let Some(n) = value.as_f64() else { continue };
        let n = if n < 0.0 {
            log::warn!("Repairing negative attribute {}: {} -> 0", key, n);
            0.0
        } else {
            n
        };
        *value = if Attr::from_key(key).is_some() || n.fract() == 0.0 {
            Value::from(n.trunc() as i64)
        } else {
            Value::from(n)
        };
    }
}

/// Smart completion plus boundary checks
///
/// The result always deserializes into [`CultivationState`].
pub fn repair_state(
    source: &Value,
    realm_count: usize,
    stage_count: usize,
) -> PersistenceResult<Value> {
    let mut state = complete_state(source)?;

    clamp_index(&mut state, "realmIndex", realm_count);
    clamp_index(&mut state, "stageIndex", stage_count);
    if let Some(level) = state.get("level").and_then(Value::as_u64) {
        if level > MAX_LEVEL as u64 {
            state.insert("level".into(), Value::from(MAX_LEVEL));
        }
    }
    if let Some(Value::Object(trib)) = state.get_mut("tribulation") {
        repair_tribulation(trib);
    }
    if let Some(Value::Object(attrs)) = state.get_mut("attributes") {
        repair_attributes(attrs);
    }
    Ok(Value::Object(state))
}

/// Repair and decode a saved state
pub fn load_state(
    source: &Value,
    realm_count: usize,
    stage_count: usize,
) -> PersistenceResult<CultivationState> {
    let repaired = repair_state(source, realm_count, stage_count)?;
    serde_json::from_value(repaired).map_err(|e| PersistenceError::Load(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate() {
        let ok = json!({"cultivation": {"state": {"realmIndex": 1, "attributes": {}}}});
        assert!(validate(&ok, 8).is_ok());
        assert!(validate(&ok, 1).is_err());

        let no_attrs = json!({"cultivation": {"state": {"realmIndex": 0}}});
        assert!(validate(&no_attrs, 8).is_err());

        let text_realm = json!({"cultivation": {"state": {"realmIndex": "0", "attributes": {}}}});
        assert!(validate(&text_realm, 8).is_err());
        assert!(validate(&json!({}), 8).is_err());
    }

    #[test]
    fn test_repair_clamps_and_completes() {
        let source = json!({
            "realmIndex": 42,
            "stageIndex": 9,
            "level": 3.5,
            "exp": -1,
            "tribulation": {"successRate": 4.0, "failCount": "2", "needed": 1},
            "attributes": {"attack": -5, "luck": 12, "charm": 1.5, "bogus": "x"},
            "sect": "青云门"
        });
        let state = load_state(&source, 8, 3).unwrap();
        assert_eq!(state.realm_index, 7);
        assert_eq!(state.stage_index, 2);
        assert_eq!(state.level, 1);
        assert_eq!(state.exp, 0);
        assert_eq!(state.tribulation.success_rate, 1.0);
        assert_eq!(state.tribulation.fail_count, 2);
        assert!(state.tribulation.needed);
        assert_eq!(state.attributes.attack, 10);
        assert_eq!(state.attributes.luck, 12);
        assert_eq!(state.attributes.value_of("charm"), Some(1.5));
        assert!(!state.attributes.extra.contains_key("bogus"));
        assert_eq!(state.extra.get("sect"), Some(&json!("青云门")));
    }

    #[test]
    fn test_repair_non_object_yields_defaults() {
        let state = load_state(&json!(null), 8, 3).unwrap();
        assert_eq!(state, CultivationState::default());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn repaired_states_stay_in_range(
                realm in -5i64..50,
                stage in -5i64..10,
                level in -5i64..30,
                rate in -2.0f64..3.0,
                attack in -100i64..100,
                realm_count in 1usize..10,
            ) {
                let source = json!({
                    "realmIndex": realm,
                    "stageIndex": stage,
                    "level": level,
                    "tribulation": {"successRate": rate},
                    "attributes": {"attack": attack},
                });
                let state = load_state(&source, realm_count, 3).unwrap();
                prop_assert!(state.realm_index < realm_count);
                prop_assert!(state.stage_index < 3);
                prop_assert!((1..=MAX_LEVEL).contains(&state.level));
                prop_assert!((0.0..=1.0).contains(&state.tribulation.success_rate));
                prop_assert!(state.attributes.attack >= 0);
            }
        }
    }
}
