//! Cultivation data tables (realms, log templates, adventures)
//!
//! Tables are plain CSV files served next to the blog (`/js/data/*.csv`).
//! The same files are compiled into the crate as a fallback, and a tiny
//! hard-coded table backs that up in case a bundled file is ever emptied.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::state::STAGES;

/// One parsed CSV row keyed by header
pub type Row = Map<String, Value>;

pub const REALMS_FILE: &str = "realms.csv";
pub const LOGS_FILE: &str = "cultivation_logs.csv";
pub const ADVENTURES_FILE: &str = "adventures.csv";

/// Where the blog serves its data tables
pub const DEFAULT_BASE_URL: &str = "/js/data/";

/// Log line used when no template is available
pub const DEFAULT_LOG_CONTENT: &str = "静心调息，真元缓缓流转。";

const BUNDLED_REALMS: &str = include_str!("../../data/realms.csv");
const BUNDLED_LOGS: &str = include_str!("../../data/cultivation_logs.csv");
const BUNDLED_ADVENTURES: &str = include_str!("../../data/adventures.csv");

/// Reward columns accepted when an adventure has no JSON rewards
const REWARD_COLUMNS: [&str; 9] = [
    "exp",
    "attack",
    "defense",
    "hp",
    "mana",
    "spirit",
    "luck",
    "comprehension",
    "spiritualStone",
];

// === CSV ===

/// Parse CSV text with a header line into rows
///
/// Quoted fields may contain commas; `""` inside quotes is a literal quote.
/// Cells that look like JSON objects/arrays are decoded, numeric cells become
/// numbers, and rows shorter than the header are dropped.
pub fn parse_csv(text: &str) -> Vec<Row> {
    let mut lines = text.trim().lines();
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = header_line
        .split(',')
        .map(|h| h.trim().replace('"', ""))
        .collect();

    let mut rows = Vec::new();
    for line in lines {
        let values = parse_csv_line(line);
        if values.len() < headers.len() {
            continue;
        }
        let row: Row = headers
            .iter()
            .zip(values)
            .map(|(header, raw)| (header.clone(), cell_value(raw)))
            .collect();
        rows.push(row);
    }
    rows
}

/// Split one CSV line into trimmed fields
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                values.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    values.push(current.trim().to_string());
    values
}

fn cell_value(raw: String) -> Value {
    if raw.starts_with('{') || raw.starts_with('[') {
        return serde_json::from_str(&raw).unwrap_or(Value::String(raw));
    }
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => number_value(n),
        _ => Value::String(raw),
    }
}

/// Integral floats become JSON integers so `1` stays `1`
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Serialize rows back to CSV
///
/// `headers` defaults to the keys of the first row.
pub fn to_csv(rows: &[Row], headers: Option<&[&str]>) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };
    let headers: Vec<String> = match headers {
        Some(h) => h.iter().map(|s| s.to_string()).collect(),
        None => first.keys().cloned().collect(),
    };

    let mut csv = headers.join(",");
    csv.push('\n');
    for row in rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| escape_cell(row.get(h)))
            .collect();
        csv.push_str(&cells.join(","));
        csv.push('\n');
    }
    csv
}

fn escape_cell(value: Option<&Value>) -> String {
    let text = match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
    };
    if text.contains([',', '"', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text
    }
}

// === Field helpers ===

/// Numeric cell with a default (numbers pass through, strings are parsed)
pub fn numeric_field(value: Option<&Value>, default: f64) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
        Some(Value::String(s)) => parse_float_prefix(s).unwrap_or(default),
        _ => default,
    }
}

/// Like `parseFloat`: the longest numeric prefix, ignoring leading spaces
fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let mut end = 0;
    for (i, _) in s.char_indices().skip(1).chain(std::iter::once((s.len(), ' '))) {
        if s[..i].parse::<f64>().is_ok() {
            end = i;
        }
    }
    if end == 0 { None } else { s[..end].parse().ok() }
}

fn text_field(row: &Row, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_text(row: &Row, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| text_field(row, k))
}

/// Optional numeric column; blank cells count as absent
fn optional_numeric(row: &Row, key: &str) -> Option<f64> {
    match row.get(key)? {
        Value::String(s) if s.trim().is_empty() => None,
        v => Some(numeric_field(Some(v), 0.0)),
    }
}

/// Array cell: JSON array or comma-separated list
pub fn array_field(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) => match serde_json::from_str::<Vec<Value>>(s) {
            Ok(items) => array_field(Some(&Value::Array(items))),
            Err(_) => s
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
        },
        _ => Vec::new(),
    }
}

fn rewards_from_value(value: &Value) -> Option<BTreeMap<String, f64>> {
    let object = match value {
        Value::Object(map) => map.clone(),
        Value::String(s) => match serde_json::from_str::<Map<String, Value>>(s) {
            Ok(map) => map,
            Err(_) => {
                log::warn!("Unparseable rewards cell: {}", s);
                return None;
            }
        },
        _ => return None,
    };
    Some(
        object
            .iter()
            .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
            .collect(),
    )
}

// === Tables ===

/// A major cultivation realm
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Realm {
    pub name: String,
    pub desc: String,
    /// Message shown when breaking through into this realm
    pub breakthrough: String,
}

impl Realm {
    pub fn from_row(row: &Row) -> Self {
        Self {
            name: text_field(row, "name").unwrap_or_default(),
            desc: text_field(row, "desc").unwrap_or_default(),
            breakthrough: text_field(row, "breakthrough").unwrap_or_default(),
        }
    }
}

/// Flavor text for a cultivation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogTemplate {
    pub content: String,
    pub weight: f64,
}

impl LogTemplate {
    pub fn from_row(row: &Row) -> Self {
        Self {
            content: first_text(row, &["content", "template", "text"])
                .unwrap_or_else(|| DEFAULT_LOG_CONTENT.to_string()),
            weight: numeric_field(row.get("weight"), 1.0),
        }
    }
}

/// A random encounter with rewards
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adventure {
    pub id: String,
    /// `rare`, `cultivation`, `combat`, ... (affects weighting)
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub desc: String,
    pub weight: f64,
    /// `exp` or attribute key -> amount
    pub rewards: BTreeMap<String, f64>,
    /// Comma-separated conditions such as `level>=5,luck>10`
    pub conditions: String,
    pub min_level: Option<f64>,
    pub min_realm: Option<f64>,
    pub min_stage: Option<f64>,
    pub rarity: Option<String>,
    pub cooldown: Option<f64>,
    pub trigger_rate: Option<f64>,
    pub base_rate: Option<f64>,
    pub tags: Vec<String>,
    pub category: Option<String>,
}

impl Adventure {
    pub fn from_row(row: &Row) -> Self {
        let name = text_field(row, "name").unwrap_or_else(|| "未知奇遇".to_string());
        Self {
            id: text_field(row, "id").unwrap_or_else(|| name.clone()),
            kind: text_field(row, "type").unwrap_or_else(|| "misc".to_string()),
            desc: first_text(row, &["desc", "description"]).unwrap_or_default(),
            weight: numeric_field(row.get("weight"), 1.0),
            rewards: Self::parse_rewards(row),
            conditions: first_text(row, &["conditions", "condition", "requirements"])
                .unwrap_or_default(),
            min_level: optional_numeric(row, "minLevel"),
            min_realm: optional_numeric(row, "minRealm"),
            min_stage: optional_numeric(row, "minStage"),
            rarity: text_field(row, "rarity"),
            cooldown: optional_numeric(row, "cooldown"),
            trigger_rate: optional_numeric(row, "triggerRate"),
            base_rate: optional_numeric(row, "baseRate"),
            tags: array_field(row.get("tags")),
            category: text_field(row, "category"),
            name,
        }
    }

    /// `rewards_json`, then `rewards`, then individual reward columns
    fn parse_rewards(row: &Row) -> BTreeMap<String, f64> {
        for key in ["rewards_json", "rewards"] {
            if let Some(value) = row.get(key) {
                if let Some(rewards) = rewards_from_value(value) {
                    return rewards;
                }
            }
        }

        REWARD_COLUMNS
            .iter()
            .filter_map(|col| {
                let value = row.get(*col)?;
                if matches!(value, Value::String(s) if s.is_empty()) {
                    return None;
                }
                let n = numeric_field(Some(value), 0.0);
                (n != 0.0).then(|| (col.to_string(), n))
            })
            .collect()
    }
}

/// Everything the cultivation game reads from data files
#[derive(Debug, Clone, PartialEq)]
pub struct CultivationData {
    pub realms: Vec<Realm>,
    pub logs: Vec<LogTemplate>,
    pub adventures: Vec<Adventure>,
    pub stages: Vec<String>,
}

impl CultivationData {
    /// Build tables from parsed rows, falling back per table when empty
    pub fn from_rows(realms: &[Row], logs: &[Row], adventures: &[Row]) -> Self {
        let fallback = Self::hardcoded();
        let realms: Vec<Realm> = realms.iter().map(Realm::from_row).collect();
        let logs: Vec<LogTemplate> = logs.iter().map(LogTemplate::from_row).collect();
        let adventures: Vec<Adventure> = adventures.iter().map(Adventure::from_row).collect();
        Self {
            realms: if realms.is_empty() { fallback.realms } else { realms },
            logs: if logs.is_empty() { fallback.logs } else { logs },
            adventures: if adventures.is_empty() {
                fallback.adventures
            } else {
                adventures
            },
            stages: fallback.stages,
        }
    }

    /// Tables compiled into the crate
    pub fn bundled() -> Self {
        Self::from_rows(
            &parse_csv(BUNDLED_REALMS),
            &parse_csv(BUNDLED_LOGS),
            &parse_csv(BUNDLED_ADVENTURES),
        )
    }

    /// Last-resort tables
    pub fn hardcoded() -> Self {
        Self {
            realms: vec![
                Realm {
                    name: "炼气".into(),
                    desc: "凡胎肉体，初窥仙途。".into(),
                    breakthrough: "灵气汇聚丹田，真元初生！".into(),
                },
                Realm {
                    name: "筑基".into(),
                    desc: "筑道基，固根本。".into(),
                    breakthrough: "天地共鸣，道基成型！".into(),
                },
            ],
            logs: vec![
                LogTemplate {
                    content: DEFAULT_LOG_CONTENT.into(),
                    weight: 1.0,
                },
                LogTemplate {
                    content: "感悟天地灵气，心境渐趋空明。".into(),
                    weight: 1.0,
                },
            ],
            adventures: vec![Adventure {
                id: "0".into(),
                kind: "treasure".into(),
                name: "发现灵草".into(),
                desc: "发现珍贵灵草。".into(),
                weight: 1.0,
                rewards: BTreeMap::from([("hp".to_string(), 30.0), ("mana".to_string(), 10.0)]),
                ..Default::default()
            }],
            stages: STAGES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn last_realm_index(&self) -> usize {
        self.realms.len().saturating_sub(1)
    }
}

/// Loads and caches data tables
///
/// In the browser the tables are fetched from `base_url`; on native builds
/// (and whenever a fetch fails) the bundled copies are used.
#[derive(Debug, Clone)]
pub struct DataManager {
    base_url: String,
    cache: HashMap<String, Vec<Row>>,
}

impl Default for DataManager {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl DataManager {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            cache: HashMap::new(),
        }
    }

    pub fn url_for(&self, file: &str) -> String {
        format!("{}{}", self.base_url, file)
    }

    /// Parse `text` and cache it under `file`
    pub fn insert(&mut self, file: &str, text: &str) -> &[Row] {
        let rows = parse_csv(text);
        self.cache.entry(file.to_string()).insert_entry(rows).into_mut()
    }

    pub fn cached(&self, file: &str) -> Option<&[Row]> {
        self.cache.get(file).map(Vec::as_slice)
    }

    /// Drop one cached file so the next load fetches it again
    pub fn invalidate(&mut self, file: &str) {
        self.cache.remove(file);
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Bundled copy of a table file
    pub fn bundled_text(file: &str) -> &'static str {
        match file {
            REALMS_FILE => BUNDLED_REALMS,
            LOGS_FILE => BUNDLED_LOGS,
            ADVENTURES_FILE => BUNDLED_ADVENTURES,
            _ => "",
        }
    }

    /// Build game data from whatever is cached, bundled copies for the rest
    pub fn assemble(&mut self) -> CultivationData {
        for file in [REALMS_FILE, LOGS_FILE, ADVENTURES_FILE] {
            if self.cached(file).is_none_or(|rows| rows.is_empty()) {
                self.insert(file, Self::bundled_text(file));
            }
        }
        let rows = |f: &str| self.cached(f).unwrap_or(&[]);
        CultivationData::from_rows(rows(REALMS_FILE), rows(LOGS_FILE), rows(ADVENTURES_FILE))
    }

    /// Fetch one CSV file (cached)
    #[cfg(target_arch = "wasm32")]
    pub async fn load_csv(&mut self, file: &str) -> Vec<Row> {
        if let Some(rows) = self.cached(file) {
            return rows.to_vec();
        }
        match crate::platform::fetch_text(&self.url_for(file)).await {
            Ok(text) => self.insert(file, &text).to_vec(),
            Err(e) => {
                log::warn!("Failed to load {}: {:?}", file, e);
                Vec::new()
            }
        }
    }

    /// Fetch all tables, falling back to bundled data per table
    #[cfg(target_arch = "wasm32")]
    pub async fn load_all(&mut self) -> CultivationData {
        for file in [REALMS_FILE, LOGS_FILE, ADVENTURES_FILE] {
            self.load_csv(file).await;
        }
        let data = self.assemble();
        log::info!(
            "Cultivation data ready: {} realms, {} log templates, {} adventures",
            data.realms.len(),
            data.logs.len(),
            data.adventures.len()
        );
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_handles_quotes_and_json() {
        let text = "id,name,rewards_json\n0,\"灵草, 上品\",\"{\"\"hp\"\":30}\"\n";
        let rows = parse_csv(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], 0);
        assert_eq!(rows[0]["name"], "灵草, 上品");
        assert_eq!(rows[0]["rewards_json"]["hp"], 30);
    }

    #[test]
    fn test_short_rows_are_dropped() {
        let rows = parse_csv("a,b,c\n1,2\n1,2,3\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["c"], 3);
    }

    #[test]
    fn test_header_only_yields_nothing() {
        assert!(parse_csv("a,b").is_empty());
        assert!(parse_csv("").is_empty());
    }

    #[test]
    fn test_to_csv_quotes_special_cells() {
        let rows = parse_csv("name,desc\nx,\"a, b\"\n");
        let csv = to_csv(&rows, None);
        assert_eq!(csv, "name,desc\nx,\"a, b\"\n");
        assert_eq!(parse_csv(&csv), rows);
    }

    #[test]
    fn test_to_csv_keeps_first_row_column_order() {
        let rows = parse_csv("zeta,alpha,mid\n1,2,3\n");
        assert_eq!(to_csv(&rows, None), "zeta,alpha,mid\n1,2,3\n");
    }

    #[test]
    fn test_to_csv_with_explicit_headers() {
        let rows = parse_csv("id,name,weight\n0,灵草,5\n1,妖兽,2\n");
        let csv = to_csv(&rows, Some(&["name", "id", "missing"]));
        assert_eq!(csv, "name,id,missing\n灵草,0,\n妖兽,1,\n");
    }

    #[test]
    fn test_to_csv_writes_json_cells_quoted() {
        let rows = parse_csv("id,rewards_json\n0,\"{\"\"hp\"\":30}\"\n");
        assert_eq!(rows[0]["rewards_json"]["hp"], 30);
        let csv = to_csv(&rows, None);
        assert_eq!(csv, "id,rewards_json\n0,\"{\"\"hp\"\":30}\"\n");
        assert_eq!(parse_csv(&csv), rows);
    }

    #[test]
    fn test_to_csv_quotes_newline_cells() {
        let mut row = Row::new();
        row.insert("id".into(), Value::from(7));
        row.insert("text".into(), Value::from("第一行\n第二行"));
        assert_eq!(to_csv(&[row], None), "id,text\n7,\"第一行\n第二行\"\n");
    }

    #[test]
    fn test_adventure_reward_fallbacks() {
        let rows = parse_csv("name,type,exp,attack,luck\n奇遇,combat,10,0,2\n");
        let adv = Adventure::from_row(&rows[0]);
        assert_eq!(adv.kind, "combat");
        assert_eq!(adv.rewards.get("exp"), Some(&10.0));
        assert_eq!(adv.rewards.get("attack"), None);
        assert_eq!(adv.rewards.get("luck"), Some(&2.0));
        assert_eq!(adv.id, "奇遇");
    }

    #[test]
    fn test_log_template_defaults() {
        let rows = parse_csv("id,text\n0,打坐\n");
        let log = LogTemplate::from_row(&rows[0]);
        assert_eq!(log.content, "打坐");
        assert_eq!(log.weight, 1.0);
    }

    #[test]
    fn test_array_field_formats() {
        assert_eq!(array_field(Some(&Value::from("a, b,,c"))), vec!["a", "b", "c"]);
        assert_eq!(array_field(Some(&Value::from(r#"["x","y"]"#))), vec!["x", "y"]);
        assert!(array_field(None).is_empty());
    }

    #[test]
    fn test_numeric_field_parses_prefixes() {
        assert_eq!(numeric_field(Some(&Value::from("2.5x")), 1.0), 2.5);
        assert_eq!(numeric_field(Some(&Value::from("abc")), 1.0), 1.0);
        assert_eq!(numeric_field(None, 3.0), 3.0);
    }

    #[test]
    fn test_bundled_tables_load() {
        let data = CultivationData::bundled();
        assert!(data.realms.len() >= 2);
        assert_eq!(data.realms[0].name, "炼气");
        assert!(!data.logs.is_empty());
        assert!(data.adventures.iter().any(|a| a.kind == "rare"));
        assert_eq!(data.stages, vec!["前期", "中期", "后期"]);
    }

    #[test]
    fn test_empty_tables_fall_back_individually() {
        let realms = parse_csv("id,name,desc,breakthrough\n0,凡人,desc,msg\n");
        let data = CultivationData::from_rows(&realms, &[], &[]);
        assert_eq!(data.realms.len(), 1);
        assert_eq!(data.logs, CultivationData::hardcoded().logs);
        assert_eq!(data.adventures.len(), 1);
    }

    #[test]
    fn test_data_manager_cache() {
        let mut manager = DataManager::default();
        assert_eq!(manager.url_for(REALMS_FILE), "/js/data/realms.csv");
        manager.insert(REALMS_FILE, "id,name,desc,breakthrough\n0,a,b,c\n");
        let data = manager.assemble();
        assert_eq!(data.realms.len(), 1);
        manager.invalidate(REALMS_FILE);
        assert!(manager.cached(REALMS_FILE).is_none());
    }
}
