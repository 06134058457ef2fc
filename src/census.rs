//! Blog statistics dashboard
//!
//! Analyses the blog's `/content.json` export and builds ECharts option
//! objects for the census page. Visits are counted locally per browser.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::platform::KeyValueStore;
use crate::platform::time::{CivilDate, MS_PER_DAY, local_date, parse_timestamp_ms};

pub const CONTENT_URL: &str = "/content.json";
pub const VISIT_KEY: &str = "visitData";
/// Build date when no post carries a usable date
pub const DEFAULT_BUILD_DATE: CivilDate = CivilDate {
    year: 2023,
    month: 8,
    day: 1,
};
/// Days in the visit trend
pub const TREND_DAYS: i64 = 7;
/// Plugins listed in the tech stack chart
pub const PLUGINS: [&str; 10] = [
    "hexo-butterfly-tag-plugins-plus",
    "hexo-butterfly-swiper",
    "hexo-filter-gitcalendar",
    "hexo-magnet-fomal",
    "hexo-wordcount",
    "hexo-blog-encrypt",
    "hexo-algoliasearch",
    "hexo-deployer-git",
    "hexo-generator-sitemap",
    "hexo-generator-feed",
];
const ACCENT: &str = "#4ECDC4";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Named {
    #[serde(default)]
    pub name: String,
}

/// One entry of `content.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Post {
    pub title: Option<String>,
    pub date: Option<String>,
    pub text: Option<String>,
    pub tags: Vec<Named>,
    pub categories: Vec<Named>,
}

/// Posts from the raw JSON; anything but an array is no posts
pub fn posts_from_value(value: Value) -> Vec<Post> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(post) => Some(post),
                Err(e) => {
                    log::warn!("Skipping malformed post: {}", e);
                    None
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    pub posts_count: usize,
    pub tags_count: usize,
    pub categories_count: usize,
    /// Characters of post text (UTF-16 units, as the blog counts them)
    pub words_count: usize,
    /// Earliest post timestamp (ms)
    pub oldest_post_ms: Option<f64>,
    pub tag_stats: BTreeMap<String, usize>,
    pub category_stats: BTreeMap<String, usize>,
    /// `YYYY-MM-DD` (UTC) -> posts
    pub posts_by_date: BTreeMap<String, usize>,
    /// `YYYY-MM` (UTC) -> posts
    pub posts_by_month: BTreeMap<String, usize>,
}

pub fn analyze(posts: &[Post]) -> Analysis {
    let mut analysis = Analysis {
        posts_count: posts.len(),
        ..Default::default()
    };
    let mut tags = BTreeSet::new();
    let mut categories = BTreeSet::new();

    for post in posts {
        match post.date.as_deref().and_then(parse_timestamp_ms) {
            Some(ms) => {
                let day = CivilDate::from_ms_utc(ms);
                *analysis.posts_by_date.entry(day.iso()).or_default() += 1;
                *analysis.posts_by_month.entry(day.iso_month()).or_default() += 1;
                if analysis.oldest_post_ms.is_none_or(|oldest| ms < oldest) {
                    analysis.oldest_post_ms = Some(ms);
                }
            }
            None => log::debug!("Post without a usable date: {:?}", post.title),
        }

        if let Some(text) = &post.text {
            analysis.words_count += text.encode_utf16().count();
        }
        for tag in &post.tags {
            tags.insert(tag.name.clone());
            *analysis.tag_stats.entry(tag.name.clone()).or_default() += 1;
        }
        for category in &post.categories {
            categories.insert(category.name.clone());
            *analysis
                .category_stats
                .entry(category.name.clone())
                .or_default() += 1;
        }
    }

    analysis.tags_count = tags.len();
    analysis.categories_count = categories.len();
    analysis
}

impl Analysis {
    fn build_ms(&self) -> f64 {
        self.oldest_post_ms
            .unwrap_or_else(|| DEFAULT_BUILD_DATE.to_ms_utc())
    }
}

/// Numbers on the site info cards
#[derive(Debug, Clone, PartialEq)]
pub struct SiteInfo {
    pub run_days: i64,
    pub posts: usize,
    pub tags: usize,
    pub categories: usize,
    /// e.g. `12.3k`
    pub words: String,
}

impl SiteInfo {
    pub fn new(analysis: &Analysis, now_ms: f64) -> Self {
        Self {
            run_days: ((now_ms - analysis.build_ms()) / MS_PER_DAY).floor() as i64,
            posts: analysis.posts_count,
            tags: analysis.tags_count,
            categories: analysis.categories_count,
            words: format!("{:.1}k", analysis.words_count as f64 / 1000.0),
        }
    }

    /// `(icon, value, label)` per card
    pub fn cards(&self) -> [(&'static str, String, &'static str); 5] {
        [
            ("📅", self.run_days.to_string(), "运行天数"),
            ("📝", self.posts.to_string(), "文章总数"),
            ("🏷️", self.tags.to_string(), "标签数量"),
            ("📚", self.categories.to_string(), "分类数量"),
            ("✍️", self.words.clone(), "总字数"),
        ]
    }
}

/// `[date, count]` for every day from the first post through today
pub fn heatmap_data(analysis: &Analysis, now_ms: f64) -> Vec<(String, usize)> {
    let first = CivilDate::from_ms_utc(analysis.build_ms());
    let today = CivilDate::from_ms_utc(now_ms);
    (0..=first.days_until(today))
        .map(|offset| {
            let day = first.add_days(offset).iso();
            let count = analysis.posts_by_date.get(&day).copied().unwrap_or(0);
            (day, count)
        })
        .collect()
}

/// Locally counted page views
#[derive(Debug, Clone, PartialEq)]
pub struct VisitStats {
    pub total: u64,
    pub today: u64,
    /// `(8月1日, visits)`, oldest first
    pub trend: Vec<(String, u64)>,
}

/// Count this page view and summarise the log
pub fn record_visit(store: &dyn KeyValueStore, now_ms: f64) -> VisitStats {
    let mut visits: BTreeMap<String, u64> = store
        .get(VISIT_KEY)
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();

    let today = local_date(now_ms);
    *visits.entry(today.date_string()).or_default() += 1;
    match serde_json::to_string(&visits) {
        Ok(json) => store.set(VISIT_KEY, &json),
        Err(e) => log::error!("Failed to encode visit log: {}", e),
    }

    let trend = (0..TREND_DAYS)
        .rev()
        .map(|back| {
            let day = today.add_days(-back);
            let count = visits.get(&day.date_string()).copied().unwrap_or(0);
            (day.zh_month_day(), count)
        })
        .collect();

    VisitStats {
        total: visits.values().sum(),
        today: visits.get(&today.date_string()).copied().unwrap_or(0),
        trend,
    }
}

/// Page theme, read from `data-theme` on the root element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn from_attr(attr: Option<&str>) -> Self {
        if attr == Some("light") {
            Theme::Light
        } else {
            Theme::Dark
        }
    }

    pub fn text_color(self) -> &'static str {
        match self {
            Theme::Light => "#4c4948",
            Theme::Dark => "rgba(255,255,255,0.7)",
        }
    }
}

fn title(text: &str, theme: Theme) -> Value {
    json!({ "text": text, "x": "center", "textStyle": { "color": theme.text_color() } })
}

fn shadow_emphasis() -> Value {
    json!({
        "itemStyle": {
            "shadowBlur": 10,
            "shadowOffsetX": 0,
            "shadowColor": "rgba(0, 0, 0, 0.5)"
        }
    })
}

pub fn tech_stack_option(theme: Theme) -> Value {
    json!({
        "title": title("技术栈组成🛠️", theme),
        "tooltip": { "trigger": "item", "formatter": "{b}: {c} ({d}%)" },
        "legend": { "bottom": "5%", "textStyle": { "color": theme.text_color() } },
        "series": [{
            "type": "pie",
            "radius": ["40%", "70%"],
            "center": ["50%", "45%"],
            "data": [
                { "value": 1, "name": "Hexo核心" },
                { "value": 1, "name": "Butterfly主题" },
                { "value": PLUGINS.len(), "name": "功能插件" },
                { "value": 3, "name": "自定义功能" }
            ],
            "itemStyle": { "borderRadius": 10, "borderColor": "#fff", "borderWidth": 2 },
            "emphasis": shadow_emphasis()
        }]
    })
}

/// Calendar heatmap spanning the months of `data`
pub fn heatmap_option(theme: Theme, data: &[(String, usize)]) -> Value {
    let month = |d: Option<&(String, usize)>| d.map(|(day, _)| day[..7].to_string());
    let first = month(data.first()).unwrap_or_else(|| DEFAULT_BUILD_DATE.iso_month());
    let last = month(data.last()).unwrap_or_else(|| first.clone());
    let color = theme.text_color();

    json!({
        "title": title("内容发布活跃度📈", theme),
        "tooltip": { "formatter": "{c} 篇文章" },
        "visualMap": {
            "min": 0,
            "max": 3,
            "type": "piecewise",
            "orient": "horizontal",
            "left": "center",
            "bottom": "10%",
            "pieces": [
                { "min": 0, "max": 0, "color": "#ebedf0" },
                { "min": 1, "max": 1, "color": "#c6e48b" },
                { "min": 2, "max": 2, "color": "#7bc96f" },
                { "min": 3, "max": 10, "color": "#239a3b" }
            ],
            "textStyle": { "color": color }
        },
        "calendar": {
            "top": 60,
            "left": 30,
            "right": 30,
            "cellSize": ["auto", 13],
            "range": [first, last],
            "itemStyle": { "borderWidth": 0.5 },
            "yearLabel": { "show": false },
            "dayLabel": { "color": color },
            "monthLabel": { "color": color }
        },
        "series": [{
            "type": "heatmap",
            "coordinateSystem": "calendar",
            "data": data.iter().map(|(d, c)| json!([d, c])).collect::<Vec<_>>()
        }]
    })
}

pub fn categories_option(theme: Theme, analysis: &Analysis) -> Value {
    let data: Vec<Value> = analysis
        .category_stats
        .iter()
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect();
    json!({
        "title": title("内容分类分布🎯", theme),
        "tooltip": { "trigger": "item" },
        "legend": { "bottom": "5%", "textStyle": { "color": theme.text_color() } },
        "series": [{
            "type": "pie",
            "radius": "60%",
            "data": data,
            "emphasis": shadow_emphasis(),
            "label": { "color": theme.text_color(), "formatter": "{b}\n{c}篇 ({d}%)" }
        }]
    })
}

pub fn visit_option(theme: Theme, stats: &VisitStats) -> Value {
    let color = theme.text_color();
    let axis = json!({
        "axisLabel": { "color": color },
        "axisLine": { "lineStyle": { "color": color } }
    });
    let mut x_axis = axis.clone();
    x_axis["type"] = json!("category");
    x_axis["data"] = json!(stats.trend.iter().map(|(d, _)| d).collect::<Vec<_>>());
    let mut y_axis = axis;
    y_axis["type"] = json!("value");
    y_axis["splitLine"] = json!({ "show": false });

    json!({
        "title": {
            "text": "访问统计 (本地模拟)📊",
            "x": "center",
            "textStyle": { "color": color },
            "subtext": format!("总访问: {} | 今日: {}", stats.total, stats.today),
            "subtextStyle": { "color": color }
        },
        "tooltip": { "trigger": "axis" },
        "xAxis": x_axis,
        "yAxis": y_axis,
        "series": [{
            "data": stats.trend.iter().map(|(_, v)| v).collect::<Vec<_>>(),
            "type": "line",
            "smooth": true,
            "areaStyle": {
                "opacity": 0.3,
                "color": {
                    "type": "linear",
                    "x": 0, "y": 0, "x2": 0, "y2": 1,
                    "colorStops": [
                        { "offset": 0, "color": ACCENT },
                        { "offset": 1, "color": "rgba(78, 205, 196, 0.1)" }
                    ]
                }
            },
            "lineStyle": { "color": ACCENT },
            "itemStyle": { "color": ACCENT }
        }]
    })
}
