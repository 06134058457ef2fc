//! Statistics dashboard: site cards and ECharts charts

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use super::dom::{self, by_id};
use crate::census::{
    Analysis, CONTENT_URL, SiteInfo, Theme, VisitStats, analyze, categories_option, heatmap_data,
    heatmap_option, posts_from_value, record_visit, tech_stack_option, visit_option,
};
use crate::consts::THEME_REFRESH_MS;
use crate::platform::{LocalStore, fetch_json, now_ms};

struct Dashboard {
    analysis: Analysis,
    visits: VisitStats,
    /// Live ECharts instances
    charts: Vec<JsValue>,
}

impl Dashboard {
    /// Chart options for the containers on this page
    fn options(&self, theme: Theme) -> Vec<(&'static str, Value)> {
        let now = now_ms();
        vec![
            ("tech-stack", tech_stack_option(theme)),
            (
                "content-heatmap",
                heatmap_option(theme, &heatmap_data(&self.analysis, now)),
            ),
            ("categories-analysis", categories_option(theme, &self.analysis)),
            ("visit-stats", visit_option(theme, &self.visits)),
        ]
    }

    fn render_charts(&mut self) {
        let Some(echarts) = echarts() else {
            log::warn!("ECharts not loaded, charts skipped");
            return;
        };
        let theme = current_theme();
        for (id, option) in self.options(theme) {
            let Some(el) = by_id(id) else {
                continue;
            };
            match init_chart(&echarts, &el, &option) {
                Ok(chart) => self.charts.push(chart),
                Err(e) => log::error!("Chart #{} failed: {:?}", id, e),
            }
        }
    }

    fn dispose_charts(&mut self) {
        for chart in self.charts.drain(..) {
            if let Err(e) = call_method(&chart, "dispose", &[]) {
                log::warn!("dispose failed: {:?}", e);
            }
        }
    }

    fn resize_charts(&self) {
        for chart in &self.charts {
            let _ = call_method(chart, "resize", &[]);
        }
    }
}

fn echarts() -> Option<JsValue> {
    let window = dom::window().ok()?;
    let echarts = js_sys::Reflect::get(&window, &JsValue::from_str("echarts")).ok()?;
    (!echarts.is_undefined()).then_some(echarts)
}

fn current_theme() -> Theme {
    let attr = dom::document()
        .ok()
        .and_then(|d| d.document_element())
        .and_then(|root| root.get_attribute("data-theme"));
    Theme::from_attr(attr.as_deref())
}

fn call_method(target: &JsValue, name: &str, args: &[&JsValue]) -> Result<JsValue, JsValue> {
    let method: js_sys::Function = js_sys::Reflect::get(target, &JsValue::from_str(name))?.dyn_into()?;
    match args {
        [] => method.call0(target),
        [a] => method.call1(target, a),
        [a, b] => method.call2(target, a, b),
        _ => Err(JsValue::from_str("too many arguments")),
    }
}

fn init_chart(echarts: &JsValue, el: &web_sys::Element, option: &Value) -> Result<JsValue, JsValue> {
    let el = JsValue::from(el.clone());
    let chart = call_method(echarts, "init", &[&el, &JsValue::from_str("light")])?;
    let option = js_sys::JSON::parse(&option.to_string())?;
    call_method(&chart, "setOption", &[&option])?;
    Ok(chart)
}

fn render_site_info(analysis: &Analysis) {
    let Some(el) = by_id("site-info") else {
        return;
    };
    let cards: String = SiteInfo::new(analysis, now_ms())
        .cards()
        .iter()
        .map(|(icon, value, label)| {
            format!(
                r#"<div class="info-card">
  <div class="card-icon">{icon}</div>
  <div class="card-content">
    <div class="card-number">{value}</div>
    <div class="card-label">{label}</div>
  </div>
</div>"#
            )
        })
        .collect();
    el.set_inner_html(&format!("<div class=\"site-info-cards\">{}</div>", cards));
}

const CONTAINERS: [&str; 5] = [
    "site-info",
    "tech-stack",
    "content-heatmap",
    "categories-analysis",
    "visit-stats",
];

pub async fn mount() -> Result<(), JsValue> {
    if CONTAINERS.iter().all(|id| by_id(id).is_none()) {
        return Ok(());
    }

    let posts = match fetch_json(CONTENT_URL).await {
        Ok(value) => posts_from_value(value),
        Err(e) => {
            log::error!("Failed to load {}: {:?}", CONTENT_URL, e);
            Vec::new()
        }
    };
    let analysis = analyze(&posts);
    let visits = record_visit(&LocalStore::local(), now_ms());
    log::info!(
        "Dashboard: {} posts, {} visits today",
        analysis.posts_count,
        visits.today
    );

    render_site_info(&analysis);
    let dashboard = Rc::new(RefCell::new(Dashboard {
        analysis,
        visits,
        charts: Vec::new(),
    }));
    dashboard.borrow_mut().render_charts();

    let window = dom::window()?;
    {
        let dashboard = dashboard.clone();
        dom::listen(&window, "resize", move |_: web_sys::Event| {
            dashboard.borrow().resize_charts();
        });
    }

    // theme toggles are plain clicks; re-render once the attribute flips
    dom::listen(&dom::document()?, "click", move |_: web_sys::MouseEvent| {
        let dashboard = dashboard.clone();
        dom::set_timeout(
            move || {
                let mut d = dashboard.borrow_mut();
                d.dispose_charts();
                d.render_charts();
            },
            THEME_REFRESH_MS,
        );
    });
    Ok(())
}
