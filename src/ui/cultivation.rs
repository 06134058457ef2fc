//! Cultivation panel: status bar, attributes, logs, name, save files

use std::cell::RefCell;
use std::rc::Rc;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{HtmlAnchorElement, HtmlInputElement, KeyboardEvent};

use super::dom::{self, alert, by_id, by_id_as, confirm, escape_html, on_click, set_display};
use crate::cultivation::{
    Attr, Cultivation, CultivationData, CultivationError, CultivationEvent, DataManager,
};
use crate::persistence::{ImportPlan, export_file_name};
use crate::platform::{LocalStore, now_ms};

/// Cultivation manager plus the RNG that drives it
pub struct CultivationPanel {
    pub game: Cultivation,
    pub rng: Pcg32,
}

pub type SharedCultivation = Rc<RefCell<CultivationPanel>>;

impl CultivationPanel {
    /// Apply idle time and refresh if anything changed
    pub fn sync(&mut self, total_seconds: u64) {
        let events = self
            .game
            .sync_with_total_seconds(total_seconds, now_ms(), &mut self.rng);
        if !events.is_empty() {
            self.render(&events);
        }
    }

    /// Set the name from outside the panel (snake start prompt)
    pub fn rename(&mut self, name: &str) -> Result<(), CultivationError> {
        let events = self.game.set_character_name(name)?;
        self.render(&events);
        Ok(())
    }

    /// Idle timer reset: start over
    pub fn reset(&mut self) {
        let events = self.game.reset();
        self.render(&events);
    }

    fn render(&self, events: &[CultivationEvent]) {
        render_status(&self.game);
        render_logs(&self.game);
        let attrs_changed = events.iter().any(|e| {
            matches!(
                e,
                CultivationEvent::AttributesChanged
                    | CultivationEvent::GrandmasterGrowth
                    | CultivationEvent::StageBreakthrough { .. }
                    | CultivationEvent::Reset
            )
        });
        if attrs_changed {
            render_attribute_rows(&self.game);
        }
        if events.contains(&CultivationEvent::NameChanged) || events.contains(&CultivationEvent::Reset) {
            render_name(&self.game);
        }
    }

    fn render_all(&self) {
        render_status(&self.game);
        render_attribute_rows(&self.game);
        render_name(&self.game);
        render_logs(&self.game);
    }
}

/// Load progress and data tables, then wire the panel
pub async fn mount() -> Result<SharedCultivation, JsValue> {
    let mut data_manager = DataManager::default();
    let data = data_manager.load_all().await;
    Ok(mount_with(data))
}

fn mount_with(data: CultivationData) -> SharedCultivation {
    let game = Cultivation::load(Box::new(LocalStore::local()), data);
    let panel = Rc::new(RefCell::new(CultivationPanel {
        game,
        rng: Pcg32::seed_from_u64(dom::clock_seed()),
    }));

    if by_id("player-attributes").is_some() {
        render_attribute_frame();
        setup_name_events(panel.clone());
        setup_save_events(panel.clone());
    }
    on_click("btn-tribulation", {
        let panel = panel.clone();
        move |_| try_tribulation(&panel)
    });
    panel.borrow().render_all();
    log::info!("Cultivation panel mounted");
    panel
}

fn render_status(game: &Cultivation) {
    let view = game.status_view();
    dom::set_text("cultivation-status", &view.title);
    dom::set_text("cultivation-desc", &view.desc);
    if let Some(bar) = by_id("cultivation-progress") {
        dom::set_style(&bar, "width", &format!("{}%", view.percent));
    }
    set_display(
        "btn-tribulation",
        if view.tribulation_ready { "inline-block" } else { "none" },
    );
}

fn render_logs(game: &Cultivation) {
    if let Some(el) = by_id("cultivation-logs") {
        let html: String = game
            .recent_logs()
            .iter()
            .map(|line| format!("<div class=\"log-entry\">{}</div>", escape_html(line)))
            .collect();
        el.set_inner_html(&html);
    }
}

fn render_name(game: &Cultivation) {
    let name = game.character_name();
    dom::set_text(
        "character-name-display",
        if name.is_empty() { "未设置" } else { name },
    );
}

const ATTR_STYLES: [(Attr, &str, &str, &str); 8] = [
    (Attr::Attack, "⚔️", "#d32f2f", "#f44336"),
    (Attr::Defense, "🛡️", "#1976d2", "#2196f3"),
    (Attr::Hp, "❤️", "#c62828", "#e53935"),
    (Attr::Mana, "🔮", "#7b1fa2", "#9c27b0"),
    (Attr::Spirit, "🧠", "#455a64", "#607d8b"),
    (Attr::Luck, "🍀", "#388e3c", "#5e0530ff"),
    (Attr::Comprehension, "💎", "#f57c00", "#ff9800"),
    (Attr::SpiritualStone, "💰", "#fbc02d", "#ffeb3b"),
];

/// Static part of the attribute box: name editor and save buttons
fn render_attribute_frame() {
    let Some(el) = by_id("player-attributes") else {
        return;
    };
    let button = "border: none; padding: 2px 8px; border-radius: 3px; cursor: pointer; font-size: 12px;";
    el.set_inner_html(&format!(
        r#"<div class="character-name-section" style="margin-bottom: 15px; padding: 10px; background: rgba(255, 193, 7, 0.1); border-radius: 5px;">
  <div style="display: flex; align-items: center; gap: 10px;">
    <span style="font-weight: bold; color: #FF6B6B;">✨ 仙号：</span>
    <span id="character-name-display" style="color: #030d03ff; font-weight: bold;">未设置</span>
    <input type="text" id="character-name-input" placeholder="请输入您的仙号" maxlength="10" style="display: none; padding: 2px 8px; border: 1px solid #ddd; border-radius: 3px; font-size: 12px;">
    <button id="edit-character-name" style="background: #FFC107; {button}">⚙️ 修改</button>
    <button id="save-character-name" style="display: none; background: #4CAF50; color: white; {button}">✔️ 确定</button>
    <button id="cancel-character-name" style="display: none; background: #f44336; color: white; {button}">❌ 取消</button>
    <button id="export-save" style="background: #2196F3; color: white; margin-left: 5px; {button}">💾 导出</button>
    <button id="import-save" style="background: #9C27B0; color: white; {button}">📁 导入</button>
    <input type="file" id="save-file-input" accept=".json" style="display: none;">
  </div>
  <div style="font-size: 11px; color: #666; margin-top: 5px;">📝 设置仙号后可解锁贪吃蛇游戏，不设置不影响修仙进度</div>
</div>
<div id="attribute-rows"></div>"#
    ));
}

fn render_attribute_rows(game: &Cultivation) {
    let Some(el) = by_id("attribute-rows") else {
        return;
    };
    let attrs = &game.state().attributes;
    let html: String = ATTR_STYLES
        .chunks(2)
        .map(|pair| {
            let items: String = pair
                .iter()
                .map(|(attr, icon, label_color, value_color)| {
                    format!(
                        r#"<span class="attr-item" style="color: {label_color};">{icon} {}: <strong style="color: {value_color};">{}</strong></span>"#,
                        attr.label(),
                        attrs.get(*attr)
                    )
                })
                .collect();
            format!("<div class=\"attr-row\">{}</div>", items)
        })
        .collect();
    el.set_inner_html(&html);
}

fn show_edit_mode(show: bool) {
    let (editing, idle) = if show { ("inline", "none") } else { ("none", "inline") };
    set_display("character-name-display", idle);
    set_display("edit-character-name", idle);
    set_display("character-name-input", editing);
    set_display("save-character-name", editing);
    set_display("cancel-character-name", editing);
}

fn setup_name_events(panel: SharedCultivation) {
    on_click("edit-character-name", {
        let panel = panel.clone();
        move |_| {
            show_edit_mode(true);
            if let Some(input) = by_id_as::<HtmlInputElement>("character-name-input") {
                input.set_value(panel.borrow().game.character_name());
                let _ = input.focus();
            }
        }
    });

    let save = {
        let panel = panel.clone();
        move || {
            let Some(input) = by_id_as::<HtmlInputElement>("character-name-input") else {
                return;
            };
            let mut p = panel.borrow_mut();
            match p.game.set_character_name(&input.value()) {
                Ok(events) => {
                    p.render(&events);
                    show_edit_mode(false);
                }
                Err(e) => alert(&e.to_string()),
            }
        }
    };
    on_click("save-character-name", {
        let save = save.clone();
        move |_| save()
    });
    on_click("cancel-character-name", |_| show_edit_mode(false));
    if let Some(input) = by_id("character-name-input") {
        dom::listen(&input, "keypress", move |e: KeyboardEvent| {
            if e.key() == "Enter" {
                save();
            }
        });
    }
}

fn try_tribulation(panel: &SharedCultivation) {
    let outcome = {
        let mut p = panel.borrow_mut();
        let CultivationPanel { game, rng } = &mut *p;
        let outcome = game.try_tribulation(0, now_ms(), rng);
        render_status(game);
        render_attribute_rows(game);
        render_logs(game);
        outcome
    };
    if let Some(text) = outcome.alert_text() {
        alert(&text);
    }
}

fn setup_save_events(panel: SharedCultivation) {
    on_click("export-save", {
        let panel = panel.clone();
        move |_| match export_save(&panel.borrow().game) {
            Ok(file_name) => alert(&format!("💾 存档导出成功！\n\n文件名：{}", file_name)),
            Err(e) => {
                log::error!("Export failed: {:?}", e);
                alert("❗ 导出存档失败，请稍后重试！");
            }
        }
    });

    on_click("import-save", |_| {
        if let Some(input) = by_id_as::<HtmlInputElement>("save-file-input") {
            input.click();
        }
    });

    if let Some(input) = by_id_as::<HtmlInputElement>("save-file-input") {
        let target = input.clone();
        dom::listen(&input, "change", move |_: web_sys::Event| {
            let Some(file) = target.files().and_then(|files| files.get(0)) else {
                return;
            };
            target.set_value("");
            let panel = panel.clone();
            spawn_local(async move {
                match JsFuture::from(file.text()).await.map(|v| v.as_string()) {
                    Ok(Some(text)) => import_save(&panel, &text),
                    _ => alert("❗ 文件读取失败！请重试或检查文件是否损坏。"),
                }
            });
        });
    }
}

/// Download the save as JSON; returns the file name
fn export_save(game: &Cultivation) -> Result<String, JsValue> {
    let now = now_ms();
    let json = game
        .export(now)
        .and_then(|envelope| envelope.to_pretty_json())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let file_name = export_file_name(game.character_name(), now);

    let parts = js_sys::Array::of1(&JsValue::from_str(&json));
    let options = web_sys::BlobPropertyBag::new();
    options.set_type("application/json");
    let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &options)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let document = dom::document()?;
    let anchor: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
    anchor.set_href(&url);
    anchor.set_download(&file_name);
    let body = document.body().ok_or("no body")?;
    body.append_child(&anchor)?;
    anchor.click();
    body.remove_child(&anchor)?;
    web_sys::Url::revoke_object_url(&url)?;

    log::info!("Save exported as {}", file_name);
    Ok(file_name)
}

fn import_save(panel: &SharedCultivation, text: &str) {
    let realm_count = panel.borrow().game.data().realms.len();
    let plan = match ImportPlan::parse(text, realm_count) {
        Ok(plan) => plan,
        Err(e) => {
            log::error!("Import rejected: {}", e);
            alert(&e.user_message());
            return;
        }
    };

    let confirmation = plan.confirmation(&panel.borrow().game.data().realms);
    if !confirm(&confirmation) {
        return;
    }

    let result = panel.borrow_mut().game.import(&plan);
    match result {
        Ok(welcome) => {
            panel.borrow().render_all();
            alert(&welcome);
        }
        Err(e) => {
            panel.borrow().render_all();
            alert(&e.user_message());
        }
    }
}
