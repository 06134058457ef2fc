//! Snake canvas, controls and leaderboard

use std::cell::RefCell;
use std::rc::Rc;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlButtonElement, HtmlCanvasElement, KeyboardEvent};

use super::cultivation::SharedCultivation;
use super::dom::{self, alert, by_id, by_id_as, escape_html, on_click, prompt};
use crate::highscores::{EMPTY_BOARD_TEXT, Leaderboard};
use crate::platform::{LocalStore, now_ms};
use crate::renderer::{self, snake_frame};
use crate::snake::{Direction, SnakeEvent, SnakePhase, SnakeState, TickInput, is_game_key, tick};
use crate::{board_px, nickname};

/// Longest frame gap fed to the simulation (tab switches)
const MAX_FRAME_MS: f64 = 250.0;
const NOTIFICATION_MS: i32 = 3000;

const NAME_PROMPT: &str = "🎮 请输入您的仙号以开始游戏（或点取消去修仙属性框设置）:";
const NAME_INVALID: &str = "仙号设置失败，请检查格式！";
const NAME_REQUIRED: &str = "🎮 请先在修仙属性框中设置您的仙号才能开始游戏！";

struct SnakeGame {
    state: SnakeState,
    leaderboard: Leaderboard,
    rng: Pcg32,
    input: TickInput,
    last_time: f64,
    ctx: CanvasRenderingContext2d,
    cultivation: SharedCultivation,
}

impl SnakeGame {
    /// Name check, then the countdown
    fn request_start(&mut self) {
        if !self.state.can_start() {
            return;
        }
        let Some(name) = self.resolve_player_name() else {
            return;
        };
        self.leaderboard.set_current_player(&name);
        if self.state.begin_countdown(&mut self.rng) {
            dom::set_text("score", "0");
            log::info!("Snake starting for {}", name);
        }
        self.update_pause_button();
        self.render_leaderboard();
    }

    /// The cultivation name, or one entered at a prompt
    fn resolve_player_name(&mut self) -> Option<String> {
        {
            let panel = self.cultivation.borrow();
            if panel.game.can_play_snake() {
                return Some(panel.game.character_name().to_string());
            }
        }

        let entered = prompt(NAME_PROMPT).map(|s| s.trim().to_string());
        match entered {
            Some(name) if !name.is_empty() => {
                let accepted = nickname::validate(&name).is_ok()
                    && self.cultivation.borrow_mut().rename(&name).is_ok();
                if accepted {
                    Some(name)
                } else {
                    alert(NAME_INVALID);
                    None
                }
            }
            _ => {
                alert(NAME_REQUIRED);
                None
            }
        }
    }

    fn reset(&mut self) {
        self.state.reset(&mut self.rng);
        self.input = TickInput::default();
        dom::set_text("score", "0");
        self.update_pause_button();
        self.draw();
    }

    fn update(&mut self, time: f64) {
        let dt = if self.last_time > 0.0 {
            (time - self.last_time).clamp(0.0, MAX_FRAME_MS)
        } else {
            0.0
        };
        self.last_time = time;

        let input = std::mem::take(&mut self.input);
        let events = tick(&mut self.state, &input, dt, &mut self.rng);
        for event in events {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: SnakeEvent) {
        match event {
            SnakeEvent::Ate { score } => {
                dom::set_text("score", &score.to_string());
                self.leaderboard.update_current_score(score);
                dom::set_text("current-player-score", &self.leaderboard.current_score().to_string());
            }
            SnakeEvent::GameOver { score } => self.game_over(score),
            SnakeEvent::Started | SnakeEvent::Paused | SnakeEvent::Resumed => {
                self.update_pause_button();
            }
        }
    }

    fn game_over(&mut self, score: u64) {
        let best = self.leaderboard.record_personal_best(score);
        dom::set_text("high-score", &best.to_string());

        let now = now_ms();
        if self.leaderboard.save_score(score, now, &mut self.rng) {
            show_notification(&format!("🎉 新记录！{}分", score));
        }
        self.update_pause_button();
        self.render_leaderboard();
        log::info!("Snake game over at {}", score);
    }

    fn draw(&self) {
        renderer::execute(&self.ctx, &snake_frame(&self.state));
    }

    fn update_pause_button(&self) {
        let Some(button) = by_id_as::<HtmlButtonElement>("pause-btn") else {
            return;
        };
        let (label, color, disabled) = match self.state.phase {
            SnakePhase::Running => ("暂停", "#ff9800", false),
            SnakePhase::Paused => ("继续", "#4CAF50", false),
            _ => ("暂停", "#ccc", true),
        };
        button.set_text_content(Some(label));
        button.set_disabled(disabled);
        dom::set_style(&button, "background-color", color);
    }

    fn render_leaderboard(&mut self) {
        dom::set_text("current-player-name", self.leaderboard.player_label());
        dom::set_text(
            "current-player-score",
            &self.leaderboard.current_score().to_string(),
        );

        let Some(el) = by_id("score-leaderboard") else {
            return;
        };
        let rows = self.leaderboard.board(now_ms(), &mut self.rng);
        if rows.is_empty() {
            el.set_inner_html(&format!(
                "<div style=\"text-align: center; color: #999; padding: 20px;\">{}</div>",
                EMPTY_BOARD_TEXT
            ));
            return;
        }
        let html: String = rows
            .iter()
            .map(|row| {
                format!(
                    r#"<div class="score-item" style="display: flex; justify-content: space-between; padding: 5px 0; border-bottom: 1px solid #eee;">
  <span class="rank" style="width: 36px;">{}</span>
  <span class="player" style="flex: 1;">{} {}</span>
  <span class="score" style="color: {}; font-weight: bold;">{}</span>
  <span class="date" style="color: #999; font-size: 12px; margin-left: 8px;">{}</span>
</div>"#,
                    row.rank_label(),
                    row.kind.icon(),
                    escape_html(&row.name),
                    row.score_color(),
                    row.score,
                    row.date
                )
            })
            .collect();
        el.set_inner_html(&html);
    }
}

/// Floating "new record" banner
fn show_notification(text: &str) {
    let Ok(document) = dom::document() else {
        return;
    };
    let Ok(note) = document.create_element("div") else {
        return;
    };
    note.set_text_content(Some(text));
    let _ = note.set_attribute(
        "style",
        "position: fixed; top: 20px; right: 20px; background: #4CAF50; color: white; \
         padding: 15px 20px; border-radius: 5px; z-index: 10000; font-weight: bold; \
         box-shadow: 0 4px 8px rgba(0,0,0,0.2);",
    );
    if let Some(body) = document.body() {
        let _ = body.append_child(&note);
        dom::set_timeout(move || note.remove(), NOTIFICATION_MS);
    }
}

pub fn mount(cultivation: SharedCultivation) -> Result<(), JsValue> {
    let Some(canvas) = by_id_as::<HtmlCanvasElement>("gameCanvas") else {
        log::debug!("No snake canvas on this page");
        return Ok(());
    };
    let side = board_px() as u32;
    canvas.set_width(side);
    canvas.set_height(side);
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or("2d context unavailable")?
        .dyn_into()?;

    let mut rng = Pcg32::seed_from_u64(dom::clock_seed());
    let leaderboard = Leaderboard::new(Box::new(LocalStore::local()));
    let game = Rc::new(RefCell::new(SnakeGame {
        state: SnakeState::new(&mut rng),
        leaderboard,
        rng,
        input: TickInput::default(),
        last_time: 0.0,
        ctx,
        cultivation: cultivation.clone(),
    }));

    {
        let mut g = game.borrow_mut();
        let name = cultivation.borrow().game.character_name().to_string();
        g.leaderboard.set_current_player(&name);
        dom::set_text("high-score", &g.leaderboard.personal_best().to_string());
        dom::set_text("score", "0");
        g.update_pause_button();
        g.render_leaderboard();
        g.draw();
    }

    setup_controls(&canvas, game.clone())?;
    request_animation_frame(game);
    log::info!("Snake mounted");
    Ok(())
}

fn setup_controls(canvas: &HtmlCanvasElement, game: Rc<RefCell<SnakeGame>>) -> Result<(), JsValue> {
    let _ = canvas.set_attribute("tabindex", "0");
    {
        let target = canvas.clone();
        dom::listen(canvas, "click", move |_: web_sys::MouseEvent| {
            let _ = target.focus();
        });
    }

    {
        let game = game.clone();
        dom::listen(&dom::document()?, "keydown", move |event: KeyboardEvent| {
            let key = event.key();
            if !is_game_key(&key) {
                return;
            }
            event.prevent_default();

            let mut g = game.borrow_mut();
            if g.state.can_start() {
                g.request_start();
            } else if key == " " {
                g.input.toggle_pause = true;
            } else if let Some(dir) = Direction::from_key(&key) {
                g.input.turn = Some(dir);
            }
        });
    }

    on_click("start-btn", {
        let game = game.clone();
        move |_| game.borrow_mut().request_start()
    });
    on_click("pause-btn", {
        let game = game.clone();
        move |_| {
            let mut g = game.borrow_mut();
            if g.state.is_running() {
                g.input.toggle_pause = true;
            }
        }
    });
    on_click("reset-btn", move |_| game.borrow_mut().reset());
    Ok(())
}

fn request_animation_frame(game: Rc<RefCell<SnakeGame>>) {
    dom::request_animation_frame(move |time| game_loop(game, time));
}

fn game_loop(game: Rc<RefCell<SnakeGame>>, time: f64) {
    {
        let mut g = game.borrow_mut();
        g.update(time);
        g.draw();
    }
    request_animation_frame(game);
}
